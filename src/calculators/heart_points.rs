//! Daily heart points target
//!
//! WHO recommends at least 150 minutes of moderate-intensity activity per
//! week. One moderate minute earns one point, so the daily baseline is
//! 150 / 7 (about 21 points), scaled by age and activity level.

use crate::config::HeartPointsConfig;
use crate::types::GoalBounds;
use crate::validator::CalculationInput;
use serde::Serialize;

use super::GoalCalculator;

const DAYS_PER_WEEK: f64 = 7.0;

/// Intermediate values of a heart points calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartPointsBreakdown {
    pub weekly_moderate_minutes: f64,
    pub daily_baseline: f64,
    pub age_multiplier: f64,
    pub activity_multiplier: f64,
    pub raw_points: f64,
}

/// Heart points calculator
#[derive(Debug, Clone, Default)]
pub struct HeartPointsCalculator {
    config: HeartPointsConfig,
}

impl HeartPointsCalculator {
    pub fn new(config: HeartPointsConfig) -> Self {
        Self { config }
    }

    /// Daily points equivalent of the weekly moderate-minutes recommendation
    pub fn daily_baseline(&self) -> f64 {
        self.config.weekly_moderate_minutes / DAYS_PER_WEEK * self.config.points_per_moderate_minute
    }

    pub fn breakdown(&self, input: &CalculationInput) -> HeartPointsBreakdown {
        let daily_baseline = self.daily_baseline();
        let age_multiplier = self.config.age.for_age(input.age());
        let activity_multiplier = self.config.activity.factor(input.activity_level());

        HeartPointsBreakdown {
            weekly_moderate_minutes: self.config.weekly_moderate_minutes,
            daily_baseline,
            age_multiplier,
            activity_multiplier,
            raw_points: daily_baseline * age_multiplier * activity_multiplier,
        }
    }
}

impl GoalCalculator for HeartPointsCalculator {
    fn name(&self) -> &'static str {
        "heart_points"
    }

    fn bounds(&self) -> (u32, u32) {
        (
            GoalBounds::MEDICAL.min_heart_points,
            GoalBounds::MEDICAL.max_heart_points,
        )
    }

    fn raw_target(&self, input: &CalculationInput) -> f64 {
        self.breakdown(input).raw_points
    }
}
