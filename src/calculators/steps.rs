//! Daily steps target
//!
//! Starts from the WHO reference of 10,000 steps/day and applies age, gender
//! and activity-level multipliers.

use crate::config::StepsConfig;
use crate::types::GoalBounds;
use crate::validator::CalculationInput;
use serde::Serialize;

use super::GoalCalculator;

/// Intermediate values of a steps calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepsBreakdown {
    pub baseline: f64,
    pub age_multiplier: f64,
    pub gender_multiplier: f64,
    pub activity_multiplier: f64,
    /// Target before rounding and clamping
    pub raw_steps: f64,
}

/// Steps calculator
#[derive(Debug, Clone, Default)]
pub struct StepsCalculator {
    config: StepsConfig,
}

impl StepsCalculator {
    pub fn new(config: StepsConfig) -> Self {
        Self { config }
    }

    pub fn breakdown(&self, input: &CalculationInput) -> StepsBreakdown {
        let baseline = self.config.baseline;
        let age_multiplier = self.config.age.for_age(input.age());
        let gender_multiplier = self.config.gender.for_gender(input.gender());
        let activity_multiplier = self.config.activity.factor(input.activity_level());

        StepsBreakdown {
            baseline,
            age_multiplier,
            gender_multiplier,
            activity_multiplier,
            raw_steps: baseline * age_multiplier * gender_multiplier * activity_multiplier,
        }
    }
}

impl GoalCalculator for StepsCalculator {
    fn name(&self) -> &'static str {
        "steps"
    }

    fn bounds(&self) -> (u32, u32) {
        (GoalBounds::MEDICAL.min_steps, GoalBounds::MEDICAL.max_steps)
    }

    fn raw_target(&self, input: &CalculationInput) -> f64 {
        self.breakdown(input).raw_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityLevel, Gender};

    fn input(age: u32, gender: Gender, activity: ActivityLevel) -> CalculationInput {
        CalculationInput::new(age, gender, 175.0, 75.0, activity).unwrap()
    }

    #[test]
    fn test_adult_male_moderate() {
        let calc = StepsCalculator::default();
        let steps = calc
            .compute(&input(30, Gender::Male, ActivityLevel::Moderate))
            .unwrap();
        // 10,000 x 1.0 x 1.03 x 1.05
        assert_eq!(steps, 10_815);
    }

    #[test]
    fn test_senior_reduction() {
        let calc = StepsCalculator::default();
        let adult = calc.breakdown(&input(30, Gender::Unspecified, ActivityLevel::Moderate));
        let senior = calc.breakdown(&input(70, Gender::Unspecified, ActivityLevel::Moderate));
        assert!((senior.raw_steps / adult.raw_steps - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_youth_increase() {
        let calc = StepsCalculator::default();
        let breakdown = calc.breakdown(&input(12, Gender::Female, ActivityLevel::Active));
        assert_eq!(breakdown.age_multiplier, 1.15);
        assert_eq!(breakdown.gender_multiplier, 0.97);
    }

    #[test]
    fn test_activity_ladder_is_monotonic() {
        let calc = StepsCalculator::default();
        let levels = [
            ActivityLevel::Sedentary,
            ActivityLevel::Light,
            ActivityLevel::Moderate,
            ActivityLevel::Active,
            ActivityLevel::VeryActive,
        ];
        let steps: Vec<u32> = levels
            .iter()
            .map(|level| calc.compute(&input(40, Gender::Female, *level)).unwrap())
            .collect();
        assert!(steps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_clamped_to_bounds() {
        let mut config = StepsConfig::default();
        config.baseline = 50_000.0;
        let calc = StepsCalculator::new(config);
        let steps = calc
            .compute(&input(12, Gender::Male, ActivityLevel::VeryActive))
            .unwrap();
        assert_eq!(steps, 20_000);
    }

    #[test]
    fn test_deterministic() {
        let calc = StepsCalculator::default();
        let i = input(45, Gender::Female, ActivityLevel::Light);
        assert_eq!(calc.compute(&i).unwrap(), calc.compute(&i).unwrap());
    }
}
