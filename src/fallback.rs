//! Fallback goal generation
//!
//! When a profile is missing, invalid, or the standard calculation fails, the
//! engine still has to hand back goals. The fallback generator uses whatever
//! age and gender information is available, applies the same directional
//! adjustments as the standard calculators over narrower ranges, and clamps
//! into [`GoalBounds::FALLBACK`]. If even that fails, the emergency constants
//! are returned.

use crate::calculators::bounded_goal;
use crate::config::FallbackConfig;
use crate::error::GoalsError;
use crate::types::{BiometricProfile, CalculationSource, DailyGoals, Gender, GoalBounds};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, warn};

/// Emergency steps goal
pub const EMERGENCY_STEPS: u32 = 6_000;

/// Emergency calories goal
pub const EMERGENCY_CALORIES: u32 = 1_600;

/// Emergency heart points goal
pub const EMERGENCY_HEART_POINTS: u32 = 18;

const _: () = assert!(GoalBounds::FALLBACK.contains_values(
    EMERGENCY_STEPS,
    EMERGENCY_CALORIES,
    EMERGENCY_HEART_POINTS
));

/// Why the fallback path was taken
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    MissingProfile,
    InvalidProfile(String),
    CalculationFailed(String),
    Emergency(String),
}

impl From<&GoalsError> for FallbackReason {
    fn from(err: &GoalsError) -> Self {
        match err {
            GoalsError::Validation(e) => FallbackReason::InvalidProfile(e.to_string()),
            GoalsError::Catastrophic(msg) => FallbackReason::Emergency(msg.clone()),
            other => FallbackReason::CalculationFailed(other.to_string()),
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::MissingProfile => write!(f, "no profile is available"),
            FallbackReason::InvalidProfile(detail) => {
                write!(f, "the profile could not be used ({})", detail)
            }
            FallbackReason::CalculationFailed(detail) => {
                write!(f, "the calculation did not complete ({})", detail)
            }
            FallbackReason::Emergency(detail) => {
                write!(f, "an unexpected error occurred ({})", detail)
            }
        }
    }
}

/// Generator for conservative default goals
#[derive(Debug, Clone, Default)]
pub struct FallbackGenerator {
    config: FallbackConfig,
}

impl FallbackGenerator {
    pub fn new(config: FallbackConfig) -> Self {
        Self { config }
    }

    /// Produce fallback goals. Never fails.
    pub fn generate(
        &self,
        user_id: &str,
        profile: Option<&BiometricProfile>,
        reason: Option<&FallbackReason>,
    ) -> DailyGoals {
        let reason = reason.cloned().unwrap_or(FallbackReason::MissingProfile);
        warn!(user_id, %reason, "using fallback goals");

        match self
            .try_generate(profile)
            .and_then(|goals| Self::validate(&goals).map(|_| goals))
        {
            Ok(goals) => goals,
            Err(e) => {
                error!(user_id, error = %e, "adjusted fallback failed; using emergency goals");
                Self::emergency_fallback(user_id)
            }
        }
    }

    /// Adjusted fallback over the available age and gender
    pub fn try_generate(
        &self,
        profile: Option<&BiometricProfile>,
    ) -> Result<DailyGoals, GoalsError> {
        let age = profile
            .and_then(BiometricProfile::current_age)
            .filter(|age| (0..=120).contains(age))
            .map(|age| age as u32);
        let gender = profile.and_then(|p| p.gender).unwrap_or(Gender::Unspecified);

        let age_multiplier = self.config.age.for_optional_age(age);
        let gender_multiplier = self.config.gender.for_gender(gender);
        let bounds = GoalBounds::FALLBACK;

        let steps = bounded_goal(
            "fallback steps",
            self.config.steps_baseline * age_multiplier * gender_multiplier,
            bounds.min_steps,
            bounds.max_steps,
        )?;
        let calories = bounded_goal(
            "fallback calories",
            self.config.calories_for(gender) * age_multiplier,
            bounds.min_calories,
            bounds.max_calories,
        )?;
        let heart_points = bounded_goal(
            "fallback heart points",
            self.config.heart_points_baseline * age_multiplier,
            bounds.min_heart_points,
            bounds.max_heart_points,
        )?;

        DailyGoals::new(
            steps,
            calories,
            heart_points,
            CalculationSource::FallbackDefault,
            Utc::now(),
        )
    }

    /// Fixed, maximally conservative goals. Ignores all input.
    pub fn emergency_fallback(user_id: &str) -> DailyGoals {
        error!(user_id, "returning emergency goals");
        DailyGoals::from_trusted(
            EMERGENCY_STEPS,
            EMERGENCY_CALORIES,
            EMERGENCY_HEART_POINTS,
            CalculationSource::FallbackDefault,
            Utc::now(),
        )
    }

    /// Re-check produced goals against the fallback bounds
    pub fn validate(goals: &DailyGoals) -> Result<(), GoalsError> {
        GoalBounds::FALLBACK.check(goals)
    }

    /// Human-readable explanation of a set of goals
    pub fn explain(goals: &DailyGoals, reason: Option<&FallbackReason>) -> String {
        let targets = format!(
            "{} steps, {} kcal and {} heart points",
            goals.steps_goal(),
            goals.calories_goal(),
            goals.heart_points_goal()
        );

        match goals.calculation_source() {
            CalculationSource::WhoStandard => format!(
                "Your targets for today are {}, personalized from your profile using WHO \
                 activity guidelines and standard energy-expenditure equations.",
                targets
            ),
            CalculationSource::UserAdjusted => {
                format!("Your targets for today are {}, as you set them.", targets)
            }
            CalculationSource::FallbackDefault => {
                let cause = reason
                    .map(|r| format!(" because {}", r))
                    .unwrap_or_default();
                format!(
                    "Your targets for today are conservative defaults of {}{}. Add your age, \
                     gender, height and weight to your profile to get personalized targets.",
                    targets, cause
                )
            }
        }
    }
}
