//! Core types for the Synheart Goals engine
//!
//! This module defines the data that flows through the engine: the raw
//! biometric profile supplied by the host, the daily goals handed back, and
//! the medical-safety bounds every goal must respect.

use crate::error::GoalsError;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Biological gender as used by the BMR formulas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unspecified,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unspecified => "unspecified",
        }
    }
}

/// Self-reported activity level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    #[default]
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very_active",
        }
    }
}

/// Biometric profile as stored by the host application.
///
/// Any field may be missing or hold an implausible value; the validator is
/// the only way from here to the calculators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiometricProfile {
    /// Age in years. Takes precedence over `birth_date` when both are set.
    pub age: Option<i32>,
    /// Birth date, used to derive age when `age` is absent
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
}

impl BiometricProfile {
    /// Age in whole years on the given day
    pub fn age_on(&self, today: NaiveDate) -> Option<i32> {
        if self.age.is_some() {
            return self.age;
        }
        self.birth_date.map(|born| {
            let mut years = today.year() - born.year();
            if (today.month(), today.day()) < (born.month(), born.day()) {
                years -= 1;
            }
            years
        })
    }

    /// Age in whole years today (UTC)
    pub fn current_age(&self) -> Option<i32> {
        self.age_on(Utc::now().date_naive())
    }
}

/// Where a set of daily goals came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationSource {
    /// Full standards-based formulas over a complete, valid profile
    WhoStandard,
    /// Conservative defaults from the fallback generator
    FallbackDefault,
    /// Manual override recorded by the user
    UserAdjusted,
}

impl CalculationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationSource::WhoStandard => "WHO_STANDARD",
            CalculationSource::FallbackDefault => "FALLBACK_DEFAULT",
            CalculationSource::UserAdjusted => "USER_ADJUSTED",
        }
    }
}

impl fmt::Display for CalculationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive bounds for the three daily goals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalBounds {
    pub min_steps: u32,
    pub max_steps: u32,
    pub min_calories: u32,
    pub max_calories: u32,
    pub min_heart_points: u32,
    pub max_heart_points: u32,
}

impl GoalBounds {
    /// Medical-safety bounds every goal must satisfy regardless of source
    pub const MEDICAL: GoalBounds = GoalBounds {
        min_steps: 5_000,
        max_steps: 20_000,
        min_calories: 1_200,
        max_calories: 4_000,
        min_heart_points: 15,
        max_heart_points: 50,
    };

    /// Tighter bounds for degraded (fallback) results
    pub const FALLBACK: GoalBounds = GoalBounds {
        min_steps: 6_000,
        max_steps: 9_000,
        min_calories: 1_400,
        max_calories: 2_400,
        min_heart_points: 17,
        max_heart_points: 25,
    };

    pub const fn contains_values(&self, steps: u32, calories: u32, heart_points: u32) -> bool {
        steps >= self.min_steps
            && steps <= self.max_steps
            && calories >= self.min_calories
            && calories <= self.max_calories
            && heart_points >= self.min_heart_points
            && heart_points <= self.max_heart_points
    }

    pub fn contains(&self, goals: &DailyGoals) -> bool {
        self.contains_values(goals.steps_goal, goals.calories_goal, goals.heart_points_goal)
    }

    /// Return an error naming the first goal outside these bounds
    pub fn check_values(
        &self,
        steps: u32,
        calories: u32,
        heart_points: u32,
    ) -> Result<(), GoalsError> {
        if steps < self.min_steps || steps > self.max_steps {
            return Err(GoalsError::OutOfBounds(format!(
                "steps {} outside {}..={}",
                steps, self.min_steps, self.max_steps
            )));
        }
        if calories < self.min_calories || calories > self.max_calories {
            return Err(GoalsError::OutOfBounds(format!(
                "calories {} outside {}..={}",
                calories, self.min_calories, self.max_calories
            )));
        }
        if heart_points < self.min_heart_points || heart_points > self.max_heart_points {
            return Err(GoalsError::OutOfBounds(format!(
                "heart points {} outside {}..={}",
                heart_points, self.min_heart_points, self.max_heart_points
            )));
        }
        Ok(())
    }

    pub fn check(&self, goals: &DailyGoals) -> Result<(), GoalsError> {
        self.check_values(goals.steps_goal, goals.calories_goal, goals.heart_points_goal)
    }
}

/// Personalized daily targets.
///
/// Immutable once built; every constructor enforces [`GoalBounds::MEDICAL`],
/// including deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedDailyGoals")]
pub struct DailyGoals {
    steps_goal: u32,
    calories_goal: u32,
    heart_points_goal: u32,
    calculated_at: DateTime<Utc>,
    calculation_source: CalculationSource,
}

impl DailyGoals {
    /// Build goals, rejecting anything outside the medical-safety bounds
    pub fn new(
        steps_goal: u32,
        calories_goal: u32,
        heart_points_goal: u32,
        calculation_source: CalculationSource,
        calculated_at: DateTime<Utc>,
    ) -> Result<Self, GoalsError> {
        GoalBounds::MEDICAL.check_values(steps_goal, calories_goal, heart_points_goal)?;
        Ok(Self {
            steps_goal,
            calories_goal,
            heart_points_goal,
            calculated_at,
            calculation_source,
        })
    }

    /// Record a manual override from the user
    pub fn user_adjusted(
        steps_goal: u32,
        calories_goal: u32,
        heart_points_goal: u32,
    ) -> Result<Self, GoalsError> {
        Self::new(
            steps_goal,
            calories_goal,
            heart_points_goal,
            CalculationSource::UserAdjusted,
            Utc::now(),
        )
    }

    /// Build goals from values already proven to lie within bounds at
    /// compile time (see the emergency constants in `fallback`).
    pub(crate) const fn from_trusted(
        steps_goal: u32,
        calories_goal: u32,
        heart_points_goal: u32,
        calculation_source: CalculationSource,
        calculated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            steps_goal,
            calories_goal,
            heart_points_goal,
            calculated_at,
            calculation_source,
        }
    }

    pub fn steps_goal(&self) -> u32 {
        self.steps_goal
    }

    pub fn calories_goal(&self) -> u32 {
        self.calories_goal
    }

    pub fn heart_points_goal(&self) -> u32 {
        self.heart_points_goal
    }

    pub fn calculated_at(&self) -> DateTime<Utc> {
        self.calculated_at
    }

    pub fn calculation_source(&self) -> CalculationSource {
        self.calculation_source
    }

    pub fn is_fallback(&self) -> bool {
        self.calculation_source == CalculationSource::FallbackDefault
    }
}

/// Wire shape of [`DailyGoals`] before bound checking
#[derive(Debug, Deserialize)]
struct UncheckedDailyGoals {
    steps_goal: u32,
    calories_goal: u32,
    heart_points_goal: u32,
    calculated_at: DateTime<Utc>,
    calculation_source: CalculationSource,
}

impl TryFrom<UncheckedDailyGoals> for DailyGoals {
    type Error = GoalsError;

    fn try_from(raw: UncheckedDailyGoals) -> Result<Self, Self::Error> {
        DailyGoals::new(
            raw.steps_goal,
            raw.calories_goal,
            raw.heart_points_goal,
            raw.calculation_source,
            raw.calculated_at,
        )
    }
}
