//! Engine configuration
//!
//! Every multiplier used by the calculators and the fallback generator lives
//! here so that the empirically chosen constants can be tuned without touching
//! formula code. All sections deserialize with defaults, so a partial JSON
//! document only overrides what it names.

use crate::error::GoalsError;
use crate::types::{ActivityLevel, Gender};
use serde::{Deserialize, Serialize};

/// Users younger than this get the youth multiplier
pub const YOUTH_AGE_LIMIT: u32 = 18;

/// Users at or above this age get the senior multiplier
pub const SENIOR_AGE_THRESHOLD: u32 = 65;

/// Default result cache capacity (entries)
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Default result cache time-to-live (seconds)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Default rolling history window for duration statistics (samples)
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Per-activity-level multipliers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityLadder {
    pub sedentary: f64,
    pub light: f64,
    pub moderate: f64,
    pub active: f64,
    pub very_active: f64,
}

impl ActivityLadder {
    pub fn factor(&self, level: ActivityLevel) -> f64 {
        match level {
            ActivityLevel::Sedentary => self.sedentary,
            ActivityLevel::Light => self.light,
            ActivityLevel::Moderate => self.moderate,
            ActivityLevel::Active => self.active,
            ActivityLevel::VeryActive => self.very_active,
        }
    }

    fn values(&self) -> [f64; 5] {
        [
            self.sedentary,
            self.light,
            self.moderate,
            self.active,
            self.very_active,
        ]
    }

    /// Linear ladder from sedentary 0.8 to very active 1.3
    pub const fn movement() -> Self {
        Self {
            sedentary: 0.8,
            light: 0.925,
            moderate: 1.05,
            active: 1.175,
            very_active: 1.3,
        }
    }
}

/// Age-band multipliers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeMultipliers {
    /// Applied below [`YOUTH_AGE_LIMIT`]
    pub youth: f64,
    pub adult: f64,
    /// Applied at or above [`SENIOR_AGE_THRESHOLD`]
    pub senior: f64,
}

impl AgeMultipliers {
    pub fn for_age(&self, age: u32) -> f64 {
        if age < YOUTH_AGE_LIMIT {
            self.youth
        } else if age >= SENIOR_AGE_THRESHOLD {
            self.senior
        } else {
            self.adult
        }
    }

    /// Same as [`for_age`](Self::for_age) but neutral when age is unknown
    pub fn for_optional_age(&self, age: Option<u32>) -> f64 {
        age.map_or(self.adult, |a| self.for_age(a))
    }
}

/// Gender nudges (neutral for unspecified)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenderMultipliers {
    pub male: f64,
    pub female: f64,
    pub unspecified: f64,
}

impl GenderMultipliers {
    pub fn for_gender(&self, gender: Gender) -> f64 {
        match gender {
            Gender::Male => self.male,
            Gender::Female => self.female,
            Gender::Unspecified => self.unspecified,
        }
    }
}

/// Steps calculator constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepsConfig {
    /// WHO daily-steps reference
    pub baseline: f64,
    pub age: AgeMultipliers,
    pub gender: GenderMultipliers,
    pub activity: ActivityLadder,
}

impl Default for StepsConfig {
    fn default() -> Self {
        Self {
            baseline: 10_000.0,
            age: AgeMultipliers {
                youth: 1.15,
                adult: 1.0,
                senior: 0.85,
            },
            gender: GenderMultipliers {
                male: 1.03,
                female: 0.97,
                unspecified: 1.0,
            },
            activity: ActivityLadder::movement(),
        }
    }
}

/// Calorie calculator constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalorieConfig {
    /// TDEE = BMR x activity factor
    pub activity: ActivityLadder,
}

impl Default for CalorieConfig {
    fn default() -> Self {
        Self {
            activity: ActivityLadder {
                sedentary: 1.2,
                light: 1.375,
                moderate: 1.465,
                active: 1.725,
                very_active: 1.9,
            },
        }
    }
}

/// Heart points calculator constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartPointsConfig {
    /// WHO recommendation of moderate activity per week
    pub weekly_moderate_minutes: f64,
    /// Points earned per moderate-intensity minute
    pub points_per_moderate_minute: f64,
    pub age: AgeMultipliers,
    pub activity: ActivityLadder,
}

impl Default for HeartPointsConfig {
    fn default() -> Self {
        Self {
            weekly_moderate_minutes: 150.0,
            points_per_moderate_minute: 1.0,
            age: AgeMultipliers {
                youth: 1.15,
                adult: 1.0,
                senior: 0.85,
            },
            activity: ActivityLadder::movement(),
        }
    }
}

/// Fallback generator constants.
///
/// The ranges are deliberately narrower than the standard calculators so a
/// degraded result stays conservative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub steps_baseline: f64,
    pub calories_male: f64,
    pub calories_female: f64,
    pub calories_unspecified: f64,
    pub heart_points_baseline: f64,
    pub age: AgeMultipliers,
    pub gender: GenderMultipliers,
}

impl FallbackConfig {
    pub fn calories_for(&self, gender: Gender) -> f64 {
        match gender {
            Gender::Male => self.calories_male,
            Gender::Female => self.calories_female,
            Gender::Unspecified => self.calories_unspecified,
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            steps_baseline: 7_500.0,
            calories_male: 2_200.0,
            calories_female: 1_800.0,
            calories_unspecified: 2_000.0,
            heart_points_baseline: 21.0,
            age: AgeMultipliers {
                youth: 1.05,
                adult: 1.0,
                senior: 0.9,
            },
            gender: GenderMultipliers {
                male: 1.02,
                female: 0.98,
                unspecified: 1.0,
            },
        }
    }
}

/// Result cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

/// Thresholds evaluated by the performance monitor's insights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightThresholds {
    pub slow_average_ms: f64,
    pub critical_average_ms: f64,
    pub min_success_rate: f64,
    pub min_cache_hit_rate: f64,
    pub max_memory_ratio: f64,
    pub max_fallback_rate: f64,
    /// Rate-based insights stay silent until this many requests were seen
    pub min_samples_for_rates: u64,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            slow_average_ms: 500.0,
            critical_average_ms: 2_000.0,
            min_success_rate: 0.95,
            min_cache_hit_rate: 0.30,
            max_memory_ratio: 0.80,
            max_fallback_rate: 0.10,
            min_samples_for_rates: 10,
        }
    }
}

/// Performance monitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub history_size: usize,
    pub thresholds: InsightThresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_size: DEFAULT_HISTORY_SIZE,
            thresholds: InsightThresholds::default(),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub monitor: MonitorConfig,
    pub steps: StepsConfig,
    pub calories: CalorieConfig,
    pub heart_points: HeartPointsConfig,
    pub fallback: FallbackConfig,
}

impl EngineConfig {
    /// Load configuration from JSON; missing sections take defaults
    pub fn from_json(json: &str) -> Result<Self, GoalsError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, GoalsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings that would make the engine unusable or produce
    /// non-finite goals
    pub fn validate(&self) -> Result<(), GoalsError> {
        if self.cache.capacity == 0 {
            return Err(GoalsError::Config("cache.capacity must be > 0".to_string()));
        }
        if self.monitor.history_size == 0 {
            return Err(GoalsError::Config(
                "monitor.history_size must be > 0".to_string(),
            ));
        }

        let mut factors: Vec<(&str, f64)> = vec![
            ("steps.baseline", self.steps.baseline),
            (
                "heart_points.weekly_moderate_minutes",
                self.heart_points.weekly_moderate_minutes,
            ),
            (
                "heart_points.points_per_moderate_minute",
                self.heart_points.points_per_moderate_minute,
            ),
            ("fallback.steps_baseline", self.fallback.steps_baseline),
            ("fallback.calories_male", self.fallback.calories_male),
            ("fallback.calories_female", self.fallback.calories_female),
            ("fallback.calories_unspecified", self.fallback.calories_unspecified),
            ("fallback.heart_points_baseline", self.fallback.heart_points_baseline),
        ];
        for ladder in [
            self.steps.activity,
            self.calories.activity,
            self.heart_points.activity,
        ] {
            factors.extend(ladder.values().into_iter().map(|v| ("activity ladder", v)));
        }
        for age in [self.steps.age, self.heart_points.age, self.fallback.age] {
            factors.extend([
                ("age multiplier", age.youth),
                ("age multiplier", age.adult),
                ("age multiplier", age.senior),
            ]);
        }
        for gender in [self.steps.gender, self.fallback.gender] {
            factors.extend([
                ("gender multiplier", gender.male),
                ("gender multiplier", gender.female),
                ("gender multiplier", gender.unspecified),
            ]);
        }

        for (name, value) in factors {
            if !value.is_finite() || value <= 0.0 {
                return Err(GoalsError::Config(format!(
                    "{} must be a positive finite number, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}
