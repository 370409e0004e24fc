//! Daily energy-expenditure target
//!
//! BMR comes from the revised Harris-Benedict equations (Roza & Shizgal,
//! 1984) when gender is known. For unspecified gender we use Mifflin-St Jeor
//! (1990) with the midpoint of the male (+5) and female (-161) constants.
//! TDEE = BMR x activity factor.

use crate::config::CalorieConfig;
use crate::types::{Gender, GoalBounds};
use crate::validator::CalculationInput;
use serde::Serialize;

use super::GoalCalculator;

/// BMR equation used for a calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BmrFormula {
    HarrisBenedict,
    MifflinStJeorBlend,
}

impl BmrFormula {
    pub fn for_gender(gender: Gender) -> Self {
        match gender {
            Gender::Male | Gender::Female => BmrFormula::HarrisBenedict,
            Gender::Unspecified => BmrFormula::MifflinStJeorBlend,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BmrFormula::HarrisBenedict => "harris_benedict",
            BmrFormula::MifflinStJeorBlend => "mifflin_st_jeor_blend",
        }
    }
}

/// Intermediate values of a calorie calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalorieBreakdown {
    pub bmr_formula: BmrFormula,
    /// Basal metabolic rate (kcal/day)
    pub bmr: f64,
    pub activity_factor: f64,
    /// Total daily energy expenditure (kcal/day), before clamping
    pub tdee: f64,
}

/// Calorie calculator
#[derive(Debug, Clone, Default)]
pub struct CalorieCalculator {
    config: CalorieConfig,
}

impl CalorieCalculator {
    pub fn new(config: CalorieConfig) -> Self {
        Self { config }
    }

    pub fn breakdown(&self, input: &CalculationInput) -> CalorieBreakdown {
        let bmr_formula = BmrFormula::for_gender(input.gender());
        let bmr = basal_metabolic_rate(input);
        let activity_factor = self.config.activity.factor(input.activity_level());

        CalorieBreakdown {
            bmr_formula,
            bmr,
            activity_factor,
            tdee: bmr * activity_factor,
        }
    }
}

impl GoalCalculator for CalorieCalculator {
    fn name(&self) -> &'static str {
        "calories"
    }

    fn bounds(&self) -> (u32, u32) {
        (
            GoalBounds::MEDICAL.min_calories,
            GoalBounds::MEDICAL.max_calories,
        )
    }

    fn raw_target(&self, input: &CalculationInput) -> f64 {
        self.breakdown(input).tdee
    }
}

/// BMR in kcal/day for the given input
pub fn basal_metabolic_rate(input: &CalculationInput) -> f64 {
    let weight = input.weight_kg();
    let height = input.height_cm();
    let age = input.age() as f64;

    match input.gender() {
        Gender::Male => 88.362 + 13.397 * weight + 4.799 * height - 5.677 * age,
        Gender::Female => 447.593 + 9.247 * weight + 3.098 * height - 4.330 * age,
        Gender::Unspecified => {
            let midpoint_constant = (5.0 + -161.0) / 2.0;
            10.0 * weight + 6.25 * height - 5.0 * age + midpoint_constant
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActivityLevel;

    #[test]
    fn test_harris_benedict_male() {
        let input =
            CalculationInput::new(30, Gender::Male, 175.0, 75.0, ActivityLevel::Moderate).unwrap();
        // 88.362 + 1004.775 + 839.825 - 170.31
        assert!((basal_metabolic_rate(&input) - 1762.652).abs() < 0.001);

        let calories = CalorieCalculator::default().compute(&input).unwrap();
        assert!((2_200..=2_600).contains(&calories));
    }

    #[test]
    fn test_harris_benedict_female() {
        let input =
            CalculationInput::new(30, Gender::Female, 165.0, 60.0, ActivityLevel::Light).unwrap();
        // 447.593 + 554.82 + 511.17 - 129.9
        assert!((basal_metabolic_rate(&input) - 1383.683).abs() < 0.001);

        let breakdown = CalorieCalculator::default().breakdown(&input);
        assert_eq!(breakdown.bmr_formula, BmrFormula::HarrisBenedict);
        assert_eq!(breakdown.activity_factor, 1.375);
    }

    #[test]
    fn test_mifflin_blend_for_unspecified() {
        let input =
            CalculationInput::new(70, Gender::Unspecified, 170.0, 65.0, ActivityLevel::Moderate)
                .unwrap();
        // 650 + 1062.5 - 350 - 78
        assert!((basal_metabolic_rate(&input) - 1284.5).abs() < 0.001);
        assert_eq!(
            CalorieCalculator::default().breakdown(&input).bmr_formula,
            BmrFormula::MifflinStJeorBlend
        );
    }

    #[test]
    fn test_clamped_low_for_tiny_input() {
        let input =
            CalculationInput::new(120, Gender::Unspecified, 50.0, 10.0, ActivityLevel::Sedentary)
                .unwrap();
        assert!(basal_metabolic_rate(&input) < 0.0);
        assert_eq!(CalorieCalculator::default().compute(&input).unwrap(), 1_200);
    }

    #[test]
    fn test_clamped_high_for_large_input() {
        let input =
            CalculationInput::new(20, Gender::Male, 210.0, 160.0, ActivityLevel::VeryActive)
                .unwrap();
        assert_eq!(CalorieCalculator::default().compute(&input).unwrap(), 4_000);
    }

    #[test]
    fn test_nan_factor_is_arithmetic_error() {
        let mut config = CalorieConfig::default();
        config.activity.moderate = f64::NAN;
        let input =
            CalculationInput::new(30, Gender::Male, 175.0, 75.0, ActivityLevel::Moderate).unwrap();
        let result = CalorieCalculator::new(config).compute(&input);
        assert!(matches!(result, Err(crate::error::GoalsError::Arithmetic(_))));
    }
}
