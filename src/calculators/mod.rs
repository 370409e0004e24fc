//! Standards-based goal calculators
//!
//! Each calculator is a pure function of a validated [`CalculationInput`]:
//! no I/O, no shared state, same input gives the same goal. They hold only
//! their own copy of the configured multipliers, so the orchestrator can move
//! them onto separate tasks freely.

mod calories;
mod heart_points;
mod steps;

pub use calories::{BmrFormula, CalorieBreakdown, CalorieCalculator};
pub use heart_points::{HeartPointsBreakdown, HeartPointsCalculator};
pub use steps::{StepsBreakdown, StepsCalculator};

use crate::error::GoalsError;
use crate::validator::CalculationInput;

/// A calculator producing one bounded daily goal
pub trait GoalCalculator {
    /// Goal name used in errors and logs
    fn name(&self) -> &'static str;

    /// Inclusive medical-safety bounds for this goal
    fn bounds(&self) -> (u32, u32);

    /// Unclamped target before rounding
    fn raw_target(&self, input: &CalculationInput) -> f64;

    /// Rounded target clamped into [`bounds`](Self::bounds).
    ///
    /// Fails only when the formula yields a non-finite intermediate, which a
    /// validated input cannot cause on its own.
    fn compute(&self, input: &CalculationInput) -> Result<u32, GoalsError> {
        let raw = self.raw_target(input);
        let (min, max) = self.bounds();
        bounded_goal(self.name(), raw, min, max)
    }
}

/// Round and clamp a raw target, rejecting NaN and infinities
pub(crate) fn bounded_goal(name: &str, raw: f64, min: u32, max: u32) -> Result<u32, GoalsError> {
    if !raw.is_finite() {
        return Err(GoalsError::Arithmetic(format!(
            "{} formula produced a non-finite value ({})",
            name, raw
        )));
    }
    Ok(raw.round().clamp(min as f64, max as f64) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_goal_clamps() {
        assert_eq!(bounded_goal("steps", 25_000.4, 5_000, 20_000).unwrap(), 20_000);
        assert_eq!(bounded_goal("steps", -3.0, 5_000, 20_000).unwrap(), 5_000);
        assert_eq!(bounded_goal("steps", 8_000.6, 5_000, 20_000).unwrap(), 8_001);
    }

    #[test]
    fn test_bounded_goal_rejects_nan() {
        let result = bounded_goal("calories", f64::NAN, 1_200, 4_000);
        assert!(matches!(result, Err(GoalsError::Arithmetic(_))));

        let result = bounded_goal("calories", f64::INFINITY, 1_200, 4_000);
        assert!(matches!(result, Err(GoalsError::Arithmetic(_))));
    }
}
