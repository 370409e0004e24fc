//! Error types for Synheart Goals

use thiserror::Error;

/// Reasons a biometric profile cannot become a calculation input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Field {0} is not a finite number")]
    NonFinite(&'static str),
}

/// Errors that can occur while calculating daily goals
#[derive(Debug, Error)]
pub enum GoalsError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Profile store error: {0}")]
    Profile(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Goals out of bounds: {0}")]
    OutOfBounds(String),

    #[error("Catastrophic failure: {0}")]
    Catastrophic(String),
}

impl GoalsError {
    /// Stable error class name, recorded by the performance monitor
    pub fn kind(&self) -> &'static str {
        match self {
            GoalsError::Validation(_) => "validation",
            GoalsError::Arithmetic(_) => "arithmetic",
            GoalsError::Cache(_) => "cache",
            GoalsError::Profile(_) => "profile",
            GoalsError::Config(_) => "config",
            GoalsError::Json(_) => "json",
            GoalsError::OutOfBounds(_) => "out_of_bounds",
            GoalsError::Catastrophic(_) => "catastrophic",
        }
    }

    /// Whether the adjusted fallback path can handle this error.
    ///
    /// Catastrophic failures only terminate in the emergency constants.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GoalsError::Catastrophic(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err: GoalsError = ValidationError::MissingField("age").into();
        assert_eq!(err.kind(), "validation");
        assert!(err.is_recoverable());

        let err = GoalsError::Catastrophic("task panicked".to_string());
        assert_eq!(err.kind(), "catastrophic");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_out_of_range_message() {
        let err = ValidationError::OutOfRange {
            field: "height_cm",
            value: -1.0,
            min: 50.0,
            max: 300.0,
        };
        assert_eq!(
            err.to_string(),
            "Field height_cm out of range: -1 (expected 50..=300)"
        );
    }
}
