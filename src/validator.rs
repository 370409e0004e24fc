//! Input validation
//!
//! The validator is the sole gate between untrusted profile data and the
//! calculators. A [`CalculationInput`] can only be built with every field
//! inside plausible human bounds.

use crate::error::ValidationError;
use crate::types::{ActivityLevel, BiometricProfile, Gender};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::ops::RangeInclusive;

/// Plausible age range (years)
pub const AGE_RANGE: RangeInclusive<f64> = 0.0..=120.0;

/// Plausible height range (cm)
pub const HEIGHT_RANGE_CM: RangeInclusive<f64> = 50.0..=300.0;

/// Plausible weight range (kg)
pub const WEIGHT_RANGE_KG: RangeInclusive<f64> = 10.0..=500.0;

/// Sanitized, range-checked copy of a biometric profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalculationInput {
    age: u32,
    gender: Gender,
    height_cm: f64,
    weight_kg: f64,
    activity_level: ActivityLevel,
}

impl CalculationInput {
    pub fn new(
        age: u32,
        gender: Gender,
        height_cm: f64,
        weight_kg: f64,
        activity_level: ActivityLevel,
    ) -> Result<Self, ValidationError> {
        check_range("age", age as f64, &AGE_RANGE)?;
        check_range("height_cm", height_cm, &HEIGHT_RANGE_CM)?;
        check_range("weight_kg", weight_kg, &WEIGHT_RANGE_KG)?;

        Ok(Self {
            age,
            gender,
            height_cm,
            weight_kg,
            activity_level,
        })
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn height_cm(&self) -> f64 {
        self.height_cm
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    pub fn activity_level(&self) -> ActivityLevel {
        self.activity_level
    }
}

fn check_range(
    field: &'static str,
    value: f64,
    range: &RangeInclusive<f64>,
) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    if !range.contains(&value) {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        });
    }
    Ok(())
}

/// Validator turning raw profiles into calculation inputs
pub struct InputValidator;

impl InputValidator {
    /// Validate a profile, deriving age against today's UTC date
    pub fn validate(profile: &BiometricProfile) -> Result<CalculationInput, ValidationError> {
        Self::validate_on(profile, Utc::now().date_naive())
    }

    /// Validate a profile, deriving age against the given date.
    ///
    /// Age, gender, height and weight are required. A missing activity level
    /// is treated as [`ActivityLevel::Moderate`].
    pub fn validate_on(
        profile: &BiometricProfile,
        today: NaiveDate,
    ) -> Result<CalculationInput, ValidationError> {
        let age = profile
            .age_on(today)
            .ok_or(ValidationError::MissingField("age"))?;
        let gender = profile
            .gender
            .ok_or(ValidationError::MissingField("gender"))?;
        let height_cm = profile
            .height_cm
            .ok_or(ValidationError::MissingField("height_cm"))?;
        let weight_kg = profile
            .weight_kg
            .ok_or(ValidationError::MissingField("weight_kg"))?;

        if age < 0 {
            return Err(ValidationError::OutOfRange {
                field: "age",
                value: age as f64,
                min: *AGE_RANGE.start(),
                max: *AGE_RANGE.end(),
            });
        }

        CalculationInput::new(
            age as u32,
            gender,
            height_cm,
            weight_kg,
            profile.activity_level.unwrap_or_default(),
        )
    }
}
