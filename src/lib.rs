//! Synheart Goals - On-device engine for personalized daily wellness targets
//!
//! Goals turns a biometric profile into daily steps, calorie and heart-point
//! targets through a deterministic pipeline: validation → cache lookup →
//! concurrent calculation → bound check → cache store. Any failure degrades to
//! conservative fallback goals; callers always receive a usable result.
//!
//! ## Modules
//!
//! - **Calculators**: WHO-based steps and heart points, BMR x activity calories
//! - **Fallback**: Bounded defaults for missing or unusable profiles
//! - **Cache / Monitor**: Result reuse and rolling performance insights

pub mod cache;
pub mod calculators;
pub mod config;
pub mod error;
pub mod fallback;
pub mod monitor;
pub mod pipeline;
pub mod profile;
pub mod types;
pub mod validator;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use error::{GoalsError, ValidationError};
pub use fallback::{FallbackGenerator, FallbackReason};
pub use monitor::{Insight, PerformanceMetrics};
pub use pipeline::{profile_to_daily_goals, CalculationBreakdown, GoalsEngine};
pub use profile::{InMemoryProfileStore, ProfileStore};
pub use types::{
    ActivityLevel, BiometricProfile, CalculationSource, DailyGoals, Gender, GoalBounds,
};
pub use validator::{CalculationInput, InputValidator};

/// Library version
pub const GOALS_VERSION: &str = env!("CARGO_PKG_VERSION");
