//! Calculation orchestration
//!
//! This module provides the public API for Synheart Goals. Per request:
//!
//! 1. Validate - profile to [`CalculationInput`]
//! 2. Cache lookup - by input fingerprint; a hit ends the request
//! 3. Compute - steps, calories and heart points concurrently
//! 4. Assemble + bound check - into [`DailyGoals`]
//! 5. Cache store
//!
//! Any error along the way is recorded and answered by the fallback
//! generator, so callers always receive goals.

use crate::cache::{fingerprint, CacheStats, ResultCache};
use crate::calculators::{
    CalorieBreakdown, CalorieCalculator, GoalCalculator, HeartPointsBreakdown,
    HeartPointsCalculator, StepsBreakdown, StepsCalculator,
};
use crate::config::EngineConfig;
use crate::error::{GoalsError, ValidationError};
use crate::fallback::{FallbackGenerator, FallbackReason};
use crate::monitor::{Insight, PerformanceMetrics, PerformanceMonitor};
use crate::profile::{InMemoryProfileStore, ProfileStore};
use crate::types::{BiometricProfile, CalculationSource, DailyGoals, GoalBounds};
use crate::validator::{CalculationInput, InputValidator};
use chrono::Utc;
use futures_util::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Calculate goals for a single profile given as JSON (stateless, one-shot).
///
/// Returns the goals as JSON. Only malformed JSON is an error; a profile
/// that parses but cannot be used still yields fallback goals.
///
/// # Example
/// ```ignore
/// let goals_json = profile_to_daily_goals(r#"{"age": 30, "gender": "male"}"#).await?;
/// ```
pub async fn profile_to_daily_goals(profile_json: &str) -> Result<String, GoalsError> {
    let profile: BiometricProfile = serde_json::from_str(profile_json)?;
    let engine = GoalsEngine::new(Arc::new(InMemoryProfileStore::new()));
    let goals = engine.calculate_for_profile("anonymous", Some(profile)).await;
    Ok(serde_json::to_string(&goals)?)
}

/// Intermediate values behind a set of goals, for transparency screens
#[derive(Debug, Clone, Serialize)]
pub struct CalculationBreakdown {
    pub input: CalculationInput,
    pub fingerprint: String,
    pub steps: StepsBreakdown,
    pub calories: CalorieBreakdown,
    pub heart_points: HeartPointsBreakdown,
    pub goals: DailyGoals,
}

/// How a successful calculation was resolved
enum Resolution {
    CacheHit(DailyGoals),
    Computed(DailyGoals),
}

/// Shared mutable state; cache and metrics sit behind one lock
struct EngineState {
    cache: ResultCache,
    monitor: PerformanceMonitor,
}

/// Goal calculation engine.
///
/// Construct one per application and share it by reference (or `Arc`);
/// all methods take `&self`.
pub struct GoalsEngine {
    store: Arc<dyn ProfileStore>,
    config: EngineConfig,
    steps: StepsCalculator,
    calories: CalorieCalculator,
    heart_points: HeartPointsCalculator,
    fallback: FallbackGenerator,
    state: Mutex<EngineState>,
    instance_id: String,
}

impl GoalsEngine {
    /// Create an engine with the default configuration
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self::build(store, EngineConfig::default())
    }

    /// Create an engine with a custom configuration
    pub fn with_config(
        store: Arc<dyn ProfileStore>,
        config: EngineConfig,
    ) -> Result<Self, GoalsError> {
        config.validate()?;
        Ok(Self::build(store, config))
    }

    fn build(store: Arc<dyn ProfileStore>, config: EngineConfig) -> Self {
        Self {
            store,
            steps: StepsCalculator::new(config.steps.clone()),
            calories: CalorieCalculator::new(config.calories.clone()),
            heart_points: HeartPointsCalculator::new(config.heart_points.clone()),
            fallback: FallbackGenerator::new(config.fallback.clone()),
            state: Mutex::new(EngineState {
                cache: ResultCache::from_config(&config.cache),
                monitor: PerformanceMonitor::new(&config.monitor),
            }),
            instance_id: Uuid::new_v4().to_string(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Calculate today's goals for a user. Never fails.
    ///
    /// Results are handed to the profile store; a store failure is logged
    /// and does not affect the returned goals.
    pub async fn calculate_goals(&self, user_id: &str) -> DailyGoals {
        let profile = match self.store.get_profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id, error = %e, "profile lookup failed");
                None
            }
        };

        let goals = self.calculate_for_profile(user_id, profile).await;

        if let Err(e) = self.store.save_goals(user_id, &goals).await {
            warn!(user_id, error = %e, "failed to persist goals");
        }

        goals
    }

    /// Calculate goals for several users concurrently, in input order
    pub async fn calculate_goals_for(&self, user_ids: &[String]) -> Vec<DailyGoals> {
        join_all(user_ids.iter().map(|id| self.calculate_goals(id))).await
    }

    /// Calculate goals for an already loaded profile. Never fails.
    pub async fn calculate_for_profile(
        &self,
        user_id: &str,
        profile: Option<BiometricProfile>,
    ) -> DailyGoals {
        let span = info_span!(
            "calculate_goals",
            user_id,
            request_id = %Uuid::new_v4(),
            engine = %self.instance_id
        );
        self.calculate_inner(user_id, profile).instrument(span).await
    }

    async fn calculate_inner(
        &self,
        user_id: &str,
        profile: Option<BiometricProfile>,
    ) -> DailyGoals {
        let started = Instant::now();

        let result = match profile.as_ref() {
            Some(profile) => self.try_calculate(profile).await,
            None => Err(GoalsError::Validation(ValidationError::MissingField("profile"))),
        };

        match result {
            Ok(Resolution::CacheHit(goals)) => {
                self.state.lock().monitor.record_cache_hit(started.elapsed());
                debug!(user_id, "served goals from cache");
                goals
            }
            Ok(Resolution::Computed(goals)) => {
                let elapsed = started.elapsed();
                self.state.lock().monitor.record_success(elapsed);
                info!(
                    user_id,
                    steps = goals.steps_goal(),
                    calories = goals.calories_goal(),
                    heart_points = goals.heart_points_goal(),
                    duration_us = elapsed.as_micros() as u64,
                    "calculated goals"
                );
                goals
            }
            Err(e) => {
                self.state.lock().monitor.record_failure(started.elapsed(), &e);

                let reason = match profile {
                    None => FallbackReason::MissingProfile,
                    Some(_) => FallbackReason::from(&e),
                };

                let fallback_started = Instant::now();
                let goals = if e.is_recoverable() {
                    self.fallback.generate(user_id, profile.as_ref(), Some(&reason))
                } else {
                    FallbackGenerator::emergency_fallback(user_id)
                };
                self.state
                    .lock()
                    .monitor
                    .record_fallback(fallback_started.elapsed());
                goals
            }
        }
    }

    async fn try_calculate(&self, profile: &BiometricProfile) -> Result<Resolution, GoalsError> {
        let input = InputValidator::validate(profile)?;
        let key = fingerprint(&input);

        let cached = self.state.lock().cache.get(&key);
        match cached {
            Ok(Some(goals)) => return Ok(Resolution::CacheHit(goals)),
            Ok(None) => debug!(fingerprint = &key[..12], "cache miss"),
            Err(e) => warn!(error = %e, "cache lookup failed; treating as miss"),
        }

        let goals = self.compute(input).await?;

        self.state.lock().cache.put(key, goals.clone());
        Ok(Resolution::Computed(goals))
    }

    /// Run the three calculators concurrently and assemble the result
    async fn compute(&self, input: CalculationInput) -> Result<DailyGoals, GoalsError> {
        let (steps, calories, heart_points) = tokio::try_join!(
            run_calculator(self.steps.clone(), input),
            run_calculator(self.calories.clone(), input),
            run_calculator(self.heart_points.clone(), input),
        )?;

        DailyGoals::new(
            steps,
            calories,
            heart_points,
            CalculationSource::WhoStandard,
            Utc::now(),
        )
    }

    /// Whether the store holds in-bounds goals calculated today (UTC)
    pub async fn has_valid_goals(&self, user_id: &str) -> bool {
        match self.store.get_goals(user_id).await {
            Ok(Some(goals)) => {
                GoalBounds::MEDICAL.contains(&goals)
                    && goals.calculated_at().date_naive() == Utc::now().date_naive()
            }
            Ok(None) => false,
            Err(e) => {
                warn!(user_id, error = %e, "goal lookup failed");
                false
            }
        }
    }

    /// Intermediate values for a user's goals; `None` without a usable profile
    pub async fn get_calculation_breakdown(&self, user_id: &str) -> Option<CalculationBreakdown> {
        let profile = match self.store.get_profile(user_id).await {
            Ok(profile) => profile?,
            Err(e) => {
                warn!(user_id, error = %e, "profile lookup failed");
                return None;
            }
        };

        match self.breakdown_for_profile(&profile) {
            Ok(breakdown) => Some(breakdown),
            Err(e) => {
                debug!(user_id, error = %e, "no breakdown available");
                None
            }
        }
    }

    /// Breakdown for a profile. Bypasses the cache and the monitor.
    pub fn breakdown_for_profile(
        &self,
        profile: &BiometricProfile,
    ) -> Result<CalculationBreakdown, GoalsError> {
        let input = InputValidator::validate(profile)?;
        let goals = DailyGoals::new(
            self.steps.compute(&input)?,
            self.calories.compute(&input)?,
            self.heart_points.compute(&input)?,
            CalculationSource::WhoStandard,
            Utc::now(),
        )?;

        Ok(CalculationBreakdown {
            fingerprint: fingerprint(&input),
            steps: self.steps.breakdown(&input),
            calories: self.calories.breakdown(&input),
            heart_points: self.heart_points.breakdown(&input),
            input,
            goals,
        })
    }

    pub fn performance_insights(&self) -> Vec<Insight> {
        self.state.lock().monitor.insights()
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        self.state.lock().monitor.metrics()
    }

    pub fn reset_metrics(&self) {
        self.state.lock().monitor.reset();
    }

    /// Feed a host memory reading into the monitor
    pub fn record_memory_usage(&self, used_bytes: u64, total_bytes: u64) {
        self.state
            .lock()
            .monitor
            .record_memory_usage(used_bytes, total_bytes);
    }

    pub fn cache_stats(&self) -> CacheStats {
        let state = self.state.lock();
        state.cache.stats(&state.monitor)
    }

    /// Drop expired cache entries; returns how many were removed
    pub fn sweep_expired_cache(&self) -> usize {
        self.state.lock().cache.sweep_expired()
    }

    pub fn clear_cache(&self) {
        self.state.lock().cache.clear();
    }
}

async fn run_calculator<C>(calculator: C, input: CalculationInput) -> Result<u32, GoalsError>
where
    C: GoalCalculator + Send + 'static,
{
    let name = calculator.name();
    tokio::task::spawn_blocking(move || calculator.compute(&input))
        .await
        .map_err(|e| GoalsError::Catastrophic(format!("{} calculator task failed: {}", name, e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityLevel, Gender};
    use pretty_assertions::assert_eq;

    fn scenario_a() -> BiometricProfile {
        BiometricProfile {
            age: Some(30),
            gender: Some(Gender::Male),
            height_cm: Some(175.0),
            weight_kg: Some(75.0),
            activity_level: Some(ActivityLevel::Moderate),
            ..Default::default()
        }
    }

    fn engine_with(
        profiles: &[(&str, BiometricProfile)],
    ) -> (GoalsEngine, Arc<InMemoryProfileStore>) {
        let store = Arc::new(InMemoryProfileStore::new());
        for (id, profile) in profiles {
            store.upsert_profile(*id, profile.clone());
        }
        (GoalsEngine::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_standard_calculation() {
        let (engine, _) = engine_with(&[("u1", scenario_a())]);
        let goals = engine.calculate_goals("u1").await;

        assert_eq!(goals.calculation_source(), CalculationSource::WhoStandard);
        assert_eq!(goals.steps_goal(), 10_815);
        assert!((2_200..=2_600).contains(&goals.calories_goal()));
        assert!((19..=24).contains(&goals.heart_points_goal()));
    }

    #[tokio::test]
    async fn test_second_call_is_cache_hit() {
        let (engine, _) = engine_with(&[("u1", scenario_a())]);
        let first = engine.calculate_goals("u1").await;
        let second = engine.calculate_goals("u1").await;

        assert_eq!(first, second);
        let metrics = engine.performance_metrics();
        assert_eq!(metrics.successful_calculations, 1);
        assert_eq!(metrics.cache_hits, 1);
    }

    #[tokio::test]
    async fn test_cache_shared_across_users_with_same_biometrics() {
        let (engine, _) = engine_with(&[("u1", scenario_a()), ("u2", scenario_a())]);
        let first = engine.calculate_goals("u1").await;
        let second = engine.calculate_goals("u2").await;

        assert_eq!(first, second);
        assert_eq!(engine.performance_metrics().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_missing_profile_falls_back() {
        let (engine, _) = engine_with(&[]);
        let goals = engine.calculate_goals("ghost").await;

        assert_eq!(goals.calculation_source(), CalculationSource::FallbackDefault);
        assert!(GoalBounds::FALLBACK.contains(&goals));

        let metrics = engine.performance_metrics();
        assert_eq!(metrics.failed_calculations, 1);
        assert_eq!(metrics.fallbacks_used, 1);
        assert_eq!(metrics.failures_by_kind.get("validation"), Some(&1));
    }

    #[tokio::test]
    async fn test_goals_are_persisted() {
        let (engine, store) = engine_with(&[("u1", scenario_a())]);
        assert!(!engine.has_valid_goals("u1").await);

        let goals = engine.calculate_goals("u1").await;
        assert_eq!(store.get_goals("u1").await.unwrap(), Some(goals));
        assert!(engine.has_valid_goals("u1").await);
    }

    #[tokio::test]
    async fn test_stale_goals_are_not_valid() {
        let (engine, store) = engine_with(&[]);
        let yesterday = Utc::now() - chrono::Duration::days(1);
        let goals =
            DailyGoals::new(8_000, 2_000, 20, CalculationSource::WhoStandard, yesterday).unwrap();
        store.set_goals("u1", goals);
        assert!(!engine.has_valid_goals("u1").await);
    }

    #[tokio::test]
    async fn test_breakdown() {
        let (engine, _) = engine_with(&[("u1", scenario_a())]);
        let breakdown = engine.get_calculation_breakdown("u1").await.unwrap();

        assert!((breakdown.calories.bmr - 1762.652).abs() < 0.001);
        assert_eq!(breakdown.calories.activity_factor, 1.465);
        assert_eq!(breakdown.heart_points.weekly_moderate_minutes, 150.0);
        assert_eq!(breakdown.goals.steps_goal(), 10_815);
        // Diagnostic only: nothing recorded
        assert_eq!(engine.performance_metrics().total_requests, 0);

        assert!(engine.get_calculation_breakdown("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_nan_config_falls_back() {
        let mut config = EngineConfig::default();
        config.calories.activity.moderate = f64::NAN;
        // validate() would reject this; build directly to simulate a bad deploy
        let engine = GoalsEngine::build(Arc::new(InMemoryProfileStore::new()), config);

        let goals = engine
            .calculate_for_profile("u1", Some(scenario_a()))
            .await;
        assert_eq!(goals.calculation_source(), CalculationSource::FallbackDefault);
        assert_eq!(
            engine.performance_metrics().failures_by_kind.get("arithmetic"),
            Some(&1)
        );
    }

    #[tokio::test]
    async fn test_with_config_rejects_invalid() {
        let mut config = EngineConfig::default();
        config.cache.capacity = 0;
        assert!(GoalsEngine::with_config(Arc::new(InMemoryProfileStore::new()), config).is_err());
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let senior = BiometricProfile {
            age: Some(70),
            ..scenario_a()
        };
        let (engine, _) = engine_with(&[("a", scenario_a()), ("b", senior)]);
        let ids = vec!["a".to_string(), "missing".to_string(), "b".to_string()];
        let goals = engine.calculate_goals_for(&ids).await;

        assert_eq!(goals.len(), 3);
        assert_eq!(goals[0].calculation_source(), CalculationSource::WhoStandard);
        assert_eq!(goals[1].calculation_source(), CalculationSource::FallbackDefault);
        assert!(goals[2].steps_goal() < goals[0].steps_goal());
    }

    #[tokio::test]
    async fn test_reset_metrics_keeps_cache() {
        let (engine, _) = engine_with(&[("u1", scenario_a())]);
        engine.calculate_goals("u1").await;
        engine.reset_metrics();

        assert_eq!(engine.performance_metrics().total_requests, 0);
        assert_eq!(engine.cache_stats().size, 1);

        engine.calculate_goals("u1").await;
        assert_eq!(engine.performance_metrics().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_stateless_json_api() {
        let json = r#"{"age": 30, "gender": "male", "height_cm": 175, "weight_kg": 75,
                       "activity_level": "moderate"}"#;
        let goals: DailyGoals =
            serde_json::from_str(&profile_to_daily_goals(json).await.unwrap()).unwrap();
        assert_eq!(goals.calculation_source(), CalculationSource::WhoStandard);

        let goals: DailyGoals =
            serde_json::from_str(&profile_to_daily_goals("{}").await.unwrap()).unwrap();
        assert_eq!(goals.calculation_source(), CalculationSource::FallbackDefault);

        assert!(profile_to_daily_goals("not json").await.is_err());
    }
}
