//! End-to-end tests over the public engine API

use pretty_assertions::assert_eq;
use std::sync::Arc;

use synheart_goals::{
    ActivityLevel, BiometricProfile, CalculationSource, DailyGoals, EngineConfig, Gender,
    GoalBounds, GoalsEngine, InMemoryProfileStore, ProfileStore,
};

fn profile(
    age: i32,
    gender: Option<Gender>,
    height_cm: f64,
    weight_kg: f64,
    activity_level: Option<ActivityLevel>,
) -> BiometricProfile {
    BiometricProfile {
        age: Some(age),
        gender,
        height_cm: Some(height_cm),
        weight_kg: Some(weight_kg),
        activity_level,
        ..Default::default()
    }
}

fn scenario_a() -> BiometricProfile {
    profile(30, Some(Gender::Male), 175.0, 75.0, Some(ActivityLevel::Moderate))
}

fn scenario_b() -> BiometricProfile {
    profile(70, Some(Gender::Unspecified), 170.0, 65.0, None)
}

fn engine() -> GoalsEngine {
    GoalsEngine::new(Arc::new(InMemoryProfileStore::new()))
}

fn engine_with_config(config: EngineConfig) -> GoalsEngine {
    GoalsEngine::with_config(Arc::new(InMemoryProfileStore::new()), config).unwrap()
}

#[tokio::test]
async fn test_scenario_a_standard_adult() {
    let goals = engine().calculate_for_profile("a", Some(scenario_a())).await;

    assert_eq!(goals.calculation_source(), CalculationSource::WhoStandard);
    assert!((10_000..=11_500).contains(&goals.steps_goal()));
    assert!((2_200..=2_600).contains(&goals.calories_goal()));
    assert!((19..=24).contains(&goals.heart_points_goal()));
}

#[tokio::test]
async fn test_scenario_b_senior_reductions() {
    let engine = engine();
    let adult = engine.calculate_for_profile("a", Some(scenario_a())).await;
    let senior = engine.calculate_for_profile("b", Some(scenario_b())).await;

    assert_eq!(senior.calculation_source(), CalculationSource::WhoStandard);
    // 10000 x 0.85 x 1.05
    assert_eq!(senior.steps_goal(), 8_925);
    // Mifflin-St Jeor midpoint 1284.5 x 1.465
    assert_eq!(senior.calories_goal(), 1_882);
    // 150/7 x 0.85 x 1.05
    assert_eq!(senior.heart_points_goal(), 19);

    assert!(senior.steps_goal() < adult.steps_goal());
    assert!(senior.calories_goal() < adult.calories_goal());
    assert!(senior.heart_points_goal() < adult.heart_points_goal());
}

#[tokio::test]
async fn test_age_reduction_shape() {
    let engine = engine();
    let adult = engine.calculate_for_profile("a", Some(scenario_a())).await;
    let senior = BiometricProfile {
        age: Some(70),
        ..scenario_a()
    };
    let senior = engine.calculate_for_profile("s", Some(senior)).await;

    let ratio = |senior: u32, adult: u32| senior as f64 / adult as f64;

    // Senior multiplier on steps and heart points
    assert!((ratio(senior.steps_goal(), adult.steps_goal()) - 0.85).abs() < 0.01);
    assert!((ratio(senior.heart_points_goal(), adult.heart_points_goal()) - 0.85).abs() < 0.05);
    // Calories fall through the Harris-Benedict age term alone (1535.6 / 1762.7)
    let calories = ratio(senior.calories_goal(), adult.calories_goal());
    assert!((calories - 0.871).abs() < 0.005, "calorie ratio {}", calories);
}

#[tokio::test]
async fn test_scenario_c_invalid_measurements_fall_back() {
    let engine = engine();
    let invalid = profile(30, Some(Gender::Male), -1.0, -1.0, Some(ActivityLevel::Moderate));
    let goals = engine.calculate_for_profile("c", Some(invalid)).await;

    assert_eq!(goals.calculation_source(), CalculationSource::FallbackDefault);
    assert!(GoalBounds::FALLBACK.contains(&goals));
    // Adult male fallback: 7500 x 1.02, 2200 kcal, 21 points
    assert_eq!(goals.steps_goal(), 7_650);
    assert_eq!(goals.calories_goal(), 2_200);
    assert_eq!(goals.heart_points_goal(), 21);

    let metrics = engine.performance_metrics();
    assert_eq!(metrics.failed_calculations, 1);
    assert_eq!(metrics.fallbacks_used, 1);
}

#[tokio::test]
async fn test_missing_measurements_fall_back() {
    let missing = BiometricProfile {
        age: Some(45),
        gender: Some(Gender::Female),
        ..Default::default()
    };
    let goals = engine().calculate_for_profile("d", Some(missing)).await;

    assert_eq!(goals.calculation_source(), CalculationSource::FallbackDefault);
    assert!((6_000..=9_000).contains(&goals.steps_goal()));
    assert!((1_400..=2_400).contains(&goals.calories_goal()));
    assert!((17..=25).contains(&goals.heart_points_goal()));
}

#[tokio::test]
async fn test_repeat_request_served_from_cache() {
    let engine = engine();
    let first = engine.calculate_for_profile("a", Some(scenario_a())).await;
    let second = engine.calculate_for_profile("a", Some(scenario_a())).await;

    assert_eq!(first, second);
    let metrics = engine.performance_metrics();
    assert_eq!(metrics.successful_calculations, 1);
    assert_eq!(metrics.cache_hits, 1);
    assert_eq!(metrics.total_requests, 2);
    assert_eq!(engine.cache_stats().size, 1);
}

#[tokio::test]
async fn test_cached_goals_match_fresh_calculation() {
    let nearby = |weight| {
        profile(30, Some(Gender::Male), 175.0, weight, Some(ActivityLevel::VeryActive))
    };

    let fresh = engine().calculate_for_profile("u", Some(nearby(75.04))).await;

    let warmed = engine();
    warmed.calculate_for_profile("u", Some(nearby(74.96))).await;
    let second = warmed.calculate_for_profile("u", Some(nearby(75.04))).await;

    assert_eq!(
        (second.steps_goal(), second.calories_goal(), second.heart_points_goal()),
        (fresh.steps_goal(), fresh.calories_goal(), fresh.heart_points_goal())
    );
    assert_eq!(warmed.performance_metrics().cache_hits, 0);
    assert_eq!(warmed.cache_stats().size, 2);
}

#[tokio::test]
async fn test_expired_entry_is_recomputed() {
    let mut config = EngineConfig::default();
    config.cache.ttl_secs = 0;
    let engine = engine_with_config(config);

    engine.calculate_for_profile("a", Some(scenario_a())).await;
    engine.calculate_for_profile("a", Some(scenario_a())).await;

    let metrics = engine.performance_metrics();
    assert_eq!(metrics.cache_hits, 0);
    assert_eq!(metrics.successful_calculations, 2);
    assert_eq!(engine.sweep_expired_cache(), 1);
    assert_eq!(engine.cache_stats().size, 0);
}

#[tokio::test]
async fn test_cache_evicts_oldest_at_capacity() {
    let mut config = EngineConfig::default();
    config.cache.capacity = 2;
    let engine = engine_with_config(config);

    for weight in [60.0, 70.0, 80.0] {
        let p = profile(30, Some(Gender::Male), 175.0, weight, None);
        engine.calculate_for_profile("u", Some(p)).await;
    }
    assert_eq!(engine.cache_stats().size, 2);

    // Oldest (60 kg) was evicted; newest (80 kg) is still cached
    let oldest = profile(30, Some(Gender::Male), 175.0, 60.0, None);
    let newest = profile(30, Some(Gender::Male), 175.0, 80.0, None);
    engine.calculate_for_profile("u", Some(newest)).await;
    assert_eq!(engine.performance_metrics().cache_hits, 1);
    engine.calculate_for_profile("u", Some(oldest)).await;
    assert_eq!(engine.performance_metrics().cache_hits, 1);
    assert_eq!(engine.performance_metrics().successful_calculations, 4);
}

#[tokio::test]
async fn test_hundred_sequential_calculations() {
    let engine = engine();

    for i in 0..100 {
        let p = profile(30, Some(Gender::Female), 165.0, 50.0 + i as f64, None);
        let goals = engine.calculate_for_profile("perf", Some(p)).await;
        assert_eq!(goals.calculation_source(), CalculationSource::WhoStandard);
    }

    let metrics = engine.performance_metrics();
    assert_eq!(metrics.successful_calculations, 100);
    assert_eq!(metrics.samples_in_window, 100);
    assert_eq!(metrics.success_rate, 1.0);
    assert!(metrics.average_duration_ms >= 0.0);
    assert!(metrics.max_duration_ms >= metrics.min_duration_ms);
}

#[tokio::test]
async fn test_goals_stay_within_medical_bounds() {
    let engine = engine();
    let genders = [Gender::Male, Gender::Female, Gender::Unspecified];
    let levels = [
        ActivityLevel::Sedentary,
        ActivityLevel::Light,
        ActivityLevel::Moderate,
        ActivityLevel::Active,
        ActivityLevel::VeryActive,
    ];

    for age in [0, 10, 17, 18, 40, 64, 65, 90, 120] {
        for gender in genders {
            for level in levels {
                for (height, weight) in [(50.0, 10.0), (170.0, 70.0), (300.0, 500.0)] {
                    let p = profile(age, Some(gender), height, weight, Some(level));
                    let goals = engine.calculate_for_profile("bounds", Some(p)).await;
                    assert_eq!(goals.calculation_source(), CalculationSource::WhoStandard);
                    assert!(
                        GoalBounds::MEDICAL.contains(&goals),
                        "out of bounds for age {} {:?} {:?} {}cm {}kg: {:?}",
                        age,
                        gender,
                        level,
                        height,
                        weight,
                        goals
                    );
                }
            }
        }
    }
}

#[tokio::test]
async fn test_store_backed_flow() {
    let store = Arc::new(InMemoryProfileStore::new());
    store.upsert_profile("alice", scenario_a());
    let engine = GoalsEngine::new(store.clone());

    assert!(!engine.has_valid_goals("alice").await);
    let goals = engine.calculate_goals("alice").await;
    assert!(engine.has_valid_goals("alice").await);
    assert_eq!(store.get_goals("alice").await.unwrap(), Some(goals));

    let breakdown = engine.get_calculation_breakdown("alice").await.unwrap();
    assert_eq!(breakdown.goals.steps_goal(), 10_815);
    assert_eq!(breakdown.calories.bmr_formula.as_str(), "harris_benedict");

    // A manual override replaces the stored goals and still counts as valid
    let adjusted = DailyGoals::user_adjusted(12_000, 2_500, 30).unwrap();
    store.set_goals("alice", adjusted);
    assert!(engine.has_valid_goals("alice").await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_engine() {
    let store = Arc::new(InMemoryProfileStore::new());
    for i in 0..20 {
        store.upsert_profile(format!("user-{}", i), scenario_a());
    }
    let engine = Arc::new(GoalsEngine::new(store));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.calculate_goals(&format!("user-{}", i)).await })
        })
        .collect();

    for handle in handles {
        let goals = handle.await.unwrap();
        assert_eq!(goals.steps_goal(), 10_815);
    }

    let metrics = engine.performance_metrics();
    assert_eq!(metrics.total_requests, 20);
    assert_eq!(metrics.failed_calculations, 0);
    assert_eq!(engine.cache_stats().size, 1);
}

#[tokio::test]
async fn test_insights_flag_low_success_rate() {
    let engine = engine();
    for i in 0..12 {
        engine.calculate_goals(&format!("ghost-{}", i)).await;
    }

    let insights = engine.performance_insights();
    assert!(!insights.is_empty());
    assert!(insights.iter().any(|i| i.message.to_lowercase().contains("success")));
}
