//! Performance monitoring
//!
//! Records the outcome and duration of every calculation request, keeps a
//! bounded rolling history for duration statistics, and turns the aggregate
//! into advisory insights. Purely diagnostic: nothing here feeds back into a
//! calculation.

use crate::config::{InsightThresholds, MonitorConfig};
use crate::error::GoalsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tracing::warn;

/// Outcome of one recorded request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
    CacheHit,
    Fallback,
}

/// One timing observation
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSample {
    pub outcome: Outcome,
    pub duration_ms: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Memory usage reported by the host platform
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemoryUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

impl MemoryUsage {
    pub fn ratio(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.total_bytes as f64
    }
}

/// Aggregated view of the monitor state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Successes + failures + cache hits
    pub total_requests: u64,
    pub successful_calculations: u64,
    pub failed_calculations: u64,
    pub cache_hits: u64,
    pub fallbacks_used: u64,
    pub samples_in_window: usize,
    pub average_duration_ms: f64,
    pub min_duration_ms: f64,
    pub max_duration_ms: f64,
    pub success_rate: f64,
    pub cache_hit_rate: f64,
    pub fallback_rate: f64,
    pub memory_usage_ratio: Option<f64>,
    pub failures_by_kind: BTreeMap<String, u64>,
}

/// Insight severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSeverity {
    Info,
    Warning,
    Error,
}

/// Area an insight is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightCategory {
    Performance,
    Reliability,
    Caching,
    Fallback,
    Memory,
}

/// Advisory message derived from the metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub severity: InsightSeverity,
    pub category: InsightCategory,
    pub message: String,
    pub recommendation: String,
}

impl Insight {
    fn new(
        severity: InsightSeverity,
        category: InsightCategory,
        message: String,
        recommendation: &str,
    ) -> Self {
        Self {
            severity,
            category,
            message,
            recommendation: recommendation.to_string(),
        }
    }
}

/// Running counters plus a bounded sample window
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    history: VecDeque<PerformanceSample>,
    history_size: usize,
    thresholds: InsightThresholds,
    successes: u64,
    failures: u64,
    cache_hits: u64,
    fallbacks: u64,
    failures_by_kind: BTreeMap<String, u64>,
    memory: Option<MemoryUsage>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(&MonitorConfig::default())
    }
}

impl PerformanceMonitor {
    pub fn new(config: &MonitorConfig) -> Self {
        let history_size = config.history_size.max(1);
        Self {
            history: VecDeque::with_capacity(history_size),
            history_size,
            thresholds: config.thresholds.clone(),
            successes: 0,
            failures: 0,
            cache_hits: 0,
            fallbacks: 0,
            failures_by_kind: BTreeMap::new(),
            memory: None,
        }
    }

    pub fn record_success(&mut self, duration: Duration) {
        self.successes += 1;
        self.push_sample(Outcome::Success, duration);
    }

    pub fn record_failure(&mut self, duration: Duration, error: &GoalsError) {
        self.failures += 1;
        *self
            .failures_by_kind
            .entry(error.kind().to_string())
            .or_insert(0) += 1;
        self.push_sample(Outcome::Failure, duration);
    }

    pub fn record_cache_hit(&mut self, duration: Duration) {
        self.cache_hits += 1;
        self.push_sample(Outcome::CacheHit, duration);
    }

    /// Count a fallback result; `duration` covers generating the fallback
    pub fn record_fallback(&mut self, duration: Duration) {
        self.fallbacks += 1;
        self.push_sample(Outcome::Fallback, duration);
    }

    pub fn record_memory_usage(&mut self, used_bytes: u64, total_bytes: u64) {
        self.memory = Some(MemoryUsage {
            used_bytes,
            total_bytes,
        });
    }

    fn push_sample(&mut self, outcome: Outcome, duration: Duration) {
        self.history.push_back(PerformanceSample {
            outcome,
            duration_ms: duration.as_secs_f64() * 1_000.0,
            recorded_at: Utc::now(),
        });
        while self.history.len() > self.history_size {
            self.history.pop_front();
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.successes + self.failures + self.cache_hits
    }

    /// Successful share of non-cached calculations (1.0 when none ran)
    pub fn success_rate(&self) -> f64 {
        let calculations = self.successes + self.failures;
        if calculations == 0 {
            return 1.0;
        }
        self.successes as f64 / calculations as f64
    }

    /// Share of requests answered from the cache
    pub fn cache_hit_rate(&self) -> f64 {
        ratio(self.cache_hits, self.total_requests())
    }

    /// Share of requests answered by the fallback generator
    pub fn fallback_rate(&self) -> f64 {
        ratio(self.fallbacks, self.total_requests())
    }

    pub fn samples(&self) -> impl Iterator<Item = &PerformanceSample> {
        self.history.iter()
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        let durations = self.history.iter().map(|s| s.duration_ms);
        let (sum, min, max) = durations.fold(
            (0.0_f64, f64::INFINITY, f64::NEG_INFINITY),
            |(sum, min, max), d| (sum + d, min.min(d), max.max(d)),
        );
        let count = self.history.len();

        PerformanceMetrics {
            total_requests: self.total_requests(),
            successful_calculations: self.successes,
            failed_calculations: self.failures,
            cache_hits: self.cache_hits,
            fallbacks_used: self.fallbacks,
            samples_in_window: count,
            average_duration_ms: if count == 0 { 0.0 } else { sum / count as f64 },
            min_duration_ms: if count == 0 { 0.0 } else { min },
            max_duration_ms: if count == 0 { 0.0 } else { max },
            success_rate: self.success_rate(),
            cache_hit_rate: self.cache_hit_rate(),
            fallback_rate: self.fallback_rate(),
            memory_usage_ratio: self.memory.map(|m| m.ratio()),
            failures_by_kind: self.failures_by_kind.clone(),
        }
    }

    /// Evaluate the configured thresholds against the current metrics
    pub fn insights(&self) -> Vec<Insight> {
        let metrics = self.metrics();
        let t = &self.thresholds;
        let mut insights = Vec::new();

        if metrics.total_requests == 0 {
            return vec![Insight::new(
                InsightSeverity::Info,
                InsightCategory::Performance,
                "No calculations recorded yet".to_string(),
                "Run a few goal calculations before reading insights",
            )];
        }

        if metrics.average_duration_ms > t.critical_average_ms {
            insights.push(Insight::new(
                InsightSeverity::Error,
                InsightCategory::Performance,
                format!(
                    "Average calculation time {:.1}ms exceeds {:.0}ms",
                    metrics.average_duration_ms, t.critical_average_ms
                ),
                "Profile the calculators and check for blocking work on the calculation path",
            ));
        } else if metrics.average_duration_ms > t.slow_average_ms {
            insights.push(Insight::new(
                InsightSeverity::Warning,
                InsightCategory::Performance,
                format!(
                    "Average calculation time {:.1}ms exceeds {:.0}ms",
                    metrics.average_duration_ms, t.slow_average_ms
                ),
                "Check device load and consider raising the cache TTL",
            ));
        }

        if metrics.total_requests >= t.min_samples_for_rates {
            if metrics.success_rate < t.min_success_rate {
                let top_failure = metrics
                    .failures_by_kind
                    .iter()
                    .max_by_key(|(_, count)| **count)
                    .map(|(kind, _)| kind.as_str())
                    .unwrap_or("unknown");
                insights.push(Insight::new(
                    InsightSeverity::Error,
                    InsightCategory::Reliability,
                    format!(
                        "Success rate {:.1}% is below {:.1}% (most frequent failure: {})",
                        metrics.success_rate * 100.0,
                        t.min_success_rate * 100.0,
                        top_failure
                    ),
                    "Prompt users to complete their profiles and review calculation errors",
                ));
            }

            if metrics.cache_hit_rate < t.min_cache_hit_rate {
                insights.push(Insight::new(
                    InsightSeverity::Warning,
                    InsightCategory::Caching,
                    format!(
                        "Cache hit rate {:.1}% is below {:.1}%",
                        metrics.cache_hit_rate * 100.0,
                        t.min_cache_hit_rate * 100.0
                    ),
                    "Increase cache capacity or TTL if profiles change rarely",
                ));
            }

            if metrics.fallback_rate > t.max_fallback_rate {
                insights.push(Insight::new(
                    InsightSeverity::Warning,
                    InsightCategory::Fallback,
                    format!(
                        "Fallback goals served for {:.1}% of requests",
                        metrics.fallback_rate * 100.0
                    ),
                    "Check profile sync; fallback goals are conservative defaults",
                ));
            }
        }

        if let Some(memory_ratio) = metrics.memory_usage_ratio {
            if memory_ratio > t.max_memory_ratio {
                insights.push(Insight::new(
                    InsightSeverity::Warning,
                    InsightCategory::Memory,
                    format!("Memory usage at {:.0}%", memory_ratio * 100.0),
                    "Reduce cache capacity or clear unused caches",
                ));
            }
        }

        if insights.is_empty() {
            insights.push(Insight::new(
                InsightSeverity::Info,
                InsightCategory::Performance,
                format!(
                    "All metrics within thresholds ({} requests, {:.1}ms average)",
                    metrics.total_requests, metrics.average_duration_ms
                ),
                "No action needed",
            ));
        }

        for insight in insights
            .iter()
            .filter(|i| i.severity >= InsightSeverity::Warning)
        {
            warn!(category = ?insight.category, insight = %insight.message, "performance insight");
        }

        insights
    }

    /// Clear counters and history. Memory readings are kept.
    pub fn reset(&mut self) {
        self.history.clear();
        self.successes = 0;
        self.failures = 0;
        self.cache_hits = 0;
        self.fallbacks = 0;
        self.failures_by_kind.clear();
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64
}
