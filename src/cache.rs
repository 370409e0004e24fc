//! Result cache
//!
//! Bounded map of input fingerprint to calculated goals. Entries expire after
//! a TTL and the oldest-inserted entry is evicted when the cache is full.
//! The cache itself is not synchronized; the engine owns it behind its state
//! lock.

use crate::config::CacheConfig;
use crate::error::GoalsError;
use crate::monitor::PerformanceMonitor;
use crate::types::DailyGoals;
use crate::validator::CalculationInput;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Deterministic cache key for a calculation input.
///
/// Height and weight enter the key as their exact bit patterns, so two
/// inputs share an entry only when the calculators would see identical
/// values. The user id is not part of the key: the formulas depend on
/// biometrics only.
pub fn fingerprint(input: &CalculationInput) -> String {
    let canonical = format!(
        "{}|{}|{:016x}|{:016x}|{}",
        input.age(),
        input.gender().as_str(),
        input.height_cm().to_bits(),
        input.weight_kg().to_bits(),
        input.activity_level().as_str()
    );
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// Cached goals with their insertion time
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub goals: DailyGoals,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at >= ttl
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub ttl_secs: i64,
    pub hit_rate: f64,
}

/// Bounded TTL cache with oldest-first eviction
#[derive(Debug, Clone)]
pub struct ResultCache {
    entries: IndexMap<String, CacheEntry>,
    capacity: usize,
    ttl: Duration,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl ResultCache {
    /// Create a cache; a zero capacity is raised to one
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: IndexMap::with_capacity(capacity),
            capacity,
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        let ttl_secs = i64::try_from(config.ttl_secs).unwrap_or(i64::MAX);
        let ttl = Duration::try_seconds(ttl_secs).unwrap_or(Duration::MAX);
        Self::new(config.capacity, ttl)
    }

    /// Look up goals, dropping the entry if it has expired
    pub fn get(&mut self, key: &str) -> Result<Option<DailyGoals>, GoalsError> {
        self.get_at(key, Utc::now())
    }

    /// Look up goals as of `now`.
    ///
    /// An entry stamped in the future (clock moved backwards) is dropped and
    /// reported as a cache error; callers treat that as a miss.
    pub fn get_at(
        &mut self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DailyGoals>, GoalsError> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };

        if entry.created_at > now {
            let created_at = entry.created_at;
            self.entries.shift_remove(key);
            return Err(GoalsError::Cache(format!(
                "entry created at {} is newer than lookup time {}",
                created_at, now
            )));
        }

        if entry.is_expired_at(now, self.ttl) {
            self.entries.shift_remove(key);
            debug!(fingerprint = key, "cache entry expired");
            return Ok(None);
        }

        Ok(Some(entry.goals.clone()))
    }

    /// Insert goals, evicting the oldest entry if at capacity.
    ///
    /// Returns the evicted fingerprint, if any.
    pub fn put(&mut self, key: String, goals: DailyGoals) -> Option<String> {
        self.put_at(key, goals, Utc::now())
    }

    pub fn put_at(&mut self, key: String, goals: DailyGoals, now: DateTime<Utc>) -> Option<String> {
        // Re-inserting refreshes both the timestamp and the insertion order
        self.entries.shift_remove(&key);

        let evicted = if self.entries.len() >= self.capacity {
            self.entries.shift_remove_index(0).map(|(evicted_key, _)| {
                debug!(fingerprint = %evicted_key, "cache full; evicted oldest entry");
                evicted_key
            })
        } else {
            None
        };

        self.entries.insert(
            key.clone(),
            CacheEntry {
                fingerprint: key,
                goals,
                created_at: now,
            },
        );

        evicted
    }

    /// Remove every expired entry; returns how many were removed
    pub fn sweep_expired(&mut self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| !entry.is_expired_at(now, ttl));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "swept expired cache entries");
        }
        removed
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Size and capacity, with the hit rate taken from the monitor
    pub fn stats(&self, monitor: &PerformanceMonitor) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            capacity: self.capacity,
            ttl_secs: self.ttl.num_seconds(),
            hit_rate: monitor.cache_hit_rate(),
        }
    }
}
