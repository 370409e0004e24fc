//! Profile storage collaborator
//!
//! The engine does not own profile persistence. Hosts implement
//! [`ProfileStore`] over their own storage/sync layer; the in-memory store
//! here backs the CLI, the FFI handle and tests.

use crate::error::GoalsError;
use crate::types::{BiometricProfile, DailyGoals};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Source of biometric profiles and sink for calculated goals
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch a user's profile; `Ok(None)` when the user has none
    async fn get_profile(&self, user_id: &str) -> Result<Option<BiometricProfile>, GoalsError>;

    /// Persist the latest goals for a user
    async fn save_goals(&self, user_id: &str, goals: &DailyGoals) -> Result<(), GoalsError>;

    /// Latest persisted goals for a user
    async fn get_goals(&self, user_id: &str) -> Result<Option<DailyGoals>, GoalsError>;
}

/// Thread-safe in-memory profile store
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, BiometricProfile>>,
    goals: RwLock<HashMap<String, DailyGoals>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user's profile
    pub fn upsert_profile(&self, user_id: impl Into<String>, profile: BiometricProfile) {
        self.profiles.write().insert(user_id.into(), profile);
    }

    pub fn remove_profile(&self, user_id: &str) -> Option<BiometricProfile> {
        self.profiles.write().remove(user_id)
    }

    /// Insert or replace a user's goals, e.g. a manual adjustment
    pub fn set_goals(&self, user_id: impl Into<String>, goals: DailyGoals) {
        self.goals.write().insert(user_id.into(), goals);
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.read().len()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<BiometricProfile>, GoalsError> {
        Ok(self.profiles.read().get(user_id).cloned())
    }

    async fn save_goals(&self, user_id: &str, goals: &DailyGoals) -> Result<(), GoalsError> {
        self.goals
            .write()
            .insert(user_id.to_string(), goals.clone());
        Ok(())
    }

    async fn get_goals(&self, user_id: &str) -> Result<Option<DailyGoals>, GoalsError> {
        Ok(self.goals.read().get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Gender;

    #[tokio::test]
    async fn test_profile_roundtrip() {
        let store = InMemoryProfileStore::new();
        assert!(store.get_profile("u1").await.unwrap().is_none());

        store.upsert_profile(
            "u1",
            BiometricProfile {
                age: Some(30),
                gender: Some(Gender::Female),
                ..Default::default()
            },
        );
        let profile = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.gender, Some(Gender::Female));
        assert_eq!(store.profile_count(), 1);

        assert!(store.remove_profile("u1").is_some());
        assert!(store.get_profile("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_goals_roundtrip() {
        let store = InMemoryProfileStore::new();
        let goals = DailyGoals::user_adjusted(9_000, 2_100, 25).unwrap();
        store.save_goals("u1", &goals).await.unwrap();
        assert_eq!(store.get_goals("u1").await.unwrap(), Some(goals));
    }
}
