//! Achievement evaluator: single unlock per threshold crossing, idempotence,
//! and isolation of per-predicate failures.

use async_trait::async_trait;
use muckrake_common::types::*;
use muckrake_store::{collections, records, Filter, MemoryStore, Record, RecordStore, StoreError};
use muckrake_engine::achievements;

#[tokio::test]
async fn crossing_a_threshold_unlocks_exactly_once() {
    let store = MemoryStore::with_game_schema();

    let mut state = UserGameState::new("u1");
    state.total_published = 1;
    state.best_score = 120;

    let unlocked = achievements::evaluate(&store, "u1", &state).await.unwrap();
    assert!(unlocked.contains(&"first_edition".to_string()));
    assert!(unlocked.contains(&"breakout_story".to_string()));
    assert!(!unlocked.contains(&"legendary_scoop".to_string()));

    // A later evaluation below no new threshold adds nothing — best_score is
    // monotone, so the same state simply finds everything already unlocked.
    state.total_published = 2;
    let again = achievements::evaluate(&store, "u1", &state).await.unwrap();
    assert!(again.is_empty());

    let rows = records::unlocked_achievement_ids(&store, "u1").await.unwrap();
    let breakout = rows.iter().filter(|id| *id == "breakout_story").count();
    assert_eq!(breakout, 1);
}

#[tokio::test]
async fn unlocks_are_scoped_per_user() {
    let store = MemoryStore::with_game_schema();

    let mut state = UserGameState::new("u1");
    state.total_published = 1;
    achievements::evaluate(&store, "u1", &state).await.unwrap();

    let other = records::unlocked_achievement_ids(&store, "u2").await.unwrap();
    assert!(other.is_empty());
}

/// Store wrapper that fails unlock writes for one specific achievement.
struct FlakyStore {
    inner: MemoryStore,
    poison: &'static str,
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn create(
        &self,
        collection: &str,
        data: serde_json::Value,
    ) -> Result<Record, StoreError> {
        if collection == collections::ACHIEVEMENTS
            && data.get("achievement_id").and_then(|v| v.as_str()) == Some(self.poison)
        {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.inner.create(collection, data).await
    }

    async fn get_one(&self, collection: &str, id: &str) -> Result<Record, StoreError> {
        self.inner.get_one(collection, id).await
    }

    async fn list(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&str>,
    ) -> Result<Vec<Record>, StoreError> {
        self.inner.list(collection, filter, sort).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<Record, StoreError> {
        self.inner.update(collection, id, patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }
}

#[tokio::test]
async fn one_failing_unlock_does_not_block_the_others() {
    let store = FlakyStore {
        inner: MemoryStore::with_game_schema(),
        poison: "first_edition",
    };

    let mut state = UserGameState::new("u1");
    state.total_published = 1;
    state.best_score = 120;

    let unlocked = achievements::evaluate(&store, "u1", &state).await.unwrap();
    assert!(!unlocked.contains(&"first_edition".to_string()));
    assert!(unlocked.contains(&"breakout_story".to_string()));

    // The failed predicate is retried on the next evaluation.
    let store = FlakyStore {
        inner: store.inner,
        poison: "none",
    };
    let retried = achievements::evaluate(&store, "u1", &state).await.unwrap();
    assert_eq!(retried, vec!["first_edition".to_string()]);
}
