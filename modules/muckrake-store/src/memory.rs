//! In-memory store for tests. Uniqueness is checked under the same lock as
//! insertion, so it exhibits the same conflict behavior as the real store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::{collections, Filter, Record, RecordStore, Result, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Vec<Record>>>,
    unique: HashMap<String, Vec<Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a unique index over `fields` of `collection`.
    pub fn with_index(mut self, collection: &str, fields: &[&str]) -> Self {
        self.unique
            .entry(collection.to_string())
            .or_default()
            .push(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// A store carrying the game's schema indexes — mirrors the production
    /// PocketBase collections.
    pub fn with_game_schema() -> Self {
        Self::new()
            .with_index(collections::DAILY_EDITIONS, &["date"])
            .with_index(collections::PUBLISHED_EDITIONS, &["user_id", "date"])
            .with_index(collections::GAME_STATES, &["user_id"])
            .with_index(collections::ACHIEVEMENTS, &["user_id", "achievement_id"])
            .with_index(collections::LOCKS, &["name"])
            .with_index(collections::USERS, &["api_token"])
    }

    fn violates_unique(&self, collection: &str, data: &Value, existing: &[Record]) -> bool {
        let Some(indexes) = self.unique.get(collection) else {
            return false;
        };
        indexes.iter().any(|fields| {
            let candidate: Vec<Option<&Value>> = fields.iter().map(|f| data.get(f)).collect();
            if candidate.iter().any(|v| v.is_none()) {
                return false;
            }
            existing.iter().any(|record| {
                fields
                    .iter()
                    .zip(&candidate)
                    .all(|(field, value)| record.data.get(field) == *value)
            })
        })
    }
}

fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a
            .as_str()
            .unwrap_or_default()
            .cmp(b.as_str().unwrap_or_default()),
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, collection: &str, data: Value) -> Result<Record> {
        if !data.is_object() {
            return Err(StoreError::Corrupt {
                collection: collection.to_string(),
                detail: "record body must be a JSON object".to_string(),
            });
        }

        let mut records = self.records.lock().expect("store lock poisoned");
        let bucket = records.entry(collection.to_string()).or_default();

        if self.violates_unique(collection, &data, bucket) {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
            });
        }

        let record = Record {
            id: Uuid::new_v4().simple().to_string(),
            data,
        };
        bucket.push(record.clone());
        Ok(record)
    }

    async fn get_one(&self, collection: &str, id: &str) -> Result<Record> {
        let records = self.records.lock().expect("store lock poisoned");
        records
            .get(collection)
            .and_then(|bucket| bucket.iter().find(|r| r.id == id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
    }

    async fn list(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&str>,
    ) -> Result<Vec<Record>> {
        let records = self.records.lock().expect("store lock poisoned");
        let mut matched: Vec<Record> = records
            .get(collection)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|r| filter.matches(&r.data))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(sort) = sort {
            let (field, descending) = match sort.strip_prefix('-') {
                Some(field) => (field, true),
                None => (sort, false),
            };
            matched.sort_by(|a, b| {
                let ord = compare_values(
                    a.data.get(field).unwrap_or(&Value::Null),
                    b.data.get(field).unwrap_or(&Value::Null),
                );
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        Ok(matched)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Record> {
        let mut records = self.records.lock().expect("store lock poisoned");
        let record = records
            .get_mut(collection)
            .and_then(|bucket| bucket.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        if let (Some(target), Some(fields)) = (record.data.as_object_mut(), patch.as_object()) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(record.clone())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut records = self.records.lock().expect("store lock poisoned");
        let bucket = records
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        let before = bucket.len();
        bucket.retain(|r| r.id != id);
        if bucket.len() == before {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn crud_roundtrip() {
        let store = MemoryStore::new();
        let created = store
            .create("things", json!({"name": "a", "count": 1}))
            .await
            .unwrap();

        let fetched = store.get_one("things", &created.id).await.unwrap();
        assert_eq!(fetched.field_str("name"), Some("a"));

        store
            .update("things", &created.id, json!({"count": 2}))
            .await
            .unwrap();
        let updated = store.get_one("things", &created.id).await.unwrap();
        assert_eq!(updated.data["count"], json!(2));
        assert_eq!(updated.field_str("name"), Some("a"));

        store.delete("things", &created.id).await.unwrap();
        assert!(matches!(
            store.get_one("things", &created.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn unique_index_rejects_duplicates() {
        let store = MemoryStore::new().with_index("locks", &["name"]);
        store.create("locks", json!({"name": "ingest"})).await.unwrap();

        let second = store.create("locks", json!({"name": "ingest"})).await;
        assert!(matches!(second, Err(StoreError::Conflict { .. })));

        // A different key is fine.
        store.create("locks", json!({"name": "other"})).await.unwrap();
    }

    #[tokio::test]
    async fn compound_unique_index_uses_all_fields() {
        let store = MemoryStore::new().with_index("published", &["user_id", "date"]);
        store
            .create("published", json!({"user_id": "u1", "date": "2026-08-06"}))
            .await
            .unwrap();

        // Same user, different day — allowed.
        store
            .create("published", json!({"user_id": "u1", "date": "2026-08-07"}))
            .await
            .unwrap();

        // Same user, same day — conflict.
        let dupe = store
            .create("published", json!({"user_id": "u1", "date": "2026-08-06"}))
            .await;
        assert!(matches!(dupe, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn list_filters_and_sorts() {
        let store = MemoryStore::new();
        for (name, rank) in [("b", 2), ("a", 1), ("c", 3)] {
            store
                .create("items", json!({"name": name, "rank": rank, "kind": "x"}))
                .await
                .unwrap();
        }
        store
            .create("items", json!({"name": "d", "rank": 0, "kind": "y"}))
            .await
            .unwrap();

        let filter = Filter::new().eq("kind", "x");
        let rows = store.list("items", &filter, Some("-rank")).await.unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.field_str("name").unwrap()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }
}
