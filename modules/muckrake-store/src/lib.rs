//! Persistence contract.
//!
//! Everything the game persists goes through the `RecordStore` CRUD trait:
//! string-id records with JSON bodies, grouped into named collections.
//! Uniqueness is store configuration (like a database index), not caller
//! logic — `create` into a violated index returns `StoreError::Conflict`,
//! which is the serialization point the publish guard and the ingestion
//! lock rely on across backend instances.
//!
//! Implemented by `PocketBaseStore` (production) and `MemoryStore` (tests).

pub mod memory;
pub mod pocketbase;
pub mod records;

pub use memory::MemoryStore;
pub use pocketbase::PocketBaseStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Collection names shared by every store implementation.
pub mod collections {
    pub const DAILY_EDITIONS: &str = "daily_editions";
    pub const ARTICLES: &str = "articles";
    pub const ADS: &str = "ads";
    pub const PUBLISHED_EDITIONS: &str = "published_editions";
    pub const GAME_STATES: &str = "game_states";
    pub const ACHIEVEMENTS: &str = "achievements";
    pub const INGESTION_JOBS: &str = "ingestion_jobs";
    pub const LOCKS: &str = "locks";
    pub const USERS: &str = "users";
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Unique constraint violated in {collection}")]
    Conflict { collection: String },

    #[error("Corrupt record in {collection}: {detail}")]
    Corrupt { collection: String, detail: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for muckrake_common::MuckrakeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => {
                muckrake_common::MuckrakeError::NotFound(format!("{collection}/{id}"))
            }
            // Contextual conflicts (already published, lock held) are matched
            // explicitly at the call site before this conversion applies.
            other => muckrake_common::MuckrakeError::Storage(other.to_string()),
        }
    }
}

/// A stored record: assigned string id plus a JSON object body.
#[derive(Debug, Clone)]
pub struct Record {
    pub id: String,
    pub data: Value,
}

impl Record {
    pub fn field_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(|v| v.as_str())
    }
}

/// Conjunction of field-equality constraints.
#[derive(Debug, Clone, Default)]
pub struct Filter(Vec<(String, Value)>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.push((field.to_string(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, data: &Value) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| data.get(field) == Some(expected))
    }

    /// Render as a PocketBase filter expression, or `None` when empty.
    pub fn to_pocketbase(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        let clauses: Vec<String> = self
            .0
            .iter()
            .map(|(field, value)| match value {
                Value::String(s) => format!("{field}=\"{}\"", s.replace('"', "\\\"")),
                other => format!("{field}={other}"),
            })
            .collect();
        Some(clauses.join(" && "))
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a record; the store assigns the id. Violating a unique index
    /// of the collection yields `StoreError::Conflict`.
    async fn create(&self, collection: &str, data: Value) -> Result<Record>;

    async fn get_one(&self, collection: &str, id: &str) -> Result<Record>;

    async fn list(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&str>,
    ) -> Result<Vec<Record>>;

    /// Merge `patch`'s top-level fields into the record.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Record>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

// Blanket impls so stores can be borrowed or shared as Arc<S> (including
// Arc<dyn RecordStore>).
#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for &S {
    async fn create(&self, collection: &str, data: Value) -> Result<Record> {
        (**self).create(collection, data).await
    }

    async fn get_one(&self, collection: &str, id: &str) -> Result<Record> {
        (**self).get_one(collection, id).await
    }

    async fn list(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&str>,
    ) -> Result<Vec<Record>> {
        (**self).list(collection, filter, sort).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Record> {
        (**self).update(collection, id, patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        (**self).delete(collection, id).await
    }
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    async fn create(&self, collection: &str, data: Value) -> Result<Record> {
        (**self).create(collection, data).await
    }

    async fn get_one(&self, collection: &str, id: &str) -> Result<Record> {
        (**self).get_one(collection, id).await
    }

    async fn list(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&str>,
    ) -> Result<Vec<Record>> {
        (**self).list(collection, filter, sort).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Record> {
        (**self).update(collection, id, patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        (**self).delete(collection, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_on_all_fields() {
        let filter = Filter::new().eq("date", "2026-08-06").eq("status", "running");
        let hit = serde_json::json!({"date": "2026-08-06", "status": "running", "x": 1});
        let miss = serde_json::json!({"date": "2026-08-06", "status": "failed"});
        assert!(filter.matches(&hit));
        assert!(!filter.matches(&miss));
    }

    #[test]
    fn filter_renders_pocketbase_expression() {
        let filter = Filter::new().eq("user_id", "u1").eq("count", 3);
        assert_eq!(
            filter.to_pocketbase().as_deref(),
            Some("user_id=\"u1\" && count=3")
        );
        assert_eq!(Filter::new().to_pocketbase(), None);
    }
}
