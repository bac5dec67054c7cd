//! `RecordStore` backed by PocketBase. Unique indexes live in the PocketBase
//! collection schema; this adapter only translates its error surface.

use async_trait::async_trait;
use pocketbase_client::{PocketBaseClient, PocketBaseError};
use serde_json::Value;

use crate::{Filter, Record, RecordStore, Result, StoreError};

const LIST_PAGE_SIZE: u32 = 500;

pub struct PocketBaseStore {
    client: PocketBaseClient,
}

impl PocketBaseStore {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: PocketBaseClient::new(base_url, Some(token)),
        }
    }
}

fn map_err(collection: &str, id: Option<&str>, err: PocketBaseError) -> StoreError {
    if err.is_unique_violation() {
        return StoreError::Conflict {
            collection: collection.to_string(),
        };
    }
    match err.status() {
        Some(404) => StoreError::NotFound {
            collection: collection.to_string(),
            id: id.unwrap_or_default().to_string(),
        },
        _ => StoreError::Unavailable(err.to_string()),
    }
}

fn to_record(collection: &str, value: Value) -> Result<Record> {
    let id = value
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| StoreError::Corrupt {
            collection: collection.to_string(),
            detail: "record without id".to_string(),
        })?
        .to_string();
    Ok(Record { id, data: value })
}

#[async_trait]
impl RecordStore for PocketBaseStore {
    async fn create(&self, collection: &str, data: Value) -> Result<Record> {
        let stored = self
            .client
            .create(collection, &data)
            .await
            .map_err(|e| map_err(collection, None, e))?;
        to_record(collection, stored)
    }

    async fn get_one(&self, collection: &str, id: &str) -> Result<Record> {
        let value = self
            .client
            .get_one(collection, id)
            .await
            .map_err(|e| map_err(collection, Some(id), e))?;
        to_record(collection, value)
    }

    async fn list(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&str>,
    ) -> Result<Vec<Record>> {
        let expression = filter.to_pocketbase();
        let values = self
            .client
            .list(collection, expression.as_deref(), sort, LIST_PAGE_SIZE)
            .await
            .map_err(|e| map_err(collection, None, e))?;
        values
            .into_iter()
            .map(|v| to_record(collection, v))
            .collect()
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Record> {
        let value = self
            .client
            .update(collection, id, &patch)
            .await
            .map_err(|e| map_err(collection, Some(id), e))?;
        to_record(collection, value)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.client
            .delete(collection, id)
            .await
            .map_err(|e| map_err(collection, Some(id), e))
    }
}
