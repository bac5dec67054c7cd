pub mod error;

pub use error::{PocketBaseError, Result};

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

/// Items wrapper of PocketBase list responses.
#[derive(Debug, serde::Deserialize)]
struct ListResponse {
    items: Vec<Value>,
}

pub struct PocketBaseClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl PocketBaseClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build PocketBase HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    fn records_url(&self, collection: &str) -> String {
        format!("{}/api/collections/{collection}/records", self.base_url)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token {
            Some(ref token) => builder.header("Authorization", token),
            None => builder,
        }
    }

    async fn read_json(resp: reqwest::Response) -> Result<Value> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(PocketBaseError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }

    /// Create a record; returns the stored record (with its assigned id).
    pub async fn create(&self, collection: &str, data: &Value) -> Result<Value> {
        debug!(collection, "pocketbase: create record");
        let resp = self
            .request(self.client.post(self.records_url(collection)))
            .json(data)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    pub async fn get_one(&self, collection: &str, id: &str) -> Result<Value> {
        let url = format!("{}/{id}", self.records_url(collection));
        let resp = self.request(self.client.get(url)).send().await?;
        Self::read_json(resp).await
    }

    /// List records matching a PocketBase filter expression.
    pub async fn list(
        &self,
        collection: &str,
        filter: Option<&str>,
        sort: Option<&str>,
        per_page: u32,
    ) -> Result<Vec<Value>> {
        let mut query: Vec<(&str, String)> = vec![("perPage", per_page.to_string())];
        if let Some(filter) = filter {
            query.push(("filter", filter.to_string()));
        }
        if let Some(sort) = sort {
            query.push(("sort", sort.to_string()));
        }

        let resp = self
            .request(self.client.get(self.records_url(collection)))
            .query(&query)
            .send()
            .await?;

        let body = Self::read_json(resp).await?;
        let parsed: ListResponse = serde_json::from_value(body).map_err(|e| {
            PocketBaseError::Api {
                status: 200,
                message: format!("unexpected list response shape: {e}"),
            }
        })?;
        Ok(parsed.items)
    }

    pub async fn update(&self, collection: &str, id: &str, patch: &Value) -> Result<Value> {
        let url = format!("{}/{id}", self.records_url(collection));
        let resp = self
            .request(self.client.patch(url))
            .json(patch)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let url = format!("{}/{id}", self.records_url(collection));
        let resp = self.request(self.client.delete(url)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(PocketBaseError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
