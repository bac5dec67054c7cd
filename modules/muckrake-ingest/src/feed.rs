//! RSS/Atom feed fetching.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use muckrake_common::types::RawFeedItem;
use muckrake_common::MuckrakeError;

const FEED_TIMEOUT_SECS: u64 = 15;
const FEED_RETRIES: u32 = 3;
const FEED_RETRY_BACKOFF_SECS: u64 = 2;

/// Source of raw news items. The production implementation speaks RSS over
/// HTTP; tests substitute a canned source.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawFeedItem>, MuckrakeError>;
}

pub struct RssFeedSource {
    client: reqwest::Client,
    url: String,
}

impl RssFeedSource {
    pub fn new(url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FEED_TIMEOUT_SECS))
            .build()
            .expect("Failed to build RSS HTTP client");
        Self {
            client,
            url: url.to_string(),
        }
    }

    async fn fetch_once(&self) -> Result<Vec<RawFeedItem>, MuckrakeError> {
        let resp = self
            .client
            .get(&self.url)
            .header("User-Agent", "muckrake-ingest/0.1")
            .send()
            .await
            .map_err(|e| MuckrakeError::Network(format!("feed fetch failed: {e}")))?;

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| MuckrakeError::Network(format!("feed body read failed: {e}")))?;

        let feed = feed_rs::parser::parse(&bytes[..])
            .map_err(|e| MuckrakeError::Parse(format!("feed parse failed: {e}")))?;

        let mut items: Vec<RawFeedItem> = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let title = entry.title.map(|t| t.content)?;
                let source_url = entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))?;

                let body = entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body))
                    .unwrap_or_default();

                let published = entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.with_timezone(&Utc));

                Some(RawFeedItem {
                    title,
                    body,
                    source_url,
                    published,
                })
            })
            .collect();

        items.sort_by(|a, b| b.published.cmp(&a.published));

        info!(url = %self.url, items = items.len(), "feed parsed");
        Ok(items)
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    /// Bounded retry; exhaustion surfaces the last error and fails the run.
    async fn fetch(&self) -> Result<Vec<RawFeedItem>, MuckrakeError> {
        let mut last_err = MuckrakeError::Network("feed fetch not attempted".to_string());
        for attempt in 1..=FEED_RETRIES {
            match self.fetch_once().await {
                Ok(items) => return Ok(items),
                Err(e) => {
                    warn!(url = %self.url, attempt, error = %e, "feed fetch attempt failed");
                    last_err = e;
                    if attempt < FEED_RETRIES {
                        tokio::time::sleep(Duration::from_secs(FEED_RETRY_BACKOFF_SECS)).await;
                    }
                }
            }
        }
        Err(last_err)
    }
}
