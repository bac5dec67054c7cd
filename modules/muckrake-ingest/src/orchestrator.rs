//! Ingestion orchestration.
//!
//! At most one run is active at a time globally; the shared resource is
//! today's edition. The gate is a lock row behind a unique index in the
//! persistence layer, so it holds across multiple backend instances, and a
//! trigger that loses the race coalesces to the in-flight job id instead of
//! starting a duplicate.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use muckrake_common::types::*;
use muckrake_common::MuckrakeError;
use muckrake_store::{records, RecordStore};

use crate::feed::FeedSource;
use crate::generator::{ArticleGenerator, GeneratedDraft};
use crate::job::JobTracker;

const INGEST_LOCK: &str = "ingest";
const ORPHAN_GRACE_MS: u64 = 250;

#[derive(Clone)]
pub struct IngestOrchestrator {
    store: Arc<dyn RecordStore>,
    feed: Arc<dyn FeedSource>,
    generator: Arc<dyn ArticleGenerator>,
    max_items: usize,
}

impl IngestOrchestrator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        feed: Arc<dyn FeedSource>,
        generator: Arc<dyn ArticleGenerator>,
        max_items: usize,
    ) -> Self {
        Self {
            store,
            feed,
            generator,
            max_items,
        }
    }

    /// Start an ingestion run in the background and return its job id.
    /// If a run is already active, returns that run's id instead.
    pub async fn trigger(&self, mode: IngestMode) -> Result<String, MuckrakeError> {
        let store = self.store.as_ref();

        if !records::try_acquire_lock(store, INGEST_LOCK).await? {
            if let Some(active) = records::active_job(store).await? {
                info!(job_id = %active.id, "ingestion already active; coalescing trigger");
                return Ok(active.id);
            }
            // Lock holder may still be writing its job record; give it a
            // moment before declaring the lock orphaned by a crashed run.
            tokio::time::sleep(Duration::from_millis(ORPHAN_GRACE_MS)).await;
            if let Some(active) = records::active_job(store).await? {
                return Ok(active.id);
            }
            warn!("ingest lock held with no active job; reclaiming");
            records::release_lock(store, INGEST_LOCK).await?;
            if !records::try_acquire_lock(store, INGEST_LOCK).await? {
                if let Some(active) = records::active_job(store).await? {
                    return Ok(active.id);
                }
                return Err(MuckrakeError::Storage(
                    "could not acquire ingest lock".to_string(),
                ));
            }
        }

        let tracker = match JobTracker::create(self.store.clone()).await {
            Ok(tracker) => tracker,
            Err(e) => {
                // Could not even record the job; give the slot back.
                if let Err(release) = records::release_lock(store, INGEST_LOCK).await {
                    error!(error = %release, "failed to release ingest lock");
                }
                return Err(e);
            }
        };
        let job_id = tracker.id().to_string();
        info!(job_id = %job_id, ?mode, "ingestion job starting");

        let this = self.clone();
        tokio::spawn(async move { this.run_job(tracker, mode).await });

        Ok(job_id)
    }

    pub async fn job_status(&self, id: &str) -> Result<IngestionJob, MuckrakeError> {
        Ok(records::get_job(self.store.as_ref(), id).await?)
    }

    async fn run_job(&self, mut tracker: JobTracker, mode: IngestMode) {
        if let Err(e) = self.execute(&mut tracker, mode).await {
            tracker.fail(e.to_string()).await;
        }
        if let Err(e) = records::release_lock(self.store.as_ref(), INGEST_LOCK).await {
            error!(error = %e, "failed to release ingest lock");
        }
    }

    async fn execute(
        &self,
        tracker: &mut JobTracker,
        mode: IngestMode,
    ) -> Result<(), MuckrakeError> {
        let store = self.store.as_ref();
        let today = Utc::now().date_naive();

        tracker.running().await;
        tracker.step(format!("run started ({mode:?} mode)")).await;

        if mode == IngestMode::Reset {
            match records::edition_for_date(store, today).await? {
                Some(edition) => {
                    records::delete_edition_cascade(store, &edition.id).await?;
                    tracker.step("cleared existing edition for today").await;
                }
                None => tracker.step("no existing edition to clear").await,
            }
        }

        tracker.step("fetching feed").await;
        // An unreachable feed fails the whole run; no edition is written.
        let mut items = self.feed.fetch().await?;
        let fetched = items.len();
        if self.max_items > 0 {
            items.truncate(self.max_items);
        }
        tracker
            .step(format!("fetched {fetched} items, processing {}", items.len()))
            .await;

        let total = items.len();
        let mut drafts: Vec<(RawFeedItem, GeneratedDraft)> = Vec::new();
        let mut failed = 0u32;
        for (index, item) in items.into_iter().enumerate() {
            match self.generator.generate(&item).await {
                Ok(draft) => {
                    tracker
                        .step(format!("generated {}/{total}: \"{}\"", index + 1, item.title))
                        .await;
                    drafts.push((item, draft));
                }
                Err(e) => {
                    // One bad item never fails the run; it is logged with its
                    // identity and skipped.
                    failed += 1;
                    warn!(title = %item.title, url = %item.source_url, error = %e,
                        "item generation failed; skipping");
                    tracker
                        .step(format!("skipped {}/{total}: \"{}\" ({e})", index + 1, item.title))
                        .await;
                }
            }
        }

        if total == 0 {
            tracker.step("feed empty; nothing to ingest").await;
            tracker
                .complete(JobResult {
                    articles_processed: 0,
                    articles_failed: 0,
                    edition_id: None,
                })
                .await;
            return Ok(());
        }

        if drafts.is_empty() {
            return Err(MuckrakeError::Network(format!(
                "generation failed for all {total} items"
            )));
        }

        // Replace same-date content only now, after generation succeeded, so
        // a failed run leaves the previous pool intact.
        if let Some(existing) = records::edition_for_date(store, today).await? {
            records::delete_edition_cascade(store, &existing.id).await?;
            tracker.step("replaced previous edition for today").await;
        }

        let edition = records::create_edition(
            store,
            &DailyEdition {
                id: String::new(),
                date: today,
                global_mood: global_mood(&drafts),
                created_at: Utc::now(),
            },
        )
        .await?;

        let processed = drafts.len() as u32;
        for (item, draft) in drafts {
            let article = GeneratedArticle {
                id: String::new(),
                edition_id: edition.id.clone(),
                original_title: item.title,
                variants: draft.variants,
                topic_tags: draft.topic_tags,
                sentiment: draft.sentiment,
                location_city: draft.location_city,
                country_code: draft.country_code,
                date: today,
                published_at: item.published.unwrap_or_else(Utc::now),
                audience_scores: draft.audience_scores,
            };
            records::create_article(store, &article).await?;
        }

        tracker
            .step(format!("persisted edition with {processed} articles"))
            .await;
        tracker
            .complete(JobResult {
                articles_processed: processed,
                articles_failed: failed,
                edition_id: Some(edition.id),
            })
            .await;
        Ok(())
    }
}

/// Majority sentiment across the day's drafts; ties fall back to neutral.
fn global_mood(drafts: &[(RawFeedItem, GeneratedDraft)]) -> Sentiment {
    let mut positive = 0usize;
    let mut neutral = 0usize;
    let mut negative = 0usize;
    for (_, draft) in drafts {
        match draft.sentiment {
            Sentiment::Positive => positive += 1,
            Sentiment::Neutral => neutral += 1,
            Sentiment::Negative => negative += 1,
        }
    }
    if positive > neutral && positive > negative {
        Sentiment::Positive
    } else if negative > neutral && negative > positive {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}
