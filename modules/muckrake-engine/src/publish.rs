//! The publish guard — the one mutation path for player game state.
//!
//! A "day" is the UTC calendar date; midnight UTC is the cutoff everywhere
//! (publish limit, streak arithmetic, edition dates). The unique index on
//! (user_id, date) in the published collection is the serialization point:
//! two simultaneous publishes race on that insert and exactly one wins.

use std::collections::HashMap;

use chrono::{Days, NaiveDate, Utc};
use tracing::{error, info, warn};

use muckrake_common::types::*;
use muckrake_common::MuckrakeError;
use muckrake_store::{records, RecordStore, StoreError};

use crate::achievements;
use crate::scoring::{compute_preview, ScoringCoefficients};

pub struct PublishGuard<S> {
    store: S,
    coefficients: ScoringCoefficients,
}

impl<S: RecordStore> PublishGuard<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            coefficients: ScoringCoefficients::v1(),
        }
    }

    /// Publish today's front page for `user_id`.
    pub async fn publish(
        &self,
        user_id: &str,
        grid: &Grid,
        snapshot: StatsSnapshot,
        newspaper_name: &str,
    ) -> Result<PublishedEdition, MuckrakeError> {
        self.publish_on(user_id, grid, snapshot, newspaper_name, Utc::now().date_naive())
            .await
    }

    /// Deterministic core of `publish`; `today` is injected so tests can
    /// exercise the daily cutoff and streak arithmetic.
    pub async fn publish_on(
        &self,
        user_id: &str,
        grid: &Grid,
        snapshot: StatsSnapshot,
        newspaper_name: &str,
        today: NaiveDate,
    ) -> Result<PublishedEdition, MuckrakeError> {
        if user_id.is_empty() {
            return Err(MuckrakeError::Unauthenticated);
        }
        let newspaper_name = newspaper_name.trim();
        if newspaper_name.is_empty() {
            return Err(MuckrakeError::Validation(
                "newspaper name must not be empty".to_string(),
            ));
        }

        let (articles, ads) = load_pool(&self.store, today).await?;
        validate_grid(grid, &articles, &ads)?;

        let result = compute_preview(grid, &articles, &ads, snapshot, &self.coefficients);
        let grid_layout = snapshot_slots(grid, &articles, &ads);

        // Serialization point: the (user_id, date) unique index decides the
        // race between simultaneous publishes.
        let edition = PublishedEdition {
            id: String::new(),
            user_id: user_id.to_string(),
            date: today,
            newspaper_name: newspaper_name.to_string(),
            grid_layout,
            stats: snapshot,
            published_at: Utc::now(),
        };
        let stored = match records::create_published(&self.store, &edition).await {
            Ok(stored) => stored,
            Err(StoreError::Conflict { .. }) => {
                return Err(MuckrakeError::AlreadyPublished { date: today });
            }
            Err(e) => return Err(e.into()),
        };

        // Apply the deltas. A failure here must not leave a published row
        // without its state change, so the row is compensated away.
        if let Err(e) = self.apply_deltas(user_id, &result, today).await {
            error!(user_id, error = %e, "publish state update failed; rolling back");
            if let Err(rollback) = records::delete_published(&self.store, &stored.id).await {
                error!(id = %stored.id, error = %rollback, "rollback of published row failed");
            }
            return Err(e);
        }

        info!(
            user_id,
            date = %today,
            score = result.score,
            sales = result.sales,
            outrage = result.outrage_meter,
            "edition published"
        );
        Ok(stored)
    }

    async fn apply_deltas(
        &self,
        user_id: &str,
        result: &SubmissionResult,
        today: NaiveDate,
    ) -> Result<(), MuckrakeError> {
        let (record_id, mut state) = records::load_or_create_state(&self.store, user_id).await?;

        state.treasury += result.sales;
        state.credibility = (state.credibility + result.credibility_delta).clamp(0, 100);
        state.readers = (state.readers + result.reader_delta).max(0);

        let yesterday = today.checked_sub_days(Days::new(1));
        state.publish_streak = if state.last_publish_date.is_some()
            && state.last_publish_date == yesterday
        {
            state.publish_streak + 1
        } else {
            1
        };
        state.last_publish_date = Some(today);
        state.total_published += 1;
        state.best_score = state.best_score.max(result.score);
        state.faction_standing.merge(&result.faction_balance);

        records::save_state(&self.store, &record_id, &state).await?;

        // Achievements run after the state change and never undo a publish.
        match achievements::evaluate(&self.store, user_id, &state).await {
            Ok(unlocked) if !unlocked.is_empty() => {
                info!(user_id, ?unlocked, "achievements unlocked");
            }
            Ok(_) => {}
            Err(e) => warn!(user_id, error = %e, "achievement evaluation failed"),
        }
        Ok(())
    }
}

/// Resolve a day's scoring inputs: the edition's articles and the ad catalog.
/// Shared by the preview endpoint and the guard so both score identically.
pub async fn load_pool<S: RecordStore + ?Sized>(
    store: &S,
    date: NaiveDate,
) -> Result<(HashMap<String, GeneratedArticle>, HashMap<String, Ad>), MuckrakeError> {
    let mut articles = HashMap::new();
    if let Some(edition) = records::edition_for_date(store, date).await? {
        for article in records::articles_for_edition(store, &edition.id).await? {
            articles.insert(article.id.clone(), article);
        }
    }
    let ads = records::all_ads(store)
        .await?
        .into_iter()
        .map(|ad| (ad.id.clone(), ad))
        .collect();
    Ok((articles, ads))
}

/// Strict layout validation: six slots, each resolved to a known article
/// variant or a known ad. Nothing is persisted when this fails.
fn validate_grid(
    grid: &Grid,
    articles: &HashMap<String, GeneratedArticle>,
    ads: &HashMap<String, Ad>,
) -> Result<(), MuckrakeError> {
    for (index, (kind, slot)) in grid.slots_with_kind().enumerate() {
        match slot {
            SlotContent::Empty => {
                return Err(MuckrakeError::Validation(format!(
                    "slot {index} ({kind}) is empty"
                )));
            }
            SlotContent::Article { article_id, .. } => {
                if !articles.contains_key(article_id) {
                    return Err(MuckrakeError::Validation(format!(
                        "slot {index} ({kind}) references unknown article {article_id}"
                    )));
                }
            }
            SlotContent::Ad { ad_id } => {
                if !ads.contains_key(ad_id) {
                    return Err(MuckrakeError::Validation(format!(
                        "slot {index} ({kind}) references unknown ad {ad_id}"
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Denormalize the grid for the archive: copy headline and body text so the
/// published record stays readable after the day's articles are deleted.
fn snapshot_slots(
    grid: &Grid,
    articles: &HashMap<String, GeneratedArticle>,
    ads: &HashMap<String, Ad>,
) -> Vec<PublishedSlot> {
    grid.slots_with_kind()
        .map(|(kind, slot)| match slot {
            SlotContent::Article {
                article_id,
                variant,
            } => {
                let text = articles
                    .get(article_id)
                    .map(|a| a.variants.get(*variant).clone())
                    .unwrap_or(Variant {
                        headline: String::new(),
                        body: String::new(),
                    });
                PublishedSlot {
                    kind,
                    headline: text.headline,
                    body: text.body,
                    variant: Some(*variant),
                    ad_name: None,
                }
            }
            SlotContent::Ad { ad_id } => {
                let name = ads.get(ad_id).map(|ad| ad.name.clone()).unwrap_or_default();
                PublishedSlot {
                    kind,
                    headline: name.clone(),
                    body: String::new(),
                    variant: None,
                    ad_name: Some(name),
                }
            }
            SlotContent::Empty => PublishedSlot {
                kind,
                headline: String::new(),
                body: String::new(),
                variant: None,
                ad_name: None,
            },
        })
        .collect()
}
