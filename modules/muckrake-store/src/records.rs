//! Typed access to the game's collections.
//!
//! Records round-trip through these helpers only: writers serialize validated
//! domain types, readers parse with lenient blob handling (audience scores,
//! faction balances and friends already deserialize defensively) and treat
//! anything else unparseable as corrupt.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use muckrake_common::types::*;

use crate::{collections, Filter, Record, RecordStore, Result, StoreError};

fn to_data<T: Serialize>(value: &T) -> Value {
    let mut data = serde_json::to_value(value).unwrap_or(Value::Null);
    if let Some(obj) = data.as_object_mut() {
        obj.remove("id");
    }
    data
}

fn parse_record<T: DeserializeOwned>(collection: &str, record: &Record) -> Result<T> {
    let mut data = record.data.clone();
    if let Some(obj) = data.as_object_mut() {
        obj.insert("id".to_string(), Value::String(record.id.clone()));
    }
    serde_json::from_value(data).map_err(|e| StoreError::Corrupt {
        collection: collection.to_string(),
        detail: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Daily editions & articles
// ---------------------------------------------------------------------------

pub async fn edition_for_date<S: RecordStore + ?Sized>(
    store: &S,
    date: NaiveDate,
) -> Result<Option<DailyEdition>> {
    let filter = Filter::new().eq("date", date.to_string());
    let rows = store
        .list(collections::DAILY_EDITIONS, &filter, None)
        .await?;
    match rows.first() {
        Some(record) => Ok(Some(parse_record(collections::DAILY_EDITIONS, record)?)),
        None => Ok(None),
    }
}

pub async fn create_edition<S: RecordStore + ?Sized>(
    store: &S,
    edition: &DailyEdition,
) -> Result<DailyEdition> {
    let record = store
        .create(collections::DAILY_EDITIONS, to_data(edition))
        .await?;
    let mut stored = edition.clone();
    stored.id = record.id;
    Ok(stored)
}

/// Delete an edition together with the articles it owns. Articles never
/// outlive their edition.
pub async fn delete_edition_cascade<S: RecordStore + ?Sized>(store: &S, edition_id: &str) -> Result<()> {
    let filter = Filter::new().eq("edition_id", edition_id);
    let articles = store.list(collections::ARTICLES, &filter, None).await?;
    for article in articles {
        store.delete(collections::ARTICLES, &article.id).await?;
    }
    store.delete(collections::DAILY_EDITIONS, edition_id).await
}

pub async fn create_article<S: RecordStore + ?Sized>(
    store: &S,
    article: &GeneratedArticle,
) -> Result<GeneratedArticle> {
    let record = store.create(collections::ARTICLES, to_data(article)).await?;
    let mut stored = article.clone();
    stored.id = record.id;
    Ok(stored)
}

/// All articles of one edition. Unparseable rows are logged and skipped so a
/// single corrupt record cannot take the day's pool offline.
pub async fn articles_for_edition<S: RecordStore + ?Sized>(
    store: &S,
    edition_id: &str,
) -> Result<Vec<GeneratedArticle>> {
    let filter = Filter::new().eq("edition_id", edition_id);
    let rows = store.list(collections::ARTICLES, &filter, None).await?;
    let mut articles = Vec::with_capacity(rows.len());
    for record in &rows {
        match parse_record::<GeneratedArticle>(collections::ARTICLES, record) {
            Ok(article) => articles.push(article),
            Err(e) => warn!(id = %record.id, error = %e, "skipping corrupt article record"),
        }
    }
    Ok(articles)
}

// ---------------------------------------------------------------------------
// Ads
// ---------------------------------------------------------------------------

pub async fn create_ad<S: RecordStore + ?Sized>(store: &S, ad: &Ad) -> Result<Ad> {
    let record = store.create(collections::ADS, to_data(ad)).await?;
    let mut stored = ad.clone();
    stored.id = record.id;
    Ok(stored)
}

pub async fn all_ads<S: RecordStore + ?Sized>(store: &S) -> Result<Vec<Ad>> {
    let rows = store.list(collections::ADS, &Filter::new(), None).await?;
    let mut ads = Vec::with_capacity(rows.len());
    for record in &rows {
        match parse_record::<Ad>(collections::ADS, record) {
            Ok(ad) => ads.push(ad),
            Err(e) => warn!(id = %record.id, error = %e, "skipping corrupt ad record"),
        }
    }
    Ok(ads)
}

// ---------------------------------------------------------------------------
// Ingestion jobs & the global ingest lock
// ---------------------------------------------------------------------------

pub async fn create_job<S: RecordStore + ?Sized>(store: &S, job: &IngestionJob) -> Result<IngestionJob> {
    let record = store
        .create(collections::INGESTION_JOBS, to_data(job))
        .await?;
    let mut stored = job.clone();
    stored.id = record.id;
    Ok(stored)
}

pub async fn get_job<S: RecordStore + ?Sized>(store: &S, id: &str) -> Result<IngestionJob> {
    let record = store.get_one(collections::INGESTION_JOBS, id).await?;
    parse_record(collections::INGESTION_JOBS, &record)
}

/// Last-write-wins full save; one job id has exactly one writer.
pub async fn save_job<S: RecordStore + ?Sized>(store: &S, job: &IngestionJob) -> Result<()> {
    store
        .update(collections::INGESTION_JOBS, &job.id, to_data(job))
        .await?;
    Ok(())
}

/// The most recent non-terminal job, if any.
pub async fn active_job<S: RecordStore + ?Sized>(store: &S) -> Result<Option<IngestionJob>> {
    for status in ["running", "pending"] {
        let filter = Filter::new().eq("status", status);
        let rows = store
            .list(collections::INGESTION_JOBS, &filter, Some("-created_at"))
            .await?;
        if let Some(record) = rows.first() {
            return Ok(Some(parse_record(collections::INGESTION_JOBS, record)?));
        }
    }
    Ok(None)
}

/// Atomic pending→running gate for the single global ingestion slot: the
/// `locks` collection has a unique index on `name`, so exactly one creator
/// wins regardless of how many backend instances race.
pub async fn try_acquire_lock<S: RecordStore + ?Sized>(store: &S, name: &str) -> Result<bool> {
    let data = serde_json::json!({
        "name": name,
        "acquired_at": chrono::Utc::now(),
    });
    match store.create(collections::LOCKS, data).await {
        Ok(_) => Ok(true),
        Err(StoreError::Conflict { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

pub async fn release_lock<S: RecordStore + ?Sized>(store: &S, name: &str) -> Result<()> {
    let filter = Filter::new().eq("name", name);
    let rows = store.list(collections::LOCKS, &filter, None).await?;
    for record in rows {
        store.delete(collections::LOCKS, &record.id).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Game state
// ---------------------------------------------------------------------------

/// Load a user's game state, creating the starting state on first contact.
/// Returns the record id alongside the state so callers can write back.
pub async fn load_or_create_state<S: RecordStore + ?Sized>(
    store: &S,
    user_id: &str,
) -> Result<(String, UserGameState)> {
    let filter = Filter::new().eq("user_id", user_id);
    let rows = store.list(collections::GAME_STATES, &filter, None).await?;
    if let Some(record) = rows.first() {
        return Ok((
            record.id.clone(),
            parse_record(collections::GAME_STATES, record)?,
        ));
    }

    let fresh = UserGameState::new(user_id);
    match store
        .create(collections::GAME_STATES, to_data(&fresh))
        .await
    {
        Ok(record) => Ok((record.id, fresh)),
        // Lost a creation race; the winner's row is authoritative.
        Err(StoreError::Conflict { .. }) => {
            let rows = store.list(collections::GAME_STATES, &filter, None).await?;
            let record = rows.first().ok_or_else(|| StoreError::NotFound {
                collection: collections::GAME_STATES.to_string(),
                id: user_id.to_string(),
            })?;
            Ok((
                record.id.clone(),
                parse_record(collections::GAME_STATES, record)?,
            ))
        }
        Err(e) => Err(e),
    }
}

pub async fn save_state<S: RecordStore + ?Sized>(
    store: &S,
    record_id: &str,
    state: &UserGameState,
) -> Result<()> {
    store
        .update(collections::GAME_STATES, record_id, to_data(state))
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Published editions
// ---------------------------------------------------------------------------

/// Insert the archival row. `StoreError::Conflict` here means the user
/// already published today — the caller turns that into the domain error.
pub async fn create_published<S: RecordStore + ?Sized>(
    store: &S,
    edition: &PublishedEdition,
) -> Result<PublishedEdition> {
    let record = store
        .create(collections::PUBLISHED_EDITIONS, to_data(edition))
        .await?;
    let mut stored = edition.clone();
    stored.id = record.id;
    Ok(stored)
}

pub async fn delete_published<S: RecordStore + ?Sized>(store: &S, id: &str) -> Result<()> {
    store.delete(collections::PUBLISHED_EDITIONS, id).await
}

pub async fn published_for_user<S: RecordStore + ?Sized>(
    store: &S,
    user_id: &str,
) -> Result<Vec<PublishedEdition>> {
    let filter = Filter::new().eq("user_id", user_id);
    let rows = store
        .list(collections::PUBLISHED_EDITIONS, &filter, Some("-date"))
        .await?;
    rows.iter()
        .map(|r| parse_record(collections::PUBLISHED_EDITIONS, r))
        .collect()
}

// ---------------------------------------------------------------------------
// Achievements
// ---------------------------------------------------------------------------

pub async fn unlocked_achievement_ids<S: RecordStore + ?Sized>(
    store: &S,
    user_id: &str,
) -> Result<Vec<String>> {
    let filter = Filter::new().eq("user_id", user_id);
    let rows = store.list(collections::ACHIEVEMENTS, &filter, None).await?;
    Ok(rows
        .iter()
        .filter_map(|r| r.field_str("achievement_id").map(String::from))
        .collect())
}

/// Write one unlock row. Returns false when the row already existed — a
/// concurrent duplicate resolves to the existing unlock, never an error.
pub async fn create_unlock<S: RecordStore + ?Sized>(store: &S, unlock: &AchievementUnlock) -> Result<bool> {
    match store.create(collections::ACHIEVEMENTS, to_data(unlock)).await {
        Ok(_) => Ok(true),
        Err(StoreError::Conflict { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Resolve a bearer token to a user id. The token is the only identity
/// contract the game has with the auth collaborator.
pub async fn user_id_for_token<S: RecordStore + ?Sized>(store: &S, token: &str) -> Result<Option<String>> {
    if token.is_empty() {
        return Ok(None);
    }
    let filter = Filter::new().eq("api_token", token);
    let rows = store.list(collections::USERS, &filter, None).await?;
    Ok(rows.first().map(|r| r.id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use chrono::Utc;

    fn sample_article(edition_id: &str) -> GeneratedArticle {
        let mut scores = AudienceScores::zero();
        scores.set(Faction::Workers, 5);
        GeneratedArticle {
            id: String::new(),
            edition_id: edition_id.to_string(),
            original_title: "Council approves budget".to_string(),
            variants: VariantSet {
                factual: Variant {
                    headline: "Council approves budget".to_string(),
                    body: "The council approved the budget.".to_string(),
                },
                sensationalist: Variant {
                    headline: "BUDGET CHAOS".to_string(),
                    body: "Chaos erupts as council rams budget through.".to_string(),
                },
                propaganda: Variant {
                    headline: "Wise council secures our future".to_string(),
                    body: "Our glorious council has done it again.".to_string(),
                },
            },
            topic_tags: vec!["politics".to_string()],
            sentiment: Sentiment::Neutral,
            location_city: "Springfield".to_string(),
            country_code: "US".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
            published_at: Utc::now(),
            audience_scores: scores,
        }
    }

    #[tokio::test]
    async fn article_roundtrip_preserves_scores() {
        let store = MemoryStore::with_game_schema();
        let edition = create_edition(
            &store,
            &DailyEdition {
                id: String::new(),
                date: NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
                global_mood: Sentiment::Neutral,
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        let article = create_article(&store, &sample_article(&edition.id)).await.unwrap();
        let loaded = articles_for_edition(&store, &edition.id).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, article.id);
        assert_eq!(loaded[0].audience_scores.get(Faction::Workers), 5);
        assert_eq!(loaded[0].country_code, "US");
    }

    #[tokio::test]
    async fn edition_cascade_removes_articles() {
        let store = MemoryStore::with_game_schema();
        let edition = create_edition(
            &store,
            &DailyEdition {
                id: String::new(),
                date: NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
                global_mood: Sentiment::Neutral,
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();
        create_article(&store, &sample_article(&edition.id)).await.unwrap();
        create_article(&store, &sample_article(&edition.id)).await.unwrap();

        delete_edition_cascade(&store, &edition.id).await.unwrap();
        assert!(articles_for_edition(&store, &edition.id).await.unwrap().is_empty());
        assert!(edition_for_date(&store, NaiveDate::from_ymd_opt(2026, 8, 6).unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn lock_is_exclusive_until_released() {
        let store = MemoryStore::with_game_schema();
        assert!(try_acquire_lock(&store, "ingest").await.unwrap());
        assert!(!try_acquire_lock(&store, "ingest").await.unwrap());
        release_lock(&store, "ingest").await.unwrap();
        assert!(try_acquire_lock(&store, "ingest").await.unwrap());
    }

    #[tokio::test]
    async fn state_is_created_once_and_reloaded() {
        let store = MemoryStore::with_game_schema();
        let (id_a, state_a) = load_or_create_state(&store, "u1").await.unwrap();
        assert_eq!(state_a.treasury, UserGameState::STARTING_TREASURY);

        let (id_b, _) = load_or_create_state(&store, "u1").await.unwrap();
        assert_eq!(id_a, id_b);
    }

    #[tokio::test]
    async fn unlock_is_idempotent() {
        let store = MemoryStore::with_game_schema();
        let unlock = AchievementUnlock {
            id: String::new(),
            user_id: "u1".to_string(),
            achievement_id: "first_publish".to_string(),
            unlocked_at: Utc::now(),
        };
        assert!(create_unlock(&store, &unlock).await.unwrap());
        assert!(!create_unlock(&store, &unlock).await.unwrap());

        let ids = unlocked_achievement_ids(&store, "u1").await.unwrap();
        assert_eq!(ids, vec!["first_publish".to_string()]);
    }
}
