//! Publish guard: daily limit, validation, state deltas, streaks, and the
//! stability of the denormalized archive.

mod harness;

use chrono::Days;
use muckrake_common::types::*;
use muckrake_common::MuckrakeError;
use muckrake_store::{collections, records, Filter, RecordStore};
use muckrake_engine::PublishGuard;

use harness::*;

fn full_grid(a: &str, b: &str, x: &str) -> Grid {
    grid([
        slot(a, VariantKind::Factual),
        ad_slot(x),
        slot(b, VariantKind::Propaganda),
        slot(a, VariantKind::Sensationalist),
        slot(b, VariantKind::Factual),
        slot(a, VariantKind::Factual),
    ])
}

#[tokio::test]
async fn publish_persists_archive_and_applies_deltas() {
    let (store, a, b, x) = seeded_store().await;
    let guard = PublishGuard::new(&store);

    let published = guard
        .publish_on("u1", &full_grid(&a, &b, &x), snapshot(), "The Daily Rag", day())
        .await
        .unwrap();

    assert!(!published.id.is_empty());
    assert_eq!(published.date, day());
    assert_eq!(published.grid_layout.len(), 6);
    // The headline slot snapshots the chosen variant's text.
    assert!(published.grid_layout[0].headline.starts_with("Factual"));
    assert_eq!(published.grid_layout[1].ad_name.as_deref(), Some("Crispy Cola"));

    let (_, state) = records::load_or_create_state(&store, "u1").await.unwrap();
    assert_eq!(state.total_published, 1);
    assert_eq!(state.publish_streak, 1);
    assert_eq!(state.last_publish_date, Some(day()));
    assert!(state.treasury > UserGameState::STARTING_TREASURY);

    // First publish unlocks the first-edition achievement.
    let unlocked = records::unlocked_achievement_ids(&store, "u1").await.unwrap();
    assert!(unlocked.contains(&"first_edition".to_string()));
}

#[tokio::test]
async fn second_publish_same_day_conflicts_without_mutation() {
    let (store, a, b, x) = seeded_store().await;
    let guard = PublishGuard::new(&store);
    let layout = full_grid(&a, &b, &x);

    guard
        .publish_on("u1", &layout, snapshot(), "The Daily Rag", day())
        .await
        .unwrap();
    let (_, state_after_first) = records::load_or_create_state(&store, "u1").await.unwrap();

    let second = guard
        .publish_on("u1", &layout, snapshot(), "The Daily Rag", day())
        .await;
    assert!(matches!(
        second,
        Err(MuckrakeError::AlreadyPublished { date }) if date == day()
    ));

    // Exactly one archival row; state unchanged by the rejected attempt.
    let rows = store
        .list(
            collections::PUBLISHED_EDITIONS,
            &Filter::new().eq("user_id", "u1"),
            None,
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    let (_, state_after_second) = records::load_or_create_state(&store, "u1").await.unwrap();
    assert_eq!(state_after_second.treasury, state_after_first.treasury);
    assert_eq!(state_after_second.total_published, 1);
}

#[tokio::test]
async fn different_users_publish_independently() {
    let (store, a, b, x) = seeded_store().await;
    let guard = PublishGuard::new(&store);
    let layout = full_grid(&a, &b, &x);

    guard
        .publish_on("u1", &layout, snapshot(), "The Daily Rag", day())
        .await
        .unwrap();
    guard
        .publish_on("u2", &layout, snapshot(), "The Morning Howl", day())
        .await
        .unwrap();
}

#[tokio::test]
async fn incomplete_grid_is_rejected_before_any_write() {
    let (store, a, _b, x) = seeded_store().await;
    let guard = PublishGuard::new(&store);

    let mut layout = Grid::empty();
    layout.slots[0] = slot(&a, VariantKind::Factual);
    layout.slots[1] = ad_slot(&x);

    let result = guard
        .publish_on("u1", &layout, snapshot(), "The Daily Rag", day())
        .await;
    assert!(matches!(result, Err(MuckrakeError::Validation(_))));

    let rows = store
        .list(collections::PUBLISHED_EDITIONS, &Filter::new(), None)
        .await
        .unwrap();
    assert!(rows.is_empty());
    let states = store
        .list(collections::GAME_STATES, &Filter::new(), None)
        .await
        .unwrap();
    assert!(states.is_empty());
}

#[tokio::test]
async fn grid_referencing_unknown_article_is_rejected() {
    let (store, a, b, x) = seeded_store().await;
    let guard = PublishGuard::new(&store);

    let mut layout = full_grid(&a, &b, &x);
    layout.slots[4] = slot("no-such-article", VariantKind::Factual);

    let result = guard
        .publish_on("u1", &layout, snapshot(), "The Daily Rag", day())
        .await;
    assert!(matches!(result, Err(MuckrakeError::Validation(_))));
}

#[tokio::test]
async fn missing_identity_is_rejected() {
    let (store, a, b, x) = seeded_store().await;
    let guard = PublishGuard::new(&store);

    let result = guard
        .publish_on("", &full_grid(&a, &b, &x), snapshot(), "The Daily Rag", day())
        .await;
    assert!(matches!(result, Err(MuckrakeError::Unauthenticated)));
}

#[tokio::test]
async fn streak_increments_on_consecutive_days_and_resets_after_gaps() {
    let (store, a, b, x) = seeded_store().await;
    let guard = PublishGuard::new(&store);
    let layout = full_grid(&a, &b, &x);

    let d1 = day();
    let d2 = d1.checked_add_days(Days::new(1)).unwrap();
    let d4 = d1.checked_add_days(Days::new(3)).unwrap();

    guard.publish_on("u1", &layout, snapshot(), "Rag", d1).await.unwrap();
    guard.publish_on("u1", &layout, snapshot(), "Rag", d2).await.unwrap();
    let (_, state) = records::load_or_create_state(&store, "u1").await.unwrap();
    assert_eq!(state.publish_streak, 2);

    guard.publish_on("u1", &layout, snapshot(), "Rag", d4).await.unwrap();
    let (_, state) = records::load_or_create_state(&store, "u1").await.unwrap();
    assert_eq!(state.publish_streak, 1);
    assert_eq!(state.total_published, 3);
}

#[tokio::test]
async fn archive_survives_deletion_of_source_articles() {
    let (store, a, b, x) = seeded_store().await;
    let guard = PublishGuard::new(&store);

    guard
        .publish_on("u1", &full_grid(&a, &b, &x), snapshot(), "The Daily Rag", day())
        .await
        .unwrap();

    // Re-ingestion wipes the day's pool.
    let edition = records::edition_for_date(&store, day()).await.unwrap().unwrap();
    records::delete_edition_cascade(&store, &edition.id).await.unwrap();

    let archived = records::published_for_user(&store, "u1").await.unwrap();
    assert_eq!(archived.len(), 1);
    assert!(archived[0].grid_layout[0].headline.starts_with("Factual"));
    assert!(!archived[0].grid_layout[2].body.is_empty());
}
