//! Shared fixtures for the engine test suites.
#![allow(dead_code)]

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use muckrake_common::types::*;
use muckrake_store::{records, MemoryStore};

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 6).expect("valid fixture date")
}

pub fn snapshot() -> StatsSnapshot {
    StatsSnapshot {
        cash: 0,
        credibility: 50,
        readers: 100,
    }
}

pub fn article(id: &str, scores: &[(Faction, i8)], sentiment: Sentiment) -> GeneratedArticle {
    let mut audience_scores = AudienceScores::zero();
    for (faction, value) in scores {
        audience_scores.set(*faction, *value);
    }
    GeneratedArticle {
        id: id.to_string(),
        edition_id: "edition".to_string(),
        original_title: format!("Original {id}"),
        variants: VariantSet {
            factual: Variant {
                headline: format!("Factual {id}"),
                body: format!("Factual body {id}"),
            },
            sensationalist: Variant {
                headline: format!("SHOCKING {id}"),
                body: format!("Sensationalist body {id}"),
            },
            propaganda: Variant {
                headline: format!("Glorious {id}"),
                body: format!("Propaganda body {id}"),
            },
        },
        topic_tags: vec!["fixture".to_string()],
        sentiment,
        location_city: "Springfield".to_string(),
        country_code: "US".to_string(),
        date: day(),
        published_at: Utc::now(),
        audience_scores,
    }
}

pub fn ad(id: &str, revenue: i64) -> Ad {
    Ad {
        id: id.to_string(),
        name: format!("Ad {id}"),
        revenue,
    }
}

pub fn article_map(articles: &[GeneratedArticle]) -> HashMap<String, GeneratedArticle> {
    articles.iter().map(|a| (a.id.clone(), a.clone())).collect()
}

pub fn ad_map(ads: &[Ad]) -> HashMap<String, Ad> {
    ads.iter().map(|a| (a.id.clone(), a.clone())).collect()
}

pub fn slot(article_id: &str, variant: VariantKind) -> SlotContent {
    SlotContent::Article {
        article_id: article_id.to_string(),
        variant,
    }
}

pub fn ad_slot(ad_id: &str) -> SlotContent {
    SlotContent::Ad {
        ad_id: ad_id.to_string(),
    }
}

pub fn grid(slots: [SlotContent; 6]) -> Grid {
    Grid { slots }
}

/// Seed a game-schema memory store with today's edition, two articles and
/// one ad. Returns the store plus the stored article and ad ids.
pub async fn seeded_store() -> (MemoryStore, String, String, String) {
    let store = MemoryStore::with_game_schema();
    let edition = records::create_edition(
        &store,
        &DailyEdition {
            id: String::new(),
            date: day(),
            global_mood: Sentiment::Neutral,
            created_at: Utc::now(),
        },
    )
    .await
    .expect("seed edition");

    let mut a = article("", &[(Faction::Workers, 4), (Faction::Industrialists, -2)], Sentiment::Neutral);
    a.edition_id = edition.id.clone();
    let a = records::create_article(&store, &a).await.expect("seed article a");

    let mut b = article("", &[(Faction::Workers, 2), (Faction::Clergy, -5)], Sentiment::Negative);
    b.edition_id = edition.id.clone();
    let b = records::create_article(&store, &b).await.expect("seed article b");

    let x = records::create_ad(
        &store,
        &Ad {
            id: String::new(),
            name: "Crispy Cola".to_string(),
            revenue: 40,
        },
    )
    .await
    .expect("seed ad");

    (store, a.id, b.id, x.id)
}
