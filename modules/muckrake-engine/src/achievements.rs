//! Achievement catalog and evaluator.
//!
//! Predicates are independent; evaluation order does not matter and one
//! failing predicate never blocks the others. Unlock idempotence is
//! check-before-insert backed by the (user_id, achievement_id) unique index,
//! so even a racing duplicate insert resolves to the existing unlock.

use chrono::Utc;
use tracing::warn;

use muckrake_common::types::*;
use muckrake_common::MuckrakeError;
use muckrake_store::{records, RecordStore};

#[derive(Debug, Clone, Copy)]
pub enum Condition {
    TotalPublished(u32),
    BestScore(i64),
    Streak(u32),
    Treasury(i64),
    Readers(i64),
    Credibility(i64),
    FactionStanding(Faction, i32),
    UpgradesOwned(usize),
}

impl Condition {
    pub fn satisfied(&self, state: &UserGameState) -> bool {
        match *self {
            Condition::TotalPublished(n) => state.total_published >= n,
            Condition::BestScore(n) => state.best_score >= n,
            Condition::Streak(n) => state.publish_streak >= n,
            Condition::Treasury(n) => state.treasury >= n,
            Condition::Readers(n) => state.readers >= n,
            Condition::Credibility(n) => state.credibility >= n,
            Condition::FactionStanding(faction, n) => state.faction_standing.get(faction) >= n,
            Condition::UpgradesOwned(n) => state.purchased_upgrades.len() >= n,
        }
    }
}

pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub condition: Condition,
}

/// The static catalog. Ids are stable — they key the unlock records.
pub fn catalog() -> &'static [AchievementDef] {
    static CATALOG: &[AchievementDef] = &[
        AchievementDef {
            id: "first_edition",
            name: "Stop the Presses",
            description: "Publish your first edition.",
            condition: Condition::TotalPublished(1),
        },
        AchievementDef {
            id: "seasoned_editor",
            name: "Seasoned Editor",
            description: "Publish ten editions.",
            condition: Condition::TotalPublished(10),
        },
        AchievementDef {
            id: "ink_in_the_veins",
            name: "Ink in the Veins",
            description: "Publish fifty editions.",
            condition: Condition::TotalPublished(50),
        },
        AchievementDef {
            id: "breakout_story",
            name: "Breakout Story",
            description: "Score 100 or better with a single edition.",
            condition: Condition::BestScore(100),
        },
        AchievementDef {
            id: "legendary_scoop",
            name: "Legendary Scoop",
            description: "Score 500 or better with a single edition.",
            condition: Condition::BestScore(500),
        },
        AchievementDef {
            id: "daily_grind",
            name: "Daily Grind",
            description: "Publish seven days in a row.",
            condition: Condition::Streak(7),
        },
        AchievementDef {
            id: "deep_pockets",
            name: "Deep Pockets",
            description: "Hold 5,000 in the treasury.",
            condition: Condition::Treasury(5_000),
        },
        AchievementDef {
            id: "mass_readership",
            name: "Mass Readership",
            description: "Reach 1,000 regular readers.",
            condition: Condition::Readers(1_000),
        },
        AchievementDef {
            id: "trusted_masthead",
            name: "Trusted Masthead",
            description: "Reach 90 credibility.",
            condition: Condition::Credibility(90),
        },
        AchievementDef {
            id: "voice_of_the_workers",
            name: "Voice of the Workers",
            description: "Accumulate +50 standing with the workers.",
            condition: Condition::FactionStanding(Faction::Workers, 50),
        },
        AchievementDef {
            id: "salon_favorite",
            name: "Salon Favorite",
            description: "Accumulate +50 standing with the bohemians.",
            condition: Condition::FactionStanding(Faction::Bohemians, 50),
        },
        AchievementDef {
            id: "first_upgrade",
            name: "Modern Machinery",
            description: "Buy your first press upgrade.",
            condition: Condition::UpgradesOwned(1),
        },
    ];
    CATALOG
}

/// Evaluate the catalog against `state` and persist any new unlocks.
/// Returns the ids unlocked by this evaluation.
pub async fn evaluate<S: RecordStore + ?Sized>(
    store: &S,
    user_id: &str,
    state: &UserGameState,
) -> Result<Vec<String>, MuckrakeError> {
    let already: std::collections::HashSet<String> =
        records::unlocked_achievement_ids(store, user_id)
            .await?
            .into_iter()
            .collect();

    let mut unlocked = Vec::new();
    for def in catalog() {
        if already.contains(def.id) || !def.condition.satisfied(state) {
            continue;
        }
        let row = AchievementUnlock {
            id: String::new(),
            user_id: user_id.to_string(),
            achievement_id: def.id.to_string(),
            unlocked_at: Utc::now(),
        };
        match records::create_unlock(store, &row).await {
            Ok(true) => unlocked.push(def.id.to_string()),
            Ok(false) => {} // raced another evaluator; already unlocked
            Err(e) => {
                // Isolated: one failed predicate write must not block the rest.
                warn!(user_id, achievement = def.id, error = %e, "unlock write failed");
            }
        }
    }
    Ok(unlocked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let ids: std::collections::HashSet<_> = catalog().iter().map(|d| d.id).collect();
        assert_eq!(ids.len(), catalog().len());
    }

    #[test]
    fn conditions_evaluate_against_state() {
        let mut state = UserGameState::new("u1");
        state.total_published = 1;
        state.best_score = 120;
        state.faction_standing.add(Faction::Workers, 60);

        assert!(Condition::TotalPublished(1).satisfied(&state));
        assert!(!Condition::TotalPublished(10).satisfied(&state));
        assert!(Condition::BestScore(100).satisfied(&state));
        assert!(!Condition::BestScore(500).satisfied(&state));
        assert!(Condition::FactionStanding(Faction::Workers, 50).satisfied(&state));
        assert!(!Condition::FactionStanding(Faction::Clergy, 50).satisfied(&state));
        assert!(!Condition::UpgradesOwned(1).satisfied(&state));
    }
}
