use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// --- Factions ---

/// The eight fixed audience segments whose approval the game tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Workers,
    Industrialists,
    Patriots,
    Radicals,
    Clergy,
    Scholars,
    Bohemians,
    Bureaucrats,
}

impl Faction {
    pub const ALL: [Faction; 8] = [
        Faction::Workers,
        Faction::Industrialists,
        Faction::Patriots,
        Faction::Radicals,
        Faction::Clergy,
        Faction::Scholars,
        Faction::Bohemians,
        Faction::Bureaucrats,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Faction::Workers => "workers",
            Faction::Industrialists => "industrialists",
            Faction::Patriots => "patriots",
            Faction::Radicals => "radicals",
            Faction::Clergy => "clergy",
            Faction::Scholars => "scholars",
            Faction::Bohemians => "bohemians",
            Faction::Bureaucrats => "bureaucrats",
        }
    }

    pub fn from_key(key: &str) -> Option<Faction> {
        Faction::ALL
            .iter()
            .copied()
            .find(|f| f.key() == key.trim().to_lowercase())
    }
}

impl std::fmt::Display for Faction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

pub const AUDIENCE_SCORE_MIN: i8 = -10;
pub const AUDIENCE_SCORE_MAX: i8 = 10;

/// Per-faction appeal of one article. Always carries exactly the eight fixed
/// faction keys; values are clamped to [-10, 10].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudienceScores(BTreeMap<Faction, i8>);

impl AudienceScores {
    pub fn zero() -> Self {
        Self(Faction::ALL.iter().map(|f| (*f, 0)).collect())
    }

    pub fn get(&self, faction: Faction) -> i8 {
        self.0.get(&faction).copied().unwrap_or(0)
    }

    pub fn set(&mut self, faction: Faction, value: i8) {
        self.0
            .insert(faction, value.clamp(AUDIENCE_SCORE_MIN, AUDIENCE_SCORE_MAX));
    }

    pub fn iter(&self) -> impl Iterator<Item = (Faction, i8)> + '_ {
        self.0.iter().map(|(f, v)| (*f, *v))
    }

    /// Lenient conversion from untrusted JSON: unknown keys are dropped,
    /// missing keys default to 0, values are rounded and clamped.
    pub fn from_loose(value: &serde_json::Value) -> Self {
        let mut scores = Self::zero();
        if let Some(map) = value.as_object() {
            for (key, v) in map {
                if let (Some(faction), Some(n)) = (Faction::from_key(key), v.as_f64()) {
                    let clamped = n
                        .round()
                        .clamp(AUDIENCE_SCORE_MIN as f64, AUDIENCE_SCORE_MAX as f64);
                    scores.set(faction, clamped as i8);
                }
            }
        }
        scores
    }
}

impl Default for AudienceScores {
    fn default() -> Self {
        Self::zero()
    }
}

impl<'de> Deserialize<'de> for AudienceScores {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_loose(&value))
    }
}

/// Signed per-faction accumulator (weighted slot contributions, or the
/// lifetime standing carried on a user's game state).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactionBalance(BTreeMap<Faction, i32>);

impl FactionBalance {
    pub fn zero() -> Self {
        Self(Faction::ALL.iter().map(|f| (*f, 0)).collect())
    }

    pub fn get(&self, faction: Faction) -> i32 {
        self.0.get(&faction).copied().unwrap_or(0)
    }

    pub fn add(&mut self, faction: Faction, delta: i32) {
        *self.0.entry(faction).or_insert(0) += delta;
    }

    /// Add one article's audience scores, multiplied by a slot weight.
    pub fn accumulate(&mut self, scores: &AudienceScores, weight: i32) {
        for (faction, value) in scores.iter() {
            self.add(faction, value as i32 * weight);
        }
    }

    pub fn merge(&mut self, other: &FactionBalance) {
        for (faction, value) in other.iter() {
            self.add(faction, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Faction, i32)> + '_ {
        self.0.iter().map(|(f, v)| (*f, *v))
    }

    /// Spread between the best- and worst-served faction.
    pub fn spread(&self) -> i32 {
        let max = self.0.values().max().copied().unwrap_or(0);
        let min = self.0.values().min().copied().unwrap_or(0);
        max - min
    }

    /// Sum of positive balances only — the audience actually drawn in.
    pub fn positive_sum(&self) -> i64 {
        self.0.values().filter(|v| **v > 0).map(|v| *v as i64).sum()
    }

    pub fn is_zero(&self) -> bool {
        self.0.values().all(|v| *v == 0)
    }

    pub fn from_loose(value: &serde_json::Value) -> Self {
        let mut balance = Self::zero();
        if let Some(map) = value.as_object() {
            for (key, v) in map {
                if let (Some(faction), Some(n)) = (Faction::from_key(key), v.as_i64()) {
                    balance.add(faction, n as i32);
                }
            }
        }
        balance
    }
}

impl Default for FactionBalance {
    fn default() -> Self {
        Self::zero()
    }
}

impl<'de> Deserialize<'de> for FactionBalance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_loose(&value))
    }
}

// --- Articles ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    Factual,
    Sensationalist,
    Propaganda,
}

impl std::fmt::Display for VariantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariantKind::Factual => write!(f, "factual"),
            VariantKind::Sensationalist => write!(f, "sensationalist"),
            VariantKind::Propaganda => write!(f, "propaganda"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    /// Parse-or-neutral: the model's sentiment string is never trusted.
    pub fn from_loose(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

/// One tonal rewrite of a source item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub headline: String,
    pub body: String,
}

/// The three rewrites of the same underlying event. Produced together from a
/// single model call so they can never drift onto different subjects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSet {
    pub factual: Variant,
    pub sensationalist: Variant,
    pub propaganda: Variant,
}

impl VariantSet {
    pub fn get(&self, kind: VariantKind) -> &Variant {
        match kind {
            VariantKind::Factual => &self.factual,
            VariantKind::Sensationalist => &self.sensationalist,
            VariantKind::Propaganda => &self.propaganda,
        }
    }
}

pub const COUNTRY_UNKNOWN: &str = "XX";
pub const COUNTRY_GLOBAL: &str = "GLOBAL";

/// Normalize a model-supplied country code. Accepts ISO 3166-1 alpha-2
/// (uppercased) and the `GLOBAL` sentinel; everything else becomes `XX`.
pub fn normalize_country_code(raw: &str) -> String {
    let code = raw.trim().to_uppercase();
    if code == COUNTRY_GLOBAL {
        return code;
    }
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase()) {
        code
    } else {
        COUNTRY_UNKNOWN.to_string()
    }
}

/// A raw item pulled from the external feed. Ephemeral; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFeedItem {
    pub title: String,
    pub body: String,
    pub source_url: String,
    pub published: Option<DateTime<Utc>>,
}

/// A fully generated satirical article, owned by exactly one daily edition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArticle {
    pub id: String,
    pub edition_id: String,
    pub original_title: String,
    pub variants: VariantSet,
    #[serde(default)]
    pub topic_tags: Vec<String>,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default)]
    pub location_city: String,
    #[serde(default = "default_country_code")]
    pub country_code: String,
    pub date: NaiveDate,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub audience_scores: AudienceScores,
}

fn default_country_code() -> String {
    COUNTRY_UNKNOWN.to_string()
}

/// The daily pool of generated articles players draw from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyEdition {
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub global_mood: Sentiment,
    pub created_at: DateTime<Utc>,
}

// --- Grid ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Headline,
    SubLead,
    Brief,
}

impl SlotKind {
    /// Fixed front-page layout: one headline, two sub-leads, three briefs.
    pub const LAYOUT: [SlotKind; 6] = [
        SlotKind::Headline,
        SlotKind::SubLead,
        SlotKind::SubLead,
        SlotKind::Brief,
        SlotKind::Brief,
        SlotKind::Brief,
    ];

    /// Reach weight applied to a slot's audience scores.
    pub fn weight(&self) -> i32 {
        match self {
            SlotKind::Headline => 3,
            SlotKind::SubLead => 2,
            SlotKind::Brief => 1,
        }
    }
}

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotKind::Headline => write!(f, "headline"),
            SlotKind::SubLead => write!(f, "sub_lead"),
            SlotKind::Brief => write!(f, "brief"),
        }
    }
}

/// What a player placed in one slot: an article variant, an ad, or nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotContent {
    Article {
        article_id: String,
        variant: VariantKind,
    },
    Ad {
        ad_id: String,
    },
    Empty,
}

impl SlotContent {
    pub fn is_empty(&self) -> bool {
        matches!(self, SlotContent::Empty)
    }
}

/// A finalized 6-slot front page, in `SlotKind::LAYOUT` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub slots: [SlotContent; 6],
}

impl Grid {
    pub fn empty() -> Self {
        Self {
            slots: std::array::from_fn(|_| SlotContent::Empty),
        }
    }

    pub fn slots_with_kind(&self) -> impl Iterator<Item = (SlotKind, &SlotContent)> {
        SlotKind::LAYOUT.into_iter().zip(self.slots.iter())
    }
}

/// A paid placement. Ads carry no audience scores, only flat revenue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ad {
    pub id: String,
    pub name: String,
    pub revenue: i64,
}

// --- Scoring & publishing ---

/// Player-visible stats at the moment of a submission or publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub cash: i64,
    pub credibility: i64,
    pub readers: i64,
}

/// The scoring engine's verdict on a layout. Ephemeral unless published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub score: i64,
    pub sales: i64,
    pub outrage_meter: u8,
    pub faction_balance: FactionBalance,
    pub credibility_delta: i64,
    pub reader_delta: i64,
}

/// Denormalized snapshot of one published slot. Keeps the archive readable
/// after the source articles are deleted with their edition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedSlot {
    pub kind: SlotKind,
    pub headline: String,
    pub body: String,
    #[serde(default)]
    pub variant: Option<VariantKind>,
    #[serde(default)]
    pub ad_name: Option<String>,
}

/// A player's finished front page for one day. At most one per (user, date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedEdition {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub newspaper_name: String,
    #[serde(default)]
    pub grid_layout: Vec<PublishedSlot>,
    pub stats: StatsSnapshot,
    pub published_at: DateTime<Utc>,
}

/// Persistent per-user economy. Mutated only by the publish guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserGameState {
    pub user_id: String,
    pub treasury: i64,
    pub credibility: i64,
    pub readers: i64,
    #[serde(default)]
    pub purchased_upgrades: Vec<String>,
    #[serde(default)]
    pub publish_streak: u32,
    #[serde(default)]
    pub last_publish_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_published: u32,
    #[serde(default)]
    pub best_score: i64,
    #[serde(default)]
    pub faction_standing: FactionBalance,
}

impl UserGameState {
    pub const STARTING_TREASURY: i64 = 500;
    pub const STARTING_CREDIBILITY: i64 = 50;
    pub const STARTING_READERS: i64 = 100;

    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            treasury: Self::STARTING_TREASURY,
            credibility: Self::STARTING_CREDIBILITY,
            readers: Self::STARTING_READERS,
            purchased_upgrades: Vec::new(),
            publish_streak: 0,
            last_publish_date: None,
            total_published: 0,
            best_score: 0,
            faction_standing: FactionBalance::zero(),
        }
    }
}

/// One unlocked achievement for one user. Unlocks are monotonic: a row is
/// written once and never duplicated or removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementUnlock {
    pub id: String,
    pub user_id: String,
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
}

// --- Ingestion jobs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal states are immutable.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStep {
    pub ts: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub articles_processed: u32,
    pub articles_failed: u32,
    pub edition_id: Option<String>,
}

/// Lifecycle record of one ingestion run, polled live by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionJob {
    pub id: String,
    pub date: NaiveDate,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: String,
    #[serde(default)]
    pub steps: Vec<JobStep>,
    #[serde(default)]
    pub result: Option<JobResult>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    #[default]
    Normal,
    Reset,
}
