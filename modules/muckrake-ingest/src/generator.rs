//! AI article generation.
//!
//! One model call per feed item returns the three tonal variants and the
//! metadata envelope together. Keeping the call atomic is what guarantees
//! the variants describe the same event — two calls could drift onto
//! different subjects. The response is untrusted: variants must survive
//! validation or the item fails; metadata degrades to safe defaults.

use ai_client::{util, AiError, Claude};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::debug;

use muckrake_common::types::*;
use muckrake_common::MuckrakeError;

const MAX_SOURCE_BODY_BYTES: usize = 4000;
const MAX_TOPIC_TAGS: usize = 8;

const SYSTEM_PROMPT: &str = "\
You rewrite real news items for a satirical newspaper game. For each item you \
produce three versions of the SAME story:
- factual: dry, accurate, mildly ironic
- sensationalist: breathless tabloid hysteria
- propaganda: shameless cheerleading for whoever holds power in the story

Hard rule: all three versions must describe the same underlying event and name \
the same people, places and organizations as the source. Never swap in a \
different actor, invent a new subject, or change what happened — only the tone \
changes.

Also extract metadata: short topic tags; overall sentiment of the source \
(positive, neutral or negative); the city the story is about (empty if none); \
the ISO 3166-1 alpha-2 country code (or GLOBAL if worldwide); and an audience \
score from -10 to 10 for each faction describing how the story plays to them: \
workers, industrialists, patriots, radicals, clergy, scholars, bohemians, \
bureaucrats.";

/// Wire shape the model is forced to fill. Variant fields are required —
/// serde rejects an envelope without them; metadata fields are optional and
/// sanitized afterwards.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct DraftEnvelope {
    pub factual_headline: String,
    pub factual_body: String,
    pub sensationalist_headline: String,
    pub sensationalist_body: String,
    pub propaganda_headline: String,
    pub propaganda_body: String,
    #[serde(default)]
    pub topic_tags: Vec<String>,
    #[serde(default)]
    pub sentiment: String,
    #[serde(default)]
    pub location_city: String,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub audience_scores: serde_json::Value,
}

/// A generated article before it is attached to an edition.
#[derive(Debug, Clone)]
pub struct GeneratedDraft {
    pub variants: VariantSet,
    pub topic_tags: Vec<String>,
    pub sentiment: Sentiment,
    pub location_city: String,
    pub country_code: String,
    pub audience_scores: AudienceScores,
}

#[async_trait]
pub trait ArticleGenerator: Send + Sync {
    /// Produce variants and metadata for one item in a single atomic call.
    async fn generate(&self, item: &RawFeedItem) -> Result<GeneratedDraft, MuckrakeError>;
}

pub struct AiGenerator {
    client: Claude,
}

impl AiGenerator {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Claude::new(api_key, model),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.client = self.client.with_base_url(url);
        self
    }
}

#[async_trait]
impl ArticleGenerator for AiGenerator {
    async fn generate(&self, item: &RawFeedItem) -> Result<GeneratedDraft, MuckrakeError> {
        let prompt = build_prompt(item);
        debug!(title = %item.title, "generating article");

        let envelope: DraftEnvelope = self
            .client
            .extract(SYSTEM_PROMPT, prompt)
            .await
            .map_err(|e| match e {
                AiError::Malformed(detail) => MuckrakeError::Parse(detail),
                other => MuckrakeError::Network(other.to_string()),
            })?;

        sanitize(envelope)
    }
}

fn build_prompt(item: &RawFeedItem) -> String {
    let body = util::truncate_to_char_boundary(&item.body, MAX_SOURCE_BODY_BYTES);
    format!(
        "Source item:\n\nTITLE: {}\n\nBODY: {}\n\nSOURCE URL: {}",
        item.title, body, item.source_url
    )
}

/// Validate the variants (an unusable variant fails the item) and coerce the
/// metadata to safe values (malformed metadata never fails the item).
pub(crate) fn sanitize(envelope: DraftEnvelope) -> Result<GeneratedDraft, MuckrakeError> {
    let variant = |headline: &str, body: &str| -> Result<Variant, MuckrakeError> {
        let headline = headline.trim();
        let body = body.trim();
        if headline.is_empty() || body.is_empty() {
            return Err(MuckrakeError::Parse(
                "variant with empty headline or body".to_string(),
            ));
        }
        Ok(Variant {
            headline: headline.to_string(),
            body: body.to_string(),
        })
    };

    let variants = VariantSet {
        factual: variant(&envelope.factual_headline, &envelope.factual_body)?,
        sensationalist: variant(
            &envelope.sensationalist_headline,
            &envelope.sensationalist_body,
        )?,
        propaganda: variant(&envelope.propaganda_headline, &envelope.propaganda_body)?,
    };

    let topic_tags: Vec<String> = envelope
        .topic_tags
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .take(MAX_TOPIC_TAGS)
        .collect();

    Ok(GeneratedDraft {
        variants,
        topic_tags,
        sentiment: Sentiment::from_loose(&envelope.sentiment),
        location_city: envelope.location_city.trim().to_string(),
        country_code: normalize_country_code(&envelope.country_code),
        audience_scores: AudienceScores::from_loose(&envelope.audience_scores),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> DraftEnvelope {
        DraftEnvelope {
            factual_headline: "Council approves budget".to_string(),
            factual_body: "The council approved the budget on Tuesday.".to_string(),
            sensationalist_headline: "BUDGET PANIC GRIPS CITY".to_string(),
            sensationalist_body: "Insiders reveal chaos behind the vote.".to_string(),
            propaganda_headline: "Heroic council secures prosperity".to_string(),
            propaganda_body: "Once again our leaders deliver.".to_string(),
            topic_tags: vec!["  Politics ".to_string(), String::new()],
            sentiment: "NEGATIVE".to_string(),
            location_city: " Springfield ".to_string(),
            country_code: "fr".to_string(),
            audience_scores: serde_json::json!({"workers": 14, "clergy": -2, "aliens": 5}),
        }
    }

    #[test]
    fn sanitize_normalizes_metadata() {
        let draft = sanitize(envelope()).unwrap();
        assert_eq!(draft.topic_tags, vec!["politics".to_string()]);
        assert_eq!(draft.sentiment, Sentiment::Negative);
        assert_eq!(draft.location_city, "Springfield");
        assert_eq!(draft.country_code, "FR");
        assert_eq!(draft.audience_scores.get(Faction::Workers), 10);
        assert_eq!(draft.audience_scores.get(Faction::Clergy), -2);
    }

    #[test]
    fn sanitize_rejects_country_names() {
        let mut env = envelope();
        env.country_code = "France".to_string();
        let draft = sanitize(env).unwrap();
        assert_eq!(draft.country_code, "XX");
    }

    #[test]
    fn sanitize_defaults_malformed_metadata() {
        let mut env = envelope();
        env.sentiment = "shouty".to_string();
        env.audience_scores = serde_json::json!("not an object");
        env.topic_tags = Vec::new();

        let draft = sanitize(env).unwrap();
        assert_eq!(draft.sentiment, Sentiment::Neutral);
        assert!(draft.topic_tags.is_empty());
        assert!(draft.audience_scores.iter().all(|(_, v)| v == 0));
    }

    #[test]
    fn sanitize_fails_items_with_unusable_variants() {
        let mut env = envelope();
        env.propaganda_body = "   ".to_string();
        assert!(matches!(sanitize(env), Err(MuckrakeError::Parse(_))));
    }

    #[test]
    fn prompt_truncates_oversized_bodies() {
        let item = RawFeedItem {
            title: "t".to_string(),
            body: "x".repeat(MAX_SOURCE_BODY_BYTES * 2),
            source_url: "https://example.com".to_string(),
            published: None,
        };
        let prompt = build_prompt(&item);
        assert!(prompt.len() < MAX_SOURCE_BODY_BYTES + 200);
    }
}
