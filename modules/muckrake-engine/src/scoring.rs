//! Deterministic layout scoring.
//!
//! `compute_preview` is a pure function: no I/O, no clock, no shared state.
//! The same call backs both the preview endpoint and the publish guard, which
//! is what makes the preview trustworthy.

use std::collections::HashMap;

use muckrake_common::types::*;

/// The tunable half of the engine. Every number the scoring formulas use
/// lives here under a version tag; changing a coefficient is a new version,
/// not an edit to the formulas.
#[derive(Debug, Clone)]
pub struct ScoringCoefficients {
    pub version: &'static str,

    /// Positive faction balance needed to double base sales.
    pub appeal_divisor: f64,
    /// Sales multiplier at zero credibility.
    pub credibility_floor: f64,
    /// Credibility points per +1.0 of sales multiplier.
    pub credibility_divisor: f64,
    /// Ceiling on the credibility multiplier.
    pub credibility_cap: f64,

    /// Outrage points per sensationalist slot.
    pub outrage_sensationalist: u32,
    /// Outrage points per propaganda slot.
    pub outrage_propaganda: u32,
    /// Outrage points per negative-sentiment article slot.
    pub outrage_negative: u32,

    /// Credibility gained per factual slot.
    pub cred_per_factual: i64,
    /// Credibility lost per propaganda slot.
    pub cred_per_propaganda: i64,
    /// Outrage level at which the extra credibility penalty kicks in.
    pub outrage_cred_threshold: u8,
    pub outrage_cred_penalty: i64,

    /// Share of sales that converts into regular readers.
    pub reader_conversion: f64,
    /// Readers lost per outrage point.
    pub outrage_churn: f64,

    pub score_sales_weight: f64,
    pub score_spread_penalty: f64,
    pub score_outrage_penalty: f64,
}

impl ScoringCoefficients {
    pub const fn v1() -> Self {
        Self {
            version: "v1",
            appeal_divisor: 100.0,
            credibility_floor: 0.5,
            credibility_divisor: 100.0,
            credibility_cap: 1.5,
            outrage_sensationalist: 15,
            outrage_propaganda: 25,
            outrage_negative: 10,
            cred_per_factual: 2,
            cred_per_propaganda: 3,
            outrage_cred_threshold: 60,
            outrage_cred_penalty: 5,
            reader_conversion: 0.1,
            outrage_churn: 0.5,
            score_sales_weight: 1.0,
            score_spread_penalty: 1.0,
            score_outrage_penalty: 2.0,
        }
    }
}

impl Default for ScoringCoefficients {
    fn default() -> Self {
        Self::v1()
    }
}

/// Score a finalized grid against the day's article pool and ad catalog.
///
/// Slots referencing unknown ids contribute nothing — resolution errors are
/// the publish guard's concern, not the scorer's. An entirely empty grid is
/// the zero result.
pub fn compute_preview(
    grid: &Grid,
    articles: &HashMap<String, GeneratedArticle>,
    ads: &HashMap<String, Ad>,
    snapshot: StatsSnapshot,
    coefficients: &ScoringCoefficients,
) -> SubmissionResult {
    if grid.slots.iter().all(SlotContent::is_empty) {
        return SubmissionResult {
            score: 0,
            sales: 0,
            outrage_meter: 0,
            faction_balance: FactionBalance::zero(),
            credibility_delta: 0,
            reader_delta: 0,
        };
    }

    let mut faction_balance = FactionBalance::zero();
    let mut factual_slots = 0i64;
    let mut sensationalist_slots = 0u32;
    let mut propaganda_slots = 0i64;
    let mut negative_slots = 0u32;
    let mut ad_revenue = 0i64;

    for (kind, slot) in grid.slots_with_kind() {
        match slot {
            SlotContent::Article {
                article_id,
                variant,
            } => {
                let Some(article) = articles.get(article_id) else {
                    continue;
                };
                faction_balance.accumulate(&article.audience_scores, kind.weight());
                match variant {
                    VariantKind::Factual => factual_slots += 1,
                    VariantKind::Sensationalist => sensationalist_slots += 1,
                    VariantKind::Propaganda => propaganda_slots += 1,
                }
                if article.sentiment == Sentiment::Negative {
                    negative_slots += 1;
                }
            }
            SlotContent::Ad { ad_id } => {
                if let Some(ad) = ads.get(ad_id) {
                    ad_revenue += ad.revenue;
                }
            }
            SlotContent::Empty => {}
        }
    }

    let outrage_meter = (sensationalist_slots * coefficients.outrage_sensationalist
        + propaganda_slots as u32 * coefficients.outrage_propaganda
        + negative_slots * coefficients.outrage_negative)
        .min(100) as u8;

    let appeal = faction_balance.positive_sum() as f64;
    let credibility_factor = (coefficients.credibility_floor
        + snapshot.credibility.max(0) as f64 / coefficients.credibility_divisor)
        .min(coefficients.credibility_cap);

    let base_readership = snapshot.readers.max(0) as f64;
    let sales = (base_readership * (1.0 + appeal / coefficients.appeal_divisor)
        * credibility_factor
        + ad_revenue as f64)
        .round() as i64;

    let mut credibility_delta = factual_slots * coefficients.cred_per_factual
        - propaganda_slots * coefficients.cred_per_propaganda;
    if outrage_meter >= coefficients.outrage_cred_threshold {
        credibility_delta -= coefficients.outrage_cred_penalty;
    }

    let reader_delta = (sales as f64 * coefficients.reader_conversion).round() as i64
        - (outrage_meter as f64 * coefficients.outrage_churn).round() as i64;

    let spread = faction_balance.spread() as f64;
    let score = (sales as f64 * coefficients.score_sales_weight
        - spread * coefficients.score_spread_penalty
        - outrage_meter as f64 * coefficients.score_outrage_penalty)
        .round() as i64;

    SubmissionResult {
        score,
        sales,
        outrage_meter,
        faction_balance,
        credibility_delta,
        reader_delta,
    }
}
