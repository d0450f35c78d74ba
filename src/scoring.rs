//! Lead confidence scoring.
//!
//! The final score blends the two completeness scores with the AI coherence
//! score using fixed 15% / 15% / 70% weights. Every view that shows a final
//! score, single lead or batch, goes through this module.
//!
//! Presence is checked strictly: a score of `0` is a real score and takes part
//! in every computation. Only a missing value makes a result unavailable.

use serde::Serialize;

use crate::models::{Assessment, Lead};

pub const ACQUISITION_WEIGHT: f64 = 0.15;
pub const ENRICHMENT_WEIGHT: f64 = 0.15;
pub const CONFIDENCE_WEIGHT: f64 = 0.70;

/// Rounds half-up to the nearest integer (`84.5 -> 85`, `-0.5 -> 0`).
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Weighted blend of the three component scores, rounded half-up.
pub fn weighted_final_score(acquisition: f64, enrichment: f64, confidence: f64) -> i64 {
    round_half_up(
        acquisition * ACQUISITION_WEIGHT
            + enrichment * ENRICHMENT_WEIGHT
            + confidence * CONFIDENCE_WEIGHT,
    )
}

/// Final confidence score of a lead.
///
/// Returns `None` unless the acquisition score, the enrichment score and the
/// assessment's confidence score are all present.
pub fn final_score(lead: &Lead, assessment: Option<&Assessment>) -> Option<i64> {
    let acquisition = lead.acquisition_completeness_score?;
    let enrichment = lead.enrichment_completeness_score?;
    let confidence = assessment?.confidence_score?;
    Some(weighted_final_score(acquisition, enrichment, confidence))
}

/// Averages over a batch of leads. `None` means no lead had the metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub avg_acquisition: Option<i64>,
    pub avg_enrichment: Option<i64>,
    pub avg_final: Option<i64>,
}

/// Computes the batch averages.
///
/// Each metric is averaged over the leads that carry it, independently of the
/// other metrics. The final average is taken over the rounded per-lead final
/// scores, using each lead's own `confidence_assessment`.
pub fn batch_summary(leads: &[Lead]) -> BatchSummary {
    BatchSummary {
        avg_acquisition: rounded_mean(
            leads
                .iter()
                .filter_map(|lead| lead.acquisition_completeness_score),
        ),
        avg_enrichment: rounded_mean(
            leads
                .iter()
                .filter_map(|lead| lead.enrichment_completeness_score),
        ),
        avg_final: rounded_mean(
            leads
                .iter()
                .filter_map(|lead| final_score(lead, lead.confidence_assessment.as_ref()))
                .map(|score| score as f64),
        ),
    }
}

fn rounded_mean(values: impl Iterator<Item = f64>) -> Option<i64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(round_half_up(sum / count as f64))
    }
}
