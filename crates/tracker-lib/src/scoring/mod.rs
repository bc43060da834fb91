//! Scoring engine
//!
//! Pure per-offer heuristics plus an explicit [`ScoreCache`] whose lifetime
//! is tied to one loaded dataset snapshot. Value-score normalization is the
//! only cross-offer computation and is always relative to a caller-supplied
//! subset.

mod heuristics;

pub use heuristics::{
    continuity_label, continuity_score, friction_score, predictable_score, procurement_friction,
    value_score, volatility, ContinuityLabel, RiskLevel, ValueScore, VolatilityLevel,
};

use crate::models::GpuOffer;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;

/// Memoized derived scores keyed by offer id
///
/// Offer ids are immutable within a snapshot, so entries never go stale.
/// Build a new cache whenever a new snapshot is loaded.
#[derive(Debug, Default)]
pub struct ScoreCache {
    continuity: DashMap<String, u8>,
    value: DashMap<String, ValueScore>,
    predictable: DashMap<String, f64>,
    friction: DashMap<String, f64>,
}

impl ScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn continuity(&self, offer: &GpuOffer) -> u8 {
        if let Some(score) = self.continuity.get(&offer.id) {
            return *score;
        }
        let score = continuity_score(offer);
        self.continuity.insert(offer.id.clone(), score);
        score
    }

    pub fn value(&self, offer: &GpuOffer) -> ValueScore {
        if let Some(score) = self.value.get(&offer.id) {
            return *score;
        }
        let score = value_score(offer, self.continuity(offer));
        self.value.insert(offer.id.clone(), score);
        score
    }

    pub fn predictable(&self, offer: &GpuOffer) -> f64 {
        if let Some(score) = self.predictable.get(&offer.id) {
            return *score;
        }
        let score = predictable_score(offer, self.continuity(offer));
        self.predictable.insert(offer.id.clone(), score);
        score
    }

    pub fn friction(&self, offer: &GpuOffer) -> f64 {
        if let Some(score) = self.friction.get(&offer.id) {
            return *score;
        }
        let score = friction_score(offer);
        self.friction.insert(offer.id.clone(), score);
        score
    }

    /// Number of offers with a cached continuity score
    pub fn len(&self) -> usize {
        self.continuity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.continuity.is_empty()
    }
}

/// Value score of one offer relative to a subset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedValue {
    /// 0 to 100, `None` when the offer has no raw value
    pub normalized: Option<u8>,
    pub raw: Option<f64>,
    pub tflops: f64,
    pub is_top_value: bool,
}

/// Subsets at or below this size never flag a top value
const TOP_VALUE_MIN_SUBSET: usize = 10;

/// Normalize value scores over `subset`, using its best adjusted value as 100
pub fn normalize_value_scores<'a, I>(subset: I, cache: &ScoreCache) -> HashMap<String, NormalizedValue>
where
    I: IntoIterator<Item = &'a GpuOffer>,
{
    let scored: Vec<(&GpuOffer, ValueScore)> = subset
        .into_iter()
        .map(|offer| (offer, cache.value(offer)))
        .collect();

    let max_raw = scored
        .iter()
        .filter_map(|(_, vs)| vs.raw)
        .fold(0.0_f64, f64::max);

    // First encountered wins ties
    let mut best_per_model: HashMap<&str, (&str, f64)> = HashMap::new();
    for (offer, vs) in &scored {
        let Some(raw) = vs.raw else { continue };
        match best_per_model.get(offer.model.as_str()) {
            Some((_, best)) if *best >= raw => {}
            _ => {
                best_per_model.insert(offer.model.as_str(), (offer.id.as_str(), raw));
            }
        }
    }

    let large_enough = scored.len() > TOP_VALUE_MIN_SUBSET;
    scored
        .iter()
        .map(|(offer, vs)| {
            let normalized = match vs.raw {
                Some(raw) if max_raw > 0.0 => Some((raw / max_raw * 100.0).round() as u8),
                _ => None,
            };
            let is_top_value = vs.raw.is_some()
                && large_enough
                && best_per_model
                    .get(offer.model.as_str())
                    .is_some_and(|(id, _)| *id == offer.id);
            (
                offer.id.clone(),
                NormalizedValue {
                    normalized,
                    raw: vs.raw,
                    tflops: vs.tflops,
                    is_top_value,
                },
            )
        })
        .collect()
}
