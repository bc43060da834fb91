//! Sort and rank stages

use crate::models::GpuOffer;
use crate::scoring::ScoreCache;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    PricePerHour,
    Provider,
    Model,
    Availability,
    Vram,
    GpuCount,
    ValueScore,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price" | "pricePerHour" => Ok(SortField::PricePerHour),
            "provider" => Ok(SortField::Provider),
            "model" => Ok(SortField::Model),
            "availability" => Ok(SortField::Availability),
            "vram" => Ok(SortField::Vram),
            "gpus" | "gpuCount" => Ok(SortField::GpuCount),
            "value" | "valueScore" => Ok(SortField::ValueScore),
            other => Err(format!("unknown sort field '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            field: SortField::PricePerHour,
            direction: SortDirection::Asc,
        }
    }
}

/// Final ordering applied after the sort stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankMode {
    /// Keeps the sort order
    #[default]
    Cheapest,
    /// Ascending risk-adjusted monthly cost
    Predictable,
    /// Ascending procurement friction, then price
    Fast,
}

impl FromStr for RankMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cheapest" => Ok(RankMode::Cheapest),
            "predictable" => Ok(RankMode::Predictable),
            "fast" => Ok(RankMode::Fast),
            other => Err(format!("unknown rank mode '{}'", other)),
        }
    }
}

/// Case-insensitive comparison with a byte-order tiebreak.
///
/// This is Unicode lowercase folding followed by code point order, not a
/// locale collation: accented letters sort after `z` (`"Zeta" < "Émile"`)
/// and the order is identical on every host.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Unscored offers compare as -1 so they sort as worst
const UNSCORED_VALUE: f64 = -1.0;

fn compare_field(a: &GpuOffer, b: &GpuOffer, field: SortField, cache: &ScoreCache) -> Ordering {
    match field {
        SortField::PricePerHour => a.price_per_hour.total_cmp(&b.price_per_hour),
        SortField::Provider => compare_text(&a.provider, &b.provider),
        SortField::Model => compare_text(&a.model, &b.model),
        SortField::Vram => a.vram.total_cmp(&b.vram),
        SortField::GpuCount => a.gpu_count.cmp(&b.gpu_count),
        SortField::Availability => a.availability.weight().cmp(&b.availability.weight()),
        SortField::ValueScore => {
            let va = cache.value(a).raw.unwrap_or(UNSCORED_VALUE);
            let vb = cache.value(b).raw.unwrap_or(UNSCORED_VALUE);
            va.total_cmp(&vb)
        }
    }
}

fn offer_of<T: Borrow<GpuOffer>>(item: &T) -> &GpuOffer {
    Borrow::<GpuOffer>::borrow(item)
}

/// Order `offers` in place by `sort`
pub fn sort_offers<T: Borrow<GpuOffer>>(offers: &mut [T], sort: SortState, cache: &ScoreCache) {
    offers.sort_by(|a, b| {
        let ord = compare_field(offer_of(a), offer_of(b), sort.field, cache);
        match sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

/// Apply `mode` as the final ordering
pub fn apply_rank_mode<T: Borrow<GpuOffer>>(offers: &mut [T], mode: RankMode, cache: &ScoreCache) {
    let key = |item: &T| -> f64 {
        match mode {
            RankMode::Cheapest => 0.0,
            RankMode::Predictable => cache.predictable(offer_of(item)),
            RankMode::Fast => cache.friction(offer_of(item)),
        }
    };
    if mode != RankMode::Cheapest {
        offers.sort_by(|a, b| key(a).total_cmp(&key(b)));
    }
}
