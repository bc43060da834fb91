//! Headline picks shown above the table

use crate::models::{Availability, Commitment, GpuOffer};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

fn h100_family() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)H100").expect("valid H100 pattern"))
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BestPicks<'a> {
    /// Lowest price per GB of total VRAM
    pub value: Option<&'a GpuOffer>,
    /// Cheapest non-spot H100
    pub h100: Option<&'a GpuOffer>,
    /// Cheapest highly available spot offer with at least 24 GB per GPU
    pub spot: Option<&'a GpuOffer>,
}

fn price_per_vram_gb(offer: &GpuOffer) -> f64 {
    offer.price_per_hour / offer.total_vram()
}

fn cheapest<'a>(offers: impl Iterator<Item = &'a GpuOffer>) -> Option<&'a GpuOffer> {
    offers.min_by(|a, b| a.price_per_hour.total_cmp(&b.price_per_hour))
}

/// Picks over in-stock offers of the full dataset
pub fn best_picks(offers: &[GpuOffer]) -> BestPicks<'_> {
    let live = || offers.iter().filter(|o| o.availability != Availability::OutOfStock);

    BestPicks {
        value: live()
            .filter(|o| o.vram > 0.0)
            .min_by(|a, b| price_per_vram_gb(a).total_cmp(&price_per_vram_gb(b))),
        h100: cheapest(
            live().filter(|o| h100_family().is_match(&o.model) && o.commitment != Commitment::Spot),
        ),
        spot: cheapest(live().filter(|o| {
            o.commitment == Commitment::Spot
                && o.vram >= 24.0
                && o.availability == Availability::High
        })),
    }
}
