//! Filter -> sort -> rank -> paginate pipeline
//!
//! The filter stage and the ordering stage are separate so that sort-only or
//! rank-only changes never rescan the dataset. [`OfferView`] memoizes both.

mod filter;
mod picks;
mod sort;
mod view;

pub use filter::{filter_offers, FilterSpec, GpuCount, WorkloadPreset, DEFAULT_MAX_PRICE};
pub use picks::{best_picks, BestPicks};
pub use sort::{apply_rank_mode, sort_offers, RankMode, SortDirection, SortField, SortState};
pub use view::{page_count, paginate, OfferView, Page, PAGE_SIZE};

use crate::models::GpuOffer;
use crate::scoring::ScoreCache;

/// One-shot run of every stage; returns the full ordered result
pub fn process<'a>(
    offers: &'a [GpuOffer],
    spec: &FilterSpec,
    sort: SortState,
    rank: RankMode,
    cache: &ScoreCache,
) -> Vec<&'a GpuOffer> {
    let mut out = filter_offers(offers, spec);
    sort_offers(&mut out, sort, cache);
    apply_rank_mode(&mut out, rank, cache);
    out
}
