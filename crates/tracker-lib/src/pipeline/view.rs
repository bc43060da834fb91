//! Memoized filter -> order -> page view over a snapshot

use super::filter::FilterSpec;
use super::sort::{apply_rank_mode, sort_offers, RankMode, SortState};
use crate::models::GpuOffer;
use crate::scoring::{normalize_value_scores, NormalizedValue};
use crate::snapshot::Snapshot;
use serde::Serialize;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const PAGE_SIZE: usize = 50;

/// `ceil(total / page_size)`
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Items of 1-based `page`; out-of-range pages are empty
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = (start + page_size).min(items.len());
    &items[start..end]
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<'a> {
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
    pub items: Vec<&'a GpuOffer>,
}

impl Page<'_> {
    pub fn cheapest_price(&self) -> Option<f64> {
        self.items
            .iter()
            .map(|o| o.price_per_hour)
            .min_by(|a, b| a.total_cmp(b))
    }
}

/// Offer paired with its position in the snapshot
struct Indexed<'a> {
    index: usize,
    offer: &'a GpuOffer,
}

impl Borrow<GpuOffer> for Indexed<'_> {
    fn borrow(&self) -> &GpuOffer {
        self.offer
    }
}

/// Interactive view state
///
/// The filter stage is recomputed only when the filter spec changes; the
/// ordering stage only when the filtered set, sort or rank mode changes.
/// Stages hold indices into the snapshot.
pub struct OfferView {
    snapshot: Arc<Snapshot>,
    filters: FilterSpec,
    sort: SortState,
    rank: RankMode,
    page: usize,
    filtered: Option<Vec<usize>>,
    ordered: Option<Vec<usize>>,
    value_scores: Option<HashMap<String, NormalizedValue>>,
    filter_runs: usize,
    order_runs: usize,
}

impl OfferView {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Self {
            snapshot,
            filters: FilterSpec::default(),
            sort: SortState::default(),
            rank: RankMode::default(),
            page: 1,
            filtered: None,
            ordered: None,
            value_scores: None,
            filter_runs: 0,
            order_runs: 0,
        }
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    pub fn rank(&self) -> RankMode {
        self.rank
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    /// Times the filter predicate has been run over the dataset
    pub fn filter_runs(&self) -> usize {
        self.filter_runs
    }

    /// Times the ordering stage has been recomputed
    pub fn order_runs(&self) -> usize {
        self.order_runs
    }

    pub fn set_filters(&mut self, filters: FilterSpec) {
        if filters == self.filters {
            return;
        }
        self.filters = filters;
        self.filtered = None;
        self.ordered = None;
        self.value_scores = None;
        self.page = 1;
    }

    pub fn set_sort(&mut self, sort: SortState) {
        if sort == self.sort {
            return;
        }
        self.sort = sort;
        self.ordered = None;
        self.page = 1;
    }

    pub fn set_rank(&mut self, rank: RankMode) {
        if rank == self.rank {
            return;
        }
        self.rank = rank;
        self.ordered = None;
        self.page = 1;
    }

    /// Replace the dataset; every stage is recomputed
    pub fn set_snapshot(&mut self, snapshot: Arc<Snapshot>) {
        self.snapshot = snapshot;
        self.filtered = None;
        self.ordered = None;
        self.value_scores = None;
        self.page = 1;
    }

    /// Move to `page`, clamped to `[1, page_count]`
    pub fn set_page(&mut self, page: usize) {
        let count = page_count(self.ensure_filtered().len(), PAGE_SIZE).max(1);
        self.page = page.clamp(1, count);
    }

    fn ensure_filtered(&mut self) -> &[usize] {
        if self.filtered.is_none() {
            let filters = &self.filters;
            let indices: Vec<usize> = self
                .snapshot
                .offers()
                .iter()
                .enumerate()
                .filter(|(_, o)| filters.matches(o))
                .map(|(i, _)| i)
                .collect();
            self.filter_runs += 1;
            debug!(matched = indices.len(), total = self.snapshot.len(), "Filter stage recomputed");
            self.filtered = Some(indices);
        }
        self.filtered.as_deref().unwrap_or_default()
    }

    fn ensure_ordered(&mut self) {
        self.ensure_filtered();
        if self.ordered.is_some() {
            return;
        }
        let snapshot = Arc::clone(&self.snapshot);
        let offers = snapshot.offers();
        let filtered = self.filtered.as_deref().unwrap_or_default();

        let mut view: Vec<Indexed<'_>> = filtered
            .iter()
            .map(|&index| Indexed { index, offer: &offers[index] })
            .collect();
        sort_offers(&mut view, self.sort, snapshot.cache());
        apply_rank_mode(&mut view, self.rank, snapshot.cache());

        let ordered = view.iter().map(|entry| entry.index).collect();
        self.order_runs += 1;
        self.ordered = Some(ordered);
    }

    /// Filtered offers in dataset order
    pub fn filtered(&mut self) -> Vec<&GpuOffer> {
        self.ensure_filtered();
        let offers = self.snapshot.offers();
        self.filtered
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|&i| &offers[i])
            .collect()
    }

    /// Filtered offers in final order, across all pages
    pub fn processed(&mut self) -> Vec<&GpuOffer> {
        self.ensure_ordered();
        let offers = self.snapshot.offers();
        self.ordered
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|&i| &offers[i])
            .collect()
    }

    pub fn page(&mut self) -> Page<'_> {
        self.ensure_ordered();
        let ordered = self.ordered.as_deref().unwrap_or_default();
        let offers = self.snapshot.offers();
        let items = paginate(ordered, self.page, PAGE_SIZE)
            .iter()
            .map(|&i| &offers[i])
            .collect();
        Page {
            page: self.page,
            page_count: page_count(ordered.len(), PAGE_SIZE),
            total: ordered.len(),
            items,
        }
    }

    /// Value scores normalized over the filtered subset; independent of ordering
    pub fn value_scores(&mut self) -> &HashMap<String, NormalizedValue> {
        if self.value_scores.is_none() {
            self.ensure_filtered();
            let offers = self.snapshot.offers();
            let subset = self
                .filtered
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|&i| &offers[i]);
            let scores = normalize_value_scores(subset, self.snapshot.cache());
            self.value_scores = Some(scores);
        }
        self.value_scores.get_or_insert_with(HashMap::new)
    }
}
