//! One loaded dataset and the scores derived from it

use crate::models::{DatasetDocument, GpuOffer};
use crate::scoring::ScoreCache;
use std::collections::BTreeSet;

/// Immutable offer set plus its score cache
///
/// The cache lives exactly as long as the snapshot; loading a new dataset
/// means building a new `Snapshot`.
#[derive(Debug)]
pub struct Snapshot {
    last_updated: String,
    offers: Vec<GpuOffer>,
    cache: ScoreCache,
}

impl Snapshot {
    pub fn new(last_updated: impl Into<String>, offers: Vec<GpuOffer>) -> Self {
        Self {
            last_updated: last_updated.into(),
            offers,
            cache: ScoreCache::new(),
        }
    }

    pub fn from_document(doc: DatasetDocument) -> Self {
        Self::new(doc.last_updated, doc.data)
    }

    pub fn last_updated(&self) -> &str {
        &self.last_updated
    }

    pub fn offers(&self) -> &[GpuOffer] {
        &self.offers
    }

    pub fn cache(&self) -> &ScoreCache {
        &self.cache
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&GpuOffer> {
        self.offers.iter().find(|o| o.id == id)
    }

    pub fn facets(&self) -> Facets {
        Facets::collect(&self.offers)
    }
}

/// Sorted distinct values offered by the filter UI
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Facets {
    pub models: Vec<String>,
    pub providers: Vec<String>,
    pub regions: Vec<String>,
}

impl Facets {
    pub fn collect(offers: &[GpuOffer]) -> Self {
        let mut models = BTreeSet::new();
        let mut providers = BTreeSet::new();
        let mut regions = BTreeSet::new();
        for offer in offers {
            models.insert(offer.model.clone());
            providers.insert(offer.provider.clone());
            regions.insert(offer.region.clone());
        }
        Self {
            models: models.into_iter().collect(),
            providers: providers.into_iter().collect(),
            regions: regions.into_iter().collect(),
        }
    }
}
