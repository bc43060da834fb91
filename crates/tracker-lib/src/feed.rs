//! Dataset and price history feeds
//!
//! Records are decoded one by one: a record that fails to decode or violates
//! the offer invariants is dropped with a warning, never the whole load.

use crate::models::{DatasetDocument, GpuOffer, PriceHistory};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("invalid feed URL '{0}'")]
    InvalidUrl(String),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode dataset: {0}")]
    Decode(String),
}

/// Source of the current offer dataset and optional price history
#[async_trait]
pub trait OfferFeed: Send + Sync {
    async fn fetch_offers(&self) -> Result<DatasetDocument, FeedError>;

    /// History is optional; failures yield `None`
    async fn fetch_history(&self) -> Option<PriceHistory>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPayload {
    Document {
        #[serde(rename = "lastUpdated", default)]
        last_updated: String,
        data: Vec<serde_json::Value>,
    },
    Bare(Vec<serde_json::Value>),
}

/// Decode a dataset document or a bare array of offers
pub fn parse_dataset(bytes: &[u8]) -> Result<DatasetDocument, FeedError> {
    let payload: RawPayload =
        serde_json::from_slice(bytes).map_err(|e| FeedError::Decode(e.to_string()))?;
    let (last_updated, records) = match payload {
        RawPayload::Document { last_updated, data } => (Some(last_updated), data),
        RawPayload::Bare(data) => (None, data),
    };

    let total = records.len();
    let mut offers = Vec::with_capacity(total);
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<GpuOffer>(record) {
            Ok(offer) => match offer.validate() {
                Ok(()) => offers.push(offer),
                Err(reason) => debug!(index, id = %offer.id, %reason, "Dropping invalid offer"),
            },
            Err(e) => debug!(index, error = %e, "Dropping undecodable offer"),
        }
    }
    if offers.len() < total {
        warn!(dropped = total - offers.len(), total, "Dropped malformed offers from dataset");
    }

    // Bare arrays carry no header; use the newest record timestamp
    let last_updated = last_updated
        .filter(|ts| !ts.is_empty())
        .or_else(|| offers.iter().map(|o| o.last_updated.clone()).max())
        .unwrap_or_default();

    Ok(document(last_updated, offers))
}

/// Build a document with counts derived from `offers`
pub fn document(last_updated: String, offers: Vec<GpuOffer>) -> DatasetDocument {
    let providers: HashSet<&str> = offers.iter().map(|o| o.provider.as_str()).collect();
    let models: HashSet<&str> = offers.iter().map(|o| o.model.as_str()).collect();
    DatasetDocument {
        last_updated,
        count: offers.len(),
        provider_count: providers.len(),
        model_count: models.len(),
        data: offers,
    }
}

pub fn parse_history(bytes: &[u8]) -> Result<PriceHistory, FeedError> {
    serde_json::from_slice(bytes).map_err(|e| FeedError::Decode(e.to_string()))
}

/// Feed served over plain HTTP GET
pub struct HttpFeed {
    client: Client,
    data_url: url::Url,
    history_url: Option<url::Url>,
}

impl HttpFeed {
    pub fn new(data_url: &str, history_url: Option<&str>) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| FeedError::Transport { url: data_url.to_string(), source })?;
        let data_url =
            url::Url::parse(data_url).map_err(|_| FeedError::InvalidUrl(data_url.to_string()))?;
        let history_url = history_url
            .map(|u| url::Url::parse(u).map_err(|_| FeedError::InvalidUrl(u.to_string())))
            .transpose()?;

        Ok(Self {
            client,
            data_url,
            history_url,
        })
    }

    async fn get_bytes(&self, url: &url::Url) -> Result<Vec<u8>, FeedError> {
        let transport = |source| FeedError::Transport { url: url.to_string(), source };

        let response = self.client.get(url.clone()).send().await.map_err(transport)?;
        if !response.status().is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl OfferFeed for HttpFeed {
    async fn fetch_offers(&self) -> Result<DatasetDocument, FeedError> {
        let bytes = self.get_bytes(&self.data_url).await?;
        parse_dataset(&bytes)
    }

    async fn fetch_history(&self) -> Option<PriceHistory> {
        let url = self.history_url.as_ref()?;
        match self.get_bytes(url).await.and_then(|b| parse_history(&b)) {
            Ok(history) => Some(history),
            Err(e) => {
                warn!(error = %e, "Price history unavailable");
                None
            }
        }
    }
}

/// Feed read from local JSON files
pub struct FileFeed {
    data_path: PathBuf,
    history_path: Option<PathBuf>,
}

impl FileFeed {
    pub fn new(data_path: impl Into<PathBuf>, history_path: Option<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            history_path,
        }
    }

    async fn read(path: &Path) -> Result<Vec<u8>, FeedError> {
        tokio::fs::read(path).await.map_err(|source| FeedError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

#[async_trait]
impl OfferFeed for FileFeed {
    async fn fetch_offers(&self) -> Result<DatasetDocument, FeedError> {
        let bytes = Self::read(&self.data_path).await?;
        parse_dataset(&bytes)
    }

    async fn fetch_history(&self) -> Option<PriceHistory> {
        let path = self.history_path.as_ref()?;
        match Self::read(path).await.and_then(|b| parse_history(&b)) {
            Ok(history) => Some(history),
            Err(e) => {
                warn!(error = %e, "Price history unavailable");
                None
            }
        }
    }
}

/// In-memory feed
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    offers: Vec<GpuOffer>,
    history: Option<PriceHistory>,
}

impl StaticFeed {
    pub fn new(offers: Vec<GpuOffer>) -> Self {
        Self {
            offers,
            history: None,
        }
    }

    pub fn with_history(mut self, history: PriceHistory) -> Self {
        self.history = Some(history);
        self
    }
}

#[async_trait]
impl OfferFeed for StaticFeed {
    async fn fetch_offers(&self) -> Result<DatasetDocument, FeedError> {
        let last_updated = chrono::Utc::now().to_rfc3339();
        Ok(document(last_updated, self.offers.clone()))
    }

    async fn fetch_history(&self) -> Option<PriceHistory> {
        self.history.clone()
    }
}
