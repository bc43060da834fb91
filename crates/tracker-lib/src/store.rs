//! Subscription store
//!
//! A flat key-value store of JSON-encoded subscriptions. Every read and write
//! is an individual atomic operation; nothing here needs multi-key
//! consistency.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Keys requested per scan page
const SCAN_PAGE_SIZE: u32 = 1000;

/// Default upper bound on scan round trips for one listing
pub const MAX_SCAN_PAGES: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("subscription store is not configured")]
    NotConfigured,

    #[error("invalid store URL '{0}'")]
    InvalidUrl(String),

    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store returned HTTP {status} for {operation}")]
    Status { operation: &'static str, status: u16 },

    #[error("unexpected store response: {0}")]
    Decode(String),

    #[error("store scan did not finish within {pages} pages")]
    ScanTruncated { pages: usize },
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// `None` when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Every key matching a glob `pattern` such as `alert:*`
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError>;
}

#[derive(Deserialize)]
struct GetResponse {
    result: Option<String>,
}

#[derive(Deserialize)]
struct ScanResponse {
    result: (serde_json::Value, Vec<String>),
}

/// Cursor values may come back as strings or numbers
fn cursor_string(cursor: &serde_json::Value) -> Result<String, StoreError> {
    match cursor {
        serde_json::Value::String(s) => Ok(s.clone()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(StoreError::Decode(format!("bad scan cursor {}", other))),
    }
}

/// Redis-compatible REST key-value store with bearer-token auth
pub struct RestKvStore {
    client: Client,
    base_url: url::Url,
    token: String,
    max_scan_pages: usize,
}

impl RestKvStore {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url =
            url::Url::parse(base_url).map_err(|_| StoreError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client,
            base_url,
            token: token.into(),
            max_scan_pages: MAX_SCAN_PAGES,
        })
    }

    /// Cap the number of scan round trips; a listing that needs more fails
    pub fn with_max_scan_pages(mut self, pages: usize) -> Self {
        self.max_scan_pages = pages.max(1);
        self
    }

    /// Build from optional settings; both must be present
    pub fn from_settings(url: Option<&str>, token: Option<&str>) -> Result<Self, StoreError> {
        match (url, token) {
            (Some(url), Some(token)) if !url.is_empty() && !token.is_empty() => {
                Self::new(url, token)
            }
            _ => Err(StoreError::NotConfigured),
        }
    }

    /// `{base}/{command}/{arg}` with the argument percent-encoded as one segment
    fn command_url(&self, command: &str, arg: &str) -> Result<url::Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(command)
            .push(arg);
        Ok(url)
    }

    fn check(operation: &'static str, response: &reqwest::Response) -> Result<(), StoreError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Status {
                operation,
                status: response.status().as_u16(),
            })
        }
    }
}

#[async_trait]
impl SubscriptionStore for RestKvStore {
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let url = self.command_url("set", key)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(value.to_string())
            .send()
            .await?;
        Self::check("set", &response)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let url = self.command_url("get", key)?;
        let response = self.client.get(url).bearer_auth(&self.token).send().await?;
        Self::check("get", &response)?;
        let body: GetResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(body.result)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut cursor = "0".to_string();

        for page in 0..self.max_scan_pages {
            let mut url = self.command_url("scan", &cursor)?;
            url.query_pairs_mut()
                .append_pair("match", pattern)
                .append_pair("count", &SCAN_PAGE_SIZE.to_string());

            let response = self.client.get(url).bearer_auth(&self.token).send().await?;
            Self::check("scan", &response)?;
            let body: ScanResponse = response
                .json()
                .await
                .map_err(|e| StoreError::Decode(e.to_string()))?;

            let (next, page_keys) = body.result;
            debug!(page, keys = page_keys.len(), "Scanned store page");
            keys.extend(page_keys);

            cursor = cursor_string(&next)?;
            if cursor == "0" {
                keys.sort();
                keys.dedup();
                return Ok(keys);
            }
        }

        warn!(
            pages = self.max_scan_pages,
            keys = keys.len(),
            cursor = %cursor,
            "Store scan hit the page limit"
        );
        Err(StoreError::ScanTruncated {
            pages: self.max_scan_pages,
        })
    }
}

/// Glob match supporting `*` wildcards
fn glob_match(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }

    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !key.starts_with(first) || key.len() < first.len() + last.len() || !key.ends_with(last) {
        return false;
    }
    let mut rest = &key[first.len()..key.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    true
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect())
    }
}
