//! Dataset and price history loading from a URL or a local file

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracker_lib::feed::{FileFeed, HttpFeed, OfferFeed};
use tracker_lib::models::PriceHistory;
use tracker_lib::Snapshot;

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn feed_for(data: &str, history: Option<&str>) -> Result<Box<dyn OfferFeed>> {
    if is_remote(data) {
        let feed = HttpFeed::new(data, history).context("Invalid dataset URL")?;
        return Ok(Box::new(feed));
    }
    Ok(Box::new(FileFeed::new(data, history.map(PathBuf::from))))
}

/// Fetch the dataset and build a scored snapshot
pub async fn load_snapshot(data: &str) -> Result<Arc<Snapshot>> {
    let feed = feed_for(data, None)?;
    let document = feed
        .fetch_offers()
        .await
        .with_context(|| format!("Failed to load dataset from {}", data))?;
    debug!(offers = document.data.len(), last_updated = %document.last_updated, "Dataset loaded");
    Ok(Arc::new(Snapshot::from_document(document)))
}

/// Fetch price history from a URL or file
pub async fn load_history(location: &str) -> Result<PriceHistory> {
    // History is fetched through the same feed clients as the dataset
    let feed: Box<dyn OfferFeed> = if is_remote(location) {
        Box::new(HttpFeed::new(location, Some(location)).context("Invalid history URL")?)
    } else {
        Box::new(FileFeed::new(location, Some(PathBuf::from(location))))
    };
    feed.fetch_history()
        .await
        .with_context(|| format!("Price history unavailable at {}", location))
}
