//! Shareable filter URLs
//!
//! A [`FilterSpec`] is serialized to a compact JSON object with short keys and
//! base64-encoded for a `#q=` URL fragment.

use crate::models::Commitment;
use crate::pipeline::{FilterSpec, GpuCount, DEFAULT_MAX_PRICE};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

const FRAGMENT_PREFIX: &str = "#q=";

#[derive(Debug, Serialize, Deserialize)]
struct ShareSpec {
    #[serde(default)]
    s: String,
    #[serde(default)]
    m: Vec<String>,
    #[serde(default)]
    p: Vec<String>,
    #[serde(default)]
    r: Vec<String>,
    #[serde(default)]
    c: Vec<Commitment>,
    #[serde(default)]
    mn: f64,
    #[serde(default = "default_max_price")]
    mx: f64,
    #[serde(default)]
    mv: f64,
    #[serde(default)]
    gc: Vec<GpuCount>,
}

fn default_max_price() -> f64 {
    DEFAULT_MAX_PRICE
}

impl From<&FilterSpec> for ShareSpec {
    fn from(spec: &FilterSpec) -> Self {
        Self {
            s: spec.search.clone(),
            m: spec.models.clone(),
            p: spec.providers.clone(),
            r: spec.regions.clone(),
            c: spec.commitment.clone(),
            mn: spec.min_price,
            mx: spec.max_price,
            mv: spec.min_vram,
            gc: spec.gpu_counts.clone(),
        }
    }
}

impl From<ShareSpec> for FilterSpec {
    fn from(share: ShareSpec) -> Self {
        Self {
            search: share.s,
            models: share.m,
            providers: share.p,
            regions: share.r,
            commitment: share.c,
            min_price: share.mn,
            max_price: share.mx,
            min_vram: share.mv,
            gpu_counts: share.gc,
        }
    }
}

/// Base64 of the compact filter object
pub fn encode_filters(spec: &FilterSpec) -> String {
    // Serializing plain strings, numbers and enums cannot fail
    let json = serde_json::to_vec(&ShareSpec::from(spec)).unwrap_or_default();
    STANDARD.encode(json)
}

/// Inverse of [`encode_filters`]; `None` for anything that does not decode
pub fn decode_filters(encoded: &str) -> Option<FilterSpec> {
    let bytes = STANDARD.decode(encoded.trim()).ok()?;
    let share: ShareSpec = serde_json::from_slice(&bytes).ok()?;
    Some(share.into())
}

/// `#q=<base64>` URL fragment
pub fn share_fragment(spec: &FilterSpec) -> String {
    format!("{}{}", FRAGMENT_PREFIX, encode_filters(spec))
}

/// Decode a fragment with or without its `#q=` prefix
pub fn filters_from_fragment(fragment: &str) -> Option<FilterSpec> {
    let fragment = fragment.trim();
    let encoded = fragment
        .strip_prefix(FRAGMENT_PREFIX)
        .or_else(|| fragment.strip_prefix("q="))
        .unwrap_or(fragment);
    decode_filters(encoded)
}
