//! Dataset age classification

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FreshnessLevel {
    Live,
    Recent,
    Stale,
    Outdated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Freshness {
    pub level: FreshnessLevel,
    pub label: String,
}

/// `just now`, `Nm ago`, `Nh ago` or `Nd ago`
fn relative_time(age: Duration) -> String {
    let minutes = age.num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    format!("{}d ago", hours / 24)
}

pub fn freshness_at(last_updated: DateTime<Utc>, now: DateTime<Utc>) -> Freshness {
    let age = now - last_updated;
    let level = match age.num_seconds() {
        s if s < 3_600 => FreshnessLevel::Live,
        s if s < 6 * 3_600 => FreshnessLevel::Recent,
        s if s < 12 * 3_600 => FreshnessLevel::Stale,
        _ => FreshnessLevel::Outdated,
    };
    Freshness { level, label: relative_time(age) }
}

/// Freshness of an ISO-8601 timestamp; unparsable timestamps are outdated
pub fn freshness(last_updated: &str, now: DateTime<Utc>) -> Freshness {
    match DateTime::parse_from_rfc3339(last_updated) {
        Ok(ts) => freshness_at(ts.with_timezone(&Utc), now),
        Err(_) => Freshness {
            level: FreshnessLevel::Outdated,
            label: "unknown".to_string(),
        },
    }
}
