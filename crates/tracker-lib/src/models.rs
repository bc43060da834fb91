//! Core data models for GPU rental offers and alert subscriptions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Commitment kind of an offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Commitment {
    #[serde(rename = "On-Demand")]
    OnDemand,
    #[serde(rename = "Spot")]
    Spot,
    #[serde(rename = "1-Year Reserved")]
    Reserved1Y,
    #[serde(rename = "3-Year Reserved")]
    Reserved3Y,
}

impl Commitment {
    pub const ALL: [Commitment; 4] = [
        Commitment::OnDemand,
        Commitment::Spot,
        Commitment::Reserved1Y,
        Commitment::Reserved3Y,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::OnDemand => "On-Demand",
            Commitment::Spot => "Spot",
            Commitment::Reserved1Y => "1-Year Reserved",
            Commitment::Reserved3Y => "3-Year Reserved",
        }
    }

    pub fn is_spot(&self) -> bool {
        matches!(self, Commitment::Spot)
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stock level reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    High,
    Medium,
    Low,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::High => "High",
            Availability::Medium => "Medium",
            Availability::Low => "Low",
            Availability::OutOfStock => "Out of Stock",
        }
    }

    /// Ordinal used when sorting by availability
    pub fn weight(&self) -> i32 {
        match self {
            Availability::High => 3,
            Availability::Medium => 2,
            Availability::Low => 1,
            Availability::OutOfStock => 0,
        }
    }

    /// High or Medium stock
    pub fn is_in_stock(&self) -> bool {
        matches!(self, Availability::High | Availability::Medium)
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rentable GPU configuration at one provider at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuOffer {
    pub id: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_logo: Option<String>,
    #[serde(default)]
    pub instance_name: String,
    pub model: String,
    pub gpu_count: u32,
    /// Per-GPU VRAM in GB
    pub vram: f64,
    #[serde(default)]
    pub cpu: u32,
    /// System RAM in GB
    #[serde(default)]
    pub ram: f64,
    pub price_per_hour: f64,
    pub region: String,
    pub commitment: Commitment,
    pub availability: Availability,
    pub link: String,
    pub last_updated: String,
}

impl GpuOffer {
    /// Check the invariants an ingested record must satisfy
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("empty id".to_string());
        }
        if !self.price_per_hour.is_finite() || self.price_per_hour < 0.0 {
            return Err(format!("invalid price {}", self.price_per_hour));
        }
        if self.gpu_count < 1 {
            return Err("gpuCount must be at least 1".to_string());
        }
        if !self.vram.is_finite() || self.vram < 0.0 {
            return Err(format!("invalid vram {}", self.vram));
        }
        Ok(())
    }

    /// Total VRAM across all GPUs of the instance
    pub fn total_vram(&self) -> f64 {
        self.vram * self.gpu_count as f64
    }
}

/// Dataset feed document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetDocument {
    pub last_updated: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub provider_count: usize,
    #[serde(default)]
    pub model_count: usize,
    pub data: Vec<GpuOffer>,
}

/// Per-model aggregate for one day of price history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub min: f64,
    pub avg: f64,
    pub p25: f64,
    pub p75: f64,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySnapshot {
    pub date: String,
    pub models: std::collections::HashMap<String, ModelSnapshot>,
}

/// Price history feed document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistory {
    pub generated: String,
    pub snapshots: Vec<DaySnapshot>,
}

/// Kind of alert a user subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertType {
    PriceDrop,
    Availability,
    NewLow,
    BackInStock,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::PriceDrop => "price-drop",
            AlertType::Availability => "availability",
            AlertType::NewLow => "new-low",
            AlertType::BackInStock => "back-in-stock",
        }
    }

    /// Human-readable label used in emails
    pub fn label(&self) -> &'static str {
        match self {
            AlertType::PriceDrop => "Price Drop",
            AlertType::Availability => "Availability Change",
            AlertType::NewLow => "New 30-Day Low",
            AlertType::BackInStock => "Back in Stock",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "price-drop" => Some(AlertType::PriceDrop),
            "availability" => Some(AlertType::Availability),
            "new-low" => Some(AlertType::NewLow),
            "back-in-stock" => Some(AlertType::BackInStock),
            _ => None,
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra conditions attached to a subscription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_vram: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_stable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_high_avail: Option<bool>,
}

impl AlertConditions {
    /// Max price, treating zero or negative as unset
    pub fn max_price(&self) -> Option<f64> {
        self.max_price.filter(|p| *p > 0.0)
    }

    /// Min VRAM, treating zero or negative as unset
    pub fn min_vram(&self) -> Option<f64> {
        self.min_vram.filter(|v| *v > 0.0)
    }

    pub fn only_stable(&self) -> bool {
        self.only_stable.unwrap_or(false)
    }

    pub fn only_high_avail(&self) -> bool {
        self.only_high_avail.unwrap_or(false)
    }

    /// Human-readable summary joined with " · "
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(max) = self.max_price() {
            parts.push(format!("price ≤ ${}/hr", max));
        }
        if self.only_stable() {
            parts.push("stable providers only".to_string());
        }
        if self.only_high_avail() {
            parts.push("in-stock only".to_string());
        }
        if let Some(vram) = self.min_vram() {
            parts.push(format!("≥{}GB VRAM", vram));
        }
        if let Some(models) = self.models.as_ref().filter(|m| !m.is_empty()) {
            parts.push(format!("models: {}", models.join(", ")));
        }
        if let Some(providers) = self.providers.as_ref().filter(|p| !p.is_empty()) {
            parts.push(format!("providers: {}", providers.join(", ")));
        }
        parts.join(" · ")
    }
}

/// Wildcard value for model and provider targets
pub const ANY: &str = "any";

/// A standing request to be notified when conditions are met
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSubscription {
    pub email: String,
    pub alert_type: AlertType,
    #[serde(default = "any_target")]
    pub model: String,
    #[serde(default = "any_target")]
    pub provider: String,
    #[serde(default)]
    pub target_price: Option<f64>,
    #[serde(default)]
    pub conditions: AlertConditions,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<DateTime<Utc>>,
}

fn any_target() -> String {
    ANY.to_string()
}

impl AlertSubscription {
    /// Model target, `None` when the subscription matches any model
    pub fn model_target(&self) -> Option<&str> {
        target(&self.model)
    }

    /// Provider target, `None` when the subscription matches any provider
    pub fn provider_target(&self) -> Option<&str> {
        target(&self.provider)
    }
}

fn target(value: &str) -> Option<&str> {
    if value.is_empty() || value == ANY {
        None
    } else {
        Some(value)
    }
}
