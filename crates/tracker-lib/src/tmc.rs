//! True Monthly Cost calculator
//!
//! Raw $/hr is misleading across providers with different billing models.
//! The TMC folds storage and egress into a monthly total and a blended
//! effective hourly rate per compute-hour.

use crate::catalog::provider_billing;
use crate::models::GpuOffer;
use serde::Serialize;

/// Average weeks per month
pub const WEEKS_PER_MONTH: f64 = 4.33;

/// Storage price assumed when the provider's rate is unknown or bundled
pub const DEFAULT_STORAGE_COST_PER_GB_MONTH: f64 = 0.08;

/// Fraction of theoretical link bandwidth assumed achievable
const ACHIEVABLE_BANDWIDTH: f64 = 0.6;

/// Usage assumptions feeding the calculator
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageProfile {
    pub hours_per_week: f64,
    pub storage_gb: f64,
    pub egress_gb_per_month: f64,
}

impl UsageProfile {
    pub fn new(hours_per_week: f64, storage_gb: f64, egress_gb_per_month: f64) -> Self {
        Self {
            hours_per_week: hours_per_week.max(0.0),
            storage_gb: storage_gb.max(0.0),
            egress_gb_per_month: egress_gb_per_month.max(0.0),
        }
    }

    /// Reference profile used for ranking: 40 h/week, 100 GB storage, 50 GB egress
    pub fn reference() -> Self {
        Self::new(40.0, 100.0, 50.0)
    }

    pub fn hours_per_month(&self) -> f64 {
        self.hours_per_week * WEEKS_PER_MONTH
    }
}

impl Default for UsageProfile {
    fn default() -> Self {
        Self::reference()
    }
}

/// Monthly cost breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TmcBreakdown {
    pub gpu_cost_monthly: f64,
    pub storage_cost_monthly: f64,
    pub egress_cost_monthly: f64,
    pub total_monthly: f64,
    pub effective_hourly: f64,
}

/// Compute the true monthly cost of running `offer` under `usage`
pub fn calc_tmc(offer: &GpuOffer, usage: &UsageProfile) -> TmcBreakdown {
    let billing = provider_billing(&offer.provider);
    let hours_per_month = usage.hours_per_month();

    let gpu_cost = offer.price_per_hour.max(0.0) * hours_per_month;
    let storage_rate = billing
        .storage_cost_per_gb_month
        .unwrap_or(DEFAULT_STORAGE_COST_PER_GB_MONTH);
    let storage_cost = storage_rate * usage.storage_gb;
    let egress_cost = billing.egress_cost_per_gb * usage.egress_gb_per_month;
    let total = gpu_cost + storage_cost + egress_cost;

    TmcBreakdown {
        gpu_cost_monthly: gpu_cost,
        storage_cost_monthly: storage_cost,
        egress_cost_monthly: egress_cost,
        total_monthly: total,
        effective_hourly: if hours_per_month > 0.0 {
            total / hours_per_month
        } else {
            0.0
        },
    }
}

/// Estimated wall-clock time to move a data volume onto an instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HydrateEstimate {
    Unknown,
    Seconds(f64),
}

impl HydrateEstimate {
    pub fn seconds(&self) -> Option<f64> {
        match self {
            HydrateEstimate::Unknown => None,
            HydrateEstimate::Seconds(s) => Some(*s),
        }
    }
}

impl std::fmt::Display for HydrateEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HydrateEstimate::Unknown => write!(f, "Unknown, check provider docs"),
            HydrateEstimate::Seconds(s) if *s < 60.0 => write!(f, "~{}s", s.round()),
            HydrateEstimate::Seconds(s) if *s < 3600.0 => write!(f, "~{} min", (s / 60.0).round()),
            HydrateEstimate::Seconds(s) => write!(f, "~{:.1} hrs", s / 3600.0),
        }
    }
}

/// Transfer time for `data_gb` over a link of `bandwidth_gbps`, assuming 60% utilisation
pub fn time_to_hydrate(data_gb: f64, bandwidth_gbps: Option<f64>) -> HydrateEstimate {
    match bandwidth_gbps {
        Some(gbps) if gbps > 0.0 => {
            // Gbit/s to GB/s
            let effective_gb_per_sec = gbps * 0.125 * ACHIEVABLE_BANDWIDTH;
            HydrateEstimate::Seconds(data_gb.max(0.0) / effective_gb_per_sec)
        }
        _ => HydrateEstimate::Unknown,
    }
}
