//! Per-offer heuristics
//!
//! Every function here is a pure function of the offer and the static
//! provider/throughput tables.

use crate::catalog::{
    base_friction, gpu_tflops, is_waitlist_gated, provider_billing, provider_trust, FrictionLevel,
    TrustTier,
};
use crate::models::{Availability, GpuOffer};
use crate::tmc::{calc_tmc, UsageProfile};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Models that need quota on enterprise clouds
fn high_demand_models() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)H100|H200|A100|B200").expect("valid high-demand pattern"))
}

/// Continuity (reliability) score in [0, 100]
pub fn continuity_score(offer: &GpuOffer) -> u8 {
    if offer.availability == Availability::OutOfStock {
        return 0;
    }

    let mut score = provider_trust(&offer.provider).tier.continuity_base();
    if offer.commitment.is_spot() {
        score -= 35;
    }
    match offer.availability {
        Availability::High => score += 5,
        Availability::Low => score -= 10,
        Availability::Medium | Availability::OutOfStock => {}
    }

    score.clamp(0, 100) as u8
}

/// Risk bucket of a continuity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContinuityLabel {
    pub label: &'static str,
    pub risk: RiskLevel,
}

pub fn continuity_label(score: u8) -> ContinuityLabel {
    if score >= 75 {
        ContinuityLabel { label: "Reliable", risk: RiskLevel::Low }
    } else if score >= 45 {
        ContinuityLabel { label: "Caution", risk: RiskLevel::Medium }
    } else {
        ContinuityLabel { label: "High Risk", risk: RiskLevel::High }
    }
}

/// Procurement friction for a provider/model pair
pub fn procurement_friction(provider: &str, model: &str) -> FrictionLevel {
    if is_waitlist_gated(provider) {
        return FrictionLevel::Waitlist;
    }
    if provider_trust(provider).tier == TrustTier::Enterprise && high_demand_models().is_match(model)
    {
        return FrictionLevel::QuotaMayApply;
    }
    base_friction(provider)
}

/// Spot price volatility class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VolatilityLevel {
    Stable,
    Variable,
    Volatile,
}

impl VolatilityLevel {
    pub fn note(&self) -> &'static str {
        match self {
            VolatilityLevel::Stable => "Predictable cost, no interruption risk.",
            VolatilityLevel::Variable => {
                "Spot instance, price can change; a short warning before termination is common."
            }
            VolatilityLevel::Volatile => {
                "Marketplace spot, host can reclaim without warning; prices fluctuate hourly."
            }
        }
    }
}

impl fmt::Display for VolatilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VolatilityLevel::Stable => "Stable",
            VolatilityLevel::Variable => "Variable",
            VolatilityLevel::Volatile => "Volatile",
        };
        f.write_str(s)
    }
}

pub fn volatility(offer: &GpuOffer) -> VolatilityLevel {
    if !offer.commitment.is_spot() {
        return VolatilityLevel::Stable;
    }
    match provider_trust(&offer.provider).tier {
        TrustTier::Marketplace | TrustTier::Emerging => VolatilityLevel::Volatile,
        TrustTier::Enterprise | TrustTier::Established => VolatilityLevel::Variable,
    }
}

/// Reliability-adjusted performance per dollar
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueScore {
    /// Adjusted value; `None` when throughput is unknown or price is not positive
    pub raw: Option<f64>,
    /// 0 when unknown
    pub tflops: f64,
}

impl ValueScore {
    pub fn has_tflops(&self) -> bool {
        self.tflops > 0.0
    }
}

pub fn value_score(offer: &GpuOffer, continuity: u8) -> ValueScore {
    let tflops = gpu_tflops(&offer.model);
    if tflops == 0.0 || !(offer.price_per_hour > 0.0) {
        return ValueScore { raw: None, tflops: 0.0 };
    }
    let raw = tflops * offer.gpu_count as f64 / offer.price_per_hour;
    ValueScore {
        raw: Some(raw * (continuity as f64 / 100.0)),
        tflops,
    }
}

/// Multiplier applied to providers that keep billing while the instance is stopped
const BILLED_WHEN_STOPPED_PENALTY: f64 = 1.15;

/// Risk-adjusted monthly cost at the reference usage profile; lower is better
pub fn predictable_score(offer: &GpuOffer, continuity: u8) -> f64 {
    let tmc = calc_tmc(offer, &UsageProfile::reference());
    // 1.0 at full continuity, 1.5 at zero
    let risk = 1.0 + (100.0 - continuity as f64) / 200.0;
    let stop = if provider_billing(&offer.provider).billed_when_stopped {
        BILLED_WHEN_STOPPED_PENALTY
    } else {
        1.0
    };
    tmc.total_monthly * risk * stop
}

/// Friction penalty plus hourly price as tiebreak; lower is better
pub fn friction_score(offer: &GpuOffer) -> f64 {
    procurement_friction(&offer.provider, &offer.model).penalty() + offer.price_per_hour
}
