//! Static classification tables
//!
//! - GPU model throughput (ordered pattern rules, first match wins)
//! - Provider trust tiers, billing profiles and procurement friction

mod providers;
mod throughput;

pub use providers::{
    base_friction, is_waitlist_gated, provider_billing, provider_profile, provider_trust,
    BillingProfile, FrictionLevel, ProviderProfile, TrustInfo, TrustTier, PROVIDERS,
    UNKNOWN_BILLING,
};
pub use throughput::{
    cost_per_million_tokens, gpu_tflops, inference_tokens_per_sec, vram_required_gb_fp16,
    ThroughputTable,
};
