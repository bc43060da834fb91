//! Static per-provider policy: trust tier, billing profile and procurement friction
//!
//! One row per known provider name. Lookups are exact; providers that are not
//! listed get the conservative fallbacks (`Emerging` trust, unknown billing,
//! self-serve friction).

use serde::Serialize;
use std::fmt;

/// Provider trust tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrustTier {
    Enterprise,
    Established,
    Marketplace,
    Emerging,
}

impl TrustTier {
    /// Starting point of the continuity score
    pub fn continuity_base(&self) -> i32 {
        match self {
            TrustTier::Enterprise => 100,
            TrustTier::Established => 80,
            // P2P marketplace hosts are less predictable than small direct providers
            TrustTier::Marketplace => 50,
            TrustTier::Emerging => 55,
        }
    }
}

impl fmt::Display for TrustTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrustTier::Enterprise => "Enterprise",
            TrustTier::Established => "Established",
            TrustTier::Marketplace => "Marketplace",
            TrustTier::Emerging => "Emerging",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrustInfo {
    pub tier: TrustTier,
    /// 1 to 5
    pub score: u8,
    pub note: &'static str,
}

/// Procurement friction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FrictionLevel {
    #[serde(rename = "Self-serve")]
    SelfServe,
    #[serde(rename = "Quota May Apply")]
    QuotaMayApply,
    Waitlist,
}

impl FrictionLevel {
    /// Base penalty used by the fast-start ranking
    pub fn penalty(&self) -> f64 {
        match self {
            FrictionLevel::SelfServe => 0.0,
            FrictionLevel::QuotaMayApply => 100.0,
            FrictionLevel::Waitlist => 200.0,
        }
    }

    pub fn note(&self) -> &'static str {
        match self {
            FrictionLevel::SelfServe => "Spin up in minutes, no approval needed.",
            FrictionLevel::QuotaMayApply => {
                "Enterprise clouds often require a quota increase request. Can take hours to days."
            }
            FrictionLevel::Waitlist => "Contact sales or join waitlist, not always instant.",
        }
    }
}

impl fmt::Display for FrictionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FrictionLevel::SelfServe => "Self-serve",
            FrictionLevel::QuotaMayApply => "Quota May Apply",
            FrictionLevel::Waitlist => "Waitlist",
        };
        f.write_str(s)
    }
}

/// How a provider actually bills
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingProfile {
    pub disk_type: &'static str,
    /// `None` means bundled or unknown
    pub storage_cost_per_gb_month: Option<f64>,
    pub billed_when_stopped: bool,
    pub persistent_disk: bool,
    pub egress_cost_per_gb: f64,
    /// `None` means unknown
    pub network_bandwidth_gbps: Option<f64>,
    pub compliance_claims: &'static [&'static str],
    pub storage_warning: &'static str,
    pub billing_note: &'static str,
}

/// Fallback for providers without a billing row; assumes nothing is safe
pub const UNKNOWN_BILLING: BillingProfile = BillingProfile {
    disk_type: "Unknown",
    storage_cost_per_gb_month: None,
    billed_when_stopped: false,
    persistent_disk: false,
    egress_cost_per_gb: 0.0,
    network_bandwidth_gbps: None,
    compliance_claims: &[],
    storage_warning: "Billing details not available, verify with provider.",
    billing_note: "No billing data available for this provider.",
};

const UNKNOWN_TRUST: TrustInfo = TrustInfo {
    tier: TrustTier::Emerging,
    score: 2,
    note: "Newer or specialized provider",
};

/// One row of the provider policy table
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub name: &'static str,
    pub trust: TrustInfo,
    pub billing: Option<BillingProfile>,
    pub friction: FrictionLevel,
    /// Always waitlisted regardless of model
    pub waitlist_gated: bool,
}

const ENTERPRISE_NOTE: &str = "SLA-backed, global compliance, enterprise support";
const LIMITED_INFO: &str = "SSD (details limited)";
const CHECK_DOCS: &str = "Newer provider. Check docs for storage and billing details.";

pub const PROVIDERS: &[ProviderProfile] = &[
    ProviderProfile {
        name: "AWS",
        trust: TrustInfo { tier: TrustTier::Enterprise, score: 5, note: ENTERPRISE_NOTE },
        billing: Some(BillingProfile {
            disk_type: "EBS (Persistent) / Local NVMe",
            storage_cost_per_gb_month: Some(0.08),
            billed_when_stopped: false,
            persistent_disk: true,
            egress_cost_per_gb: 0.09,
            network_bandwidth_gbps: Some(25.0),
            compliance_claims: &["SOC 2", "ISO 27001", "HIPAA", "PCI-DSS"],
            storage_warning: "",
            billing_note: "Stop instance to pause GPU cost. EBS volumes billed separately (~$0.08/GB/mo).",
        }),
        friction: FrictionLevel::QuotaMayApply,
        waitlist_gated: false,
    },
    ProviderProfile {
        name: "Azure",
        trust: TrustInfo { tier: TrustTier::Enterprise, score: 5, note: ENTERPRISE_NOTE },
        billing: Some(BillingProfile {
            disk_type: "Managed Disk / Local NVMe",
            storage_cost_per_gb_month: Some(0.05),
            billed_when_stopped: false,
            persistent_disk: true,
            egress_cost_per_gb: 0.087,
            network_bandwidth_gbps: Some(40.0),
            compliance_claims: &["SOC 2", "ISO 27001", "HIPAA", "FedRAMP"],
            storage_warning: "",
            billing_note: "Deallocate VM to stop GPU billing. Disk storage billed separately.",
        }),
        friction: FrictionLevel::QuotaMayApply,
        waitlist_gated: false,
    },
    ProviderProfile {
        name: "GCP",
        trust: TrustInfo { tier: TrustTier::Enterprise, score: 5, note: ENTERPRISE_NOTE },
        billing: Some(BillingProfile {
            disk_type: "Persistent Disk / Local SSD (ephemeral)",
            storage_cost_per_gb_month: Some(0.04),
            billed_when_stopped: false,
            persistent_disk: true,
            egress_cost_per_gb: 0.08,
            network_bandwidth_gbps: Some(50.0),
            compliance_claims: &["SOC 2", "ISO 27001", "HIPAA"],
            storage_warning: "Local SSD is ephemeral, data is lost when the instance stops.",
            billing_note: "Stop instance to pause GPU billing. Persistent disk billed separately.",
        }),
        friction: FrictionLevel::QuotaMayApply,
        waitlist_gated: false,
    },
    ProviderProfile {
        name: "OCI",
        trust: TrustInfo {
            tier: TrustTier::Enterprise,
            score: 4,
            note: "Oracle Cloud, enterprise SLA, bare metal options",
        },
        billing: Some(BillingProfile {
            disk_type: "Block Volume",
            storage_cost_per_gb_month: Some(0.0255),
            billed_when_stopped: false,
            persistent_disk: true,
            egress_cost_per_gb: 0.009,
            network_bandwidth_gbps: Some(50.0),
            compliance_claims: &["SOC 2", "ISO 27001", "HIPAA"],
            storage_warning: "",
            billing_note: "Very cheap egress ($0.009/GB). Stop instance to pause GPU billing.",
        }),
        friction: FrictionLevel::QuotaMayApply,
        waitlist_gated: false,
    },
    ProviderProfile {
        name: "Lambda Labs",
        trust: TrustInfo {
            tier: TrustTier::Established,
            score: 4,
            note: "ML-focused, reliable on-demand, no spot risk",
        },
        billing: Some(BillingProfile {
            disk_type: "SSD (persistent, included)",
            storage_cost_per_gb_month: Some(0.0),
            billed_when_stopped: true,
            persistent_disk: true,
            egress_cost_per_gb: 0.0,
            network_bandwidth_gbps: Some(10.0),
            compliance_claims: &[],
            storage_warning: "",
            billing_note: "Reserved instances billed continuously. On-demand billed per hour. Disk and egress included.",
        }),
        friction: FrictionLevel::SelfServe,
        waitlist_gated: false,
    },
    ProviderProfile {
        name: "RunPod",
        trust: TrustInfo {
            tier: TrustTier::Established,
            score: 3,
            note: "ML-native, wide GPU selection, spot + reserved",
        },
        billing: Some(BillingProfile {
            disk_type: "Network Volume (optional, $0.07/GB/mo)",
            storage_cost_per_gb_month: Some(0.07),
            billed_when_stopped: false,
            persistent_disk: false,
            egress_cost_per_gb: 0.10,
            network_bandwidth_gbps: Some(10.0),
            compliance_claims: &[],
            storage_warning: "Local disk is EPHEMERAL, buy a Network Volume to keep data between runs.",
            billing_note: "GPU not billed when stopped. Network Volume billed separately. Spot pods can be interrupted.",
        }),
        friction: FrictionLevel::SelfServe,
        waitlist_gated: false,
    },
    ProviderProfile {
        name: "Nebius",
        trust: TrustInfo {
            tier: TrustTier::Established,
            score: 3,
            note: "Yandex Cloud spinoff, EU data centers",
        },
        billing: Some(BillingProfile {
            disk_type: "Network Disk",
            storage_cost_per_gb_month: Some(0.04),
            billed_when_stopped: false,
            persistent_disk: true,
            egress_cost_per_gb: 0.01,
            network_bandwidth_gbps: Some(10.0),
            compliance_claims: &[],
            storage_warning: "",
            billing_note: "EU-focused. Stop instance to pause billing.",
        }),
        friction: FrictionLevel::SelfServe,
        waitlist_gated: false,
    },
    ProviderProfile {
        name: "Vultr",
        trust: TrustInfo {
            tier: TrustTier::Established,
            score: 3,
            note: "General cloud with GPU add-on, global regions",
        },
        billing: Some(BillingProfile {
            disk_type: "Local SSD / Block Storage",
            storage_cost_per_gb_month: Some(0.06),
            billed_when_stopped: false,
            persistent_disk: true,
            egress_cost_per_gb: 0.01,
            network_bandwidth_gbps: Some(10.0),
            compliance_claims: &[],
            storage_warning: "",
            billing_note: "Power off instance to stop GPU billing. Cheap egress.",
        }),
        friction: FrictionLevel::SelfServe,
        waitlist_gated: false,
    },
    ProviderProfile {
        name: "DigitalOcean",
        trust: TrustInfo {
            tier: TrustTier::Established,
            score: 3,
            note: "Major cloud provider, GPU Droplets with H100s",
        },
        billing: Some(BillingProfile {
            disk_type: "NVMe SSD",
            storage_cost_per_gb_month: Some(0.10),
            billed_when_stopped: false,
            persistent_disk: true,
            egress_cost_per_gb: 0.01,
            network_bandwidth_gbps: Some(10.0),
            compliance_claims: &["SOC 2", "ISO 27001"],
            storage_warning: "",
            billing_note: "GPU Droplets. Power off to stop billing. Volume storage billed separately.",
        }),
        friction: FrictionLevel::SelfServe,
        waitlist_gated: false,
    },
    ProviderProfile {
        name: "Vast.ai",
        trust: TrustInfo {
            tier: TrustTier::Marketplace,
            score: 2,
            note: "P2P marketplace, cheap but variable reliability",
        },
        billing: Some(BillingProfile {
            disk_type: "Local disk (ephemeral)",
            storage_cost_per_gb_month: Some(0.0),
            billed_when_stopped: true,
            persistent_disk: false,
            egress_cost_per_gb: 0.0,
            network_bandwidth_gbps: None,
            compliance_claims: &[],
            storage_warning: "Disk is EPHEMERAL and host-specific, all data is lost when the instance ends.",
            billing_note: "Billed while running. Bandwidth varies by host (typically 1-10 Gbps). No persistent disk.",
        }),
        friction: FrictionLevel::SelfServe,
        waitlist_gated: false,
    },
    ProviderProfile {
        name: "TensorDock",
        trust: TrustInfo {
            tier: TrustTier::Marketplace,
            score: 2,
            note: "Marketplace GPUs, flexible configs, variable reliability",
        },
        billing: Some(BillingProfile {
            disk_type: "Local SSD (ephemeral)",
            storage_cost_per_gb_month: Some(0.0),
            billed_when_stopped: false,
            persistent_disk: false,
            egress_cost_per_gb: 0.0,
            network_bandwidth_gbps: None,
            compliance_claims: &[],
            storage_warning: "Marketplace hosts, disk is ephemeral and reliability varies.",
            billing_note: "Billed per hour. Marketplace, verify host details before long jobs.",
        }),
        friction: FrictionLevel::SelfServe,
        waitlist_gated: false,
    },
    ProviderProfile {
        name: "Cudo Compute",
        trust: TrustInfo {
            tier: TrustTier::Emerging,
            score: 2,
            note: "Decentralized compute, newer provider",
        },
        billing: Some(BillingProfile {
            disk_type: "Network Storage",
            storage_cost_per_gb_month: Some(0.07),
            billed_when_stopped: false,
            persistent_disk: true,
            egress_cost_per_gb: 0.05,
            network_bandwidth_gbps: None,
            compliance_claims: &[],
            storage_warning: "Bandwidth and uptime may vary on decentralized infrastructure.",
            billing_note: "Newer provider. Verify billing semantics before long jobs.",
        }),
        friction: FrictionLevel::SelfServe,
        waitlist_gated: false,
    },
    ProviderProfile {
        name: "HotAisle",
        trust: TrustInfo { tier: TrustTier::Emerging, score: 2, note: "GPU cloud, smaller provider" },
        billing: Some(BillingProfile {
            disk_type: LIMITED_INFO,
            storage_cost_per_gb_month: None,
            billed_when_stopped: false,
            persistent_disk: true,
            egress_cost_per_gb: 0.0,
            network_bandwidth_gbps: None,
            compliance_claims: &[],
            storage_warning: "Smaller provider, verify billing details before committing.",
            billing_note: CHECK_DOCS,
        }),
        friction: FrictionLevel::SelfServe,
        waitlist_gated: false,
    },
    ProviderProfile {
        name: "CloudRift",
        trust: TrustInfo {
            tier: TrustTier::Emerging,
            score: 2,
            note: "Specialized GPU cloud, newer provider",
        },
        billing: Some(BillingProfile {
            disk_type: LIMITED_INFO,
            storage_cost_per_gb_month: None,
            billed_when_stopped: false,
            persistent_disk: true,
            egress_cost_per_gb: 0.0,
            network_bandwidth_gbps: None,
            compliance_claims: &[],
            storage_warning: "Limited public info on billing semantics, verify before committing.",
            billing_note: CHECK_DOCS,
        }),
        friction: FrictionLevel::SelfServe,
        waitlist_gated: false,
    },
    ProviderProfile {
        name: "Verda",
        trust: TrustInfo { tier: TrustTier::Emerging, score: 2, note: "GPU cloud, newer provider" },
        billing: Some(BillingProfile {
            disk_type: LIMITED_INFO,
            storage_cost_per_gb_month: None,
            billed_when_stopped: false,
            persistent_disk: true,
            egress_cost_per_gb: 0.0,
            network_bandwidth_gbps: None,
            compliance_claims: &[],
            storage_warning: "Limited public info on billing semantics, verify before committing.",
            billing_note: CHECK_DOCS,
        }),
        friction: FrictionLevel::SelfServe,
        waitlist_gated: false,
    },
    ProviderProfile {
        name: "CoreWeave",
        trust: UNKNOWN_TRUST,
        billing: None,
        friction: FrictionLevel::Waitlist,
        waitlist_gated: true,
    },
    ProviderProfile {
        name: "FluidStack",
        trust: UNKNOWN_TRUST,
        billing: None,
        friction: FrictionLevel::SelfServe,
        waitlist_gated: false,
    },
];

/// Row for a provider name, if it is known
pub fn provider_profile(provider: &str) -> Option<&'static ProviderProfile> {
    PROVIDERS.iter().find(|p| p.name == provider)
}

pub fn provider_trust(provider: &str) -> TrustInfo {
    provider_profile(provider)
        .map(|p| p.trust)
        .unwrap_or(UNKNOWN_TRUST)
}

pub fn provider_billing(provider: &str) -> &'static BillingProfile {
    provider_profile(provider)
        .and_then(|p| p.billing.as_ref())
        .unwrap_or(&UNKNOWN_BILLING)
}

/// Base friction before model-specific escalation
pub fn base_friction(provider: &str) -> FrictionLevel {
    provider_profile(provider)
        .map(|p| p.friction)
        .unwrap_or(FrictionLevel::SelfServe)
}

pub fn is_waitlist_gated(provider: &str) -> bool {
    provider_profile(provider)
        .map(|p| p.waitlist_gated)
        .unwrap_or(false)
}
