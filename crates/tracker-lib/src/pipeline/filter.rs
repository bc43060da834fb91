//! Filter stage
//!
//! A [`FilterSpec`] is a declarative predicate over offers. Empty allow-lists
//! never restrict their dimension.

use crate::models::{Commitment, GpuOffer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper price bound used when the user has not narrowed it
pub const DEFAULT_MAX_PRICE: f64 = 999.0;

/// Wire sentinel for "8 or more GPUs"
const EIGHT_PLUS: i64 = -1;

/// Entry of a GPU-count allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum GpuCount {
    Exact(u32),
    EightPlus,
}

impl GpuCount {
    pub fn matches(&self, count: u32) -> bool {
        match self {
            GpuCount::Exact(n) => *n == count,
            GpuCount::EightPlus => count >= 8,
        }
    }
}

impl TryFrom<i64> for GpuCount {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            EIGHT_PLUS => Ok(GpuCount::EightPlus),
            n if n >= 1 && n <= u32::MAX as i64 => Ok(GpuCount::Exact(n as u32)),
            n => Err(format!("invalid GPU count {}", n)),
        }
    }
}

impl From<GpuCount> for i64 {
    fn from(count: GpuCount) -> Self {
        match count {
            GpuCount::Exact(n) => n as i64,
            GpuCount::EightPlus => EIGHT_PLUS,
        }
    }
}

impl FromStr for GpuCount {
    type Err = String;

    /// Accepts `8+` as well as plain counts
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "8+" {
            return Ok(GpuCount::EightPlus);
        }
        let n: i64 = s.parse().map_err(|_| format!("invalid GPU count '{}'", s))?;
        GpuCount::try_from(n)
    }
}

impl fmt::Display for GpuCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuCount::Exact(n) => write!(f, "{}", n),
            GpuCount::EightPlus => f.write_str("8+"),
        }
    }
}

/// Declarative predicate over offers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    pub search: String,
    pub models: Vec<String>,
    pub providers: Vec<String>,
    pub regions: Vec<String>,
    pub commitment: Vec<Commitment>,
    pub min_price: f64,
    pub max_price: f64,
    /// Per-GPU VRAM floor; 0 disables
    pub min_vram: f64,
    pub gpu_counts: Vec<GpuCount>,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            search: String::new(),
            models: Vec::new(),
            providers: Vec::new(),
            regions: Vec::new(),
            commitment: Vec::new(),
            min_price: 0.0,
            max_price: DEFAULT_MAX_PRICE,
            min_vram: 0.0,
            gpu_counts: Vec::new(),
        }
    }
}

impl FilterSpec {
    /// True when no dimension is restricted
    pub fn is_unrestricted(&self) -> bool {
        *self == FilterSpec::default()
    }

    pub fn matches(&self, offer: &GpuOffer) -> bool {
        if !self.search.is_empty() {
            let q = self.search.to_lowercase();
            let hit = offer.model.to_lowercase().contains(&q)
                || offer.provider.to_lowercase().contains(&q)
                || offer.instance_name.to_lowercase().contains(&q);
            if !hit {
                return false;
            }
        }
        if !allows(&self.models, &offer.model)
            || !allows(&self.providers, &offer.provider)
            || !allows(&self.regions, &offer.region)
            || !allows(&self.commitment, &offer.commitment)
        {
            return false;
        }
        if offer.price_per_hour < self.min_price || offer.price_per_hour > self.max_price {
            return false;
        }
        if self.min_vram > 0.0 && offer.vram < self.min_vram {
            return false;
        }
        if !self.gpu_counts.is_empty()
            && !self.gpu_counts.iter().any(|c| c.matches(offer.gpu_count))
        {
            return false;
        }
        true
    }
}

fn allows<T, U>(list: &[T], value: &U) -> bool
where
    T: PartialEq<U>,
    U: ?Sized,
{
    list.is_empty() || list.iter().any(|item| item == value)
}

/// Single pass over `offers`, keeping those that match `spec`
pub fn filter_offers<'a, I>(offers: I, spec: &FilterSpec) -> Vec<&'a GpuOffer>
where
    I: IntoIterator<Item = &'a GpuOffer>,
{
    offers.into_iter().filter(|o| spec.matches(o)).collect()
}

/// Canned filter specs for common workloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadPreset {
    LlmTrain,
    Inference,
    FineTune,
    ImageVideo,
    Budget,
}

impl WorkloadPreset {
    pub const ALL: [WorkloadPreset; 5] = [
        WorkloadPreset::LlmTrain,
        WorkloadPreset::Inference,
        WorkloadPreset::FineTune,
        WorkloadPreset::ImageVideo,
        WorkloadPreset::Budget,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            WorkloadPreset::LlmTrain => "llm-train",
            WorkloadPreset::Inference => "inference",
            WorkloadPreset::FineTune => "fine-tune",
            WorkloadPreset::ImageVideo => "image-video",
            WorkloadPreset::Budget => "budget",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WorkloadPreset::LlmTrain => "80GB+ VRAM, 4x or 8x+ GPUs for tensor parallelism",
            WorkloadPreset::Inference => "24GB+ VRAM for 7B models or 13B quantized",
            WorkloadPreset::FineTune => "48GB+ VRAM for LoRA or full fine-tuning",
            WorkloadPreset::ImageVideo => "Single GPU, pick by VRAM",
            WorkloadPreset::Budget => "Under $1/hr",
        }
    }

    /// Preset applied on top of the default spec
    pub fn filters(&self) -> FilterSpec {
        let base = FilterSpec::default();
        match self {
            WorkloadPreset::LlmTrain => FilterSpec {
                min_vram: 80.0,
                gpu_counts: vec![GpuCount::Exact(4), GpuCount::EightPlus],
                ..base
            },
            WorkloadPreset::Inference => FilterSpec { min_vram: 24.0, ..base },
            WorkloadPreset::FineTune => FilterSpec { min_vram: 48.0, ..base },
            WorkloadPreset::ImageVideo => FilterSpec {
                gpu_counts: vec![GpuCount::Exact(1)],
                ..base
            },
            WorkloadPreset::Budget => FilterSpec { max_price: 1.0, ..base },
        }
    }
}

impl FromStr for WorkloadPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkloadPreset::ALL
            .into_iter()
            .find(|p| p.id() == s)
            .ok_or_else(|| format!("unknown preset '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Availability;

    fn offer(id: &str, model: &str, price: f64, vram: f64, gpu_count: u32) -> GpuOffer {
        GpuOffer {
            id: id.to_string(),
            provider: "RunPod".to_string(),
            provider_logo: None,
            instance_name: format!("{}-pod", id),
            model: model.to_string(),
            gpu_count,
            vram,
            cpu: 8,
            ram: 64.0,
            price_per_hour: price,
            region: "EU".to_string(),
            commitment: Commitment::OnDemand,
            availability: Availability::High,
            link: String::new(),
            last_updated: String::new(),
        }
    }

    fn dataset() -> Vec<GpuOffer> {
        vec![
            offer("a", "H100 SXM", 2.5, 80.0, 8),
            offer("b", "RTX 4090", 0.4, 24.0, 1),
            offer("c", "A100", 1.1, 40.0, 4),
            offer("d", "L40S", 0.0, 48.0, 16),
        ]
    }

    #[test]
    fn test_default_spec_is_identity() {
        let data = dataset();
        let out = filter_offers(&data, &FilterSpec::default());
        assert_eq!(out.len(), data.len());
        assert!(FilterSpec::default().is_unrestricted());
    }

    #[test]
    fn test_price_bounds_are_inclusive() {
        let data = dataset();
        let spec = FilterSpec { min_price: 0.4, max_price: 1.1, ..Default::default() };
        let ids: Vec<_> = filter_offers(&data, &spec).iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_search_matches_instance_name_case_insensitively() {
        let data = dataset();
        let spec = FilterSpec { search: "C-POD".to_string(), ..Default::default() };
        let out = filter_offers(&data, &spec);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "c");
    }

    #[test]
    fn test_allow_lists() {
        let data = dataset();
        let spec = FilterSpec {
            models: vec!["A100".to_string(), "L40S".to_string()],
            commitment: vec![Commitment::OnDemand],
            ..Default::default()
        };
        assert_eq!(filter_offers(&data, &spec).len(), 2);

        let spec = FilterSpec { regions: vec!["US".to_string()], ..Default::default() };
        assert!(filter_offers(&data, &spec).is_empty());
    }

    #[test]
    fn test_min_vram_is_per_gpu() {
        let data = dataset();
        let spec = FilterSpec { min_vram: 48.0, ..Default::default() };
        let ids: Vec<_> = filter_offers(&data, &spec).iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
    }

    #[test]
    fn test_gpu_count_sentinel() {
        let data = dataset();
        let spec = FilterSpec {
            gpu_counts: vec![GpuCount::Exact(4), GpuCount::EightPlus],
            ..Default::default()
        };
        let ids: Vec<_> = filter_offers(&data, &spec).iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_gpu_count_wire_format() {
        let counts: Vec<GpuCount> = serde_json::from_str("[1, 4, -1]").unwrap();
        assert_eq!(counts, vec![GpuCount::Exact(1), GpuCount::Exact(4), GpuCount::EightPlus]);
        assert_eq!(serde_json::to_string(&counts).unwrap(), "[1,4,-1]");
        assert!(serde_json::from_str::<GpuCount>("0").is_err());
        assert_eq!("8+".parse::<GpuCount>().unwrap(), GpuCount::EightPlus);
    }

    #[test]
    fn test_presets() {
        let train = WorkloadPreset::LlmTrain.filters();
        assert_eq!(train.min_vram, 80.0);
        assert_eq!(train.max_price, DEFAULT_MAX_PRICE);
        assert_eq!("budget".parse::<WorkloadPreset>().unwrap().filters().max_price, 1.0);
        assert!("gaming".parse::<WorkloadPreset>().is_err());
    }
}
