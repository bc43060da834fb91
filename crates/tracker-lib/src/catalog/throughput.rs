//! GPU model throughput lookup
//!
//! Free-text model names are matched against an ordered rule list. The first
//! matching rule wins, so more specific patterns must precede the general ones
//! they overlap with (`H100 SXM` before `H100`, `L40S` before `L40`).

use regex::Regex;
use std::sync::OnceLock;

/// Fraction of peak FLOPS assumed achievable during inference
const INFERENCE_MFU: f64 = 0.30;

/// Ordered (pattern, peak TFLOPS) rules, evaluated top to bottom
const THROUGHPUT_RULES: &[(&str, f64)] = &[
    (r"(?i)B200", 4500.0),
    (r"(?i)H200", 1979.0),
    (r"(?i)H100.*SXM", 1979.0),
    (r"(?i)H100.*NVL", 1979.0),
    (r"(?i)H100", 989.0),
    (r"(?i)A100.*80", 312.0),
    (r"(?i)A100", 312.0),
    (r"(?i)L40S", 362.0),
    (r"(?i)L40(?:[^S]|$)", 181.0),
    (r"(?i)L4\b", 121.0),
    (r"(?i)A10G", 125.0),
    (r"(?i)A10\b", 125.0),
    (r"(?i)A30\b", 165.0),
    (r"(?i)V100", 62.0),
    (r"(?i)T4\b", 65.0),
    (r"(?i)RTX[\s_-]?4090", 330.0),
    (r"(?i)RTX[\s_-]?4080", 242.0),
    (r"(?i)RTX[\s_-]?4070", 165.0),
    (r"(?i)RTX[\s_-]?3090", 142.0),
    (r"(?i)RTX[\s_-]?3080", 119.0),
    (r"(?i)RTX[\s_-]?3070", 90.0),
    (r"(?i)RTX[\s_-]?3060", 51.0),
    (r"(?i)A6000", 155.0),
    (r"(?i)A5000", 111.0),
    (r"(?i)A4000", 77.0),
    (r"(?i)A40\b", 150.0),
    (r"(?i)P100", 18.0),
    (r"(?i)K80", 6.0),
];

/// Compiled rule table
pub struct ThroughputTable {
    rules: Vec<(Regex, f64)>,
}

impl ThroughputTable {
    fn compile() -> Self {
        let rules = THROUGHPUT_RULES
            .iter()
            .map(|(pattern, tflops)| {
                let re = Regex::new(pattern).expect("throughput rule must be a valid regex");
                (re, *tflops)
            })
            .collect();
        Self { rules }
    }

    /// Shared compiled table
    pub fn global() -> &'static ThroughputTable {
        static TABLE: OnceLock<ThroughputTable> = OnceLock::new();
        TABLE.get_or_init(ThroughputTable::compile)
    }

    /// Peak TFLOPS of the first matching rule, 0 when no rule matches
    pub fn lookup(&self, model: &str) -> f64 {
        self.matching_rule(model)
            .map(|index| self.rules[index].1)
            .unwrap_or(0.0)
    }

    /// Index of the first matching rule
    pub fn matching_rule(&self, model: &str) -> Option<usize> {
        self.rules.iter().position(|(re, _)| re.is_match(model))
    }
}

/// Approximate peak TFLOPS for a model name; 0 means unknown, not worthless
pub fn gpu_tflops(model: &str) -> f64 {
    ThroughputTable::global().lookup(model)
}

/// Rough decode throughput for a dense LLM of `params_b` billion parameters
pub fn inference_tokens_per_sec(model: &str, params_b: f64, gpu_count: u32) -> f64 {
    let tflops = gpu_tflops(model);
    if tflops == 0.0 || params_b <= 0.0 {
        return 0.0;
    }
    (tflops * gpu_count as f64 * 1e12 * INFERENCE_MFU) / (2.0 * params_b * 1e9)
}

/// Dollar cost of generating one million tokens
pub fn cost_per_million_tokens(price_per_hour: f64, tokens_per_sec: f64) -> Option<f64> {
    if tokens_per_sec <= 0.0 || price_per_hour <= 0.0 {
        return None;
    }
    Some(price_per_hour / (tokens_per_sec * 3600.0) * 1_000_000.0)
}

/// VRAM needed to hold FP16 weights
pub fn vram_required_gb_fp16(params_b: f64) -> f64 {
    params_b * 2.0
}
