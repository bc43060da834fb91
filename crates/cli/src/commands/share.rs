//! Share hash decoding

use anyhow::{Context, Result};
use colored::Colorize;
use tracker_lib::pipeline::{FilterSpec, DEFAULT_MAX_PRICE};
use tracker_lib::share::filters_from_fragment;

use crate::output::{print_info, print_json, OutputFormat};

fn describe(spec: &FilterSpec) -> Vec<(&'static str, String)> {
    let mut lines = Vec::new();
    if !spec.search.is_empty() {
        lines.push(("Search", spec.search.clone()));
    }
    if !spec.models.is_empty() {
        lines.push(("Models", spec.models.join(", ")));
    }
    if !spec.providers.is_empty() {
        lines.push(("Providers", spec.providers.join(", ")));
    }
    if !spec.regions.is_empty() {
        lines.push(("Regions", spec.regions.join(", ")));
    }
    if !spec.commitment.is_empty() {
        let names: Vec<String> = spec.commitment.iter().map(|c| c.to_string()).collect();
        lines.push(("Commitment", names.join(", ")));
    }
    if spec.min_price > 0.0 || spec.max_price < DEFAULT_MAX_PRICE {
        lines.push(("Price", format!("${} to ${}/hr", spec.min_price, spec.max_price)));
    }
    if spec.min_vram > 0.0 {
        lines.push(("Min VRAM", format!("{}GB per GPU", spec.min_vram)));
    }
    if !spec.gpu_counts.is_empty() {
        let counts: Vec<String> = spec.gpu_counts.iter().map(|c| c.to_string()).collect();
        lines.push(("GPU count", counts.join(", ")));
    }
    lines
}

/// Print the filters carried by a share hash
pub fn decode_share(hash: &str, format: OutputFormat) -> Result<()> {
    let spec = filters_from_fragment(hash).context("Share hash could not be decoded")?;

    match format {
        OutputFormat::Json => print_json(&spec)?,
        OutputFormat::Table => {
            let lines = describe(&spec);
            if lines.is_empty() {
                print_info("Share hash carries no filters");
            }
            for (label, value) in lines {
                println!("{:<12} {}", format!("{}:", label).bold(), value);
            }
        }
    }

    Ok(())
}
