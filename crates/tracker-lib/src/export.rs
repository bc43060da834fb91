//! CSV export of a processed result set

use crate::models::GpuOffer;
use crate::scoring::ScoreCache;
use csv::{QuoteStyle, WriterBuilder};
use std::io::Write;

pub const CSV_HEADERS: [&str; 14] = [
    "Provider",
    "Model",
    "GPU Count",
    "VRAM (GB)",
    "Instance Name",
    "CPU Cores",
    "RAM (GB)",
    "Price/Hr ($)",
    "Region",
    "Commitment",
    "Availability",
    "Continuity Score",
    "Value Score (raw)",
    "Link",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn row(offer: &GpuOffer, cache: &ScoreCache) -> [String; 14] {
    let value = cache
        .value(offer)
        .raw
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "N/A".to_string());
    [
        offer.provider.clone(),
        offer.model.clone(),
        offer.gpu_count.to_string(),
        offer.vram.to_string(),
        offer.instance_name.clone(),
        offer.cpu.to_string(),
        offer.ram.to_string(),
        format!("{:.4}", offer.price_per_hour),
        offer.region.clone(),
        offer.commitment.to_string(),
        offer.availability.to_string(),
        cache.continuity(offer).to_string(),
        value,
        offer.link.clone(),
    ]
}

/// Write `offers` as CSV with every field quoted
pub fn write_csv<'a, W, I>(writer: W, offers: I, cache: &ScoreCache) -> Result<usize, ExportError>
where
    W: Write,
    I: IntoIterator<Item = &'a GpuOffer>,
{
    let mut out = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);
    out.write_record(CSV_HEADERS)?;

    let mut rows = 0;
    for offer in offers {
        out.write_record(row(offer, cache))?;
        rows += 1;
    }
    out.flush()?;
    Ok(rows)
}

pub fn to_csv_string<'a, I>(offers: I, cache: &ScoreCache) -> Result<String, ExportError>
where
    I: IntoIterator<Item = &'a GpuOffer>,
{
    let mut buf = Vec::new();
    write_csv(&mut buf, offers, cache)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
