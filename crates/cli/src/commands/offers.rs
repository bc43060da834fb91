//! Offer listing, export, picks and facets

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::Tabled;
use tracker_lib::catalog::{cost_per_million_tokens, inference_tokens_per_sec, vram_required_gb_fp16};
use tracker_lib::freshness::freshness;
use tracker_lib::models::{Commitment, GpuOffer};
use tracker_lib::pipeline::{
    FilterSpec, GpuCount, OfferView, RankMode, SortDirection, SortField, SortState,
    WorkloadPreset,
};
use tracker_lib::scoring::NormalizedValue;
use tracker_lib::share::{filters_from_fragment, share_fragment};
use tracker_lib::Snapshot;

use crate::output::{
    color_availability, color_commitment, color_freshness, format_price, format_value_score,
    format_vram, print_info, print_json, print_rows, print_success, print_warning, OutputFormat,
};

/// Filter flags shared by `list` and `export`
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Free-text search over model, provider and instance name
    #[arg(long, short)]
    pub search: Option<String>,

    /// Restrict to GPU models (repeatable)
    #[arg(long = "model", short)]
    pub models: Vec<String>,

    /// Restrict to providers (repeatable)
    #[arg(long = "provider", short)]
    pub providers: Vec<String>,

    /// Restrict to regions (repeatable)
    #[arg(long = "region")]
    pub regions: Vec<String>,

    /// Restrict to commitments (repeatable)
    #[arg(long = "commitment", value_parser = parse_commitment)]
    pub commitment: Vec<Commitment>,

    /// Minimum hourly price
    #[arg(long)]
    pub min_price: Option<f64>,

    /// Maximum hourly price
    #[arg(long)]
    pub max_price: Option<f64>,

    /// Minimum VRAM per GPU in GB
    #[arg(long)]
    pub min_vram: Option<f64>,

    /// GPU counts to include, e.g. 1, 4 or 8+ (repeatable)
    #[arg(long = "gpus")]
    pub gpu_counts: Vec<GpuCount>,

    /// Start from a workload preset (llm-train, inference, fine-tune, image-video, budget)
    #[arg(long)]
    pub preset: Option<WorkloadPreset>,

    /// Start from a shared filter fragment (#q=... or the bare hash)
    #[arg(long)]
    pub from_share: Option<String>,
}

/// Ordering flags shared by `list` and `export`
#[derive(Args, Debug, Clone)]
pub struct OrderArgs {
    /// Sort field (price, provider, model, availability, vram, gpus, value)
    #[arg(long, default_value = "price")]
    pub sort: SortField,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    /// Rank mode applied after sorting (cheapest, predictable, fast)
    #[arg(long, default_value = "cheapest")]
    pub rank: RankMode,
}

fn parse_commitment(s: &str) -> Result<Commitment, String> {
    let wanted = s.to_lowercase();
    Commitment::ALL
        .into_iter()
        .find(|c| c.as_str().to_lowercase() == wanted || short_name(*c) == wanted)
        .ok_or_else(|| format!("unknown commitment '{}'", s))
}

fn short_name(commitment: Commitment) -> &'static str {
    match commitment {
        Commitment::OnDemand => "on-demand",
        Commitment::Spot => "spot",
        Commitment::Reserved1Y => "1y",
        Commitment::Reserved3Y => "3y",
    }
}

impl FilterArgs {
    /// Base spec from a share fragment or preset, then explicit flags on top
    pub fn to_spec(&self) -> Result<FilterSpec> {
        let mut spec = match (&self.from_share, self.preset) {
            (Some(fragment), _) => {
                filters_from_fragment(fragment).context("Share hash could not be decoded")?
            }
            (None, Some(preset)) => preset.filters(),
            (None, None) => FilterSpec::default(),
        };

        if let Some(search) = &self.search {
            spec.search = search.clone();
        }
        if !self.models.is_empty() {
            spec.models = self.models.clone();
        }
        if !self.providers.is_empty() {
            spec.providers = self.providers.clone();
        }
        if !self.regions.is_empty() {
            spec.regions = self.regions.clone();
        }
        if !self.commitment.is_empty() {
            spec.commitment = self.commitment.clone();
        }
        if let Some(min) = self.min_price {
            spec.min_price = min;
        }
        if let Some(max) = self.max_price {
            spec.max_price = max;
        }
        if let Some(vram) = self.min_vram {
            spec.min_vram = vram;
        }
        if !self.gpu_counts.is_empty() {
            spec.gpu_counts = self.gpu_counts.clone();
        }
        Ok(spec)
    }
}

impl OrderArgs {
    pub fn sort_state(&self) -> SortState {
        SortState {
            field: self.sort,
            direction: if self.desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            },
        }
    }
}

pub(crate) fn build_view(snapshot: Arc<Snapshot>, filters: &FilterArgs, order: &OrderArgs) -> Result<OfferView> {
    let mut view = OfferView::new(snapshot);
    view.set_filters(filters.to_spec()?);
    view.set_sort(order.sort_state());
    view.set_rank(order.rank);
    Ok(view)
}

/// Row for offers table
#[derive(Tabled)]
struct OfferRow {
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "VRAM")]
    vram: String,
    #[tabled(rename = "Price/Hr")]
    price: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Commitment")]
    commitment: String,
    #[tabled(rename = "Availability")]
    availability: String,
    #[tabled(rename = "Continuity")]
    continuity: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "ID")]
    id: String,
}

/// Serving estimate for a dense LLM with FP16 weights
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceEstimate {
    params_b: f64,
    tokens_per_sec: f64,
    cost_per_million_tokens: Option<f64>,
    vram_required_gb: f64,
    fits_in_vram: bool,
}

impl InferenceEstimate {
    fn for_offer(offer: &GpuOffer, params_b: f64) -> Self {
        let tokens_per_sec = inference_tokens_per_sec(&offer.model, params_b, offer.gpu_count);
        let vram_required_gb = vram_required_gb_fp16(params_b);
        Self {
            params_b,
            tokens_per_sec,
            cost_per_million_tokens: cost_per_million_tokens(offer.price_per_hour, tokens_per_sec),
            vram_required_gb,
            fits_in_vram: offer.total_vram() >= vram_required_gb,
        }
    }
}

/// Row for the inference estimate table
#[derive(Tabled)]
struct InferenceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Tokens/s")]
    tokens_per_sec: String,
    #[tabled(rename = "$/M Tokens")]
    cost: String,
    #[tabled(rename = "Fits")]
    fits: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListedOffer<'a> {
    #[serde(flatten)]
    offer: &'a GpuOffer,
    continuity_score: u8,
    value_score: Option<u8>,
    is_top_value: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    inference: Option<InferenceEstimate>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListOutput<'a> {
    page: usize,
    page_count: usize,
    total: usize,
    last_updated: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    share: Option<String>,
    offers: Vec<ListedOffer<'a>>,
}

/// List one page of the processed offers; `params_b` adds LLM serving estimates
pub fn list_offers(
    snapshot: Arc<Snapshot>,
    filters: &FilterArgs,
    order: &OrderArgs,
    page: usize,
    share: bool,
    params_b: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let mut view = build_view(snapshot.clone(), filters, order)?;
    view.set_page(page);
    let share_hash = share.then(|| share_fragment(view.filters()));
    let scores: HashMap<String, NormalizedValue> = view.value_scores().clone();
    let result = view.page();
    let cache = snapshot.cache();

    match format {
        OutputFormat::Json => {
            let offers = result
                .items
                .iter()
                .map(|offer| {
                    let score = scores.get(&offer.id);
                    ListedOffer {
                        offer,
                        continuity_score: cache.continuity(offer),
                        value_score: score.and_then(|s| s.normalized),
                        is_top_value: score.is_some_and(|s| s.is_top_value),
                        inference: params_b.map(|p| InferenceEstimate::for_offer(offer, p)),
                    }
                })
                .collect();
            print_json(&ListOutput {
                page: result.page,
                page_count: result.page_count,
                total: result.total,
                last_updated: snapshot.last_updated(),
                share: share_hash,
                offers,
            })?;
        }
        OutputFormat::Table => {
            let age = freshness(snapshot.last_updated(), chrono::Utc::now());
            println!(
                "{} offers matched · updated {}",
                result.total.to_string().bold(),
                color_freshness(age.level, &age.label)
            );

            let rows = result
                .items
                .iter()
                .map(|offer| {
                    let score = scores.get(&offer.id);
                    OfferRow {
                        provider: offer.provider.clone(),
                        model: offer.model.clone(),
                        vram: format_vram(offer.vram, offer.gpu_count),
                        price: format_price(offer.price_per_hour),
                        region: offer.region.clone(),
                        commitment: color_commitment(offer.commitment),
                        availability: color_availability(offer.availability),
                        continuity: cache.continuity(offer).to_string(),
                        value: format_value_score(
                            score.and_then(|s| s.normalized),
                            score.is_some_and(|s| s.is_top_value),
                        ),
                        id: offer.id.clone(),
                    }
                })
                .collect();
            print_rows(rows);

            if let Some(params_b) = params_b {
                println!();
                println!(
                    "{}",
                    format!("Inference estimate: {}B parameters, FP16", params_b).bold()
                );
                let rows = result
                    .items
                    .iter()
                    .map(|offer| {
                        let estimate = InferenceEstimate::for_offer(offer, params_b);
                        InferenceRow {
                            id: offer.id.clone(),
                            model: offer.model.clone(),
                            tokens_per_sec: if estimate.tokens_per_sec > 0.0 {
                                format!("{:.0}", estimate.tokens_per_sec)
                            } else {
                                "-".to_string()
                            },
                            cost: estimate
                                .cost_per_million_tokens
                                .map(format_price)
                                .unwrap_or_else(|| "-".to_string()),
                            fits: if estimate.fits_in_vram {
                                "yes".green().to_string()
                            } else {
                                format!("no ({:.0}GB)", estimate.vram_required_gb).red().to_string()
                            },
                        }
                    })
                    .collect();
                print_rows(rows);
            }

            if result.page_count > 1 {
                print_info(&format!("Page {} of {}", result.page, result.page_count));
            }
            if let Some(hash) = share_hash {
                println!("Share: {}", hash.cyan());
            }
        }
    }

    Ok(())
}

/// Write every processed offer (all pages) as CSV
pub fn export_offers(
    snapshot: Arc<Snapshot>,
    filters: &FilterArgs,
    order: &OrderArgs,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut view = build_view(snapshot.clone(), filters, order)?;
    let offers = view.processed();

    let path = output.unwrap_or_else(default_export_path);
    if path.as_os_str() == "-" {
        let stdout = std::io::stdout();
        tracker_lib::export::write_csv(stdout.lock(), offers, snapshot.cache())?;
        return Ok(());
    }

    let file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let rows = tracker_lib::export::write_csv(file, offers, snapshot.cache())?;
    print_success(&format!("Exported {} offers to {}", rows, path.display()));
    Ok(())
}

/// `gpu-prices-YYYY-MM-DD.csv` in the working directory
fn default_export_path() -> PathBuf {
    PathBuf::from(format!(
        "gpu-prices-{}.csv",
        chrono::Utc::now().format("%Y-%m-%d")
    ))
}

/// Row for best picks table
#[derive(Tabled)]
struct PickRow {
    #[tabled(rename = "Pick")]
    pick: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "VRAM")]
    vram: String,
    #[tabled(rename = "Price/Hr")]
    price: String,
}

/// Headline picks over the full dataset
pub fn show_picks(snapshot: Arc<Snapshot>, format: OutputFormat) -> Result<()> {
    let picks = tracker_lib::pipeline::best_picks(snapshot.offers());

    match format {
        OutputFormat::Json => print_json(&picks)?,
        OutputFormat::Table => {
            let entries = [
                ("Best value per GB", picks.value),
                ("Cheapest H100", picks.h100),
                ("Best spot deal", picks.spot),
            ];
            let rows: Vec<PickRow> = entries
                .into_iter()
                .filter_map(|(pick, offer)| {
                    offer.map(|o| PickRow {
                        pick: pick.to_string(),
                        provider: o.provider.clone(),
                        model: o.model.clone(),
                        vram: format_vram(o.vram, o.gpu_count),
                        price: format_price(o.price_per_hour),
                    })
                })
                .collect();
            if rows.is_empty() {
                print_warning("No in-stock offers to pick from");
            } else {
                print_rows(rows);
            }
        }
    }

    Ok(())
}

/// Distinct models, providers and regions
pub fn show_facets(snapshot: Arc<Snapshot>, format: OutputFormat) -> Result<()> {
    let facets = snapshot.facets();

    match format {
        OutputFormat::Json => print_json(&facets)?,
        OutputFormat::Table => {
            println!("{} ({})", "Models".bold(), facets.models.len());
            println!("  {}", facets.models.join(", "));
            println!("{} ({})", "Providers".bold(), facets.providers.len());
            println!("  {}", facets.providers.join(", "));
            println!("{} ({})", "Regions".bold(), facets.regions.len());
            println!("  {}", facets.regions.join(", "));
            println!();
            println!("{}", "Presets".bold());
            for preset in WorkloadPreset::ALL {
                println!("  {:<12} {}", preset.id().cyan(), preset.description());
            }
        }
    }

    Ok(())
}
