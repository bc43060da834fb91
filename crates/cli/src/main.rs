//! GPU Tracker CLI
//!
//! Browse, rank and export cloud GPU rental offers, inspect share links and
//! price trends, and manage price alerts from the terminal.

mod client;
mod commands;
mod config;
mod output;
mod source;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{alerts, offers, search, share, tmc, trend};
use std::path::PathBuf;
use tracker_lib::tmc::UsageProfile;

/// GPU Tracker CLI
#[derive(Parser)]
#[command(name = "gput")]
#[command(author, version, about = "CLI for the GPU Tracker price dashboard", long_about = None)]
pub struct Cli {
    /// Dataset URL or file (can also be set via GPUT_DATA_URL env var)
    #[arg(long, global = true, env = "GPUT_DATA_URL")]
    pub data: Option<String>,

    /// Alert API endpoint URL (can also be set via GPUT_API_URL env var)
    #[arg(long, global = true, env = "GPUT_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Browse the offer dataset
    #[command(subcommand)]
    Offers(OffersCommands),

    /// True monthly cost of one offer
    Tmc {
        /// Offer ID
        id: String,

        /// Hours of use per week
        #[arg(long, default_value_t = 40.0)]
        hours: f64,

        /// Persistent storage in GB
        #[arg(long, default_value_t = 100.0)]
        storage: f64,

        /// Egress per month in GB
        #[arg(long, default_value_t = 50.0)]
        egress: f64,
    },

    /// Share link helpers
    #[command(subcommand)]
    Share(ShareCommands),

    /// Price trend of a GPU model
    Trend {
        /// GPU model name
        model: String,

        /// Price history URL or file (can also be set via GPUT_HISTORY_URL env var)
        #[arg(long, env = "GPUT_HISTORY_URL")]
        history: Option<String>,
    },

    /// Price alerts
    #[command(subcommand)]
    Alerts(AlertsCommands),
}

#[derive(Subcommand)]
pub enum OffersCommands {
    /// List one page of matching offers
    List {
        #[command(flatten)]
        filters: offers::FilterArgs,

        #[command(flatten)]
        order: offers::OrderArgs,

        /// Page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Print the share fragment for the active filters
        #[arg(long)]
        share: bool,

        /// Add serving estimates for a dense LLM of this many billion parameters
        #[arg(long, value_name = "BILLIONS")]
        params: Option<f64>,
    },

    /// Live search: read queries from stdin, one per line
    Search {
        #[command(flatten)]
        filters: offers::FilterArgs,

        #[command(flatten)]
        order: offers::OrderArgs,

        /// Offers shown per query
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Export every matching offer as CSV
    Export {
        #[command(flatten)]
        filters: offers::FilterArgs,

        #[command(flatten)]
        order: offers::OrderArgs,

        /// Output file, `-` for stdout (defaults to gpu-prices-<date>.csv)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Headline picks over the whole dataset
    Picks,

    /// Distinct models, providers and regions, plus workload presets
    Facets,
}

#[derive(Subcommand)]
pub enum ShareCommands {
    /// Show the filters carried by a share hash
    Decode {
        /// `#q=...` fragment or bare hash
        hash: String,
    },
}

#[derive(Subcommand)]
pub enum AlertsCommands {
    /// Subscribe to a price alert
    Subscribe(alerts::SubscribeArgs),

    /// Run the alert job now
    Check,
}

fn init_tracing(verbose: bool) {
    if !verbose {
        return;
    }
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::DEBUG)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::Config::load()?;
    let data = config.resolve_data(cli.data.clone());
    let format = cli.format;

    // Execute command
    match cli.command {
        Commands::Offers(offers_cmd) => {
            let snapshot = source::load_snapshot(&data).await?;
            match offers_cmd {
                OffersCommands::List {
                    filters,
                    order,
                    page,
                    share,
                    params,
                } => offers::list_offers(snapshot, &filters, &order, page, share, params, format)?,
                OffersCommands::Search {
                    filters,
                    order,
                    limit,
                } => search::search_offers(snapshot, &filters, &order, limit, format).await?,
                OffersCommands::Export {
                    filters,
                    order,
                    output,
                } => offers::export_offers(snapshot, &filters, &order, output)?,
                OffersCommands::Picks => offers::show_picks(snapshot, format)?,
                OffersCommands::Facets => offers::show_facets(snapshot, format)?,
            }
        }
        Commands::Tmc {
            id,
            hours,
            storage,
            egress,
        } => {
            let snapshot = source::load_snapshot(&data).await?;
            tmc::show_tmc(snapshot, &id, UsageProfile::new(hours, storage, egress), format)?;
        }
        Commands::Share(ShareCommands::Decode { hash }) => {
            share::decode_share(&hash, format)?;
        }
        Commands::Trend { model, history } => {
            let location = config
                .resolve_history(history)
                .context("No price history source; pass --history or set history_url")?;
            let history = source::load_history(&location).await?;
            trend::show_trend(&history, &model, format)?;
        }
        Commands::Alerts(alerts_cmd) => {
            let client = client::ApiClient::new(&config.resolve_api(cli.api_url.clone()))?;
            match alerts_cmd {
                AlertsCommands::Subscribe(args) => alerts::subscribe(&client, &args, format).await?,
                AlertsCommands::Check => alerts::check(&client, format).await?,
            }
        }
    }

    Ok(())
}
