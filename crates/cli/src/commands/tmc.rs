//! True monthly cost of one offer

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::sync::Arc;
use tracker_lib::catalog::provider_billing;
use tracker_lib::tmc::{calc_tmc, time_to_hydrate, TmcBreakdown, UsageProfile};
use tracker_lib::Snapshot;

use crate::output::{format_currency, format_price, print_json, print_warning, OutputFormat};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TmcOutput<'a> {
    id: &'a str,
    provider: &'a str,
    model: &'a str,
    price_per_hour: f64,
    usage: UsageProfile,
    #[serde(flatten)]
    breakdown: TmcBreakdown,
    hydrate_seconds: Option<f64>,
}

/// Show the monthly cost breakdown for offer `id`
pub fn show_tmc(
    snapshot: Arc<Snapshot>,
    id: &str,
    usage: UsageProfile,
    format: OutputFormat,
) -> Result<()> {
    let offer = snapshot
        .find(id)
        .with_context(|| format!("No offer with id '{}'", id))?;
    let breakdown = calc_tmc(offer, &usage);
    let billing = provider_billing(&offer.provider);
    let hydrate = time_to_hydrate(usage.storage_gb, billing.network_bandwidth_gbps);

    match format {
        OutputFormat::Json => print_json(&TmcOutput {
            id: &offer.id,
            provider: &offer.provider,
            model: &offer.model,
            price_per_hour: offer.price_per_hour,
            usage,
            breakdown,
            hydrate_seconds: hydrate.seconds(),
        })?,
        OutputFormat::Table => {
            println!("{}", "True Monthly Cost".bold());
            println!("{}", "=".repeat(50));
            println!("Offer:                  {} {} ({})", offer.provider.cyan(), offer.model, offer.id);
            println!("Listed price:           {}/hr", format_price(offer.price_per_hour));
            println!(
                "Usage:                  {} h/week, {} GB storage, {} GB egress/month",
                usage.hours_per_week, usage.storage_gb, usage.egress_gb_per_month
            );
            println!();

            println!("{}", "Monthly Costs".bold());
            println!("{}", "-".repeat(50));
            println!("GPU:                    {}", format_currency(breakdown.gpu_cost_monthly));
            println!("Storage:                {}", format_currency(breakdown.storage_cost_monthly));
            println!("Egress:                 {}", format_currency(breakdown.egress_cost_monthly));
            println!(
                "{}                  {}",
                "Total:".bold(),
                format_currency(breakdown.total_monthly).green().bold()
            );
            println!(
                "Effective hourly:       {}",
                format_price(breakdown.effective_hourly)
            );
            println!("Time to hydrate data:   {}", hydrate);
            println!();

            if !billing.storage_warning.is_empty() {
                print_warning(billing.storage_warning);
            }
            if !billing.billing_note.is_empty() {
                println!("{}", billing.billing_note.dimmed());
            }
        }
    }

    Ok(())
}
