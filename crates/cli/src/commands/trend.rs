//! Price history trend for one model

use anyhow::{Context, Result};
use colored::Colorize;
use tabled::Tabled;
use tracker_lib::history::{model_price_trend, ModelPriceTrend, TrendDirection};
use tracker_lib::models::PriceHistory;

use crate::output::{format_price, print_json, print_rows, print_success, OutputFormat};

/// Row for daily price table
#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Min $/hr")]
    min: String,
    #[tabled(rename = "Avg $/hr")]
    avg: String,
}

fn direction_label(direction: TrendDirection) -> String {
    match direction {
        TrendDirection::Falling => "falling ↓".green().to_string(),
        TrendDirection::Rising => "rising ↑".red().to_string(),
        TrendDirection::Flat => "flat →".to_string(),
    }
}

fn day_rows(trend: &ModelPriceTrend) -> Vec<DayRow> {
    trend
        .dates
        .iter()
        .zip(trend.min_prices.iter().zip(trend.avg_prices.iter()))
        .map(|(date, (min, avg))| DayRow {
            date: date.clone(),
            min: format_price(*min),
            avg: format_price(*avg),
        })
        .collect()
}

/// Show the price trend of `model`
pub fn show_trend(history: &PriceHistory, model: &str, format: OutputFormat) -> Result<()> {
    let trend = model_price_trend(history, model)
        .with_context(|| format!("No price history for model '{}'", model))?;

    match format {
        OutputFormat::Json => print_json(&trend)?,
        OutputFormat::Table => {
            println!("{} {}", "Price trend for".bold(), model.cyan().bold());
            println!("{}", "=".repeat(50));
            println!("Days covered:           {}", trend.days_covered);
            if let Some(current) = trend.current_min() {
                println!("Current minimum:        {}", format_price(current));
            }
            if let Some(low) = trend.historical_min() {
                println!("Historical minimum:     {}", format_price(low));
            }
            println!("Direction:              {}", direction_label(trend.direction));
            println!();
            print_rows(day_rows(&trend));
            if trend.is_historical_low {
                print_success("Current price is at its historical low");
            }
        }
    }

    Ok(())
}
