//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use tracker_lib::freshness::FreshnessLevel;
use tracker_lib::models::{Availability, Commitment};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table
pub fn print_rows<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        println!("{}", "No offers found".yellow());
        return;
    }
    println!("{}", Table::new(rows).with(Style::rounded()));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Hourly price with four decimals
pub fn format_price(price: f64) -> String {
    format!("${:.4}", price)
}

/// Format currency
pub fn format_currency(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// `80GB` or `4x80GB`
pub fn format_vram(vram: f64, gpu_count: u32) -> String {
    if gpu_count > 1 {
        format!("{}x{}GB", gpu_count, vram)
    } else {
        format!("{}GB", vram)
    }
}

pub fn color_availability(availability: Availability) -> String {
    let label = availability.to_string();
    match availability {
        Availability::High => label.green().to_string(),
        Availability::Medium => label.yellow().to_string(),
        Availability::Low => label.red().to_string(),
        Availability::OutOfStock => label.dimmed().to_string(),
    }
}

pub fn color_commitment(commitment: Commitment) -> String {
    let label = commitment.to_string();
    if commitment.is_spot() {
        label.magenta().to_string()
    } else {
        label
    }
}

pub fn color_freshness(level: FreshnessLevel, label: &str) -> String {
    match level {
        FreshnessLevel::Live => label.green().to_string(),
        FreshnessLevel::Recent => label.blue().to_string(),
        FreshnessLevel::Stale => label.yellow().to_string(),
        FreshnessLevel::Outdated => label.red().to_string(),
    }
}

/// Normalized value score, highlighted when it is the best of the set
pub fn format_value_score(normalized: Option<u8>, is_top: bool) -> String {
    match normalized {
        Some(score) if is_top => format!("{} ★", score).green().bold().to_string(),
        Some(score) => score.to_string(),
        None => "N/A".dimmed().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_vram() {
        assert_eq!(format_vram(80.0, 1), "80GB");
        assert_eq!(format_vram(80.0, 8), "8x80GB");
        assert_eq!(format_vram(24.5, 2), "2x24.5GB");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(1.5), "$1.5000");
        assert_eq!(format_currency(1234.567), "$1234.57");
    }

    #[test]
    fn test_value_score_without_raw() {
        colored::control::set_override(false);
        assert_eq!(format_value_score(None, false), "N/A");
        assert_eq!(format_value_score(Some(87), false), "87");
        assert_eq!(format_value_score(Some(100), true), "100 ★");
    }
}
