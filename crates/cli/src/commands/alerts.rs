//! Alert subscription and job trigger against the alert service

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracker_lib::alerts::{JobSummary, SideEffectStatus, SubscribeRequest, SubscribeResponse};
use tracker_lib::models::{AlertConditions, AlertType};

use crate::client::ApiClient;
use crate::output::{print_info, print_json, print_success, print_warning, OutputFormat};

#[derive(Args, Debug, Clone)]
pub struct SubscribeArgs {
    /// Address that receives the alert
    #[arg(long)]
    pub email: String,

    /// Alert kind (price-drop, availability, new-low, back-in-stock)
    #[arg(long = "type", value_parser = parse_alert_type)]
    pub alert_type: AlertType,

    /// GPU model to watch
    #[arg(long)]
    pub model: Option<String>,

    /// Provider to watch
    #[arg(long)]
    pub provider: Option<String>,

    /// Fire when the price falls below this hourly rate
    #[arg(long)]
    pub target_price: Option<f64>,

    /// Only consider offers under this hourly rate
    #[arg(long)]
    pub max_price: Option<f64>,

    /// Only consider offers with at least this much VRAM per GPU
    #[arg(long)]
    pub min_vram: Option<f64>,

    /// Ignore spot offers
    #[arg(long)]
    pub only_stable: bool,

    /// Only consider offers with high availability
    #[arg(long)]
    pub only_high_avail: bool,
}

fn parse_alert_type(s: &str) -> Result<AlertType, String> {
    AlertType::parse(s).ok_or_else(|| format!("unknown alert type '{}'", s))
}

impl SubscribeArgs {
    pub fn to_request(&self) -> SubscribeRequest {
        let conditions = AlertConditions {
            max_price: self.max_price,
            min_vram: self.min_vram,
            only_stable: self.only_stable.then_some(true),
            only_high_avail: self.only_high_avail.then_some(true),
            ..Default::default()
        };
        SubscribeRequest {
            email: Some(self.email.clone()),
            alert_type: Some(self.alert_type.as_str().to_string()),
            model: self.model.clone(),
            provider: self.provider.clone(),
            target_price: self.target_price,
            conditions: (conditions != AlertConditions::default()).then_some(conditions),
        }
    }
}

fn status_label(status: &SideEffectStatus) -> String {
    match status {
        SideEffectStatus::Done => "done".green().to_string(),
        SideEffectStatus::Skipped => "skipped".yellow().to_string(),
        SideEffectStatus::Failed => "failed".red().to_string(),
    }
}

/// Register an alert
pub async fn subscribe(client: &ApiClient, args: &SubscribeArgs, format: OutputFormat) -> Result<()> {
    let response: SubscribeResponse = client.post("api/subscribe", &args.to_request()).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_success(&response.message);
            println!("Stored:                 {}", status_label(&response.stored));
            println!("Confirmation email:     {}", status_label(&response.confirmation));
            if !response.processed {
                print_warning("The alert service could not complete every step");
            }
        }
    }

    Ok(())
}

/// Trigger one alert job run
pub async fn check(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let summary: JobSummary = client.get("api/check-alerts").await?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            println!("{}", "Alert Job".bold());
            println!("{}", "=".repeat(50));
            println!("Checked:                {}", summary.checked);
            println!("Triggered:              {}", summary.triggered.to_string().green());
            println!("Skipped (cooldown):     {}", summary.skipped);
            println!("No match:               {}", summary.unmatched);
            if summary.malformed > 0 {
                print_warning(&format!("{} malformed records", summary.malformed));
            }
            if summary.failed > 0 {
                print_warning(&format!("{} notifications failed to send", summary.failed));
            }
            print_info(&format!("Ran at {}", summary.timestamp));
        }
    }

    Ok(())
}
