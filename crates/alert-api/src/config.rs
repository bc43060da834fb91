//! Service configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tracker_lib::alerts::{AlertJobConfig, NewLowPolicy, DEFAULT_COOLDOWN_HOURS};
use tracker_lib::notify::DEFAULT_FROM_ADDRESS;

/// Longest accepted cooldown window, one year
const MAX_COOLDOWN_HOURS: i64 = 24 * 365;

/// Alert service configuration, read from the process environment
#[derive(Debug, Clone, Deserialize)]
pub struct AlertApiConfig {
    /// Port for the HTTP API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Offer dataset feed
    #[serde(default = "default_gpu_data_url")]
    pub gpu_data_url: String,

    /// Daily price history snapshots
    #[serde(default)]
    pub price_history_url: Option<String>,

    #[serde(default)]
    pub kv_rest_api_url: Option<String>,

    #[serde(default)]
    pub kv_rest_api_token: Option<String>,

    #[serde(default)]
    pub resend_api_key: Option<String>,

    #[serde(default = "default_from_address")]
    pub alert_from_address: String,

    /// Base URL for links in alert emails
    #[serde(default = "default_site_url")]
    pub site_url: String,

    #[serde(default = "default_cooldown_hours")]
    pub alert_cooldown_hours: i64,

    #[serde(default = "default_max_concurrency")]
    pub alert_max_concurrency: usize,

    #[serde(default)]
    pub new_low_policy: NewLowPolicy,

    /// Run the alert job in-process once a day
    #[serde(default)]
    pub alert_schedule_enabled: bool,

    #[serde(default = "default_schedule_hour")]
    pub alert_schedule_hour_utc: u32,
}

fn default_api_port() -> u16 {
    8080
}

fn default_gpu_data_url() -> String {
    "https://gpu-tracker.dev/gpu-data.json".to_string()
}

fn default_from_address() -> String {
    DEFAULT_FROM_ADDRESS.to_string()
}

fn default_site_url() -> String {
    "https://gpu-tracker.dev".to_string()
}

fn default_cooldown_hours() -> i64 {
    DEFAULT_COOLDOWN_HOURS
}

fn default_max_concurrency() -> usize {
    8
}

fn default_schedule_hour() -> u32 {
    6
}

impl Default for AlertApiConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            gpu_data_url: default_gpu_data_url(),
            price_history_url: None,
            kv_rest_api_url: None,
            kv_rest_api_token: None,
            resend_api_key: None,
            alert_from_address: default_from_address(),
            site_url: default_site_url(),
            alert_cooldown_hours: default_cooldown_hours(),
            alert_max_concurrency: default_max_concurrency(),
            new_low_policy: NewLowPolicy::default(),
            alert_schedule_enabled: false,
            alert_schedule_hour_utc: default_schedule_hour(),
        }
    }
}

impl AlertApiConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_environment(config::Environment::default())
    }

    /// Load configuration from an explicit variable map instead of the process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        Self::from_environment(config::Environment::default().source(Some(vars)))
    }

    fn from_environment(env: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(env.try_parsing(true))
            .build()
            .context("failed to read configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("invalid alert-api configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.alert_schedule_hour_utc > 23 {
            anyhow::bail!(
                "ALERT_SCHEDULE_HOUR_UTC must be 0-23, got {}",
                self.alert_schedule_hour_utc
            );
        }
        if !(0..=MAX_COOLDOWN_HOURS).contains(&self.alert_cooldown_hours) {
            anyhow::bail!(
                "ALERT_COOLDOWN_HOURS must be 0-{}, got {}",
                MAX_COOLDOWN_HOURS,
                self.alert_cooldown_hours
            );
        }
        Ok(())
    }

    pub fn job_config(&self) -> AlertJobConfig {
        AlertJobConfig {
            cooldown: chrono::Duration::hours(self.alert_cooldown_hours),
            max_concurrency: self.alert_max_concurrency.max(1),
            new_low_policy: self.new_low_policy,
            site_url: self.site_url.clone(),
        }
    }
}
