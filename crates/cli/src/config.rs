//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_URL: &str = "https://gpu-tracker.dev/gpu-data.json";
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Dataset URL or file path
    pub data_url: Option<String>,
    /// Price history URL or file path
    pub history_url: Option<String>,
    /// Alert API endpoint URL
    pub api_url: Option<String>,
}

impl Config {
    /// Load `~/.config/gput/config.json`, or defaults when it does not exist
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Dataset source: flag, then config file, then the public feed
    pub fn resolve_data(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.data_url.clone())
            .unwrap_or_else(|| DEFAULT_DATA_URL.to_string())
    }

    pub fn resolve_history(&self, flag: Option<String>) -> Option<String> {
        flag.or_else(|| self.history_url.clone())
    }

    pub fn resolve_api(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    fn config_path() -> Option<PathBuf> {
        let home = dirs_next::home_dir()?;
        Some(home.join(".config").join("gput").join("config.json"))
    }
}
