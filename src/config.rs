// src/config.rs
use crate::video_client::FetchFilter;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_KEY_ENV: &str = "HOLODEX_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_key: String,
    /// Comma-separated Holodex channel ids.
    #[serde(default)]
    pub channels: String,
    /// Comma-separated organization names, case sensitive as listed on Holodex.
    #[serde(default)]
    pub organizations: String,
    #[serde(default = "default_true")]
    pub show_live: bool,
    #[serde(default = "default_true")]
    pub show_upcoming: bool,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_refresh_interval_secs() -> u64 {
    600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            channels: String::new(),
            organizations: String::new(),
            show_live: default_true(),
            show_upcoming: default_true(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl Config {
    /// Loads `path`, writing a default file first when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }
        Self::load_or_default(path)
    }

    /// Like [`Config::load`], but a missing file yields the defaults and
    /// nothing is written.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("vtschedule").join("config.toml")
    }

    /// Fills an empty `api_key` from the environment.
    pub fn with_env_api_key(mut self) -> Self {
        if self.api_key.is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                self.api_key = key;
            }
        }
        self
    }

    pub fn fetch_filter(&self) -> FetchFilter {
        FetchFilter { live: self.show_live, upcoming: self.show_upcoming }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("vtschedule").join("vtschedule.log")
}
