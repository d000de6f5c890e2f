//! Server configuration.
//!
//! Read from `<config_dir>/stitchcraft/config.json` when present, then
//! overridden by `STITCHCRAFT_*` environment variables.

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::DecreaseRule;

const APP_NAME: &str = "stitchcraft";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// SQLite file. Defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Decrease rule used when a request does not name one.
    pub decrease_rule: DecreaseRule,
    pub subscription_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_path: None,
            decrease_rule: DecreaseRule::default(),
            subscription_ttl_secs: 300,
        }
    }
}

impl Config {
    /// Load configuration from the user's config directory plus environment.
    /// Falls back to defaults if the file is missing or unreadable.
    pub fn load() -> Self {
        let mut config = match get_config_path().and_then(|p| Self::load_from(&p)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Apply `STITCHCRAFT_*` overrides. Unparseable values are ignored.
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(host) = get("STITCHCRAFT_HOST") {
            self.host = host;
        }
        if let Some(port) = get("STITCHCRAFT_PORT").and_then(|s| s.parse().ok()) {
            self.port = port;
        }
        if let Some(path) = get("STITCHCRAFT_DB_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(rule) = get("STITCHCRAFT_DECREASE_RULE")
            .as_deref()
            .and_then(DecreaseRule::from_str)
        {
            self.decrease_rule = rule;
        }
        if let Some(secs) = get("STITCHCRAFT_SUBSCRIPTION_TTL_SECS").and_then(|s| s.parse().ok()) {
            self.subscription_ttl_secs = secs;
        }
    }

    pub fn subscription_ttl(&self) -> Duration {
        Duration::from_secs(self.subscription_ttl_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
