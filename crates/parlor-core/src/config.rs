use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Service the client talks to when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str =
    "https://80e80162-bd11-4f2a-8dcb-cdac4143ea72-00-2h6gxhwu18rrl.pike.replit.dev";

/// Environment variable overriding the configured base URL.
pub const API_URL_ENV: &str = "PARLOR_API_URL";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_base_url: None,
            request_timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn save_api_base_url(url: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.api_base_url = Some(normalize_base_url(url));
        config.save()
    }

    /// Base URL to use, in order: explicit override, `PARLOR_API_URL`,
    /// config file, built-in default. Never ends in a slash.
    pub fn resolve_base_url(&self, cli_override: Option<&str>) -> String {
        let env = std::env::var(API_URL_ENV).ok();
        self.pick_base_url(cli_override, env.as_deref())
    }

    fn pick_base_url(&self, cli_override: Option<&str>, env: Option<&str>) -> String {
        let url = [cli_override, env, self.api_base_url.as_deref()]
            .into_iter()
            .flatten()
            .find(|u| !u.trim().is_empty())
            .unwrap_or(DEFAULT_API_BASE_URL);
        normalize_base_url(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("parlor"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.json"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
