//! Application configuration management.
//!
//! This module handles loading and saving the cache configuration: which
//! backend to talk to, the application key that names the warm snapshot, and
//! the cache timing policy.
//!
//! Configuration is stored at `~/.config/lessoncache/config.json`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::cache::{CachePolicy, DataCache, FileWarmCache};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "lessoncache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: Option<String>,
    /// Names the warm snapshot; one per storefront
    pub app_key: String,
    pub cache_duration_secs: u64,
    pub stale_window_secs: u64,
    pub fetch_timeout_secs: u64,
    pub refresh_delay_ms: u64,
    pub warm_max_age_hours: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            app_key: "storefront".to_string(),
            cache_duration_secs: 5 * 60,
            stale_window_secs: 10 * 60,
            fetch_timeout_secs: 15,
            refresh_delay_ms: 100,
            warm_max_age_hours: 24,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the warm snapshot for this app key
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(&self.app_key))
    }

    pub fn policy(&self) -> Result<CachePolicy> {
        let policy = CachePolicy::new(
            Duration::from_secs(self.cache_duration_secs),
            Duration::from_secs(self.stale_window_secs),
        )?
        .with_fetch_timeout(Duration::from_secs(self.fetch_timeout_secs))
        .with_refresh_delay(Duration::from_millis(self.refresh_delay_ms))
        .with_warm_max_age(Duration::from_secs(self.warm_max_age_hours.saturating_mul(60 * 60)));
        policy.validate()?;
        Ok(policy)
    }

    /// Build a data cache backed by the HTTP API and a file warm cache in
    /// `cache_dir`.
    pub fn build_cache(&self, cache_dir: PathBuf) -> Result<DataCache> {
        let base_url = self
            .api_base_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No API base URL configured"))?;
        let api = ApiClient::new(base_url).context("Failed to create API client")?;
        let warm = FileWarmCache::new(cache_dir)?;
        let cache = DataCache::new(Arc::new(api), Arc::new(warm), self.app_key.clone(), self.policy()?)?;
        Ok(cache)
    }
}
