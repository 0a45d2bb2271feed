//! Application configuration management.
//!
//! Configuration is stored at `~/.config/menucache/config.json` and may be
//! overridden from the environment (a `.env` file is honoured by the binary):
//!
//! - `MENUCACHE_API_URL`: API base URL
//! - `MENUCACHE_PAGE_SIZE`: menu items requested per category
//! - `MENUCACHE_BULK_DELAY_MS`: delay before the bulk category fetch

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::DEFAULT_API_BASE_URL;
use crate::hydrator::HydratorSettings;
use crate::models::PageRequest;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "menucache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const ENV_API_URL: &str = "MENUCACHE_API_URL";
const ENV_PAGE_SIZE: &str = "MENUCACHE_PAGE_SIZE";
const ENV_BULK_DELAY_MS: &str = "MENUCACHE_BULK_DELAY_MS";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub last_email: Option<String>,
    pub page_size: Option<u32>,
    pub bulk_delay_ms: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Apply `MENUCACHE_*` environment variables on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = Some(url.trim().to_string());
        }
        if let Some(raw) = lookup(ENV_PAGE_SIZE) {
            match raw.trim().parse::<u32>() {
                Ok(size) if size > 0 => self.page_size = Some(size),
                _ => warn!(value = %raw, "Ignoring invalid {}", ENV_PAGE_SIZE),
            }
        }
        if let Some(raw) = lookup(ENV_BULK_DELAY_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.bulk_delay_ms = Some(ms),
                Err(e) => warn!(value = %raw, error = %e, "Ignoring invalid {}", ENV_BULK_DELAY_MS),
            }
        }
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn hydrator_settings(&self) -> HydratorSettings {
        let defaults = HydratorSettings::default();
        HydratorSettings {
            bulk_delay: self
                .bulk_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.bulk_delay),
            page: PageRequest::new(
                defaults.page.page,
                self.page_size.unwrap_or(defaults.page.page_size),
            ),
            ..defaults
        }
    }
}
