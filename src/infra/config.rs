// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::feed::PlatformFilter;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub retry: RetryTomlConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Service root; API calls go to `<base_url>/api/...`.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".into(),
            timeout_secs: 15,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub refresh_interval_secs: u64,
    pub limit_all: u32,
    pub limit_platform: u32,
    pub default_platform: PlatformFilter,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 30 * 60,
            limit_all: 40,
            limit_platform: 20,
            default_platform: PlatformFilter::All,
        }
    }
}

impl FeedConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    /// Request size for a filter. The backend applies its own caps on top.
    pub fn limit_for(&self, filter: &PlatformFilter) -> u32 {
        match filter {
            PlatformFilter::All => self.limit_all,
            PlatformFilter::Platform(_) => self.limit_platform,
        }
    }
}

/// `[retry]` section; applies to idempotent backend reads only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryTomlConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryTomlConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 500,
            max_delay_ms: 5_000,
        }
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        let config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `VIRAL_DAILY_BACKEND_URL` on top of file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("VIRAL_DAILY_BACKEND_URL") {
            if !url.trim().is_empty() {
                self.backend.base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
        self
    }
}
