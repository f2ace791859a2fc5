// =============================================================================
// Application configuration — JSON file with per-field serde defaults
// =============================================================================
//
// All tunables live here: the HTTP bind address, the provider endpoints, the
// cache TTL table, and the scorer weight table. Every field carries a serde
// default so an older config file missing new fields still loads.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::TtlConfig;
use crate::scorer::ScoreWeights;

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_quote_base_url() -> String {
    "https://push2.eastmoney.com".to_string()
}

fn default_hist_base_url() -> String {
    "https://push2his.eastmoney.com".to_string()
}

fn default_macro_base_url() -> String {
    "https://datacenter-web.eastmoney.com".to_string()
}

fn default_calendar_base_url() -> String {
    "https://datacenter-web.eastmoney.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_etf_spot_filter() -> String {
    // Exchange-traded fund boards.
    "b:MK0021,b:MK0022,b:MK0023,b:MK0024".to_string()
}

fn default_index_spot_filter() -> String {
    // Major mainland index boards.
    "m:1+s:2,m:0+t:5".to_string()
}

/// Upstream endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_quote_base_url")]
    pub quote_base_url: String,

    #[serde(default = "default_hist_base_url")]
    pub hist_base_url: String,

    #[serde(default = "default_macro_base_url")]
    pub macro_base_url: String,

    #[serde(default = "default_calendar_base_url")]
    pub calendar_base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_etf_spot_filter")]
    pub etf_spot_filter: String,

    #[serde(default = "default_index_spot_filter")]
    pub index_spot_filter: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            quote_base_url: default_quote_base_url(),
            hist_base_url: default_hist_base_url(),
            macro_base_url: default_macro_base_url(),
            calendar_base_url: default_calendar_base_url(),
            timeout_secs: default_timeout_secs(),
            etf_spot_filter: default_etf_spot_filter(),
            index_spot_filter: default_index_spot_filter(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub cache_ttl: TtlConfig,

    #[serde(default)]
    pub score_weights: ScoreWeights,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            provider: ProviderConfig::default(),
            cache_ttl: TtlConfig::default(),
            score_weights: ScoreWeights::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(path = %path.display(), bind = %config.bind_addr, "config loaded");
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is absent or
    /// unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.as_ref().display(), error = %e, "using default config");
                Self::default()
            }
        }
    }
}
