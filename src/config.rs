use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub cms: CmsConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
    pub server: ServerConfig,
}

/// CMS read interface settings. The read token is taken from the
/// `CMS_READ_TOKEN` environment variable, not from this file.
#[derive(Debug, Deserialize, Clone)]
pub struct CmsConfig {
    /// Base URL of the CMS query API (e.g. `https://abc123.api.example.io`).
    pub url: String,
    pub dataset: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Also index records that have no publish timestamp yet.
    #[serde(default)]
    pub include_unpublished: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_version() -> String {
    "2024-10-28".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    5
}

/// Remote search index settings. The admin key (clear/write) comes from
/// `INDEX_ADMIN_API_KEY`, the query key from `INDEX_QUERY_API_KEY`.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    pub app_id: String,
    /// Name of the index to mirror into and query. Never hardcoded.
    pub index_name: String,
    /// Override the service endpoint; defaults to the hosted URL derived
    /// from `app_id`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Directory holding the persisted query cache and last-query files.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Maximum number of cached query strings before LRU eviction.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./data/cache")
}
fn default_cache_capacity() -> usize {
    256
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Quiescence window for the debounced controller, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.cms.url.trim().is_empty() {
        anyhow::bail!("cms.url must not be empty");
    }
    if config.cms.dataset.trim().is_empty() {
        anyhow::bail!("cms.dataset must not be empty");
    }
    if config.index.index_name.trim().is_empty() {
        anyhow::bail!("index.index_name must not be empty");
    }
    if config.cache.capacity == 0 {
        anyhow::bail!("cache.capacity must be > 0");
    }
    if config.search.debounce_ms == 0 {
        anyhow::bail!("search.debounce_ms must be > 0");
    }

    Ok(config)
}
