use comsa_core::client::{DEFAULT_MAX_METADATA_PAGES, MAX_METADATA_PAGE_SIZE};
use comsa_core::{CatapultClientConfig, ComsaError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_fetch_delay_ms")]
    pub fetch_delay_ms: u64,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    #[serde(default = "default_metadata_page_size")]
    pub metadata_page_size: u32,
    #[serde(default = "default_max_metadata_pages")]
    pub max_metadata_pages: u32,
    #[serde(default)]
    pub archive_dir: Option<PathBuf>,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_fetch_delay_ms() -> u64 {
    3000
}

fn default_max_concurrent_fetches() -> usize {
    1
}

fn default_metadata_page_size() -> u32 {
    MAX_METADATA_PAGE_SIZE
}

fn default_max_metadata_pages() -> u32 {
    DEFAULT_MAX_METADATA_PAGES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            fetch_delay_ms: default_fetch_delay_ms(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            metadata_page_size: default_metadata_page_size(),
            max_metadata_pages: default_max_metadata_pages(),
            archive_dir: None,
        }
    }
}

impl Config {
    /// Load from an optional file, then `COMSA_*` environment variables.
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(::config::Environment::with_prefix("COMSA"))
            .build()
            .map_err(|e| ComsaError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| ComsaError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_fetches == 0 {
            return Err(ComsaError::Config(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        if self.metadata_page_size == 0 || self.metadata_page_size > MAX_METADATA_PAGE_SIZE {
            return Err(ComsaError::Config(format!(
                "metadata_page_size must be between 1 and {}",
                MAX_METADATA_PAGE_SIZE
            )));
        }
        if self.max_metadata_pages == 0 {
            return Err(ComsaError::Config(
                "max_metadata_pages must be positive".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ComsaError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }

    pub fn client_config(&self) -> Result<CatapultClientConfig> {
        let node_url = self
            .node_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                ComsaError::Config(
                    "node_url is required (config file, COMSA_NODE_URL or --node-url)".to_string(),
                )
            })?;

        Ok(CatapultClientConfig {
            node_url: node_url.to_string(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            metadata_page_size: self.metadata_page_size,
            max_metadata_pages: self.max_metadata_pages,
        })
    }
}
