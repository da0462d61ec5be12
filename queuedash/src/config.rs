//! Configuration management

use queuedash_client::{EndpointConfig, DEFAULT_ACCOUNT_ID};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_statistics_url")]
    pub statistics_url: String,

    #[serde(default = "default_control_url")]
    pub control_url: String,

    #[serde(default = "default_account_id")]
    pub account_id: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            statistics_url: default_statistics_url(),
            control_url: default_control_url(),
            account_id: default_account_id(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl EndpointsConfig {
    pub fn to_endpoint_config(&self) -> anyhow::Result<EndpointConfig> {
        let config = EndpointConfig::new(&self.statistics_url, &self.control_url)
            .map_err(|e| anyhow::anyhow!("invalid emulator URL: {}", e))?
            .with_account_id(self.account_id.clone())
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs));
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Where favorites are kept between sessions
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum StorageConfig {
    #[serde(rename = "memory")]
    Memory,

    #[serde(rename = "sqlite")]
    Sqlite { path: PathBuf },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("queuedash.db"),
        }
    }
}

fn default_statistics_url() -> String {
    "http://localhost:9325".to_string()
}

fn default_control_url() -> String {
    "http://localhost:9324".to_string()
}

fn default_account_id() -> String {
    DEFAULT_ACCOUNT_ID.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_interval_ms() -> u64 {
    1000
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Default)]
pub struct Overrides {
    pub statistics_url: Option<String>,
    pub control_url: Option<String>,
    pub account_id: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub data_dir: Option<PathBuf>,
    pub no_persist: bool,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Without an explicit path, `queuedash.toml` in the working directory is used if present.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("queuedash").required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix("QUEUEDASH").separator("__"))
            .build()?;

        Ok(config.try_deserialize::<Config>()?)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.statistics_url {
            self.endpoints.statistics_url = url;
        }
        if let Some(url) = overrides.control_url {
            self.endpoints.control_url = url;
        }
        if let Some(account_id) = overrides.account_id {
            self.endpoints.account_id = account_id;
        }
        if let Some(interval_ms) = overrides.poll_interval_ms {
            self.polling.interval_ms = interval_ms;
        }
        if let Some(dir) = overrides.data_dir {
            self.storage = StorageConfig::Sqlite {
                path: dir.join("queuedash.db"),
            };
        }
        if overrides.no_persist {
            self.storage = StorageConfig::Memory;
        }
    }
}
