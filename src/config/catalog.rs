use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CatalogConfig {
    /// HTTP endpoint serving the stage list as JSON; empty disables the fetch
    #[serde(default)]
    pub url: String,

    /// Local JSON copy of the stage list. Read when the fetch is disabled or
    /// fails, rewritten after every successful fetch. Empty disables it.
    #[serde(default)]
    pub cache_file: PathBuf,

    /// Upper bound for one catalog load (unit: milliseconds)
    #[serde(default = "default_fetch_timeout_in_ms")]
    pub fetch_timeout_in_ms: u64,

    /// First delay before loading again after an empty or failed load
    /// (unit: milliseconds). Doubles on each attempt.
    #[serde(default = "default_retry_base_delay_in_ms")]
    pub retry_base_delay_in_ms: u64,

    /// Upper bound for the retry delay (unit: milliseconds)
    #[serde(default = "default_retry_max_delay_in_ms")]
    pub retry_max_delay_in_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            cache_file: PathBuf::new(),
            fetch_timeout_in_ms: default_fetch_timeout_in_ms(),
            retry_base_delay_in_ms: default_retry_base_delay_in_ms(),
            retry_max_delay_in_ms: default_retry_max_delay_in_ms(),
        }
    }
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "fetch_timeout_in_ms must be greater than 0".into(),
            )));
        }
        if self.retry_base_delay_in_ms == 0 || self.retry_max_delay_in_ms < self.retry_base_delay_in_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "catalog retry delays must satisfy 0 < base ({}) <= max ({})",
                self.retry_base_delay_in_ms, self.retry_max_delay_in_ms
            ))));
        }
        if !self.url.is_empty() && !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(Error::Config(ConfigError::Message(format!(
                "catalog url must be http(s), got {}",
                self.url
            ))));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_in_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_in_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_in_ms)
    }

    pub fn cache_file(&self) -> Option<PathBuf> {
        if self.cache_file.as_os_str().is_empty() {
            None
        } else {
            Some(self.cache_file.clone())
        }
    }
}

fn default_fetch_timeout_in_ms() -> u64 {
    10_000
}

fn default_retry_base_delay_in_ms() -> u64 {
    5_000
}

fn default_retry_max_delay_in_ms() -> u64 {
    300_000
}
