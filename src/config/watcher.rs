use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::ANNOTATION_SUFFIX;
use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatcherConfig {
    /// Extension (without dot) of annotation files
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
        }
    }
}

impl WatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.suffix.is_empty() || self.suffix.contains('.') || self.suffix.contains('/') {
            return Err(Error::Config(ConfigError::Message(format!(
                "watcher suffix must be a bare extension, got {:?}",
                self.suffix
            ))));
        }
        Ok(())
    }
}

fn default_suffix() -> String {
    ANNOTATION_SUFFIX.to_string()
}
