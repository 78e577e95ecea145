use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    /// Serve Prometheus metrics at `/metrics` on the WebSocket listener
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl MonitoringConfig {
    pub fn validate(&self) -> Result<()> {
        #[cfg(debug_assertions)]
        if !self.metrics_enabled {
            tracing::warn!("metrics endpoint disabled");
        }
        Ok(())
    }
}

fn default_metrics_enabled() -> bool {
    true
}
