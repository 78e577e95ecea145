//! A builder for assembling a [`Node`].
//!
//! ## Lifecycle
//! - `build()`: resolves the startup folder, creates the channels, the engine, the session registry
//!   and the router, and picks the catalog source.
//! - `start_server()`: binds the WebSocket listener (and `/metrics`).
//! - `ready()`: returns the assembled [`Node`].
//!
//! ## Example
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let node = NodeBuilder::init(config, shutdown_rx)
//!     .with_catalog(custom_catalog) // Optional override
//!     .build()
//!     .start_server()?
//!     .ready()?;
//! node.run().await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::info;
use tracing::warn;

use super::Node;
use crate::catalog::catalog_from_config;
use crate::catalog::StageCatalog;
use crate::metrics;
use crate::network::ConnectionServer;
use crate::HostState;
use crate::IniCodec;
use crate::ProtocolRouter;
use crate::Result;
use crate::SessionRegistry;
use crate::StructuredTextCodec;
use crate::SyncEngine;
use crate::SyncNodeConfig;
use crate::SystemError;

pub struct NodeBuilder {
    pub(super) config: SyncNodeConfig,
    pub(super) codec: Option<Arc<dyn StructuredTextCodec>>,
    pub(super) catalog: Option<Arc<dyn StageCatalog>>,
    pub(super) shutdown_signal: watch::Receiver<()>,

    pub(super) node: Option<Node>,
}

impl NodeBuilder {
    /// Loads configuration from the default sources, then `config_path` if
    /// given, and validates it.
    pub fn new(
        config_path: Option<&str>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Result<Self> {
        let mut config = SyncNodeConfig::new()?;
        if let Some(p) = config_path {
            info!("with_override_config from: {}", &p);
            config = config.with_override_config(p)?;
        }
        Ok(Self::init(config.validate()?, shutdown_signal))
    }

    /// Core initialization logic shared by all construction paths
    pub fn init(
        config: SyncNodeConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            codec: None,
            catalog: None,
            shutdown_signal,
            node: None,
        }
    }

    /// Replaces the structured text codec
    pub fn with_codec(
        mut self,
        codec: Arc<dyn StructuredTextCodec>,
    ) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Replaces the catalog source derived from configuration
    pub fn with_catalog(
        mut self,
        catalog: Arc<dyn StageCatalog>,
    ) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn build(mut self) -> Self {
        metrics::init_metrics();

        let config = Arc::new(self.config.clone());
        let codec = self
            .codec
            .take()
            .unwrap_or_else(|| Arc::new(IniCodec::new()) as Arc<dyn StructuredTextCodec>);
        let catalog = self.catalog.take().or_else(|| catalog_from_config(&config.catalog));
        let suffix = config.watcher.suffix.clone();

        let (connection_tx, connection_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (catalog_tx, catalog_rx) = mpsc::unbounded_channel();
        let (fs_tx, fs_rx) = mpsc::unbounded_channel();

        let node = Node {
            initial_folder: startup_folder(&config),
            engine: SyncEngine::new(codec.clone(), suffix.clone()),
            sessions: SessionRegistry::new(),
            router: ProtocolRouter::new(codec, suffix),
            catalog,
            watcher: None,
            server: None,
            connection_tx,
            connection_rx,
            command_tx,
            command_rx,
            catalog_tx,
            catalog_rx,
            fs_tx,
            fs_rx,
            shutdown_signal: self.shutdown_signal.clone(),
            config,
        };

        self.node = Some(node);
        self
    }

    /// Binds the WebSocket listener on `server.listen_address`.
    ///
    /// # Errors
    /// `SystemError::NodeStartFailed` if called before `build()`,
    /// `SystemError::ServerBind` if the address cannot be bound.
    pub fn start_server(mut self) -> Result<Self> {
        let node = self.node.as_mut().ok_or_else(|| {
            SystemError::NodeStartFailed("start_server called before build".to_string())
        })?;
        let server = ConnectionServer::start(
            self.config.server.listen_address,
            self.config.monitoring.metrics_enabled,
            node.connection_tx.clone(),
            self.shutdown_signal.clone(),
        )?;
        node.server = Some(server);
        Ok(self)
    }

    /// Returns the built node instance after successful construction.
    ///
    /// # Errors
    /// Returns `SystemError::NodeStartFailed` if build hasn't completed
    pub fn ready(self) -> Result<Node> {
        self.node
            .ok_or_else(|| SystemError::NodeStartFailed("check node ready failed".to_string()).into())
    }
}

/// A configured `paths.game_root` wins over the folder persisted in the host
/// state file.
fn startup_folder(config: &SyncNodeConfig) -> Option<PathBuf> {
    if let Some(root) = config.paths.configured_game_root() {
        return Some(root);
    }
    match HostState::load_or_create(&config.paths.state_file) {
        Ok(state) => state.folder_path,
        Err(e) => {
            warn!("host state unreadable, starting without a folder: {}", e);
            None
        }
    }
}
