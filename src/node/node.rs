//! The sync node: one event loop owning every piece of mutable state.
//!
//! ## Key Responsibilities
//! - Tracks connections and device registrations ([`SessionRegistry`])
//! - Feeds watcher events and catalog results into the [`SyncEngine`]
//! - Dispatches client frames through the [`ProtocolRouter`]
//! - Applies host commands sent through a [`NodeHandle`]
//!
//! Reactions run one at a time, in priority order: shutdown, connection
//! events, host commands, catalog results, file events.
//!
//! ## Example Usage
//! ```ignore
//! let node = NodeBuilder::init(config, shutdown_rx).build().start_server()?.ready()?;
//! let handle = node.handle();
//! tokio::spawn(node.run());
//! handle.set_folder("C:/Richard Burns Rally".into())?;
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::catalog::load_until_available;
use crate::catalog::StageCatalog;
use crate::constants::SERVER_STOP_TIMEOUT;
use crate::network::ConnectionEvent;
use crate::network::ConnectionServer;
use crate::store::SqliteRaceStats;
use crate::watcher::initial_scan;
use crate::watcher::FileWatcher;
use crate::Error;
use crate::FileAccessError;
use crate::FsEvent;
use crate::HostState;
use crate::ProtocolRouter;
use crate::RaceStatsStore;
use crate::Result;
use crate::SessionError;
use crate::SessionRegistry;
use crate::StageRecord;
use crate::SyncEngine;
use crate::SyncNodeConfig;
use crate::SystemError;

/// Requests from the desktop shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// Persist a new game folder and rebind watcher, engine and store to it
    SetFolder(PathBuf),
    /// Relay a file dropped on the host window to the drag-drop requester
    FileDropped(PathBuf),
}

/// Cloneable entry point for host commands.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    command_tx: mpsc::UnboundedSender<HostCommand>,
}

impl NodeHandle {
    pub fn set_folder(
        &self,
        game_root: PathBuf,
    ) -> Result<()> {
        self.send(HostCommand::SetFolder(game_root))
    }

    pub fn file_dropped(
        &self,
        path: PathBuf,
    ) -> Result<()> {
        self.send(HostCommand::FileDropped(path))
    }

    fn send(
        &self,
        command: HostCommand,
    ) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| SystemError::NodeStopped.into())
    }
}

pub struct Node {
    pub(super) config: Arc<SyncNodeConfig>,
    pub(super) engine: SyncEngine,
    pub(super) sessions: SessionRegistry,
    pub(super) router: ProtocolRouter,
    pub(super) catalog: Option<Arc<dyn StageCatalog>>,
    pub(super) initial_folder: Option<PathBuf>,

    pub(super) watcher: Option<FileWatcher>,
    pub(super) server: Option<ConnectionServer>,

    pub(super) connection_tx: mpsc::UnboundedSender<ConnectionEvent>,
    pub(super) connection_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    pub(super) command_tx: mpsc::UnboundedSender<HostCommand>,
    pub(super) command_rx: mpsc::UnboundedReceiver<HostCommand>,
    pub(super) catalog_tx: mpsc::UnboundedSender<Vec<StageRecord>>,
    pub(super) catalog_rx: mpsc::UnboundedReceiver<Vec<StageRecord>>,
    pub(super) fs_tx: mpsc::UnboundedSender<FsEvent>,
    pub(super) fs_rx: mpsc::UnboundedReceiver<FsEvent>,

    pub(super) shutdown_signal: watch::Receiver<()>,
}

impl std::fmt::Debug for Node {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("root", &self.engine.root())
            .field("connections", &self.sessions.connection_count())
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

impl Node {
    pub fn handle(&self) -> NodeHandle {
        NodeHandle {
            command_tx: self.command_tx.clone(),
        }
    }

    /// Feeds connection events into the loop without a listener in between.
    pub fn connection_sender(&self) -> mpsc::UnboundedSender<ConnectionEvent> {
        self.connection_tx.clone()
    }

    /// Address of the WebSocket listener, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|s| s.local_addr())
    }

    pub fn config(&self) -> &SyncNodeConfig {
        &self.config
    }

    pub async fn run(mut self) -> Result<()> {
        // 1. Bind the folder known at startup
        if let Some(game_root) = self.initial_folder.take() {
            if let Err(e) = self.bind_folder(game_root).await {
                error!("binding startup folder failed: {}", e);
            }
        } else {
            info!("no game folder configured yet, waiting for the host");
        }

        // 2. Fetch the stage catalog in the background, retrying while empty
        self.spawn_catalog_fetch();

        // 3. Event loop
        loop {
            tokio::select! {
                biased;
                // P0: shutdown received
                _ = self.shutdown_signal.changed() => {
                    warn!("shutdown signal received.");
                    self.stop_server().await;
                    return Ok(());
                }
                // P1: connection lifecycle and client frames
                Some(event) = self.connection_rx.recv() => {
                    self.handle_connection_event(event).await;
                }
                // P2: host commands
                Some(command) = self.command_rx.recv() => {
                    debug!("receive host command: {:?}", command);
                    if let Err(e) = self.handle_command(command).await {
                        error!("host command failed: {}", e);
                    }
                }
                // P3: catalog fetch finished
                Some(records) = self.catalog_rx.recv() => {
                    let sent = self.engine.install_catalog(records, &self.sessions);
                    debug!("catalog install pushed {} files", sent);
                }
                // P4: file system changes
                Some(event) = self.fs_rx.recv() => {
                    debug!("receive fs event: {:?}", event);
                    if let Err(e) = self.engine.handle_fs_event(event, &self.sessions).await {
                        warn!("fs event not serviced: {}", e);
                    }
                }
            }
        }
    }

    pub(crate) async fn handle_connection_event(
        &mut self,
        event: ConnectionEvent,
    ) {
        match event {
            ConnectionEvent::Opened { id, outbound } => {
                self.sessions.open(id, outbound);
            }
            ConnectionEvent::Frame { id, text } => {
                match self
                    .router
                    .dispatch(id, &text, &mut self.engine, &mut self.sessions)
                    .await
                {
                    Ok(()) => {}
                    Err(Error::Session(SessionError::ConnectionClosed(_))) => {
                        debug!("connection {} closed before its reply", id);
                    }
                    Err(e) => {
                        warn!("request from connection {} not serviced: {}", id, e);
                    }
                }
            }
            ConnectionEvent::Closed { id } => {
                if let Some(device) = self.sessions.close(id) {
                    info!("device {} disconnected", device);
                }
            }
        }
    }

    pub(crate) async fn handle_command(
        &mut self,
        command: HostCommand,
    ) -> Result<()> {
        match command {
            HostCommand::SetFolder(game_root) => {
                let state = HostState {
                    folder_path: Some(game_root.clone()),
                };
                state.save(&self.config.paths.state_file)?;
                self.bind_folder(game_root).await
            }
            HostCommand::FileDropped(path) => {
                self.engine.relay_dropped_file(&path, &self.sessions).await?;
                Ok(())
            }
        }
    }

    /// Points watcher, engine and request handlers at `game_root`.
    pub(crate) async fn bind_folder(
        &mut self,
        game_root: PathBuf,
    ) -> Result<()> {
        if !game_root.is_dir() {
            return Err(FileAccessError::NotFound(game_root).into());
        }
        let paths = self.config.paths.resolve(&game_root);
        info!("binding game folder {:?}", game_root);

        self.watcher = None;
        tokio::fs::create_dir_all(&paths.pacenote_root)
            .await
            .map_err(|source| FileAccessError::Write {
                path: paths.pacenote_root.clone(),
                source,
            })?;
        self.engine.rebind_root(paths.pacenote_root.clone());

        let suffix = self.config.watcher.suffix.clone();
        match FileWatcher::start(&paths.pacenote_root, &suffix, self.fs_tx.clone()) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(e) => error!("watching {:?} failed: {}", paths.pacenote_root, e),
        }
        initial_scan(paths.pacenote_root.clone(), suffix, self.fs_tx.clone()).await?;

        let store = match SqliteRaceStats::open(&paths.race_stats_db) {
            Ok(store) => Some(Arc::new(store) as Arc<dyn RaceStatsStore>),
            Err(e) => {
                warn!("race statistics unavailable: {}", e);
                None
            }
        };
        self.router.bind(paths, store);
        Ok(())
    }

    /// Waits for the listener, which watches the same shutdown signal, to close.
    async fn stop_server(&mut self) {
        let server = match self.server.take() {
            Some(server) => server,
            None => return,
        };
        match tokio::time::timeout(SERVER_STOP_TIMEOUT, server.join()).await {
            Ok(Ok(())) => info!("connection server stopped"),
            Ok(Err(e)) => error!("connection server task failed: {}", e),
            Err(_) => warn!("connection server still running after {:?}", SERVER_STOP_TIMEOUT),
        }
    }

    fn spawn_catalog_fetch(&self) {
        let catalog = match &self.catalog {
            Some(catalog) => catalog.clone(),
            None => {
                warn!("no stage catalog configured, stage folders will not resolve");
                return;
            }
        };
        tokio::spawn(load_until_available(
            catalog,
            self.config.catalog.clone(),
            self.catalog_tx.clone(),
        ));
    }
}
