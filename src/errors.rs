//! Pacenote Sync Error Hierarchy
//!
//! Defines the error types of the sync service, categorized by the layer that
//! produces them. None of these is fatal to the process: callers log them and
//! degrade to "this file/device/request is not serviced this cycle".

use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

use crate::ConnectionId;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (watcher, server bind, background tasks)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Annotation or auxiliary file could not be read or written
    #[error(transparent)]
    FileAccess(#[from] FileAccessError),

    /// Malformed structured text
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Stage catalog fetch failed or timed out
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Inbound frame could not be decoded, or outbound frame encoded
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Race statistics lookup failures
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Connection/device bookkeeping failures
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    #[error("Failed to bind server: {0}")]
    ServerBind(String),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    #[error("{0}")]
    SignalSenderClosed(String),

    #[error("Node start failed: {0}")]
    NodeStartFailed(String),

    #[error("Node event loop has stopped")]
    NodeStopped,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum FileAccessError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Path does not exist: {0}")]
    NotFound(PathBuf),

    /// Path escapes its root or names no file
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("No pacenote folder has been configured")]
    FolderNotConfigured,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Unterminated section header at line {line}: {content}")]
    MalformedSection { line: usize, content: String },

    #[error("Entry without key at line {line}")]
    MissingKey { line: usize },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Stage catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Stage catalog fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Stage catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Frame is valid JSON but matches no known request shape
    #[error("Unknown message: {0}")]
    UnknownMessage(String),

    #[error("Malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Known request tag whose fields do not fit the request
    #[error("Invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode outbound frame: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Race statistics database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Car slot {slot} not found in roster")]
    UnknownSlot { slot: u32 },

    #[error("Car slot {slot} has no RSFCarID")]
    MissingCarId { slot: u32 },

    #[error("Race statistics database not opened")]
    NotOpened,

    #[error("Race statistics query task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    #[error("Device {0} has no live connection")]
    UnknownDevice(String),
}

// ============== Conversion Implementations ============== //
impl From<notify::Error> for Error {
    fn from(e: notify::Error) -> Self {
        Error::System(SystemError::Watcher(e))
    }
}

impl From<JoinError> for Error {
    fn from(e: JoinError) -> Self {
        Error::System(SystemError::TaskFailed(e))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Store(StoreError::Sqlite(e))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Catalog(CatalogError::Http(e))
    }
}
