use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::ConnectionId;
use crate::SessionRegistry;
use crate::StageRecord;
use crate::SyncNodeConfig;

pub const STAGE1_INI: &str = "[PACENOTES]\ncount=1\n\n[P0]\ntype=1\ndistance=50\nflag=0\n";

pub fn stage(
    stage_id: u32,
    name: &str,
) -> StageRecord {
    StageRecord {
        stage_id,
        name: name.to_string(),
        length_meters: None,
        surface: String::new(),
        author: String::new(),
        country: String::new(),
    }
}

/// Writes `text` at `root/relative`, creating parent directories.
pub fn write_file(
    root: &Path,
    relative: &str,
    text: &str,
) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, text).unwrap();
    path
}

pub fn open_connection(
    sessions: &mut SessionRegistry,
    id: ConnectionId,
) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    sessions.open(id, tx);
    rx
}

/// Drains every queued frame, decoded as JSON.
pub fn drain_frames(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(text) = rx.try_recv() {
        frames.push(serde_json::from_str(&text).unwrap());
    }
    frames
}

/// Configuration confined to `dir`: state file inside it, ephemeral port, no
/// catalog source.
pub fn node_config(dir: &Path) -> SyncNodeConfig {
    let mut config = SyncNodeConfig::default();
    config.server.listen_address = "127.0.0.1:0".parse().unwrap();
    config.paths.state_file = dir.join("state.json");
    config.paths.log_dir = dir.join("logs");
    config
}
