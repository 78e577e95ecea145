use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use pacenote_sync::routes;
use pacenote_sync::ConnectionEvent;
use pacenote_sync::NodeBuilder;
use pacenote_sync::NodeHandle;
use pacenote_sync::Result;
use pacenote_sync::SyncNodeConfig;
use serde_json::Value;
use tempfile::tempdir;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use warp::test::WsClient;

pub const PACENOTE_DIR: &str = "Plugins/NGPCarMenu/MyPacenotes";
pub const RACE_STATS_DB: &str = "Plugins/NGPCarMenu/RaceStat/raceStatDB.sqlite3";
pub const CAR_ROSTER: &str = "Cars/Cars.ini";
pub const CODRIVER_PACKAGES_DIR: &str = "Plugins/Pacenote/config/pacenotes/packages";
pub const LABEL_OVERRIDE_FILE: &str = "Plugins/Pacenote/config/pacenotes/PacenoteLabels.ini";

pub const STAGE1_INI: &str = "[PACENOTES]\ncount=1\n\n[P0]\ntype=1\ndistance=50\nflag=0\n";

/// Scraper layout, `Length` in kilometres.
pub const CATALOG_JSON: &str = r#"[
    {"StageId": 7, "StageName": "Kakaristo", "Length": 10.5, "Surface": "gravel", "Author": "", "Country": "FI"},
    {"StageId": 9, "StageName": "Harwood Forest", "Length": 3.2, "Surface": "gravel", "Author": "", "Country": "UK"}
]"#;

pub const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestContext {
    pub game_root: TempDir,
    pub state_dir: TempDir,
    pub handle: NodeHandle,
    connections: mpsc::UnboundedSender<ConnectionEvent>,
    shutdown_tx: watch::Sender<()>,
    task: JoinHandle<Result<()>>,
}

impl TestContext {
    pub fn pacenote_root(&self) -> PathBuf {
        self.game_root.path().join(PACENOTE_DIR)
    }

    pub fn game_path(
        &self,
        relative: &str,
    ) -> PathBuf {
        self.game_root.path().join(relative)
    }

    /// Opens a WebSocket session against the node through its routes.
    pub async fn connect(&self) -> WsClient {
        warp::test::ws()
            .path("/")
            .handshake(routes(self.connections.clone(), false))
            .await
            .expect("handshake")
    }

    pub async fn shutdown(self) {
        self.shutdown_tx.send(()).unwrap();
        tokio::time::timeout(FRAME_TIMEOUT, self.task)
            .await
            .expect("node stops in time")
            .unwrap()
            .unwrap();
    }
}

pub fn write_file(
    root: &Path,
    relative: &str,
    text: &str,
) -> PathBuf {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, text).unwrap();
    path
}

/// Starts a node on a fresh game folder. `prepare` populates the folder
/// before the node binds it.
pub fn start_node(prepare: impl FnOnce(&Path)) -> TestContext {
    let game_root = tempdir().unwrap();
    let state_dir = tempdir().unwrap();
    std::fs::create_dir_all(game_root.path().join(PACENOTE_DIR)).unwrap();
    prepare(game_root.path());

    let catalog_file = write_file(state_dir.path(), "stages.json", CATALOG_JSON);
    let mut config = SyncNodeConfig::default();
    config.server.listen_address = "127.0.0.1:0".parse().unwrap();
    config.paths.state_file = state_dir.path().join("state.json");
    config.paths.log_dir = state_dir.path().join("logs");
    config.paths.game_root = game_root.path().display().to_string();
    config.catalog.cache_file = catalog_file;

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let node = NodeBuilder::init(config, shutdown_rx).build().ready().unwrap();
    let handle = node.handle();
    let connections = node.connection_sender();
    let task = tokio::spawn(node.run());

    TestContext {
        game_root,
        state_dir,
        handle,
        connections,
        shutdown_tx,
        task,
    }
}

pub async fn recv_json(client: &mut WsClient) -> Value {
    let message = tokio::time::timeout(FRAME_TIMEOUT, client.recv())
        .await
        .expect("frame in time")
        .expect("connection open");
    serde_json::from_str(message.to_str().expect("text frame")).unwrap()
}

pub async fn assert_quiet(client: &mut WsClient) {
    let extra = tokio::time::timeout(Duration::from_millis(300), client.recv()).await;
    assert!(extra.is_err(), "unexpected frame: {:?}", extra);
}

/// Sends `text`, then waits for the reply of a request that always answers,
/// so `text` is known to be applied. Returns the other frames received
/// meanwhile.
pub async fn send_and_sync(
    client: &mut WsClient,
    text: &str,
) -> Vec<Value> {
    client.send_text(text).await;
    client
        .send_text(r#"{"type":"getStageTimes","stageId":0,"slotId":0}"#)
        .await;
    let mut others = Vec::new();
    loop {
        let frame = recv_json(client).await;
        if frame["type"] == "stageTimes" {
            return others;
        }
        others.push(frame);
    }
}

/// Receives frames until one satisfies `accept`. A single save may surface
/// as several watcher notifications, some of them seeing partial content.
pub async fn recv_until(
    client: &mut WsClient,
    accept: impl Fn(&Value) -> bool,
) -> Value {
    loop {
        let frame = recv_json(client).await;
        if accept(&frame) {
            return frame;
        }
    }
}
