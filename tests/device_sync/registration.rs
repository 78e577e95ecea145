use crate::common::assert_quiet;
use crate::common::recv_json;
use crate::common::send_and_sync;
use crate::common::start_node;
use crate::common::write_file;
use crate::common::PACENOTE_DIR;
use crate::common::STAGE1_INI;

/// Folder "Kakaristo" holding stage1.ini, catalog entry {Kakaristo, 7}:
/// registering device "X" yields exactly one file-content frame.
#[tokio::test]
async fn test_registration_pushes_existing_annotation() {
    crate::enable_logger();
    let ctx = start_node(|game_root| {
        write_file(&game_root.join(PACENOTE_DIR), "Kakaristo/stage1.ini", STAGE1_INI);
    });

    let mut client = ctx.connect().await;
    client.send_text(r#"{"deviceId":"X"}"#).await;

    let frame = recv_json(&mut client).await;
    assert_eq!(frame["type"], "file-content");
    assert_eq!(frame["path"], "Kakaristo/stage1.ini");
    assert_eq!(frame["stageInfo"]["stageId"], 7);
    assert_eq!(frame["stageInfo"]["name"], "Kakaristo");
    assert_eq!(frame["stageInfo"]["lengthMeters"], 10500.0);
    assert_eq!(frame["data"]["PACENOTES"]["count"], "1");
    assert_eq!(frame["data"]["P0"]["distance"], "50");
    assert!(frame["date"].as_str().unwrap().ends_with('Z'));
    assert_quiet(&mut client).await;

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_resync_covers_every_resolvable_file() {
    crate::enable_logger();
    let ctx = start_node(|game_root| {
        let root = game_root.join(PACENOTE_DIR);
        write_file(&root, "Kakaristo/stage1.ini", STAGE1_INI);
        write_file(&root, "Kakaristo/stage2.ini", STAGE1_INI);
        write_file(&root, "harwood forest/notes.ini", STAGE1_INI);
        // no catalog entry comes close to this one
        write_file(&root, "Unknown Place/notes.ini", STAGE1_INI);
        write_file(&root, "Kakaristo/readme.txt", "not an annotation");
    });

    let mut client = ctx.connect().await;
    client.send_text(r#"{"deviceId":"X"}"#).await;

    let mut paths = Vec::new();
    for _ in 0..3 {
        let frame = recv_json(&mut client).await;
        assert_eq!(frame["type"], "file-content");
        paths.push(frame["path"].as_str().unwrap().to_string());
    }
    paths.sort();
    assert_eq!(
        paths,
        vec![
            "Kakaristo/stage1.ini",
            "Kakaristo/stage2.ini",
            "harwood forest/notes.ini"
        ]
    );
    assert_quiet(&mut client).await;

    ctx.shutdown().await;
}

/// A second connection registering the same device takes it over and
/// receives a full resync; the first connection gets nothing more.
#[tokio::test]
async fn test_takeover_resyncs_new_connection_only() {
    crate::enable_logger();
    let ctx = start_node(|game_root| {
        write_file(&game_root.join(PACENOTE_DIR), "Kakaristo/stage1.ini", STAGE1_INI);
    });

    let mut first = ctx.connect().await;
    first.send_text(r#"{"deviceId":"X"}"#).await;
    assert_eq!(recv_json(&mut first).await["type"], "file-content");

    let mut second = ctx.connect().await;
    let frames = send_and_sync(&mut second, r#"{"deviceId":"X"}"#).await;
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["path"], "Kakaristo/stage1.ini");
    assert_quiet(&mut first).await;

    ctx.shutdown().await;
}

/// Delivery state survives a disconnect: re-registering resyncs, but an
/// unchanged file is not pushed twice on the same session.
#[tokio::test]
async fn test_reconnect_resyncs_once() {
    crate::enable_logger();
    let ctx = start_node(|game_root| {
        write_file(&game_root.join(PACENOTE_DIR), "Kakaristo/stage1.ini", STAGE1_INI);
    });

    let mut client = ctx.connect().await;
    client.send_text(r#"{"deviceId":"X"}"#).await;
    assert_eq!(recv_json(&mut client).await["type"], "file-content");
    drop(client);

    let mut client = ctx.connect().await;
    let frames = send_and_sync(&mut client, r#"{"deviceId":"X"}"#).await;
    assert_eq!(frames.len(), 1);
    assert_quiet(&mut client).await;

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_unregistered_connection_receives_no_pushes() {
    crate::enable_logger();
    let ctx = start_node(|game_root| {
        write_file(&game_root.join(PACENOTE_DIR), "Kakaristo/stage1.ini", STAGE1_INI);
    });

    let mut client = ctx.connect().await;
    let frames = send_and_sync(&mut client, r#"{"command":"show-drag-area"}"#).await;
    assert!(frames.is_empty());
    assert_quiet(&mut client).await;

    ctx.shutdown().await;
}
