use crate::common::recv_json;
use crate::common::recv_until;
use crate::common::send_and_sync;
use crate::common::start_node;
use crate::common::LABEL_OVERRIDE_FILE;

const SAVE_REQUEST: &str = r#"{
    "type": "save",
    "pacenotes": [
        {"type": 12, "distance": 110.5, "flag": 0},
        {"type": "LEFT_3", "distance": 240, "flag": 8, "link": 1}
    ],
    "stageInfo": {"name": "Kakaristo notes", "folder": "Kakaristo", "author": "codriver"}
}"#;

#[tokio::test]
async fn test_save_writes_annotation_and_acknowledges() {
    crate::enable_logger();
    let ctx = start_node(|_| {});
    let mut client = ctx.connect().await;

    client.send_text(SAVE_REQUEST).await;
    let reply = recv_json(&mut client).await;
    assert_eq!(reply["type"], "save");
    assert_eq!(reply["status"], "success");

    let text = std::fs::read_to_string(ctx.pacenote_root().join("Kakaristo/Kakaristo notes.ini")).unwrap();
    assert!(text.starts_with("[PACENOTES]\ncount=2\n"));
    assert!(text.contains("[P0]\ntype=12\ndistance=110.5\nflag=0\n"));
    assert!(text.contains("[P1]\ntype=LEFT_3\ndistance=240\nflag=8\nlink=1\n"));

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_replace_overwrites_and_is_pushed_to_devices() {
    crate::enable_logger();
    let ctx = start_node(|_| {});
    let mut device = ctx.connect().await;
    send_and_sync(&mut device, r#"{"deviceId":"X"}"#).await;

    let mut editor = ctx.connect().await;
    editor.send_text(SAVE_REQUEST).await;
    assert_eq!(recv_json(&mut editor).await["status"], "success");

    let replace = SAVE_REQUEST
        .replace(r#""type": "save""#, r#""type": "replace""#)
        .replace(r#"{"type": 12, "distance": 110.5, "flag": 0},"#, "");
    editor.send_text(&replace).await;
    let reply = recv_json(&mut editor).await;
    assert_eq!(reply["type"], "replace");
    assert_eq!(reply["status"], "success");

    let text = std::fs::read_to_string(ctx.pacenote_root().join("Kakaristo/Kakaristo notes.ini")).unwrap();
    assert!(text.starts_with("[PACENOTES]\ncount=1\n"));

    let frame = recv_until(&mut device, |f| f["data"]["PACENOTES"]["count"] == "1").await;
    assert_eq!(frame["path"], "Kakaristo/Kakaristo notes.ini");
    assert_eq!(frame["stageInfo"]["stageId"], 7);

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_save_with_unsafe_name_is_rejected() {
    crate::enable_logger();
    let ctx = start_node(|_| {});
    let mut client = ctx.connect().await;

    let request = SAVE_REQUEST.replace("Kakaristo notes", "../escape");
    client.send_text(&request).await;
    let reply = recv_json(&mut client).await;
    assert_eq!(reply["type"], "save");
    assert_eq!(reply["status"], "error");
    assert!(reply["error"].is_string());
    assert!(!ctx.pacenote_root().join("escape.ini").exists());

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_pacenote_labels_are_written_verbatim() {
    crate::enable_logger();
    let ctx = start_node(|_| {});
    let mut client = ctx.connect().await;

    let labels = "[LABELS]\n12=Hairpin left\n";
    let request = serde_json::json!({"type": "pacenoteLabels", "data": labels});
    client.send_text(request.to_string()).await;

    let reply = recv_json(&mut client).await;
    assert_eq!(reply["type"], "pacenoteLabels");
    assert_eq!(reply["status"], "success");
    assert_eq!(
        std::fs::read_to_string(ctx.game_path(LABEL_OVERRIDE_FILE)).unwrap(),
        labels
    );

    ctx.shutdown().await;
}
