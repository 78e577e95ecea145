use crate::common::recv_json;
use crate::common::recv_until;
use crate::common::send_and_sync;
use crate::common::start_node;
use crate::common::write_file;
use crate::common::STAGE1_INI;

#[tokio::test]
async fn test_new_file_reaches_every_registered_device() {
    crate::enable_logger();
    let ctx = start_node(|_| {});

    let mut phone = ctx.connect().await;
    let mut tablet = ctx.connect().await;
    send_and_sync(&mut phone, r#"{"deviceId":"phone"}"#).await;
    send_and_sync(&mut tablet, r#"{"deviceId":"tablet"}"#).await;

    write_file(&ctx.pacenote_root(), "Kakaristo/stage1.ini", STAGE1_INI);

    for client in [&mut phone, &mut tablet] {
        let frame = recv_json(client).await;
        assert_eq!(frame["type"], "file-content");
        assert_eq!(frame["path"], "Kakaristo/stage1.ini");
        assert_eq!(frame["stageInfo"]["stageId"], 7);
    }

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_edited_file_is_delivered_again() {
    crate::enable_logger();
    let ctx = start_node(|_| {});
    let mut client = ctx.connect().await;
    send_and_sync(&mut client, r#"{"deviceId":"X"}"#).await;

    let path = write_file(&ctx.pacenote_root(), "Kakaristo/stage1.ini", STAGE1_INI);
    recv_until(&mut client, |f| f["data"]["PACENOTES"]["count"] == "1").await;

    std::fs::write(&path, "[PACENOTES]\ncount=0\n").unwrap();
    let frame = recv_until(&mut client, |f| f["data"]["PACENOTES"]["count"] == "0").await;
    assert_eq!(frame["path"], "Kakaristo/stage1.ini");

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_removed_then_recreated_file_is_redelivered() {
    crate::enable_logger();
    let ctx = start_node(|_| {});
    let mut client = ctx.connect().await;
    send_and_sync(&mut client, r#"{"deviceId":"X"}"#).await;

    let path = write_file(&ctx.pacenote_root(), "Kakaristo/stage1.ini", STAGE1_INI);
    recv_until(&mut client, |f| f["data"]["PACENOTES"]["count"] == "1").await;

    std::fs::remove_file(&path).unwrap();
    write_file(&ctx.pacenote_root(), "Kakaristo/stage1.ini", "[PACENOTES]\ncount=0\n");
    let frame = recv_until(&mut client, |f| f["data"]["PACENOTES"]["count"] == "0").await;
    assert_eq!(frame["path"], "Kakaristo/stage1.ini");

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_dropped_file_relayed_to_requester() {
    crate::enable_logger();
    let ctx = start_node(|_| {});
    let dropped = write_file(ctx.state_dir.path(), "desktop/notes.ini", "[PACENOTES]\ncount=2\n");

    let mut client = ctx.connect().await;
    send_and_sync(&mut client, r#"{"command":"show-drag-area"}"#).await;
    ctx.handle.file_dropped(dropped).unwrap();

    let frame = recv_json(&mut client).await;
    assert_eq!(frame["type"], "file-content");
    assert_eq!(frame["content"], "[PACENOTES]\ncount=2\n");

    ctx.shutdown().await;
}
