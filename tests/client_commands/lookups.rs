use std::path::Path;

use rusqlite::Connection;

use crate::common::assert_quiet;
use crate::common::recv_json;
use crate::common::start_node;
use crate::common::write_file;
use crate::common::CAR_ROSTER;
use crate::common::CODRIVER_PACKAGES_DIR;
use crate::common::RACE_STATS_DB;

fn create_race_stats(game_root: &Path) {
    let path = game_root.join(RACE_STATS_DB);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE D_Map (MapKey INTEGER PRIMARY KEY, MapID INTEGER, StageName TEXT);
         CREATE TABLE D_Car (CarKey INTEGER PRIMARY KEY, ModelID INTEGER, ModelName TEXT);
         CREATE TABLE F_RallyResult (RaceDate INTEGER, MapKey INTEGER, CarKey INTEGER, FinishTime REAL);
         INSERT INTO D_Map VALUES (1, 7, 'Kakaristo');
         INSERT INTO D_Car VALUES (10, 42, 'Lancer Evo VI');
         INSERT INTO F_RallyResult VALUES
             (20240101, 1, 10, 241.5),
             (20240102, 1, 10, 238.25);",
    )
    .unwrap();
}

#[tokio::test]
async fn test_stage_times_resolve_car_slot_and_best_result() {
    crate::enable_logger();
    let ctx = start_node(|game_root| {
        create_race_stats(game_root);
        write_file(game_root, CAR_ROSTER, "[Car00]\nRSFCarID=42\n\n[Car01]\nRSFCarID=43\n");
    });
    let mut client = ctx.connect().await;

    client
        .send_text(r#"{"type":"getStageTimes","stageId":7,"slotId":0}"#)
        .await;
    let reply = recv_json(&mut client).await;
    assert_eq!(reply["type"], "stageTimes");
    let rows = reply["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["FinishTime"], 238.25);
    assert_eq!(rows[0]["StageName"], "Kakaristo");

    // slot 1 drives a car with no results on this stage
    client
        .send_text(r#"{"type":"getStageTimes","stageId":"7","slotId":"1"}"#)
        .await;
    let reply = recv_json(&mut client).await;
    assert_eq!(reply["data"], serde_json::json!([]));

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_stage_times_without_database_are_empty() {
    crate::enable_logger();
    let ctx = start_node(|game_root| {
        write_file(game_root, CAR_ROSTER, "[Car00]\nRSFCarID=42\n");
    });
    let mut client = ctx.connect().await;

    client
        .send_text(r#"{"type":"getStageTimes","stageId":7,"slotId":0}"#)
        .await;
    let reply = recv_json(&mut client).await;
    assert_eq!(reply["type"], "stageTimes");
    assert_eq!(reply["data"], serde_json::json!([]));

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_codriver_packages_are_listed_by_group() {
    crate::enable_logger();
    let ctx = start_node(|game_root| {
        let packages = game_root.join(CODRIVER_PACKAGES_DIR);
        write_file(
            &packages,
            "Main.ini",
            "[PACKAGE::Corners]\nfile=corners/left.ini\n\n[PACENOTE::Start]\nid=1\n",
        );
        write_file(&packages, "corners/left.ini", "[PACENOTE::Left1]\nid=10\ncolumn=2\n");
    });
    let mut client = ctx.connect().await;

    client.send_text(r#"{"command":"getCodrivers"}"#).await;
    let reply = recv_json(&mut client).await;
    assert_eq!(reply["type"], "codrivers");

    let corners = reply["data"]["cornerTypes"].as_array().unwrap();
    assert_eq!(corners.len(), 1);
    assert_eq!(corners[0]["name"], "Left1");
    assert_eq!(corners[0]["type"], "Corners");
    assert_eq!(corners[0]["id"], "10");

    let standard = reply["data"]["standardNotes"].as_array().unwrap();
    assert_eq!(standard.len(), 1);
    assert_eq!(standard[0]["name"], "Start");

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_codriver_listing_failure_is_reported() {
    crate::enable_logger();
    let ctx = start_node(|_| {});
    let mut client = ctx.connect().await;

    client.send_text(r#"{"command":"getCodrivers"}"#).await;
    let reply = recv_json(&mut client).await;
    assert_eq!(reply["type"], "codrivers");
    assert!(reply["error"].is_string());
    assert!(reply.get("data").is_none());

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_unknown_and_malformed_frames_keep_connection_open() {
    crate::enable_logger();
    let ctx = start_node(|_| {});
    let mut client = ctx.connect().await;

    client.send_text(r#"{"type":"teleport","to":"finish"}"#).await;
    client.send_text("this is not json").await;
    client.send_text(r#"{"type":"getStageTimes","stageId":[]}"#).await;
    assert_quiet(&mut client).await;

    client
        .send_text(r#"{"type":"getStageTimes","stageId":7,"slotId":0}"#)
        .await;
    assert_eq!(recv_json(&mut client).await["type"], "stageTimes");

    ctx.shutdown().await;
}
