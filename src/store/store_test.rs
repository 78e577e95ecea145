use std::path::Path;

use rusqlite::Connection;
use tempfile::tempdir;

use super::*;
use crate::test_utils::enable_logger;
use crate::test_utils::write_file;
use crate::Error;
use crate::IniCodec;
use crate::StoreError;

fn create_race_stats(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE D_Map (MapKey INTEGER PRIMARY KEY, MapID INTEGER, StageName TEXT);
         CREATE TABLE D_Car (CarKey INTEGER PRIMARY KEY, ModelID INTEGER, ModelName TEXT);
         CREATE TABLE F_RallyResult (
             RaceDate INTEGER, RaceDateTime INTEGER,
             MapKey INTEGER, CarKey INTEGER, FinishTime REAL);
         INSERT INTO D_Map VALUES (1, 7, 'Kakaristo'), (2, 9, 'Harwood Forest');
         INSERT INTO D_Car VALUES (10, 42, 'Lancer Evo VI'), (11, 43, 'Impreza');
         INSERT INTO F_RallyResult VALUES
             (20240101, 1200, 1, 10, 241.5),
             (20240102, 1300, 1, 10, 238.25),
             (20240103, 1400, 1, 11, 200.0),
             (20240104, 1500, 2, 10, 190.0);",
    )
    .unwrap();
}

#[tokio::test]
async fn test_best_time_returns_fastest_matching_row() {
    enable_logger();
    let dir = tempdir().unwrap();
    let db = dir.path().join("raceStatDB.sqlite3");
    create_race_stats(&db);

    let store = SqliteRaceStats::open(&db).unwrap();
    let row = store.best_time(7, 42).await.unwrap().unwrap();

    assert_eq!(row["FinishTime"], 238.25);
    assert_eq!(row["RaceDate"], 20240102);
    assert_eq!(row["StageName"], "Kakaristo");
    assert_eq!(row["ModelName"], "Lancer Evo VI");
}

#[tokio::test]
async fn test_best_time_without_results_is_none() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("raceStatDB.sqlite3");
    create_race_stats(&db);

    let store = SqliteRaceStats::open(&db).unwrap();
    assert_eq!(store.best_time(9, 43).await.unwrap(), None);
}

#[tokio::test]
async fn test_best_time_on_foreign_schema_is_store_error() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("empty.sqlite3");
    Connection::open(&db).unwrap().execute_batch("CREATE TABLE t (x INTEGER);").unwrap();

    let store = SqliteRaceStats::open(&db).unwrap();
    let result = store.best_time(7, 42).await;
    assert!(matches!(result, Err(Error::Store(StoreError::Sqlite(_)))));
}

#[test]
fn test_open_missing_database_fails() {
    let dir = tempdir().unwrap();

    let result = SqliteRaceStats::open(&dir.path().join("missing.sqlite3"));
    assert!(matches!(result, Err(Error::FileAccess(_))));
}

#[tokio::test]
async fn test_car_roster_resolves_slot() {
    let dir = tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "Cars/Cars.ini",
        "[Car00]\nCarName=\"Citroen C4\"\nRSFCarID=118\n\n[Car05]\nRSFCarID = 42\n\n[Car06]\nCarName=broken\n",
    );

    let roster = CarRoster::load(&path, &IniCodec::new()).await.unwrap();
    assert_eq!(roster.car_id(0).unwrap(), 118);
    assert_eq!(roster.car_id(5).unwrap(), 42);
    assert!(matches!(
        roster.car_id(6),
        Err(Error::Store(StoreError::MissingCarId { slot: 6 }))
    ));
    assert!(matches!(
        roster.car_id(7),
        Err(Error::Store(StoreError::UnknownSlot { slot: 7 }))
    ));
}

#[tokio::test]
async fn test_car_roster_missing_file() {
    let dir = tempdir().unwrap();

    let result = CarRoster::load(&dir.path().join("Cars.ini"), &IniCodec::new()).await;
    assert!(matches!(result, Err(Error::FileAccess(_))));
}
