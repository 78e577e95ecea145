use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use serde_json::Value;
use tracing::debug;
use tracing::info;

use super::RaceStatsStore;
use super::StageTimeRow;
use crate::FileAccessError;
use crate::Result;
use crate::StoreError;

const BEST_TIME_QUERY: &str = "\
SELECT R.*, M.StageName, C.ModelName
FROM F_RallyResult R
JOIN D_Map M ON M.MapKey = R.MapKey
JOIN D_Car C ON C.CarKey = R.CarKey
WHERE M.MapID = ?1 AND C.ModelID = ?2
ORDER BY R.FinishTime ASC
LIMIT 1";

/// Read-only view of the plugin's race statistics database.
pub struct SqliteRaceStats {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteRaceStats {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SqliteRaceStats").field("path", &self.path).finish()
    }
}

impl SqliteRaceStats {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(FileAccessError::NotFound(path.to_path_buf()).into());
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        info!("race statistics opened at {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RaceStatsStore for SqliteRaceStats {
    async fn best_time(
        &self,
        stage_id: u32,
        car_id: u32,
    ) -> Result<Option<StageTimeRow>> {
        let conn = self.conn.clone();
        let row = tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            query_best_time(&conn, stage_id, car_id)
        })
        .await
        .map_err(StoreError::TaskFailed)??;
        debug!(
            "best time lookup for stage {} car {}: {}",
            stage_id,
            car_id,
            if row.is_some() { "hit" } else { "miss" }
        );
        Ok(row)
    }
}

fn query_best_time(
    conn: &Connection,
    stage_id: u32,
    car_id: u32,
) -> Result<Option<StageTimeRow>> {
    let mut stmt = conn.prepare_cached(BEST_TIME_QUERY)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let row = stmt
        .query_row(rusqlite::params![stage_id, car_id], |row| {
            let mut out = StageTimeRow::new();
            for (index, name) in columns.iter().enumerate() {
                out.insert(name.clone(), to_json(row.get_ref(index)?));
            }
            Ok(out)
        })
        .optional()?;
    Ok(row)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(bytes) => Value::from(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::from(bytes.to_vec()),
    }
}
