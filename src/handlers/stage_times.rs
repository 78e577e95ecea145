use std::path::Path;

use tracing::debug;
use tracing::warn;

use crate::CarRoster;
use crate::RaceStatsStore;
use crate::Result;
use crate::StageTimeRow;
use crate::StageTimesQuery;
use crate::StoreError;
use crate::StructuredTextCodec;

/// Best recorded time for the queried stage and car slot: zero or one row.
/// Every failure degrades to an empty answer.
pub async fn lookup_stage_times(
    query: StageTimesQuery,
    roster_path: &Path,
    codec: &dyn StructuredTextCodec,
    store: Option<&dyn RaceStatsStore>,
) -> Vec<StageTimeRow> {
    match best_time(query, roster_path, codec, store).await {
        Ok(Some(row)) => vec![row],
        Ok(None) => {
            debug!("no recorded time for {:?}", query);
            Vec::new()
        }
        Err(e) => {
            warn!("stage time lookup for {:?} failed: {}", query, e);
            Vec::new()
        }
    }
}

async fn best_time(
    query: StageTimesQuery,
    roster_path: &Path,
    codec: &dyn StructuredTextCodec,
    store: Option<&dyn RaceStatsStore>,
) -> Result<Option<StageTimeRow>> {
    let store = store.ok_or(StoreError::NotOpened)?;
    let roster = CarRoster::load(roster_path, codec).await?;
    let car_id = roster.car_id(query.slot_id)?;
    store.best_time(query.stage_id, car_id).await
}
