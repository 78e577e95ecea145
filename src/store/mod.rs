//! Historical race results and the car roster they are keyed by.
mod car_roster;
mod sqlite_store;

pub use car_roster::*;
pub use sqlite_store::*;

#[cfg(test)]
mod store_test;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Result;

/// One result row, column name to value.
pub type StageTimeRow = serde_json::Map<String, serde_json::Value>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait RaceStatsStore: Send + Sync + 'static {
    /// Fastest recorded result for `stage_id` driven with `car_id`, if any.
    async fn best_time(
        &self,
        stage_id: u32,
        car_id: u32,
    ) -> Result<Option<StageTimeRow>>;
}
