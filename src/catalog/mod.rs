//! Stage catalog: canonical stage metadata the local folders are matched to.
mod file_catalog;
mod http_catalog;
pub use file_catalog::*;
pub use http_catalog::*;


use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::CatalogConfig;
use crate::CatalogError;
use crate::Result;

/// Canonical stage metadata, sent to clients as `stageInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub stage_id: u32,
    pub name: String,
    #[serde(default)]
    pub length_meters: Option<f64>,
    #[serde(default)]
    pub surface: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub country: String,
}

/// Record as published by the stage list scraper; `Length` is in kilometres.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScrapedStage {
    #[serde(rename = "StageId")]
    stage_id: u32,
    #[serde(rename = "StageName")]
    stage_name: String,
    #[serde(rename = "Length", default)]
    length: Option<f64>,
    #[serde(rename = "Surface", default)]
    surface: String,
    #[serde(rename = "Author", default)]
    author: String,
    #[serde(rename = "Country", default)]
    country: String,
}

impl From<ScrapedStage> for StageRecord {
    fn from(s: ScrapedStage) -> Self {
        StageRecord {
            stage_id: s.stage_id,
            name: s.stage_name,
            length_meters: s.length.map(|km| (km * 1000.0).round()),
            surface: s.surface,
            author: s.author,
            country: s.country,
        }
    }
}

/// Either record layout may appear in a catalog document.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum CatalogEntry {
    Native(StageRecord),
    Scraped(ScrapedStage),
}

impl From<CatalogEntry> for StageRecord {
    fn from(entry: CatalogEntry) -> Self {
        match entry {
            CatalogEntry::Native(record) => record,
            CatalogEntry::Scraped(scraped) => scraped.into(),
        }
    }
}

/// Drops nameless records and keeps the first record of each stage id.
pub(crate) fn sanitize_records(entries: Vec<CatalogEntry>) -> Vec<StageRecord> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .map(StageRecord::from)
        .filter(|r| !r.name.trim().is_empty())
        .filter(|r| seen.insert(r.stage_id))
        .collect()
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait StageCatalog: Send + Sync + 'static {
    /// Fetches the full stage list.
    async fn load(&self) -> Result<Vec<StageRecord>>;
}

/// Loads `catalog` within `timeout`. Failures and timeouts degrade to an
/// empty catalog, under which nothing resolves.
pub async fn load_with_timeout(
    catalog: Arc<dyn StageCatalog>,
    timeout: Duration,
) -> Vec<StageRecord> {
    match tokio::time::timeout(timeout, catalog.load()).await {
        Ok(Ok(records)) => {
            info!("stage catalog loaded with {} records", records.len());
            records
        }
        Ok(Err(e)) => {
            warn!("stage catalog unavailable: {}", e);
            Vec::new()
        }
        Err(_) => {
            warn!("{}", CatalogError::Timeout(timeout));
            Vec::new()
        }
    }
}

/// Loads `catalog` until it yields at least one record, handing every
/// attempt's result to `sink`. The delay between attempts doubles from
/// `retry_base_delay` up to `retry_max_delay`. Stops early once `sink` closes.
pub async fn load_until_available(
    catalog: Arc<dyn StageCatalog>,
    config: CatalogConfig,
    sink: mpsc::UnboundedSender<Vec<StageRecord>>,
) {
    let timeout = config.fetch_timeout();
    let max_delay = config.retry_max_delay();
    let mut delay = config.retry_base_delay();
    let mut attempt = 1;
    loop {
        let records = load_with_timeout(catalog.clone(), timeout).await;
        let loaded = !records.is_empty();
        if sink.send(records).is_err() {
            debug!("catalog consumer gone after attempt {}", attempt);
            return;
        }
        if loaded {
            return;
        }

        info!("stage catalog empty after attempt {}, retrying in {:?}", attempt, delay);
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(max_delay);
        attempt += 1;
    }
}

/// Builds the catalog source described by `config`, if any.
pub fn catalog_from_config(config: &CatalogConfig) -> Option<Arc<dyn StageCatalog>> {
    let fallback = config.cache_file().map(FileStageCatalog::new);
    if !config.url.is_empty() {
        let catalog = HttpStageCatalog::new(config.url.clone(), config.fetch_timeout())
            .with_cache(fallback);
        return Some(Arc::new(catalog));
    }
    fallback.map(|f| Arc::new(f) as Arc<dyn StageCatalog>)
}
