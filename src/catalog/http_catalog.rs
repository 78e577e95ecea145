use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use tracing::warn;

use super::sanitize_records;
use super::CatalogEntry;
use super::FileStageCatalog;
use super::StageCatalog;
use super::StageRecord;
use crate::Result;

/// Stage list served as JSON over HTTP, with an optional on-disk copy used
/// when the endpoint cannot be reached.
pub struct HttpStageCatalog {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    cache: Option<FileStageCatalog>,
}

impl HttpStageCatalog {
    pub fn new(
        url: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            timeout,
            cache: None,
        }
    }

    pub fn with_cache(
        mut self,
        cache: Option<FileStageCatalog>,
    ) -> Self {
        self.cache = cache;
        self
    }

    async fn fetch(&self) -> Result<Vec<StageRecord>> {
        let entries: Vec<CatalogEntry> = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(sanitize_records(entries))
    }
}

#[async_trait]
impl StageCatalog for HttpStageCatalog {
    async fn load(&self) -> Result<Vec<StageRecord>> {
        match self.fetch().await {
            Ok(records) => {
                debug!("fetched {} stages from {}", records.len(), self.url);
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.store(&records).await {
                        warn!("failed to cache stage catalog: {}", e);
                    }
                }
                Ok(records)
            }
            Err(e) => match &self.cache {
                Some(cache) => {
                    warn!("stage catalog fetch failed ({}), using {:?}", e, cache.path());
                    cache.load().await
                }
                None => Err(e),
            },
        }
    }
}
