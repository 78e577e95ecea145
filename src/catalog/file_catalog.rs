use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::sanitize_records;
use super::CatalogEntry;
use super::StageCatalog;
use super::StageRecord;
use crate::utils::file_io::overwrite_file;
use crate::FileAccessError;
use crate::ParseError;
use crate::Result;

/// Stage list stored as a JSON array on disk.
#[derive(Debug, Clone)]
pub struct FileStageCatalog {
    path: PathBuf,
}

impl FileStageCatalog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn store(
        &self,
        records: &[StageRecord],
    ) -> Result<()> {
        let text = serde_json::to_vec_pretty(records).map_err(ParseError::Json)?;
        overwrite_file(&self.path, &text).await?;
        debug!("stage catalog cached at {:?}", self.path);
        Ok(())
    }
}

#[async_trait]
impl StageCatalog for FileStageCatalog {
    async fn load(&self) -> Result<Vec<StageRecord>> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                FileAccessError::NotFound(self.path.clone())
            } else {
                FileAccessError::Read {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&text).map_err(ParseError::Json)?;
        Ok(sanitize_records(entries))
    }
}
