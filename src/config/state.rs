use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::utils::file_io::create_parent_dir_if_not_exist;
use crate::FileAccessError;
use crate::ParseError;
use crate::Result;

/// State persisted between runs: the game folder picked by the user.
///
/// Stored as `{ "folderPath": "<path>" }`, or `null` until a folder is chosen.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct HostState {
    #[serde(rename = "folderPath", default)]
    pub folder_path: Option<PathBuf>,
}

impl HostState {
    /// Reads the state file, writing a default one first if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let state = HostState::default();
            state.save(path)?;
            info!("state file created with default settings: {}", path.display());
            return Ok(state);
        }

        let text = std::fs::read_to_string(path).map_err(|source| FileAccessError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let state: HostState = serde_json::from_str(&text).map_err(ParseError::Json)?;
        Ok(state)
    }

    pub fn save(
        &self,
        path: &Path,
    ) -> Result<()> {
        create_parent_dir_if_not_exist(path)?;
        let text = serde_json::to_string_pretty(self).map_err(ParseError::Json)?;
        std::fs::write(path, text).map_err(|source| FileAccessError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}
