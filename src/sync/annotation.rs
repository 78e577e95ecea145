use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;

use crate::utils::file_io::relative_within;
use crate::utils::file_io::to_wire_path;
use crate::FileAccessError;
use crate::IniDocument;
use crate::Result;
use crate::StructuredTextCodec;

/// Content identity of one read of an annotation file.
pub type Fingerprint = blake3::Hash;

/// A parsed annotation file below the pacenote root.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationFile {
    pub absolute_path: PathBuf,
    /// Path below the pacenote root
    pub relative_path: PathBuf,
    pub stage_folder: String,
    pub document: IniDocument,
    pub modified: DateTime<Utc>,
    pub fingerprint: Fingerprint,
}

impl AnnotationFile {
    /// Reads and parses `path`, which must lie strictly below `root`.
    pub async fn load(
        root: &Path,
        path: &Path,
        codec: &dyn StructuredTextCodec,
    ) -> Result<Self> {
        let relative_path = relative_within(root, path)
            .filter(|rel| rel.components().next().is_some())
            .ok_or_else(|| FileAccessError::InvalidPath(path.display().to_string()))?;
        let stage_folder = stage_folder_of(&relative_path)
            .ok_or_else(|| FileAccessError::InvalidPath(path.display().to_string()))?;

        let read_error = |source| FileAccessError::Read {
            path: path.to_path_buf(),
            source,
        };
        let text = tokio::fs::read_to_string(path).await.map_err(read_error)?;
        let modified = tokio::fs::metadata(path)
            .await
            .and_then(|m| m.modified())
            .map_err(read_error)?;

        let document = codec.parse(&text)?;
        Ok(Self {
            absolute_path: path.to_path_buf(),
            relative_path,
            stage_folder,
            document,
            modified: DateTime::<Utc>::from(modified),
            fingerprint: fingerprint(&text, modified),
        })
    }

    pub fn wire_path(&self) -> String {
        to_wire_path(&self.relative_path)
    }

    pub fn wire_date(&self) -> String {
        self.modified.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Stage folder of a path relative to the pacenote root: its first
/// component, or the file stem for a file sitting in the root itself.
pub fn stage_folder_of(relative: &Path) -> Option<String> {
    let mut components = relative.components();
    let first = components.next()?;
    if components.next().is_some() {
        return Some(first.as_os_str().to_string_lossy().into_owned());
    }
    relative
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

pub(crate) fn fingerprint(
    text: &str,
    modified: SystemTime,
) -> Fingerprint {
    let nanos = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut hasher = blake3::Hasher::new();
    hasher.update(text.as_bytes());
    hasher.update(&nanos.to_le_bytes());
    hasher.finalize()
}
