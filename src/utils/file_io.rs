use std::fs::create_dir_all;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::error;

use crate::FileAccessError;
use crate::Result;
use crate::SystemError;

pub fn create_parent_dir_if_not_exist(path: &Path) -> Result<()> {
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            if let Err(e) = create_dir_all(parent_dir) {
                error!("Failed to create directory {:?}: {:?}", parent_dir, e);
                return Err(SystemError::Io(e).into());
            }
        }
    }
    Ok(())
}

pub fn open_file_for_append(path: PathBuf) -> Result<File> {
    create_parent_dir_if_not_exist(&path)?;
    let log_file = match OpenOptions::new().append(true).create(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            return Err(SystemError::Io(e).into());
        }
    };
    Ok(log_file)
}

/// Replaces the whole content of `path`, creating parent directories first.
pub(crate) async fn overwrite_file(
    path: &Path,
    contents: &[u8],
) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|source| FileAccessError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    tokio::fs::write(path, contents).await.map_err(|source| FileAccessError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("wrote {} bytes into {:?}", contents.len(), path);
    Ok(())
}

/// Resolves `.` and `..` components without touching the file system.
pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Returns `path` relative to `root`, or `None` when it lies outside it.
pub(crate) fn relative_within(
    root: &Path,
    path: &Path,
) -> Option<PathBuf> {
    let root = normalize_lexically(root);
    let path = normalize_lexically(path);
    path.strip_prefix(&root).ok().map(Path::to_path_buf)
}

/// Accepts a single user-supplied file or folder name. Separators, parent
/// references and empty names are rejected.
pub(crate) fn sanitize_component(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains('\0')
    {
        return Err(FileAccessError::InvalidPath(name.to_string()).into());
    }
    Ok(trimmed.to_string())
}

/// Joins with '/' regardless of platform, for paths sent over the wire.
pub(crate) fn to_wire_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
