use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::constants::CATEGORY_SECTION_PREFIX;
use crate::constants::PACENOTE_SECTION_PREFIX;
use crate::constants::PACKAGE_SECTION_PREFIX;
use crate::constants::UNKNOWN_PACENOTE_TYPE;
use crate::utils::file_io::normalize_lexically;
use crate::utils::file_io::relative_within;
use crate::watcher::has_suffix;
use crate::FileAccessError;
use crate::Result;
use crate::StructuredTextCodec;

/// One `[PACENOTE::<name>]` entry of a co-driver package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodriverCall {
    pub id: Option<String>,
    pub column: Option<String>,
    pub link: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// File name the entry was declared in
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodriverCatalog {
    pub corner_types: Vec<CodriverCall>,
    pub standard_notes: Vec<CodriverCall>,
}

impl CodriverCatalog {
    fn from_calls(calls: Vec<CodriverCall>) -> Self {
        let (corner_types, standard_notes): (Vec<_>, Vec<_>) = calls
            .into_iter()
            .partition(|call| call.kind.to_ascii_lowercase().contains("corner"));
        Self {
            corner_types,
            standard_notes,
        }
    }

    pub fn len(&self) -> usize {
        self.corner_types.len() + self.standard_notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves every package file directly inside `base_dir` on the blocking pool.
pub async fn list_codrivers(
    base_dir: PathBuf,
    codec: Arc<dyn StructuredTextCodec>,
) -> Result<CodriverCatalog> {
    tokio::task::spawn_blocking(move || resolve_codriver_packages(&base_dir, codec.as_ref())).await?
}

/// One resolution pass. Files referenced from several packages are read once.
pub fn resolve_codriver_packages(
    base_dir: &Path,
    codec: &dyn StructuredTextCodec,
) -> Result<CodriverCatalog> {
    let entries = std::fs::read_dir(base_dir).map_err(|source| FileAccessError::Read {
        path: base_dir.to_path_buf(),
        source,
    })?;
    let mut top_level: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_suffix(path, "ini"))
        .collect();
    top_level.sort();

    let mut visited = HashSet::new();
    let mut calls = Vec::new();
    for path in top_level {
        if let Err(e) = collect_file(&path, base_dir, None, codec, &mut visited, &mut calls) {
            warn!("skipping co-driver package {:?}: {}", path, e);
        }
    }

    let catalog = CodriverCatalog::from_calls(calls);
    debug!("resolved {} co-driver calls from {:?}", catalog.len(), base_dir);
    Ok(catalog)
}

/// Collects the calls of `path` and of every file it references.
/// Nested references resolve before the file's own entries.
fn collect_file(
    path: &Path,
    base_dir: &Path,
    kind: Option<&str>,
    codec: &dyn StructuredTextCodec,
    visited: &mut HashSet<PathBuf>,
    calls: &mut Vec<CodriverCall>,
) -> Result<()> {
    let path = normalize_lexically(path);
    if !visited.insert(path.clone()) {
        return Ok(());
    }

    let text = std::fs::read_to_string(&path).map_err(|source| FileAccessError::Read {
        path: path.clone(),
        source,
    })?;
    let document = codec.parse(&text)?;
    let kind = match kind.filter(|k| *k != UNKNOWN_PACENOTE_TYPE) {
        Some(kind) => kind.to_string(),
        None => kind_from_location(&path, base_dir),
    };

    for (package_kind, section) in document.sections_with_prefix(PACKAGE_SECTION_PREFIX) {
        for (_, reference) in section.entries_with_prefix("file") {
            follow(reference, base_dir, Some(package_kind), codec, visited, calls);
        }
    }
    for (_, section) in document.sections_with_prefix(CATEGORY_SECTION_PREFIX) {
        if let Some(reference) = section.get("file") {
            follow(reference, base_dir, Some(kind.as_str()), codec, visited, calls);
        }
    }

    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    for (name, section) in document.sections_with_prefix(PACENOTE_SECTION_PREFIX) {
        calls.push(CodriverCall {
            id: section.get("id").map(str::to_string),
            column: section.get("column").map(str::to_string),
            link: section.get("link").map(str::to_string),
            name: name.to_string(),
            kind: kind.clone(),
            source: source.clone(),
        });
    }
    Ok(())
}

/// Follows a package reference. Unreadable or escaping references are
/// logged and skipped.
fn follow(
    reference: &str,
    base_dir: &Path,
    kind: Option<&str>,
    codec: &dyn StructuredTextCodec,
    visited: &mut HashSet<PathBuf>,
    calls: &mut Vec<CodriverCall>,
) {
    let reference = reference.trim();
    if reference.is_empty() {
        return;
    }
    let target = base_dir.join(reference.replace('\\', "/"));
    if relative_within(base_dir, &target).is_none() {
        warn!("co-driver reference {:?} leaves {:?}", reference, base_dir);
        return;
    }
    if let Err(e) = collect_file(&target, base_dir, kind, codec, visited, calls) {
        warn!("co-driver reference {:?} unusable: {}", reference, e);
    }
}

/// The first folder below the package root names the call type.
fn kind_from_location(
    path: &Path,
    base_dir: &Path,
) -> String {
    relative_within(base_dir, path)
        .filter(|rel| rel.components().count() > 1)
        .and_then(|rel| {
            rel.components()
                .next()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| UNKNOWN_PACENOTE_TYPE.to_string())
}
