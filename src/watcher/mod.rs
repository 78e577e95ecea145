//! Recursive file-system subscription on the pacenote root.
//!
//! OS notifications are mapped to [`FsEvent`]s and forwarded into an
//! unbounded channel drained by the node event loop. Ordering is only
//! guaranteed per path.

use std::path::Path;
use std::path::PathBuf;

use notify::event::ModifyKind;
use notify::event::RenameMode;
use notify::Config;
use notify::Event;
use notify::EventKind;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use walkdir::WalkDir;

use crate::FileAccessError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FsEvent {
    Added(PathBuf),
    Changed(PathBuf),
    Removed(PathBuf),
}

impl FsEvent {
    pub fn path(&self) -> &Path {
        match self {
            FsEvent::Added(p) | FsEvent::Changed(p) | FsEvent::Removed(p) => p,
        }
    }
}

/// Live subscription; dropping it stops event delivery.
pub struct FileWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("FileWatcher").field("root", &self.root).finish()
    }
}

impl FileWatcher {
    /// Subscribes recursively to `root`. Files not ending in `suffix` are
    /// filtered from add/change notifications as a hint only.
    pub fn start(
        root: &Path,
        suffix: &str,
        event_tx: mpsc::UnboundedSender<FsEvent>,
    ) -> Result<Self> {
        if !root.is_dir() {
            return Err(FileAccessError::NotFound(root.to_path_buf()).into());
        }

        let suffix = suffix.to_string();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for fs_event in map_notify_event(event) {
                        if !passes_suffix_hint(&fs_event, &suffix) {
                            continue;
                        }
                        trace!("fs event: {:?}", fs_event);
                        if event_tx.send(fs_event).is_err() {
                            debug!("fs event receiver dropped");
                            return;
                        }
                    }
                }
                Err(e) => {
                    error!("file watcher error: {}", e);
                }
            },
            Config::default(),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        info!("watching {:?}", root);

        Ok(Self {
            root: root.to_path_buf(),
            _watcher: watcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Emits `Added` for every existing file below `root` whose extension is
/// `suffix`. Returns the number of files reported.
pub async fn initial_scan(
    root: PathBuf,
    suffix: String,
    event_tx: mpsc::UnboundedSender<FsEvent>,
) -> Result<usize> {
    let count = tokio::task::spawn_blocking(move || {
        let mut count = 0;
        for path in files_below(&root) {
            if !has_suffix(&path, &suffix) {
                continue;
            }
            if event_tx.send(FsEvent::Added(path)).is_err() {
                break;
            }
            count += 1;
        }
        count
    })
    .await?;
    debug!("initial scan reported {} files", count);
    Ok(count)
}

/// Maps one notify event to zero or more [`FsEvent`]s.
pub(crate) fn map_notify_event(event: Event) -> Vec<FsEvent> {
    let Event { kind, paths, .. } = event;
    match kind {
        EventKind::Create(_) => paths.into_iter().flat_map(expand_added).collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => paths.into_iter().map(FsEvent::Removed).collect(),
            RenameMode::To => paths.into_iter().flat_map(expand_added).collect(),
            RenameMode::Both if paths.len() >= 2 => {
                let mut paths = paths.into_iter();
                let mut events = Vec::new();
                if let Some(from) = paths.next() {
                    events.push(FsEvent::Removed(from));
                }
                if let Some(to) = paths.next() {
                    events.extend(expand_added(to));
                }
                events
            }
            // Backends that cannot pair rename halves report one side only.
            _ => paths
                .into_iter()
                .flat_map(|p| if p.exists() { expand_added(p) } else { vec![FsEvent::Removed(p)] })
                .collect(),
        },
        EventKind::Modify(_) | EventKind::Any => {
            paths.into_iter().filter(|p| !p.is_dir()).map(FsEvent::Changed).collect()
        }
        EventKind::Remove(_) => paths.into_iter().map(FsEvent::Removed).collect(),
        EventKind::Access(_) | EventKind::Other => Vec::new(),
    }
}

/// A directory appearing at once (moved in) reports its files individually.
fn expand_added(path: PathBuf) -> Vec<FsEvent> {
    if path.is_dir() {
        files_below(&path).map(FsEvent::Added).collect()
    } else {
        vec![FsEvent::Added(path)]
    }
}

fn files_below(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
}

pub(crate) fn has_suffix(
    path: &Path,
    suffix: &str,
) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(suffix))
        .unwrap_or(false)
}

fn passes_suffix_hint(
    event: &FsEvent,
    suffix: &str,
) -> bool {
    match event {
        FsEvent::Added(p) | FsEvent::Changed(p) => has_suffix(p, suffix),
        // removal of a directory must reach the engine
        FsEvent::Removed(_) => true,
    }
}
