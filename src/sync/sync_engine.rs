use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::AnnotationFile;
use super::DeliveryTracker;
use super::ObservedFiles;
use crate::metrics::FILES_DELIVERED_METRIC;
use crate::utils::file_io::relative_within;
use crate::watcher::has_suffix;
use crate::DeviceId;
use crate::FileAccessError;
use crate::FsEvent;
use crate::NameMatcher;
use crate::Result;
use crate::ServerMessage;
use crate::SessionRegistry;
use crate::StageRecord;
use crate::StructuredTextCodec;

/// Turns file-system changes into per-device `file-content` pushes.
pub struct SyncEngine {
    codec: Arc<dyn StructuredTextCodec>,
    suffix: String,
    root: Option<PathBuf>,
    matcher: NameMatcher,
    tracker: DeliveryTracker,
    observed: ObservedFiles,
}

impl SyncEngine {
    pub fn new(
        codec: Arc<dyn StructuredTextCodec>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            codec,
            suffix: suffix.into(),
            root: None,
            matcher: NameMatcher::default(),
            tracker: DeliveryTracker::new(),
            observed: ObservedFiles::default(),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn matcher(&self) -> &NameMatcher {
        &self.matcher
    }

    pub fn tracker(&self) -> &DeliveryTracker {
        &self.tracker
    }

    pub fn observed(&self) -> &ObservedFiles {
        &self.observed
    }

    /// Switches to a new pacenote root. Files observed under the old root are
    /// forgotten; delivery records are kept.
    pub fn rebind_root(
        &mut self,
        root: PathBuf,
    ) {
        info!("pacenote root is now {:?}", root);
        self.observed.clear();
        self.root = Some(root);
    }

    /// Installs a freshly loaded catalog and offers every observed file again.
    /// Returns the number of frames sent.
    pub fn install_catalog(
        &mut self,
        records: Vec<StageRecord>,
        sessions: &SessionRegistry,
    ) -> usize {
        self.matcher.install(records);
        let devices = sessions.registered_devices();
        if devices.is_empty() || self.observed.is_empty() {
            return 0;
        }

        let paths: Vec<PathBuf> = self.observed.iter().map(|f| f.absolute_path.clone()).collect();
        let sent: usize = paths.iter().map(|path| self.offer(path, &devices, sessions)).sum();
        info!("catalog installed, {} pending files delivered", sent);
        sent
    }

    /// Reacts to one watcher event. Returns the number of frames sent.
    pub async fn handle_fs_event(
        &mut self,
        event: FsEvent,
        sessions: &SessionRegistry,
    ) -> Result<usize> {
        match event {
            FsEvent::Added(path) | FsEvent::Changed(path) => self.on_file_updated(path, sessions).await,
            FsEvent::Removed(path) => {
                let dropped = self.observed.remove_below(&path);
                debug!("{:?} removed, {} observed files dropped", path, dropped);
                Ok(0)
            }
        }
    }

    async fn on_file_updated(
        &mut self,
        path: PathBuf,
        sessions: &SessionRegistry,
    ) -> Result<usize> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => {
                debug!("no pacenote root bound, ignoring {:?}", path);
                return Ok(0);
            }
        };
        if !has_suffix(&path, &self.suffix) {
            trace!("skipping non-annotation file {:?}", path);
            return Ok(0);
        }
        if relative_within(&root, &path).is_none() {
            debug!("skipping {:?} outside {:?}", path, root);
            return Ok(0);
        }

        let file = match AnnotationFile::load(&root, &path, self.codec.as_ref()).await {
            Ok(file) => file,
            Err(e) => {
                // current content is unusable, never replay the stale read
                self.observed.remove_below(&path);
                return Err(e);
            }
        };
        if self.root.as_deref() != Some(root.as_path()) {
            debug!("root changed while reading {:?}, discarding", path);
            return Ok(0);
        }

        self.observed.insert(file);
        let devices = sessions.registered_devices();
        Ok(self.offer(&path, &devices, sessions))
    }

    /// Full resync of one device after (re-)registration. Returns the number
    /// of files pushed.
    pub fn on_device_registered(
        &mut self,
        device: &DeviceId,
        sessions: &SessionRegistry,
    ) -> usize {
        self.tracker.reset_for_full_resync(device);

        let mut sent = 0;
        for (folder, files) in self.observed.by_stage_folder() {
            let stage = match self.matcher.resolve(folder) {
                Some(stage) => stage,
                None => {
                    warn!("stage folder {:?} unresolved, {} files withheld", folder, files.len());
                    continue;
                }
            };
            for file in files {
                if push(&mut self.tracker, device, file, &stage, sessions) {
                    sent += 1;
                }
            }
        }
        info!("full resync of {}: {} files pushed", device, sent);
        sent
    }

    /// Sends the raw text of a file dropped on the host to the connection
    /// that asked for the drag area. Returns false when nobody asked.
    pub async fn relay_dropped_file(
        &self,
        path: &Path,
        sessions: &SessionRegistry,
    ) -> Result<bool> {
        let target = match sessions.drag_target() {
            Some(target) => target,
            None => {
                warn!("file {:?} dropped but no client requested it", path);
                return Ok(false);
            }
        };

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FileAccessError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let frame = ServerMessage::DroppedFile { content }.encode()?;
        sessions.send_to_connection(target, frame)?;
        info!("relayed dropped file {:?} to connection {}", path, target);
        Ok(true)
    }

    /// Offers one observed file to `devices`.
    fn offer(
        &mut self,
        path: &Path,
        devices: &[DeviceId],
        sessions: &SessionRegistry,
    ) -> usize {
        let file = match self.observed.get(path) {
            Some(file) => file,
            None => return 0,
        };
        if devices.is_empty() {
            return 0;
        }
        let stage = match self.matcher.resolve(&file.stage_folder) {
            Some(stage) => stage,
            None => {
                warn!("stage folder {:?} unresolved, withholding {:?}", file.stage_folder, path);
                return 0;
            }
        };

        devices
            .iter()
            .filter(|device| push(&mut self.tracker, device, file, &stage, sessions))
            .count()
    }
}

/// Sends `file` to `device` unless already delivered; records it on success.
fn push(
    tracker: &mut DeliveryTracker,
    device: &DeviceId,
    file: &AnnotationFile,
    stage: &StageRecord,
    sessions: &SessionRegistry,
) -> bool {
    if !tracker.needs_delivery(device, file) {
        trace!("{:?} already delivered to {}", file.relative_path, device);
        return false;
    }

    let message = ServerMessage::FileContent {
        path: file.wire_path(),
        data: file.document.clone(),
        date: file.wire_date(),
        stage_info: stage.clone(),
    };
    let frame = match message.encode() {
        Ok(frame) => frame,
        Err(e) => {
            warn!("failed to encode {:?}: {}", file.relative_path, e);
            return false;
        }
    };
    if let Err(e) = sessions.send_to_device(device, frame) {
        warn!("failed to push {:?} to {}: {}", file.relative_path, device, e);
        return false;
    }

    tracker.mark_delivered(device, file);
    FILES_DELIVERED_METRIC.with_label_values(&[device.as_str()]).inc();
    debug!("pushed {:?} to {}", file.relative_path, device);
    true
}
