use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use super::AnnotationFile;
use super::Fingerprint;
use crate::DeviceId;

/// Per-device record of what was pushed since the device's last full resync.
///
/// A file counts as delivered only with the fingerprint that was sent, so a
/// changed or recreated file is offered again.
#[derive(Debug, Default)]
pub struct DeliveryTracker {
    delivered: HashMap<DeviceId, HashMap<PathBuf, Fingerprint>>,
}

impl DeliveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn needs_delivery(
        &self,
        device: &DeviceId,
        file: &AnnotationFile,
    ) -> bool {
        match self.delivered.get(device).and_then(|files| files.get(&file.absolute_path)) {
            Some(fingerprint) => *fingerprint != file.fingerprint,
            None => true,
        }
    }

    pub fn mark_delivered(
        &mut self,
        device: &DeviceId,
        file: &AnnotationFile,
    ) {
        self.delivered
            .entry(device.clone())
            .or_default()
            .insert(file.absolute_path.clone(), file.fingerprint);
    }

    /// Starts a new delivery epoch for `device`.
    pub fn reset_for_full_resync(
        &mut self,
        device: &DeviceId,
    ) {
        if let Some(files) = self.delivered.get_mut(device) {
            debug!("forgetting {} deliveries to {}", files.len(), device);
            files.clear();
        }
    }

    pub fn delivered_count(
        &self,
        device: &DeviceId,
    ) -> usize {
        self.delivered.get(device).map(HashMap::len).unwrap_or(0)
    }
}

/// Annotation files seen this run, keyed by absolute path.
#[derive(Debug, Default)]
pub struct ObservedFiles {
    files: BTreeMap<PathBuf, AnnotationFile>,
}

impl ObservedFiles {
    pub fn insert(
        &mut self,
        file: AnnotationFile,
    ) {
        self.files.insert(file.absolute_path.clone(), file);
    }

    pub fn get(
        &self,
        path: &Path,
    ) -> Option<&AnnotationFile> {
        self.files.get(path)
    }

    /// Drops `path` and, when it names a directory, everything below it.
    /// Returns the number of files dropped.
    pub fn remove_below(
        &mut self,
        path: &Path,
    ) -> usize {
        let before = self.files.len();
        self.files.retain(|observed, _| !observed.starts_with(path));
        before - self.files.len()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Files grouped by stage folder, folders in name order
    pub fn by_stage_folder(&self) -> BTreeMap<&str, Vec<&AnnotationFile>> {
        let mut folders: BTreeMap<&str, Vec<&AnnotationFile>> = BTreeMap::new();
        for file in self.files.values() {
            folders.entry(file.stage_folder.as_str()).or_default().push(file);
        }
        folders
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotationFile> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
