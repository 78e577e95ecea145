use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::UNIX_EPOCH;

use chrono::DateTime;
use chrono::Utc;

use super::*;
use crate::DeviceId;
use crate::IniDocument;

fn annotation(
    path: &str,
    text: &str,
) -> AnnotationFile {
    let modified = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let relative_path = PathBuf::from(path);
    AnnotationFile {
        absolute_path: Path::new("/pacenotes").join(path),
        stage_folder: stage_folder_of(&relative_path).unwrap(),
        relative_path,
        document: IniDocument::new(),
        modified: DateTime::<Utc>::from(modified),
        fingerprint: fingerprint(text, modified),
    }
}

#[test]
fn test_needs_delivery_until_marked() {
    let mut tracker = DeliveryTracker::new();
    let device = DeviceId::from("tablet");
    let file = annotation("Kakaristo/stage1.ini", "count=1");

    assert!(tracker.needs_delivery(&device, &file));
    tracker.mark_delivered(&device, &file);
    assert!(!tracker.needs_delivery(&device, &file));
    assert_eq!(tracker.delivered_count(&device), 1);
}

#[test]
fn test_changed_content_needs_delivery_again() {
    let mut tracker = DeliveryTracker::new();
    let device = DeviceId::from("tablet");
    tracker.mark_delivered(&device, &annotation("Kakaristo/stage1.ini", "count=1"));

    assert!(tracker.needs_delivery(&device, &annotation("Kakaristo/stage1.ini", "count=2")));
}

#[test]
fn test_devices_are_independent() {
    let mut tracker = DeliveryTracker::new();
    let file = annotation("Kakaristo/stage1.ini", "count=1");
    tracker.mark_delivered(&"a".into(), &file);

    assert!(!tracker.needs_delivery(&"a".into(), &file));
    assert!(tracker.needs_delivery(&"b".into(), &file));
}

#[test]
fn test_reset_for_full_resync_only_touches_one_device() {
    let mut tracker = DeliveryTracker::new();
    let file = annotation("Kakaristo/stage1.ini", "count=1");
    tracker.mark_delivered(&"a".into(), &file);
    tracker.mark_delivered(&"b".into(), &file);

    tracker.reset_for_full_resync(&"a".into());

    assert!(tracker.needs_delivery(&"a".into(), &file));
    assert!(!tracker.needs_delivery(&"b".into(), &file));
    assert_eq!(tracker.delivered_count(&"a".into()), 0);
}

#[test]
fn test_fingerprint_covers_modification_time() {
    let text = "count=1";
    let t1 = UNIX_EPOCH + Duration::from_secs(10);
    let t2 = UNIX_EPOCH + Duration::from_secs(11);

    assert_eq!(fingerprint(text, t1), fingerprint(text, t1));
    assert_ne!(fingerprint(text, t1), fingerprint(text, t2));
}

#[test]
fn test_stage_folder_of() {
    assert_eq!(stage_folder_of(Path::new("Kakaristo/stage1.ini")).as_deref(), Some("Kakaristo"));
    assert_eq!(stage_folder_of(Path::new("Kakaristo/old/stage1.ini")).as_deref(), Some("Kakaristo"));
    assert_eq!(stage_folder_of(Path::new("Harwood.ini")).as_deref(), Some("Harwood"));
    assert_eq!(stage_folder_of(Path::new("")), None);
}

#[test]
fn test_observed_files_remove_below_directory() {
    let mut observed = ObservedFiles::default();
    observed.insert(annotation("Kakaristo/stage1.ini", "a"));
    observed.insert(annotation("Kakaristo/stage2.ini", "b"));
    observed.insert(annotation("KakaristoII/stage1.ini", "c"));

    assert_eq!(observed.remove_below(Path::new("/pacenotes/Kakaristo")), 2);
    assert_eq!(observed.len(), 1);
    assert!(observed
        .get(Path::new("/pacenotes/KakaristoII/stage1.ini"))
        .is_some());
}

#[test]
fn test_observed_files_group_by_stage_folder() {
    let mut observed = ObservedFiles::default();
    observed.insert(annotation("B/x.ini", "1"));
    observed.insert(annotation("A/y.ini", "2"));
    observed.insert(annotation("A/z.ini", "3"));

    let folders = observed.by_stage_folder();
    let summary: Vec<(&str, usize)> = folders.iter().map(|(k, v)| (*k, v.len())).collect();
    assert_eq!(summary, vec![("A", 2), ("B", 1)]);
}
