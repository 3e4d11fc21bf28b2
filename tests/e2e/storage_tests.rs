//! Artifact storage through the coordinator.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::TestHarness;
use std::time::Duration;
use tensorflix_core::CoordinatorEvent;

#[test]
fn test_recently_read_artifact_survives_eviction() {
    let h = TestHarness::setup_with(|config| config.storage.max_size_bytes = 100);

    let a = h.scratch_file("a.mp4", 40);
    let b = h.scratch_file("b.mp4", 40);
    let c = h.scratch_file("c.mp4", 40);

    h.coordinator.store_artifact(&a, None).expect("store a");
    h.coordinator.store_artifact(&b, None).expect("store b");
    assert!(h.coordinator.artifact("a.mp4").is_some());
    h.coordinator.store_artifact(&c, None).expect("store c");

    assert!(h.coordinator.artifact("a.mp4").is_some());
    assert!(h.coordinator.artifact("b.mp4").is_none());
    assert!(h.coordinator.artifact("c.mp4").is_some());
    assert_eq!(h.coordinator.storage().storage_size(), 80);
}

#[test]
fn test_artifact_renamed_on_store() {
    let h = TestHarness::setup();
    let src = h.scratch_file("upload.tmp", 8);

    let stored = h
        .coordinator
        .store_artifact(&src, Some("sub-1.mp4"))
        .expect("store");

    assert!(stored.ends_with("sub-1.mp4"));
    assert!(src.exists());
    assert_eq!(h.coordinator.artifact("sub-1.mp4"), Some(stored));
}

#[test]
fn test_maintenance_removes_stale_and_missing() {
    let h = TestHarness::setup();
    let mut events = h.coordinator.subscribe_events();

    let stale = h.scratch_file("stale.mp4", 10);
    h.coordinator.store_artifact(&stale, None).expect("store");
    h.clock.advance(7200.0);

    let fresh = h.scratch_file("fresh.mp4", 10);
    let vanished = h.scratch_file("vanished.mp4", 10);
    h.coordinator.store_artifact(&fresh, None).expect("store");
    let vanished_path = h.coordinator.store_artifact(&vanished, None).expect("store");
    std::fs::remove_file(vanished_path).expect("remove out of band");

    let report = h
        .coordinator
        .run_maintenance(Duration::from_secs(3600))
        .expect("maintenance");

    assert_eq!(report.removed, vec!["stale.mp4".to_string()]);
    assert_eq!(report.corrupted, vec!["vanished.mp4".to_string()]);
    assert!(h.coordinator.artifact("fresh.mp4").is_some());
    assert_eq!(h.coordinator.storage().len(), 1);

    let corrupted = std::iter::from_fn(|| events.try_recv().ok()).find_map(|e| match e {
        CoordinatorEvent::ArtifactsCorrupted { names } => Some(names),
        _ => None,
    });
    assert_eq!(corrupted, Some(vec!["vanished.mp4".to_string()]));
}

#[test]
fn test_backup_copies_tracked_artifacts() {
    let h = TestHarness::setup();
    for name in ["one.mp4", "two.mp4"] {
        let src = h.scratch_file(name, 16);
        h.coordinator.store_artifact(&src, None).expect("store");
    }

    let dest = tempfile::tempdir().expect("tempdir");
    let copied = h
        .coordinator
        .storage()
        .backup(&dest.path().join("backup"))
        .expect("backup");

    assert_eq!(copied, 2);
    assert!(dest.path().join("backup/one.mp4").is_file());
    assert!(dest.path().join("backup/two.mp4").is_file());
}
