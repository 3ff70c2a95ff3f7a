//! Unit tests for the artifact store
//!
//! File naming, collision handling, the "latest" alias and retention.

use chrono::{TimeZone, Utc};
use netcfg_backup::managers::artifacts::StorageError;
use netcfg_backup::{ArtifactKind, ArtifactStore};
use tempfile::TempDir;

fn store() -> (TempDir, ArtifactStore) {
    let temp = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp.path());
    (temp, store)
}

#[test]
fn test_artifact_naming() {
    let (temp, store) = store();
    let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();

    let running = store
        .persist_at("core-sw-01", ArtifactKind::Running, "hostname core-sw-01\n", at)
        .unwrap();
    let facts = store
        .persist_at("core-sw-01", ArtifactKind::Facts, "{}\n", at)
        .unwrap();

    assert_eq!(
        running.path,
        temp.path().join("core-sw-01/core-sw-01_running_20260314_092653.cfg")
    );
    assert_eq!(
        facts.path,
        temp.path().join("core-sw-01/core-sw-01_facts_20260314_092653.json")
    );
}

#[test]
fn test_same_second_never_overwrites() {
    let (_temp, store) = store();
    let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();

    let first = store.persist_at("r1", ArtifactKind::Running, "one\n", at).unwrap();
    let second = store.persist_at("r1", ArtifactKind::Running, "two\n", at).unwrap();

    assert_ne!(first.path, second.path);
    assert_eq!(std::fs::read_to_string(&first.path).unwrap(), "one\n");
    assert_eq!(std::fs::read_to_string(&second.path).unwrap(), "two\n");
    assert!(second
        .path
        .to_string_lossy()
        .ends_with("r1_running_20260314_092653_01.cfg"));
}

#[test]
fn test_latest_alias_tracks_newest() {
    let (_temp, store) = store();
    let t1 = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
    let t2 = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();

    store.persist_at("r1", ArtifactKind::Running, "old\n", t1).unwrap();
    let newest = store.persist_at("r1", ArtifactKind::Running, "new\n", t2).unwrap();

    let alias = store.latest_alias("r1", ArtifactKind::Running).unwrap();
    assert_eq!(std::fs::read_to_string(&alias).unwrap(), "new\n");
    assert_eq!(
        store.resolve_latest("r1", ArtifactKind::Running),
        Some(newest.path)
    );
}

#[test]
fn test_change_detection() {
    let (_temp, store) = store();
    let t1 = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
    let t2 = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();
    let t3 = Utc.with_ymd_and_hms(2026, 3, 14, 11, 0, 0).unwrap();

    let first = store.persist_at("r1", ArtifactKind::Running, "a\n", t1).unwrap();
    let same = store.persist_at("r1", ArtifactKind::Running, "a\n", t2).unwrap();
    let changed = store.persist_at("r1", ArtifactKind::Running, "b\n", t3).unwrap();

    assert!(!first.changed);
    assert!(!same.changed);
    assert!(changed.changed);
}

#[test]
fn test_prune_keeps_newest() {
    let (_temp, store) = store();
    for hour in 0..5 {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap();
        store
            .persist_at("r1", ArtifactKind::Running, &format!("v{}\n", hour), at)
            .unwrap();
    }

    let removed = store.prune("r1", ArtifactKind::Running, 2).unwrap();
    assert_eq!(removed.len(), 3);

    let remaining = store.list("r1", ArtifactKind::Running).unwrap();
    assert_eq!(remaining.len(), 2);
    assert_eq!(
        store.resolve_latest("r1", ArtifactKind::Running).as_ref(),
        remaining.last()
    );
}

#[test]
fn test_hostname_cannot_escape_root() {
    let (_temp, store) = store();
    for bad in ["", "..", "../etc", "a/b", ".hidden"] {
        let result = store.persist(bad, ArtifactKind::Running, "x");
        assert!(
            matches!(result, Err(StorageError::InvalidHostname(_))),
            "hostname {:?} should be rejected",
            bad
        );
    }
}

#[test]
fn test_report_written_to_root() {
    let (temp, store) = store();
    let path = store
        .write_report(&serde_json::json!({"total": 0}))
        .unwrap();

    assert_eq!(path.parent(), Some(temp.path()));
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("backup_report_"));
    assert!(name.ends_with(".json"));
}
