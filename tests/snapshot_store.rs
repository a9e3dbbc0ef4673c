// tests/snapshot_store.rs
// File-backed snapshot: persistence, reload, corrupt files.

use std::fs;

use gamecock_feed::collect::CycleReport;
use gamecock_feed::ingest::types::CanonicalItem;
use gamecock_feed::snapshot::{PublishOutcome, Snapshot, SnapshotStore};

fn item(n: usize) -> CanonicalItem {
    CanonicalItem {
        source: "GABA".into(),
        source_url: "https://www.garnetandblackattack.com/rss/index.xml".into(),
        title: format!("Gamecocks story {n}"),
        link: format!("https://gaba.example/{n}"),
        summary: "summary".into(),
        published: "2025-09-03T14:00:00Z".into(),
        published_ts: Some(1_756_908_000),
    }
}

fn report(n: usize) -> CycleReport {
    CycleReport {
        items: (0..n).map(item).collect(),
        sources: 1,
        ..Default::default()
    }
}

#[test]
fn publish_writes_json_and_reload_serves_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.json");

    let store = SnapshotStore::with_file(&path);
    assert!(store.current().snapshot.items.is_empty());
    let out = store.publish(report(3)).unwrap();
    assert_eq!(out, PublishOutcome::Published { version: 1, count: 3 });

    let on_disk: Snapshot = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk.items.len(), 3);
    assert!(on_disk.updated.is_some());
    assert!(!dir.path().join("items.json.tmp").exists());

    // A new process picks the file back up (version restarts at 0).
    let reopened = SnapshotStore::with_file(&path);
    let cur = reopened.current();
    assert_eq!(cur.version, 0);
    assert_eq!(cur.snapshot.items.len(), 3);
    assert_eq!(cur.snapshot.updated, on_disk.updated);
    assert_eq!(cur.snapshot.items[0].title, "Gamecocks story 0");
}

#[test]
fn retained_cycle_does_not_touch_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.json");
    let store = SnapshotStore::with_file(&path);
    store.publish(report(2)).unwrap();
    let before = fs::read_to_string(&path).unwrap();

    let out = store.publish(report(0)).unwrap();
    assert!(!out.is_published());
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn corrupt_file_is_ignored_then_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.json");
    fs::write(&path, "{ not json").unwrap();

    let store = SnapshotStore::with_file(&path);
    assert!(store.current().snapshot.items.is_empty());
    assert!(store.current().snapshot.updated.is_none());

    store.publish(report(1)).unwrap();
    let on_disk: Snapshot = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk.items.len(), 1);
}

#[test]
fn write_failure_keeps_snapshot_live() {
    let dir = tempfile::tempdir().unwrap();
    // Parent "directory" is a regular file, so create_dir_all fails.
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "x").unwrap();
    let store = SnapshotStore::with_file(blocker.join("items.json"));

    let err = store.publish(report(2)).unwrap_err();
    assert!(format!("{err:#}").contains("not saved"), "{err:#}");
    let cur = store.current();
    assert_eq!(cur.version, 1);
    assert_eq!(cur.snapshot.items.len(), 2);
    assert!(store.persist().is_err());
}

#[test]
fn served_shape_before_first_cycle() {
    let store = SnapshotStore::in_memory();
    let v = serde_json::to_value(&store.current().snapshot).unwrap();
    assert_eq!(v, serde_json::json!({ "updated": null, "items": [] }));
}
