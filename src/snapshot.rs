// src/snapshot.rs
//! The published snapshot: what `/` and `/items.json` serve.
//!
//! Readers clone an `Arc` and never see a half-written list. The store itself does
//! not serialize writers; `Collector` does that around compute + publish.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

use crate::collect::CycleReport;
use crate::ingest::types::{CanonicalItem, SourceFailure};

/// Served / persisted form: `{"updated": "...", "items": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub updated: Option<String>,
    #[serde(default)]
    pub items: Vec<CanonicalItem>,
}

/// Snapshot plus bookkeeping that is never persisted.
#[derive(Debug, Clone, Default)]
pub struct Published {
    /// 0 until the first publish in this process (a snapshot loaded from disk is still 0).
    pub version: u64,
    pub snapshot: Snapshot,
    /// Sources that failed in the most recent cycle, published or not.
    pub failures: Vec<SourceFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { version: u64, count: usize },
    /// The cycle's result was dropped and the previous snapshot kept.
    Retained { version: u64, reason: &'static str },
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }

    pub fn version(&self) -> u64 {
        match self {
            PublishOutcome::Published { version, .. } | PublishOutcome::Retained { version, .. } => {
                *version
            }
        }
    }
}

pub fn format_updated(now: chrono::DateTime<chrono::Utc>) -> String {
    now.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<Published>>,
    path: Option<PathBuf>,
}

impl SnapshotStore {
    pub fn in_memory() -> Self {
        Self {
            current: RwLock::new(Arc::new(Published::default())),
            path: None,
        }
    }

    /// Store backed by a JSON file. An existing, valid file seeds the store; a corrupt
    /// one is logged and ignored (it gets overwritten on the next publish).
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let snapshot = match load_snapshot(&path) {
            Ok(Some(s)) => {
                info!(path = %path.display(), items = s.items.len(), "loaded snapshot");
                s
            }
            Ok(None) => Snapshot::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "ignoring unreadable snapshot");
                Snapshot::default()
            }
        };
        Self {
            current: RwLock::new(Arc::new(Published {
                snapshot,
                ..Default::default()
            })),
            path: Some(path),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn current(&self) -> Arc<Published> {
        match self.current.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn swap(&self, next: Published) {
        let next = Arc::new(next);
        match self.current.write() {
            Ok(mut g) => *g = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Replace the snapshot with the cycle's items, unless the cycle would blank out
    /// a feed that currently has content. Persists after the in-memory swap; a write
    /// error is returned but the new snapshot stays live (see `persist`).
    pub fn publish(&self, report: CycleReport) -> Result<PublishOutcome> {
        self.publish_at(report, chrono::Utc::now())
    }

    pub fn publish_at(
        &self,
        report: CycleReport,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<PublishOutcome> {
        let prev = self.current();

        let retain_reason = if report.all_sources_failed() {
            Some("all sources failed")
        } else if report.items.is_empty() && !prev.snapshot.items.is_empty() {
            Some("cycle produced no items")
        } else {
            None
        };

        if let Some(reason) = retain_reason {
            warn!(
                target: "collect",
                reason,
                version = prev.version,
                "keeping previous snapshot"
            );
            self.swap(Published {
                version: prev.version,
                snapshot: prev.snapshot.clone(),
                failures: report.failures,
            });
            return Ok(PublishOutcome::Retained {
                version: prev.version,
                reason,
            });
        }

        let version = prev.version + 1;
        let count = report.items.len();
        self.swap(Published {
            version,
            snapshot: Snapshot {
                updated: Some(format_updated(now)),
                items: report.items,
            },
            failures: report.failures,
        });

        self.persist()
            .with_context(|| format!("snapshot v{version} is live but was not saved"))?;
        Ok(PublishOutcome::Published { version, count })
    }

    /// Write the current snapshot to disk (temp file + rename). No-op for in-memory stores.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let cur = self.current();
        let body = serde_json::to_vec_pretty(&cur.snapshot).context("serializing snapshot")?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))?;
        Ok(())
    }
}

fn load_snapshot(path: &Path) -> Result<Option<Snapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let snap: Snapshot = serde_json::from_str(&content).context("parsing snapshot json")?;
    Ok(Some(snap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(link: &str) -> CanonicalItem {
        CanonicalItem {
            source: "S".into(),
            source_url: "https://s.example/rss".into(),
            title: format!("Gamecocks {link}"),
            link: link.into(),
            summary: String::new(),
            published: String::new(),
            published_ts: None,
        }
    }

    fn report(items: Vec<CanonicalItem>, sources: usize, failed: usize) -> CycleReport {
        CycleReport {
            items,
            sources,
            failures: (0..failed)
                .map(|i| SourceFailure {
                    source: format!("src{i}"),
                    url: String::new(),
                    error: "timeout".into(),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_store_serves_null_updated() {
        let s = SnapshotStore::in_memory();
        let cur = s.current();
        assert_eq!(cur.version, 0);
        let json = serde_json::to_string(&cur.snapshot).unwrap();
        assert_eq!(json, r#"{"updated":null,"items":[]}"#);
    }

    #[test]
    fn publish_bumps_version_and_stamps_time() {
        let s = SnapshotStore::in_memory();
        let now = chrono::Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap();
        let out = s.publish_at(report(vec![item("a")], 2, 1), now).unwrap();
        assert_eq!(out, PublishOutcome::Published { version: 1, count: 1 });
        let cur = s.current();
        assert_eq!(cur.snapshot.updated.as_deref(), Some("2025-09-01 12:00:00 UTC"));
        assert_eq!(cur.failures.len(), 1);
    }

    #[test]
    fn total_failure_keeps_previous() {
        let s = SnapshotStore::in_memory();
        s.publish(report(vec![item("a")], 2, 0)).unwrap();
        let out = s.publish(report(vec![], 2, 2)).unwrap();
        assert!(!out.is_published());
        assert_eq!(out.version(), 1);
        let cur = s.current();
        assert_eq!(cur.snapshot.items.len(), 1);
        assert_eq!(cur.failures.len(), 2);
    }

    #[test]
    fn empty_cycle_does_not_blank_content() {
        let s = SnapshotStore::in_memory();
        s.publish(report(vec![item("a")], 1, 0)).unwrap();
        let out = s.publish(report(vec![], 1, 0)).unwrap();
        assert_eq!(
            out,
            PublishOutcome::Retained {
                version: 1,
                reason: "cycle produced no items"
            }
        );
    }

    #[test]
    fn first_run_may_publish_empty() {
        let s = SnapshotStore::in_memory();
        let out = s.publish(report(vec![], 1, 0)).unwrap();
        assert!(out.is_published());
        assert!(s.current().snapshot.updated.is_some());
    }
}
