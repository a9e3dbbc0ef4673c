// src/collect.rs
//! One collection cycle: fetch → normalize → strict tier → dedupe → (fallback) →
//! (safety net) → rank. Plus the `Collector` that serializes cycles and publishes.

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::ingest::types::{CanonicalItem, FeedProvider, FeedSource, SourceFailure};
use crate::ingest::{dedupe, normalize_entry, rank};
use crate::relevance::{item_text, RelevanceEngine, RelevanceHandle, Tier};
use crate::snapshot::{PublishOutcome, SnapshotStore};

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("collect_runs_total", "Collection cycles run.");
        describe_counter!(
            "collect_entries_total",
            "Entries parsed from all sources."
        );
        describe_counter!(
            "collect_source_errors_total",
            "Sources skipped because fetch or parse failed."
        );
        describe_counter!(
            "collect_fallback_applied_total",
            "Cycles where the strict tier came up short and the fallback tier ran."
        );
        describe_counter!(
            "collect_safety_net_applied_total",
            "Cycles that fell through to the safety-net domains."
        );
        describe_gauge!("collect_items_kept", "Items in the last computed snapshot.");
        describe_gauge!("collect_last_run_ts", "Unix ts when a cycle last finished.");
        describe_histogram!("collect_cycle_ms", "Cycle wall time in milliseconds.");
        describe_histogram!("collect_fetch_ms", "Per-source HTTP fetch time in milliseconds.");
    });
}

/// Result of a cycle, before publishing.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Ranked, deduplicated, truncated.
    pub items: Vec<CanonicalItem>,
    pub failures: Vec<SourceFailure>,
    pub sources: usize,
    pub raw: usize,
    pub strict: usize,
    pub fallback_applied: bool,
    pub fallback_added: usize,
    pub safety_net_applied: bool,
    pub safety_added: usize,
}

impl CycleReport {
    /// Every configured source failed (and there was at least one).
    pub fn all_sources_failed(&self) -> bool {
        self.sources > 0 && self.failures.len() >= self.sources
    }
}

/// Merge `extra` after `items`, dedupe, and return the merged list with how many were added.
fn merge(items: Vec<CanonicalItem>, extra: Vec<CanonicalItem>) -> (Vec<CanonicalItem>, usize) {
    let before = items.len();
    let merged = dedupe(items.into_iter().chain(extra).collect());
    let added = merged.len() - before;
    (merged, added)
}

/// Run one cycle against `sources`. Never fails: a source that errors is recorded and skipped.
pub async fn run_cycle(
    sources: &[FeedSource],
    provider: &dyn FeedProvider,
    engine: &RelevanceEngine,
) -> CycleReport {
    ensure_metrics_described();
    let t0 = std::time::Instant::now();

    let mut report = CycleReport {
        sources: sources.len(),
        ..Default::default()
    };
    let mut raw: Vec<CanonicalItem> = Vec::new();
    let mut strict: Vec<CanonicalItem> = Vec::new();

    for src in sources {
        match provider.fetch(src).await {
            Ok(entries) => {
                counter!("collect_entries_total").increment(entries.len() as u64);
                for e in entries {
                    let it = normalize_entry(src, e);
                    if engine.keeps(Tier::Strict, &item_text(&it)) {
                        strict.push(it.clone());
                    }
                    raw.push(it);
                }
            }
            Err(e) => {
                warn!(
                    target: "collect",
                    source = %src.name,
                    provider = provider.name(),
                    error = %format!("{e:#}"),
                    "source skipped"
                );
                counter!("collect_source_errors_total").increment(1);
                report.failures.push(SourceFailure {
                    source: src.name.clone(),
                    url: src.url.clone(),
                    error: format!("{e:#}"),
                });
            }
        }
    }

    report.raw = raw.len();
    let mut items = dedupe(strict);
    report.strict = items.len();

    let floors = engine.population();
    if items.len() < floors.fallback_below {
        report.fallback_applied = true;
        counter!("collect_fallback_applied_total").increment(1);
        let extra = raw
            .iter()
            .filter(|it| engine.keeps(Tier::Fallback, &item_text(it)))
            .cloned()
            .collect();
        let (merged, added) = merge(items, extra);
        items = merged;
        report.fallback_added = added;

        // Only reachable once fallback has had its turn.
        if items.len() < floors.safety_net_below {
            report.safety_net_applied = true;
            counter!("collect_safety_net_applied_total").increment(1);
            let extra = raw
                .iter()
                .filter(|it| engine.in_safety_net(&it.source_url))
                .cloned()
                .collect();
            let (merged, added) = merge(items, extra);
            items = merged;
            report.safety_added = added;
        }
    }

    report.items = rank(items);

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    counter!("collect_runs_total").increment(1);
    histogram!("collect_cycle_ms").record(ms);
    gauge!("collect_items_kept").set(report.items.len() as f64);
    gauge!("collect_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

    info!(
        target: "collect",
        raw = report.raw,
        strict = report.strict,
        fallback_added = report.fallback_added,
        safety_added = report.safety_added,
        kept = report.items.len(),
        failed_sources = report.failures.len(),
        "cycle finished"
    );

    report
}

/// What a refresh did, for callers like `POST /collect`.
#[derive(Debug, Clone)]
pub struct RefreshSummary {
    pub outcome: PublishOutcome,
    pub failures: Vec<SourceFailure>,
}

/// Owns everything a cycle needs and makes sure at most one cycle runs at a time.
pub struct Collector {
    sources: Vec<FeedSource>,
    provider: Arc<dyn FeedProvider>,
    relevance: RelevanceHandle,
    store: Arc<SnapshotStore>,
    gate: Mutex<()>,
}

impl Collector {
    pub fn new(
        sources: Vec<FeedSource>,
        provider: Arc<dyn FeedProvider>,
        relevance: RelevanceHandle,
        store: Arc<SnapshotStore>,
    ) -> Self {
        Self {
            sources,
            provider,
            relevance,
            store,
            gate: Mutex::new(()),
        }
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    pub fn relevance(&self) -> &RelevanceHandle {
        &self.relevance
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Compute a new snapshot and publish it. The gate is held across compute and
    /// swap, so concurrent callers queue instead of interleaving.
    pub async fn refresh(&self) -> Result<RefreshSummary> {
        let _guard = self.gate.lock().await;
        let engine = self.relevance.current();
        let report = run_cycle(&self.sources, self.provider.as_ref(), &engine).await;
        let failures = report.failures.clone();
        let outcome = self.store.publish(report)?;
        Ok(RefreshSummary { outcome, failures })
    }
}
