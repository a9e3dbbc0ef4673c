// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod collect;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod pages;
pub mod relevance;
pub mod snapshot;

// `crate_root::api::router` and `crate_root::router` both work.
pub use crate::api::{router, AppState};

use std::sync::Arc;
use tracing::info;

use crate::collect::Collector;
use crate::config::AppConfig;
use crate::ingest::config::load_feeds_default;
use crate::ingest::providers::HttpFeedProvider;
use crate::relevance::{RelevanceEngine, RelevanceHandle};
use crate::snapshot::SnapshotStore;

/// Wire the production state: feed list, rule set, HTTP provider, file-backed store.
/// An unreadable rule set or feed list is fatal here; nothing is fetched yet.
pub fn bootstrap(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let feeds = load_feeds_default()?;
    let engine = RelevanceEngine::from_toml()?;
    let provider = HttpFeedProvider::new(cfg.fetch_timeout, &cfg.user_agent)?;
    let store = SnapshotStore::with_file(&cfg.items_path);

    info!(
        feeds = feeds.feeds.len(),
        links = feeds.links.len(),
        items = store.current().snapshot.items.len(),
        "bootstrap complete"
    );

    let collector = Collector::new(
        feeds.feeds,
        Arc::new(provider),
        RelevanceHandle::new(engine),
        Arc::new(store),
    );
    Ok(AppState::new(Arc::new(collector), cfg.clone(), feeds.links))
}
