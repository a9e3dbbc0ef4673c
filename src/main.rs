//! Gamecocks football feed: binary entrypoint.
//! Boots the Axum site on Shuttle, starts background collection, and wires metrics.

use shuttle_axum::ShuttleAxum;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gamecock_feed::config::AppConfig;
use gamecock_feed::ingest::scheduler::{spawn_collect_scheduler, CollectSchedulerCfg};
use gamecock_feed::metrics::Metrics;
use gamecock_feed::relevance::{
    start_hot_reload_thread, DEFAULT_RELEVANCE_CONFIG_PATH, ENV_RELEVANCE_CONFIG_PATH,
};

/// Compact logs filtered by RUST_LOG, defaulting to this crate at info.
/// `try_init` because Shuttle may already have installed a subscriber.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gamecock_feed=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = AppConfig::from_env();
    let state = gamecock_feed::bootstrap(&cfg)?;

    // Dev-only rules reload (RELEVANCE_HOT_RELOAD=1).
    let path = std::env::var(ENV_RELEVANCE_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_RELEVANCE_CONFIG_PATH));
    start_hot_reload_thread(state.collector.relevance().clone(), path);

    spawn_collect_scheduler(
        CollectSchedulerCfg {
            interval_secs: cfg.collect_interval_secs,
        },
        state.collector.clone(),
    );

    let mut router = gamecock_feed::router(state);
    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!("metrics disabled: {e:#}"),
    }

    Ok(router.into())
}
