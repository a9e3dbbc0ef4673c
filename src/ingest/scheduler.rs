// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::collect::Collector;

#[derive(Clone, Copy, Debug)]
pub struct CollectSchedulerCfg {
    /// 0 disables the background loop (refresh only via `POST /collect`).
    pub interval_secs: u64,
}

/// Spawn the background refresher. The first tick fires immediately, which doubles as
/// the startup warm-up. Failures are logged; the loop never exits on its own.
pub fn spawn_collect_scheduler(
    cfg: CollectSchedulerCfg,
    collector: Arc<Collector>,
) -> Option<JoinHandle<()>> {
    if cfg.interval_secs == 0 {
        tracing::info!(target: "collect", "background collection disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match collector.refresh().await {
                Ok(summary) => {
                    tracing::info!(
                        target: "collect",
                        published = summary.outcome.is_published(),
                        version = summary.outcome.version(),
                        failed_sources = summary.failures.len(),
                        "scheduled refresh"
                    );
                }
                Err(e) => {
                    tracing::warn!(target: "collect", "scheduled refresh failed: {e:#}");
                }
            }
        }
    }))
}
