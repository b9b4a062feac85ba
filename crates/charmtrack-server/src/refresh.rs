//! Background catalog refresh.
//!
//! A single tokio task driven by an explicit interval and a watch-channel
//! cancellation signal, replacing ambient timers: the caller owns both the
//! cadence and the shutdown. Each sweep walks the catalog, fetches current
//! listings per charm from the scrape service, and re-runs the aggregation
//! through the store's single write path.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use charmtrack_source::{ingest_listings, ScrapeClient};
use charmtrack_store::CharmStore;

/// Spawns the refresh loop. The first sweep runs immediately to populate
/// listings at startup; subsequent sweeps run every `interval`.
///
/// The task exits when `true` is observed on `shutdown` or the sender is
/// dropped.
pub fn spawn_refresh_loop(
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    store: Arc<CharmStore>,
    source: Arc<ScrapeClient>,
    base_url: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    run_sweep(&store, &source, &base_url).await;
                }
                changed = shutdown.changed() => {
                    let stop = changed.is_err() || *shutdown.borrow();
                    if stop {
                        tracing::info!("refresh loop: shutdown signal received, exiting");
                        return;
                    }
                }
            }
        }
    })
}

/// Refresh every charm in the catalog once.
///
/// A fetch failure skips that charm and continues the sweep; stale pricing
/// is better than a half-aborted catalog.
async fn run_sweep(store: &CharmStore, source: &ScrapeClient, base_url: &str) {
    let ids = store.ids();
    if ids.is_empty() {
        tracing::info!("refresh loop: catalog empty, nothing to sweep");
        return;
    }

    tracing::info!(count = ids.len(), "refresh loop: starting catalog sweep");
    let mut refreshed = 0usize;
    let mut failed = 0usize;

    for id in ids {
        let Some(charm) = store.get(id) else {
            continue;
        };

        let raw = match source.search_listings(base_url, &charm.name).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(charm = %charm.name, error = %e, "refresh loop: listing fetch failed");
                failed += 1;
                continue;
            }
        };

        let listings = ingest_listings(raw);
        match store.apply_refresh(id, listings, Utc::now()) {
            Ok(()) => refreshed += 1,
            Err(e) => {
                tracing::error!(charm = %charm.name, error = %e, "refresh loop: apply failed");
                failed += 1;
            }
        }
    }

    tracing::info!(refreshed, failed, "refresh loop: catalog sweep complete");
}
