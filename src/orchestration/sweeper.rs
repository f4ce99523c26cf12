//! Periodic eviction of idle book subscriptions.

use crate::config::SWEEP_INTERVAL_MS;
use crate::domain::TimeMs;
use crate::engine::BookStore;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration};
use tracing::info;

/// Run until shutdown, dropping tokens (subscription and cached book
/// together) that have been tracked longer than `expiry_ms`.
pub async fn run_sweeper(
    store: Arc<BookStore>,
    expiry_ms: i64,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(Duration::from_millis(SWEEP_INTERVAL_MS));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = store.sweep_expired(TimeMs::now(), expiry_ms);
                if !evicted.is_empty() {
                    info!("Expired {} idle book subscriptions", evicted.len());
                }
            }
            _ = shutdown.changed() => return,
        }
    }
}
