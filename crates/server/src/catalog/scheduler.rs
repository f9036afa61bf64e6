//! Periodic full resync.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use super::Catalog;

/// Spawn a task that force-resyncs the catalog every `every`.
///
/// The first tick fires one full period after spawning. Failures are logged
/// and the loop carries on. A resync that overruns delays the next tick.
pub fn spawn_refresh_task(catalog: Catalog, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // `interval` completes its first tick immediately.
        ticker.tick().await;

        info!(interval_secs = every.as_secs(), "Catalog refresh task started");

        loop {
            ticker.tick().await;

            match catalog.force_resync().await {
                Ok(snapshot) => info!(products = snapshot.len(), "Scheduled resync complete"),
                Err(e) => error!(error = %e, "Scheduled resync failed"),
            }
        }
    })
}
