//! Auto-refresh task body
//!
//! Runs a refresh pass once per interval until told to stop. Stopping only
//! interrupts the wait between passes; a pass in progress runs to completion.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::drive_cache::DriveCache;
use super::CacheSource;

pub(crate) async fn run(
    cache: Weak<DriveCache>,
    source: Weak<dyn CacheSource>,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // Skip the first immediate tick

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.changed() => break,
        }
        if *stop.borrow() {
            break;
        }

        // Drive or registry gone: nothing left to refresh
        let (Some(cache), Some(source)) = (cache.upgrade(), source.upgrade()) else {
            break;
        };
        cache.refresh_all(source.as_ref()).await;
    }

    debug!("Auto-refresh task exited");
}
