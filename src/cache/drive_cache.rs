//! Per-drive listing cache
//!
//! One moka cache per drive plus its hit/miss counters and its auto-refresh
//! schedule. Drives never share state, so operations on different drives do
//! not contend.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::refresh;
use super::{CacheSettings, CacheSource};
use crate::backend::BackendError;
use crate::error::{DriveError, Result};
use crate::model::{CacheInfo, DriveId, Listing};

/// Handle to a running auto-refresh task
struct RefreshSchedule {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshSchedule {
    /// Signal the task to exit. A pass already running is allowed to finish.
    fn cancel(self) {
        let _ = self.stop.send(true);
    }
}

/// Outcome of one refresh pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
    /// Failures the backend reported as temporary; included in `failed`
    pub transient: usize,
}

pub struct DriveCache {
    drive_id: DriveId,
    entries: Cache<String, Listing>,
    hits: AtomicU64,
    misses: AtomicU64,
    /// Nothing is stored while false
    enabled: AtomicBool,
    /// Bumped by every clear; populations started under an older value are
    /// discarded when they land
    generation: AtomicU64,
    refresh_interval: Duration,
    /// Held for the duration of a full refresh pass
    refresh_pass: Mutex<()>,
    schedule: Mutex<Option<RefreshSchedule>>,
}

impl DriveCache {
    pub fn new(drive_id: DriveId, settings: &CacheSettings) -> Self {
        let entries = Cache::builder()
            .max_capacity(settings.max_capacity)
            .time_to_live(settings.ttl)
            .name(&format!("drive_{}_listings", drive_id))
            .build();

        Self {
            drive_id,
            entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            enabled: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            refresh_interval: settings.refresh_interval,
            refresh_pass: Mutex::new(()),
            schedule: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turn caching on or off. Turning it off evicts everything.
    pub async fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::AcqRel);
        if was && !enabled {
            self.clear().await;
        }
        if was != enabled {
            debug!(drive_id = self.drive_id, enabled = enabled, "Cache enabled flag changed");
        }
    }

    /// Look up a listing, counting the hit or miss
    pub async fn get(&self, key: &str) -> Option<Listing> {
        match self.entries.get(key).await {
            Some(listing) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(drive_id = self.drive_id, key = key, "Cache HIT");
                Some(listing)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(drive_id = self.drive_id, key = key, "Cache MISS");
                None
            }
        }
    }

    /// Store a listing computed elsewhere. Ignored while disabled.
    pub async fn insert(&self, key: &str, listing: Listing) {
        if !self.is_enabled() {
            return;
        }
        let generation = self.generation();
        self.entries.insert(key.to_string(), listing).await;
        if self.discard_if_stale(key, generation).await {
            return;
        }
        debug!(drive_id = self.drive_id, key = key, "Cached listing");
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Evict `key` again if caching was turned off or the cache cleared
    /// since `generation` was read. Returns true if it did.
    async fn discard_if_stale(&self, key: &str, generation: u64) -> bool {
        if self.is_enabled() && self.generation() == generation {
            return false;
        }
        self.entries.invalidate(key).await;
        debug!(drive_id = self.drive_id, key = key, "Dropped listing populated before a clear");
        true
    }

    /// Serve `key` from cache, or populate it from `fetch` on a miss.
    ///
    /// Concurrent misses on the same key share one `fetch`. Failed fetches
    /// are not cached.
    pub async fn get_or_load<F>(&self, key: &str, fetch: F) -> Result<Listing>
    where
        F: Future<Output = Result<Listing, BackendError>>,
    {
        if !self.is_enabled() {
            return Ok(fetch.await?);
        }
        if let Some(listing) = self.get(key).await {
            return Ok(listing);
        }
        let generation = self.generation();
        let listing = self.entries.try_get_with(key.to_string(), fetch).await?;
        if !self.discard_if_stale(key, generation).await {
            debug!(drive_id = self.drive_id, key = key, entries = listing.len(), "Populated listing");
        }
        Ok(listing)
    }

    /// Evict one entry; absent keys are fine
    pub async fn remove(&self, key: &str) {
        self.entries.invalidate(key).await;
        debug!(drive_id = self.drive_id, key = key, "Evicted listing");
    }

    /// Evict everything. Hit/miss counters are kept.
    pub async fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        for (key, _) in self.entries.iter() {
            self.entries.invalidate(key.as_str()).await;
        }
        self.entries.invalidate_all();
        debug!(drive_id = self.drive_id, "Cleared drive cache");
    }

    /// Keys currently cached
    pub fn keys(&self) -> BTreeSet<String> {
        self.entries.iter().map(|(key, _)| key.as_ref().clone()).collect()
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn info(&self) -> CacheInfo {
        let keys = self.keys();
        CacheInfo {
            cache_count: keys.len(),
            hit_count: self.hit_count(),
            miss_count: self.miss_count(),
            keys,
        }
    }

    /// Evict `key`, then repopulate it from `source`.
    ///
    /// On failure the key stays evicted. While caching is disabled the fresh
    /// listing is returned but not stored.
    pub async fn refresh_key(&self, key: &str, source: &dyn CacheSource) -> Result<Listing> {
        self.remove(key).await;

        let loaded = if self.is_enabled() {
            let generation = self.generation();
            let loaded = self
                .entries
                .try_get_with(key.to_string(), source.load(self.drive_id, key))
                .await;
            if loaded.is_ok() {
                self.discard_if_stale(key, generation).await;
            }
            loaded
        } else {
            source.load(self.drive_id, key).await.map_err(Arc::new)
        };

        loaded.map_err(|source| DriveError::Refresh {
            drive_id: self.drive_id,
            key: key.to_string(),
            source,
        })
    }

    /// Refresh every cached key. Failures are logged and skipped.
    pub async fn refresh_all(&self, source: &dyn CacheSource) -> RefreshSummary {
        let _pass = self.refresh_pass.lock().await;
        let mut summary = RefreshSummary::default();

        for key in self.keys() {
            match self.refresh_key(&key, source).await {
                Ok(_) => summary.refreshed += 1,
                Err(e) if e.is_transient() => {
                    summary.failed += 1;
                    summary.transient += 1;
                    info!(drive_id = self.drive_id, key = %key, error = %e, "Backend busy, key left evicted until next pass");
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(drive_id = self.drive_id, key = %key, error = %e, "Scheduled refresh failed, key left evicted");
                }
            }
        }

        debug!(
            drive_id = self.drive_id,
            refreshed = summary.refreshed,
            failed = summary.failed,
            transient = summary.transient,
            "Refresh pass finished"
        );
        summary
    }

    /// Start (or restart) the recurring refresh for this drive.
    ///
    /// Any schedule already running is cancelled first, so at most one is
    /// active per drive.
    pub async fn start_auto_refresh(self: &Arc<Self>, source: Weak<dyn CacheSource>) {
        let mut schedule = self.schedule.lock().await;
        if let Some(previous) = schedule.take() {
            debug!(drive_id = self.drive_id, "Replacing existing refresh schedule");
            previous.cancel();
        }

        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(refresh::run(
            Arc::downgrade(self),
            source,
            self.refresh_interval,
            stop_rx,
        ));
        *schedule = Some(RefreshSchedule { stop, task });

        info!(
            drive_id = self.drive_id,
            interval_secs = self.refresh_interval.as_secs_f64(),
            "Auto cache refresh started"
        );
    }

    /// Stop the recurring refresh; no-op if none is running
    pub async fn stop_auto_refresh(&self) {
        if let Some(schedule) = self.schedule.lock().await.take() {
            schedule.cancel();
            info!(drive_id = self.drive_id, "Auto cache refresh stopped");
        }
    }

    pub async fn is_auto_refreshing(&self) -> bool {
        self.schedule
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| !s.task.is_finished())
    }
}
