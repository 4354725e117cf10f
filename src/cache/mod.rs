//! Listing cache layer
//!
//! Per-drive caches of folder listings keyed by path, with hit/miss
//! accounting, manual invalidation and an optional recurring refresh per
//! drive. Values are produced by backend connectors; the cache only stores
//! and serves them.

pub mod drive_cache;
mod refresh;

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::backend::BackendError;
use crate::error::Result;
use crate::model::{CacheInfo, DriveId, Listing};

pub use drive_cache::{DriveCache, RefreshSummary};

/// Where refreshes fetch fresh listings from
#[async_trait]
pub trait CacheSource: Send + Sync {
    async fn load(&self, drive_id: DriveId, key: &str) -> Result<Listing, BackendError>;
}

/// Cache tuning shared by every drive
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// How long a listing stays valid
    pub ttl: Duration,
    /// Max listings kept per drive
    pub max_capacity: u64,
    /// Period of the auto-refresh task
    pub refresh_interval: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(1800),
            max_capacity: 10_000,
            refresh_interval: Duration::from_secs(60),
        }
    }
}

/// All per-drive caches
pub struct CacheManager {
    settings: CacheSettings,
    drives: DashMap<DriveId, Arc<DriveCache>>,
}

impl CacheManager {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            drives: DashMap::new(),
        }
    }

    /// Cache state for a drive, created on first use
    pub fn drive(&self, drive_id: DriveId) -> Arc<DriveCache> {
        Arc::clone(
            &*self
                .drives
                .entry(drive_id)
                .or_insert_with(|| Arc::new(DriveCache::new(drive_id, &self.settings))),
        )
    }

    fn existing(&self, drive_id: DriveId) -> Option<Arc<DriveCache>> {
        self.drives.get(&drive_id).map(|entry| Arc::clone(&*entry))
    }

    pub fn is_enabled(&self, drive_id: DriveId) -> bool {
        self.existing(drive_id).is_some_and(|c| c.is_enabled())
    }

    pub async fn set_enabled(&self, drive_id: DriveId, enabled: bool) {
        self.drive(drive_id).set_enabled(enabled).await;
    }

    pub async fn get(&self, drive_id: DriveId, key: &str) -> Option<Listing> {
        self.drive(drive_id).get(key).await
    }

    pub async fn insert(&self, drive_id: DriveId, key: &str, listing: Listing) {
        self.drive(drive_id).insert(key, listing).await;
    }

    pub async fn get_or_load<F>(&self, drive_id: DriveId, key: &str, fetch: F) -> Result<Listing>
    where
        F: Future<Output = Result<Listing, BackendError>>,
    {
        self.drive(drive_id).get_or_load(key, fetch).await
    }

    pub async fn remove(&self, drive_id: DriveId, key: &str) {
        if let Some(cache) = self.existing(drive_id) {
            cache.remove(key).await;
        }
    }

    pub async fn clear(&self, drive_id: DriveId) {
        if let Some(cache) = self.existing(drive_id) {
            cache.clear().await;
        }
    }

    pub fn key_set(&self, drive_id: DriveId) -> BTreeSet<String> {
        self.existing(drive_id).map(|c| c.keys()).unwrap_or_default()
    }

    pub fn hit_count(&self, drive_id: DriveId) -> u64 {
        self.existing(drive_id).map_or(0, |c| c.hit_count())
    }

    pub fn miss_count(&self, drive_id: DriveId) -> u64 {
        self.existing(drive_id).map_or(0, |c| c.miss_count())
    }

    pub fn info(&self, drive_id: DriveId) -> CacheInfo {
        self.existing(drive_id).map(|c| c.info()).unwrap_or_default()
    }

    /// Invalidate then repopulate one key
    pub async fn refresh(&self, drive_id: DriveId, key: &str, source: &dyn CacheSource) -> Result<Listing> {
        self.drive(drive_id).refresh_key(key, source).await
    }

    pub async fn start_auto_refresh(&self, drive_id: DriveId, source: Weak<dyn CacheSource>) {
        self.drive(drive_id).start_auto_refresh(source).await;
    }

    pub async fn stop_auto_refresh(&self, drive_id: DriveId) {
        if let Some(cache) = self.existing(drive_id) {
            cache.stop_auto_refresh().await;
        }
    }

    pub async fn is_auto_refreshing(&self, drive_id: DriveId) -> bool {
        match self.existing(drive_id) {
            Some(cache) => cache.is_auto_refreshing().await,
            None => false,
        }
    }

    /// Drop all state of a deleted drive, counters included
    pub async fn remove_drive(&self, drive_id: DriveId) {
        if let Some((_, cache)) = self.drives.remove(&drive_id) {
            cache.stop_auto_refresh().await;
            cache.clear().await;
            debug!(drive_id = drive_id, "Dropped drive cache");
        }
    }

    /// Stop every refresh schedule
    pub async fn shutdown(&self) {
        let caches: Vec<_> = self.drives.iter().map(|e| Arc::clone(e.value())).collect();
        for cache in caches {
            cache.stop_auto_refresh().await;
        }
        info!(drives = self.drives.len(), "Cache schedules stopped");
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}
