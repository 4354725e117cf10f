//! Drive service registry
//!
//! Owns the one live `DriveService` per drive id. `init` (re)builds a drive's
//! instance from its persisted configuration, `get` hands it out and
//! `destroy` tears it down. Each id has its own lock, so `get` never observes
//! an instance mid-replacement while other drives proceed independently.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::service::DriveService;
use crate::backend::{BackendError, BackendRegistry, StorageBackend, Unavailable};
use crate::binder;
use crate::cache::{CacheManager, CacheSource};
use crate::error::{DriveError, Result};
use crate::model::{DriveId, Listing};
use crate::store::DriveStore;

/// Per-drive slot; its lock serializes init/destroy against get
#[derive(Default)]
struct DriveSlot {
    service: RwLock<Option<Arc<DriveService>>>,
}

pub struct DriveRegistry {
    store: Arc<dyn DriveStore>,
    backends: Arc<BackendRegistry>,
    cache: Arc<CacheManager>,
    slots: DashMap<DriveId, Arc<DriveSlot>>,
}

impl DriveRegistry {
    pub fn new(
        store: Arc<dyn DriveStore>,
        backends: Arc<BackendRegistry>,
        cache: Arc<CacheManager>,
    ) -> Self {
        Self {
            store,
            backends,
            cache,
            slots: DashMap::new(),
        }
    }

    fn slot(&self, drive_id: DriveId) -> Arc<DriveSlot> {
        Arc::clone(&*self.slots.entry(drive_id).or_default())
    }

    /// Build the instance for a drive from its persisted configuration and
    /// make it current, replacing any previous one.
    ///
    /// Backend failures do not error: check `is_initialized()` on the result.
    /// Errors only when the drive cannot be loaded.
    pub async fn init(&self, drive_id: DriveId) -> Result<Arc<DriveService>> {
        let slot = self.slot(drive_id);
        let mut current = slot.service.write().await;

        let service = Arc::new(self.build(drive_id).await?);
        if let Some(previous) = current.replace(Arc::clone(&service)) {
            previous.shutdown().await;
            debug!(drive_id = drive_id, "Replaced previous drive instance");
        }

        if service.is_initialized() {
            info!(drive_id = drive_id, storage_type = %service.storage_type(), "Drive initialized");
        } else {
            warn!(drive_id = drive_id, storage_type = %service.storage_type(), "Drive failed to initialize");
        }
        Ok(service)
    }

    async fn build(&self, drive_id: DriveId) -> Result<DriveService> {
        let drive = self
            .store
            .find_by_id(drive_id)
            .await?
            .ok_or(DriveError::NotFound(drive_id))?;
        let rows = self.store.find_storage_configs(drive_id).await?;
        let config = binder::to_typed(&rows);

        let backend: Arc<dyn StorageBackend> = match self.backends.provider(drive.storage_type) {
            Some(provider) => provider.connect(drive_id, &config).await,
            None => {
                let err = DriveError::UnsupportedStorageType(drive.storage_type);
                warn!(drive_id = drive_id, error = %err, "No connector for drive");
                Arc::new(Unavailable::new(err.to_string()))
            }
        };

        Ok(DriveService::new(
            drive_id,
            drive.storage_type,
            backend,
            Arc::clone(&self.cache),
        ))
    }

    /// Current instance for a drive
    pub async fn get(&self, drive_id: DriveId) -> Result<Arc<DriveService>> {
        let slot = self
            .slots
            .get(&drive_id)
            .map(|s| Arc::clone(&*s))
            .ok_or(DriveError::NotInitialized(drive_id))?;
        let current = slot.service.read().await;
        current.clone().ok_or(DriveError::NotInitialized(drive_id))
    }

    /// Release and forget a drive's instance; no-op if there is none
    pub async fn destroy(&self, drive_id: DriveId) {
        let Some(slot) = self.slots.get(&drive_id).map(|s| Arc::clone(&*s)) else {
            return;
        };
        let mut current = slot.service.write().await;
        if let Some(service) = current.take() {
            service.shutdown().await;
            info!(drive_id = drive_id, "Drive instance destroyed");
        }
        self.slots.remove_if(&drive_id, |_, s| Arc::ptr_eq(s, &slot));
    }

    /// Ids with a registered instance
    pub fn drive_ids(&self) -> Vec<DriveId> {
        let mut ids: Vec<_> = self.slots.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Destroy every instance
    pub async fn shutdown(&self) {
        for drive_id in self.drive_ids() {
            self.destroy(drive_id).await;
        }
    }
}

#[async_trait]
impl CacheSource for DriveRegistry {
    async fn load(&self, drive_id: DriveId, key: &str) -> Result<Listing, BackendError> {
        let service = self
            .get(drive_id)
            .await
            .map_err(|_| BackendError::NotInitialized)?;
        service.load(key).await
    }
}
