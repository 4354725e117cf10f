//! Live drive service
//!
//! One initialized backend connection for a drive, fronted by the drive's
//! listing cache.

use std::sync::Arc;

use tracing::debug;

use crate::backend::{BackendError, StorageBackend};
use crate::cache::CacheManager;
use crate::error::{DriveError, Result};
use crate::model::{DriveId, Listing, StorageType};

pub struct DriveService {
    drive_id: DriveId,
    storage_type: StorageType,
    backend: Arc<dyn StorageBackend>,
    cache: Arc<CacheManager>,
}

impl DriveService {
    pub fn new(
        drive_id: DriveId,
        storage_type: StorageType,
        backend: Arc<dyn StorageBackend>,
        cache: Arc<CacheManager>,
    ) -> Self {
        Self {
            drive_id,
            storage_type,
            backend,
            cache,
        }
    }

    pub fn drive_id(&self) -> DriveId {
        self.drive_id
    }

    pub fn storage_type(&self) -> StorageType {
        self.storage_type
    }

    /// False when the backend could not be set up from the drive's parameters
    pub fn is_initialized(&self) -> bool {
        self.backend.is_initialized()
    }

    /// List a folder, through the cache when caching is on for this drive
    pub async fn file_list(&self, key: &str) -> Result<Listing> {
        if !self.is_initialized() {
            return Err(DriveError::Initialization {
                drive_id: self.drive_id,
            });
        }
        self.cache
            .get_or_load(self.drive_id, key, self.backend.listing(key))
            .await
    }

    /// List straight from the backend, bypassing the cache
    pub async fn load(&self, key: &str) -> Result<Listing, BackendError> {
        if !self.is_initialized() {
            return Err(BackendError::NotInitialized);
        }
        self.backend.listing(key).await
    }

    pub(crate) async fn shutdown(&self) {
        self.backend.shutdown().await;
        debug!(drive_id = self.drive_id, "Drive backend shut down");
    }
}
