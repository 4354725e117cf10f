//! Test doubles shared by the unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::backend::{BackendError, BackendProvider, StorageBackend};
use crate::cache::CacheSource;
use crate::model::{
    DriveId, FileItem, FileType, Listing, StorageStrategyConfig, StorageType,
};

/// Listing of plain files with the given names
pub(crate) fn listing(names: &[&str]) -> Listing {
    Arc::new(
        names
            .iter()
            .map(|name| FileItem {
                name: name.to_string(),
                path: "/".to_string(),
                size: 1,
                modified_ms: None,
                file_type: FileType::File,
            })
            .collect(),
    )
}

/// Cache source returning a fixed listing (or failing), counting loads
pub(crate) struct CountingSource {
    listing: Option<Listing>,
    loads: AtomicUsize,
}

impl CountingSource {
    pub(crate) fn new(listing: Listing) -> Self {
        Self { listing: Some(listing), loads: AtomicUsize::new(0) }
    }

    pub(crate) fn failing() -> Self {
        Self { listing: None, loads: AtomicUsize::new(0) }
    }

    pub(crate) fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheSource for CountingSource {
    async fn load(&self, _drive_id: DriveId, key: &str) -> Result<Listing, BackendError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.listing
            .clone()
            .ok_or_else(|| BackendError::Unreachable(format!("cannot list {}", key)))
    }
}

/// Knobs and counters shared by a fake provider and its backends
pub(crate) struct FakeState {
    pub healthy: AtomicBool,
    pub fail_listing: AtomicBool,
    pub connects: AtomicUsize,
    pub listing_calls: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub last_config: Mutex<Option<StorageStrategyConfig>>,
}

impl FakeState {
    pub(crate) fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }
}

/// Provider whose backends answer `listing(key)` with one entry named
/// `"{key}#{call}"`
pub(crate) struct FakeProvider {
    storage_type: StorageType,
    state: Arc<FakeState>,
}

impl FakeProvider {
    pub(crate) fn new(storage_type: StorageType) -> (Arc<Self>, Arc<FakeState>) {
        let state = Arc::new(FakeState {
            healthy: AtomicBool::new(true),
            fail_listing: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            listing_calls: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
            last_config: Mutex::new(None),
        });
        let provider = Arc::new(Self { storage_type, state: Arc::clone(&state) });
        (provider, state)
    }
}

#[async_trait]
impl BackendProvider for FakeProvider {
    fn storage_type(&self) -> StorageType {
        self.storage_type
    }

    async fn connect(&self, _drive_id: DriveId, config: &StorageStrategyConfig) -> Arc<dyn StorageBackend> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        *self.state.last_config.lock().unwrap() = Some(config.clone());
        Arc::new(FakeBackend {
            initialized: self.state.healthy.load(Ordering::SeqCst),
            state: Arc::clone(&self.state),
        })
    }
}

struct FakeBackend {
    initialized: bool,
    state: Arc<FakeState>,
}

#[async_trait]
impl StorageBackend for FakeBackend {
    async fn listing(&self, key: &str) -> Result<Listing, BackendError> {
        let call = self.state.listing_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.state.fail_listing.load(Ordering::SeqCst) {
            return Err(BackendError::Unreachable(format!("listing {} failed", key)));
        }
        Ok(listing(&[&format!("{}#{}", key, call)]))
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    async fn shutdown(&self) {
        self.state.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}
