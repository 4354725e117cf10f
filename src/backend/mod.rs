//! Storage backend connectors
//!
//! A `BackendProvider` knows one storage type: its default parameter rows and
//! how to build a connected `StorageBackend` from bound parameters. Connection
//! failures do not error out; they yield a backend whose `is_initialized()`
//! is false so callers can decide what to surface.

pub mod errors;
pub mod local;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{DriveId, Listing, StorageConfig, StorageStrategyConfig, StorageType};
use crate::schema;

pub use errors::BackendError;
pub use local::LocalProvider;

/// A live connection to one drive's storage
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// List the folder identified by `key`
    async fn listing(&self, key: &str) -> Result<Listing, BackendError>;

    fn is_initialized(&self) -> bool;

    /// Release connections. Called once when the drive is torn down.
    async fn shutdown(&self) {}
}

/// Factory for backends of one storage type
#[async_trait]
pub trait BackendProvider: Send + Sync {
    fn storage_type(&self) -> StorageType;

    /// Parameter rows a new drive of this type starts with
    fn default_parameters(&self) -> Vec<StorageConfig> {
        schema::default_rows(self.storage_type())
    }

    /// Build and initialize a backend. Never fails outright; check
    /// `is_initialized()` on the result.
    async fn connect(&self, drive_id: DriveId, config: &StorageStrategyConfig) -> Arc<dyn StorageBackend>;
}

/// Stand-in for drives whose backend could not be built at all
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl StorageBackend for Unavailable {
    async fn listing(&self, _key: &str) -> Result<Listing, BackendError> {
        Err(BackendError::Other(self.reason.clone()))
    }

    fn is_initialized(&self) -> bool {
        false
    }
}

/// Providers by storage type
#[derive(Default)]
pub struct BackendRegistry {
    providers: HashMap<StorageType, Arc<dyn BackendProvider>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in connectors
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LocalProvider));
        registry
    }

    /// Add or replace the provider for its storage type
    pub fn register(&mut self, provider: Arc<dyn BackendProvider>) {
        self.providers.insert(provider.storage_type(), provider);
    }

    pub fn provider(&self, storage_type: StorageType) -> Option<Arc<dyn BackendProvider>> {
        self.providers.get(&storage_type).cloned()
    }

    /// Default rows for `storage_type`, from its provider or the schema
    pub fn default_parameters(&self, storage_type: StorageType) -> Vec<StorageConfig> {
        match self.providers.get(&storage_type) {
            Some(provider) => provider.default_parameters(),
            None => schema::default_rows(storage_type),
        }
    }
}
