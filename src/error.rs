//! Drive configuration error types

use std::sync::Arc;

use thiserror::Error;

use crate::backend::BackendError;
use crate::model::{DriveId, StorageType};

/// Persistence failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store snapshot is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("persistence error: {0}")]
    Persistence(String),
}

/// Errors surfaced by the drive service, registry and cache
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Drive {0} not found")]
    NotFound(DriveId),

    #[error("Drive {0} has no live service instance")]
    NotInitialized(DriveId),

    #[error("Drive {drive_id} failed to initialize, check its storage parameters")]
    Initialization { drive_id: DriveId },

    #[error("Failed to refresh `{key}` on drive {drive_id}: {source}")]
    Refresh {
        drive_id: DriveId,
        key: String,
        #[source]
        source: Arc<BackendError>,
    },

    #[error("No connector registered for storage type {0}")]
    UnsupportedStorageType(StorageType),

    #[error(transparent)]
    Backend(Arc<BackendError>),

    #[error("Transaction failed: {0}")]
    Transaction(#[from] StoreError),
}

impl From<BackendError> for DriveError {
    fn from(e: BackendError) -> Self {
        DriveError::Backend(Arc::new(e))
    }
}

impl From<Arc<BackendError>> for DriveError {
    fn from(e: Arc<BackendError>) -> Self {
        DriveError::Backend(e)
    }
}

impl DriveError {
    /// Whether the underlying backend failure may clear up on its own
    pub fn is_transient(&self) -> bool {
        match self {
            DriveError::Refresh { source, .. } | DriveError::Backend(source) => source.is_transient(),
            _ => false,
        }
    }
}

pub type Result<T, E = DriveError> = std::result::Result<T, E>;
