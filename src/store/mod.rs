//! Drive config store
//!
//! Durable record of drives and their parameter rows. The orchestrator only
//! sees the `DriveStore` trait; writes spanning both tables go through
//! `save_with_storage` / `delete_by_id`, which commit or fail as a unit.

pub mod memory;
mod snapshot;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{DriveConfig, DriveId, StorageConfig, StorageType};

pub use memory::MemoryStore;

#[async_trait]
pub trait DriveStore: Send + Sync {
    /// All drives, ordered by `order_num` then id
    async fn list(&self) -> Result<Vec<DriveConfig>, StoreError>;

    async fn find_by_id(&self, id: DriveId) -> Result<Option<DriveConfig>, StoreError>;

    async fn find_by_type(&self, storage_type: StorageType) -> Result<Vec<DriveConfig>, StoreError>;

    /// Parameter rows owned by a drive
    async fn find_storage_configs(&self, drive_id: DriveId) -> Result<Vec<StorageConfig>, StoreError>;

    /// Insert (no id) or update a drive record alone
    async fn save(&self, drive: DriveConfig) -> Result<DriveConfig, StoreError>;

    /// Insert or update a drive and replace its whole row set, atomically.
    ///
    /// Assigns the drive id on insert and stamps it on every row. Returns the
    /// drive id.
    async fn save_with_storage(
        &self,
        drive: DriveConfig,
        rows: Vec<StorageConfig>,
    ) -> Result<DriveId, StoreError>;

    /// Delete a drive and its rows, atomically. Returns whether it existed.
    async fn delete_by_id(&self, id: DriveId) -> Result<bool, StoreError>;
}
