//! In-memory drive store with optional JSON snapshot persistence
//!
//! Both tables live behind one lock, so multi-table writes are atomic. With a
//! snapshot path every mutation is applied to a copy, written to disk, and
//! only then swapped in: a failed write leaves memory and disk untouched.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::snapshot::{self, Tables};
use super::DriveStore;
use crate::error::StoreError;
use crate::model::{DriveConfig, DriveId, StorageConfig, StorageType};

pub struct MemoryStore {
    tables: RwLock<Tables>,
    /// Where committed state is mirrored, if anywhere
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Volatile store, lost on exit
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            snapshot_path: None,
        }
    }

    /// Store mirrored to a JSON file, loading it if present
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let tables = snapshot::load(&path)?;
        info!(
            path = %path.display(),
            drives = tables.drives.len(),
            "Opened drive store"
        );
        Ok(Self {
            tables: RwLock::new(tables),
            snapshot_path: Some(path),
        })
    }

    /// Apply `f` to a copy of the tables, persist it, then commit
    async fn commit<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut tables = self.tables.write().await;
        let mut next = tables.clone();
        let out = f(&mut next)?;
        if let Some(path) = self.snapshot_path.clone() {
            // write lock stays held across the blocking write
            next = tokio::task::spawn_blocking(move || snapshot::write(&path, &next).map(|()| next))
                .await
                .map_err(|e| StoreError::Persistence(format!("snapshot writer failed: {}", e)))??;
        }
        *tables = next;
        Ok(out)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert or replace a drive record, assigning an id on insert
fn upsert_drive(tables: &mut Tables, mut drive: DriveConfig) -> Result<DriveConfig, StoreError> {
    match drive.id {
        Some(id) => {
            let slot = tables
                .drives
                .iter_mut()
                .find(|d| d.id == Some(id))
                .ok_or_else(|| StoreError::Persistence(format!("drive {} does not exist", id)))?;
            *slot = drive.clone();
        }
        None => {
            tables.next_drive_id += 1;
            drive.id = Some(tables.next_drive_id);
            tables.drives.push(drive.clone());
        }
    }
    Ok(drive)
}

#[async_trait]
impl DriveStore for MemoryStore {
    async fn list(&self) -> Result<Vec<DriveConfig>, StoreError> {
        let mut drives = self.tables.read().await.drives.clone();
        drives.sort_by_key(|d| (d.order_num, d.id));
        Ok(drives)
    }

    async fn find_by_id(&self, id: DriveId) -> Result<Option<DriveConfig>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.drives.iter().find(|d| d.id == Some(id)).cloned())
    }

    async fn find_by_type(&self, storage_type: StorageType) -> Result<Vec<DriveConfig>, StoreError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|d| d.storage_type == storage_type)
            .collect())
    }

    async fn find_storage_configs(&self, drive_id: DriveId) -> Result<Vec<StorageConfig>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .storage_configs
            .iter()
            .filter(|r| r.drive_id == Some(drive_id))
            .cloned()
            .collect())
    }

    async fn save(&self, drive: DriveConfig) -> Result<DriveConfig, StoreError> {
        let saved = self.commit(|tables| upsert_drive(tables, drive)).await?;
        debug!(drive_id = ?saved.id, "Saved drive record");
        Ok(saved)
    }

    async fn save_with_storage(
        &self,
        drive: DriveConfig,
        rows: Vec<StorageConfig>,
    ) -> Result<DriveId, StoreError> {
        let row_count = rows.len();
        let id = self
            .commit(|tables| {
                let mut seen = HashSet::new();
                if let Some(dup) = rows.iter().find(|r| !seen.insert(r.key.as_str())) {
                    return Err(StoreError::Persistence(format!(
                        "duplicate storage parameter `{}`",
                        dup.key
                    )));
                }

                let drive = upsert_drive(tables, drive)?;
                let id = drive
                    .id
                    .ok_or_else(|| StoreError::Persistence("drive id was not assigned".into()))?;

                tables.storage_configs.retain(|r| r.drive_id != Some(id));
                for mut row in rows {
                    if row.id.is_none() {
                        tables.next_row_id += 1;
                        row.id = Some(tables.next_row_id);
                    }
                    row.drive_id = Some(id);
                    tables.storage_configs.push(row);
                }
                Ok(id)
            })
            .await?;

        debug!(drive_id = id, rows = row_count, "Saved drive with storage parameters");
        Ok(id)
    }

    async fn delete_by_id(&self, id: DriveId) -> Result<bool, StoreError> {
        let existed = self
            .commit(|tables| {
                let before = tables.drives.len();
                tables.drives.retain(|d| d.id != Some(id));
                tables.storage_configs.retain(|r| r.drive_id != Some(id));
                Ok(tables.drives.len() != before)
            })
            .await?;
        debug!(drive_id = id, existed = existed, "Deleted drive record");
        Ok(existed)
    }
}
