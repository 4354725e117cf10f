//! Local filesystem connector
//!
//! Serves listings from a directory on this machine. The drive's `filePath`
//! parameter is the root; cache keys are folder paths relative to it.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{BackendError, BackendProvider, StorageBackend};
use crate::model::{
    DriveId, FileItem, FileType, Listing, StorageStrategyConfig, StorageType,
};

pub struct LocalProvider;

#[async_trait]
impl BackendProvider for LocalProvider {
    fn storage_type(&self) -> StorageType {
        StorageType::Local
    }

    async fn connect(&self, drive_id: DriveId, config: &StorageStrategyConfig) -> Arc<dyn StorageBackend> {
        Arc::new(LocalBackend::init(drive_id, config.file_path.as_deref()).await)
    }
}

/// Directory-backed storage
pub struct LocalBackend {
    root: PathBuf,
    initialized: bool,
}

impl LocalBackend {
    /// Check the root and record whether it is usable
    pub async fn init(drive_id: DriveId, file_path: Option<&str>) -> Self {
        let root = PathBuf::from(file_path.unwrap_or_default());
        let initialized = match file_path {
            Some(p) if !p.trim().is_empty() => match tokio::fs::metadata(&root).await {
                Ok(meta) if meta.is_dir() => true,
                Ok(_) => {
                    warn!(drive_id = drive_id, root = %root.display(), "Local drive root is not a directory");
                    false
                }
                Err(e) => {
                    warn!(drive_id = drive_id, root = %root.display(), error = %e, "Local drive root is not accessible");
                    false
                }
            },
            _ => {
                warn!(drive_id = drive_id, "Local drive has no filePath");
                false
            }
        };
        Self { root, initialized }
    }

    /// Map a cache key onto a directory under the root
    fn resolve(&self, key: &str) -> Result<PathBuf, BackendError> {
        let relative = Path::new(key.trim_start_matches('/'));
        let mut path = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(BackendError::InvalidConfig(format!(
                        "path escapes drive root: {}",
                        key
                    )))
                }
            }
        }
        Ok(path)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn listing(&self, key: &str) -> Result<Listing, BackendError> {
        if !self.initialized {
            return Err(BackendError::NotInitialized);
        }
        let dir = self.resolve(key)?;
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BackendError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut items = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let meta = entry.metadata().await?;
            let modified_ms = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as u64);
            items.push(FileItem {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: key.to_string(),
                size: if meta.is_dir() { 0 } else { meta.len() },
                modified_ms,
                file_type: if meta.is_dir() { FileType::Folder } else { FileType::File },
            });
        }

        // folders first, then by name
        items.sort_by(|a, b| b.is_folder().cmp(&a.is_folder()).then_with(|| a.name.cmp(&b.name)));

        debug!(dir = %dir.display(), entries = items.len(), "Listed local folder");
        Ok(Arc::new(items))
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
