//! On-disk snapshot of the store tables

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::model::{DriveConfig, DriveId, StorageConfig};

/// Both tables plus id sequences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Tables {
    pub next_drive_id: DriveId,
    pub next_row_id: u64,
    pub drives: Vec<DriveConfig>,
    pub storage_configs: Vec<StorageConfig>,
}

/// Load tables from `path`, or empty tables if the file does not exist
pub(crate) fn load(path: &Path) -> Result<Tables, StoreError> {
    if !path.exists() {
        return Ok(Tables::default());
    }
    let data = fs::read(path)?;
    let tables = serde_json::from_slice(&data)?;
    debug!(path = %path.display(), "Loaded store snapshot");
    Ok(tables)
}

/// Write tables to `path` atomically (temp file in the same dir, then rename)
pub(crate) fn write(path: &Path, tables: &Tables) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let json = serde_json::to_vec_pretty(tables)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(&json)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

    debug!(
        path = %path.display(),
        drives = tables.drives.len(),
        rows = tables.storage_configs.len(),
        "Wrote store snapshot"
    );
    Ok(())
}
