//! Drive configuration types
//!
//! Persisted entities (drives and their parameter rows) plus the composite
//! views handed to the administrative layer.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::strategy::StorageStrategyConfig;

/// Drive identifier, assigned by the store on first save
pub type DriveId = u32;

/// A cached directory listing
pub type Listing = Arc<Vec<FileItem>>;

/// Backend kinds a drive can be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageType {
    Local,
    Aliyun,
    Tencent,
    Qiniu,
    Upyun,
    Huawei,
    Minio,
    S3,
    Ftp,
    #[serde(rename = "onedrive")]
    OneDrive,
    #[serde(rename = "onedrive-china")]
    OneDriveChina,
    #[serde(rename = "sharepoint")]
    SharePoint,
}

impl StorageType {
    /// Every supported storage type
    pub const ALL: [StorageType; 12] = [
        StorageType::Local,
        StorageType::Aliyun,
        StorageType::Tencent,
        StorageType::Qiniu,
        StorageType::Upyun,
        StorageType::Huawei,
        StorageType::Minio,
        StorageType::S3,
        StorageType::Ftp,
        StorageType::OneDrive,
        StorageType::OneDriveChina,
        StorageType::SharePoint,
    ];

    /// Wire tag used in persisted rows and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Local => "local",
            StorageType::Aliyun => "aliyun",
            StorageType::Tencent => "tencent",
            StorageType::Qiniu => "qiniu",
            StorageType::Upyun => "upyun",
            StorageType::Huawei => "huawei",
            StorageType::Minio => "minio",
            StorageType::S3 => "s3",
            StorageType::Ftp => "ftp",
            StorageType::OneDrive => "onedrive",
            StorageType::OneDriveChina => "onedrive-china",
            StorageType::SharePoint => "sharepoint",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorageType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown storage type: {}", s))
    }
}

/// Persisted drive record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveConfig {
    /// `None` until the drive is first saved
    pub id: Option<DriveId>,
    pub name: String,
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// Whether the drive is usable at all
    pub enable: bool,
    pub enable_cache: bool,
    pub auto_refresh_cache: bool,
    pub search_enable: bool,
    pub search_ignore_case: bool,
    /// Display order, ascending
    pub order_num: i32,
}

impl DriveConfig {
    /// New, unsaved drive of the given type with caching off
    pub fn new(name: impl Into<String>, storage_type: StorageType) -> Self {
        Self {
            id: None,
            name: name.into(),
            storage_type,
            enable: true,
            enable_cache: false,
            auto_refresh_cache: false,
            search_enable: false,
            search_ignore_case: false,
            order_num: 0,
        }
    }
}

/// One persisted parameter of a drive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Row identity, assigned by the store
    pub id: Option<u64>,
    pub drive_id: Option<DriveId>,
    pub key: String,
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub storage_type: StorageType,
}

impl StorageConfig {
    /// Unsaved row template for `key`
    pub fn new(storage_type: StorageType, key: impl Into<String>) -> Self {
        Self {
            id: None,
            drive_id: None,
            key: key.into(),
            value: None,
            storage_type,
        }
    }

    /// Builder-style value setter, mostly for fixtures
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Drive plus its bound strategy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveConfigDto {
    pub id: Option<DriveId>,
    pub name: String,
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    pub enable: bool,
    pub enable_cache: bool,
    pub auto_refresh_cache: bool,
    pub search_enable: bool,
    pub search_ignore_case: bool,
    pub order_num: i32,
    pub storage_strategy_config: StorageStrategyConfig,
}

impl DriveConfigDto {
    /// Compose a DTO from a persisted drive and its bound parameters
    pub fn compose(drive: DriveConfig, storage_strategy_config: StorageStrategyConfig) -> Self {
        Self {
            id: drive.id,
            name: drive.name,
            storage_type: drive.storage_type,
            enable: drive.enable,
            enable_cache: drive.enable_cache,
            auto_refresh_cache: drive.auto_refresh_cache,
            search_enable: drive.search_enable,
            search_ignore_case: drive.search_ignore_case,
            order_num: drive.order_num,
            storage_strategy_config,
        }
    }

    /// The drive half of the DTO
    pub fn drive_config(&self) -> DriveConfig {
        DriveConfig {
            id: self.id,
            name: self.name.clone(),
            storage_type: self.storage_type,
            enable: self.enable,
            enable_cache: self.enable_cache,
            auto_refresh_cache: self.auto_refresh_cache,
            search_enable: self.search_enable,
            search_ignore_case: self.search_ignore_case,
            order_num: self.order_num,
        }
    }
}

/// Snapshot of one drive's cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    pub cache_count: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub keys: BTreeSet<String>,
}

/// Kind of a listing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Folder,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    pub name: String,
    /// Folder path the entry lives in
    pub path: String,
    pub size: u64,
    /// Last modification, milliseconds since epoch
    pub modified_ms: Option<u64>,
    #[serde(rename = "type")]
    pub file_type: FileType,
}

impl FileItem {
    pub fn is_folder(&self) -> bool {
        self.file_type == FileType::Folder
    }
}
