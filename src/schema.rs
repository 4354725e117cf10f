//! Attribute schema registry
//!
//! Versioned table of every recognized storage parameter: its persisted name,
//! its value kind and the storage types that use it. The binder resolves keys
//! through this table; new drives get their default row set from it.

use crate::model::{StorageConfig, StorageType};

/// Bumped whenever a field is added, renamed or retyped
pub const SCHEMA_VERSION: u32 = 1;

/// Name of the only flag-typed parameter
pub const IS_PRIVATE: &str = "isPrivate";

/// Value kind of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Opaque string
    Text,
    /// `true` / `false`
    Flag,
}

/// One schema entry
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub storage_types: &'static [StorageType],
}

impl FieldSpec {
    pub fn applies_to(&self, storage_type: StorageType) -> bool {
        self.storage_types.contains(&storage_type)
    }
}

use StorageType::*;

const OBJECT_STORES: &[StorageType] = &[Aliyun, Tencent, Qiniu, Huawei, Minio, S3];
const ALL_REMOTE: &[StorageType] = &[
    Aliyun, Tencent, Qiniu, Upyun, Huawei, Minio, S3, Ftp, OneDrive, OneDriveChina, SharePoint,
];
const PUBLIC_DOMAIN: &[StorageType] = &[Aliyun, Tencent, Qiniu, Upyun, Huawei, S3, Ftp];
const MICROSOFT: &[StorageType] = &[OneDrive, OneDriveChina, SharePoint];

/// The schema table, in default-row order
pub const FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "filePath", kind: FieldKind::Text, storage_types: &[Local] },
    FieldSpec { name: "endPoint", kind: FieldKind::Text, storage_types: &[Aliyun, Huawei, Minio, S3] },
    FieldSpec { name: "region", kind: FieldKind::Text, storage_types: &[Tencent, S3] },
    FieldSpec { name: "pathStyle", kind: FieldKind::Text, storage_types: &[S3] },
    FieldSpec { name: "accessKey", kind: FieldKind::Text, storage_types: &[Aliyun, Qiniu, Huawei, Minio, S3] },
    FieldSpec { name: "secretId", kind: FieldKind::Text, storage_types: &[Tencent] },
    FieldSpec { name: "secretKey", kind: FieldKind::Text, storage_types: OBJECT_STORES },
    FieldSpec { name: "bucketName", kind: FieldKind::Text, storage_types: &[Aliyun, Tencent, Qiniu, Upyun, Huawei, Minio, S3] },
    FieldSpec { name: "isPrivate", kind: FieldKind::Flag, storage_types: &[Aliyun, Tencent, Qiniu, Huawei, S3] },
    FieldSpec { name: "host", kind: FieldKind::Text, storage_types: &[Ftp] },
    FieldSpec { name: "port", kind: FieldKind::Text, storage_types: &[Ftp] },
    FieldSpec { name: "username", kind: FieldKind::Text, storage_types: &[Upyun, Ftp] },
    FieldSpec { name: "password", kind: FieldKind::Text, storage_types: &[Upyun, Ftp] },
    FieldSpec { name: "accessToken", kind: FieldKind::Text, storage_types: MICROSOFT },
    FieldSpec { name: "refreshToken", kind: FieldKind::Text, storage_types: MICROSOFT },
    FieldSpec { name: "siteType", kind: FieldKind::Text, storage_types: &[SharePoint] },
    FieldSpec { name: "siteName", kind: FieldKind::Text, storage_types: &[SharePoint] },
    FieldSpec { name: "siteId", kind: FieldKind::Text, storage_types: &[SharePoint] },
    FieldSpec { name: "listId", kind: FieldKind::Text, storage_types: &[SharePoint] },
    FieldSpec { name: "domain", kind: FieldKind::Text, storage_types: PUBLIC_DOMAIN },
    FieldSpec { name: "basePath", kind: FieldKind::Text, storage_types: ALL_REMOTE },
];

/// Look up a parameter by its persisted name
pub fn field(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.name == name)
}

/// Parameters a drive of `storage_type` carries
pub fn fields_for(storage_type: StorageType) -> impl Iterator<Item = &'static FieldSpec> {
    FIELDS.iter().filter(move |f| f.applies_to(storage_type))
}

/// Default (empty-valued) row set for a new drive of `storage_type`
pub fn default_rows(storage_type: StorageType) -> Vec<StorageConfig> {
    fields_for(storage_type)
        .map(|f| StorageConfig::new(storage_type, f.name))
        .collect()
}
