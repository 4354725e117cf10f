//! Drive configuration service
//!
//! Facade over the store, binder, service registry and cache. Configuration
//! writes commit atomically first; registry (re)initialization and cache
//! scheduling follow the commit, so persisted flags are always the source of
//! truth and `restore()` can rebuild runtime state from them after a restart.

use std::sync::{Arc, Weak};

use tracing::{debug, info, warn};

use crate::backend::BackendRegistry;
use crate::binder;
use crate::cache::{CacheManager, CacheSettings, CacheSource};
use crate::drive::DriveRegistry;
use crate::error::{DriveError, Result};
use crate::model::{CacheInfo, DriveConfig, DriveConfigDto, DriveId, Listing, StorageType};
use crate::store::DriveStore;

/// What `restore()` managed to bring back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub initialized: Vec<DriveId>,
    pub failed: Vec<DriveId>,
    pub auto_refreshing: Vec<DriveId>,
}

pub struct DriveConfigService {
    store: Arc<dyn DriveStore>,
    backends: Arc<BackendRegistry>,
    cache: Arc<CacheManager>,
    registry: Arc<DriveRegistry>,
}

impl DriveConfigService {
    pub fn new(store: Arc<dyn DriveStore>, backends: BackendRegistry, settings: CacheSettings) -> Self {
        let backends = Arc::new(backends);
        let cache = Arc::new(CacheManager::new(settings));
        let registry = Arc::new(DriveRegistry::new(
            Arc::clone(&store),
            Arc::clone(&backends),
            Arc::clone(&cache),
        ));
        Self {
            store,
            backends,
            cache,
            registry,
        }
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<DriveRegistry> {
        &self.registry
    }

    /// Handle the refresh tasks use to reach live drive instances
    fn refresh_source(&self) -> Weak<dyn CacheSource> {
        let source: Arc<dyn CacheSource> = self.registry.clone();
        Arc::downgrade(&source)
    }

    /// Load a drive or fail with `NotFound`
    async fn require(&self, id: DriveId) -> Result<DriveConfig> {
        self.store.find_by_id(id).await?.ok_or(DriveError::NotFound(id))
    }

    pub async fn list(&self) -> Result<Vec<DriveConfig>> {
        Ok(self.store.list().await?)
    }

    pub async fn find_by_id(&self, id: DriveId) -> Result<DriveConfig> {
        self.require(id).await
    }

    /// Drive plus its parameters bound to a typed strategy config
    pub async fn find_drive_config_dto_by_id(&self, id: DriveId) -> Result<DriveConfigDto> {
        let drive = self.require(id).await?;
        let rows = self.store.find_storage_configs(id).await?;
        let config = binder::to_typed(&rows);
        Ok(DriveConfigDto::compose(drive, config))
    }

    pub async fn find_storage_type_by_id(&self, id: DriveId) -> Result<StorageType> {
        Ok(self.require(id).await?.storage_type)
    }

    pub async fn find_by_type(&self, storage_type: StorageType) -> Result<Vec<DriveConfig>> {
        Ok(self.store.find_by_type(storage_type).await?)
    }

    /// Create (no id) or update a drive and its parameters.
    ///
    /// Updates keep the drive's existing row set so custom keys survive,
    /// unless the storage type changed. If the backend cannot initialize
    /// afterwards the call fails with `Initialization`; the committed rows
    /// are kept and no refresh schedule is started.
    pub async fn save(&self, dto: DriveConfigDto) -> Result<DriveId> {
        let previous = match dto.id {
            Some(id) => Some(self.require(id).await?),
            None => None,
        };
        let update = previous.is_some();
        let drive = dto.drive_config();
        let storage_type = drive.storage_type;

        let templates = match (&previous, dto.id) {
            (Some(prev), Some(id)) if prev.storage_type == storage_type => {
                self.store.find_storage_configs(id).await?
            }
            (Some(prev), Some(id)) => {
                info!(
                    drive_id = id,
                    from = %prev.storage_type,
                    to = %storage_type,
                    "Storage type changed, resetting parameters"
                );
                self.backends.default_parameters(storage_type)
            }
            _ => self.backends.default_parameters(storage_type),
        };

        let mut rows = binder::to_rows(&dto.storage_strategy_config, templates);
        for row in rows.iter_mut() {
            row.storage_type = storage_type;
        }
        let drive_id = self.store.save_with_storage(drive.clone(), rows).await?;
        info!(drive_id = drive_id, storage_type = %storage_type, update = update, "Drive configuration saved");

        let service = self.registry.init(drive_id).await?;

        self.cache.set_enabled(drive_id, drive.enable_cache).await;
        if update {
            // listings came from the previous backend instance
            self.cache.clear(drive_id).await;
        }

        if !service.is_initialized() {
            self.cache.stop_auto_refresh(drive_id).await;
            return Err(DriveError::Initialization { drive_id });
        }

        if drive.auto_refresh_cache {
            self.cache.start_auto_refresh(drive_id, self.refresh_source()).await;
        } else if update {
            self.cache.stop_auto_refresh(drive_id).await;
        }

        Ok(drive_id)
    }

    /// Delete a drive and its parameters, then tear down its runtime state.
    ///
    /// Teardown runs even when the store delete fails, so no refresh task
    /// outlives the call.
    pub async fn delete_by_id(&self, id: DriveId) -> Result<()> {
        debug!(drive_id = id, "Deleting drive");
        self.require(id).await?;

        let deleted = self.store.delete_by_id(id).await;

        self.cache.remove_drive(id).await;
        self.registry.destroy(id).await;

        deleted?;
        info!(drive_id = id, "Drive deleted");
        Ok(())
    }

    pub async fn update_cache_status(&self, id: DriveId, enable_cache: bool) -> Result<()> {
        let mut drive = self.require(id).await?;
        drive.enable_cache = enable_cache;
        self.store.save(drive).await?;
        self.cache.set_enabled(id, enable_cache).await;
        info!(drive_id = id, enable_cache = enable_cache, "Cache status updated");
        Ok(())
    }

    /// Persist the auto-refresh flag and bring the scheduler in line with it
    pub async fn update_auto_refresh_cache_status(&self, id: DriveId, auto_refresh: bool) -> Result<()> {
        let mut drive = self.require(id).await?;
        drive.auto_refresh_cache = auto_refresh;
        self.store.save(drive).await?;

        if auto_refresh {
            self.cache.start_auto_refresh(id, self.refresh_source()).await;
        } else {
            self.cache.stop_auto_refresh(id).await;
        }
        Ok(())
    }

    pub async fn start_auto_cache_refresh(&self, id: DriveId) -> Result<()> {
        self.update_auto_refresh_cache_status(id, true).await
    }

    pub async fn stop_auto_cache_refresh(&self, id: DriveId) -> Result<()> {
        self.update_auto_refresh_cache_status(id, false).await
    }

    pub async fn find_cache_info(&self, id: DriveId) -> Result<CacheInfo> {
        self.require(id).await?;
        Ok(self.cache.info(id))
    }

    /// Evict `key` and repopulate it from the backend right away
    pub async fn refresh_cache(&self, id: DriveId, key: &str) -> Result<Listing> {
        debug!(drive_id = id, key = key, "Manual cache refresh");
        self.require(id).await?;
        self.registry.get(id).await?;
        self.cache.refresh(id, key, self.registry.as_ref()).await
    }

    pub async fn clear_cache(&self, id: DriveId) -> Result<()> {
        self.require(id).await?;
        self.cache.clear(id).await;
        Ok(())
    }

    /// List a folder of a drive through its live instance
    pub async fn file_list(&self, id: DriveId, key: &str) -> Result<Listing> {
        self.require(id).await?;
        self.registry.get(id).await?.file_list(key).await
    }

    /// Rebuild runtime state from persisted drives after a restart
    pub async fn restore(&self) -> Result<RestoreReport> {
        let mut report = RestoreReport::default();

        for drive in self.store.list().await? {
            let Some(id) = drive.id else { continue };

            match self.registry.init(id).await {
                Ok(service) if service.is_initialized() => report.initialized.push(id),
                Ok(_) => {
                    warn!(drive_id = id, "Drive failed to initialize on restore, skipping");
                    report.failed.push(id);
                    continue;
                }
                Err(e) => {
                    warn!(drive_id = id, error = %e, "Could not restore drive");
                    report.failed.push(id);
                    continue;
                }
            }

            self.cache.set_enabled(id, drive.enable_cache).await;
            if drive.auto_refresh_cache {
                self.cache.start_auto_refresh(id, self.refresh_source()).await;
                report.auto_refreshing.push(id);
            }
        }

        info!(
            initialized = report.initialized.len(),
            failed = report.failed.len(),
            auto_refreshing = report.auto_refreshing.len(),
            "Drives restored"
        );
        Ok(report)
    }

    /// Stop all refresh schedules and release every drive instance
    pub async fn shutdown(&self) {
        self.cache.shutdown().await;
        self.registry.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::model::{StorageConfig, StorageStrategyConfig};
    use crate::store::MemoryStore;
    use crate::testing::{FakeProvider, FakeState};
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn settings() -> CacheSettings {
        CacheSettings {
            ttl: Duration::from_secs(3600),
            max_capacity: 100,
            refresh_interval: Duration::from_secs(60),
        }
    }

    fn service_with(store: Arc<dyn DriveStore>) -> (DriveConfigService, Arc<FakeState>) {
        let (provider, state) = FakeProvider::new(StorageType::S3);
        let mut backends = BackendRegistry::new();
        backends.register(provider);
        (DriveConfigService::new(store, backends, settings()), state)
    }

    fn service() -> (DriveConfigService, Arc<FakeState>) {
        service_with(Arc::new(MemoryStore::new()))
    }

    fn s3_dto(enable_cache: bool, auto_refresh: bool) -> DriveConfigDto {
        let mut drive = DriveConfig::new("media", StorageType::S3);
        drive.enable_cache = enable_cache;
        drive.auto_refresh_cache = auto_refresh;
        DriveConfigDto::compose(
            drive,
            StorageStrategyConfig {
                end_point: Some("s3.example.com".to_string()),
                bucket_name: Some("media".to_string()),
                is_private: Some(true),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_create_then_populate_cache() {
        let (service, state) = service();
        let id = service.save(s3_dto(true, false)).await.unwrap();

        assert_eq!(service.find_cache_info(id).await.unwrap(), CacheInfo::default());

        service.file_list(id, "/docs").await.unwrap();
        assert_eq!(service.cache().miss_count(id), 1);
        assert!(service.cache().get(id, "/docs").await.is_some());

        let info = service.find_cache_info(id).await.unwrap();
        assert_eq!(info.cache_count, 1);
        assert_eq!(info.hit_count, 1);
        assert_eq!(info.miss_count, 1);
        assert!(info.keys.contains("/docs"));
        assert_eq!(state.listing_calls(), 1);
    }

    #[tokio::test]
    async fn test_create_persists_bound_parameters() {
        let (service, _) = service();
        let dto = s3_dto(false, false);
        let id = service.save(dto.clone()).await.unwrap();

        let loaded = service.find_drive_config_dto_by_id(id).await.unwrap();
        assert_eq!(loaded.id, Some(id));
        assert_eq!(loaded.storage_strategy_config, dto.storage_strategy_config);
        assert_eq!(service.find_storage_type_by_id(id).await.unwrap(), StorageType::S3);

        let rows = service.store.find_storage_configs(id).await.unwrap();
        let keys: Vec<_> = rows.iter().map(|r| r.key.as_str()).collect();
        assert!(keys.contains(&"endPoint") && keys.contains(&"isPrivate"));
        assert!(rows.iter().all(|r| r.storage_type == StorageType::S3));
        let private = rows.iter().find(|r| r.key == "isPrivate").unwrap();
        assert_eq!(private.value.as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn test_update_keeps_custom_rows() {
        let (service, _) = service();
        let id = service.save(s3_dto(false, false)).await.unwrap();

        // a parameter the schema does not know about
        let drive = service.find_by_id(id).await.unwrap();
        let mut rows = service.store.find_storage_configs(id).await.unwrap();
        rows.push(StorageConfig::new(StorageType::S3, "customHeader").with_value("x-1"));
        service.store.save_with_storage(drive, rows).await.unwrap();

        let mut dto = service.find_drive_config_dto_by_id(id).await.unwrap();
        dto.storage_strategy_config.bucket_name = Some("archive".to_string());
        dto.name = "archive".to_string();
        service.save(dto).await.unwrap();

        let rows = service.store.find_storage_configs(id).await.unwrap();
        let custom = rows.iter().find(|r| r.key == "customHeader").unwrap();
        assert_eq!(custom.value.as_deref(), Some("x-1"));
        let bucket = rows.iter().find(|r| r.key == "bucketName").unwrap();
        assert_eq!(bucket.value.as_deref(), Some("archive"));
        assert_eq!(service.find_by_id(id).await.unwrap().name, "archive");
    }

    #[tokio::test]
    async fn test_type_change_resets_parameters() {
        let (service, _) = service();
        let id = service.save(s3_dto(false, false)).await.unwrap();

        let mut dto = service.find_drive_config_dto_by_id(id).await.unwrap();
        dto.storage_type = StorageType::Local;
        dto.storage_strategy_config = StorageStrategyConfig {
            file_path: Some("/nowhere/at/all".to_string()),
            ..Default::default()
        };
        // no local connector registered here, so init fails after commit
        let err = service.save(dto).await.unwrap_err();
        assert!(matches!(err, DriveError::Initialization { .. }));

        let rows = service.store.find_storage_configs(id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "filePath");
        assert_eq!(rows[0].storage_type, StorageType::Local);
    }

    #[tokio::test]
    async fn test_update_of_missing_drive_is_not_found() {
        let (service, _) = service();
        let mut dto = s3_dto(false, false);
        dto.id = Some(77);
        assert!(matches!(service.save(dto).await, Err(DriveError::NotFound(77))));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_init_keeps_rows_and_starts_nothing() {
        let (service, state) = service();
        state.healthy.store(false, Ordering::SeqCst);

        let err = service.save(s3_dto(true, true)).await.unwrap_err();
        let DriveError::Initialization { drive_id } = err else {
            panic!("expected initialization error, got {err:?}");
        };

        let dto = service.find_drive_config_dto_by_id(drive_id).await.unwrap();
        assert_eq!(dto.storage_strategy_config.bucket_name.as_deref(), Some("media"));
        assert!(!service.store.find_storage_configs(drive_id).await.unwrap().is_empty());
        assert!(!service.cache().is_auto_refreshing(drive_id).await);
        assert!(matches!(
            service.file_list(drive_id, "/").await,
            Err(DriveError::Initialization { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_update_still_applies_cache_flag() {
        let (service, state) = service();
        let id = service.save(s3_dto(true, false)).await.unwrap();
        service.file_list(id, "/docs").await.unwrap();
        assert!(service.cache().key_set(id).contains("/docs"));

        state.healthy.store(false, Ordering::SeqCst);
        let mut dto = service.find_drive_config_dto_by_id(id).await.unwrap();
        dto.enable_cache = false;
        let err = service.save(dto).await.unwrap_err();
        assert!(matches!(err, DriveError::Initialization { drive_id } if drive_id == id));

        assert!(!service.find_by_id(id).await.unwrap().enable_cache);
        assert!(!service.cache().is_enabled(id));
        assert!(service.find_cache_info(id).await.unwrap().keys.is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_drops_listings_of_old_instance() {
        let (service, state) = service();
        let id = service.save(s3_dto(true, false)).await.unwrap();
        service.file_list(id, "/docs").await.unwrap();

        state.healthy.store(false, Ordering::SeqCst);
        let dto = service.find_drive_config_dto_by_id(id).await.unwrap();
        assert!(service.save(dto).await.is_err());

        assert!(service.cache().is_enabled(id));
        assert!(service.cache().key_set(id).is_empty());
    }

    #[tokio::test]
    async fn test_delete_makes_every_read_not_found() {
        let (service, state) = service();
        let id = service.save(s3_dto(true, true)).await.unwrap();
        service.file_list(id, "/docs").await.unwrap();
        service.file_list(id, "/pics").await.unwrap();
        assert_eq!(service.find_cache_info(id).await.unwrap().cache_count, 2);
        assert!(service.cache().is_auto_refreshing(id).await);

        service.delete_by_id(id).await.unwrap();

        assert!(matches!(service.find_by_id(id).await, Err(DriveError::NotFound(_))));
        assert!(matches!(service.find_drive_config_dto_by_id(id).await, Err(DriveError::NotFound(_))));
        assert!(matches!(service.find_storage_type_by_id(id).await, Err(DriveError::NotFound(_))));
        assert!(matches!(service.find_cache_info(id).await, Err(DriveError::NotFound(_))));
        assert!(matches!(service.refresh_cache(id, "/docs").await, Err(DriveError::NotFound(_))));
        assert!(matches!(service.file_list(id, "/docs").await, Err(DriveError::NotFound(_))));
        assert!(matches!(service.clear_cache(id).await, Err(DriveError::NotFound(_))));
        assert!(matches!(service.update_cache_status(id, true).await, Err(DriveError::NotFound(_))));
        assert!(matches!(service.delete_by_id(id).await, Err(DriveError::NotFound(_))));

        assert!(!service.cache().is_auto_refreshing(id).await);
        assert!(service.cache().key_set(id).is_empty());
        assert!(matches!(service.registry().get(id).await, Err(DriveError::NotInitialized(_))));
        assert!(service.store.find_storage_configs(id).await.unwrap().is_empty());
        assert_eq!(state.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_auto_refresh_on_update_cancels_schedule() {
        let (service, state) = service();
        let id = service.save(s3_dto(true, true)).await.unwrap();
        service.file_list(id, "/docs").await.unwrap();
        assert_eq!(state.listing_calls(), 1);

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(state.listing_calls(), 2);

        let mut dto = service.find_drive_config_dto_by_id(id).await.unwrap();
        dto.auto_refresh_cache = false;
        service.save(dto).await.unwrap();
        assert!(!service.cache().is_auto_refreshing(id).await);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(state.listing_calls(), 2);
    }

    #[tokio::test]
    async fn test_toggles_persist_and_drive_scheduler() {
        let (service, _) = service();
        let id = service.save(s3_dto(true, false)).await.unwrap();
        service.file_list(id, "/docs").await.unwrap();

        service.update_cache_status(id, false).await.unwrap();
        assert!(!service.find_by_id(id).await.unwrap().enable_cache);
        assert!(service.cache().key_set(id).is_empty());

        service.file_list(id, "/docs").await.unwrap();
        assert!(service.cache().key_set(id).is_empty());

        service.update_auto_refresh_cache_status(id, true).await.unwrap();
        assert!(service.find_by_id(id).await.unwrap().auto_refresh_cache);
        assert!(service.cache().is_auto_refreshing(id).await);

        service.stop_auto_cache_refresh(id).await.unwrap();
        assert!(!service.find_by_id(id).await.unwrap().auto_refresh_cache);
        assert!(!service.cache().is_auto_refreshing(id).await);

        service.start_auto_cache_refresh(id).await.unwrap();
        service.start_auto_cache_refresh(id).await.unwrap();
        assert!(service.cache().is_auto_refreshing(id).await);
        service.shutdown().await;
        assert!(!service.cache().is_auto_refreshing(id).await);
    }

    #[tokio::test]
    async fn test_manual_refresh_repopulates_synchronously() {
        let (service, state) = service();
        let id = service.save(s3_dto(true, false)).await.unwrap();
        let first = service.file_list(id, "/docs").await.unwrap();
        assert_eq!(first[0].name, "/docs#1");

        let refreshed = service.refresh_cache(id, "/docs").await.unwrap();
        assert_eq!(refreshed[0].name, "/docs#2");
        assert_eq!(service.cache().get(id, "/docs").await.unwrap()[0].name, "/docs#2");

        state.fail_listing.store(true, Ordering::SeqCst);
        let err = service.refresh_cache(id, "/docs").await.unwrap_err();
        assert!(matches!(err, DriveError::Refresh { .. }));
        assert!(!service.cache().key_set(id).contains("/docs"));
    }

    #[tokio::test]
    async fn test_counters_survive_clear() {
        let (service, _) = service();
        let id = service.save(s3_dto(true, false)).await.unwrap();
        service.file_list(id, "/a").await.unwrap();
        service.file_list(id, "/a").await.unwrap();

        service.clear_cache(id).await.unwrap();

        let info = service.find_cache_info(id).await.unwrap();
        assert_eq!(info.cache_count, 0);
        assert!(info.keys.is_empty());
        assert_eq!((info.hit_count, info.miss_count), (1, 1));
    }

    #[tokio::test]
    async fn test_list_and_find_by_type() {
        let (service, _) = service();
        let a = service.save(s3_dto(false, false)).await.unwrap();
        let b = service.save(s3_dto(false, false)).await.unwrap();

        let ids: Vec<_> = service.list().await.unwrap().into_iter().filter_map(|d| d.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(service.find_by_type(StorageType::S3).await.unwrap().len(), 2);
        assert!(service.find_by_type(StorageType::Ftp).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_rebuilds_from_persisted_flags() {
        let store: Arc<dyn DriveStore> = Arc::new(MemoryStore::new());
        let (first, _) = service_with(Arc::clone(&store));
        let auto = first.save(s3_dto(true, true)).await.unwrap();
        let plain = first.save(s3_dto(false, false)).await.unwrap();
        first.shutdown().await;

        let (second, _) = service_with(store);
        let report = second.restore().await.unwrap();

        assert_eq!(report.initialized, vec![auto, plain]);
        assert_eq!(report.auto_refreshing, vec![auto]);
        assert!(report.failed.is_empty());
        assert!(second.cache().is_auto_refreshing(auto).await);
        assert!(second.cache().is_enabled(auto));
        assert!(!second.cache().is_auto_refreshing(plain).await);
        assert!(second.registry().get(plain).await.is_ok());
        second.shutdown().await;
    }

    #[tokio::test]
    async fn test_restore_skips_drives_that_fail_to_initialize() {
        let store: Arc<dyn DriveStore> = Arc::new(MemoryStore::new());
        let (first, _) = service_with(Arc::clone(&store));
        let id = first.save(s3_dto(true, true)).await.unwrap();
        first.shutdown().await;

        let (second, state) = service_with(store);
        state.healthy.store(false, Ordering::SeqCst);
        let report = second.restore().await.unwrap();

        assert_eq!(report.failed, vec![id]);
        assert!(report.initialized.is_empty());
        assert!(report.auto_refreshing.is_empty());
        assert!(!second.cache().is_auto_refreshing(id).await);
        assert!(!second.registry().get(id).await.unwrap().is_initialized());
    }

    /// Store whose multi-table writes always fail
    struct BrokenStore(MemoryStore);

    #[async_trait]
    impl DriveStore for BrokenStore {
        async fn list(&self) -> Result<Vec<DriveConfig>, StoreError> {
            self.0.list().await
        }
        async fn find_by_id(&self, id: DriveId) -> Result<Option<DriveConfig>, StoreError> {
            self.0.find_by_id(id).await
        }
        async fn find_by_type(&self, t: StorageType) -> Result<Vec<DriveConfig>, StoreError> {
            self.0.find_by_type(t).await
        }
        async fn find_storage_configs(&self, id: DriveId) -> Result<Vec<StorageConfig>, StoreError> {
            self.0.find_storage_configs(id).await
        }
        async fn save(&self, drive: DriveConfig) -> Result<DriveConfig, StoreError> {
            self.0.save(drive).await
        }
        async fn save_with_storage(
            &self,
            _drive: DriveConfig,
            _rows: Vec<StorageConfig>,
        ) -> Result<DriveId, StoreError> {
            Err(StoreError::Persistence("disk full".to_string()))
        }
        async fn delete_by_id(&self, _id: DriveId) -> Result<bool, StoreError> {
            Err(StoreError::Persistence("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_transaction_failures_surface() {
        let inner = MemoryStore::new();
        let mut drive = DriveConfig::new("media", StorageType::S3);
        drive.enable_cache = true;
        let existing = inner.save(drive).await.unwrap().id.unwrap();
        let (service, state) = service_with(Arc::new(BrokenStore(inner)));

        let err = service.save(s3_dto(true, true)).await.unwrap_err();
        assert!(matches!(err, DriveError::Transaction(_)));
        assert_eq!(service.list().await.unwrap().len(), 1);
        assert_eq!(state.connects.load(Ordering::SeqCst), 0);

        // teardown still runs when the delete itself fails
        service.registry().init(existing).await.unwrap();
        service.cache().set_enabled(existing, true).await;
        service.start_auto_cache_refresh(existing).await.unwrap();
        let err = service.delete_by_id(existing).await.unwrap_err();
        assert!(matches!(err, DriveError::Transaction(_)));
        assert!(!service.cache().is_auto_refreshing(existing).await);
        assert!(service.registry().get(existing).await.is_err());
    }
}
