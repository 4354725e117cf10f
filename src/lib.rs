//! Drive configuration and listing cache core
//!
//! Persists drive definitions with their per-type storage parameters, keeps
//! one live backend instance per drive and fronts it with a per-drive
//! listing cache that can refresh itself on a schedule.

pub mod backend;
pub mod binder;
pub mod cache;
pub mod config;
pub mod drive;
pub mod error;
pub mod model;
pub mod schema;
pub mod service;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{BackendError, BackendRegistry};
pub use cache::{CacheManager, CacheSettings};
pub use config::DaemonConfig;
pub use error::{DriveError, Result, StoreError};
pub use service::{DriveConfigService, RestoreReport};
pub use store::{DriveStore, MemoryStore};
