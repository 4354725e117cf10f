//! Drive, parameter and cache data model

pub mod strategy;
pub mod types;

pub use strategy::StorageStrategyConfig;
pub use types::*;
