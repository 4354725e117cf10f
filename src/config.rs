//! Daemon configuration from environment variables

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheSettings;

pub const STORE_VAR: &str = "DRIVECACHE_STORE";
pub const CACHE_TTL_VAR: &str = "DRIVECACHE_CACHE_TTL_SECS";
pub const CACHE_CAPACITY_VAR: &str = "DRIVECACHE_CACHE_CAPACITY";
pub const REFRESH_INTERVAL_VAR: &str = "DRIVECACHE_REFRESH_INTERVAL_SECS";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("No config directory available, set DRIVECACHE_STORE")]
    NoConfigDir,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// JSON snapshot backing the drive store
    pub store_path: PathBuf,
    pub cache: CacheSettings,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from any variable source; unset variables take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = CacheSettings::default();

        let store_path = match lookup(STORE_VAR).filter(|v| !v.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => default_store_path()?,
        };

        let ttl = number(&lookup, CACHE_TTL_VAR)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.ttl);
        let max_capacity = number(&lookup, CACHE_CAPACITY_VAR)?.unwrap_or(defaults.max_capacity);
        let refresh_interval = number(&lookup, REFRESH_INTERVAL_VAR)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.refresh_interval);

        if ttl.is_zero() {
            return Err(ConfigError::Zero(CACHE_TTL_VAR));
        }
        if refresh_interval.is_zero() {
            return Err(ConfigError::Zero(REFRESH_INTERVAL_VAR));
        }

        Ok(Self {
            store_path,
            cache: CacheSettings {
                ttl,
                max_capacity,
                refresh_interval,
            },
        })
    }
}

fn number<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}

fn default_store_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("drivecache").join("drives.json"))
        .ok_or(ConfigError::NoConfigDir)
}
