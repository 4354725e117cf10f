//! Dynamic attribute binder
//!
//! Converts between persisted `StorageConfig` rows and the typed
//! `StorageStrategyConfig`, resolving each row key through the schema table.
//! Binding is lenient: rows the schema does not recognize are reported and
//! skipped, never fatal. No I/O happens here.

use thiserror::Error;
use tracing::warn;

use crate::model::{StorageConfig, StorageStrategyConfig};
use crate::schema::{self, FieldKind};

/// A row that could not be bound. Logged, never surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingAnomaly {
    #[error("no schema field named `{0}`")]
    UnknownKey(String),

    #[error("`{key}` expects a boolean literal, got `{value}`")]
    InvalidFlag { key: String, value: String },
}

/// Bind rows onto a typed config, returning the anomalies met on the way
pub fn bind(rows: &[StorageConfig]) -> (StorageStrategyConfig, Vec<BindingAnomaly>) {
    let mut config = StorageStrategyConfig::default();
    let mut anomalies = Vec::new();

    for row in rows {
        let Some(spec) = schema::field(&row.key) else {
            anomalies.push(BindingAnomaly::UnknownKey(row.key.clone()));
            continue;
        };

        match spec.kind {
            FieldKind::Flag => match row.value.as_deref().map(parse_flag) {
                None => config.is_private = None,
                Some(Some(flag)) => config.is_private = Some(flag),
                Some(None) => anomalies.push(BindingAnomaly::InvalidFlag {
                    key: row.key.clone(),
                    value: row.value.clone().unwrap_or_default(),
                }),
            },
            FieldKind::Text => match config.text_mut(&row.key) {
                Some(slot) => *slot = row.value.clone(),
                None => anomalies.push(BindingAnomaly::UnknownKey(row.key.clone())),
            },
        }
    }

    (config, anomalies)
}

/// Rows to typed config. Anomalies are logged and the rows skipped.
pub fn to_typed(rows: &[StorageConfig]) -> StorageStrategyConfig {
    let (config, anomalies) = bind(rows);
    for anomaly in &anomalies {
        warn!(anomaly = %anomaly, "Skipped storage parameter while binding");
    }
    config
}

/// Overwrite each row's value from `config`.
///
/// Only `value` changes; key, ids and type are left as given. Rows whose key
/// the schema does not know keep their current value.
pub fn to_rows(config: &StorageStrategyConfig, mut rows: Vec<StorageConfig>) -> Vec<StorageConfig> {
    for row in rows.iter_mut() {
        let Some(spec) = schema::field(&row.key) else {
            warn!(
                anomaly = %BindingAnomaly::UnknownKey(row.key.clone()),
                "Kept storage parameter unchanged while unbinding"
            );
            continue;
        };

        row.value = match spec.kind {
            FieldKind::Flag => config.is_private.map(format_flag),
            FieldKind::Text => match config.text(&row.key) {
                Some(value) => value.clone(),
                None => {
                    warn!(key = %row.key, "Schema field has no typed counterpart");
                    continue;
                }
            },
        };
    }
    rows
}

fn parse_flag(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn format_flag(flag: bool) -> String {
    flag.to_string()
}
