use serde::{Deserialize, Serialize};

use crate::state::StorageKind;

/// Configuration for the [`Migrator`](crate::Migrator).
///
/// Deserializable so hosts can keep it next to the rest of their settings.
/// Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigratorConfig {
    /// First version written against the modern (in-place, change-reporting)
    /// contract. Steps below it must return a replacement state.
    ///
    /// Defaults to 0: every step is modern unless the host has legacy history.
    pub era_threshold: u32,
    /// Storage kind stamped onto freshly generated states.
    pub default_storage_kind: StorageKind,
}

impl MigratorConfig {
    /// Default configuration with an explicit era threshold.
    pub fn with_era_threshold(era_threshold: u32) -> Self {
        Self {
            era_threshold,
            ..Self::default()
        }
    }
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            era_threshold: 0,
            default_storage_kind: StorageKind::Data,
        }
    }
}
