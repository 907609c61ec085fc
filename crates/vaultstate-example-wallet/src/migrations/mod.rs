//! The wallet's migration history.
//!
//! Steps before [`ERA_THRESHOLD`] predate change reporting and return a
//! replacement state. Everything from 186 on mutates in place.

mod m054_retype_decimals;
mod m120_drop_cached_balances;
mod m186_megaeth_testnet;
mod m187_test_network_preference;

use vaultstate_migrate::{MigrationRegistry, MigratorConfig, RegistryError, StorageKind};

pub use m186_megaeth_testnet::{MEGAETH_TESTNET_V1_CHAIN_ID, MEGAETH_TESTNET_V2_CHAIN_ID};

/// First version written against the in-place contract.
pub const ERA_THRESHOLD: u32 = 186;

/// Every known step.
pub fn registry() -> Result<MigrationRegistry, RegistryError> {
    MigrationRegistry::new(vec![
        m054_retype_decimals::register_retype_decimals(),
        m120_drop_cached_balances::register_drop_cached_balances(),
        m186_megaeth_testnet::register_backfill_megaeth_testnet(),
        m187_test_network_preference::register_default_test_network_preference(),
    ])
}

/// Migrator configuration for this wallet.
pub fn config(storage_kind: StorageKind) -> MigratorConfig {
    MigratorConfig {
        era_threshold: ERA_THRESHOLD,
        default_storage_kind: storage_kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultstate_migrate::Era;

    #[test]
    fn history_is_ordered_and_respects_eras() {
        let registry = registry().unwrap();
        assert_eq!(registry.registered_versions(), vec![54, 120, 186, 187]);
        for step in registry.steps() {
            assert_eq!(step.kind(), Era::of(step.version(), ERA_THRESHOLD));
        }
    }
}
