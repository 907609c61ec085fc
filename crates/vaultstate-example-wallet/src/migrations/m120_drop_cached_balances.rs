use vaultstate_migrate::{legacy_migration, PersistedState, StepError};

/// Balances are fetched live now; the cache controller is gone.
#[legacy_migration(version = 120)]
pub fn drop_cached_balances(mut state: PersistedState) -> Result<PersistedState, StepError> {
    if let Some(map) = state.controllers_mut() {
        map.remove("CachedBalancesController");
    }
    Ok(state)
}
