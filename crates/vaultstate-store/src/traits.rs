use vaultstate_migrate::{ChangeSet, PersistedState};

/// Core trait for state persistence.
///
/// A backend holds at most one state. It does not interpret controller
/// contents; versioning and migration are handled by
/// [`vaultstate-migrate`](https://docs.rs/vaultstate-migrate).
pub trait StateStore {
    /// Error type for this backend.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the stored state, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<PersistedState>, Self::Error>;

    /// Replace the stored state.
    fn save(&mut self, state: &PersistedState) -> Result<(), Self::Error>;

    /// Persist `state`, given that only the controllers in `changed` differ
    /// from what is stored.
    ///
    /// Backends that keep controllers apart override this to write only the
    /// named controllers when the state is split. The default writes
    /// everything.
    fn save_changed(
        &mut self,
        state: &PersistedState,
        changed: &ChangeSet,
    ) -> Result<(), Self::Error> {
        let _ = changed;
        self.save(state)
    }

    /// Check whether any state has been stored.
    fn exists(&self) -> Result<bool, Self::Error> {
        Ok(self.load()?.is_some())
    }
}
