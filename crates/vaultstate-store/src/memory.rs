use vaultstate_migrate::{ChangeSet, PersistedState, StorageKind};

use crate::traits::StateStore;

/// In-memory storage backend.
///
/// Nothing touches disk. Write counters make it useful for checking how much
/// a caller persisted after a migration run.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use vaultstate_migrate::PersistedState;
/// use vaultstate_store::{MemoryStore, StateStore};
///
/// let mut store = MemoryStore::new();
/// assert!(store.load().unwrap().is_none());
///
/// store.save(&PersistedState::from_value(json!({}), 1)).unwrap();
/// assert_eq!(store.full_writes(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Option<PersistedState>,
    full_writes: usize,
    controller_writes: usize,
}

/// Error type for the in-memory backend.
///
/// This backend never actually fails, but the trait requires an error type.
#[derive(Debug, Clone, thiserror::Error)]
#[error("MemoryStore error: {0}")]
pub struct MemoryError(String);

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `state`. Counters start at zero.
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    /// The stored state, without cloning.
    pub fn state(&self) -> Option<&PersistedState> {
        self.state.as_ref()
    }

    /// Number of times the whole state was written.
    pub fn full_writes(&self) -> usize {
        self.full_writes
    }

    /// Number of individual controllers written or removed by split saves.
    pub fn controller_writes(&self) -> usize {
        self.controller_writes
    }
}

impl StateStore for MemoryStore {
    type Error = MemoryError;

    fn load(&self) -> Result<Option<PersistedState>, Self::Error> {
        Ok(self.state.clone())
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), Self::Error> {
        self.state = Some(state.clone());
        self.full_writes += 1;
        Ok(())
    }

    fn save_changed(
        &mut self,
        state: &PersistedState,
        changed: &ChangeSet,
    ) -> Result<(), Self::Error> {
        if state.storage_kind() != StorageKind::Split {
            return self.save(state);
        }
        let Some(incoming) = state.controllers() else {
            return self.save(state);
        };
        let Some(stored) = self.state.as_mut() else {
            return self.save(state);
        };
        let Some(target) = stored.data.as_object_mut() else {
            return self.save(state);
        };

        for name in changed {
            match incoming.get(name) {
                Some(value) => {
                    target.insert(name.clone(), value.clone());
                }
                None => {
                    target.remove(name);
                }
            }
            self.controller_writes += 1;
        }
        stored.meta = state.meta.clone();
        Ok(())
    }
}
