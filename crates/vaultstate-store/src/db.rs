//! High-level API: load, migrate, write back.
//!
//! `StateDb` wraps a storage backend and a [`Migrator`]. Every load brings the
//! stored state up to the current version before handing it out, and persists
//! the result so the next start does not migrate again.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use vaultstate_migrate::{
//!     MigrationRegistry, MigrationStep, Migrator, MigratorConfig, PersistedState,
//! };
//! use vaultstate_store::{MemoryStore, StateDb};
//!
//! let registry = MigrationRegistry::new(vec![MigrationStep::modern_fn(2, |state, changed| {
//!     state.set_version(2);
//!     if let Some(map) = state.controllers_mut() {
//!         map.insert("AlertController".into(), json!({}));
//!         changed.insert("AlertController");
//!     }
//!     Ok(())
//! })])
//! .unwrap();
//! let migrator = Migrator::new(registry, MigratorConfig::default());
//!
//! let store = MemoryStore::with_state(PersistedState::from_value(json!({}), 1));
//! let mut db = StateDb::new(store, migrator);
//!
//! let outcome = db.load().unwrap();
//! assert_eq!(outcome.state.version(), 2);
//! assert_eq!(db.store().state().unwrap().version(), 2);
//! ```

use vaultstate_migrate::{MigrationOutcome, Migrator, PersistedState, StorageKind};

use crate::traits::StateStore;

/// Error type for `StateDb` operations.
///
/// A failing migration step is not an error here; it is reported through
/// [`MigrationOutcome::error`].
#[derive(Debug, thiserror::Error)]
pub enum DbError<E: std::error::Error + Send + Sync + 'static> {
    /// Error from the underlying storage backend.
    #[error("store error: {0}")]
    Store(#[source] E),
}

/// Configuration for `StateDb`.
#[derive(Debug, Clone)]
pub struct StateDbConfig {
    /// Persist the state after a load that applied steps or generated a
    /// fresh state. Defaults to `true`.
    pub write_back: bool,
}

impl Default for StateDbConfig {
    fn default() -> Self {
        Self { write_back: true }
    }
}

/// Storage backend plus migrator.
pub struct StateDb<S: StateStore> {
    store: S,
    migrator: Migrator,
    config: StateDbConfig,
}

impl<S: StateStore> StateDb<S> {
    /// Wrap `store` with default config.
    pub fn new(store: S, migrator: Migrator) -> Self {
        Self {
            store,
            migrator,
            config: StateDbConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: StateDbConfig) -> Self {
        self.config = config;
        self
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a mutable reference to the underlying store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Get the migrator.
    pub fn migrator(&self) -> &Migrator {
        &self.migrator
    }

    /// Load the stored state and migrate it to the current version.
    ///
    /// With nothing stored, a fresh state is generated. When write-back is
    /// on, the result is persisted if any step was applied (including the
    /// steps before a failure) or the state is new. Split-kind states only
    /// write the controllers the run reported.
    pub fn load(&mut self) -> Result<MigrationOutcome, DbError<S::Error>> {
        let stored = self.store.load().map_err(DbError::Store)?;
        let fresh = stored.is_none();
        let from_version = stored.as_ref().map(PersistedState::version);

        let outcome = self.migrator.migrate(stored);

        match &outcome.error {
            Some(err) => tracing::warn!(
                from = ?from_version,
                to = outcome.state.version(),
                failed = err.version(),
                "state migration halted"
            ),
            None if !outcome.applied.is_empty() => tracing::info!(
                from = ?from_version,
                to = outcome.state.version(),
                steps = outcome.applied.len(),
                changed = outcome.changed.len(),
                "state migrated"
            ),
            None => {}
        }

        if self.config.write_back && (fresh || !outcome.applied.is_empty()) {
            if !fresh && outcome.state.storage_kind() == StorageKind::Split {
                self.store
                    .save_changed(&outcome.state, &outcome.changed)
                    .map_err(DbError::Store)?;
            } else {
                self.store.save(&outcome.state).map_err(DbError::Store)?;
            }
        }

        Ok(outcome)
    }

    /// Persist `state` as-is.
    pub fn save(&mut self, state: &PersistedState) -> Result<(), DbError<S::Error>> {
        self.store.save(state).map_err(DbError::Store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use serde_json::{json, Map};
    use vaultstate_migrate::{
        ChangeSet, Meta, MigrationRegistry, MigrationStep, MigratorConfig, StepError,
    };

    fn touch(version: u32, controller: &'static str) -> MigrationStep {
        MigrationStep::modern_fn(version, move |state, changed| {
            state.set_version(version);
            if let Some(map) = state.controllers_mut() {
                map.insert(controller.into(), json!({ "v": version }));
            }
            changed.insert(controller);
            Ok(())
        })
    }

    fn migrator(steps: Vec<MigrationStep>) -> Migrator {
        Migrator::new(MigrationRegistry::new(steps).unwrap(), MigratorConfig::default())
    }

    fn split(data: serde_json::Value, version: u32) -> PersistedState {
        PersistedState {
            data,
            meta: Meta {
                version,
                storage_kind: StorageKind::Split,
            },
        }
    }

    #[test]
    fn fresh_store_gets_initial_state_written() {
        let mut initial = Map::new();
        initial.insert("OnboardingController".into(), json!({}));
        let migrator = migrator(vec![touch(1, "a"), touch(2, "b")]).with_initial_data(initial);

        let mut db = StateDb::new(MemoryStore::new(), migrator);
        let outcome = db.load().unwrap();

        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.state.version(), 2);
        assert_eq!(db.store().full_writes(), 1);
        assert_eq!(db.store().state(), Some(&outcome.state));
    }

    #[test]
    fn up_to_date_state_is_not_rewritten() {
        let store = MemoryStore::with_state(PersistedState::from_value(json!({}), 2));
        let mut db = StateDb::new(store, migrator(vec![touch(1, "a"), touch(2, "b")]));

        let outcome = db.load().unwrap();
        assert!(outcome.applied.is_empty());
        assert_eq!(db.store().full_writes(), 0);
    }

    #[test]
    fn migrated_data_state_is_written_in_full() {
        let store = MemoryStore::with_state(PersistedState::from_value(json!({ "x": {} }), 0));
        let mut db = StateDb::new(store, migrator(vec![touch(1, "a"), touch(2, "b")]));

        let outcome = db.load().unwrap();
        assert_eq!(outcome.applied, vec![1, 2]);
        assert_eq!(db.store().full_writes(), 1);
        assert_eq!(db.store().controller_writes(), 0);
        assert_eq!(db.store().state().unwrap().version(), 2);
    }

    #[test]
    fn migrated_split_state_writes_only_changed() {
        let store = MemoryStore::with_state(split(json!({ "x": {}, "y": {} }), 0));
        let mut db = StateDb::new(store, migrator(vec![touch(1, "a")]));

        let outcome = db.load().unwrap();
        assert_eq!(outcome.changed, ["a"].into_iter().collect::<ChangeSet>());
        assert_eq!(db.store().full_writes(), 0);
        assert_eq!(db.store().controller_writes(), 1);

        let stored = db.store().state().unwrap();
        assert_eq!(stored.version(), 1);
        assert_eq!(stored.controller("a"), Some(&json!({ "v": 1 })));
    }

    #[test]
    fn partial_progress_is_persisted() {
        let failing = MigrationStep::modern_fn(2, |_, _| -> Result<(), StepError> {
            Err("rpc unavailable".into())
        });
        let store = MemoryStore::with_state(PersistedState::from_value(json!({}), 0));
        let mut db = StateDb::new(store, migrator(vec![touch(1, "a"), failing]));

        let outcome = db.load().unwrap();
        assert_eq!(outcome.error.as_ref().map(|e| e.version()), Some(2));
        assert_eq!(db.store().state().unwrap().version(), 1);

        // The next load retries step 2.
        let again = db.load().unwrap();
        assert!(again.applied.is_empty());
        assert_eq!(again.error.map(|e| e.version()), Some(2));
    }

    #[test]
    fn write_back_can_be_disabled() {
        let store = MemoryStore::with_state(PersistedState::from_value(json!({}), 0));
        let mut db = StateDb::new(store, migrator(vec![touch(1, "a")]))
            .with_config(StateDbConfig { write_back: false });

        let outcome = db.load().unwrap();
        assert_eq!(outcome.state.version(), 1);
        assert_eq!(db.store().state().unwrap().version(), 0);
        assert_eq!(db.store().full_writes(), 0);
    }

    #[test]
    fn explicit_save_goes_to_store() {
        let mut db = StateDb::new(MemoryStore::new(), migrator(vec![]));
        db.save(&PersistedState::from_value(json!({ "k": 1 }), 0)).unwrap();
        assert_eq!(db.store_mut().full_writes(), 1);
        assert_eq!(db.migrator().default_version(), 0);
    }
}
