//! # vaultstate-migrate
//!
//! Brings a wallet's persisted state from whatever version it was last saved
//! at up to the version the application currently expects.
//!
//! ## How It Works
//!
//! 1. Migration steps are registered once, each under a unique version.
//! 2. [`Migrator::migrate`] looks up the first step newer than the state's
//!    `meta.version`, runs it against a defensive clone, validates the result,
//!    and repeats until nothing is pending.
//! 3. The first failing step halts the run. The caller gets back the last state
//!    that validated, the set of changed controllers, and the error.
//!
//! ## Two Eras
//!
//! Steps below the configured era threshold are **legacy**: they take the whole
//! state and return a replacement, and cannot say what they touched. Steps at or
//! above it are **modern**: they mutate the state in place and report every
//! controller they changed. The [`MigrationStep`] enum keeps the two signatures
//! apart, so a modern step has no way to return a state.
//!
//! ## Example
//!
//! ```
//! use vaultstate_migrate::{
//!     MigrationRegistry, MigrationStep, Migrator, MigratorConfig, PersistedState,
//! };
//! use serde_json::json;
//!
//! let registry = MigrationRegistry::new(vec![
//!     MigrationStep::legacy_fn(1, |mut state| {
//!         state.set_version(1);
//!         Ok(state)
//!     }),
//!     MigrationStep::modern_fn(2, |state, changed| {
//!         state.set_version(2);
//!         if let Some(prefs) = state.controller_mut("PreferencesController") {
//!             prefs["theme"] = json!("dark");
//!             changed.insert("PreferencesController");
//!         }
//!         Ok(())
//!     }),
//! ])
//! .unwrap();
//!
//! let migrator = Migrator::new(registry, MigratorConfig::with_era_threshold(2));
//! let state = PersistedState::from_value(json!({ "PreferencesController": {} }), 0);
//!
//! let outcome = migrator.migrate(Some(state));
//! assert!(outcome.is_complete());
//! assert_eq!(outcome.state.version(), 2);
//! assert!(outcome.changed.contains("PreferencesController"));
//! ```

mod changes;
mod config;
mod error;
pub mod gate;
mod registry;
mod report;
mod runner;
mod state;
mod step;
pub mod validate;

pub use changes::{ChangeSet, ChangeTracker};
pub use config::MigratorConfig;
pub use error::{
    ContractViolation, FailureKind, MigrationError, RegistryError, ShapeViolation, StepError,
};
pub use registry::MigrationRegistry;
pub use report::{
    ErrorReporter, MigrationEvent, MigrationObserver, RecordedEvent, RecordingObserver,
    TracingObserver,
};
pub use runner::{MigrationOutcome, Migrator};
pub use state::{Meta, PersistedState, StorageKind};
pub use step::{Era, LegacyMigration, Migration, MigrationStep};

// Re-export proc macros when the `macros` feature is enabled.
#[cfg(feature = "macros")]
pub use vaultstate_migrate_macros::{legacy_migration, migration};

pub use serde_json::{Map, Value};
