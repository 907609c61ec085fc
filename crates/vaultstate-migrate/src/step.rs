use std::fmt;

use crate::changes::ChangeSet;
use crate::error::StepError;
use crate::state::PersistedState;

/// Which calling convention a version falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Era {
    /// Below the threshold: return a full replacement state.
    Legacy,
    /// At or above the threshold: mutate in place and report changed controllers.
    Modern,
}

impl Era {
    /// The era `version` belongs to under `threshold`.
    pub fn of(version: u32, threshold: u32) -> Self {
        if version < threshold {
            Self::Legacy
        } else {
            Self::Modern
        }
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::Modern => f.write_str("modern"),
        }
    }
}

/// A migration written against the legacy contract.
///
/// Receives the whole state (already a private copy) and returns its
/// replacement. It must stamp `meta.version` with its own version.
pub trait LegacyMigration: Send + Sync {
    /// The version this step brings the state to.
    fn version(&self) -> u32;
    /// Produce the replacement state.
    fn migrate(&self, state: PersistedState) -> Result<PersistedState, StepError>;
}

/// A migration written against the modern contract.
///
/// Mutates the given state in place, stamps `meta.version`, and adds the name
/// of every controller it touched to `changed`. There is no way to hand back
/// a different state.
pub trait Migration: Send + Sync {
    /// The version this step brings the state to.
    fn version(&self) -> u32;
    /// Transform `state` in place.
    fn migrate(&self, state: &mut PersistedState, changed: &mut ChangeSet)
        -> Result<(), StepError>;
}

/// One registered migration.
///
/// # Example
///
/// ```
/// use vaultstate_migrate::{Era, MigrationStep};
///
/// let step = MigrationStep::modern_fn(187, |state, changed| {
///     state.set_version(187);
///     if let Some(map) = state.controllers_mut() {
///         map.remove("CachedBalancesController");
///         changed.insert("CachedBalancesController");
///     }
///     Ok(())
/// });
/// assert_eq!(step.version(), 187);
/// assert_eq!(step.kind(), Era::Modern);
/// ```
pub enum MigrationStep {
    /// Replacement-returning step.
    Legacy(Box<dyn LegacyMigration>),
    /// In-place step with change reporting.
    Modern(Box<dyn Migration>),
}

impl MigrationStep {
    /// Wrap a [`LegacyMigration`] implementation.
    pub fn legacy<M: LegacyMigration + 'static>(migration: M) -> Self {
        Self::Legacy(Box::new(migration))
    }

    /// Wrap a [`Migration`] implementation.
    pub fn modern<M: Migration + 'static>(migration: M) -> Self {
        Self::Modern(Box::new(migration))
    }

    /// Build a legacy step from a closure.
    pub fn legacy_fn<F>(version: u32, migrate: F) -> Self
    where
        F: Fn(PersistedState) -> Result<PersistedState, StepError> + Send + Sync + 'static,
    {
        Self::legacy(LegacyFn { version, migrate })
    }

    /// Build a modern step from a closure.
    pub fn modern_fn<F>(version: u32, migrate: F) -> Self
    where
        F: Fn(&mut PersistedState, &mut ChangeSet) -> Result<(), StepError>
            + Send
            + Sync
            + 'static,
    {
        Self::modern(ModernFn { version, migrate })
    }

    /// The version this step brings the state to.
    pub fn version(&self) -> u32 {
        match self {
            Self::Legacy(m) => m.version(),
            Self::Modern(m) => m.version(),
        }
    }

    /// The calling convention this step was written against.
    pub fn kind(&self) -> Era {
        match self {
            Self::Legacy(_) => Era::Legacy,
            Self::Modern(_) => Era::Modern,
        }
    }
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStep")
            .field("version", &self.version())
            .field("kind", &self.kind())
            .finish()
    }
}

struct LegacyFn<F> {
    version: u32,
    migrate: F,
}

impl<F> LegacyMigration for LegacyFn<F>
where
    F: Fn(PersistedState) -> Result<PersistedState, StepError> + Send + Sync,
{
    fn version(&self) -> u32 {
        self.version
    }

    fn migrate(&self, state: PersistedState) -> Result<PersistedState, StepError> {
        (self.migrate)(state)
    }
}

struct ModernFn<F> {
    version: u32,
    migrate: F,
}

impl<F> Migration for ModernFn<F>
where
    F: Fn(&mut PersistedState, &mut ChangeSet) -> Result<(), StepError> + Send + Sync,
{
    fn version(&self) -> u32 {
        self.version
    }

    fn migrate(
        &self,
        state: &mut PersistedState,
        changed: &mut ChangeSet,
    ) -> Result<(), StepError> {
        (self.migrate)(state, changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn era_boundary_is_inclusive_for_modern() {
        assert_eq!(Era::of(185, 186), Era::Legacy);
        assert_eq!(Era::of(186, 186), Era::Modern);
        assert_eq!(Era::of(187, 186), Era::Modern);
        assert_eq!(Era::of(0, 0), Era::Modern);
    }

    #[test]
    fn closure_steps_report_version_and_kind() {
        let legacy = MigrationStep::legacy_fn(3, Ok);
        let modern = MigrationStep::modern_fn(4, |_, _| Ok(()));

        assert_eq!(legacy.version(), 3);
        assert_eq!(legacy.kind(), Era::Legacy);
        assert_eq!(modern.version(), 4);
        assert_eq!(modern.kind(), Era::Modern);
    }

    #[test]
    fn modern_closure_mutates_in_place() {
        let step = MigrationStep::modern_fn(9, |state, changed| {
            state.set_version(9);
            state.data["AlertController"] = json!({ "enabled": true });
            changed.insert("AlertController");
            Ok(())
        });

        let MigrationStep::Modern(m) = &step else {
            panic!("expected modern step");
        };
        let mut state = PersistedState::from_value(json!({}), 8);
        let mut changed = ChangeSet::new();
        m.migrate(&mut state, &mut changed).unwrap();

        assert_eq!(state.version(), 9);
        assert_eq!(state.controller("AlertController"), Some(&json!({ "enabled": true })));
        assert!(changed.contains("AlertController"));
    }

    #[test]
    fn debug_output_names_version_and_kind() {
        let step = MigrationStep::legacy_fn(12, Ok);
        assert_eq!(
            format!("{step:?}"),
            "MigrationStep { version: 12, kind: Legacy }"
        );
    }
}
