use crate::error::RegistryError;
use crate::step::MigrationStep;

/// The ordered set of known migration steps.
///
/// Steps are kept sorted by ascending version and are immutable once the
/// registry is handed to a [`Migrator`](crate::Migrator).
///
/// # Example
///
/// ```
/// use vaultstate_migrate::{MigrationRegistry, MigrationStep, RegistryError};
///
/// let mut registry = MigrationRegistry::new(vec![
///     MigrationStep::legacy_fn(2, Ok),
///     MigrationStep::legacy_fn(1, Ok),
/// ])
/// .unwrap();
/// assert_eq!(registry.registered_versions(), vec![1, 2]);
/// assert_eq!(registry.default_version(), 2);
///
/// let err = registry.register(MigrationStep::legacy_fn(2, Ok)).unwrap_err();
/// assert_eq!(err, RegistryError::DuplicateVersion(2));
/// ```
#[derive(Debug, Default)]
pub struct MigrationRegistry {
    steps: Vec<MigrationStep>,
    default_version: Option<u32>,
}

impl MigrationRegistry {
    /// Build a registry from a full list of steps.
    ///
    /// Fails if two steps share a version.
    pub fn new(steps: Vec<MigrationStep>) -> Result<Self, RegistryError> {
        let mut registry = Self::empty();
        for step in steps {
            registry.register(step)?;
        }
        Ok(registry)
    }

    /// A registry with no steps. Nothing is ever pending against it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Override the default version instead of deriving it from the
    /// highest registered step.
    pub fn with_default_version(mut self, version: u32) -> Self {
        self.default_version = Some(version);
        self
    }

    /// Register a single step.
    pub fn register(&mut self, step: MigrationStep) -> Result<(), RegistryError> {
        let version = step.version();
        match self.steps.binary_search_by_key(&version, MigrationStep::version) {
            Ok(_) => Err(RegistryError::DuplicateVersion(version)),
            Err(pos) => {
                self.steps.insert(pos, step);
                Ok(())
            }
        }
    }

    /// Registered steps in ascending version order.
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// Version of the highest registered step.
    pub fn highest_version(&self) -> Option<u32> {
        self.steps.last().map(MigrationStep::version)
    }

    /// The version a fresh state starts at: the configured override, else the
    /// highest registered step, else 0.
    pub fn default_version(&self) -> u32 {
        self.default_version
            .or_else(|| self.highest_version())
            .unwrap_or(0)
    }

    /// Versions of all registered steps, ascending.
    pub fn registered_versions(&self) -> Vec<u32> {
        self.steps.iter().map(MigrationStep::version).collect()
    }

    /// Number of registered steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no steps are registered.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(version: u32) -> MigrationStep {
        MigrationStep::modern_fn(version, |_, _| Ok(()))
    }

    #[test]
    fn empty_registry_defaults_to_zero() {
        let registry = MigrationRegistry::empty();
        assert!(registry.is_empty());
        assert_eq!(registry.highest_version(), None);
        assert_eq!(registry.default_version(), 0);
    }

    #[test]
    fn steps_sorted_regardless_of_registration_order() {
        let registry = MigrationRegistry::new(vec![noop(30), noop(4), noop(17)]).unwrap();
        assert_eq!(registry.registered_versions(), vec![4, 17, 30]);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.highest_version(), Some(30));
    }

    #[test]
    fn default_version_tracks_highest_step() {
        let mut registry = MigrationRegistry::new(vec![noop(1), noop(2)]).unwrap();
        assert_eq!(registry.default_version(), 2);
        registry.register(noop(9)).unwrap();
        assert_eq!(registry.default_version(), 9);
    }

    #[test]
    fn override_wins_over_highest_step() {
        let registry = MigrationRegistry::new(vec![noop(1), noop(2)])
            .unwrap()
            .with_default_version(1);
        assert_eq!(registry.default_version(), 1);

        let registry = MigrationRegistry::empty().with_default_version(40);
        assert_eq!(registry.default_version(), 40);
    }

    #[test]
    fn duplicate_versions_rejected() {
        let err = MigrationRegistry::new(vec![noop(5), noop(6), noop(5)]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateVersion(5));
    }

    #[test]
    fn duplicate_across_eras_rejected() {
        let mut registry = MigrationRegistry::new(vec![MigrationStep::legacy_fn(8, Ok)]).unwrap();
        assert_eq!(
            registry.register(noop(8)),
            Err(RegistryError::DuplicateVersion(8))
        );
        assert_eq!(registry.len(), 1);
    }
}
