use thiserror::Error;

/// Error type returned by migration step bodies.
///
/// Boxed so a step can use `?` on any error, or return `"message".into()`.
pub type StepError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error while building a [`MigrationRegistry`](crate::MigrationRegistry).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two steps were registered under the same version.
    #[error("duplicate migration version {0}")]
    DuplicateVersion(u32),
}

/// A step produced a state that fails the minimal structural checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeViolation {
    /// The resulting state has no data.
    #[error("migration returned empty data")]
    EmptyData,
    /// The resulting state is not at the step's own version.
    #[error("migration left state at version {actual}, expected {expected}")]
    VersionMismatch { expected: u32, actual: u32 },
}

/// A step's signature does not match the era its version falls in.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    /// A replacement-returning step at or above the era threshold.
    #[error(
        "steps at or above version {threshold} must mutate state in place and report changed controllers, not return a replacement state"
    )]
    ReplacementInModernEra { threshold: u32 },
    /// An in-place step below the era threshold.
    #[error("steps below version {threshold} must return a complete replacement state")]
    InPlaceInLegacyEra { threshold: u32 },
}

/// Broad category of a migration failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The step's own logic returned an error or panicked.
    Step,
    /// The step's output failed shape validation.
    Shape,
    /// The step broke the calling convention of its era.
    Contract,
}

/// A failed migration step.
///
/// `Display` prefixes the step version to the original message; `source()`
/// yields the original error unchanged.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// The step body failed.
    #[error("migration #{version}: {source}")]
    StepFailed {
        version: u32,
        #[source]
        source: StepError,
    },
    /// The step's output was rejected by the shape validator.
    #[error("migration #{version}: {source}")]
    Shape {
        version: u32,
        #[source]
        source: ShapeViolation,
    },
    /// The step broke its era's calling convention.
    #[error("migration #{version}: {source}")]
    Contract {
        version: u32,
        #[source]
        source: ContractViolation,
    },
}

impl MigrationError {
    pub(crate) fn step(version: u32, source: StepError) -> Self {
        Self::StepFailed { version, source }
    }

    pub(crate) fn shape(version: u32, source: ShapeViolation) -> Self {
        Self::Shape { version, source }
    }

    pub(crate) fn contract(version: u32, source: ContractViolation) -> Self {
        Self::Contract { version, source }
    }

    /// Version of the step that failed.
    pub fn version(&self) -> u32 {
        match self {
            Self::StepFailed { version, .. }
            | Self::Shape { version, .. }
            | Self::Contract { version, .. } => *version,
        }
    }

    /// Category of the failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::StepFailed { .. } => FailureKind::Step,
            Self::Shape { .. } => FailureKind::Shape,
            Self::Contract { .. } => FailureKind::Contract,
        }
    }
}
