use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::changes::{ChangeSet, ChangeTracker};
use crate::config::MigratorConfig;
use crate::error::{ContractViolation, MigrationError, StepError};
use crate::gate;
use crate::registry::MigrationRegistry;
use crate::report::{ErrorReporter, MigrationEvent, MigrationObserver, TracingObserver};
use crate::state::{Meta, PersistedState};
use crate::step::{Era, MigrationStep};
use crate::validate;

/// Result of one [`Migrator::migrate`] call.
///
/// A run never fails as a whole. If a step failed, `error` holds it and
/// `state` is the last state that validated before that step started.
#[derive(Debug)]
pub struct MigrationOutcome {
    /// The migrated state, to be persisted by the caller.
    pub state: PersistedState,
    /// Controllers whose content changed.
    pub changed: ChangeSet,
    /// Versions of the steps that were applied, in order.
    pub applied: Vec<u32>,
    /// The failure that halted the run, if any.
    pub error: Option<MigrationError>,
}

impl MigrationOutcome {
    /// Whether every pending step ran successfully.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Split into the state and the changed controllers.
    pub fn into_parts(self) -> (PersistedState, ChangeSet) {
        (self.state, self.changed)
    }
}

/// Runs pending migration steps against a persisted state.
///
/// Steps run one at a time in ascending version order. Each one gets a
/// private clone of the running state; its output replaces the running state
/// only after it passes [`validate::validate_step_output`]. The first failure
/// is reported to the observer and ends the run.
pub struct Migrator {
    registry: MigrationRegistry,
    config: MigratorConfig,
    initial_data: Map<String, Value>,
    observer: Arc<dyn MigrationObserver>,
}

impl Migrator {
    /// Create a migrator that reports through [`TracingObserver`].
    pub fn new(registry: MigrationRegistry, config: MigratorConfig) -> Self {
        Self {
            registry,
            config,
            initial_data: Map::new(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the observer.
    pub fn with_observer(mut self, observer: Arc<dyn MigrationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Controller data used when [`migrate`](Self::migrate) is called with no
    /// state (a fresh install).
    pub fn with_initial_data(mut self, data: Map<String, Value>) -> Self {
        self.initial_data = data;
        self
    }

    /// The registered steps.
    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// The active configuration.
    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// The version the application currently expects.
    pub fn default_version(&self) -> u32 {
        self.registry.default_version()
    }

    /// A state at the default version holding `data`, or an empty controller
    /// map when `data` is `None`.
    pub fn generate_initial_state(&self, data: Option<Map<String, Value>>) -> PersistedState {
        PersistedState::new(
            data.unwrap_or_default(),
            Meta {
                version: self.default_version(),
                storage_kind: self.config.default_storage_kind,
            },
        )
    }

    /// Versions of the steps that would run against `state`.
    pub fn pending_versions(&self, state: &PersistedState) -> Vec<u32> {
        gate::pending(self.registry.steps(), state.version())
            .into_iter()
            .map(MigrationStep::version)
            .collect()
    }

    /// Migrate `state` to the current version.
    ///
    /// With `None`, a fresh state is generated from the configured initial
    /// data and nothing is pending unless the default version was overridden
    /// below the highest step.
    pub fn migrate(&self, state: Option<PersistedState>) -> MigrationOutcome {
        let mut state = match state {
            Some(state) => state,
            None => self.generate_initial_state(Some(self.initial_data.clone())),
        };

        let mut tracker = ChangeTracker::begin(&state, self.config.era_threshold);
        let mut applied = Vec::new();
        let mut error = None;

        while let Some(step) = gate::next_pending(self.registry.steps(), state.version()) {
            let version = step.version();
            self.observer.on_event(&MigrationEvent::Started { version });

            match self.run_step(step, &state) {
                Ok((next, reported)) => {
                    if reported.as_ref().is_some_and(ChangeSet::is_empty) {
                        self.observer
                            .on_event(&MigrationEvent::NoChangesReported { version });
                    }
                    tracker.record(reported);
                    state = next;
                    applied.push(version);
                    self.observer.on_event(&MigrationEvent::Succeeded { version });
                }
                Err(err) => {
                    error = Some(ErrorReporter::new(self.observer.as_ref()).report(err));
                    break;
                }
            }
        }

        let changed = tracker.finish(&state);
        MigrationOutcome {
            state,
            changed,
            applied,
            error,
        }
    }

    /// Run one step against a clone of `current`.
    ///
    /// Returns the validated next state, plus the controllers a modern step
    /// reported.
    fn run_step(
        &self,
        step: &MigrationStep,
        current: &PersistedState,
    ) -> Result<(PersistedState, Option<ChangeSet>), MigrationError> {
        let version = step.version();
        let threshold = self.config.era_threshold;

        let (next, reported) = match (step, Era::of(version, threshold)) {
            (MigrationStep::Legacy(m), Era::Legacy) => {
                let working = current.clone();
                let next = guarded(|| m.migrate(working))
                    .map_err(|e| MigrationError::step(version, e))?;
                (next, None)
            }
            (MigrationStep::Modern(m), Era::Modern) => {
                let mut working = current.clone();
                let mut changed = ChangeSet::new();
                guarded(|| m.migrate(&mut working, &mut changed))
                    .map_err(|e| MigrationError::step(version, e))?;
                (working, Some(changed))
            }
            (MigrationStep::Legacy(_), Era::Modern) => {
                return Err(MigrationError::contract(
                    version,
                    ContractViolation::ReplacementInModernEra { threshold },
                ));
            }
            (MigrationStep::Modern(_), Era::Legacy) => {
                return Err(MigrationError::contract(
                    version,
                    ContractViolation::InPlaceInLegacyEra { threshold },
                ));
            }
        };

        validate::validate_step_output(&next, version)
            .map_err(|e| MigrationError::shape(version, e))?;

        Ok((next, reported))
    }
}

/// Run a step body, turning a panic into a step error.
fn guarded<T>(body: impl FnOnce() -> Result<T, StepError>) -> Result<T, StepError> {
    catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|payload| Err(panic_message(payload).into()))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("step panicked: {detail}")
}
