use std::error::Error as _;
use std::sync::Mutex;

use crate::error::MigrationError;

/// Progress and failure notifications emitted during a run.
#[derive(Debug, Clone, Copy)]
pub enum MigrationEvent<'a> {
    /// A step is about to run.
    Started { version: u32 },
    /// A step ran and its output validated.
    Succeeded { version: u32 },
    /// A modern step succeeded without naming any changed controller.
    NoChangesReported { version: u32 },
    /// A step failed; the run stops here.
    Failed { error: &'a MigrationError },
}

/// Receives [`MigrationEvent`]s from the runner.
///
/// Implemented for any `Fn(&MigrationEvent)` closure, so a host can plug in a
/// callback without defining a type.
pub trait MigrationObserver: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &MigrationEvent<'_>);
}

impl<F> MigrationObserver for F
where
    F: Fn(&MigrationEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &MigrationEvent<'_>) {
        self(event)
    }
}

/// Observer that forwards events to `tracing`.
///
/// Progress goes to `info`, empty change reports to `debug`, failures to
/// `error` with the original error's source chain attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl MigrationObserver for TracingObserver {
    fn on_event(&self, event: &MigrationEvent<'_>) {
        match event {
            MigrationEvent::Started { version } => {
                tracing::info!(version, "running migration");
            }
            MigrationEvent::Succeeded { version } => {
                tracing::info!(version, "migration complete");
            }
            MigrationEvent::NoChangesReported { version } => {
                tracing::debug!(version, "migration reported no changed controllers");
            }
            MigrationEvent::Failed { error } => {
                tracing::error!(
                    version = error.version(),
                    kind = ?error.kind(),
                    cause = %source_chain(error),
                    "{error}"
                );
            }
        }
    }
}

fn source_chain(error: &MigrationError) -> String {
    let mut chain = Vec::new();
    let mut source = error.source();
    while let Some(err) = source {
        chain.push(err.to_string());
        source = err.source();
    }
    chain.join(": ")
}

/// Owned copy of a [`MigrationEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    /// See [`MigrationEvent::Started`].
    Started(u32),
    /// See [`MigrationEvent::Succeeded`].
    Succeeded(u32),
    /// See [`MigrationEvent::NoChangesReported`].
    NoChangesReported(u32),
    /// See [`MigrationEvent::Failed`]; carries the rendered message.
    Failed { version: u32, message: String },
}

impl From<&MigrationEvent<'_>> for RecordedEvent {
    fn from(event: &MigrationEvent<'_>) -> Self {
        match event {
            MigrationEvent::Started { version } => Self::Started(*version),
            MigrationEvent::Succeeded { version } => Self::Succeeded(*version),
            MigrationEvent::NoChangesReported { version } => Self::NoChangesReported(*version),
            MigrationEvent::Failed { error } => Self::Failed {
                version: error.version(),
                message: error.to_string(),
            },
        }
    }
}

/// Observer that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events seen so far, in order.
    pub fn events(&self) -> Vec<RecordedEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Failure events seen so far.
    pub fn failures(&self) -> Vec<RecordedEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, RecordedEvent::Failed { .. }))
            .collect()
    }
}

impl MigrationObserver for RecordingObserver {
    fn on_event(&self, event: &MigrationEvent<'_>) {
        let recorded = RecordedEvent::from(event);
        match self.events.lock() {
            Ok(mut events) => events.push(recorded),
            Err(poisoned) => poisoned.into_inner().push(recorded),
        }
    }
}

/// Surfaces a failed step to the observer without unwinding the run.
pub struct ErrorReporter<'a> {
    observer: &'a dyn MigrationObserver,
}

impl<'a> ErrorReporter<'a> {
    /// Report through `observer`.
    pub fn new(observer: &'a dyn MigrationObserver) -> Self {
        Self { observer }
    }

    /// Emit the failure and hand the error back for the run's outcome.
    pub fn report(&self, error: MigrationError) -> MigrationError {
        self.observer.on_event(&MigrationEvent::Failed { error: &error });
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShapeViolation;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn closures_are_observers() {
        let count = AtomicUsize::new(0);
        let observer = |_: &MigrationEvent<'_>| {
            count.fetch_add(1, Ordering::SeqCst);
        };
        observer.on_event(&MigrationEvent::Started { version: 1 });
        observer.on_event(&MigrationEvent::Succeeded { version: 1 });
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn recorder_keeps_order() {
        let recorder = RecordingObserver::new();
        recorder.on_event(&MigrationEvent::Started { version: 5 });
        recorder.on_event(&MigrationEvent::NoChangesReported { version: 5 });
        recorder.on_event(&MigrationEvent::Succeeded { version: 5 });

        assert_eq!(
            recorder.events(),
            vec![
                RecordedEvent::Started(5),
                RecordedEvent::NoChangesReported(5),
                RecordedEvent::Succeeded(5),
            ]
        );
        assert!(recorder.failures().is_empty());
    }

    #[test]
    fn reporter_emits_and_returns_error() {
        let recorder = RecordingObserver::new();
        let reporter = ErrorReporter::new(&recorder);

        let err = reporter.report(MigrationError::shape(3, ShapeViolation::EmptyData));
        assert_eq!(err.version(), 3);
        assert_eq!(
            recorder.failures(),
            vec![RecordedEvent::Failed {
                version: 3,
                message: "migration #3: migration returned empty data".into(),
            }]
        );
    }

    #[test]
    fn source_chain_lists_causes() {
        let err = MigrationError::shape(3, ShapeViolation::EmptyData);
        assert_eq!(source_chain(&err), "migration returned empty data");
    }

    #[test]
    fn tracing_observer_handles_every_event() {
        let err = MigrationError::shape(2, ShapeViolation::EmptyData);
        let observer = TracingObserver;
        observer.on_event(&MigrationEvent::Started { version: 2 });
        observer.on_event(&MigrationEvent::NoChangesReported { version: 2 });
        observer.on_event(&MigrationEvent::Failed { error: &err });
    }
}
