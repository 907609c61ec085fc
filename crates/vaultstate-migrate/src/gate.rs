//! Which registered steps still have to run against a given version.
//!
//! Pure functions over the registry's ordered step list. The runner asks for
//! the next pending step against the *running* state's version after every
//! success, rather than fixing the list up front.

use crate::step::MigrationStep;

/// Whether `step` has not yet been applied to a state at `version`.
pub fn is_pending(step: &MigrationStep, version: u32) -> bool {
    step.version() > version
}

/// Every step newer than `version`, in ascending order.
///
/// `steps` must already be sorted ascending (as
/// [`MigrationRegistry::steps`](crate::MigrationRegistry::steps) is).
pub fn pending(steps: &[MigrationStep], version: u32) -> Vec<&MigrationStep> {
    steps.iter().filter(|s| is_pending(s, version)).collect()
}

/// The lowest step newer than `version`.
pub fn next_pending(steps: &[MigrationStep], version: u32) -> Option<&MigrationStep> {
    steps.iter().find(|s| is_pending(s, version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MigrationRegistry;

    fn registry(versions: &[u32]) -> MigrationRegistry {
        MigrationRegistry::new(
            versions
                .iter()
                .map(|&v| MigrationStep::modern_fn(v, |_, _| Ok(())))
                .collect(),
        )
        .unwrap()
    }

    fn versions(steps: Vec<&MigrationStep>) -> Vec<u32> {
        steps.into_iter().map(MigrationStep::version).collect()
    }

    #[test]
    fn pending_from_zero_is_everything() {
        let reg = registry(&[1, 2, 3]);
        assert_eq!(versions(pending(reg.steps(), 0)), vec![1, 2, 3]);
    }

    #[test]
    fn pending_excludes_current_and_older() {
        let reg = registry(&[1, 2, 3, 5]);
        assert_eq!(versions(pending(reg.steps(), 2)), vec![3, 5]);
        assert_eq!(versions(pending(reg.steps(), 4)), vec![5]);
    }

    #[test]
    fn nothing_pending_at_or_past_highest() {
        let reg = registry(&[1, 2, 3]);
        assert!(pending(reg.steps(), 3).is_empty());
        assert!(pending(reg.steps(), 99).is_empty());
        assert!(next_pending(reg.steps(), 3).is_none());
    }

    #[test]
    fn next_pending_skips_gaps() {
        let reg = registry(&[10, 20, 30]);
        assert_eq!(next_pending(reg.steps(), 0).map(MigrationStep::version), Some(10));
        assert_eq!(next_pending(reg.steps(), 15).map(MigrationStep::version), Some(20));
    }
}
