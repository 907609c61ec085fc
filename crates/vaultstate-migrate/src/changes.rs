use std::collections::btree_set;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::state::PersistedState;
use crate::step::Era;

/// Names of the controllers whose persisted content changed during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet(BTreeSet<String>);

impl ChangeSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Record a controller name. Returns `false` if it was already present.
    pub fn insert(&mut self, controller: impl Into<String>) -> bool {
        self.0.insert(controller.into())
    }

    /// Whether `controller` is in the set.
    pub fn contains(&self, controller: &str) -> bool {
        self.0.contains(controller)
    }

    /// Number of controllers in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate names in sorted order.
    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for ChangeSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl IntoIterator for ChangeSet {
    type Item = String;
    type IntoIter = btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a String;
    type IntoIter = btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Builds the [`ChangeSet`] for one run across both migration eras.
///
/// Legacy steps cannot say what they touched, so a run that *starts* below the
/// era threshold and applies at least one step reports every controller
/// present at the start or the end of the run. Modern steps report precisely;
/// their sets are folded in as each one succeeds. A run that starts at or
/// above the threshold therefore reports only what modern steps named, and a
/// run that applies nothing reports nothing.
#[derive(Debug, Clone)]
pub struct ChangeTracker {
    legacy_start: bool,
    start_keys: Vec<String>,
    applied: usize,
    reported: ChangeSet,
}

impl ChangeTracker {
    /// Start tracking a run that begins at `start`.
    pub fn begin(start: &PersistedState, era_threshold: u32) -> Self {
        let legacy_start = Era::of(start.version(), era_threshold) == Era::Legacy;
        let start_keys = if legacy_start {
            start.controller_keys()
        } else {
            Vec::new()
        };
        Self {
            legacy_start,
            start_keys,
            applied: 0,
            reported: ChangeSet::new(),
        }
    }

    /// Whether the legacy fallback applies to this run.
    pub fn is_legacy_start(&self) -> bool {
        self.legacy_start
    }

    /// Note a step that succeeded, folding in the controllers it reported.
    ///
    /// Legacy steps pass `None`.
    pub fn record(&mut self, reported: Option<ChangeSet>) {
        self.applied += 1;
        if let Some(changed) = reported {
            self.reported.extend(changed);
        }
    }

    /// Number of successful steps recorded.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Controllers reported so far by modern steps.
    pub fn reported(&self) -> &ChangeSet {
        &self.reported
    }

    /// Finish the run, given the state being handed back to the caller.
    pub fn finish(self, final_state: &PersistedState) -> ChangeSet {
        let mut changed = self.reported;
        if self.legacy_start && self.applied > 0 {
            changed.extend(self.start_keys);
            changed.extend(final_state.controller_keys());
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(data: serde_json::Value, version: u32) -> PersistedState {
        PersistedState::from_value(data, version)
    }

    fn set(names: &[&str]) -> ChangeSet {
        names.iter().copied().collect()
    }

    #[test]
    fn change_set_dedups_and_sorts() {
        let mut set = ChangeSet::new();
        assert!(set.insert("TokensController"));
        assert!(set.insert("AccountsController"));
        assert!(!set.insert("TokensController"));

        assert_eq!(set.len(), 2);
        let names: Vec<&String> = set.iter().collect();
        assert_eq!(names, vec!["AccountsController", "TokensController"]);
    }

    #[test]
    fn change_set_serializes_as_array() {
        let set = set(&["b", "a"]);
        assert_eq!(serde_json::to_value(&set).unwrap(), json!(["a", "b"]));
    }

    #[test]
    fn legacy_start_reports_all_controllers() {
        let start = state(json!({ "a": {}, "b": {} }), 10);
        let mut tracker = ChangeTracker::begin(&start, 186);
        assert!(tracker.is_legacy_start());
        tracker.record(None);
        tracker.record(None);

        let end = state(json!({ "a": {}, "b": {} }), 12);
        let changed = tracker.finish(&end);
        assert_eq!(changed, set(&["a", "b"]));
    }

    #[test]
    fn legacy_start_includes_added_and_removed_controllers() {
        let start = state(json!({ "a": {}, "old": {} }), 10);
        let mut tracker = ChangeTracker::begin(&start, 186);
        tracker.record(None);

        let end = state(json!({ "a": {}, "new": {} }), 11);
        let changed = tracker.finish(&end);
        assert_eq!(changed, set(&["a", "new", "old"]));
    }

    #[test]
    fn legacy_start_unions_modern_reports() {
        let start = state(json!({ "a": {} }), 185);
        let mut tracker = ChangeTracker::begin(&start, 186);
        tracker.record(None);
        tracker.record(Some(set(&["c"])));

        let end = state(json!({ "a": {}, "c": {} }), 186);
        let changed = tracker.finish(&end);
        assert_eq!(changed, set(&["a", "c"]));
    }

    #[test]
    fn modern_start_reports_only_recorded() {
        let start = state(json!({ "a": {}, "b": {}, "c": {} }), 186);
        let mut tracker = ChangeTracker::begin(&start, 186);
        assert!(!tracker.is_legacy_start());
        tracker.record(Some(set(&["c"])));

        let changed = tracker.finish(&start);
        assert_eq!(changed, set(&["c"]));
    }

    #[test]
    fn legacy_start_with_nothing_applied_reports_nothing() {
        let start = state(json!({ "a": {}, "b": {} }), 10);
        let tracker = ChangeTracker::begin(&start, 186);
        assert_eq!(tracker.applied(), 0);
        assert!(tracker.finish(&start).is_empty());
    }

    #[test]
    fn non_object_data_contributes_nothing() {
        let start = state(serde_json::Value::Null, 1);
        let mut tracker = ChangeTracker::begin(&start, 186);
        tracker.record(None);
        let end = state(json!("not a map"), 2);
        assert!(tracker.finish(&end).is_empty());
    }
}
