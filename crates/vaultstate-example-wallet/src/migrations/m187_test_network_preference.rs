use serde_json::{json, Value};
use vaultstate_migrate::{migration, ChangeSet, PersistedState, StepError};

/// Make the "show test networks" preference explicit. Only reports a change
/// when the flag was actually missing.
#[migration(version = 187)]
pub fn default_test_network_preference(
    state: &mut PersistedState,
    changed: &mut ChangeSet,
) -> Result<(), StepError> {
    let Some(prefs) = state
        .controller_mut("PreferencesController")
        .and_then(Value::as_object_mut)
    else {
        return Ok(());
    };

    let preferences = prefs.entry("preferences").or_insert_with(|| json!({}));
    let Some(preferences) = preferences.as_object_mut() else {
        return Err("PreferencesController.preferences is not an object".into());
    };
    if !preferences.contains_key("showTestNetworks") {
        preferences.insert("showTestNetworks".into(), json!(false));
        changed.insert("PreferencesController");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultstate_migrate::Migration;

    fn run(data: Value) -> Result<(PersistedState, ChangeSet), StepError> {
        let mut state = PersistedState::from_value(data, 186);
        let mut changed = ChangeSet::new();
        DefaultTestNetworkPreferenceMigration.migrate(&mut state, &mut changed)?;
        Ok((state, changed))
    }

    #[test]
    fn fills_missing_flag() {
        let (state, changed) = run(json!({ "PreferencesController": {} })).unwrap();
        assert_eq!(state.version(), 187);
        assert_eq!(
            state.controller("PreferencesController"),
            Some(&json!({ "preferences": { "showTestNetworks": false } }))
        );
        assert!(changed.contains("PreferencesController"));
    }

    #[test]
    fn existing_flag_reports_nothing() {
        let (_, changed) = run(json!({
            "PreferencesController": { "preferences": { "showTestNetworks": true } }
        }))
        .unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn missing_controller_is_skipped() {
        let (state, changed) = run(json!({ "KeyringController": {} })).unwrap();
        assert_eq!(state.version(), 187);
        assert!(changed.is_empty());
    }

    #[test]
    fn malformed_preferences_fail() {
        let err = run(json!({ "PreferencesController": { "preferences": 3 } })).unwrap_err();
        assert!(err.to_string().contains("not an object"));
    }
}
