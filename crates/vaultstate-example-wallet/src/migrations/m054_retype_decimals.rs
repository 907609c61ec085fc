use serde_json::Value;
use vaultstate_migrate::{legacy_migration, PersistedState, StepError};

/// Token `decimals` were once stored as strings. Retype them as numbers,
/// both in the flat `tokens` list and in `accountTokens[address][chainId]`.
#[legacy_migration(version = 54)]
pub fn retype_decimals(mut state: PersistedState) -> Result<PersistedState, StepError> {
    if let Some(prefs) = state.controller_mut("PreferencesController") {
        if let Some(tokens) = prefs.get_mut("tokens") {
            retype_list(tokens);
        }
        if let Some(by_account) = prefs.get_mut("accountTokens").and_then(Value::as_object_mut) {
            for by_chain in by_account.values_mut().filter_map(Value::as_object_mut) {
                for tokens in by_chain.values_mut() {
                    retype_list(tokens);
                }
            }
        }
    }
    Ok(state)
}

fn retype_list(tokens: &mut Value) {
    let Some(tokens) = tokens.as_array_mut() else {
        return;
    };
    for token in tokens {
        let Some(decimals) = token.get_mut("decimals") else {
            continue;
        };
        if let Some(n) = decimals.as_str().and_then(|s| s.parse::<u64>().ok()) {
            *decimals = Value::from(n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vaultstate_migrate::LegacyMigration;

    fn token(symbol: &str, decimals: Value) -> Value {
        json!({ "address": format!("0x{symbol}"), "decimals": decimals, "symbol": symbol })
    }

    #[test]
    fn stamps_version() {
        let out = RetypeDecimalsMigration
            .migrate(PersistedState::from_value(json!({}), 53))
            .unwrap();
        assert_eq!(out.version(), 54);
        assert_eq!(out.data, json!({}));
    }

    #[test]
    fn retypes_flat_tokens() {
        let state = PersistedState::from_value(
            json!({ "PreferencesController": {
                "tokens": [token("CK", json!("0")), token("BAT", json!(18))],
                "accountTokens": [],
            }}),
            53,
        );
        let out = RetypeDecimalsMigration.migrate(state).unwrap();
        assert_eq!(
            out.controller("PreferencesController").unwrap()["tokens"],
            json!([token("CK", json!(0)), token("BAT", json!(18))])
        );
    }

    #[test]
    fn retypes_account_tokens() {
        let state = PersistedState::from_value(
            json!({ "PreferencesController": {
                "accountTokens": {
                    "0x1111": { "0x1": [token("CK", json!("0")), token("LINK", json!(18))] },
                    "0x1112": { "0x3": [token("SOR", json!("0"))] },
                },
                "tokens": [],
            }}),
            53,
        );
        let out = RetypeDecimalsMigration.migrate(state).unwrap();
        let account_tokens = &out.controller("PreferencesController").unwrap()["accountTokens"];
        assert_eq!(account_tokens["0x1111"]["0x1"][0]["decimals"], json!(0));
        assert_eq!(account_tokens["0x1111"]["0x1"][1]["decimals"], json!(18));
        assert_eq!(account_tokens["0x1112"]["0x3"][0]["decimals"], json!(0));
    }

    #[test]
    fn leaves_unparseable_decimals_alone() {
        let state = PersistedState::from_value(
            json!({ "PreferencesController": { "tokens": [token("X", json!("lots"))] } }),
            53,
        );
        let out = RetypeDecimalsMigration.migrate(state).unwrap();
        assert_eq!(
            out.controller("PreferencesController").unwrap()["tokens"][0]["decimals"],
            json!("lots")
        );
    }
}
