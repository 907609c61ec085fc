//! Replace the retired MegaETH v1 testnet with v2.
//!
//! - Add the v2 network configuration, or merge the canonical name, currency,
//!   RPC endpoint and explorer into one the user already added.
//! - Move users still pointed at v1 back to mainnet.
//! - Drop v1 from the enablement map and the network configurations.
//!
//! Malformed controller state is logged and left untouched rather than
//! failing the run.

use serde_json::{json, Map, Value};
use vaultstate_migrate::{migration, ChangeSet, PersistedState, StepError};

pub const MEGAETH_TESTNET_V1_CHAIN_ID: &str = "0x18c6";
pub const MEGAETH_TESTNET_V2_CHAIN_ID: &str = "0x18c7";

const V1_LEGACY_CLIENT_ID: &str = "megaeth-testnet";
const V2_NAME: &str = "MegaETH Testnet";
const V2_CURRENCY: &str = "MegaETH";
const V2_RPC_URL: &str = "https://carrot.megaeth.com/rpc";
const V2_EXPLORER_URL: &str = "https://megaeth-testnet-v2.blockscout.com";
const EIP155: &str = "eip155";

fn v2_configuration() -> Value {
    json!({
        "chainId": MEGAETH_TESTNET_V2_CHAIN_ID,
        "name": V2_NAME,
        "nativeCurrency": V2_CURRENCY,
        "blockExplorerUrls": [V2_EXPLORER_URL],
        "defaultRpcEndpointIndex": 0,
        "defaultBlockExplorerUrlIndex": 0,
        "rpcEndpoints": [{
            "failoverUrls": [],
            "networkClientId": "megaeth-testnet-v2",
            "type": "custom",
            "url": V2_RPC_URL,
        }],
    })
}

#[migration(version = 186)]
pub fn backfill_megaeth_testnet(
    state: &mut PersistedState,
    changed: &mut ChangeSet,
) -> Result<(), StepError> {
    let Some(data) = state.controllers_mut() else {
        return Ok(());
    };

    let Some(network) = data.get_mut("NetworkController") else {
        tracing::warn!(version = 186, "missing NetworkController state, skipping");
        return Ok(());
    };
    let Some((configs, selected)) = network_parts(network) else {
        tracing::warn!(version = 186, "invalid NetworkController state, skipping");
        return Ok(());
    };

    match configs.get_mut(MEGAETH_TESTNET_V2_CHAIN_ID) {
        Some(existing) if is_valid_configuration(&*existing) => merge_v2(existing),
        Some(_) => {
            tracing::warn!(version = 186, "invalid MegaETH v2 configuration, skipping");
            return Ok(());
        }
        None => {
            configs.insert(MEGAETH_TESTNET_V2_CHAIN_ID.into(), v2_configuration());
        }
    }

    let on_v1 = selected == V1_LEGACY_CLIENT_ID
        || client_id_belongs_to(configs, MEGAETH_TESTNET_V1_CHAIN_ID, &selected);
    configs.remove(MEGAETH_TESTNET_V1_CHAIN_ID);
    changed.insert("NetworkController");

    let v1_enabled = match data
        .get_mut("NetworkEnablementController")
        .and_then(eip155_map)
    {
        Some(eip155) => {
            eip155
                .entry(MEGAETH_TESTNET_V2_CHAIN_ID)
                .or_insert(Value::Bool(false));
            let v1_enabled =
                eip155.remove(MEGAETH_TESTNET_V1_CHAIN_ID) == Some(Value::Bool(true));
            if v1_enabled || on_v1 {
                eip155.insert("0x1".into(), Value::Bool(true));
            }
            changed.insert("NetworkEnablementController");
            v1_enabled
        }
        None => false,
    };

    if v1_enabled || on_v1 {
        if let Some(network) = data.get_mut("NetworkController") {
            network["selectedNetworkClientId"] = json!("mainnet");
        }
    }
    Ok(())
}

/// `(networkConfigurationsByChainId, selectedNetworkClientId)` if both are
/// well formed.
fn network_parts(network: &mut Value) -> Option<(&mut Map<String, Value>, String)> {
    let network = network.as_object_mut()?;
    let selected = network.get("selectedNetworkClientId")?.as_str()?.to_owned();
    let configs = network
        .get_mut("networkConfigurationsByChainId")?
        .as_object_mut()?;
    if !configs.keys().all(|k| is_hex(k)) {
        return None;
    }
    Some((configs, selected))
}

fn eip155_map(enablement: &mut Value) -> Option<&mut Map<String, Value>> {
    let eip155 = enablement
        .get_mut("enabledNetworkMap")?
        .get_mut(EIP155)?
        .as_object_mut()?;
    eip155.values().all(Value::is_boolean).then_some(eip155)
}

fn is_hex(s: &str) -> bool {
    s.strip_prefix("0x")
        .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_hexdigit()))
}

fn is_valid_configuration(config: &Value) -> bool {
    let Some(config) = config.as_object() else {
        return false;
    };
    let str_field = |k: &str| config.get(k).is_some_and(Value::is_string);
    let endpoints_ok = config
        .get("rpcEndpoints")
        .and_then(Value::as_array)
        .is_some_and(|eps| {
            eps.iter().all(|ep| {
                ep.get("networkClientId").is_some_and(Value::is_string)
                    && ep.get("url").is_some_and(Value::is_string)
            })
        });
    let explorers_ok = config
        .get("blockExplorerUrls")
        .and_then(Value::as_array)
        .is_some_and(|urls| urls.iter().all(Value::is_string));
    let explorer_index_ok = config
        .get("defaultBlockExplorerUrlIndex")
        .map_or(true, Value::is_number);

    config
        .get("chainId")
        .and_then(Value::as_str)
        .is_some_and(is_hex)
        && str_field("name")
        && str_field("nativeCurrency")
        && endpoints_ok
        && explorers_ok
        && config.get("defaultRpcEndpointIndex").is_some_and(Value::is_number)
        && explorer_index_ok
}

fn client_id_belongs_to(configs: &Map<String, Value>, chain_id: &str, client_id: &str) -> bool {
    configs
        .get(chain_id)
        .filter(|c| is_valid_configuration(c))
        .and_then(|c| c["rpcEndpoints"].as_array())
        .is_some_and(|eps| {
            eps.iter()
                .any(|ep| ep["networkClientId"].as_str() == Some(client_id))
        })
}

/// Only called on a configuration that passed [`is_valid_configuration`].
fn merge_v2(config: &mut Value) {
    config["name"] = json!(V2_NAME);
    config["nativeCurrency"] = json!(V2_CURRENCY);

    if let Some(endpoints) = config["rpcEndpoints"].as_array_mut() {
        if !endpoints.iter().any(|ep| ep["url"] == V2_RPC_URL) {
            let client_id = format!("megaeth-testnet-v2-{}", endpoints.len());
            endpoints.push(json!({
                "failoverUrls": [],
                "networkClientId": client_id,
                "type": "custom",
                "url": V2_RPC_URL,
            }));
            let last = endpoints.len() - 1;
            config["defaultRpcEndpointIndex"] = json!(last);
        }
    }

    if let Some(urls) = config["blockExplorerUrls"].as_array_mut() {
        if !urls.iter().any(|u| u == V2_EXPLORER_URL) {
            urls.push(json!(V2_EXPLORER_URL));
            let last = urls.len() - 1;
            config["defaultBlockExplorerUrlIndex"] = json!(last);
        }
    }
}
