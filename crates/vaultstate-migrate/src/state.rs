use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the persistence layer lays the state out on disk.
///
/// The engine only carries this value through; it matters to hosts that
/// decide how much to write back after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// The whole state is one serialized document.
    #[default]
    Data,
    /// Each controller is stored separately, so only changed ones need writing.
    Split,
}

impl StorageKind {
    /// The serialized name (`"data"` or `"split"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Split => "split",
        }
    }

    /// Parse a serialized name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "data" => Some(Self::Data),
            "split" => Some(Self::Split),
            _ => None,
        }
    }
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Version of the last migration step applied to this state.
    #[serde(default)]
    pub version: u32,
    /// Storage layout this state was loaded from.
    #[serde(default)]
    pub storage_kind: StorageKind,
}

/// The versioned state a wallet persists to disk.
///
/// `data` maps controller names to each controller's own state. It is kept as
/// an order-preserving JSON document because controller shapes belong to the
/// migrations, not to the engine. `Value::Null` means "no state at all".
///
/// # Example
///
/// ```
/// use vaultstate_migrate::PersistedState;
/// use serde_json::json;
///
/// let state = PersistedState::from_value(
///     json!({ "NetworkController": { "selectedNetworkClientId": "mainnet" } }),
///     12,
/// );
/// assert_eq!(state.version(), 12);
/// assert_eq!(state.controller_keys(), vec!["NetworkController".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Controller name -> controller state.
    #[serde(default)]
    pub data: Value,
    /// Version and storage layout.
    #[serde(default)]
    pub meta: Meta,
}

impl PersistedState {
    /// Create a state from a controller map.
    pub fn new(data: Map<String, Value>, meta: Meta) -> Self {
        Self {
            data: Value::Object(data),
            meta,
        }
    }

    /// Create a state from any JSON value at `version`, with the default
    /// storage kind.
    pub fn from_value(data: Value, version: u32) -> Self {
        Self {
            data,
            meta: Meta {
                version,
                storage_kind: StorageKind::default(),
            },
        }
    }

    /// The recorded version.
    pub fn version(&self) -> u32 {
        self.meta.version
    }

    /// Stamp the recorded version.
    pub fn set_version(&mut self, version: u32) {
        self.meta.version = version;
    }

    /// The storage layout.
    pub fn storage_kind(&self) -> StorageKind {
        self.meta.storage_kind
    }

    /// The top-level controller map, if `data` is an object.
    pub fn controllers(&self) -> Option<&Map<String, Value>> {
        self.data.as_object()
    }

    /// Mutable access to the top-level controller map, if `data` is an object.
    pub fn controllers_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.data.as_object_mut()
    }

    /// A single controller's state.
    pub fn controller(&self, name: &str) -> Option<&Value> {
        self.controllers()?.get(name)
    }

    /// Mutable access to a single controller's state.
    pub fn controller_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.controllers_mut()?.get_mut(name)
    }

    /// Names of every top-level controller, in document order.
    ///
    /// Empty when `data` is absent or not an object.
    pub fn controller_keys(&self) -> Vec<String> {
        self.controllers()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_persisted_shape() {
        let raw = r#"{
            "data": { "KeyringController": { "vault": "abc" }, "AppStateController": {} },
            "meta": { "version": 74, "storageKind": "split" }
        }"#;
        let state: PersistedState = serde_json::from_str(raw).unwrap();

        assert_eq!(state.version(), 74);
        assert_eq!(state.storage_kind(), StorageKind::Split);
        assert_eq!(
            state.controller_keys(),
            vec!["KeyringController", "AppStateController"]
        );
    }

    #[test]
    fn missing_meta_fields_default() {
        let state: PersistedState = serde_json::from_str(r#"{ "data": {}, "meta": {} }"#).unwrap();
        assert_eq!(state.version(), 0);
        assert_eq!(state.storage_kind(), StorageKind::Data);
    }

    #[test]
    fn missing_data_is_null() {
        let state: PersistedState =
            serde_json::from_str(r#"{ "meta": { "version": 3 } }"#).unwrap();
        assert!(state.data.is_null());
        assert!(state.controller_keys().is_empty());
    }

    #[test]
    fn serializes_meta_in_camel_case() {
        let state = PersistedState::new(Map::new(), Meta::default());
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value, json!({ "data": {}, "meta": { "version": 0, "storageKind": "data" } }));
    }

    #[test]
    fn controller_keys_keep_document_order() {
        let state = PersistedState::from_value(json!({ "zeta": 1, "alpha": 2, "mid": 3 }), 0);
        assert_eq!(state.controller_keys(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn non_object_data_has_no_controllers() {
        let mut state = PersistedState::from_value(json!([1, 2, 3]), 0);
        assert!(state.controllers().is_none());
        assert!(state.controller_mut("anything").is_none());
        assert!(state.controller_keys().is_empty());
    }

    #[test]
    fn storage_kind_parse() {
        assert_eq!(StorageKind::parse("data"), Some(StorageKind::Data));
        assert_eq!(StorageKind::parse("split"), Some(StorageKind::Split));
        assert_eq!(StorageKind::parse("blob"), None);
        assert_eq!(StorageKind::Split.to_string(), "split");
    }
}
