//! Bridge configuration.

use std::sync::Arc;

use portbridge_core::{FileSystem, Program};
use serde::{Deserialize, Serialize};

/// Settings for a bridge instance and its namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Name of the namespace the UI side addresses.
    pub namespace: String,

    /// Version of the namespace. Both sides must agree on it.
    pub version: String,

    /// Message used when a rejection carries neither a message nor a
    /// string form.
    pub unknown_error: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            namespace: "fission-codes/webnative".to_string(),
            version: "8.0.0".to_string(),
            unknown_error: "Unknown error".to_string(),
        }
    }
}

/// Handles that exist before the bridge is set up, e.g. from an earlier
/// run of the UI within the same process.
#[derive(Clone, Default)]
pub struct InitOptions {
    pub programs: Vec<Arc<dyn Program>>,
    pub file_systems: Vec<Arc<dyn FileSystem>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.namespace, "fission-codes/webnative");
        assert_eq!(config.version, "8.0.0");
        assert_eq!(config.unknown_error, "Unknown error");
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: BridgeConfig = serde_json::from_str(r#"{"version": "9.0.0"}"#).unwrap();
        assert_eq!(config.version, "9.0.0");
        assert_eq!(config.namespace, "fission-codes/webnative");
        assert_eq!(config.unknown_error, "Unknown error");
    }
}
