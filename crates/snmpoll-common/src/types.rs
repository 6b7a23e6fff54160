use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Override map supplied by the caller, keyed by setting name.
///
/// Values are arbitrary JSON: thresholds may be a bare number or a
/// per-mount-path object, pattern lists a string or an array of strings.
pub type ConfigMap = Map<String, Value>;

/// One node as handed over by the monitoring manager for a single
/// polling cycle. Immutable for the duration of the run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeSpec {
    /// Connection targets; only the first address is polled.
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Per-node setting overrides, narrowest layer of the config resolution.
    #[serde(default)]
    pub config: ConfigMap,
    /// Mount map the manager recorded from a previous disk run, so a mount
    /// that disappeared can be reported as cleared instead of silently
    /// dropped.
    #[serde(default)]
    pub mounts: Option<ConfigMap>,
}

impl NodeSpec {
    /// Node with a single address and no overrides.
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            addresses: vec![address.into()],
            ..Self::default()
        }
    }

    /// The connection target for this node, if it has one.
    pub fn address(&self) -> Option<&str> {
        self.addresses.first().map(String::as_str)
    }
}

/// The verdict for one host for one check mode.
///
/// `fields` holds the mode-specific metric payload and is flattened on
/// serialization; `error` means the check failed its hard threshold,
/// `warning` a soft one. Absence of both means a clean pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HostReport {
    #[serde(flatten)]
    pub fields: ConfigMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HostReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report carrying only an error string, used when a worker fails
    /// before producing any metrics.
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn passed(&self) -> bool {
        self.warning.is_none() && self.error.is_none()
    }
}
