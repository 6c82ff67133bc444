//! `package.json` reading.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use shipyard_plugin::{PluginError, PluginResult};

/// The parts of `package.json` the target needs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Package name.
    pub name: String,
    /// Current version.
    #[serde(default)]
    pub version: Option<String>,
    /// Private packages are never published.
    #[serde(default)]
    pub private: bool,
    /// Publish settings.
    #[serde(default)]
    pub publish_config: BTreeMap<String, Value>,
}

impl Manifest {
    /// Reads and parses a manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or has no `name`.
    pub fn load(path: impl AsRef<Path>) -> PluginResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|err| PluginError::Config(format!("{}: {err}", path.display())))
    }

    /// Returns the registry from `publishConfig`, if any.
    ///
    /// `registry` wins; otherwise the first scoped `@scope:registry` entry.
    #[must_use]
    pub fn registry(&self) -> Option<&str> {
        self.publish_config
            .get("registry")
            .or_else(|| {
                self.publish_config
                    .iter()
                    .find(|(key, _)| key.ends_with(":registry"))
                    .map(|(_, value)| value)
            })
            .and_then(Value::as_str)
    }
}
