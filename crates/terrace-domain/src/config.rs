use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ConfigMap;

/// One parsed configuration document.
///
/// Every section is optional; missing sections deserialize as empty maps.
/// Both the plural section names and the singular block names
/// (`variable`, `provider`, `resource`, `module`, `output`) are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    #[serde(alias = "variable")]
    pub variables: BTreeMap<String, VariableDecl>,
    #[serde(alias = "provider")]
    pub providers: BTreeMap<String, ProviderDecl>,
    /// `type -> name -> config`
    #[serde(alias = "resource")]
    pub resources: BTreeMap<String, BTreeMap<String, ConfigMap>>,
    /// `type -> name -> config`
    pub data: BTreeMap<String, BTreeMap<String, ConfigMap>>,
    /// `name -> {source, version, ...inputs}`
    #[serde(alias = "module")]
    pub modules: BTreeMap<String, ConfigMap>,
    #[serde(alias = "output")]
    pub outputs: BTreeMap<String, OutputDecl>,
}

impl ConfigDocument {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
            && self.providers.is_empty()
            && self.resources.is_empty()
            && self.data.is_empty()
            && self.modules.is_empty()
            && self.outputs.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableDecl {
    pub default: Option<Value>,
    #[serde(rename = "type")]
    pub var_type: Option<String>,
    pub description: Option<String>,
    pub sensitive: bool,
}

/// A provider is either configured once or as a list of aliased instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderDecl {
    Aliased(Vec<ConfigMap>),
    Single(ConfigMap),
}

impl ProviderDecl {
    #[must_use]
    pub fn instances(&self) -> &[ConfigMap] {
        match self {
            Self::Aliased(instances) => instances,
            Self::Single(config) => std::slice::from_ref(config),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputDecl {
    pub value: Value,
    pub sensitive: bool,
    pub description: Option<String>,
}
