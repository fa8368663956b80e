use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

mod config;
mod report;

pub use config::{ConfigDocument, OutputDecl, ProviderDecl, VariableDecl};
pub use report::{GraphStats, OrderReport, UnresolvedReference, ValidationReport, WalkSummary};

/// Untyped, insertion-ordered key/value payload carried by resources, data
/// sources, providers and module calls after reserved keys are stripped.
pub type ConfigMap = Map<String, Value>;

/// Globally unique, module-qualified node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `var.<name>`, prefixed with `<module>.` outside the root module.
    #[must_use]
    pub fn variable(module: &str, name: &str) -> Self {
        Self::scoped(module, &format!("var.{name}"))
    }

    #[must_use]
    pub fn provider(module: &str, name: &str, alias: &str) -> Self {
        Self::scoped(module, &format!("provider.{name}.{alias}"))
    }

    #[must_use]
    pub fn resource(module: &str, resource_type: &str, name: &str) -> Self {
        Self::scoped(module, &format!("resource.{resource_type}.{name}"))
    }

    #[must_use]
    pub fn data(module: &str, data_type: &str, name: &str) -> Self {
        Self::scoped(module, &format!("data.{data_type}.{name}"))
    }

    #[must_use]
    pub fn module_call(module: &str, name: &str) -> Self {
        Self::scoped(module, &format!("module.{name}"))
    }

    #[must_use]
    pub fn output(module: &str, name: &str) -> Self {
        Self::scoped(module, &format!("output.{name}"))
    }

    fn scoped(module: &str, local: &str) -> Self {
        if module.is_empty() {
            Self(local.to_string())
        } else {
            Self(format!("{module}.{local}"))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<NodeId> for String {
    fn from(value: NodeId) -> Self {
        value.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Deref for NodeId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(formatter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Variable,
    Provider,
    Resource,
    Data,
    Module,
    Output,
}

impl NodeKind {
    pub const ALL: [Self; 6] = [
        Self::Variable,
        Self::Provider,
        Self::Resource,
        Self::Data,
        Self::Module,
        Self::Output,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Variable => "variable",
            Self::Provider => "provider",
            Self::Resource => "resource",
            Self::Data => "data",
            Self::Module => "module",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Where a node was declared. Diagnostic only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl SourceLocation {
    #[must_use]
    pub fn file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.file)?;
        if let Some(line) = self.line {
            write!(formatter, ":{line}")?;
            if let Some(column) = self.column {
                write!(formatter, ":{column}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub prevent_destroy: bool,
    pub ignore_changes: Vec<String>,
    pub replace_triggered_by: Vec<String>,
    pub create_before_destroy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableNode {
    pub default: Option<Value>,
    pub var_type: Option<String>,
    pub description: Option<String>,
    pub sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderNode {
    pub provider_name: String,
    pub alias: String,
    pub config: ConfigMap,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub resource_type: String,
    pub config: ConfigMap,
    pub depends_on: Vec<String>,
    pub provider: String,
    pub lifecycle: Option<Lifecycle>,
}

/// A read-only lookup of external state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataNode {
    pub data_type: String,
    pub config: ConfigMap,
    pub depends_on: Vec<String>,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleNode {
    /// Where the called module comes from (not a diagnostic location).
    pub source: String,
    pub inputs: ConfigMap,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputNode {
    pub value: Value,
    pub sensitive: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSpec {
    Variable(VariableNode),
    Provider(ProviderNode),
    Resource(ResourceNode),
    Data(DataNode),
    Module(ModuleNode),
    Output(OutputNode),
}

impl NodeSpec {
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Variable(_) => NodeKind::Variable,
            Self::Provider(_) => NodeKind::Provider,
            Self::Resource(_) => NodeKind::Resource,
            Self::Data(_) => NodeKind::Data,
            Self::Module(_) => NodeKind::Module,
            Self::Output(_) => NodeKind::Output,
        }
    }
}

/// One declared configuration entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Unqualified name as declared (`<name>.<alias>` for providers).
    pub name: String,
    /// Dotted module path; empty for the root module.
    pub module: String,
    pub location: SourceLocation,
    pub spec: NodeSpec,
}

impl Node {
    #[must_use]
    pub fn new(
        id: impl Into<NodeId>,
        name: impl Into<String>,
        module: impl Into<String>,
        location: SourceLocation,
        spec: NodeSpec,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            module: module.into(),
            location,
            spec,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.spec.kind()
    }

    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        match &self.spec {
            NodeSpec::Variable(variable) => variable.sensitive,
            NodeSpec::Output(output) => output.sensitive,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Node, NodeId, NodeKind, NodeSpec, OutputNode, SourceLocation};

    #[test]
    fn root_ids_have_no_module_prefix() {
        assert_eq!(NodeId::variable("", "region"), "var.region");
        assert_eq!(
            NodeId::resource("", "aws_instance", "web"),
            "resource.aws_instance.web"
        );
        assert_eq!(NodeId::output("", "ip"), "output.ip");
    }

    #[test]
    fn module_ids_are_prefixed() {
        assert_eq!(
            NodeId::resource("app", "aws_instance", "web"),
            "app.resource.aws_instance.web"
        );
        assert_eq!(
            NodeId::provider("app", "aws", "east"),
            "app.provider.aws.east"
        );
        assert_eq!(NodeId::data("app.net", "aws_ami", "ubuntu"), "app.net.data.aws_ami.ubuntu");
        assert_eq!(NodeId::module_call("app", "vpc"), "app.module.vpc");
    }

    #[test]
    fn location_display_includes_known_positions() {
        let mut location = SourceLocation::file("main.json");
        assert_eq!(location.to_string(), "main.json");
        location.line = Some(3);
        location.column = Some(7);
        assert_eq!(location.to_string(), "main.json:3:7");
    }

    #[test]
    fn sensitive_outputs_are_reported() {
        let node = Node::new(
            NodeId::output("", "password"),
            "password",
            "",
            SourceLocation::default(),
            NodeSpec::Output(OutputNode {
                sensitive: true,
                ..OutputNode::default()
            }),
        );
        assert_eq!(node.kind(), NodeKind::Output);
        assert!(node.is_sensitive());
    }
}
