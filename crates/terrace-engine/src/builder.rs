use std::collections::BTreeSet;

use serde_json::Value;
use terrace_domain::{
    ConfigDocument, ConfigMap, DataNode, Lifecycle, ModuleNode, Node, NodeId, NodeSpec,
    OutputNode, ProviderNode, ResourceNode, SourceLocation, UnresolvedReference, VariableNode,
};

use crate::error::GraphError;
use crate::graph::ResourceGraph;
use crate::interpolation::{extract_map_references, extract_references};
use crate::resolve::{
    DEFAULT_PROVIDER_ALIAS, provider_binding, provider_candidates, reference_candidates,
};

type BuildResult<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Record references that resolve to no node (see
    /// [`GraphBuilder::unresolved`]). The graph itself is unaffected.
    pub strict_references: bool,
}

#[derive(Debug, Clone)]
struct RegisteredConfig {
    path: String,
    module: Option<String>,
    document: ConfigDocument,
}

/// Folds parsed configuration documents into a [`ResourceGraph`].
///
/// Nodes from every document are created first; dependency edges are wired
/// afterwards across all of them so references may point forward into later
/// documents. References that name no existing node are dropped silently.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    configs: Vec<RegisteredConfig>,
    options: BuildOptions,
    unresolved: Vec<UnresolvedReference>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: BuildOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Register a document placed in the module given to [`Self::build`].
    /// `path` is only used for diagnostics.
    pub fn add_config(&mut self, path: impl Into<String>, document: ConfigDocument) -> &mut Self {
        self.configs.push(RegisteredConfig {
            path: path.into(),
            module: None,
            document,
        });
        self
    }

    /// Register a document that always belongs to `module`.
    pub fn add_module_config(
        &mut self,
        path: impl Into<String>,
        module: impl Into<String>,
        document: ConfigDocument,
    ) -> &mut Self {
        self.configs.push(RegisteredConfig {
            path: path.into(),
            module: Some(module.into()),
            document,
        });
        self
    }

    /// References left unresolved by the last build. Only populated when
    /// [`BuildOptions::strict_references`] is set.
    #[must_use]
    pub fn unresolved(&self) -> &[UnresolvedReference] {
        &self.unresolved
    }

    /// Build a fresh graph from every registered document.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateNode`] when two declarations map to
    /// the same id, and [`GraphError::Cycle`] when wiring would add the
    /// reverse of an existing edge.
    pub fn build(&mut self, module_path: &str) -> BuildResult<ResourceGraph> {
        self.unresolved.clear();
        let mut graph = ResourceGraph::new();

        for config in &self.configs {
            let module = config.module.as_deref().unwrap_or(module_path);
            add_document_nodes(&mut graph, &config.path, module, &config.document)?;
        }

        let unresolved = wire_dependencies(&mut graph, self.options.strict_references)?;
        if self.options.strict_references {
            self.unresolved = unresolved;
        }

        tracing::info!(
            documents = self.configs.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built resource graph"
        );
        Ok(graph)
    }
}

fn add_document_nodes(
    graph: &mut ResourceGraph,
    path: &str,
    module: &str,
    document: &ConfigDocument,
) -> BuildResult<()> {
    let location = SourceLocation::file(path);
    let node = |id: NodeId, name: &str, spec: NodeSpec| {
        Node::new(id, name, module, location.clone(), spec)
    };

    for (name, decl) in &document.variables {
        graph.add_node(node(
            NodeId::variable(module, name),
            name.as_str(),
            NodeSpec::Variable(VariableNode {
                default: decl.default.clone(),
                var_type: decl.var_type.clone(),
                description: decl.description.clone(),
                sensitive: decl.sensitive,
            }),
        ))?;
    }

    for (name, decl) in &document.providers {
        for instance in decl.instances() {
            let mut config = instance.clone();
            let alias = take_string(&mut config, "alias")
                .unwrap_or_else(|| DEFAULT_PROVIDER_ALIAS.to_string());
            let version = take_string(&mut config, "version");
            graph.add_node(node(
                NodeId::provider(module, name, &alias),
                format!("{name}.{alias}").as_str(),
                NodeSpec::Provider(ProviderNode {
                    provider_name: name.clone(),
                    alias,
                    config,
                    version,
                }),
            ))?;
        }
    }

    for (resource_type, by_name) in &document.resources {
        for (name, raw) in by_name {
            let declaration = Declaration::extract(raw, resource_type);
            graph.add_node(node(
                NodeId::resource(module, resource_type, name),
                name.as_str(),
                NodeSpec::Resource(ResourceNode {
                    resource_type: resource_type.clone(),
                    config: declaration.config,
                    depends_on: declaration.depends_on,
                    provider: declaration.provider,
                    lifecycle: declaration.lifecycle,
                }),
            ))?;
        }
    }

    for (data_type, by_name) in &document.data {
        for (name, raw) in by_name {
            let declaration = Declaration::extract(raw, data_type);
            graph.add_node(node(
                NodeId::data(module, data_type, name),
                name.as_str(),
                NodeSpec::Data(DataNode {
                    data_type: data_type.clone(),
                    config: declaration.config,
                    depends_on: declaration.depends_on,
                    provider: declaration.provider,
                }),
            ))?;
        }
    }

    for (name, raw) in &document.modules {
        let mut inputs = raw.clone();
        let source = take_string(&mut inputs, "source").unwrap_or_default();
        let version = take_string(&mut inputs, "version");
        graph.add_node(node(
            NodeId::module_call(module, name),
            name.as_str(),
            NodeSpec::Module(ModuleNode {
                source,
                inputs,
                version,
            }),
        ))?;
    }

    for (name, decl) in &document.outputs {
        graph.add_node(node(
            NodeId::output(module, name),
            name.as_str(),
            NodeSpec::Output(OutputNode {
                value: decl.value.clone(),
                sensitive: decl.sensitive,
                description: decl.description.clone(),
            }),
        ))?;
    }

    Ok(())
}

/// A resource or data source body split into framework keys and the opaque
/// remainder.
struct Declaration {
    config: ConfigMap,
    depends_on: Vec<String>,
    provider: String,
    lifecycle: Option<Lifecycle>,
}

impl Declaration {
    fn extract(raw: &ConfigMap, resource_type: &str) -> Self {
        let mut config = raw.clone();
        let explicit_provider = take_string(&mut config, "provider");
        let depends_on = config
            .shift_remove("depends_on")
            .map(|value| string_list(&value))
            .unwrap_or_default();
        let lifecycle = config
            .shift_remove("lifecycle")
            .map(|value| parse_lifecycle(&value));
        let provider = explicit_provider.unwrap_or_else(|| {
            provider_binding(None, resource_type).0.to_string()
        });

        Self {
            config,
            depends_on,
            provider,
            lifecycle,
        }
    }
}

fn take_string(config: &mut ConfigMap, key: &str) -> Option<String> {
    match config.shift_remove(key)? {
        Value::String(value) => Some(value),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(single) => vec![single.clone()],
        _ => Vec::new(),
    }
}

fn parse_lifecycle(value: &Value) -> Lifecycle {
    let flag = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);
    let list = |key: &str| value.get(key).map(string_list).unwrap_or_default();
    Lifecycle {
        prevent_destroy: flag("prevent_destroy"),
        ignore_changes: list("ignore_changes"),
        replace_triggered_by: list("replace_triggered_by"),
        create_before_destroy: flag("create_before_destroy"),
    }
}

/// Second pass: turn explicit dependencies, provider bindings and
/// interpolated references into edges.
///
/// Data sources only wire `depends_on` and their provider; their config is
/// not scanned for references.
fn wire_dependencies(
    graph: &mut ResourceGraph,
    strict: bool,
) -> BuildResult<Vec<UnresolvedReference>> {
    let mut edges: Vec<(NodeId, NodeId)> = Vec::new();
    let mut unresolved = BTreeSet::new();

    for node in graph.nodes() {
        let module = node.module.as_str();
        let (explicit, scanned, provider) = match &node.spec {
            NodeSpec::Resource(resource) => (
                resource.depends_on.as_slice(),
                extract_map_references(resource.config.values()),
                Some(provider_binding(
                    Some(resource.provider.as_str()),
                    &resource.resource_type,
                )),
            ),
            NodeSpec::Data(data) => (
                data.depends_on.as_slice(),
                BTreeSet::new(),
                Some(provider_binding(
                    Some(data.provider.as_str()),
                    &data.data_type,
                )),
            ),
            NodeSpec::Output(output) => (&[][..], extract_references(&output.value), None),
            NodeSpec::Module(call) => (&[][..], extract_map_references(call.inputs.values()), None),
            NodeSpec::Variable(_) | NodeSpec::Provider(_) => continue,
        };

        for token in explicit.iter().chain(scanned.iter()) {
            let target = reference_candidates(token, module)
                .into_iter()
                .find(|candidate| graph.has_node(candidate));
            match target {
                Some(target) => edges.push((node.id.clone(), target)),
                None => {
                    if strict {
                        tracing::warn!(node = %node.id, token = %token, "unresolved reference");
                    } else {
                        tracing::debug!(node = %node.id, token = %token, "unresolved reference");
                    }
                    unresolved.insert(UnresolvedReference {
                        node: node.id.clone(),
                        token: token.clone(),
                    });
                }
            }
        }

        if let Some((name, alias)) = provider
            && let Some(target) = provider_candidates(module, name, alias)
                .into_iter()
                .find(|candidate| graph.has_node(candidate))
        {
            edges.push((node.id.clone(), target));
        }
    }

    for (from, to) in edges {
        if from != to {
            graph.add_edge(&from, &to)?;
        }
    }

    Ok(unresolved.into_iter().collect())
}
