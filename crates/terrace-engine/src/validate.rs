use terrace_domain::{ConfigDocument, NodeId, ValidationReport};

use crate::builder::{BuildOptions, GraphBuilder};
use crate::error::GraphError;
use crate::graph::ResourceGraph;

/// Build a graph from a single document placed in `module_path`.
///
/// # Errors
///
/// Returns the [`GraphError`] raised while building.
pub fn build_graph(
    document: &ConfigDocument,
    module_path: &str,
) -> std::result::Result<ResourceGraph, GraphError> {
    let mut builder = GraphBuilder::new();
    builder.add_config("<memory>", document.clone());
    builder.build(module_path)
}

/// Validate a single root-module document. Never fails; problems are
/// reported in the returned report.
#[must_use]
pub fn validate_config(document: &ConfigDocument) -> ValidationReport {
    let mut builder = GraphBuilder::new();
    builder.add_config("<memory>", document.clone());
    validate_builder(&mut builder, "")
}

/// Build with `builder` and collect every error and warning.
///
/// A build failure becomes the only error. Otherwise each detected cycle is
/// reported, and unresolved references recorded in strict mode become
/// warnings.
pub fn validate_builder(builder: &mut GraphBuilder, module_path: &str) -> ValidationReport {
    let graph = match builder.build(module_path) {
        Ok(graph) => graph,
        Err(error) => return ValidationReport::from_errors(vec![describe(&error)]),
    };

    let errors = graph
        .detect_cycles()
        .iter()
        .map(|cycle| cycle_message(cycle))
        .collect();
    let mut report = ValidationReport::from_errors(errors);
    report.warnings = builder
        .unresolved()
        .iter()
        .map(|reference| {
            format!(
                "{} references {} which does not resolve to any node",
                reference.node, reference.token
            )
        })
        .collect();
    report
}

/// Fresh builder, optionally recording unresolved references.
#[must_use]
pub fn strict_builder(strict_references: bool) -> GraphBuilder {
    GraphBuilder::with_options(BuildOptions { strict_references })
}

fn describe(error: &GraphError) -> String {
    format!("[{}] {error}", error.code())
}

fn cycle_message(cycle: &[NodeId]) -> String {
    let mut path: Vec<&str> = cycle.iter().map(NodeId::as_str).collect();
    if let Some(first) = path.first().copied() {
        path.push(first);
    }
    format!("dependency cycle detected: {}", path.join(" -> "))
}
