use std::fmt::Write;

use crate::graph::ResourceGraph;

impl ResourceGraph {
    /// Graphviz description of the graph.
    ///
    /// Nodes are labelled `<kind>:<name>`; nodes and edges are emitted in id
    /// order so identical graphs serialize identically.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut output = String::from("digraph resource_graph {\n");
        for node in self.nodes() {
            let _ = writeln!(
                output,
                "  \"{}\" [label=\"{}:{}\"];",
                escape(&node.id),
                node.kind(),
                escape(&node.name)
            );
        }
        for (from, to) in self.edges() {
            let _ = writeln!(output, "  \"{}\" -> \"{}\";", escape(from), escape(to));
        }
        output.push('}');
        output
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
