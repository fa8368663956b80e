#![allow(clippy::expect_used)]

use proptest::collection::vec;
use proptest::prelude::*;
use terrace_domain::{
    GraphStats, Node, NodeId, NodeKind, NodeSpec, OutputNode, SourceLocation, VariableNode,
};

use super::ResourceGraph;
use crate::error::{ErrorCode, GraphError};

fn node(id: &str) -> Node {
    Node::new(
        id,
        id,
        "",
        SourceLocation::default(),
        NodeSpec::Variable(VariableNode::default()),
    )
}

fn graph(ids: &[&str], edges: &[(&str, &str)]) -> ResourceGraph {
    let mut graph = ResourceGraph::new();
    for id in ids {
        graph.add_node(node(id)).expect("add node");
    }
    for (from, to) in edges {
        graph.add_edge(from, to).expect("add edge");
    }
    graph
}

fn ids(values: &[&str]) -> Vec<NodeId> {
    values.iter().map(|value| NodeId::from(*value)).collect()
}

fn node_ids(nodes: &[&Node]) -> Vec<NodeId> {
    nodes.iter().map(|node| node.id.clone()).collect()
}

/// `a` needs `b` needs `c`.
fn chain() -> ResourceGraph {
    graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")])
}

#[test]
fn duplicate_node_is_rejected_and_original_kept() {
    let mut graph = graph(&["a"], &[]);
    let mut replacement = node("a");
    replacement.spec = NodeSpec::Output(OutputNode::default());

    let error = graph.add_node(replacement).expect_err("duplicate");

    assert_eq!(error.code(), ErrorCode::DuplicateNode);
    assert_eq!(
        graph.get_node("a").map(Node::kind),
        Some(NodeKind::Variable)
    );
}

#[test]
fn edge_to_missing_node_names_the_missing_endpoint() {
    let mut graph = graph(&["a"], &[]);

    let error = graph.add_edge("a", "ghost").expect_err("missing");

    assert_eq!(
        error,
        GraphError::MissingNode {
            from: NodeId::from("a"),
            to: NodeId::from("ghost"),
            missing: NodeId::from("ghost"),
        }
    );
    assert_eq!(error.code().to_string(), "MISSING_NODE");
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn self_loops_and_reverse_edges_are_cycles() {
    let mut graph = graph(&["a", "b"], &[("a", "b")]);

    assert_eq!(
        graph.add_edge("a", "a").expect_err("self loop").code(),
        ErrorCode::Cycle
    );
    assert_eq!(
        graph.add_edge("b", "a").expect_err("reverse").code(),
        ErrorCode::Cycle
    );
    assert!(!graph.has_edge("b", "a"));
}

#[test]
fn repeated_edges_are_stored_once() {
    let mut graph = graph(&["a", "b"], &[("a", "b")]);
    graph.add_edge("a", "b").expect("repeat");

    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.dependents("b").len(), 1);
}

#[test]
fn removing_a_node_drops_its_edges() {
    let mut graph = chain();

    assert!(graph.remove_node("b"));
    assert!(!graph.remove_node("b"));

    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.outgoing("a").count(), 0);
    assert_eq!(graph.incoming("c").count(), 0);
}

#[test]
fn removing_an_edge_reports_whether_it_existed() {
    let mut graph = chain();

    assert!(graph.remove_edge("a", "b"));
    assert!(!graph.remove_edge("a", "b"));
    assert!(!graph.remove_edge("c", "a"));
    assert!(graph.dependents("b").is_empty());
}

#[test]
fn direct_and_transitive_neighbourhoods() {
    let graph = chain();

    assert_eq!(node_ids(&graph.dependencies("a")), ids(&["b"]));
    assert_eq!(node_ids(&graph.dependents("c")), ids(&["b"]));
    assert_eq!(node_ids(&graph.ancestors("a")), ids(&["b", "c"]));
    assert_eq!(node_ids(&graph.descendants("c")), ids(&["b", "a"]));
    assert!(graph.ancestors("c").is_empty());
    assert!(graph.descendants("missing").is_empty());
}

#[test]
fn roots_have_no_dependencies_and_leaves_no_dependents() {
    let graph = graph(&["a", "b", "c", "x"], &[("a", "b"), ("b", "c")]);

    assert_eq!(graph.roots(), [&NodeId::from("c"), &NodeId::from("x")]);
    assert_eq!(graph.leaves(), [&NodeId::from("a"), &NodeId::from("x")]);
}

#[test]
fn topological_sort_puts_dependencies_first() {
    assert_eq!(
        chain().topological_sort().expect("acyclic"),
        ids(&["c", "b", "a"])
    );
}

#[test]
fn topological_sort_breaks_ties_by_id() {
    let diamond = graph(
        &["a", "b", "c", "d"],
        &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
    );

    assert_eq!(
        diamond.topological_sort().expect("acyclic"),
        ids(&["d", "c", "b", "a"])
    );
}

#[test]
fn topological_sort_of_a_cycle_names_unordered_nodes() {
    let cyclic = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);

    let error = cyclic.topological_sort().expect_err("cycle");

    assert_eq!(error.code(), ErrorCode::Cycle);
    assert_eq!(
        error.to_string(),
        "dependency cycle detected: unable to order a, b, c"
    );
}

#[test]
fn detect_cycles_lists_the_cycle_in_traversal_order() {
    let cyclic = graph(
        &["a", "b", "c", "d"],
        &[("a", "b"), ("b", "c"), ("c", "a"), ("d", "a")],
    );

    assert_eq!(cyclic.detect_cycles(), vec![ids(&["a", "b", "c"])]);
    assert!(chain().detect_cycles().is_empty());
}

#[test]
fn cached_order_is_invalidated_by_mutation() {
    let mut graph = chain();
    assert_eq!(graph.topological_sort().expect("first"), ids(&["c", "b", "a"]));

    graph.add_node(node("d")).expect("add d");
    graph.add_edge("c", "d").expect("c needs d");

    assert_eq!(
        graph.topological_sort().expect("second"),
        ids(&["d", "c", "b", "a"])
    );

    graph.remove_node("d");
    assert_eq!(graph.topological_sort().expect("third"), ids(&["c", "b", "a"]));
}

#[test]
fn transitive_reduction_drops_shortcut_edges() {
    let graph = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "c")]);

    let reduced = graph.transitive_reduction();

    assert_eq!(reduced.node_count(), 3);
    assert!(reduced.has_edge("a", "b"));
    assert!(reduced.has_edge("b", "c"));
    assert!(!reduced.has_edge("a", "c"));
    assert_eq!(graph.edge_count(), 3);
}

#[test]
fn subgraph_keeps_targets_and_their_dependencies() {
    let graph = graph(
        &["a", "b", "c", "x"],
        &[("a", "b"), ("b", "c"), ("x", "c")],
    );

    let subgraph = graph.subgraph(["b", "unknown"]);

    assert_eq!(
        subgraph.nodes().map(|node| node.id.clone()).collect::<Vec<_>>(),
        ids(&["b", "c"])
    );
    assert!(subgraph.has_edge("b", "c"));
    assert_eq!(subgraph.edge_count(), 1);
}

#[test]
fn nodes_by_kind_filters_in_id_order() {
    let mut graph = graph(&["var.b", "var.a"], &[]);
    graph
        .add_node(Node::new(
            "output.x",
            "x",
            "",
            SourceLocation::default(),
            NodeSpec::Output(OutputNode::default()),
        ))
        .expect("add output");

    let variables: Vec<&str> = graph
        .nodes_by_kind(NodeKind::Variable)
        .map(|node| node.id.as_str())
        .collect();
    assert_eq!(variables, ["var.a", "var.b"]);
    assert_eq!(graph.nodes_by_kind(NodeKind::Resource).count(), 0);
}

#[test]
fn clear_empties_the_graph() {
    let mut graph = chain();
    assert_eq!(graph.stats(), GraphStats { nodes: 3, edges: 2 });

    graph.clear();

    assert!(graph.is_empty());
    assert_eq!(graph.stats(), GraphStats::default());
    assert!(graph.topological_sort().expect("empty").is_empty());
}

fn dag() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..10).prop_flat_map(|size| {
        (
            Just(size),
            vec((0..size, 0..size), 0..24).prop_map(|pairs| {
                pairs
                    .into_iter()
                    .filter(|(from, to)| from != to)
                    .map(|(from, to)| (from.min(to), from.max(to)))
                    .collect()
            }),
        )
    })
}

fn label(index: usize) -> String {
    format!("n{index:02}")
}

fn build(size: usize, edges: &[(usize, usize)], rotation: usize, reversed: bool) -> ResourceGraph {
    let mut order: Vec<usize> = (0..size).collect();
    order.rotate_left(rotation % size);
    let mut edges = edges.to_vec();
    if reversed {
        order.reverse();
        edges.reverse();
    }

    let mut graph = ResourceGraph::new();
    for index in order {
        graph.add_node(node(&label(index))).expect("add node");
    }
    for (from, to) in edges {
        graph.add_edge(&label(from), &label(to)).expect("add edge");
    }
    graph
}

fn reaches(graph: &ResourceGraph, from: &str, to: &str) -> bool {
    graph.ancestors(from).iter().any(|node| node.id == to)
}

proptest! {
    #[test]
    fn order_is_independent_of_insertion_order(
        (size, edges) in dag(),
        rotation in 0usize..16,
    ) {
        let reference = build(size, &edges, 0, false);
        let shuffled = build(size, &edges, rotation, true);

        prop_assert_eq!(
            reference.topological_sort().expect("acyclic"),
            shuffled.topological_sort().expect("acyclic")
        );
        prop_assert_eq!(reference.to_dot(), shuffled.to_dot());
    }

    #[test]
    fn every_dependency_precedes_its_dependent((size, edges) in dag()) {
        let graph = build(size, &edges, 0, false);
        let order = graph.topological_sort().expect("acyclic");
        prop_assert_eq!(order.len(), size);

        let position = |id: &NodeId| order.iter().position(|candidate| candidate == id);
        for (from, to) in graph.edges() {
            prop_assert!(position(to) < position(from));
        }
    }

    #[test]
    fn reduction_preserves_reachability((size, edges) in dag()) {
        let graph = build(size, &edges, 0, false);
        let reduced = graph.transitive_reduction();

        for (from, to) in reduced.edges() {
            prop_assert!(graph.has_edge(from, to));
        }
        for from in 0..size {
            for to in 0..size {
                let (from, to) = (label(from), label(to));
                prop_assert_eq!(reaches(&graph, &from, &to), reaches(&reduced, &from, &to));
            }
        }
    }
}
