use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::OnceLock;

use terrace_domain::{GraphStats, Node, NodeId, NodeKind};

use crate::error::GraphError;

type GraphResult<T> = std::result::Result<T, GraphError>;

pub(crate) type Adjacency = BTreeMap<NodeId, BTreeSet<NodeId>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Visited,
}

/// Dependency graph over configuration nodes.
///
/// An edge `from -> to` means `from` depends on `to`: `to` must be realized
/// before `from`. Adjacency is kept in both directions so dependencies and
/// dependents are equally cheap to reach. Ordered collections keep every
/// query deterministic regardless of insertion history.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    nodes: BTreeMap<NodeId, Node>,
    outgoing: Adjacency,
    incoming: Adjacency,
    sorted: OnceLock<Vec<NodeId>>,
}

impl ResourceGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateNode`] when a node with the same id is
    /// already present; the existing node is left untouched.
    pub fn add_node(&mut self, node: Node) -> GraphResult<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode {
                id: node.id.clone(),
            });
        }

        tracing::debug!(id = %node.id, kind = %node.kind(), "added node");
        self.nodes.insert(node.id.clone(), node);
        self.invalidate();
        Ok(())
    }

    /// Remove a node together with every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> bool {
        if self.nodes.remove(id).is_none() {
            return false;
        }

        if let Some(targets) = self.outgoing.remove(id) {
            for to in targets {
                if let Some(sources) = self.incoming.get_mut(&to) {
                    sources.remove(id);
                }
            }
        }
        if let Some(sources) = self.incoming.remove(id) {
            for from in sources {
                if let Some(targets) = self.outgoing.get_mut(&from) {
                    targets.remove(id);
                }
            }
        }

        tracing::debug!(id, "removed node");
        self.invalidate();
        true
    }

    /// Record that `from` depends on `to`. Adding an existing edge again is
    /// a no-op.
    ///
    /// Only two-node cycles are rejected here; longer cycles surface through
    /// [`Self::detect_cycles`] or a failing [`Self::topological_sort`].
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingNode`] when either endpoint is absent and
    /// [`GraphError::Cycle`] for a self-loop or when `to -> from` exists.
    pub fn add_edge(&mut self, from: &str, to: &str) -> GraphResult<()> {
        for endpoint in [from, to] {
            if !self.nodes.contains_key(endpoint) {
                return Err(GraphError::MissingNode {
                    from: NodeId::from(from),
                    to: NodeId::from(to),
                    missing: NodeId::from(endpoint),
                });
            }
        }

        if from == to {
            return Err(GraphError::cycle(format!("{from} cannot depend on itself")));
        }
        if self.has_edge(to, from) {
            return Err(GraphError::cycle(format!(
                "{from} -> {to} reverses existing edge {to} -> {from}"
            )));
        }
        if self.has_edge(from, to) {
            return Ok(());
        }

        self.insert_edge(NodeId::from(from), NodeId::from(to));
        tracing::debug!(from, to, "added edge");
        self.invalidate();
        Ok(())
    }

    pub fn remove_edge(&mut self, from: &str, to: &str) -> bool {
        let removed = self
            .outgoing
            .get_mut(from)
            .is_some_and(|targets| targets.remove(to));
        if !removed {
            return false;
        }

        if let Some(sources) = self.incoming.get_mut(to) {
            sources.remove(from);
        }
        tracing::debug!(from, to, "removed edge");
        self.invalidate();
        true
    }

    #[must_use]
    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.outgoing
            .get(from)
            .is_some_and(|targets| targets.contains(to))
    }

    #[must_use]
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All nodes, ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn nodes_by_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |node| node.kind() == kind)
    }

    /// Every edge as `(from, to)`, ordered by `from` then `to`.
    pub fn edges(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> {
        self.outgoing
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| (from, to)))
    }

    /// Ids `id` points at, i.e. its direct dependencies.
    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = &NodeId> {
        self.outgoing.get(id).into_iter().flatten()
    }

    /// Ids pointing at `id`, i.e. its direct dependents.
    pub fn incoming(&self, id: &str) -> impl Iterator<Item = &NodeId> {
        self.incoming.get(id).into_iter().flatten()
    }

    /// Outgoing and incoming adjacency, in that order.
    pub(crate) fn adjacency(&self) -> (&Adjacency, &Adjacency) {
        (&self.outgoing, &self.incoming)
    }

    #[must_use]
    pub fn dependencies(&self, id: &str) -> Vec<&Node> {
        self.outgoing(id).filter_map(|to| self.nodes.get(to)).collect()
    }

    #[must_use]
    pub fn dependents(&self, id: &str) -> Vec<&Node> {
        self.incoming(id)
            .filter_map(|from| self.nodes.get(from))
            .collect()
    }

    /// Transitive dependencies of `id`, nearest first, excluding `id`.
    #[must_use]
    pub fn ancestors(&self, id: &str) -> Vec<&Node> {
        self.closure(id, &self.outgoing)
    }

    /// Transitive dependents of `id`, nearest first, excluding `id`.
    #[must_use]
    pub fn descendants(&self, id: &str) -> Vec<&Node> {
        self.closure(id, &self.incoming)
    }

    fn closure<'a>(
        &'a self,
        seed: &str,
        adjacency: &'a Adjacency,
    ) -> Vec<&'a Node> {
        let mut seen: HashSet<&NodeId> = HashSet::new();
        let mut queue: VecDeque<&NodeId> = adjacency.get(seed).into_iter().flatten().collect();
        let mut found = Vec::new();

        while let Some(next) = queue.pop_front() {
            if next.as_str() == seed || !seen.insert(next) {
                continue;
            }
            if let Some(node) = self.nodes.get(next) {
                found.push(node);
            }
            queue.extend(adjacency.get(next).into_iter().flatten());
        }

        found
    }

    /// Nodes without dependencies.
    #[must_use]
    pub fn roots(&self) -> Vec<&NodeId> {
        self.nodes
            .keys()
            .filter(|id| self.outgoing(id).next().is_none())
            .collect()
    }

    /// Nodes nothing depends on.
    #[must_use]
    pub fn leaves(&self) -> Vec<&NodeId> {
        self.nodes
            .keys()
            .filter(|id| self.incoming(id).next().is_none())
            .collect()
    }

    /// Dependency-first ordering of every node id.
    ///
    /// Kahn's algorithm runs from the nodes nothing depends on, always taking
    /// the lexicographically smallest ready id, and the result is reversed.
    /// The order therefore depends only on graph content. It is cached until
    /// the next mutation.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Cycle`] naming the nodes left unordered when the
    /// graph is cyclic.
    pub fn topological_sort(&self) -> GraphResult<Vec<NodeId>> {
        if let Some(order) = self.sorted.get() {
            return Ok(order.clone());
        }

        let mut pending_dependents: BTreeMap<&NodeId, usize> =
            self.nodes.keys().map(|id| (id, 0)).collect();
        for (_, to) in self.edges() {
            if let Some(count) = pending_dependents.get_mut(to) {
                *count += 1;
            }
        }

        let mut ready: BTreeSet<&NodeId> = pending_dependents
            .iter()
            .filter_map(|(id, count)| (*count == 0).then_some(*id))
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(next) = ready.pop_first() {
            order.push(next.clone());
            for to in self.outgoing(next) {
                let Some(count) = pending_dependents.get_mut(to) else {
                    continue;
                };
                *count = count.saturating_sub(1);
                if *count == 0 {
                    ready.insert(to);
                }
            }
        }

        if order.len() != self.nodes.len() {
            let leftovers = pending_dependents
                .iter()
                .filter_map(|(id, count)| (*count > 0).then(|| id.as_str()))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(GraphError::cycle(format!("unable to order {leftovers}")));
        }

        order.reverse();
        tracing::debug!(
            nodes = self.nodes.len(),
            edges = self.edge_count(),
            "topological sort complete"
        );
        let _ = self.sorted.set(order.clone());
        Ok(order)
    }

    /// Every cycle reachable by depth-first search, each listed in traversal
    /// order. Empty when the graph is acyclic.
    #[must_use]
    pub fn detect_cycles(&self) -> Vec<Vec<NodeId>> {
        let mut states = HashMap::new();
        let mut stack = Vec::new();
        let mut cycles = Vec::new();

        for id in self.nodes.keys() {
            if !states.contains_key(id) {
                self.visit_for_cycles(id, &mut states, &mut stack, &mut cycles);
            }
        }

        cycles
    }

    fn visit_for_cycles<'a>(
        &'a self,
        node: &'a NodeId,
        states: &mut HashMap<&'a NodeId, VisitState>,
        stack: &mut Vec<&'a NodeId>,
        cycles: &mut Vec<Vec<NodeId>>,
    ) {
        states.insert(node, VisitState::Visiting);
        stack.push(node);

        for next in self.outgoing(node) {
            match states.get(next) {
                Some(VisitState::Visiting) => {
                    let start = stack.iter().position(|id| *id == next).unwrap_or(0);
                    cycles.push(stack[start..].iter().map(|id| (*id).clone()).collect());
                }
                Some(VisitState::Visited) => {}
                None => self.visit_for_cycles(next, states, stack, cycles),
            }
        }

        stack.pop();
        states.insert(node, VisitState::Visited);
    }

    /// Copy of the graph keeping only edges with no indirect alternative.
    #[must_use]
    pub fn transitive_reduction(&self) -> Self {
        let mut reduced = self.copy_nodes(self.nodes.keys());
        for (from, to) in self.edges() {
            if !self.reachable_indirectly(from, to) {
                reduced.insert_edge(from.clone(), to.clone());
            }
        }
        reduced
    }

    fn reachable_indirectly(&self, from: &NodeId, to: &NodeId) -> bool {
        let mut seen: HashSet<&NodeId> = HashSet::new();
        let mut queue: VecDeque<&NodeId> = self.outgoing(from).filter(|id| *id != to).collect();

        while let Some(next) = queue.pop_front() {
            if next == to {
                return true;
            }
            if seen.insert(next) {
                queue.extend(self.outgoing(next));
            }
        }
        false
    }

    /// New graph holding `ids`, all of their transitive dependencies and the
    /// edges among them. Unknown ids are ignored.
    #[must_use]
    pub fn subgraph<I, S>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut included: BTreeSet<&NodeId> = BTreeSet::new();
        for id in ids {
            let Some((key, _)) = self.nodes.get_key_value(id.as_ref()) else {
                continue;
            };
            included.insert(key);
            included.extend(self.ancestors(key).into_iter().map(|node| &node.id));
        }

        let mut subgraph = self.copy_nodes(included.iter().copied());
        for (from, to) in self.edges() {
            if included.contains(from) && included.contains(to) {
                subgraph.insert_edge(from.clone(), to.clone());
            }
        }
        subgraph
    }

    fn copy_nodes<'a>(&'a self, ids: impl Iterator<Item = &'a NodeId>) -> Self {
        let mut copy = Self::new();
        for id in ids {
            if let Some(node) = self.nodes.get(id) {
                copy.nodes.insert(id.clone(), node.clone());
            }
        }
        copy
    }

    fn insert_edge(&mut self, from: NodeId, to: NodeId) {
        self.incoming
            .entry(to.clone())
            .or_default()
            .insert(from.clone());
        self.outgoing.entry(from).or_default().insert(to);
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.outgoing.clear();
        self.incoming.clear();
        self.invalidate();
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(BTreeSet::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.node_count(),
            edges: self.edge_count(),
        }
    }

    fn invalidate(&mut self) {
        self.sorted = OnceLock::new();
    }
}

#[cfg(test)]
mod tests;
