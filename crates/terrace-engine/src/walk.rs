use std::collections::{BTreeSet, HashMap, HashSet};

use rayon::prelude::*;
use terrace_domain::{Node, NodeId, WalkSummary};

use crate::error::WalkError;
use crate::graph::ResourceGraph;

pub const DEFAULT_MAX_PARALLEL: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkDirection {
    /// Dependencies before dependents.
    #[default]
    Forward,
    /// Dependents before dependencies (teardown order).
    Reverse,
}

type ErrorHandler<'a, E> = Box<dyn FnMut(&Node, &E) + 'a>;

/// How [`ResourceGraph::walk`] traverses the graph.
///
/// Without an `on_error` handler the first visitor failure aborts the walk.
/// With one, failures are handed to the handler and the walk carries on with
/// whatever does not depend on the failed node.
pub struct WalkOptions<'a, E> {
    pub direction: WalkDirection,
    pub parallel: bool,
    pub max_parallel: usize,
    pub on_error: Option<ErrorHandler<'a, E>>,
}

impl<E> Default for WalkOptions<'_, E> {
    fn default() -> Self {
        Self {
            direction: WalkDirection::Forward,
            parallel: false,
            max_parallel: DEFAULT_MAX_PARALLEL,
            on_error: None,
        }
    }
}

impl<'a, E> WalkOptions<'a, E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn direction(mut self, direction: WalkDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Run up to `max_parallel` ready nodes per round (at least one).
    #[must_use]
    pub fn parallel(mut self, max_parallel: usize) -> Self {
        self.parallel = true;
        self.max_parallel = max_parallel;
        self
    }

    #[must_use]
    pub fn on_error(mut self, handler: impl FnMut(&Node, &E) + 'a) -> Self {
        self.on_error = Some(Box::new(handler));
        self
    }
}

impl ResourceGraph {
    /// Invoke `visitor` once per node, never before the node's prerequisites.
    ///
    /// Sequential walks follow [`ResourceGraph::topological_sort`] (reversed
    /// for [`WalkDirection::Reverse`]) and stop at the first unhandled
    /// failure. Parallel walks run in rounds: each round visits up to
    /// `max_parallel` nodes whose prerequisites have all completed, and
    /// waits for the whole round before scheduling the next one. A node whose
    /// visit failed never counts as completed, so its dependents are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::Graph`] when a sequential walk meets a cycle and
    /// [`WalkError::Visitor`] for the first visitor failure when no
    /// `on_error` handler is set. A parallel walk reports that failure once
    /// its round has finished.
    pub fn walk<E, V>(
        &self,
        visitor: V,
        options: WalkOptions<'_, E>,
    ) -> Result<WalkSummary, WalkError<E>>
    where
        V: Fn(&Node) -> Result<(), E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        if options.parallel {
            self.walk_parallel(&visitor, options)
        } else {
            self.walk_sequential(&visitor, options)
        }
    }

    fn walk_sequential<E, V>(
        &self,
        visitor: &V,
        options: WalkOptions<'_, E>,
    ) -> Result<WalkSummary, WalkError<E>>
    where
        V: Fn(&Node) -> Result<(), E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let WalkOptions {
            direction,
            mut on_error,
            ..
        } = options;

        let mut order = self.topological_sort()?;
        if direction == WalkDirection::Reverse {
            order.reverse();
        }

        let mut summary = WalkSummary::default();
        for id in order {
            let Some(node) = self.get_node(&id) else {
                continue;
            };
            match visitor(node) {
                Ok(()) => summary.visited.push(id),
                Err(error) => {
                    let Some(handler) = on_error.as_mut() else {
                        return Err(WalkError::Visitor {
                            node: id,
                            source: error,
                        });
                    };
                    tracing::warn!(node = %id, %error, "visitor failed");
                    handler(node, &error);
                    summary.failed.push(id);
                }
            }
        }

        Ok(summary)
    }

    fn walk_parallel<E, V>(
        &self,
        visitor: &V,
        options: WalkOptions<'_, E>,
    ) -> Result<WalkSummary, WalkError<E>>
    where
        V: Fn(&Node) -> Result<(), E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let WalkOptions {
            direction,
            max_parallel,
            mut on_error,
            ..
        } = options;
        let max_parallel = max_parallel.max(1);

        let (outgoing, incoming) = self.adjacency();
        let (prerequisites, unlocks) = match direction {
            WalkDirection::Forward => (outgoing, incoming),
            WalkDirection::Reverse => (incoming, outgoing),
        };
        let mut pending: HashMap<&NodeId, usize> = self
            .nodes()
            .map(|node| (&node.id, prerequisites.get(&node.id).map_or(0, BTreeSet::len)))
            .collect();
        let mut ready: BTreeSet<&NodeId> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut settled: HashSet<&NodeId> = HashSet::new();
        let mut summary = WalkSummary::default();

        loop {
            let batch: Vec<&Node> = std::iter::from_fn(|| ready.pop_first())
                .take(max_parallel)
                .filter_map(|id| self.get_node(id))
                .collect();
            if batch.is_empty() {
                break;
            }

            tracing::debug!(size = batch.len(), "starting walk round");
            let results: Vec<(&Node, Result<(), E>)> = batch
                .into_par_iter()
                .map(|node| (node, visitor(node)))
                .collect();

            let mut first_error = None;
            for (node, result) in results {
                match result {
                    Ok(()) => {
                        settled.insert(&node.id);
                        summary.visited.push(node.id.clone());
                        for next in unlocks.get(&node.id).into_iter().flatten() {
                            if let Some(count) = pending.get_mut(next) {
                                *count = count.saturating_sub(1);
                                if *count == 0 {
                                    ready.insert(next);
                                }
                            }
                        }
                    }
                    Err(error) => {
                        if let Some(handler) = on_error.as_mut() {
                            tracing::warn!(node = %node.id, %error, "visitor failed");
                            handler(node, &error);
                            settled.insert(&node.id);
                            summary.failed.push(node.id.clone());
                        } else if first_error.is_none() {
                            first_error = Some((node.id.clone(), error));
                        }
                    }
                }
            }

            if let Some((node, source)) = first_error {
                return Err(WalkError::Visitor { node, source });
            }
        }

        summary.skipped = self
            .nodes()
            .filter(|node| !settled.contains(&node.id))
            .map(|node| node.id.clone())
            .collect();
        if !summary.skipped.is_empty() {
            tracing::debug!(count = summary.skipped.len(), "walk left nodes unvisited");
        }

        Ok(summary)
    }
}
