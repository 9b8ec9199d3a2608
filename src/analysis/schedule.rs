//! Topological scheduling of block graphs (Kahn's algorithm).

use crate::graph::{BlockGraph, GraphError, GraphResult};
use petgraph::graph::NodeIndex;
use std::collections::VecDeque;
use tracing::debug;

/// Outcome of a Kahn pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Nodes whose dependencies were all satisfied, in processing order.
    pub order: Vec<NodeIndex>,
    /// Nodes never released because they sit on or behind a cycle, in
    /// payload order.
    pub unvisited: Vec<NodeIndex>,
}

impl Schedule {
    pub fn is_complete(&self) -> bool {
        self.unvisited.is_empty()
    }
}

/// Runs Kahn's algorithm without judging the result.
///
/// Zero in-degree nodes are seeded in payload order and successors are
/// released in payload edge order, so the ordering is deterministic. Every
/// node is visited at most once.
pub fn kahn_order(graph: &BlockGraph) -> Schedule {
    let mut in_degree: Vec<usize> = graph.node_indices().map(|n| graph.in_degree(n)).collect();
    let mut queue: VecDeque<NodeIndex> = graph
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .collect();
    let mut order = Vec::with_capacity(graph.node_count());

    while let Some(node) = queue.pop_front() {
        order.push(node);
        for successor in graph.successors(node) {
            let degree = &mut in_degree[successor.index()];
            *degree -= 1;
            if *degree == 0 {
                queue.push_back(successor);
            }
        }
    }

    let unvisited = graph
        .node_indices()
        .filter(|n| in_degree[n.index()] > 0)
        .collect();

    Schedule { order, unvisited }
}

/// Full topological order, or [`GraphError::CycleDetected`] naming every node
/// that could not be scheduled.
pub fn topological_order(graph: &BlockGraph) -> GraphResult<Vec<NodeIndex>> {
    let schedule = kahn_order(graph);
    if !schedule.is_complete() {
        let stuck: Vec<String> = schedule
            .unvisited
            .iter()
            .map(|&n| graph.node(n).id.clone())
            .collect();
        debug!(unvisited = ?stuck, "scheduler stalled on a cycle");
        return Err(GraphError::CycleDetected(stuck));
    }
    Ok(schedule.order)
}
