//! # Block Graph
//!
//! The user's architecture as a directed graph: typed nodes (blocks) joined by
//! data-flow edges. The graph is built fresh from each request payload and is
//! immutable afterwards; construction is where structural validity is
//! enforced (unique ids, no dangling edges). Cycles are representable here and
//! only rejected by the scheduler.

use crate::nn::{LayerKind, ParamMap};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Structural failures. Any of these aborts a whole operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Duplicate node id '{0}'")]
    DuplicateNode(String),

    #[error("Dangling edge {from} -> {to}: node '{missing}' does not exist")]
    DanglingEdge {
        from: String,
        to: String,
        missing: String,
    },

    #[error("Cycle detected among nodes: {}", .0.join(", "))]
    CycleDetected(Vec<String>),
}

/// A node as it appears in a request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ParamMap>,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            name: None,
            parameters: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parameters(mut self, parameters: ParamMap) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// An edge as it appears in a request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub source: String,
    pub target: String,
}

impl EdgeSpec {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A validated graph node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub kind: LayerKind,
    /// The kind tag exactly as the caller wrote it.
    pub tag: String,
    pub name: Option<String>,
    pub params: ParamMap,
}

impl From<&NodeSpec> for Node {
    fn from(spec: &NodeSpec) -> Self {
        Self {
            id: spec.id.clone(),
            kind: LayerKind::resolve(&spec.kind, spec.name.as_deref()),
            tag: spec.kind.clone(),
            name: spec.name.clone(),
            params: spec.parameters.clone().unwrap_or_default(),
        }
    }
}

/// Immutable block graph. Node indices follow payload order.
#[derive(Debug, Clone)]
pub struct BlockGraph {
    graph: DiGraph<Node, ()>,
    index: HashMap<String, NodeIndex>,
}

impl BlockGraph {
    /// Builds the graph, rejecting duplicate ids and edges that reference
    /// unknown nodes.
    pub fn build(nodes: &[NodeSpec], edges: &[EdgeSpec]) -> GraphResult<Self> {
        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut index = HashMap::with_capacity(nodes.len());

        for spec in nodes {
            if index.contains_key(&spec.id) {
                return Err(GraphError::DuplicateNode(spec.id.clone()));
            }
            let idx = graph.add_node(Node::from(spec));
            index.insert(spec.id.clone(), idx);
        }

        for edge in edges {
            let lookup = |id: &String| {
                index.get(id).copied().ok_or_else(|| GraphError::DanglingEdge {
                    from: edge.source.clone(),
                    to: edge.target.clone(),
                    missing: id.clone(),
                })
            };
            let source = lookup(&edge.source)?;
            let target = lookup(&edge.target)?;
            graph.add_edge(source, target, ());
        }

        Ok(Self { graph, index })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.graph[idx]
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// Node indices in payload order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Edge endpoints in payload order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex)> + '_ {
        self.graph
            .edge_indices()
            .filter_map(move |e| self.graph.edge_endpoints(e))
    }

    /// Number of edges terminating at `idx`, counting parallel edges.
    pub fn in_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    /// Source of every incoming edge, in payload edge order.
    pub fn predecessors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors_in_order(idx, Direction::Incoming)
    }

    /// Target of every outgoing edge, in payload edge order.
    pub fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors_in_order(idx, Direction::Outgoing)
    }

    /// First node of the given kind, in payload order.
    pub fn find_kind(&self, kind: &LayerKind) -> Option<&Node> {
        self.graph.node_weights().find(|n| &n.kind == kind)
    }

    fn neighbors_in_order(&self, idx: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        // petgraph walks adjacency lists newest-first; sort back to payload order.
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| {
                let other = match dir {
                    Direction::Incoming => e.source(),
                    Direction::Outgoing => e.target(),
                };
                (e.id(), other)
            })
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, n)| n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (Vec<NodeSpec>, Vec<EdgeSpec>) {
        let nodes = vec![
            NodeSpec::new("in", "input"),
            NodeSpec::new("fc", "linear"),
            NodeSpec::new("out", "output"),
        ];
        let edges = vec![EdgeSpec::new("in", "fc"), EdgeSpec::new("fc", "out")];
        (nodes, edges)
    }

    #[test]
    fn test_build_chain() {
        let (nodes, edges) = chain();
        let graph = BlockGraph::build(&nodes, &edges).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);

        let fc = graph.index_of("fc").unwrap();
        assert_eq!(graph.node(fc).kind, LayerKind::Linear);
        assert_eq!(graph.in_degree(fc), 1);
        assert_eq!(graph.predecessors(fc), vec![graph.index_of("in").unwrap()]);
        assert_eq!(graph.successors(fc), vec![graph.index_of("out").unwrap()]);
    }

    #[test]
    fn test_duplicate_node() {
        let nodes = vec![NodeSpec::new("a", "linear"), NodeSpec::new("a", "linear")];
        assert_eq!(
            BlockGraph::build(&nodes, &[]).unwrap_err(),
            GraphError::DuplicateNode("a".to_string())
        );
    }

    #[test]
    fn test_dangling_edge() {
        let (nodes, _) = chain();
        let edges = vec![EdgeSpec::new("fc", "ghost")];
        let err = BlockGraph::build(&nodes, &edges).unwrap_err();
        assert_eq!(
            err,
            GraphError::DanglingEdge {
                from: "fc".to_string(),
                to: "ghost".to_string(),
                missing: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_neighbors_follow_payload_order() {
        let nodes = vec![
            NodeSpec::new("a", "input"),
            NodeSpec::new("b", "linear"),
            NodeSpec::new("c", "linear"),
            NodeSpec::new("d", "linear"),
        ];
        let edges = vec![
            EdgeSpec::new("a", "c"),
            EdgeSpec::new("a", "b"),
            EdgeSpec::new("a", "d"),
        ];
        let graph = BlockGraph::build(&nodes, &edges).unwrap();
        let ids: Vec<_> = graph
            .successors(graph.index_of("a").unwrap())
            .into_iter()
            .map(|i| graph.node(i).id.clone())
            .collect();
        assert_eq!(ids, vec!["c", "b", "d"]);
    }

    #[test]
    fn test_self_loop_is_structurally_allowed() {
        let nodes = vec![NodeSpec::new("a", "linear")];
        let edges = vec![EdgeSpec::new("a", "a")];
        let graph = BlockGraph::build(&nodes, &edges).unwrap();
        assert_eq!(graph.in_degree(graph.index_of("a").unwrap()), 1);
    }

    #[test]
    fn test_payload_deserialization() {
        let spec: NodeSpec = serde_json::from_value(serde_json::json!({
            "id": "dec",
            "type": "transformer",
            "name": "TransformerDecoder",
            "parameters": {"d_model": "64"}
        }))
        .unwrap();
        let node = Node::from(&spec);
        assert_eq!(node.kind, LayerKind::TransformerDecoder);
        assert_eq!(node.tag, "transformer");
        assert_eq!(node.params["d_model"], "64");

        let bare: NodeSpec = serde_json::from_value(serde_json::json!({"id": "x", "kind": "linear"})).unwrap();
        assert_eq!(Node::from(&bare).params.len(), 0);
    }
}
