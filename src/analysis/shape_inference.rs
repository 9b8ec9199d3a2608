//! Module for shape propagation (Shape Inference).
//!
//! Walks the block graph in topological order and determines the input and
//! output shape of every node from its predecessors' results and its own
//! layer rule. Failures are local: a node that cannot resolve records why,
//! and traversal carries on with the rest of the graph.

use crate::analysis::schedule;
use crate::graph::{BlockGraph, GraphResult, Node};
use crate::nn::{Block, Layer, LayerKind, OutputLayer, ShapeError};
use crate::shape::Shape;
use petgraph::graph::NodeIndex;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Per-node propagation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeRecord {
    pub input_shape: Option<Shape>,
    pub output_shape: Option<Shape>,
    #[serde(serialize_with = "error_text")]
    pub error: Option<ShapeError>,
}

impl ShapeRecord {
    fn resolved(input: Shape, output: Shape) -> Self {
        Self {
            input_shape: Some(input),
            output_shape: Some(output),
            error: None,
        }
    }

    fn failed(input: Option<Shape>, error: ShapeError) -> Self {
        Self {
            input_shape: input,
            output_shape: None,
            error: Some(error),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.error.is_none() && self.output_shape.is_some()
    }
}

fn error_text<S: Serializer>(error: &Option<ShapeError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Records keyed by node id.
pub type ShapeMap = BTreeMap<String, ShapeRecord>;

/// Structure that performs shape propagation over a [`BlockGraph`].
pub struct ShapeInference;

impl ShapeInference {
    /// Runs propagation for the whole graph.
    ///
    /// `graph_input` is the shape fed to every node without predecessors.
    /// Returns a record for every node; structural problems (a cycle) abort
    /// before any node is evaluated.
    pub fn run(graph: &BlockGraph, graph_input: &Shape) -> GraphResult<ShapeMap> {
        let order = schedule::topological_order(graph)?;
        let mut records: HashMap<NodeIndex, ShapeRecord> = HashMap::with_capacity(order.len());

        for idx in order {
            let node = graph.node(idx);
            let record = Self::infer_node(graph, idx, graph_input, &records);
            match &record.error {
                None => debug!(
                    node = %node.id,
                    kind = %node.kind,
                    output = ?record.output_shape.as_ref().map(|s| s.to_string()),
                    "resolved"
                ),
                Some(e) => warn!(node = %node.id, kind = %node.kind, error = %e, "shape propagation failed"),
            }
            records.insert(idx, record);
        }

        let failed = records.values().filter(|r| !r.is_resolved()).count();
        info!(nodes = records.len(), failed, input = %graph_input, "shape propagation finished");

        Ok(records
            .into_iter()
            .map(|(idx, record)| (graph.node(idx).id.clone(), record))
            .collect())
    }

    /// Propagation logic for a single node.
    fn infer_node(
        graph: &BlockGraph,
        idx: NodeIndex,
        graph_input: &Shape,
        records: &HashMap<NodeIndex, ShapeRecord>,
    ) -> ShapeRecord {
        let input = match Self::resolve_input(graph, idx, graph_input, records) {
            Ok(shape) => shape,
            Err(e) => return ShapeRecord::failed(None, e),
        };

        let node = graph.node(idx);
        let output = match node.kind {
            LayerKind::Output => OutputLayer::from_params(&node.params).map(|sink| sink.shape),
            _ => Self::apply(node, &input),
        };

        match output {
            Ok(shape) => ShapeRecord::resolved(input, shape),
            Err(e) => ShapeRecord::failed(Some(input), e),
        }
    }

    /// Applies a node's own layer rule to `input`.
    pub fn apply(node: &Node, input: &Shape) -> Result<Shape, ShapeError> {
        Layer::build(&node.kind, &node.params)?.output_shape(input)
    }

    /// Determines the shape flowing into a node.
    ///
    /// Sources take the graph input. Otherwise every predecessor must have
    /// resolved, and all of them must agree on one shape.
    fn resolve_input(
        graph: &BlockGraph,
        idx: NodeIndex,
        graph_input: &Shape,
        records: &HashMap<NodeIndex, ShapeRecord>,
    ) -> Result<Shape, ShapeError> {
        let predecessors = graph.predecessors(idx);
        if predecessors.is_empty() {
            return Ok(graph_input.clone());
        }

        let mut incoming: Vec<(&str, &Shape)> = Vec::with_capacity(predecessors.len());
        for pred in predecessors {
            let id = graph.node(pred).id.as_str();
            match records.get(&pred).filter(|r| r.is_resolved()).and_then(|r| r.output_shape.as_ref()) {
                Some(shape) => incoming.push((id, shape)),
                None => {
                    return Err(ShapeError::InputShapeMismatch(format!(
                        "predecessor '{}' has no resolved output shape",
                        id
                    )))
                }
            }
        }

        let (_, first) = incoming[0];
        if incoming.iter().any(|(_, shape)| *shape != first) {
            let listing = incoming
                .iter()
                .map(|(id, shape)| format!("{} -> {}", id, shape))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ShapeError::InputShapeMismatch(format!(
                "predecessors disagree: {}",
                listing
            )));
        }

        Ok(first.clone())
    }
}
