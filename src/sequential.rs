//! Sequential model assembly.
//!
//! Flattens a block graph into a single stacked architecture for display.
//! Nodes are taken in scheduler order, boundary nodes are skipped, and each
//! remaining node is configured from its parameters. No shapes are checked
//! here; this is the "show me the stack" view, not validation.

use crate::analysis::schedule;
use crate::graph::{BlockGraph, EdgeSpec, GraphError, NodeSpec};
use crate::nn::{Block, Layer, LayerKind, Linear, ShapeError};
use crate::shape::Shape;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssembleError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Unsupported layer kind '{kind}' on node '{node}'")]
    UnsupportedLayerKind { node: String, kind: String },

    #[error("Cannot configure node '{node}': {source}")]
    Layer { node: String, source: ShapeError },

    #[error("Cannot size the output head for {shape}: {source}")]
    Head { shape: Shape, source: ShapeError },

    #[error("No layers to build")]
    EmptyModel,
}

type Result<T> = std::result::Result<T, AssembleError>;

/// An ordered stack of configured layers plus the projection head that maps
/// the last layer's features onto the declared output.
#[derive(Debug, Clone, PartialEq)]
pub struct SequentialModel {
    /// `(node id, layer)` in stacking order.
    pub layers: Vec<(String, Layer)>,
    pub head: Linear,
}

impl SequentialModel {
    /// Number of stacked modules, head included.
    pub fn depth(&self) -> usize {
        self.layers.len() + 1
    }
}

impl fmt::Display for SequentialModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sequential(")?;
        for (i, (_, layer)) in self.layers.iter().enumerate() {
            writeln!(f, "  ({}): {}", i, layer.summary())?;
        }
        writeln!(f, "  ({}): {}", self.layers.len(), self.head.summary())?;
        write!(f, ")")
    }
}

/// Whether a raw kind tag marks a boundary node.
fn is_boundary_tag(tag: &str) -> bool {
    let tag = tag.to_ascii_lowercase();
    tag.contains("input") || tag.contains("output")
}

/// Assembles the graph into a [`SequentialModel`].
///
/// Nodes trapped in a cycle are left out rather than reported. The first
/// unsupported kind aborts assembly.
pub fn assemble(graph: &BlockGraph, output_shape: &Shape) -> Result<SequentialModel> {
    let schedule = schedule::kahn_order(graph);
    if !schedule.is_complete() {
        debug!(skipped = schedule.unvisited.len(), "nodes on a cycle left out of the stack");
    }

    let mut layers = Vec::new();
    for idx in schedule.order {
        let node = graph.node(idx);
        if is_boundary_tag(&node.tag) {
            continue;
        }
        if let LayerKind::Unsupported(kind) = &node.kind {
            return Err(AssembleError::UnsupportedLayerKind {
                node: node.id.clone(),
                kind: kind.clone(),
            });
        }
        let layer = Layer::build(&node.kind, &node.params).map_err(|source| AssembleError::Layer {
            node: node.id.clone(),
            source,
        })?;
        layers.push((node.id.clone(), layer));
    }

    let Some((_, last)) = layers.last() else {
        return Err(AssembleError::EmptyModel);
    };
    let out_features = output_shape.numel().ok_or_else(|| AssembleError::Head {
        shape: output_shape.clone(),
        source: ShapeError::InvalidGeometry("element count overflows".to_string()),
    })?;
    let head = Linear::new(last.feature_width(), out_features);

    let model = SequentialModel { layers, head };
    info!(depth = model.depth(), "sequential model assembled");
    Ok(model)
}

/// Builds the graph from payload specs and assembles it.
pub fn assemble_specs(nodes: &[NodeSpec], edges: &[EdgeSpec], output_shape: &Shape) -> Result<SequentialModel> {
    let graph = BlockGraph::build(nodes, edges)?;
    assemble(&graph, output_shape)
}
