//! Edge-level compatibility checks.
//!
//! For each edge the target block's rule is re-applied directly to the
//! source's propagated output, using the target's own parameters. This answers
//! "would this particular pair fit" even while the rest of the graph is still
//! inconsistent.

use crate::analysis::shape_inference::{ShapeInference, ShapeMap};
use crate::graph::{BlockGraph, GraphResult, Node};
use crate::nn::LayerKind;
use crate::shape::Shape;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Compatibility verdict for one edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeVerdict {
    pub compatible: bool,
    pub error: Option<String>,
    pub output_shape: Option<Shape>,
}

impl EdgeVerdict {
    fn compatible(output: Shape) -> Self {
        Self {
            compatible: true,
            error: None,
            output_shape: Some(output),
        }
    }

    fn incompatible(reason: String) -> Self {
        Self {
            compatible: false,
            error: Some(reason),
            output_shape: None,
        }
    }
}

/// Verdicts keyed by `"source->target"`.
pub type VerdictMap = BTreeMap<String, EdgeVerdict>;

pub fn edge_key(source: &str, target: &str) -> String {
    format!("{}->{}", source, target)
}

/// Shape entering the graph: the first Input node's declared `shape`, or
/// `fallback` when there is none or it does not parse.
pub fn graph_input_shape(graph: &BlockGraph, fallback: &Shape) -> Shape {
    graph
        .find_kind(&LayerKind::Input)
        .and_then(|node| node.params.get("shape"))
        .and_then(Shape::parse)
        .unwrap_or_else(|| fallback.clone())
}

/// Checks every edge of `graph` against one propagation pass seeded with
/// `graph_input`.
pub fn check_edges(graph: &BlockGraph, graph_input: &Shape) -> GraphResult<VerdictMap> {
    let records = ShapeInference::run(graph, graph_input)?;
    let mut verdicts = VerdictMap::new();

    for (source, target) in graph.edges() {
        let (source, target) = (graph.node(source), graph.node(target));
        let verdict = check_edge(source_output(&records, source), target);
        debug!(
            source = %source.id,
            target = %target.id,
            compatible = verdict.compatible,
            "edge checked"
        );
        verdicts.insert(edge_key(&source.id, &target.id), verdict);
    }

    let incompatible = verdicts.values().filter(|v| !v.compatible).count();
    info!(edges = verdicts.len(), incompatible, "edge compatibility check finished");
    Ok(verdicts)
}

fn source_output<'a>(records: &'a ShapeMap, source: &Node) -> Option<&'a Shape> {
    records.get(&source.id).and_then(|r| r.output_shape.as_ref())
}

/// Verdict for feeding `source_output` into `target`.
///
/// Output sinks accept anything, and kinds without a modelled rule pass the
/// shape through rather than being flagged.
pub fn check_edge(source_output: Option<&Shape>, target: &Node) -> EdgeVerdict {
    let Some(shape) = source_output else {
        return EdgeVerdict::incompatible("source output shape not available".to_string());
    };

    match target.kind {
        LayerKind::Output | LayerKind::Unsupported(_) => EdgeVerdict::compatible(shape.clone()),
        _ => match ShapeInference::apply(target, shape) {
            Ok(output) => EdgeVerdict::compatible(output),
            Err(e) => EdgeVerdict::incompatible(format!(
                "{} '{}' cannot accept {}: {}",
                target.kind, target.id, shape, e
            )),
        },
    }
}
