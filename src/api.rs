//! Request/response boundary.
//!
//! Each operation takes a decoded request body and always answers with a
//! [`Response`]: either `{"status": "success", ...}` or
//! `{"status": "error", "detail": "..."}`. Nothing here panics on caller data,
//! so a front end can forward responses verbatim.

use crate::analysis::compatibility::{self, VerdictMap};
use crate::analysis::shape_inference::{ShapeInference, ShapeMap};
use crate::config::ModelerConfig;
use crate::graph::{BlockGraph, EdgeSpec, GraphError, NodeSpec};
use crate::nn::{available_blocks, BlockInfo, LayerKind, ShapeError};
use crate::sequential::{self, AssembleError};
use crate::shape::Shape;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request body: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

type Result<T> = std::result::Result<T, ApiError>;

/// Structured outcome of every operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response<T> {
    Success(T),
    Error { detail: String },
}

impl<T> Response<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Response::Success(_) => None,
            Response::Error { detail } => Some(detail),
        }
    }

    pub fn into_result(self) -> std::result::Result<T, String> {
        match self {
            Response::Success(body) => Ok(body),
            Response::Error { detail } => Err(detail),
        }
    }
}

impl<T> From<Result<T>> for Response<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(body) => Response::Success(body),
            Err(e) => {
                warn!(error = %e, "request failed");
                Response::Error { detail: e.to_string() }
            }
        }
    }
}

/// Nodes and edges as sent by the editor.
///
/// The editor keeps its Input and Output nodes apart from the rest and sends
/// them as `input`/`output`; they are merged back into the node list unless a
/// node with the same id is already there.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GraphPayload {
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
    #[serde(default)]
    pub input: Option<NodeSpec>,
    #[serde(default)]
    pub output: Option<NodeSpec>,
}

impl GraphPayload {
    pub fn new(nodes: Vec<NodeSpec>, edges: Vec<EdgeSpec>) -> Self {
        Self {
            nodes,
            edges,
            ..Self::default()
        }
    }

    /// Every node of the graph, boundaries included, in payload order.
    pub fn node_specs(&self) -> Vec<NodeSpec> {
        let mut specs = Vec::with_capacity(self.nodes.len() + 2);
        let absent = |spec: &NodeSpec| !self.nodes.iter().any(|n| n.id == spec.id);

        if let Some(input) = self.input.as_ref().filter(|s| absent(s)) {
            specs.push(as_boundary(input, "input", &LayerKind::Input));
        }
        specs.extend(self.nodes.iter().cloned());
        if let Some(output) = self.output.as_ref().filter(|s| absent(s)) {
            specs.push(as_boundary(output, "output", &LayerKind::Output));
        }
        specs
    }

    pub fn build_graph(&self) -> Result<BlockGraph> {
        Ok(BlockGraph::build(&self.node_specs(), &self.edges)?)
    }

    /// Declared `shape` of the output boundary, if any node carries one.
    fn declared_output(&self) -> Option<Shape> {
        self.node_specs()
            .iter()
            .find(|spec| LayerKind::resolve(&spec.kind, spec.name.as_deref()) == LayerKind::Output)
            .and_then(|spec| spec.parameters.as_ref())
            .and_then(|params| params.get("shape"))
            .and_then(Shape::parse)
    }
}

/// The editor tags its boundary nodes with its own node types; position in
/// the payload is what makes them boundaries.
fn as_boundary(spec: &NodeSpec, tag: &str, kind: &LayerKind) -> NodeSpec {
    if &LayerKind::resolve(&spec.kind, spec.name.as_deref()) == kind {
        spec.clone()
    } else {
        NodeSpec {
            kind: tag.to_string(),
            ..spec.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PropagateRequest {
    /// Shape fed to source nodes. Falls back to the Input node's declared
    /// shape, then to the configured default.
    #[serde(default, alias = "inputShape")]
    pub input_shape: Option<JsonValue>,
    #[serde(flatten)]
    pub graph: GraphPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CheckRequest {
    #[serde(flatten)]
    pub graph: GraphPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BuildRequest {
    /// Declared model output. Falls back to the Output node's `shape`, then to
    /// the configured default.
    #[serde(default, alias = "outputShape")]
    pub output_shape: Option<JsonValue>,
    #[serde(flatten)]
    pub graph: GraphPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlocksResponse {
    pub blocks: Vec<BlockInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropagateResponse {
    pub input_shape: Shape,
    pub shapes: ShapeMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResponse {
    pub input_shape: Shape,
    pub edges: VerdictMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildResponse {
    pub model_summary: String,
    /// Node ids in stacking order, head excluded.
    pub layers: Vec<String>,
    pub output_shape: Shape,
}

/// Operations a caller can name, e.g. from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListBlocks,
    Propagate,
    Check,
    Build,
}

/// Decodes a JSON request body.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    Ok(serde_json::from_str(body)?)
}

/// Entry point for every boundary operation.
#[derive(Debug, Clone, Default)]
pub struct Modeler {
    config: ModelerConfig,
}

impl Modeler {
    pub fn new(config: ModelerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelerConfig {
        &self.config
    }

    pub fn list_available_blocks(&self) -> Response<BlocksResponse> {
        Response::Success(BlocksResponse {
            blocks: available_blocks(),
        })
    }

    pub fn propagate_shapes(&self, request: &PropagateRequest) -> Response<PropagateResponse> {
        self.try_propagate(request).into()
    }

    pub fn check_edge_compatibility(&self, request: &CheckRequest) -> Response<CheckResponse> {
        self.try_check(request).into()
    }

    pub fn build_sequential_model(&self, request: &BuildRequest) -> Response<BuildResponse> {
        self.try_build(request).into()
    }

    /// Decodes `body` for `op`, runs it and serializes the response.
    ///
    /// A body that does not decode is answered with an error response, like
    /// any other failure.
    pub fn handle(&self, op: Operation, body: &str) -> serde_json::Result<JsonValue> {
        match op {
            Operation::ListBlocks => serde_json::to_value(self.list_available_blocks()),
            Operation::Propagate => {
                let response = decode(body).map(|r| self.propagate_shapes(&r));
                serde_json::to_value(flatten_response(response))
            }
            Operation::Check => {
                let response = decode(body).map(|r| self.check_edge_compatibility(&r));
                serde_json::to_value(flatten_response(response))
            }
            Operation::Build => {
                let response = decode(body).map(|r| self.build_sequential_model(&r));
                serde_json::to_value(flatten_response(response))
            }
        }
    }

    fn try_propagate(&self, request: &PropagateRequest) -> Result<PropagateResponse> {
        let graph = request.graph.build_graph()?;
        let input_shape = match &request.input_shape {
            Some(raw) => Shape::parse(raw).ok_or_else(|| ShapeError::Parse(raw_text(raw)))?,
            None => compatibility::graph_input_shape(&graph, &self.config.default_input_shape),
        };
        let shapes = ShapeInference::run(&graph, &input_shape)?;
        info!(nodes = shapes.len(), input = %input_shape, "propagate request served");
        Ok(PropagateResponse { input_shape, shapes })
    }

    fn try_check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let graph = request.graph.build_graph()?;
        let input_shape = compatibility::graph_input_shape(&graph, &self.config.default_input_shape);
        let edges = compatibility::check_edges(&graph, &input_shape)?;
        info!(edges = edges.len(), input = %input_shape, "check request served");
        Ok(CheckResponse { input_shape, edges })
    }

    fn try_build(&self, request: &BuildRequest) -> Result<BuildResponse> {
        let output_shape = request
            .output_shape
            .as_ref()
            .and_then(Shape::parse)
            .or_else(|| request.graph.declared_output())
            .unwrap_or_else(|| self.config.default_output_shape.clone());

        let model = sequential::assemble_specs(&request.graph.node_specs(), &request.graph.edges, &output_shape)?;
        info!(depth = model.depth(), output = %output_shape, "build request served");
        Ok(BuildResponse {
            model_summary: model.to_string(),
            layers: model.layers.iter().map(|(id, _)| id.clone()).collect(),
            output_shape,
        })
    }
}

fn flatten_response<T>(decoded: Result<Response<T>>) -> Response<T> {
    decoded.unwrap_or_else(|e| Response::from(Err(e)))
}

fn raw_text(raw: &JsonValue) -> String {
    match raw {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
