//! # Graph Analysis Module
//!
//! This module contains the passes that validate a block graph before any
//! model is built.
//!
//! ## Available Passes
//!
//! - [`schedule`]: Kahn ordering of the graph, with cycle detection.
//! - [`ShapeInference`](shape_inference::ShapeInference): Propagates shapes
//!   through the graph, recording a result (or a local error) for every node.
//! - [`compatibility`]: Re-checks each edge on its own against the propagated
//!   shapes.
//!
//! ## How It Works
//!
//! ```text
//! BlockGraph -> schedule -> Shape Inference -> ShapeMap -> edge checks -> VerdictMap
//! ```
//!
//! ## Example
//!
//! ```
//! use dnn_modeler::analysis::shape_inference::ShapeInference;
//! use dnn_modeler::graph::{BlockGraph, EdgeSpec, NodeSpec};
//! use dnn_modeler::shape::Shape;
//! use serde_json::json;
//!
//! let fc = json!({"in_features": 784, "out_features": 10}).as_object().cloned().unwrap();
//! let nodes = vec![NodeSpec::new("in", "input"), NodeSpec::new("fc", "linear").with_parameters(fc)];
//! let edges = vec![EdgeSpec::new("in", "fc")];
//! let graph = BlockGraph::build(&nodes, &edges).unwrap();
//!
//! let shapes = ShapeInference::run(&graph, &Shape::parse_str("784").unwrap()).unwrap();
//! assert_eq!(shapes["fc"].output_shape.as_ref().unwrap().dims(), &[10]);
//! ```

pub mod compatibility;
pub mod schedule;
pub mod shape_inference;

pub use compatibility::{check_edge, check_edges, graph_input_shape, EdgeVerdict, VerdictMap};
pub use schedule::{kahn_order, topological_order, Schedule};
pub use shape_inference::{ShapeInference, ShapeMap, ShapeRecord};
