//! # dnn-modeler: static shape validation for block-graph networks
//!
//! An architecture is described as a directed graph of typed blocks (Linear,
//! Conv2d, Transformer encoder/decoder, plus Input/Output boundaries). Before
//! anything is trained, the engine walks that graph and works out, from the
//! block parameters alone, which shapes flow along every edge and where they
//! stop fitting together.
//!
//! ## Usage Example
//!
//! ```
//! use dnn_modeler::api::{Modeler, PropagateRequest};
//! use dnn_modeler::config::ModelerConfig;
//! use serde_json::json;
//!
//! // 1. A request body as an editor would send it
//! let request: PropagateRequest = serde_json::from_value(json!({
//!     "input_shape": "(1, 28, 28)",
//!     "nodes": [
//!         {"id": "input", "type": "input"},
//!         {"id": "conv", "type": "convolution", "parameters": {"in_channels": 1, "out_channels": 4}},
//!         {"id": "fc", "type": "linear", "parameters": {"in_features": 26, "out_features": 10}}
//!     ],
//!     "edges": [
//!         {"source": "input", "target": "conv"},
//!         {"source": "conv", "target": "fc"}
//!     ]
//! })).unwrap();
//!
//! // 2. Propagate shapes through the graph
//! let modeler = Modeler::new(ModelerConfig::default());
//! let body = modeler.propagate_shapes(&request).into_result().unwrap();
//!
//! // 3. Every node has a record
//! assert_eq!(body.shapes["conv"].output_shape.as_ref().unwrap().dims(), &[4, 26, 26]);
//! assert_eq!(body.shapes["fc"].output_shape.as_ref().unwrap().dims(), &[10]);
//! ```

pub mod analysis;
pub mod api;
pub mod config;
pub mod graph;
pub mod nn;
pub mod sequential;
pub mod shape;
