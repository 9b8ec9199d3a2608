//! # Layer Transform Registry
//!
//! Every block kind a graph may contain, and the shape rule each one applies.
//!
//! A block is never executed. Given the shape flowing into it and its
//! parameters, it either reports the shape it would produce or explains why
//! the input is unacceptable. That is all the propagation engine, the edge
//! checker and the sequential assembler need.
//!
//! ## Available Blocks
//!
//! - [`Linear`]: fully connected layer, checks the trailing dimension
//! - [`Conv2d`]: 2D convolution over `(C, H, W)` inputs
//! - [`Transformer`]: encoder or decoder stack, shape preserving
//! - [`OutputLayer`] / [`InputLayer`]: graph boundaries
//!
//! ## Example
//!
//! ```
//! use dnn_modeler::nn::{transform, LayerKind};
//! use dnn_modeler::shape::Shape;
//! use serde_json::json;
//!
//! let params = json!({"in_channels": 1, "out_channels": 4}).as_object().cloned().unwrap();
//! let input = Shape::parse_str("(1,28,28)").unwrap();
//! let output = transform(&LayerKind::Convolution, &input, &params).unwrap();
//! assert_eq!(output.dims(), &[4, 26, 26]);
//! ```

pub mod conv;
pub mod linear;
pub mod module;
pub mod output;
pub mod params;
pub mod registry;
pub mod transformer;

pub use conv::{Conv2d, Conv2dConfig};
pub use linear::Linear;
pub use module::Block;
pub use output::{InputLayer, OutputLayer};
pub use params::{ParamMap, Params};
pub use registry::{available_blocks, BlockInfo, BlockSpec, ParamInfo, ParamSpec};
pub use transformer::{Transformer, TransformerConfig, TransformerRole};

use crate::shape::Shape;
use std::fmt;
use thiserror::Error;

/// Why a block cannot accept an input, or could not be configured at all.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("Could not parse a shape from {0:?}")]
    Parse(String),

    #[error("Shape mismatch: expected last dimension {expected}, got {actual} (input shape {input})")]
    ShapeMismatch {
        expected: usize,
        actual: usize,
        input: Shape,
    },

    #[error("Rank mismatch: expected a {expected}D input, got {actual}D shape {input}")]
    RankMismatch {
        expected: usize,
        actual: usize,
        input: Shape,
    },

    #[error("Channel mismatch: expected {expected} input channels, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Input shape mismatch: {0}")]
    InputShapeMismatch(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Unsupported layer kind: {0}")]
    UnsupportedLayerKind(String),
}

/// Closed set of block kinds, with a catch-all for tags nobody models yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Input,
    Output,
    Linear,
    Convolution,
    TransformerEncoder,
    TransformerDecoder,
    Unsupported(String),
}

impl LayerKind {
    /// Resolves a node's kind tag (case-insensitive).
    ///
    /// The catalog files encoder and decoder under one `transformer` tag, so
    /// for that tag the node's display name decides which one is meant.
    pub fn resolve(tag: &str, name: Option<&str>) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "input" => LayerKind::Input,
            "output" => LayerKind::Output,
            "linear" => LayerKind::Linear,
            "convolution" | "conv2d" => LayerKind::Convolution,
            "transformerencoder" | "transformer_encoder" => LayerKind::TransformerEncoder,
            "transformerdecoder" | "transformer_decoder" => LayerKind::TransformerDecoder,
            "transformer" => match name {
                Some(n) if n.to_ascii_lowercase().contains("decoder") => LayerKind::TransformerDecoder,
                _ => LayerKind::TransformerEncoder,
            },
            _ => LayerKind::Unsupported(tag.to_string()),
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Input => write!(f, "Input"),
            LayerKind::Output => write!(f, "Output"),
            LayerKind::Linear => write!(f, "Linear"),
            LayerKind::Convolution => write!(f, "Convolution"),
            LayerKind::TransformerEncoder => write!(f, "TransformerEncoder"),
            LayerKind::TransformerDecoder => write!(f, "TransformerDecoder"),
            LayerKind::Unsupported(tag) => write!(f, "{}", tag),
        }
    }
}

/// A configured block, one variant per supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Input(InputLayer),
    Output(OutputLayer),
    Linear(Linear),
    Conv2d(Conv2d),
    Transformer(Transformer),
}

impl Layer {
    /// Configures the block for `kind` from raw node parameters.
    pub fn build(kind: &LayerKind, params: &ParamMap) -> Result<Self, ShapeError> {
        let layer = match kind {
            LayerKind::Input => Layer::Input(InputLayer),
            LayerKind::Output => Layer::Output(OutputLayer::from_params(params)?),
            LayerKind::Linear => Layer::Linear(Linear::from_params(params)?),
            LayerKind::Convolution => Layer::Conv2d(Conv2d::from_params(params)?),
            LayerKind::TransformerEncoder => {
                Layer::Transformer(Transformer::from_params(TransformerRole::Encoder, params)?)
            }
            LayerKind::TransformerDecoder => {
                Layer::Transformer(Transformer::from_params(TransformerRole::Decoder, params)?)
            }
            LayerKind::Unsupported(tag) => return Err(ShapeError::UnsupportedLayerKind(tag.clone())),
        };
        Ok(layer)
    }

    fn as_block(&self) -> &dyn Block {
        match self {
            Layer::Input(b) => b,
            Layer::Output(b) => b,
            Layer::Linear(b) => b,
            Layer::Conv2d(b) => b,
            Layer::Transformer(b) => b,
        }
    }
}

impl Block for Layer {
    fn output_shape(&self, input: &Shape) -> Result<Shape, ShapeError> {
        self.as_block().output_shape(input)
    }

    fn feature_width(&self) -> usize {
        self.as_block().feature_width()
    }

    fn summary(&self) -> String {
        self.as_block().summary()
    }
}

/// Applies the shape rule of `kind` to `input`.
pub fn transform(kind: &LayerKind, input: &Shape, params: &ParamMap) -> Result<Shape, ShapeError> {
    Layer::build(kind, params)?.output_shape(input)
}

/// Wraps computed dimensions, rejecting any that collapsed to zero.
pub(crate) fn geometry(dims: Vec<usize>, what: &str) -> Result<Shape, ShapeError> {
    Shape::new(dims).ok_or_else(|| ShapeError::InvalidGeometry(format!("{} has a non-positive dimension", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> ParamMap {
        value.as_object().cloned().unwrap_or_default()
    }

    fn shape(dims: &[usize]) -> Shape {
        Shape::new(dims.to_vec()).unwrap()
    }

    #[test]
    fn test_resolve_kind_tags() {
        assert_eq!(LayerKind::resolve("Linear", None), LayerKind::Linear);
        assert_eq!(LayerKind::resolve("conv2d", None), LayerKind::Convolution);
        assert_eq!(LayerKind::resolve("CONVOLUTION", None), LayerKind::Convolution);
        assert_eq!(
            LayerKind::resolve("transformer", Some("TransformerDecoder")),
            LayerKind::TransformerDecoder
        );
        assert_eq!(LayerKind::resolve("transformer", None), LayerKind::TransformerEncoder);
        assert_eq!(
            LayerKind::resolve("lstm", None),
            LayerKind::Unsupported("lstm".to_string())
        );
    }

    #[test]
    fn test_transform_linear() {
        let p = params(json!({"in_features": 128, "out_features": 64}));
        assert_eq!(transform(&LayerKind::Linear, &shape(&[128]), &p).unwrap(), shape(&[64]));
        assert!(matches!(
            transform(&LayerKind::Linear, &shape(&[100]), &p),
            Err(ShapeError::ShapeMismatch { expected: 128, actual: 100, .. })
        ));
    }

    #[test]
    fn test_transform_convolution() {
        let p = params(json!({"in_channels": 1, "out_channels": 4, "kernel_size": 3, "stride": 1, "padding": 0}));
        assert_eq!(
            transform(&LayerKind::Convolution, &shape(&[1, 28, 28]), &p).unwrap(),
            shape(&[4, 26, 26])
        );
    }

    #[test]
    fn test_transform_unsupported() {
        let err = transform(&LayerKind::Unsupported("lstm".into()), &shape(&[8]), &ParamMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported layer kind: lstm");
    }

    #[test]
    fn test_transform_output_uses_declared_shape() {
        let p = params(json!({"shape": 10}));
        assert_eq!(transform(&LayerKind::Output, &shape(&[3, 4]), &p).unwrap(), shape(&[10]));
    }

    #[test]
    fn test_layer_summary_dispatch() {
        let layer = Layer::build(&LayerKind::Linear, &params(json!({"in_features": 4, "out_features": 2}))).unwrap();
        assert_eq!(layer.feature_width(), 2);
        assert!(layer.summary().starts_with("Linear("));
    }
}
