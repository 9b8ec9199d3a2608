//! Fully connected (linear) block.

use crate::nn::module::Block;
use crate::nn::params::{ParamMap, Params};
use crate::nn::registry::LINEAR;
use crate::nn::ShapeError;
use crate::shape::Shape;

/// Fully connected layer `y = xW + b`.
///
/// Only the trailing dimension of the input participates in the product, so
/// that is the dimension checked against `in_features`. The block emits a
/// flat `(out_features,)` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linear {
    pub in_features: usize,
    pub out_features: usize,
}

impl Linear {
    pub fn new(in_features: usize, out_features: usize) -> Self {
        Self {
            in_features,
            out_features,
        }
    }

    /// Builds the layer from a node's parameters, filling schema defaults.
    pub fn from_params(raw: &ParamMap) -> Result<Self, ShapeError> {
        let params = Params::new(raw, &LINEAR);
        Ok(Self::new(
            params.positive("in_features")?,
            params.positive("out_features")?,
        ))
    }
}

impl Block for Linear {
    fn output_shape(&self, input: &Shape) -> Result<Shape, ShapeError> {
        let actual = input.last_dim();
        if actual != self.in_features {
            return Err(ShapeError::ShapeMismatch {
                expected: self.in_features,
                actual,
                input: input.clone(),
            });
        }
        super::geometry(vec![self.out_features], "linear output")
    }

    fn feature_width(&self) -> usize {
        self.out_features
    }

    fn summary(&self) -> String {
        format!(
            "Linear(in_features={}, out_features={}, bias=True)",
            self.in_features, self.out_features
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shape(dims: &[usize]) -> Shape {
        Shape::new(dims.to_vec()).unwrap()
    }

    #[test]
    fn test_matching_features() {
        let layer = Linear::new(128, 64);
        assert_eq!(layer.output_shape(&shape(&[128])).unwrap(), shape(&[64]));
    }

    #[test]
    fn test_mismatched_features() {
        let layer = Linear::new(128, 64);
        let err = layer.output_shape(&shape(&[100])).unwrap_err();
        assert_eq!(
            err,
            ShapeError::ShapeMismatch {
                expected: 128,
                actual: 100,
                input: shape(&[100]),
            }
        );
    }

    #[test]
    fn test_only_trailing_dimension_is_checked() {
        let layer = Linear::new(32, 8);
        assert_eq!(layer.output_shape(&shape(&[16, 32])).unwrap(), shape(&[8]));
        assert!(layer.output_shape(&shape(&[32, 16])).is_err());
    }

    #[test]
    fn test_from_params_uses_defaults() {
        let raw = json!({"out_features": "10"}).as_object().cloned().unwrap();
        let layer = Linear::from_params(&raw).unwrap();
        assert_eq!(layer, Linear::new(128, 10));
        assert_eq!(
            layer.summary(),
            "Linear(in_features=128, out_features=10, bias=True)"
        );
    }
}
