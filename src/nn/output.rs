//! Boundary blocks: the graph input and the terminal output sink.

use crate::nn::module::Block;
use crate::nn::params::{ParamMap, Params};
use crate::nn::registry::OUTPUT;
use crate::nn::ShapeError;
use crate::shape::Shape;

/// Terminal sink. Its recorded output is the declared target shape, whatever
/// arrives upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayer {
    pub shape: Shape,
}

impl OutputLayer {
    pub fn from_params(raw: &ParamMap) -> Result<Self, ShapeError> {
        let shape = Params::new(raw, &OUTPUT).shape("shape")?;
        Ok(Self { shape })
    }
}

impl Block for OutputLayer {
    fn output_shape(&self, _input: &Shape) -> Result<Shape, ShapeError> {
        Ok(self.shape.clone())
    }

    fn feature_width(&self) -> usize {
        self.shape.last_dim()
    }

    fn summary(&self) -> String {
        format!("Output(shape={})", self.shape)
    }
}

/// Graph input. Passes the externally supplied shape through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputLayer;

impl Block for InputLayer {
    fn output_shape(&self, input: &Shape) -> Result<Shape, ShapeError> {
        Ok(input.clone())
    }

    fn feature_width(&self) -> usize {
        0
    }

    fn summary(&self) -> String {
        "Input()".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_ignores_input() {
        let raw = json!({"shape": "(10,)"}).as_object().cloned().unwrap();
        let sink = OutputLayer::from_params(&raw).unwrap();
        let upstream = Shape::new(vec![4, 26, 26]).unwrap();
        assert_eq!(sink.output_shape(&upstream).unwrap().dims(), &[10]);
    }

    #[test]
    fn test_output_requires_shape() {
        assert!(matches!(
            OutputLayer::from_params(&ParamMap::new()),
            Err(ShapeError::Parse(_))
        ));
    }

    #[test]
    fn test_input_passes_through() {
        let shape = Shape::new(vec![1, 28, 28]).unwrap();
        assert_eq!(InputLayer.output_shape(&shape).unwrap(), shape);
    }
}
