//! Transformer encoder and decoder stacks.

use crate::nn::module::Block;
use crate::nn::params::{ParamMap, Params};
use crate::nn::registry::{BlockSpec, TRANSFORMER_DECODER, TRANSFORMER_ENCODER};
use crate::nn::ShapeError;
use crate::shape::Shape;

/// Which half of the encoder-decoder architecture a stack belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformerRole {
    Encoder,
    Decoder,
}

impl TransformerRole {
    fn spec(self) -> &'static BlockSpec {
        match self {
            TransformerRole::Encoder => &TRANSFORMER_ENCODER,
            TransformerRole::Decoder => &TRANSFORMER_DECODER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformerConfig {
    pub d_model: usize,
    pub nhead: usize,
    pub dim_feedforward: usize,
    pub num_layers: usize,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            d_model: 32,
            nhead: 2,
            dim_feedforward: 64,
            num_layers: 1,
        }
    }
}

/// A stack of `num_layers` identical transformer layers.
///
/// Attention and the feed-forward sublayer both map back to `d_model`, so the
/// stack leaves the shape of its input untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transformer {
    pub role: TransformerRole,
    pub config: TransformerConfig,
}

impl Transformer {
    /// Validates the configuration. `nhead` must split `d_model` evenly.
    pub fn new(role: TransformerRole, config: TransformerConfig) -> Result<Self, ShapeError> {
        if config.nhead == 0 || config.d_model % config.nhead != 0 {
            return Err(ShapeError::InvalidGeometry(format!(
                "nhead={} does not evenly divide d_model={}",
                config.nhead, config.d_model
            )));
        }
        Ok(Self { role, config })
    }

    pub fn from_params(role: TransformerRole, raw: &ParamMap) -> Result<Self, ShapeError> {
        let params = Params::new(raw, role.spec());
        let config = TransformerConfig {
            d_model: params.positive("d_model")?,
            nhead: params.positive("nhead")?,
            dim_feedforward: params.positive("dim_feedforward")?,
            num_layers: params.positive("num_layers")?,
        };
        Self::new(role, config)
    }
}

impl Block for Transformer {
    fn output_shape(&self, input: &Shape) -> Result<Shape, ShapeError> {
        Ok(input.clone())
    }

    fn feature_width(&self) -> usize {
        self.config.d_model
    }

    fn summary(&self) -> String {
        let (stack, layer) = match self.role {
            TransformerRole::Encoder => ("TransformerEncoder", "TransformerEncoderLayer"),
            TransformerRole::Decoder => ("TransformerDecoder", "TransformerDecoderLayer"),
        };
        let c = &self.config;
        format!(
            "{}(num_layers={}, layer={}(d_model={}, nhead={}, dim_feedforward={}))",
            stack, c.num_layers, layer, c.d_model, c.nhead, c.dim_feedforward
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shape_is_preserved() {
        let block = Transformer::new(TransformerRole::Encoder, TransformerConfig::default()).unwrap();
        let input = Shape::new(vec![16, 32]).unwrap();
        assert_eq!(block.output_shape(&input).unwrap(), input);
    }

    #[test]
    fn test_indivisible_heads() {
        let config = TransformerConfig {
            d_model: 30,
            nhead: 4,
            ..Default::default()
        };
        assert!(matches!(
            Transformer::new(TransformerRole::Decoder, config),
            Err(ShapeError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_zero_layers_rejected() {
        let raw = json!({"num_layers": 0}).as_object().cloned().unwrap();
        assert!(matches!(
            Transformer::from_params(TransformerRole::Encoder, &raw),
            Err(ShapeError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_defaults_and_summary() {
        let block = Transformer::from_params(TransformerRole::Decoder, &ParamMap::new()).unwrap();
        assert_eq!(block.config, TransformerConfig::default());
        assert_eq!(block.feature_width(), 32);
        assert_eq!(
            block.summary(),
            "TransformerDecoder(num_layers=1, layer=TransformerDecoderLayer(d_model=32, nhead=2, dim_feedforward=64))"
        );
    }
}
