//! Block catalog: parameter schemas and the listing served to editors.
//!
//! Each [`BlockSpec`] is the single source of truth for a block's parameter
//! names and defaults. Layer constructors read their parameters through
//! [`Params`](crate::nn::params::Params), which consults these specs.

use serde::Serialize;
use std::collections::BTreeMap;

/// A single integer parameter and its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: usize,
}

/// Parameter schema for one block kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpec {
    /// Display name, e.g. `Conv2d`.
    pub name: &'static str,
    /// Kind tag nodes carry in their `type` field.
    pub kind_tag: &'static str,
    pub params: &'static [ParamSpec],
}

impl BlockSpec {
    pub fn default_for(&self, name: &str) -> Option<usize> {
        self.params.iter().find(|p| p.name == name).map(|p| p.default)
    }
}

const fn param(name: &'static str, default: usize) -> ParamSpec {
    ParamSpec { name, default }
}

pub const CONV2D: BlockSpec = BlockSpec {
    name: "Conv2d",
    kind_tag: "convolution",
    params: &[
        param("in_channels", 1),
        param("out_channels", 1),
        param("kernel_size", 3),
        param("stride", 1),
        param("padding", 0),
    ],
};

const TRANSFORMER_PARAMS: &[ParamSpec] = &[
    param("d_model", 32),
    param("nhead", 2),
    param("dim_feedforward", 64),
    param("num_layers", 1),
];

pub const TRANSFORMER_ENCODER: BlockSpec = BlockSpec {
    name: "TransformerEncoder",
    kind_tag: "transformer",
    params: TRANSFORMER_PARAMS,
};

pub const TRANSFORMER_DECODER: BlockSpec = BlockSpec {
    name: "TransformerDecoder",
    kind_tag: "transformer",
    params: TRANSFORMER_PARAMS,
};

pub const LINEAR: BlockSpec = BlockSpec {
    name: "Linear",
    kind_tag: "linear",
    params: &[param("in_features", 128), param("out_features", 64)],
};

/// Output boundary. Its only parameter, `shape`, is shape-valued and has no
/// integer default.
pub const OUTPUT: BlockSpec = BlockSpec {
    name: "Output",
    kind_tag: "output",
    params: &[],
};

/// Blocks offered to users, in catalog order.
pub const CATALOG: &[&BlockSpec] = &[&CONV2D, &TRANSFORMER_ENCODER, &TRANSFORMER_DECODER, &LINEAR];

/// Serialized catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockInfo {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub parameters: BTreeMap<&'static str, ParamInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamInfo {
    pub default: usize,
    #[serde(rename = "type")]
    pub ty: &'static str,
}

impl From<&BlockSpec> for BlockInfo {
    fn from(spec: &BlockSpec) -> Self {
        let parameters = spec
            .params
            .iter()
            .map(|p| (p.name, ParamInfo { default: p.default, ty: "int" }))
            .collect();
        Self {
            name: spec.name,
            kind: spec.kind_tag,
            parameters,
        }
    }
}

/// Lists every catalog block with its parameter schema.
pub fn available_blocks() -> Vec<BlockInfo> {
    CATALOG.iter().map(|spec| BlockInfo::from(*spec)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_contents() {
        let blocks = available_blocks();
        let names: Vec<_> = blocks.iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["Conv2d", "TransformerEncoder", "TransformerDecoder", "Linear"]);

        let conv = &blocks[0];
        assert_eq!(conv.kind, "convolution");
        assert_eq!(conv.parameters["kernel_size"].default, 3);
        assert_eq!(conv.parameters["padding"].default, 0);
    }

    #[test]
    fn test_catalog_serializes_like_the_block_listing() {
        let json = serde_json::to_value(BlockInfo::from(&LINEAR)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Linear",
                "type": "linear",
                "parameters": {
                    "in_features": {"default": 128, "type": "int"},
                    "out_features": {"default": 64, "type": "int"}
                }
            })
        );
    }

    #[test]
    fn test_default_lookup() {
        assert_eq!(TRANSFORMER_DECODER.default_for("nhead"), Some(2));
        assert_eq!(LINEAR.default_for("kernel_size"), None);
    }
}
