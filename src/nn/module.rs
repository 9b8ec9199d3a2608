//! Module defining the core `Block` trait for all layer kinds.

use crate::nn::ShapeError;
use crate::shape::Shape;

/// Trait defining the common interface for all blocks.
///
/// A block never touches tensor data. It only knows how its parameters
/// transform the shape of whatever flows into it, and how to describe itself
/// when stacked into a sequential summary.
pub trait Block {
    /// Computes the output shape for `input`, or explains why the block
    /// cannot accept it.
    fn output_shape(&self, input: &Shape) -> Result<Shape, ShapeError>;

    /// Width of the feature dimension this block produces.
    ///
    /// Used to size the projection head when a model is flattened into a
    /// sequential stack.
    fn feature_width(&self) -> usize;

    /// One-line constructor-style description, e.g. `Linear(in_features=128, ...)`.
    fn summary(&self) -> String;
}
