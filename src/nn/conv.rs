//! 2D convolution block.

use crate::nn::module::Block;
use crate::nn::params::{ParamMap, Params};
use crate::nn::registry::CONV2D;
use crate::nn::ShapeError;
use crate::shape::Shape;

/// Configuration for a Conv2d block. Kernel, stride and padding are square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2dConfig {
    /// Number of input channels.
    pub in_channels: usize,
    /// Number of output channels (filters).
    pub out_channels: usize,
    /// Convolution kernel size.
    pub kernel_size: usize,
    /// Convolution stride.
    pub stride: usize,
    /// Zero padding added to both sides of each spatial dimension.
    pub padding: usize,
}

impl Default for Conv2dConfig {
    fn default() -> Self {
        Self {
            in_channels: 1,
            out_channels: 1,
            kernel_size: 3,
            stride: 1,
            padding: 0,
        }
    }
}

impl Conv2dConfig {
    /// Creates Conv2d configuration.
    pub fn new(in_channels: usize, out_channels: usize, kernel_size: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel_size,
            ..Default::default()
        }
    }

    /// Sets convolution stride.
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Sets padding.
    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }
}

/// 2D convolutional block.
///
/// Expects a `(C_in, H, W)` input and produces `(C_out, H_out, W_out)` where
/// each spatial size follows `floor((in + 2 * padding - kernel) / stride) + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2d {
    pub config: Conv2dConfig,
}

impl Conv2d {
    pub fn from_config(config: Conv2dConfig) -> Self {
        Self { config }
    }

    /// Builds the block from a node's parameters, filling schema defaults.
    pub fn from_params(raw: &ParamMap) -> Result<Self, ShapeError> {
        let params = Params::new(raw, &CONV2D);
        let config = Conv2dConfig::new(
            params.positive("in_channels")?,
            params.positive("out_channels")?,
            params.positive("kernel_size")?,
        )
        .with_stride(params.positive("stride")?)
        .with_padding(params.non_negative("padding")?);
        Ok(Self::from_config(config))
    }

    /// Output size along one spatial axis, or `None` when the kernel does not
    /// fit in the padded input or the padded size overflows.
    fn spatial_out(&self, size: usize) -> Option<usize> {
        let Conv2dConfig {
            kernel_size,
            stride,
            padding,
            ..
        } = self.config;
        let padded = padding.checked_mul(2).and_then(|p| size.checked_add(p))?;
        if padded < kernel_size || stride == 0 {
            return None;
        }
        Some((padded - kernel_size) / stride + 1)
    }
}

impl Block for Conv2d {
    fn output_shape(&self, input: &Shape) -> Result<Shape, ShapeError> {
        let &[channels, height, width] = input.dims() else {
            return Err(ShapeError::RankMismatch {
                expected: 3,
                actual: input.rank(),
                input: input.clone(),
            });
        };

        if channels != self.config.in_channels {
            return Err(ShapeError::ChannelMismatch {
                expected: self.config.in_channels,
                actual: channels,
            });
        }

        let (out_h, out_w) = match (self.spatial_out(height), self.spatial_out(width)) {
            (Some(h), Some(w)) => (h, w),
            _ => {
                return Err(ShapeError::InvalidGeometry(format!(
                    "kernel_size={} with stride={} and padding={} does not fit spatial input {}x{}",
                    self.config.kernel_size, self.config.stride, self.config.padding, height, width
                )))
            }
        };

        super::geometry(vec![self.config.out_channels, out_h, out_w], "convolution output")
    }

    fn feature_width(&self) -> usize {
        self.config.out_channels
    }

    fn summary(&self) -> String {
        let c = &self.config;
        format!(
            "Conv2d({}, {}, kernel_size=({}, {}), stride=({}, {}), padding=({}, {}))",
            c.in_channels, c.out_channels, c.kernel_size, c.kernel_size, c.stride, c.stride, c.padding, c.padding
        )
    }
}
