//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config file.

use crate::shape::Shape;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelerConfig {
    /// Graph input used by edge checks when no Input node declares a usable shape.
    pub default_input_shape: Shape,
    /// Declared output used by the assembler when a request omits one.
    pub default_output_shape: Shape,
    /// Pretty-print JSON responses.
    pub pretty: bool,
}

impl Default for ModelerConfig {
    fn default() -> Self {
        Self {
            default_input_shape: Shape(vec![10]),
            default_output_shape: Shape(vec![10]),
            pretty: true,
        }
    }
}

impl ModelerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_input_shape(mut self, shape: Shape) -> Self {
        self.default_input_shape = shape;
        self
    }

    pub fn with_default_output_shape(mut self, shape: Shape) -> Self {
        self.default_output_shape = shape;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Reads a config from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ModelerConfig::default();
        assert_eq!(config.default_input_shape.dims(), &[10]);
        assert_eq!(config.default_output_shape.dims(), &[10]);
        assert!(config.pretty);
    }

    #[test]
    fn test_builder() {
        let config = ModelerConfig::new()
            .with_default_input_shape(Shape::new(vec![1, 28, 28]).unwrap())
            .with_pretty(false);
        assert_eq!(config.default_input_shape.dims(), &[1, 28, 28]);
        assert_eq!(config.default_output_shape.dims(), &[10]);
        assert!(!config.pretty);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ModelerConfig = serde_json::from_str(r#"{"default_output_shape": [5]}"#).unwrap();
        assert_eq!(config.default_output_shape.dims(), &[5]);
        assert_eq!(config.default_input_shape.dims(), &[10]);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(serde_json::from_str::<ModelerConfig>(r#"{"default_input_shape": [0]}"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pretty": false, "default_input_shape": [3, 32, 32]}}"#).unwrap();

        let config = ModelerConfig::load(file.path()).unwrap();
        assert!(!config.pretty);
        assert_eq!(config.default_input_shape.dims(), &[3, 32, 32]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ModelerConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
