//! Typed access to the loosely-typed parameter maps that arrive with each node.
//!
//! Parameter values come from form fields, so an integer may be a JSON number
//! or a numeric string. Missing and blank values fall back to the default
//! declared in the block's [`BlockSpec`], which is the only place defaults live.

use crate::nn::registry::BlockSpec;
use crate::nn::ShapeError;
use crate::shape::Shape;
use serde_json::{Map, Value as JsonValue};

type Result<T> = std::result::Result<T, ShapeError>;

/// Raw parameter mapping as carried by a node.
pub type ParamMap = Map<String, JsonValue>;

/// Read-only view over a node's parameters, resolved against a block schema.
pub struct Params<'a> {
    raw: &'a ParamMap,
    spec: &'static BlockSpec,
}

impl<'a> Params<'a> {
    pub fn new(raw: &'a ParamMap, spec: &'static BlockSpec) -> Self {
        Self { raw, spec }
    }

    /// Reads an integer parameter that must be at least 1.
    pub fn positive(&self, name: &str) -> Result<usize> {
        let value = self.integer(name)?;
        if value == 0 {
            return Err(invalid(name, "must be a positive integer, got 0"));
        }
        Ok(value)
    }

    /// Reads an integer parameter that may be zero (e.g. padding).
    pub fn non_negative(&self, name: &str) -> Result<usize> {
        self.integer(name)
    }

    /// Reads a shape-valued parameter such as an output layer's `shape`.
    pub fn shape(&self, name: &str) -> Result<Shape> {
        match self.supplied(name) {
            Some(raw) => Shape::parse(raw).ok_or_else(|| ShapeError::Parse(render(raw))),
            None => Err(ShapeError::Parse(String::new())),
        }
    }

    fn integer(&self, name: &str) -> Result<usize> {
        let Some(raw) = self.supplied(name) else {
            return self
                .spec
                .default_for(name)
                .ok_or_else(|| invalid(name, "is required"));
        };

        let parsed = match raw {
            JsonValue::Number(n) => n.as_u64().or_else(|| {
                // Integral floats only, and only below 2^64 where `as` is exact.
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64)
                    .map(|f| f as u64)
            }),
            JsonValue::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };

        parsed
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| invalid(name, &format!("expected a non-negative integer, got {}", render(raw))))
    }

    /// The caller's value, treating `null` and blank strings as absent.
    fn supplied(&self, name: &str) -> Option<&'a JsonValue> {
        match self.raw.get(name) {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) if s.trim().is_empty() => None,
            Some(value) => Some(value),
        }
    }
}

fn invalid(name: &str, reason: &str) -> ShapeError {
    ShapeError::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn render(raw: &JsonValue) -> String {
    match raw {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
