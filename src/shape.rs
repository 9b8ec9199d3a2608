//! Shape values: the non-batch dimensions of a tensor.
//!
//! A [`Shape`] is an ordered, non-empty tuple of positive integers such as
//! `(3, 224, 224)` or `(128,)`. Shapes arrive from callers in several forms
//! (a bare integer, text like `"(384,384,1)"`, or a JSON array), so parsing is
//! lenient about the container but strict about the values: anything that does
//! not yield at least one positive integer is rejected as a whole.

use crate::nn::ShapeError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Non-batch tensor dimensions. Never empty, every entry is at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Shape(pub(crate) Vec<usize>);

impl Shape {
    /// Builds a shape, returning `None` when `dims` is empty or holds a zero.
    pub fn new(dims: Vec<usize>) -> Option<Self> {
        if dims.is_empty() || dims.contains(&0) {
            None
        } else {
            Some(Self(dims))
        }
    }

    /// Parses any caller-supplied representation.
    ///
    /// Accepts a JSON integer, a JSON array of integers, or a string handled by
    /// [`Shape::parse_str`]. Everything else, including floats, negative numbers
    /// and arrays with non-integer members, yields `None`.
    pub fn parse(raw: &JsonValue) -> Option<Self> {
        match raw {
            JsonValue::Number(n) => n.as_u64().and_then(dim).and_then(|d| Self::new(vec![d])),
            JsonValue::String(s) => Self::parse_str(s),
            JsonValue::Array(items) => {
                let dims = items
                    .iter()
                    .map(|item| item.as_u64().and_then(dim))
                    .collect::<Option<Vec<_>>>()?;
                Self::new(dims)
            }
            _ => None,
        }
    }

    /// Parses text such as `"784"`, `"(384,384,1)"` or `"[3, 32, 32]"`.
    ///
    /// Brackets are stripped, the remainder is split on commas and blank tokens
    /// are dropped. A single non-numeric token poisons the whole parse.
    pub fn parse_str(text: &str) -> Option<Self> {
        let stripped: String = text
            .chars()
            .filter(|c| !matches!(c, '(' | ')' | '[' | ']'))
            .collect();

        let dims = stripped
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| token.parse::<usize>().ok())
            .collect::<Option<Vec<_>>>()?;

        Self::new(dims)
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements, or `None` if it does not fit in `usize`.
    pub fn numel(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Size of the trailing (feature) dimension.
    pub fn last_dim(&self) -> usize {
        // Non-empty by construction.
        self.0[self.0.len() - 1]
    }
}

fn dim(raw: u64) -> Option<usize> {
    usize::try_from(raw).ok()
}

impl TryFrom<Vec<usize>> for Shape {
    type Error = ShapeError;

    fn try_from(dims: Vec<usize>) -> Result<Self, Self::Error> {
        let text = format!("{:?}", dims);
        Self::new(dims).ok_or(ShapeError::Parse(text))
    }
}

impl From<Shape> for Vec<usize> {
    fn from(shape: Shape) -> Self {
        shape.0
    }
}

impl fmt::Display for Shape {
    /// Tuple notation: `(3, 28, 28)`, and `(128,)` for a single dimension.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [only] = self.0.as_slice() {
            return write!(f, "({},)", only);
        }
        let inner = self
            .0
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "({})", inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_tuple_text() {
        let shape = Shape::parse_str("(384,384,1)").unwrap();
        assert_eq!(shape.dims(), &[384, 384, 1]);
        assert_eq!(shape.rank(), 3);
    }

    #[test]
    fn test_parse_bare_number_text() {
        assert_eq!(Shape::parse_str("784").unwrap().dims(), &[784]);
        assert_eq!(Shape::parse_str(" 784 ").unwrap().dims(), &[784]);
    }

    #[test]
    fn test_parse_drops_blank_tokens() {
        assert_eq!(Shape::parse_str("(128,)").unwrap().dims(), &[128]);
        assert_eq!(Shape::parse_str("3, ,32").unwrap().dims(), &[3, 32]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Shape::parse_str("abc").is_none());
        assert!(Shape::parse_str("").is_none());
        assert!(Shape::parse_str("()").is_none());
        assert!(Shape::parse_str("(3,x,3)").is_none());
        assert!(Shape::parse_str("(3,-1)").is_none());
        assert!(Shape::parse_str("(0, 4)").is_none());
    }

    #[test]
    fn test_parse_json_forms() {
        assert_eq!(Shape::parse(&json!(10)).unwrap().dims(), &[10]);
        assert_eq!(Shape::parse(&json!([1, 28, 28])).unwrap().dims(), &[1, 28, 28]);
        assert_eq!(Shape::parse(&json!("(1,28,28)")).unwrap().dims(), &[1, 28, 28]);
        assert!(Shape::parse(&json!([])).is_none());
        assert!(Shape::parse(&json!([1, "a"])).is_none());
        assert!(Shape::parse(&json!(2.5)).is_none());
        assert!(Shape::parse(&json!(null)).is_none());
        assert!(Shape::parse(&json!({"shape": 3})).is_none());
    }

    #[test]
    fn test_display_tuple_notation() {
        assert_eq!(Shape::new(vec![128]).unwrap().to_string(), "(128,)");
        assert_eq!(Shape::new(vec![3, 224, 224]).unwrap().to_string(), "(3, 224, 224)");
    }

    #[test]
    fn test_numel_and_last_dim() {
        let shape = Shape::new(vec![4, 26, 26]).unwrap();
        assert_eq!(shape.numel(), Some(4 * 26 * 26));
        assert_eq!(shape.last_dim(), 26);
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn test_parse_rejects_dims_beyond_usize() {
        assert!(Shape::parse(&json!(u64::MAX)).is_none());
        assert!(Shape::parse(&json!([1, 4294967296u64])).is_none());
    }

    #[test]
    fn test_numel_overflow() {
        let shape = Shape::new(vec![usize::MAX, 2]).unwrap();
        assert_eq!(shape.numel(), None);
    }

    #[test]
    fn test_serde_rejects_invalid_dims() {
        let ok: Shape = serde_json::from_value(json!([2, 3])).unwrap();
        assert_eq!(ok.dims(), &[2, 3]);
        assert!(serde_json::from_value::<Shape>(json!([2, 0])).is_err());
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!([2, 3]));
    }
}
