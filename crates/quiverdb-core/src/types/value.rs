//! Property values the planner can reference.
//!
//! This module provides the [`Value`] enum, which represents the constant
//! values that appear in predicates and column statistics, and
//! [`ValueType`], the logical type of a column together with its physical
//! width.
//!
//! # Example
//!
//! ```
//! use quiverdb_core::Value;
//!
//! let name: Value = "Alice".into();
//! let age: Value = 30i64.into();
//!
//! assert_eq!(name.as_str(), Some("Alice"));
//! assert_eq!(age.as_int(), Some(30));
//!
//! // Dense embeddings are first-class values
//! let embedding: Value = vec![0.1f32, 0.2, 0.3].into();
//! assert_eq!(embedding.as_vector().map(|v| v.len()), Some(3));
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A constant value as it appears in predicates and statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null/missing value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Dense vector embedding (for similarity search)
    Vector(Vec<f32>),
}

impl Value {
    /// Returns the logical type of this value, or `None` for `Null`.
    #[must_use]
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueType::Bool),
            Self::Int(_) => Some(ValueType::Int),
            Self::Float(_) => Some(ValueType::Float),
            Self::String(_) => Some(ValueType::String),
            #[allow(clippy::cast_possible_truncation)]
            Self::Vector(v) => Some(ValueType::Vector(v.len() as u32)),
        }
    }

    /// Returns true if this value is `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean value, if this is a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an `Int`.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float value, if this is a `Float`.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string value, if this is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the vector value, if this is a `Vector`.
    #[must_use]
    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Returns this value coerced to `f64`, if it is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Compares two values for ordering, coercing between numeric types.
    ///
    /// Returns `None` when the values are not comparable (different
    /// non-numeric types, nulls, vectors).
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            _ => {
                let a = self.as_numeric()?;
                let b = other.as_numeric()?;
                a.partial_cmp(&b)
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Self::Vector(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "'{s}'"),
            Self::Vector(v) => write!(f, "[{} dims]", v.len()),
        }
    }
}

/// The logical type of a column, carrying enough physical information
/// for cost estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Boolean values.
    Bool,
    /// 64-bit signed integers.
    Int,
    /// 64-bit floating point numbers.
    Float,
    /// Variable-length UTF-8 strings.
    String,
    /// Dense vectors of the given dimensionality.
    Vector(u32),
}

impl ValueType {
    /// Returns the physical width of one value in bytes.
    ///
    /// Variable-length types return `None`; cost estimation falls back
    /// to average-width statistics for those.
    #[must_use]
    pub const fn physical_width(&self) -> Option<u32> {
        match self {
            Self::Bool => Some(1),
            Self::Int | Self::Float => Some(8),
            Self::String => None,
            Self::Vector(dim) => Some(4 * *dim),
        }
    }

    /// Returns true if values of this type have a fixed physical width.
    #[must_use]
    pub const fn is_fixed_width(&self) -> bool {
        self.physical_width().is_some()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "Bool"),
            Self::Int => write!(f, "Int"),
            Self::Float => write!(f, "Float"),
            Self::String => write!(f, "String"),
            Self::Vector(dim) => write!(f, "Vector({dim})"),
        }
    }
}
