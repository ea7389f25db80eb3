//! Column definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ValueType;

/// A named, typed column in an operator's output.
///
/// # Example
///
/// ```
/// use quiverdb_core::{ColumnDef, ValueType};
///
/// let col = ColumnDef::new("age", ValueType::Int);
/// assert_eq!(col.name, "age");
/// assert!(!col.nullable);
///
/// let opt = ColumnDef::new("bio", ValueType::String).nullable();
/// assert!(opt.nullable);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Logical value type.
    pub value_type: ValueType,
    /// Whether the column may contain nulls.
    pub nullable: bool,
}

impl ColumnDef {
    /// Creates a new non-nullable column definition.
    #[must_use]
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self { name: name.into(), value_type, nullable: false }
    }

    /// Marks the column as nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns a copy of this column under a different name.
    ///
    /// Used when an index's native columns are bound to a scan's output.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self { name: name.into(), value_type: self.value_type, nullable: self.nullable }
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value_type)?;
        if self.nullable {
            write!(f, "?")?;
        }
        Ok(())
    }
}
