//! Error types for the core crate.

use thiserror::Error;

/// Errors that can occur in the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A value type mismatch occurred.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: String,
        /// The actual type.
        actual: String,
    },

    /// A column was referenced that the entity does not carry.
    #[error("unknown column: {0}")]
    UnknownColumn(String),
}

impl CoreError {
    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch { expected: expected.into(), actual: actual.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::type_mismatch("Int", "String");
        assert!(err.to_string().contains("expected Int"));

        let err = CoreError::UnknownColumn("missing".into());
        assert!(err.to_string().contains("missing"));
    }
}
