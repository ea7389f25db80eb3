//! Error types for plan construction and transformation.
//!
//! Every error in this crate signals a programmer-visible defect — an
//! illegal tree mutation, a rule that does not converge, a conversion
//! attempted on an incomplete plan. Nothing here is retried or
//! recovered from; runtime data errors belong to the execution engine.

use quiverdb_core::CoreError;
use thiserror::Error;

/// Errors that can occur while building or transforming a physical plan.
#[derive(Debug, Error)]
pub enum PlanError {
    /// An input was attached to a node that already has a consumer.
    #[error("node already has a consumer; detach it before re-attaching")]
    AlreadyConnected,

    /// More inputs were attached than the node's declared arity allows.
    #[error("node accepts at most {arity} input(s)")]
    ArityExceeded {
        /// The declared input arity.
        arity: usize,
    },

    /// An index intersection referenced indexes over different entities.
    #[error("index intersection requires a single entity: expected {expected}, got {actual}")]
    EntityMismatch {
        /// The entity of the first index.
        expected: String,
        /// The mismatched entity.
        actual: String,
    },

    /// An operation was invoked on a node kind that does not support it.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// The rewrite engine did not reach a fixpoint within its pass bound.
    #[error("rewrite did not converge within {passes} passes")]
    RewriteDivergence {
        /// The configured pass bound.
        passes: usize,
    },

    /// `to_operator` was called on a node whose inputs are incomplete.
    #[error("plan is not executable: required inputs are missing")]
    NotExecutable,

    /// An error from the core crate.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;
