//! `QuiverDB` Core
//!
//! This crate provides the fundamental types shared by the `QuiverDB`
//! planning engine and its collaborators.
//!
//! # Overview
//!
//! - **Values**: [`Value`] enum covering the property types the planner
//!   reasons about, including dense vectors for similarity search
//! - **Types**: [`ValueType`] with physical width information used by the
//!   cost model
//! - **Columns**: [`ColumnDef`] describing a named, typed result column
//! - **Statistics**: [`ColumnStatistics`] and [`EntityStatistics`] as
//!   supplied by the storage engine, plus [`EntityHandle`] — the snapshot
//!   contract a storage engine issues for a stored entity
//!
//! # Example
//!
//! ```
//! use quiverdb_core::{ColumnDef, EntityHandle, EntityStatistics, Value, ValueType};
//!
//! let stats = EntityStatistics::new(1_000);
//! let entity = EntityHandle::new(
//!     "documents",
//!     vec![
//!         ColumnDef::new("id", ValueType::Int),
//!         ColumnDef::new("body", ValueType::String),
//!         ColumnDef::new("embedding", ValueType::Vector(384)),
//!     ],
//!     stats,
//! );
//!
//! assert_eq!(entity.row_count(), 1_000);
//! assert!(entity.column("body").is_some());
//! assert_eq!(Value::from(42i64).value_type(), Some(ValueType::Int));
//! ```

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod statistics;
pub mod types;

// Re-export commonly used types
pub use error::CoreError;
pub use statistics::{ColumnStatistics, EntityHandle, EntityStatistics};
pub use types::{ColumnDef, Value, ValueType};
