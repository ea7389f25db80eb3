//! `QuiverDB` Plan
//!
//! Physical-query-plan representation and cost-based transformations
//! for `QuiverDB`.
//!
//! # Overview
//!
//! A query is compiled (elsewhere) into a tree of physical operator
//! nodes; this crate owns that tree and everything the planner does to
//! it before execution:
//!
//! - [`node`] — the plan arena: operator kinds, tree mechanics,
//!   structural copies, derived properties (cost, cardinality, traits),
//!   and the partitioning engine
//! - [`cost`] — the cost vector and the partitioning [`CostPolicy`]
//! - [`traits`] — physical output properties (ordering, limits,
//!   partitionability) and their propagation
//! - [`predicate`] — boolean and proximity predicates
//! - [`selectivity`] — pluggable selectivity estimation
//! - [`index`] — the contract index structures implement for the
//!   planner
//! - [`rewrite`] — rewrite rules applied to fixpoint (conjunction
//!   decomposition, deferred fetching)
//! - [`digest`] — deterministic structural fingerprints for plan
//!   deduplication
//! - [`exec`] — the contract for lowering a finished plan into runtime
//!   operators
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use quiverdb_core::{ColumnDef, EntityHandle, EntityStatistics, ValueType};
//! use quiverdb_plan::node::{EntityScanNode, FilterNode, PhysicalPlan};
//! use quiverdb_plan::predicate::Predicate;
//! use quiverdb_plan::rewrite::RewriteEngine;
//!
//! let entity = Arc::new(EntityHandle::new(
//!     "docs",
//!     vec![
//!         ColumnDef::new("id", ValueType::Int),
//!         ColumnDef::new("body", ValueType::String),
//!     ],
//!     EntityStatistics::new(10_000),
//! ));
//!
//! let mut plan = PhysicalPlan::new();
//! let scan = plan.insert(EntityScanNode::fetch(entity, &["id", "body"]).unwrap());
//! let filter = plan.insert(FilterNode::new(
//!     Predicate::eq("id", 42i64).and(Predicate::is_null("body")),
//! ));
//! plan.attach(scan, filter).unwrap();
//!
//! // Normalize: the conjunction splits, the body fetch is deferred
//! let root = RewriteEngine::standard().optimize(&mut plan, filter).unwrap();
//! assert!(plan.executable(root));
//! ```

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod cost;
pub mod digest;
pub mod error;
pub mod exec;
pub mod index;
pub mod node;
pub mod predicate;
pub mod rewrite;
pub mod selectivity;
pub mod traits;

// Re-export commonly used items at the crate root
pub use cost::{Cost, CostPolicy, WeightedCostPolicy};
pub use digest::Digest;
pub use error::{PlanError, PlanResult};
pub use exec::OperatorFactory;
pub use index::{Index, IndexRef};
pub use node::{GroupId, NodeId, OperatorKind, PhysicalPlan};
pub use predicate::{CompareOp, DistanceMetric, IndexQuery, Predicate, Proximity};
pub use rewrite::{RewriteEngine, RewriteRule};
pub use selectivity::{DefaultSelectivityEstimator, SelectivityEstimator};
pub use traits::{LimitTrait, OrderTrait, PlanTrait, SortDirection, TraitKind, Traits};
