//! The index collaborator contract.
//!
//! Concrete index structures (B-trees, HNSW graphs, inverted lists)
//! live outside the planning core. The planner consumes them through
//! [`Index`]: an index answers what a scan of it would cost, how many
//! rows it would yield, which physical traits (ordering, bounds) the
//! result carries, and which columns it produces.

use std::fmt;
use std::sync::Arc;

use quiverdb_core::ColumnDef;

use crate::cost::Cost;
use crate::predicate::IndexQuery;
use crate::selectivity::SelectivityEstimator;
use crate::traits::Traits;

/// Contract implemented by index structures the planner can scan.
///
/// All answers are planning-time estimates against the index's current
/// state; implementations must not block.
pub trait Index: fmt::Debug + Send + Sync {
    /// The index name.
    fn name(&self) -> &str;

    /// The name of the entity this index covers.
    fn entity(&self) -> &str;

    /// Estimated cost of scanning this index with the given query.
    fn cost_for(&self, query: &IndexQuery) -> Cost;

    /// Estimated number of rows the scan yields.
    ///
    /// Boolean queries should combine index statistics with the given
    /// estimator; proximity queries yield exactly `k`; a full scan
    /// yields the indexed row count.
    fn count_for(&self, query: &IndexQuery, estimator: &dyn SelectivityEstimator) -> u64;

    /// Physical traits intrinsic to scanning this index — e.g. a top-k
    /// proximity scan yields rows ordered by distance and bounded by
    /// `k`. Columns in the returned traits are index-native; the scan
    /// node remaps them to its bound output columns.
    fn traits_for(&self, query: &IndexQuery) -> Traits;

    /// The columns a scan of this index produces, index-native names.
    fn columns_for(&self, query: &IndexQuery) -> Vec<ColumnDef>;

    /// Whether a scan of this index can be split into disjoint
    /// sub-scans.
    fn partitionable(&self) -> bool;
}

/// Shared handle to an index; plan nodes hold these.
pub type IndexRef = Arc<dyn Index>;
