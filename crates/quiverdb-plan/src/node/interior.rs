//! Interior (unary, binary, and n-ary) nodes.
//!
//! Interior nodes transform the rows flowing out of their inputs. By
//! default they inherit columns, statistics, and traits from their
//! primary input; the kinds below only carry what they change.

use std::sync::Arc;

use quiverdb_core::{ColumnDef, EntityHandle};

use crate::predicate::Predicate;
use crate::traits::OrderTrait;

/// Filters rows by a boolean predicate.
#[derive(Debug, Clone)]
pub struct FilterNode {
    /// The predicate rows must satisfy.
    pub predicate: Predicate,
}

impl FilterNode {
    /// Creates a filter.
    #[must_use]
    pub const fn new(predicate: Predicate) -> Self {
        Self { predicate }
    }
}

/// Fetches additional physical columns for rows already flowing.
///
/// Inserted by the deferred-fetch rewrite: columns not needed by the
/// operators close to a scan are materialized later, after filters have
/// reduced the row count.
#[derive(Debug, Clone)]
pub struct FetchNode {
    /// The entity the columns are fetched from.
    pub entity: Arc<EntityHandle>,
    /// The columns to materialize.
    pub columns: Vec<ColumnDef>,
}

impl FetchNode {
    /// Creates a fetch of the given columns.
    #[must_use]
    pub const fn new(entity: Arc<EntityHandle>, columns: Vec<ColumnDef>) -> Self {
        Self { entity, columns }
    }
}

/// Bounds the number of rows produced.
#[derive(Debug, Clone, Copy)]
pub struct LimitNode {
    /// Maximum number of rows produced.
    pub limit: u64,
    /// Number of leading rows skipped.
    pub offset: u64,
}

impl LimitNode {
    /// Creates a limit without an offset.
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self { limit, offset: 0 }
    }

    /// Sets the offset.
    #[must_use]
    pub const fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

/// Sorts rows by the given keys.
#[derive(Debug, Clone)]
pub struct SortNode {
    /// The sort keys.
    pub order: OrderTrait,
}

impl SortNode {
    /// Creates a sort.
    #[must_use]
    pub const fn new(order: OrderTrait) -> Self {
        Self { order }
    }
}

/// Keeps left rows whose column value appears in the right input.
///
/// The right input is expected to produce a single column of candidate
/// values (a sub-select); it starts its own pipeline group.
#[derive(Debug, Clone)]
pub struct FilterOnSubqueryNode {
    /// The left-side column compared against the right input's output.
    pub column: String,
}

impl FilterOnSubqueryNode {
    /// Creates a subquery filter on the given column.
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self { column: column.into() }
    }
}

/// Plain union merge of partitioned branches.
///
/// Interleaves rows from its inputs in arrival order; any ordering or
/// bound the branches carried individually is not preserved.
#[derive(Debug, Clone, Copy)]
pub struct MergeNode {
    /// The number of branches this merge reassembles.
    pub fan_in: usize,
}

impl MergeNode {
    /// Creates a merge over `fan_in` branches.
    #[must_use]
    pub const fn new(fan_in: usize) -> Self {
        Self { fan_in }
    }
}

/// Order-preserving bounded merge of partitioned branches.
///
/// Performs a k-way merge on sorted branches and stops after the bound;
/// asserts both the ordering and the limit on its output.
#[derive(Debug, Clone)]
pub struct MergeLimitingSortNode {
    /// The ordering every branch is sorted by.
    pub order: OrderTrait,
    /// Maximum number of rows produced.
    pub limit: u64,
    /// The number of branches this merge reassembles.
    pub fan_in: usize,
}

impl MergeLimitingSortNode {
    /// Creates an order-preserving bounded merge.
    #[must_use]
    pub const fn new(order: OrderTrait, limit: u64, fan_in: usize) -> Self {
        Self { order, limit, fan_in }
    }
}
