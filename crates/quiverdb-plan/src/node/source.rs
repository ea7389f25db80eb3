//! Leaf source nodes.
//!
//! Sources are the nullary operators a plan bottoms out in: scans over
//! stored entities and lookups against index structures. Unlike
//! interior nodes, a source supplies its own cost, cardinality, and
//! trait facts instead of inheriting them.
//!
//! Cost and cardinality are captured as snapshots at construction time
//! (against the [`EntityHandle`] or [`Index`] state of that moment), so
//! a plan stays internally consistent while it is being transformed.

use std::sync::Arc;

use quiverdb_core::{ColumnDef, EntityHandle};

use crate::cost::Cost;
use crate::error::{PlanError, PlanResult};
use crate::index::{Index, IndexRef};
use crate::predicate::IndexQuery;
use crate::selectivity::SelectivityEstimator;
use crate::traits::Traits;

/// Which shard of a partitioned source this copy covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionTag {
    /// Zero-based partition index.
    pub index: usize,
    /// Total number of partitions.
    pub count: usize,
}

impl PartitionTag {
    /// Creates a partition tag.
    #[must_use]
    pub const fn new(index: usize, count: usize) -> Self {
        Self { index, count }
    }

    /// Returns the number of rows out of `total` this partition covers.
    ///
    /// Shares are disjoint and exhaustive: the first `total % count`
    /// partitions take one extra row.
    #[must_use]
    pub const fn share(&self, total: u64) -> u64 {
        let count = self.count as u64;
        if count == 0 {
            return total;
        }
        let base = total / count;
        if (self.index as u64) < total % count {
            base + 1
        } else {
            base
        }
    }
}

/// Full scan over a stored entity, fetching a set of physical columns.
#[derive(Debug, Clone)]
pub struct EntityScanNode {
    /// Snapshot of the scanned entity.
    pub entity: Arc<EntityHandle>,
    /// Columns materialized by the scan.
    pub columns: Vec<ColumnDef>,
    /// Shard tag when this scan is one partition of a split scan.
    pub partition: Option<PartitionTag>,
}

impl EntityScanNode {
    /// Creates a scan fetching the given columns.
    #[must_use]
    pub const fn new(entity: Arc<EntityHandle>, columns: Vec<ColumnDef>) -> Self {
        Self { entity, columns, partition: None }
    }

    /// Creates a scan fetching columns by name.
    ///
    /// # Errors
    ///
    /// Fails with an unknown-column error when a name is not in the
    /// entity's schema.
    pub fn fetch(entity: Arc<EntityHandle>, names: &[&str]) -> PlanResult<Self> {
        let columns = names
            .iter()
            .map(|n| entity.require_column(n).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(entity, columns))
    }

    /// Tags this scan as one shard of a partitioned scan.
    #[must_use]
    pub const fn with_partition(mut self, partition: PartitionTag) -> Self {
        self.partition = Some(partition);
        self
    }

    /// Number of rows this scan produces: the entity's row count, or
    /// this shard's share of it.
    #[must_use]
    pub fn output_size(&self) -> u64 {
        let total = self.entity.row_count();
        self.partition.map_or(total, |p| p.share(total))
    }

    /// Cost of reading the fetched columns for every produced row.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn own_cost(&self) -> Cost {
        let bytes_per_row: f64 =
            self.columns.iter().map(|c| self.entity.column_width(c)).sum();
        (Cost::DISK_ACCESS_READ + Cost::MEMORY_ACCESS)
            * (self.output_size() as f64 * bytes_per_row)
    }
}

/// Row count of a stored entity, answered from statistics.
#[derive(Debug, Clone)]
pub struct EntityCountNode {
    /// Snapshot of the counted entity.
    pub entity: Arc<EntityHandle>,
}

impl EntityCountNode {
    /// Creates a count node.
    #[must_use]
    pub const fn new(entity: Arc<EntityHandle>) -> Self {
        Self { entity }
    }

    /// A count reads no stored data; only the statistics entry.
    #[must_use]
    pub fn own_cost(&self) -> Cost {
        Cost::MEMORY_ACCESS * 8.0
    }
}

/// Bernoulli sample of a stored entity with a fixed seed.
///
/// Sampling with a fixed seed is not decomposable: splitting the row
/// range changes which rows the pseudo-random stream selects, so this
/// node is never partitioned.
#[derive(Debug, Clone)]
pub struct EntitySampleNode {
    /// Snapshot of the sampled entity.
    pub entity: Arc<EntityHandle>,
    /// Columns materialized for sampled rows.
    pub columns: Vec<ColumnDef>,
    /// Probability of keeping a row, in `[0, 1]`.
    pub probability: f64,
    /// Seed of the sampling stream.
    pub seed: u64,
}

impl EntitySampleNode {
    /// Creates a sample node; the probability is clamped to `[0, 1]`.
    #[must_use]
    pub fn new(
        entity: Arc<EntityHandle>,
        columns: Vec<ColumnDef>,
        probability: f64,
        seed: u64,
    ) -> Self {
        Self { entity, columns, probability: probability.clamp(0.0, 1.0), seed }
    }

    /// Expected number of sampled rows: `floor(rows × p)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn output_size(&self) -> u64 {
        (self.entity.row_count() as f64 * self.probability).floor() as u64
    }

    /// Cost scales with the sampled output, not the full scan.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn own_cost(&self) -> Cost {
        let bytes_per_row: f64 =
            self.columns.iter().map(|c| self.entity.column_width(c)).sum();
        (Cost::DISK_ACCESS_READ + Cost::MEMORY_ACCESS)
            * (self.output_size() as f64 * bytes_per_row)
    }
}

/// Scan of a single index with a query.
///
/// Cost, cardinality, traits, and output columns are delegated to the
/// index collaborator and captured here at construction time.
#[derive(Debug, Clone)]
pub struct IndexScanNode {
    index: IndexRef,
    query: IndexQuery,
    bindings: Vec<(String, String)>,
    count: u64,
    cost: Cost,
    traits: Traits,
    columns: Vec<ColumnDef>,
    partition: Option<PartitionTag>,
}

impl IndexScanNode {
    /// Creates an index scan, snapshotting the index's answers for the
    /// given query.
    #[must_use]
    pub fn new(
        index: IndexRef,
        query: IndexQuery,
        estimator: &dyn SelectivityEstimator,
    ) -> Self {
        let count = index.count_for(&query, estimator);
        let cost = index.cost_for(&query);
        let traits = index.traits_for(&query);
        let columns = index.columns_for(&query);
        Self { index, query, bindings: Vec::new(), count, cost, traits, columns, partition: None }
    }

    /// Binds index-native column names to output names.
    ///
    /// Both the output columns and any column-bearing traits (ordering)
    /// are remapped.
    #[must_use]
    pub fn with_bindings(mut self, bindings: Vec<(String, String)>) -> Self {
        self.columns = self
            .columns
            .iter()
            .map(|c| {
                bindings
                    .iter()
                    .find(|(from, _)| *from == c.name)
                    .map_or_else(|| c.clone(), |(_, to)| c.renamed(to.clone()))
            })
            .collect();
        if let Some(order) = self.traits.order() {
            let remapped = order.remapped(&bindings);
            self.traits.insert(crate::traits::PlanTrait::Order(remapped));
        }
        self.bindings = bindings;
        self
    }

    /// Tags this scan as one shard of a partitioned scan.
    #[must_use]
    pub fn with_partition(mut self, partition: PartitionTag) -> Self {
        self.partition = Some(partition);
        self
    }

    /// The scanned index.
    #[must_use]
    pub fn index(&self) -> &dyn Index {
        self.index.as_ref()
    }

    /// Shared handle to the scanned index.
    #[must_use]
    pub fn index_ref(&self) -> &IndexRef {
        &self.index
    }

    /// The evaluated query.
    #[must_use]
    pub const fn query(&self) -> &IndexQuery {
        &self.query
    }

    /// The native → output column bindings.
    #[must_use]
    pub fn bindings(&self) -> &[(String, String)] {
        &self.bindings
    }

    /// The bound output columns.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// The scan's physical traits, remapped to bound columns.
    #[must_use]
    pub const fn traits(&self) -> &Traits {
        &self.traits
    }

    /// Whether the underlying index supports disjoint sub-scans.
    #[must_use]
    pub fn partitionable(&self) -> bool {
        self.index.partitionable()
    }

    /// The shard tag, if this scan is partitioned.
    #[must_use]
    pub const fn partition(&self) -> Option<PartitionTag> {
        self.partition
    }

    /// Rows produced: the index's count, or this shard's share of it.
    #[must_use]
    pub fn output_size(&self) -> u64 {
        self.partition.map_or(self.count, |p| p.share(self.count))
    }

    /// Scan cost, scaled down to this shard's share when partitioned.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn own_cost(&self) -> Cost {
        match self.partition {
            Some(p) if self.count > 0 => {
                self.cost * (p.share(self.count) as f64 / self.count as f64)
            }
            _ => self.cost,
        }
    }
}

/// Intersection of several index scans over one entity.
///
/// All member indexes must cover the same entity; the result contains
/// the rows matching every member query.
#[derive(Debug, Clone)]
pub struct IndexIntersectionScanNode {
    members: Vec<(IndexRef, IndexQuery)>,
    counts: Vec<u64>,
    cost: Cost,
    columns: Vec<ColumnDef>,
}

impl IndexIntersectionScanNode {
    /// Creates an intersection scan.
    ///
    /// # Errors
    ///
    /// Fails with [`PlanError::EntityMismatch`] when the member indexes
    /// do not all reference the same entity.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(
        members: Vec<(IndexRef, IndexQuery)>,
        estimator: &dyn SelectivityEstimator,
    ) -> PlanResult<Self> {
        let Some((first, _)) = members.first() else {
            return Err(PlanError::Unsupported("index intersection requires at least one index"));
        };
        let entity = first.entity().to_owned();
        for (index, _) in &members {
            if index.entity() != entity {
                return Err(PlanError::EntityMismatch {
                    expected: entity,
                    actual: index.entity().to_owned(),
                });
            }
        }

        let counts: Vec<u64> =
            members.iter().map(|(i, q)| i.count_for(q, estimator)).collect();
        let candidate_rows: u64 = counts.iter().sum();
        let cost = members.iter().map(|(i, q)| i.cost_for(q)).sum::<Cost>()
            + Cost::ROW_PROCESSING * candidate_rows as f64;

        // Members yield their own column sets; the intersection can only
        // promise the columns every member produces.
        let mut columns: Vec<ColumnDef> = Vec::new();
        for (i, (index, query)) in members.iter().enumerate() {
            let cols = index.columns_for(query);
            if i == 0 {
                columns = cols;
            } else {
                columns.retain(|c| cols.iter().any(|o| o.name == c.name));
            }
        }

        Ok(Self { members, counts, cost, columns })
    }

    /// The member (index, query) pairs.
    #[must_use]
    pub fn members(&self) -> &[(IndexRef, IndexQuery)] {
        &self.members
    }

    /// The columns every member produces.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// An intersection is at most as large as its smallest operand.
    #[must_use]
    pub fn output_size(&self) -> u64 {
        self.counts.iter().copied().min().unwrap_or(0)
    }

    /// Sum of member scan costs plus per-row intersection bookkeeping.
    #[must_use]
    pub const fn own_cost(&self) -> Cost {
        self.cost
    }
}
