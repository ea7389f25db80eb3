//! Derived node properties: columns, statistics, cardinality, cost,
//! and physical traits.
//!
//! Interior kinds inherit most properties from their primary input;
//! the match arms below only spell out what a kind changes. Inheritance
//! is explicit — each property is computed from the input's value
//! passed through the kind's override — rather than relying on
//! overridable accessors walking up the tree.

use quiverdb_core::{ColumnDef, ColumnStatistics, EntityStatistics, ValueType};

use std::collections::BTreeMap;

use super::{NodeId, OperatorKind, PhysicalPlan};
use crate::cost::Cost;
use crate::traits::{LimitTrait, PlanTrait, TraitKind, Traits};

/// Fallback width in bytes for variable-width columns when no entity
/// statistics are in reach (e.g. sorting index-scan output).
const DEFAULT_VAR_WIDTH: f64 = 16.0;

/// Fraction of left rows assumed to survive a subquery filter.
const SUBQUERY_FILTER_SELECTIVITY: f64 = 0.5;

/// Estimated width of one row over the given columns, in bytes.
pub(crate) fn estimated_row_width(columns: &[ColumnDef]) -> f64 {
    columns
        .iter()
        .map(|c| c.value_type.physical_width().map_or(DEFAULT_VAR_WIDTH, f64::from))
        .sum()
}

fn merge_columns(base: Vec<ColumnDef>, extra: &[ColumnDef]) -> Vec<ColumnDef> {
    let mut out = base;
    for column in extra {
        if !out.iter().any(|c| c.name == column.name) {
            out.push(column.clone());
        }
    }
    out
}

impl PhysicalPlan {
    /// The logical result schema of a node.
    #[must_use]
    pub fn columns(&self, id: NodeId) -> Vec<ColumnDef> {
        match self.kind(id) {
            OperatorKind::EntityScan(s) => s.columns.clone(),
            OperatorKind::EntitySample(s) => s.columns.clone(),
            OperatorKind::EntityCount(_) => {
                vec![ColumnDef::new("count", ValueType::Int)]
            }
            OperatorKind::IndexScan(s) => s.columns().to_vec(),
            OperatorKind::IndexIntersectionScan(s) => s.columns().to_vec(),
            OperatorKind::Fetch(f) => {
                merge_columns(self.inherited_columns(id), &f.columns)
            }
            _ => self.inherited_columns(id),
        }
    }

    /// The columns actually materialized from storage at or below this
    /// node.
    #[must_use]
    pub fn physical_columns(&self, id: NodeId) -> Vec<ColumnDef> {
        match self.kind(id) {
            OperatorKind::EntityScan(s) => s.columns.clone(),
            OperatorKind::EntitySample(s) => s.columns.clone(),
            OperatorKind::EntityCount(_) => Vec::new(),
            OperatorKind::IndexScan(s) => s.columns().to_vec(),
            OperatorKind::IndexIntersectionScan(s) => s.columns().to_vec(),
            OperatorKind::Fetch(f) => {
                let inherited = self
                    .primary_input(id)
                    .map_or_else(Vec::new, |i| self.physical_columns(i));
                merge_columns(inherited, &f.columns)
            }
            _ => self
                .primary_input(id)
                .map_or_else(Vec::new, |i| self.physical_columns(i)),
        }
    }

    fn inherited_columns(&self, id: NodeId) -> Vec<ColumnDef> {
        self.primary_input(id).map_or_else(Vec::new, |i| self.columns(i))
    }

    /// Per-column statistics describing this node's output, with the
    /// node's output size as row count.
    ///
    /// Source nodes supply their entity's statistics; interior nodes
    /// inherit from the primary input.
    #[must_use]
    pub fn statistics(&self, id: NodeId) -> EntityStatistics {
        let columns = self.statistics_columns(id);
        EntityStatistics { row_count: self.output_size(id), columns }
    }

    fn statistics_columns(&self, id: NodeId) -> BTreeMap<String, ColumnStatistics> {
        match self.kind(id) {
            OperatorKind::EntityScan(s) => s.entity.statistics().columns.clone(),
            OperatorKind::EntitySample(s) => s.entity.statistics().columns.clone(),
            OperatorKind::EntityCount(_) => BTreeMap::new(),
            OperatorKind::IndexScan(_) | OperatorKind::IndexIntersectionScan(_) => {
                BTreeMap::new()
            }
            OperatorKind::Fetch(f) => {
                let mut columns = self
                    .primary_input(id)
                    .map_or_else(BTreeMap::new, |i| self.statistics_columns(i));
                for column in &f.columns {
                    if let Some(stats) = f.entity.statistics().column(&column.name) {
                        columns.entry(column.name.clone()).or_insert_with(|| stats.clone());
                    }
                }
                columns
            }
            _ => self
                .primary_input(id)
                .map_or_else(BTreeMap::new, |i| self.statistics_columns(i)),
        }
    }

    /// Estimated number of rows this node produces.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn output_size(&self, id: NodeId) -> u64 {
        match self.kind(id) {
            OperatorKind::EntityScan(s) => s.output_size(),
            OperatorKind::EntityCount(_) => 1,
            OperatorKind::EntitySample(s) => s.output_size(),
            OperatorKind::IndexScan(s) => s.output_size(),
            OperatorKind::IndexIntersectionScan(s) => s.output_size(),
            OperatorKind::Filter(f) => {
                let Some(input) = self.primary_input(id) else { return 0 };
                let input_size = self.output_size(input);
                let selectivity =
                    self.estimator().estimate(&f.predicate, &self.statistics(input));
                (input_size as f64 * selectivity).ceil() as u64
            }
            OperatorKind::Fetch(_) | OperatorKind::Sort(_) => {
                self.primary_input(id).map_or(0, |i| self.output_size(i))
            }
            OperatorKind::Limit(l) => {
                let input_size =
                    self.primary_input(id).map_or(0, |i| self.output_size(i));
                l.limit.min(input_size.saturating_sub(l.offset))
            }
            OperatorKind::FilterOnSubquery(_) => {
                let left_size =
                    self.primary_input(id).map_or(0, |i| self.output_size(i));
                (left_size as f64 * SUBQUERY_FILTER_SELECTIVITY).ceil() as u64
            }
            OperatorKind::Merge(_) => self.input_sizes_total(id),
            OperatorKind::MergeLimitingSort(m) => m.limit.min(self.input_sizes_total(id)),
        }
    }

    fn input_sizes_total(&self, id: NodeId) -> u64 {
        self.inputs(id).iter().map(|&i| self.output_size(i)).sum()
    }

    /// The node's own cost, excluding its inputs.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cost(&self, id: NodeId) -> Cost {
        match self.kind(id) {
            OperatorKind::EntityScan(s) => s.own_cost(),
            OperatorKind::EntityCount(c) => c.own_cost(),
            OperatorKind::EntitySample(s) => s.own_cost(),
            OperatorKind::IndexScan(s) => s.own_cost(),
            OperatorKind::IndexIntersectionScan(s) => s.own_cost(),
            OperatorKind::Filter(f) => {
                let input_size =
                    self.primary_input(id).map_or(0, |i| self.output_size(i));
                Cost::ROW_PROCESSING * (input_size as f64 * f.predicate.atom_count() as f64)
            }
            OperatorKind::Fetch(f) => {
                let input_size =
                    self.primary_input(id).map_or(0, |i| self.output_size(i));
                let bytes_per_row: f64 =
                    f.columns.iter().map(|c| f.entity.column_width(c)).sum();
                (Cost::DISK_ACCESS_READ + Cost::MEMORY_ACCESS)
                    * (input_size as f64 * bytes_per_row)
            }
            OperatorKind::Limit(_) => Cost::ROW_PROCESSING * self.output_size(id) as f64,
            OperatorKind::Sort(_) => {
                let input = self.primary_input(id);
                let n = input.map_or(0, |i| self.output_size(i)) as f64;
                let width =
                    estimated_row_width(&input.map_or_else(Vec::new, |i| self.columns(i)));
                let comparisons = if n > 1.0 { n * n.log2() } else { n };
                Cost::ROW_PROCESSING * comparisons + Cost::MEMORY_ACCESS * (n * width)
            }
            OperatorKind::FilterOnSubquery(_) => {
                Cost::ROW_PROCESSING * self.input_sizes_total(id) as f64
            }
            OperatorKind::Merge(_) => {
                Cost::ROW_PROCESSING * self.input_sizes_total(id) as f64
            }
            OperatorKind::MergeLimitingSort(m) => {
                let fan = (m.fan_in.max(2) as f64).log2();
                Cost::ROW_PROCESSING * (self.input_sizes_total(id) as f64 * fan)
            }
        }
    }

    /// The cost of this node plus all of its inputs, recursively.
    ///
    /// For a leaf this equals [`cost`](Self::cost).
    #[must_use]
    pub fn total_cost(&self, id: NodeId) -> Cost {
        self.inputs(id)
            .iter()
            .map(|&i| self.total_cost(i))
            .fold(self.cost(id), |acc, c| acc + c)
    }

    /// The share of [`total_cost`](Self::total_cost) that partitioned
    /// execution could spread across workers.
    ///
    /// A node carrying the not-partitionable trait contributes nothing;
    /// sources contribute their own cost only when they can split.
    #[must_use]
    pub fn parallelizable_cost(&self, id: NodeId) -> Cost {
        if self.traits(id).contains(TraitKind::NotPartitionable) {
            return Cost::ZERO;
        }
        match self.kind(id) {
            OperatorKind::EntityScan(s) => s.own_cost(),
            OperatorKind::IndexScan(s) => {
                if s.partitionable() {
                    s.own_cost()
                } else {
                    Cost::ZERO
                }
            }
            OperatorKind::EntityCount(_)
            | OperatorKind::EntitySample(_)
            | OperatorKind::IndexIntersectionScan(_) => Cost::ZERO,
            _ => self
                .inputs(id)
                .iter()
                .map(|&i| self.parallelizable_cost(i))
                .fold(self.cost(id), |acc, c| acc + c),
        }
    }

    /// The physical traits of this node's output.
    ///
    /// Kinds not listed inherit their primary input's traits unchanged.
    #[must_use]
    pub fn traits(&self, id: NodeId) -> Traits {
        let inherited =
            self.primary_input(id).map_or_else(Traits::new, |i| self.traits(i));
        match self.kind(id) {
            OperatorKind::EntityScan(_) | OperatorKind::EntityCount(_) => Traits::new(),
            OperatorKind::EntitySample(_) | OperatorKind::IndexIntersectionScan(_) => {
                Traits::new().with(PlanTrait::NotPartitionable)
            }
            OperatorKind::IndexScan(s) => s.traits().clone(),
            OperatorKind::Limit(l) => inherited
                .with(PlanTrait::Limit(LimitTrait::new(l.limit).with_offset(l.offset))),
            OperatorKind::Sort(s) => inherited.with(PlanTrait::Order(s.order.clone())),
            OperatorKind::Merge(_) => {
                inherited.without(TraitKind::Order).without(TraitKind::Limit)
            }
            OperatorKind::MergeLimitingSort(m) => inherited
                .with(PlanTrait::Order(m.order.clone()))
                .with(PlanTrait::Limit(LimitTrait::new(m.limit))),
            OperatorKind::Filter(_)
            | OperatorKind::Fetch(_)
            | OperatorKind::FilterOnSubquery(_) => inherited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{
        EntityCountNode, EntityScanNode, EntitySampleNode, FilterNode, LimitNode, MergeNode,
        SortNode,
    };
    use crate::predicate::Predicate;
    use crate::traits::OrderTrait;
    use quiverdb_core::EntityHandle;
    use std::sync::Arc;

    fn entity(rows: u64) -> Arc<EntityHandle> {
        Arc::new(EntityHandle::new(
            "items",
            vec![
                ColumnDef::new("id", ValueType::Int),
                ColumnDef::new("name", ValueType::String),
            ],
            EntityStatistics::new(rows)
                .with_column("id", ColumnStatistics::new().with_distinct_count(rows))
                .with_column("name", ColumnStatistics::new().with_avg_width(20.0)),
        ))
    }

    #[test]
    fn leaf_total_cost_equals_own_cost() {
        let mut plan = PhysicalPlan::new();
        let scan =
            plan.insert(EntityScanNode::fetch(entity(1_000), &["id", "name"]).expect("columns"));
        assert_eq!(plan.total_cost(scan), plan.cost(scan));
        assert_eq!(plan.output_size(scan), 1_000);
    }

    #[test]
    fn total_cost_is_additive() {
        let mut plan = PhysicalPlan::new();
        let scan =
            plan.insert(EntityScanNode::fetch(entity(1_000), &["id"]).expect("columns"));
        let filter = plan.insert(FilterNode::new(Predicate::eq("id", 5i64)));
        plan.attach(scan, filter).expect("attach");

        let total = plan.total_cost(filter);
        let sum = plan.cost(filter) + plan.total_cost(scan);
        assert!((total.io - sum.io).abs() < 1e-12);
        assert!((total.cpu - sum.cpu).abs() < 1e-12);
        assert!((total.memory - sum.memory).abs() < 1e-12);
    }

    #[test]
    fn filter_uses_statistics_for_selectivity() {
        let mut plan = PhysicalPlan::new();
        let scan =
            plan.insert(EntityScanNode::fetch(entity(1_000), &["id"]).expect("columns"));
        let filter = plan.insert(FilterNode::new(Predicate::eq("id", 5i64)));
        plan.attach(scan, filter).expect("attach");
        // distinct_count == row_count, so equality selects one row
        assert_eq!(plan.output_size(filter), 1);
    }

    #[test]
    fn count_produces_single_row() {
        let mut plan = PhysicalPlan::new();
        let count = plan.insert(EntityCountNode::new(entity(1_000)));
        assert_eq!(plan.output_size(count), 1);
        let columns = plan.columns(count);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].name, "count");
        assert!(plan.physical_columns(count).is_empty());
    }

    #[test]
    fn sample_size_and_trait() {
        let mut plan = PhysicalPlan::new();
        let ent = entity(1_000);
        let columns = ent.columns().to_vec();
        let sample = plan.insert(EntitySampleNode::new(ent, columns, 0.1, 42));
        assert_eq!(plan.output_size(sample), 100);
        assert!(plan.traits(sample).contains(TraitKind::NotPartitionable));
        assert!(plan.parallelizable_cost(sample).is_zero());
    }

    #[test]
    fn limit_bounds_output() {
        let mut plan = PhysicalPlan::new();
        let scan = plan.insert(EntityScanNode::fetch(entity(1_000), &["id"]).expect("columns"));
        let limit = plan.insert(LimitNode::new(10));
        plan.attach(scan, limit).expect("attach");
        assert_eq!(plan.output_size(limit), 10);
        assert_eq!(plan.traits(limit).limit().map(|l| l.limit), Some(10));
    }

    #[test]
    fn sort_overrides_order_trait() {
        let mut plan = PhysicalPlan::new();
        let scan = plan.insert(EntityScanNode::fetch(entity(100), &["id"]).expect("columns"));
        let sort = plan.insert(SortNode::new(OrderTrait::ascending("id")));
        plan.attach(scan, sort).expect("attach");
        assert!(plan.traits(sort).order().is_some());
        // Sorting keeps cardinality
        assert_eq!(plan.output_size(sort), 100);
    }

    #[test]
    fn merge_sums_inputs_and_clears_traits() {
        let mut plan = PhysicalPlan::new();
        let merge = plan.insert(MergeNode::new(2));
        for _ in 0..2 {
            let scan =
                plan.insert(EntityScanNode::fetch(entity(50), &["id"]).expect("columns"));
            let limit = plan.insert(LimitNode::new(10));
            plan.attach(scan, limit).expect("attach scan");
            plan.attach(limit, merge).expect("attach limit");
        }
        assert_eq!(plan.output_size(merge), 20);
        assert!(plan.traits(merge).limit().is_none());
    }

    #[test]
    fn not_partitionable_zeroes_parallelizable_cost_downstream() {
        let mut plan = PhysicalPlan::new();
        let ent = entity(1_000);
        let columns = ent.columns().to_vec();
        let sample = plan.insert(EntitySampleNode::new(ent, columns, 0.5, 7));
        let filter = plan.insert(FilterNode::new(Predicate::eq("id", 1i64)));
        plan.attach(sample, filter).expect("attach");

        // The filter inherits the marker trait, so nothing is parallelizable
        assert!(plan.traits(filter).contains(TraitKind::NotPartitionable));
        assert!(plan.parallelizable_cost(filter).is_zero());
        assert!(!plan.total_cost(filter).is_zero());
    }
}
