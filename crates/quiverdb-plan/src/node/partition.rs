//! Partitioning: splitting a sub-tree into parallel branches.
//!
//! [`PhysicalPlan::try_partition`] decides — through a [`CostPolicy`] —
//! whether a sub-tree is worth splitting, builds the structurally
//! identical branches, and reassembles them under the merge strategy
//! the sub-tree's traits call for:
//!
//! | traits          | merge strategy                         |
//! |-----------------|----------------------------------------|
//! | order + limit   | order-preserving bounded merge         |
//! | limit only      | plain merge, then limit                |
//! | order only      | plain merge, then sort                 |
//! | neither         | plain merge                            |
//!
//! The original tree is never mutated: the merged result and everything
//! downstream of the partitioned node are fresh copies.

use tracing::debug;

use super::{NodeId, OperatorKind, PhysicalPlan};
use crate::cost::CostPolicy;
use crate::error::{PlanError, PlanResult};
use crate::node::source::PartitionTag;
use crate::node::{LimitNode, MergeLimitingSortNode, MergeNode, SortNode};
use crate::traits::TraitKind;

impl PhysicalPlan {
    /// Attempts to split the sub-tree rooted at `id` for parallel
    /// execution.
    ///
    /// When this node's output carries the not-partitionable trait, or
    /// its source cannot split, the attempt is delegated to the primary
    /// input. Returns `Ok(None)` when no partitioning is warranted
    /// (`max_partitions ≤ 1`, or the policy answers 1); otherwise
    /// returns the root of a fresh tree in which the partitioned
    /// branches are merged in place of the original node.
    ///
    /// # Errors
    ///
    /// Propagates structural errors from tree reassembly.
    pub fn try_partition(
        &mut self,
        id: NodeId,
        policy: &dyn CostPolicy,
        max_partitions: usize,
    ) -> PlanResult<Option<NodeId>> {
        if max_partitions <= 1 {
            return Ok(None);
        }
        if self.traits(id).contains(TraitKind::NotPartitionable)
            || !self.supports_partitioning(id)
        {
            return match self.primary_input(id) {
                Some(input) => self.try_partition(input, policy, max_partitions),
                None => Ok(None),
            };
        }

        let partitions = policy.partitions(
            self.parallelizable_cost(id),
            self.total_cost(id),
            max_partitions,
        );
        if partitions <= 1 {
            return Ok(None);
        }
        debug!(node = self.kind(id).name(), partitions, "partitioning sub-tree");

        let branches: Vec<NodeId> = (0..partitions)
            .map(|p| self.partition(id, partitions, p))
            .collect::<PlanResult<_>>()?;
        let merged = self.merge_branches(id, &branches, partitions)?;
        let root = self.copy_downstream(id, merged)?;
        Ok(Some(root))
    }

    /// Reassembles partitioned branches under the merge strategy the
    /// partitioned node's traits call for.
    fn merge_branches(
        &mut self,
        id: NodeId,
        branches: &[NodeId],
        partitions: usize,
    ) -> PlanResult<NodeId> {
        let traits = self.traits(id);
        let order = traits.order().cloned();
        let limit = traits.limit();

        match (order, limit) {
            (Some(order), Some(limit)) => {
                let merge = self
                    .insert(MergeLimitingSortNode::new(order, limit.limit, partitions));
                for &branch in branches {
                    self.attach(branch, merge)?;
                }
                Ok(merge)
            }
            (None, Some(limit)) => {
                let merge = self.insert(MergeNode::new(partitions));
                for &branch in branches {
                    self.attach(branch, merge)?;
                }
                let bound =
                    self.insert(LimitNode::new(limit.limit).with_offset(limit.offset));
                self.attach(merge, bound)?;
                Ok(bound)
            }
            (Some(order), None) => {
                let merge = self.insert(MergeNode::new(partitions));
                for &branch in branches {
                    self.attach(branch, merge)?;
                }
                let sort = self.insert(SortNode::new(order));
                self.attach(merge, sort)?;
                Ok(sort)
            }
            (None, None) => {
                let merge = self.insert(MergeNode::new(partitions));
                for &branch in branches {
                    self.attach(branch, merge)?;
                }
                Ok(merge)
            }
        }
    }

    /// Builds the `p`-th of `partitions` structurally identical copies
    /// of the sub-tree rooted at `id`.
    ///
    /// Sources tag the copy with its shard so they can compute a
    /// disjoint row or index sub-range; unary kinds copy themselves
    /// onto their partitioned input.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Unsupported`] for kinds that cannot be
    /// split — counts, samples, intersections, merges, and index scans
    /// whose index reports itself non-partitionable.
    pub fn partition(
        &mut self,
        id: NodeId,
        partitions: usize,
        p: usize,
    ) -> PlanResult<NodeId> {
        match self.kind(id).clone() {
            OperatorKind::EntityScan(scan) => {
                Ok(self.insert(scan.with_partition(PartitionTag::new(p, partitions))))
            }
            OperatorKind::IndexScan(scan) => {
                if !scan.partitionable() {
                    return Err(PlanError::Unsupported(
                        "index does not support partitioned scans",
                    ));
                }
                Ok(self.insert(scan.with_partition(PartitionTag::new(p, partitions))))
            }
            OperatorKind::EntityCount(_) => {
                Err(PlanError::Unsupported("entity count cannot be partitioned"))
            }
            OperatorKind::EntitySample(_) => {
                Err(PlanError::Unsupported("fixed-seed sample cannot be partitioned"))
            }
            OperatorKind::IndexIntersectionScan(_) => {
                Err(PlanError::Unsupported("index intersection cannot be partitioned"))
            }
            OperatorKind::Filter(_)
            | OperatorKind::Fetch(_)
            | OperatorKind::Limit(_)
            | OperatorKind::Sort(_) => {
                let input = self
                    .primary_input(id)
                    .ok_or(PlanError::Unsupported("cannot partition a detached node"))?;
                let branch_input = self.partition(input, partitions, p)?;
                let clone = self.copy(id);
                self.attach(branch_input, clone)?;
                Ok(clone)
            }
            OperatorKind::FilterOnSubquery(_) => {
                Err(PlanError::Unsupported("subquery filter cannot be partitioned"))
            }
            OperatorKind::Merge(_) | OperatorKind::MergeLimitingSort(_) => {
                Err(PlanError::Unsupported("merge nodes are already partitioned"))
            }
        }
    }

    /// Whether the sub-tree rooted at `id` has a source that can split.
    fn supports_partitioning(&self, id: NodeId) -> bool {
        match self.kind(id) {
            OperatorKind::EntityScan(_) => true,
            OperatorKind::IndexScan(s) => s.partitionable(),
            OperatorKind::EntityCount(_)
            | OperatorKind::EntitySample(_)
            | OperatorKind::IndexIntersectionScan(_)
            | OperatorKind::FilterOnSubquery(_)
            | OperatorKind::Merge(_)
            | OperatorKind::MergeLimitingSort(_) => false,
            OperatorKind::Filter(_)
            | OperatorKind::Fetch(_)
            | OperatorKind::Limit(_)
            | OperatorKind::Sort(_) => {
                self.primary_input(id).is_some_and(|i| self.supports_partitioning(i))
            }
        }
    }
}
