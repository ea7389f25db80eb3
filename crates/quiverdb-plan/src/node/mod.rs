//! The physical plan: an arena of operator nodes.
//!
//! A plan is a directed, single-parent tree (not a DAG): every node has
//! at most one consumer, its *output*. Nodes live in an arena and are
//! addressed by [`NodeId`] handles; attaching an input is an explicit
//! operation that checks and sets the single consumer slot, so the
//! single-parent invariant is enforced in one place instead of being
//! scattered across setters.
//!
//! Transformations (rewrites, partitioning) never mutate an existing
//! tree: they build new nodes in the same arena and return the root of
//! the fresh tree. Superseded nodes simply stop being reachable from
//! any root; the arena is discarded wholesale once planning finishes.
//!
//! # Pipeline groups
//!
//! Each node belongs to a *group*: a pipeline segment executable
//! without a materialization boundary. A freshly inserted node starts
//! its own group; attaching its first (primary) input merges it into
//! that input's group. Binary and n-ary nodes therefore start a new
//! group on every input except the first — a binary node's group is its
//! left input's group, and its right input heads a group of its own.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use quiverdb_core::{ColumnDef, EntityHandle, EntityStatistics, ValueType};
//! use quiverdb_plan::node::{EntityScanNode, FilterNode, PhysicalPlan};
//! use quiverdb_plan::predicate::Predicate;
//!
//! let entity = Arc::new(EntityHandle::new(
//!     "docs",
//!     vec![ColumnDef::new("id", ValueType::Int)],
//!     EntityStatistics::new(100),
//! ));
//!
//! let mut plan = PhysicalPlan::new();
//! let scan = plan.insert(EntityScanNode::fetch(entity, &["id"]).unwrap());
//! let filter = plan.insert(FilterNode::new(Predicate::eq("id", 7i64)));
//! plan.attach(scan, filter).unwrap();
//!
//! assert_eq!(plan.depth(filter), 1);
//! assert_eq!(plan.group(filter), plan.group(scan));
//! assert!(plan.executable(filter));
//! ```

mod display;
mod interior;
mod kind;
mod partition;
mod properties;
mod source;

pub use interior::{
    FetchNode, FilterNode, FilterOnSubqueryNode, LimitNode, MergeLimitingSortNode, MergeNode,
    SortNode,
};
pub use kind::{Arity, OperatorKind};
pub use source::{
    EntityCountNode, EntityScanNode, EntitySampleNode, IndexIntersectionScanNode, IndexScanNode,
    PartitionTag,
};

use std::sync::Arc;

use crate::error::{PlanError, PlanResult};
use crate::selectivity::{DefaultSelectivityEstimator, SelectivityEstimator};

/// Handle to a node in a [`PhysicalPlan`] arena.
///
/// Ids are only meaningful for the arena that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[allow(clippy::cast_possible_truncation)]
    const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of a pipeline group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(u32);

struct NodeSlot {
    kind: OperatorKind,
    inputs: Vec<NodeId>,
    output: Option<NodeId>,
    group: GroupId,
}

/// Arena of physical operator nodes forming one or more plan trees.
///
/// The arena also carries the planning context shared by its nodes:
/// the selectivity estimator used to size filters.
pub struct PhysicalPlan {
    nodes: Vec<NodeSlot>,
    groups: u32,
    estimator: Arc<dyn SelectivityEstimator>,
}

impl Default for PhysicalPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicalPlan {
    /// Creates an empty plan arena with the default selectivity
    /// estimator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_estimator(Arc::new(DefaultSelectivityEstimator::new()))
    }

    /// Creates an empty plan arena with the given estimator.
    #[must_use]
    pub fn with_estimator(estimator: Arc<dyn SelectivityEstimator>) -> Self {
        Self { nodes: Vec::new(), groups: 0, estimator }
    }

    /// The selectivity estimator this plan sizes filters with.
    #[must_use]
    pub fn estimator(&self) -> &dyn SelectivityEstimator {
        self.estimator.as_ref()
    }

    /// Number of nodes in the arena (including superseded ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the arena holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Inserts a standalone node, starting its own group.
    pub fn insert(&mut self, kind: impl Into<OperatorKind>) -> NodeId {
        let group = GroupId(self.groups);
        self.groups += 1;
        self.insert_slot(kind.into(), group)
    }

    fn insert_slot(&mut self, kind: OperatorKind, group: GroupId) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(NodeSlot { kind, inputs: Vec::new(), output: None, group });
        id
    }

    /// The kind payload of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &OperatorKind {
        &self.nodes[id.index()].kind
    }

    /// The attached inputs of a node, in attachment order.
    #[must_use]
    pub fn inputs(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].inputs
    }

    /// The primary (first) input of a node, if attached.
    #[must_use]
    pub fn primary_input(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].inputs.first().copied()
    }

    /// The consumer of a node, if attached.
    #[must_use]
    pub fn output(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].output
    }

    /// The pipeline group of a node.
    #[must_use]
    pub fn group(&self, id: NodeId) -> GroupId {
        self.nodes[id.index()].group
    }

    /// The root of the tree containing `id`: the last node of its
    /// output chain.
    #[must_use]
    pub fn root(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(output) = self.output(current) {
            current = output;
        }
        current
    }

    /// Distance from the nearest leaf along the primary input chain.
    #[must_use]
    pub fn depth(&self, id: NodeId) -> usize {
        self.primary_input(id).map_or(0, |input| self.depth(input) + 1)
    }

    /// The leaf source nodes reachable from `id` (the node's *base*).
    ///
    /// For a leaf this is the node itself; for a binary node the union
    /// of both inputs' bases.
    #[must_use]
    pub fn base(&self, id: NodeId) -> Vec<NodeId> {
        let inputs = self.inputs(id);
        if inputs.is_empty() {
            return vec![id];
        }
        inputs.iter().flat_map(|&i| self.base(i)).collect()
    }

    /// All nodes of the sub-tree rooted at `id`, preorder.
    #[must_use]
    pub fn walk(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for &input in self.inputs(current).iter().rev() {
                stack.push(input);
            }
        }
        out
    }

    /// Attaches `input` as the next input of `consumer`.
    ///
    /// The first attached input is the primary input: the consumer
    /// joins its pipeline group.
    ///
    /// # Errors
    ///
    /// - [`PlanError::AlreadyConnected`] if `input` already has a
    ///   consumer (single-parent invariant).
    /// - [`PlanError::ArityExceeded`] if `consumer` already holds as
    ///   many inputs as its kind declares.
    pub fn attach(&mut self, input: NodeId, consumer: NodeId) -> PlanResult<()> {
        if self.nodes[input.index()].output.is_some() {
            return Err(PlanError::AlreadyConnected);
        }
        let capacity = self.kind(consumer).arity().capacity();
        if self.nodes[consumer.index()].inputs.len() >= capacity {
            return Err(PlanError::ArityExceeded { arity: capacity });
        }
        self.wire(input, consumer);
        Ok(())
    }

    /// Links two nodes without contract checks. Only for freshly built
    /// nodes whose invariants hold by construction.
    fn wire(&mut self, input: NodeId, consumer: NodeId) {
        debug_assert!(self.nodes[input.index()].output.is_none());
        let first = self.nodes[consumer.index()].inputs.is_empty();
        self.nodes[input.index()].output = Some(consumer);
        self.nodes[consumer.index()].inputs.push(input);
        if first {
            self.nodes[consumer.index()].group = self.nodes[input.index()].group;
        }
    }

    /// Clones a single node without links.
    ///
    /// The copy keeps the original's group id — a node's group never
    /// changes just because its inputs are detached.
    pub fn copy(&mut self, id: NodeId) -> NodeId {
        let kind = self.nodes[id.index()].kind.clone();
        let group = self.nodes[id.index()].group;
        self.insert_slot(kind, group)
    }

    /// Deep-clones the sub-tree rooted at `id`, crossing group
    /// boundaries. The clone shares no nodes with the original.
    pub fn copy_with_inputs(&mut self, id: NodeId) -> NodeId {
        let inputs = self.inputs(id).to_vec();
        let clone = self.copy(id);
        for input in inputs {
            let child = self.copy_with_inputs(input);
            self.wire(child, clone);
        }
        clone
    }

    /// Clones `id` and, recursively, only the inputs sharing its group;
    /// inputs beyond a group boundary are left off the clone.
    pub fn copy_with_group_inputs(&mut self, id: NodeId) -> NodeId {
        let group = self.group(id);
        let inputs = self.inputs(id).to_vec();
        let clone = self.copy(id);
        for input in inputs {
            if self.group(input) == group {
                let child = self.copy_with_group_inputs(input);
                self.wire(child, clone);
            }
        }
        clone
    }

    /// Clones `id` with the given replacement inputs, then clones
    /// everything downstream of it (toward the root), leaving the
    /// original tree untouched.
    ///
    /// Input positions not covered by `inputs` are deep-copied from the
    /// original. This is the mechanism rewrite and partition rules use
    /// to produce a new tree around a replaced sub-tree.
    ///
    /// Returns the root of the new tree.
    ///
    /// # Errors
    ///
    /// Fails when more inputs are supplied than the kind's arity, or
    /// when a supplied input already has a consumer.
    pub fn copy_with_output(&mut self, id: NodeId, inputs: &[NodeId]) -> PlanResult<NodeId> {
        let original_inputs = self.inputs(id).to_vec();
        let capacity = self.kind(id).arity().capacity();
        if inputs.len() > capacity {
            return Err(PlanError::ArityExceeded { arity: capacity });
        }
        let clone = self.copy(id);
        let wired = inputs.len().max(original_inputs.len());
        for position in 0..wired {
            let child = match inputs.get(position) {
                Some(&provided) => provided,
                None => self.copy_with_inputs(original_inputs[position]),
            };
            self.attach(child, clone)?;
        }
        self.copy_downstream(id, clone)
    }

    /// Clones the output chain of `from` (toward the root), attaching
    /// `replacement` in the position `from` occupied; sibling inputs of
    /// the cloned consumers are deep-copied. Returns the new root
    /// (`replacement` itself when `from` was a root).
    ///
    /// # Errors
    ///
    /// Fails when `replacement` already has a consumer.
    pub fn copy_downstream(&mut self, from: NodeId, replacement: NodeId) -> PlanResult<NodeId> {
        match self.output(from) {
            None => Ok(replacement),
            Some(consumer) => {
                let original_inputs = self.inputs(consumer).to_vec();
                let clone = self.copy(consumer);
                for &child in &original_inputs {
                    let new_child = if child == from {
                        replacement
                    } else {
                        self.copy_with_inputs(child)
                    };
                    self.attach(new_child, clone)?;
                }
                self.copy_downstream(consumer, clone)
            }
        }
    }

    /// Returns true when all declared inputs are attached, recursively.
    ///
    /// Only an executable node may be converted to a runtime operator.
    #[must_use]
    pub fn executable(&self, id: NodeId) -> bool {
        let inputs = self.inputs(id);
        inputs.len() == self.kind(id).arity().capacity()
            && inputs.iter().all(|&i| self.executable(i))
    }
}
