//! The execution-conversion contract.
//!
//! The planning core never executes anything. Once a tree is final,
//! every node is lowered into a concrete runtime operator by the
//! execution engine — the [`OperatorFactory`] collaborator. The core's
//! side of the contract: conversion is only attempted on a node whose
//! inputs are complete ([`PhysicalPlan::executable`]); the factory is
//! handed each node in post-order, with its inputs already lowered.

use crate::error::{PlanError, PlanResult};
use crate::node::{NodeId, PhysicalPlan};

/// Lowers physical nodes into runtime operators.
///
/// Implemented by the execution engine; the operator type is opaque to
/// the planning core.
pub trait OperatorFactory {
    /// The runtime operator type produced.
    type Operator;

    /// Builds the operator for `node`, given its already-built inputs
    /// in input order.
    ///
    /// # Errors
    ///
    /// Implementations may fail for nodes they cannot lower; the error
    /// is propagated to the `to_operator` caller.
    fn build(
        &mut self,
        plan: &PhysicalPlan,
        node: NodeId,
        inputs: Vec<Self::Operator>,
    ) -> PlanResult<Self::Operator>;
}

impl PhysicalPlan {
    /// Converts the sub-tree rooted at `root` into a runtime operator.
    ///
    /// # Errors
    ///
    /// [`PlanError::NotExecutable`] when the tree is incomplete —
    /// callers must check [`executable`](Self::executable) first;
    /// factory errors are propagated.
    pub fn to_operator<F: OperatorFactory>(
        &self,
        root: NodeId,
        factory: &mut F,
    ) -> PlanResult<F::Operator> {
        if !self.executable(root) {
            return Err(PlanError::NotExecutable);
        }
        self.build_operator(root, factory)
    }

    fn build_operator<F: OperatorFactory>(
        &self,
        node: NodeId,
        factory: &mut F,
    ) -> PlanResult<F::Operator> {
        let mut inputs = Vec::with_capacity(self.inputs(node).len());
        for &input in self.inputs(node) {
            inputs.push(self.build_operator(input, factory)?);
        }
        factory.build(self, node, inputs)
    }
}
