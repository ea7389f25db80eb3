//! Conjunction decomposition.
//!
//! `Filter(a AND b)` is split into two sequential filters, each holding
//! one operand. Filter order affects downstream cost only, never
//! correctness, so both precedence variants exist and let the optimizer
//! explore either evaluation order.

use crate::error::PlanResult;
use crate::node::{FilterNode, NodeId, OperatorKind, PhysicalPlan};
use crate::predicate::Predicate;

use super::RewriteRule;

/// Splits a conjunctive filter, evaluating the left operand first
/// (closest to the source).
#[must_use]
pub fn decompose_conjunction_left() -> RewriteRule {
    RewriteRule::new("decompose-conjunction-left", matches_conjunction, apply_left)
}

/// Splits a conjunctive filter, evaluating the right operand first.
#[must_use]
pub fn decompose_conjunction_right() -> RewriteRule {
    RewriteRule::new("decompose-conjunction-right", matches_conjunction, apply_right)
}

fn matches_conjunction(plan: &PhysicalPlan, node: NodeId) -> bool {
    matches!(plan.kind(node), OperatorKind::Filter(f) if f.predicate.is_conjunction())
        && plan.inputs(node).len() == 1
}

fn apply_left(plan: &mut PhysicalPlan, node: NodeId) -> PlanResult<Option<NodeId>> {
    let Some((first, second)) = operands(plan, node) else { return Ok(None) };
    split(plan, node, first, second)
}

fn apply_right(plan: &mut PhysicalPlan, node: NodeId) -> PlanResult<Option<NodeId>> {
    let Some((first, second)) = operands(plan, node) else { return Ok(None) };
    split(plan, node, second, first)
}

fn operands(plan: &PhysicalPlan, node: NodeId) -> Option<(Predicate, Predicate)> {
    match plan.kind(node) {
        OperatorKind::Filter(FilterNode { predicate: Predicate::And(a, b) }) => {
            Some((*a.clone(), *b.clone()))
        }
        _ => None,
    }
}

/// Builds `source → Filter(first) → Filter(second) → downstream` as a
/// fresh tree, leaving the original untouched.
fn split(
    plan: &mut PhysicalPlan,
    node: NodeId,
    first: Predicate,
    second: Predicate,
) -> PlanResult<Option<NodeId>> {
    let Some(input) = plan.primary_input(node) else { return Ok(None) };
    let source = plan.copy_with_inputs(input);
    let near = plan.insert(FilterNode::new(first));
    plan.attach(source, near)?;
    let far = plan.insert(FilterNode::new(second));
    plan.attach(near, far)?;
    let root = plan.copy_downstream(node, far)?;
    Ok(Some(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::EntityScanNode;
    use crate::rewrite::RewriteEngine;
    use quiverdb_core::{ColumnDef, EntityHandle, EntityStatistics, ValueType};
    use std::sync::Arc;

    fn entity() -> Arc<EntityHandle> {
        Arc::new(EntityHandle::new(
            "items",
            vec![
                ColumnDef::new("a", ValueType::Int),
                ColumnDef::new("b", ValueType::Int),
            ],
            EntityStatistics::new(100),
        ))
    }

    fn conjunctive_chain(plan: &mut PhysicalPlan) -> NodeId {
        let scan = plan.insert(EntityScanNode::fetch(entity(), &["a", "b"]).expect("columns"));
        let filter = plan.insert(FilterNode::new(
            Predicate::eq("a", 1i64).and(Predicate::eq("b", 2i64)),
        ));
        plan.attach(scan, filter).expect("attach");
        filter
    }

    #[test]
    fn left_precedence_splits_in_order() {
        let mut plan = PhysicalPlan::new();
        let filter = conjunctive_chain(&mut plan);

        let engine = RewriteEngine::new(vec![decompose_conjunction_left()]);
        let root = engine.optimize(&mut plan, filter).expect("fixpoint");

        // root is Filter(b), its input Filter(a), then the scan
        let OperatorKind::Filter(outer) = plan.kind(root) else { panic!("expected filter") };
        assert_eq!(outer.predicate.columns(), vec!["b".to_owned()]);
        let inner = plan.primary_input(root).expect("inner");
        let OperatorKind::Filter(inner_filter) = plan.kind(inner) else {
            panic!("expected filter")
        };
        assert_eq!(inner_filter.predicate.columns(), vec!["a".to_owned()]);
        assert_eq!(plan.kind(plan.primary_input(inner).expect("scan")).name(), "EntityScan");
    }

    #[test]
    fn right_precedence_swaps_order() {
        let mut plan = PhysicalPlan::new();
        let filter = conjunctive_chain(&mut plan);

        let engine = RewriteEngine::new(vec![decompose_conjunction_right()]);
        let root = engine.optimize(&mut plan, filter).expect("fixpoint");

        let OperatorKind::Filter(outer) = plan.kind(root) else { panic!("expected filter") };
        assert_eq!(outer.predicate.columns(), vec!["a".to_owned()]);
    }

    #[test]
    fn nested_conjunctions_fully_decompose() {
        let mut plan = PhysicalPlan::new();
        let scan = plan.insert(EntityScanNode::fetch(entity(), &["a", "b"]).expect("columns"));
        let filter = plan.insert(FilterNode::new(
            Predicate::eq("a", 1i64)
                .and(Predicate::eq("b", 2i64))
                .and(Predicate::eq("a", 3i64)),
        ));
        plan.attach(scan, filter).expect("attach");

        let engine = RewriteEngine::new(vec![decompose_conjunction_left()]);
        let root = engine.optimize(&mut plan, filter).expect("fixpoint");

        // Three sequential single-atom filters
        let mut current = root;
        let mut filters = 0;
        while let OperatorKind::Filter(f) = plan.kind(current) {
            assert_eq!(f.predicate.atom_count(), 1);
            filters += 1;
            current = plan.primary_input(current).expect("input");
        }
        assert_eq!(filters, 3);
        assert_eq!(plan.kind(current).name(), "EntityScan");
    }

    #[test]
    fn non_conjunctive_filter_is_untouched() {
        let mut plan = PhysicalPlan::new();
        let scan = plan.insert(EntityScanNode::fetch(entity(), &["a"]).expect("columns"));
        let filter = plan.insert(FilterNode::new(
            Predicate::eq("a", 1i64).or(Predicate::eq("a", 2i64)),
        ));
        plan.attach(scan, filter).expect("attach");

        let engine = RewriteEngine::new(vec![decompose_conjunction_left()]);
        let root = engine.optimize(&mut plan, filter).expect("fixpoint");
        assert_eq!(root, filter);
    }
}
