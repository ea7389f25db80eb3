//! Rewrite-rule equivalence tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use quiverdb_core::{ColumnDef, EntityHandle, EntityStatistics, Value, ValueType};
use quiverdb_plan::node::{EntityScanNode, FilterNode, NodeId, OperatorKind, PhysicalPlan};
use quiverdb_plan::predicate::{CompareOp, Predicate};
use quiverdb_plan::rewrite::{
    decompose_conjunction_left, decompose_conjunction_right, RewriteEngine,
};

fn entity() -> Arc<EntityHandle> {
    Arc::new(EntityHandle::new(
        "readings",
        vec![
            ColumnDef::new("sensor", ValueType::String),
            ColumnDef::new("value", ValueType::Float),
        ],
        EntityStatistics::new(1_000),
    ))
}

fn sample_rows() -> Vec<BTreeMap<String, Value>> {
    let mut rows = Vec::new();
    for (sensor, value) in [
        ("a", 1.0),
        ("a", 25.0),
        ("b", 25.0),
        ("b", 99.5),
        ("c", -3.0),
    ] {
        let mut row = BTreeMap::new();
        row.insert("sensor".to_owned(), Value::from(sensor));
        row.insert("value".to_owned(), Value::from(value));
        rows.push(row);
    }
    rows
}

/// Collects the filter predicates along the primary chain of a tree.
fn chain_predicates(plan: &PhysicalPlan, root: NodeId) -> Vec<Predicate> {
    let mut predicates = Vec::new();
    let mut current = Some(root);
    while let Some(node) = current {
        if let OperatorKind::Filter(f) = plan.kind(node) {
            predicates.push(f.predicate.clone());
        }
        current = plan.primary_input(node);
    }
    predicates
}

fn accepts(predicates: &[Predicate], row: &BTreeMap<String, Value>) -> bool {
    predicates.iter().all(|p| p.evaluate(row))
}

#[test]
fn decomposition_preserves_the_acceptance_set() {
    let compound = Predicate::eq("sensor", "b")
        .and(Predicate::compare("value", CompareOp::Greater, 10.0f64));

    for rule in [decompose_conjunction_left(), decompose_conjunction_right()] {
        let mut plan = PhysicalPlan::new();
        let scan = plan.insert(EntityScanNode::fetch(entity(), &["sensor", "value"]).unwrap());
        let filter = plan.insert(FilterNode::new(compound.clone()));
        plan.attach(scan, filter).unwrap();

        let engine = RewriteEngine::new(vec![rule]);
        let root = engine.optimize(&mut plan, filter).unwrap();

        let predicates = chain_predicates(&plan, root);
        assert_eq!(predicates.len(), 2);
        for row in sample_rows() {
            assert_eq!(
                accepts(&predicates, &row),
                compound.evaluate(&row),
                "row {row:?} classified differently after decomposition"
            );
        }
    }
}

#[test]
fn decomposition_is_a_fresh_tree() {
    let mut plan = PhysicalPlan::new();
    let scan = plan.insert(EntityScanNode::fetch(entity(), &["sensor"]).unwrap());
    let filter = plan.insert(FilterNode::new(
        Predicate::eq("sensor", "a").and(Predicate::is_null("sensor")),
    ));
    plan.attach(scan, filter).unwrap();
    let digest_before = plan.digest(filter);

    let engine = RewriteEngine::new(vec![decompose_conjunction_left()]);
    let root = engine.optimize(&mut plan, filter).unwrap();

    assert_ne!(root, filter);
    // The original tree is still intact and unchanged
    assert_eq!(plan.digest(filter), digest_before);
    assert_eq!(plan.output(scan), Some(filter));
}

#[test]
fn standard_rules_keep_the_result_schema() {
    let mut plan = PhysicalPlan::new();
    let scan = plan.insert(EntityScanNode::fetch(entity(), &["sensor", "value"]).unwrap());
    let filter = plan.insert(FilterNode::new(Predicate::eq("sensor", "a")));
    plan.attach(scan, filter).unwrap();

    let columns_before: Vec<String> =
        plan.columns(filter).iter().map(|c| c.name.clone()).collect();

    let root = RewriteEngine::standard().optimize(&mut plan, filter).unwrap();

    let mut columns_after: Vec<String> =
        plan.columns(root).iter().map(|c| c.name.clone()).collect();
    columns_after.sort();
    let mut expected = columns_before;
    expected.sort();
    assert_eq!(columns_after, expected);
    assert!(plan.executable(root));
}

#[test]
fn deferred_fetch_moves_unread_columns_behind_the_filter() {
    let mut plan = PhysicalPlan::new();
    let scan = plan.insert(EntityScanNode::fetch(entity(), &["sensor", "value"]).unwrap());
    let filter = plan.insert(FilterNode::new(
        Predicate::compare("value", CompareOp::GreaterEq, 50.0f64),
    ));
    plan.attach(scan, filter).unwrap();

    let root = RewriteEngine::standard().optimize(&mut plan, filter).unwrap();

    // sensor is only materialized after the filter
    assert_eq!(plan.kind(root).name(), "Fetch");
    let OperatorKind::Fetch(fetch) = plan.kind(root) else { panic!("expected fetch") };
    assert_eq!(fetch.columns.len(), 1);
    assert_eq!(fetch.columns[0].name, "sensor");

    let new_filter = plan.primary_input(root).unwrap();
    let new_scan = plan.primary_input(new_filter).unwrap();
    let OperatorKind::EntityScan(s) = plan.kind(new_scan) else { panic!("expected scan") };
    assert_eq!(s.columns.len(), 1);
    assert_eq!(s.columns[0].name, "value");

    // Fetching later is never more expensive up front: the new scan
    // reads fewer bytes per row
    assert!(plan.cost(new_scan).io < plan.cost(scan).io);
}
