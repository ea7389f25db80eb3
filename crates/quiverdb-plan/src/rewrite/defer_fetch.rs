//! Deferred column fetching.
//!
//! An eager fetch materializes columns long before anything reads
//! them; every operator in between then carries dead weight. These
//! rules walk forward through the fetch's pipeline group looking for
//! the first consumer that reads a strict, non-empty subset of the
//! fetched columns. When one is found, the fetch is split: only the
//! columns read so far are materialized up front, and the rest move to
//! a [`FetchNode`] inserted after that consumer — past the filters that
//! shrink the row count. When the walk reaches the group boundary and
//! nothing on the remaining chain reads the columns at all, the fetch
//! is dropped entirely.

use std::collections::BTreeSet;
use std::sync::Arc;

use quiverdb_core::{ColumnDef, EntityHandle};

use crate::error::PlanResult;
use crate::node::{
    EntityScanNode, FetchNode, NodeId, OperatorKind, PartitionTag, PhysicalPlan,
};

use super::RewriteRule;

/// Defers column fetching on an entity scan.
#[must_use]
pub fn defer_fetch_on_scan() -> RewriteRule {
    RewriteRule::new("defer-fetch-on-scan", matches_scan, apply_scan)
}

/// Defers column fetching on an already-deferred fetch, pushing it
/// further along the group.
#[must_use]
pub fn defer_fetch_on_fetch() -> RewriteRule {
    RewriteRule::new("defer-fetch-on-fetch", matches_fetch, apply_fetch)
}

fn matches_scan(plan: &PhysicalPlan, node: NodeId) -> bool {
    matches!(plan.kind(node), OperatorKind::EntityScan(s) if !s.columns.is_empty())
        && plan.output(node).is_some()
}

fn matches_fetch(plan: &PhysicalPlan, node: NodeId) -> bool {
    matches!(plan.kind(node), OperatorKind::Fetch(f) if !f.columns.is_empty())
        && plan.output(node).is_some()
        && plan.inputs(node).len() == 1
}

fn apply_scan(plan: &mut PhysicalPlan, node: NodeId) -> PlanResult<Option<NodeId>> {
    let OperatorKind::EntityScan(scan) = plan.kind(node).clone() else { return Ok(None) };
    defer(
        plan,
        node,
        scan.entity.clone(),
        scan.columns.clone(),
        Shape::Scan { partition: scan.partition },
    )
}

fn apply_fetch(plan: &mut PhysicalPlan, node: NodeId) -> PlanResult<Option<NodeId>> {
    let OperatorKind::Fetch(fetch) = plan.kind(node).clone() else { return Ok(None) };
    defer(plan, node, fetch.entity.clone(), fetch.columns.clone(), Shape::Fetch)
}

/// What kind of node the deferrable fetch lives on.
enum Shape {
    Scan { partition: Option<PartitionTag> },
    Fetch,
}

impl Shape {
    /// Builds the replacement source materializing only `columns`.
    ///
    /// For a fetch shape the upstream of the original node is cloned
    /// underneath; an empty column set drops the fetch from the chain
    /// entirely.
    fn rebuild(
        &self,
        plan: &mut PhysicalPlan,
        node: NodeId,
        entity: &Arc<EntityHandle>,
        columns: Vec<ColumnDef>,
    ) -> PlanResult<NodeId> {
        match self {
            Self::Scan { partition } => {
                let mut scan = EntityScanNode::new(Arc::clone(entity), columns);
                if let Some(p) = partition {
                    scan = scan.with_partition(*p);
                }
                Ok(plan.insert(scan))
            }
            Self::Fetch => {
                let input = plan.primary_input(node).ok_or(
                    crate::error::PlanError::Unsupported("fetch node has no input"),
                )?;
                let upstream = plan.copy_with_inputs(input);
                if columns.is_empty() {
                    return Ok(upstream);
                }
                let fetch = plan.insert(FetchNode::new(Arc::clone(entity), columns));
                plan.attach(upstream, fetch)?;
                Ok(fetch)
            }
        }
    }
}

fn defer(
    plan: &mut PhysicalPlan,
    node: NodeId,
    entity: Arc<EntityHandle>,
    fetched: Vec<ColumnDef>,
    shape: Shape,
) -> PlanResult<Option<NodeId>> {
    let fetched_names: Vec<String> = fetched.iter().map(|c| c.name.clone()).collect();
    let group = plan.group(node);

    // Walk forward through the group, accumulating which of the fetched
    // columns the consumers read.
    let mut path: Vec<NodeId> = Vec::new();
    let mut needed: BTreeSet<String> = BTreeSet::new();
    let mut cursor = plan.output(node);
    let mut split_at: Option<usize> = None;

    while let Some(consumer) = cursor {
        if plan.group(consumer) != group {
            break;
        }
        path.push(consumer);
        for column in plan.kind(consumer).required_columns() {
            if fetched_names.contains(&column) {
                needed.insert(column);
            }
        }
        if needed.len() == fetched.len() {
            // Everything is read immediately; nothing to defer.
            return Ok(None);
        }
        if !needed.is_empty() {
            split_at = Some(path.len() - 1);
            break;
        }
        cursor = plan.output(consumer);
    }

    if let Some(position) = split_at {
        let (now, later): (Vec<ColumnDef>, Vec<ColumnDef>) =
            fetched.into_iter().partition(|c| needed.contains(&c.name));

        let mut prev = shape.rebuild(plan, node, &entity, now)?;
        for &consumer in &path[..=position] {
            let clone = plan.copy(consumer);
            plan.attach(prev, clone)?;
            prev = clone;
        }
        let deferred = plan.insert(FetchNode::new(entity, later));
        plan.attach(prev, deferred)?;
        let root = plan.copy_downstream(path[position], deferred)?;
        return Ok(Some(root));
    }

    // Group boundary (or tree root) reached and nothing in the group
    // read the columns. They can only be dropped when nothing on the
    // remaining chain reads them either, and the result columns of the
    // tree do not include them.
    while let Some(consumer) = cursor {
        for column in plan.kind(consumer).required_columns() {
            if fetched_names.contains(&column) {
                return Ok(None);
            }
        }
        cursor = plan.output(consumer);
    }
    let tree_root = plan.root(node);
    if tree_root != node
        && plan.columns(tree_root).iter().any(|c| fetched_names.contains(&c.name))
    {
        return Ok(None);
    }

    let replacement = shape.rebuild(plan, node, &entity, Vec::new())?;
    let root = plan.copy_downstream(node, replacement)?;
    Ok(Some(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FilterNode, FilterOnSubqueryNode, LimitNode};
    use crate::predicate::Predicate;
    use crate::rewrite::RewriteEngine;
    use quiverdb_core::{EntityStatistics, ValueType};

    fn entity() -> Arc<EntityHandle> {
        Arc::new(EntityHandle::new(
            "docs",
            vec![
                ColumnDef::new("id", ValueType::Int),
                ColumnDef::new("score", ValueType::Float),
                ColumnDef::new("body", ValueType::String),
            ],
            EntityStatistics::new(1_000),
        ))
    }

    fn column_names(columns: &[ColumnDef]) -> Vec<String> {
        columns.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn fetch_is_deferred_past_a_filter() {
        let mut plan = PhysicalPlan::new();
        let scan = plan
            .insert(EntityScanNode::fetch(entity(), &["id", "score", "body"]).expect("columns"));
        let filter = plan.insert(FilterNode::new(Predicate::eq("score", 0.5f64)));
        plan.attach(scan, filter).expect("attach");

        let engine = RewriteEngine::new(vec![defer_fetch_on_scan()]);
        let root = engine.optimize(&mut plan, filter).expect("fixpoint");

        // New chain: scan(score) -> filter -> fetch(id, body)
        assert_eq!(plan.kind(root).name(), "Fetch");
        let OperatorKind::Fetch(deferred) = plan.kind(root) else { panic!("expected fetch") };
        let mut names = column_names(&deferred.columns);
        names.sort();
        assert_eq!(names, vec!["body".to_owned(), "id".to_owned()]);

        let mid = plan.primary_input(root).expect("filter");
        assert_eq!(plan.kind(mid).name(), "Filter");
        let source = plan.primary_input(mid).expect("scan");
        let OperatorKind::EntityScan(s) = plan.kind(source) else { panic!("expected scan") };
        assert_eq!(column_names(&s.columns), vec!["score".to_owned()]);

        // The logical schema at the root is unchanged
        let mut root_columns = column_names(&plan.columns(root));
        root_columns.sort();
        assert_eq!(
            root_columns,
            vec!["body".to_owned(), "id".to_owned(), "score".to_owned()]
        );
    }

    #[test]
    fn fully_read_fetch_is_untouched() {
        let mut plan = PhysicalPlan::new();
        let scan = plan.insert(EntityScanNode::fetch(entity(), &["score"]).expect("columns"));
        let filter = plan.insert(FilterNode::new(Predicate::eq("score", 0.5f64)));
        plan.attach(scan, filter).expect("attach");

        let engine = RewriteEngine::new(vec![defer_fetch_on_scan()]);
        let root = engine.optimize(&mut plan, filter).expect("fixpoint");
        assert_eq!(root, filter);
    }

    #[test]
    fn unread_columns_in_subquery_branch_are_dropped() {
        let mut plan = PhysicalPlan::new();
        // Left side: plain scan of ids
        let left = plan.insert(EntityScanNode::fetch(entity(), &["id"]).expect("columns"));
        // Right side (sub-select): fetches `body` although only `id`
        // flows into the comparison
        let right = plan.insert(EntityScanNode::fetch(entity(), &["body"]).expect("columns"));
        let semi = plan.insert(FilterOnSubqueryNode::new("id"));
        plan.attach(left, semi).expect("left");
        plan.attach(right, semi).expect("right");

        let engine = RewriteEngine::new(vec![defer_fetch_on_scan()]);
        let root = engine.optimize(&mut plan, semi).expect("fixpoint");

        // The right branch's scan no longer fetches anything
        let new_right = plan.inputs(root)[1];
        let OperatorKind::EntityScan(s) = plan.kind(new_right) else { panic!("expected scan") };
        assert!(s.columns.is_empty());
    }

    #[test]
    fn walk_passes_over_non_reading_consumers() {
        let mut plan = PhysicalPlan::new();
        let scan =
            plan.insert(EntityScanNode::fetch(entity(), &["score", "body"]).expect("columns"));
        let limit = plan.insert(LimitNode::new(100));
        plan.attach(scan, limit).expect("attach limit");
        let filter = plan.insert(FilterNode::new(Predicate::eq("score", 0.5f64)));
        plan.attach(limit, filter).expect("attach filter");

        let engine = RewriteEngine::new(vec![defer_fetch_on_scan()]);
        let root = engine.optimize(&mut plan, filter).expect("fixpoint");

        // Split happens after the filter, past the non-reading limit:
        // scan(score) -> limit -> filter -> fetch(body)
        assert_eq!(plan.kind(root).name(), "Fetch");
        let f = plan.primary_input(root).expect("filter");
        assert_eq!(plan.kind(f).name(), "Filter");
        let l = plan.primary_input(f).expect("limit");
        assert_eq!(plan.kind(l).name(), "Limit");
        let OperatorKind::EntityScan(s) = plan.kind(plan.primary_input(l).expect("scan")) else {
            panic!("expected scan")
        };
        assert_eq!(column_names(&s.columns), vec!["score".to_owned()]);
    }
}
