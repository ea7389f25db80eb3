//! Property tests for partition shares, cost arithmetic, and digest
//! stability.

use std::sync::Arc;

use proptest::prelude::*;

use quiverdb_core::{ColumnDef, EntityHandle, EntityStatistics, ValueType};
use quiverdb_plan::node::{EntityScanNode, FilterNode, LimitNode, PartitionTag, PhysicalPlan};
use quiverdb_plan::predicate::Predicate;
use quiverdb_plan::Cost;

fn entity(rows: u64) -> Arc<EntityHandle> {
    Arc::new(EntityHandle::new(
        "items",
        vec![
            ColumnDef::new("id", ValueType::Int),
            ColumnDef::new("tag", ValueType::String),
        ],
        EntityStatistics::new(rows),
    ))
}

proptest! {
    /// Partition shares are disjoint and exhaustive: they always sum
    /// back to the total, whatever the split.
    #[test]
    fn partition_shares_sum_to_total(total in 0u64..1_000_000, count in 1usize..64) {
        let summed: u64 = (0..count)
            .map(|p| PartitionTag::new(p, count).share(total))
            .sum();
        prop_assert_eq!(summed, total);
    }

    /// Shares differ by at most one row.
    #[test]
    fn partition_shares_are_balanced(total in 0u64..1_000_000, count in 1usize..64) {
        let shares: Vec<u64> =
            (0..count).map(|p| PartitionTag::new(p, count).share(total)).collect();
        let min = shares.iter().copied().min().unwrap();
        let max = shares.iter().copied().max().unwrap();
        prop_assert!(max - min <= 1);
    }

    /// Componentwise cost addition commutes.
    #[test]
    fn cost_addition_commutes(
        a in (0.0f64..1e6, 0.0f64..1e6, 0.0f64..1e6),
        b in (0.0f64..1e6, 0.0f64..1e6, 0.0f64..1e6),
    ) {
        let x = Cost::new(a.0, a.1, a.2);
        let y = Cost::new(b.0, b.1, b.2);
        prop_assert_eq!(x + y, y + x);
    }

    /// A deep structural copy always digests identically to the
    /// original, whatever the chain looks like.
    #[test]
    fn copy_digests_like_the_original(
        rows in 1u64..100_000,
        limit in 1u64..1_000,
        pivot in -1_000i64..1_000,
    ) {
        let mut plan = PhysicalPlan::new();
        let scan = plan
            .insert(EntityScanNode::fetch(entity(rows), &["id", "tag"]).unwrap());
        let filter = plan.insert(FilterNode::new(Predicate::eq("id", pivot)));
        plan.attach(scan, filter).unwrap();
        let bound = plan.insert(LimitNode::new(limit));
        plan.attach(filter, bound).unwrap();

        let copy = plan.copy_with_inputs(bound);
        prop_assert_eq!(plan.digest(copy), plan.digest(bound));
        prop_assert_ne!(copy, bound);
    }

    /// Different predicate constants never collide in these small
    /// digest domains.
    #[test]
    fn digest_tracks_predicate_constants(a in 0i64..10_000, b in 0i64..10_000) {
        prop_assume!(a != b);
        let mut plan = PhysicalPlan::new();
        let fa = plan.insert(FilterNode::new(Predicate::eq("id", a)));
        let fb = plan.insert(FilterNode::new(Predicate::eq("id", b)));
        prop_assert_ne!(plan.digest(fa), plan.digest(fb));
    }
}
