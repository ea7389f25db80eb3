//! Physical properties of a node's output.
//!
//! A trait is a tagged fact about the rows a node produces: how they
//! are ordered, whether their number is bounded, whether the node's
//! work can be split across partitions. The set is closed — exactly
//! the kinds in [`TraitKind`] exist. By default every node inherits its
//! primary input's traits unchanged; kinds that change row identity,
//! order, or cardinality override or clear the relevant entries.

use std::collections::BTreeMap;
use std::fmt;

/// Direction of a sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// Ascending order.
    Ascending,
    /// Descending order.
    Descending,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "ASC"),
            Self::Descending => write!(f, "DESC"),
        }
    }
}

/// An ordering guarantee: the output is sorted by these columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderTrait {
    /// Sort keys, most significant first.
    pub columns: Vec<(String, SortDirection)>,
}

impl OrderTrait {
    /// Creates an ordering over the given keys.
    #[must_use]
    pub fn new(columns: Vec<(String, SortDirection)>) -> Self {
        Self { columns }
    }

    /// Creates an ascending ordering over a single column.
    #[must_use]
    pub fn ascending(column: impl Into<String>) -> Self {
        Self { columns: vec![(column.into(), SortDirection::Ascending)] }
    }

    /// Renames order columns according to a (from, to) binding list.
    ///
    /// Used when index-native columns are bound to a scan's output.
    #[must_use]
    pub fn remapped(&self, bindings: &[(String, String)]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|(name, dir)| {
                let bound = bindings
                    .iter()
                    .find(|(from, _)| from == name)
                    .map_or_else(|| name.clone(), |(_, to)| to.clone());
                (bound, *dir)
            })
            .collect();
        Self { columns }
    }
}

/// A bound on the number of output rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitTrait {
    /// Maximum number of rows produced.
    pub limit: u64,
    /// Number of leading rows skipped.
    pub offset: u64,
}

impl LimitTrait {
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

/// The kind tag of a trait; at most one trait of each kind is attached
/// to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TraitKind {
    /// Output ordering.
    Order,
    /// Output row bound.
    Limit,
    /// The node's work cannot be split across partitions.
    NotPartitionable,
}

/// One attached trait instance.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanTrait {
    /// Output ordering.
    Order(OrderTrait),
    /// Output row bound.
    Limit(LimitTrait),
    /// Marker: the node's work cannot be split across partitions.
    NotPartitionable,
}

impl PlanTrait {
    /// Returns the kind tag of this trait.
    #[must_use]
    pub const fn kind(&self) -> TraitKind {
        match self {
            Self::Order(_) => TraitKind::Order,
            Self::Limit(_) => TraitKind::Limit,
            Self::NotPartitionable => TraitKind::NotPartitionable,
        }
    }
}

/// The trait set attached to a node, keyed by kind.
///
/// Backed by a `BTreeMap` so iteration order is deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Traits {
    entries: BTreeMap<TraitKind, PlanTrait>,
}

impl Traits {
    /// Creates an empty trait set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no traits are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts a trait, replacing any existing trait of the same kind.
    pub fn insert(&mut self, t: PlanTrait) {
        self.entries.insert(t.kind(), t);
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, t: PlanTrait) -> Self {
        self.insert(t);
        self
    }

    /// Returns the trait of the given kind, if attached.
    #[must_use]
    pub fn get(&self, kind: TraitKind) -> Option<&PlanTrait> {
        self.entries.get(&kind)
    }

    /// Returns true if a trait of the given kind is attached.
    #[must_use]
    pub fn contains(&self, kind: TraitKind) -> bool {
        self.entries.contains_key(&kind)
    }

    /// Returns a copy without the trait of the given kind.
    #[must_use]
    pub fn without(mut self, kind: TraitKind) -> Self {
        self.entries.remove(&kind);
        self
    }

    /// Returns the attached ordering, if any.
    #[must_use]
    pub fn order(&self) -> Option<&OrderTrait> {
        match self.get(TraitKind::Order) {
            Some(PlanTrait::Order(o)) => Some(o),
            _ => None,
        }
    }

    /// Returns the attached row bound, if any.
    #[must_use]
    pub fn limit(&self) -> Option<LimitTrait> {
        match self.get(TraitKind::Limit) {
            Some(PlanTrait::Limit(l)) => Some(*l),
            _ => None,
        }
    }

    /// Iterates the attached traits in deterministic kind order.
    pub fn iter(&self) -> impl Iterator<Item = &PlanTrait> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let traits = Traits::new()
            .with(PlanTrait::Limit(LimitTrait::new(10)))
            .with(PlanTrait::Order(OrderTrait::ascending("score")));

        assert!(traits.contains(TraitKind::Limit));
        assert_eq!(traits.limit().map(|l| l.limit), Some(10));
        assert_eq!(traits.order().map(|o| o.columns.len()), Some(1));
        assert!(!traits.contains(TraitKind::NotPartitionable));
    }

    #[test]
    fn replace_same_kind() {
        let traits = Traits::new()
            .with(PlanTrait::Limit(LimitTrait::new(10)))
            .with(PlanTrait::Limit(LimitTrait::new(5)));
        assert_eq!(traits.limit().map(|l| l.limit), Some(5));
    }

    #[test]
    fn without_removes() {
        let traits = Traits::new().with(PlanTrait::NotPartitionable);
        let cleared = traits.without(TraitKind::NotPartitionable);
        assert!(cleared.is_empty());
    }

    #[test]
    fn order_remapping() {
        let order = OrderTrait::ascending("distance");
        let remapped = order.remapped(&[("distance".into(), "similarity".into())]);
        assert_eq!(remapped.columns[0].0, "similarity");
        // Unmapped columns pass through unchanged
        let untouched = order.remapped(&[("other".into(), "x".into())]);
        assert_eq!(untouched.columns[0].0, "distance");
    }
}
