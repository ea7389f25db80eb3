//! The operator kind: a tagged variant over arity shapes.
//!
//! Concrete node kinds are payloads of one enum rather than subclasses
//! of per-arity base classes; the arena owns the tree mechanics, and
//! each kind only answers the questions that genuinely differ per kind.

use std::fmt;

use super::interior::{
    FetchNode, FilterNode, FilterOnSubqueryNode, LimitNode, MergeLimitingSortNode, MergeNode,
    SortNode,
};
use super::source::{
    EntityCountNode, EntityScanNode, EntitySampleNode, IndexIntersectionScanNode, IndexScanNode,
};

/// Declared input arity of a node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// No inputs: a leaf source.
    Nullary,
    /// Exactly one input.
    Unary,
    /// Exactly two inputs; the left (first) input is primary.
    Binary,
    /// Exactly `n` inputs; the first input is primary.
    Nary(usize),
}

impl Arity {
    /// The number of inputs a node of this arity requires.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        match self {
            Self::Nullary => 0,
            Self::Unary => 1,
            Self::Binary => 2,
            Self::Nary(n) => *n,
        }
    }
}

/// One concrete operator kind, tagged by shape.
#[derive(Debug, Clone)]
pub enum OperatorKind {
    /// Full entity scan.
    EntityScan(EntityScanNode),
    /// Entity row count.
    EntityCount(EntityCountNode),
    /// Bernoulli entity sample.
    EntitySample(EntitySampleNode),
    /// Single-index scan.
    IndexScan(IndexScanNode),
    /// Multi-index intersection scan.
    IndexIntersectionScan(IndexIntersectionScanNode),
    /// Predicate filter.
    Filter(FilterNode),
    /// Deferred column fetch.
    Fetch(FetchNode),
    /// Row bound.
    Limit(LimitNode),
    /// Sort.
    Sort(SortNode),
    /// Semi-join-style filter against a sub-select.
    FilterOnSubquery(FilterOnSubqueryNode),
    /// Plain partition merge.
    Merge(MergeNode),
    /// Order-preserving bounded partition merge.
    MergeLimitingSort(MergeLimitingSortNode),
}

impl OperatorKind {
    /// The declared input arity of this kind.
    #[must_use]
    pub const fn arity(&self) -> Arity {
        match self {
            Self::EntityScan(_)
            | Self::EntityCount(_)
            | Self::EntitySample(_)
            | Self::IndexScan(_)
            | Self::IndexIntersectionScan(_) => Arity::Nullary,
            Self::Filter(_) | Self::Fetch(_) | Self::Limit(_) | Self::Sort(_) => Arity::Unary,
            Self::FilterOnSubquery(_) => Arity::Binary,
            Self::Merge(m) => Arity::Nary(m.fan_in),
            Self::MergeLimitingSort(m) => Arity::Nary(m.fan_in),
        }
    }

    /// A short display name for the kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EntityScan(_) => "EntityScan",
            Self::EntityCount(_) => "EntityCount",
            Self::EntitySample(_) => "EntitySample",
            Self::IndexScan(_) => "IndexScan",
            Self::IndexIntersectionScan(_) => "IndexIntersectionScan",
            Self::Filter(_) => "Filter",
            Self::Fetch(_) => "Fetch",
            Self::Limit(_) => "Limit",
            Self::Sort(_) => "Sort",
            Self::FilterOnSubquery(_) => "FilterOnSubquery",
            Self::Merge(_) => "Merge",
            Self::MergeLimitingSort(_) => "MergeLimitingSort",
        }
    }

    /// Returns true for leaf source kinds.
    #[must_use]
    pub const fn is_source(&self) -> bool {
        matches!(self.arity(), Arity::Nullary)
    }

    /// The names of the input columns this kind itself evaluates —
    /// predicate columns, sort keys, comparison columns. Used by the
    /// deferred-fetch rewrite to decide which columns a consumer needs
    /// immediately.
    #[must_use]
    pub fn required_columns(&self) -> Vec<String> {
        match self {
            Self::Filter(f) => f.predicate.columns(),
            Self::Sort(s) => s.order.columns.iter().map(|(c, _)| c.clone()).collect(),
            Self::FilterOnSubquery(f) => vec![f.column.clone()],
            Self::MergeLimitingSort(m) => {
                m.order.columns.iter().map(|(c, _)| c.clone()).collect()
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntityScan(s) => {
                write!(f, "EntityScan: {} [{} cols]", s.entity.name(), s.columns.len())?;
                if let Some(p) = s.partition {
                    write!(f, " (partition {}/{})", p.index, p.count)?;
                }
                Ok(())
            }
            Self::EntityCount(c) => write!(f, "EntityCount: {}", c.entity.name()),
            Self::EntitySample(s) => {
                write!(f, "EntitySample: {} (p={})", s.entity.name(), s.probability)
            }
            Self::IndexScan(s) => write!(f, "IndexScan: {}", s.index().name()),
            Self::IndexIntersectionScan(s) => {
                write!(f, "IndexIntersectionScan: {} indexes", s.members().len())
            }
            Self::Filter(n) => write!(f, "Filter: {}", n.predicate),
            Self::Fetch(n) => write!(f, "Fetch: {} [{} cols]", n.entity.name(), n.columns.len()),
            Self::Limit(n) => write!(f, "Limit: {} (offset {})", n.limit, n.offset),
            Self::Sort(n) => {
                let keys: Vec<String> =
                    n.order.columns.iter().map(|(c, d)| format!("{c} {d}")).collect();
                write!(f, "Sort: {}", keys.join(", "))
            }
            Self::FilterOnSubquery(n) => write!(f, "FilterOnSubquery: {}", n.column),
            Self::Merge(n) => write!(f, "Merge: {} branches", n.fan_in),
            Self::MergeLimitingSort(n) => {
                write!(f, "MergeLimitingSort: {} branches, limit {}", n.fan_in, n.limit)
            }
        }
    }
}

macro_rules! impl_from_kind {
    ($($variant:ident => $payload:ty),* $(,)?) => {
        $(
            impl From<$payload> for OperatorKind {
                fn from(node: $payload) -> Self {
                    Self::$variant(node)
                }
            }
        )*
    };
}

impl_from_kind! {
    EntityScan => EntityScanNode,
    EntityCount => EntityCountNode,
    EntitySample => EntitySampleNode,
    IndexScan => IndexScanNode,
    IndexIntersectionScan => IndexIntersectionScanNode,
    Filter => FilterNode,
    Fetch => FetchNode,
    Limit => LimitNode,
    Sort => SortNode,
    FilterOnSubquery => FilterOnSubqueryNode,
    Merge => MergeNode,
    MergeLimitingSort => MergeLimitingSortNode,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Predicate;
    use crate::traits::OrderTrait;

    #[test]
    fn arities() {
        let filter = OperatorKind::from(FilterNode::new(Predicate::eq("x", 1i64)));
        assert_eq!(filter.arity(), Arity::Unary);
        assert_eq!(filter.arity().capacity(), 1);

        let merge = OperatorKind::from(MergeNode::new(4));
        assert_eq!(merge.arity(), Arity::Nary(4));
        assert_eq!(merge.arity().capacity(), 4);

        let semi = OperatorKind::from(FilterOnSubqueryNode::new("id"));
        assert_eq!(semi.arity(), Arity::Binary);
    }

    #[test]
    fn required_columns() {
        let filter = OperatorKind::from(FilterNode::new(
            Predicate::eq("a", 1i64).and(Predicate::eq("b", 2i64)),
        ));
        assert_eq!(filter.required_columns(), vec!["a".to_owned(), "b".to_owned()]);

        let sort = OperatorKind::from(SortNode::new(OrderTrait::ascending("score")));
        assert_eq!(sort.required_columns(), vec!["score".to_owned()]);

        let limit = OperatorKind::from(LimitNode::new(10));
        assert!(limit.required_columns().is_empty());
    }
}
