//! Predicates evaluated by filters and index scans.
//!
//! Two families exist: boolean [`Predicate`]s over column values, and
//! top-k [`Proximity`] predicates over vector columns. The planner only
//! reasons about their structure (referenced columns, conjunction
//! shape, `k`); the distance numerics behind a proximity predicate are
//! the execution engine's concern.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use quiverdb_core::Value;

/// A comparison operator in a boolean predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// Equal.
    Eq,
    /// Not equal.
    NotEq,
    /// Strictly less than.
    Less,
    /// Less than or equal.
    LessEq,
    /// Strictly greater than.
    Greater,
    /// Greater than or equal.
    GreaterEq,
    /// SQL LIKE pattern match (evaluated by the execution engine).
    Like,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::Like => "LIKE",
        };
        write!(f, "{s}")
    }
}

/// A boolean predicate tree over named columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Compare a column against a constant.
    Compare {
        /// The column name.
        column: String,
        /// The comparison operator.
        op: CompareOp,
        /// The constant operand.
        value: Value,
    },
    /// True when the column is null.
    IsNull {
        /// The column name.
        column: String,
    },
    /// Logical negation.
    Not(Box<Predicate>),
    /// Logical conjunction.
    And(Box<Predicate>, Box<Predicate>),
    /// Logical disjunction.
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    /// Creates a comparison predicate.
    #[must_use]
    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare { column: column.into(), op, value: value.into() }
    }

    /// Creates an equality predicate.
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    /// Creates a null check.
    #[must_use]
    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull { column: column.into() }
    }

    /// Conjoins this predicate with another.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Disjoins this predicate with another.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Returns true if this is a top-level conjunction.
    #[must_use]
    pub const fn is_conjunction(&self) -> bool {
        matches!(self, Self::And(_, _))
    }

    /// Returns the names of all columns this predicate references.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut Vec<String>) {
        match self {
            Self::Compare { column, .. } | Self::IsNull { column } => {
                if !out.contains(column) {
                    out.push(column.clone());
                }
            }
            Self::Not(inner) => inner.collect_columns(out),
            Self::And(a, b) | Self::Or(a, b) => {
                a.collect_columns(out);
                b.collect_columns(out);
            }
        }
    }

    /// Returns the number of atomic comparisons in this predicate.
    #[must_use]
    pub fn atom_count(&self) -> usize {
        match self {
            Self::Compare { .. } | Self::IsNull { .. } => 1,
            Self::Not(inner) => inner.atom_count(),
            Self::And(a, b) | Self::Or(a, b) => a.atom_count() + b.atom_count(),
        }
    }

    /// Evaluates the predicate against a row, given as a column-name →
    /// value map. Missing columns evaluate like nulls.
    ///
    /// The planner itself never evaluates predicates against data; this
    /// exists for the executor contract and for equivalence testing of
    /// rewrites.
    #[must_use]
    pub fn evaluate(&self, row: &BTreeMap<String, Value>) -> bool {
        match self {
            Self::Compare { column, op, value } => {
                let Some(actual) = row.get(column) else { return false };
                match op {
                    CompareOp::Eq => actual == value,
                    CompareOp::NotEq => !actual.is_null() && actual != value,
                    CompareOp::Less => {
                        matches!(actual.compare(value), Some(Ordering::Less))
                    }
                    CompareOp::LessEq => {
                        matches!(actual.compare(value), Some(Ordering::Less | Ordering::Equal))
                    }
                    CompareOp::Greater => {
                        matches!(actual.compare(value), Some(Ordering::Greater))
                    }
                    CompareOp::GreaterEq => {
                        matches!(actual.compare(value), Some(Ordering::Greater | Ordering::Equal))
                    }
                    // Pattern matching is the executor's job; approximate
                    // with equality for planning-time evaluation.
                    CompareOp::Like => actual == value,
                }
            }
            Self::IsNull { column } => row.get(column).map_or(true, Value::is_null),
            Self::Not(inner) => !inner.evaluate(row),
            Self::And(a, b) => a.evaluate(row) && b.evaluate(row),
            Self::Or(a, b) => a.evaluate(row) || b.evaluate(row),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { column, op, value } => write!(f, "{column} {op} {value}"),
            Self::IsNull { column } => write!(f, "{column} IS NULL"),
            Self::Not(inner) => write!(f, "NOT ({inner})"),
            Self::And(a, b) => write!(f, "({a}) AND ({b})"),
            Self::Or(a, b) => write!(f, "({a}) OR ({b})"),
        }
    }
}

/// The distance metric of a proximity predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistanceMetric {
    /// Euclidean (L2) distance.
    Euclidean,
    /// Cosine distance.
    Cosine,
    /// Negative inner product.
    InnerProduct,
    /// Manhattan (L1) distance.
    Manhattan,
}

/// A top-k proximity predicate over a vector column.
#[derive(Debug, Clone, PartialEq)]
pub struct Proximity {
    /// The vector column searched.
    pub column: String,
    /// The query vector.
    pub query: Vec<f32>,
    /// The distance metric.
    pub metric: DistanceMetric,
    /// Number of nearest neighbours to produce.
    pub k: u64,
}

impl Proximity {
    /// Creates a top-k proximity predicate.
    #[must_use]
    pub fn new(column: impl Into<String>, query: Vec<f32>, metric: DistanceMetric, k: u64) -> Self {
        Self { column: column.into(), query, metric, k }
    }
}

/// What an index scan evaluates.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexQuery {
    /// A boolean predicate.
    Boolean(Predicate),
    /// A top-k proximity predicate.
    Proximity(Proximity),
    /// Unconstrained: every indexed row.
    Full,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
    }

    #[test]
    fn compare_evaluation() {
        let p = Predicate::compare("age", CompareOp::Greater, 21i64);
        assert!(p.evaluate(&row(&[("age", Value::Int(30))])));
        assert!(!p.evaluate(&row(&[("age", Value::Int(18))])));
        // Missing column behaves like null: comparison fails
        assert!(!p.evaluate(&row(&[])));
    }

    #[test]
    fn null_checks() {
        let p = Predicate::is_null("bio");
        assert!(p.evaluate(&row(&[("bio", Value::Null)])));
        assert!(p.evaluate(&row(&[])));
        assert!(!p.evaluate(&row(&[("bio", Value::from("hi"))])));
    }

    #[test]
    fn conjunction_shape() {
        let p = Predicate::eq("a", 1i64).and(Predicate::eq("b", 2i64));
        assert!(p.is_conjunction());
        assert_eq!(p.atom_count(), 2);
        assert_eq!(p.columns(), vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn boolean_connectives() {
        let p = Predicate::eq("x", 1i64).or(Predicate::eq("x", 2i64));
        assert!(p.evaluate(&row(&[("x", Value::Int(2))])));
        assert!(!p.evaluate(&row(&[("x", Value::Int(3))])));

        let n = Predicate::Not(Box::new(Predicate::eq("x", 1i64)));
        assert!(n.evaluate(&row(&[("x", Value::Int(3))])));
    }

    #[test]
    fn duplicate_columns_deduplicated() {
        let p = Predicate::eq("x", 1i64).and(Predicate::compare("x", CompareOp::Less, 10i64));
        assert_eq!(p.columns(), vec!["x".to_owned()]);
    }
}
