//! Selectivity estimation for boolean predicates.
//!
//! A [`SelectivityEstimator`] turns a predicate plus entity statistics
//! into the expected fraction of rows that satisfy it. The estimator is
//! pluggable: index scans and filters consume it through the trait so a
//! deployment can substitute a smarter (e.g. histogram-based) model.

use quiverdb_core::EntityStatistics;

use crate::predicate::{CompareOp, Predicate};

/// Estimates the fraction of rows a predicate accepts, in `[0, 1]`.
///
/// Implementations must be pure functions of their inputs; estimators
/// are shared across concurrently planned queries.
pub trait SelectivityEstimator: Send + Sync {
    /// Returns the expected selectivity of `predicate` over data
    /// described by `statistics`.
    fn estimate(&self, predicate: &Predicate, statistics: &EntityStatistics) -> f64;
}

/// Default heuristic estimator.
///
/// Uses distinct counts for equality when available and falls back to
/// fixed heuristics otherwise. Connectives combine assuming
/// independence.
#[derive(Debug, Clone, Default)]
pub struct DefaultSelectivityEstimator {}

/// Fallback selectivity of an equality comparison.
const EQUALITY_SELECTIVITY: f64 = 0.1;
/// Fallback selectivity of a range comparison.
const RANGE_SELECTIVITY: f64 = 1.0 / 3.0;
/// Fallback selectivity of a LIKE pattern.
const LIKE_SELECTIVITY: f64 = 0.25;
/// Fallback selectivity of a null check.
const NULL_SELECTIVITY: f64 = 0.05;

impl DefaultSelectivityEstimator {
    /// Creates the default estimator.
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    #[allow(clippy::cast_precision_loss)]
    fn estimate_compare(
        &self,
        column: &str,
        op: CompareOp,
        statistics: &EntityStatistics,
    ) -> f64 {
        match op {
            CompareOp::Eq => statistics
                .column(column)
                .and_then(|c| c.distinct_count)
                .filter(|&d| d > 0)
                .map_or(EQUALITY_SELECTIVITY, |d| 1.0 / d as f64),
            CompareOp::NotEq => 1.0 - self.estimate_compare(column, CompareOp::Eq, statistics),
            CompareOp::Less | CompareOp::LessEq | CompareOp::Greater | CompareOp::GreaterEq => {
                RANGE_SELECTIVITY
            }
            CompareOp::Like => LIKE_SELECTIVITY,
        }
    }
}

impl SelectivityEstimator for DefaultSelectivityEstimator {
    fn estimate(&self, predicate: &Predicate, statistics: &EntityStatistics) -> f64 {
        let estimate = match predicate {
            Predicate::Compare { column, op, .. } => {
                self.estimate_compare(column, *op, statistics)
            }
            Predicate::IsNull { column } => {
                if statistics.column(column).is_some() {
                    statistics.null_fraction(column)
                } else {
                    NULL_SELECTIVITY
                }
            }
            Predicate::Not(inner) => 1.0 - self.estimate(inner, statistics),
            Predicate::And(a, b) => {
                self.estimate(a, statistics) * self.estimate(b, statistics)
            }
            Predicate::Or(a, b) => {
                let sa = self.estimate(a, statistics);
                let sb = self.estimate(b, statistics);
                sa + sb - sa * sb
            }
        };
        estimate.clamp(0.0, 1.0)
    }
}
