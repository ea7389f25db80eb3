//! Entity and column statistics.
//!
//! The storage engine is responsible for maintaining statistics about
//! stored data; the planner only consumes them. [`EntityHandle`] is the
//! snapshot a storage engine issues for one stored entity: its schema,
//! its current row count, and per-column value statistics. Source nodes
//! capture a handle at construction time, so a plan is costed against a
//! consistent snapshot even if the store changes underneath it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{ColumnDef, Value};

/// Fallback width in bytes for variable-length columns without statistics.
const DEFAULT_VAR_WIDTH: f64 = 16.0;

/// Value statistics for a single column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    /// Number of distinct values, if known.
    pub distinct_count: Option<u64>,
    /// Number of null entries.
    pub null_count: u64,
    /// Average physical width of one value in bytes, if sampled.
    ///
    /// Only meaningful for variable-length columns; fixed-width columns
    /// derive their width from the type.
    pub avg_width: Option<f64>,
    /// Smallest value, if known.
    pub min: Option<Value>,
    /// Largest value, if known.
    pub max: Option<Value>,
}

impl ColumnStatistics {
    /// Creates empty (unknown) statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the distinct value count.
    #[must_use]
    pub const fn with_distinct_count(mut self, count: u64) -> Self {
        self.distinct_count = Some(count);
        self
    }

    /// Sets the null count.
    #[must_use]
    pub const fn with_null_count(mut self, count: u64) -> Self {
        self.null_count = count;
        self
    }

    /// Sets the average value width in bytes.
    #[must_use]
    pub const fn with_avg_width(mut self, width: f64) -> Self {
        self.avg_width = Some(width);
        self
    }

    /// Sets the value bounds.
    #[must_use]
    pub fn with_bounds(mut self, min: Value, max: Value) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

/// Statistics for a whole entity: row count plus per-column statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityStatistics {
    /// Current number of stored rows.
    pub row_count: u64,
    /// Per-column statistics, keyed by column name.
    pub columns: BTreeMap<String, ColumnStatistics>,
}

impl EntityStatistics {
    /// Creates statistics with the given row count and no column details.
    #[must_use]
    pub fn new(row_count: u64) -> Self {
        Self { row_count, columns: BTreeMap::new() }
    }

    /// Adds statistics for one column.
    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, stats: ColumnStatistics) -> Self {
        self.columns.insert(name.into(), stats);
        self
    }

    /// Returns the statistics for a column, if present.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnStatistics> {
        self.columns.get(name)
    }

    /// Returns the fraction of null entries in a column, in [0, 1].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn null_fraction(&self, name: &str) -> f64 {
        if self.row_count == 0 {
            return 0.0;
        }
        self.column(name)
            .map_or(0.0, |c| c.null_count as f64 / self.row_count as f64)
    }
}

/// Snapshot of a stored entity, issued by the storage engine.
///
/// This is the contract between the planner and the storage
/// collaborator: everything the cost model needs to know about stored
/// data — schema, row count, and physical column widths — is captured
/// here at planning time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityHandle {
    name: String,
    columns: Vec<ColumnDef>,
    statistics: EntityStatistics,
}

impl EntityHandle {
    /// Creates a handle from schema and statistics.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        columns: Vec<ColumnDef>,
        statistics: EntityStatistics,
    ) -> Self {
        Self { name: name.into(), columns, statistics }
    }

    /// Returns the entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current row count.
    #[must_use]
    pub const fn row_count(&self) -> u64 {
        self.statistics.row_count
    }

    /// Returns the entity's columns.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Returns the entity's statistics.
    #[must_use]
    pub const fn statistics(&self) -> &EntityStatistics {
        &self.statistics
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up a column by name, failing if the entity does not carry it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownColumn`] for a name not in the schema.
    pub fn require_column(&self, name: &str) -> Result<&ColumnDef, CoreError> {
        self.column(name).ok_or_else(|| CoreError::UnknownColumn(name.to_owned()))
    }

    /// Returns the estimated physical width of one value of a column,
    /// in bytes.
    ///
    /// Fixed-width types answer from the type; variable-width columns
    /// fall back to average-width statistics, then to a default.
    #[must_use]
    pub fn column_width(&self, column: &ColumnDef) -> f64 {
        match column.value_type.physical_width() {
            Some(w) => f64::from(w),
            None => self
                .statistics
                .column(&column.name)
                .and_then(|c| c.avg_width)
                .unwrap_or(DEFAULT_VAR_WIDTH),
        }
    }

    /// Returns the estimated width of one full row, in bytes.
    #[must_use]
    pub fn avg_row_width(&self) -> f64 {
        self.columns.iter().map(|c| self.column_width(c)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueType;

    fn sample_entity() -> EntityHandle {
        let stats = EntityStatistics::new(500)
            .with_column(
                "name",
                ColumnStatistics::new().with_avg_width(24.0).with_distinct_count(480),
            )
            .with_column("age", ColumnStatistics::new().with_null_count(50));
        EntityHandle::new(
            "people",
            vec![
                ColumnDef::new("name", ValueType::String),
                ColumnDef::new("age", ValueType::Int).nullable(),
            ],
            stats,
        )
    }

    #[test]
    fn handle_lookup() {
        let entity = sample_entity();
        assert_eq!(entity.row_count(), 500);
        assert!(entity.column("name").is_some());
        assert!(entity.column("missing").is_none());
        assert!(entity.require_column("missing").is_err());
    }

    #[test]
    fn column_widths() {
        let entity = sample_entity();
        let name = entity.column("name").cloned().expect("column");
        let age = entity.column("age").cloned().expect("column");

        // Variable-width column uses the sampled average
        assert!((entity.column_width(&name) - 24.0).abs() < f64::EPSILON);
        // Fixed-width column uses the type width
        assert!((entity.column_width(&age) - 8.0).abs() < f64::EPSILON);
        assert!((entity.avg_row_width() - 32.0).abs() < f64::EPSILON);
    }

    #[test]
    fn var_width_fallback() {
        let entity = EntityHandle::new(
            "bare",
            vec![ColumnDef::new("s", ValueType::String)],
            EntityStatistics::new(10),
        );
        let col = entity.column("s").cloned().expect("column");
        assert!((entity.column_width(&col) - DEFAULT_VAR_WIDTH).abs() < f64::EPSILON);
    }

    #[test]
    fn null_fraction() {
        let entity = sample_entity();
        assert!((entity.statistics().null_fraction("age") - 0.1).abs() < f64::EPSILON);
        assert!((entity.statistics().null_fraction("name")).abs() < f64::EPSILON);
        assert!((EntityStatistics::new(0).null_fraction("x")).abs() < f64::EPSILON);
    }
}
