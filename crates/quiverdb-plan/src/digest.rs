//! Structural plan fingerprints.
//!
//! A digest is a deterministic integer fingerprint of a (sub-)tree,
//! computed bottom-up: a node's digest hashes its own structural
//! content — kind, entity and index names, predicate structure,
//! constants, partition tags — followed by its input digests in input
//! order. Swapping two inputs of a non-symmetric operator changes the
//! digest. Object identity never participates, so structurally equal
//! trees built independently collide on purpose.
//!
//! Digest equality is a *necessary* condition for plan equivalence,
//! never a sufficient one: callers deduplicating plans by digest must
//! verify candidates structurally and tolerate hash collisions.
//!
//! The hash is blake3 over a canonical byte encoding, truncated to 64
//! bits. The exact mixing is an implementation detail, not a
//! compatibility contract; digests must not be persisted across
//! versions.

use std::fmt;

use quiverdb_core::{ColumnDef, Value, ValueType};

use crate::node::{NodeId, OperatorKind, PhysicalPlan};
use crate::predicate::{CompareOp, DistanceMetric, IndexQuery, Predicate, Proximity};
use crate::traits::{OrderTrait, SortDirection};

/// A 64-bit structural fingerprint of a plan sub-tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(u64);

impl Digest {
    /// The raw fingerprint value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Canonical byte encoder feeding the digest hash.
struct DigestWriter {
    hasher: blake3::Hasher,
}

impl DigestWriter {
    fn new() -> Self {
        Self { hasher: blake3::Hasher::new() }
    }

    fn write_u8(&mut self, v: u8) {
        self.hasher.update(&[v]);
    }

    fn write_u64(&mut self, v: u64) {
        self.hasher.update(&v.to_le_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.hasher.update(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.hasher.update(&v.to_bits().to_le_bytes());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.hasher.update(s.as_bytes());
    }

    fn finish(&self) -> u64 {
        let bytes = self.hasher.finalize();
        let mut out = [0u8; 8];
        out.copy_from_slice(&bytes.as_bytes()[..8]);
        u64::from_le_bytes(out)
    }
}

fn write_value_type(w: &mut DigestWriter, ty: ValueType) {
    match ty {
        ValueType::Bool => w.write_u8(0),
        ValueType::Int => w.write_u8(1),
        ValueType::Float => w.write_u8(2),
        ValueType::String => w.write_u8(3),
        ValueType::Vector(dim) => {
            w.write_u8(4);
            w.write_u64(u64::from(dim));
        }
    }
}

fn write_value(w: &mut DigestWriter, value: &Value) {
    match value {
        Value::Null => w.write_u8(0),
        Value::Bool(b) => {
            w.write_u8(1);
            w.write_bool(*b);
        }
        Value::Int(i) => {
            w.write_u8(2);
            w.write_i64(*i);
        }
        Value::Float(f) => {
            w.write_u8(3);
            w.write_f64(*f);
        }
        Value::String(s) => {
            w.write_u8(4);
            w.write_str(s);
        }
        Value::Vector(v) => {
            w.write_u8(5);
            w.write_u64(v.len() as u64);
            for component in v {
                w.write_f64(f64::from(*component));
            }
        }
    }
}

fn write_columns(w: &mut DigestWriter, columns: &[ColumnDef]) {
    w.write_u64(columns.len() as u64);
    for column in columns {
        w.write_str(&column.name);
        write_value_type(w, column.value_type);
        w.write_bool(column.nullable);
    }
}

const fn compare_op_tag(op: CompareOp) -> u8 {
    match op {
        CompareOp::Eq => 0,
        CompareOp::NotEq => 1,
        CompareOp::Less => 2,
        CompareOp::LessEq => 3,
        CompareOp::Greater => 4,
        CompareOp::GreaterEq => 5,
        CompareOp::Like => 6,
    }
}

fn write_predicate(w: &mut DigestWriter, predicate: &Predicate) {
    match predicate {
        Predicate::Compare { column, op, value } => {
            w.write_u8(0);
            w.write_str(column);
            w.write_u8(compare_op_tag(*op));
            write_value(w, value);
        }
        Predicate::IsNull { column } => {
            w.write_u8(1);
            w.write_str(column);
        }
        Predicate::Not(inner) => {
            w.write_u8(2);
            write_predicate(w, inner);
        }
        Predicate::And(a, b) => {
            w.write_u8(3);
            write_predicate(w, a);
            write_predicate(w, b);
        }
        Predicate::Or(a, b) => {
            w.write_u8(4);
            write_predicate(w, a);
            write_predicate(w, b);
        }
    }
}

fn write_proximity(w: &mut DigestWriter, proximity: &Proximity) {
    w.write_str(&proximity.column);
    w.write_u8(match proximity.metric {
        DistanceMetric::Euclidean => 0,
        DistanceMetric::Cosine => 1,
        DistanceMetric::InnerProduct => 2,
        DistanceMetric::Manhattan => 3,
    });
    w.write_u64(proximity.k);
    w.write_u64(proximity.query.len() as u64);
    for component in &proximity.query {
        w.write_f64(f64::from(*component));
    }
}

fn write_query(w: &mut DigestWriter, query: &IndexQuery) {
    match query {
        IndexQuery::Boolean(p) => {
            w.write_u8(0);
            write_predicate(w, p);
        }
        IndexQuery::Proximity(p) => {
            w.write_u8(1);
            write_proximity(w, p);
        }
        IndexQuery::Full => w.write_u8(2),
    }
}

fn write_order(w: &mut DigestWriter, order: &OrderTrait) {
    w.write_u64(order.columns.len() as u64);
    for (column, direction) in &order.columns {
        w.write_str(column);
        w.write_bool(matches!(direction, SortDirection::Descending));
    }
}

fn write_structure(w: &mut DigestWriter, kind: &OperatorKind) {
    match kind {
        OperatorKind::EntityScan(s) => {
            w.write_u8(0);
            w.write_str(s.entity.name());
            write_columns(w, &s.columns);
            match s.partition {
                None => w.write_u8(0),
                Some(p) => {
                    w.write_u8(1);
                    w.write_u64(p.index as u64);
                    w.write_u64(p.count as u64);
                }
            }
        }
        OperatorKind::EntityCount(c) => {
            w.write_u8(1);
            w.write_str(c.entity.name());
        }
        OperatorKind::EntitySample(s) => {
            w.write_u8(2);
            w.write_str(s.entity.name());
            write_columns(w, &s.columns);
            w.write_f64(s.probability);
            w.write_u64(s.seed);
        }
        OperatorKind::IndexScan(s) => {
            w.write_u8(3);
            w.write_str(s.index().name());
            w.write_str(s.index().entity());
            write_query(w, s.query());
            w.write_u64(s.bindings().len() as u64);
            for (from, to) in s.bindings() {
                w.write_str(from);
                w.write_str(to);
            }
            match s.partition() {
                None => w.write_u8(0),
                Some(p) => {
                    w.write_u8(1);
                    w.write_u64(p.index as u64);
                    w.write_u64(p.count as u64);
                }
            }
        }
        OperatorKind::IndexIntersectionScan(s) => {
            w.write_u8(4);
            w.write_u64(s.members().len() as u64);
            for (index, query) in s.members() {
                w.write_str(index.name());
                write_query(w, query);
            }
        }
        OperatorKind::Filter(f) => {
            w.write_u8(5);
            write_predicate(w, &f.predicate);
        }
        OperatorKind::Fetch(f) => {
            w.write_u8(6);
            w.write_str(f.entity.name());
            write_columns(w, &f.columns);
        }
        OperatorKind::Limit(l) => {
            w.write_u8(7);
            w.write_u64(l.limit);
            w.write_u64(l.offset);
        }
        OperatorKind::Sort(s) => {
            w.write_u8(8);
            write_order(w, &s.order);
        }
        OperatorKind::FilterOnSubquery(f) => {
            w.write_u8(9);
            w.write_str(&f.column);
        }
        OperatorKind::Merge(m) => {
            w.write_u8(10);
            w.write_u64(m.fan_in as u64);
        }
        OperatorKind::MergeLimitingSort(m) => {
            w.write_u8(11);
            write_order(w, &m.order);
            w.write_u64(m.limit);
            w.write_u64(m.fan_in as u64);
        }
    }
}

impl PhysicalPlan {
    /// The structural fingerprint of the sub-tree rooted at `id`.
    #[must_use]
    pub fn digest(&self, id: NodeId) -> Digest {
        let mut writer = DigestWriter::new();
        write_structure(&mut writer, self.kind(id));
        for &input in self.inputs(id) {
            writer.write_u64(self.digest(input).0);
        }
        Digest(writer.finish())
    }
}
