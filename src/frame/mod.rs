//! Lazy, schema-bearing row streams (spec.md §3 "DataFrame", §4.3).
//!
//! A [`DataFrame`] pairs a schema, computable without consuming records,
//! with a producer closure that yields a fresh single-pass iterator on
//! each call to [`DataFrame::records`]. Operators compose by wrapping
//! producers, never by materializing (spec.md Design Note 9) — the
//! exceptions are `distinct`, `orderBy`, `join`'s small side, and
//! `cache()`, which buffer by construction.

pub mod errors;
pub mod operators;

use std::sync::Arc;

use crate::value::{CypherType, Value};
pub use errors::SchemaError;

pub type Row = Vec<Value>;

/// Ordered `(name, type)` pairs; names are unique within a frame
/// (spec.md §3 invariant).
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<(String, CypherType)>,
}

impl Schema {
    pub fn new(columns: Vec<(String, CypherType)>) -> Result<Self, SchemaError> {
        let mut seen = std::collections::HashSet::new();
        for (name, _) in &columns {
            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Schema { columns })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn columns(&self) -> &[(String, CypherType)] {
        &self.columns
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == name)
    }

    pub fn type_of(&self, name: &str) -> Option<&CypherType> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

type Producer = Arc<dyn Fn() -> Box<dyn Iterator<Item = Row>> + Send + Sync>;

/// A lazy row stream with a declared schema (spec.md §3).
#[derive(Clone)]
pub struct DataFrame {
    schema: Schema,
    producer: Producer,
}

impl DataFrame {
    pub fn new(
        schema: Schema,
        producer: impl Fn() -> Box<dyn Iterator<Item = Row>> + Send + Sync + 'static,
    ) -> Self {
        DataFrame {
            schema,
            producer: Arc::new(producer),
        }
    }

    pub fn empty(schema: Schema) -> Self {
        DataFrame::new(schema, || Box::new(std::iter::empty()))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// A fresh, single-pass iterator. Calling this twice is permitted and
    /// yields equivalent sequences; consuming one does not affect the
    /// other (spec.md §3 invariant 2).
    pub fn records(&self) -> Box<dyn Iterator<Item = Row>> {
        (self.producer)()
    }

    /// Materialize once into a buffered frame whose `records()` replays the
    /// same buffer on every call without re-invoking the original producer
    /// (spec.md §4.8 `Result.cache()`, §5 "materialization limits").
    pub fn cache(&self) -> DataFrame {
        let rows: Vec<Row> = self.records().collect();
        let buffered: Arc<Vec<Row>> = Arc::new(rows);
        let schema = self.schema.clone();
        DataFrame::new(schema, move || {
            let buffered = Arc::clone(&buffered);
            Box::new((0..buffered.len()).map(move |i| buffered[i].clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_frame(values: Vec<i64>) -> DataFrame {
        let schema = Schema::new(vec![("n".to_string(), CypherType::Integer)]).unwrap();
        DataFrame::new(schema, move || {
            Box::new(values.clone().into_iter().map(|v| vec![Value::Integer(v)]))
        })
    }

    #[test]
    fn schema_is_computable_without_consuming_records() {
        let df = int_frame(vec![1, 2, 3]);
        assert_eq!(df.schema().len(), 1);
        assert_eq!(df.records().count(), 3);
    }

    #[test]
    fn records_can_be_called_twice_independently() {
        let df = int_frame(vec![1, 2, 3]);
        let mut a = df.records();
        let b = df.records();
        assert_eq!(a.next(), Some(vec![Value::Integer(1)]));
        assert_eq!(b.count(), 3);
    }

    #[test]
    fn row_length_matches_schema_arity() {
        let df = int_frame(vec![1]);
        for row in df.records() {
            assert_eq!(row.len(), df.schema().len());
        }
    }

    #[test]
    fn cache_replays_without_recomputing_producer() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = std::sync::Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let schema = Schema::new(vec![("n".to_string(), CypherType::Integer)]).unwrap();
        let df = DataFrame::new(schema, move || {
            calls2.fetch_add(1, Ordering::SeqCst);
            Box::new(vec![vec![Value::Integer(1)]].into_iter())
        });
        let cached = df.cache();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let _: Vec<_> = cached.records().collect();
        let _: Vec<_> = cached.records().collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
