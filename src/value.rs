//! Typed value model shared by the evaluator, data frames, and the graph model.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::graph::{Node, PathTriple, RelId, Relationship};

/// Closed set of type tags a [`Value`] can carry.
///
/// `List<T>` and `Map` intentionally erase their element type in this tag
/// (spec.md §3 only requires the tag to distinguish a list/map from other
/// shapes; element-level typing is carried by `DataFrame` schemas instead).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CypherType {
    Any,
    Null,
    Boolean,
    Integer,
    Float,
    String,
    List,
    Map,
    Node,
    Relationship,
    Path,
}

impl fmt::Display for CypherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CypherType::Any => "Any",
            CypherType::Null => "Null",
            CypherType::Boolean => "Boolean",
            CypherType::Integer => "Integer",
            CypherType::Float => "Float",
            CypherType::String => "String",
            CypherType::List => "List",
            CypherType::Map => "Map",
            CypherType::Node => "Node",
            CypherType::Relationship => "Relationship",
            CypherType::Path => "Path",
        };
        write!(f, "{name}")
    }
}

/// A tagged value flowing through evaluation and row streams.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Node(Node),
    Relationship(Relationship),
    Path(Vec<PathTriple>),
}

impl Value {
    pub fn cypher_type(&self) -> CypherType {
        match self {
            Value::Null => CypherType::Null,
            Value::Boolean(_) => CypherType::Boolean,
            Value::Integer(_) => CypherType::Integer,
            Value::Float(_) => CypherType::Float,
            Value::String(_) => CypherType::String,
            Value::List(_) => CypherType::List,
            Value::Map(_) => CypherType::Map,
            Value::Node(_) => CypherType::Node,
            Value::Relationship(_) => CypherType::Relationship,
            Value::Path(_) => CypherType::Path,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Three-valued truthiness: `Some(true|false)` for booleans, `None` for
    /// null or any non-boolean (the caller treats `None` as "not true").
    pub fn as_truth(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// A relationship identity carried by this value, if any — used by
    /// `join`'s relationship-uniqueness enforcement (spec.md §4.3).
    pub fn relationship_id(&self) -> Option<RelId> {
        match self {
            Value::Relationship(r) => Some(r.id),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                *a as f64 == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a.id == b.id,
            (Value::Relationship(a), Value::Relationship(b)) => a.id == b.id,
            (Value::Path(a), Value::Path(b)) => a == b,
            _ => false,
        }
    }
}

/// Ordering is defined for primitives and lexicographically over lists
/// (spec.md §3). Values of incomparable shape (e.g. a node vs a string)
/// yield `None` rather than panicking.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Boolean(a), Value::Boolean(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.partial_cmp(y) {
                        Some(Ordering::Equal) => continue,
                        other => return other,
                    }
                }
                a.len().partial_cmp(&b.len())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_float_compare_across_variants() {
        assert_eq!(Value::Integer(3), Value::Float(3.0));
        assert!(Value::Integer(2) < Value::Float(2.5));
    }

    #[test]
    fn list_ordering_is_lexicographic() {
        let a = Value::List(vec![Value::Integer(1), Value::Integer(2)]);
        let b = Value::List(vec![Value::Integer(1), Value::Integer(3)]);
        assert!(a < b);
    }

    #[test]
    fn incomparable_shapes_yield_none() {
        assert_eq!(
            Value::String("x".into()).partial_cmp(&Value::Integer(1)),
            None
        );
    }
}
