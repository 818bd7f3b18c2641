//! Relationships, oriented traversal triples, and direction (spec.md §3, §4.4).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::graph::node::{Node, NodeId};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RelId(pub u64);

impl std::fmt::Display for RelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Relationship {
    pub id: RelId,
    pub rel_type: Option<String>,
    pub start_node_id: NodeId,
    pub end_node_id: NodeId,
    pub properties: BTreeMap<String, Value>,
}

impl Relationship {
    pub fn property(&self, key: &str) -> Value {
        self.properties.get(key).cloned().unwrap_or(Value::Null)
    }
}

/// A type-allowlist + property-equality filter over relationships (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct RelationshipFilter {
    pub types: Vec<String>,
    pub properties: BTreeMap<String, Value>,
}

impl RelationshipFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, rel_type: impl Into<String>) -> Self {
        self.types.push(rel_type.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// A relationship whose type is absent fails any non-empty type filter
    /// (spec.md §3 "RelationshipFilter").
    pub fn matches(&self, rel: &Relationship) -> bool {
        let type_ok = self.types.is_empty()
            || rel
                .rel_type
                .as_deref()
                .is_some_and(|t| self.types.iter().any(|candidate| candidate == t));
        if !type_ok {
            return false;
        }
        self.properties
            .iter()
            .all(|(k, v)| rel.properties.get(k) == Some(v))
    }
}

/// Traversal direction requested against the graph model (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

impl Direction {
    pub fn reverse(self) -> Direction {
        match self {
            Direction::Outgoing => Direction::Incoming,
            Direction::Incoming => Direction::Outgoing,
            Direction::Both => Direction::Both,
        }
    }
}

/// An oriented single-edge traversal: `(start, relationship, end, reversed)`
/// (spec.md §3). `reversed` records interpretation, never mutates the
/// underlying stored relationship identity.
#[derive(Debug, Clone, Serialize)]
pub struct PathTriple {
    pub start: Node,
    pub relationship: Relationship,
    pub end: Node,
    pub reversed: bool,
}

impl PartialEq for PathTriple {
    fn eq(&self, other: &Self) -> bool {
        self.start.id == other.start.id
            && self.relationship.id == other.relationship.id
            && self.end.id == other.end.id
            && self.reversed == other.reversed
    }
}

impl PathTriple {
    pub fn new(start: Node, relationship: Relationship, end: Node) -> Self {
        debug_assert!(
            relationship.start_node_id == start.id || relationship.start_node_id == end.id,
            "relationship endpoints must match the triple's nodes"
        );
        PathTriple {
            start,
            relationship,
            end,
            reversed: false,
        }
    }

    /// Swap endpoints and flip `reversed`. The stored relationship (and its
    /// identity) is untouched — traversal direction is an interpretation,
    /// not a mutation (spec.md §3).
    pub fn revert(&self) -> PathTriple {
        PathTriple {
            start: self.end.clone(),
            relationship: self.relationship.clone(),
            end: self.start.clone(),
            reversed: !self.reversed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn triple() -> PathTriple {
        let a = Node::new(NodeId(1), vec![], BTreeMap::new());
        let b = Node::new(NodeId(2), vec![], BTreeMap::new());
        let r = Relationship {
            id: RelId(10),
            rel_type: Some("KNOWS".to_string()),
            start_node_id: NodeId(1),
            end_node_id: NodeId(2),
            properties: BTreeMap::new(),
        };
        PathTriple::new(a, r, b)
    }

    #[test]
    fn revert_twice_restores_original() {
        let t = triple();
        let back = t.revert().revert();
        assert_eq!(t, back);
    }

    #[test]
    fn revert_swaps_endpoints_and_flips_flag() {
        let t = triple();
        let reverted = t.revert();
        assert_eq!(reverted.start.id, t.end.id);
        assert_eq!(reverted.end.id, t.start.id);
        assert_eq!(reverted.relationship.id, t.relationship.id);
        assert!(reverted.reversed);
    }
}
