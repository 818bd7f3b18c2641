//! Node identity, labels, and property filtering (spec.md §3).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::value::Value;

/// Stable identity for a node, scoped to a single engine run (spec.md §3
/// invariant 5). The host decides whether identities are stable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, Value>,
}

impl Node {
    pub fn new(id: NodeId, labels: Vec<String>, properties: BTreeMap<String, Value>) -> Self {
        Node {
            id,
            labels,
            properties,
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn property(&self, key: &str) -> Value {
        self.properties.get(key).cloned().unwrap_or(Value::Null)
    }
}

/// A required-labels + property-equality filter over nodes (spec.md §3).
///
/// An empty `labels` list matches any labels; every entry in `properties`
/// must match exactly regardless of label match.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, Value>,
}

impl NodeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn matches(&self, node: &Node) -> bool {
        let labels_ok = self.labels.iter().all(|l| node.has_label(l));
        if !labels_ok {
            return false;
        }
        self.properties
            .iter()
            .all(|(k, v)| node.properties.get(k) == Some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        let mut props = BTreeMap::new();
        props.insert("name".to_string(), Value::String("x".to_string()));
        Node::new(NodeId(1), vec!["Person".to_string()], props)
    }

    #[test]
    fn empty_label_filter_matches_any_labels() {
        let filter = NodeFilter::new().with_property("name", Value::String("x".to_string()));
        assert!(filter.matches(&sample()));
    }

    #[test]
    fn label_mismatch_fails() {
        let filter = NodeFilter::new().with_label("Post");
        assert!(!filter.matches(&sample()));
    }

    #[test]
    fn property_mismatch_fails_even_with_label_match() {
        let filter = NodeFilter::new()
            .with_label("Person")
            .with_property("name", Value::String("y".to_string()));
        assert!(!filter.matches(&sample()));
    }
}
