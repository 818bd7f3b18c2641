//! An in-memory [`GraphModel`] reference implementation, for tests and for
//! demonstrating the engine without a real storage backend (spec.md §4.4
//! "a host implements `GraphModel` once per graph instance" — this is the
//! simplest possible host).
//!
//! Identity assignment is a monotonic counter per run; nothing here is
//! durable across process restarts (spec.md §3 invariant 5 leaves that
//! choice to the host).

use std::collections::BTreeMap;

use crate::graph::{
    CallableProcedure, CreatedElements, Direction, GraphModel, GraphResult, IndexDescriptor, Node,
    NodeId, NewEndpoint, NewNode, NewRelationship, PathTriple, ProcedureRegistry, RelId,
    Relationship,
};
use crate::value::Value;

/// A plain adjacency-list graph kept entirely in `Vec`s, with an attached
/// [`ProcedureRegistry`] for `CALL` support.
#[derive(Default)]
pub struct InMemoryGraph {
    nodes: Vec<Node>,
    relationships: Vec<Relationship>,
    indexes: Vec<IndexDescriptor>,
    procedures: ProcedureRegistry,
    next_node_id: u64,
    next_rel_id: u64,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_procedures(procedures: ProcedureRegistry) -> Self {
        InMemoryGraph {
            procedures,
            ..Default::default()
        }
    }

    pub fn register_procedure(
        &mut self,
        namespace: &str,
        name: &str,
        procedure: impl CallableProcedure + 'static,
    ) {
        self.procedures.register(namespace, name, procedure);
    }

    /// Insert a node with a freshly assigned identity, returning it.
    pub fn add_node(&mut self, labels: Vec<String>, properties: BTreeMap<String, Value>) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        self.nodes.push(Node::new(id, labels, properties));
        id
    }

    /// Insert a relationship between two existing nodes, returning its identity.
    pub fn add_relationship(
        &mut self,
        rel_type: Option<String>,
        start: NodeId,
        end: NodeId,
        properties: BTreeMap<String, Value>,
    ) -> RelId {
        let id = RelId(self.next_rel_id);
        self.next_rel_id += 1;
        self.relationships.push(Relationship {
            id,
            rel_type,
            start_node_id: start,
            end_node_id: end,
            properties,
        });
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

impl GraphModel for InMemoryGraph {
    fn nodes(&self) -> Box<dyn Iterator<Item = Node> + '_> {
        Box::new(self.nodes.iter().cloned())
    }

    fn relationships(&self) -> Box<dyn Iterator<Item = PathTriple> + '_> {
        Box::new(self.relationships.iter().filter_map(move |rel| {
            let start = self.node(rel.start_node_id)?.clone();
            let end = self.node(rel.end_node_id)?.clone();
            Some(PathTriple::new(start, rel.clone(), end))
        }))
    }

    fn create_elements(
        &mut self,
        nodes: Vec<NewNode>,
        rels: Vec<NewRelationship>,
        on_created: &mut dyn FnMut(CreatedElements),
    ) -> GraphResult<()> {
        let mut node_ids = Vec::with_capacity(nodes.len());
        for new_node in nodes {
            node_ids.push(self.add_node(new_node.labels, new_node.properties));
        }
        let resolve = |endpoint: &NewEndpoint| -> NodeId {
            match endpoint {
                NewEndpoint::Existing(id) => *id,
                NewEndpoint::New(index) => node_ids[*index],
            }
        };
        let mut rel_ids = Vec::with_capacity(rels.len());
        for new_rel in rels {
            let start = resolve(&new_rel.start);
            let end = resolve(&new_rel.end);
            rel_ids.push(self.add_relationship(new_rel.rel_type, start, end, new_rel.properties));
        }
        on_created(CreatedElements { node_ids, rel_ids });
        Ok(())
    }

    fn create_index(&mut self, descriptor: IndexDescriptor) -> GraphResult<()> {
        self.indexes.push(descriptor);
        Ok(())
    }

    fn get_indexes(&self) -> Vec<IndexDescriptor> {
        self.indexes.clone()
    }

    fn get_procedure(&self, namespace: &str, name: &str) -> Option<&dyn CallableProcedure> {
        self.procedures.get(namespace, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeFilter, RelationshipFilter};

    fn sample_graph() -> InMemoryGraph {
        let mut g = InMemoryGraph::new();
        let alice = g.add_node(vec!["Person".to_string()], BTreeMap::new());
        let bob = g.add_node(vec!["Person".to_string()], BTreeMap::new());
        g.add_relationship(Some("KNOWS".to_string()), alice, bob, BTreeMap::new());
        g
    }

    #[test]
    fn nodes_filtered_by_label() {
        let g = sample_graph();
        let filter = NodeFilter::new().with_label("Person");
        assert_eq!(g.nodes_filtered(&filter).count(), 2);
    }

    #[test]
    fn expand_outgoing_finds_single_hop() {
        let g = sample_graph();
        let alice = g.nodes().next().unwrap().id;
        let triples: Vec<_> = g
            .expand_filtered(
                alice,
                Direction::Outgoing,
                &RelationshipFilter::new(),
                &NodeFilter::new(),
            )
            .unwrap()
            .collect();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].relationship.rel_type.as_deref(), Some("KNOWS"));
    }

    #[test]
    fn create_elements_assigns_fresh_identities_and_links_new_to_new() {
        let mut g = InMemoryGraph::new();
        let mut created = CreatedElements::default();
        g.create_elements(
            vec![
                NewNode {
                    labels: vec!["Person".to_string()],
                    properties: BTreeMap::new(),
                },
                NewNode {
                    labels: vec!["Person".to_string()],
                    properties: BTreeMap::new(),
                },
            ],
            vec![NewRelationship {
                rel_type: Some("KNOWS".to_string()),
                start: NewEndpoint::New(0),
                end: NewEndpoint::New(1),
                properties: BTreeMap::new(),
            }],
            &mut |c| created = c,
        )
        .unwrap();
        assert_eq!(created.node_ids.len(), 2);
        assert_eq!(created.rel_ids.len(), 1);
        assert_eq!(g.nodes().count(), 2);
        assert_eq!(g.relationships().count(), 1);
    }
}
