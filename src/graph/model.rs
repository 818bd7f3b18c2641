//! The host-provided graph model contract (spec.md §4.4).
//!
//! A host implements [`GraphModel`] once per graph instance; the engine
//! never constructs nodes, relationships, or paths itself — it only
//! enumerates and (for `CREATE`) requests creation through this trait.

use thiserror::Error;

use crate::graph::node::{Node, NodeFilter, NodeId};
use crate::graph::procedure::CallableProcedure;
use crate::graph::relationship::{Direction, PathTriple, RelId, RelationshipFilter};
use crate::value::CypherType;

/// Opaque host error, propagated unchanged (spec.md §7): the engine never
/// retries or inspects it, only wraps it for the `Runner`'s unified error.
#[derive(Debug, Error)]
#[error("graph model error: {source}")]
pub struct GraphModelError {
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl GraphModelError {
    pub fn new(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        GraphModelError {
            source: Box::new(source),
        }
    }
}

pub type GraphResult<T> = Result<T, GraphModelError>;

/// A node or relationship property key the model has been told may be
/// worth an index (spec.md §4.4: advisory, never consulted by the core).
#[derive(Debug, Clone)]
pub struct IndexDescriptor {
    pub label: String,
    pub property_keys: Vec<String>,
}

/// Every sequence-returning method yields a lazy, single-pass iterator
/// (spec.md §6). Implementations must give consistent iteration within a
/// single logical call but need not offer cross-call snapshot isolation
/// (spec.md §4.4 invariant) — that tradeoff is the host's to make.
pub trait GraphModel {
    /// All nodes, lazily enumerated.
    fn nodes(&self) -> Box<dyn Iterator<Item = Node> + '_>;

    /// Nodes matching `filter`, lazily enumerated.
    fn nodes_filtered(&self, filter: &NodeFilter) -> Box<dyn Iterator<Item = Node> + '_> {
        let filter = filter.clone();
        Box::new(self.nodes().filter(move |n| filter.matches(n)))
    }

    /// All relationships, canonicalized to `Direction::Outgoing`.
    fn relationships(&self) -> Box<dyn Iterator<Item = PathTriple> + '_>;

    /// Paths matching the three filters, walked in `direction` (spec.md
    /// §4.4): `Outgoing` yields the canonical triple, `Incoming` yields its
    /// revert, `Both` yields both, then filters apply as an intersection.
    fn paths(
        &self,
        start_filter: &NodeFilter,
        rel_filter: &RelationshipFilter,
        end_filter: &NodeFilter,
        direction: Direction,
    ) -> GraphResult<Box<dyn Iterator<Item = PathTriple> + '_>> {
        let start_filter = start_filter.clone();
        let rel_filter = rel_filter.clone();
        let end_filter = end_filter.clone();
        let oriented: Box<dyn Iterator<Item = PathTriple>> = match direction {
            Direction::Outgoing => Box::new(self.relationships()),
            Direction::Incoming => Box::new(self.relationships().map(|t| t.revert())),
            Direction::Both => Box::new(
                self.relationships()
                    .flat_map(|t| vec![t.clone(), t.revert()]),
            ),
        };
        Ok(Box::new(oriented.filter(move |t| {
            start_filter.matches(&t.start)
                && rel_filter.matches(&t.relationship)
                && end_filter.matches(&t.end)
        })))
    }

    /// Single-edge expansions whose `start.id == node_id` under `direction`.
    fn expand(
        &self,
        node_id: NodeId,
        direction: Direction,
    ) -> GraphResult<Box<dyn Iterator<Item = PathTriple> + '_>> {
        let oriented: Box<dyn Iterator<Item = PathTriple>> = match direction {
            Direction::Outgoing => Box::new(self.relationships()),
            Direction::Incoming => Box::new(self.relationships().map(|t| t.revert())),
            Direction::Both => Box::new(
                self.relationships()
                    .flat_map(|t| vec![t.clone(), t.revert()]),
            ),
        };
        Ok(Box::new(oriented.filter(move |t| t.start.id == node_id)))
    }

    /// Expansion with filters applied after expansion (spec.md §4.4).
    fn expand_filtered(
        &self,
        node_id: NodeId,
        direction: Direction,
        rel_filter: &RelationshipFilter,
        end_filter: &NodeFilter,
    ) -> GraphResult<Box<dyn Iterator<Item = PathTriple> + '_>> {
        let rel_filter = rel_filter.clone();
        let end_filter = end_filter.clone();
        let base = self.expand(node_id, direction)?;
        Ok(Box::new(
            base.filter(move |t| rel_filter.matches(&t.relationship) && end_filter.matches(&t.end)),
        ))
    }

    /// Transactional bulk create. `on_created` receives freshly assigned
    /// identities so the caller (the `Create` physical node) can continue
    /// planning with them. Atomicity of the call is the host's
    /// responsibility (spec.md §4.4).
    fn create_elements(
        &mut self,
        nodes: Vec<NewNode>,
        rels: Vec<NewRelationship>,
        on_created: &mut dyn FnMut(CreatedElements),
    ) -> GraphResult<()>;

    /// Advisory index registration; the core never consults this (spec.md §4.4).
    fn create_index(&mut self, descriptor: IndexDescriptor) -> GraphResult<()>;

    fn get_indexes(&self) -> Vec<IndexDescriptor>;

    /// Look up a host-registered procedure by namespace and name.
    fn get_procedure(&self, namespace: &str, name: &str) -> Option<&dyn CallableProcedure>;
}

/// A node awaiting creation — labels and property values, no identity yet.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub labels: Vec<String>,
    pub properties: std::collections::BTreeMap<String, crate::value::Value>,
}

/// A relationship awaiting creation, referencing its endpoints either by an
/// already-known `NodeId` or by the index of a sibling `NewNode` in the same
/// `create_elements` call.
#[derive(Debug, Clone)]
pub struct NewRelationship {
    pub rel_type: Option<String>,
    pub start: NewEndpoint,
    pub end: NewEndpoint,
    pub properties: std::collections::BTreeMap<String, crate::value::Value>,
}

#[derive(Debug, Clone, Copy)]
pub enum NewEndpoint {
    Existing(NodeId),
    New(usize),
}

/// Identities assigned by `create_elements`, in the same order as the
/// `nodes`/`rels` vectors submitted.
#[derive(Debug, Clone, Default)]
pub struct CreatedElements {
    pub node_ids: Vec<NodeId>,
    pub rel_ids: Vec<RelId>,
}

/// Declared input/output shape of a procedure call (spec.md §6).
#[derive(Debug, Clone)]
pub struct ProcedureSignature {
    pub inputs: Vec<(String, CypherType)>,
    pub outputs: Vec<(String, CypherType)>,
}
