//! Graph-model contract: the abstract enumeration/creation surface a host
//! implements (spec.md §4.4).

mod model;
mod node;
mod procedure;
mod relationship;

pub use model::{
    CreatedElements, GraphModel, GraphModelError, GraphResult, IndexDescriptor, NewEndpoint,
    NewNode, NewRelationship, ProcedureSignature,
};
pub use node::{Node, NodeFilter, NodeId};
pub use procedure::{CallableProcedure, ProcedureRegistry};
pub use relationship::{Direction, PathTriple, RelId, Relationship, RelationshipFilter};
