//! Errors raised while lowering an AST into logical/physical plan trees
//! (spec.md §4.5-§4.6, §7 `SemanticError`/`PlanError`).

use thiserror::Error;

use crate::frame::SchemaError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlanError {
    #[error("unknown variable '{0}' referenced in query")]
    UnknownVariable(String),

    #[error("unknown procedure {namespace}.{name}")]
    UnknownProcedure { namespace: String, name: String },

    #[error("procedure {namespace}.{name} expects {expected} argument(s), got {actual}")]
    ProcedureArity {
        namespace: String,
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("CREATE pattern references '{0}' which is neither bound by a prior MATCH nor created in this pattern")]
    UnboundCreateEndpoint(String),

    #[error("planner cannot lower construct: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
