//! Errors raised while evaluating an expression (spec.md §4.2, §7).

use thiserror::Error;

use crate::parser::ast::Expression;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvaluationError {
    #[error("unbound variable '{0}'")]
    UnboundVariable(String),

    #[error("unresolved parameter '${0}'")]
    UnresolvedParameter(String),

    #[error("property access on a non-entity value")]
    PropertyAccessOnNonEntity,

    #[error("index applied to a non-list value")]
    IndexOnNonList,

    #[error("arithmetic over incompatible types in expression {expr:?}: {reason}")]
    Arithmetic { expr: Box<Expression>, reason: String },

    #[error("comparison over incompatible types")]
    IncomparableTypes,

    #[error("division by zero")]
    DivisionByZero,
}
