//! Errors raised while shaping or operating on a [`super::DataFrame`].

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("column '{0}' is not present in the frame's schema")]
    UnknownColumn(String),

    #[error("duplicate column name '{0}' in schema")]
    DuplicateColumn(String),

    #[error("row length {actual} does not match schema arity {expected}")]
    ArityMismatch { expected: usize, actual: usize },
}
