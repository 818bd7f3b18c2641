//! Parsing failures (spec.md §4.1, §7): "malformed input fails with
//! `ParsingError{message}`; no partial AST is returned."

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
#[error("failed to parse query: {message}")]
pub struct ParsingError {
    pub message: String,
}

impl ParsingError {
    pub fn new(message: impl Into<String>) -> Self {
        ParsingError {
            message: message.into(),
        }
    }
}

impl<'a> From<nom::Err<nom::error::Error<&'a str>>> for ParsingError {
    fn from(err: nom::Err<nom::error::Error<&'a str>>) -> Self {
        ParsingError::new(err.to_string())
    }
}
