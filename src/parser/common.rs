//! Shared lexical helpers for the clause parsers (grounded in the teacher's
//! `open_cypher_parser/common.rs`).

use nom::{
    character::complete::{alphanumeric1, multispace0},
    combinator::recognize,
    error::ParseError,
    multi::many0,
    sequence::{delimited, pair},
    IResult, Parser,
};

/// Whitespace-tolerant wrapper, trimming both sides of `inner`.
pub fn ws<'a, O, E: ParseError<&'a str>, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
{
    delimited(multispace0, inner, multispace0)
}

/// `identifier_core` followed by any number of `_identifier_core` groups,
/// i.e. one or more alphanumerics with underscores allowed between runs.
pub fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alphanumeric1,
        many0(pair(nom::bytes::complete::tag("_"), alphanumeric1)),
    ))
    .parse(input)
}
