//! Cached query parser (spec.md §4.1).
//!
//! `QueryParser::parse` is the host-facing entry point: `parse(query) →
//! (AST, residual_params, semantic_state)`, memoized by exact query text.
//! Residual-parameter extraction (replacing literal constants with a
//! parameterized cache key, per the spec's "constants extracted during
//! parameterization") is not implemented — the cache key is the exact query
//! text and `residual_params` is always empty. See DESIGN.md for why this
//! tradeoff was accepted.

pub mod ast;
pub mod cache;
pub mod clauses;
pub mod common;
pub mod errors;
pub mod expression;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use nom::{
    character::complete::multispace0,
    combinator::{eof, opt},
    sequence::terminated,
    IResult, Parser as _,
};

pub use errors::ParsingError;

use crate::value::Value;
use ast::{Query, Statement};
use cache::QueryCache;
use common::ws;

/// Default LRU capacity when a runner is built without an explicit
/// `EngineConfig` (spec.md §4.1: "default ≥ 256 entries").
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Variable-scoping facts the logical planner consults (spec.md §4.5:
/// "Semantic state from the parser informs variable scoping").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SemanticState {
    pub bound_variables: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub statement: Statement,
    pub residual_params: HashMap<String, Value>,
    pub semantic_state: SemanticState,
}

pub struct QueryParser {
    cache: QueryCache<ParsedQuery>,
}

impl Default for QueryParser {
    fn default() -> Self {
        QueryParser::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl QueryParser {
    pub fn new(cache_capacity: usize) -> Self {
        QueryParser {
            cache: QueryCache::new(cache_capacity),
        }
    }

    /// `parse(query) → (AST, residual_params, semantic_state)` (spec.md
    /// §4.1). Cache hits return the same `Arc<ParsedQuery>` handle.
    pub fn parse(&self, query: &str) -> Result<Arc<ParsedQuery>, ParsingError> {
        if let Some(hit) = self.cache.get(query) {
            return Ok(hit);
        }

        let parsed = parse_query_text(query)?;
        let parsed = Arc::new(parsed);
        self.cache.insert(query.to_string(), Arc::clone(&parsed));
        Ok(parsed)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn parse_query_text(query: &str) -> Result<ParsedQuery, ParsingError> {
    let (_, statement) = terminated(parse_statement, terminated(ws(opt(nom::bytes::complete::tag(";"))), eof))
        .parse(query)
        .map_err(|e: nom::Err<nom::error::Error<&str>>| ParsingError::new(e.to_string()))?;

    let semantic_state = SemanticState {
        bound_variables: bound_variables_of(&statement),
    };

    Ok(ParsedQuery {
        statement,
        residual_params: HashMap::new(),
        semantic_state,
    })
}

fn parse_statement(input: &str) -> IResult<&str, Statement> {
    use nom::branch::alt;
    use nom::combinator::map;

    alt((
        map(clauses::parse_call_clause, Statement::Call),
        map(parse_query, Statement::Query),
    ))
    .parse(input)
}

fn parse_query(input: &str) -> IResult<&str, Query> {
    let (input, _) = multispace0.parse(input)?;
    let (input, match_clauses) = nom::multi::many1(clauses::parse_match_clause).parse(input)?;
    let (input, where_clause) = opt(clauses::parse_where_clause).parse(input)?;
    let (input, create_clause) = opt(clauses::parse_create_clause).parse(input)?;
    let (input, return_clause) = opt(clauses::parse_return_clause).parse(input)?;
    let (input, order_by) = opt(clauses::parse_order_by_clause).parse(input)?;
    let (input, skip) = opt(clauses::parse_skip_clause).parse(input)?;
    let (input, limit) = opt(clauses::parse_limit_clause).parse(input)?;
    let (input, _) = multispace0.parse(input)?;

    Ok((
        input,
        Query {
            match_clauses,
            where_clause,
            create_clause,
            return_clause,
            order_by,
            skip,
            limit,
        },
    ))
}

fn bound_variables_of(statement: &Statement) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    if let Statement::Query(query) = statement {
        for clause in &query.match_clauses {
            collect_pattern_variables(&clause.pattern, &mut names);
        }
        if let Some(create) = &query.create_clause {
            collect_pattern_variables(&create.pattern, &mut names);
        }
    }
    names
}

fn collect_pattern_variables(pattern: &ast::PathPattern, names: &mut BTreeSet<String>) {
    if let Some(name) = &pattern.start.variable {
        names.insert(name.clone());
    }
    for (relationship, node) in &pattern.hops {
        if let Some(name) = &relationship.variable {
            names.insert(name.clone());
        }
        if let Some(name) = &node.variable {
            names.insert(name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_s1_round_trip_query() {
        let parser = QueryParser::default();
        let parsed = parser.parse("MATCH (a)-[r]->(b) RETURN a, r, b").unwrap();
        match &parsed.statement {
            Statement::Query(query) => {
                assert_eq!(query.match_clauses.len(), 1);
                assert!(query.return_clause.is_some());
            }
            other => panic!("expected Query, got {:?}", other),
        }
        assert!(parsed.semantic_state.bound_variables.contains("a"));
        assert!(parsed.semantic_state.bound_variables.contains("r"));
        assert!(parsed.semantic_state.bound_variables.contains("b"));
    }

    #[test]
    fn parses_filter_skip_limit_order_by() {
        let parser = QueryParser::default();
        let parsed = parser
            .parse("MATCH (n:Person) WHERE n.name = 'x' RETURN n ORDER BY n.name SKIP 1 LIMIT 10")
            .unwrap();
        let Statement::Query(query) = &parsed.statement else {
            panic!("expected Query");
        };
        assert!(query.where_clause.is_some());
        assert_eq!(query.skip, Some(1));
        assert_eq!(query.limit, Some(10));
        assert!(query.order_by.is_some());
    }

    #[test]
    fn repeated_parse_returns_cached_handle() {
        let parser = QueryParser::default();
        let first = parser.parse("MATCH (n) RETURN n").unwrap();
        let second = parser.parse("MATCH (n) RETURN n").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(parser.cache_len(), 1);
    }

    #[test]
    fn malformed_query_fails_with_parsing_error() {
        let parser = QueryParser::default();
        let err = parser.parse("MATCH (n RETURN n").unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn call_clause_parses_as_call_statement() {
        let parser = QueryParser::default();
        let parsed = parser.parse("CALL ns.proc() YIELD x").unwrap();
        assert!(matches!(parsed.statement, Statement::Call(_)));
    }
}
