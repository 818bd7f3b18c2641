//! Clause-level parsers: `MATCH`, `WHERE`, `RETURN`, `ORDER BY`, `SKIP`,
//! `LIMIT`, `CREATE`, `CALL` (spec.md §4.1, §4.5 node kinds). Pattern syntax
//! is grounded in the teacher's `open_cypher_parser/path_pattern.rs`, trimmed
//! to the subset this grammar needs: no variable-length hops, no
//! `shortestPath()`, single start node with a linear hop chain (the spec's
//! logical planner only lowers linear `MATCH` patterns).

use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, digit1},
    combinator::{map, opt},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, preceded, separated_pair},
    IResult, Parser,
};

use super::ast::{
    CallClause, CreateClause, DirectionSyntax, Expression, MatchClause, NodePattern, OrderByItem,
    PathPattern, RelationshipPattern, ReturnClause, ReturnItem,
};
use super::common::{identifier, ws};
use super::expression::parse_expression;

pub fn parse_match_clause(input: &str) -> IResult<&str, MatchClause> {
    map(
        preceded(ws(tag_no_case("MATCH")), parse_path_pattern),
        |pattern| MatchClause { pattern },
    )
    .parse(input)
}

pub fn parse_create_clause(input: &str) -> IResult<&str, CreateClause> {
    map(
        preceded(ws(tag_no_case("CREATE")), parse_path_pattern),
        |pattern| CreateClause { pattern },
    )
    .parse(input)
}

pub fn parse_where_clause(input: &str) -> IResult<&str, Expression> {
    preceded(ws(tag_no_case("WHERE")), parse_expression).parse(input)
}

pub fn parse_return_clause(input: &str) -> IResult<&str, ReturnClause> {
    let (input, _) = ws(tag_no_case("RETURN")).parse(input)?;
    let (input, distinct) = opt(ws(tag_no_case("DISTINCT"))).parse(input)?;
    let (input, items) = separated_list1(ws(char(',')), parse_return_item).parse(input)?;
    Ok((
        input,
        ReturnClause {
            distinct: distinct.is_some(),
            items,
        },
    ))
}

fn parse_return_item(input: &str) -> IResult<&str, ReturnItem> {
    alt((
        map(ws(char('*')), |_| ReturnItem::Star),
        map(
            (
                parse_expression,
                opt(preceded(ws(tag_no_case("AS")), ws(identifier))),
            ),
            |(expression, alias)| ReturnItem::Expr {
                expression,
                alias: alias.map(|s| s.to_string()),
            },
        ),
    ))
    .parse(input)
}

pub fn parse_order_by_clause(input: &str) -> IResult<&str, Vec<OrderByItem>> {
    preceded(
        ws(tag_no_case("ORDER BY")),
        separated_list1(ws(char(',')), parse_order_by_item),
    )
    .parse(input)
}

fn parse_order_by_item(input: &str) -> IResult<&str, OrderByItem> {
    let (input, column) = ws(identifier).parse(input)?;
    let (input, direction) = opt(ws(alt((tag_no_case("ASC"), tag_no_case("DESC"))))).parse(input)?;
    let ascending = !matches!(direction, Some(d) if d.eq_ignore_ascii_case("DESC"));
    Ok((
        input,
        OrderByItem {
            column: column.to_string(),
            ascending,
        },
    ))
}

pub fn parse_skip_clause(input: &str) -> IResult<&str, u64> {
    preceded(ws(tag_no_case("SKIP")), parse_unsigned_integer).parse(input)
}

pub fn parse_limit_clause(input: &str) -> IResult<&str, u64> {
    preceded(ws(tag_no_case("LIMIT")), parse_unsigned_integer).parse(input)
}

fn parse_unsigned_integer(input: &str) -> IResult<&str, u64> {
    map(ws(digit1), |s: &str| s.parse::<u64>().unwrap_or(u64::MAX)).parse(input)
}

pub fn parse_call_clause(input: &str) -> IResult<&str, CallClause> {
    let (input, _) = ws(tag_no_case("CALL")).parse(input)?;
    let (input, namespace) = identifier.parse(input)?;
    let (input, name) = preceded(char('.'), identifier).parse(input)?;
    let (input, arguments) = delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), parse_expression),
        ws(char(')')),
    )
    .parse(input)?;
    let (input, yield_items) = opt(preceded(
        ws(tag_no_case("YIELD")),
        separated_list1(ws(char(',')), ws(identifier)),
    ))
    .parse(input)?;

    Ok((
        input,
        CallClause {
            namespace: namespace.to_string(),
            name: name.to_string(),
            arguments,
            yield_items: yield_items.map(|items| items.into_iter().map(String::from).collect()),
        },
    ))
}

fn parse_path_pattern(input: &str) -> IResult<&str, PathPattern> {
    let (input, start) = parse_node_pattern(input)?;
    let (input, hops) = many0(parse_hop).parse(input)?;
    Ok((input, PathPattern { start, hops }))
}

fn parse_hop(input: &str) -> IResult<&str, (RelationshipPattern, NodePattern)> {
    let (input, relationship) = parse_relationship_pattern(input)?;
    let (input, node) = parse_node_pattern(input)?;
    Ok((input, (relationship, node)))
}

fn parse_node_pattern(input: &str) -> IResult<&str, NodePattern> {
    delimited(
        ws(char('(')),
        map(
            (
                opt(ws(identifier)),
                parse_labels,
                opt(parse_property_map),
            ),
            |(variable, labels, properties)| NodePattern {
                variable: variable.map(String::from),
                labels,
                properties: properties.unwrap_or_default(),
            },
        ),
        ws(char(')')),
    )
    .parse(input)
}

fn parse_labels(input: &str) -> IResult<&str, Vec<String>> {
    map(
        many0(preceded(char(':'), identifier)),
        |labels: Vec<&str>| labels.into_iter().map(String::from).collect(),
    )
    .parse(input)
}

fn parse_relationship_types(input: &str) -> IResult<&str, Vec<String>> {
    let (input, first) = opt(preceded(char(':'), identifier)).parse(input)?;
    match first {
        None => Ok((input, Vec::new())),
        Some(first) => {
            let (input, rest) = many0(preceded(char('|'), identifier)).parse(input)?;
            let mut types = vec![first.to_string()];
            types.extend(rest.into_iter().map(String::from));
            Ok((input, types))
        }
    }
}

fn parse_property_map(input: &str) -> IResult<&str, Vec<(String, Expression)>> {
    delimited(
        ws(char('{')),
        separated_list0(
            ws(char(',')),
            separated_pair(ws(identifier), ws(char(':')), parse_expression),
        ),
        ws(char('}')),
    )
    .map(|pairs: Vec<(&str, Expression)>| {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    })
    .parse(input)
}

fn parse_relationship_pattern(input: &str) -> IResult<&str, RelationshipPattern> {
    let (input, left_arrow) = opt(char('<')).parse(input)?;
    let (input, _) = char('-').parse(input)?;
    let (input, internals) = opt(delimited(
        char('['),
        (
            opt(ws(identifier)),
            parse_relationship_types,
            opt(parse_property_map),
        ),
        char(']'),
    ))
    .parse(input)?;
    let (input, _) = char('-').parse(input)?;
    let (input, right_arrow) = opt(char('>')).parse(input)?;

    let direction = match (left_arrow.is_some(), right_arrow.is_some()) {
        (true, false) => DirectionSyntax::Left,
        (false, true) => DirectionSyntax::Right,
        _ => DirectionSyntax::Either,
    };

    let (variable, types, properties) = internals.unwrap_or((None, Vec::new(), None));

    Ok((
        input,
        RelationshipPattern {
            variable: variable.map(String::from),
            types,
            properties: properties.unwrap_or_default(),
            direction,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Literal;

    #[test]
    fn parses_round_trip_pattern() {
        let (rest, clause) = parse_match_clause("MATCH (a)-[r]->(b)").unwrap();
        assert_eq!(rest, "");
        assert_eq!(clause.pattern.start.variable, Some("a".to_string()));
        assert_eq!(clause.pattern.hops.len(), 1);
        let (rel, end) = &clause.pattern.hops[0];
        assert_eq!(rel.variable, Some("r".to_string()));
        assert_eq!(rel.direction, DirectionSyntax::Right);
        assert_eq!(end.variable, Some("b".to_string()));
    }

    #[test]
    fn parses_incoming_direction() {
        let (_, clause) = parse_match_clause("MATCH (a)<-[r]-(b)").unwrap();
        let (rel, _) = &clause.pattern.hops[0];
        assert_eq!(rel.direction, DirectionSyntax::Left);
    }

    #[test]
    fn parses_labels_and_properties() {
        let (rest, node) = parse_node_pattern("(n:Person {name: 'x'})").unwrap();
        assert_eq!(rest, "");
        assert_eq!(node.labels, vec!["Person".to_string()]);
        assert_eq!(node.properties.len(), 1);
        assert_eq!(node.properties[0].0, "name");
        assert_eq!(node.properties[0].1, Expression::Literal(Literal::String("x".to_string())));
    }

    #[test]
    fn parses_multiple_relationship_types() {
        let (rest, rel) = parse_relationship_pattern("-[:FOLLOWS|LIKES]->").unwrap();
        assert_eq!(rest, "");
        assert_eq!(rel.types, vec!["FOLLOWS".to_string(), "LIKES".to_string()]);
    }

    #[test]
    fn parses_return_star() {
        let (rest, clause) = parse_return_clause("RETURN *").unwrap();
        assert_eq!(rest, "");
        assert_eq!(clause.items, vec![ReturnItem::Star]);
    }

    #[test]
    fn parses_return_with_alias() {
        let (rest, clause) = parse_return_clause("RETURN n.name AS name").unwrap();
        assert_eq!(rest, "");
        match &clause.items[0] {
            ReturnItem::Expr { alias, .. } => assert_eq!(alias.as_deref(), Some("name")),
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[test]
    fn parses_order_by_desc() {
        let (rest, items) = parse_order_by_clause("ORDER BY age DESC, name").unwrap();
        assert_eq!(rest, "");
        assert_eq!(items[0].column, "age");
        assert!(!items[0].ascending);
        assert_eq!(items[1].column, "name");
        assert!(items[1].ascending);
    }

    #[test]
    fn parses_skip_and_limit() {
        assert_eq!(parse_skip_clause("SKIP 5").unwrap().1, 5);
        assert_eq!(parse_limit_clause("LIMIT 10").unwrap().1, 10);
    }

    #[test]
    fn parses_call_with_yield() {
        let (rest, call) = parse_call_clause("CALL ns.proc(1, 2) YIELD a, b").unwrap();
        assert_eq!(rest, "");
        assert_eq!(call.namespace, "ns");
        assert_eq!(call.name, "proc");
        assert_eq!(call.arguments.len(), 2);
        assert_eq!(call.yield_items, Some(vec!["a".to_string(), "b".to_string()]));
    }
}
