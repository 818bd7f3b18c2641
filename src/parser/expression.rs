//! Expression grammar (spec.md §4.1, reduced to the operators `ast::Operator`
//! declares). Grounded in the teacher's `open_cypher_parser/expression.rs`
//! layering (`parse_logical_or` wraps `parse_logical_and` wraps a binary
//! chain), extended with explicit additive/multiplicative layers so
//! `1 + 2 * 3` evaluates the way the evaluator's `arithmetic` expects —
//! the teacher's single flat binary layer does not disambiguate precedence
//! and would be a correctness regression here (see DESIGN.md).

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};

use super::common::{identifier, ws};
use crate::parser::ast::{Expression, Literal, Operator};

pub fn parse_expression(input: &str) -> IResult<&str, Expression> {
    parse_or(input)
}

fn parse_or(input: &str) -> IResult<&str, Expression> {
    let (input, lhs) = parse_and(input)?;
    fold_binary(input, lhs, ws(tag_no_case("OR")), Operator::Or, parse_and)
}

fn parse_and(input: &str) -> IResult<&str, Expression> {
    let (input, lhs) = parse_comparison(input)?;
    fold_binary(input, lhs, ws(tag_no_case("AND")), Operator::And, parse_comparison)
}

fn parse_comparison(input: &str) -> IResult<&str, Expression> {
    let (input, lhs) = parse_additive(input)?;

    let mut remaining = input;
    let mut expr = lhs;
    loop {
        let res = (ws(parse_comparison_operator), parse_additive).parse(remaining);
        match res {
            Ok((rest, (op, rhs))) => {
                expr = Expression::Binary {
                    operator: op,
                    left: Box::new(expr),
                    right: Box::new(rhs),
                };
                remaining = rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((remaining, expr))
}

fn parse_comparison_operator(input: &str) -> IResult<&str, Operator> {
    alt((
        map(tag(">="), |_| Operator::GreaterThanOrEqual),
        map(tag("<="), |_| Operator::LessThanOrEqual),
        map(tag("<>"), |_| Operator::NotEqual),
        map(tag(">"), |_| Operator::GreaterThan),
        map(tag("<"), |_| Operator::LessThan),
        map(tag("="), |_| Operator::Equal),
        map(
            preceded(ws(tag_no_case("STARTS")), ws(tag_no_case("WITH"))),
            |_| Operator::StartsWith,
        ),
        map(
            preceded(ws(tag_no_case("ENDS")), ws(tag_no_case("WITH"))),
            |_| Operator::EndsWith,
        ),
        map(tag_no_case("CONTAINS"), |_| Operator::Contains),
        map(tag_no_case("IN"), |_| Operator::In),
    ))
    .parse(input)
}

fn parse_additive(input: &str) -> IResult<&str, Expression> {
    let (input, lhs) = parse_multiplicative(input)?;
    let mut remaining = input;
    let mut expr = lhs;
    loop {
        let res = (ws(alt((char('+'), char('-')))), parse_multiplicative).parse(remaining);
        match res {
            Ok((rest, (op, rhs))) => {
                let operator = if op == '+' { Operator::Add } else { Operator::Subtract };
                expr = Expression::Binary {
                    operator,
                    left: Box::new(expr),
                    right: Box::new(rhs),
                };
                remaining = rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((remaining, expr))
}

fn parse_multiplicative(input: &str) -> IResult<&str, Expression> {
    let (input, lhs) = parse_unary(input)?;
    let mut remaining = input;
    let mut expr = lhs;
    loop {
        let res = (ws(alt((char('*'), char('/'), char('%')))), parse_unary).parse(remaining);
        match res {
            Ok((rest, (op, rhs))) => {
                let operator = match op {
                    '*' => Operator::Multiply,
                    '/' => Operator::Divide,
                    _ => Operator::Modulo,
                };
                expr = Expression::Binary {
                    operator,
                    left: Box::new(expr),
                    right: Box::new(rhs),
                };
                remaining = rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((remaining, expr))
}

fn parse_unary(input: &str) -> IResult<&str, Expression> {
    alt((
        map(preceded(ws(tag_no_case("NOT")), parse_unary), |operand| {
            Expression::Unary {
                operator: Operator::Not,
                operand: Box::new(operand),
            }
        }),
        map(preceded(ws(char('-')), parse_unary), |operand| Expression::Binary {
            operator: Operator::Subtract,
            left: Box::new(Expression::Literal(Literal::Integer(0))),
            right: Box::new(operand),
        }),
        parse_postfix,
    ))
    .parse(input)
}

/// A primary expression followed by zero or more `.key` / `[index]` suffixes.
fn parse_postfix(input: &str) -> IResult<&str, Expression> {
    let (mut input, mut expr) = parse_primary(input)?;

    loop {
        if let Ok((rest, key)) = preceded(ws(char('.')), identifier).parse(input) {
            expr = Expression::PropertyAccess {
                base: Box::new(expr),
                key: key.to_string(),
            };
            input = rest;
            continue;
        }
        if let Ok((rest, index)) =
            delimited(ws(char('[')), parse_expression, ws(char(']'))).parse(input)
        {
            expr = Expression::Index {
                base: Box::new(expr),
                index: Box::new(index),
            };
            input = rest;
            continue;
        }
        break;
    }
    Ok((input, expr))
}

fn parse_primary(input: &str) -> IResult<&str, Expression> {
    alt((
        parse_parameter,
        parse_list_literal,
        delimited(ws(char('(')), parse_expression, ws(char(')'))),
        parse_literal_or_variable,
    ))
    .parse(input)
}

fn parse_list_literal(input: &str) -> IResult<&str, Expression> {
    map(
        delimited(
            ws(char('[')),
            separated_list0(ws(char(',')), parse_expression),
            ws(char(']')),
        ),
        Expression::List,
    )
    .parse(input)
}

fn parse_parameter(input: &str) -> IResult<&str, Expression> {
    map(
        preceded(char('$'), take_while1(|c: char| c.is_alphanumeric() || c == '_')),
        |name: &str| Expression::Parameter(name.to_string()),
    )
    .parse(input)
}

fn parse_literal_or_variable(input: &str) -> IResult<&str, Expression> {
    alt((
        map(parse_string_literal, Expression::Literal),
        map(parse_number_literal, Expression::Literal),
        map(ws(identifier), |name: &str| {
            if name.eq_ignore_ascii_case("null") {
                Expression::Literal(Literal::Null)
            } else if name.eq_ignore_ascii_case("true") {
                Expression::Literal(Literal::Boolean(true))
            } else if name.eq_ignore_ascii_case("false") {
                Expression::Literal(Literal::Boolean(false))
            } else {
                Expression::Variable(name.to_string())
            }
        }),
    ))
    .parse(input)
}

fn parse_string_literal(input: &str) -> IResult<&str, Literal> {
    ws(alt((
        map(
            delimited(char('\''), nom::bytes::complete::take_until("'"), char('\'')),
            |s: &str| Literal::String(s.to_string()),
        ),
        map(
            delimited(char('"'), nom::bytes::complete::take_until("\""), char('"')),
            |s: &str| Literal::String(s.to_string()),
        ),
    )))
    .parse(input)
}

fn parse_number_literal(input: &str) -> IResult<&str, Literal> {
    ws(map(
        recognize(pair(
            pair(
                alt((
                    recognize(pair(digit1, pair(char('.'), digit1))),
                    digit1,
                )),
                opt(recognize(pair(alt((char('e'), char('E'))), pair(opt(alt((char('+'), char('-')))), digit1)))),
            ),
            multispace0,
        )),
        |s: &str| {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Literal::Integer(i)
            } else {
                Literal::Float(trimmed.parse::<f64>().unwrap_or(f64::NAN))
            }
        },
    ))
    .parse(input)
}

fn fold_binary<'a>(
    input: &'a str,
    lhs: Expression,
    mut op_tag: impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>>,
    operator: Operator,
    mut rhs_parser: impl FnMut(&'a str) -> IResult<&'a str, Expression>,
) -> IResult<&'a str, Expression> {
    let mut remaining = input;
    let mut expr = lhs;
    loop {
        match op_tag.parse(remaining) {
            Ok((rest, _)) => match rhs_parser(rest) {
                Ok((rest, rhs)) => {
                    expr = Expression::Binary {
                        operator,
                        left: Box::new(expr),
                        right: Box::new(rhs),
                    };
                    remaining = rest;
                }
                Err(e) => return Err(e),
            },
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((remaining, expr))
}
