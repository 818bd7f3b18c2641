//! Expression evaluation and static type inference (spec.md §4.2).
//!
//! [`Evaluator`] is stateless and shared by every plan of one `Runner`
//! (spec.md Design Note "Expression evaluator sharing").

pub mod errors;

use std::collections::HashMap;

pub use errors::EvaluationError;

use crate::parser::ast::{Expression, Literal, Operator};
use crate::value::{CypherType, Value};

/// Variable and parameter bindings visible to one `eval` call (spec.md §4.2).
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    pub variables: HashMap<String, Value>,
    pub residual_params: HashMap<String, Value>,
    pub invocation_params: HashMap<String, Value>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this context with `name` bound to `value` — used by
    /// `project`/`filter` to extend the row's column bindings (spec.md §4.3).
    pub fn with_binding(&self, name: &str, value: Value) -> EvalContext {
        let mut ctx = self.clone();
        ctx.variables.insert(name.to_string(), value);
        ctx
    }
}

type EvalResult<T> = Result<T, EvaluationError>;

/// Stateless evaluator shared by all plans of one runner.
#[derive(Debug, Default, Clone, Copy)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Evaluator
    }

    pub fn eval(&self, expr: &Expression, ctx: &EvalContext) -> EvalResult<Value> {
        match expr {
            Expression::Literal(lit) => Ok(literal_value(lit)),
            Expression::Variable(name) => ctx
                .variables
                .get(name)
                .cloned()
                .ok_or_else(|| EvaluationError::UnboundVariable(name.clone())),
            Expression::Parameter(name) => ctx
                .residual_params
                .get(name)
                .or_else(|| ctx.invocation_params.get(name))
                .cloned()
                .ok_or_else(|| EvaluationError::UnresolvedParameter(name.clone())),
            Expression::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item, ctx))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::List(values))
            }
            Expression::PropertyAccess { base, key } => {
                let value = self.eval(base, ctx)?;
                self.property_access(&value, key)
            }
            Expression::Index { base, index } => {
                let value = self.eval(base, ctx)?;
                let index = self.eval(index, ctx)?;
                self.index_access(&value, &index)
            }
            Expression::Unary { operator, operand } => {
                let value = self.eval(operand, ctx)?;
                self.eval_unary(*operator, value, expr)
            }
            Expression::Binary {
                operator,
                left,
                right,
            } => {
                let lhs = self.eval(left, ctx)?;
                let rhs = self.eval(right, ctx)?;
                self.eval_binary(*operator, lhs, rhs, expr)
            }
        }
    }

    fn property_access(&self, value: &Value, key: &str) -> EvalResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Node(node) => Ok(node.property(key)),
            Value::Relationship(rel) => Ok(rel.property(key)),
            Value::Map(map) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
            _ => Err(EvaluationError::PropertyAccessOnNonEntity),
        }
    }

    fn index_access(&self, value: &Value, index: &Value) -> EvalResult<Value> {
        match (value, index) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::List(items), Value::Integer(i)) => {
                let idx = if *i < 0 {
                    items.len().checked_sub((-i) as usize)
                } else {
                    Some(*i as usize)
                };
                Ok(idx.and_then(|i| items.get(i)).cloned().unwrap_or(Value::Null))
            }
            _ => Err(EvaluationError::IndexOnNonList),
        }
    }

    fn eval_unary(&self, operator: Operator, value: Value, expr: &Expression) -> EvalResult<Value> {
        match operator {
            Operator::Not => Ok(match value.as_truth() {
                Some(b) => Value::Boolean(!b),
                None if value.is_null() => Value::Null,
                None => {
                    return Err(EvaluationError::Arithmetic {
                        expr: Box::new(expr.clone()),
                        reason: "NOT applied to a non-boolean".to_string(),
                    })
                }
            }),
            Operator::Subtract => match value {
                Value::Integer(i) => Ok(Value::Integer(-i)),
                Value::Float(f) => Ok(Value::Float(-f)),
                Value::Null => Ok(Value::Null),
                _ => Err(EvaluationError::Arithmetic {
                    expr: Box::new(expr.clone()),
                    reason: "unary minus applied to a non-numeric value".to_string(),
                }),
            },
            other => Err(EvaluationError::Arithmetic {
                expr: Box::new(expr.clone()),
                reason: format!("{other:?} is not a valid unary operator"),
            }),
        }
    }

    fn eval_binary(
        &self,
        operator: Operator,
        lhs: Value,
        rhs: Value,
        expr: &Expression,
    ) -> EvalResult<Value> {
        use Operator::*;
        match operator {
            And => Ok(kleene_and(&lhs, &rhs)),
            Or => Ok(kleene_or(&lhs, &rhs)),
            Equal => Ok(three_valued_eq(&lhs, &rhs, false)),
            NotEqual => Ok(three_valued_eq(&lhs, &rhs, true)),
            LessThan | GreaterThan | LessThanOrEqual | GreaterThanOrEqual => {
                Ok(three_valued_compare(operator, &lhs, &rhs))
            }
            Add | Subtract | Multiply | Divide | Modulo => {
                arithmetic(operator, &lhs, &rhs, expr)
            }
            In => Ok(match (&lhs, &rhs) {
                (Value::Null, _) | (_, Value::Null) => Value::Null,
                (needle, Value::List(items)) => {
                    Value::Boolean(items.iter().any(|item| item == needle))
                }
                _ => Value::Null,
            }),
            StartsWith | EndsWith | Contains => string_predicate(operator, &lhs, &rhs),
            Not => unreachable!("NOT is parsed as a unary operator"),
        }
    }

    /// Pure static type inference against a column-name→type environment.
    pub fn type_of(&self, expr: &Expression, schema: &HashMap<String, CypherType>) -> CypherType {
        match expr {
            Expression::Literal(Literal::Integer(_)) => CypherType::Integer,
            Expression::Literal(Literal::Float(_)) => CypherType::Float,
            Expression::Literal(Literal::Boolean(_)) => CypherType::Boolean,
            Expression::Literal(Literal::String(_)) => CypherType::String,
            Expression::Literal(Literal::Null) => CypherType::Null,
            Expression::Variable(name) => schema.get(name).cloned().unwrap_or(CypherType::Any),
            Expression::Parameter(_) => CypherType::Any,
            Expression::List(_) => CypherType::List,
            Expression::PropertyAccess { .. } => CypherType::Any,
            Expression::Index { .. } => CypherType::Any,
            Expression::Unary { operator, operand } => match operator {
                Operator::Not => CypherType::Boolean,
                _ => self.type_of(operand, schema),
            },
            Expression::Binary { operator, left, .. } => match operator {
                Operator::And
                | Operator::Or
                | Operator::Equal
                | Operator::NotEqual
                | Operator::LessThan
                | Operator::GreaterThan
                | Operator::LessThanOrEqual
                | Operator::GreaterThanOrEqual
                | Operator::In
                | Operator::StartsWith
                | Operator::EndsWith
                | Operator::Contains => CypherType::Boolean,
                Operator::Add | Operator::Subtract | Operator::Multiply | Operator::Divide
                | Operator::Modulo => self.type_of(left, schema),
                Operator::Not => CypherType::Boolean,
            },
        }
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Integer(i) => Value::Integer(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Null => Value::Null,
    }
}

/// Three-valued Kleene AND: `false` dominates, `Null` propagates otherwise.
fn kleene_and(lhs: &Value, rhs: &Value) -> Value {
    match (lhs.as_truth(), rhs.as_truth()) {
        (Some(false), _) | (_, Some(false)) => Value::Boolean(false),
        (Some(a), Some(b)) => Value::Boolean(a && b),
        _ => Value::Null,
    }
}

/// Three-valued Kleene OR: `true` dominates, `Null` propagates otherwise.
fn kleene_or(lhs: &Value, rhs: &Value) -> Value {
    match (lhs.as_truth(), rhs.as_truth()) {
        (Some(true), _) | (_, Some(true)) => Value::Boolean(true),
        (Some(a), Some(b)) => Value::Boolean(a || b),
        _ => Value::Null,
    }
}

fn three_valued_eq(lhs: &Value, rhs: &Value, negate: bool) -> Value {
    if lhs.is_null() || rhs.is_null() {
        return Value::Null;
    }
    let eq = lhs == rhs;
    Value::Boolean(if negate { !eq } else { eq })
}

fn three_valued_compare(operator: Operator, lhs: &Value, rhs: &Value) -> Value {
    if lhs.is_null() || rhs.is_null() {
        return Value::Null;
    }
    match lhs.partial_cmp(rhs) {
        None => Value::Null,
        Some(ordering) => {
            let result = match operator {
                Operator::LessThan => ordering.is_lt(),
                Operator::GreaterThan => ordering.is_gt(),
                Operator::LessThanOrEqual => ordering.is_le(),
                Operator::GreaterThanOrEqual => ordering.is_ge(),
                _ => unreachable!(),
            };
            Value::Boolean(result)
        }
    }
}

fn arithmetic(
    operator: Operator,
    lhs: &Value,
    rhs: &Value,
    expr: &Expression,
) -> EvalResult<Value> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => match operator {
            Operator::Add => Ok(Value::Integer(a + b)),
            Operator::Subtract => Ok(Value::Integer(a - b)),
            Operator::Multiply => Ok(Value::Integer(a * b)),
            Operator::Divide => {
                if *b == 0 {
                    Err(EvaluationError::DivisionByZero)
                } else {
                    Ok(Value::Integer(a / b))
                }
            }
            Operator::Modulo => {
                if *b == 0 {
                    Err(EvaluationError::DivisionByZero)
                } else {
                    Ok(Value::Integer(a % b))
                }
            }
            _ => unreachable!(),
        },
        (Value::String(a), Value::String(b)) if operator == Operator::Add => {
            Ok(Value::String(format!("{a}{b}")))
        }
        (a, b) if a.cypher_type() == CypherType::Integer || a.cypher_type() == CypherType::Float
            || b.cypher_type() == CypherType::Integer || b.cypher_type() == CypherType::Float =>
        {
            let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) else {
                return Err(EvaluationError::Arithmetic {
                    expr: Box::new(expr.clone()),
                    reason: "operands are not numeric".to_string(),
                });
            };
            match operator {
                Operator::Add => Ok(Value::Float(x + y)),
                Operator::Subtract => Ok(Value::Float(x - y)),
                Operator::Multiply => Ok(Value::Float(x * y)),
                Operator::Divide => {
                    if y == 0.0 {
                        Err(EvaluationError::DivisionByZero)
                    } else {
                        Ok(Value::Float(x / y))
                    }
                }
                Operator::Modulo => {
                    if y == 0.0 {
                        Err(EvaluationError::DivisionByZero)
                    } else {
                        Ok(Value::Float(x % y))
                    }
                }
                _ => unreachable!(),
            }
        }
        _ => Err(EvaluationError::Arithmetic {
            expr: Box::new(expr.clone()),
            reason: format!(
                "incompatible operand types {:?} and {:?}",
                lhs.cypher_type(),
                rhs.cypher_type()
            ),
        }),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn string_predicate(operator: Operator, lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }
    let (Some(haystack), Some(needle)) = (lhs.as_str(), rhs.as_str()) else {
        return Err(EvaluationError::IncomparableTypes);
    };
    let result = match operator {
        Operator::StartsWith => haystack.starts_with(needle),
        Operator::EndsWith => haystack.ends_with(needle),
        Operator::Contains => haystack.contains(needle),
        _ => unreachable!(),
    };
    Ok(Value::Boolean(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(i: i64) -> Expression {
        Expression::Literal(Literal::Integer(i))
    }

    #[test]
    fn null_propagates_through_and() {
        let ev = Evaluator::new();
        let ctx = EvalContext::new();
        let expr = Expression::Binary {
            operator: Operator::And,
            left: Box::new(Expression::Literal(Literal::Null)),
            right: Box::new(Expression::Literal(Literal::Boolean(true))),
        };
        assert_eq!(ev.eval(&expr, &ctx).unwrap(), Value::Null);
    }

    #[test]
    fn false_dominates_and_even_with_null() {
        let ev = Evaluator::new();
        let ctx = EvalContext::new();
        let expr = Expression::Binary {
            operator: Operator::And,
            left: Box::new(Expression::Literal(Literal::Null)),
            right: Box::new(Expression::Literal(Literal::Boolean(false))),
        };
        assert_eq!(ev.eval(&expr, &ctx).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn division_by_zero_errors() {
        let ev = Evaluator::new();
        let ctx = EvalContext::new();
        let expr = Expression::Binary {
            operator: Operator::Divide,
            left: Box::new(lit(1)),
            right: Box::new(lit(0)),
        };
        assert_eq!(ev.eval(&expr, &ctx), Err(EvaluationError::DivisionByZero));
    }

    #[test]
    fn parameter_resolves_residual_before_invocation() {
        let ev = Evaluator::new();
        let mut ctx = EvalContext::new();
        ctx.residual_params
            .insert("p".to_string(), Value::Integer(1));
        ctx.invocation_params
            .insert("p".to_string(), Value::Integer(2));
        let expr = Expression::Parameter("p".to_string());
        assert_eq!(ev.eval(&expr, &ctx).unwrap(), Value::Integer(1));
    }

    use test_case::test_case;

    #[test_case(6, 3, Operator::Add => Value::Integer(9))]
    #[test_case(6, 3, Operator::Subtract => Value::Integer(3))]
    #[test_case(6, 3, Operator::Multiply => Value::Integer(18))]
    #[test_case(6, 3, Operator::Divide => Value::Integer(2))]
    #[test_case(7, 2, Operator::Modulo => Value::Integer(1))]
    fn integer_arithmetic_table(a: i64, b: i64, operator: Operator) -> Value {
        let ev = Evaluator::new();
        let ctx = EvalContext::new();
        let expr = Expression::Binary {
            operator,
            left: Box::new(lit(a)),
            right: Box::new(lit(b)),
        };
        ev.eval(&expr, &ctx).unwrap()
    }

    #[test_case(1, 2, Operator::LessThan => Value::Boolean(true))]
    #[test_case(2, 1, Operator::LessThan => Value::Boolean(false))]
    #[test_case(1, 1, Operator::LessThanOrEqual => Value::Boolean(true))]
    #[test_case(2, 1, Operator::GreaterThan => Value::Boolean(true))]
    #[test_case(1, 1, Operator::Equal => Value::Boolean(true))]
    #[test_case(1, 2, Operator::NotEqual => Value::Boolean(true))]
    fn comparison_table(a: i64, b: i64, operator: Operator) -> Value {
        let ev = Evaluator::new();
        let ctx = EvalContext::new();
        let expr = Expression::Binary {
            operator,
            left: Box::new(lit(a)),
            right: Box::new(lit(b)),
        };
        ev.eval(&expr, &ctx).unwrap()
    }
}
