//! The data frame operator algebra (spec.md §4.3).
//!
//! Grouped into one zero-sized [`DataFrameOperator`] so a `Runner` can hold
//! a single shared, stateless collaborator (spec.md Design Note 9), mirroring
//! how the evaluator is shared. All operators are lazy except where spec.md
//! §5 explicitly allows buffering (`distinct`, `orderBy`, `join`'s small
//! side); `cache()` lives on `DataFrame` itself.

use std::collections::HashMap;

use crate::eval::{EvalContext, Evaluator};
use crate::frame::{DataFrame, Row, Schema, SchemaError};
use crate::parser::ast::Expression;
use crate::value::{CypherType, Value};

#[derive(Debug, Default, Clone, Copy)]
pub struct DataFrameOperator;

impl DataFrameOperator {
    pub fn new() -> Self {
        DataFrameOperator
    }

    /// Rename/reorder columns, preserving source types (spec.md §4.3).
    pub fn select(
        &self,
        df: &DataFrame,
        columns: Vec<(String, Option<String>)>,
    ) -> Result<DataFrame, SchemaError> {
        let mut positions = Vec::with_capacity(columns.len());
        let mut out_columns = Vec::with_capacity(columns.len());
        for (source, alias) in &columns {
            let pos = df
                .schema()
                .position(source)
                .ok_or_else(|| SchemaError::UnknownColumn(source.clone()))?;
            let ty = df.schema().columns()[pos].1.clone();
            let name = alias.clone().unwrap_or_else(|| source.clone());
            positions.push(pos);
            out_columns.push((name, ty));
        }
        let schema = Schema::new(out_columns)?;
        let base = df.clone();
        Ok(DataFrame::new(schema, move || {
            let positions = positions.clone();
            Box::new(
                base.records()
                    .map(move |row| positions.iter().map(|&i| row[i].clone()).collect()),
            )
        }))
    }

    /// Evaluate `exprs` per row against `ctx` extended with that row's column
    /// bindings (spec.md §4.3).
    pub fn project(
        &self,
        df: &DataFrame,
        exprs: Vec<(String, Expression)>,
        evaluator: Evaluator,
        ctx: EvalContext,
    ) -> DataFrame {
        let schema_types: HashMap<String, CypherType> = df
            .schema()
            .columns()
            .iter()
            .map(|(n, t)| (n.clone(), t.clone()))
            .collect();
        let out_columns: Vec<(String, CypherType)> = exprs
            .iter()
            .map(|(name, expr)| (name.clone(), evaluator.type_of(expr, &schema_types)))
            .collect();
        let schema = Schema::new(out_columns).expect("projection produces unique column names");
        let base = df.clone();
        let base_names: Vec<String> = df.schema().names().map(|s| s.to_string()).collect();
        DataFrame::new(schema, move || {
            let exprs = exprs.clone();
            let base_names = base_names.clone();
            let ctx = ctx.clone();
            Box::new(base.records().map(move |row| {
                let mut row_ctx = ctx.clone();
                for (name, value) in base_names.iter().zip(row.iter()) {
                    row_ctx.variables.insert(name.clone(), value.clone());
                }
                exprs
                    .iter()
                    .map(|(_, expr)| evaluator.eval(expr, &row_ctx).unwrap_or(Value::Null))
                    .collect()
            }))
        })
    }

    /// Keep rows for which `predicate` is true (not null, not false); null
    /// and false are indistinguishable to downstream operators (spec.md §4.3).
    pub fn filter(
        &self,
        df: &DataFrame,
        predicate: Expression,
        evaluator: Evaluator,
        ctx: EvalContext,
    ) -> DataFrame {
        let schema = df.schema().clone();
        let base = df.clone();
        let base_names: Vec<String> = df.schema().names().map(|s| s.to_string()).collect();
        DataFrame::new(schema, move || {
            let predicate = predicate.clone();
            let base_names = base_names.clone();
            let ctx = ctx.clone();
            Box::new(base.records().filter(move |row| {
                let mut row_ctx = ctx.clone();
                for (name, value) in base_names.iter().zip(row.iter()) {
                    row_ctx.variables.insert(name.clone(), value.clone());
                }
                matches!(
                    evaluator.eval(&predicate, &row_ctx),
                    Ok(value) if value.as_truth() == Some(true)
                )
            }))
        })
    }

    /// Drop the first `n` rows; skipping past the end yields empty (spec.md §4.3).
    pub fn skip(&self, df: &DataFrame, n: u64) -> DataFrame {
        let schema = df.schema().clone();
        let base = df.clone();
        DataFrame::new(schema, move || Box::new(base.records().skip(n as usize)))
    }

    /// Keep the first `n` rows; `take(0)` yields empty, `take` beyond size
    /// yields all (spec.md §4.3).
    pub fn take(&self, df: &DataFrame, n: u64) -> DataFrame {
        let schema = df.schema().clone();
        let base = df.clone();
        DataFrame::new(schema, move || Box::new(base.records().take(n as usize)))
    }

    /// Emit each distinct row once, preserving first-occurrence order
    /// (spec.md §4.3). Buffers (spec.md §5).
    pub fn distinct(&self, df: &DataFrame) -> DataFrame {
        let schema = df.schema().clone();
        let base = df.clone();
        DataFrame::new(schema, move || {
            let mut seen: Vec<Row> = Vec::new();
            let rows: Vec<Row> = base
                .records()
                .filter(|row| {
                    let is_new = !seen.iter().any(|existing| existing == row);
                    if is_new {
                        seen.push(row.clone());
                    }
                    is_new
                })
                .collect();
            Box::new(rows.into_iter())
        })
    }

    /// Stable sort over `items` (spec.md §4.3). `None` orders by all columns
    /// ascending. `Null` sorts greater than any non-null value ascending
    /// (documented choice, spec.md Open Question (a)).
    pub fn order_by(&self, df: &DataFrame, items: Option<Vec<(String, bool)>>) -> DataFrame {
        let schema = df.schema().clone();
        let keys: Vec<(usize, bool)> = match &items {
            Some(items) => items
                .iter()
                .map(|(name, asc)| {
                    let pos = df
                        .schema()
                        .position(name)
                        .expect("orderBy column must exist in schema");
                    (pos, *asc)
                })
                .collect(),
            None => (0..df.schema().len()).map(|i| (i, true)).collect(),
        };
        let base = df.clone();
        DataFrame::new(schema, move || {
            let mut rows: Vec<Row> = base.records().collect();
            let keys = keys.clone();
            rows.sort_by(|a, b| compare_rows(a, b, &keys));
            Box::new(rows.into_iter())
        })
    }

    /// Inner equi-join on the intersection of column names (spec.md §4.3).
    /// The smaller side is hashed; relationship identity must not repeat
    /// across two positions of a result row.
    pub fn join(&self, a: &DataFrame, b: &DataFrame) -> Result<DataFrame, SchemaError> {
        let join_cols: Vec<String> = a
            .schema()
            .names()
            .filter(|name| b.schema().position(name).is_some())
            .map(|s| s.to_string())
            .collect();

        let a_rows: Vec<Row> = a.records().collect();
        let b_rows: Vec<Row> = b.records().collect();
        let (small_schema, small_rows, large_schema, large_rows, small_is_a) =
            if a_rows.len() <= b_rows.len() {
                (a.schema().clone(), a_rows, b.schema().clone(), b_rows, true)
            } else {
                (b.schema().clone(), b_rows, a.schema().clone(), a_rows, false)
            };

        let small_positions: Vec<usize> = join_cols
            .iter()
            .map(|c| small_schema.position(c).expect("join column present"))
            .collect();
        let large_positions: Vec<usize> = join_cols
            .iter()
            .map(|c| large_schema.position(c).expect("join column present"))
            .collect();
        let large_extra: Vec<usize> = (0..large_schema.len())
            .filter(|i| !large_positions.contains(i))
            .collect();

        let mut out_columns: Vec<(String, CypherType)> = small_schema.columns().to_vec();
        for &i in &large_extra {
            out_columns.push(large_schema.columns()[i].clone());
        }
        let schema = Schema::new(out_columns)?;

        let mut hash: HashMap<String, Vec<Row>> = HashMap::new();
        for row in &small_rows {
            let key = row_key(row, &small_positions);
            hash.entry(key).or_default().push(row.clone());
        }

        let large_positions_cl = large_positions.clone();
        let large_extra_cl = large_extra.clone();
        // small_is_a only affects which side was hashed, not the resulting
        // schema shape (small ++ large-minus-joinCols always holds).
        let _ = small_is_a;
        let frame = DataFrame::new(schema, move || {
            let hash = hash.clone();
            let large_rows = large_rows.clone();
            let large_positions = large_positions_cl.clone();
            let large_extra = large_extra_cl.clone();
            Box::new(
                large_rows
                    .into_iter()
                    .flat_map(move |large_row| {
                        let key = row_key(&large_row, &large_positions);
                        let matches = hash.get(&key).cloned().unwrap_or_default();
                        let large_extra = large_extra.clone();
                        matches.into_iter().map(move |small_row| {
                            let mut out = small_row.clone();
                            for &i in &large_extra {
                                out.push(large_row[i].clone());
                            }
                            out
                        })
                    })
                    .filter(|row| !has_duplicate_relationship(row)),
            )
        });
        Ok(frame)
    }
}

fn compare_rows(a: &Row, b: &Row, keys: &[(usize, bool)]) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    for &(pos, ascending) in keys {
        let ordering = compare_values_nulls_last(&a[pos], &b[pos]);
        let ordering = if ascending { ordering } else { ordering.reverse() };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_values_nulls_last(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
    }
}

fn row_key(row: &Row, positions: &[usize]) -> String {
    positions
        .iter()
        .map(|&i| value_key(&row[i]))
        .collect::<Vec<_>>()
        .join("\u{1}")
}

fn value_key(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Boolean(b) => format!("b:{b}"),
        Value::Integer(i) => format!("n:{}", *i as f64),
        Value::Float(f) => format!("n:{f}"),
        Value::String(s) => format!("s:{s}"),
        Value::List(items) => format!(
            "l:[{}]",
            items.iter().map(value_key).collect::<Vec<_>>().join(",")
        ),
        Value::Map(map) => format!(
            "m:{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{k}={}", value_key(v)))
                .collect::<Vec<_>>()
                .join(",")
        ),
        Value::Node(n) => format!("node:{}", n.id),
        Value::Relationship(r) => format!("rel:{}", r.id),
        Value::Path(triples) => format!("path:{}", triples.len()),
    }
}

fn has_duplicate_relationship(row: &Row) -> bool {
    let mut seen = std::collections::HashSet::new();
    for value in row {
        if let Some(id) = value.relationship_id() {
            if !seen.insert(id) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{Literal, Operator};

    fn frame(columns: Vec<(&str, CypherType)>, rows: Vec<Row>) -> DataFrame {
        let schema = Schema::new(
            columns
                .into_iter()
                .map(|(n, t)| (n.to_string(), t))
                .collect(),
        )
        .unwrap();
        DataFrame::new(schema, move || Box::new(rows.clone().into_iter()))
    }

    #[test]
    fn skip_and_take_match_slicing() {
        let op = DataFrameOperator::new();
        let df = frame(
            vec![("n", CypherType::Integer)],
            (0..5).map(|i| vec![Value::Integer(i)]).collect(),
        );
        let sliced: Vec<Row> = op.take(&op.skip(&df, 1), 2).records().collect();
        assert_eq!(
            sliced,
            vec![vec![Value::Integer(1)], vec![Value::Integer(2)]]
        );
    }

    #[test]
    fn take_zero_yields_empty() {
        let op = DataFrameOperator::new();
        let df = frame(vec![("n", CypherType::Integer)], vec![vec![Value::Integer(1)]]);
        assert_eq!(op.take(&df, 0).records().count(), 0);
    }

    #[test]
    fn distinct_preserves_first_occurrence_order() {
        let op = DataFrameOperator::new();
        let df = frame(
            vec![("n", CypherType::Integer)],
            vec![
                vec![Value::Integer(1)],
                vec![Value::Integer(2)],
                vec![Value::Integer(1)],
            ],
        );
        let rows: Vec<Row> = op.distinct(&df).records().collect();
        assert_eq!(rows, vec![vec![Value::Integer(1)], vec![Value::Integer(2)]]);
    }

    #[test]
    fn order_by_is_stable_and_total() {
        let op = DataFrameOperator::new();
        let df = frame(
            vec![("label", CypherType::String), ("rank", CypherType::Integer)],
            vec![
                vec![Value::String("a".into()), Value::Integer(1)],
                vec![Value::String("b".into()), Value::Integer(1)],
                vec![Value::String("c".into()), Value::Integer(1)],
            ],
        );
        let sorted: Vec<Row> = op
            .order_by(&df, Some(vec![("rank".to_string(), true)]))
            .records()
            .collect();
        let labels: Vec<&str> = sorted.iter().map(|r| r[0].as_str().unwrap()).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
    }

    #[test]
    fn order_by_sorts_null_greater_than_non_null_ascending() {
        let op = DataFrameOperator::new();
        let df = frame(
            vec![("n", CypherType::Integer)],
            vec![
                vec![Value::Null],
                vec![Value::Integer(1)],
                vec![Value::Integer(0)],
            ],
        );
        let sorted: Vec<Row> = op
            .order_by(&df, Some(vec![("n".to_string(), true)]))
            .records()
            .collect();
        assert_eq!(
            sorted,
            vec![
                vec![Value::Integer(0)],
                vec![Value::Integer(1)],
                vec![Value::Null],
            ]
        );
    }

    #[test]
    fn filter_drops_null_and_false_identically() {
        let op = DataFrameOperator::new();
        let df = frame(
            vec![("n", CypherType::Integer)],
            vec![vec![Value::Integer(1)], vec![Value::Integer(2)]],
        );
        let predicate = Expression::Binary {
            operator: Operator::Equal,
            left: Box::new(Expression::Variable("n".to_string())),
            right: Box::new(Expression::Literal(Literal::Integer(1))),
        };
        let filtered: Vec<Row> = op
            .filter(&df, predicate, Evaluator::new(), EvalContext::new())
            .records()
            .collect();
        assert_eq!(filtered, vec![vec![Value::Integer(1)]]);
    }

    #[test]
    fn join_on_shared_columns_produces_small_plus_large_minus_join_cols() {
        let op = DataFrameOperator::new();
        let a = frame(
            vec![("id", CypherType::Integer), ("name", CypherType::String)],
            vec![vec![Value::Integer(1), Value::String("alice".into())]],
        );
        let b = frame(
            vec![("id", CypherType::Integer), ("age", CypherType::Integer)],
            vec![
                vec![Value::Integer(1), Value::Integer(30)],
                vec![Value::Integer(2), Value::Integer(40)],
            ],
        );
        let joined = op.join(&a, &b).unwrap();
        let rows: Vec<Row> = joined.records().collect();
        assert_eq!(
            rows,
            vec![vec![
                Value::Integer(1),
                Value::String("alice".into()),
                Value::Integer(30)
            ]]
        );
    }

    #[test]
    fn join_drops_rows_with_repeated_relationship_identity() {
        use crate::graph::{NodeId, RelId, Relationship};
        use std::collections::BTreeMap;

        let op = DataFrameOperator::new();
        let rel = |id: u64| {
            Value::Relationship(Relationship {
                id: RelId(id),
                rel_type: Some("KNOWS".to_string()),
                start_node_id: NodeId(1),
                end_node_id: NodeId(2),
                properties: BTreeMap::new(),
            })
        };

        let a = frame(
            vec![("mid", CypherType::Integer), ("r1", CypherType::Relationship)],
            vec![vec![Value::Integer(1), rel(10)]],
        );
        let b = frame(
            vec![("mid", CypherType::Integer), ("r2", CypherType::Relationship)],
            vec![
                vec![Value::Integer(1), rel(10)],
                vec![Value::Integer(1), rel(20)],
            ],
        );
        let joined = op.join(&a, &b).unwrap();
        let rows: Vec<Row> = joined.records().collect();
        assert_eq!(rows.len(), 1);
    }
}
