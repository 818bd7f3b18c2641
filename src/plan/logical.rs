//! Logical plan tree (spec.md §4.5 "LPTNode"): AST → a schema-bearing,
//! operator-independent tree whose node kinds correspond to the algebraic
//! operations spec.md names (`Scan, Expand, Filter, Project, OrderBy, Skip,
//! Take, Join, Distinct, Create, Return`), plus `Call` for the procedure
//! contract (spec.md §4.4, §6 — not in the literal list but required for
//! `getProcedure` to have any caller; see SPEC_FULL.md §8).

use std::sync::Arc;

use crate::graph::{Direction, NodeFilter, RelationshipFilter};
use crate::parser::ast::{
    self, CallClause, CreateClause, DirectionSyntax, PathPattern, Query, ReturnItem, Statement,
};
use crate::parser::ast::Expression;
use crate::plan::ctx::PlanCtx;
use crate::plan::errors::PlanError;
use crate::plan::pretty::PrettyNode;
use crate::value::CypherType;

/// A node awaiting `CREATE`, distinguishing a pattern element that already
/// has a bound identity (reused as an endpoint) from one the statement
/// creates fresh (spec.md §4.4 `createElements`).
#[derive(Debug, Clone)]
pub struct CreateNodeSpec {
    pub alias: String,
    pub is_new: bool,
    pub labels: Vec<String>,
    pub properties: Vec<(String, Expression)>,
}

#[derive(Debug, Clone)]
pub struct CreateRelSpec {
    pub alias: String,
    pub rel_type: Option<String>,
    pub start_alias: String,
    pub end_alias: String,
    pub properties: Vec<(String, Expression)>,
}

#[derive(Debug, Clone)]
pub enum LogicalPlan {
    /// The unit relation: one zero-column row. Base case for `CREATE`/`CALL`
    /// statements with no preceding `MATCH`.
    Empty,
    Scan {
        alias: String,
        filter: NodeFilter,
    },
    Expand {
        input: Arc<LogicalPlan>,
        start_alias: String,
        rel_alias: String,
        rel_filter: RelationshipFilter,
        end_alias: String,
        end_filter: NodeFilter,
        direction: Direction,
    },
    Filter {
        input: Arc<LogicalPlan>,
        predicate: Expression,
    },
    Project {
        input: Arc<LogicalPlan>,
        items: Vec<(String, Expression)>,
    },
    OrderBy {
        input: Arc<LogicalPlan>,
        items: Option<Vec<(String, bool)>>,
    },
    Skip {
        input: Arc<LogicalPlan>,
        n: u64,
    },
    Take {
        input: Arc<LogicalPlan>,
        n: u64,
    },
    Join {
        left: Arc<LogicalPlan>,
        right: Arc<LogicalPlan>,
    },
    Distinct {
        input: Arc<LogicalPlan>,
    },
    Create {
        input: Arc<LogicalPlan>,
        nodes: Vec<CreateNodeSpec>,
        rels: Vec<CreateRelSpec>,
    },
    Return {
        input: Arc<LogicalPlan>,
        distinct: bool,
        items: Vec<(String, Expression)>,
    },
    Call {
        namespace: String,
        name: String,
        args: Vec<Expression>,
    },
}

impl PrettyNode for LogicalPlan {
    fn label(&self) -> String {
        match self {
            LogicalPlan::Empty => "Empty".to_string(),
            LogicalPlan::Scan { alias, filter } => {
                format!("Scan({alias}, labels={:?})", filter.labels)
            }
            LogicalPlan::Expand {
                rel_alias,
                end_alias,
                direction,
                ..
            } => format!("Expand({rel_alias} -> {end_alias}, {direction:?})"),
            LogicalPlan::Filter { .. } => "Filter".to_string(),
            LogicalPlan::Project { items, .. } => {
                format!("Project({} cols)", items.len())
            }
            LogicalPlan::OrderBy { .. } => "OrderBy".to_string(),
            LogicalPlan::Skip { n, .. } => format!("Skip({n})"),
            LogicalPlan::Take { n, .. } => format!("Take({n})"),
            LogicalPlan::Join { .. } => "Join".to_string(),
            LogicalPlan::Distinct { .. } => "Distinct".to_string(),
            LogicalPlan::Create { nodes, rels, .. } => {
                format!("Create({} nodes, {} rels)", nodes.len(), rels.len())
            }
            LogicalPlan::Return { distinct, items, .. } => {
                format!("Return(distinct={distinct}, {} cols)", items.len())
            }
            LogicalPlan::Call { namespace, name, .. } => format!("Call({namespace}.{name})"),
        }
    }

    fn pretty_children(&self) -> Vec<&dyn PrettyNode> {
        match self {
            LogicalPlan::Empty
            | LogicalPlan::Scan { .. }
            | LogicalPlan::Call { .. } => vec![],
            LogicalPlan::Expand { input, .. }
            | LogicalPlan::Filter { input, .. }
            | LogicalPlan::Project { input, .. }
            | LogicalPlan::OrderBy { input, .. }
            | LogicalPlan::Skip { input, .. }
            | LogicalPlan::Take { input, .. }
            | LogicalPlan::Distinct { input, .. }
            | LogicalPlan::Create { input, .. }
            | LogicalPlan::Return { input, .. } => vec![input.as_ref() as &dyn PrettyNode],
            LogicalPlan::Join { left, right } => {
                vec![left.as_ref() as &dyn PrettyNode, right.as_ref() as &dyn PrettyNode]
            }
        }
    }
}

/// Build the logical plan for one parsed statement (spec.md §4.5).
pub fn build(statement: &Statement, ctx: &mut PlanCtx) -> Result<Arc<LogicalPlan>, PlanError> {
    match statement {
        Statement::Call(call) => build_call(call),
        Statement::Query(query) => build_query(query, ctx),
    }
}

fn build_call(call: &CallClause) -> Result<Arc<LogicalPlan>, PlanError> {
    Ok(Arc::new(LogicalPlan::Call {
        namespace: call.namespace.clone(),
        name: call.name.clone(),
        args: call.arguments.clone(),
    }))
}

fn build_query(query: &Query, ctx: &mut PlanCtx) -> Result<Arc<LogicalPlan>, PlanError> {
    let mut plan: Option<Arc<LogicalPlan>> = None;
    for clause in &query.match_clauses {
        let pattern_plan = build_pattern(&clause.pattern, ctx)?;
        plan = Some(match plan {
            None => pattern_plan,
            Some(existing) => Arc::new(LogicalPlan::Join {
                left: existing,
                right: pattern_plan,
            }),
        });
    }
    let mut plan = plan.unwrap_or_else(|| Arc::new(LogicalPlan::Empty));

    if let Some(predicate) = &query.where_clause {
        plan = Arc::new(LogicalPlan::Filter {
            input: plan,
            predicate: predicate.clone(),
        });
    }

    if let Some(create) = &query.create_clause {
        let (nodes, rels) = build_create_spec(create, ctx)?;
        plan = Arc::new(LogicalPlan::Create {
            input: plan,
            nodes,
            rels,
        });
    }

    if let Some(return_clause) = &query.return_clause {
        let items = build_return_items(return_clause, ctx)?;
        plan = Arc::new(LogicalPlan::Return {
            input: plan,
            distinct: return_clause.distinct,
            items,
        });
    }

    if let Some(order_by) = &query.order_by {
        let items = order_by
            .iter()
            .map(|item| (item.column.clone(), item.ascending))
            .collect();
        plan = Arc::new(LogicalPlan::OrderBy {
            input: plan,
            items: Some(items),
        });
    }

    if let Some(skip) = query.skip {
        plan = Arc::new(LogicalPlan::Skip { input: plan, n: skip });
    }

    if let Some(limit) = query.limit {
        plan = Arc::new(LogicalPlan::Take { input: plan, n: limit });
    }

    Ok(plan)
}

fn build_pattern(
    pattern: &PathPattern,
    ctx: &mut PlanCtx,
) -> Result<Arc<LogicalPlan>, PlanError> {
    let start_alias = pattern
        .start
        .variable
        .clone()
        .unwrap_or_else(|| ctx.fresh_alias("n"));
    let start_filter = node_filter(&pattern.start)?;
    ctx.bind(&start_alias, CypherType::Node);
    let mut plan = Arc::new(LogicalPlan::Scan {
        alias: start_alias.clone(),
        filter: start_filter,
    });

    let mut current_alias = start_alias;
    for (rel, node) in &pattern.hops {
        let rel_alias = rel.variable.clone().unwrap_or_else(|| ctx.fresh_alias("r"));
        let end_alias = node.variable.clone().unwrap_or_else(|| ctx.fresh_alias("n"));
        let rel_filter = relationship_filter(rel)?;
        let end_filter = node_filter(node)?;
        let direction: Direction = rel.direction.into();

        ctx.bind(&rel_alias, CypherType::Relationship);
        ctx.bind(&end_alias, CypherType::Node);

        plan = Arc::new(LogicalPlan::Expand {
            input: plan,
            start_alias: current_alias,
            rel_alias,
            rel_filter,
            end_alias: end_alias.clone(),
            end_filter,
            direction,
        });
        current_alias = end_alias;
    }

    Ok(plan)
}

fn node_filter(pattern: &ast::NodePattern) -> Result<NodeFilter, PlanError> {
    let mut filter = NodeFilter::new();
    filter.labels = pattern.labels.clone();
    for (key, expr) in &pattern.properties {
        filter.properties.insert(key.clone(), literal_value(expr)?);
    }
    Ok(filter)
}

fn relationship_filter(pattern: &ast::RelationshipPattern) -> Result<RelationshipFilter, PlanError> {
    let mut filter = RelationshipFilter::new();
    filter.types = pattern.types.clone();
    for (key, expr) in &pattern.properties {
        filter.properties.insert(key.clone(), literal_value(expr)?);
    }
    Ok(filter)
}

/// Property maps in patterns are constant-equality filters (spec.md §3
/// `NodeFilter`/`RelationshipFilter`); only literals are supported there —
/// the logical planner cannot lower a pattern property bound to a
/// row-dependent expression (spec.md §4.6 `PlanError`).
fn literal_value(expr: &Expression) -> Result<crate::value::Value, PlanError> {
    match expr {
        Expression::Literal(lit) => Ok(match lit {
            ast::Literal::Integer(i) => crate::value::Value::Integer(*i),
            ast::Literal::Float(f) => crate::value::Value::Float(*f),
            ast::Literal::Boolean(b) => crate::value::Value::Boolean(*b),
            ast::Literal::String(s) => crate::value::Value::String(s.clone()),
            ast::Literal::Null => crate::value::Value::Null,
        }),
        other => Err(PlanError::Unsupported(format!(
            "pattern property must be a literal, got {other:?}"
        ))),
    }
}

fn build_create_spec(
    create: &CreateClause,
    ctx: &mut PlanCtx,
) -> Result<(Vec<CreateNodeSpec>, Vec<CreateRelSpec>), PlanError> {
    let mut nodes = Vec::new();
    let mut rels = Vec::new();

    let start_alias = create
        .pattern
        .start
        .variable
        .clone()
        .unwrap_or_else(|| ctx.fresh_alias("n"));
    let start_is_new = !ctx.is_bound(&start_alias);
    if start_is_new {
        ctx.bind(&start_alias, CypherType::Node);
    }
    nodes.push(CreateNodeSpec {
        alias: start_alias.clone(),
        is_new: start_is_new,
        labels: create.pattern.start.labels.clone(),
        properties: create.pattern.start.properties.clone(),
    });

    let mut current_alias = start_alias;
    for (rel, node) in &create.pattern.hops {
        let rel_alias = rel.variable.clone().unwrap_or_else(|| ctx.fresh_alias("r"));
        let end_alias = node.variable.clone().unwrap_or_else(|| ctx.fresh_alias("n"));
        let end_is_new = !ctx.is_bound(&end_alias);
        if end_is_new {
            ctx.bind(&end_alias, CypherType::Node);
        }
        ctx.bind(&rel_alias, CypherType::Relationship);

        let rel_type = rel.types.first().cloned();
        let (start_of_rel, end_of_rel) = match rel.direction {
            DirectionSyntax::Left => (end_alias.clone(), current_alias.clone()),
            _ => (current_alias.clone(), end_alias.clone()),
        };

        nodes.push(CreateNodeSpec {
            alias: end_alias.clone(),
            is_new: end_is_new,
            labels: node.labels.clone(),
            properties: node.properties.clone(),
        });
        rels.push(CreateRelSpec {
            alias: rel_alias,
            rel_type,
            start_alias: start_of_rel,
            end_alias: end_of_rel,
            properties: rel.properties.clone(),
        });
        current_alias = end_alias;
    }

    Ok((nodes, rels))
}

fn build_return_items(
    clause: &ast::ReturnClause,
    ctx: &PlanCtx,
) -> Result<Vec<(String, Expression)>, PlanError> {
    let mut items = Vec::new();
    for item in &clause.items {
        match item {
            ReturnItem::Star => {
                for name in ctx.bound_variables() {
                    items.push((name.clone(), Expression::Variable(name.clone())));
                }
            }
            ReturnItem::Expr { expression, alias } => {
                let name = alias.clone().unwrap_or_else(|| default_name(expression));
                items.push((name, expression.clone()));
            }
        }
    }
    Ok(items)
}

/// Default column name for an unaliased `RETURN` expression: the variable
/// name for a bare variable, `base.key` for a property access, otherwise a
/// positional placeholder (spec.md §4.3 "alias when present").
fn default_name(expr: &Expression) -> String {
    match expr {
        Expression::Variable(name) => name.clone(),
        Expression::PropertyAccess { base, key } => format!("{}.{key}", default_name(base)),
        _ => "expr".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::QueryParser;

    fn build_for(query: &str) -> Arc<LogicalPlan> {
        let parser = QueryParser::default();
        let parsed = parser.parse(query).unwrap();
        let mut ctx = PlanCtx::new();
        build(&parsed.statement, &mut ctx).unwrap()
    }

    #[test]
    fn round_trip_pattern_lowers_to_scan_expand_return() {
        let plan = build_for("MATCH (a)-[r]->(b) RETURN a, r, b");
        match plan.as_ref() {
            LogicalPlan::Return { input, items, .. } => {
                assert_eq!(items.len(), 3);
                match input.as_ref() {
                    LogicalPlan::Expand { input, .. } => {
                        assert!(matches!(input.as_ref(), LogicalPlan::Scan { .. }));
                    }
                    other => panic!("expected Expand, got {other:?}"),
                }
            }
            other => panic!("expected Return, got {other:?}"),
        }
    }

    #[test]
    fn where_clause_wraps_in_filter() {
        let plan = build_for("MATCH (n:Person) WHERE n.name = 'x' RETURN n");
        match plan.as_ref() {
            LogicalPlan::Return { input, .. } => {
                assert!(matches!(input.as_ref(), LogicalPlan::Filter { .. }));
            }
            other => panic!("expected Return, got {other:?}"),
        }
    }

    #[test]
    fn multiple_match_clauses_join() {
        let plan = build_for("MATCH (a) MATCH (b) RETURN a, b");
        match plan.as_ref() {
            LogicalPlan::Return { input, .. } => {
                assert!(matches!(input.as_ref(), LogicalPlan::Join { .. }));
            }
            other => panic!("expected Return, got {other:?}"),
        }
    }

    #[test]
    fn return_star_expands_bound_variables_in_order() {
        let plan = build_for("MATCH (a)-[r]->(b) RETURN *");
        match plan.as_ref() {
            LogicalPlan::Return { items, .. } => {
                let names: Vec<&str> = items.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["a", "r", "b"]);
            }
            other => panic!("expected Return, got {other:?}"),
        }
    }
}
