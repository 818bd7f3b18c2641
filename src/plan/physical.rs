//! Physical plan tree (spec.md §4.6 "PPTNode"): lowers each logical node to
//! a concrete node that knows how to `execute(ctx) → DataFrame`. Scans bind
//! to `GraphModel::nodes`/`relationships`/`expand`; filter nodes wrap the
//! evaluator; join nodes dispatch to `DataFrameOperator::join` (spec.md §4.6).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::eval::{EvalContext, Evaluator};
use crate::frame::operators::DataFrameOperator;
use crate::frame::{DataFrame, Row, Schema};
use crate::graph::{
    CreatedElements, Direction, GraphModel, NewEndpoint, NewNode, NewRelationship, NodeFilter,
    NodeId, RelationshipFilter,
};
use crate::parser::ast::Expression;
use crate::plan::ctx::PlanCtx;
use crate::plan::errors::PlanError;
use crate::plan::logical::{CreateNodeSpec, CreateRelSpec, LogicalPlan};
use crate::plan::pretty::PrettyNode;
use crate::value::{CypherType, Value};

/// The graph model, shared read-write across plans of one `Runner`
/// (spec.md §5 "the graph model's own thread-safety is the host's
/// responsibility" — a `Mutex` gives the minimal safe default here).
pub type SharedGraphModel = Arc<Mutex<dyn GraphModel + Send>>;

/// Everything a physical node needs to execute, threaded explicitly rather
/// than through an implicit/thread-local context (spec.md Design Note
/// "Implicit planner context").
#[derive(Clone)]
pub struct ExecCtx {
    pub graph: SharedGraphModel,
    pub evaluator: Evaluator,
    pub operator: DataFrameOperator,
    pub eval_ctx: EvalContext,
}

#[derive(Debug, Clone)]
pub enum PhysicalPlan {
    Empty,
    Scan {
        alias: String,
        filter: NodeFilter,
    },
    Expand {
        input: Arc<PhysicalPlan>,
        start_alias: String,
        rel_alias: String,
        rel_filter: RelationshipFilter,
        end_alias: String,
        end_filter: NodeFilter,
        direction: Direction,
    },
    Filter {
        input: Arc<PhysicalPlan>,
        predicate: Expression,
    },
    Project {
        input: Arc<PhysicalPlan>,
        items: Vec<(String, Expression)>,
    },
    OrderBy {
        input: Arc<PhysicalPlan>,
        items: Option<Vec<(String, bool)>>,
    },
    Skip {
        input: Arc<PhysicalPlan>,
        n: u64,
    },
    Take {
        input: Arc<PhysicalPlan>,
        n: u64,
    },
    Join {
        left: Arc<PhysicalPlan>,
        right: Arc<PhysicalPlan>,
    },
    Distinct {
        input: Arc<PhysicalPlan>,
    },
    Create {
        input: Arc<PhysicalPlan>,
        nodes: Vec<CreateNodeSpec>,
        rels: Vec<CreateRelSpec>,
    },
    Call {
        namespace: String,
        name: String,
        args: Vec<Expression>,
    },
}

impl PrettyNode for PhysicalPlan {
    fn label(&self) -> String {
        match self {
            PhysicalPlan::Empty => "Empty".to_string(),
            PhysicalPlan::Scan { alias, filter } => {
                format!("Scan({alias}, labels={:?})", filter.labels)
            }
            PhysicalPlan::Expand {
                rel_alias,
                end_alias,
                direction,
                ..
            } => format!("Expand({rel_alias} -> {end_alias}, {direction:?})"),
            PhysicalPlan::Filter { .. } => "Filter".to_string(),
            PhysicalPlan::Project { items, .. } => format!("Project({} cols)", items.len()),
            PhysicalPlan::OrderBy { .. } => "OrderBy".to_string(),
            PhysicalPlan::Skip { n, .. } => format!("Skip({n})"),
            PhysicalPlan::Take { n, .. } => format!("Take({n})"),
            PhysicalPlan::Join { .. } => "Join".to_string(),
            PhysicalPlan::Distinct { .. } => "Distinct".to_string(),
            PhysicalPlan::Create { nodes, rels, .. } => {
                format!("Create({} nodes, {} rels)", nodes.len(), rels.len())
            }
            PhysicalPlan::Call { namespace, name, .. } => format!("Call({namespace}.{name})"),
        }
    }

    fn pretty_children(&self) -> Vec<&dyn PrettyNode> {
        match self {
            PhysicalPlan::Empty | PhysicalPlan::Scan { .. } | PhysicalPlan::Call { .. } => vec![],
            PhysicalPlan::Expand { input, .. }
            | PhysicalPlan::Filter { input, .. }
            | PhysicalPlan::Project { input, .. }
            | PhysicalPlan::OrderBy { input, .. }
            | PhysicalPlan::Skip { input, .. }
            | PhysicalPlan::Take { input, .. }
            | PhysicalPlan::Distinct { input, .. }
            | PhysicalPlan::Create { input, .. } => vec![input.as_ref() as &dyn PrettyNode],
            PhysicalPlan::Join { left, right } => {
                vec![left.as_ref() as &dyn PrettyNode, right.as_ref() as &dyn PrettyNode]
            }
        }
    }
}

/// Lower a logical node into its physical counterpart (spec.md §4.6). The
/// reduced grammar's node kinds are already close to operator shape, so
/// lowering here is mostly structural copying plus `Return` splitting into
/// its physical primitives (`Project`, optionally wrapped in `Distinct`).
pub fn lower(logical: &LogicalPlan, ctx: &mut PlanCtx) -> Result<Arc<PhysicalPlan>, PlanError> {
    let _ = ctx; // reserved for future cost-aware lowering decisions
    let physical = match logical {
        LogicalPlan::Empty => PhysicalPlan::Empty,
        LogicalPlan::Scan { alias, filter } => PhysicalPlan::Scan {
            alias: alias.clone(),
            filter: filter.clone(),
        },
        LogicalPlan::Expand {
            input,
            start_alias,
            rel_alias,
            rel_filter,
            end_alias,
            end_filter,
            direction,
        } => PhysicalPlan::Expand {
            input: lower(input, ctx)?,
            start_alias: start_alias.clone(),
            rel_alias: rel_alias.clone(),
            rel_filter: rel_filter.clone(),
            end_alias: end_alias.clone(),
            end_filter: end_filter.clone(),
            direction: *direction,
        },
        LogicalPlan::Filter { input, predicate } => PhysicalPlan::Filter {
            input: lower(input, ctx)?,
            predicate: predicate.clone(),
        },
        LogicalPlan::Project { input, items } => PhysicalPlan::Project {
            input: lower(input, ctx)?,
            items: items.clone(),
        },
        LogicalPlan::OrderBy { input, items } => PhysicalPlan::OrderBy {
            input: lower(input, ctx)?,
            items: items.clone(),
        },
        LogicalPlan::Skip { input, n } => PhysicalPlan::Skip {
            input: lower(input, ctx)?,
            n: *n,
        },
        LogicalPlan::Take { input, n } => PhysicalPlan::Take {
            input: lower(input, ctx)?,
            n: *n,
        },
        LogicalPlan::Join { left, right } => PhysicalPlan::Join {
            left: lower(left, ctx)?,
            right: lower(right, ctx)?,
        },
        LogicalPlan::Distinct { input } => PhysicalPlan::Distinct {
            input: lower(input, ctx)?,
        },
        LogicalPlan::Create { input, nodes, rels } => PhysicalPlan::Create {
            input: lower(input, ctx)?,
            nodes: nodes.clone(),
            rels: rels.clone(),
        },
        LogicalPlan::Return {
            input,
            distinct,
            items,
        } => {
            let projected = PhysicalPlan::Project {
                input: lower(input, ctx)?,
                items: items.clone(),
            };
            if *distinct {
                PhysicalPlan::Distinct {
                    input: Arc::new(projected),
                }
            } else {
                projected
            }
        }
        LogicalPlan::Call { namespace, name, args } => PhysicalPlan::Call {
            namespace: namespace.clone(),
            name: name.clone(),
            args: args.clone(),
        },
    };
    Ok(Arc::new(physical))
}

impl PhysicalPlan {
    /// The schema this node produces, computable without executing it
    /// (spec.md §3 invariant 1).
    pub fn schema(&self, exec: &ExecCtx) -> Result<Schema, PlanError> {
        match self {
            PhysicalPlan::Empty => Ok(Schema::new(vec![])?),
            PhysicalPlan::Scan { alias, .. } => {
                Ok(Schema::new(vec![(alias.clone(), CypherType::Node)])?)
            }
            PhysicalPlan::Expand {
                input,
                rel_alias,
                end_alias,
                ..
            } => {
                let mut cols = input.schema(exec)?.columns().to_vec();
                cols.push((rel_alias.clone(), CypherType::Relationship));
                cols.push((end_alias.clone(), CypherType::Node));
                Ok(Schema::new(cols)?)
            }
            PhysicalPlan::Filter { input, .. } => input.schema(exec),
            PhysicalPlan::Project { input, items } => {
                let schema_map = schema_type_map(&input.schema(exec)?);
                let cols = items
                    .iter()
                    .map(|(name, expr)| (name.clone(), exec.evaluator.type_of(expr, &schema_map)))
                    .collect();
                Ok(Schema::new(cols)?)
            }
            PhysicalPlan::OrderBy { input, .. }
            | PhysicalPlan::Skip { input, .. }
            | PhysicalPlan::Take { input, .. }
            | PhysicalPlan::Distinct { input, .. } => input.schema(exec),
            PhysicalPlan::Join { left, right } => {
                let left_schema = left.schema(exec)?;
                let right_schema = right.schema(exec)?;
                let mut cols = left_schema.columns().to_vec();
                for (name, ty) in right_schema.columns() {
                    if left_schema.position(name).is_none() {
                        cols.push((name.clone(), ty.clone()));
                    }
                }
                Ok(Schema::new(cols)?)
            }
            PhysicalPlan::Create { input, nodes, rels } => {
                let mut cols = input.schema(exec)?.columns().to_vec();
                for node in nodes.iter().filter(|n| n.is_new) {
                    cols.push((node.alias.clone(), CypherType::Node));
                }
                for rel in rels {
                    cols.push((rel.alias.clone(), CypherType::Relationship));
                }
                Ok(Schema::new(cols)?)
            }
            PhysicalPlan::Call { namespace, name, .. } => {
                let guard = exec.graph.lock().expect("graph model mutex poisoned");
                let procedure = guard.get_procedure(namespace, name).ok_or_else(|| {
                    PlanError::UnknownProcedure {
                        namespace: namespace.clone(),
                        name: name.clone(),
                    }
                })?;
                Ok(Schema::new(procedure.signature().outputs.clone())?)
            }
        }
    }

    /// Materialize this node into a `DataFrame` (spec.md §4.6 `execute(ctx)
    /// → DataFrame`).
    pub fn execute(&self, exec: &ExecCtx) -> Result<DataFrame, crate::error::EngineError> {
        match self {
            PhysicalPlan::Empty => {
                let schema = Schema::new(vec![])?;
                Ok(DataFrame::new(schema, || {
                    Box::new(std::iter::once(Vec::new()))
                }))
            }
            PhysicalPlan::Scan { alias, filter } => {
                let schema = self.schema(exec)?;
                let graph = Arc::clone(&exec.graph);
                let filter = filter.clone();
                let _ = alias;
                Ok(DataFrame::new(schema, move || {
                    let guard = graph.lock().expect("graph model mutex poisoned");
                    let rows: Vec<Row> = guard
                        .nodes_filtered(&filter)
                        .map(|n| vec![Value::Node(n)])
                        .collect();
                    Box::new(rows.into_iter())
                }))
            }
            PhysicalPlan::Expand {
                input,
                start_alias,
                rel_alias: _,
                rel_filter,
                end_alias: _,
                end_filter,
                direction,
            } => {
                let base = input.execute(exec)?;
                let base_schema = base.schema().clone();
                let start_pos = base_schema
                    .position(start_alias)
                    .ok_or_else(|| PlanError::UnknownVariable(start_alias.clone()))?;
                let schema = self.schema(exec)?;
                let graph = Arc::clone(&exec.graph);
                let rel_filter = rel_filter.clone();
                let end_filter = end_filter.clone();
                let direction = *direction;
                Ok(DataFrame::new(schema, move || {
                    let graph = Arc::clone(&graph);
                    let rel_filter = rel_filter.clone();
                    let end_filter = end_filter.clone();
                    let rows: Vec<Row> = base
                        .records()
                        .flat_map(|row| expand_row(&graph, row, start_pos, direction, &rel_filter, &end_filter))
                        .collect();
                    Box::new(rows.into_iter())
                }))
            }
            PhysicalPlan::Filter { input, predicate } => {
                let base = input.execute(exec)?;
                Ok(exec
                    .operator
                    .filter(&base, predicate.clone(), exec.evaluator, exec.eval_ctx.clone()))
            }
            PhysicalPlan::Project { input, items } => {
                let base = input.execute(exec)?;
                Ok(exec.operator.project(
                    &base,
                    items.clone(),
                    exec.evaluator,
                    exec.eval_ctx.clone(),
                ))
            }
            PhysicalPlan::OrderBy { input, items } => {
                let base = input.execute(exec)?;
                Ok(exec.operator.order_by(&base, items.clone()))
            }
            PhysicalPlan::Skip { input, n } => {
                let base = input.execute(exec)?;
                Ok(exec.operator.skip(&base, *n))
            }
            PhysicalPlan::Take { input, n } => {
                let base = input.execute(exec)?;
                Ok(exec.operator.take(&base, *n))
            }
            PhysicalPlan::Distinct { input } => {
                let base = input.execute(exec)?;
                Ok(exec.operator.distinct(&base))
            }
            PhysicalPlan::Join { left, right } => {
                let left_df = left.execute(exec)?;
                let right_df = right.execute(exec)?;
                Ok(exec.operator.join(&left_df, &right_df)?)
            }
            PhysicalPlan::Create { input, nodes, rels } => {
                execute_create(input.as_ref(), nodes, rels, exec)
            }
            PhysicalPlan::Call { namespace, name, args } => execute_call(namespace, name, args, exec),
        }
    }
}

/// Expand one row by one hop, excluding any relationship already bound
/// earlier in the same row (Cypher's "no repeated relationship" pattern
/// rule, spec.md §8 invariant 5 / Scenario S4 — distinct from `join`'s
/// own dedup, since a single chained `MATCH` pattern lowers to nested
/// `Expand` rather than a `Join`).
fn expand_row(
    graph: &SharedGraphModel,
    row: Row,
    start_pos: usize,
    direction: Direction,
    rel_filter: &RelationshipFilter,
    end_filter: &NodeFilter,
) -> Vec<Row> {
    let node_id = match &row[start_pos] {
        Value::Node(n) => n.id,
        _ => return Vec::new(),
    };
    let seen_rel_ids: HashSet<_> = row.iter().filter_map(Value::relationship_id).collect();
    let guard = graph.lock().expect("graph model mutex poisoned");
    let triples: Vec<_> = match guard.expand_filtered(node_id, direction, rel_filter, end_filter) {
        Ok(iter) => iter
            .filter(|triple| !seen_rel_ids.contains(&triple.relationship.id))
            .collect(),
        Err(_) => Vec::new(),
    };
    drop(guard);
    triples
        .into_iter()
        .map(|triple| {
            let mut out = row.clone();
            out.push(Value::Relationship(triple.relationship));
            out.push(Value::Node(triple.end));
            out
        })
        .collect()
}

fn schema_type_map(schema: &Schema) -> HashMap<String, CypherType> {
    schema
        .columns()
        .iter()
        .map(|(n, t)| (n.clone(), t.clone()))
        .collect()
}

fn execute_call(
    namespace: &str,
    name: &str,
    args: &[Expression],
    exec: &ExecCtx,
) -> Result<DataFrame, crate::error::EngineError> {
    let guard = exec.graph.lock().expect("graph model mutex poisoned");
    let procedure = guard
        .get_procedure(namespace, name)
        .ok_or_else(|| PlanError::UnknownProcedure {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })?;
    let signature = procedure.signature().clone();
    if args.len() != signature.inputs.len() {
        return Err(PlanError::ProcedureArity {
            namespace: namespace.to_string(),
            name: name.to_string(),
            expected: signature.inputs.len(),
            actual: args.len(),
        }
        .into());
    }
    let values = args
        .iter()
        .map(|arg| exec.evaluator.eval(arg, &exec.eval_ctx))
        .collect::<Result<Vec<Value>, _>>()?;
    let rows = procedure.call(&values)?;
    drop(guard);
    let schema = Schema::new(signature.outputs)?;
    Ok(DataFrame::new(schema, move || Box::new(rows.clone().into_iter())))
}

fn execute_create(
    input: &PhysicalPlan,
    nodes: &[CreateNodeSpec],
    rels: &[CreateRelSpec],
    exec: &ExecCtx,
) -> Result<DataFrame, crate::error::EngineError> {
    let base = input.execute(exec)?;
    let base_schema = base.schema().clone();
    let mut out_columns = base_schema.columns().to_vec();
    for node in nodes.iter().filter(|n| n.is_new) {
        out_columns.push((node.alias.clone(), CypherType::Node));
    }
    for rel in rels {
        out_columns.push((rel.alias.clone(), CypherType::Relationship));
    }
    let schema = Schema::new(out_columns)?;

    let graph = Arc::clone(&exec.graph);
    let evaluator = exec.evaluator;
    let eval_ctx = exec.eval_ctx.clone();
    let base_names: Vec<String> = base_schema.names().map(|s| s.to_string()).collect();
    let nodes = nodes.to_vec();
    let rels = rels.to_vec();

    let rows: Result<Vec<Row>, crate::error::EngineError> = base
        .records()
        .map(|row| {
            let mut row_ctx = eval_ctx.clone();
            for (name, value) in base_names.iter().zip(row.iter()) {
                row_ctx.variables.insert(name.clone(), value.clone());
            }

            let mut new_index = HashMap::new();
            let mut new_nodes = Vec::new();
            for spec in &nodes {
                if spec.is_new {
                    new_index.insert(spec.alias.clone(), new_nodes.len());
                    let mut properties = std::collections::BTreeMap::new();
                    for (key, expr) in &spec.properties {
                        properties.insert(key.clone(), evaluator.eval(expr, &row_ctx)?);
                    }
                    new_nodes.push(NewNode {
                        labels: spec.labels.clone(),
                        properties,
                    });
                }
            }

            let mut new_rels = Vec::new();
            for spec in &rels {
                let start = resolve_endpoint(&spec.start_alias, &new_index, &row_ctx)?;
                let end = resolve_endpoint(&spec.end_alias, &new_index, &row_ctx)?;
                let mut properties = std::collections::BTreeMap::new();
                for (key, expr) in &spec.properties {
                    properties.insert(key.clone(), evaluator.eval(expr, &row_ctx)?);
                }
                new_rels.push(NewRelationship {
                    rel_type: spec.rel_type.clone(),
                    start,
                    end,
                    properties,
                });
            }

            let mut created = CreatedElements::default();
            {
                let mut guard = graph.lock().expect("graph model mutex poisoned");
                guard.create_elements(new_nodes.clone(), new_rels.clone(), &mut |c| created = c)?;
            }

            let mut out = row.clone();
            for (spec, new_node) in nodes.iter().filter(|n| n.is_new).zip(new_nodes.iter()) {
                let idx = new_index[&spec.alias];
                let id = created.node_ids[idx];
                out.push(Value::Node(crate::graph::Node::new(
                    id,
                    new_node.labels.clone(),
                    new_node.properties.clone(),
                )));
            }
            for (i, rel_spec) in rels.iter().enumerate() {
                let rel_id = created.rel_ids[i];
                let new_rel = &new_rels[i];
                out.push(Value::Relationship(crate::graph::Relationship {
                    id: rel_id,
                    rel_type: rel_spec.rel_type.clone(),
                    start_node_id: endpoint_id(&new_rel.start, &created),
                    end_node_id: endpoint_id(&new_rel.end, &created),
                    properties: new_rel.properties.clone(),
                }));
            }
            Ok(out)
        })
        .collect();

    let rows = rows?;
    Ok(DataFrame::new(schema, move || Box::new(rows.clone().into_iter())))
}

fn endpoint_id(endpoint: &NewEndpoint, created: &CreatedElements) -> NodeId {
    match endpoint {
        NewEndpoint::Existing(id) => *id,
        NewEndpoint::New(idx) => created.node_ids[*idx],
    }
}

fn resolve_endpoint(
    alias: &str,
    new_index: &HashMap<String, usize>,
    row_ctx: &EvalContext,
) -> Result<NewEndpoint, PlanError> {
    if let Some(&idx) = new_index.get(alias) {
        return Ok(NewEndpoint::New(idx));
    }
    match row_ctx.variables.get(alias) {
        Some(Value::Node(node)) => Ok(NewEndpoint::Existing(node.id)),
        _ => Err(PlanError::UnboundCreateEndpoint(alias.to_string())),
    }
}
