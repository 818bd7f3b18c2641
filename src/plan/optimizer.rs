//! Physical-plan rewrites that preserve semantics (spec.md §4.7).
//!
//! Generalized from the teacher's `query_planner::optimizer` module: the
//! `OptimizerPass` trait and `Transformed<T>` fixpoint-signaling enum carry
//! over unchanged; only the concrete passes and the tree they rewrite
//! (`PhysicalPlan` here, `PPTNode` in spec.md terms, rather than the
//! teacher's SQL-rendering logical tree) are new.

use std::collections::HashSet;
use std::sync::Arc;

use crate::parser::ast::{Expression, Literal};
use crate::plan::physical::{ExecCtx, PhysicalPlan};
use crate::value::Value;

/// Whether a rewrite fired, carrying the (possibly unchanged) result either way.
#[derive(Debug)]
pub enum Transformed<T> {
    Yes(T),
    No(T),
}

impl<T> Transformed<T> {
    pub fn data(self) -> T {
        match self {
            Transformed::Yes(t) | Transformed::No(t) => t,
        }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, Transformed::Yes(_))
    }
}

/// One semantics-preserving rewrite rule, applied to a single node whose
/// children have already been rewritten (spec.md §4.7 "sequence of tree
/// rewrites").
pub trait OptimizerPass {
    fn name(&self) -> &'static str;
    fn rewrite(&self, plan: Arc<PhysicalPlan>, exec: &ExecCtx) -> Transformed<Arc<PhysicalPlan>>;
}

/// Run every pass to a fixpoint, bounded by `bound` full passes over the
/// tree (spec.md §4.7 "bound ≥ 10 iterations").
pub fn optimize(
    mut plan: Arc<PhysicalPlan>,
    passes: &[Box<dyn OptimizerPass>],
    exec: &ExecCtx,
    bound: usize,
) -> Arc<PhysicalPlan> {
    for _ in 0..bound {
        let mut changed_any = false;
        for pass in passes {
            let result = transform_bottom_up(&plan, pass.as_ref(), exec);
            changed_any |= result.is_yes();
            plan = result.data();
            log::trace!("optimizer pass '{}' ran (changed={changed_any})", pass.name());
        }
        if !changed_any {
            break;
        }
    }
    plan
}

/// The three default passes (spec.md §4.7): predicate pushdown, constant
/// filter folding, and skip-0/take-∞ elision.
pub fn default_passes() -> Vec<Box<dyn OptimizerPass>> {
    vec![
        Box::new(PredicatePushdown),
        Box::new(ConstantFilterFold),
        Box::new(SkipTakeElision),
    ]
}

fn transform_bottom_up(
    plan: &Arc<PhysicalPlan>,
    pass: &dyn OptimizerPass,
    exec: &ExecCtx,
) -> Transformed<Arc<PhysicalPlan>> {
    let (rebuilt, children_changed) = match plan.as_ref() {
        PhysicalPlan::Empty | PhysicalPlan::Scan { .. } | PhysicalPlan::Call { .. } => {
            (Arc::clone(plan), false)
        }
        PhysicalPlan::Expand {
            input,
            start_alias,
            rel_alias,
            rel_filter,
            end_alias,
            end_filter,
            direction,
        } => {
            let t = transform_bottom_up(input, pass, exec);
            let changed = t.is_yes();
            (
                Arc::new(PhysicalPlan::Expand {
                    input: t.data(),
                    start_alias: start_alias.clone(),
                    rel_alias: rel_alias.clone(),
                    rel_filter: rel_filter.clone(),
                    end_alias: end_alias.clone(),
                    end_filter: end_filter.clone(),
                    direction: *direction,
                }),
                changed,
            )
        }
        PhysicalPlan::Filter { input, predicate } => {
            let t = transform_bottom_up(input, pass, exec);
            let changed = t.is_yes();
            (
                Arc::new(PhysicalPlan::Filter {
                    input: t.data(),
                    predicate: predicate.clone(),
                }),
                changed,
            )
        }
        PhysicalPlan::Project { input, items } => {
            let t = transform_bottom_up(input, pass, exec);
            let changed = t.is_yes();
            (
                Arc::new(PhysicalPlan::Project {
                    input: t.data(),
                    items: items.clone(),
                }),
                changed,
            )
        }
        PhysicalPlan::OrderBy { input, items } => {
            let t = transform_bottom_up(input, pass, exec);
            let changed = t.is_yes();
            (
                Arc::new(PhysicalPlan::OrderBy {
                    input: t.data(),
                    items: items.clone(),
                }),
                changed,
            )
        }
        PhysicalPlan::Skip { input, n } => {
            let t = transform_bottom_up(input, pass, exec);
            let changed = t.is_yes();
            (Arc::new(PhysicalPlan::Skip { input: t.data(), n: *n }), changed)
        }
        PhysicalPlan::Take { input, n } => {
            let t = transform_bottom_up(input, pass, exec);
            let changed = t.is_yes();
            (Arc::new(PhysicalPlan::Take { input: t.data(), n: *n }), changed)
        }
        PhysicalPlan::Distinct { input } => {
            let t = transform_bottom_up(input, pass, exec);
            let changed = t.is_yes();
            (Arc::new(PhysicalPlan::Distinct { input: t.data() }), changed)
        }
        PhysicalPlan::Create { input, nodes, rels } => {
            let t = transform_bottom_up(input, pass, exec);
            let changed = t.is_yes();
            (
                Arc::new(PhysicalPlan::Create {
                    input: t.data(),
                    nodes: nodes.clone(),
                    rels: rels.clone(),
                }),
                changed,
            )
        }
        PhysicalPlan::Join { left, right } => {
            let lt = transform_bottom_up(left, pass, exec);
            let rt = transform_bottom_up(right, pass, exec);
            let changed = lt.is_yes() || rt.is_yes();
            (
                Arc::new(PhysicalPlan::Join {
                    left: lt.data(),
                    right: rt.data(),
                }),
                changed,
            )
        }
    };

    match pass.rewrite(rebuilt, exec) {
        Transformed::Yes(p) => Transformed::Yes(p),
        Transformed::No(p) => {
            if children_changed {
                Transformed::Yes(p)
            } else {
                Transformed::No(p)
            }
        }
    }
}

/// The single-input child of a node that has exactly one, or `None` for
/// leaves, `Join` (two children), and `Create` (a mutating boundary a
/// filter must not cross — see [`PredicatePushdown`]).
fn single_input(node: &PhysicalPlan) -> Option<&Arc<PhysicalPlan>> {
    match node {
        PhysicalPlan::Expand { input, .. }
        | PhysicalPlan::Project { input, .. }
        | PhysicalPlan::OrderBy { input, .. }
        | PhysicalPlan::Skip { input, .. }
        | PhysicalPlan::Take { input, .. }
        | PhysicalPlan::Distinct { input } => Some(input),
        _ => None,
    }
}

fn with_input(node: &PhysicalPlan, new_input: Arc<PhysicalPlan>) -> PhysicalPlan {
    match node {
        PhysicalPlan::Expand {
            start_alias,
            rel_alias,
            rel_filter,
            end_alias,
            end_filter,
            direction,
            ..
        } => PhysicalPlan::Expand {
            input: new_input,
            start_alias: start_alias.clone(),
            rel_alias: rel_alias.clone(),
            rel_filter: rel_filter.clone(),
            end_alias: end_alias.clone(),
            end_filter: end_filter.clone(),
            direction: *direction,
        },
        PhysicalPlan::Project { items, .. } => PhysicalPlan::Project {
            input: new_input,
            items: items.clone(),
        },
        PhysicalPlan::OrderBy { items, .. } => PhysicalPlan::OrderBy {
            input: new_input,
            items: items.clone(),
        },
        PhysicalPlan::Skip { n, .. } => PhysicalPlan::Skip { input: new_input, n: *n },
        PhysicalPlan::Take { n, .. } => PhysicalPlan::Take { input: new_input, n: *n },
        PhysicalPlan::Distinct { .. } => PhysicalPlan::Distinct { input: new_input },
        other => other.clone(),
    }
}

fn referenced_variables(expr: &Expression) -> HashSet<String> {
    let mut names = HashSet::new();
    collect_variables(expr, &mut names);
    names
}

fn collect_variables(expr: &Expression, names: &mut HashSet<String>) {
    match expr {
        Expression::Literal(_) | Expression::Parameter(_) => {}
        Expression::Variable(name) => {
            names.insert(name.clone());
        }
        Expression::List(items) => items.iter().for_each(|e| collect_variables(e, names)),
        Expression::PropertyAccess { base, .. } => collect_variables(base, names),
        Expression::Index { base, index } => {
            collect_variables(base, names);
            collect_variables(index, names);
        }
        Expression::Unary { operand, .. } => collect_variables(operand, names),
        Expression::Binary { left, right, .. } => {
            collect_variables(left, names);
            collect_variables(right, names);
        }
    }
}

fn literal_to_value(lit: &Literal) -> Value {
    match lit {
        Literal::Integer(i) => Value::Integer(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Null => Value::Null,
    }
}

/// `var.key = <literal>` (either operand order) against a given variable
/// name, the shape `NodeFilter.properties` can absorb directly.
fn literal_equality_on(expr: &Expression, alias: &str) -> Option<(String, Value)> {
    use crate::parser::ast::Operator;
    let Expression::Binary {
        operator: Operator::Equal,
        left,
        right,
    } = expr
    else {
        return None;
    };
    property_of(left, alias, right).or_else(|| property_of(right, alias, left))
}

fn property_of(accessor: &Expression, alias: &str, literal_side: &Expression) -> Option<(String, Value)> {
    let Expression::PropertyAccess { base, key } = accessor else {
        return None;
    };
    let Expression::Variable(name) = base.as_ref() else {
        return None;
    };
    if name != alias {
        return None;
    }
    let Expression::Literal(lit) = literal_side else {
        return None;
    };
    Some((key.clone(), literal_to_value(lit)))
}

/// Push a `Filter` toward the scan(s) whose columns it depends on (spec.md
/// §4.7 rule 1). Folds directly into a `Scan`'s `NodeFilter` when the
/// predicate is a constant-equality test on that scan's own alias; otherwise
/// moves the filter below any single-input node whose own output columns
/// the predicate does not reference. Never crosses a `Create` boundary,
/// since reordering a filter around element creation would change how many
/// rows reach `create_elements` (spec.md §4.4 "atomicity ... the host's
/// responsibility" — the optimizer must not alter side-effect counts).
pub struct PredicatePushdown;

impl OptimizerPass for PredicatePushdown {
    fn name(&self) -> &'static str {
        "predicate_pushdown"
    }

    fn rewrite(&self, plan: Arc<PhysicalPlan>, exec: &ExecCtx) -> Transformed<Arc<PhysicalPlan>> {
        let PhysicalPlan::Filter { input, predicate } = plan.as_ref() else {
            return Transformed::No(plan);
        };

        if let PhysicalPlan::Scan { alias, filter } = input.as_ref() {
            if let Some((key, value)) = literal_equality_on(predicate, alias) {
                let mut new_filter = filter.clone();
                new_filter.properties.insert(key, value);
                return Transformed::Yes(Arc::new(PhysicalPlan::Scan {
                    alias: alias.clone(),
                    filter: new_filter,
                }));
            }
        }

        if let Some(grandchild) = single_input(input.as_ref()) {
            let vars = referenced_variables(predicate);
            if let Ok(schema) = grandchild.schema(exec) {
                let names: HashSet<&str> = schema.names().collect();
                if vars.iter().all(|v| names.contains(v.as_str())) {
                    let pushed_filter = Arc::new(PhysicalPlan::Filter {
                        input: Arc::clone(grandchild),
                        predicate: predicate.clone(),
                    });
                    return Transformed::Yes(Arc::new(with_input(input.as_ref(), pushed_filter)));
                }
            }
        }

        Transformed::No(plan)
    }
}

/// Drop a filter whose predicate is a compile-time constant (spec.md §4.7
/// rule 2): `true` elides the filter entirely; `false`/`null` can never
/// admit a row, so the subtree is wrapped in a zero-row `Take` that keeps
/// its schema intact.
pub struct ConstantFilterFold;

impl OptimizerPass for ConstantFilterFold {
    fn name(&self) -> &'static str {
        "constant_filter_fold"
    }

    fn rewrite(&self, plan: Arc<PhysicalPlan>, _exec: &ExecCtx) -> Transformed<Arc<PhysicalPlan>> {
        let PhysicalPlan::Filter { input, predicate } = plan.as_ref() else {
            return Transformed::No(plan);
        };
        match predicate {
            Expression::Literal(Literal::Boolean(true)) => Transformed::Yes(Arc::clone(input)),
            Expression::Literal(Literal::Boolean(false)) | Expression::Literal(Literal::Null) => {
                Transformed::Yes(Arc::new(PhysicalPlan::Take {
                    input: Arc::clone(input),
                    n: 0,
                }))
            }
            _ => Transformed::No(plan),
        }
    }
}

/// Elide `skip 0` and `take ∞` (spec.md §4.7 rule 3); `∞` is represented as
/// `u64::MAX`, the sentinel an unbounded `LIMIT` would lower to.
pub struct SkipTakeElision;

impl OptimizerPass for SkipTakeElision {
    fn name(&self) -> &'static str {
        "skip_take_elision"
    }

    fn rewrite(&self, plan: Arc<PhysicalPlan>, _exec: &ExecCtx) -> Transformed<Arc<PhysicalPlan>> {
        match plan.as_ref() {
            PhysicalPlan::Skip { input, n: 0 } => Transformed::Yes(Arc::clone(input)),
            PhysicalPlan::Take { input, n } if *n == u64::MAX => Transformed::Yes(Arc::clone(input)),
            _ => Transformed::No(plan),
        }
    }
}
