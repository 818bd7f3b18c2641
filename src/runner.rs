//! Host-facing entry point (spec.md §4.8, §6): `Runner::new(graphModel)`,
//! `compile(query) → (AST, residual_params, semantic_state)`, and
//! `run(query, params) → Result`.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::eval::{EvalContext, Evaluator};
use crate::frame::operators::DataFrameOperator;
use crate::frame::{DataFrame, Row, Schema};
use crate::graph::GraphModel;
use crate::parser::{ParsedQuery, QueryParser, SemanticState};
use crate::parser::ast::Statement;
use crate::plan::optimizer::{self, OptimizerPass};
use crate::plan::pretty::pretty;
use crate::plan::{physical, ExecCtx, LogicalPlan, PhysicalPlan, PlanCtx};
use crate::value::Value;

/// A single row as a name→value map (spec.md §6 "`Result.records()` returns
/// a single-pass iterator of name→value maps").
pub type Record = HashMap<String, Value>;

/// One graph instance plus a memoizing parser and the optimizer's tunables
/// (spec.md §5 "one `Runner` per graph-model instance").
pub struct Runner {
    graph: physical::SharedGraphModel,
    parser: QueryParser,
    config: EngineConfig,
    passes: Vec<Box<dyn OptimizerPass>>,
}

impl Runner {
    pub fn new(graph: impl GraphModel + Send + 'static) -> Self {
        Runner::with_config(graph, EngineConfig::default())
    }

    pub fn with_config(graph: impl GraphModel + Send + 'static, config: EngineConfig) -> Self {
        Runner {
            graph: Arc::new(Mutex::new(graph)),
            parser: QueryParser::new(config.parser_cache_capacity),
            config,
            passes: optimizer::default_passes(),
        }
    }

    /// `compile(query) → (AST, residual_params, semantic_state)` (spec.md
    /// §6), plus the logical/physical/optimized plans `run` would use —
    /// bundled into one [`CompiledQuery`] so plan introspection and
    /// execution share a single compilation.
    pub fn compile(&self, query: &str) -> Result<CompiledQuery, EngineError> {
        let parsed = self.parser.parse(query)?;
        let mut ctx = PlanCtx::new();
        let logical = crate::plan::logical::build(&parsed.statement, &mut ctx)?;
        let raw_physical = physical::lower(&logical, &mut ctx)?;

        let mut eval_ctx = EvalContext::new();
        eval_ctx.residual_params = parsed.residual_params.clone();

        let exec = ExecCtx {
            graph: Arc::clone(&self.graph),
            evaluator: Evaluator::new(),
            operator: DataFrameOperator::new(),
            eval_ctx,
        };

        let optimized = optimizer::optimize(
            raw_physical,
            &self.passes,
            &exec,
            self.config.optimizer_fixpoint_bound,
        );

        Ok(CompiledQuery {
            parsed,
            logical,
            physical: optimized,
            exec,
        })
    }

    /// `run(query, params) → Result` (spec.md §6).
    pub fn run(&self, query: &str, params: HashMap<String, Value>) -> Result<QueryResult, EngineError> {
        let mut compiled = self.compile(query)?;
        compiled.exec.eval_ctx.invocation_params = params;
        compiled.execute()
    }

    pub fn cache_len(&self) -> usize {
        self.parser.cache_len()
    }

    pub fn clear_cache(&self) {
        self.parser.clear_cache()
    }
}

/// The result of `compile`: the parsed statement plus every plan stage, so
/// a caller can inspect the AST/LPT/PPT before (or instead of) executing
/// (spec.md §4.8 "optional plan introspection").
pub struct CompiledQuery {
    parsed: Arc<ParsedQuery>,
    logical: Arc<LogicalPlan>,
    physical: Arc<PhysicalPlan>,
    exec: ExecCtx,
}

impl CompiledQuery {
    pub fn ast(&self) -> &Statement {
        &self.parsed.statement
    }

    pub fn semantic_state(&self) -> &SemanticState {
        &self.parsed.semantic_state
    }

    pub fn residual_params(&self) -> &HashMap<String, Value> {
        &self.parsed.residual_params
    }

    pub fn logical_plan(&self) -> &LogicalPlan {
        &self.logical
    }

    pub fn physical_plan(&self) -> &PhysicalPlan {
        &self.physical
    }

    /// Render the logical plan with the uniform tree pretty-printer
    /// (spec.md §6 "Plan-pretty format").
    pub fn pretty_logical(&self) -> String {
        pretty(self.logical.as_ref())
    }

    pub fn pretty_physical(&self) -> String {
        pretty(self.physical.as_ref())
    }

    pub fn with_params(mut self, params: HashMap<String, Value>) -> Self {
        self.exec.eval_ctx.invocation_params = params;
        self
    }

    pub fn execute(&self) -> Result<QueryResult, EngineError> {
        let frame = self.physical.execute(&self.exec)?;
        Ok(QueryResult::new(frame))
    }
}

/// A lazy, schema-bearing query result (spec.md §4.8). `records()` is
/// re-iterable (each call re-drives the underlying `DataFrame` producer)
/// unless `cache()` has buffered it.
pub struct QueryResult {
    frame: DataFrame,
}

impl QueryResult {
    fn new(frame: DataFrame) -> Self {
        QueryResult { frame }
    }

    pub fn schema(&self) -> &Schema {
        self.frame.schema()
    }

    /// A single-pass iterator of name→value maps (spec.md §6).
    pub fn records(&self) -> Box<dyn Iterator<Item = Record> + '_> {
        let names: Vec<String> = self.frame.schema().names().map(|s| s.to_string()).collect();
        Box::new(
            self.frame
                .records()
                .map(move |row| names.iter().cloned().zip(row).collect::<Record>()),
        )
    }

    pub fn rows(&self) -> Box<dyn Iterator<Item = Row>> {
        self.frame.records()
    }

    /// Materialize once; the returned `Result` replays the same rows on
    /// every subsequent `records()`/`rows()` call (spec.md §4.8 `cache()`).
    pub fn cache(&self) -> QueryResult {
        QueryResult::new(self.frame.cache())
    }

    /// Format up to `limit` rows as a Unicode-bordered table (spec.md §6
    /// `Result.show(limit)`).
    pub fn show(&self, limit: usize, out: &mut impl Write) -> io::Result<()> {
        let headers: Vec<String> = self.frame.schema().names().map(|s| s.to_string()).collect();
        let rows: Vec<Vec<String>> = self
            .frame
            .records()
            .take(limit)
            .map(|row| row.iter().map(format_value).collect())
            .collect();
        write_table(out, &headers, &rows)
    }

    /// `show` against standard output, discarding any I/O error (the sink
    /// is inherently best-effort once it leaves the caller's control).
    pub fn show_stdout(&self, limit: usize) {
        let mut stdout = io::stdout();
        let _ = self.show(limit, &mut stdout);
    }

    /// Host-side JSON bridging (SPEC_FULL.md §3): each record rendered
    /// through `Value`'s derived `Serialize`, for hosts that want to hand
    /// results to something JSON-shaped rather than iterate `Record`s.
    pub fn records_json(&self) -> serde_json::Result<Vec<serde_json::Value>> {
        self.records().map(serde_json::to_value).collect()
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => s.clone(),
        Value::List(items) => format!(
            "[{}]",
            items.iter().map(format_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Map(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{k}: {}", format_value(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Node(node) => format!("({}:{})", node.id, node.labels.join(":")),
        Value::Relationship(rel) => format!(
            "[{}:{}]",
            rel.id,
            rel.rel_type.as_deref().unwrap_or("")
        ),
        Value::Path(triples) => format!("<path of {} hops>", triples.len()),
    }
}

fn write_table(out: &mut impl Write, headers: &[String], rows: &[Vec<String>]) -> io::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let border = |left: &str, mid: &str, right: &str, fill: char| -> String {
        let mut s = left.to_string();
        for (i, w) in widths.iter().enumerate() {
            s.push_str(&fill.to_string().repeat(w + 2));
            s.push_str(if i + 1 == widths.len() { right } else { mid });
        }
        s
    };

    let data_row = |cells: &[String]| -> String {
        let mut s = "│".to_string();
        for (cell, w) in cells.iter().zip(widths.iter()) {
            s.push_str(&format!(" {cell:<w$} │", w = w));
        }
        s
    };

    writeln!(out, "{}", border("┌", "┬", "┐", '─'))?;
    writeln!(out, "{}", data_row(headers))?;
    writeln!(out, "{}", border("├", "┼", "┤", '─'))?;
    for row in rows {
        writeln!(out, "{}", data_row(row))?;
    }
    writeln!(out, "{}", border("└", "┴", "┘", '─'))?;
    Ok(())
}
