//! Crate-level error unification (spec.md §7), mirroring the teacher's
//! `QueryPlannerError`-style aggregation of sub-component errors via `#[from]`.
//!
//! Static errors (`Parsing`, `Plan`) surface synchronously from
//! `Runner::compile`/`Runner::run`; runtime errors (`Evaluation`,
//! `GraphModel`) surface lazily from the consuming record iterator
//! (spec.md §7 "Propagation").

use thiserror::Error;

use crate::eval::EvaluationError;
use crate::frame::SchemaError;
use crate::graph::GraphModelError;
use crate::parser::ParsingError;
use crate::plan::errors::PlanError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Parsing(#[from] ParsingError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    GraphModel(#[from] GraphModelError),
}

pub type EngineResult<T> = Result<T, EngineError>;
