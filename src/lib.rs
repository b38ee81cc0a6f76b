//! Grading-model evaluation engine.
//!
//! A course's grading model is a teacher-authored DAG that combines raw
//! per-task grades into one final grade. This crate takes a snapshot of
//! that graph plus each student's grade records and deterministically
//! computes every student's final-grade candidate, classifying anything
//! suspicious (missing data, out-of-range results, stale inputs) as flags
//! instead of failures. The surrounding web application owns persistence,
//! transport and UI; this crate performs no I/O and reads no clock beyond
//! the explicit reference date.
//!
//! The pipeline, run once per batch:
//!
//! 1. [`compile`] validates the graph (cycles, arities, task bindings,
//!    exactly one sink) and caches its topological order, a synchronous
//!    barrier ahead of all per-student work.
//! 2. [`selection`] reduces each student's record history to one effective
//!    grade per task under the batch's best/latest + expiry policy.
//! 3. [`compute`] walks the cached order per student, in parallel across
//!    students, with per-student fault isolation.
//! 4. [`classify`] turns each computed candidate into a flagged
//!    [`StudentEvaluationResult`] the caller can inspect before committing.
//!
//! [`evaluate`] drives all four; [`explain`] runs one student and renders
//! an audit tree of how the grade came to be.

pub mod analysis;
pub mod classify;
pub mod compile;
pub mod compute;
pub mod display;
pub mod logging;
pub mod model;
pub mod selection;

pub use analysis::ModelStats;
pub use classify::{ResultFlag, StudentEvaluationResult};
pub use compile::{compile, CompiledModel, GraphDefect, MalformedGraph, ModelRisks};
pub use compute::{evaluate, BatchOutcome, Value};
pub use model::{
    CourseTask, Edge, ExpiredOption, GradeRecord, GradingScale, GraphStructure, Node, NodeKind,
    SelectionMode, SelectionPolicy, StudentInput, TaskCatalog, TaskId, TaskStatus, UserId,
};

use chrono::{DateTime, Utc};

/// Evaluates one student and renders the audit tree for their result.
///
/// Compiles the graph (failing fast when it is malformed), resolves the
/// student's effective grades, walks the model and formats the ledger as a
/// tree from the sink. Meant for teacher-facing "why this grade" views and
/// debugging sessions, not for the batch hot path.
pub fn explain(
    graph: &GraphStructure,
    catalog: &TaskCatalog,
    student: &StudentInput,
    policy: SelectionPolicy,
    reference_date: Option<DateTime<Utc>>,
) -> Result<String, MalformedGraph> {
    let model = compile::compile(graph, catalog)?;
    let reference = reference_date.unwrap_or_else(Utc::now);

    let effective = selection::resolve_inputs(&model, &student.records, policy, reference);
    let source_values: Vec<Option<f64>> = effective
        .iter()
        .map(|input| input.as_ref().map(|i| i.value))
        .collect();

    let mut ledger = compute::Ledger::with_capacity(model.node_count());
    compute::walk(&model, &source_values, &mut ledger);

    Ok(display::format_trace(&model, &ledger, student.user))
}
