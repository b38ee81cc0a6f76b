//! The batch driver: one validated model applied to many students.
//!
//! Validation and risk assessment run once as a synchronous barrier; the
//! per-student work (record selection, graph walk, classification) then
//! fans out across a rayon pool. Students share only the read-only
//! compiled model, so no locking is involved and one student's failure
//! state cannot leak into another's result.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::analysis::ModelStats;
use crate::classify::{classify, StudentEvaluationResult};
use crate::compile::{assess_risks, compile, CompiledModel, MalformedGraph, ModelRisks};
use crate::compute::engine::walk;
use crate::compute::ledger::Ledger;
use crate::model::{GradingScale, GraphStructure, SelectionPolicy, StudentInput, TaskCatalog, UserId};
use crate::selection::resolve_inputs;

/// Everything one batch run produces. Results are keyed by student and the
/// graph-level risks ride alongside; neither is persisted here.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub results: BTreeMap<UserId, StudentEvaluationResult>,
    pub risks: ModelRisks,
}

/// Evaluates a grading model for every given student.
///
/// Fails only on a malformed graph, before any student is touched. Every
/// per-student condition, missing data included, lands as flags inside
/// that student's result. `reference_date` defaults to now; pass one
/// explicitly to make a run reproducible.
pub fn evaluate(
    graph: &GraphStructure,
    catalog: &TaskCatalog,
    students: &[StudentInput],
    policy: SelectionPolicy,
    scale: GradingScale,
    reference_date: Option<DateTime<Utc>>,
) -> Result<BatchOutcome, MalformedGraph> {
    let model = compile(graph, catalog)?;
    let reference = reference_date.unwrap_or_else(Utc::now);
    let risks = assess_risks(&model, catalog, reference);

    let stats = ModelStats::analyze(&model);
    tracing::debug!(
        sources = stats.source_count,
        depth = stats.depth,
        max_fan_in = stats.max_fan_in,
        "model shape"
    );

    let started = std::time::Instant::now();
    let results: BTreeMap<UserId, StudentEvaluationResult> = students
        .par_iter()
        .map(|student| {
            let result = evaluate_student(&model, catalog, student, policy, scale, reference);
            (student.user, result)
        })
        .collect();

    tracing::debug!(
        students = students.len(),
        nodes = model.node_count(),
        elapsed = ?started.elapsed(),
        "batch evaluated"
    );
    Ok(BatchOutcome { results, risks })
}

/// Runs selection, the graph walk and classification for one student.
pub fn evaluate_student(
    model: &CompiledModel,
    catalog: &TaskCatalog,
    student: &StudentInput,
    policy: SelectionPolicy,
    scale: GradingScale,
    reference: DateTime<Utc>,
) -> StudentEvaluationResult {
    let effective = resolve_inputs(model, &student.records, policy, reference);
    let source_values: Vec<Option<f64>> = effective
        .iter()
        .map(|input| input.as_ref().map(|i| i.value))
        .collect();

    let mut ledger = Ledger::with_capacity(model.node_count());
    let outcome = walk(model, &source_values, &mut ledger);

    classify(
        student.user,
        outcome.final_grade,
        outcome.fault.is_some(),
        &student.records,
        model,
        catalog,
        scale,
    )
}
