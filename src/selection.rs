//! Reduces a student's raw grade records for one task to a single effective
//! input under the batch's selection policy.
//!
//! Selection runs ahead of the graph walk, once per (student, source) pair,
//! against an explicit reference date so runs are reproducible. An empty
//! candidate set yields `None`: the task is unresolved for this student,
//! which is a distinct state from a grade of zero and must stay one.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::compile::CompiledModel;
use crate::model::{
    EffectiveInput, ExpiredOption, GradeRecord, SelectionMode, SelectionPolicy, TaskId,
};

/// Resolves one student's record list onto a compiled model's sources.
///
/// The returned list is parallel to `model.sources()`; `None` marks a
/// source whose task has no usable record for this student.
pub fn resolve_inputs(
    model: &CompiledModel,
    records: &[GradeRecord],
    policy: SelectionPolicy,
    reference: DateTime<Utc>,
) -> Vec<Option<EffectiveInput>> {
    model
        .sources()
        .iter()
        .map(|binding| select_effective(records, binding.task, policy, reference))
        .collect()
}

/// Selects the effective grade for `task` from a student's full record list.
///
/// Records for other tasks, expired records (under `non_expired`) and
/// records with non-finite grades are not candidates. The winning record's
/// position in `records` is kept as provenance.
pub fn select_effective(
    records: &[GradeRecord],
    task: TaskId,
    policy: SelectionPolicy,
    reference: DateTime<Utc>,
) -> Option<EffectiveInput> {
    let mut winner: Option<(usize, &GradeRecord)> = None;

    for (index, record) in records.iter().enumerate() {
        if record.task != task || !record.grade.is_finite() {
            continue;
        }
        if policy.expired == ExpiredOption::NonExpired && record.is_expired(reference) {
            continue;
        }

        // Replacing only on a strict win keeps the earliest record when a
        // candidate ties on both date and grade.
        match winner {
            Some((_, incumbent)) if !beats(record, incumbent, policy.mode) => {}
            _ => winner = Some((index, record)),
        }
    }

    let (record_index, record) = winner?;
    tracing::trace!(
        task = task.0,
        record_index,
        grade = record.grade,
        "effective grade selected"
    );
    Some(EffectiveInput {
        value: record.grade,
        date: record.date,
        record_index,
    })
}

/// Strict "candidate wins over incumbent" under the given mode.
///
/// `latest`: later date, ties by higher grade. `best`: higher grade, ties
/// by later date. Grades are finite here, so `partial_cmp` cannot fail;
/// `Equal` is used defensively rather than unwrapping.
fn beats(candidate: &GradeRecord, incumbent: &GradeRecord, mode: SelectionMode) -> bool {
    let ordering = match mode {
        SelectionMode::Latest => candidate
            .date
            .cmp(&incumbent.date)
            .then(grade_ordering(candidate, incumbent)),
        SelectionMode::Best => {
            grade_ordering(candidate, incumbent).then(candidate.date.cmp(&incumbent.date))
        }
    };
    ordering == Ordering::Greater
}

fn grade_ordering(candidate: &GradeRecord, incumbent: &GradeRecord) -> Ordering {
    candidate
        .grade
        .partial_cmp(&incumbent.grade)
        .unwrap_or(Ordering::Equal)
}
