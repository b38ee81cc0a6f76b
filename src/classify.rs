//! Classifies one student's computed result against the course's grading
//! scale and the raw records that fed it.
//!
//! Nothing here throws and nothing is clamped: every suspicious condition
//! becomes a flag on the result, and the caller decides downstream whether
//! a flagged result may be committed.

use std::collections::BTreeSet;

use crate::compile::CompiledModel;
use crate::compute::Value;
use crate::model::{GradeRecord, GradingScale, TaskCatalog, UserId};

/// One warning on a student's evaluation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResultFlag {
    /// A raw grade record for a task wired into the model exceeds that
    /// task's declared maximum. Reported even for records the selection
    /// policy filtered out; the flag exists to expose bad data.
    InvalidGrade,
    /// The final-grade candidate is unusable: the sink came out
    /// `Unresolved`, or the value is non-integral under an integer scale.
    InvalidPredictedGrade,
    /// The candidate lies outside `[0, max_final_grade]`. The value is
    /// reported as computed, never silently clamped into range.
    OutOfRangePredictedGrade,
    /// The walk hit an internal inconsistency and was degraded.
    InternalError,
}

/// One student's outcome for one batch run. Ephemeral; persistence of
/// committed grades happens outside this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentEvaluationResult {
    pub user: UserId,
    pub final_grade: Value,
    pub flags: BTreeSet<ResultFlag>,
}

impl StudentEvaluationResult {
    /// Whether the caller may safely commit this result as a final grade.
    pub fn is_committable(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Builds the flagged result for one student.
///
/// `faulted` is set by the walk when it degraded this student; `records`
/// are the student's raw records, scanned against the catalog maxima of
/// every task the model binds.
pub fn classify(
    user: UserId,
    final_grade: Value,
    faulted: bool,
    records: &[GradeRecord],
    model: &CompiledModel,
    catalog: &TaskCatalog,
    scale: GradingScale,
) -> StudentEvaluationResult {
    let mut flags = BTreeSet::new();

    if faulted {
        flags.insert(ResultFlag::InternalError);
    }

    for record in records {
        if !model.binds_task(record.task) {
            continue;
        }
        if let Some(task) = catalog.get(record.task) {
            if record.grade > task.max_grade {
                flags.insert(ResultFlag::InvalidGrade);
            }
        }
    }

    match final_grade {
        Value::Unresolved => {
            flags.insert(ResultFlag::InvalidPredictedGrade);
        }
        Value::Resolved(candidate) => {
            if scale.integer_grades && candidate.fract() != 0.0 {
                flags.insert(ResultFlag::InvalidPredictedGrade);
            }
            if candidate < 0.0 || candidate > scale.max_final_grade {
                flags.insert(ResultFlag::OutOfRangePredictedGrade);
            }
        }
    }

    StudentEvaluationResult {
        user,
        final_grade,
        flags,
    }
}
