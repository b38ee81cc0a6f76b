//! Graph-level risk flags, assessed once per compiled model.
//!
//! A model that draws grades from an expired, archived or deleted course
//! task still evaluates normally; these flags are informational, attached
//! to the model rather than to any student, and gate only the downstream
//! commit step, which is not this crate's concern.

use chrono::{DateTime, Utc};

use super::program::CompiledModel;
use crate::model::{TaskCatalog, TaskId, TaskStatus};

/// Tasks reachable from the model's sources that a teacher should look at
/// before committing final grades. Each list is sorted and deduplicated so
/// identical models always report identically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelRisks {
    pub expired: Vec<TaskId>,
    pub archived: Vec<TaskId>,
    pub deleted: Vec<TaskId>,
}

impl ModelRisks {
    pub fn is_clean(&self) -> bool {
        self.expired.is_empty() && self.archived.is_empty() && self.deleted.is_empty()
    }
}

pub fn assess_risks(
    model: &CompiledModel,
    catalog: &TaskCatalog,
    reference: DateTime<Utc>,
) -> ModelRisks {
    let mut risks = ModelRisks::default();

    for binding in model.sources() {
        // Compilation rejected unknown tasks, so the lookup cannot miss.
        let Some(task) = catalog.get(binding.task) else {
            continue;
        };
        match task.status {
            TaskStatus::Active => {}
            TaskStatus::Archived => risks.archived.push(task.id),
            TaskStatus::Deleted => risks.deleted.push(task.id),
        }
        if matches!(task.expiry_date, Some(expiry) if expiry < reference) {
            risks.expired.push(task.id);
        }
    }

    for list in [&mut risks.expired, &mut risks.archived, &mut risks.deleted] {
        list.sort_unstable();
        list.dedup();
    }

    if !risks.is_clean() {
        tracing::debug!(
            expired = risks.expired.len(),
            archived = risks.archived.len(),
            deleted = risks.deleted.len(),
            "model draws on at-risk tasks"
        );
    }
    risks
}
