//! Grade records and the selection policy that reduces them to one
//! effective input per task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{TaskId, UserId};

/// One raw grade entry for a (student, task) pair, owned by the caller's
/// record store. Multiple records per pair are normal; none are mutated
/// during evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub task: TaskId,
    pub grade: f64,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
}

impl GradeRecord {
    /// A record is expired when its expiry date lies strictly before the
    /// reference date. A record expiring exactly at the reference instant
    /// is still valid.
    pub fn is_expired(&self, reference: DateTime<Utc>) -> bool {
        matches!(self.expiry_date, Some(expiry) if expiry < reference)
    }
}

/// Which record wins when a student has several for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Highest grade; ties broken by later date, then by record order.
    Best,
    /// Most recent date; ties broken by higher grade, then by record order.
    Latest,
}

/// Whether expired records participate in selection at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiredOption {
    NonExpired,
    IncludeExpired,
}

/// The full selection policy applied uniformly to every (student, task)
/// pair of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPolicy {
    pub mode: SelectionMode,
    pub expired: ExpiredOption,
}

/// The single value selected for one source node, with provenance back to
/// the record it came from. Recomputed per batch run, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveInput {
    pub value: f64,
    pub date: DateTime<Utc>,
    /// Position of the winning record in the student's record list.
    pub record_index: usize,
}

/// One student's complete input to a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentInput {
    pub user: UserId,
    pub records: Vec<GradeRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn expiry_boundary_is_strict() {
        let reference = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut record = GradeRecord {
            task: TaskId(1),
            grade: 5.0,
            date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            expiry_date: Some(reference),
        };

        // Expiring exactly at the reference instant is still valid.
        assert!(!record.is_expired(reference));

        record.expiry_date = Some(reference - chrono::Duration::seconds(1));
        assert!(record.is_expired(reference));

        record.expiry_date = None;
        assert!(!record.is_expired(reference));
    }

    #[test]
    fn policy_uses_wire_names() {
        let policy: SelectionPolicy =
            serde_json::from_str(r#"{"mode": "latest", "expired": "non_expired"}"#).unwrap();
        assert_eq!(policy.mode, SelectionMode::Latest);
        assert_eq!(policy.expired, ExpiredOption::NonExpired);
    }
}
