//! Review decisions, batch outcomes and the local decision store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::marketplace::TaskRating;

/// Fixed suggestion list for rejections; free text is also accepted.
pub const REJECT_REASONS: &[&str] = &[
    "Proof does not show the task was completed",
    "Wrong page or profile",
    "Submission is a duplicate",
    "Task completed after the deadline",
];

/// Fixed suggestion list for revision requests.
pub const REVISION_REASONS: &[&str] = &[
    "Proof is unreadable, please re-upload",
    "Missing the final landing URL",
    "Comment was removed, please post again",
];

/// Errors from review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Reject and revision-request need a non-empty reason.
    #[error("A reason is required for this decision")]
    EmptyReason,

    #[error("Review storage error: {0}")]
    Storage(String),
}

/// Operator decision on a worker submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    RevisionRequested,
    Rejected,
    /// Local-only removal; no marketplace call.
    Deleted,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approved => "approved",
            ReviewDecision::RevisionRequested => "revision_requested",
            ReviewDecision::Rejected => "rejected",
            ReviewDecision::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approved" => Some(ReviewDecision::Approved),
            "revision_requested" => Some(ReviewDecision::RevisionRequested),
            "rejected" => Some(ReviewDecision::Rejected),
            "deleted" => Some(ReviewDecision::Deleted),
            _ => None,
        }
    }

    /// The marketplace rating this decision maps to, when it maps at all.
    pub fn rating(&self) -> Option<TaskRating> {
        match self {
            ReviewDecision::Approved => Some(TaskRating::Ok),
            ReviewDecision::RevisionRequested => Some(TaskRating::Revise),
            ReviewDecision::Rejected => Some(TaskRating::Nok),
            ReviewDecision::Deleted => None,
        }
    }

    /// Whether the decision requires a non-empty reason.
    pub fn requires_reason(&self) -> bool {
        matches!(
            self,
            ReviewDecision::RevisionRequested | ReviewDecision::Rejected
        )
    }
}

/// A locally persisted review decision.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewRecord {
    pub task_id: String,
    pub decision: ReviewDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// Outcome of a single item within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Success,
    Failed,
    /// No resolvable campaign for this task; left alone with a warning.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    pub task_id: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Per-item results of a bulk operation. The batch as a whole always
/// "succeeds"; callers report the counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub success: usize,
    pub failure: usize,
    pub skipped: usize,
    pub items: Vec<ItemOutcome>,
}

impl BatchOutcome {
    pub(crate) fn push(&mut self, task_id: &str, status: ItemStatus, detail: Option<String>) {
        match status {
            ItemStatus::Success => self.success += 1,
            ItemStatus::Failed => self.failure += 1,
            ItemStatus::Skipped => self.skipped += 1,
        }
        self.items.push(ItemOutcome {
            task_id: task_id.to_string(),
            status,
            detail,
        });
    }
}

/// Local persistence of review decisions and task-to-campaign mapping.
///
/// The mapping is remembered when tasks are listed, so later rating calls
/// can resolve the campaign without another remote round trip.
pub trait ReviewStateStore: Send + Sync {
    /// Record a decision for a task, overwriting any earlier one.
    fn mark(
        &self,
        task_id: &str,
        decision: ReviewDecision,
        reason: Option<&str>,
    ) -> Result<(), ReviewError>;

    /// Look up the recorded decision for a task.
    fn get(&self, task_id: &str) -> Result<Option<ReviewRecord>, ReviewError>;

    /// Remove any recorded decision for a task.
    fn remove(&self, task_id: &str) -> Result<(), ReviewError>;

    /// Remember which campaign a task belongs to.
    fn remember_task(&self, task_id: &str, campaign_id: &str) -> Result<(), ReviewError>;

    /// Resolve the campaign a task was listed under.
    fn campaign_for_task(&self, task_id: &str) -> Result<Option<String>, ReviewError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_rating_mapping() {
        assert_eq!(ReviewDecision::Approved.rating(), Some(TaskRating::Ok));
        assert_eq!(
            ReviewDecision::RevisionRequested.rating(),
            Some(TaskRating::Revise)
        );
        assert_eq!(ReviewDecision::Rejected.rating(), Some(TaskRating::Nok));
        assert_eq!(ReviewDecision::Deleted.rating(), None);
    }

    #[test]
    fn test_decision_reason_requirement() {
        assert!(ReviewDecision::Rejected.requires_reason());
        assert!(ReviewDecision::RevisionRequested.requires_reason());
        assert!(!ReviewDecision::Approved.requires_reason());
        assert!(!ReviewDecision::Deleted.requires_reason());
    }

    #[test]
    fn test_decision_roundtrip() {
        for decision in [
            ReviewDecision::Approved,
            ReviewDecision::RevisionRequested,
            ReviewDecision::Rejected,
            ReviewDecision::Deleted,
        ] {
            assert_eq!(ReviewDecision::parse(decision.as_str()), Some(decision));
        }
    }

    #[test]
    fn test_batch_outcome_counts() {
        let mut outcome = BatchOutcome::default();
        outcome.push("t-1", ItemStatus::Success, None);
        outcome.push("t-2", ItemStatus::Failed, Some("boom".into()));
        outcome.push("t-3", ItemStatus::Skipped, None);
        assert_eq!(outcome.success, 1);
        assert_eq!(outcome.failure, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.items.len(), 3);
    }
}
