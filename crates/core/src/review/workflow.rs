//! The bulk review workflow.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::marketplace::{MarketplaceGateway, TaskRating};
use crate::metrics;

use super::types::{
    BatchOutcome, ItemStatus, ReviewDecision, ReviewError, ReviewStateStore,
};

/// Applies review decisions to batches of worker submissions.
pub struct TaskReviewWorkflow {
    gateway: Arc<dyn MarketplaceGateway>,
    store: Arc<dyn ReviewStateStore>,
}

impl TaskReviewWorkflow {
    pub fn new(gateway: Arc<dyn MarketplaceGateway>, store: Arc<dyn ReviewStateStore>) -> Self {
        Self { gateway, store }
    }

    /// Approve a batch of submissions (OK rating, no reason needed).
    pub async fn approve(&self, task_ids: &[String]) -> BatchOutcome {
        self.rate_batch(task_ids, ReviewDecision::Approved, TaskRating::Ok, None)
            .await
    }

    /// Request revision on a batch. The reason must be non-empty.
    pub async fn request_revision(
        &self,
        task_ids: &[String],
        reason: &str,
    ) -> Result<BatchOutcome, ReviewError> {
        require_reason(reason)?;
        Ok(self
            .rate_batch(
                task_ids,
                ReviewDecision::RevisionRequested,
                TaskRating::Revise,
                Some(reason),
            )
            .await)
    }

    /// Reject a batch. The reason must be non-empty.
    pub async fn reject(
        &self,
        task_ids: &[String],
        reason: &str,
    ) -> Result<BatchOutcome, ReviewError> {
        require_reason(reason)?;
        Ok(self
            .rate_batch(
                task_ids,
                ReviewDecision::Rejected,
                TaskRating::Nok,
                Some(reason),
            )
            .await)
    }

    /// Remove submissions from local review state. No marketplace call;
    /// deletion is a local bookkeeping decision.
    pub async fn delete(&self, task_ids: &[String]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for task_id in task_ids {
            match self.store.remove(task_id) {
                Ok(()) => outcome.push(task_id, ItemStatus::Success, None),
                Err(e) => outcome.push(task_id, ItemStatus::Failed, Some(e.to_string())),
            }
        }
        outcome
    }

    /// Rate each task independently: local state first (optimistic, never
    /// rolled back), then the remote calls concurrently. A failure on one
    /// id never stops the others.
    async fn rate_batch(
        &self,
        task_ids: &[String],
        decision: ReviewDecision,
        rating: TaskRating,
        reason: Option<&str>,
    ) -> BatchOutcome {
        // Optimistic local marks so the UI reflects the decision
        // immediately. A later remote failure leaves the mark in place
        // for the next reconciliation pass or a manual retry.
        for task_id in task_ids {
            if let Err(e) = self.store.mark(task_id, decision, reason) {
                warn!("Could not record decision for task {}: {}", task_id, e);
            }
        }

        let futures = task_ids.iter().map(|task_id| async move {
            let campaign_id = match self.store.campaign_for_task(task_id) {
                Ok(Some(id)) => id,
                Ok(None) => {
                    warn!("Task {} has no resolvable campaign, skipping", task_id);
                    return (task_id, ItemStatus::Skipped, Some("no campaign association".to_string()));
                }
                Err(e) => {
                    warn!("Campaign lookup for task {} failed: {}", task_id, e);
                    return (task_id, ItemStatus::Skipped, Some(e.to_string()));
                }
            };

            match self
                .gateway
                .rate_task(&campaign_id, task_id, rating, reason)
                .await
            {
                Ok(()) => {
                    debug!("Rated task {} {} in campaign {}", task_id, rating.as_str(), campaign_id);
                    (task_id, ItemStatus::Success, None)
                }
                Err(e) => {
                    warn!("Rating task {} failed: {}", task_id, e);
                    (task_id, ItemStatus::Failed, Some(e.to_string()))
                }
            }
        });

        let mut outcome = BatchOutcome::default();
        for (task_id, status, detail) in join_all(futures).await {
            let label = match status {
                ItemStatus::Success => "success",
                ItemStatus::Failed => "error",
                ItemStatus::Skipped => "skipped",
            };
            metrics::TASK_RATINGS
                .with_label_values(&[rating.as_str(), label])
                .inc();
            outcome.push(task_id, status, detail);
        }
        outcome
    }
}

fn require_reason(reason: &str) -> Result<(), ReviewError> {
    if reason.trim().is_empty() {
        Err(ReviewError::EmptyReason)
    } else {
        Ok(())
    }
}
