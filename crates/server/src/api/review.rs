//! Task review API handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crowdlift_core::marketplace::{MarketplaceError, SubmissionStatus, SubmittedTask};
use crowdlift_core::review::{
    BatchOutcome, ReviewDecision, ReviewError, REJECT_REASONS, REVISION_REASONS,
};

use super::ErrorResponse;
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing submitted tasks
#[derive(Debug, Deserialize)]
pub struct ListTasksParams {
    pub campaign_id: String,
    /// Filter by submission status
    pub status: Option<String>,
}

/// Request body for bulk review operations
#[derive(Debug, Deserialize)]
pub struct BatchBody {
    pub task_ids: Vec<String>,
    /// Required for reject and revision requests
    pub reason: Option<String>,
}

/// A submitted task plus any locally recorded decision
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub campaign_id: String,
    pub worker_id: String,
    pub proof: String,
    pub status: SubmissionStatus,
    pub submitted_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_decision: Option<ReviewDecision>,
}

#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    pub tasks: Vec<TaskResponse>,
}

/// Suggestion lists for the reason picker
#[derive(Debug, Serialize)]
pub struct ReasonsResponse {
    pub reject: Vec<&'static str>,
    pub revision: Vec<&'static str>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List worker submissions for a campaign.
///
/// Remembers each task's campaign association so later rating calls can
/// resolve it without another round trip.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTasksParams>,
) -> Result<Json<ListTasksResponse>, ApiError> {
    let status = params.status.as_deref().map(parse_status).transpose()?;

    let tasks = state
        .gateway()
        .list_submitted_tasks(&params.campaign_id, status)
        .await
        .map_err(marketplace_error)?;

    let mut out = Vec::with_capacity(tasks.len());
    for task in tasks {
        if let Err(e) = state.review_store().remember_task(&task.id, &task.campaign_id) {
            warn!("Could not remember campaign for task {}: {}", task.id, e);
        }
        let local_decision = state
            .review_store()
            .get(&task.id)
            .ok()
            .flatten()
            .map(|r| r.decision);
        out.push(task_response(task, local_decision));
    }

    Ok(Json(ListTasksResponse { tasks: out }))
}

/// Approve a batch of submissions
pub async fn approve(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BatchBody>,
) -> Json<BatchOutcome> {
    Json(state.review().approve(&body.task_ids).await)
}

/// Request revision on a batch of submissions
pub async fn request_revision(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BatchBody>,
) -> Result<Json<BatchOutcome>, ApiError> {
    let reason = body.reason.unwrap_or_default();
    state
        .review()
        .request_revision(&body.task_ids, &reason)
        .await
        .map(Json)
        .map_err(review_error)
}

/// Reject a batch of submissions
pub async fn reject(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BatchBody>,
) -> Result<Json<BatchOutcome>, ApiError> {
    let reason = body.reason.unwrap_or_default();
    state
        .review()
        .reject(&body.task_ids, &reason)
        .await
        .map(Json)
        .map_err(review_error)
}

/// Remove submissions from local review state
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BatchBody>,
) -> Json<BatchOutcome> {
    Json(state.review().delete(&body.task_ids).await)
}

/// Suggestion lists for the reason picker
pub async fn reasons() -> Json<ReasonsResponse> {
    Json(ReasonsResponse {
        reject: REJECT_REASONS.to_vec(),
        revision: REVISION_REASONS.to_vec(),
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn task_response(task: SubmittedTask, local_decision: Option<ReviewDecision>) -> TaskResponse {
    TaskResponse {
        id: task.id,
        campaign_id: task.campaign_id,
        worker_id: task.worker_id,
        proof: task.proof,
        status: task.status,
        submitted_at: task.submitted_at.to_rfc3339(),
        local_decision,
    }
}

fn parse_status(s: &str) -> Result<SubmissionStatus, ApiError> {
    match s {
        "submitted" => Ok(SubmissionStatus::Submitted),
        "approved" => Ok(SubmissionStatus::Approved),
        "rejected" => Ok(SubmissionStatus::Rejected),
        "revision_requested" => Ok(SubmissionStatus::RevisionRequested),
        other => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!(
                "Unknown submission status: {}",
                other
            ))),
        )),
    }
}

fn marketplace_error(e: MarketplaceError) -> ApiError {
    let status = match &e {
        MarketplaceError::DoesNotExist(_) => StatusCode::NOT_FOUND,
        MarketplaceError::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, Json(ErrorResponse::new(e.to_string())))
}

fn review_error(e: ReviewError) -> ApiError {
    let status = match &e {
        ReviewError::EmptyReason => StatusCode::UNPROCESSABLE_ENTITY,
        ReviewError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(e.to_string())))
}
