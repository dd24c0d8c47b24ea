//! Binding API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crowdlift_core::binding::{BindingFilter, CampaignBinding};
use crowdlift_core::content::{ContentFields, ContentKind, ContentRef};
use crowdlift_core::lifecycle::{CampaignError, LifecycleAction};

use super::ErrorResponse;
use crate::state::AppState;

/// Maximum allowed limit for binding queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for binding queries
const DEFAULT_LIMIT: i64 = 100;

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing bindings
#[derive(Debug, Deserialize)]
pub struct ListBindingsParams {
    /// Filter by desired-enabled flag
    pub enabled: Option<bool>,
    /// Filter by entity kind
    pub kind: Option<String>,
    /// Maximum number of bindings to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

/// Request body for a work toggle
#[derive(Debug, Deserialize)]
pub struct SetWorkBody {
    pub enabled: bool,
    /// Task positions; clamped to the marketplace minimum
    pub positions: Option<u32>,
    pub fields: ContentFields,
}

/// Request body for a content-edit notification
#[derive(Debug, Deserialize)]
pub struct FieldsChangedBody {
    pub fields: ContentFields,
}

/// Response for binding operations
#[derive(Debug, Serialize)]
pub struct BindingResponse {
    pub entity: ContentRef,
    pub desired_enabled: bool,
    pub campaign_id: Option<String>,
    pub template_id: Option<String>,
    pub target_positions: u32,
    /// Effective status: UNKNOWN while no campaign is bound
    pub remote_status: String,
    pub last_synced_at: Option<String>,
    /// Whether a transition is currently in flight
    pub busy: bool,
    pub updated_at: String,
}

impl BindingResponse {
    fn from_binding(binding: CampaignBinding, busy: bool) -> Self {
        Self {
            remote_status: binding.effective_status().as_str().to_string(),
            entity: binding.entity,
            desired_enabled: binding.desired_enabled,
            campaign_id: binding.campaign_id,
            template_id: binding.template_id,
            target_positions: binding.target_positions,
            last_synced_at: binding.last_synced_at.map(|t| t.to_rfc3339()),
            busy,
            updated_at: binding.updated_at.to_rfc3339(),
        }
    }
}

/// Response for listing bindings
#[derive(Debug, Serialize)]
pub struct ListBindingsResponse {
    pub bindings: Vec<BindingResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for a work toggle
#[derive(Debug, Serialize)]
pub struct WorkResponse {
    pub action: LifecycleAction,
    pub binding: BindingResponse,
}

// ============================================================================
// Handlers
// ============================================================================

/// List bindings
pub async fn list_bindings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListBindingsParams>,
) -> Result<Json<ListBindingsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = BindingFilter::new().with_limit(limit).with_offset(offset);
    if let Some(enabled) = params.enabled {
        filter = filter.with_enabled(enabled);
    }
    if let Some(ref kind) = params.kind {
        let kind = parse_kind(kind)?;
        filter = filter.with_kind(kind);
    }

    let total = state.bindings().count(&filter).map_err(internal_error)?;
    let bindings = state
        .bindings()
        .list(&filter)
        .map_err(internal_error)?
        .into_iter()
        .map(|b| {
            let busy = state.controller().is_busy(&b.entity);
            BindingResponse::from_binding(b, busy)
        })
        .collect();

    Ok(Json(ListBindingsResponse {
        bindings,
        total,
        limit,
        offset,
    }))
}

/// Get a single binding
pub async fn get_binding(
    State(state): State<Arc<AppState>>,
    Path((kind, website_id, entity_id)): Path<(String, String, String)>,
) -> Result<Json<BindingResponse>, ApiError> {
    let entity = parse_entity(&kind, &website_id, &entity_id)?;

    match state.bindings().get(&entity).map_err(internal_error)? {
        Some(binding) => {
            let busy = state.controller().is_busy(&entity);
            Ok(Json(BindingResponse::from_binding(binding, busy)))
        }
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("No binding for {}", entity))),
        )),
    }
}

/// Toggle paid work for a content item
pub async fn set_work(
    State(state): State<Arc<AppState>>,
    Path((kind, website_id, entity_id)): Path<(String, String, String)>,
    Json(body): Json<SetWorkBody>,
) -> Result<Json<WorkResponse>, ApiError> {
    let entity = parse_entity(&kind, &website_id, &entity_id)?;

    let update = state
        .controller()
        .set_desired_enabled(&entity, &body.fields, body.enabled, body.positions)
        .await
        .map_err(campaign_error)?;

    Ok(Json(WorkResponse {
        action: update.action,
        binding: BindingResponse::from_binding(update.binding, false),
    }))
}

/// Content-edit notification: best-effort template resync
pub async fn content_changed(
    State(state): State<Arc<AppState>>,
    Path((kind, website_id, entity_id)): Path<(String, String, String)>,
    Json(body): Json<FieldsChangedBody>,
) -> Result<StatusCode, ApiError> {
    let entity = parse_entity(&kind, &website_id, &entity_id)?;

    // Never fails the originating content edit.
    state.controller().resync_template(&entity, &body.fields).await;
    Ok(StatusCode::ACCEPTED)
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_kind(kind: &str) -> Result<ContentKind, ApiError> {
    ContentKind::parse(kind).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!("Unknown entity kind: {}", kind))),
        )
    })
}

fn parse_entity(kind: &str, website_id: &str, entity_id: &str) -> Result<ContentRef, ApiError> {
    let kind = parse_kind(kind)?;
    Ok(ContentRef::new(kind, website_id, entity_id))
}

fn internal_error(e: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(e.to_string())),
    )
}

fn campaign_error(e: CampaignError) -> ApiError {
    let status = match &e {
        CampaignError::OperationInFlight(_) => StatusCode::CONFLICT,
        CampaignError::Validation { .. } | CampaignError::Template(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CampaignError::RemoteUnavailable(_) | CampaignError::Remote(_) => StatusCode::BAD_GATEWAY,
        CampaignError::LocalSaveFailed { .. } | CampaignError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(e.to_string())))
}
