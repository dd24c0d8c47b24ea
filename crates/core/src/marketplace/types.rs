//! Types for marketplace gateway operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during marketplace gateway operations.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// The marketplace rejected the payload (insufficient pay, bad
    /// category, malformed field). Surfaced to the operator verbatim.
    #[error("Validation failed on '{field}': {detail}")]
    ValidationFailed { field: String, detail: String },

    /// The remote campaign or template does not exist (HTTP 404).
    #[error("Does not exist: {0}")]
    DoesNotExist(String),

    /// The campaign is already in the requested state (already paused,
    /// not paused, not finished). Callers treat this as success.
    #[error("Already in state: {0}")]
    AlreadyInState(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error: {0}")]
    ApiError(String),
}

impl MarketplaceError {
    /// True for the 404 family that triggers fall-back-to-create.
    pub fn is_does_not_exist(&self) -> bool {
        matches!(self, MarketplaceError::DoesNotExist(_))
    }

    /// True for "already in state" responses treated as success.
    pub fn is_already_in_state(&self) -> bool {
        matches!(self, MarketplaceError::AlreadyInState(_))
    }
}

/// Remote campaign status as reported by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// No status observed yet (or no remote campaign bound).
    Unknown,
    /// Workers are actively picking up tasks.
    Running,
    /// Paused by the employer.
    Paused,
    /// Paused by the marketplace (funds exhausted, policy hold).
    PausedSystem,
    /// All positions filled and rated.
    Finished,
    /// Expired without filling all positions.
    Ended,
    /// The marketplace no longer knows the campaign.
    NotFound,
    /// Status query failed on the remote side.
    Error,
}

impl CampaignStatus {
    /// Returns the string representation for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Unknown => "unknown",
            CampaignStatus::Running => "running",
            CampaignStatus::Paused => "paused",
            CampaignStatus::PausedSystem => "paused_system",
            CampaignStatus::Finished => "finished",
            CampaignStatus::Ended => "ended",
            CampaignStatus::NotFound => "not_found",
            CampaignStatus::Error => "error",
        }
    }

    /// Terminal states: the campaign will never run again as-is and a
    /// restart (or fresh creation) is required to get more work done.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Finished | CampaignStatus::Ended)
    }
}

/// Request to create a new campaign.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCampaignRequest {
    pub title: String,
    pub category_id: u32,
    pub template_id: String,
    pub available_positions: u32,
    pub pay_per_task_cents: u32,
    pub minutes_to_finish: u32,
    pub time_to_rate_hours: u32,
    /// Refill positions automatically as submissions are rejected.
    pub auto_refill_positions: bool,
}

/// Partial update for an existing campaign.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CampaignPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_positions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_refill_positions: Option<bool>,
}

impl CampaignPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_positions(mut self, positions: u32) -> Self {
        self.available_positions = Some(positions);
        self
    }

    pub fn with_auto_refill(mut self, auto_refill: bool) -> Self {
        self.auto_refill_positions = Some(auto_refill);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.available_positions.is_none() && self.auto_refill_positions.is_none()
    }
}

/// Review status of a worker submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Submitted, awaiting employer rating.
    Submitted,
    Approved,
    Rejected,
    RevisionRequested,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::RevisionRequested => "revision_requested",
        }
    }
}

/// A worker-submitted proof of completed work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedTask {
    pub id: String,
    pub campaign_id: String,
    pub worker_id: String,
    /// Proof text/URL the worker submitted.
    pub proof: String,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Rating applied to a worker submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskRating {
    Ok,
    Nok,
    Revise,
}

impl TaskRating {
    /// Wire representation expected by the marketplace.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskRating::Ok => "OK",
            TaskRating::Nok => "NOK",
            TaskRating::Revise => "REVISE",
        }
    }
}

/// Trait for marketplace gateway backends.
#[async_trait]
pub trait MarketplaceGateway: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Create an instruction template. Returns the remote template id.
    async fn create_template(&self, title: &str, body: &str)
        -> Result<String, MarketplaceError>;

    /// Replace the body of an existing instruction template.
    async fn update_template(
        &self,
        template_id: &str,
        body: &str,
    ) -> Result<(), MarketplaceError>;

    /// Create a campaign. Returns the remote campaign id.
    async fn create_campaign(
        &self,
        request: CreateCampaignRequest,
    ) -> Result<String, MarketplaceError>;

    /// Patch positions/auto-refill on an existing campaign.
    async fn update_campaign(
        &self,
        campaign_id: &str,
        patch: CampaignPatch,
    ) -> Result<(), MarketplaceError>;

    /// Pause a running campaign.
    async fn pause_campaign(&self, campaign_id: &str) -> Result<(), MarketplaceError>;

    /// Resume a paused campaign.
    async fn resume_campaign(&self, campaign_id: &str) -> Result<(), MarketplaceError>;

    /// Restart a finished or ended campaign with additional positions.
    async fn restart_campaign(
        &self,
        campaign_id: &str,
        positions_to_add: u32,
    ) -> Result<(), MarketplaceError>;

    /// Query the current remote status. A campaign the marketplace has
    /// forgotten reports `CampaignStatus::NotFound` rather than an error.
    async fn campaign_status(
        &self,
        campaign_id: &str,
    ) -> Result<CampaignStatus, MarketplaceError>;

    /// List worker submissions for a campaign, optionally filtered.
    async fn list_submitted_tasks(
        &self,
        campaign_id: &str,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<SubmittedTask>, MarketplaceError>;

    /// Rate a worker submission.
    async fn rate_task(
        &self,
        campaign_id: &str,
        task_id: &str,
        rating: TaskRating,
        reason: Option<&str>,
    ) -> Result<(), MarketplaceError>;
}
