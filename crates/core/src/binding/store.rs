//! Binding storage trait and patch types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::content::{ContentKind, ContentRef};
use crate::marketplace::CampaignStatus;

use super::{CampaignBinding, RemotePair};

/// Error type for binding store operations.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("Binding not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Per-field update applied to a binding.
///
/// Writes are last-writer-wins per field: the reconciler updating
/// `remote_status` never clobbers a concurrently changed
/// `target_positions`, and vice versa. The remote pair is patched as a
/// unit so `campaign_id` and `template_id` can never diverge.
#[derive(Debug, Clone, Default)]
pub struct BindingPatch {
    pub desired_enabled: Option<bool>,
    /// `Some(Some(pair))` sets a new pair, `Some(None)` clears it.
    pub remote_pair: Option<Option<RemotePair>>,
    pub target_positions: Option<u32>,
    pub remote_status: Option<CampaignStatus>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl BindingPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.desired_enabled = Some(enabled);
        self
    }

    pub fn with_pair(mut self, pair: RemotePair) -> Self {
        self.remote_pair = Some(Some(pair));
        self
    }

    pub fn clearing_pair(mut self) -> Self {
        self.remote_pair = Some(None);
        self
    }

    pub fn with_positions(mut self, positions: u32) -> Self {
        self.target_positions = Some(positions);
        self
    }

    pub fn with_status(mut self, status: CampaignStatus) -> Self {
        self.remote_status = Some(status);
        self
    }

    pub fn with_synced_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_synced_at = Some(at);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.desired_enabled.is_none()
            && self.remote_pair.is_none()
            && self.target_positions.is_none()
            && self.remote_status.is_none()
            && self.last_synced_at.is_none()
    }
}

/// Filter for querying bindings.
#[derive(Debug, Clone, Default)]
pub struct BindingFilter {
    /// Filter by desired-enabled flag.
    pub enabled: Option<bool>,
    /// Filter by entity kind.
    pub kind: Option<ContentKind>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl BindingFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            enabled: None,
            kind: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for binding storage backends.
pub trait BindingStore: Send + Sync {
    /// Get the binding for an entity, if one exists.
    fn get(&self, entity: &ContentRef) -> Result<Option<CampaignBinding>, BindingError>;

    /// Get the binding for an entity, lazily creating a disabled one with
    /// the given position count on first access.
    fn get_or_create(
        &self,
        entity: &ContentRef,
        positions: u32,
    ) -> Result<CampaignBinding, BindingError>;

    /// List bindings matching the filter.
    fn list(&self, filter: &BindingFilter) -> Result<Vec<CampaignBinding>, BindingError>;

    /// Count bindings matching the filter.
    fn count(&self, filter: &BindingFilter) -> Result<i64, BindingError>;

    /// Apply a per-field patch and return the updated binding.
    fn apply(
        &self,
        entity: &ContentRef,
        patch: BindingPatch,
    ) -> Result<CampaignBinding, BindingError>;
}
