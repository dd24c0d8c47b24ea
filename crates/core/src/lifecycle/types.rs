//! Lifecycle error taxonomy, outcomes and the per-entity busy marker.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;

use crate::binding::CampaignBinding;
use crate::marketplace::MarketplaceError;
use crate::template::TemplateError;

/// Errors surfaced by lifecycle operations.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// Input or remote-side validation failure. Not retried automatically;
    /// the field/detail from the remote response is surfaced verbatim.
    #[error("Validation failed on '{field}': {detail}")]
    Validation { field: String, detail: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A transition is already in flight for this entity. The caller
    /// retries after the current one settles; requests are not queued.
    #[error("Operation already in flight for {0}")]
    OperationInFlight(String),

    /// Network failure or timeout talking to the marketplace. Retryable
    /// by the operator; no automatic retry is issued.
    #[error("Marketplace unreachable: {0}")]
    RemoteUnavailable(String),

    #[error("Marketplace error: {0}")]
    Remote(String),

    /// The remote call succeeded but the local write did not. The system
    /// is in a recoverable but inconsistent state; flagged distinctly so
    /// it is never mistaken for a clean failure.
    #[error("Remote succeeded (campaign {campaign_id}) but local save failed: {detail}")]
    LocalSaveFailed { campaign_id: String, detail: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CampaignError {
    /// Translate a gateway error at the controller boundary. `DoesNotExist`
    /// and `AlreadyInState` never reach this function; they are handled at
    /// the call sites that can recover from them.
    pub(crate) fn from_remote(e: MarketplaceError) -> Self {
        match e {
            MarketplaceError::ValidationFailed { field, detail } => {
                CampaignError::Validation { field, detail }
            }
            MarketplaceError::Timeout => {
                CampaignError::RemoteUnavailable("request timeout".to_string())
            }
            MarketplaceError::ConnectionFailed(detail) => CampaignError::RemoteUnavailable(detail),
            other => CampaignError::Remote(other.to_string()),
        }
    }
}

/// What the controller did to satisfy a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    /// Fresh campaign/template pair created for a binding without one.
    CreatedCampaign,
    /// The remote had forgotten the stored pair; a fresh one replaced it.
    ReplacedDeadCampaign,
    ResumedCampaign,
    RestartedCampaign,
    PausedCampaign,
    /// Nothing to pause remotely; only the local intent changed.
    SkippedPause,
}

/// Result of a successful transition: the persisted binding plus the
/// action taken to get there.
#[derive(Debug, Clone, Serialize)]
pub struct BindingUpdate {
    pub binding: CampaignBinding,
    pub action: LifecycleAction,
}

/// Result of an upsert.
#[derive(Debug, Clone, Serialize)]
pub struct UpsertOutcome {
    pub campaign_id: String,
    pub template_id: String,
    /// True when a new pair was created rather than the existing one
    /// being updated in place.
    pub is_new: bool,
}

/// Per-entity busy marker.
///
/// While a transition is in flight for an entity, further transition
/// requests for the same entity are rejected rather than queued. Entities
/// are independent; there is no global lock.
#[derive(Clone, Default)]
pub struct InFlightMarker {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl InFlightMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to mark the key as busy. Returns `None` when already in flight.
    pub fn try_acquire(&self, key: &str) -> Option<InFlightToken> {
        let mut set = self.inner.lock().unwrap();
        if set.insert(key.to_string()) {
            Some(InFlightToken {
                key: key.to_string(),
                inner: Arc::clone(&self.inner),
            })
        } else {
            None
        }
    }

    /// Whether a transition is currently in flight for the key.
    pub fn is_busy(&self, key: &str) -> bool {
        self.inner.lock().unwrap().contains(key)
    }
}

/// Releases the busy marker on drop, including on error paths.
pub struct InFlightToken {
    key: String,
    inner: Arc<Mutex<HashSet<String>>>,
}

impl Drop for InFlightToken {
    fn drop(&mut self) {
        self.inner.lock().unwrap().remove(&self.key);
    }
}
