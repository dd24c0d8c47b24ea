//! Core binding data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ContentRef;
use crate::marketplace::CampaignStatus;

/// Default number of task positions requested per campaign.
pub const DEFAULT_TARGET_POSITIONS: u32 = 30;

/// Minimum number of task positions the marketplace accepts.
pub const MIN_TARGET_POSITIONS: u32 = 10;

/// Remote campaign/template identifier pair.
///
/// The two ids are created together and never exist independently; a dead
/// campaign is replaced by overwriting the whole pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePair {
    pub campaign_id: String,
    pub template_id: String,
}

impl RemotePair {
    pub fn new(campaign_id: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            template_id: template_id.into(),
        }
    }
}

/// The local record binding a content item to a remote campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignBinding {
    /// The bound content entity.
    pub entity: ContentRef,
    /// Operator intent: should paid work run for this item?
    pub desired_enabled: bool,
    /// Remote campaign id; absent until first successful creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    /// Remote instruction-template id, one-to-one with `campaign_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// Number of task slots requested.
    pub target_positions: u32,
    /// Last observed remote state. Advisory cache, not authoritative.
    pub remote_status: CampaignStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CampaignBinding {
    /// Both remote ids, when the binding has a live pair.
    pub fn remote_pair(&self) -> Option<RemotePair> {
        match (&self.campaign_id, &self.template_id) {
            (Some(c), Some(t)) => Some(RemotePair::new(c.clone(), t.clone())),
            _ => None,
        }
    }

    /// Status used for decisions. A binding without a campaign id always
    /// reads as `Unknown` regardless of the stored cache value.
    pub fn effective_status(&self) -> CampaignStatus {
        if self.campaign_id.is_none() {
            CampaignStatus::Unknown
        } else {
            self.remote_status
        }
    }

    /// "Needs restart": enabled intent against a naturally expired campaign.
    pub fn needs_restart(&self) -> bool {
        self.desired_enabled && self.effective_status().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;

    fn binding() -> CampaignBinding {
        CampaignBinding {
            entity: ContentRef::new(ContentKind::Page, "site-1", "p-1"),
            desired_enabled: false,
            campaign_id: None,
            template_id: None,
            target_positions: DEFAULT_TARGET_POSITIONS,
            remote_status: CampaignStatus::Unknown,
            last_synced_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_effective_status_without_campaign_is_unknown() {
        let mut b = binding();
        // Stale cache value must be masked while no campaign is bound.
        b.remote_status = CampaignStatus::Finished;
        assert_eq!(b.effective_status(), CampaignStatus::Unknown);

        b.campaign_id = Some("c-1".into());
        b.template_id = Some("t-1".into());
        assert_eq!(b.effective_status(), CampaignStatus::Finished);
    }

    #[test]
    fn test_remote_pair_requires_both_ids() {
        let mut b = binding();
        assert!(b.remote_pair().is_none());

        b.campaign_id = Some("c-1".into());
        assert!(b.remote_pair().is_none());

        b.template_id = Some("t-1".into());
        let pair = b.remote_pair().unwrap();
        assert_eq!(pair.campaign_id, "c-1");
        assert_eq!(pair.template_id, "t-1");
    }

    #[test]
    fn test_needs_restart() {
        let mut b = binding();
        b.campaign_id = Some("c-1".into());
        b.template_id = Some("t-1".into());
        b.remote_status = CampaignStatus::Ended;
        assert!(!b.needs_restart());

        b.desired_enabled = true;
        assert!(b.needs_restart());

        b.remote_status = CampaignStatus::Running;
        assert!(!b.needs_restart());
    }
}
