//! In-memory marketplace gateway for tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::marketplace::{
    CampaignPatch, CampaignStatus, CreateCampaignRequest, MarketplaceError, MarketplaceGateway,
    SubmissionStatus, SubmittedTask, TaskRating,
};

/// A recorded `rate_task` call.
#[derive(Debug, Clone)]
pub struct RatingCall {
    pub campaign_id: String,
    pub task_id: String,
    pub rating: TaskRating,
    pub reason: Option<String>,
}

#[derive(Default)]
struct MockState {
    next_id: u32,
    statuses: HashMap<String, CampaignStatus>,
    templates: HashMap<String, String>,
    template_updates: Vec<(String, String)>,
    vanished: HashSet<String>,
    next_error: Option<MarketplaceError>,
    rating_failures: HashSet<String>,
    rating_calls: Vec<RatingCall>,
    pause_calls: Vec<String>,
    resume_calls: Vec<String>,
    restart_calls: Vec<String>,
    campaign_updates: Vec<(String, CampaignPatch)>,
    created_campaigns: Vec<String>,
    tasks: HashMap<String, Vec<SubmittedTask>>,
}

/// Mock marketplace gateway with scriptable failures.
///
/// Campaigns created through the mock behave like live remote campaigns:
/// pause/resume/restart move the stored status, lifecycle calls on a
/// vanished or unknown id report `DoesNotExist`, and every mutating call
/// is recorded for assertions.
pub struct MockMarketplace {
    state: RwLock<MockState>,
}

impl MockMarketplace {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MockState::default()),
        }
    }

    /// Set the stored status for a campaign, creating it if unknown.
    pub async fn set_status(&self, campaign_id: &str, status: CampaignStatus) {
        let mut state = self.state.write().await;
        state.statuses.insert(campaign_id.to_string(), status);
    }

    /// Make every lifecycle call on this campaign report `DoesNotExist`,
    /// as if the marketplace purged it.
    pub async fn vanish_campaign(&self, campaign_id: &str) {
        let mut state = self.state.write().await;
        state.vanished.insert(campaign_id.to_string());
    }

    /// Make `rate_task` fail for a specific task id.
    pub async fn fail_rating_for(&self, task_id: &str) {
        let mut state = self.state.write().await;
        state.rating_failures.insert(task_id.to_string());
    }

    /// Inject an error to be returned by the next gateway call.
    pub async fn set_next_error(&self, error: MarketplaceError) {
        let mut state = self.state.write().await;
        state.next_error = Some(error);
    }

    /// Seed a submitted task under a campaign.
    pub async fn push_task(&self, task: SubmittedTask) {
        let mut state = self.state.write().await;
        state
            .tasks
            .entry(task.campaign_id.clone())
            .or_default()
            .push(task);
    }

    pub async fn rating_calls(&self) -> Vec<RatingCall> {
        self.state.read().await.rating_calls.clone()
    }

    pub async fn pause_calls(&self) -> Vec<String> {
        self.state.read().await.pause_calls.clone()
    }

    pub async fn resume_calls(&self) -> Vec<String> {
        self.state.read().await.resume_calls.clone()
    }

    pub async fn restart_calls(&self) -> Vec<String> {
        self.state.read().await.restart_calls.clone()
    }

    /// Campaign ids in creation order.
    pub async fn created_campaigns(&self) -> Vec<String> {
        self.state.read().await.created_campaigns.clone()
    }

    pub async fn campaign_update_count(&self) -> usize {
        self.state.read().await.campaign_updates.len()
    }

    pub async fn template_update_count(&self) -> usize {
        self.state.read().await.template_updates.len()
    }

    pub async fn template_body(&self, template_id: &str) -> Option<String> {
        self.state.read().await.templates.get(template_id).cloned()
    }

    fn take_next_error(state: &mut MockState) -> Result<(), MarketplaceError> {
        match state.next_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn ensure_alive(state: &MockState, campaign_id: &str) -> Result<(), MarketplaceError> {
        if state.vanished.contains(campaign_id) || !state.statuses.contains_key(campaign_id) {
            Err(MarketplaceError::DoesNotExist(campaign_id.to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MockMarketplace {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketplaceGateway for MockMarketplace {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_template(&self, _title: &str, body: &str) -> Result<String, MarketplaceError> {
        let mut state = self.state.write().await;
        Self::take_next_error(&mut state)?;
        state.next_id += 1;
        let id = format!("tpl-{:04}", state.next_id);
        state.templates.insert(id.clone(), body.to_string());
        Ok(id)
    }

    async fn update_template(
        &self,
        template_id: &str,
        body: &str,
    ) -> Result<(), MarketplaceError> {
        let mut state = self.state.write().await;
        Self::take_next_error(&mut state)?;
        if !state.templates.contains_key(template_id) {
            return Err(MarketplaceError::DoesNotExist(template_id.to_string()));
        }
        state
            .templates
            .insert(template_id.to_string(), body.to_string());
        state
            .template_updates
            .push((template_id.to_string(), body.to_string()));
        Ok(())
    }

    async fn create_campaign(
        &self,
        _request: CreateCampaignRequest,
    ) -> Result<String, MarketplaceError> {
        let mut state = self.state.write().await;
        Self::take_next_error(&mut state)?;
        state.next_id += 1;
        let id = format!("cmp-{:04}", state.next_id);
        state.statuses.insert(id.clone(), CampaignStatus::Running);
        state.created_campaigns.push(id.clone());
        Ok(id)
    }

    async fn update_campaign(
        &self,
        campaign_id: &str,
        patch: CampaignPatch,
    ) -> Result<(), MarketplaceError> {
        let mut state = self.state.write().await;
        Self::take_next_error(&mut state)?;
        Self::ensure_alive(&state, campaign_id)?;
        state
            .campaign_updates
            .push((campaign_id.to_string(), patch));
        Ok(())
    }

    async fn pause_campaign(&self, campaign_id: &str) -> Result<(), MarketplaceError> {
        let mut state = self.state.write().await;
        Self::take_next_error(&mut state)?;
        Self::ensure_alive(&state, campaign_id)?;
        state.pause_calls.push(campaign_id.to_string());
        match state.statuses.get(campaign_id) {
            Some(CampaignStatus::Paused) => {
                Err(MarketplaceError::AlreadyInState("already paused".to_string()))
            }
            _ => {
                state
                    .statuses
                    .insert(campaign_id.to_string(), CampaignStatus::Paused);
                Ok(())
            }
        }
    }

    async fn resume_campaign(&self, campaign_id: &str) -> Result<(), MarketplaceError> {
        let mut state = self.state.write().await;
        Self::take_next_error(&mut state)?;
        Self::ensure_alive(&state, campaign_id)?;
        state.resume_calls.push(campaign_id.to_string());
        match state.statuses.get(campaign_id) {
            Some(CampaignStatus::Paused) | Some(CampaignStatus::PausedSystem) => {
                state
                    .statuses
                    .insert(campaign_id.to_string(), CampaignStatus::Running);
                Ok(())
            }
            _ => Err(MarketplaceError::AlreadyInState("not paused".to_string())),
        }
    }

    async fn restart_campaign(
        &self,
        campaign_id: &str,
        _positions_to_add: u32,
    ) -> Result<(), MarketplaceError> {
        let mut state = self.state.write().await;
        Self::take_next_error(&mut state)?;
        Self::ensure_alive(&state, campaign_id)?;
        state.restart_calls.push(campaign_id.to_string());
        match state.statuses.get(campaign_id) {
            Some(s) if s.is_terminal() || *s == CampaignStatus::Paused => {
                state
                    .statuses
                    .insert(campaign_id.to_string(), CampaignStatus::Running);
                Ok(())
            }
            _ => Err(MarketplaceError::AlreadyInState(
                "not paused or finished".to_string(),
            )),
        }
    }

    async fn campaign_status(
        &self,
        campaign_id: &str,
    ) -> Result<CampaignStatus, MarketplaceError> {
        let mut state = self.state.write().await;
        Self::take_next_error(&mut state)?;
        if state.vanished.contains(campaign_id) {
            return Ok(CampaignStatus::NotFound);
        }
        Ok(state
            .statuses
            .get(campaign_id)
            .copied()
            .unwrap_or(CampaignStatus::NotFound))
    }

    async fn list_submitted_tasks(
        &self,
        campaign_id: &str,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<SubmittedTask>, MarketplaceError> {
        let mut state = self.state.write().await;
        Self::take_next_error(&mut state)?;
        let tasks = state.tasks.get(campaign_id).cloned().unwrap_or_default();
        Ok(match status {
            Some(wanted) => tasks.into_iter().filter(|t| t.status == wanted).collect(),
            None => tasks,
        })
    }

    async fn rate_task(
        &self,
        campaign_id: &str,
        task_id: &str,
        rating: TaskRating,
        reason: Option<&str>,
    ) -> Result<(), MarketplaceError> {
        let mut state = self.state.write().await;
        Self::take_next_error(&mut state)?;
        // Record before the injected failure: rating_calls reflects calls
        // issued, not calls that succeeded.
        state.rating_calls.push(RatingCall {
            campaign_id: campaign_id.to_string(),
            task_id: task_id.to_string(),
            rating,
            reason: reason.map(|r| r.to_string()),
        });
        if state.rating_failures.contains(task_id) {
            return Err(MarketplaceError::ApiError(format!(
                "rating {} rejected",
                task_id
            )));
        }
        Ok(())
    }
}
