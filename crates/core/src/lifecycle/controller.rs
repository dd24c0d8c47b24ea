//! The campaign lifecycle controller.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::binding::{
    BindingPatch, BindingStore, CampaignBinding, RemotePair, DEFAULT_TARGET_POSITIONS,
    MIN_TARGET_POSITIONS,
};
use crate::config::CampaignDefaults;
use crate::content::{ContentFields, ContentRef, ContentStore, WorkStateUpdate};
use crate::marketplace::{
    CampaignPatch, CampaignStatus, CreateCampaignRequest, MarketplaceGateway,
};
use crate::metrics;
use crate::template::{render, RenderedTemplate};

use super::{BindingUpdate, CampaignError, InFlightMarker, LifecycleAction, UpsertOutcome};

/// Drives campaign transitions for content items.
///
/// All operations are serialized per entity via the in-flight marker;
/// operations on different entities interleave freely.
pub struct CampaignController {
    gateway: Arc<dyn MarketplaceGateway>,
    bindings: Arc<dyn BindingStore>,
    content: Arc<dyn ContentStore>,
    defaults: CampaignDefaults,
    in_flight: InFlightMarker,
}

impl CampaignController {
    pub fn new(
        gateway: Arc<dyn MarketplaceGateway>,
        bindings: Arc<dyn BindingStore>,
        content: Arc<dyn ContentStore>,
        defaults: CampaignDefaults,
    ) -> Self {
        Self {
            gateway,
            bindings,
            content,
            defaults,
            in_flight: InFlightMarker::new(),
        }
    }

    /// Whether a transition is currently in flight for the entity. Fed to
    /// the operator UI as a busy flag.
    pub fn is_busy(&self, entity: &ContentRef) -> bool {
        self.in_flight.is_busy(&entity.key())
    }

    /// Apply a desired-enabled transition.
    ///
    /// `positions` falls back to the binding default and is clamped to the
    /// marketplace minimum. A locally-known campaign id the remote system
    /// has forgotten never blocks the operator: 404s on lifecycle calls
    /// fall back to creating a fresh campaign.
    pub async fn set_desired_enabled(
        &self,
        entity: &ContentRef,
        fields: &ContentFields,
        enabled: bool,
        positions: Option<u32>,
    ) -> Result<BindingUpdate, CampaignError> {
        let positions = clamp_positions(positions);
        validate_fields(entity, fields)?;

        let key = entity.key();
        let _token = self
            .in_flight
            .try_acquire(&key)
            .ok_or_else(|| CampaignError::OperationInFlight(key.clone()))?;

        let binding = self
            .bindings
            .get_or_create(entity, positions)
            .map_err(|e| CampaignError::Storage(e.to_string()))?;

        let operation = if enabled { "enable" } else { "disable" };
        let result = if enabled {
            self.enable(entity, fields, &binding, positions).await
        } else {
            self.disable(entity, &binding).await
        };

        let label = if result.is_ok() { "success" } else { "error" };
        metrics::LIFECYCLE_OPERATIONS
            .with_label_values(&[operation, label])
            .inc();

        result
    }

    async fn enable(
        &self,
        entity: &ContentRef,
        fields: &ContentFields,
        binding: &CampaignBinding,
        positions: u32,
    ) -> Result<BindingUpdate, CampaignError> {
        // Render up front: a missing keyword must never cost a remote call.
        let rendered = render(fields)?;

        let (pair, action) = match binding.remote_pair() {
            None => {
                let pair = self.create_remote(&rendered, positions, "enable").await?;
                (pair, LifecycleAction::CreatedCampaign)
            }
            Some(pair) if binding.effective_status().is_terminal() => {
                match self.gateway.restart_campaign(&pair.campaign_id, positions).await {
                    Ok(()) => (pair, LifecycleAction::RestartedCampaign),
                    Err(e) if e.is_already_in_state() => {
                        debug!("Campaign {} already restartable-state: {}", pair.campaign_id, e);
                        (pair, LifecycleAction::RestartedCampaign)
                    }
                    Err(e) if e.is_does_not_exist() => {
                        self.replace_dead(&pair, &rendered, positions).await?
                    }
                    Err(e) => return Err(CampaignError::from_remote(e)),
                }
            }
            Some(pair) => match self.gateway.resume_campaign(&pair.campaign_id).await {
                Ok(()) => (pair, LifecycleAction::ResumedCampaign),
                Err(e) if e.is_already_in_state() => {
                    debug!("Campaign {} not paused, treating resume as success", pair.campaign_id);
                    (pair, LifecycleAction::ResumedCampaign)
                }
                Err(e) if e.is_does_not_exist() => {
                    self.replace_dead(&pair, &rendered, positions).await?
                }
                Err(e) => return Err(CampaignError::from_remote(e)),
            },
        };

        let patch = BindingPatch::new()
            .with_enabled(true)
            .with_pair(pair.clone())
            .with_positions(positions)
            .with_status(CampaignStatus::Running);
        let binding = self.persist(entity, patch, &pair.campaign_id)?;

        self.content
            .update_work_state(
                entity,
                WorkStateUpdate {
                    work_enabled: true,
                    campaign_id: Some(pair.campaign_id.clone()),
                    template_id: Some(pair.template_id.clone()),
                },
            )
            .map_err(|e| CampaignError::LocalSaveFailed {
                campaign_id: pair.campaign_id.clone(),
                detail: e.to_string(),
            })?;

        info!("Enabled work for {} ({:?})", entity, action);
        Ok(BindingUpdate { binding, action })
    }

    async fn disable(
        &self,
        entity: &ContentRef,
        binding: &CampaignBinding,
    ) -> Result<BindingUpdate, CampaignError> {
        let mut patch = BindingPatch::new().with_enabled(false);

        // Set once the remote pause took effect; from then on a save
        // failure is the distinct "remote succeeded, local save failed"
        // case rather than plain storage trouble.
        let mut paused_campaign_id = None;

        let action = match binding.remote_pair() {
            Some(pair) if binding.effective_status() == CampaignStatus::Running => {
                match self.gateway.pause_campaign(&pair.campaign_id).await {
                    Ok(()) => {
                        patch = patch.with_status(CampaignStatus::Paused);
                        paused_campaign_id = Some(pair.campaign_id.clone());
                        LifecycleAction::PausedCampaign
                    }
                    Err(e) if e.is_already_in_state() => {
                        debug!("Campaign {} already paused", pair.campaign_id);
                        patch = patch.with_status(CampaignStatus::Paused);
                        paused_campaign_id = Some(pair.campaign_id.clone());
                        LifecycleAction::PausedCampaign
                    }
                    Err(e) if e.is_does_not_exist() => {
                        // Dead remotely; the intent still gets persisted.
                        warn!("Campaign {} gone while disabling {}", pair.campaign_id, entity);
                        patch = patch.with_status(CampaignStatus::NotFound);
                        LifecycleAction::SkippedPause
                    }
                    Err(e) => return Err(CampaignError::from_remote(e)),
                }
            }
            // Nothing running to pause; only the local intent changes.
            _ => LifecycleAction::SkippedPause,
        };

        let save_error = |detail: String| match &paused_campaign_id {
            Some(id) => CampaignError::LocalSaveFailed {
                campaign_id: id.clone(),
                detail,
            },
            None => CampaignError::Storage(detail),
        };

        let binding = self
            .bindings
            .apply(entity, patch)
            .map_err(|e| save_error(e.to_string()))?;

        self.content
            .update_work_state(
                entity,
                WorkStateUpdate {
                    work_enabled: false,
                    campaign_id: binding.campaign_id.clone(),
                    template_id: binding.template_id.clone(),
                },
            )
            .map_err(|e| save_error(e.to_string()))?;

        info!("Disabled work for {} ({:?})", entity, action);
        Ok(BindingUpdate { binding, action })
    }

    /// Create or update the remote pair without changing the enabled flag.
    ///
    /// With an existing pair the remote template body and campaign
    /// positions are updated in place; a fresh pair is created only on
    /// absence or when the in-place update fails. At most one live remote
    /// campaign per content item under normal operation.
    pub async fn upsert(
        &self,
        entity: &ContentRef,
        fields: &ContentFields,
        positions: Option<u32>,
    ) -> Result<UpsertOutcome, CampaignError> {
        let positions = clamp_positions(positions);
        validate_fields(entity, fields)?;

        let key = entity.key();
        let _token = self
            .in_flight
            .try_acquire(&key)
            .ok_or_else(|| CampaignError::OperationInFlight(key.clone()))?;

        let result = self.upsert_pair(entity, fields, positions).await;

        let label = if result.is_ok() { "success" } else { "error" };
        metrics::LIFECYCLE_OPERATIONS
            .with_label_values(&["upsert", label])
            .inc();

        result
    }

    async fn upsert_pair(
        &self,
        entity: &ContentRef,
        fields: &ContentFields,
        positions: u32,
    ) -> Result<UpsertOutcome, CampaignError> {
        let binding = self
            .bindings
            .get_or_create(entity, positions)
            .map_err(|e| CampaignError::Storage(e.to_string()))?;

        let rendered = render(fields)?;

        let outcome = match binding.remote_pair() {
            Some(pair) => match self.update_in_place(&pair, &rendered, positions).await {
                Ok(()) => UpsertOutcome {
                    campaign_id: pair.campaign_id,
                    template_id: pair.template_id,
                    is_new: false,
                },
                Err(e) => {
                    warn!(
                        "In-place update of campaign {} failed ({}), creating replacement",
                        pair.campaign_id, e
                    );
                    let fresh = self.create_remote(&rendered, positions, "upsert").await?;
                    UpsertOutcome {
                        campaign_id: fresh.campaign_id,
                        template_id: fresh.template_id,
                        is_new: true,
                    }
                }
            },
            None => {
                let fresh = self.create_remote(&rendered, positions, "upsert").await?;
                UpsertOutcome {
                    campaign_id: fresh.campaign_id,
                    template_id: fresh.template_id,
                    is_new: true,
                }
            }
        };

        let pair = RemotePair::new(outcome.campaign_id.clone(), outcome.template_id.clone());
        let patch = BindingPatch::new().with_pair(pair).with_positions(positions);
        self.persist(entity, patch, &outcome.campaign_id)?;

        Ok(outcome)
    }

    /// Best-effort template push after a content edit.
    ///
    /// Only applies while work is enabled and a template exists. Failures
    /// are logged and never propagated; the originating content edit must
    /// not fail because the marketplace was unreachable.
    pub async fn resync_template(&self, entity: &ContentRef, fields: &ContentFields) {
        let binding = match self.bindings.get(entity) {
            Ok(Some(b)) => b,
            Ok(None) => return,
            Err(e) => {
                warn!("Template resync for {} skipped: {}", entity, e);
                return;
            }
        };

        let template_id = match (&binding.template_id, binding.desired_enabled) {
            (Some(id), true) => id.clone(),
            _ => return,
        };

        let rendered = match render(fields) {
            Ok(r) => r,
            Err(e) => {
                warn!("Template resync for {} skipped: {}", entity, e);
                return;
            }
        };

        if let Err(e) = self.gateway.update_template(&template_id, &rendered.body).await {
            warn!("Template resync for {} failed: {}", entity, e);
        } else {
            debug!("Template {} resynced for {}", template_id, entity);
        }
    }

    async fn update_in_place(
        &self,
        pair: &RemotePair,
        rendered: &RenderedTemplate,
        positions: u32,
    ) -> Result<(), crate::marketplace::MarketplaceError> {
        self.gateway
            .update_template(&pair.template_id, &rendered.body)
            .await?;
        self.gateway
            .update_campaign(
                &pair.campaign_id,
                CampaignPatch::new()
                    .with_positions(positions)
                    .with_auto_refill(true),
            )
            .await
    }

    async fn replace_dead(
        &self,
        dead: &RemotePair,
        rendered: &RenderedTemplate,
        positions: u32,
    ) -> Result<(RemotePair, LifecycleAction), CampaignError> {
        warn!(
            "Campaign {} no longer exists remotely, creating replacement",
            dead.campaign_id
        );
        let fresh = self
            .create_remote(rendered, positions, "dead_recovery")
            .await?;
        metrics::DEAD_CAMPAIGN_RECOVERIES.inc();
        Ok((fresh, LifecycleAction::ReplacedDeadCampaign))
    }

    async fn create_remote(
        &self,
        rendered: &RenderedTemplate,
        positions: u32,
        trigger: &str,
    ) -> Result<RemotePair, CampaignError> {
        let template_id = self
            .gateway
            .create_template(&rendered.title, &rendered.body)
            .await
            .map_err(CampaignError::from_remote)?;

        let request = CreateCampaignRequest {
            title: rendered.title.clone(),
            category_id: self.defaults.category_id,
            template_id: template_id.clone(),
            available_positions: positions,
            pay_per_task_cents: self.defaults.pay_per_task_cents,
            minutes_to_finish: self.defaults.minutes_to_finish,
            time_to_rate_hours: self.defaults.time_to_rate_hours,
            auto_refill_positions: true,
        };

        let campaign_id = self
            .gateway
            .create_campaign(request)
            .await
            .map_err(CampaignError::from_remote)?;

        metrics::CAMPAIGNS_CREATED.with_label_values(&[trigger]).inc();
        Ok(RemotePair::new(campaign_id, template_id))
    }

    /// Persist a patch after a successful remote call. A failure here is
    /// the distinct "remote succeeded, local save failed" case.
    fn persist(
        &self,
        entity: &ContentRef,
        patch: BindingPatch,
        campaign_id: &str,
    ) -> Result<CampaignBinding, CampaignError> {
        self.bindings
            .apply(entity, patch)
            .map_err(|e| CampaignError::LocalSaveFailed {
                campaign_id: campaign_id.to_string(),
                detail: e.to_string(),
            })
    }
}

fn clamp_positions(positions: Option<u32>) -> u32 {
    positions
        .unwrap_or(DEFAULT_TARGET_POSITIONS)
        .max(MIN_TARGET_POSITIONS)
}

fn validate_fields(entity: &ContentRef, fields: &ContentFields) -> Result<(), CampaignError> {
    if fields.matches_kind(entity.kind) {
        Ok(())
    } else {
        Err(CampaignError::Validation {
            field: "fields".to_string(),
            detail: format!("instruction fields do not match entity kind {}", entity.kind.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_positions() {
        assert_eq!(clamp_positions(None), DEFAULT_TARGET_POSITIONS);
        assert_eq!(clamp_positions(Some(5)), MIN_TARGET_POSITIONS);
        assert_eq!(clamp_positions(Some(50)), 50);
    }
}
