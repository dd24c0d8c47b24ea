//! Integration tests for campaign lifecycle transitions.

use std::sync::Arc;

use crowdlift_core::binding::{BindingPatch, BindingStore, SqliteBindingStore};
use crowdlift_core::config::CampaignDefaults;
use crowdlift_core::content::{ContentFields, ContentKind, ContentRef};
use crowdlift_core::lifecycle::{CampaignController, CampaignError, LifecycleAction};
use crowdlift_core::marketplace::CampaignStatus;
use crowdlift_core::template::TemplateError;
use crowdlift_core::testing::{MockContentStore, MockMarketplace};

struct Harness {
    gateway: Arc<MockMarketplace>,
    bindings: Arc<SqliteBindingStore>,
    content: Arc<MockContentStore>,
    controller: CampaignController,
}

fn harness() -> Harness {
    let gateway = Arc::new(MockMarketplace::new());
    let bindings = Arc::new(SqliteBindingStore::in_memory().unwrap());
    let content = Arc::new(MockContentStore::new());
    let controller = CampaignController::new(
        gateway.clone(),
        bindings.clone(),
        content.clone(),
        CampaignDefaults::default(),
    );
    Harness {
        gateway,
        bindings,
        content,
        controller,
    }
}

fn entity() -> ContentRef {
    ContentRef::new(ContentKind::Post, "site-1", "post-42")
}

fn fields() -> ContentFields {
    ContentFields::SearchPost {
        keyword: "print checks online".into(),
        target_text: "Print Checks in Minutes".into(),
        landing_domain: "example.com".into(),
    }
}

#[tokio::test]
async fn test_enable_creates_template_and_campaign() {
    let h = harness();

    let update = h
        .controller
        .set_desired_enabled(&entity(), &fields(), true, Some(40))
        .await
        .unwrap();

    assert_eq!(update.action, LifecycleAction::CreatedCampaign);
    assert!(update.binding.desired_enabled);
    assert!(update.binding.campaign_id.is_some());
    assert!(update.binding.template_id.is_some());
    assert_eq!(update.binding.target_positions, 40);

    assert_eq!(h.gateway.created_campaigns().await.len(), 1);

    // The content record learned about the new work state.
    let last = h.content.last_update_for(&entity()).unwrap();
    assert!(last.work_enabled);
    assert_eq!(last.campaign_id, update.binding.campaign_id);
}

#[tokio::test]
async fn test_positions_clamped_to_minimum() {
    let h = harness();

    let update = h
        .controller
        .set_desired_enabled(&entity(), &fields(), true, Some(3))
        .await
        .unwrap();
    assert_eq!(update.binding.target_positions, 10);
}

#[tokio::test]
async fn test_missing_keyword_fails_before_any_remote_call() {
    let h = harness();
    let bad_fields = ContentFields::SearchPost {
        keyword: "".into(),
        target_text: "t".into(),
        landing_domain: "example.com".into(),
    };

    let result = h
        .controller
        .set_desired_enabled(&entity(), &bad_fields, true, None)
        .await;

    assert!(matches!(
        result,
        Err(CampaignError::Template(TemplateError::MissingRequiredField(
            "keyword"
        )))
    ));
    assert!(h.gateway.created_campaigns().await.is_empty());
    assert_eq!(h.gateway.template_update_count().await, 0);
}

#[tokio::test]
async fn test_mismatched_fields_rejected() {
    let h = harness();
    let social = ContentFields::SocialEngagement {
        platform_tag: "facebook".into(),
        target_url: "https://facebook.com/acme".into(),
    };

    let result = h
        .controller
        .set_desired_enabled(&entity(), &social, true, None)
        .await;
    assert!(matches!(result, Err(CampaignError::Validation { .. })));
}

#[tokio::test]
async fn test_dead_campaign_recovery_on_enable() {
    let h = harness();
    let e = entity();

    let first = h
        .controller
        .set_desired_enabled(&e, &fields(), true, None)
        .await
        .unwrap();
    let dead_id = first.binding.campaign_id.clone().unwrap();

    h.controller
        .set_desired_enabled(&e, &fields(), false, None)
        .await
        .unwrap();

    // The marketplace forgets the campaign entirely.
    h.gateway.vanish_campaign(&dead_id).await;

    let recovered = h
        .controller
        .set_desired_enabled(&e, &fields(), true, None)
        .await
        .unwrap();

    assert_eq!(recovered.action, LifecycleAction::ReplacedDeadCampaign);
    assert!(recovered.binding.desired_enabled);
    let new_id = recovered.binding.campaign_id.unwrap();
    assert_ne!(new_id, dead_id);
    assert_eq!(h.gateway.created_campaigns().await.len(), 2);
}

#[tokio::test]
async fn test_disable_pauses_running_campaign() {
    let h = harness();
    let e = entity();

    h.controller
        .set_desired_enabled(&e, &fields(), true, None)
        .await
        .unwrap();

    let update = h
        .controller
        .set_desired_enabled(&e, &fields(), false, None)
        .await
        .unwrap();

    assert_eq!(update.action, LifecycleAction::PausedCampaign);
    assert!(!update.binding.desired_enabled);
    // The pair survives a disable so the campaign can be resumed later.
    assert!(update.binding.campaign_id.is_some());
    assert_eq!(h.gateway.pause_calls().await.len(), 1);

    let last = h.content.last_update_for(&e).unwrap();
    assert!(!last.work_enabled);
}

#[tokio::test]
async fn test_disable_skips_pause_when_not_running() {
    let h = harness();
    let e = entity();

    let update = h
        .controller
        .set_desired_enabled(&e, &fields(), true, None)
        .await
        .unwrap();
    let campaign_id = update.binding.campaign_id.unwrap();

    // Reconciler observed the campaign as paused by the marketplace.
    h.gateway
        .set_status(&campaign_id, CampaignStatus::PausedSystem)
        .await;
    h.bindings
        .apply(
            &e,
            BindingPatch::new().with_status(CampaignStatus::PausedSystem),
        )
        .unwrap();

    let update = h
        .controller
        .set_desired_enabled(&e, &fields(), false, None)
        .await
        .unwrap();

    assert_eq!(update.action, LifecycleAction::SkippedPause);
    assert!(!update.binding.desired_enabled);
    // No remote pause was attempted.
    assert!(h.gateway.pause_calls().await.is_empty());
}

#[tokio::test]
async fn test_enable_resumes_paused_campaign() {
    let h = harness();
    let e = entity();

    h.controller
        .set_desired_enabled(&e, &fields(), true, None)
        .await
        .unwrap();
    h.controller
        .set_desired_enabled(&e, &fields(), false, None)
        .await
        .unwrap();

    let update = h
        .controller
        .set_desired_enabled(&e, &fields(), true, None)
        .await
        .unwrap();

    assert_eq!(update.action, LifecycleAction::ResumedCampaign);
    assert_eq!(h.gateway.resume_calls().await.len(), 1);
    // No duplicate campaign.
    assert_eq!(h.gateway.created_campaigns().await.len(), 1);
}

#[tokio::test]
async fn test_enable_restarts_finished_campaign() {
    let h = harness();
    let e = entity();

    let update = h
        .controller
        .set_desired_enabled(&e, &fields(), true, None)
        .await
        .unwrap();
    let campaign_id = update.binding.campaign_id.unwrap();

    // The campaign filled all its positions.
    h.gateway
        .set_status(&campaign_id, CampaignStatus::Finished)
        .await;
    h.bindings
        .apply(&e, BindingPatch::new().with_status(CampaignStatus::Finished))
        .unwrap();

    let update = h
        .controller
        .set_desired_enabled(&e, &fields(), true, None)
        .await
        .unwrap();

    assert_eq!(update.action, LifecycleAction::RestartedCampaign);
    assert_eq!(h.gateway.restart_calls().await.len(), 1);
    assert_eq!(update.binding.campaign_id.as_deref(), Some(campaign_id.as_str()));
    assert_eq!(h.gateway.created_campaigns().await.len(), 1);
}

#[tokio::test]
async fn test_upsert_is_idempotent() {
    let h = harness();
    let e = entity();

    let first = h.controller.upsert(&e, &fields(), Some(30)).await.unwrap();
    assert!(first.is_new);

    let second = h.controller.upsert(&e, &fields(), Some(30)).await.unwrap();
    assert!(!second.is_new);
    assert_eq!(second.campaign_id, first.campaign_id);
    assert_eq!(second.template_id, first.template_id);

    // Exactly one campaign; the second call updated in place.
    assert_eq!(h.gateway.created_campaigns().await.len(), 1);
    assert_eq!(h.gateway.template_update_count().await, 1);
    assert_eq!(h.gateway.campaign_update_count().await, 1);
}

#[tokio::test]
async fn test_upsert_replaces_pair_when_update_fails() {
    let h = harness();
    let e = entity();

    let first = h.controller.upsert(&e, &fields(), None).await.unwrap();
    h.gateway.vanish_campaign(&first.campaign_id).await;
    // Template updates still succeed; the campaign patch 404s.

    let second = h.controller.upsert(&e, &fields(), None).await.unwrap();
    assert!(second.is_new);
    assert_ne!(second.campaign_id, first.campaign_id);

    let binding = h.bindings.get(&e).unwrap().unwrap();
    assert_eq!(binding.campaign_id.as_deref(), Some(second.campaign_id.as_str()));
}

#[tokio::test]
async fn test_local_save_failure_is_reported_distinctly() {
    let h = harness();
    h.content.fail_next();

    let result = h
        .controller
        .set_desired_enabled(&entity(), &fields(), true, None)
        .await;

    match result {
        Err(CampaignError::LocalSaveFailed { campaign_id, .. }) => {
            // The remote campaign exists even though the local save failed.
            assert!(h.gateway.created_campaigns().await.contains(&campaign_id));
        }
        other => panic!("expected LocalSaveFailed, got {:?}", other.map(|u| u.action)),
    }
}

#[tokio::test]
async fn test_disable_local_save_failure_after_pause_reported_distinctly() {
    let h = harness();
    let e = entity();

    let update = h
        .controller
        .set_desired_enabled(&e, &fields(), true, None)
        .await
        .unwrap();
    let campaign_id = update.binding.campaign_id.unwrap();

    h.content.fail_next();
    let result = h
        .controller
        .set_desired_enabled(&e, &fields(), false, None)
        .await;

    // The remote pause went through before the local save broke.
    assert_eq!(h.gateway.pause_calls().await.len(), 1);
    match result {
        Err(CampaignError::LocalSaveFailed { campaign_id: id, .. }) => {
            assert_eq!(id, campaign_id);
        }
        other => panic!("expected LocalSaveFailed, got {:?}", other.map(|u| u.action)),
    }
}

#[tokio::test]
async fn test_disable_save_failure_without_pause_is_storage_error() {
    let h = harness();
    let e = entity();

    // No campaign yet, so a disable never touches the marketplace.
    h.bindings.get_or_create(&e, 30).unwrap();
    h.content.fail_next();

    let result = h
        .controller
        .set_desired_enabled(&e, &fields(), false, None)
        .await;

    assert!(h.gateway.pause_calls().await.is_empty());
    assert!(matches!(result, Err(CampaignError::Storage(_))));
}

#[tokio::test]
async fn test_failed_upsert_is_counted_as_error() {
    let h = harness();
    let before = crowdlift_core::metrics::LIFECYCLE_OPERATIONS
        .with_label_values(&["upsert", "error"])
        .get();

    h.gateway
        .set_next_error(crowdlift_core::marketplace::MarketplaceError::Timeout)
        .await;
    let result = h.controller.upsert(&entity(), &fields(), None).await;
    assert!(matches!(result, Err(CampaignError::RemoteUnavailable(_))));

    let after = crowdlift_core::metrics::LIFECYCLE_OPERATIONS
        .with_label_values(&["upsert", "error"])
        .get();
    assert_eq!(after, before + 1);
}

#[tokio::test]
async fn test_resync_template_pushes_new_body() {
    let h = harness();
    let e = entity();

    let update = h
        .controller
        .set_desired_enabled(&e, &fields(), true, None)
        .await
        .unwrap();
    let template_id = update.binding.template_id.unwrap();

    let edited = ContentFields::SearchPost {
        keyword: "order custom checks".into(),
        target_text: "".into(),
        landing_domain: "example.com".into(),
    };
    h.controller.resync_template(&e, &edited).await;

    assert_eq!(h.gateway.template_update_count().await, 1);
    let body = h.gateway.template_body(&template_id).await.unwrap();
    assert!(body.contains("order custom checks"));
}

#[tokio::test]
async fn test_resync_template_noop_while_disabled() {
    let h = harness();
    let e = entity();

    h.controller
        .set_desired_enabled(&e, &fields(), true, None)
        .await
        .unwrap();
    h.controller
        .set_desired_enabled(&e, &fields(), false, None)
        .await
        .unwrap();

    h.controller.resync_template(&e, &fields()).await;
    assert_eq!(h.gateway.template_update_count().await, 0);
}

#[tokio::test]
async fn test_remote_failure_surfaces_as_retryable() {
    let h = harness();
    h.gateway
        .set_next_error(crowdlift_core::marketplace::MarketplaceError::Timeout)
        .await;

    let result = h
        .controller
        .set_desired_enabled(&entity(), &fields(), true, None)
        .await;
    assert!(matches!(result, Err(CampaignError::RemoteUnavailable(_))));

    // Nothing was persisted; a retry starts clean.
    let binding = h.bindings.get(&entity()).unwrap().unwrap();
    assert!(!binding.desired_enabled);
    assert!(binding.campaign_id.is_none());
}
