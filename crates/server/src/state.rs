use std::sync::Arc;

use prometheus::Registry;

use crowdlift_core::binding::BindingStore;
use crowdlift_core::lifecycle::CampaignController;
use crowdlift_core::marketplace::MarketplaceGateway;
use crowdlift_core::reconciler::StatusReconciler;
use crowdlift_core::review::{ReviewStateStore, TaskReviewWorkflow};
use crowdlift_core::{Config, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    bindings: Arc<dyn BindingStore>,
    controller: Arc<CampaignController>,
    reconciler: Option<Arc<StatusReconciler>>,
    review: Arc<TaskReviewWorkflow>,
    review_store: Arc<dyn ReviewStateStore>,
    gateway: Arc<dyn MarketplaceGateway>,
    registry: Registry,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        bindings: Arc<dyn BindingStore>,
        controller: Arc<CampaignController>,
        reconciler: Option<Arc<StatusReconciler>>,
        review: Arc<TaskReviewWorkflow>,
        review_store: Arc<dyn ReviewStateStore>,
        gateway: Arc<dyn MarketplaceGateway>,
        registry: Registry,
    ) -> Self {
        Self {
            config,
            bindings,
            controller,
            reconciler,
            review,
            review_store,
            gateway,
            registry,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn bindings(&self) -> &dyn BindingStore {
        self.bindings.as_ref()
    }

    pub fn controller(&self) -> &CampaignController {
        self.controller.as_ref()
    }

    pub fn reconciler(&self) -> Option<&Arc<StatusReconciler>> {
        self.reconciler.as_ref()
    }

    pub fn review(&self) -> &TaskReviewWorkflow {
        self.review.as_ref()
    }

    pub fn review_store(&self) -> &dyn ReviewStateStore {
        self.review_store.as_ref()
    }

    pub fn gateway(&self) -> &dyn MarketplaceGateway {
        self.gateway.as_ref()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
