pub mod binding;
pub mod config;
pub mod content;
pub mod lifecycle;
pub mod marketplace;
pub mod metrics;
pub mod reconciler;
pub mod review;
pub mod template;
pub mod testing;

pub use binding::{
    BindingError, BindingFilter, BindingPatch, BindingStore, CampaignBinding, RemotePair,
    SqliteBindingStore, DEFAULT_TARGET_POSITIONS, MIN_TARGET_POSITIONS,
};
pub use config::{
    load_config, load_config_from_str, validate_config, CampaignDefaults, Config, ConfigError,
    MarketplaceConfig, SanitizedConfig,
};
pub use content::{
    ContentError, ContentFields, ContentKind, ContentRef, ContentStore, WorkStateUpdate,
};
pub use lifecycle::{BindingUpdate, CampaignController, CampaignError, LifecycleAction, UpsertOutcome};
pub use marketplace::{
    CampaignStatus, HttpMarketplaceClient, MarketplaceError, MarketplaceGateway, SubmissionStatus,
    SubmittedTask, TaskRating,
};
pub use reconciler::{
    ActivityGate, AlwaysActive, ReconcilerConfig, ReconcilerStatus, StatusReconciler, TickSummary,
};
pub use review::{
    BatchOutcome, ReviewDecision, ReviewError, ReviewStateStore, SqliteReviewStore,
    TaskReviewWorkflow, REJECT_REASONS, REVISION_REASONS,
};
pub use template::{render, RenderedTemplate, TemplateError};
