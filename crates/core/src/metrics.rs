//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Campaign lifecycle (creations, dead-campaign recoveries)
//! - Reconciler (ticks, status changes, auto-disables)
//! - External services (marketplace requests, task ratings)

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts};

// =============================================================================
// Lifecycle Metrics
// =============================================================================

/// Campaigns created total by trigger.
pub static CAMPAIGNS_CREATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("crowdlift_campaigns_created_total", "Total campaigns created"),
        &["trigger"], // "enable", "upsert", "dead_recovery"
    )
    .unwrap()
});

/// Dead-campaign recoveries total.
pub static DEAD_CAMPAIGN_RECOVERIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crowdlift_dead_campaign_recoveries_total",
        "Total campaigns recreated after the marketplace forgot them",
    )
    .unwrap()
});

/// Lifecycle operations total by operation and result.
pub static LIFECYCLE_OPERATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "crowdlift_lifecycle_operations_total",
            "Total lifecycle operations",
        ),
        &["operation", "result"], // operation: "enable", "disable", "upsert"
    )
    .unwrap()
});

// =============================================================================
// Reconciler Metrics
// =============================================================================

/// Reconcile ticks total.
pub static RECONCILE_TICKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crowdlift_reconcile_ticks_total",
        "Total reconciler poll cycles",
    )
    .unwrap()
});

/// Status changes observed by the reconciler.
pub static STATUS_CHANGES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crowdlift_status_changes_total",
        "Total remote status changes observed",
    )
    .unwrap()
});

/// Bindings auto-disabled on terminal remote status.
pub static AUTO_DISABLES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crowdlift_auto_disables_total",
        "Total bindings auto-disabled after a terminal campaign state",
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// Marketplace requests total by operation and status.
pub static MARKETPLACE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "crowdlift_marketplace_requests_total",
            "Total marketplace API requests",
        ),
        &["operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

/// Task ratings total by rating and status.
pub static TASK_RATINGS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("crowdlift_task_ratings_total", "Total task ratings submitted"),
        &["rating", "status"], // rating: "OK", "NOK", "REVISE"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Lifecycle
        Box::new(CAMPAIGNS_CREATED.clone()),
        Box::new(DEAD_CAMPAIGN_RECOVERIES.clone()),
        Box::new(LIFECYCLE_OPERATIONS.clone()),
        // Reconciler
        Box::new(RECONCILE_TICKS.clone()),
        Box::new(STATUS_CHANGES.clone()),
        Box::new(AUTO_DISABLES.clone()),
        // External services
        Box::new(MARKETPLACE_REQUESTS.clone()),
        Box::new(TASK_RATINGS.clone()),
    ]
}
