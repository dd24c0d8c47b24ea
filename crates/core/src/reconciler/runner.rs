//! The reconciliation poll loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

use crate::binding::{BindingFilter, BindingPatch, BindingStore};
use crate::content::{ContentStore, WorkStateUpdate};
use crate::marketplace::MarketplaceGateway;
use crate::metrics;

use super::config::ReconcilerConfig;
use super::types::{ActivityGate, ReconcilerStatus, TickSummary};

/// Background poller keeping cached remote statuses fresh and
/// auto-disabling bindings whose campaigns expired.
pub struct StatusReconciler {
    config: ReconcilerConfig,
    bindings: Arc<dyn BindingStore>,
    gateway: Arc<dyn MarketplaceGateway>,
    content: Arc<dyn ContentStore>,
    gate: Arc<dyn ActivityGate>,

    // Runtime state
    running: Arc<AtomicBool>,
    last_tick_at: Arc<RwLock<Option<DateTime<Utc>>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl StatusReconciler {
    pub fn new(
        config: ReconcilerConfig,
        bindings: Arc<dyn BindingStore>,
        gateway: Arc<dyn MarketplaceGateway>,
        content: Arc<dyn ContentStore>,
        gate: Arc<dyn ActivityGate>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            bindings,
            gateway,
            content,
            gate,
            running: Arc::new(AtomicBool::new(false)),
            last_tick_at: Arc::new(RwLock::new(None)),
            shutdown_tx,
        }
    }

    /// Start the poll loop (spawns a background task).
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Reconciler already running");
            return;
        }

        info!(
            "Starting status reconciler (interval {}s)",
            self.config.poll_interval_secs
        );
        self.spawn_poll_loop();
    }

    /// Stop the poll loop gracefully.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Reconciler not running");
            return;
        }

        info!("Stopping status reconciler");
        let _ = self.shutdown_tx.send(());
    }

    /// Current reconciler state for the status endpoint.
    pub async fn status(&self) -> ReconcilerStatus {
        let enabled_bindings = self
            .bindings
            .count(&BindingFilter::new().with_enabled(true))
            .unwrap_or(0) as usize;

        ReconcilerStatus {
            running: self.running.load(Ordering::Relaxed),
            enabled_bindings,
            last_tick_at: *self.last_tick_at.read().await,
        }
    }

    /// Run one poll cycle immediately. The loop calls this on its
    /// interval; tests call it directly.
    pub async fn tick(&self) -> TickSummary {
        let summary = Self::run_tick(&self.bindings, &self.gateway, &self.content).await;
        *self.last_tick_at.write().await = Some(Utc::now());
        summary
    }

    fn spawn_poll_loop(&self) {
        let running = Arc::clone(&self.running);
        let bindings = Arc::clone(&self.bindings);
        let gateway = Arc::clone(&self.gateway);
        let content = Arc::clone(&self.content);
        let gate = Arc::clone(&self.gate);
        let last_tick_at = Arc::clone(&self.last_tick_at);
        let interval = Duration::from_secs(self.config.poll_interval_secs);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Reconciler loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Reconciler loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        if !gate.is_active() {
                            debug!("Reconciler tick skipped, context inactive");
                            continue;
                        }
                        let summary = Self::run_tick(&bindings, &gateway, &content).await;
                        *last_tick_at.write().await = Some(Utc::now());
                        if summary.status_changes > 0 || summary.auto_disabled > 0 {
                            info!(
                                "Reconciled {} bindings: {} status changes, {} auto-disabled",
                                summary.checked, summary.status_changes, summary.auto_disabled
                            );
                        }
                    }
                }
            }
            info!("Reconciler loop stopped");
        });
    }

    /// One poll cycle over every enabled binding with a remote campaign.
    ///
    /// Idempotent: a second run with no intervening remote change writes
    /// nothing. Auto-disabling on FINISHED/ENDED is the system's only
    /// autonomous write.
    async fn run_tick(
        bindings: &Arc<dyn BindingStore>,
        gateway: &Arc<dyn MarketplaceGateway>,
        content: &Arc<dyn ContentStore>,
    ) -> TickSummary {
        metrics::RECONCILE_TICKS.inc();
        let mut summary = TickSummary::default();

        let filter = BindingFilter::new().with_enabled(true).with_limit(1000);
        let enabled = match bindings.list(&filter) {
            Ok(list) => list,
            Err(e) => {
                error!("Reconciler could not list bindings: {}", e);
                return summary;
            }
        };

        for binding in enabled {
            let Some(campaign_id) = binding.campaign_id.clone() else {
                continue;
            };

            let status = match gateway.campaign_status(&campaign_id).await {
                Ok(status) => status,
                Err(e) => {
                    warn!("Status query for campaign {} failed: {}", campaign_id, e);
                    continue;
                }
            };
            summary.checked += 1;

            let changed = status != binding.remote_status;

            if status.is_terminal() {
                // Terminal campaign under enabled intent: flip the intent
                // off and propagate through the content record.
                let patch = BindingPatch::new()
                    .with_enabled(false)
                    .with_status(status)
                    .with_synced_at(Utc::now());
                if let Err(e) = bindings.apply(&binding.entity, patch) {
                    error!("Auto-disable of {} failed: {}", binding.entity, e);
                    continue;
                }

                if let Err(e) = content.update_work_state(
                    &binding.entity,
                    WorkStateUpdate {
                        work_enabled: false,
                        campaign_id: Some(campaign_id.clone()),
                        template_id: binding.template_id.clone(),
                    },
                ) {
                    error!(
                        "Content update after auto-disable of {} failed: {}",
                        binding.entity, e
                    );
                }

                info!(
                    "Auto-disabled {} (campaign {} is {})",
                    binding.entity,
                    campaign_id,
                    status.as_str()
                );
                summary.auto_disabled += 1;
                metrics::AUTO_DISABLES.inc();
                if changed {
                    summary.status_changes += 1;
                    metrics::STATUS_CHANGES.inc();
                }
            } else if changed {
                // Pure observability: refresh the cache, no side effect.
                let patch = BindingPatch::new()
                    .with_status(status)
                    .with_synced_at(Utc::now());
                if let Err(e) = bindings.apply(&binding.entity, patch) {
                    warn!("Status cache update for {} failed: {}", binding.entity, e);
                    continue;
                }
                debug!(
                    "Status of {} moved to {}",
                    binding.entity,
                    status.as_str()
                );
                summary.status_changes += 1;
                metrics::STATUS_CHANGES.inc();
            }
        }

        summary
    }
}
