use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of reconciler state for the status endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcilerStatus {
    pub running: bool,
    pub enabled_bindings: usize,
    pub last_tick_at: Option<DateTime<Utc>>,
}

/// What a single poll cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Bindings whose remote status was queried.
    pub checked: usize,
    /// Bindings whose cached status changed.
    pub status_changes: usize,
    /// Bindings auto-disabled on a terminal status.
    pub auto_disabled: usize,
}

/// Gate deciding whether polling should happen right now.
///
/// The poller only works while the viewing context is active; the server
/// wires in an always-active gate, an embedding UI can wire in its
/// foreground state.
pub trait ActivityGate: Send + Sync {
    fn is_active(&self) -> bool;
}

/// Gate that is always active.
pub struct AlwaysActive;

impl ActivityGate for AlwaysActive {
    fn is_active(&self) -> bool {
        true
    }
}

impl ActivityGate for AtomicBool {
    fn is_active(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}
