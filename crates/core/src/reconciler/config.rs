use serde::{Deserialize, Serialize};

/// Reconciler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Whether the background poller runs at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between poll cycles.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    60
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}
