//! Status reconciliation polling.
//!
//! Recurring background process that re-observes remote campaign state
//! for every enabled binding and auto-disables bindings whose campaigns
//! reached a terminal state. Polling, not push: the marketplace exposes
//! no webhook channel.

mod config;
mod runner;
mod types;

pub use config::ReconcilerConfig;
pub use runner::StatusReconciler;
pub use types::{ActivityGate, AlwaysActive, ReconcilerStatus, TickSummary};
