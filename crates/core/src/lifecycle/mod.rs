//! Campaign lifecycle control.
//!
//! Decides, for a desired-enabled transition, whether to create, resume,
//! restart or pause the remote campaign, and keeps the local binding and
//! content record in step. The remote marketplace is the source of truth
//! for campaign existence and activity; the local binding is the source
//! of truth for operator intent.

mod controller;
mod types;

pub use controller::CampaignController;
pub use types::{
    BindingUpdate, CampaignError, InFlightMarker, InFlightToken, LifecycleAction, UpsertOutcome,
};
