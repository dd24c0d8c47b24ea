//! Remote campaign marketplace abstraction.
//!
//! This module provides a `MarketplaceGateway` trait wrapping the
//! crowdsourced micro-task marketplace's HTTP API: instruction-template
//! CRUD, campaign lifecycle calls, status queries, submitted-task listing
//! and rating.

mod http;
mod types;

pub use http::HttpMarketplaceClient;
pub use types::*;
