//! Test doubles for the marketplace gateway and content collaborator.

mod mock_content_store;
mod mock_marketplace;

pub use mock_content_store::MockContentStore;
pub use mock_marketplace::{MockMarketplace, RatingCall};
