//! Content entity references and the content-persistence collaborator.
//!
//! Content entities (pages, posts, social profiles, external-link targets)
//! are owned by the dashboard's content subsystem. This module defines the
//! closed set of entity kinds, the fields a campaign template binds to, and
//! the `ContentStore` interface through which work-state changes are
//! persisted back onto the content record.

mod types;

pub use types::*;
