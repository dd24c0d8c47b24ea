//! Campaign bindings: the local record linking a content item to its
//! (possibly absent) remote campaign/template pair and the operator's
//! desired enabled state.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteBindingStore;
pub use store::{BindingError, BindingFilter, BindingPatch, BindingStore};
pub use types::*;
