//! Bulk review of worker submissions.
//!
//! Applies approve/revise/reject/delete decisions to batches of task
//! ids. Each id is processed independently; local state is updated
//! optimistically before remote calls and never rolled back.

mod sqlite_store;
mod types;
mod workflow;

pub use sqlite_store::SqliteReviewStore;
pub use types::{
    BatchOutcome, ItemOutcome, ItemStatus, ReviewDecision, ReviewError, ReviewRecord,
    ReviewStateStore, REJECT_REASONS, REVISION_REASONS,
};
pub use workflow::TaskReviewWorkflow;
