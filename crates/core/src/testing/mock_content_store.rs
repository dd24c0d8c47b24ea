//! Recording content-persistence collaborator for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::content::{ContentError, ContentRef, ContentStore, WorkStateUpdate};

/// Records every work-state update; can be told to fail the next call.
#[derive(Default)]
pub struct MockContentStore {
    calls: Mutex<Vec<(ContentRef, WorkStateUpdate)>>,
    fail_next: AtomicBool,
}

impl MockContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `update_work_state` call fail.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(ContentRef, WorkStateUpdate)> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of updates recorded for a specific entity.
    pub fn update_count_for(&self, entity: &ContentRef) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| e == entity)
            .count()
    }

    /// The most recent update recorded for an entity.
    pub fn last_update_for(&self, entity: &ContentRef) -> Option<WorkStateUpdate> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(e, _)| e == entity)
            .map(|(_, u)| u.clone())
    }
}

impl ContentStore for MockContentStore {
    fn update_work_state(
        &self,
        entity: &ContentRef,
        update: WorkStateUpdate,
    ) -> Result<(), ContentError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ContentError::Storage("injected failure".to_string()));
        }
        self.calls
            .lock()
            .unwrap()
            .push((entity.clone(), update));
        Ok(())
    }
}
