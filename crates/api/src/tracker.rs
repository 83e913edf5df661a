//! In-process registry of cancel handles for in-flight runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use engine::CancelHandle;
use uuid::Uuid;

/// Tracks the cancel handle of every run this process is executing.
///
/// Handles are registered when the run task is spawned and removed when it
/// finishes, so `cancel` on a finished (or foreign) run reports `false`.
#[derive(Clone, Default)]
pub struct RunTracker {
    inner: Arc<Mutex<HashMap<Uuid, CancelHandle>>>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, execution_id: Uuid, handle: CancelHandle) {
        self.inner.lock().unwrap().insert(execution_id, handle);
    }

    pub fn remove(&self, execution_id: Uuid) {
        self.inner.lock().unwrap().remove(&execution_id);
    }

    /// Request cancellation; `true` if the run was in flight here.
    pub fn cancel(&self, execution_id: Uuid) -> bool {
        match self.inner.lock().unwrap().get(&execution_id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }
}
