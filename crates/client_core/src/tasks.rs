//! Background work owned by a page or view.
//!
//! Tasks spawned through a [`TaskScope`] are aborted when the scope is
//! cancelled or dropped, so a response arriving after the owning view went
//! away is never dispatched into the store.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Default)]
pub struct TaskScope {
    label: &'static str,
    handles: Vec<JoinHandle<()>>,
}

impl TaskScope {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            handles: Vec::new(),
        }
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.retain(|handle| !handle.is_finished());
        self.handles.push(tokio::spawn(task));
    }

    /// Number of tasks that have not finished yet.
    pub fn len(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cancel_all(&mut self) {
        let pending = self.len();
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        if pending > 0 {
            debug!(scope = self.label, pending, "cancelled background tasks");
        }
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
