//! Action serializer
//!
//! Page-driving tasks run one at a time in arrival order. A failed task
//! releases the queue like a successful one; each caller gets its own
//! task's result.

use crate::error::Result;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// FIFO gate in front of the trusted-input channel
#[derive(Clone, Default)]
pub struct ActionQueue {
    // tokio's mutex hands out the lock in request order
    gate: Arc<Mutex<()>>,
    waiting: Arc<AtomicUsize>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks queued or running
    pub fn pending(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Run `task` after every previously enqueued task has finished
    pub async fn enqueue<T, F, Fut>(&self, label: &str, task: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _pending = PendingSlot::new(&self.waiting);
        let _turn = self.gate.lock().await;
        log::debug!("Running queued action '{}'", label);

        let outcome = task().await;

        if let Err(e) = &outcome {
            log::warn!("Queued action '{}' failed: {}", label, e);
        }
        outcome
    }
}

/// One queued or running task; counted until dropped, however the task ends
struct PendingSlot<'a>(&'a AtomicUsize);

impl<'a> PendingSlot<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
