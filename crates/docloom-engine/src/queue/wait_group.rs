//! Task-counting completion barrier shared across queues.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// A Go-style wait group counting outstanding tasks.
///
/// Every queue increments the shared group when it accepts a task and
/// decrements it when the task is completed, skipped or dropped on
/// cancellation. [`WaitGroup::wait`] resolves once the count reaches zero,
/// which is the build orchestrator's single completion barrier: all
/// accepted tasks across all queues have drained.
///
/// Cloning is cheap; clones share the same counter.
#[derive(Clone, Debug, Default)]
pub struct WaitGroup {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    count: AtomicUsize,
    notify: Notify,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `n` outstanding tasks.
    pub fn add(&self, n: usize) {
        self.inner.count.fetch_add(n, Ordering::AcqRel);
    }

    /// Marks one task as drained, waking waiters when the count hits zero.
    pub fn done(&self) {
        let previous = self.inner.count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "wait group count underflow");
        if previous == 1 {
            self.inner.notify.notify_waiters();
        }
    }

    /// Current number of outstanding tasks.
    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Resolves once the count reaches zero.
    ///
    /// A group that never had tasks resolves immediately.
    pub async fn wait(&self) {
        loop {
            // The permit must be registered before the count check so a
            // concurrent `done` cannot slip between check and await.
            let notified = self.inner.notify.notified();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}
