//! Bounded job queue with a fixed worker pool.
//!
//! [`JobQueue`] moves opaque tasks through `N` cooperating workers. It owns
//! buffered intake with back-pressure, fail-fast versus accumulate error
//! policies, cooperative cancellation, panic recovery and synchronized
//! completion through the shared [`WaitGroup`].

mod wait_group;

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use docloom_core::BoxedError;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use wait_group::WaitGroup;

/// Tracing target for queue lifecycle events.
const TRACING_TARGET: &str = "docloom_engine::queue";

/// Maximum worker count accepted by [`JobQueue::new`].
const MAX_WORKERS: usize = 100;

/// Minimum intake buffer capacity.
const MIN_BUFFER: usize = 100;

/// Result type alias for queue operations.
pub type Result<T, E = QueueError> = std::result::Result<T, E>;

/// Errors surfaced by the queue itself (task errors are collected, not
/// returned).
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Invalid construction parameters.
    #[error("invalid job queue configuration: {0}")]
    Configuration(String),
}

/// The work function executed by queue workers.
///
/// Implementations observe the token for cooperative cancellation during
/// long waits; the queue itself never aborts a task mid-flight.
#[async_trait]
pub trait JobHandler<T>: Send + Sync {
    async fn handle(&self, token: &CancellationToken, task: T) -> std::result::Result<(), BoxedError>;
}

/// A bounded work queue feeding a fixed pool of workers.
///
/// Created stopped; [`start`](JobQueue::start) spawns the workers exactly
/// once, [`stop`](JobQueue::stop) closes the intake and joins them. Tasks
/// accepted before `stop` are still processed; tasks buffered when the
/// fail-fast policy trips (or the token is cancelled) are drained as
/// skipped so the shared wait group always balances.
pub struct JobQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for JobQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<T> {
    id: String,
    worker_count: usize,
    fail_fast: bool,
    handler: Arc<dyn JobHandler<T>>,
    wait_group: WaitGroup,

    tx: Mutex<Option<mpsc::Sender<T>>>,
    rx: tokio::sync::Mutex<mpsc::Receiver<T>>,
    token: OnceLock<CancellationToken>,
    workers: Mutex<Vec<JoinHandle<()>>>,

    started: AtomicBool,
    stopped: AtomicBool,
    skip_remaining: AtomicBool,

    accepted: AtomicUsize,
    in_progress: AtomicUsize,
    processed: AtomicUsize,
    skipped: AtomicUsize,

    errors: Mutex<Vec<Arc<BoxedError>>>,
}

impl<T: Send + 'static> JobQueue<T> {
    /// Creates a queue with `worker_count` workers in `[1, 100]`.
    ///
    /// The intake buffer holds `max(2 * worker_count, 100)` tasks so a
    /// producer can feed a full burst without blocking while memory stays
    /// bounded.
    pub fn new(
        id: impl Into<String>,
        worker_count: usize,
        handler: Arc<dyn JobHandler<T>>,
        fail_fast: bool,
        wait_group: WaitGroup,
    ) -> Result<Self> {
        if worker_count == 0 || worker_count > MAX_WORKERS {
            return Err(QueueError::Configuration(format!(
                "worker count {worker_count} is outside [1, {MAX_WORKERS}]"
            )));
        }

        let capacity = (2 * worker_count).max(MIN_BUFFER);
        let (tx, rx) = mpsc::channel(capacity);

        Ok(Self {
            shared: Arc::new(Shared {
                id: id.into(),
                worker_count,
                fail_fast,
                handler,
                wait_group,
                tx: Mutex::new(Some(tx)),
                rx: tokio::sync::Mutex::new(rx),
                token: OnceLock::new(),
                workers: Mutex::new(Vec::new()),
                started: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                skip_remaining: AtomicBool::new(false),
                accepted: AtomicUsize::new(0),
                in_progress: AtomicUsize::new(0),
                processed: AtomicUsize::new(0),
                skipped: AtomicUsize::new(0),
                errors: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Offers a task to the queue.
    ///
    /// Returns `true` when the task was accepted for execution, `false`
    /// when the queue is stopped or its token is already cancelled. When
    /// the buffer is full the call awaits capacity rather than dropping.
    pub async fn add_task(&self, task: T) -> bool {
        let shared = &self.shared;
        if shared.stopped.load(Ordering::Acquire) {
            return false;
        }
        if let Some(token) = shared.token.get()
            && token.is_cancelled()
        {
            return false;
        }

        // Clone the sender out so the lock is not held across the send.
        let sender = shared.tx.lock().expect("intake lock poisoned").clone();
        let Some(sender) = sender else {
            return false;
        };

        shared.wait_group.add(1);
        match sender.send(task).await {
            Ok(()) => {
                shared.accepted.fetch_add(1, Ordering::AcqRel);
                true
            }
            Err(_) => {
                shared.wait_group.done();
                false
            }
        }
    }

    /// Spawns the worker pool. A second call is a no-op.
    pub fn start(&self, token: CancellationToken) {
        let shared = &self.shared;
        if shared.started.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = shared.token.set(token.clone());

        let mut workers = shared.workers.lock().expect("worker lock poisoned");
        for worker in 0..shared.worker_count {
            let shared = Arc::clone(shared);
            let token = token.clone();
            workers.push(tokio::spawn(worker_loop(shared, token, worker)));
        }

        tracing::debug!(
            target: TRACING_TARGET,
            queue = %shared.id,
            workers = shared.worker_count,
            fail_fast = shared.fail_fast,
            "job queue started"
        );
    }

    /// Stops the queue: rejects further intake, lets workers finish what is
    /// buffered, and returns once every worker has exited.
    ///
    /// Safe to call before [`start`](JobQueue::start); buffered tasks are
    /// then released as skipped.
    pub async fn stop(&self) {
        let shared = &self.shared;
        shared.stopped.store(true, Ordering::Release);
        shared.close_intake();

        if !shared.started.load(Ordering::Acquire) {
            let mut rx = shared.rx.lock().await;
            while let Ok(task) = rx.try_recv() {
                drop(task);
                shared.mark_skipped();
            }
            return;
        }

        let workers: Vec<_> = {
            let mut guard = shared.workers.lock().expect("worker lock poisoned");
            guard.drain(..).collect()
        };
        for handle in workers {
            let _ = handle.await;
        }

        tracing::debug!(
            target: TRACING_TARGET,
            queue = %shared.id,
            processed = shared.processed.load(Ordering::Acquire),
            skipped = shared.skipped.load(Ordering::Acquire),
            "job queue stopped"
        );
    }

    /// Number of accepted tasks not yet picked up by a worker.
    pub fn waiting_count(&self) -> usize {
        let shared = &self.shared;
        shared
            .accepted
            .load(Ordering::Acquire)
            .saturating_sub(shared.processed.load(Ordering::Acquire))
            .saturating_sub(shared.in_progress.load(Ordering::Acquire))
    }

    /// Number of tasks fully drained (completed, errored or skipped).
    pub fn processed_count(&self) -> usize {
        self.shared.processed.load(Ordering::Acquire)
    }

    /// Number of tasks drained without running the handler.
    pub fn skipped_count(&self) -> usize {
        self.shared.skipped.load(Ordering::Acquire)
    }

    /// Snapshot of the collected task errors.
    pub fn error_list(&self) -> Vec<Arc<BoxedError>> {
        self.shared.errors.lock().expect("error lock poisoned").clone()
    }

    /// Queue identifier, used in logs and composite error reports.
    pub fn id(&self) -> &str {
        &self.shared.id
    }
}

impl<T> Shared<T> {
    fn close_intake(&self) {
        self.tx.lock().expect("intake lock poisoned").take();
    }

    /// Switches the queue into skip-drain: no further intake, buffered
    /// tasks are released without running the handler.
    fn begin_drain(&self) {
        self.stopped.store(true, Ordering::Release);
        self.skip_remaining.store(true, Ordering::Release);
        self.close_intake();
    }

    fn mark_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::AcqRel);
        self.processed.fetch_add(1, Ordering::AcqRel);
        self.wait_group.done();
    }

    fn skip(&self) {
        tracing::warn!(target: TRACING_TARGET, queue = %self.id, "skipping buffered task");
        self.mark_skipped();
    }

    fn record_error(&self, error: BoxedError, token: &CancellationToken) {
        if self.fail_fast {
            let mut errors = self.errors.lock().expect("error lock poisoned");
            if errors.is_empty() {
                errors.push(Arc::new(error));
                drop(errors);
                tracing::error!(
                    target: TRACING_TARGET,
                    queue = %self.id,
                    "task failed, stopping queue (fail-fast)"
                );
                self.begin_drain();
                token.cancel();
            }
        } else {
            tracing::error!(target: TRACING_TARGET, queue = %self.id, error = %error, "task failed");
            self.errors.lock().expect("error lock poisoned").push(Arc::new(error));
        }
    }
}

async fn worker_loop<T: Send + 'static>(
    shared: Arc<Shared<T>>,
    token: CancellationToken,
    worker: usize,
) {
    loop {
        if shared.skip_remaining.load(Ordering::Acquire) {
            let task = shared.rx.lock().await.recv().await;
            match task {
                Some(_) => shared.skip(),
                None => break,
            }
            continue;
        }

        let task = {
            let mut rx = shared.rx.lock().await;
            tokio::select! {
                biased;

                () = token.cancelled() => {
                    shared.begin_drain();
                    continue;
                }

                task = rx.recv() => task,
            }
        };

        let Some(task) = task else { break };
        if shared.skip_remaining.load(Ordering::Acquire) {
            shared.skip();
            continue;
        }

        run_task(&shared, &token, task).await;
    }

    tracing::trace!(target: TRACING_TARGET, queue = %shared.id, worker, "worker exited");
}

async fn run_task<T: Send + 'static>(shared: &Shared<T>, token: &CancellationToken, task: T) {
    shared.in_progress.fetch_add(1, Ordering::AcqRel);

    let outcome = AssertUnwindSafe(shared.handler.handle(token, task))
        .catch_unwind()
        .await;

    shared.in_progress.fetch_sub(1, Ordering::AcqRel);
    shared.processed.fetch_add(1, Ordering::AcqRel);
    shared.wait_group.done();

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(error)) => shared.record_error(error, token),
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(
                target: TRACING_TARGET,
                queue = %shared.id,
                panic = %message,
                "worker recovered from panic"
            );
            shared.record_error(format!("worker panicked: {message}").into(), token);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    /// Handler counting invocations and failing or panicking on request.
    #[derive(Default)]
    struct Recording {
        handled: AtomicUsize,
    }

    #[async_trait]
    impl JobHandler<usize> for Recording {
        async fn handle(
            &self,
            _token: &CancellationToken,
            task: usize,
        ) -> std::result::Result<(), BoxedError> {
            self.handled.fetch_add(1, Ordering::AcqRel);
            match task {
                13 => Err("unlucky task".into()),
                99 => panic!("boom on {task}"),
                _ => Ok(()),
            }
        }
    }

    /// Handler that blocks until its token is cancelled.
    struct Slow;

    #[async_trait]
    impl JobHandler<usize> for Slow {
        async fn handle(
            &self,
            token: &CancellationToken,
            _task: usize,
        ) -> std::result::Result<(), BoxedError> {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(Duration::from_secs(30)) => {}
            }
            Ok(())
        }
    }

    fn queue(
        handler: Arc<dyn JobHandler<usize>>,
        workers: usize,
        fail_fast: bool,
    ) -> (JobQueue<usize>, WaitGroup) {
        let group = WaitGroup::new();
        let queue = JobQueue::new("test", workers, handler, fail_fast, group.clone()).unwrap();
        (queue, group)
    }

    #[test]
    fn rejects_out_of_range_worker_counts() {
        let handler: Arc<dyn JobHandler<usize>> = Arc::new(Recording::default());
        assert!(JobQueue::new("q", 0, handler.clone(), false, WaitGroup::new()).is_err());
        assert!(JobQueue::new("q", 101, handler.clone(), false, WaitGroup::new()).is_err());
        assert!(JobQueue::new("q", 100, handler, false, WaitGroup::new()).is_ok());
    }

    #[tokio::test]
    async fn processes_all_accepted_tasks() {
        let handler = Arc::new(Recording::default());
        let (queue, group) = queue(handler.clone(), 4, false);
        queue.start(CancellationToken::new());

        for task in 0..10 {
            assert!(queue.add_task(task).await);
        }
        queue.stop().await;

        assert_eq!(handler.handled.load(Ordering::Acquire), 10);
        assert_eq!(queue.processed_count(), 10);
        assert_eq!(queue.waiting_count(), 0);
        assert_eq!(group.count(), 0);
    }

    #[tokio::test]
    async fn add_task_on_stopped_queue_is_rejected() {
        let handler = Arc::new(Recording::default());
        let (queue, _group) = queue(handler.clone(), 1, false);
        queue.start(CancellationToken::new());
        queue.stop().await;

        assert!(!queue.add_task(1).await);
        assert_eq!(handler.handled.load(Ordering::Acquire), 0);
    }

    #[tokio::test]
    async fn second_start_is_a_no_op() {
        let handler = Arc::new(Recording::default());
        let (queue, _group) = queue(handler.clone(), 2, false);
        queue.start(CancellationToken::new());
        queue.start(CancellationToken::new());

        assert!(queue.add_task(1).await);
        queue.stop().await;
        assert_eq!(handler.handled.load(Ordering::Acquire), 1);
    }

    #[tokio::test]
    async fn panic_is_recovered_and_processing_continues() {
        let handler = Arc::new(Recording::default());
        let (queue, group) = queue(handler.clone(), 1, false);
        queue.start(CancellationToken::new());

        assert!(queue.add_task(99).await);
        assert!(queue.add_task(1).await);
        queue.stop().await;

        assert_eq!(handler.handled.load(Ordering::Acquire), 2);
        assert_eq!(queue.processed_count(), 2);
        let errors = queue.error_list();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("boom on 99"));
        assert_eq!(group.count(), 0);
    }

    #[tokio::test]
    async fn accumulate_mode_collects_every_error() {
        let handler = Arc::new(Recording::default());
        let (queue, _group) = queue(handler.clone(), 2, false);
        queue.start(CancellationToken::new());

        for task in [13, 1, 13, 2] {
            assert!(queue.add_task(task).await);
        }
        queue.stop().await;

        assert_eq!(queue.error_list().len(), 2);
        assert_eq!(queue.processed_count(), 4);
    }

    #[tokio::test]
    async fn fail_fast_skips_buffered_tasks_and_keeps_one_error() {
        let handler = Arc::new(Recording::default());
        let (queue, group) = queue(handler.clone(), 1, true);

        // Queue everything before starting so ordering is deterministic:
        // two good tasks, one failing, three left to skip.
        for task in [1, 2, 13, 3, 4, 5] {
            assert!(queue.add_task(task).await);
        }
        queue.start(CancellationToken::new());
        group.wait().await;
        queue.stop().await;

        assert_eq!(handler.handled.load(Ordering::Acquire), 3);
        assert_eq!(queue.skipped_count(), 3);
        assert_eq!(queue.processed_count(), 6);
        assert_eq!(queue.error_list().len(), 1);
        assert!(!queue.add_task(6).await);
    }

    #[tokio::test]
    async fn cancellation_drains_pending_tasks() {
        let token = CancellationToken::new();
        let handler: Arc<dyn JobHandler<usize>> = Arc::new(Slow);
        let (queue, group) = queue(handler, 1, false);
        queue.start(token.clone());

        for task in 0..5 {
            assert!(queue.add_task(task).await);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(2), group.wait())
            .await
            .expect("wait group should drain after cancellation");
        queue.stop().await;
        assert_eq!(queue.processed_count(), 5);
        assert!(!queue.add_task(5).await);
    }

    #[tokio::test]
    async fn stop_before_start_releases_buffered_tasks() {
        let handler = Arc::new(Recording::default());
        let (queue, group) = queue(handler.clone(), 2, false);

        assert!(queue.add_task(1).await);
        assert!(queue.add_task(2).await);
        queue.stop().await;

        assert_eq!(group.count(), 0);
        assert_eq!(queue.skipped_count(), 2);
        assert_eq!(handler.handled.load(Ordering::Acquire), 0);
    }

    #[tokio::test]
    async fn counters_balance_when_stopped() {
        let handler = Arc::new(Recording::default());
        let (queue, _group) = queue(handler, 3, false);
        queue.start(CancellationToken::new());

        for task in 0..17 {
            assert!(queue.add_task(task).await);
        }
        queue.stop().await;

        assert_eq!(queue.processed_count() + queue.waiting_count(), 17);
    }
}
