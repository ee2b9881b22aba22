//! Bounded task executor for the async todo endpoints.
//!
//! # Capacity Model
//!
//! - `core_workers` long-lived workers pull from one bounded FIFO queue
//! - when the queue is full, extra workers are started up to `max_workers`;
//!   an extra worker runs the overflowing task first, then serves the queue
//!   until it has been idle for `keep_alive`
//! - when the queue is full and `max_workers` are alive, the submitting task
//!   runs the work itself (caller-runs), which throttles the producer
//!
//! There is no cancellation: every submitted task runs exactly once, either
//! on a worker or inline on the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! let executor = TaskExecutor::new(ExecutorConfig::default())?;
//! let handle = executor.submit(async { 21 * 2 }).await;
//! assert_eq!(handle.await, Ok(42));
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Mutex, Notify};
use tracing::{debug, error, info, warn};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Executor sizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Name used in log fields
    pub name: String,
    /// Workers that live for the lifetime of the executor
    pub core_workers: usize,
    /// Upper bound on workers, core included
    pub max_workers: usize,
    /// Tasks that may wait for a worker
    pub queue_capacity: usize,
    /// Idle time after which an extra worker exits
    pub keep_alive: Duration,
    /// How long `shutdown` waits for queued work to finish
    pub await_termination: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            name: "todo-async".to_string(),
            core_workers: 2,
            max_workers: 4,
            queue_capacity: 500,
            keep_alive: Duration::from_secs(60),
            await_termination: Duration::from_secs(60),
        }
    }
}

/// Rejected executor sizing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorConfigError {
    #[error("core_workers must be at least 1")]
    NoCoreWorkers,

    #[error("max_workers ({max}) must be at least core_workers ({core})")]
    MaxBelowCore { core: usize, max: usize },

    #[error("queue_capacity must be at least 1")]
    ZeroQueueCapacity,
}

impl ExecutorConfig {
    pub fn validate(&self) -> Result<(), ExecutorConfigError> {
        if self.core_workers == 0 {
            return Err(ExecutorConfigError::NoCoreWorkers);
        }
        if self.max_workers < self.core_workers {
            return Err(ExecutorConfigError::MaxBelowCore {
                core: self.core_workers,
                max: self.max_workers,
            });
        }
        if self.queue_capacity == 0 {
            return Err(ExecutorConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }
}

/// The task panicked, so no result will arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("task aborted before producing a result")]
pub struct TaskAborted;

/// Completion handle for a submitted task.
///
/// Dropping the handle does not cancel the task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, TaskAborted>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map_err(|_| TaskAborted)
    }
}

#[derive(Debug, Clone, Copy)]
enum WorkerKind {
    Core,
    Extra,
}

struct Inner {
    config: ExecutorConfig,
    /// `None` once shutdown has begun
    sender: StdMutex<Option<mpsc::Sender<Job>>>,
    receiver: Mutex<mpsc::Receiver<Job>>,
    workers: AtomicUsize,
    /// Signalled when the last worker exits
    idle: Notify,
}

impl Inner {
    fn sender(&self) -> Option<mpsc::Sender<Job>> {
        self.sender.lock().ok().and_then(|guard| guard.as_ref().cloned())
    }

    /// Claim a worker slot if the pool is below `max_workers`.
    fn try_reserve_worker(&self) -> bool {
        let mut current = self.workers.load(Ordering::SeqCst);
        loop {
            if current >= self.config.max_workers {
                return false;
            }
            match self.workers.compare_exchange(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn worker_exited(&self) {
        if self.workers.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Shared handle to a bounded worker pool
#[derive(Clone)]
pub struct TaskExecutor {
    inner: Arc<Inner>,
}

impl TaskExecutor {
    /// Create the executor and start its core workers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecutorConfigError> {
        config.validate()?;

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let core_workers = config.core_workers;
        let inner = Arc::new(Inner {
            config,
            sender: StdMutex::new(Some(sender)),
            receiver: Mutex::new(receiver),
            workers: AtomicUsize::new(core_workers),
            idle: Notify::new(),
        });

        for _ in 0..core_workers {
            spawn_worker(inner.clone(), None, WorkerKind::Core);
        }

        debug!(
            executor = %inner.config.name,
            core = inner.config.core_workers,
            max = inner.config.max_workers,
            queue = inner.config.queue_capacity,
            "executor started"
        );

        Ok(Self { inner })
    }

    /// Workers currently alive.
    pub fn worker_count(&self) -> usize {
        self.inner.workers.load(Ordering::SeqCst)
    }

    /// Tasks waiting in the queue.
    pub fn queued(&self) -> usize {
        self.inner
            .sender()
            .map(|sender| sender.max_capacity() - sender.capacity())
            .unwrap_or(0)
    }

    /// Submit a task.
    ///
    /// Returns once the task is queued or handed to a new worker. Under
    /// saturation (or after shutdown) the task runs to completion on the
    /// caller before this returns.
    pub async fn submit<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, receiver) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let _ = result_tx.send(task.await);
        });

        match self.inner.sender() {
            Some(sender) => match sender.try_send(job) {
                Ok(()) => {}
                Err(TrySendError::Full(job)) => {
                    if self.inner.try_reserve_worker() {
                        debug!(executor = %self.inner.config.name, "queue full, starting extra worker");
                        spawn_worker(self.inner.clone(), Some(job), WorkerKind::Extra);
                    } else {
                        warn!(executor = %self.inner.config.name, "executor saturated, running task on caller");
                        run_job(job).await;
                    }
                }
                Err(TrySendError::Closed(job)) => {
                    debug!(executor = %self.inner.config.name, "queue closed, running task on caller");
                    run_job(job).await;
                }
            },
            None => {
                debug!(executor = %self.inner.config.name, "executor shut down, running task on caller");
                run_job(job).await;
            }
        }

        TaskHandle { receiver }
    }

    /// Stop queueing new work and wait for workers to drain the queue.
    ///
    /// Returns `false` if workers were still busy after `await_termination`.
    pub async fn shutdown(&self) -> bool {
        if let Ok(mut sender) = self.inner.sender.lock() {
            sender.take();
        }

        let drained = tokio::time::timeout(self.inner.config.await_termination, self.wait_idle())
            .await
            .is_ok();

        if drained {
            info!(executor = %self.inner.config.name, "executor drained");
        } else {
            warn!(
                executor = %self.inner.config.name,
                workers = self.worker_count(),
                "executor still busy after await_termination"
            );
        }
        drained
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.workers.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

fn spawn_worker(inner: Arc<Inner>, first: Option<Job>, kind: WorkerKind) {
    tokio::spawn(async move {
        if let Some(job) = first {
            run_job(job).await;
        }

        loop {
            let next = match kind {
                WorkerKind::Core => inner.receiver.lock().await.recv().await,
                // Waiting for the lock counts as idle time too.
                WorkerKind::Extra => tokio::time::timeout(inner.config.keep_alive, async {
                    inner.receiver.lock().await.recv().await
                })
                .await
                .ok()
                .flatten(),
            };

            match next {
                Some(job) => run_job(job).await,
                None => break,
            }
        }

        debug!(executor = %inner.config.name, ?kind, "worker exiting");
        inner.worker_exited();
    });
}

async fn run_job(job: Job) {
    if AssertUnwindSafe(job).catch_unwind().await.is_err() {
        error!("executor task panicked");
    }
}
