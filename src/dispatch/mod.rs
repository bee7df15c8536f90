// Asynchronous dispatch for commands
//
// Architecture:
// - Dispatcher: cloneable facade, wraps work so failures stop at the task boundary
// - WorkerPool: elastic set of worker threads pulling jobs from a FIFO queue
// - TaskHandle: optional handle to wait on a submission
// - FailureHub: optional channel for observing asynchronous failures
//
// Commands use the process-wide dispatcher returned by `global()` unless a
// specific one is passed to `Command::execute_on` / `Command::undo_on`.

pub mod config;
pub mod failure;
pub mod handle;
mod pool;

pub use config::{ConfigError, DispatcherConfig};
pub use failure::{AsyncFailure, FailureReceiver};
pub use handle::{TaskHandle, TaskId};

use crate::command::trait_def::{CommandError, CommandResult, Operation};
use failure::FailureHub;
use handle::CompletionSlot;
use pool::WorkerPool;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, warn};

static GLOBAL_DISPATCHER: OnceLock<Dispatcher> = OnceLock::new();

/// The process-wide dispatcher used by `execute_asynchronously` and
/// `undo_asynchronously`
///
/// Created on first use with [`DispatcherConfig::default`]. It is never shut
/// down; call [`Dispatcher::drain`] to wait for outstanding work.
pub fn global() -> &'static Dispatcher {
    GLOBAL_DISPATCHER.get_or_init(Dispatcher::default)
}

/// Metrics snapshot for a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Submissions waiting for a worker
    pub queue_depth: usize,
    /// Submissions currently running
    pub active_tasks: usize,
    pub live_workers: usize,
    pub idle_workers: usize,
    /// Submissions that ran to completion, successfully or not
    pub tasks_completed: u64,
    /// Submissions that failed, including those rejected at submit time
    pub tasks_failed: u64,
}

struct DispatcherInner {
    pool: WorkerPool,
    failures: FailureHub,
    next_task_id: AtomicU64,
    tasks_failed: AtomicU64,
}

impl Drop for DispatcherInner {
    fn drop(&mut self) {
        self.pool.shutdown();
    }
}

/// Runs command operations on background workers, fire-and-forget
///
/// Cloning is cheap and every clone drives the same pool. The pool is shut
/// down (after finishing queued work) when the last clone is dropped.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// Create a dispatcher with its own worker pool
    ///
    /// Fails with [`ConfigError::Invalid`] for settings the pool cannot run
    /// with, such as a zero `max_workers` cap that would leave every
    /// submission queued forever.
    pub fn new(config: DispatcherConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: DispatcherConfig) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                pool: WorkerPool::new(config),
                failures: FailureHub::default(),
                next_task_id: AtomicU64::new(1),
                tasks_failed: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        self.inner.pool.config()
    }

    /// Submit work and return immediately
    ///
    /// `work` runs on a worker thread. An error it returns, or a panic, is
    /// caught there: it is logged, published to failure subscribers and
    /// stored in the returned handle. Nothing is raised on the calling thread,
    /// not even when the dispatcher has been shut down.
    pub fn submit<F>(&self, operation: Operation, description: String, work: F) -> TaskHandle
    where
        F: FnOnce() -> CommandResult<()> + Send + 'static,
    {
        let id = TaskId(self.inner.next_task_id.fetch_add(1, Ordering::Relaxed));
        let slot = CompletionSlot::new();
        let handle = TaskHandle::new(id, operation, description.clone(), slot.clone());

        debug!(
            task_id = id.0,
            operation = %operation,
            command = %description,
            "dispatching command"
        );

        let report = FailureReport {
            inner: Arc::downgrade(&self.inner),
            task_id: id,
            operation,
            description,
        };
        let job_slot = slot.clone();
        let job = Box::new(move || {
            let outcome = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(work)) {
                Ok(outcome) => outcome,
                Err(payload) => Err(CommandError::Panicked(panic_message(payload.as_ref()))),
            };
            match &outcome {
                Ok(()) => debug!(
                    task_id = report.task_id.0,
                    operation = %report.operation,
                    command = %report.description,
                    "command finished"
                ),
                Err(e) => report.publish(e),
            }
            job_slot.complete(outcome);
        });

        if let Err(e) = self.inner.pool.submit(job) {
            let report = FailureReport {
                inner: Arc::downgrade(&self.inner),
                task_id: id,
                operation,
                description: handle.description().to_string(),
            };
            report.publish(&e);
            slot.complete(Err(e));
        }

        handle
    }

    /// Subscribe to failures of asynchronous work
    ///
    /// Every failure caught after this call is sent to the receiver. Dropping
    /// the receiver unsubscribes.
    pub fn subscribe_failures(&self) -> FailureReceiver {
        self.inner.failures.subscribe()
    }

    /// Block until all queued and running work has finished
    ///
    /// Must not be called from inside dispatched work.
    pub fn drain(&self) {
        self.inner.pool.drain();
    }

    /// Stop accepting work, finish what is queued, and join the workers
    pub fn shutdown(&self) {
        self.inner.pool.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.pool.is_shut_down()
    }

    pub fn stats(&self) -> DispatcherStats {
        let pool = self.inner.pool.stats();
        DispatcherStats {
            queue_depth: pool.queue_depth,
            active_tasks: pool.active_tasks,
            live_workers: pool.live_workers,
            idle_workers: pool.idle_workers,
            tasks_completed: pool.tasks_completed,
            tasks_failed: self.inner.tasks_failed.load(Ordering::Relaxed),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::with_valid_config(DispatcherConfig::default())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", self.config())
            .field("stats", &self.stats())
            .finish()
    }
}

/// What a job needs to report its own failure
///
/// Holds the dispatcher weakly: queued jobs must not keep their dispatcher
/// alive, or dropping the last handle would never shut the pool down.
struct FailureReport {
    inner: std::sync::Weak<DispatcherInner>,
    task_id: TaskId,
    operation: Operation,
    description: String,
}

impl FailureReport {
    fn publish(&self, error: &CommandError) {
        match error {
            CommandError::Panicked(_) | CommandError::WorkerSpawn(_) => error!(
                task_id = self.task_id.0,
                operation = %self.operation,
                command = %self.description,
                error = %error,
                "asynchronous command failed"
            ),
            _ => warn!(
                task_id = self.task_id.0,
                operation = %self.operation,
                command = %self.description,
                error = %error,
                "asynchronous command failed"
            ),
        }

        if let Some(inner) = self.inner.upgrade() {
            inner.tasks_failed.fetch_add(1, Ordering::Relaxed);
            inner.failures.publish(&AsyncFailure {
                task_id: self.task_id,
                operation: self.operation,
                description: self.description.clone(),
                error: error.clone(),
            });
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "(non-string panic)".to_string()
    }
}
