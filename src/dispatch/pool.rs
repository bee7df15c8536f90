// Elastic worker pool
//
// Jobs are queued FIFO and picked up by worker threads. The pool starts with
// no threads; a worker is spawned whenever a job is queued and nobody is idle
// to take it, up to an optional cap. Idle workers retire after a timeout.

use crate::command::trait_def::CommandError;
use crate::dispatch::config::DispatcherConfig;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Snapshot of pool bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PoolStats {
    pub queue_depth: usize,
    pub active_tasks: usize,
    pub live_workers: usize,
    pub idle_workers: usize,
    pub tasks_completed: u64,
}

/// Everything guarded by the queue lock
#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    live: usize,
    idle: usize,
    active: usize,
}

struct PoolInner {
    state: Mutex<QueueState>,
    work_ready: Condvar,
    drain_cond: Condvar,
    shutdown: AtomicBool,
    next_worker: AtomicUsize,
    tasks_completed: AtomicU64,
    config: DispatcherConfig,
}

pub(crate) struct WorkerPool {
    inner: Arc<PoolInner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub(crate) fn new(config: DispatcherConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                state: Mutex::new(QueueState::default()),
                work_ready: Condvar::new(),
                drain_cond: Condvar::new(),
                shutdown: AtomicBool::new(false),
                next_worker: AtomicUsize::new(0),
                tasks_completed: AtomicU64::new(0),
                config,
            }),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Queue a job, growing the pool if no worker is free to take it
    ///
    /// On error the job has not been queued and will never run.
    pub(crate) fn submit(&self, job: Job) -> Result<(), CommandError> {
        // Checked under the lock so a job cannot slip in behind the workers'
        // final look at the queue
        let mut state = self.inner.state.lock();
        if self.is_shut_down() {
            return Err(CommandError::DispatcherShutdown);
        }
        state.jobs.push_back(job);

        let at_capacity = self
            .inner
            .config
            .max_workers
            .is_some_and(|max| state.live >= max);

        if state.jobs.len() > state.idle && !at_capacity {
            // Spawned while holding the lock: the new worker blocks on it
            // until we are done with the bookkeeping below.
            match self.spawn_worker() {
                Ok(handle) => {
                    state.live += 1;
                    let mut workers = self.workers.lock();
                    workers.retain(|h| !h.is_finished());
                    workers.push(handle);
                }
                Err(e) if state.live == 0 => {
                    // The job may own the last reference to a command, so its
                    // drop code must not run under the queue lock
                    let job = state.jobs.pop_back();
                    drop(state);
                    drop(job);
                    error!(error = %e, "failed to spawn command worker, no workers available");
                    return Err(CommandError::WorkerSpawn(e.to_string()));
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        live_workers = state.live,
                        "failed to spawn command worker, job left for existing workers"
                    );
                }
            }
        }

        self.inner.work_ready.notify_one();
        Ok(())
    }

    fn spawn_worker(&self) -> std::io::Result<JoinHandle<()>> {
        let index = self.inner.next_worker.fetch_add(1, Ordering::Relaxed);
        let mut builder = thread::Builder::new().name(format!(
            "{}-{}",
            self.inner.config.thread_name_prefix, index
        ));
        if let Some(stack_size) = self.inner.config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let inner = Arc::clone(&self.inner);
        builder.spawn(move || worker_loop(&inner))
    }

    /// Block until the queue is empty and no job is running
    ///
    /// Workers stay alive; this is not a shutdown. Must not be called from
    /// inside a job, which would wait for itself.
    pub(crate) fn drain(&self) {
        let mut state = self.inner.state.lock();
        while !state.jobs.is_empty() || state.active > 0 {
            self.inner.drain_cond.wait(&mut state);
        }
    }

    /// Stop accepting jobs, let workers finish what is queued, and join them
    ///
    /// The calling thread is never joined, so a job may shut down its own pool.
    pub(crate) fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);

        {
            let _state = self.inner.state.lock();
            self.inner.work_ready.notify_all();
        }

        let current = thread::current().id();
        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("command worker exited with a panic");
            }
        }
    }

    pub(crate) fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        PoolStats {
            queue_depth: state.jobs.len(),
            active_tasks: state.active,
            live_workers: state.live,
            idle_workers: state.idle,
            tasks_completed: self.inner.tasks_completed.load(Ordering::Relaxed),
        }
    }
}

/// Decrements the active count and wakes drain waiters, even if the job panics
struct ActiveJobGuard<'a> {
    inner: &'a PoolInner,
}

impl Drop for ActiveJobGuard<'_> {
    fn drop(&mut self) {
        self.inner.tasks_completed.fetch_add(1, Ordering::Relaxed);
        let mut state = self.inner.state.lock();
        state.active -= 1;
        if state.active == 0 && state.jobs.is_empty() {
            self.inner.drain_cond.notify_all();
        }
    }
}

fn worker_loop(inner: &PoolInner) {
    let name = thread::current().name().unwrap_or("command-worker").to_string();
    debug!(worker = %name, "command worker started");

    loop {
        let job = {
            let mut state = inner.state.lock();
            loop {
                if let Some(job) = state.jobs.pop_front() {
                    state.active += 1;
                    break job;
                }
                if inner.shutdown.load(Ordering::Acquire) {
                    state.live -= 1;
                    debug!(worker = %name, "command worker stopping for shutdown");
                    return;
                }

                state.idle += 1;
                let timed_out = inner
                    .work_ready
                    .wait_for(&mut state, inner.config.idle_timeout())
                    .timed_out();
                state.idle -= 1;

                if timed_out && state.jobs.is_empty() {
                    state.live -= 1;
                    debug!(worker = %name, "idle command worker retiring");
                    return;
                }
            }
        };

        let _guard = ActiveJobGuard { inner };

        // Jobs built by the dispatcher catch their own panics; this keeps the
        // worker alive for anything else.
        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
            error!(
                worker = %name,
                "command job panicked: {:?}",
                e.downcast_ref::<&str>().copied().unwrap_or("(non-string panic)")
            );
        }
    }
}
