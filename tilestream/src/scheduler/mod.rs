//! Worker pool abstraction for background tile loads.
//!
//! A [`Scheduler`] runs jobs on worker threads and tracks them through a
//! [`SyncToken`]. Every job submitted with a token increments its pending
//! count until the job returns (or panics), so the submitter can poll
//! [`has_finished`](Scheduler::has_finished) or block in
//! [`wait_for`](Scheduler::wait_for).
//!
//! Two backends are provided:
//!
//! - [`RayonScheduler`]: dedicated rayon thread pool
//! - [`TokioScheduler`]: tokio's blocking thread pool on a runtime handle
//!
//! No ordering or priority between jobs is guaranteed.

mod rayon_pool;
mod tokio_pool;

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

pub use rayon_pool::RayonScheduler;
pub use tokio_pool::TokioScheduler;

/// Unit of work run on a worker thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Errors constructing a scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The rayon thread pool could not be built.
    #[error("failed to build worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    /// No tokio runtime is running on this thread.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

// =============================================================================
// SyncToken
// =============================================================================

#[derive(Debug, Default)]
struct SyncState {
    pending: Mutex<usize>,
    finished: Condvar,
}

/// Counts the in-flight jobs of one submitter.
///
/// Clones share the same count.
#[derive(Debug, Clone, Default)]
pub struct SyncToken {
    state: Arc<SyncState>,
}

impl SyncToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of submitted jobs that have not returned yet.
    pub fn pending(&self) -> usize {
        *self.state.pending.lock()
    }

    pub fn has_finished(&self) -> bool {
        self.pending() == 0
    }

    /// Blocks until every job submitted with this token has returned.
    pub fn wait(&self) {
        let mut pending = self.state.pending.lock();
        while *pending > 0 {
            self.state.finished.wait(&mut pending);
        }
    }

    /// Registers a job and returns the guard that completes it on drop.
    ///
    /// Scheduler implementations call this in [`Scheduler::run`] before
    /// queueing the job and drop the guard once the job has returned.
    pub fn begin(&self) -> JobGuard {
        *self.state.pending.lock() += 1;
        JobGuard {
            token: self.clone(),
        }
    }

    /// Wraps `job` so it registers with this token now and completes when
    /// it returns.
    pub fn track(&self, job: Job) -> Job {
        let guard = self.begin();
        Box::new(move || {
            let _guard = guard;
            job();
        })
    }

    fn end(&self) {
        let mut pending = self.state.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.state.finished.notify_all();
        }
    }
}

/// Completes a job's registration when dropped, panics included.
#[must_use = "the job counts as finished as soon as the guard is dropped"]
pub struct JobGuard {
    token: SyncToken,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.token.end();
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Cooperative task pool.
///
/// Calling [`wait_for`](Self::wait_for) from one of the scheduler's own
/// worker threads on a token whose jobs are queued behind it can deadlock.
pub trait Scheduler: Send + Sync {
    /// Submits `job` and registers it with `token`.
    fn run(&self, job: Job, token: &SyncToken);

    /// Blocks until all jobs registered with `token` have returned.
    fn wait_for(&self, token: &SyncToken) {
        token.wait();
    }

    fn has_finished(&self, token: &SyncToken) -> bool {
        token.has_finished()
    }
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn run(&self, job: Job, token: &SyncToken) {
        (**self).run(job, token)
    }

    fn wait_for(&self, token: &SyncToken) {
        (**self).wait_for(token)
    }

    fn has_finished(&self, token: &SyncToken) -> bool {
        (**self).has_finished(token)
    }
}

/// Shared handle to a scheduler.
pub type SchedulerPtr = Arc<dyn Scheduler>;
