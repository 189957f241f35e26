//! Tokio-backed scheduler.

use tokio::runtime::Handle;

use super::{Job, Scheduler, SchedulerError, SyncToken};

/// Runs jobs on the blocking thread pool of a tokio runtime.
///
/// Suits applications that already own a runtime. Jobs are synchronous, so
/// they go to `spawn_blocking` rather than the async worker threads.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime of the calling thread.
    pub fn current() -> Result<Self, SchedulerError> {
        Ok(Self::new(Handle::try_current()?))
    }
}

impl Scheduler for TokioScheduler {
    fn run(&self, job: Job, token: &SyncToken) {
        // Completion is tracked by the token, not the join handle
        drop(self.handle.spawn_blocking(token.track(job)));
    }
}
