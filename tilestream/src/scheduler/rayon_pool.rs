//! Rayon-backed scheduler.

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use super::{Job, Scheduler, SchedulerError, SyncToken};

/// Runs jobs on a dedicated rayon thread pool.
pub struct RayonScheduler {
    pool: ThreadPool,
}

impl RayonScheduler {
    /// Builds a pool of `threads` workers, or one per CPU if `threads` is 0.
    pub fn new(threads: usize) -> Result<Self, SchedulerError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tilestream-worker-{i}"))
            .build()?;
        debug!(threads = pool.current_num_threads(), "Started worker pool");
        Ok(Self { pool })
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl std::fmt::Debug for RayonScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RayonScheduler")
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl Scheduler for RayonScheduler {
    fn run(&self, job: Job, token: &SyncToken) {
        self.pool.spawn(token.track(job));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_runs_all_jobs_and_waits() {
        let scheduler = RayonScheduler::new(2).unwrap();
        let token = SyncToken::new();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..50 {
            let count = Arc::clone(&count);
            scheduler.run(
                Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                }),
                &token,
            );
        }
        scheduler.wait_for(&token);

        assert_eq!(count.load(Ordering::SeqCst), 50);
        assert!(scheduler.has_finished(&token));
    }

    #[test]
    fn test_thread_count() {
        let scheduler = RayonScheduler::new(3).unwrap();
        assert_eq!(scheduler.thread_count(), 3);
    }
}
