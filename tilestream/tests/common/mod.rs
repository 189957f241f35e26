//! Shared test doubles for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{ImageBuffer, Luma};
use parking_lot::Mutex;

use tilestream::quadtree::QuadTreeTileKey;
use tilestream::raster::{ElevationRerange, TileImage};
use tilestream::scheduler::{Job, JobGuard, Scheduler, SyncToken};
use tilestream::source::{CancelSupplier, SourceError, TileSource};

/// Height source with flat tiles at `level · metres_per_level` for levels
/// up to `max_level`, recording every fetch.
pub struct CountingSource {
    pub max_level: u32,
    pub metres_per_level: f64,
    pub delay: Duration,
    calls: Mutex<HashMap<QuadTreeTileKey, usize>>,
}

impl CountingSource {
    pub fn new(max_level: u32) -> Self {
        Self {
            max_level,
            metres_per_level: 100.0,
            delay: Duration::ZERO,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls_for(&self, key: QuadTreeTileKey) -> usize {
        self.calls.lock().get(&key).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

impl TileSource for CountingSource {
    fn create_image(
        &self,
        key: QuadTreeTileKey,
        _cancel: CancelSupplier<'_>,
    ) -> Result<Option<Arc<TileImage>>, SourceError> {
        *self.calls.lock().entry(key).or_default() += 1;
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if key.level > self.max_level {
            return Ok(None);
        }
        let rerange = ElevationRerange::EARTH;
        let value = rerange.color_value_for_elevation(self.metres_per_level * f64::from(key.level));
        Ok(Some(Arc::new(TileImage::height_map(
            ImageBuffer::from_pixel(8, 8, Luma([value])),
            rerange,
        ))))
    }

    fn has_any_children(&self, key: QuadTreeTileKey) -> bool {
        key.level < self.max_level
    }

    fn highest_available_level(&self, key: QuadTreeTileKey) -> Option<QuadTreeTileKey> {
        Some(key)
    }
}

/// Scheduler running each job on its own thread, counting submissions.
#[derive(Default)]
pub struct CountingScheduler {
    submitted: AtomicUsize,
}

impl CountingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }
}

impl Scheduler for CountingScheduler {
    fn run(&self, job: Job, token: &SyncToken) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        std::thread::spawn(token.track(job));
    }
}

/// Scheduler holding jobs until [`run_all`](Self::run_all) or `wait_for`.
#[derive(Default)]
pub struct QueuedScheduler {
    jobs: Mutex<Vec<(Job, JobGuard)>>,
}

impl QueuedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queued(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Runs queued jobs on the calling thread and returns how many ran.
    pub fn run_all(&self) -> usize {
        let jobs = std::mem::take(&mut *self.jobs.lock());
        let count = jobs.len();
        for (job, guard) in jobs {
            job();
            drop(guard);
        }
        count
    }
}

impl Scheduler for QueuedScheduler {
    fn run(&self, job: Job, token: &SyncToken) {
        self.jobs.lock().push((job, token.begin()));
    }

    fn wait_for(&self, token: &SyncToken) {
        while !token.has_finished() {
            if self.run_all() == 0 {
                token.wait();
            }
        }
    }
}
