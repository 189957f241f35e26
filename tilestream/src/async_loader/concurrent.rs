//! Background image loading with consuming-thread delivery.

use std::sync::Arc;

use crate::loader::TileImagesLoader;
use crate::quadtree::QuadTreeTileKey;
use crate::scheduler::SchedulerPtr;

use super::queue::RequestQueue;
use super::{TileProgress, TileResult, DEFAULT_MAX_LOADS_PER_UPDATE};

/// Runs a [`TileImagesLoader`] on a scheduler and delivers image sets from
/// [`update`](Self::update).
///
/// # Example
///
/// ```ignore
/// let mut loader = ConcurrentAsyncTileLoader::new(images_loader, scheduler);
///
/// let result = TileResult::new();
/// let progress = TileProgress::shared();
/// loader.load(key, result.clone(), progress.clone());
///
/// // Once per frame
/// loader.update();
/// if let Some(images) = result.get() { /* ... */ }
/// ```
pub struct ConcurrentAsyncTileLoader<L: TileImagesLoader> {
    loader: Arc<L>,
    queue: RequestQueue<L::Images, TileResult<L::Images>>,
    max_loads_per_update: usize,
}

impl<L: TileImagesLoader> ConcurrentAsyncTileLoader<L> {
    pub fn new(loader: Arc<L>, scheduler: SchedulerPtr) -> Self {
        Self {
            loader,
            queue: RequestQueue::new(scheduler),
            max_loads_per_update: DEFAULT_MAX_LOADS_PER_UPDATE,
        }
    }

    /// Caps how many completed requests one [`update`](Self::update)
    /// delivers. Lower values smooth frame times and delay loads.
    pub fn with_max_loads_per_update(mut self, max: usize) -> Self {
        self.max_loads_per_update = max.max(1);
        self
    }

    pub fn loader(&self) -> &Arc<L> {
        &self.loader
    }

    /// Schedules a load of `key`.
    ///
    /// `progress` moves to `Loading` immediately. The images are written to
    /// `result` by a later `update()` unless the request is cancelled first.
    pub fn load(
        &mut self,
        key: QuadTreeTileKey,
        result: TileResult<L::Images>,
        progress: Arc<TileProgress>,
    ) {
        self.queue.submit(&self.loader, key, progress, result);
    }

    /// Delivers completed requests and retires cancelled or failed ones.
    /// Call periodically from one thread. Returns the number delivered.
    pub fn update(&mut self) -> usize {
        self.queue
            .drain(self.max_loads_per_update, |_, images, result| result.set(images))
    }

    /// Requests still awaiting delivery or retirement.
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Blocks until no job of this loader is running or queued.
    pub fn wait_for_loads(&self) {
        self.queue.wait();
    }
}
