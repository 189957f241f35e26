//! Background loading with a consuming-thread construction step.

use std::sync::Arc;

use crate::loader::TileImagesLoader;
use crate::quadtree::QuadTreeTileKey;
use crate::scheduler::SchedulerPtr;

use super::queue::RequestQueue;
use super::{TileProgress, TileResult, DEFAULT_MAX_LOADS_PER_UPDATE};

/// Builds the final tile object from loaded images.
///
/// Runs on the thread calling [`AsyncTileLoader::update`], for work that
/// must happen there, such as creating GPU resources.
pub trait TileFinalizer<I> {
    type Tile;

    fn finalize(&mut self, key: QuadTreeTileKey, images: &I) -> Self::Tile;
}

impl<I, T, F> TileFinalizer<I> for F
where
    F: FnMut(QuadTreeTileKey, &I) -> T,
{
    type Tile = T;

    fn finalize(&mut self, key: QuadTreeTileKey, images: &I) -> T {
        self(key, images)
    }
}

/// Loads images in the background and turns them into tiles during
/// [`update`](Self::update).
///
/// At most a fixed number of tiles are finalized per update, bounding the
/// per-frame cost of bursts of completions.
pub struct AsyncTileLoader<L, F>
where
    L: TileImagesLoader,
    F: TileFinalizer<L::Images>,
{
    loader: Arc<L>,
    finalizer: F,
    queue: RequestQueue<L::Images, TileResult<F::Tile>>,
    max_loads_per_update: usize,
}

impl<L, F> AsyncTileLoader<L, F>
where
    L: TileImagesLoader,
    F: TileFinalizer<L::Images>,
{
    pub fn new(loader: Arc<L>, finalizer: F, scheduler: SchedulerPtr) -> Self {
        Self {
            loader,
            finalizer,
            queue: RequestQueue::new(scheduler),
            max_loads_per_update: DEFAULT_MAX_LOADS_PER_UPDATE,
        }
    }

    pub fn with_max_loads_per_update(mut self, max: usize) -> Self {
        self.max_loads_per_update = max.max(1);
        self
    }

    /// Schedules a load of `key`. The finalized tile is written to `result`
    /// by a later `update()` unless the request is cancelled first.
    pub fn load(
        &mut self,
        key: QuadTreeTileKey,
        result: TileResult<F::Tile>,
        progress: Arc<TileProgress>,
    ) {
        self.queue.submit(&self.loader, key, progress, result);
    }

    /// Finalizes up to the per-update cap of completed loads.
    pub fn update(&mut self) -> usize {
        let finalizer = &mut self.finalizer;
        self.queue
            .drain(self.max_loads_per_update, |key, images, result| {
                result.set(Arc::new(finalizer.finalize(key, &images)))
            })
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn wait_for_loads(&self) {
        self.queue.wait();
    }
}
