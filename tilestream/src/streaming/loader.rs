//! View-driven streaming of a globe quadtree.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use glam::DVec2;
use tracing::{debug, trace};

use crate::async_loader::{ConcurrentAsyncTileLoader, LoadState, TileProgress, TileResult};
use crate::loader::TileImagesLoader;
use crate::quadtree::{find_tile, DiQuadTree, QuadTree, QuadTreeTile, QuadTreeTileKey, Tile, TileFactory};

use super::{StreamingStats, SubdivisionPredicate};

/// Loads queued by the streaming loader at any one time.
pub const MAX_QUEUED_LOADS: usize = 32;

/// Load state of a streaming tile as seen by the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    /// Not loaded and not in the load queue. Also covers failed and
    /// cancelled loads, which are retried when wanted again.
    NotLoaded,
    Loading,
    Loaded,
}

/// Payload of a streaming tile: its delivered images and the progress of
/// its current load, if any.
///
/// Dropping the slot cancels the load, so merging a subtree cancels every
/// outstanding load inside it.
pub struct TileSlot<I> {
    result: TileResult<I>,
    progress: Option<Arc<TileProgress>>,
}

impl<I> Default for TileSlot<I> {
    fn default() -> Self {
        Self {
            result: TileResult::new(),
            progress: None,
        }
    }
}

impl<I> fmt::Debug for TileSlot<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileSlot")
            .field("state", &self.state())
            .field("has_data", &self.has_data())
            .finish()
    }
}

impl<I> TileSlot<I> {
    /// The delivered images, or `None` until the load completes.
    pub fn data(&self) -> Option<Arc<I>> {
        self.result.get()
    }

    pub fn has_data(&self) -> bool {
        self.result.is_ready()
    }

    pub fn state(&self) -> TileState {
        match self.progress.as_ref().map(|progress| progress.state()) {
            Some(LoadState::Loaded) => TileState::Loaded,
            Some(LoadState::Loading) => TileState::Loading,
            _ => TileState::NotLoaded,
        }
    }

    fn request_cancel_load(&self) {
        if let Some(progress) = &self.progress {
            progress.request_cancel();
        }
    }
}

impl<I> Drop for TileSlot<I> {
    fn drop(&mut self) {
        self.request_cancel_load();
    }
}

/// Globe tile driven by [`QuadTreeTileLoader`].
pub type StreamingTile<I> = Tile<DVec2, TileSlot<I>>;

/// Visible leaf changes produced by one [`QuadTreeTileLoader::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingUpdate {
    pub added: Vec<QuadTreeTileKey>,
    pub removed: Vec<QuadTreeTileKey>,
}

impl StreamingUpdate {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Streams a globe quadtree to satisfy a [`SubdivisionPredicate`].
///
/// While a tile is of sufficient resolution its children are not loaded.
/// Otherwise its children are loaded next, so detail arrives one level at a
/// time and the next-best tile stays visible while finer ones stream in.
///
/// ```text
///   update()
///      │
///      ├── traverse both roots
///      │     ├── parent insufficient, tile not loaded ──► load
///      │     ├── parent sufficient, tile not loaded    ──► cancel
///      │     ├── loaded and insufficient               ──► subdivide
///      │     └── loaded and sufficient                 ──► merge children
///      ├── deliver completed loads
///      ├── retire finished queue entries (stats)
///      └── diff visible leaves ──► StreamingUpdate { added, removed }
/// ```
pub struct QuadTreeTileLoader<L, P>
where
    L: TileImagesLoader,
{
    tree: DiQuadTree<StreamingTile<L::Images>>,
    loader: ConcurrentAsyncTileLoader<L>,
    predicate: P,
    queue: Vec<Arc<TileProgress>>,
    visible: BTreeSet<QuadTreeTileKey>,
    stats: Arc<StreamingStats>,
}

impl<L, P> QuadTreeTileLoader<L, P>
where
    L: TileImagesLoader,
    P: SubdivisionPredicate,
{
    pub fn new(loader: ConcurrentAsyncTileLoader<L>, predicate: P) -> Self {
        let factory = TileFactory::new(StreamingTile::<L::Images>::with_default_payload);
        Self {
            tree: DiQuadTree::globe(factory),
            loader,
            predicate,
            queue: Vec::new(),
            visible: BTreeSet::new(),
            stats: Arc::new(StreamingStats::new()),
        }
    }

    pub fn tree(&self) -> &DiQuadTree<StreamingTile<L::Images>> {
        &self.tree
    }

    pub fn predicate(&self) -> &P {
        &self.predicate
    }

    /// Mutable access for predicates that track a moving observer.
    pub fn predicate_mut(&mut self) -> &mut P {
        &mut self.predicate
    }

    pub fn stats(&self) -> Arc<StreamingStats> {
        Arc::clone(&self.stats)
    }

    /// Keys reported visible by the last update.
    pub fn visible_tiles(&self) -> impl Iterator<Item = QuadTreeTileKey> + '_ {
        self.visible.iter().copied()
    }

    /// Images of the tile at `key`, if it exists and has been delivered.
    pub fn tile_data(&self, key: QuadTreeTileKey) -> Option<Arc<L::Images>> {
        self.tree
            .trees()
            .into_iter()
            .find_map(|tree| find_tile(tree.root(), key))
            .and_then(|tile| tile.payload.data())
    }

    /// Loads currently queued, at most [`MAX_QUEUED_LOADS`].
    pub fn queued_loads(&self) -> usize {
        self.queue.len()
    }

    /// Blocks until no load job is running.
    pub fn wait_for_loads(&self) {
        self.loader.wait_for_loads();
    }

    /// Advances streaming by one step and reports visible leaf changes.
    pub fn update(&mut self) -> StreamingUpdate {
        {
            let mut traversal = Traversal {
                loader: &mut self.loader,
                predicate: &self.predicate,
                queue: &mut self.queue,
                stats: &self.stats,
            };
            for tree in self.tree.trees_mut() {
                let (factory, root) = tree.parts_mut();
                traversal.load_and_unload(factory, root, false);
            }
        }

        self.loader.update();
        self.retire_finished();

        let mut visible = BTreeSet::new();
        for tree in self.tree.trees() {
            collect_visible(tree.root(), &mut visible);
        }

        let update = StreamingUpdate {
            added: visible.difference(&self.visible).copied().collect(),
            removed: self.visible.difference(&visible).copied().collect(),
        };
        self.visible = visible;

        if !update.is_empty() {
            debug!(
                added = update.added.len(),
                removed = update.removed.len(),
                visible = self.visible.len(),
                queued = self.queue.len(),
                "Streaming tiles changed"
            );
        }
        update
    }

    fn retire_finished(&mut self) {
        let stats = &self.stats;
        self.queue.retain(|progress| match progress.state() {
            LoadState::Loading => true,
            LoadState::Loaded => {
                stats.record_loaded();
                false
            }
            _ => {
                stats.record_canceled(1);
                false
            }
        });
    }
}

impl<L, P> Drop for QuadTreeTileLoader<L, P>
where
    L: TileImagesLoader,
{
    fn drop(&mut self) {
        for tree in self.tree.trees_mut() {
            let root = tree.root_mut();
            QuadTree::merge(root);
            root.payload.request_cancel_load();
        }
        if !self.queue.is_empty() {
            debug!(outstanding = self.queue.len(), "Cancelling streaming loads");
            self.stats.record_canceled(self.queue.len() as u64);
        }
    }
}

struct Traversal<'a, L: TileImagesLoader, P> {
    loader: &'a mut ConcurrentAsyncTileLoader<L>,
    predicate: &'a P,
    queue: &'a mut Vec<Arc<TileProgress>>,
    stats: &'a StreamingStats,
}

impl<L, P> Traversal<'_, L, P>
where
    L: TileImagesLoader,
    P: SubdivisionPredicate,
{
    fn load_and_unload(
        &mut self,
        factory: &TileFactory<StreamingTile<L::Images>>,
        tile: &mut StreamingTile<L::Images>,
        parent_is_sufficient: bool,
    ) {
        let sufficient = tile.key.level >= QuadTreeTileKey::MAX_LEVEL
            || !self.predicate.needs_subdivision(&tile.bounds, tile.key);
        let state = tile.payload.state();

        if !parent_is_sufficient {
            if state == TileState::NotLoaded {
                self.load(tile);
            }
        } else if state != TileState::Loaded {
            tile.payload.request_cancel_load();
        }

        if state == TileState::Loaded {
            if !sufficient {
                if !tile.has_children() {
                    factory.subdivide(tile);
                }
            } else if tile.has_children() {
                QuadTree::merge(tile);
            }
        }

        if let Some(children) = tile.children_mut() {
            for child in children.iter_mut() {
                self.load_and_unload(factory, child, sufficient);
            }
        }
    }

    fn load(&mut self, tile: &mut StreamingTile<L::Images>) {
        if self.queue.len() >= MAX_QUEUED_LOADS {
            return;
        }
        let progress = TileProgress::shared();
        tile.payload.progress = Some(Arc::clone(&progress));
        self.loader
            .load(tile.key, tile.payload.result.clone(), Arc::clone(&progress));
        self.queue.push(progress);
        self.stats.record_requested();
        trace!(key = %tile.key, "Requested streaming tile");
    }
}

/// A tile with data is a visible leaf unless all four of its children have
/// data, in which case the search continues into them.
fn collect_visible<I>(tile: &StreamingTile<I>, visible: &mut BTreeSet<QuadTreeTileKey>) {
    if !tile.payload.has_data() {
        return;
    }
    match tile.children() {
        Some(children) if children.iter().all(|child| child.payload.has_data()) => {
            for child in children.iter() {
                collect_visible(child, visible);
            }
        }
        _ => {
            visible.insert(tile.key);
        }
    }
}
