//! View-dependent streaming of the globe quadtree.
//!
//! [`QuadTreeTileLoader`] keeps a globe [`DiQuadTree`](crate::quadtree::DiQuadTree)
//! refined to whatever a [`SubdivisionPredicate`] asks for, loading tiles
//! through a [`ConcurrentAsyncTileLoader`](crate::async_loader::ConcurrentAsyncTileLoader)
//! and reporting which leaves became visible or hidden on each update.

mod loader;
mod predicate;
mod stats;

pub use loader::{
    QuadTreeTileLoader, StreamingTile, StreamingUpdate, TileSlot, TileState, MAX_QUEUED_LOADS,
};
pub use predicate::{PlanetSubdivisionPredicate, SubdivisionPredicate};
pub use stats::{StreamingStats, StreamingStatsSnapshot};
