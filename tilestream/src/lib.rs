//! Tilestream - quadtree tile streaming and caching for planet-scale rasters
//!
//! The globe is split into two root tiles (western and eastern hemispheres),
//! each refined as a quadtree keyed by [`QuadTreeTileKey`](quadtree::QuadTreeTileKey).
//! Tile images come from [`TileSource`](source::TileSource)s and are cached
//! per layer so each key is loaded at most once, falling back to the finest
//! available ancestor when a level has no data.
//!
//! ```text
//!   TileSource ──► TileImageCache ──► TileImagesLoader ──► ConcurrentAsyncTileLoader
//!                  (LOD fallback)     (per-layer bundle)    (Scheduler workers)
//!                        │                                        │
//!                        ▼                                        ▼
//!              altitude providers                         QuadTreeTileLoader
//!              (blocking / non-blocking)                  (view-dependent streaming)
//! ```

pub mod altitude;
pub mod async_loader;
pub mod config;
pub mod geom;
pub mod loader;
pub mod logging;
pub mod quadtree;
pub mod raster;
pub mod scheduler;
pub mod source;
pub mod streaming;
