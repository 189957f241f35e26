//! Tile data sources.
//!
//! A [`TileSource`] turns a key into an image, or reports that it has no
//! data for it. Sources know nothing about caching or fallback; the loaders
//! in [`crate::loader`] build those on top.
//!
//! # Implementations
//!
//! - [`DirectoryTileSource`]: `{level}/{x}/{y}.{ext}` pyramid on local disk
//! - [`TerrainRgbSource`]: decodes terrain-RGB colour tiles to height maps
//! - [`LevelRangeSource`]: restricts any source to a level range
//! - [`EmptyTileSource`]: never has data

mod directory;
mod level_range;
mod terrain_rgb;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::quadtree::QuadTreeTileKey;
use crate::raster::TileImage;

pub use directory::{DirectoryTileSource, DirectoryTileSourceConfig, ImageKind, YOrigin};
pub use level_range::{LevelRange, LevelRangeSource};
pub use terrain_rgb::{terrain_rgb_elevation, TerrainRgbSource};

/// Poll-style cancellation check handed to [`TileSource::create_image`].
pub type CancelSupplier<'a> = &'a dyn Fn() -> bool;

/// Errors fetching tile data.
///
/// Absence of data is not an error: sources return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Reading the tile failed.
    #[error("failed to read tile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tile was read but could not be decoded.
    #[error("failed to decode tile {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The decoded image has a pixel layout the source cannot interpret.
    #[error("unsupported pixel format {color:?} for tile {key}")]
    UnsupportedFormat {
        key: QuadTreeTileKey,
        color: image::ColorType,
    },
}

/// Supplier of raw per-tile image data.
///
/// Implementations must be callable concurrently from several worker threads
/// for different keys. Height map sources attach an
/// [`ElevationRerange`](crate::raster::ElevationRerange) to every image.
pub trait TileSource: Send + Sync {
    /// Loads the image for `key`.
    ///
    /// Returns `Ok(None)` if the source has no data for the key, or if
    /// `cancel` reported true before the work finished.
    fn create_image(
        &self,
        key: QuadTreeTileKey,
        cancel: CancelSupplier<'_>,
    ) -> Result<Option<Arc<TileImage>>, SourceError>;

    /// Returns true if the source may have data at levels finer than `key`.
    fn has_any_children(&self, key: QuadTreeTileKey) -> bool;

    /// The finest key at or above `key` that the source can provide, or
    /// `None` if it has no data anywhere in the ancestor chain.
    fn highest_available_level(&self, key: QuadTreeTileKey) -> Option<QuadTreeTileKey>;
}

impl<S: TileSource + ?Sized> TileSource for Arc<S> {
    fn create_image(
        &self,
        key: QuadTreeTileKey,
        cancel: CancelSupplier<'_>,
    ) -> Result<Option<Arc<TileImage>>, SourceError> {
        (**self).create_image(key, cancel)
    }

    fn has_any_children(&self, key: QuadTreeTileKey) -> bool {
        (**self).has_any_children(key)
    }

    fn highest_available_level(&self, key: QuadTreeTileKey) -> Option<QuadTreeTileKey> {
        (**self).highest_available_level(key)
    }
}

/// Shared handle to a source.
pub type TileSourcePtr = Arc<dyn TileSource>;

/// Source without any data, for layers that are not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyTileSource;

impl TileSource for EmptyTileSource {
    fn create_image(
        &self,
        _key: QuadTreeTileKey,
        _cancel: CancelSupplier<'_>,
    ) -> Result<Option<Arc<TileImage>>, SourceError> {
        Ok(None)
    }

    fn has_any_children(&self, _key: QuadTreeTileKey) -> bool {
        false
    }

    fn highest_available_level(&self, _key: QuadTreeTileKey) -> Option<QuadTreeTileKey> {
        None
    }
}
