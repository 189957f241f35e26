//! Synchronous tile image loading with LOD fallback.
//!
//! A [`TileImagesLoader`] resolves a key into the set of images a tile needs.
//! Loaders are called from worker threads and keep a [`TileImageCache`] per
//! logical layer, so concurrent loads of the same key never repeat a walk.

mod cache;
mod planet;
mod single;

use std::sync::Arc;

use tracing::warn;

use crate::quadtree::QuadTreeTileKey;
use crate::raster::TileImage;
use crate::source::{CancelSupplier, TileSource};

pub use cache::{ResolvedTileImage, TileImageCache};
pub use planet::{
    KeyedImage, PlanetLayer, PlanetTileImages, PlanetTileImagesLoader, PlanetTileImagesLoaderConfig,
};
pub use single::TileImageLoader;

/// Loads the images of a tile.
///
/// May be called concurrently from several threads.
pub trait TileImagesLoader: Send + Sync + 'static {
    /// Image set produced per tile.
    type Images: Send + Sync + 'static;

    /// Returns `None` if `cancel` reports true at entry or once the layers
    /// are loaded.
    fn load(&self, key: QuadTreeTileKey, cancel: CancelSupplier<'_>) -> Option<Arc<Self::Images>>;
}

impl<L: TileImagesLoader + ?Sized> TileImagesLoader for Arc<L> {
    type Images = L::Images;

    fn load(&self, key: QuadTreeTileKey, cancel: CancelSupplier<'_>) -> Option<Arc<Self::Images>> {
        (**self).load(key, cancel)
    }
}

/// Fetches one key from a source for an ancestor walk.
///
/// Source errors are logged and count as absence so the walk moves on to
/// the next ancestor.
pub(crate) fn fetch_from_source<S>(
    source: &S,
    key: QuadTreeTileKey,
    cancel: CancelSupplier<'_>,
    layer: &'static str,
) -> Option<Arc<TileImage>>
where
    S: TileSource + ?Sized,
{
    match source.create_image(key, cancel) {
        Ok(image) => image,
        Err(e) => {
            warn!(%key, layer, error = %e, "Tile source failed, treating as absent");
            None
        }
    }
}
