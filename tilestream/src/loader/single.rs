//! Loader for a single image layer.

use std::sync::Arc;

use crate::quadtree::QuadTreeTileKey;
use crate::source::{CancelSupplier, TileSource, TileSourcePtr};

use super::{fetch_from_source, ResolvedTileImage, TileImageCache, TileImagesLoader};

/// Resolves keys against one source with LOD fallback.
///
/// Suits datasets that need one image per tile, such as feature overlays or
/// a prefetch pass over a single layer.
pub struct TileImageLoader {
    source: TileSourcePtr,
    cache: TileImageCache,
    min_level: u32,
    max_level: Option<u32>,
}

impl TileImageLoader {
    pub fn new(source: TileSourcePtr) -> Self {
        Self {
            source,
            cache: TileImageCache::new(),
            min_level: 0,
            max_level: None,
        }
    }

    /// Coarsest level the fallback walk may reach.
    pub fn with_min_level(mut self, min_level: u32) -> Self {
        self.min_level = min_level;
        self
    }

    /// Requests finer than `max_level` resolve at their ancestor at
    /// `max_level`.
    pub fn with_max_level(mut self, max_level: u32) -> Self {
        self.max_level = Some(max_level);
        self
    }

    pub fn cache(&self) -> &TileImageCache {
        &self.cache
    }

    pub fn source(&self) -> &TileSourcePtr {
        &self.source
    }
}

impl TileImagesLoader for TileImageLoader {
    type Images = ResolvedTileImage;

    fn load(&self, key: QuadTreeTileKey, cancel: CancelSupplier<'_>) -> Option<Arc<ResolvedTileImage>> {
        if cancel() {
            return None;
        }

        let capped = match self.max_level {
            Some(max) => key.ancestor(max),
            None => key,
        };
        let resolved = match self.source.highest_available_level(capped) {
            Some(available) => self.cache.get_or_create_image(available, self.min_level, |k| {
                fetch_from_source(self.source.as_ref(), k, cancel, "image")
            }),
            None => ResolvedTileImage {
                key: capped,
                image: None,
            },
        };

        if cancel() {
            return None;
        }
        Some(Arc::new(resolved))
    }
}
