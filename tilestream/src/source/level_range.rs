//! Level-range restriction of a source.

use std::sync::Arc;

use crate::quadtree::QuadTreeTileKey;
use crate::raster::TileImage;

use super::{CancelSupplier, SourceError, TileSource};

/// Inclusive range of levels at which a source has data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRange {
    pub min_level: u32,
    pub max_level: u32,
}

impl LevelRange {
    pub const fn new(min_level: u32, max_level: u32) -> Self {
        Self {
            min_level,
            max_level,
        }
    }

    pub fn contains(&self, level: u32) -> bool {
        (self.min_level..=self.max_level).contains(&level)
    }

    /// True while finer levels are still within the range.
    pub fn has_any_children(&self, key: QuadTreeTileKey) -> bool {
        key.level < self.max_level
    }

    /// Ancestor of `key` clamped to the finest level in range, or `None` if
    /// the key is coarser than the range.
    pub fn highest_available_level(&self, key: QuadTreeTileKey) -> Option<QuadTreeTileKey> {
        if key.level < self.min_level {
            return None;
        }
        Some(key.ancestor(key.level.min(self.max_level)))
    }
}

/// Wraps a source so it only answers within a [`LevelRange`].
///
/// Requests outside the range return `Ok(None)` without reaching the inner
/// source.
#[derive(Debug, Clone)]
pub struct LevelRangeSource<S> {
    inner: S,
    range: LevelRange,
}

impl<S: TileSource> LevelRangeSource<S> {
    pub fn new(inner: S, range: LevelRange) -> Self {
        Self { inner, range }
    }

    pub fn range(&self) -> LevelRange {
        self.range
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: TileSource> TileSource for LevelRangeSource<S> {
    fn create_image(
        &self,
        key: QuadTreeTileKey,
        cancel: CancelSupplier<'_>,
    ) -> Result<Option<Arc<TileImage>>, SourceError> {
        if !self.range.contains(key.level) {
            return Ok(None);
        }
        self.inner.create_image(key, cancel)
    }

    fn has_any_children(&self, key: QuadTreeTileKey) -> bool {
        self.range.has_any_children(key)
    }

    fn highest_available_level(&self, key: QuadTreeTileKey) -> Option<QuadTreeTileKey> {
        self.range.highest_available_level(key)
    }
}
