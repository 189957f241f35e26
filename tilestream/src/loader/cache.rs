//! De-duplicating LOD fallback cache.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::quadtree::QuadTreeTileKey;
use crate::raster::TileImage;

/// Outcome of resolving a requested key against a source.
///
/// `key` is the key the image was actually sourced from, which may be an
/// ancestor of the requested key. When nothing was found, `key` is the
/// requested key and `image` is `None`.
#[derive(Debug, Clone)]
pub struct ResolvedTileImage {
    pub key: QuadTreeTileKey,
    pub image: Option<Arc<TileImage>>,
}

impl ResolvedTileImage {
    pub fn is_found(&self) -> bool {
        self.image.is_some()
    }
}

#[derive(Debug, Default)]
struct CacheEntry {
    resolved: OnceLock<ResolvedTileImage>,
}

/// Cache of one image layer, keyed by requested key.
///
/// Two levels of synchronization:
///
/// - the map's shard lock is held only while looking up or inserting the
///   entry for a requested key
/// - each entry's `OnceLock` serializes the ancestor walk for that key, so
///   concurrent requests for the same key wait for the first walk instead of
///   repeating it, and requests for other keys never wait on it
///
/// An entry keyed by `K` may hold an image sourced from an ancestor of `K`.
/// Repeated lookups of `K` return that result without walking again.
#[derive(Debug, Default)]
pub struct TileImageCache {
    entries: DashMap<QuadTreeTileKey, Arc<CacheEntry>>,
}

impl TileImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the image for `requested`, resolving it on first request.
    ///
    /// Resolution calls `factory` at `requested` and then at each ancestor
    /// down to `min_level`, stopping at the first key that yields an image.
    /// The walk is not cancellable once started: a reserved entry always
    /// ends up holding a result.
    pub fn get_or_create_image<F>(
        &self,
        requested: QuadTreeTileKey,
        min_level: u32,
        mut factory: F,
    ) -> ResolvedTileImage
    where
        F: FnMut(QuadTreeTileKey) -> Option<Arc<TileImage>>,
    {
        // The shard guard is released at the end of this statement
        let entry = Arc::clone(&self.entries.entry(requested).or_default());

        if let Some(resolved) = entry.resolved.get() {
            trace!(%requested, resolved = %resolved.key, "Tile image cache hit");
            return resolved.clone();
        }

        entry
            .resolved
            .get_or_init(|| {
                for level in (min_level..=requested.level).rev() {
                    let key = requested.ancestor(level);
                    if let Some(image) = factory(key) {
                        debug!(
                            %requested,
                            resolved_level = key.level,
                            "Resolved tile image"
                        );
                        return ResolvedTileImage {
                            key,
                            image: Some(image),
                        };
                    }
                }
                debug!(%requested, min_level, "No tile image in ancestor chain");
                ResolvedTileImage {
                    key: requested,
                    image: None,
                }
            })
            .clone()
    }

    /// Cached result for `requested`, if its walk has completed.
    pub fn get(&self, requested: QuadTreeTileKey) -> Option<ResolvedTileImage> {
        self.entries
            .get(&requested)
            .and_then(|entry| entry.resolved.get().cloned())
    }

    pub fn contains(&self, requested: QuadTreeTileKey) -> bool {
        self.entries.contains_key(&requested)
    }

    /// Number of requested keys with an entry, including walks in progress.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries. Walks in progress complete into their detached
    /// entries and are not retained.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
