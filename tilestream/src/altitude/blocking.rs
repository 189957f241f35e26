//! Altitude queries that load missing tiles on the calling thread.

use glam::DVec2;
use moka::sync::Cache;
use tracing::{debug, trace};

use crate::geom::Box2;
use crate::loader::{fetch_from_source, ResolvedTileImage};
use crate::quadtree::geo::{key_at_level_including_lon_lat, key_lon_lat_bounds};
use crate::quadtree::QuadTreeTileKey;
use crate::raster::HeightMap;
use crate::source::TileSourcePtr;

use super::{AltitudeError, AltitudeProviderConfig, AltitudeResult, LatLon, PlanetAltitudeProvider};

/// Blocks on the first query of a tile, then answers from the cache.
///
/// Results are never provisional. A point with no elevation data in its
/// whole ancestor chain reports `0.0`.
///
/// Cache entries are keyed by the requested key, and the image they hold
/// may belong to a coarser ancestor when finer data does not exist. A
/// resolved ancestor is also cached under its own key so nearby queries at
/// other max-LOD keys reuse it.
pub struct BlockingTilePlanetAltitudeProvider {
    source: TileSourcePtr,
    config: AltitudeProviderConfig,
    cache: Cache<QuadTreeTileKey, ResolvedTileImage>,
}

impl BlockingTilePlanetAltitudeProvider {
    pub fn new(source: TileSourcePtr, config: AltitudeProviderConfig) -> Self {
        Self {
            source,
            config,
            cache: Cache::new(config.cache_capacity),
        }
    }

    pub fn config(&self) -> &AltitudeProviderConfig {
        &self.config
    }

    pub fn source(&self) -> &TileSourcePtr {
        &self.source
    }

    /// Key at the configured maximum LOD containing `position`.
    pub fn max_lod_key(&self, position: LatLon) -> QuadTreeTileKey {
        let level = self.config.max_lod.min(QuadTreeTileKey::MAX_LEVEL);
        key_at_level_including_lon_lat(position.lon_lat(), level)
    }

    /// Cached resolution of `key`, without loading.
    pub fn cached(&self, key: QuadTreeTileKey) -> Option<ResolvedTileImage> {
        self.cache.get(&key)
    }

    pub fn cached_entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    /// Resolves `key` to the finest image at or above it, loading on a miss.
    ///
    /// Concurrent callers for the same key wait for a single walk.
    pub fn resolve(&self, key: QuadTreeTileKey) -> ResolvedTileImage {
        let resolved = self.cache.get_with(key, || self.walk(key));
        if resolved.is_found() && resolved.key != key && !self.cache.contains_key(&resolved.key) {
            self.cache.insert(resolved.key, resolved.clone());
        }
        resolved
    }

    fn walk(&self, key: QuadTreeTileKey) -> ResolvedTileImage {
        let never_cancel = || false;
        for level in (0..=key.level).rev() {
            let candidate = key.ancestor(level);
            if let Some(image) =
                fetch_from_source(self.source.as_ref(), candidate, &never_cancel, "altitude")
            {
                debug!(requested = %key, resolved = %candidate, "Loaded elevation tile");
                return ResolvedTileImage {
                    key: candidate,
                    image: Some(image),
                };
            }
        }
        trace!(requested = %key, "No elevation data in ancestor chain");
        ResolvedTileImage { key, image: None }
    }
}

/// Bilinear altitude at `position` within a resolved tile, `0.0` without
/// data.
pub(super) fn sample_resolved(
    resolved: &ResolvedTileImage,
    position: LatLon,
) -> Result<f64, AltitudeError> {
    let Some(image) = &resolved.image else {
        return Ok(0.0);
    };
    let height_map =
        HeightMap::new(image).map_err(|error| AltitudeError::from_raster(resolved.key, error))?;
    let bounds: Box2<DVec2> = key_lon_lat_bounds(&resolved.key);
    Ok(height_map.sample(bounds.normalized_coordinate(position.lon_lat())))
}

impl PlanetAltitudeProvider for BlockingTilePlanetAltitudeProvider {
    fn altitude(&self, position: LatLon) -> Result<AltitudeResult, AltitudeError> {
        let resolved = self.resolve(self.max_lod_key(position));
        sample_resolved(&resolved, position).map(AltitudeResult::final_value)
    }
}
