//! Terrain altitude queries over elevation tile sources.
//!
//! Two query modes share one tile cache:
//!
//! ```text
//!   BlockingTilePlanetAltitudeProvider      NonBlockingTilePlanetAltitudeProvider
//!     key at max LOD                           walk levels 0 ──► max LOD
//!       │                                         │ cached: keep best, go finer
//!       │                                         │ cached miss: stop
//!       ├── cached ──► sample                     │ missing: schedule one load, stop
//!       └── walk max LOD ──► 0                    ▼
//!             first image ──► cache ──► sample   sample best (provisional unless max LOD)
//! ```
//!
//! Altitudes are metres above sea level, positive up. Points with no
//! elevation data anywhere in their ancestor chain report `0.0`.

mod blocking;
mod non_blocking;

use thiserror::Error;

use crate::quadtree::QuadTreeTileKey;
use crate::raster::RasterError;

pub use blocking::BlockingTilePlanetAltitudeProvider;
pub use non_blocking::NonBlockingTilePlanetAltitudeProvider;

/// Geographic position in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn from_degrees(lat: f64, lon: f64) -> Self {
        Self::new(lat.to_radians(), lon.to_radians())
    }

    /// Position in tree order, x = longitude and y = latitude.
    pub fn lon_lat(&self) -> glam::DVec2 {
        glam::DVec2::new(self.lon, self.lat)
    }
}

/// An altitude and whether a later query may refine it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeResult {
    pub altitude: f64,
    /// `true` when computed from data coarser than the provider's maximum
    /// LOD, or from no data at all while loads are pending.
    pub provisional: bool,
}

impl AltitudeResult {
    pub fn final_value(altitude: f64) -> Self {
        Self {
            altitude,
            provisional: false,
        }
    }

    pub fn provisional(altitude: f64) -> Self {
        Self {
            altitude,
            provisional: true,
        }
    }
}

/// Errors from altitude queries.
///
/// Missing data is never an error. These indicate a source producing images
/// that cannot be interpreted as elevation.
#[derive(Debug, Error)]
pub enum AltitudeError {
    #[error("elevation tile {key} has no elevation rerange")]
    MissingElevationRerange { key: QuadTreeTileKey },

    #[error("elevation tile {key} is not a height map: {source}")]
    InvalidHeightMap {
        key: QuadTreeTileKey,
        #[source]
        source: RasterError,
    },
}

impl AltitudeError {
    fn from_raster(key: QuadTreeTileKey, error: RasterError) -> Self {
        match error {
            RasterError::MissingElevationRerange => AltitudeError::MissingElevationRerange { key },
            source => AltitudeError::InvalidHeightMap { key, source },
        }
    }
}

/// Source of terrain altitude.
pub trait PlanetAltitudeProvider: Send + Sync {
    fn altitude(&self, position: LatLon) -> Result<AltitudeResult, AltitudeError>;
}

/// Tuning shared by both providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AltitudeProviderConfig {
    /// Finest level queried, at most [`QuadTreeTileKey::MAX_LEVEL`].
    pub max_lod: u32,
    /// Tile cache entries kept before least recently used ones are evicted.
    pub cache_capacity: u64,
}

impl Default for AltitudeProviderConfig {
    fn default() -> Self {
        Self {
            max_lod: 10,
            cache_capacity: 1024,
        }
    }
}

impl AltitudeProviderConfig {
    /// Clamped to [`QuadTreeTileKey::MAX_LEVEL`].
    pub fn with_max_lod(mut self, max_lod: u32) -> Self {
        self.max_lod = max_lod.min(QuadTreeTileKey::MAX_LEVEL);
        self
    }

    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lat_lon_from_degrees() {
        let position = LatLon::from_degrees(90.0, -180.0);
        assert!((position.lat - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((position.lon + std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(position.lon_lat().x, position.lon);
    }

    #[test]
    fn test_missing_rerange_maps_to_dedicated_error() {
        let key = QuadTreeTileKey::new(3, 1, 2);
        let error = AltitudeError::from_raster(key, RasterError::MissingElevationRerange);
        assert!(matches!(error, AltitudeError::MissingElevationRerange { key: k } if k == key));
        assert_eq!(error.to_string(), "elevation tile 3/1/2 has no elevation rerange");
    }

    #[test]
    fn test_default_config() {
        let config = AltitudeProviderConfig::default();
        assert_eq!(config.max_lod, 10);
        assert_eq!(config.cache_capacity, 1024);
        assert_eq!(config.with_max_lod(12).max_lod, 12);
        assert_eq!(config.with_max_lod(40).max_lod, QuadTreeTileKey::MAX_LEVEL);
    }
}
