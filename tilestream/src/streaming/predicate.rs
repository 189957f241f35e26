//! Decides whether a tile is detailed enough for the current view.

use std::f64::consts::TAU;

use glam::{DVec2, DVec3};

use crate::geom::Box2;
use crate::quadtree::QuadTreeTileKey;

/// Returns `true` when a tile is of insufficient resolution and its
/// children should be loaded.
///
/// Bounds are (longitude, latitude) in radians.
pub trait SubdivisionPredicate: Send + Sync {
    fn needs_subdivision(&self, bounds: &Box2<DVec2>, key: QuadTreeTileKey) -> bool;
}

impl<F> SubdivisionPredicate for F
where
    F: Fn(&Box2<DVec2>, QuadTreeTileKey) -> bool + Send + Sync,
{
    fn needs_subdivision(&self, bounds: &Box2<DVec2>, key: QuadTreeTileKey) -> bool {
        self(bounds, key)
    }
}

/// Screen-space style refinement around an observer above a spherical
/// planet.
///
/// A tile is subdivided while it faces the observer and its size divided by
/// its distance to the observer exceeds a threshold that shrinks from 0.4
/// at grazing angles to 0.1 straight below.
#[derive(Debug, Clone)]
pub struct PlanetSubdivisionPredicate {
    pub planet_radius: f64,
    /// Observer position, x = longitude and y = latitude in radians.
    pub observer: DVec2,
    pub observer_altitude: f64,
    pub max_level: u32,
}

impl PlanetSubdivisionPredicate {
    pub fn new(planet_radius: f64, max_level: u32) -> Self {
        Self {
            planet_radius,
            observer: DVec2::ZERO,
            observer_altitude: 0.0,
            max_level: max_level.min(QuadTreeTileKey::MAX_LEVEL),
        }
    }

    pub fn set_observer(&mut self, lon_lat: DVec2, altitude: f64) {
        self.observer = lon_lat;
        self.observer_altitude = altitude;
    }

    /// Nearest point of `bounds` to the observer, taking the shorter way
    /// around the antimeridian.
    fn nearest_point(&self, bounds: &Box2<DVec2>) -> DVec2 {
        let center_lon = bounds.center().x;
        let mut lon = self.observer.x;
        for candidate in [self.observer.x - TAU, self.observer.x + TAU] {
            if (candidate - center_lon).abs() < (lon - center_lon).abs() {
                lon = candidate;
            }
        }
        DVec2::new(
            lon.clamp(bounds.minimum.x, bounds.maximum.x),
            self.observer
                .y
                .clamp(bounds.minimum.y, bounds.maximum.y),
        )
    }
}

fn geocentric(lon_lat: DVec2, altitude: f64, radius: f64) -> DVec3 {
    let r = radius + altitude;
    let (sin_lat, cos_lat) = lon_lat.y.sin_cos();
    let (sin_lon, cos_lon) = lon_lat.x.sin_cos();
    DVec3::new(r * cos_lat * cos_lon, r * cos_lat * sin_lon, r * sin_lat)
}

impl SubdivisionPredicate for PlanetSubdivisionPredicate {
    fn needs_subdivision(&self, bounds: &Box2<DVec2>, key: QuadTreeTileKey) -> bool {
        if key.level >= self.max_level {
            return false;
        }

        let tile_p = geocentric(self.nearest_point(bounds), 0.0, self.planet_radius);
        let observer_p = geocentric(
            self.observer,
            self.observer_altitude.max(1.0),
            self.planet_radius,
        );

        let offset = observer_p - tile_p;
        let distance = offset.length();
        let cos_elevation = offset.normalize_or_zero().dot(tile_p.normalize_or_zero());
        if cos_elevation <= 0.0 {
            return false;
        }

        let tile_size = self.planet_radius / 2f64.powi(key.level.min(QuadTreeTileKey::MAX_LEVEL) as i32);
        let projected_size = tile_size / distance.max(0.01);
        let threshold = 0.4 + (0.1 - 0.4) * cos_elevation;
        projected_size > threshold
    }
}
