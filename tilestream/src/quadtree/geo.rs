//! Globe addressing helpers.
//!
//! Globe trees index (longitude, latitude) in radians with two level-0 roots.
//! At level `L` a tile spans `π / 2^L` radians on both axes, `x` counts
//! eastward from the antimeridian and `y` counts southward from the north pole.

use std::f64::consts::{FRAC_PI_2, PI};

use glam::DVec2;

use crate::geom::{Box2, Vector2};

use super::QuadTreeTileKey;

#[inline]
fn tile_span(level: u32) -> f64 {
    PI / 2f64.powi(level.min(QuadTreeTileKey::MAX_LEVEL) as i32)
}

/// Bounds of a globe key with `x` = longitude and `y` = latitude.
pub fn key_lon_lat_bounds<V: Vector2>(key: &QuadTreeTileKey) -> Box2<V> {
    let span = tile_span(key.level);
    let x = f64::from(key.x);
    let y = f64::from(key.y);
    Box2::new(
        V::new(-PI + x * span, FRAC_PI_2 - (y + 1.0) * span),
        V::new(-PI + (x + 1.0) * span, FRAC_PI_2 - y * span),
    )
}

/// Bounds of a globe key with `x` = latitude and `y` = longitude.
pub fn key_lat_lon_bounds<V: Vector2>(key: &QuadTreeTileKey) -> Box2<V> {
    let b: Box2<V> = key_lon_lat_bounds(key);
    Box2::new(
        V::new(b.minimum.y(), b.minimum.x()),
        V::new(b.maximum.y(), b.maximum.x()),
    )
}

/// Key at `level` whose tile contains the point `(longitude, latitude)`.
///
/// Points on the antimeridian edge at +π and the south pole belong to the
/// last column and row, so every point of the globe maps to a valid key.
/// Levels above [`QuadTreeTileKey::MAX_LEVEL`] are clamped to it.
///
/// # Example
///
/// ```
/// use glam::DVec2;
/// use tilestream::quadtree::{geo, QuadTreeTileKey};
///
/// let key = geo::key_at_level_including_lon_lat(DVec2::new(0.1, 0.1), 1);
/// assert_eq!(key, QuadTreeTileKey::new(1, 2, 0));
/// ```
pub fn key_at_level_including_lon_lat<V: Vector2>(lon_lat: V, level: u32) -> QuadTreeTileKey {
    let level = level.min(QuadTreeTileKey::MAX_LEVEL);
    let span = tile_span(level);
    let columns = 2u32 << level;
    let rows = 1u32 << level;

    let x = ((lon_lat.x() + PI) / span).floor().max(0.0) as u32;
    let y = ((FRAC_PI_2 - lon_lat.y()) / span).floor().max(0.0) as u32;

    QuadTreeTileKey::new(level, x.min(columns - 1), y.min(rows - 1))
}

/// Real-world size in metres of one texel of a `width × height` image
/// covering `lon_lat_bounds` on a sphere of `planet_radius`.
///
/// The east-west extent is measured along the tile's central latitude.
pub fn texel_world_size(
    lon_lat_bounds: &Box2<DVec2>,
    width: u32,
    height: u32,
    planet_radius: f64,
) -> DVec2 {
    let size = lon_lat_bounds.size();
    let center_latitude = lon_lat_bounds.center().y;
    DVec2::new(
        size.x * planet_radius * center_latitude.cos() / f64::from(width.max(1)),
        size.y * planet_radius / f64::from(height.max(1)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadtree::{DefaultTile, DiQuadTree, QuadTreeTile, TileFactory};

    const EPS: f64 = 1e-12;

    fn approx(a: DVec2, b: DVec2) -> bool {
        (a - b).abs().max_element() < EPS
    }

    #[test]
    fn test_root_bounds() {
        let west: Box2<DVec2> = key_lon_lat_bounds(&QuadTreeTileKey::new(0, 0, 0));
        assert!(approx(west.minimum, DVec2::new(-PI, -FRAC_PI_2)));
        assert!(approx(west.maximum, DVec2::new(0.0, FRAC_PI_2)));

        let east: Box2<DVec2> = key_lon_lat_bounds(&QuadTreeTileKey::new(0, 1, 0));
        assert!(approx(east.minimum, DVec2::new(0.0, -FRAC_PI_2)));
        assert!(approx(east.maximum, DVec2::new(PI, FRAC_PI_2)));
    }

    #[test]
    fn test_lat_lon_bounds_swap_axes() {
        let key = QuadTreeTileKey::new(3, 5, 2);
        let lon_lat: Box2<DVec2> = key_lon_lat_bounds(&key);
        let lat_lon: Box2<DVec2> = key_lat_lon_bounds(&key);
        assert_eq!(lat_lon.minimum, DVec2::new(lon_lat.minimum.y, lon_lat.minimum.x));
        assert_eq!(lat_lon.maximum, DVec2::new(lon_lat.maximum.y, lon_lat.maximum.x));
    }

    #[test]
    fn test_bounds_match_tree_subdivision() {
        let mut tree = DiQuadTree::globe(TileFactory::new(DefaultTile::<DVec2>::with_default_payload));
        for qt in tree.trees_mut() {
            let (factory, root) = qt.parts_mut();
            factory.subdivide_recursively(root, &|t: &DefaultTile<DVec2>| t.key.level < 3);
        }
        for qt in tree.trees() {
            crate::quadtree::visit(qt.root(), &mut |tile: &DefaultTile<DVec2>| {
                let expected: Box2<DVec2> = key_lon_lat_bounds(&tile.key());
                assert!(approx(tile.bounds.minimum, expected.minimum), "{}", tile.key);
                assert!(approx(tile.bounds.maximum, expected.maximum), "{}", tile.key);
            });
        }
    }

    #[test]
    fn test_key_at_level_edges_are_clamped() {
        let key = key_at_level_including_lon_lat(DVec2::new(PI, -FRAC_PI_2), 4);
        assert_eq!(key, QuadTreeTileKey::new(4, 31, 15));

        let key = key_at_level_including_lon_lat(DVec2::new(-PI, FRAC_PI_2), 4);
        assert_eq!(key, QuadTreeTileKey::new(4, 0, 0));
    }

    #[test]
    fn test_texel_world_size_at_equator() {
        let bounds = Box2::new(DVec2::new(0.0, -0.5), DVec2::new(1.0, 0.5));
        let size = texel_world_size(&bounds, 100, 50, 1000.0);
        assert!((size.x - 10.0).abs() < EPS);
        assert!((size.y - 20.0).abs() < EPS);
    }

    #[test]
    fn test_levels_beyond_max_are_clamped() {
        let max = QuadTreeTileKey::MAX_LEVEL;
        let south_east = key_at_level_including_lon_lat(DVec2::new(PI, -FRAC_PI_2), 40);
        assert_eq!(south_east, QuadTreeTileKey::new(max, (2 << max) - 1, (1 << max) - 1));
        assert_eq!(key_at_level_including_lon_lat(DVec2::new(-PI, FRAC_PI_2), 31).level, max);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_key_bounds_contain_point(
                lon in -PI..PI,
                lat in -FRAC_PI_2..FRAC_PI_2,
                level in 0u32..20,
            ) {
                let p = DVec2::new(lon, lat);
                let key = key_at_level_including_lon_lat(p, level);
                let bounds: Box2<DVec2> = key_lon_lat_bounds(&key);
                let widened = Box2::new(bounds.minimum - DVec2::splat(1e-9), bounds.maximum + DVec2::splat(1e-9));
                prop_assert!(widened.intersects_point(p));
                prop_assert_eq!(key_at_level_including_lon_lat(p, 0), key.ancestor(0));
            }
        }
    }
}
