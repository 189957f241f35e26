//! Terrain-RGB elevation decoding.

use std::sync::Arc;

use crate::quadtree::QuadTreeTileKey;
use crate::raster::{ElevationRerange, HeightBuffer, TileImage};

use super::{CancelSupplier, SourceError, TileSource};

/// Elevation in metres encoded by a terrain-RGB texel.
#[inline]
pub fn terrain_rgb_elevation(r: u8, g: u8, b: u8) -> f64 {
    let packed = u32::from(r) * 65536 + u32::from(g) * 256 + u32::from(b);
    -10000.0 + f64::from(packed) * 0.1
}

/// Converts the colour tiles of an inner source from terrain-RGB to 16-bit
/// height maps under [`ElevationRerange::EARTH`].
#[derive(Debug, Clone)]
pub struct TerrainRgbSource<S> {
    inner: S,
}

impl<S: TileSource> TerrainRgbSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: TileSource> TileSource for TerrainRgbSource<S> {
    fn create_image(
        &self,
        key: QuadTreeTileKey,
        cancel: CancelSupplier<'_>,
    ) -> Result<Option<Arc<TileImage>>, SourceError> {
        let Some(encoded) = self.inner.create_image(key, cancel)? else {
            return Ok(None);
        };
        if !encoded.image.color().has_color() {
            return Err(SourceError::UnsupportedFormat {
                key,
                color: encoded.image.color(),
            });
        }

        let rgb = encoded.image.to_rgb8();
        let rerange = ElevationRerange::EARTH;
        let heights = HeightBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
            let [r, g, b] = rgb.get_pixel(x, y).0;
            image::Luma([rerange.color_value_for_elevation(terrain_rgb_elevation(r, g, b))])
        });
        Ok(Some(Arc::new(TileImage::height_map(heights, rerange))))
    }

    fn has_any_children(&self, key: QuadTreeTileKey) -> bool {
        self.inner.has_any_children(key)
    }

    fn highest_available_level(&self, key: QuadTreeTileKey) -> Option<QuadTreeTileKey> {
        self.inner.highest_available_level(key)
    }
}
