//! Raster tile payloads.
//!
//! A [`TileImage`] is an `image` crate buffer plus the elevation metadata
//! height maps carry. Height maps are 16-bit grayscale whose stored values
//! convert to metres through an [`ElevationRerange`]. Rows run north to south
//! and columns west to east.

mod attribute;
mod defaults;
mod height;

use image::{DynamicImage, ImageBuffer, Luma};
use thiserror::Error;

pub use defaults::{
    default_albedo_image, default_height_image, default_land_mask_image, default_normal_map_image,
    DEFAULT_IMAGE_SIZE,
};
pub use attribute::{class, AttributePalette};
pub use height::HeightMap;

/// 16-bit single channel buffer holding height map color values.
pub type HeightBuffer = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Errors interpreting a [`TileImage`] as a height map.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The image has no elevation rerange attached.
    #[error("height map has no elevation rerange")]
    MissingElevationRerange,

    /// The image is not a 16-bit grayscale buffer.
    #[error("expected a 16-bit grayscale height map, got {0:?}")]
    NotAHeightMap(image::ColorType),

    /// The height map has no texels to sample.
    #[error("height map is empty ({width}x{height})")]
    EmptyHeightMap { width: u32, height: u32 },

    /// An attribute palette needs at least one colour.
    #[error("attribute palette has no colours")]
    EmptyPalette,
}

// =============================================================================
// Elevation metadata
// =============================================================================

/// Linear mapping from stored height map values to metres:
/// `elevation = value * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationRerange {
    pub scale: f64,
    pub offset: f64,
}

impl ElevationRerange {
    /// One metre per step, with sea level at value 32767.
    pub const EARTH: Self = Self {
        scale: 1.0,
        offset: -32767.0,
    };

    /// Identity mapping used by the default flat-ocean images.
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        offset: 0.0,
    };

    pub const fn new(scale: f64, offset: f64) -> Self {
        Self { scale, offset }
    }

    #[inline]
    pub fn elevation_for_color_value(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    /// Nearest stored value for `elevation`, clamped to the `u16` range.
    pub fn color_value_for_elevation(&self, elevation: f64) -> u16 {
        ((elevation - self.offset) / self.scale)
            .round()
            .clamp(0.0, f64::from(u16::MAX)) as u16
    }
}

/// Range of elevations present in a height map, in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationBounds {
    pub min: f64,
    pub max: f64,
}

impl ElevationBounds {
    /// Inverted bounds that the first [`expand`](Self::expand) replaces.
    pub fn empty() -> Self {
        Self {
            min: f64::MAX,
            max: f64::MIN,
        }
    }

    pub fn expand(&mut self, elevation: f64) {
        self.min = self.min.min(elevation);
        self.max = self.max.max(elevation);
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

// =============================================================================
// TileImage
// =============================================================================

/// Decoded image for one tile layer.
#[derive(Debug, Clone)]
pub struct TileImage {
    pub image: DynamicImage,
    pub elevation_rerange: Option<ElevationRerange>,
    pub elevation_bounds: Option<ElevationBounds>,
}

impl TileImage {
    /// Wraps an image without elevation metadata.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            elevation_rerange: None,
            elevation_bounds: None,
        }
    }

    /// Builds a height map image and computes its elevation bounds.
    pub fn height_map(buffer: HeightBuffer, rerange: ElevationRerange) -> Self {
        let mut bounds = ElevationBounds::empty();
        for pixel in buffer.pixels() {
            bounds.expand(rerange.elevation_for_color_value(f64::from(pixel.0[0])));
        }
        Self {
            image: DynamicImage::ImageLuma16(buffer),
            elevation_rerange: Some(rerange),
            elevation_bounds: (!bounds.is_empty()).then_some(bounds),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Height map view of this image.
    pub fn as_height_map(&self) -> Result<HeightMap<'_>, RasterError> {
        HeightMap::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_earth_rerange_round_trip() {
        let r = ElevationRerange::EARTH;
        assert_eq!(r.elevation_for_color_value(32767.0), 0.0);
        assert_eq!(r.color_value_for_elevation(0.0), 32767);
        assert_eq!(r.color_value_for_elevation(8848.4), 41615);
    }

    #[test]
    fn test_color_value_is_clamped() {
        let r = ElevationRerange::EARTH;
        assert_eq!(r.color_value_for_elevation(-50_000.0), 0);
        assert_eq!(r.color_value_for_elevation(50_000.0), u16::MAX);
    }

    #[test]
    fn test_height_map_computes_bounds() {
        let buffer = HeightBuffer::from_vec(2, 1, vec![10, 30]).unwrap();
        let image = TileImage::height_map(buffer, ElevationRerange::new(2.0, -5.0));
        let bounds = image.elevation_bounds.unwrap();
        assert_eq!(bounds.min, 15.0);
        assert_eq!(bounds.max, 55.0);
        assert_eq!(image.elevation_rerange, Some(ElevationRerange::new(2.0, -5.0)));
    }

    #[test]
    fn test_empty_bounds() {
        let mut bounds = ElevationBounds::empty();
        assert!(bounds.is_empty());
        bounds.expand(3.0);
        assert!(!bounds.is_empty());
        assert_eq!(bounds.min, 3.0);
        assert_eq!(bounds.max, 3.0);
    }
}
