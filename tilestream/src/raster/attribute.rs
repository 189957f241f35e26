//! Land-cover attribute maps.
//!
//! Attribute sources deliver colour-coded land-cover imagery. An
//! [`AttributePalette`] maps each colour to a class id and turns such tiles
//! into 8-bit grayscale id maps, one class per texel.

use std::collections::HashMap;

use glam::Vec3;
use image::{DynamicImage, GrayImage, Luma};

use super::{RasterError, TileImage};

/// Class ids of the [NLCD](AttributePalette::nlcd) palette.
pub mod class {
    /// Water, barren land and lightly developed land.
    pub const NONE: u8 = 0;
    pub const DEVELOPED_MEDIUM: u8 = 3;
    pub const DEVELOPED_HIGH: u8 = 4;
    pub const SCRUB: u8 = 5;
    /// Grassland, moss and wetlands.
    pub const GRASS: u8 = 6;
    pub const PASTURE: u8 = 7;
    pub const CROPS: u8 = 8;
    pub const FOREST: u8 = 9;
    pub const SNOW: u8 = 10;
}

/// Reference colours, each tagged with a class id.
///
/// Several colours may share one id.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePalette {
    entries: Vec<(u8, Vec3)>,
}

impl AttributePalette {
    /// Palette from `(class, rgb)` pairs with channels in `0.0..=1.0`.
    pub fn new(entries: Vec<(u8, Vec3)>) -> Result<Self, RasterError> {
        if entries.is_empty() {
            return Err(RasterError::EmptyPalette);
        }
        Ok(Self { entries })
    }

    /// The 2016 National Land Cover Database legend.
    pub fn nlcd() -> Self {
        use class::*;
        let rgb = |r: u8, g: u8, b: u8| Vec3::new(r.into(), g.into(), b.into()) / 255.0;
        Self {
            entries: vec![
                (NONE, rgb(71, 107, 160)), // open water
                (NONE, rgb(178, 173, 163)), // barren
                (NONE, rgb(221, 201, 201)), // developed, open space
                (NONE, rgb(216, 147, 130)), // developed, low
                (DEVELOPED_MEDIUM, rgb(237, 0, 0)),
                (DEVELOPED_HIGH, rgb(170, 0, 0)),
                (SCRUB, rgb(165, 140, 48)), // dwarf scrub
                (SCRUB, rgb(204, 186, 124)), // shrub
                (GRASS, rgb(226, 226, 193)), // grassland
                (GRASS, rgb(201, 201, 119)), // sedge
                (GRASS, rgb(153, 193, 71)), // lichens
                (GRASS, rgb(119, 173, 147)), // moss
                (GRASS, rgb(186, 216, 234)), // woody wetlands
                (GRASS, rgb(112, 163, 186)), // herbaceous wetlands
                (PASTURE, rgb(219, 216, 61)),
                (CROPS, rgb(170, 112, 40)),
                (FOREST, rgb(104, 170, 99)), // deciduous
                (FOREST, rgb(28, 99, 48)), // evergreen
                (FOREST, rgb(181, 201, 142)), // mixed
                (SNOW, rgb(209, 221, 249)),
            ],
        }
    }

    /// Class of the entry nearest to `color`. Ties go to the earlier entry.
    pub fn classify(&self, color: Vec3) -> u8 {
        let mut best = (f32::INFINITY, self.entries[0].0);
        for &(class, reference) in &self.entries {
            let distance = reference.distance_squared(color);
            if distance < best.0 {
                best = (distance, class);
            }
        }
        best.1
    }

    /// Converts a colour tile to an id map of the same size.
    pub fn convert(&self, image: &DynamicImage) -> TileImage {
        let rgb = image.to_rgb8();
        // Land-cover tiles use few distinct colours
        let mut seen: HashMap<[u8; 3], u8> = HashMap::new();
        let ids = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            let pixel = rgb.get_pixel(x, y).0;
            let class = *seen.entry(pixel).or_insert_with(|| {
                let [r, g, b] = pixel;
                self.classify(Vec3::new(r.into(), g.into(), b.into()) / 255.0)
            });
            Luma([class])
        });
        TileImage::new(DynamicImage::ImageLuma8(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_empty_palette_is_rejected() {
        assert!(matches!(AttributePalette::new(Vec::new()), Err(RasterError::EmptyPalette)));
    }

    #[test]
    fn test_classify_picks_nearest_colour() {
        let palette = AttributePalette::nlcd();
        let evergreen = Vec3::new(28.0, 99.0, 48.0) / 255.0;
        assert_eq!(palette.classify(evergreen), class::FOREST);
        // Slightly off the reference still lands on it
        assert_eq!(palette.classify(evergreen + Vec3::splat(0.02)), class::FOREST);
        assert_eq!(palette.classify(Vec3::new(0.28, 0.42, 0.63)), class::NONE);
        assert_eq!(palette.classify(Vec3::ONE), class::SNOW);
    }

    #[test]
    fn test_convert_maps_every_texel() {
        let mut tile = RgbImage::from_pixel(3, 2, Rgb([71, 107, 160]));
        tile.put_pixel(2, 1, Rgb([170, 112, 40]));
        tile.put_pixel(0, 1, Rgb([219, 216, 61]));

        let converted = AttributePalette::nlcd().convert(&DynamicImage::ImageRgb8(tile));
        let ids = converted.image.as_luma8().unwrap();
        assert_eq!(ids.dimensions(), (3, 2));
        assert_eq!(ids.get_pixel(0, 0).0[0], class::NONE);
        assert_eq!(ids.get_pixel(2, 1).0[0], class::CROPS);
        assert_eq!(ids.get_pixel(0, 1).0[0], class::PASTURE);
    }
}
