//! Shared fallback images substituted when no data exists anywhere in a
//! tile's ancestor chain.

use std::sync::{Arc, OnceLock};

use image::{DynamicImage, Rgb, RgbImage};

use super::{ElevationRerange, HeightBuffer, TileImage};

/// Width and height of every default image.
pub const DEFAULT_IMAGE_SIZE: u32 = 256;

/// `(0, 0, 1)` encoded as `(n + 1) / 2`.
const FLAT_NORMAL: Rgb<u8> = Rgb([128, 128, 255]);

/// Flat sea-level height map under [`ElevationRerange::IDENTITY`].
pub fn default_height_image() -> Arc<TileImage> {
    static IMAGE: OnceLock<Arc<TileImage>> = OnceLock::new();
    IMAGE
        .get_or_init(|| {
            Arc::new(TileImage::height_map(
                HeightBuffer::new(DEFAULT_IMAGE_SIZE, DEFAULT_IMAGE_SIZE),
                ElevationRerange::IDENTITY,
            ))
        })
        .clone()
}

/// Upward-facing normal map matching [`default_height_image`].
pub fn default_normal_map_image() -> Arc<TileImage> {
    static IMAGE: OnceLock<Arc<TileImage>> = OnceLock::new();
    IMAGE
        .get_or_init(|| {
            Arc::new(TileImage::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                DEFAULT_IMAGE_SIZE,
                DEFAULT_IMAGE_SIZE,
                FLAT_NORMAL,
            ))))
        })
        .clone()
}

/// All-ocean land mask matching [`default_height_image`].
pub fn default_land_mask_image() -> Arc<TileImage> {
    static IMAGE: OnceLock<Arc<TileImage>> = OnceLock::new();
    IMAGE
        .get_or_init(|| {
            Arc::new(TileImage::new(DynamicImage::ImageLuma8(image::GrayImage::new(
                DEFAULT_IMAGE_SIZE,
                DEFAULT_IMAGE_SIZE,
            ))))
        })
        .clone()
}

/// Black albedo.
pub fn default_albedo_image() -> Arc<TileImage> {
    static IMAGE: OnceLock<Arc<TileImage>> = OnceLock::new();
    IMAGE
        .get_or_init(|| {
            Arc::new(TileImage::new(DynamicImage::ImageRgb8(RgbImage::new(
                DEFAULT_IMAGE_SIZE,
                DEFAULT_IMAGE_SIZE,
            ))))
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    #[test]
    fn test_defaults_are_shared() {
        assert!(Arc::ptr_eq(&default_height_image(), &default_height_image()));
        assert!(Arc::ptr_eq(&default_albedo_image(), &default_albedo_image()));
    }

    #[test]
    fn test_default_height_is_sea_level() {
        let image = default_height_image();
        let map = image.as_height_map().unwrap();
        assert_eq!(map.sample(DVec2::new(0.3, 0.7)), 0.0);
        assert_eq!(map.width(), DEFAULT_IMAGE_SIZE);
    }

    #[test]
    fn test_default_normal_matches_derived_flat_normal() {
        let derived = default_height_image()
            .as_height_map()
            .unwrap()
            .normal_map(DVec2::ONE);
        let image = default_normal_map_image();
        assert_eq!(
            image.image.as_rgb8().unwrap().get_pixel(10, 10),
            derived.image.as_rgb8().unwrap().get_pixel(10, 10)
        );
    }

    #[test]
    fn test_default_land_mask_is_ocean() {
        let image = default_land_mask_image();
        assert!(image.image.as_luma8().unwrap().pixels().all(|p| p.0[0] == 0));
    }
}
