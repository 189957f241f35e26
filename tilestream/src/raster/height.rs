//! Height map sampling and derived rasters.

use glam::{DVec2, DVec3};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use super::{ElevationRerange, HeightBuffer, RasterError, TileImage};

/// Borrowed view of a 16-bit height map with its elevation rerange.
#[derive(Debug, Clone, Copy)]
pub struct HeightMap<'a> {
    buffer: &'a HeightBuffer,
    rerange: ElevationRerange,
}

impl<'a> HeightMap<'a> {
    /// Fails if the image is not 16-bit grayscale, has no texels or carries
    /// no rerange.
    pub fn new(image: &'a TileImage) -> Result<Self, RasterError> {
        let rerange = image
            .elevation_rerange
            .ok_or(RasterError::MissingElevationRerange)?;
        let buffer = image
            .image
            .as_luma16()
            .ok_or_else(|| RasterError::NotAHeightMap(image.image.color()))?;
        Self::from_buffer(buffer, rerange)
    }

    pub fn from_buffer(buffer: &'a HeightBuffer, rerange: ElevationRerange) -> Result<Self, RasterError> {
        if buffer.width() == 0 || buffer.height() == 0 {
            return Err(RasterError::EmptyHeightMap {
                width: buffer.width(),
                height: buffer.height(),
            });
        }
        Ok(Self { buffer, rerange })
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn rerange(&self) -> ElevationRerange {
        self.rerange
    }

    /// Elevation in metres of texel `(x, y)`, row 0 being the northern edge.
    #[inline]
    pub fn elevation(&self, x: u32, y: u32) -> f64 {
        self.rerange
            .elevation_for_color_value(f64::from(self.buffer.get_pixel(x, y).0[0]))
    }

    /// Bilinearly interpolated elevation at a normalized tile coordinate.
    ///
    /// `uv.x` runs west (0) to east (1) and `uv.y` runs south (0) to north
    /// (1), matching [`Box2::normalized_coordinate`](crate::geom::Box2::normalized_coordinate)
    /// over longitude/latitude bounds. Edge texel centres sit on the tile
    /// edges and coordinates outside `[0, 1]` are clamped.
    pub fn sample(&self, uv: DVec2) -> f64 {
        let max_x = self.width().saturating_sub(1);
        let max_y = self.height().saturating_sub(1);

        let fx = uv.x.clamp(0.0, 1.0) * f64::from(max_x);
        let fy = (1.0 - uv.y.clamp(0.0, 1.0)) * f64::from(max_y);

        let x0 = fx.floor() as u32;
        let y0 = fy.floor() as u32;
        let x1 = (x0 + 1).min(max_x);
        let y1 = (y0 + 1).min(max_y);
        let tx = fx - f64::from(x0);
        let ty = fy - f64::from(y0);

        let value = |x, y| f64::from(self.buffer.get_pixel(x, y).0[0]);
        let top = lerp(value(x0, y0), value(x1, y0), tx);
        let bottom = lerp(value(x0, y1), value(x1, y1), tx);

        self.rerange.elevation_for_color_value(lerp(top, bottom, ty))
    }

    /// Land mask: 255 where the elevation is above sea level, else 0.
    pub fn land_mask(&self) -> TileImage {
        let mask = GrayImage::from_fn(self.width(), self.height(), |x, y| {
            Luma([if self.elevation(x, y) > 0.0 { 255 } else { 0 }])
        });
        TileImage::new(DynamicImage::ImageLuma8(mask))
    }

    /// Tangent-space normal map from forward differences.
    ///
    /// Normals are in an (east, north, up) frame and encoded per channel as
    /// `(n + 1) / 2`. The last column and row use backward differences.
    /// `texel_world_size` is the east-west and north-south size of a texel in
    /// the same unit as the elevations.
    pub fn normal_map(&self, texel_world_size: DVec2) -> TileImage {
        let (w, h) = (self.width(), self.height());
        let normals = RgbImage::from_fn(w, h, |x, y| {
            let (xa, xb) = if x + 1 < w { (x, x + 1) } else { (x.saturating_sub(1), x) };
            let (ya, yb) = if y + 1 < h { (y, y + 1) } else { (y.saturating_sub(1), y) };

            let dz_east = (self.elevation(xb, y) - self.elevation(xa, y)) / texel_world_size.x;
            // Rows increase southward
            let dz_north = -(self.elevation(x, yb) - self.elevation(x, ya)) / texel_world_size.y;

            encode_normal(DVec3::new(-dz_east, -dz_north, 1.0).normalize())
        });
        TileImage::new(DynamicImage::ImageRgb8(normals))
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn encode_normal(n: DVec3) -> Rgb<u8> {
    let c = |v: f64| (((v + 1.0) * 0.5).clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb([c(n.x), c(n.y), c(n.z)])
}

/// Decodes a normal from an encoded normal map texel.
pub fn decode_normal(texel: Rgb<u8>) -> DVec3 {
    let d = |v: u8| f64::from(v) / 255.0 * 2.0 - 1.0;
    DVec3::new(d(texel.0[0]), d(texel.0[1]), d(texel.0[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_height_image(values: Vec<u16>, w: u32, h: u32, rerange: ElevationRerange) -> TileImage {
        TileImage::height_map(HeightBuffer::from_vec(w, h, values).unwrap(), rerange)
    }

    fn normal_at(image: &TileImage, x: u32, y: u32) -> DVec3 {
        decode_normal(*image.image.as_rgb8().unwrap().get_pixel(x, y))
    }

    fn assert_normal_near(actual: DVec3, expected: DVec3) {
        let expected = expected.normalize();
        assert!(
            (actual - expected).abs().max_element() < 0.01,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn test_new_requires_rerange() {
        let mut image = test_height_image(vec![0; 4], 2, 2, ElevationRerange::IDENTITY);
        image.elevation_rerange = None;
        assert!(matches!(
            HeightMap::new(&image),
            Err(RasterError::MissingElevationRerange)
        ));
    }

    #[test]
    fn test_new_rejects_non_height_images() {
        let mut image = TileImage::new(DynamicImage::ImageRgb8(RgbImage::new(2, 2)));
        image.elevation_rerange = Some(ElevationRerange::EARTH);
        assert!(matches!(
            HeightMap::new(&image),
            Err(RasterError::NotAHeightMap(_))
        ));
    }

    #[test]
    fn test_new_rejects_empty_buffers() {
        for (w, h) in [(0, 0), (4, 0), (0, 3)] {
            let image = test_height_image(Vec::new(), w, h, ElevationRerange::EARTH);
            assert!(matches!(
                HeightMap::new(&image),
                Err(RasterError::EmptyHeightMap { width, height }) if (width, height) == (w, h)
            ));
        }
    }

    #[test]
    fn test_sample_corners_and_center() {
        // Row 0 is north
        let image = test_height_image(vec![10, 20, 30, 40], 2, 2, ElevationRerange::IDENTITY);
        let map = image.as_height_map().unwrap();

        assert_eq!(map.sample(DVec2::new(0.0, 1.0)), 10.0);
        assert_eq!(map.sample(DVec2::new(1.0, 1.0)), 20.0);
        assert_eq!(map.sample(DVec2::new(0.0, 0.0)), 30.0);
        assert_eq!(map.sample(DVec2::new(1.0, 0.0)), 40.0);
        assert_eq!(map.sample(DVec2::new(0.5, 0.5)), 25.0);
    }

    #[test]
    fn test_sample_applies_rerange_and_clamps() {
        let image = test_height_image(vec![100; 4], 2, 2, ElevationRerange::new(2.0, -50.0));
        let map = image.as_height_map().unwrap();
        assert_eq!(map.sample(DVec2::new(-3.0, 7.0)), 150.0);
    }

    #[test]
    fn test_land_mask_marks_positive_elevations() {
        let image = test_height_image(
            vec![32766, 32767, 32768, 40000],
            4,
            1,
            ElevationRerange::EARTH,
        );
        let mask = image.as_height_map().unwrap().land_mask();
        let mask = mask.image.as_luma8().unwrap();
        let values: Vec<u8> = mask.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![0, 0, 255, 255]);
    }

    #[test]
    fn test_normal_map_from_height_map() {
        #[rustfmt::skip]
        let heights = vec![
            1, 2, 3, 4,
            1, 2, 3, 4,
            1, 1, 4, 4,
            4, 4, 4, 4,
        ];
        let image = test_height_image(heights, 4, 4, ElevationRerange::new(2.0, 123.0));
        let normals = image
            .as_height_map()
            .unwrap()
            .normal_map(DVec2::new(3.0, 4.0));

        // Rising eastward tilts the normal west
        assert_normal_near(normal_at(&normals, 0, 0), DVec3::new(-2.0, 0.0, 3.0));
        // Rising southward tilts the normal north
        assert_normal_near(normal_at(&normals, 0, 2), DVec3::new(0.0, 6.0, 4.0));
        // Flat corner uses backward differences
        assert_normal_near(normal_at(&normals, 3, 3), DVec3::new(0.0, 0.0, 1.0));
    }
}
