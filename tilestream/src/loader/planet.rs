//! Multi-layer planet tile loading.

use std::sync::Arc;

use glam::DVec2;
use tracing::{debug, warn};

use crate::geom::Box2;
use crate::quadtree::{geo, QuadTreeTileKey};
use crate::raster::{
    default_albedo_image, default_height_image, default_land_mask_image, default_normal_map_image,
    AttributePalette, TileImage,
};
use crate::source::{CancelSupplier, TileSource, TileSourcePtr};

use super::{fetch_from_source, ResolvedTileImage, TileImageCache, TileImagesLoader};

/// Logical image layers, each backed by its own cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanetLayer {
    Elevation,
    LandMask,
    Albedo,
    Attribute,
}

impl PlanetLayer {
    pub const ALL: [PlanetLayer; 4] = [
        PlanetLayer::Elevation,
        PlanetLayer::LandMask,
        PlanetLayer::Albedo,
        PlanetLayer::Attribute,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PlanetLayer::Elevation => "elevation",
            PlanetLayer::LandMask => "land_mask",
            PlanetLayer::Albedo => "albedo",
            PlanetLayer::Attribute => "attribute",
        }
    }
}

/// Level limits and planet geometry for [`PlanetTileImagesLoader`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlanetTileImagesLoaderConfig {
    /// Planet radius in metres, used for normal map slopes.
    pub planet_radius: f64,
    /// Elevation is never loaded finer than this level.
    pub max_elevation_lod: u32,
    /// Attribute data is only loaded for tiles at or finer than this level.
    pub min_attribute_lod: u32,
    /// Attribute data is never loaded finer than this level.
    pub max_attribute_lod: u32,
}

impl Default for PlanetTileImagesLoaderConfig {
    fn default() -> Self {
        Self {
            planet_radius: 6_371_000.0,
            max_elevation_lod: 14,
            min_attribute_lod: 12,
            max_attribute_lod: 16,
        }
    }
}

impl PlanetTileImagesLoaderConfig {
    pub fn with_planet_radius(mut self, radius: f64) -> Self {
        self.planet_radius = radius;
        self
    }

    pub fn with_max_elevation_lod(mut self, lod: u32) -> Self {
        self.max_elevation_lod = lod;
        self
    }

    pub fn with_attribute_lods(mut self, min: u32, max: u32) -> Self {
        self.min_attribute_lod = min;
        self.max_attribute_lod = max;
        self
    }
}

/// An image and the key it was sourced from.
#[derive(Debug, Clone)]
pub struct KeyedImage {
    pub key: QuadTreeTileKey,
    pub image: Arc<TileImage>,
}

impl KeyedImage {
    fn from_resolved(resolved: ResolvedTileImage) -> Option<Self> {
        let key = resolved.key;
        resolved.image.map(|image| Self { key, image })
    }
}

/// Images of one planet tile.
#[derive(Debug, Clone)]
pub struct PlanetTileImages {
    pub height_map: KeyedImage,
    /// Normal map derived from `height_map`.
    pub normal_map: Arc<TileImage>,
    /// Land mask matching `height_map`'s resolved key.
    pub land_mask: Arc<TileImage>,
    pub albedo: KeyedImage,
    /// Present only for tiles within the attribute level range with data.
    pub attribute: Option<KeyedImage>,
    /// False when the default flat-ocean images were substituted.
    pub has_elevation_data: bool,
}

/// Combines elevation, albedo and optional land mask and attribute sources
/// into [`PlanetTileImages`].
///
/// When no elevation exists anywhere in a tile's ancestor chain, shared
/// flat-ocean height, normal and land mask images are substituted. Albedo
/// falls back to a shared black image.
pub struct PlanetTileImagesLoader {
    config: PlanetTileImagesLoaderConfig,
    elevation: TileSourcePtr,
    albedo: TileSourcePtr,
    land_mask: Option<TileSourcePtr>,
    attribute: Option<TileSourcePtr>,
    attribute_palette: Option<AttributePalette>,
    caches: [TileImageCache; 4],
}

impl PlanetTileImagesLoader {
    pub fn new(
        config: PlanetTileImagesLoaderConfig,
        elevation: TileSourcePtr,
        albedo: TileSourcePtr,
    ) -> Self {
        Self {
            config,
            elevation,
            albedo,
            land_mask: None,
            attribute: None,
            attribute_palette: None,
            caches: Default::default(),
        }
    }

    /// Loads land masks from a source instead of deriving them from height.
    pub fn with_land_mask_source(mut self, source: TileSourcePtr) -> Self {
        self.land_mask = Some(source);
        self
    }

    /// Attribute images are passed through as the source returns them
    /// unless a palette is set with
    /// [`with_attribute_palette`](Self::with_attribute_palette).
    pub fn with_attribute_source(mut self, source: TileSourcePtr) -> Self {
        self.attribute = Some(source);
        self
    }

    /// Converts colour-coded attribute tiles to class id maps as they load.
    pub fn with_attribute_palette(mut self, palette: AttributePalette) -> Self {
        self.attribute_palette = Some(palette);
        self
    }

    pub fn config(&self) -> &PlanetTileImagesLoaderConfig {
        &self.config
    }

    pub fn cache(&self, layer: PlanetLayer) -> &TileImageCache {
        &self.caches[layer as usize]
    }

    fn load_layer(
        &self,
        layer: PlanetLayer,
        source: &dyn TileSource,
        key: QuadTreeTileKey,
        cancel: CancelSupplier<'_>,
    ) -> Option<ResolvedTileImage> {
        self.load_layer_with(layer, source, key, cancel, |image| image)
    }

    /// Like `load_layer`, passing each fetched image through `convert`
    /// before it is cached.
    fn load_layer_with<F>(
        &self,
        layer: PlanetLayer,
        source: &dyn TileSource,
        key: QuadTreeTileKey,
        cancel: CancelSupplier<'_>,
        convert: F,
    ) -> Option<ResolvedTileImage>
    where
        F: Fn(Arc<TileImage>) -> Arc<TileImage>,
    {
        let available = source.highest_available_level(key)?;
        Some(self.cache(layer).get_or_create_image(available, 0, |k| {
            fetch_from_source(source, k, cancel, layer.name()).map(&convert)
        }))
    }

    fn derive_normal_map(&self, height: &TileImage, key: QuadTreeTileKey) -> Arc<TileImage> {
        match height.as_height_map() {
            Ok(map) => {
                let bounds: Box2<DVec2> = geo::key_lon_lat_bounds(&key);
                let texel = geo::texel_world_size(
                    &bounds,
                    map.width(),
                    map.height(),
                    self.config.planet_radius,
                );
                Arc::new(map.normal_map(texel))
            }
            Err(e) => {
                warn!(%key, error = %e, "Cannot derive normal map");
                default_normal_map_image()
            }
        }
    }

    fn derive_land_mask(
        &self,
        height: &Arc<TileImage>,
        height_key: QuadTreeTileKey,
        cancel: CancelSupplier<'_>,
    ) -> Arc<TileImage> {
        let default_height = default_height_image();
        let resolved = self
            .cache(PlanetLayer::LandMask)
            .get_or_create_image(height_key, 0, |k| match &self.land_mask {
                Some(source) => fetch_from_source(source.as_ref(), k, cancel, "land_mask"),
                None if Arc::ptr_eq(height, &default_height) => Some(default_land_mask_image()),
                None => match height.as_height_map() {
                    Ok(map) => Some(Arc::new(map.land_mask())),
                    Err(e) => {
                        warn!(key = %k, error = %e, "Cannot derive land mask");
                        None
                    }
                },
            });
        resolved.image.unwrap_or_else(default_land_mask_image)
    }
}

impl TileImagesLoader for PlanetTileImagesLoader {
    type Images = PlanetTileImages;

    fn load(&self, key: QuadTreeTileKey, cancel: CancelSupplier<'_>) -> Option<Arc<PlanetTileImages>> {
        if cancel() {
            return None;
        }

        // Height and normal map
        let elevation_key = key.ancestor(self.config.max_elevation_lod);
        let height = self
            .load_layer(PlanetLayer::Elevation, self.elevation.as_ref(), elevation_key, cancel)
            .and_then(KeyedImage::from_resolved);
        let (height_map, normal_map, has_elevation_data) = match height {
            Some(height) => {
                let normal = self.derive_normal_map(&height.image, height.key);
                (height, normal, true)
            }
            None => (
                KeyedImage {
                    key: elevation_key,
                    image: default_height_image(),
                },
                default_normal_map_image(),
                false,
            ),
        };

        // Land mask, cached under the height map's resolved key
        let land_mask = self.derive_land_mask(&height_map.image, height_map.key, cancel);

        // Albedo
        let albedo = self
            .load_layer(PlanetLayer::Albedo, self.albedo.as_ref(), key, cancel)
            .and_then(KeyedImage::from_resolved)
            .unwrap_or_else(|| KeyedImage {
                key,
                image: default_albedo_image(),
            });

        // Attribute
        let attribute = match &self.attribute {
            Some(source) if key.level >= self.config.min_attribute_lod => self
                .load_layer_with(
                    PlanetLayer::Attribute,
                    source.as_ref(),
                    key.ancestor(self.config.max_attribute_lod),
                    cancel,
                    |image| match &self.attribute_palette {
                        Some(palette) => Arc::new(palette.convert(&image.image)),
                        None => image,
                    },
                )
                .and_then(KeyedImage::from_resolved),
            _ => None,
        };

        debug!(
            %key,
            height_level = height_map.key.level,
            albedo_level = albedo.key.level,
            has_elevation_data,
            "Loaded planet tile images"
        );

        if cancel() {
            return None;
        }

        Some(Arc::new(PlanetTileImages {
            height_map,
            normal_map,
            land_mask,
            albedo,
            attribute,
            has_elevation_data,
        }))
    }
}
