//! On-disk tile pyramid.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use tracing::trace;

use crate::quadtree::QuadTreeTileKey;
use crate::raster::{ElevationRerange, TileImage};

use super::{CancelSupplier, LevelRange, SourceError, TileSource};

/// Row numbering convention of the files on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YOrigin {
    /// Row 0 is the northern edge, as in XYZ/slippy maps.
    #[default]
    Top,
    /// Row 0 is the southern edge, as in TMS.
    Bottom,
}

/// How decoded files are interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageKind {
    /// Colour imagery returned as decoded.
    Color,
    /// Grayscale height maps converted to 16 bits and tagged with `rerange`.
    Elevation { rerange: ElevationRerange },
}

/// Configuration for a [`DirectoryTileSource`].
#[derive(Debug, Clone)]
pub struct DirectoryTileSourceConfig {
    pub root: PathBuf,
    /// File extension without the dot.
    pub extension: String,
    pub y_origin: YOrigin,
    pub kind: ImageKind,
    pub levels: LevelRange,
}

impl DirectoryTileSourceConfig {
    /// Colour imagery in `root` with `png` files and a top origin.
    pub fn color(root: impl Into<PathBuf>, levels: LevelRange) -> Self {
        Self {
            root: root.into(),
            extension: "png".to_string(),
            y_origin: YOrigin::Top,
            kind: ImageKind::Color,
            levels,
        }
    }

    /// Height maps in `root` with `png` files and a top origin.
    pub fn elevation(root: impl Into<PathBuf>, levels: LevelRange, rerange: ElevationRerange) -> Self {
        Self {
            kind: ImageKind::Elevation { rerange },
            ..Self::color(root, levels)
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_y_origin(mut self, y_origin: YOrigin) -> Self {
        self.y_origin = y_origin;
        self
    }
}

/// Reads tiles from `{root}/{level}/{x}/{y}.{extension}`.
///
/// A missing file is data absence. Files that exist but fail to decode are
/// errors.
#[derive(Debug, Clone)]
pub struct DirectoryTileSource {
    config: DirectoryTileSourceConfig,
}

impl DirectoryTileSource {
    pub fn new(config: DirectoryTileSourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DirectoryTileSourceConfig {
        &self.config
    }

    /// Path of the file holding `key`.
    pub fn tile_path(&self, key: QuadTreeTileKey) -> PathBuf {
        let file_key = match self.config.y_origin {
            YOrigin::Top => key,
            YOrigin::Bottom => {
                let rows = 1u64 << key.level.min(32);
                let flipped = rows - 1 - u64::from(key.y).min(rows - 1);
                QuadTreeTileKey::new(key.level, key.x, flipped as u32)
            }
        };
        self.config.root.join(file_key.tile_path(&self.config.extension))
    }

    fn read(path: &Path) -> Result<Option<DynamicImage>, SourceError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SourceError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        image::load_from_memory(&bytes)
            .map(Some)
            .map_err(|source| SourceError::Decode {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl TileSource for DirectoryTileSource {
    fn create_image(
        &self,
        key: QuadTreeTileKey,
        cancel: CancelSupplier<'_>,
    ) -> Result<Option<Arc<TileImage>>, SourceError> {
        if !self.config.levels.contains(key.level) || cancel() {
            return Ok(None);
        }

        let path = self.tile_path(key);
        let Some(decoded) = Self::read(&path)? else {
            trace!(%key, path = %path.display(), "Tile file not present");
            return Ok(None);
        };

        let image = match self.config.kind {
            ImageKind::Color => TileImage::new(decoded),
            ImageKind::Elevation { rerange } => {
                if decoded.color().has_color() {
                    return Err(SourceError::UnsupportedFormat {
                        key,
                        color: decoded.color(),
                    });
                }
                TileImage::height_map(decoded.into_luma16(), rerange)
            }
        };
        Ok(Some(Arc::new(image)))
    }

    fn has_any_children(&self, key: QuadTreeTileKey) -> bool {
        self.config.levels.has_any_children(key)
    }

    fn highest_available_level(&self, key: QuadTreeTileKey) -> Option<QuadTreeTileKey> {
        self.config.levels.highest_available_level(key)
    }
}
