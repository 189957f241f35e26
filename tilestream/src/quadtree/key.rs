//! Quadtree tile addressing.

use std::fmt;
use std::path::PathBuf;

/// Address of a quadtree cell: `(level, x, y)`.
///
/// Level 0 is the coarsest level. Globe trees have two root tiles at level 0
/// (`x` = 0 for the western hemisphere, `x` = 1 for the eastern), so at level
/// `L` valid keys satisfy `x < 2^(L+1)` and `y < 2^L`. Single-root trees use
/// `x, y < 2^L`.
///
/// Levels go up to [`MAX_LEVEL`](Self::MAX_LEVEL), the finest level whose
/// globe columns still fit in a `u32`. Providers and loaders clamp their
/// configured levels to it.
///
/// Keys order by `(level, x, y)`.
///
/// # Example
///
/// ```
/// use tilestream::quadtree::QuadTreeTileKey;
///
/// let key = QuadTreeTileKey::new(5, 17, 9);
/// assert_eq!(key.ancestor(3), QuadTreeTileKey::new(3, 4, 2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct QuadTreeTileKey {
    pub level: u32,
    pub x: u32,
    pub y: u32,
}

impl QuadTreeTileKey {
    /// Finest supported level.
    pub const MAX_LEVEL: u32 = 30;

    pub const fn new(level: u32, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }

    /// Returns the ancestor of this key at `level`.
    ///
    /// The ancestor's coordinates are this key's coordinates right-shifted by
    /// the level difference. Asking for a level at or above this key's own
    /// level returns the key unchanged.
    #[inline]
    pub fn ancestor(&self, level: u32) -> Self {
        if level >= self.level {
            return *self;
        }
        let shift = self.level - level;
        Self {
            level,
            x: self.x >> shift,
            y: self.y >> shift,
        }
    }

    /// The parent key, or `None` for a root key.
    pub fn parent(&self) -> Option<Self> {
        (self.level > 0).then(|| self.ancestor(self.level - 1))
    }

    /// Returns true if `self` is `other` or one of its ancestors.
    pub fn is_ancestor_of(&self, other: &QuadTreeTileKey) -> bool {
        self.level <= other.level && other.ancestor(self.level) == *self
    }

    /// The four child keys at `level + 1`, ordered north-west, north-east,
    /// south-west, south-east.
    pub fn children(&self) -> [QuadTreeTileKey; 4] {
        let level = self.level + 1;
        let x = self.x * 2;
        let y = self.y * 2;
        [
            Self::new(level, x, y),
            Self::new(level, x + 1, y),
            Self::new(level, x, y + 1),
            Self::new(level, x + 1, y + 1),
        ]
    }

    /// Relative path of this tile in an on-disk tile pyramid:
    /// `"{level}/{x}/{y}.{extension}"`.
    pub fn tile_path(&self, extension: &str) -> PathBuf {
        let mut path = PathBuf::from(self.level.to_string());
        path.push(self.x.to_string());
        path.push(format!("{}.{}", self.y, extension));
        path
    }
}

impl fmt::Display for QuadTreeTileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.x, self.y)
    }
}
