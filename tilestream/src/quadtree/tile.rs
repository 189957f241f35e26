//! Tile nodes stored in a quadtree.

use crate::geom::{Box2, Vector2};

use super::QuadTreeTileKey;

/// Owned array of the four children of a subdivided tile.
///
/// Children are ordered north-west, north-east, south-west, south-east.
pub type Children<T> = Box<[T; 4]>;

/// Capability a type needs to be stored in a [`QuadTree`](super::QuadTree).
///
/// A tile owns its children exclusively, so the tree is strictly
/// tree-shaped and a tile is dropped together with its subtree.
pub trait QuadTreeTile: Sized {
    /// Coordinate type of the tile bounds.
    type Vector: Vector2;

    fn key(&self) -> QuadTreeTileKey;

    fn bounds(&self) -> &Box2<Self::Vector>;

    fn children(&self) -> Option<&[Self; 4]>;

    fn children_mut(&mut self) -> Option<&mut [Self; 4]>;

    /// Replaces the children slot, returning the previous children.
    fn replace_children(&mut self, children: Option<Children<Self>>) -> Option<Children<Self>>;

    fn has_children(&self) -> bool {
        self.children().is_some()
    }
}

/// General-purpose tile carrying a payload of type `P`.
///
/// # Example
///
/// ```
/// use glam::DVec2;
/// use tilestream::geom::Box2;
/// use tilestream::quadtree::{QuadTreeTile, QuadTreeTileKey, Tile};
///
/// let tile: Tile<DVec2, u32> = Tile::new(QuadTreeTileKey::default(), Box2::unit(), 7);
/// assert_eq!(tile.payload, 7);
/// assert!(!tile.has_children());
/// ```
#[derive(Debug)]
pub struct Tile<V, P> {
    pub key: QuadTreeTileKey,
    pub bounds: Box2<V>,
    pub payload: P,
    children: Option<Children<Tile<V, P>>>,
}

impl<V: Vector2, P> Tile<V, P> {
    pub fn new(key: QuadTreeTileKey, bounds: Box2<V>, payload: P) -> Self {
        Self {
            key,
            bounds,
            payload,
            children: None,
        }
    }
}

impl<V: Vector2, P: Default> Tile<V, P> {
    /// Tile factory for payloads with a default value.
    pub fn with_default_payload(key: QuadTreeTileKey, bounds: Box2<V>) -> Self {
        Self::new(key, bounds, P::default())
    }
}

impl<V: Vector2, P> QuadTreeTile for Tile<V, P> {
    type Vector = V;

    #[inline]
    fn key(&self) -> QuadTreeTileKey {
        self.key
    }

    #[inline]
    fn bounds(&self) -> &Box2<V> {
        &self.bounds
    }

    #[inline]
    fn children(&self) -> Option<&[Self; 4]> {
        self.children.as_deref()
    }

    #[inline]
    fn children_mut(&mut self) -> Option<&mut [Self; 4]> {
        self.children.as_deref_mut()
    }

    fn replace_children(&mut self, children: Option<Children<Self>>) -> Option<Children<Self>> {
        std::mem::replace(&mut self.children, children)
    }
}

/// Tile with no payload.
pub type DefaultTile<V> = Tile<V, ()>;
