//! Two-rooted quadtree covering the whole globe.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::geom::{Box2, Vector2};

use super::{QuadTree, QuadTreeTile, QuadTreeTileKey, TileFactory};

/// A pair of quadtrees, conventionally the western and eastern hemispheres.
///
/// The trees never overlap, so at most one of them contains a point away
/// from the shared meridian. Queries try the left tree first.
pub struct DiQuadTree<T: QuadTreeTile> {
    pub left: QuadTree<T>,
    pub right: QuadTree<T>,
}

impl<T: QuadTreeTile> DiQuadTree<T> {
    /// Builds a pair of trees sharing one factory.
    pub fn new(
        factory: TileFactory<T>,
        left_key: QuadTreeTileKey,
        left_bounds: Box2<T::Vector>,
        right_key: QuadTreeTileKey,
        right_bounds: Box2<T::Vector>,
    ) -> Self {
        Self {
            left: QuadTree::new(factory.clone(), left_key, left_bounds),
            right: QuadTree::new(factory, right_key, right_bounds),
        }
    }

    /// Builds the globe index in (longitude, latitude) radians.
    ///
    /// The left root is key `(0, 0, 0)` over `[-π, 0] × [-π/2, π/2]` and the
    /// right root is key `(0, 1, 0)` over `[0, π] × [-π/2, π/2]`.
    pub fn globe(factory: TileFactory<T>) -> Self {
        let v = <T::Vector as Vector2>::new;
        Self::new(
            factory,
            QuadTreeTileKey::new(0, 0, 0),
            Box2::new(v(-PI, -FRAC_PI_2), v(0.0, FRAC_PI_2)),
            QuadTreeTileKey::new(0, 1, 0),
            Box2::new(v(0.0, -FRAC_PI_2), v(PI, FRAC_PI_2)),
        )
    }

    pub fn trees(&self) -> [&QuadTree<T>; 2] {
        [&self.left, &self.right]
    }

    pub fn trees_mut(&mut self) -> [&mut QuadTree<T>; 2] {
        [&mut self.left, &mut self.right]
    }

    /// Leaf containing `p` in whichever tree contains it.
    pub fn intersect_leaf(&self, p: T::Vector) -> Option<&T> {
        self.left
            .intersect_leaf(p)
            .or_else(|| self.right.intersect_leaf(p))
    }

    /// Predicate-gated intersection, left tree first.
    pub fn intersect<F>(&self, p: T::Vector, predicate: F) -> Option<&T>
    where
        F: Fn(&T) -> bool,
    {
        self.left
            .intersect(p, &predicate)
            .or_else(|| self.right.intersect(p, &predicate))
    }
}
