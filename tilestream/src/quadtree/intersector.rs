//! Single-entry cache in front of tree intersection queries.

use super::{DiQuadTree, QuadTree, QuadTreeTile};

/// Predicate-gated point intersection, implemented by both tree shapes.
pub trait TileIntersect {
    type Tile: QuadTreeTile;

    fn intersect_with(
        &self,
        p: <Self::Tile as QuadTreeTile>::Vector,
        predicate: &dyn Fn(&Self::Tile) -> bool,
    ) -> Option<&Self::Tile>;
}

impl<T: QuadTreeTile> TileIntersect for QuadTree<T> {
    type Tile = T;

    fn intersect_with(&self, p: T::Vector, predicate: &dyn Fn(&T) -> bool) -> Option<&T> {
        self.intersect(p, predicate)
    }
}

impl<T: QuadTreeTile> TileIntersect for DiQuadTree<T> {
    type Tile = T;

    fn intersect_with(&self, p: T::Vector, predicate: &dyn Fn(&T) -> bool) -> Option<&T> {
        self.intersect(p, predicate)
    }
}

/// Remembers the last tile returned and answers from it while queries stay
/// inside its bounds.
///
/// One intersector serves one query stream, typically one per thread or per
/// consumer. Spatially coherent queries (a vehicle sampling terrain under its
/// wheels every frame) then skip the descent almost every time. The tree is
/// borrowed for the intersector's lifetime, so it cannot be restructured
/// underneath a cached hit. [`invalidate`](Self::invalidate) drops the cached
/// tile when the predicate's answer may have changed.
///
/// # Example
///
/// ```
/// use glam::DVec2;
/// use tilestream::quadtree::{CachedLeafIntersector, DefaultTile, DiQuadTree, TileFactory};
///
/// type GlobeTile = DefaultTile<DVec2>;
///
/// let tree = DiQuadTree::globe(TileFactory::new(GlobeTile::with_default_payload));
/// let mut intersector = CachedLeafIntersector::new(&tree, |_: &GlobeTile| true);
///
/// let a = intersector.intersect(DVec2::new(0.5, 0.5)).map(|t| t.key);
/// let b = intersector.intersect(DVec2::new(0.6, 0.4)).map(|t| t.key);
/// assert_eq!(a, b);
/// ```
pub struct CachedLeafIntersector<'t, I, F>
where
    I: TileIntersect,
{
    tree: &'t I,
    predicate: F,
    last: Option<&'t I::Tile>,
}

impl<'t, I, F> CachedLeafIntersector<'t, I, F>
where
    I: TileIntersect,
    F: Fn(&I::Tile) -> bool,
{
    pub fn new(tree: &'t I, predicate: F) -> Self {
        Self {
            tree,
            predicate,
            last: None,
        }
    }

    pub fn intersect(&mut self, p: <I::Tile as QuadTreeTile>::Vector) -> Option<&'t I::Tile> {
        if let Some(tile) = self.last {
            if tile.bounds().intersects_point(p) {
                return Some(tile);
            }
        }
        let tree: &'t I = self.tree;
        let hit = tree.intersect_with(p, &self.predicate);
        self.last = hit;
        hit
    }

    /// Forgets the cached tile.
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    /// Returns true if a tile is currently cached.
    pub fn is_cached(&self) -> bool {
        self.last.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Box2;
    use crate::quadtree::{QuadTreeTileKey, Tile, TileFactory};
    use glam::DVec2;
    use std::cell::Cell;

    type TestTile = Tile<DVec2, ()>;

    fn subdivided_tree() -> QuadTree<TestTile> {
        let mut tree = QuadTree::new(
            TileFactory::new(TestTile::with_default_payload),
            QuadTreeTileKey::default(),
            Box2::unit(),
        );
        let (factory, root) = tree.parts_mut();
        factory.subdivide(root);
        tree
    }

    #[test]
    fn test_repeated_query_in_same_tile_skips_tree() {
        let tree = subdivided_tree();
        let calls = Cell::new(0);
        let mut intersector = CachedLeafIntersector::new(&tree, |t: &TestTile| {
            calls.set(calls.get() + 1);
            !t.has_children()
        });

        let first = intersector.intersect(DVec2::new(0.2, 0.2)).unwrap().key;
        let after_first = calls.get();
        let second = intersector.intersect(DVec2::new(0.3, 0.1)).unwrap().key;

        assert_eq!(first, QuadTreeTileKey::new(1, 0, 1));
        assert_eq!(first, second);
        assert_eq!(calls.get(), after_first);
    }

    #[test]
    fn test_query_outside_cached_tile_descends_again() {
        let tree = subdivided_tree();
        let mut intersector = CachedLeafIntersector::new(&tree, |t: &TestTile| !t.has_children());

        intersector.intersect(DVec2::new(0.2, 0.2));
        let hit = intersector.intersect(DVec2::new(0.8, 0.8)).unwrap();
        assert_eq!(hit.key, QuadTreeTileKey::new(1, 1, 0));
    }

    #[test]
    fn test_miss_clears_cache() {
        let tree = subdivided_tree();
        let mut intersector = CachedLeafIntersector::new(&tree, |t: &TestTile| !t.has_children());

        intersector.intersect(DVec2::new(0.2, 0.2));
        assert!(intersector.is_cached());
        assert!(intersector.intersect(DVec2::new(5.0, 5.0)).is_none());
        assert!(!intersector.is_cached());
    }

    #[test]
    fn test_invalidate_forces_descent() {
        let tree = subdivided_tree();
        let calls = Cell::new(0);
        let mut intersector = CachedLeafIntersector::new(&tree, |t: &TestTile| {
            calls.set(calls.get() + 1);
            !t.has_children()
        });

        intersector.intersect(DVec2::new(0.2, 0.2));
        intersector.invalidate();
        let before = calls.get();
        intersector.intersect(DVec2::new(0.2, 0.2));
        assert!(calls.get() > before);
    }
}
