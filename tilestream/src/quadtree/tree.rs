//! Generic owning quadtree.

use std::fmt;
use std::sync::Arc;

use crate::geom::{Box2, Vector2};

use super::{QuadTreeTile, QuadTreeTileKey};

/// Creates a tile for a key and its bounds.
///
/// Shared by both trees of a [`DiQuadTree`](super::DiQuadTree), so it is
/// reference counted and must be `Send + Sync`.
pub struct TileFactory<T: QuadTreeTile> {
    create: Arc<dyn Fn(QuadTreeTileKey, Box2<T::Vector>) -> T + Send + Sync>,
}

impl<T: QuadTreeTile> Clone for TileFactory<T> {
    fn clone(&self) -> Self {
        Self {
            create: Arc::clone(&self.create),
        }
    }
}

impl<T: QuadTreeTile> fmt::Debug for TileFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileFactory").finish_non_exhaustive()
    }
}

impl<T: QuadTreeTile> TileFactory<T> {
    pub fn new<F>(create: F) -> Self
    where
        F: Fn(QuadTreeTileKey, Box2<T::Vector>) -> T + Send + Sync + 'static,
    {
        Self {
            create: Arc::new(create),
        }
    }

    /// Invokes the factory for a single tile.
    pub fn create(&self, key: QuadTreeTileKey, bounds: Box2<T::Vector>) -> T {
        (self.create)(key, bounds)
    }

    /// Creates the four children of `tile` by splitting its bounds at the
    /// midpoint.
    ///
    /// # Panics
    ///
    /// Panics if the tile is already subdivided. Callers check
    /// [`has_children`](QuadTreeTile::has_children) first.
    pub fn subdivide(&self, tile: &mut T) {
        assert!(
            !tile.has_children(),
            "tile {} is already subdivided",
            tile.key()
        );

        let bounds = *tile.bounds();
        let min = bounds.minimum;
        let max = bounds.maximum;
        let c = bounds.center();
        let [nw, ne, sw, se] = tile.key().children();

        let v = <T::Vector as Vector2>::new;
        let children = Box::new([
            self.create(nw, Box2::new(v(min.x(), c.y()), v(c.x(), max.y()))),
            self.create(ne, Box2::new(c, max)),
            self.create(sw, Box2::new(min, c)),
            self.create(se, Box2::new(v(c.x(), min.y()), v(max.x(), c.y()))),
        ]);
        tile.replace_children(Some(children));
    }

    /// Subdivides top-down while `subdivision_required` holds, starting at
    /// `tile` and continuing into each freshly created child.
    pub fn subdivide_recursively<F>(&self, tile: &mut T, subdivision_required: &F)
    where
        F: Fn(&T) -> bool,
    {
        if !subdivision_required(tile) {
            return;
        }
        if !tile.has_children() {
            self.subdivide(tile);
        }
        if let Some(children) = tile.children_mut() {
            for child in children.iter_mut() {
                self.subdivide_recursively(child, subdivision_required);
            }
        }
    }
}

/// Quadtree owning a single root tile and everything below it.
///
/// # Example
///
/// ```
/// use glam::DVec2;
/// use tilestream::geom::Box2;
/// use tilestream::quadtree::{DefaultTile, QuadTree, QuadTreeTile, QuadTreeTileKey, TileFactory};
///
/// let factory = TileFactory::new(DefaultTile::<DVec2>::with_default_payload);
/// let mut tree = QuadTree::new(factory, QuadTreeTileKey::default(), Box2::unit());
///
/// let (factory, root) = tree.parts_mut();
/// factory.subdivide(root);
///
/// let leaf = tree.intersect_leaf(DVec2::new(0.75, 0.75)).unwrap();
/// assert_eq!(leaf.key(), QuadTreeTileKey::new(1, 1, 0));
/// ```
pub struct QuadTree<T: QuadTreeTile> {
    factory: TileFactory<T>,
    root: T,
}

impl<T: QuadTreeTile> QuadTree<T> {
    /// Builds a tree with a single root tile created by `factory`.
    pub fn new(
        factory: TileFactory<T>,
        root_key: QuadTreeTileKey,
        root_bounds: Box2<T::Vector>,
    ) -> Self {
        let root = factory.create(root_key, root_bounds);
        Self { factory, root }
    }

    pub fn root(&self) -> &T {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut T {
        &mut self.root
    }

    pub fn factory(&self) -> &TileFactory<T> {
        &self.factory
    }

    /// Splits the borrow of the tree into its factory and root, so tiles
    /// anywhere in the tree can be subdivided.
    pub fn parts_mut(&mut self) -> (&TileFactory<T>, &mut T) {
        (&self.factory, &mut self.root)
    }

    /// Subdivides `tile`. See [`TileFactory::subdivide`].
    pub fn subdivide(&self, tile: &mut T) {
        self.factory.subdivide(tile);
    }

    /// Drops all children of `tile`. A no-op on a leaf.
    pub fn merge(tile: &mut T) {
        tile.replace_children(None);
    }

    /// Returns the leaf containing `p`, or `None` if `p` is outside the root.
    pub fn intersect_leaf(&self, p: T::Vector) -> Option<&T> {
        intersect_leaf_from(&self.root, p)
    }

    /// Returns the first (coarsest) tile containing `p` that satisfies
    /// `predicate`, descending only while the predicate fails.
    pub fn intersect<F>(&self, p: T::Vector, predicate: F) -> Option<&T>
    where
        F: Fn(&T) -> bool,
    {
        intersect_from(&self.root, p, &predicate)
    }
}

impl<T: QuadTreeTile + fmt::Debug> fmt::Debug for QuadTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuadTree")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Leaf search starting at an arbitrary tile.
pub fn intersect_leaf_from<T: QuadTreeTile>(tile: &T, p: T::Vector) -> Option<&T> {
    if !tile.bounds().intersects_point(p) {
        return None;
    }
    match tile.children() {
        Some(children) => children
            .iter()
            .find_map(|child| intersect_leaf_from(child, p)),
        None => Some(tile),
    }
}

/// Predicate-gated search starting at an arbitrary tile.
pub fn intersect_from<'t, T, F>(tile: &'t T, p: T::Vector, predicate: &F) -> Option<&'t T>
where
    T: QuadTreeTile,
    F: Fn(&T) -> bool + ?Sized,
{
    if !tile.bounds().intersects_point(p) {
        return None;
    }
    if predicate(tile) {
        return Some(tile);
    }
    tile.children()?
        .iter()
        .find_map(|child| intersect_from(child, p, predicate))
}
