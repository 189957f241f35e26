//! Recursive spatial index of tile-shaped datasets.
//!
//! A [`QuadTree`] owns a root [`QuadTreeTile`] and grows by subdividing tiles
//! into four quadrants through a [`TileFactory`]. Tiles are addressed by
//! [`QuadTreeTileKey`]. A [`DiQuadTree`] pairs two trees to cover the globe,
//! and [`geo`] converts between keys and longitude/latitude.
//!
//! The same tree shape serves rendering tiles, map-feature tiles and altitude
//! query tiles. Each supplies its own tile type.

mod di;
pub mod geo;
mod intersector;
mod key;
mod tile;
mod tree;
mod utility;

pub use di::DiQuadTree;
pub use intersector::{CachedLeafIntersector, TileIntersect};
pub use key::QuadTreeTileKey;
pub use tile::{Children, DefaultTile, QuadTreeTile, Tile};
pub use tree::{intersect_from, intersect_leaf_from, QuadTree, TileFactory};
pub use utility::{
    find_tile, find_tile_mut, prune_tree, visit, visit_hierarchy_to_key, visit_mut,
};
