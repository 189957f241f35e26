//! Geometry primitives: 2D vectors and axis-aligned bounds.

mod box2;
mod vector;

pub use box2::Box2;
pub use vector::Vector2;

/// Bounds in double precision, the coordinate type of globe quadtrees.
pub type Box2d = Box2<glam::DVec2>;
