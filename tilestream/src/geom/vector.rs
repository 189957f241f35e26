//! Two-component vector abstraction used by bounds and quadtrees.

use std::fmt::Debug;

/// A 2D point/vector type usable as the coordinate type of a [`Box2`](super::Box2).
///
/// Components are exchanged as `f64` so bounds arithmetic is written once for
/// both single and double precision vectors.
pub trait Vector2: Copy + Debug + PartialEq + Send + Sync + 'static {
    /// Creates a vector from its components.
    fn new(x: f64, y: f64) -> Self;

    /// First component (longitude for geographic vectors).
    fn x(&self) -> f64;

    /// Second component (latitude for geographic vectors).
    fn y(&self) -> f64;

    /// Component-wise linear interpolation between `a` and `b` by `t`.
    fn lerp_components(a: Self, b: Self, t: Self) -> Self {
        Self::new(
            a.x() + (b.x() - a.x()) * t.x(),
            a.y() + (b.y() - a.y()) * t.y(),
        )
    }
}

impl Vector2 for glam::DVec2 {
    #[inline]
    fn new(x: f64, y: f64) -> Self {
        glam::DVec2::new(x, y)
    }

    #[inline]
    fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    fn y(&self) -> f64 {
        self.y
    }
}

impl Vector2 for glam::Vec2 {
    #[inline]
    fn new(x: f64, y: f64) -> Self {
        glam::Vec2::new(x as f32, y as f32)
    }

    #[inline]
    fn x(&self) -> f64 {
        self.x as f64
    }

    #[inline]
    fn y(&self) -> f64 {
        self.y as f64
    }
}
