//! Axis-aligned 2D bounds.

use super::Vector2;

/// Axis-aligned bounding box over a 2-component vector type.
///
/// Intersection tests are inclusive on both edges, so a point on the shared
/// edge of two adjacent boxes intersects both.
///
/// # Example
///
/// ```
/// use glam::DVec2;
/// use tilestream::geom::Box2;
///
/// let b = Box2::new(DVec2::new(0.0, 0.0), DVec2::new(2.0, 4.0));
/// assert!(b.intersects_point(DVec2::new(1.0, 1.0)));
/// assert_eq!(b.center(), DVec2::new(1.0, 2.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box2<V> {
    /// Minimum corner.
    pub minimum: V,
    /// Maximum corner.
    pub maximum: V,
}

impl<V: Vector2> Box2<V> {
    /// Creates a box from its corners.
    pub fn new(minimum: V, maximum: V) -> Self {
        Self { minimum, maximum }
    }

    /// An inverted box that any merge will replace.
    pub fn empty() -> Self {
        Self {
            minimum: V::new(f64::MAX, f64::MAX),
            maximum: V::new(f64::MIN, f64::MIN),
        }
    }

    /// The box from (0, 0) to (1, 1).
    pub fn unit() -> Self {
        Self::new(V::new(0.0, 0.0), V::new(1.0, 1.0))
    }

    /// Extent along each axis.
    pub fn size(&self) -> V {
        V::new(
            self.maximum.x() - self.minimum.x(),
            self.maximum.y() - self.minimum.y(),
        )
    }

    pub fn center(&self) -> V {
        V::new(
            (self.maximum.x() + self.minimum.x()) * 0.5,
            (self.maximum.y() + self.minimum.y()) * 0.5,
        )
    }

    /// Returns true if the point lies within the box (edges inclusive).
    #[inline]
    pub fn intersects_point(&self, p: V) -> bool {
        p.x() >= self.minimum.x()
            && p.x() <= self.maximum.x()
            && p.y() >= self.minimum.y()
            && p.y() <= self.maximum.y()
    }

    /// Returns true if the boxes overlap or touch.
    pub fn intersects_box(&self, other: &Box2<V>) -> bool {
        self.maximum.x() >= other.minimum.x()
            && other.maximum.x() >= self.minimum.x()
            && self.maximum.y() >= other.minimum.y()
            && other.maximum.y() >= self.minimum.y()
    }

    /// Grows the box to contain `p`.
    pub fn merge_point(&mut self, p: V) {
        self.minimum = V::new(self.minimum.x().min(p.x()), self.minimum.y().min(p.y()));
        self.maximum = V::new(self.maximum.x().max(p.x()), self.maximum.y().max(p.y()));
    }

    /// Grows the box to contain `other`.
    pub fn merge_box(&mut self, other: &Box2<V>) {
        self.merge_point(other.minimum);
        self.merge_point(other.maximum);
    }

    /// Maps a point with components in [0, 1] to a point within the box,
    /// where 0 is the minimum bound and 1 is the maximum bound.
    pub fn point_from_normalized(&self, p: V) -> V {
        V::lerp_components(self.minimum, self.maximum, p)
    }

    /// Inverse of [`point_from_normalized`](Self::point_from_normalized).
    pub fn normalized_coordinate(&self, p: V) -> V {
        let size = self.size();
        V::new(
            (p.x() - self.minimum.x()) / size.x(),
            (p.y() - self.minimum.y()) / size.y(),
        )
    }

    pub fn area(&self) -> f64 {
        let size = self.size();
        size.x() * size.y()
    }
}
