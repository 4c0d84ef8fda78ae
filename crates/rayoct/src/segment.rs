//! Line segments and clipping against the octree's world box.

use rayoct_math::{Aabb3, Point3, Real, Vec3};

/// A directed segment `start → end`, parametrized by `t ∈ [0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Point at `t = 0`.
    pub start: Point3,
    /// Point at `t = 1`.
    pub end: Point3,
}

impl Segment {
    /// Create a segment.
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    /// `end - start`.
    #[inline]
    pub fn vec(&self) -> Vec3 {
        self.end - self.start
    }

    /// Evaluate the segment at parameter `t`.
    #[inline]
    pub fn at(&self, t: Real) -> Point3 {
        self.start + self.vec() * t
    }

    /// Clip against a box (Liang–Barsky).
    ///
    /// Returns the parameter range `(t_min, t_max) ⊆ [0, 1]` inside the box,
    /// or `None` when the segment misses it. Segments parallel to a slab
    /// are handled without dividing by zero.
    pub fn clip(&self, aabb: &Aabb3) -> Option<(Real, Real)> {
        let d = self.vec();
        let mut t_min = 0.0;
        let mut t_max = 1.0;
        for axis in 0..3 {
            let s = self.start[axis];
            if !clip_slab(-d[axis], s - aabb.min[axis], &mut t_min, &mut t_max)
                || !clip_slab(d[axis], aabb.max[axis] - s, &mut t_min, &mut t_max)
            {
                return None;
            }
        }
        Some((t_min, t_max))
    }
}

/// One Liang–Barsky boundary: the segment is inside where `p * t <= q`.
#[inline]
fn clip_slab(p: Real, q: Real, t_min: &mut Real, t_max: &mut Real) -> bool {
    if p < 0.0 {
        if q < p {
            return false;
        }
        if q < 0.0 {
            let r = q / p;
            if r > *t_max {
                return false;
            }
            if r > *t_min {
                *t_min = r;
            }
        }
    } else if p > 0.0 {
        if q < 0.0 {
            return false;
        }
        if q < p {
            let r = q / p;
            if r < *t_min {
                return false;
            }
            if r < *t_max {
                *t_max = r;
            }
        }
    } else if q < 0.0 {
        return false;
    }
    true
}
