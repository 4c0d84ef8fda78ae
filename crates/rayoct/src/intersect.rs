//! Ray/face intersection by Cramer's rule.
//!
//! A face half `(a, b, c)` is hit where
//! `start + labda * dir = a + u * (b - a) + v * (c - a)`. The three unknowns
//! come out of scalar triple products of the edge vectors, the direction
//! and `start - a`. Quads are tested as `(v1, v2, v3)` and then
//! `(v1, v3, v4)`.

use rayoct_math::{Point3, Real, Vec3};

use crate::isect::QuadHalf;
use crate::scene::FaceVerts;

/// Slack added to every barycentric and parametric bound so that hits
/// exactly on an edge are not lost to rounding.
pub const ISECT_EPSILON: Real = Real::EPSILON;

/// Raw solution for one triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceIsect {
    /// Segment parameter.
    pub labda: Real,
    /// Weight of the half's second vertex.
    pub u: Real,
    /// Weight of the half's third vertex.
    pub v: Real,
    /// Which half matched.
    pub half: QuadHalf,
}

/// Solve for `(labda, u, v)`; `None` when the ray is parallel to the plane.
#[inline]
fn solve(
    a: &Point3,
    b: &Point3,
    c: &Point3,
    start: &Point3,
    dir: &Vec3,
) -> Option<(Real, Real, Real)> {
    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(&e2);
    let det = e1.dot(&p);
    if det == 0.0 {
        return None;
    }
    let inv = 1.0 / det;
    let s = start - a;
    let u = s.dot(&p) * inv;
    let q = s.cross(&e1);
    let v = dir.dot(&q) * inv;
    let labda = e2.dot(&q) * inv;
    Some((labda, u, v))
}

#[inline]
fn inside_widened(u: Real, v: Real) -> bool {
    u > -ISECT_EPSILON && v > -ISECT_EPSILON && u + v < 1.0 + ISECT_EPSILON
}

#[inline]
fn in_segment(labda: Real) -> bool {
    labda > -ISECT_EPSILON && labda < 1.0 + ISECT_EPSILON
}

fn halves(verts: &FaceVerts) -> impl Iterator<Item = (Point3, Point3, Point3, QuadHalf)> {
    let first = (verts.vertex(0), verts.vertex(1), verts.vertex(2), QuadHalf::First);
    let second = verts
        .is_quad()
        .then(|| (verts.vertex(0), verts.vertex(2), verts.vertex(3), QuadHalf::Second));
    std::iter::once(first).chain(second)
}

/// Intersect the segment `start → start + dir` with a face.
///
/// Returns the first half that matches; for quads the second half is only
/// tried when the first misses.
pub fn intersect_face(verts: &FaceVerts, start: &Point3, dir: &Vec3) -> Option<FaceIsect> {
    halves(verts).find_map(|(a, b, c, half)| {
        let (labda, u, v) = solve(&a, &b, &c, start, dir)?;
        (inside_widened(u, v) && in_segment(labda)).then_some(FaceIsect { labda, u, v, half })
    })
}

/// Test whether the infinite line through `start` along `dir` passes
/// strictly through the interior of a face.
///
/// Unlike [`intersect_face`] the bounds are shrunk by [`ISECT_EPSILON`], so
/// a line grazing a face boundary does not count. The shared diagonal of a
/// quad's halves is interior and keeps the widened bound.
pub fn intersect_line(verts: &FaceVerts, start: &Point3, dir: &Vec3) -> Option<QuadHalf> {
    let quad = verts.is_quad();
    halves(verts).find_map(|(a, b, c, half)| {
        let (_, u, v) = solve(&a, &b, &c, start, dir)?;
        // First half: u == 0 is the diagonal a-c. Second half: v == 0 is.
        let u_min = if quad && half == QuadHalf::First { -ISECT_EPSILON } else { ISECT_EPSILON };
        let v_min = if quad && half == QuadHalf::Second { -ISECT_EPSILON } else { ISECT_EPSILON };
        (u > u_min && v > v_min && u + v < 1.0 - ISECT_EPSILON).then_some(half)
    })
}
