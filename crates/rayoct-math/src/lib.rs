#![warn(missing_docs)]

//! Math types for the rayoct octree.
//!
//! Thin wrappers around nalgebra providing the single-precision types the
//! ray acceleration structure works in: points, vectors, per-object affine
//! transforms and axis-aligned boxes.

mod aabb;

pub use aabb::Aabb3;

use nalgebra::{Matrix4, Vector3, Vector4};

/// Scalar type used for all geometry.
pub type Real = f32;

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<Real>;

/// A vector in 3D space.
pub type Vec3 = Vector3<Real>;

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<Real>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: Real, dy: Real, dz: Real) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: Real) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self { matrix: m }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Apply an optional transform to a point; `None` is the identity.
#[inline]
pub fn apply_optional(transform: Option<&Transform>, p: Point3) -> Point3 {
    match transform {
        Some(t) => t.apply_point(&p),
        None => p,
    }
}
