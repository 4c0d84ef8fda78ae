//! The renderer-facing side of the octree: how faces, objects and their
//! transforms are looked up.
//!
//! The octree never owns geometry. It stores opaque face handles and asks a
//! [`RayScene`] for vertex positions whenever it needs them, both while
//! voxelizing and while intersecting.

use std::fmt;

use rayoct_math::{Aabb3, Point3, Transform};

use crate::isect::Isect;

/// Identifies the object a face belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ob{}", self.0)
    }
}

/// Vertex positions of one triangle or quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceVerts {
    verts: [Point3; 4],
    quad: bool,
}

impl FaceVerts {
    /// A triangle `(a, b, c)`.
    pub fn triangle(a: Point3, b: Point3, c: Point3) -> Self {
        Self {
            verts: [a, b, c, c],
            quad: false,
        }
    }

    /// A quad `(a, b, c, d)`, split as `(a, b, c)` and `(a, c, d)`.
    pub fn quad(a: Point3, b: Point3, c: Point3, d: Point3) -> Self {
        Self {
            verts: [a, b, c, d],
            quad: true,
        }
    }

    /// True for four-vertex faces.
    pub fn is_quad(&self) -> bool {
        self.quad
    }

    /// The 3 or 4 vertex positions.
    pub fn vertices(&self) -> &[Point3] {
        if self.quad {
            &self.verts
        } else {
            &self.verts[..3]
        }
    }

    /// Vertex `i` (0-based). Triangles repeat their last vertex at index 3.
    #[inline]
    pub fn vertex(&self, i: usize) -> Point3 {
        self.verts[i]
    }

    /// Copy with every vertex moved by `transform` (`None` = identity).
    pub fn transformed(&self, transform: Option<&Transform>) -> Self {
        match transform {
            Some(t) => Self {
                verts: self.verts.map(|p| t.apply_point(&p)),
                quad: self.quad,
            },
            None => *self,
        }
    }

    /// True when any vertex of `self` coincides exactly with one of `other`.
    ///
    /// Faces of one mesh that share a vertex return the very same stored
    /// position, so bitwise equality identifies the shared vertex.
    pub fn shares_vertex(&self, other: &FaceVerts) -> bool {
        self.vertices()
            .iter()
            .any(|a| other.vertices().iter().any(|b| a == b))
    }
}

/// Scene access used by the octree.
///
/// Implementors are usually thin views over the renderer's own mesh
/// storage. `Face` is whatever handle the renderer uses to name a face.
pub trait RayScene {
    /// Handle naming a face.
    type Face: Copy + PartialEq + fmt::Debug;

    /// Untransformed vertex positions of `face`.
    fn face_verts(&self, face: Self::Face) -> FaceVerts;

    /// Object-to-world transform for `object`; `None` means identity.
    fn object_transform(&self, _object: ObjectId) -> Option<Transform> {
        None
    }

    /// Whether `face` may be hit by the query described by `isect`.
    ///
    /// Typical uses are layer masks, skipping the ray's own object, or
    /// backface policies.
    fn accept_face(
        &self,
        _isect: &Isect<Self::Face>,
        _object: ObjectId,
        _face: Self::Face,
    ) -> bool {
        true
    }
}

/// A face of a [`SceneMesh`], by vertex index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFace {
    /// Triangle.
    Tri([u32; 3]),
    /// Quad.
    Quad([u32; 4]),
}

/// One object of a [`MeshScene`].
#[derive(Debug, Clone, Default)]
pub struct SceneMesh {
    /// Vertex positions in object space.
    pub positions: Vec<Point3>,
    /// Faces indexing `positions`.
    pub faces: Vec<MeshFace>,
    /// Object-to-world transform.
    pub transform: Option<Transform>,
}

/// Handle of a face in a [`MeshScene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceRef {
    /// Owning mesh; equal to its [`ObjectId`].
    pub mesh: u32,
    /// Index into the mesh's face list.
    pub index: u32,
}

/// A simple owned scene of indexed meshes.
///
/// Mesh `i` is object `ObjectId(i)`.
#[derive(Debug, Clone, Default)]
pub struct MeshScene {
    meshes: Vec<SceneMesh>,
}

impl MeshScene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mesh and return its object id.
    pub fn add_mesh(&mut self, mesh: SceneMesh) -> ObjectId {
        self.meshes.push(mesh);
        ObjectId((self.meshes.len() - 1) as u32)
    }

    /// Access a mesh by object id.
    pub fn mesh(&self, object: ObjectId) -> Option<&SceneMesh> {
        self.meshes.get(object.0 as usize)
    }

    /// Every `(object, face)` pair in the scene.
    pub fn faces(&self) -> impl Iterator<Item = (ObjectId, FaceRef)> + '_ {
        self.meshes.iter().enumerate().flat_map(|(m, mesh)| {
            (0..mesh.faces.len()).map(move |i| {
                (
                    ObjectId(m as u32),
                    FaceRef {
                        mesh: m as u32,
                        index: i as u32,
                    },
                )
            })
        })
    }

    /// World-space bounds of all mesh vertices.
    pub fn bounds(&self) -> Aabb3 {
        let mut aabb = Aabb3::empty();
        for mesh in &self.meshes {
            for p in &mesh.positions {
                let p = rayoct_math::apply_optional(mesh.transform.as_ref(), *p);
                aabb.include_point(&p);
            }
        }
        aabb
    }
}

impl RayScene for MeshScene {
    type Face = FaceRef;

    fn face_verts(&self, face: FaceRef) -> FaceVerts {
        let mesh = &self.meshes[face.mesh as usize];
        let p = |i: u32| mesh.positions[i as usize];
        match mesh.faces[face.index as usize] {
            MeshFace::Tri([a, b, c]) => FaceVerts::triangle(p(a), p(b), p(c)),
            MeshFace::Quad([a, b, c, d]) => FaceVerts::quad(p(a), p(b), p(c), p(d)),
        }
    }

    fn object_transform(&self, object: ObjectId) -> Option<Transform> {
        self.mesh(object).and_then(|m| m.transform)
    }
}
