#![warn(missing_docs)]

//! Voxel octree ray acceleration.
//!
//! Scene triangles and quads are registered in a uniform grid of up to
//! 512³ cells, stored sparsely in an 8-ary trie. Segment queries walk the
//! grid with a 3D-DDA and run exact ray/face tests only on faces registered
//! in the cells the segment passes through.
//!
//! # Architecture
//!
//! - [`OctreeBuilder`] - build phase: voxelizes faces into the trie
//! - [`Octree`] - query phase: [`Octree::intersect`] and
//!   [`Octree::intersect_check`]
//! - [`Isect`] - caller-owned query state, result and shadow cache
//! - [`RayScene`] - how the octree reads face vertices and object transforms
//! - [`intersect`] - ray/triangle and ray/quad math
//! - [`ocval`] - per-cell interval masks used for early rejection
//!
//! # Example
//!
//! ```ignore
//! use rayoct::{Isect, MeshScene, OctreeBuilder, OctreeSettings, RayMode};
//!
//! let scene: MeshScene = load_scene();
//! let faces: Vec<_> = scene.faces().collect();
//! let bounds = scene.bounds();
//!
//! let mut builder = OctreeBuilder::new(&OctreeSettings::default(), bounds, scene)?;
//! for (object, face) in faces {
//!     builder.add_face(object, face)?;
//! }
//! let tree = builder.done();
//!
//! let mut isect = Isect::new(light, surface_point, RayMode::Shadow);
//! let in_shadow = tree.intersect(&mut isect);
//! ```

mod arena;
mod error;
mod guard;
pub mod intersect;
mod isect;
pub mod ocval;
mod octree;
mod scene;
mod segment;
mod settings;
mod traverse;
mod voxelize;

#[cfg(test)]
mod testing;

pub use arena::{BANK_SIZE, NODE_CAPACITY};
pub use error::{OctreeError, Pool, Result};
pub use guard::CONTRA_LABDA;
pub use isect::{Hit, Isect, QuadHalf, QueryStats, RayMode};
pub use octree::{trie_levels, Octree, OctreeBuilder, OctreeStats};
pub use scene::{FaceRef, FaceVerts, MeshFace, MeshScene, ObjectId, RayScene, SceneMesh};
pub use segment::Segment;
pub use settings::{OctreeSettings, DEFAULT_RESOLUTION, MAX_RESOLUTION};
pub use voxelize::{FacePlane, Voxelizer};

pub use rayoct_math::{Aabb3, Point3, Real, Transform, Vec3};
