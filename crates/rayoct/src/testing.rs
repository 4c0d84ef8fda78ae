//! Scene builders shared by the unit tests.

use rayoct_math::{Aabb3, Point3, Real, Transform};

use crate::octree::{Octree, OctreeBuilder};
use crate::scene::{MeshFace, MeshScene, SceneMesh};
use crate::settings::OctreeSettings;

fn p(c: [Real; 3]) -> Point3 {
    Point3::new(c[0], c[1], c[2])
}

pub(crate) fn tri(a: [Real; 3], b: [Real; 3], c: [Real; 3]) -> Vec<Point3> {
    vec![p(a), p(b), p(c)]
}

pub(crate) fn quad(a: [Real; 3], b: [Real; 3], c: [Real; 3], d: [Real; 3]) -> Vec<Point3> {
    vec![p(a), p(b), p(c), p(d)]
}

/// One mesh with unshared vertex storage per face. Faces that touch still
/// share a vertex because equal coordinates compare equal.
pub(crate) fn mesh(faces: Vec<Vec<Point3>>, transform: Option<Transform>) -> SceneMesh {
    let mut out = SceneMesh {
        transform,
        ..SceneMesh::default()
    };
    for verts in faces {
        let base = out.positions.len() as u32;
        out.faces.push(match verts.len() {
            3 => MeshFace::Tri([base, base + 1, base + 2]),
            _ => MeshFace::Quad([base, base + 1, base + 2, base + 3]),
        });
        out.positions.extend(verts);
    }
    out
}

pub(crate) fn mesh_scene(meshes: Vec<Vec<Vec<Point3>>>) -> MeshScene {
    let mut scene = MeshScene::new();
    for faces in meshes {
        scene.add_mesh(mesh(faces, None));
    }
    scene
}

/// Octree over the scene's own bounds with every face added.
pub(crate) fn build(scene: MeshScene, res: u32) -> Octree<MeshScene> {
    let bounds = scene.bounds();
    build_in(scene, res, bounds)
}

pub(crate) fn build_in(scene: MeshScene, res: u32, bounds: Aabb3) -> Octree<MeshScene> {
    build_with(scene, &OctreeSettings::with_resolution(res), bounds)
}

pub(crate) fn build_with(
    scene: MeshScene,
    settings: &OctreeSettings,
    bounds: Aabb3,
) -> Octree<MeshScene> {
    let faces: Vec<_> = scene.faces().collect();
    let mut builder = OctreeBuilder::new(settings, bounds, scene).unwrap();
    for (object, face) in faces {
        builder.add_face(object, face).unwrap();
    }
    builder.done()
}
