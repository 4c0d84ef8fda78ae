//! Suppression of self-intersections at shared edges.
//!
//! A secondary ray starts on the face it leaves (the origin face). Rounding
//! can put that start point a hair outside the origin face, on a neighbour
//! that shares an edge or vertex with it, and the neighbour then reports a
//! hit right at the start of the ray. Such a hit is only believed when the
//! ray's line really passes through the interior of the origin face.

use rayoct_math::Real;

use crate::intersect::intersect_line;
use crate::isect::{Contra, Isect};
use crate::scene::{FaceVerts, ObjectId, RayScene};

/// Hits closer than this (segment parameter) are checked against the
/// origin face.
pub const CONTRA_LABDA: Real = 0.1;

/// Decide whether a candidate hit at `labda` on `face` of `object`
/// (untransformed vertices `verts`) is genuine.
///
/// The verdict against the origin face is computed once per query and
/// stored in `isect`.
pub(crate) fn accept_hit<S: RayScene>(
    scene: &S,
    isect: &mut Isect<S::Face>,
    object: ObjectId,
    verts: &FaceVerts,
    labda: Real,
) -> bool {
    if isect.contra.is_some_and(|c| c.verdict) {
        return true;
    }
    if labda >= CONTRA_LABDA {
        return true;
    }
    let Some((orig_object, orig_face)) = isect.orig else {
        return true;
    };
    if orig_object != object {
        return true;
    }
    let orig_verts = scene.face_verts(orig_face);
    if !orig_verts.shares_vertex(verts) {
        return true;
    }

    if let Some(contra) = isect.contra {
        if contra.object == orig_object && contra.face == orig_face {
            return contra.verdict;
        }
    }

    let transform = scene.object_transform(orig_object);
    let world = orig_verts.transformed(transform.as_ref());
    let verdict = intersect_line(&world, &isect.start, &isect.vec()).is_some();
    log::trace!(
        "contra test of {:?} on {}: {}",
        orig_face,
        orig_object,
        if verdict { "interior" } else { "boundary" }
    );
    isect.contra = Some(Contra {
        object: orig_object,
        face: orig_face,
        verdict,
    });
    verdict
}
