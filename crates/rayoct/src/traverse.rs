//! Ray queries: segment clipping, 3D-DDA walk through the cells, and
//! per-cell face tests.

use rayoct_math::Real;

use crate::guard;
use crate::intersect::intersect_face;
use crate::isect::{Hit, Isect};
use crate::octree::{Grid, Octree};
use crate::ocval::OcVal;
use crate::scene::{ObjectId, RayScene};
use crate::segment::Segment;

/// Fraction of a cell a closest hit may lie past the cell exit and still be
/// accepted there. Covers rounding between grid and world space for faces
/// lying on a cell boundary, which are registered on one side only.
const EXIT_SLACK: Real = 1e-3;

/// Per-axis DDA setup for a walk from `o1` to `o2` starting in cell `c`:
/// parameter of the first cell boundary, parameter step and cell step.
///
/// Spans shorter than `Real::EPSILON` never step.
#[inline]
fn dda_axis(o1: Real, o2: Real, c: i32) -> (Real, Real, i32) {
    let d = o1 - o2;
    if d < -Real::EPSILON {
        let ld = -1.0 / d;
        ((c as Real + 1.0 - o1) * ld, ld, 1)
    } else if d > Real::EPSILON {
        let ld = 1.0 / d;
        ((o1 - c as Real) * ld, ld, -1)
    } else {
        (1.0, 0.0, 0)
    }
}

impl<S: RayScene> Octree<S> {
    /// Trace `isect`'s segment, using [`RayScene::accept_face`] to filter
    /// candidate faces. Returns true on a hit, stored in `isect.hit`.
    pub fn intersect(&self, isect: &mut Isect<S::Face>) -> bool {
        self.intersect_check(isect, |is, object, face| {
            self.scene.accept_face(is, object, face)
        })
    }

    /// Trace `isect`'s segment with an explicit face filter.
    ///
    /// Shadow queries return the first confirmed hit and remember it in
    /// `isect` for the next query. Mirror and glass queries return the
    /// closest hit. Hit parameters are relative to the full segment.
    pub fn intersect_check<C>(&self, isect: &mut Isect<S::Face>, check: C) -> bool
    where
        C: Fn(&Isect<S::Face>, ObjectId, S::Face) -> bool,
    {
        isect.begin_query();

        if isect.mode.is_shadow() {
            if let Some((object, face)) = isect.last {
                if !isect.is_orig(object, face) && check(isect, object, face) {
                    if let Some(hit) = self.test_face(isect, object, face, Real::INFINITY) {
                        isect.hit = Some(hit);
                        isect.stats.coherent = true;
                        return true;
                    }
                }
            }
        }

        if self.walk(isect, &check) {
            return true;
        }
        isect.last = None;
        false
    }

    fn walk<C>(&self, isect: &mut Isect<S::Face>, check: &C) -> bool
    where
        C: Fn(&Isect<S::Face>, ObjectId, S::Face) -> bool,
    {
        let segment = Segment::new(isect.start, isect.end);
        let Some((u1, u2)) = segment.clip(&self.grid.bounds()) else {
            return false;
        };

        let o1 = self.grid.to_grid(&segment.at(u1));
        let o2 = self.grid.to_grid(&segment.at(u2));
        let mut cell = Grid::cell_of(&o1);
        let last = Grid::cell_of(&o2);

        if cell == last {
            let Some(node) = self.node_at(cell) else {
                return false;
            };
            let ocval = OcVal::from_segment(&o1, &o2, cell);
            return self.test_node(isect, check, node, &ocval, u2);
        }

        let (mut lx, ldx, dx) = dda_axis(o1.x, o2.x, cell[0]);
        let (mut ly, ldy, dy) = dda_axis(o1.y, o2.y, cell[1]);
        let (mut lz, ldz, dz) = dda_axis(o1.z, o2.z, cell[2]);
        let along = o2 - o1;
        let slack = EXIT_SLACK / along.amax();

        let mut dda = lx.min(ly).min(lz);
        let mut prev: Real = 0.0;
        let max_steps = 3 * self.grid.res as usize + 3;

        for _ in 0..max_steps {
            if let Some(node) = self.node_at(cell) {
                let entry = o1 + along * prev.clamp(0.0, 1.0);
                let exit = o1 + along * dda.clamp(0.0, 1.0);
                let ocval = OcVal::from_segment(&entry, &exit, cell);
                let limit = u1 + (dda + slack) * (u2 - u1);
                if self.test_node(isect, check, node, &ocval, limit) {
                    return true;
                }
            }

            prev = dda;
            // Equal crossings are tie-broken by a fixed table so that rays
            // through edges and corners take the same path every time.
            let eq = u8::from(lx == ly) | (u8::from(ly == lz) << 1) | (u8::from(lx == lz) << 2);
            let (step_x, step_y, step_z) = match eq {
                0 => {
                    if lx < ly && lx < lz {
                        (true, false, false)
                    } else if ly < lz {
                        (false, true, false)
                    } else {
                        (false, false, true)
                    }
                }
                1 if ly < lz => (true, true, false),
                1 => (false, false, true),
                2 if lx < ly => (true, false, false),
                2 => (false, true, true),
                4 if ly < lx => (false, true, false),
                4 => (true, false, true),
                _ => (true, true, true),
            };
            if step_x {
                cell[0] += dx;
                lx += ldx;
            }
            if step_y {
                cell[1] += dy;
                ly += ldy;
            }
            if step_z {
                cell[2] += dz;
                lz += ldz;
            }

            dda = lx.min(ly).min(lz);
            if dda == prev || prev >= 1.0 {
                break;
            }
        }
        false
    }

    /// Test the faces of one cell's node chain against the segment.
    ///
    /// `limit` is the segment parameter where the walk leaves the cell, plus
    /// [`EXIT_SLACK`]; closest-hit queries ignore hits beyond it, since a
    /// later cell will see them again in order.
    fn test_node<C>(
        &self,
        isect: &mut Isect<S::Face>,
        check: &C,
        first: u32,
        ocval: &OcVal,
        limit: Real,
    ) -> bool
    where
        C: Fn(&Isect<S::Face>, ObjectId, S::Face) -> bool,
    {
        isect.stats.nodes_visited += 1;
        let shadow = isect.mode.is_shadow();
        let limit = if shadow { Real::INFINITY } else { limit };
        let mut best: Option<Hit<S::Face>> = None;

        for node in self.trie.chain(first) {
            for entry in node.entries() {
                if isect.is_orig(entry.object, entry.face)
                    || !entry.ocval.overlaps(ocval)
                    || !check(isect, entry.object, entry.face)
                {
                    continue;
                }
                let Some(hit) = self.test_face(isect, entry.object, entry.face, limit) else {
                    continue;
                };
                if shadow {
                    isect.hit = Some(hit);
                    isect.last = Some((entry.object, entry.face));
                    return true;
                }
                let closer = match best {
                    Some(b) => hit.labda < b.labda,
                    None => true,
                };
                if closer {
                    best = Some(hit);
                }
            }
        }

        match best {
            Some(hit) => {
                isect.hit = Some(hit);
                true
            }
            None => false,
        }
    }

    /// Exact test of one face, followed by the self-intersection guard.
    fn test_face(
        &self,
        isect: &mut Isect<S::Face>,
        object: ObjectId,
        face: S::Face,
        limit: Real,
    ) -> Option<Hit<S::Face>> {
        isect.stats.faces_tested += 1;
        let verts = self.scene.face_verts(face);
        let transform = self.scene.object_transform(object);
        let world = verts.transformed(transform.as_ref());

        let found = intersect_face(&world, &isect.start, &isect.vec())?;
        if found.labda > limit {
            return None;
        }
        if !guard::accept_hit(&self.scene, isect, object, &verts, found.labda) {
            return None;
        }
        Some(Hit {
            object,
            face,
            labda: found.labda,
            u: found.u,
            v: found.v,
            half: found.half,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isect::{QuadHalf, RayMode};
    use crate::scene::{FaceRef, MeshScene};
    use crate::settings::OctreeSettings;
    use crate::testing::{build, build_in, build_with, mesh, mesh_scene, quad, tri};
    use approx::assert_relative_eq;
    use rayoct_math::{Aabb3, Point3, Transform};

    fn face(mesh: u32, index: u32) -> FaceRef {
        FaceRef { mesh, index }
    }

    fn unit_tri_tree() -> Octree<MeshScene> {
        build(
            mesh_scene(vec![vec![tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0])]]),
            16,
        )
    }

    #[test]
    fn test_dda_axis_directions() {
        assert_eq!(dda_axis(0.5, 3.5, 0), (1.0 / 6.0, 1.0 / 3.0, 1));
        assert_eq!(dda_axis(3.5, 0.5, 3), (1.0 / 6.0, 1.0 / 3.0, -1));
        assert_eq!(dda_axis(2.0, 2.0, 2), (1.0, 0.0, 0));
    }

    #[test]
    fn test_segment_outside_box_visits_nothing() {
        let tree = unit_tri_tree();
        let mut is = Isect::new(
            Point3::new(5.0, 5.0, 5.0),
            Point3::new(6.0, 7.0, 8.0),
            RayMode::Shadow,
        );
        assert!(!tree.intersect(&mut is));
        assert!(is.hit.is_none());
        assert_eq!(is.stats.nodes_visited, 0);
    }

    #[test]
    fn test_centroid_hit() {
        let tree = unit_tri_tree();
        let c = 1.0 / 3.0;
        let mut is = Isect::new(Point3::new(c, c, 1.0), Point3::new(c, c, -1.0), RayMode::Shadow);
        assert!(tree.intersect(&mut is));
        let hit = is.hit.unwrap();
        assert!(hit.labda > 0.0 && hit.labda < 1.0);
        assert_relative_eq!(hit.labda, 0.5, epsilon = 1e-5);
        assert_eq!(hit.face, face(0, 0));
        assert_eq!(is.last_hit(), Some((ObjectId(0), face(0, 0))));
        assert!(is.stats.nodes_visited >= 1);
    }

    #[test]
    fn test_miss_beside_face() {
        let tree = unit_tri_tree();
        let mut is = Isect::new(
            Point3::new(0.8, 0.8, 1.0),
            Point3::new(0.8, 0.8, -1.0),
            RayMode::Mirror,
        );
        assert!(!tree.intersect(&mut is));
        assert!(is.hit.is_none());
    }

    #[test]
    fn test_repeated_shadow_query_uses_cache() {
        let scene = mesh_scene(vec![vec![
            quad([0.0, 0.0, 0.5], [1.0, 0.0, 0.5], [1.0, 1.0, 0.5], [0.0, 1.0, 0.5]),
            tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 1.0]),
        ]]);
        let tree = build(scene, 16);
        let mut is = Isect::new(
            Point3::new(0.6, 0.3, 1.0),
            Point3::new(0.6, 0.3, 0.6),
            RayMode::Shadow,
        );
        assert!(!tree.intersect(&mut is));
        assert!(is.last_hit().is_none());

        is.set_segment(Point3::new(0.6, 0.3, 1.0), Point3::new(0.6, 0.3, 0.0));
        assert!(tree.intersect(&mut is));
        let first = is.hit.unwrap();
        assert!(!is.stats.coherent);

        assert!(tree.intersect(&mut is));
        assert_eq!(is.hit.unwrap(), first);
        assert!(is.stats.coherent);
        assert_eq!(is.stats.nodes_visited, 0);

        // A miss clears the cache.
        is.set_segment(Point3::new(5.0, 5.0, 5.0), Point3::new(6.0, 5.0, 5.0));
        assert!(!tree.intersect(&mut is));
        assert!(is.last_hit().is_none());
    }

    #[test]
    fn test_shared_edge_start_is_not_a_hit() {
        let scene = mesh_scene(vec![vec![
            tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            tri([1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]),
        ]]);
        let tree = build(scene, 16);
        let start = Point3::new(0.5, 0.5, 0.0);
        let end = Point3::new(0.5, 0.5, 1.0);

        let mut plain = Isect::new(start, end, RayMode::Shadow);
        assert!(tree.intersect(&mut plain));

        let mut is = Isect::new(start, end, RayMode::Shadow).with_origin(ObjectId(0), face(0, 0));
        assert!(!tree.intersect(&mut is));
        let mut is = Isect::new(start, end, RayMode::Mirror).with_origin(ObjectId(0), face(0, 0));
        assert!(!tree.intersect(&mut is));
    }

    #[test]
    fn test_near_hit_through_origin_interior_is_kept() {
        // Second triangle folds up from the first along their shared edge.
        let scene = mesh_scene(vec![vec![
            tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            tri([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 1.0]),
        ]]);
        let tree = build(scene, 16);
        let start = Point3::new(0.3, 0.3, 0.0);
        let end = Point3::new(10.3, 10.3, 10.0);
        let mut is = Isect::new(start, end, RayMode::Shadow).with_origin(ObjectId(0), face(0, 0));
        assert!(tree.intersect(&mut is));
        let hit = is.hit.unwrap();
        assert_eq!(hit.face, face(0, 1));
        assert_relative_eq!(hit.labda, 0.04, epsilon = 1e-5);
    }

    #[test]
    fn test_mirror_returns_closest() {
        let scene = mesh_scene(vec![
            vec![quad([0.0, 0.0, 0.7], [1.0, 0.0, 0.7], [1.0, 1.0, 0.7], [0.0, 1.0, 0.7])],
            vec![quad([0.0, 0.0, 0.3], [1.0, 0.0, 0.3], [1.0, 1.0, 0.3], [0.0, 1.0, 0.3])],
        ]);
        let tree = build(scene, 2);
        for mode in [RayMode::Mirror, RayMode::Glass] {
            let mut is = Isect::new(Point3::new(0.4, 0.6, 1.0), Point3::new(0.4, 0.6, 0.0), mode);
            assert!(tree.intersect(&mut is));
            let hit = is.hit.unwrap();
            assert_eq!(hit.object, ObjectId(0));
            assert_relative_eq!(hit.labda, 0.3, epsilon = 1e-5);

            let mut is = Isect::new(Point3::new(0.4, 0.6, 0.0), Point3::new(0.4, 0.6, 1.0), mode);
            assert!(tree.intersect(&mut is));
            assert_eq!(is.hit.unwrap().object, ObjectId(1));
        }
    }

    #[test]
    fn test_mirror_defers_hits_beyond_cell() {
        // The ray runs just under a nearly parallel quad and meets it far
        // away, but the quad already shares the first cell with the ray. A
        // small upright triangle halfway along is the true closest hit.
        let scene = mesh_scene(vec![
            vec![quad([0.0, 0.0, 0.455], [1.0, 0.0, 0.505], [1.0, 1.0, 0.505], [0.0, 1.0, 0.455])],
            vec![tri([0.5, 0.4, 0.4], [0.5, 0.6, 0.4], [0.5, 0.5, 0.6])],
        ]);
        let bounds = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let tree = build_in(scene, 8, bounds);
        assert!(tree.faces_in_cell([0, 3, 3]).contains(&(ObjectId(0), face(0, 0))));

        let mut is = Isect::new(
            Point3::new(-0.5, 0.5, 0.5),
            Point3::new(1.5, 0.5, 0.5),
            RayMode::Mirror,
        );
        assert!(tree.intersect(&mut is));
        let hit = is.hit.unwrap();
        assert_eq!(hit.object, ObjectId(1));
        assert_relative_eq!(hit.labda, 0.5, epsilon = 1e-5);

        let dir = is.vec();
        let best = [face(0, 0), face(1, 0)]
            .into_iter()
            .filter_map(|f| intersect_face(&tree.scene().face_verts(f), &is.start, &dir))
            .map(|h| h.labda)
            .fold(Real::INFINITY, Real::min);
        assert_relative_eq!(hit.labda, best, epsilon = 1e-6);
    }

    #[test]
    fn test_orig_face_is_skipped() {
        let tree = unit_tri_tree();
        let c = 1.0 / 3.0;
        let mut is = Isect::new(Point3::new(c, c, 1.0), Point3::new(c, c, -1.0), RayMode::Mirror)
            .with_origin(ObjectId(0), face(0, 0));
        assert!(!tree.intersect(&mut is));
    }

    #[test]
    fn test_check_predicate_filters() {
        let tree = unit_tri_tree();
        let c = 1.0 / 3.0;
        let mut is = Isect::new(Point3::new(c, c, 1.0), Point3::new(c, c, -1.0), RayMode::Shadow);
        assert!(!tree.intersect_check(&mut is, |_, object, _| object != ObjectId(0)));
        assert!(is.stats.nodes_visited >= 1);
        assert_eq!(is.stats.faces_tested, 0);
        assert!(tree.intersect_check(&mut is, |_, _, _| true));
    }

    #[test]
    fn test_quad_second_half_reported() {
        let tree = build(
            mesh_scene(vec![vec![quad(
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            )]]),
            8,
        );
        let mut is = Isect::new(
            Point3::new(0.2, 0.8, 1.0),
            Point3::new(0.2, 0.8, -1.0),
            RayMode::Mirror,
        );
        assert!(tree.intersect(&mut is));
        assert_eq!(is.hit.unwrap().half, QuadHalf::Second);
        let mut is = Isect::new(
            Point3::new(0.8, 0.2, 1.0),
            Point3::new(0.8, 0.2, -1.0),
            RayMode::Mirror,
        );
        assert!(tree.intersect(&mut is));
        assert_eq!(is.hit.unwrap().half, QuadHalf::First);
    }

    #[test]
    fn test_transformed_object_is_hit_where_it_lives() {
        let mut scene = MeshScene::new();
        scene.add_mesh(mesh(
            vec![tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0])],
            Some(Transform::translation(0.0, 0.0, 5.0)),
        ));
        scene.add_mesh(mesh(vec![tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0])], None));
        let tree = build(scene, 16);
        let mut is = Isect::new(
            Point3::new(0.25, 0.25, 6.0),
            Point3::new(0.25, 0.25, 3.0),
            RayMode::Mirror,
        );
        assert!(tree.intersect(&mut is));
        let hit = is.hit.unwrap();
        assert_eq!(hit.object, ObjectId(0));
        assert_relative_eq!(is.hit_point().unwrap().z, 5.0, epsilon = 1e-4);
    }

    #[test]
    fn test_labda_is_relative_to_unclipped_segment() {
        let tree = unit_tri_tree();
        let mut is = Isect::new(
            Point3::new(0.25, 0.25, 3.0),
            Point3::new(0.25, 0.25, -1.0),
            RayMode::Shadow,
        );
        assert!(tree.intersect(&mut is));
        assert_relative_eq!(is.hit.unwrap().labda, 0.75, epsilon = 1e-5);
    }

    #[test]
    fn test_registered_cells_are_confirmed_by_rays() {
        // Axis-aligned quad; every registered cell must yield a hit for a
        // ray along the normal through the cell's overlap with the face.
        let (x0, x1, y0, y1, z) = (0.13, 0.71, 0.22, 0.94, 0.43);
        let scene = mesh_scene(vec![
            vec![quad([x0, y0, z], [x1, y0, z], [x1, y1, z], [x0, y1, z])],
            vec![tri([0.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0])],
        ]);
        let tree = build(scene, 16);
        let target = (ObjectId(0), face(0, 0));
        let mut cells = 0;
        for x in 0..16 {
            for y in 0..16 {
                for zc in 0..16 {
                    if !tree.faces_in_cell([x, y, zc]).contains(&target) {
                        continue;
                    }
                    cells += 1;
                    let b = tree.cell_bounds([x, y, zc]);
                    assert!(b.min.z <= z && b.max.z >= z, "cell {x},{y},{zc} off plane");
                    let px = 0.5 * (b.min.x.max(x0) + b.max.x.min(x1));
                    let py = 0.5 * (b.min.y.max(y0) + b.max.y.min(y1));
                    let mut is = Isect::new(
                        Point3::new(px, py, 2.0),
                        Point3::new(px, py, -1.0),
                        RayMode::Mirror,
                    );
                    let hit = tree.intersect_check(&mut is, |_, object, _| object == target.0);
                    assert!(hit, "cell {x},{y},{zc} not confirmed");
                }
            }
        }
        assert!(cells >= 9 * 11);
    }

    #[test]
    fn test_diagonal_rays_find_every_face() {
        // Small scattered triangles, each aimed at from a far corner. The
        // reported hit must be the closest of all faces.
        let mut faces = Vec::new();
        for i in 0..6 {
            let t = 0.1 + 0.13 * i as Real;
            faces.push(tri([t, 0.9 - t, t], [t + 0.05, 0.9 - t, t], [t, 0.95 - t, t + 0.05]));
        }
        let tree = build(mesh_scene(vec![faces]), 32);
        for i in 0..6 {
            let verts = tree.scene().face_verts(face(0, i));
            let centroid = Point3::from(
                (verts.vertex(0).coords + verts.vertex(1).coords + verts.vertex(2).coords) / 3.0,
            );
            let start = Point3::new(-0.5, 1.5, -0.25);
            let end = start + (centroid - start) * 2.0;
            let mut is = Isect::new(start, end, RayMode::Mirror);
            assert!(tree.intersect(&mut is), "face {i} missed");
            let dir = is.vec();
            let best = (0..6)
                .filter_map(|j| intersect_face(&tree.scene().face_verts(face(0, j)), &start, &dir))
                .map(|h| h.labda)
                .fold(Real::INFINITY, Real::min);
            assert_relative_eq!(is.hit.unwrap().labda, best, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_quad_with_collapsed_first_edge_is_hit() {
        // Pole quad of a UV sphere: the first two vertices coincide.
        let (a, c, d) = ([0.5, 0.5, 0.9], [0.9, 0.1, 0.2], [0.1, 0.1, 0.2]);
        let scene = mesh_scene(vec![vec![quad(a, a, c, d)]]);
        let bounds = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let tree = build_in(scene, 16, bounds);
        assert!(tree.stats().entries > 0);

        let centroid = Point3::new(0.5, 0.7 / 3.0, 1.3 / 3.0);
        let start = Point3::new(0.5, 1.0, 1.0);
        let end = start + (centroid - start) * 2.0;
        for mode in [RayMode::Shadow, RayMode::Mirror] {
            let mut is = Isect::new(start, end, mode);
            assert!(tree.intersect(&mut is), "{mode:?} missed");
            let hit = is.hit.unwrap();
            assert_eq!(hit.half, QuadHalf::Second);
            assert_relative_eq!(hit.labda, 0.5, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_faces_on_grid_planes_match_brute_force() {
        // With zero padding the grid scale is exactly one, so both quads lie
        // on cell boundaries and are registered on one side only.
        let scene = mesh_scene(vec![
            vec![quad([0.5, 0.5, 2.0], [15.4, 0.5, 2.0], [15.4, 15.4, 2.0], [0.5, 15.4, 2.0])],
            vec![quad([7.0, 0.5, 0.5], [7.0, 15.4, 0.5], [7.0, 15.4, 15.4], [7.0, 0.5, 15.4])],
        ]);
        let settings = OctreeSettings {
            resolution: 16,
            bounds_padding: 0.0,
            ..OctreeSettings::default()
        };
        let bounds = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(15.9, 15.9, 15.9));
        let tree = build_with(scene, &settings, bounds);
        let faces: Vec<_> = tree.scene().faces().collect();

        let mut seed = 0x2545_f491_u32;
        let mut coord = move || {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (seed >> 8) as Real / (1u32 << 24) as Real * 15.9
        };
        let mut hits = 0;
        for _ in 0..2000 {
            let start = Point3::new(coord(), coord(), coord());
            let end = Point3::new(coord(), coord(), coord());
            let dir = end - start;
            let best = faces
                .iter()
                .filter_map(|&(_, f)| intersect_face(&tree.scene().face_verts(f), &start, &dir))
                .map(|h| h.labda)
                .fold(Real::INFINITY, Real::min);

            let mut mirror = Isect::new(start, end, RayMode::Mirror);
            let mut shadow = Isect::new(start, end, RayMode::Shadow);
            let found = tree.intersect(&mut mirror);
            assert_eq!(found, best.is_finite(), "mirror {start} -> {end}");
            assert_eq!(tree.intersect(&mut shadow), found, "shadow {start} -> {end}");
            if found {
                hits += 1;
                assert_relative_eq!(mirror.hit.unwrap().labda, best, epsilon = 1e-4);
            }
        }
        assert!(hits > 500, "only {hits} segments cross a face");
    }

    #[test]
    fn test_tied_crossings_step_diagonally() {
        // Rays along exact cell diagonals. Each target sits in a cell the
        // walk reaches by a tied step; each decoy sits in a neighbour that a
        // one-axis-at-a-time walk would pass through first.
        let scene = mesh_scene(vec![
            vec![tri([6.8, 6.2, 3.2], [6.2, 6.8, 3.2], [6.5, 6.5, 3.8])],
            vec![tri([6.2, 5.2, 3.2], [6.8, 5.2, 3.2], [6.2, 5.8, 3.2])],
            vec![tri([6.9, 6.3, 6.3], [6.3, 6.9, 6.3], [6.3, 6.3, 6.9])],
            vec![tri([6.2, 5.2, 5.2], [6.8, 5.2, 5.2], [6.2, 5.8, 5.2])],
        ]);
        let bounds = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(16.0, 16.0, 16.0));
        let tree = build_in(scene, 16, bounds);

        let rays = [
            (Point3::new(0.5, 0.5, 3.5), Point3::new(10.5, 10.5, 3.5), ObjectId(0)),
            (Point3::new(0.5, 0.5, 0.5), Point3::new(10.5, 10.5, 10.5), ObjectId(2)),
        ];
        for (start, end, target) in rays {
            for (from, to, labda) in [(start, end, 0.6), (end, start, 0.4)] {
                let mut first = None;
                for _ in 0..2 {
                    let mut is = Isect::new(from, to, RayMode::Mirror);
                    assert!(tree.intersect(&mut is));
                    let hit = is.hit.unwrap();
                    assert_eq!(hit.object, target);
                    assert_relative_eq!(hit.labda, labda, epsilon = 1e-4);
                    assert_eq!(is.stats.nodes_visited, 1);
                    let run = (hit, is.stats.nodes_visited, is.stats.faces_tested);
                    assert_eq!(*first.get_or_insert(run), run);
                }
            }
        }
    }

    #[test]
    fn test_rotated_object_is_hit_where_it_lives() {
        let mut scene = MeshScene::new();
        scene.add_mesh(mesh(
            vec![tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0])],
            Some(Transform::rotation_z(std::f32::consts::FRAC_PI_2)),
        ));
        scene.add_mesh(mesh(vec![tri([0.0, 0.0, -1.0], [1.0, 0.0, -1.0], [0.0, 1.0, -1.0])], None));
        let tree = build(scene, 16);

        let mut is = Isect::new(
            Point3::new(-0.25, 0.25, 1.0),
            Point3::new(-0.25, 0.25, -2.0),
            RayMode::Mirror,
        );
        assert!(tree.intersect(&mut is));
        assert_eq!(is.hit.unwrap().object, ObjectId(0));

        // The untransformed footprint only holds the lower triangle.
        let mut is = Isect::new(
            Point3::new(0.25, 0.25, 1.0),
            Point3::new(0.25, 0.25, -2.0),
            RayMode::Mirror,
        );
        assert!(tree.intersect(&mut is));
        assert_eq!(is.hit.unwrap().object, ObjectId(1));
    }
}
