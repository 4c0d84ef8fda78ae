//! Query state: the segment being traced, what it may hit, and the result.

use rayoct_math::{Point3, Real, Vec3};

use crate::scene::ObjectId;

/// How a query treats multiple candidate hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RayMode {
    /// Any hit ends the query.
    #[default]
    Shadow,
    /// Closest hit wins.
    Mirror,
    /// Closest hit wins (refraction rays).
    Glass,
}

impl RayMode {
    /// True for first-hit semantics.
    pub fn is_shadow(self) -> bool {
        self == RayMode::Shadow
    }
}

/// Which triangle of a face was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadHalf {
    /// Triangle `(v1, v2, v3)`; the only half of a triangle.
    First,
    /// Triangle `(v1, v3, v4)` of a quad.
    Second,
}

/// A confirmed ray/face intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit<F> {
    /// Owning object of the hit face.
    pub object: ObjectId,
    /// The hit face.
    pub face: F,
    /// Segment parameter: 0 at `start`, 1 at `end`.
    pub labda: Real,
    /// Barycentric weight of the half's second vertex.
    pub u: Real,
    /// Barycentric weight of the half's third vertex.
    pub v: Real,
    /// Which half of the face.
    pub half: QuadHalf,
}

/// Counters for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryStats {
    /// Non-empty cells whose face lists were inspected.
    pub nodes_visited: usize,
    /// Exact ray/face tests performed.
    pub faces_tested: usize,
    /// Whether the shadow coherence cache answered the query.
    pub coherent: bool,
}

/// Memoized self-intersection verdict for the current query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Contra<F> {
    pub(crate) object: ObjectId,
    pub(crate) face: F,
    pub(crate) verdict: bool,
}

/// A segment query and its result.
///
/// An `Isect` is owned by the caller and passed by `&mut` into every query.
/// Besides the result it carries the last shadow hit, which the next shadow
/// query through the same `Isect` tests first; neighbouring shadow rays
/// tend to be blocked by the same face.
#[derive(Debug, Clone)]
pub struct Isect<F> {
    /// Segment start.
    pub start: Point3,
    /// Segment end.
    pub end: Point3,
    /// Query semantics.
    pub mode: RayMode,
    /// The face the segment leaves from, never reported as a hit.
    pub orig: Option<(ObjectId, F)>,
    /// Result of the last query.
    pub hit: Option<Hit<F>>,
    /// Counters of the last query.
    pub stats: QueryStats,
    pub(crate) contra: Option<Contra<F>>,
    pub(crate) last: Option<(ObjectId, F)>,
}

impl<F: Copy + PartialEq> Isect<F> {
    /// A query along `start → end`.
    pub fn new(start: Point3, end: Point3, mode: RayMode) -> Self {
        Self {
            start,
            end,
            mode,
            orig: None,
            hit: None,
            stats: QueryStats::default(),
            contra: None,
            last: None,
        }
    }

    /// Set the face the segment leaves from.
    pub fn with_origin(mut self, object: ObjectId, face: F) -> Self {
        self.orig = Some((object, face));
        self
    }

    /// Retarget this query, keeping the coherence cache.
    pub fn set_segment(&mut self, start: Point3, end: Point3) {
        self.start = start;
        self.end = end;
        self.hit = None;
    }

    /// `end - start`.
    pub fn vec(&self) -> Vec3 {
        self.end - self.start
    }

    /// World position of the current hit.
    pub fn hit_point(&self) -> Option<Point3> {
        self.hit.map(|h| self.start + self.vec() * h.labda)
    }

    /// Face remembered from the last successful shadow query.
    pub fn last_hit(&self) -> Option<(ObjectId, F)> {
        self.last
    }

    /// Forget the remembered shadow hit.
    pub fn clear_cache(&mut self) {
        self.last = None;
    }

    pub(crate) fn is_orig(&self, object: ObjectId, face: F) -> bool {
        self.orig == Some((object, face))
    }

    pub(crate) fn begin_query(&mut self) {
        self.hit = None;
        self.contra = None;
        self.stats = QueryStats::default();
    }
}
