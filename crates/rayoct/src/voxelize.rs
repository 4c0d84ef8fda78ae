//! Conservative voxelization of triangles and quads.
//!
//! A face is projected onto the XY, XZ and YZ planes. Each projected edge is
//! walked with a 2-D DDA that marks every cell the edge crosses, then every
//! bitmap row is filled between its first and last mark. A cell is a
//! candidate when all three projections mark it, and is accepted when the
//! face's plane actually passes through it.
//!
//! All coordinates here are grid space: cell `(x, y, z)` spans
//! `[x, x+1) × [y, y+1) × [z, z+1)`.

use rayoct_math::{Point3, Real, Vec3};

use crate::error::Result;

/// Axis pairs of the three projections.
const PROJECTIONS: [(usize, usize); 3] = [(0, 1), (0, 2), (1, 2)];

/// Plane of a face, used to reject candidate cells it does not cross.
#[derive(Debug, Clone, Copy)]
pub struct FacePlane {
    normal: Vec3,
    d: Real,
    // Largest vertex distance from the plane; non-zero for warped quads.
    slack: Real,
}

/// Unnormalized face normal. Quads use the cross product of their
/// diagonals, falling back to the larger half when the diagonals are
/// parallel.
fn face_normal(verts: &[Point3]) -> Vec3 {
    let half = |a: &Point3, b: &Point3, c: &Point3| (b - a).cross(&(c - a));
    match verts {
        [a, b, c, d] => {
            let n = (c - a).cross(&(d - b));
            if n.norm_squared() > 0.0 {
                return n;
            }
            let (first, second) = (half(a, b, c), half(a, c, d));
            if first.norm_squared() >= second.norm_squared() {
                first
            } else {
                second
            }
        }
        [a, b, c, ..] => half(a, b, c),
        _ => Vec3::zeros(),
    }
}

impl FacePlane {
    /// Best-fit plane through the centroid of a triangle or quad; `None`
    /// when every half of the face has zero area.
    pub fn new(verts: &[Point3]) -> Option<Self> {
        let n = face_normal(verts);
        let len = n.norm();
        if len == 0.0 || !len.is_finite() {
            return None;
        }
        let normal = n / len;
        let centroid = verts.iter().map(|v| v.coords).sum::<Vec3>() / verts.len() as Real;
        let d = -normal.dot(&centroid);
        let slack = verts
            .iter()
            .map(|v| (normal.dot(&v.coords) + d).abs())
            .fold(0.0, Real::max);
        Some(Self { normal, d, slack })
    }

    #[inline]
    fn side(&self, x: Real, y: Real, z: Real) -> Real {
        self.normal.x * x + self.normal.y * y + self.normal.z * z + self.d
    }

    /// True if the plane, thickened by the face's own warp, meets the
    /// closed cell `(x, y, z)`.
    pub fn crosses_cell(&self, x: i32, y: i32, z: i32) -> bool {
        let (fx, fy, fz) = (x as Real, y as Real, z as Real);
        let mut lo = Real::INFINITY;
        let mut hi = Real::NEG_INFINITY;
        for corner in 0..8 {
            let s = self.side(
                fx + (corner & 1) as Real,
                fy + ((corner >> 1) & 1) as Real,
                fz + ((corner >> 2) & 1) as Real,
            );
            lo = lo.min(s);
            hi = hi.max(s);
        }
        lo <= self.slack && hi >= -self.slack
    }
}

/// Square bitmap for one projection.
#[derive(Debug, Clone)]
struct Bitmap {
    res: usize,
    bits: Vec<bool>,
}

impl Bitmap {
    fn new(res: usize) -> Self {
        Self {
            res,
            bits: vec![false; res * res],
        }
    }

    #[inline]
    fn get(&self, a: i32, b: i32) -> bool {
        self.bits[self.res * a as usize + b as usize]
    }

    #[inline]
    fn set(&mut self, a: i32, b: i32) {
        self.bits[self.res * a as usize + b as usize] = true;
    }

    fn fill_rows(&mut self, a0: i32, a1: i32, b0: i32, b1: i32) {
        for a in a0..=a1 {
            let first = (b0..=b1).find(|&b| self.get(a, b));
            let last = (b0..=b1).rev().find(|&b| self.get(a, b));
            if let (Some(first), Some(last)) = (first, last) {
                for b in first..=last {
                    self.set(a, b);
                }
            }
        }
    }

    fn clear(&mut self, a0: i32, a1: i32, b0: i32, b1: i32) {
        for a in a0..=a1 {
            let row = self.res * a as usize;
            self.bits[row + b0 as usize..=row + b1 as usize].fill(false);
        }
    }
}

/// Per-axis setup of an incremental line walk from `o1` to `o2`, starting
/// in cell `c1`: parameter of the first grid-line crossing, parameter step
/// per cell, and cell step.
#[inline]
fn walk_axis(o1: Real, o2: Real, c1: i32) -> (Real, Real, i32) {
    if o1 == o2 {
        (1.0, 0.0, 0)
    } else if o2 > o1 {
        let ld = 1.0 / (o2 - o1);
        ((c1 as Real + 1.0 - o1) * ld, ld, 1)
    } else {
        let ld = 1.0 / (o1 - o2);
        ((o1 - c1 as Real) * ld, ld, -1)
    }
}

/// Scratch state for voxelizing faces into a `res³` grid.
///
/// The bitmaps are cleared after every face, touching only the face's own
/// cell box.
#[derive(Debug, Clone)]
pub struct Voxelizer {
    res: i32,
    maps: [Bitmap; 3],
}

impl Voxelizer {
    /// Scratch space for a `res³` grid.
    pub fn new(res: u32) -> Self {
        let r = res as usize;
        Self {
            res: res as i32,
            maps: [Bitmap::new(r), Bitmap::new(r), Bitmap::new(r)],
        }
    }

    /// Find the cells overlapped by the face with grid-space vertices
    /// `verts` (3 or 4) and hand each one to `emit`.
    ///
    /// Degenerate faces and faces outside the grid emit nothing. An error
    /// from `emit` stops the scan and is returned after the scratch space
    /// has been reset.
    pub fn voxelize<E>(&mut self, verts: &[Point3], mut emit: E) -> Result<()>
    where
        E: FnMut([i32; 3]) -> Result<()>,
    {
        let Some(plane) = FacePlane::new(verts) else {
            return Ok(());
        };

        let cells: Vec<[i32; 3]> = verts
            .iter()
            .map(|p| [p.x.floor() as i32, p.y.floor() as i32, p.z.floor() as i32])
            .collect();
        let mut lo = [0i32; 3];
        let mut hi = [0i32; 3];
        for axis in 0..3 {
            let min = cells.iter().map(|c| c[axis]).min().unwrap_or(0);
            let max = cells.iter().map(|c| c[axis]).max().unwrap_or(0);
            lo[axis] = min.max(0);
            hi[axis] = max.min(self.res - 1);
            if lo[axis] > hi[axis] {
                return Ok(());
            }
        }

        if lo == hi {
            return emit(lo);
        }

        for i in 0..verts.len() {
            let j = (i + 1) % verts.len();
            for (map, &(a, b)) in PROJECTIONS.iter().enumerate() {
                self.walk_edge(map, &verts[i], &verts[j], &cells[i], &cells[j], (a, b), &lo, &hi);
            }
        }
        for (map, &(a, b)) in PROJECTIONS.iter().enumerate() {
            self.maps[map].fill_rows(lo[a], hi[a], lo[b], hi[b]);
        }

        let result = self.scan(&plane, &lo, &hi, &mut emit);

        for (map, &(a, b)) in PROJECTIONS.iter().enumerate() {
            self.maps[map].clear(lo[a], hi[a], lo[b], hi[b]);
        }
        result
    }

    fn scan<E>(&self, plane: &FacePlane, lo: &[i32; 3], hi: &[i32; 3], emit: &mut E) -> Result<()>
    where
        E: FnMut([i32; 3]) -> Result<()>,
    {
        let [xy, xz, yz] = &self.maps;
        for x in lo[0]..=hi[0] {
            for y in lo[1]..=hi[1] {
                if !xy.get(x, y) {
                    continue;
                }
                for z in lo[2]..=hi[2] {
                    if xz.get(x, z) && yz.get(y, z) && plane.crosses_cell(x, y, z) {
                        emit([x, y, z])?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Mark the cells crossed by the projection of edge `p1 → p2` onto axes
    /// `(a, b)`, restricted to the face's cell box.
    #[allow(clippy::too_many_arguments)]
    fn walk_edge(
        &mut self,
        map: usize,
        p1: &Point3,
        p2: &Point3,
        c1: &[i32; 3],
        c2: &[i32; 3],
        (a, b): (usize, usize),
        lo: &[i32; 3],
        hi: &[i32; 3],
    ) {
        let bitmap = &mut self.maps[map];
        let mut mark = |x: i32, y: i32| {
            if x >= lo[a] && x <= hi[a] && y >= lo[b] && y <= hi[b] {
                bitmap.set(x, y);
            }
        };

        if c1[a] == c2[a] && c1[b] == c2[b] {
            mark(c1[a], c1[b]);
            return;
        }

        let (mut labdax, ldx, dx) = walk_axis(p1[a], p2[a], c1[a]);
        let (mut labday, ldy, dy) = walk_axis(p1[b], p2[b], c1[b]);
        let (mut x, mut y) = (c1[a], c1[b]);
        let mut labda = labdax.min(labday);

        loop {
            mark(x, y);
            let labdao = labda;
            if labdax == labday {
                labdax += ldx;
                x += dx;
                labday += ldy;
                y += dy;
            } else if labdax < labday {
                labdax += ldx;
                x += dx;
            } else {
                labday += ldy;
                y += dy;
            }
            labda = labdax.min(labday);
            if labda == labdao || labda >= 1.0 {
                break;
            }
        }
        mark(c2[a], c2[b]);
    }
}
