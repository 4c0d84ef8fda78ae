//! Uniform voxel octree: construction, storage and teardown.
//!
//! The world box is cut into `res³` cells. Each non-empty cell owns a chain
//! of [`Node`]s reached through an 8-ary trie of [`Branch`] records, one trie
//! level per bit of the cell coordinates. Building goes through
//! [`OctreeBuilder`]; [`OctreeBuilder::done`] turns it into an immutable
//! [`Octree`] that answers ray queries (see `traverse`).

use rayoct_math::{Aabb3, Point3, Real, Vec3};
use serde::{Deserialize, Serialize};

use crate::arena::{octant, Arena, Branch, Node, NodeEntry};
use crate::error::{OctreeError, Pool, Result};
use crate::ocval::OcVal;
use crate::scene::{ObjectId, RayScene};
use crate::settings::OctreeSettings;
use crate::voxelize::Voxelizer;

/// Trie depth for a grid of `res` cells per axis.
pub fn trie_levels(res: u32) -> u32 {
    res.next_power_of_two().trailing_zeros().max(1)
}

/// Mapping between world space and grid space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Grid {
    pub(crate) min: Point3,
    pub(crate) max: Point3,
    pub(crate) scale: Vec3,
    pub(crate) res: u32,
    pub(crate) levels: u32,
}

impl Grid {
    fn new(bounds: &Aabb3, padding: Real, res: u32) -> Self {
        let mut padded = *bounds;
        padded.expand(padding);
        let Aabb3 { min, mut max } = padded;
        for axis in 0..3 {
            if max[axis] <= min[axis] {
                max[axis] = min[axis] + 1.0;
            }
        }
        let extent = max - min;
        let cells = res as Real - 0.1;
        Self {
            min,
            max,
            scale: Vec3::new(cells / extent.x, cells / extent.y, cells / extent.z),
            res,
            levels: trie_levels(res),
        }
    }

    /// World point to grid coordinates.
    #[inline]
    pub(crate) fn to_grid(&self, p: &Point3) -> Point3 {
        Point3::from((p - self.min).component_mul(&self.scale))
    }

    #[inline]
    pub(crate) fn cell_of(g: &Point3) -> [i32; 3] {
        [g.x.floor() as i32, g.y.floor() as i32, g.z.floor() as i32]
    }

    pub(crate) fn bounds(&self) -> Aabb3 {
        Aabb3::new(self.min, self.max)
    }

    #[inline]
    pub(crate) fn contains_cell(&self, cell: [i32; 3]) -> bool {
        let res = self.res as i32;
        cell.iter().all(|&c| c >= 0 && c < res)
    }

    fn cell_bounds(&self, cell: [i32; 3]) -> Aabb3 {
        let corner = |offset: Real| {
            Point3::new(
                self.min.x + (cell[0] as Real + offset) / self.scale.x,
                self.min.y + (cell[1] as Real + offset) / self.scale.y,
                self.min.z + (cell[2] as Real + offset) / self.scale.z,
            )
        };
        Aabb3::new(corner(0.0), corner(1.0))
    }
}

/// Branch and node pools plus the root of the trie.
#[derive(Debug)]
pub(crate) struct Trie<F> {
    branches: Arena<Branch>,
    nodes: Arena<Node<F>>,
    root: u32,
    levels: u32,
}

impl<F: Copy> Trie<F> {
    fn new(settings: &OctreeSettings, levels: u32) -> Result<Self> {
        let hint = settings.face_count_hint;
        let mut branches = Arena::new(Pool::Branch, settings.max_branches, hint / 8 + 1);
        let nodes = Arena::new(Pool::Node, settings.max_nodes, hint);
        let root = branches.alloc(Branch::default())?;
        Ok(Self {
            branches,
            nodes,
            root,
            levels,
        })
    }

    /// Append `entry` to the node chain of `cell`, creating branches and
    /// nodes on the way.
    fn insert(&mut self, cell: [u32; 3], entry: NodeEntry<F>) -> Result<()> {
        let [x, y, z] = cell;
        let mut branch = self.root;
        for bit in (1..self.levels).rev() {
            let oc = octant(x, y, z, bit);
            branch = match self.branches.get(branch).children[oc] {
                Some(child) => child,
                None => {
                    let child = self.branches.alloc(Branch::default())?;
                    self.branches.get_mut(branch).children[oc] = Some(child);
                    child
                }
            };
        }

        let oc = octant(x, y, z, 0);
        let mut node = match self.branches.get(branch).children[oc] {
            Some(node) => node,
            None => {
                let node = self.nodes.alloc(Node::default())?;
                self.branches.get_mut(branch).children[oc] = Some(node);
                node
            }
        };
        loop {
            if self.nodes.get_mut(node).push(entry) {
                return Ok(());
            }
            node = match self.nodes.get(node).next {
                Some(next) => next,
                None => {
                    let next = self.nodes.alloc(Node::default())?;
                    self.nodes.get_mut(node).next = Some(next);
                    next
                }
            };
        }
    }

    /// First node of `cell`, if the cell holds anything.
    pub(crate) fn lookup(&self, cell: [u32; 3]) -> Option<u32> {
        let [x, y, z] = cell;
        let mut branch = self.root;
        for bit in (1..self.levels).rev() {
            branch = self.branches.get(branch).children[octant(x, y, z, bit)]?;
        }
        self.branches.get(branch).children[octant(x, y, z, 0)]
    }

    /// Every node of the chain starting at `first`.
    pub(crate) fn chain(&self, first: u32) -> impl Iterator<Item = &Node<F>> {
        std::iter::successors(Some(self.nodes.get(first)), |node| {
            node.next.map(|next| self.nodes.get(next))
        })
    }
}

/// Construction counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OctreeStats {
    /// Branch records allocated, root included.
    pub branches: usize,
    /// Node records allocated.
    pub nodes: usize,
    /// Faces successfully added.
    pub faces: usize,
    /// Cell entries written over all faces.
    pub entries: usize,
}

/// Build phase of an octree.
///
/// Faces are streamed in with [`add_face`](Self::add_face); nothing can be
/// queried until [`done`](Self::done) returns the [`Octree`].
#[derive(Debug)]
pub struct OctreeBuilder<S: RayScene> {
    scene: S,
    grid: Grid,
    trie: Trie<S::Face>,
    voxelizer: Voxelizer,
    faces: usize,
    entries: usize,
}

impl<S: RayScene> OctreeBuilder<S> {
    /// Start an octree over `[min, max]` with `resolution` cells per axis.
    pub fn create(
        resolution: u32,
        face_count_hint: usize,
        min: Point3,
        max: Point3,
        scene: S,
    ) -> Result<Self> {
        let settings = OctreeSettings {
            resolution,
            face_count_hint,
            ..OctreeSettings::default()
        };
        Self::new(&settings, Aabb3::new(min, max), scene)
    }

    /// Start an octree over `bounds` with explicit settings.
    pub fn new(settings: &OctreeSettings, bounds: Aabb3, scene: S) -> Result<Self> {
        settings.validate()?;
        if !bounds.is_valid() {
            return Err(OctreeError::InvalidBounds(format!(
                "min {:?} max {:?}",
                bounds.min, bounds.max
            )));
        }

        let res = settings.clamped_resolution();
        if res != settings.resolution {
            log::warn!(
                "octree resolution {} out of range, using {}",
                settings.resolution,
                res
            );
        }

        let grid = Grid::new(&bounds, settings.bounds_padding, res);
        let trie = Trie::new(settings, grid.levels)?;
        Ok(Self {
            scene,
            grid,
            trie,
            voxelizer: Voxelizer::new(res),
            faces: 0,
            entries: 0,
        })
    }

    /// Register `face` of `object` in every cell it overlaps.
    ///
    /// On [`OctreeError::CapacityExceeded`] the cells written before the
    /// failure keep their entries and the builder stays usable.
    pub fn add_face(&mut self, object: ObjectId, face: S::Face) -> Result<()> {
        let transform = self.scene.object_transform(object);
        let verts = self.scene.face_verts(face).transformed(transform.as_ref());

        let mut grid_verts = [Point3::origin(); 4];
        let n = verts.vertices().len();
        for (g, p) in grid_verts.iter_mut().zip(verts.vertices()) {
            *g = self.grid.to_grid(p);
        }
        let grid_verts = &grid_verts[..n];
        let bbox = Aabb3::from_points(grid_verts);

        let Self {
            trie, voxelizer, ..
        } = self;
        let mut written = 0;
        let result = voxelizer.voxelize(grid_verts, |cell| {
            let entry = NodeEntry {
                face,
                object,
                ocval: OcVal::from_box(&bbox.min, &bbox.max, cell),
            };
            trie.insert(cell.map(|c| c as u32), entry)?;
            written += 1;
            Ok(())
        });
        self.entries += written;

        if let Err(err) = result {
            log::warn!("{face:?} of {object} only partly registered: {err}");
            return Err(err);
        }
        self.faces += 1;
        log::trace!("{face:?} of {object}: {written} cells");
        Ok(())
    }

    /// Counters so far.
    pub fn stats(&self) -> OctreeStats {
        OctreeStats {
            branches: self.trie.branches.len(),
            nodes: self.trie.nodes.len(),
            faces: self.faces,
            entries: self.entries,
        }
    }

    /// The scene adapter.
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Finish building. The voxelization scratch space is released.
    pub fn done(self) -> Octree<S> {
        let stats = self.stats();
        log::debug!(
            "octree {res}³: {faces} faces, {entries} entries, {branches} branches, {nodes} nodes",
            res = self.grid.res,
            faces = stats.faces,
            entries = stats.entries,
            branches = stats.branches,
            nodes = stats.nodes,
        );
        Octree {
            scene: self.scene,
            grid: self.grid,
            trie: self.trie,
            stats,
        }
    }
}

/// Query phase of an octree. Immutable; queries take `&self`.
#[derive(Debug)]
pub struct Octree<S: RayScene> {
    pub(crate) scene: S,
    pub(crate) grid: Grid,
    pub(crate) trie: Trie<S::Face>,
    stats: OctreeStats,
}

impl<S: RayScene> Octree<S> {
    /// Release every arena block and return the final counters.
    pub fn free(self) -> OctreeStats {
        log::debug!(
            "octree freed: {} branch banks, {} node banks",
            self.trie.branches.bank_count(),
            self.trie.nodes.bank_count()
        );
        self.stats
    }

    /// Diagonal of the padded world box.
    pub fn max_extent(&self) -> Real {
        self.grid.bounds().diagonal()
    }

    /// Construction counters.
    pub fn stats(&self) -> OctreeStats {
        self.stats
    }

    /// Padded world box.
    pub fn bounds(&self) -> Aabb3 {
        self.grid.bounds()
    }

    /// Cells per axis.
    pub fn resolution(&self) -> u32 {
        self.grid.res
    }

    /// The scene adapter.
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// World-space box of cell `(x, y, z)`.
    pub fn cell_bounds(&self, cell: [i32; 3]) -> Aabb3 {
        self.grid.cell_bounds(cell)
    }

    /// First node of `cell`; cells outside the grid are empty.
    pub(crate) fn node_at(&self, cell: [i32; 3]) -> Option<u32> {
        if !self.grid.contains_cell(cell) {
            return None;
        }
        self.trie.lookup(cell.map(|c| c as u32))
    }

    /// Faces registered in `cell`, in insertion order.
    pub fn faces_in_cell(&self, cell: [i32; 3]) -> Vec<(ObjectId, S::Face)> {
        self.node_at(cell)
            .map(|first| {
                self.trie
                    .chain(first)
                    .flat_map(|node| node.entries())
                    .map(|e| (e.object, e.face))
                    .collect()
            })
            .unwrap_or_default()
    }
}
