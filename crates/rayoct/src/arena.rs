//! Index-stable record pools backing the octree trie.
//!
//! Records live in fixed-size banks that are allocated on demand and never
//! reallocated, compacted or freed individually. A record's `u32` index is
//! valid for the lifetime of the arena.

use crate::error::{OctreeError, Pool, Result};
use crate::ocval::OcVal;
use crate::scene::ObjectId;

/// Records per bank.
pub const BANK_SIZE: usize = 4096;

/// Entries per node before chaining.
pub const NODE_CAPACITY: usize = 8;

/// A growable pool of `T` with a hard capacity.
#[derive(Debug)]
pub struct Arena<T> {
    banks: Vec<Vec<T>>,
    len: usize,
    capacity: usize,
    pool: Pool,
}

impl<T> Arena<T> {
    /// Create a pool that will hold at most `capacity` records, with banks
    /// for roughly `reserve` records allocated up front.
    pub fn new(pool: Pool, capacity: usize, reserve: usize) -> Self {
        let reserve = reserve.min(capacity);
        let banks = (0..reserve.div_ceil(BANK_SIZE))
            .map(|_| Vec::with_capacity(BANK_SIZE))
            .collect();
        Self {
            banks,
            len: 0,
            capacity,
            pool,
        }
    }

    /// Store `value` and return its index.
    pub fn alloc(&mut self, value: T) -> Result<u32> {
        if self.len >= self.capacity || self.len >= u32::MAX as usize {
            return Err(OctreeError::CapacityExceeded {
                pool: self.pool,
                capacity: self.capacity,
            });
        }
        let bank = self.len / BANK_SIZE;
        if bank == self.banks.len() {
            self.banks.push(Vec::with_capacity(BANK_SIZE));
        }
        self.banks[bank].push(value);
        let index = self.len as u32;
        self.len += 1;
        Ok(index)
    }

    /// Record at `index`.
    #[inline]
    pub fn get(&self, index: u32) -> &T {
        let i = index as usize;
        &self.banks[i / BANK_SIZE][i % BANK_SIZE]
    }

    /// Mutable record at `index`.
    #[inline]
    pub fn get_mut(&mut self, index: u32) -> &mut T {
        let i = index as usize;
        &mut self.banks[i / BANK_SIZE][i % BANK_SIZE]
    }

    /// Number of records allocated.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of banks currently held.
    pub fn bank_count(&self) -> usize {
        self.banks.len()
    }
}

/// Interior trie record: one child slot per octant.
///
/// On the last trie level the children index the node arena, everywhere
/// else the branch arena.
#[derive(Debug, Clone, Copy, Default)]
pub struct Branch {
    /// Child indices by octant.
    pub children: [Option<u32>; 8],
}

/// One face registered in a cell.
#[derive(Debug, Clone, Copy)]
pub struct NodeEntry<F> {
    /// Face handle.
    pub face: F,
    /// Owning object.
    pub object: ObjectId,
    /// Face bounds as slot masks relative to this cell.
    pub ocval: OcVal,
}

/// Leaf record: up to eight faces plus a link to the overflow node.
#[derive(Debug, Clone, Copy)]
pub struct Node<F> {
    entries: [Option<NodeEntry<F>>; NODE_CAPACITY],
    len: u8,
    /// Next node of the same cell.
    pub next: Option<u32>,
}

impl<F: Copy> Default for Node<F> {
    fn default() -> Self {
        Self {
            entries: [None; NODE_CAPACITY],
            len: 0,
            next: None,
        }
    }
}

impl<F: Copy> Node<F> {
    /// Append an entry. Returns `false` when the node is full.
    pub fn push(&mut self, entry: NodeEntry<F>) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries[self.len as usize] = Some(entry);
        self.len += 1;
        true
    }

    /// True when no more entries fit.
    pub fn is_full(&self) -> bool {
        self.len as usize == NODE_CAPACITY
    }

    /// Stored entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &NodeEntry<F>> {
        self.entries.iter().map_while(Option::as_ref)
    }
}

/// Octant of cell `(x, y, z)` at trie bit `bit`: one bit per axis, x highest.
#[inline]
pub fn octant(x: u32, y: u32, z: u32, bit: u32) -> usize {
    ((((x >> bit) & 1) << 2) | (((y >> bit) & 1) << 1) | ((z >> bit) & 1)) as usize
}
