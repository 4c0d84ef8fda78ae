//! Error types for octree construction.

use std::fmt;

use thiserror::Error;

/// Which arena pool ran out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pool {
    /// Interior trie records.
    Branch,
    /// Leaf face lists.
    Node,
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pool::Branch => f.write_str("branch"),
            Pool::Node => f.write_str("node"),
        }
    }
}

/// Errors that can occur while building an octree.
///
/// Queries never fail; a ray that cannot hit anything simply reports no hit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OctreeError {
    /// An arena pool reached its configured capacity.
    #[error("octree {pool} pool full: capacity {capacity} records")]
    CapacityExceeded {
        /// The exhausted pool.
        pool: Pool,
        /// Its configured capacity.
        capacity: usize,
    },

    /// World bounds are inverted or not finite.
    #[error("invalid octree bounds: {0}")]
    InvalidBounds(String),

    /// Settings that cannot produce a usable tree.
    #[error("invalid octree settings: {0}")]
    InvalidSettings(String),
}

/// Result type for octree construction.
pub type Result<T> = std::result::Result<T, OctreeError>;
