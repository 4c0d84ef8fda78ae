//! Per-axis interval bitmasks for cheap cell-local overlap tests.
//!
//! Each axis of a cell is cut into [`OCVAL_RES`] slots. A span along that
//! axis sets every slot bit it touches, so two spans that overlap inside the
//! cell always share at least one bit and the whole 3-axis test is three
//! ANDs.

use rayoct_math::{Point3, Real};

/// Number of slots per axis.
pub const OCVAL_RES: u32 = 15;

/// Three per-axis slot masks relative to one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OcVal {
    /// X slots.
    pub x: u16,
    /// Y slots.
    pub y: u16,
    /// Z slots.
    pub z: u16,
}

/// Slot mask for the cell-local span `[lo, hi]`, both in cell units.
#[inline]
pub fn span_mask(lo: Real, hi: Real) -> u16 {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let first = slot(lo);
    let last = slot(hi);
    ((1u16 << (last + 1)) - 1) & !((1u16 << first) - 1)
}

#[inline]
fn slot(t: Real) -> u32 {
    let s = (OCVAL_RES as Real * t).floor();
    if s.is_nan() || s <= 0.0 {
        0
    } else if s >= (OCVAL_RES - 1) as Real {
        OCVAL_RES - 1
    } else {
        s as u32
    }
}

impl OcVal {
    /// Mask of the grid-space box `[min, max]` relative to cell `cell`.
    pub fn from_box(min: &Point3, max: &Point3, cell: [i32; 3]) -> Self {
        let o = cell.map(|c| c as Real);
        Self {
            x: span_mask(min.x - o[0], max.x - o[0]),
            y: span_mask(min.y - o[1], max.y - o[1]),
            z: span_mask(min.z - o[2], max.z - o[2]),
        }
    }

    /// Mask of the grid-space segment `a → b` relative to cell `cell`.
    pub fn from_segment(a: &Point3, b: &Point3, cell: [i32; 3]) -> Self {
        let o = cell.map(|c| c as Real);
        Self {
            x: span_mask(a.x - o[0], b.x - o[0]),
            y: span_mask(a.y - o[1], b.y - o[1]),
            z: span_mask(a.z - o[2], b.z - o[2]),
        }
    }

    /// True if the two masks share a slot on every axis.
    #[inline]
    pub fn overlaps(&self, other: &OcVal) -> bool {
        (self.x & other.x) != 0 && (self.y & other.y) != 0 && (self.z & other.z) != 0
    }
}
