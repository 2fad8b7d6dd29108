//! Integer index ranges in global grid coordinates

use serde::{Deserialize, Serialize};

/// Axis-aligned block of cells: `begin[axis] .. begin[axis] + length[axis]`
///
/// `begin` is expressed in global cell indices and may be negative for the
/// margin that precedes the physical region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    /// Number of cells along each axis
    pub length: [usize; 2],
    /// First global index along each axis
    pub begin: [isize; 2],
}

impl Range {
    /// Create a range from lengths and origins
    pub const fn new(length: [usize; 2], begin: [isize; 2]) -> Self {
        Self { length, begin }
    }

    /// One past the last global index along `axis`
    #[inline]
    pub fn end(&self, axis: usize) -> isize {
        self.begin[axis] + self.length[axis] as isize
    }

    /// Total number of cells, saturating at `usize::MAX`
    #[inline]
    pub fn cells(&self) -> usize {
        self.length[0].saturating_mul(self.length[1])
    }

    /// Whether global cell `(i, j)` lies in this range
    pub fn contains(&self, i: isize, j: isize) -> bool {
        i >= self.begin[0] && i < self.end(0) && j >= self.begin[1] && j < self.end(1)
    }

    /// Whether `other` lies entirely within this range
    pub fn encloses(&self, other: &Range) -> bool {
        (0..2).all(|axis| {
            other.begin[axis] >= self.begin[axis] && other.end(axis) <= self.end(axis)
        })
    }

    /// This range grown by `mgn` cells on both sides plus one trailing cell
    /// per axis for the staggered magnetic field
    pub fn with_margin(&self, mgn: usize) -> Self {
        let m = mgn as isize;
        Self {
            length: [self.length[0] + 2 * mgn + 1, self.length[1] + 2 * mgn + 1],
            begin: [self.begin[0] - m, self.begin[1] - m],
        }
    }
}
