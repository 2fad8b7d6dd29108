//! Per-rank extents of a slab-decomposed grid
//!
//! The global physical region is cut into `nsubdomains` equal slices along
//! axis 1. Axis 0 is never decomposed. Each rank owns an `inside` block and a
//! `whole` block that adds the margin used for PML cells and halo rows.

use super::range::Range;
use crate::error::{FdtdError, FdtdResult};
use std::mem::size_of;

/// Cell count of the global whole range of an `nx × ny` region with margin `mgn`
///
/// Fails when that extent, or the byte size of one `f64` buffer over it, does
/// not fit the address space.
pub fn whole_cells(nx: usize, ny: usize, mgn: usize) -> FdtdResult<usize> {
    mgn.checked_mul(2)
        .and_then(|m| m.checked_add(1))
        .and_then(|pad| nx.checked_add(pad)?.checked_mul(ny.checked_add(pad)?))
        .filter(|&cells| {
            cells
                .checked_mul(size_of::<f64>())
                .is_some_and(|bytes| bytes <= isize::MAX as usize)
        })
        .ok_or_else(|| {
            FdtdError::configuration(
                "nx/ny",
                format!("{nx}x{ny} grid with a {mgn}-cell margin exceeds the address space"),
            )
        })
}

/// Extents and neighbors of one rank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    rank: usize,
    nsubdomains: usize,
    mgn: usize,
    inside_global: Range,
    whole_global: Range,
    inside: Range,
    whole: Range,
}

impl GridGeometry {
    /// Geometry of `rank` for a global `nx × ny` physical region
    ///
    /// Fails if `ny` is not evenly divisible by `nsubdomains` or any extent is zero.
    pub fn new(
        nx: usize,
        ny: usize,
        nsubdomains: usize,
        rank: usize,
        mgn: usize,
    ) -> FdtdResult<Self> {
        if nx == 0 || ny == 0 {
            return Err(FdtdError::configuration(
                "nx/ny",
                format!("grid must be non-empty, got {nx}x{ny}"),
            ));
        }
        if nsubdomains == 0 || !ny.is_multiple_of(nsubdomains) {
            return Err(FdtdError::configuration(
                "nsubdomains",
                format!("must evenly divide ny = {ny}, got {nsubdomains}"),
            ));
        }
        if rank >= nsubdomains {
            return Err(FdtdError::configuration(
                "rank",
                format!("must be below nsubdomains = {nsubdomains}, got {rank}"),
            ));
        }
        whole_cells(nx, ny, mgn)?;

        let inside_global = Range::new([nx, ny], [0, 0]);
        let local_ny = ny / nsubdomains;
        let inside = Range::new([nx, local_ny], [0, (local_ny * rank) as isize]);

        Ok(Self {
            rank,
            nsubdomains,
            mgn,
            inside_global,
            whole_global: inside_global.with_margin(mgn),
            inside,
            whole: inside.with_margin(mgn),
        })
    }

    /// Geometries of every rank, in rank order
    pub fn partition(nx: usize, ny: usize, nsubdomains: usize, mgn: usize) -> FdtdResult<Vec<Self>> {
        (0..nsubdomains.max(1))
            .map(|rank| Self::new(nx, ny, nsubdomains, rank, mgn))
            .collect()
    }

    /// This rank's index
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of ranks
    pub fn nsubdomains(&self) -> usize {
        self.nsubdomains
    }

    /// Margin width in cells
    pub fn mgn(&self) -> usize {
        self.mgn
    }

    /// Physically meaningful block owned by this rank
    pub fn inside(&self) -> &Range {
        &self.inside
    }

    /// Local array extent including margins
    pub fn whole(&self) -> &Range {
        &self.whole
    }

    /// Physical region of the full domain
    pub fn inside_global(&self) -> &Range {
        &self.inside_global
    }

    /// Array extent of the full domain including margins
    pub fn whole_global(&self) -> &Range {
        &self.whole_global
    }

    /// Rank below (smaller axis-1 indices), `None` at the bottom of the domain
    pub fn prev_rank(&self) -> Option<usize> {
        self.rank.checked_sub(1)
    }

    /// Rank above (larger axis-1 indices), `None` at the top of the domain
    pub fn next_rank(&self) -> Option<usize> {
        (self.rank + 1 < self.nsubdomains).then_some(self.rank + 1)
    }

    /// Whether this rank's bottom margin is a physical PML boundary
    pub fn at_lower_boundary(&self) -> bool {
        self.prev_rank().is_none()
    }

    /// Whether this rank's top margin is a physical PML boundary
    pub fn at_upper_boundary(&self) -> bool {
        self.next_rank().is_none()
    }

    /// Width of the local arrays (row stride)
    #[inline]
    pub fn lnx(&self) -> usize {
        self.whole.length[0]
    }

    /// Number of cells in each local array
    #[inline]
    pub fn cells(&self) -> usize {
        self.whole.cells()
    }

    /// Flat index of local whole-relative cell `(ii, jj)`
    #[inline]
    pub fn index(&self, ii: usize, jj: usize) -> usize {
        jj * self.whole.length[0] + ii
    }

    /// Flat index of global cell `(i, j)`
    ///
    /// # Panics
    ///
    /// Panics if the cell lies outside this rank's whole range.
    #[inline]
    pub fn global_index(&self, i: isize, j: isize) -> usize {
        assert!(self.whole.contains(i, j), "Cell ({i}, {j}) outside local range");
        let ii = (i - self.whole.begin[0]) as usize;
        let jj = (j - self.whole.begin[1]) as usize;
        self.index(ii, jj)
    }

    /// Global indices of local whole-relative cell `(ii, jj)`
    #[inline]
    pub fn to_global(&self, ii: usize, jj: usize) -> (isize, isize) {
        (
            ii as isize + self.whole.begin[0],
            jj as isize + self.whole.begin[1],
        )
    }

    /// Local row of global row `j`
    #[inline]
    pub fn local_row(&self, j: isize) -> usize {
        (j - self.whole.begin[1]) as usize
    }

    /// Local row holding this rank's first inside row
    pub fn first_inside_row(&self) -> usize {
        self.local_row(self.inside.begin[1])
    }

    /// Local row holding this rank's last inside row
    pub fn last_inside_row(&self) -> usize {
        self.local_row(self.inside.end(1) - 1)
    }

    /// Local margin row directly below the inside block (receives Hz from below)
    pub fn lower_halo_row(&self) -> usize {
        self.first_inside_row() - 1
    }

    /// Local margin row directly above the inside block (receives Ex from above)
    pub fn upper_halo_row(&self) -> usize {
        self.last_inside_row() + 1
    }
}
