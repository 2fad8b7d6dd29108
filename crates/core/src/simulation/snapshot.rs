//! Snapshot gather and the export hook
//!
//! Each rank contributes its inside rows at full local width. The rows are
//! copied into a buffer the size of the global whole extent, so margin rows of
//! the gathered arrays stay zero.

use crate::error::{FdtdError, FdtdResult};
use crate::grid::{GridGeometry, Range};
use crate::solver::fields::{try_zeroed, FieldState};

/// Gathered Ex/Ey/Hz of the global domain at one iteration
///
/// Arrays are row-major over `extent` (the global whole range).
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    /// Iteration index
    pub icnt: u64,
    /// Simulated time (s)
    pub time: f64,
    /// `[width, height]` of the arrays in cells
    pub extent: [usize; 2],
    /// Cell size along x (m)
    pub dx: f64,
    /// Cell size along y (m)
    pub dy: f64,
    /// Electric field x component
    pub ex: &'a [f64],
    /// Electric field y component
    pub ey: &'a [f64],
    /// Magnetic field z component
    pub hz: &'a [f64],
}

/// Receiver of gathered snapshots, such as an image writer
///
/// Called on the thread that drives [`crate::Simulation::run`], once per export
/// index in increasing order. An error is logged and counted; it never stops
/// the run.
pub trait SnapshotSink {
    /// Consume one snapshot
    fn export(&mut self, snapshot: &Snapshot<'_>) -> FdtdResult<()>;
}

/// Sink that discards every snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn export(&mut self, _snapshot: &Snapshot<'_>) -> FdtdResult<()> {
        Ok(())
    }
}

impl<F> SnapshotSink for F
where
    F: FnMut(&Snapshot<'_>) -> FdtdResult<()>,
{
    fn export(&mut self, snapshot: &Snapshot<'_>) -> FdtdResult<()> {
        self(snapshot)
    }
}

/// Inside rows of one rank at one iteration
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPiece {
    /// Contributing rank
    pub rank: usize,
    /// Iteration index
    pub icnt: u64,
    /// Simulated time (s)
    pub time: f64,
    /// Flat offset of the first row in the global buffer
    pub offset: usize,
    /// Ex rows
    pub ex: Vec<f64>,
    /// Ey rows
    pub ey: Vec<f64>,
    /// Hz rows
    pub hz: Vec<f64>,
}

impl SnapshotPiece {
    /// Copy the inside rows of `fields`
    pub fn capture(geometry: &GridGeometry, fields: &FieldState, icnt: u64, time: f64) -> Self {
        let begin = geometry.first_inside_row();
        let end = geometry.last_inside_row() + 1;
        let global_row = geometry.inside().begin[1] - geometry.whole_global().begin[1];

        Self {
            rank: geometry.rank(),
            icnt,
            time,
            offset: geometry.lnx() * global_row as usize,
            ex: fields.ex.rows(begin, end).to_vec(),
            ey: fields.ey.rows(begin, end).to_vec(),
            hz: fields.hz.rows(begin, end).to_vec(),
        }
    }
}

/// Global-extent buffers filled piece by piece
#[derive(Debug, Clone)]
pub struct SnapshotBuffer {
    extent: [usize; 2],
    ex: Vec<f64>,
    ey: Vec<f64>,
    hz: Vec<f64>,
    pieces: usize,
    time: f64,
}

impl SnapshotBuffer {
    /// Zeroed buffer over `whole_global`
    pub fn new(whole_global: &Range) -> FdtdResult<Self> {
        let cells = whole_global.cells();
        Ok(Self {
            extent: whole_global.length,
            ex: try_zeroed(cells)?,
            ey: try_zeroed(cells)?,
            hz: try_zeroed(cells)?,
            pieces: 0,
            time: 0.0,
        })
    }

    /// Copy `piece` into place
    pub fn insert(&mut self, piece: &SnapshotPiece) -> FdtdResult<()> {
        let end = piece.offset + piece.ex.len();
        if end > self.ex.len() || piece.ey.len() != piece.ex.len() || piece.hz.len() != piece.ex.len() {
            return Err(FdtdError::exchange(
                piece.rank,
                format!("snapshot piece [{}, {end}) does not fit the global buffer", piece.offset),
            ));
        }
        self.ex[piece.offset..end].copy_from_slice(&piece.ex);
        self.ey[piece.offset..end].copy_from_slice(&piece.ey);
        self.hz[piece.offset..end].copy_from_slice(&piece.hz);
        if piece.rank == 0 {
            self.time = piece.time;
        }
        self.pieces += 1;
        Ok(())
    }

    /// Number of pieces inserted so far
    pub fn pieces(&self) -> usize {
        self.pieces
    }

    /// Borrow the gathered arrays as a snapshot
    pub fn view(&self, icnt: u64, dx: f64, dy: f64) -> Snapshot<'_> {
        Snapshot {
            icnt,
            time: self.time,
            extent: self.extent,
            dx,
            dy,
            ex: &self.ex,
            ey: &self.ey,
            hz: &self.hz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pieces_land_on_their_rows() {
        let parts = GridGeometry::partition(4, 4, 2, 2).unwrap();
        let mut buffer = SnapshotBuffer::new(parts[0].whole_global()).unwrap();
        assert_eq!(buffer.view(0, 1.0, 1.0).extent, [9, 9]);

        for g in &parts {
            let mut fields = FieldState::new(g).unwrap();
            fields.ex.fill(1.0 + g.rank() as f64);
            let piece = SnapshotPiece::capture(g, &fields, 7, 0.5);
            assert_eq!(piece.ex.len(), 2 * 9);
            buffer.insert(&piece).unwrap();
        }
        assert_eq!(buffer.pieces(), 2);

        let snap = buffer.view(7, 1.0, 1.0);
        assert_eq!(snap.time, 0.5);
        let row = |j: usize| &snap.ex[j * 9..(j + 1) * 9];
        // Global rows 0..2 come from rank 0, 2..4 from rank 1, margins stay zero
        assert!(row(1).iter().all(|&v| v == 0.0));
        assert!(row(2).iter().all(|&v| v == 1.0));
        assert!(row(3).iter().all(|&v| v == 1.0));
        assert!(row(4).iter().all(|&v| v == 2.0));
        assert!(row(5).iter().all(|&v| v == 2.0));
        assert!(row(6).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_oversized_piece_is_rejected() {
        let g = GridGeometry::new(4, 4, 1, 0, 2).unwrap();
        let mut buffer = SnapshotBuffer::new(g.whole_global()).unwrap();
        let piece = SnapshotPiece {
            rank: 0,
            icnt: 0,
            time: 0.0,
            offset: 80,
            ex: vec![0.0; 9],
            ey: vec![0.0; 9],
            hz: vec![0.0; 9],
        };
        assert!(buffer.insert(&piece).is_err());
    }

    #[test]
    fn test_closure_sink() {
        let g = GridGeometry::new(2, 2, 1, 0, 1).unwrap();
        let buffer = SnapshotBuffer::new(g.whole_global()).unwrap();
        let mut seen = Vec::new();
        let mut sink = |s: &Snapshot<'_>| -> FdtdResult<()> {
            seen.push(s.icnt);
            Ok(())
        };
        sink.export(&buffer.view(3, 1.0, 1.0)).unwrap();
        NullSink.export(&buffer.view(4, 1.0, 1.0)).unwrap();
        assert_eq!(seen, vec![3]);
    }
}
