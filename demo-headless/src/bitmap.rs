//! 8-bit indexed BMP writer for Ex snapshots
//!
//! Values are mapped linearly from `[min, max]` onto the palette and clamped
//! to `[2/256, 1 - 2/256]`, so the two outermost entries at each end are never
//! used. Rows are written bottom-up, which matches the solver's row order.

use fdtd2d_core::{FdtdError, FdtdResult, Snapshot, SnapshotSink};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const FILE_HEADER_SIZE: u32 = 14;
const INFO_HEADER_SIZE: u32 = 40;
const PALETTE_SIZE: u32 = 256 * 4;

/// Seismic color map stops: position, then RGB in `[0, 1]`
const SEISMIC: [(f64, [f64; 3]); 5] = [
    (0.00, [0.0, 0.0, 0.3]),
    (0.25, [0.0, 0.0, 1.0]),
    (0.50, [1.0, 1.0, 1.0]),
    (0.75, [1.0, 0.0, 0.0]),
    (1.00, [0.5, 0.0, 0.0]),
];

/// 256-entry blue-white-red palette as BGRA quads
pub fn seismic_palette() -> [[u8; 4]; 256] {
    let mut palette = [[0_u8; 4]; 256];
    for (index, entry) in palette.iter_mut().enumerate() {
        let p = index as f64 / 255.0;
        let upper = SEISMIC
            .iter()
            .position(|&(stop, _)| stop >= p)
            .unwrap_or(SEISMIC.len() - 1)
            .max(1);
        let (p0, c0) = SEISMIC[upper - 1];
        let (p1, c1) = SEISMIC[upper];
        let w = (p - p0) / (p1 - p0);
        let channel = |k: usize| ((c0[k] + w * (c1[k] - c0[k])) * 255.0).round() as u8;
        *entry = [channel(2), channel(1), channel(0), 0];
    }
    palette
}

/// Palette index of `value` for the display range `[min, max]`
pub fn pixel_index(value: f64, min: f64, max: f64) -> u8 {
    const EDGE: f64 = 2.0 / 256.0;
    let p = ((value - min) / (max - min)).clamp(EDGE, 1.0 - EDGE);
    (p.clamp(0.0, 1.0) * 255.0) as u8
}

/// Row length in bytes, padded to a multiple of four
fn line_size(width: usize) -> usize {
    width.div_ceil(4) * 4
}

/// Encode a `width × height` row-major field as an 8-bit BMP
pub fn encode(
    width: usize,
    height: usize,
    values: &[f64],
    min: f64,
    max: f64,
    palette: &[[u8; 4]; 256],
) -> Vec<u8> {
    let line = line_size(width);
    let image_size = (line * height) as u32;
    let offset = FILE_HEADER_SIZE + INFO_HEADER_SIZE + PALETTE_SIZE;

    let mut out = Vec::with_capacity(offset as usize + image_size as usize);

    // File header
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(offset + image_size).to_le_bytes());
    out.extend_from_slice(&0_u16.to_le_bytes());
    out.extend_from_slice(&0_u16.to_le_bytes());
    out.extend_from_slice(&offset.to_le_bytes());

    // Info header
    out.extend_from_slice(&INFO_HEADER_SIZE.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes());
    out.extend_from_slice(&1_u16.to_le_bytes());
    out.extend_from_slice(&8_u16.to_le_bytes());
    out.extend_from_slice(&0_u32.to_le_bytes()); // no compression
    out.extend_from_slice(&image_size.to_le_bytes());
    out.extend_from_slice(&0_i32.to_le_bytes());
    out.extend_from_slice(&0_i32.to_le_bytes());
    out.extend_from_slice(&0_u32.to_le_bytes());
    out.extend_from_slice(&0_u32.to_le_bytes());

    for entry in palette {
        out.extend_from_slice(entry);
    }

    for row in values.chunks_exact(width).take(height) {
        out.extend(row.iter().map(|&v| pixel_index(v, min, max)));
        out.resize(out.len() + line - width, 0);
    }

    out
}

/// Writes the Ex component of every snapshot to `<dir>/eNNNNN.bmp`
pub struct BitmapSink {
    dir: PathBuf,
    palette: [[u8; 4]; 256],
    min: f64,
    max: f64,
}

impl BitmapSink {
    /// Sink writing into `dir`, created if missing
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        create_dir_all(&dir)?;
        Ok(Self {
            dir,
            palette: seismic_palette(),
            min: -100.0,
            max: 100.0,
        })
    }

    /// File name of snapshot `icnt`
    pub fn path(&self, icnt: u64) -> PathBuf {
        self.dir.join(format!("e{icnt:05}.bmp"))
    }

    fn write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(bytes)?;
        writer.flush()
    }
}

impl SnapshotSink for BitmapSink {
    fn export(&mut self, snapshot: &Snapshot<'_>) -> FdtdResult<()> {
        let [width, height] = snapshot.extent;
        let bytes = encode(width, height, snapshot.ex, self.min, self.max, &self.palette);
        let path = self.path(snapshot.icnt);
        Self::write(&path, &bytes)
            .map_err(|e| FdtdError::export(snapshot.icnt, format!("{}: {e}", path.display())))
    }
}
