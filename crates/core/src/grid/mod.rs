//! Grid extents and slab decomposition

pub mod geometry;
pub mod range;

pub use geometry::{whole_cells, GridGeometry};
pub use range::Range;
