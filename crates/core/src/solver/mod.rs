//! TE-mode FDTD field solver
//!
//! Fields live on a Yee grid: Ex on horizontal cell edges, Ey on vertical cell
//! edges and Hz at cell centers, half a cell and half a step ahead of E.
//! Everything here works on one rank's `whole` range and knows nothing about
//! threads; the exchange of halo rows is injected by the caller.
//!
//! # Layout
//!
//! - [`fields`]: flat row-major buffers and the per-rank field state
//! - [`material`]: permittivity and perfect-conductor mask
//! - [`coefficients`]: interior leapfrog multipliers
//! - [`pml`]: graded absorbing margin
//! - [`source`]: hard plane-wave source
//! - [`stepper`]: update kernels and the per-iteration sequence
//!
//! # Example
//!
//! ```rust,ignore
//! use fdtd2d_core::exchange::NoExchange;
//! use fdtd2d_core::solver::{FieldState, MaterialField, Stepper};
//!
//! let material = MaterialField::uniform(&geometry, 1.0)?;
//! let stepper = Stepper::new(&geometry, &material, &config)?;
//! let mut fields = FieldState::new(&geometry)?;
//! let mut time = 0.0;
//! stepper.step(&geometry, &mut fields, &mut NoExchange, &mut time)?;
//! ```

pub mod coefficients;
pub mod fields;
pub mod material;
pub mod pml;
pub mod source;
pub mod stepper;

// Re-exports
pub use coefficients::{PmlPermittivity, UpdateCoefficients};
pub use fields::{Component, FieldData, FieldState};
pub use material::{CellMaterial, MaterialField, MaterialScenario, SlitScenario, Vacuum};
pub use pml::{PmlBoundary, PmlRect, PmlTable, Side};
pub use source::SourceInjector;
pub use stepper::{update_e, update_h, Stepper};
