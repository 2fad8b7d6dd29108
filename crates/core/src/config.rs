//! Run configuration and physical constants
//!
//! All constants are carried in immutable values threaded through component
//! constructors. Nothing in the solver reads global mutable state.

use crate::error::{FdtdError, FdtdResult};
use crate::grid::whole_cells;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// SI vacuum constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalConstants {
    /// π
    pub pi: f64,
    /// Speed of light in vacuum (m/s)
    pub c: f64,
    /// Vacuum permeability μ0 (H/m)
    pub mu0: f64,
    /// Vacuum permittivity ε0 (F/m)
    pub eps0: f64,
    /// Vacuum impedance z0 = μ0·c (Ω)
    pub z0: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        let c = 2.99792458e8;
        let mu0 = 4.0 * PI * 1.0e-7;
        Self {
            pi: PI,
            c,
            mu0,
            eps0: 1.0 / (mu0 * c * c),
            z0: mu0 * c,
        }
    }
}

/// Discretization, boundary and source parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericalParams {
    /// PML margin width in cells on each side of the physical region
    pub mgn: usize,
    /// Grading exponent of the PML conductivity profile
    pub pml_order: f64,
    /// Target normal-incidence reflection of the PML
    pub reflection: f64,
    /// Cell size along x (m)
    pub dx: f64,
    /// Cell size along y (m)
    pub dy: f64,
    /// Fraction of the 2-D Courant limit used for dt
    pub courant: f64,
    /// Source wavelength (m)
    pub wavelength: f64,
    /// Source amplitude (V/m)
    pub amplitude: f64,
    /// Global row of the plane-wave source
    pub jpos: isize,
    /// Whether the plane-wave source is driven at all
    pub source_enabled: bool,
}

impl Default for NumericalParams {
    fn default() -> Self {
        Self {
            mgn: 8,
            pml_order: 3.0,
            reflection: 1.0e-11,
            dx: 10.0e-9,
            dy: 10.0e-9,
            courant: 0.2,
            wavelength: 500.0e-9,
            amplitude: 80.0,
            jpos: 0,
            source_enabled: true,
        }
    }
}

/// Grid size, decomposition and loop length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Global inside width in cells
    pub nx: usize,
    /// Global inside height in cells
    pub ny: usize,
    /// Number of slices along axis 1
    pub nsubdomains: usize,
    /// Total iterations
    pub nt: u64,
    /// Snapshot interval; `<= 0` disables export
    pub nout: i64,
}

impl RunConfig {
    /// Snapshot interval, or `None` when export is disabled
    pub fn output_interval(&self) -> Option<u64> {
        u64::try_from(self.nout).ok().filter(|&n| n > 0)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            nx: 256,
            ny: 256,
            nsubdomains: 1,
            nt: 1000,
            nout: 0,
        }
    }
}

/// Complete, immutable simulation configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Grid and loop parameters
    pub run: RunConfig,
    /// Discretization and source parameters
    pub numerics: NumericalParams,
    /// Physical constants
    pub constants: PhysicalConstants,
}

impl SimulationConfig {
    /// Configuration with default numerics for the given run parameters
    pub fn new(run: RunConfig) -> Self {
        Self {
            run,
            ..Self::default()
        }
    }

    /// Time step: `courant / (c·√(1/dx² + 1/dy²))`
    pub fn dt(&self) -> f64 {
        let rdx = 1.0 / self.numerics.dx;
        let rdy = 1.0 / self.numerics.dy;
        self.numerics.courant / (self.constants.c * (rdx * rdx + rdy * rdy).sqrt())
    }

    /// Source frequency in Hz
    pub fn frequency(&self) -> f64 {
        self.constants.c / self.numerics.wavelength
    }

    /// Physical length of the global inside region `(lx, ly)` in meters
    pub fn physical_extent(&self) -> (f64, f64) {
        (
            self.numerics.dx * self.run.nx as f64,
            self.numerics.dy * self.run.ny as f64,
        )
    }

    /// Reject configurations that cannot be run
    ///
    /// Called before any buffer is allocated.
    pub fn validate(&self) -> FdtdResult<()> {
        let run = &self.run;
        let num = &self.numerics;

        if run.nx == 0 {
            return Err(FdtdError::configuration("nx", "must be positive"));
        }
        if run.ny == 0 {
            return Err(FdtdError::configuration("ny", "must be positive"));
        }
        if run.nsubdomains == 0 {
            return Err(FdtdError::configuration("nsubdomains", "must be positive"));
        }
        if !run.ny.is_multiple_of(run.nsubdomains) {
            return Err(FdtdError::configuration(
                "nsubdomains",
                format!(
                    "must evenly divide ny = {}, got {}",
                    run.ny, run.nsubdomains
                ),
            ));
        }
        if num.mgn == 0 {
            return Err(FdtdError::configuration("mgn", "must be positive"));
        }
        whole_cells(run.nx, run.ny, num.mgn)?;
        for (name, value) in [("dx", num.dx), ("dy", num.dy), ("wavelength", num.wavelength)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(FdtdError::configuration(
                    name,
                    format!("must be finite and positive, got {value}"),
                ));
            }
        }
        if !(num.courant > 0.0 && num.courant <= 1.0) {
            return Err(FdtdError::configuration(
                "courant",
                format!("must lie in (0, 1], got {}", num.courant),
            ));
        }
        if !(num.reflection > 0.0 && num.reflection < 1.0) {
            return Err(FdtdError::configuration(
                "reflection",
                format!("must lie in (0, 1), got {}", num.reflection),
            ));
        }
        if !num.amplitude.is_finite() {
            return Err(FdtdError::configuration("amplitude", "must be finite"));
        }
        Ok(())
    }
}
