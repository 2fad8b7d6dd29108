//! Hard plane-wave source
//!
//! Overrides Ex along one global row with `a·sin(2π·f·t)`. The override is a
//! Dirichlet condition, not an additive current.

use super::fields::FieldData;
use crate::config::SimulationConfig;
use crate::grid::GridGeometry;

/// Sinusoidal Ex source on a fixed global row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceInjector {
    /// Global row index
    pub jpos: isize,
    /// Peak field (V/m)
    pub amplitude: f64,
    /// Angular frequency `2π·f` (rad/s)
    pub angular_frequency: f64,
}

impl SourceInjector {
    /// Source at global row `jpos`
    pub fn new(jpos: isize, amplitude: f64, angular_frequency: f64) -> Self {
        Self {
            jpos,
            amplitude,
            angular_frequency,
        }
    }

    /// Source described by the configuration's wavelength, amplitude and row
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(
            config.numerics.jpos,
            config.numerics.amplitude,
            2.0 * config.constants.pi * config.frequency(),
        )
    }

    /// Source value at `time`
    #[inline]
    pub fn value(&self, time: f64) -> f64 {
        self.amplitude * (self.angular_frequency * time).sin()
    }

    /// Overwrite Ex on the source row for all inside columns
    ///
    /// Returns `false` without touching `ex` when the row is not inside this
    /// rank's physical range.
    pub fn inject(&self, geometry: &GridGeometry, time: f64, ex: &mut FieldData) -> bool {
        let inside = geometry.inside();
        if self.jpos < inside.begin[1] || self.jpos >= inside.end(1) {
            return false;
        }

        let e = self.value(time);
        let i0 = geometry.mgn();
        let row = ex.row_mut(geometry.local_row(self.jpos));
        row[i0..i0 + inside.length[0]].fill(e);
        true
    }
}
