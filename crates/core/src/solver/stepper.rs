//! Leapfrog time stepping
//!
//! One iteration runs, in this order:
//!
//! ```text
//! exchange Hz → update E → PML E → source → t += dt/2
//! exchange Ex → update H → PML H → t += dt/2
//! ```
//!
//! The E phase reads only Hz and writes only Ex/Ey; the H phase is the
//! reverse. Rows are therefore updated in parallel with Rayon without any
//! synchronization inside a phase.

use super::coefficients::{PmlPermittivity, UpdateCoefficients};
use super::fields::FieldState;
use super::material::MaterialField;
use super::pml::PmlBoundary;
use super::source::SourceInjector;
use crate::config::SimulationConfig;
use crate::error::FdtdResult;
use crate::exchange::{exchange_ex, exchange_hz, HaloExchange};
use crate::grid::GridGeometry;
use rayon::prelude::*;

/// Advance Ex and Ey over the inside block
///
/// Ex covers `ny + 1` rows at the top of the domain and `ny` rows below a
/// seam, where the upper rank owns the shared row. Ey covers `nx + 1` columns.
pub fn update_e(geometry: &GridGeometry, coefficients: &UpdateCoefficients, fields: &mut FieldState) {
    let inside = geometry.inside();
    let (nx, ny) = (inside.length[0], inside.length[1]);
    let lnx = geometry.lnx();
    let i0 = geometry.mgn();
    let j0 = geometry.first_inside_row();
    let ex_rows = ny + usize::from(geometry.at_upper_boundary());

    let FieldState { ex, ey, hz, .. } = fields;
    let hz = &hz.data;

    let cexly = &coefficients.cexly.data;
    ex.data
        .par_chunks_mut(lnx)
        .enumerate()
        .skip(j0)
        .take(ex_rows)
        .for_each(|(jj, row)| {
            for ii in i0..i0 + nx {
                let ix = jj * lnx + ii;
                let jm = ix - lnx;
                row[ii] += cexly[ix] * (hz[ix] - hz[jm]);
            }
        });

    let ceylx = &coefficients.ceylx.data;
    ey.data
        .par_chunks_mut(lnx)
        .enumerate()
        .skip(j0)
        .take(ny)
        .for_each(|(jj, row)| {
            for ii in i0..=i0 + nx {
                let ix = jj * lnx + ii;
                let im = ix - 1;
                row[ii] += -ceylx[ix] * (hz[ix] - hz[im]);
            }
        });
}

/// Advance Hz over the inside block
pub fn update_h(geometry: &GridGeometry, coefficients: &UpdateCoefficients, fields: &mut FieldState) {
    let inside = geometry.inside();
    let (nx, ny) = (inside.length[0], inside.length[1]);
    let lnx = geometry.lnx();
    let i0 = geometry.mgn();
    let j0 = geometry.first_inside_row();

    let FieldState { ex, ey, hz, .. } = fields;
    let (ex, ey) = (&ex.data, &ey.data);
    let chzlx = &coefficients.chzlx.data;
    let chzly = &coefficients.chzly.data;

    hz.data
        .par_chunks_mut(lnx)
        .enumerate()
        .skip(j0)
        .take(ny)
        .for_each(|(jj, row)| {
            for ii in i0..i0 + nx {
                let ix = jj * lnx + ii;
                let ip = ix + 1;
                let jp = ix + lnx;
                row[ii] += -chzlx[ix] * (ey[ip] - ey[ix]) + chzly[ix] * (ex[jp] - ex[ix]);
            }
        });
}

/// Setup-time tables and the per-iteration sequence of one rank
#[derive(Debug, Clone)]
pub struct Stepper {
    coefficients: UpdateCoefficients,
    pml: PmlBoundary,
    source: Option<SourceInjector>,
    dt: f64,
}

impl Stepper {
    /// Build coefficient and PML tables for `material`
    pub fn new(
        geometry: &GridGeometry,
        material: &MaterialField,
        config: &SimulationConfig,
    ) -> FdtdResult<Self> {
        let dt = config.dt();
        let num = &config.numerics;
        let coefficients =
            UpdateCoefficients::new(geometry, material, dt, num.dx, num.dy, &config.constants)?;
        let rer = PmlPermittivity::new(geometry, material)?;
        let pml = PmlBoundary::new(geometry, rer, dt, &config.constants, num)?;
        let source = num
            .source_enabled
            .then(|| SourceInjector::from_config(config));

        Ok(Self {
            coefficients,
            pml,
            source,
            dt,
        })
    }

    /// Time step (s)
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Interior update multipliers
    pub fn coefficients(&self) -> &UpdateCoefficients {
        &self.coefficients
    }

    /// PML tables and margin partition
    pub fn pml(&self) -> &PmlBoundary {
        &self.pml
    }

    /// Plane-wave source, if enabled
    pub fn source(&self) -> Option<&SourceInjector> {
        self.source.as_ref()
    }

    /// Run one full iteration, advancing `time` by `dt`
    pub fn step(
        &self,
        geometry: &GridGeometry,
        fields: &mut FieldState,
        exchange: &mut dyn HaloExchange,
        time: &mut f64,
    ) -> FdtdResult<()> {
        exchange_hz(geometry, &mut fields.hz, exchange)?;
        update_e(geometry, &self.coefficients, fields);
        self.pml.correct_e(fields);
        if let Some(source) = &self.source {
            source.inject(geometry, *time, &mut fields.ex);
        }
        *time += 0.5 * self.dt;

        exchange_ex(geometry, &mut fields.ex, exchange)?;
        update_h(geometry, &self.coefficients, fields);
        self.pml.correct_h(fields);
        *time += 0.5 * self.dt;

        Ok(())
    }
}
