//! Leapfrog update multipliers derived from material and grid spacing
//!
//! Ex lives on horizontal cell edges and Ey on vertical ones, so each electric
//! coefficient averages the permittivity of the two cells sharing that edge.
//! On the first local row (Ex) or column (Ey) there is no backward neighbor and
//! the local value is used unaveraged.
//!
//! A cell that is an object, or whose backward neighbor along the coefficient's
//! axis is an object, gets a zero coefficient: the field on an obstacle face
//! never advances.

use super::fields::FieldData;
use super::material::MaterialField;
use crate::config::PhysicalConstants;
use crate::error::FdtdResult;
use crate::grid::GridGeometry;

/// Edge permittivity and object flag seen by Ex and Ey at one cell
#[derive(Debug, Clone, Copy, PartialEq)]
struct EdgeMaterial {
    er_ex: f64,
    er_ey: f64,
    obj_ex: bool,
    obj_ey: bool,
}

#[inline]
fn edge_material(material: &MaterialField, lnx: usize, ii: usize, jj: usize) -> EdgeMaterial {
    let ix = jj * lnx + ii;
    let er = &material.er.data;
    let obj = &material.object;

    let (er_ex, obj_ex) = if jj != 0 {
        let jm = ix - lnx;
        (0.5 * (er[ix] + er[jm]), obj[ix] || obj[jm])
    } else {
        (er[ix], obj[ix])
    };
    let (er_ey, obj_ey) = if ii != 0 {
        let im = ix - 1;
        (0.5 * (er[ix] + er[im]), obj[ix] || obj[im])
    } else {
        (er[ix], obj[ix])
    };

    EdgeMaterial {
        er_ex,
        er_ey,
        obj_ex,
        obj_ey,
    }
}

/// Per-cell leapfrog multipliers, immutable after setup
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCoefficients {
    /// `dt / (ε0·εr·dy)` for Ex
    pub cexly: FieldData,
    /// `dt / (ε0·εr·dx)` for Ey
    pub ceylx: FieldData,
    /// `dt / (μ0·dx)` for Hz
    pub chzlx: FieldData,
    /// `dt / (μ0·dy)` for Hz
    pub chzly: FieldData,
}

impl UpdateCoefficients {
    /// Derive coefficients from `material`
    pub fn new(
        geometry: &GridGeometry,
        material: &MaterialField,
        dt: f64,
        dx: f64,
        dy: f64,
        constants: &PhysicalConstants,
    ) -> FdtdResult<Self> {
        let mut cexly = FieldData::for_geometry(geometry)?;
        let mut ceylx = FieldData::for_geometry(geometry)?;
        let mut chzlx = FieldData::for_geometry(geometry)?;
        let mut chzly = FieldData::for_geometry(geometry)?;

        let whole = geometry.whole();
        let lnx = whole.length[0];
        let e0 = constants.eps0;
        let m0 = constants.mu0;

        for jj in 0..whole.length[1] {
            for ii in 0..lnx {
                let ix = jj * lnx + ii;
                let edge = edge_material(material, lnx, ii, jj);

                if material.object[ix] {
                    continue;
                }
                chzlx.data[ix] = dt / (m0 * dx);
                chzly.data[ix] = dt / (m0 * dy);
                if !edge.obj_ex {
                    cexly.data[ix] = dt / (e0 * edge.er_ex * dy);
                }
                if !edge.obj_ey {
                    ceylx.data[ix] = dt / (e0 * edge.er_ey * dx);
                }
            }
        }

        Ok(Self {
            cexly,
            ceylx,
            chzlx,
            chzly,
        })
    }
}

/// Reciprocal edge permittivity used inside PML strips
///
/// Same averaging and object rule as [`UpdateCoefficients`], inverted:
/// `1/εr` on free edges and `0` on edges touching an object.
#[derive(Debug, Clone, PartialEq)]
pub struct PmlPermittivity {
    /// `1/εr` at Ex positions
    pub rer_ex: FieldData,
    /// `1/εr` at Ey positions
    pub rer_ey: FieldData,
}

impl PmlPermittivity {
    /// Derive reciprocal permittivities from `material`
    pub fn new(geometry: &GridGeometry, material: &MaterialField) -> FdtdResult<Self> {
        let mut rer_ex = FieldData::for_geometry(geometry)?;
        let mut rer_ey = FieldData::for_geometry(geometry)?;

        let whole = geometry.whole();
        let lnx = whole.length[0];

        for jj in 0..whole.length[1] {
            for ii in 0..lnx {
                let ix = jj * lnx + ii;
                let edge = edge_material(material, lnx, ii, jj);
                rer_ex.data[ix] = if edge.obj_ex { 0.0 } else { 1.0 / edge.er_ex };
                rer_ey.data[ix] = if edge.obj_ey { 0.0 } else { 1.0 / edge.er_ey };
            }
        }

        Ok(Self { rer_ex, rer_ey })
    }
}
