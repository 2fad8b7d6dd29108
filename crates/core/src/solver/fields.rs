//! Dense field buffers and the per-rank field state
//!
//! Every field is stored as a flat `Vec<f64>` over the rank's whole range in
//! row-major order, `index(i, j) = j * width + i`.

use crate::error::{FdtdError, FdtdResult};
use crate::grid::GridGeometry;

/// Allocate a zeroed buffer, reporting failure instead of aborting
pub(crate) fn try_zeroed<T: Clone + Default>(cells: usize) -> FdtdResult<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(cells)
        .map_err(|_| FdtdError::Allocation { cells })?;
    data.resize(cells, T::default());
    Ok(data)
}

/// Field data container
///
/// Stores 2D field data as a flat `Vec<f64>` in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldData {
    /// Field values in row-major order (y * width + x)
    pub data: Vec<f64>,
    /// Grid width in cells
    pub width: usize,
    /// Grid height in cells
    pub height: usize,
}

impl FieldData {
    /// Create a new field with given dimensions, initialized to zero
    ///
    /// # Arguments
    ///
    /// * `width` - Grid width in cells
    /// * `height` - Grid height in cells
    pub fn new(width: usize, height: usize) -> FdtdResult<Self> {
        Ok(Self {
            data: try_zeroed(width.saturating_mul(height))?,
            width,
            height,
        })
    }

    /// Create a new field with given dimensions, initialized to a value
    pub fn with_value(width: usize, height: usize, value: f64) -> FdtdResult<Self> {
        let mut field = Self::new(width, height)?;
        field.fill(value);
        Ok(field)
    }

    /// Zeroed field covering the whole range of `geometry`
    pub fn for_geometry(geometry: &GridGeometry) -> FdtdResult<Self> {
        let whole = geometry.whole();
        Self::new(whole.length[0], whole.length[1])
    }

    /// Flat index of cell `(x, y)`
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Get reference to field data
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Get mutable reference to field data
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Get value at grid position
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        assert!(
            x < self.width && y < self.height,
            "Coordinates out of bounds"
        );
        self.data[self.index(x, y)]
    }

    /// Set value at grid position
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        assert!(
            x < self.width && y < self.height,
            "Coordinates out of bounds"
        );
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Row `y` as a slice
    pub fn row(&self, y: usize) -> &[f64] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Row `y` as a mutable slice
    pub fn row_mut(&mut self, y: usize) -> &mut [f64] {
        &mut self.data[y * self.width..(y + 1) * self.width]
    }

    /// Rows `begin..end` as one contiguous slice
    pub fn rows(&self, begin: usize, end: usize) -> &[f64] {
        &self.data[begin * self.width..end * self.width]
    }

    /// Fill entire field with a value
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }
}

/// Which field component an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Electric field, x component
    Ex,
    /// Electric field, y component
    Ey,
    /// Magnetic field, z component
    Hz,
}

/// Ex, Ey, Hz and the four PML split components of one rank
#[derive(Debug, Clone, PartialEq)]
pub struct FieldState {
    /// Electric field x component (V/m)
    pub ex: FieldData,
    /// Electric field y component (V/m)
    pub ey: FieldData,
    /// Magnetic field z component (A/m)
    pub hz: FieldData,
    /// Split Ex driven by the y derivative of Hz
    pub exy: FieldData,
    /// Split Ey driven by the x derivative of Hz
    pub eyx: FieldData,
    /// Split Hz driven by the x derivative of Ey
    pub hzx: FieldData,
    /// Split Hz driven by the y derivative of Ex
    pub hzy: FieldData,
}

impl FieldState {
    /// All-zero state over the whole range of `geometry`
    pub fn new(geometry: &GridGeometry) -> FdtdResult<Self> {
        Ok(Self {
            ex: FieldData::for_geometry(geometry)?,
            ey: FieldData::for_geometry(geometry)?,
            hz: FieldData::for_geometry(geometry)?,
            exy: FieldData::for_geometry(geometry)?,
            eyx: FieldData::for_geometry(geometry)?,
            hzx: FieldData::for_geometry(geometry)?,
            hzy: FieldData::for_geometry(geometry)?,
        })
    }

    /// Visible field buffer for `component`
    pub fn component(&self, component: Component) -> &FieldData {
        match component {
            Component::Ex => &self.ex,
            Component::Ey => &self.ey,
            Component::Hz => &self.hz,
        }
    }

    /// Mutable visible field buffer for `component`
    pub fn component_mut(&mut self, component: Component) -> &mut FieldData {
        match component {
            Component::Ex => &mut self.ex,
            Component::Ey => &mut self.ey,
            Component::Hz => &mut self.hz,
        }
    }

    /// Whether every cell of every buffer is finite
    pub fn is_finite(&self) -> bool {
        [
            &self.ex, &self.ey, &self.hz, &self.exy, &self.eyx, &self.hzx, &self.hzy,
        ]
        .iter()
        .all(|f| f.data.iter().all(|v| v.is_finite()))
    }

    /// Electromagnetic energy over the inside block
    ///
    /// `Σ ε0·εr·(ex² + ey²) + μ0·hz²` in J/m per unit cell area, where `er`
    /// is the cell permittivity.
    pub fn inside_energy(&self, geometry: &GridGeometry, er: &FieldData, eps0: f64, mu0: f64) -> f64 {
        let inside = geometry.inside();
        let j0 = geometry.first_inside_row();
        let i0 = geometry.mgn();
        let mut energy = 0.0;
        for jj in j0..j0 + inside.length[1] {
            for ii in i0..i0 + inside.length[0] {
                let ix = geometry.index(ii, jj);
                let e2 = self.ex.data[ix] * self.ex.data[ix] + self.ey.data[ix] * self.ey.data[ix];
                energy += eps0 * er.data[ix] * e2 + mu0 * self.hz.data[ix] * self.hz.data[ix];
            }
        }
        energy
    }

    /// Largest absolute value of a visible component over the inside block
    pub fn inside_max_abs(&self, geometry: &GridGeometry, component: Component) -> f64 {
        let field = self.component(component);
        let inside = geometry.inside();
        let j0 = geometry.first_inside_row();
        let i0 = geometry.mgn();
        (j0..j0 + inside.length[1])
            .flat_map(|jj| (i0..i0 + inside.length[0]).map(move |ii| (ii, jj)))
            .map(|(ii, jj)| field.data[geometry.index(ii, jj)].abs())
            .fold(0.0, f64::max)
    }
}
