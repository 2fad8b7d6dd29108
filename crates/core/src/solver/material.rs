//! Relative permittivity and perfect-conductor objects over the grid

use super::fields::{try_zeroed, FieldData};
use crate::error::FdtdResult;
use crate::grid::GridGeometry;

/// Classification of one cell by a scenario
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CellMaterial {
    /// Cell is a perfect conductor
    pub object: bool,
    /// Relative permittivity override; `None` keeps the background value
    pub permittivity: Option<f64>,
}

/// Scenario-specific placement of objects and dielectrics
///
/// `x` and `y` are the physical coordinates of the cell center in meters,
/// `((i + 0.5)·dx, (j + 0.5)·dy)` for global cell `(i, j)`. Margin cells have
/// negative coordinates or coordinates beyond the physical extent.
pub trait MaterialScenario: Send + Sync {
    /// Classify the cell centered at `(x, y)`
    fn classify(&self, x: f64, y: f64) -> CellMaterial;

    /// Background relative permittivity
    fn background_permittivity(&self) -> f64 {
        1.0
    }
}

/// Empty space everywhere
#[derive(Debug, Clone, Copy, Default)]
pub struct Vacuum;

impl MaterialScenario for Vacuum {
    fn classify(&self, _x: f64, _y: f64) -> CellMaterial {
        CellMaterial::default()
    }
}

/// Conducting wall with a single aperture, followed by a dielectric wedge
///
/// The wall occupies `y0 ≤ y ≤ y1` with `y0 = 0.5·ly` and `y1 = y0 + 0.1·ly`,
/// except for the opening `x0 < x < x1` with `x0 = 0.45·lx`, `x1 = 0.55·lx`.
/// Cells with `y ≥ −0.25·(x − lx) + y1` are filled with `permittivity`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlitScenario {
    /// Physical width of the global inside region (m)
    pub lx: f64,
    /// Physical height of the global inside region (m)
    pub ly: f64,
    /// Relative permittivity of the wedge
    pub permittivity: f64,
}

impl SlitScenario {
    /// Scenario sized to a `lx × ly` domain with a glass-like wedge (εr = 5.4)
    pub fn new(lx: f64, ly: f64) -> Self {
        Self {
            lx,
            ly,
            permittivity: 5.4,
        }
    }
}

impl MaterialScenario for SlitScenario {
    fn classify(&self, x: f64, y: f64) -> CellMaterial {
        let y0 = 0.5 * self.ly;
        let y1 = y0 + 0.1 * self.ly;
        let x0 = 0.45 * self.lx;
        let x1 = 0.55 * self.lx;

        CellMaterial {
            object: y >= y0 && y <= y1 && (x <= x0 || x >= x1),
            permittivity: (y >= -0.25 * (x - self.lx) + y1).then_some(self.permittivity),
        }
    }
}

/// Permittivity and object mask over one rank's whole range
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialField {
    /// Relative permittivity per cell
    pub er: FieldData,
    /// Perfect-conductor flag per cell
    pub object: Vec<bool>,
}

impl MaterialField {
    /// Uniform background with no objects
    pub fn uniform(geometry: &GridGeometry, relative_permittivity: f64) -> FdtdResult<Self> {
        let whole = geometry.whole();
        Ok(Self {
            er: FieldData::with_value(whole.length[0], whole.length[1], relative_permittivity)?,
            object: try_zeroed(whole.cells())?,
        })
    }

    /// Material evaluated from `scenario` at global cell centers
    pub fn from_scenario(
        geometry: &GridGeometry,
        scenario: &dyn MaterialScenario,
        dx: f64,
        dy: f64,
    ) -> FdtdResult<Self> {
        let mut material = Self::uniform(geometry, scenario.background_permittivity())?;
        let whole = geometry.whole();

        for jj in 0..whole.length[1] {
            for ii in 0..whole.length[0] {
                let (i, j) = geometry.to_global(ii, jj);
                let x = (i as f64 + 0.5) * dx;
                let y = (j as f64 + 0.5) * dy;

                let cell = scenario.classify(x, y);
                let ix = geometry.index(ii, jj);
                if cell.object {
                    material.object[ix] = true;
                }
                if let Some(er) = cell.permittivity {
                    material.er.data[ix] = er;
                }
            }
        }

        Ok(material)
    }

    /// Number of object cells
    pub fn object_count(&self) -> usize {
        self.object.iter().filter(|&&o| o).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vacuum_is_uniform() {
        let g = GridGeometry::new(8, 8, 1, 0, 2).unwrap();
        let m = MaterialField::from_scenario(&g, &Vacuum, 1.0, 1.0).unwrap();
        assert_eq!(m.object_count(), 0);
        assert!(m.er.data.iter().all(|&e| e == 1.0));
    }

    #[test]
    fn test_slit_has_aperture() {
        let (nx, ny) = (40, 40);
        let g = GridGeometry::new(nx, ny, 1, 0, 8).unwrap();
        let scenario = SlitScenario::new(nx as f64, ny as f64);
        let m = MaterialField::from_scenario(&g, &scenario, 1.0, 1.0).unwrap();

        // Wall row at y = 20.5 (global j = 20)
        let wall = |i: isize| m.object[g.global_index(i, 20)];
        assert!(wall(0));
        assert!(wall(5));
        assert!(!wall(20), "aperture center must be open");
        assert!(wall(39));
        // Below the wall
        assert!(!m.object[g.global_index(5, 10)]);
    }

    #[test]
    fn test_slit_wedge_permittivity() {
        let scenario = SlitScenario::new(100.0, 100.0);
        // Far corner is inside the wedge
        assert_eq!(scenario.classify(99.5, 99.5).permittivity, Some(5.4));
        // Source region is vacuum
        assert_eq!(scenario.classify(50.0, 0.5).permittivity, None);
    }

    #[test]
    fn test_decomposed_material_matches_global() {
        let scenario = SlitScenario::new(16.0, 16.0);
        let single = GridGeometry::new(16, 16, 1, 0, 8).unwrap();
        let upper = GridGeometry::new(16, 16, 2, 1, 8).unwrap();
        let a = MaterialField::from_scenario(&single, &scenario, 1.0, 1.0).unwrap();
        let b = MaterialField::from_scenario(&upper, &scenario, 1.0, 1.0).unwrap();

        for j in 8..16 {
            for i in -8..24 {
                let ia = single.global_index(i, j);
                let ib = upper.global_index(i, j);
                assert_eq!(a.object[ia], b.object[ib]);
                assert_eq!(a.er.data[ia], b.er.data[ib]);
            }
        }
    }
}
