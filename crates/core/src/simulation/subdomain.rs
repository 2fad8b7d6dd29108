//! One rank's slice of the domain: fields, tables and its exchange endpoint

use super::snapshot::SnapshotPiece;
use crate::config::{PhysicalConstants, SimulationConfig};
use crate::error::FdtdResult;
use crate::exchange::HaloExchange;
use crate::grid::GridGeometry;
use crate::solver::fields::{Component, FieldState};
use crate::solver::material::{MaterialField, MaterialScenario};
use crate::solver::stepper::Stepper;
use tracing::debug;

/// Field state and setup-time tables of one rank
pub struct Subdomain {
    geometry: GridGeometry,
    material: MaterialField,
    stepper: Stepper,
    fields: FieldState,
    exchange: Box<dyn HaloExchange>,
    constants: PhysicalConstants,
    icnt: u64,
    time: f64,
}

impl Subdomain {
    /// Allocate fields and build all tables for `geometry`
    pub fn new(
        config: &SimulationConfig,
        geometry: GridGeometry,
        scenario: &dyn MaterialScenario,
        exchange: Box<dyn HaloExchange>,
    ) -> FdtdResult<Self> {
        let num = &config.numerics;
        let material = MaterialField::from_scenario(&geometry, scenario, num.dx, num.dy)?;
        let stepper = Stepper::new(&geometry, &material, config)?;
        let fields = FieldState::new(&geometry)?;

        debug!(
            "Rank {}: inside rows [{}, {}), {} object cells, {} local cells",
            geometry.rank(),
            geometry.inside().begin[1],
            geometry.inside().end(1),
            material.object_count(),
            geometry.cells()
        );

        Ok(Self {
            geometry,
            material,
            stepper,
            fields,
            exchange,
            constants: config.constants,
            icnt: 0,
            time: 0.0,
        })
    }

    /// Overwrite `component` on every inside cell with `f(i, j)`
    ///
    /// `(i, j)` are global cell indices.
    pub fn initialize_inside<F>(&mut self, component: Component, f: F)
    where
        F: Fn(isize, isize) -> f64,
    {
        let geometry = self.geometry;
        let inside = geometry.inside();
        let field = self.fields.component_mut(component);
        for j in inside.begin[1]..inside.end(1) {
            for i in inside.begin[0]..inside.end(0) {
                field.data[geometry.global_index(i, j)] = f(i, j);
            }
        }
    }

    /// Run one leapfrog iteration
    pub fn step(&mut self) -> FdtdResult<()> {
        self.stepper.step(
            &self.geometry,
            &mut self.fields,
            self.exchange.as_mut(),
            &mut self.time,
        )?;
        self.icnt += 1;
        Ok(())
    }

    /// Copy this rank's inside rows for the snapshot gather
    pub fn snapshot_piece(&self) -> SnapshotPiece {
        SnapshotPiece::capture(&self.geometry, &self.fields, self.icnt, self.time)
    }

    /// Electromagnetic energy over this rank's inside block
    pub fn inside_energy(&self) -> f64 {
        self.fields.inside_energy(
            &self.geometry,
            &self.material.er,
            self.constants.eps0,
            self.constants.mu0,
        )
    }

    /// Extents of this rank
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Permittivity and object mask
    pub fn material(&self) -> &MaterialField {
        &self.material
    }

    /// Coefficient tables and time step
    pub fn stepper(&self) -> &Stepper {
        &self.stepper
    }

    /// Current fields
    pub fn fields(&self) -> &FieldState {
        &self.fields
    }

    /// Mutable access to the fields
    pub fn fields_mut(&mut self) -> &mut FieldState {
        &mut self.fields
    }

    /// Iterations completed
    pub fn icnt(&self) -> u64 {
        self.icnt
    }

    /// Simulated time (s)
    pub fn time(&self) -> f64 {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::exchange::NoExchange;
    use crate::solver::material::Vacuum;

    fn subdomain(nx: usize, ny: usize) -> Subdomain {
        let mut cfg = SimulationConfig::new(RunConfig {
            nx,
            ny,
            nsubdomains: 1,
            nt: 0,
            nout: 0,
        });
        cfg.numerics.mgn = 4;
        let g = GridGeometry::new(nx, ny, 1, 0, 4).unwrap();
        Subdomain::new(&cfg, g, &Vacuum, Box::new(NoExchange)).unwrap()
    }

    #[test]
    fn test_initialize_inside_leaves_margin() {
        let mut sub = subdomain(6, 6);
        sub.initialize_inside(Component::Hz, |i, j| (i + 10 * j) as f64);

        let g = *sub.geometry();
        let hz = &sub.fields().hz;
        assert_eq!(hz.data[g.global_index(2, 3)], 32.0);
        assert_eq!(hz.data[g.global_index(-1, 3)], 0.0);
        assert_eq!(hz.data[g.global_index(2, 6)], 0.0);
    }

    #[test]
    fn test_step_counts_iterations() {
        let mut sub = subdomain(6, 6);
        for _ in 0..5 {
            sub.step().unwrap();
        }
        assert_eq!(sub.icnt(), 5);
        approx::assert_relative_eq!(sub.time(), 5.0 * sub.stepper().dt(), max_relative = 1e-12);
        assert_eq!(sub.snapshot_piece().icnt, 5);
    }

    #[test]
    fn test_energy_of_seeded_field() {
        let mut sub = subdomain(4, 4);
        assert_eq!(sub.inside_energy(), 0.0);
        sub.initialize_inside(Component::Hz, |_, _| 1.0);
        let mu0 = PhysicalConstants::default().mu0;
        approx::assert_relative_eq!(sub.inside_energy(), 16.0 * mu0, max_relative = 1e-14);
        assert_eq!(sub.material().object_count(), 0);
    }
}
