//! Two-dimensional FDTD electromagnetic solver
//!
//! Advances the transverse-electric fields Ex, Ey and Hz with the Yee
//! leapfrog scheme. The physical region is framed by a split-field perfectly
//! matched layer and may be cut into horizontal slabs that run on separate
//! threads and trade halo rows every iteration.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use fdtd2d_core::{NullSink, RunConfig, Simulation, SimulationConfig, SlitScenario};
//!
//! let config = SimulationConfig::new(RunConfig { nx: 256, ny: 256, nsubdomains: 2, nt: 1000, nout: 0 });
//! let (lx, ly) = config.physical_extent();
//! let summary = Simulation::new(config, SlitScenario::new(lx, ly))?.run(&mut NullSink)?;
//! ```

pub mod config;
pub mod error;
pub mod exchange;
pub mod grid;
pub mod simulation;
pub mod solver;

// Re-export configuration and errors
pub use config::{NumericalParams, PhysicalConstants, RunConfig, SimulationConfig};
pub use error::{FdtdError, FdtdResult};

// Re-export the solver surface
pub use exchange::{ChannelExchange, HaloExchange, NoExchange};
pub use grid::{GridGeometry, Range};
pub use simulation::{
    NullSink, RunSummary, Simulation, Snapshot, SnapshotSink, Subdomain, PROGRESS_INTERVAL,
};
pub use solver::{
    CellMaterial, Component, FieldData, FieldState, MaterialField, MaterialScenario, SlitScenario,
    Vacuum,
};
