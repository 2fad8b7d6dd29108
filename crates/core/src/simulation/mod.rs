//! Run orchestration
//!
//! [`Simulation`] partitions the domain, builds one [`Subdomain`] per rank and
//! drives the time loop for exactly `nt` iterations. A single rank runs on the
//! calling thread with no exchange. Several ranks run on scoped threads, one
//! per rank, connected by [`ChannelExchange`]; their snapshot pieces are sent
//! back to the calling thread, gathered and handed to the [`SnapshotSink`].
//!
//! Snapshots are exported at iteration 0 and at every multiple of `nout`.

pub mod snapshot;
mod subdomain;
mod timer;

pub use snapshot::{NullSink, Snapshot, SnapshotBuffer, SnapshotPiece, SnapshotSink};
pub use subdomain::Subdomain;
pub use timer::RunTimer;

use crate::config::SimulationConfig;
use crate::error::{FdtdError, FdtdResult};
use crate::exchange::{ChannelExchange, HaloExchange, NoExchange};
use crate::grid::{GridGeometry, Range};
use crate::solver::fields::Component;
use crate::solver::material::MaterialScenario;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::sync::mpsc::{self, Sender};
use std::thread;
use tracing::{debug, info, warn};

/// Iterations between progress log lines
pub const PROGRESS_INTERVAL: u64 = 100;

type InitialField = Box<dyn Fn(isize, isize) -> f64 + Send + Sync>;

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Iterations executed
    pub iterations: u64,
    /// Simulated time at the end of the run (s)
    pub time: f64,
    /// Snapshots accepted by the sink
    pub snapshots_exported: u64,
    /// Snapshots the sink failed to write
    pub snapshots_failed: u64,
    /// Wall-clock duration of the time loop (s)
    pub elapsed_secs: f64,
}

/// Delivers gathered snapshots to the sink and counts the outcome
struct Exporter<'s> {
    sink: &'s mut dyn SnapshotSink,
    dx: f64,
    dy: f64,
    exported: u64,
    failed: u64,
}

impl Exporter<'_> {
    fn deliver(&mut self, buffer: &SnapshotBuffer, icnt: u64) {
        match self.sink.export(&buffer.view(icnt, self.dx, self.dy)) {
            Ok(()) => {
                self.exported += 1;
                debug!("Exported snapshot icnt = {}", icnt);
            }
            Err(err) => {
                self.failed += 1;
                warn!("Snapshot icnt = {} not written: {}", icnt, err);
            }
        }
    }
}

fn log_progress(icnt: u64, time: f64) {
    if icnt.is_multiple_of(PROGRESS_INTERVAL) {
        info!("icnt = {:5}, time = {:6.4e} [sec]", icnt, time);
    }
}

/// Insert `piece` and return the buffer once every rank has contributed
fn gather(
    pending: &mut FxHashMap<u64, SnapshotBuffer>,
    piece: &SnapshotPiece,
    whole_global: &Range,
    nranks: usize,
) -> FdtdResult<Option<SnapshotBuffer>> {
    let buffer = match pending.entry(piece.icnt) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => entry.insert(SnapshotBuffer::new(whole_global)?),
    };
    buffer.insert(piece)?;
    if buffer.pieces() < nranks {
        return Ok(None);
    }
    Ok(pending.remove(&piece.icnt))
}

/// Root cause among the errors of several ranks
///
/// Exchange errors are usually a consequence of another rank failing first.
fn root_cause(mut errors: Vec<FdtdError>) -> Option<FdtdError> {
    let index = errors
        .iter()
        .position(|e| !matches!(e, FdtdError::Exchange { .. }))
        .unwrap_or(0);
    (!errors.is_empty()).then(|| errors.swap_remove(index))
}

/// A configured FDTD run
pub struct Simulation {
    config: SimulationConfig,
    scenario: Box<dyn MaterialScenario>,
    initial: Vec<(Component, InitialField)>,
}

impl Simulation {
    /// Validate `config` and prepare a run over `scenario`
    ///
    /// Fails with [`FdtdError::Configuration`] before anything is allocated.
    pub fn new<S>(config: SimulationConfig, scenario: S) -> FdtdResult<Self>
    where
        S: MaterialScenario + 'static,
    {
        config.validate()?;
        Ok(Self {
            config,
            scenario: Box::new(scenario),
            initial: Vec::new(),
        })
    }

    /// Seed `component` inside the physical region with `f(i, j)` before the run
    #[must_use]
    pub fn with_initial_field<F>(mut self, component: Component, f: F) -> Self
    where
        F: Fn(isize, isize) -> f64 + Send + Sync + 'static,
    {
        self.initial.push((component, Box::new(f)));
        self
    }

    /// Configuration of this run
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Whether a snapshot is taken after iteration `icnt`
    pub fn exports_at(&self, icnt: u64) -> bool {
        self.config
            .run
            .output_interval()
            .is_some_and(|nout| icnt.is_multiple_of(nout))
    }

    /// Build and seed the subdomain of `geometry`
    pub fn subdomain(
        &self,
        geometry: GridGeometry,
        exchange: Box<dyn HaloExchange>,
    ) -> FdtdResult<Subdomain> {
        let mut sub = Subdomain::new(&self.config, geometry, self.scenario.as_ref(), exchange)?;
        for (component, f) in &self.initial {
            sub.initialize_inside(*component, f);
        }
        Ok(sub)
    }

    /// Run all `nt` iterations, exporting snapshots to `sink`
    pub fn run(&self, sink: &mut dyn SnapshotSink) -> FdtdResult<RunSummary> {
        let run = &self.config.run;
        let num = &self.config.numerics;

        info!(
            "FDTD run: {}x{} cells, {} subdomain(s), nt = {}, nout = {}",
            run.nx, run.ny, run.nsubdomains, run.nt, run.nout
        );
        info!(
            "dt = {:.4e} s, dx = {:.3e} m, dy = {:.3e} m, margin = {} cells",
            self.config.dt(),
            num.dx,
            num.dy,
            num.mgn
        );

        let geometries = GridGeometry::partition(run.nx, run.ny, run.nsubdomains, num.mgn)?;
        let mut exporter = Exporter {
            sink,
            dx: num.dx,
            dy: num.dy,
            exported: 0,
            failed: 0,
        };

        let timer = RunTimer::new("time loop");
        let (iterations, time) = match geometries.as_slice() {
            [single] => self.run_single(*single, &mut exporter)?,
            _ => self.run_ranks(geometries, &mut exporter)?,
        };

        let summary = RunSummary {
            iterations,
            time,
            snapshots_exported: exporter.exported,
            snapshots_failed: exporter.failed,
            elapsed_secs: timer.elapsed_secs(),
        };

        info!("------------------------------");
        info!("Domain      = {} x {}", run.nx, run.ny);
        info!("nsubdomains = {}", run.nsubdomains);
        info!(
            "Snapshots   = {} written, {} failed",
            summary.snapshots_exported, summary.snapshots_failed
        );
        info!("Time        = {:10.6} [sec]", summary.elapsed_secs);
        info!("------------------------------");

        Ok(summary)
    }

    fn run_single(&self, geometry: GridGeometry, exporter: &mut Exporter<'_>) -> FdtdResult<(u64, f64)> {
        let mut sub = self.subdomain(geometry, Box::new(NoExchange))?;
        let mut buffer = match self.config.run.output_interval() {
            Some(_) => Some(SnapshotBuffer::new(geometry.whole_global())?),
            None => None,
        };

        let mut export = |sub: &Subdomain, exporter: &mut Exporter<'_>| -> FdtdResult<()> {
            if let Some(buffer) = buffer.as_mut().filter(|_| self.exports_at(sub.icnt())) {
                buffer.insert(&sub.snapshot_piece())?;
                exporter.deliver(buffer, sub.icnt());
            }
            Ok(())
        };

        log_progress(sub.icnt(), sub.time());
        export(&sub, exporter)?;
        while sub.icnt() < self.config.run.nt {
            sub.step()?;
            log_progress(sub.icnt(), sub.time());
            export(&sub, exporter)?;
        }

        Ok((sub.icnt(), sub.time()))
    }

    fn run_ranks(
        &self,
        geometries: Vec<GridGeometry>,
        exporter: &mut Exporter<'_>,
    ) -> FdtdResult<(u64, f64)> {
        let nranks = geometries.len();
        let whole_global = *geometries[0].whole_global();
        let links = ChannelExchange::chain(nranks);
        let (piece_tx, piece_rx) = mpsc::channel::<SnapshotPiece>();

        thread::scope(|s| {
            let handles: Vec<_> = geometries
                .into_iter()
                .zip(links)
                .map(|(geometry, link)| {
                    let pieces = piece_tx.clone();
                    s.spawn(move || self.rank_worker(geometry, link, &pieces))
                })
                .collect();
            drop(piece_tx);

            // Keep draining after a failure so that no worker blocks on a full gather
            let mut pending = FxHashMap::default();
            let mut gather_error = None;
            for piece in piece_rx {
                match gather(&mut pending, &piece, &whole_global, nranks) {
                    Ok(Some(buffer)) => exporter.deliver(&buffer, piece.icnt),
                    Ok(None) => {}
                    Err(err) => {
                        gather_error.get_or_insert(err);
                    }
                }
            }

            let mut outcome = None;
            let mut errors = Vec::new();
            for (rank, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(state)) if rank == 0 => outcome = Some(state),
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => errors.push(err),
                    Err(_) => errors.push(FdtdError::RankPanicked { rank }),
                }
            }
            errors.extend(gather_error);

            match (root_cause(errors), outcome) {
                (Some(err), _) => Err(err),
                (None, Some(state)) => Ok(state),
                (None, None) => Err(FdtdError::RankPanicked { rank: 0 }),
            }
        })
    }

    fn rank_worker(
        &self,
        geometry: GridGeometry,
        link: ChannelExchange,
        pieces: &Sender<SnapshotPiece>,
    ) -> FdtdResult<(u64, f64)> {
        let rank = geometry.rank();
        let mut sub = self.subdomain(geometry, Box::new(link))?;

        let send = |sub: &Subdomain| -> FdtdResult<()> {
            if self.exports_at(sub.icnt()) {
                pieces
                    .send(sub.snapshot_piece())
                    .map_err(|_| FdtdError::exchange(rank, "snapshot collector hung up"))?;
            }
            Ok(())
        };

        if rank == 0 {
            log_progress(sub.icnt(), sub.time());
        }
        send(&sub)?;
        while sub.icnt() < self.config.run.nt {
            sub.step()?;
            if rank == 0 {
                log_progress(sub.icnt(), sub.time());
            }
            send(&sub)?;
        }

        debug!("Rank {} finished after {} iterations", rank, sub.icnt());
        Ok((sub.icnt(), sub.time()))
    }
}
