mod bitmap;

use bitmap::BitmapSink;
use clap::Parser;
use fdtd2d_core::{
    NullSink, RunConfig, Simulation, SimulationConfig, SlitScenario,
    SnapshotSink, Vacuum,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 2-D TE FDTD solver with PML boundaries
#[derive(Parser, Debug)]
#[command(name = "fdtd2d")]
#[command(about = "Plane wave through a slit, simulated with 2-D FDTD", long_about = None)]
struct Args {
    /// Global inside width in cells
    nx: usize,

    /// Global inside height in cells
    ny: usize,

    /// Number of horizontal slabs, each run on its own thread
    nsubdomains: usize,

    /// Number of iterations
    nt: u64,

    /// Snapshot interval (0 or negative disables output)
    #[arg(allow_negative_numbers = true)]
    nout: i64,

    /// Directory for the eNNNNN.bmp snapshots
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Run in empty space instead of the slit scenario
    #[arg(long)]
    vacuum: bool,
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = SimulationConfig::new(RunConfig {
        nx: args.nx,
        ny: args.ny,
        nsubdomains: args.nsubdomains,
        nt: args.nt,
        nout: args.nout,
    });

    let (lx, ly) = config.physical_extent();
    let simulation = if args.vacuum {
        Simulation::new(config, Vacuum)?
    } else {
        let scenario = SlitScenario::new(lx, ly);
        info!(
            "Slit scenario: {:.3e} x {:.3e} m, wedge permittivity {}",
            lx,
            ly,
            scenario.permittivity
        );
        Simulation::new(config, scenario)?
    };

    let mut sink: Box<dyn SnapshotSink> = match config.run.output_interval() {
        Some(_) => Box::new(BitmapSink::new(&args.output_dir)?),
        None => Box::new(NullSink),
    };

    let summary = simulation.run(sink.as_mut())?;
    info!(
        "Finished {} iterations, t = {:.4e} s, {} snapshots written",
        summary.iterations, summary.time, summary.snapshots_exported
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
