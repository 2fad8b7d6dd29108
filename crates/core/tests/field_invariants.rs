//! Long-run behavior of a single subdomain: no spontaneous fields, bounded and
//! decaying energy with the PML active, and a clean end-to-end run.
use fdtd2d_core::{
    Component, GridGeometry, NoExchange, NullSink, RunConfig, Simulation, SimulationConfig,
    SlitScenario, Subdomain, Vacuum,
};

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config(nx: usize, ny: usize, nt: u64) -> SimulationConfig {
    SimulationConfig::new(RunConfig {
        nx,
        ny,
        nsubdomains: 1,
        nt,
        nout: 0,
    })
}

fn single(config: &SimulationConfig, scenario: &dyn fdtd2d_core::MaterialScenario) -> Subdomain {
    let run = &config.run;
    let geometry = GridGeometry::new(run.nx, run.ny, 1, 0, config.numerics.mgn).unwrap();
    Subdomain::new(config, geometry, scenario, Box::new(NoExchange)).unwrap()
}

#[test]
fn test_zero_input_stays_zero() {
    let mut cfg = config(32, 32, 0);
    cfg.numerics.source_enabled = false;
    let (lx, ly) = cfg.physical_extent();
    let mut sub = single(&cfg, &SlitScenario::new(lx, ly));
    assert!(sub.material().object_count() > 0);

    for _ in 0..500 {
        sub.step().unwrap();
    }

    let f = sub.fields();
    for buffer in [&f.ex, &f.ey, &f.hz, &f.exy, &f.eyx, &f.hzx, &f.hzy] {
        assert!(buffer.data.iter().all(|&v| v == 0.0));
    }
}

#[test]
fn test_zero_amplitude_source_stays_zero() {
    let mut cfg = config(16, 16, 0);
    cfg.numerics.amplitude = 0.0;
    let mut sub = single(&cfg, &Vacuum);
    for _ in 0..200 {
        sub.step().unwrap();
    }
    assert!(sub.fields().ex.data.iter().all(|&v| v == 0.0));
    assert!(sub.fields().hz.data.iter().all(|&v| v == 0.0));
}

#[test]
fn test_energy_bounded_and_absorbed_over_ten_thousand_steps() {
    let (nx, ny) = (32, 32);
    let mut cfg = config(nx, ny, 0);
    cfg.numerics.source_enabled = false;
    let mut sub = single(&cfg, &Vacuum);

    let (ci, cj) = (nx as f64 / 2.0, ny as f64 / 2.0);
    sub.initialize_inside(Component::Hz, |i, j| {
        let r2 = (i as f64 + 0.5 - ci).powi(2) + (j as f64 + 0.5 - cj).powi(2);
        (-r2 / 18.0).exp()
    });

    let initial = sub.inside_energy();
    assert!(initial > 0.0);

    let mut peak = initial;
    for n in 0..10_000 {
        sub.step().unwrap();
        let energy = sub.inside_energy();
        assert!(energy.is_finite(), "energy not finite at step {n}");
        peak = peak.max(energy);
        assert!(
            energy <= 1.05 * initial,
            "energy grew to {:.3e} (initial {:.3e}) at step {n}",
            energy,
            initial
        );
    }

    assert!(sub.fields().is_finite());
    let remaining = sub.inside_energy() / initial;
    assert!(remaining < 1e-2, "PML left {remaining:.3e} of the initial energy");
    assert!(peak <= 1.05 * initial);
}

#[test]
fn test_end_to_end_two_hundred_iterations() {
    let cfg = config(64, 64, 200);
    let (lx, ly) = cfg.physical_extent();

    let summary = Simulation::new(cfg, SlitScenario::new(lx, ly))
        .unwrap()
        .run(&mut NullSink)
        .unwrap();
    assert_eq!(summary.iterations, 200);
    assert_eq!(summary.snapshots_exported, 0);
    approx::assert_relative_eq!(summary.time, 200.0 * cfg.dt(), max_relative = 1e-12);

    let mut sub = single(&cfg, &SlitScenario::new(lx, ly));
    for _ in 0..200 {
        sub.step().unwrap();
    }
    assert_eq!(sub.icnt(), 200);
    assert!(sub.fields().is_finite());
    let peak = sub.fields().inside_max_abs(sub.geometry(), Component::Ex);
    assert!(peak > 0.0 && peak < 1e3, "Ex peak {peak} out of range");
}
