//! Binary entry point: parse CLI options, initialise structured logging, run the simulation to
//! completion on the calling thread, and report the final super-cell census.
//!
//! Grounded on the original `Main.cpp`'s `main`/`simInit`, and on the
//! `tracing_subscriber::fmt().init()` bootstrap pattern in `cellular_raza-examples/template/src/main.rs`.

use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use clap::Parser;

use cpm_embryo::config::SimulationConfig;
use cpm_embryo::simulation::Simulation;
use cpm_embryo::{config::Cli, supercell::SuperCellType};

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(cli.log_level.clone()))
        .init();

    let config = match SimulationConfig::from_cli(cli) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("configuration error: {err}");
            eprintln!("configuration error: {err}");
            return ExitCode::from(1);
        }
    };

    tracing::info!(
        width = config.width,
        height = config.height,
        max_mcs = config.max_mcs,
        seed = config.seed,
        "starting simulation"
    );

    let mut simulation = Simulation::new(config);
    let stop = AtomicBool::new(false);
    match simulation.run(&stop) {
        Ok(completed_mcs) => {
            report_census(&simulation, completed_mcs);
            println!("done");
            tracing::info!("done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("simulation aborted: {err}");
            eprintln!("simulation aborted: {err}");
            ExitCode::from(1)
        }
    }
}

fn report_census(simulation: &Simulation<cpm_embryo::sampler::ChaChaSampler>, completed_mcs: u64) {
    let registry = simulation.registry();
    let mut counts = [0usize; SuperCellType::COUNT];
    for id in registry.ids() {
        counts[registry.cell_type(id).index()] += 1;
    }
    println!("completed {completed_mcs} MCS");
    for cell_type in SuperCellType::ALL {
        if counts[cell_type.index()] > 0 {
            println!("  {cell_type:?}: {}", counts[cell_type.index()]);
        }
    }
}
