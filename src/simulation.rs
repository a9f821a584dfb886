//! The simulation driver: owns the lattice, the registry, the scheduler, and the worker thread's
//! per-MCS loop.
//!
//! Grounded on the original `Main.cpp`'s `simLoop`/`simInit` split and on the concurrency model of
//! §5: a single worker thread is the sole mutator of simulation state, communicating `done` to any
//! external reader through an `Arc<AtomicBool>`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::SimulationConfig;
use crate::error::NoFreeICMForCavity;
use crate::lattice::Lattice;
use crate::mc_engine;
use crate::sampler::{ChaChaSampler, Sampler};
use crate::scheduler::Scheduler;
use crate::supercell::{Colour, SuperCellRegistry, SuperCellType, BOUNDARY_ID, EMPTY_SPACE_ID};

/// Everything the worker thread owns: the lattice, the registry, the scheduler and the sampler.
/// Constructed once at startup and then driven one MCS at a time by [`Simulation::run`].
pub struct Simulation<S: Sampler> {
    lattice: Lattice,
    registry: SuperCellRegistry,
    scheduler: Scheduler,
    sampler: S,
    config: SimulationConfig,
    mcs: u64,
}

impl Simulation<ChaChaSampler> {
    /// Bootstrap a fresh simulation from a resolved configuration, using the default
    /// `ChaCha8Rng`-backed sampler seeded from `config.seed`.
    pub fn new(config: SimulationConfig) -> Self {
        let sampler = ChaChaSampler::from_seed(config.seed);
        Self::with_sampler(config, sampler)
    }
}

impl<S: Sampler> Simulation<S> {
    /// Bootstrap a fresh simulation with an explicit sampler, for deterministic tests.
    pub fn with_sampler(config: SimulationConfig, mut sampler: S) -> Self {
        let mut registry = SuperCellRegistry::new();
        registry.create_with_colour(SuperCellType::Boundary, 0, 0, 0, Colour::rgb(40, 40, 40));
        registry.create_with_colour(SuperCellType::EmptySpace, 0, 0, 0, Colour::rgb(10, 10, 15));
        let fluid_id = registry.create_with_colour(SuperCellType::Fluid, 0, 0, 0, Colour::rgb(210, 225, 250));

        let mut lattice = Lattice::new(config.width, config.height, EMPTY_SPACE_ID);
        registry.set_volume(BOUNDARY_ID, lattice.count_label(BOUNDARY_ID));
        registry.set_volume(EMPTY_SPACE_ID, lattice.count_label(EMPTY_SPACE_ID));

        let scheduler = Scheduler::new(fluid_id, &mut lattice, &mut registry, &mut sampler, &config);

        Simulation {
            lattice,
            registry,
            scheduler,
            sampler,
            config,
            mcs: 0,
        }
    }

    /// Run until `config.max_mcs` is reached or `stop` is observed set, whichever comes first.
    /// Returns the number of MCS actually completed.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<u64, NoFreeICMForCavity> {
        while self.mcs < self.config.max_mcs {
            if stop.load(Ordering::Acquire) {
                break;
            }
            mc_engine::step_one_mcs(
                &mut self.lattice,
                &mut self.registry,
                &mut self.sampler,
                &self.config.mc_params,
                stop,
            );
            self.registry.tick();
            self.scheduler.step(self.mcs, &mut self.lattice, &mut self.registry, &mut self.sampler, &self.config)?;
            self.mcs += 1;

            if self.config.delay_ms > 0 {
                std::thread::sleep(Duration::from_millis(self.config.delay_ms));
            }
        }
        Ok(self.mcs)
    }

    pub fn pixel_handle(&self) -> Arc<[std::sync::atomic::AtomicU8]> {
        self.lattice.pixel_view().handle()
    }

    pub fn current_mcs(&self) -> u64 {
        self.mcs
    }

    pub fn registry(&self) -> &SuperCellRegistry {
        &self.registry
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }
}

/// Spawn the worker thread, returning its pixel buffer handle, the shared `done` flag, and the
/// `JoinHandle` producing the final MCS count (or a fatal scheduler error).
pub fn spawn_worker(
    config: SimulationConfig,
) -> (
    Arc<[std::sync::atomic::AtomicU8]>,
    Arc<AtomicBool>,
    std::thread::JoinHandle<Result<u64, NoFreeICMForCavity>>,
) {
    let sampler = ChaChaSampler::from_seed(config.seed);
    let mut simulation = Simulation::with_sampler(config, sampler);
    let pixels = simulation.pixel_handle();
    let done = Arc::new(AtomicBool::new(false));
    let done_for_worker = Arc::clone(&done);

    let handle = std::thread::spawn(move || {
        let result = simulation.run(&done_for_worker);
        done_for_worker.store(true, Ordering::Release);
        tracing::info!("done");
        println!("done");
        result
    });

    (pixels, done, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reaches_the_same_mcs_count_and_census() {
        let config_a = SimulationConfig::test_default(16, 16);
        let config_b = SimulationConfig::test_default(16, 16);
        let mut sim_a = Simulation::new(config_a);
        let mut sim_b = Simulation::new(config_b);

        let stop = AtomicBool::new(false);
        let done_a = sim_a.run(&stop).unwrap();
        let done_b = sim_b.run(&stop).unwrap();

        assert_eq!(done_a, done_b);
        for id in sim_a.registry().ids() {
            assert_eq!(sim_a.registry().cell_type(id), sim_b.registry().cell_type(id));
            assert_eq!(sim_a.registry().volume(id), sim_b.registry().volume(id));
        }
    }

    #[test]
    fn volume_bookkeeping_matches_actual_site_counts_after_many_mcs() {
        let config = SimulationConfig::test_default(16, 16);
        let mut sim = Simulation::new(config);
        let stop = AtomicBool::new(false);
        sim.run(&stop).unwrap();

        let mut actual = std::collections::HashMap::new();
        for x in 0..sim.lattice().boundary_width {
            for y in 0..sim.lattice().boundary_height {
                *actual.entry(sim.lattice().get(x, y)).or_insert(0i64) += 1;
            }
        }
        for id in sim.registry().ids() {
            let expected = *actual.get(&id).unwrap_or(&0);
            assert_eq!(sim.registry().volume(id), expected, "volume mismatch for id {id}");
        }
    }

    #[test]
    fn stopping_early_halts_before_max_mcs() {
        let config = SimulationConfig::test_default(16, 16);
        let mut sim = Simulation::new(config);
        let stop = AtomicBool::new(true);
        let completed = sim.run(&stop).unwrap();
        assert_eq!(completed, 0);
    }
}
