//! The developmental stage machine: morula division, compaction, differentiation into
//! trophectoderm/ICM, cavity seeding, and blastocyst growth.
//!
//! Grounded on the original `Main.cpp`'s `simLoop`, which drives exactly these transitions from a
//! single per-MCS dispatch. This port splits that dispatch into one method per stage but keeps
//! the same decision order: morula division and the compaction check run first (while
//! `!compacted`), the one-shot differentiation check runs once compaction has happened, and the
//! blastocyst pass runs on every MCS after differentiation.

use crate::config::SimulationConfig;
use crate::error::{DivisionLandLocked, NoFreeICMForCavity};
use crate::geometry::{cleave, divide_random, divide_short};
use crate::lattice::Lattice;
use crate::sampler::Sampler;
use crate::supercell::{SuperCellId, SuperCellRegistry, SuperCellType};

/// Owns the timers and one-shot flags that drive the developmental stage machine. Created once at
/// startup by [`Scheduler::new`], then advanced one MCS at a time by [`Scheduler::step`].
pub struct Scheduler {
    fluid_id: SuperCellId,
    compacted: bool,
    compaction_time: u64,
    differentiation_time: u64,
    diff_start_mcs: Option<u64>,
}

impl Scheduler {
    /// Seed the initial GENERIC morula as a roughly square block centred on the lattice, schedule
    /// its first division, and draw the global compaction/differentiation timers.
    pub fn new(
        fluid_id: SuperCellId,
        lattice: &mut Lattice,
        registry: &mut SuperCellRegistry,
        sampler: &mut impl Sampler,
        config: &SimulationConfig,
    ) -> Self {
        let side = (config.target_init_cells as f64).sqrt().round() as i64;
        let half = side / 2;
        let mid_x = lattice.interior_width as i64 / 2;
        let mid_y = lattice.interior_height as i64 / 2;

        let generic_id = registry.create(SuperCellType::Generic, 0, config.target_init_cells, 0, sampler);
        for x in (mid_x - half).max(1)..=(mid_x + half).min(lattice.interior_width as i64) {
            for y in (mid_y - half).max(1)..=(mid_y + half).min(lattice.interior_height as i64) {
                lattice.set_label(x as usize, y as usize, generic_id, registry);
            }
        }

        let div = &config.stage_distributions.morula_division;
        let first_div = sampler.normal(div.mean, div.std_dev).max(0.0) as u64;
        registry.set_next_div(generic_id, first_div);

        let compaction = &config.stage_distributions.compaction;
        let compaction_time = sampler.normal(compaction.mean, compaction.std_dev).max(0.0) as u64;

        let differentiation = &config.stage_distributions.differentiation;
        let differentiation_time = sampler.normal(differentiation.mean, differentiation.std_dev).max(0.0) as u64;

        Scheduler {
            fluid_id,
            compacted: false,
            compaction_time,
            differentiation_time,
            diff_start_mcs: None,
        }
    }

    /// Advance the stage machine by one MCS. `mcs` is the simulation's global step counter.
    pub fn step(
        &mut self,
        mcs: u64,
        lattice: &mut Lattice,
        registry: &mut SuperCellRegistry,
        sampler: &mut impl Sampler,
        config: &SimulationConfig,
    ) -> Result<(), NoFreeICMForCavity> {
        if !self.compacted {
            self.morula_pass(mcs, lattice, registry, sampler, config);
            if mcs >= self.compaction_time {
                self.compact(registry, mcs);
            }
        } else if self.diff_start_mcs.is_none() {
            if mcs >= self.differentiation_time {
                self.differentiate(mcs, lattice, registry, sampler, config)?;
            }
        } else if let Some(diff_start) = self.diff_start_mcs {
            self.blastocyst_pass(mcs, diff_start, lattice, registry, sampler, config);
        }
        Ok(())
    }

    fn morula_pass(
        &mut self,
        mcs: u64,
        lattice: &mut Lattice,
        registry: &mut SuperCellRegistry,
        sampler: &mut impl Sampler,
        config: &SimulationConfig,
    ) {
        let candidates: Vec<SuperCellId> = registry
            .ids()
            .filter(|&id| registry.cell_type(id) == SuperCellType::Generic && registry.generation(id) < crate::config::MAX_GEN)
            .collect();

        for id in candidates {
            let Some(next_div) = registry.next_div(id) else { continue };
            if registry.mcs(id) < next_div {
                continue;
            }
            if let Ok(child) = cleave(lattice, registry, sampler, id, config.border_const) {
                let div = &config.stage_distributions.morula_division;
                registry.set_next_div(id, sampler.normal(div.mean, div.std_dev).max(0.0) as u64);
                registry.set_next_div(child, sampler.normal(div.mean, div.std_dev).max(0.0) as u64);
                log_event(&format!("Division: {id} at {mcs}"));
            }
        }
    }

    fn compact(&mut self, registry: &mut SuperCellRegistry, mcs: u64) {
        let ids: Vec<SuperCellId> = registry.ids().collect();
        for id in ids {
            if registry.cell_type(id) == SuperCellType::Generic {
                registry.set_cell_type(id, SuperCellType::GenericCompact);
            }
        }
        self.compacted = true;
        log_event(&format!("Compaction at: {mcs}"));
    }

    /// Split the compacted morula into an outer trophectoderm shell (cells touching EMPTYSPACE)
    /// and an inner cell mass, then seed a fluid-filled cavity inside the ICM.
    fn differentiate(
        &mut self,
        mcs: u64,
        lattice: &mut Lattice,
        registry: &mut SuperCellRegistry,
        sampler: &mut impl Sampler,
        config: &SimulationConfig,
    ) -> Result<(), NoFreeICMForCavity> {
        let compact_ids: Vec<SuperCellId> = registry
            .ids()
            .filter(|&id| registry.cell_type(id) == SuperCellType::GenericCompact)
            .collect();

        let outer: Vec<SuperCellId> = compact_ids
            .iter()
            .copied()
            .filter(|&id| has_outer_neighbour(lattice, registry, id))
            .collect();

        let troph = &config.stage_distributions.trophectoderm_division_std;
        for &id in &outer {
            registry.recolour(id, SuperCellType::Trophectoderm, sampler);
            registry.set_mcs(id, 0);
            let mean = 9.0 * config.mcs_hour_est;
            registry.set_next_div(id, sampler.normal(mean, *troph).max(0.0) as u64);
        }

        let icm_dist = &config.stage_distributions.icm_division;
        for &id in &compact_ids {
            if registry.cell_type(id) == SuperCellType::GenericCompact {
                registry.recolour(id, SuperCellType::Icm, sampler);
                registry.set_mcs(id, 0);
                registry.set_next_div(id, sampler.normal(icm_dist.mean, icm_dist.std_dev).max(0.0) as u64);
            }
        }

        let site = find_cavity_site(lattice, registry, sampler, config)?;
        lattice.set_label(site.0, site.1, self.fluid_id, registry);

        self.diff_start_mcs = Some(mcs);
        log_event(&format!("Differentiation at: {mcs}"));
        Ok(())
    }

    /// Trophectoderm divides outward (toward EMPTYSPACE) or, if land-locked, is absorbed into the
    /// cavity; ICM divides on its short axis; the cavity's target volume grows toward its
    /// asymptote. Runs every MCS once differentiation has happened.
    fn blastocyst_pass(
        &mut self,
        mcs: u64,
        diff_start: u64,
        lattice: &mut Lattice,
        registry: &mut SuperCellRegistry,
        sampler: &mut impl Sampler,
        config: &SimulationConfig,
    ) {
        let ids: Vec<SuperCellId> = registry.ids().collect();
        for id in ids {
            match registry.cell_type(id) {
                SuperCellType::Trophectoderm => {
                    let Some(next_div) = registry.next_div(id) else { continue };
                    if registry.mcs(id) < next_div {
                        continue;
                    }
                    if has_outer_neighbour(lattice, registry, id) {
                        if let Ok(child) = divide_random(lattice, registry, sampler, id) {
                            let t = (mcs - diff_start) as f64;
                            let std = config.stage_distributions.trophectoderm_division_std;
                            let mean = 9.0 * config.mcs_hour_est + (t / 250.0).powi(2);
                            registry.set_next_div(id, sampler.normal(mean, std).max(0.0) as u64);
                            registry.set_next_div(child, sampler.normal(mean, std).max(0.0) as u64);
                            log_event(&format!("Division: {id} at {mcs}"));
                        }
                    } else {
                        let err = DivisionLandLocked::new(format!("super-cell {id} has no empty-space-adjacent site"));
                        tracing::debug!("{err}; absorbing into fluid");
                        absorb_into_fluid(lattice, registry, id, self.fluid_id);
                    }
                }
                SuperCellType::Icm => {
                    let Some(next_div) = registry.next_div(id) else { continue };
                    if registry.mcs(id) < next_div {
                        continue;
                    }
                    if let Ok(child) = divide_short(lattice, registry, sampler, id) {
                        let dist = &config.stage_distributions.icm_division;
                        registry.set_next_div(id, sampler.normal(dist.mean, dist.std_dev).max(0.0) as u64);
                        registry.set_next_div(child, sampler.normal(dist.mean, dist.std_dev).max(0.0) as u64);
                        log_event(&format!("Division: {id} at {mcs}"));
                    }
                }
                _ => {}
            }
        }

        let t = (mcs - diff_start) as f64;
        let target = (6400.0 * (1.0 - (-t / (36.0 * config.mcs_hour_est)).exp())).max(50.0);
        registry.set_target_volume(self.fluid_id, target as i64);
    }
}

/// `true` if any site of `id` has at least one EMPTYSPACE Moore neighbour.
fn has_outer_neighbour(lattice: &Lattice, registry: &SuperCellRegistry, id: SuperCellId) -> bool {
    lattice
        .sites_labelled(id)
        .iter()
        .any(|&(x, y)| !lattice.neighbours_of_type(x, y, SuperCellType::EmptySpace, registry).is_empty())
}

/// Relabel every site of `id` onto `fluid_id`. Used when a trophectoderm cell is fully enclosed
/// and has nowhere left to divide outward into; grounded on the original's fallback of folding a
/// land-locked cell into the cavity rather than leaving it permanently stuck.
fn absorb_into_fluid(lattice: &mut Lattice, registry: &mut SuperCellRegistry, id: SuperCellId, fluid_id: SuperCellId) {
    for (x, y) in lattice.sites_labelled(id) {
        lattice.set_label(x, y, fluid_id, registry);
    }
}

/// Find an interior site currently labelled ICM to seed the cavity: probe up to
/// [`SimulationConfig::cavity_seed_max_attempts`] uniform-random interior sites, and if none
/// lands on ICM, fall back to an exhaustive row-major scan for the first one.
fn find_cavity_site(
    lattice: &Lattice,
    registry: &SuperCellRegistry,
    sampler: &mut impl Sampler,
    config: &SimulationConfig,
) -> Result<(usize, usize), NoFreeICMForCavity> {
    for _ in 0..config.cavity_seed_max_attempts() {
        let x = sampler.uniform_int(1, lattice.interior_width as i64) as usize;
        let y = sampler.uniform_int(1, lattice.interior_height as i64) as usize;
        if registry.cell_type(lattice.get(x, y)) == SuperCellType::Icm {
            return Ok((x, y));
        }
    }

    (1..=lattice.interior_width)
        .flat_map(|x| (1..=lattice.interior_height).map(move |y| (x, y)))
        .find(|&(x, y)| registry.cell_type(lattice.get(x, y)) == SuperCellType::Icm)
        .ok_or_else(|| NoFreeICMForCavity::new("no ICM-labelled site exists at differentiation time"))
}

/// Emit a stage-transition or division event both through `tracing` and on stdout, matching the
/// original's console narration of the simulation's progress.
fn log_event(message: &str) {
    tracing::info!("{message}");
    println!("{message}");
}
