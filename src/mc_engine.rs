//! The Monte Carlo engine: one copy attempt, its Hamiltonian, and one Monte Carlo Step.
//!
//! Grounded on the original `SquareCellGrid.cpp`'s `moveCell`, `getAdhesionDelta` and
//! `getVolumeDelta`.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::McParams;
use crate::lattice::Lattice;
use crate::sampler::Sampler;
use crate::supercell::{SuperCellRegistry, SuperCellType, BOUNDARY_ID, EMPTY_SPACE_ID};

/// Hard veto returned when a copy would drive a non-medium cell's volume to zero. Large enough
/// that `exp(-veto / T)` underflows to zero for any sane temperature.
const VOLUME_VETO: f64 = 1.0e6;

fn adhesion_delta(
    lattice: &Lattice,
    registry: &SuperCellRegistry,
    params: &McParams,
    src: (usize, usize),
    dest: (usize, usize),
) -> f64 {
    let src_id = lattice.get(src.0, src.1);
    let dest_id = lattice.get(dest.0, dest.1);
    let src_type = registry.cell_type(src_id);
    let dest_type = registry.cell_type(dest_id);

    let mut init_h = 0.0;
    let mut post_h = 0.0;
    for (nx, ny) in lattice.neighbours_moore(dest.0, dest.1) {
        let n_id = lattice.get(nx, ny);
        let n_type = registry.cell_type(n_id);
        if n_id != dest_id {
            init_h += params.j_matrix.get(dest_type, n_type);
        }
        if n_id != src_id {
            post_h += params.j_matrix.get(src_type, n_type);
        }
    }
    post_h - init_h
}

fn volume_delta(registry: &SuperCellRegistry, params: &McParams, src_id: usize, dest_id: usize) -> f64 {
    if registry.volume(dest_id) - 1 == 0 {
        return VOLUME_VETO;
    }

    let source_ignore = is_empty_space(src_id);
    let dest_ignore = is_empty_space(dest_id);

    let source_term = if source_ignore {
        0.0
    } else {
        let v = registry.volume(src_id) as f64;
        let t = registry.target_volume(src_id) as f64;
        (v + 1.0 - t).powi(2) - (v - t).powi(2)
    };
    let dest_term = if dest_ignore {
        0.0
    } else {
        let v = registry.volume(dest_id) as f64;
        let t = registry.target_volume(dest_id) as f64;
        (v - 1.0 - t).powi(2) - (v - t).powi(2)
    };

    params.lambda * (source_term + dest_term)
}

fn is_empty_space(id: usize) -> bool {
    id == EMPTY_SPACE_ID
}

/// Perimeter-based surface energy term, gated by `params.sigma`; inert (returns 0) unless a
/// caller opts into a nonzero σ. See `DESIGN.md` for why this term exists alongside adhesion and
/// volume.
fn surface_delta(
    lattice: &Lattice,
    registry: &SuperCellRegistry,
    params: &McParams,
    src: (usize, usize),
    dest: (usize, usize),
) -> f64 {
    if params.sigma == 0.0 {
        return 0.0;
    }
    let src_id = lattice.get(src.0, src.1);
    let dest_id = lattice.get(dest.0, dest.1);

    let init_perimeter = lattice.subcell_perimeter(dest.0, dest.1) as f64;
    // Perimeter the destination site would have if it carried the source's label: count
    // axis-neighbours that differ from src_id instead of dest_id.
    let mut post_perimeter = 0.0;
    let axis_neighbours = [
        (dest.0, dest.1 - 1),
        (dest.0, dest.1 + 1),
        (dest.0 - 1, dest.1),
        (dest.0 + 1, dest.1),
    ];
    for (nx, ny) in axis_neighbours {
        if lattice.get(nx, ny) != src_id {
            post_perimeter += 1.0;
        }
    }

    let target_src = registry.target_surface(src_id) as f64;
    let target_dest = registry.target_surface(dest_id) as f64;
    let surf_src = registry.surface(src_id) as f64;
    let surf_dest = registry.surface(dest_id) as f64;

    let delta_src = (surf_src + (post_perimeter - init_perimeter) - target_src).powi(2)
        - (surf_src - target_src).powi(2);
    let delta_dest = (surf_dest - (post_perimeter - init_perimeter) - target_dest).powi(2)
        - (surf_dest - target_dest).powi(2);

    params.sigma * (delta_src + delta_dest)
}

/// Attempt a single copy: pick a random interior site and Moore neighbour, and probabilistically
/// copy the source's label onto the neighbour. Returns `true` if the copy was accepted.
pub fn copy_attempt(
    lattice: &mut Lattice,
    registry: &mut SuperCellRegistry,
    sampler: &mut impl Sampler,
    params: &McParams,
) -> bool {
    let x = sampler.uniform_int(1, lattice.interior_width as i64) as usize;
    let y = sampler.uniform_int(1, lattice.interior_height as i64) as usize;

    let neighbours = lattice.neighbours_moore(x, y);
    let idx = sampler.uniform_int(0, neighbours.len() as i64 - 1) as usize;
    let (nx, ny) = neighbours[idx];

    let src_id = lattice.get(x, y);
    let dest_id = lattice.get(nx, ny);

    if dest_id == BOUNDARY_ID || dest_id == src_id {
        return false;
    }

    let delta_h = adhesion_delta(lattice, registry, params, (x, y), (nx, ny))
        + volume_delta(registry, params, src_id, dest_id)
        + surface_delta(lattice, registry, params, (x, y), (nx, ny));

    let accept = delta_h <= 0.0 || sampler.uniform_prob() < (-delta_h / params.boltz_temp).exp();
    if accept {
        lattice.set_label(nx, ny, src_id, registry);
    }
    accept
}

/// Run one Monte Carlo Step: `interior_width * interior_height` copy attempts. Stops early if
/// `stop` is observed set, per the cooperative-cancellation contract of §5.
pub fn step_one_mcs(
    lattice: &mut Lattice,
    registry: &mut SuperCellRegistry,
    sampler: &mut impl Sampler,
    params: &McParams,
    stop: &AtomicBool,
) {
    let attempts = lattice.interior_width * lattice.interior_height;
    for _ in 0..attempts {
        if stop.load(Ordering::Acquire) {
            break;
        }
        copy_attempt(lattice, registry, sampler, params);
    }
}

/// Re-exported so tests can construct a type-to-type lookup without importing the enum twice.
pub type CellType = SuperCellType;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JMatrix;
    use crate::sampler::ChaChaSampler;
    use crate::supercell::{Colour, SuperCellRegistry, SuperCellType};

    fn setup(width: usize, height: usize) -> (Lattice, SuperCellRegistry) {
        let mut registry = SuperCellRegistry::new();
        registry.create_with_colour(SuperCellType::Boundary, 0, 0, 0, Colour::rgb(255, 255, 255));
        registry.create_with_colour(SuperCellType::EmptySpace, 0, 0, 0, Colour::rgb(0, 0, 0));
        let lattice = Lattice::new(width, height, 1);
        registry.set_volume(0, lattice.count_label(0));
        registry.set_volume(1, lattice.count_label(1));
        (lattice, registry)
    }

    #[test]
    fn volume_constraint_alone_preserves_exact_volume() {
        let (mut lattice, mut registry) = setup(10, 10);
        let mut sampler = ChaChaSampler::from_seed(5);
        let id = registry.create(SuperCellType::Generic, 0, 16, 0, &mut sampler);
        for x in 4..8 {
            for y in 4..8 {
                lattice.set_label(x, y, id, &mut registry);
            }
        }
        let params = McParams {
            boltz_temp: 10.0,
            lambda: 5.0,
            sigma: 0.0,
            j_matrix: JMatrix::zero(),
        };
        let stop = AtomicBool::new(false);
        for _ in 0..10 {
            step_one_mcs(&mut lattice, &mut registry, &mut sampler, &params, &stop);
        }
        assert_eq!(registry.volume(id), 16);
    }

    #[test]
    fn pure_diffusion_preserves_site_count() {
        let (mut lattice, mut registry) = setup(10, 10);
        let mut sampler = ChaChaSampler::from_seed(6);
        let id = registry.create(SuperCellType::Generic, 0, 0, 0, &mut sampler);
        for x in 4..8 {
            for y in 4..8 {
                lattice.set_label(x, y, id, &mut registry);
            }
        }
        let initial_volume = registry.volume(id);
        let params = McParams {
            boltz_temp: 10.0,
            lambda: 0.0,
            sigma: 0.0,
            j_matrix: JMatrix::zero(),
        };
        let stop = AtomicBool::new(false);
        for _ in 0..30 {
            step_one_mcs(&mut lattice, &mut registry, &mut sampler, &params, &stop);
        }
        assert_eq!(registry.volume(id), initial_volume);
    }

    #[test]
    fn copy_into_boundary_is_always_rejected() {
        let (mut lattice, mut registry) = setup(4, 4);
        let mut sampler = ChaChaSampler::from_seed(9);
        let id = registry.create(SuperCellType::Generic, 0, 0, 0, &mut sampler);
        lattice.set_label(1, 1, id, &mut registry);
        let params = McParams {
            boltz_temp: 10.0,
            lambda: 0.0,
            sigma: 0.0,
            j_matrix: JMatrix::zero(),
        };
        // (1,1)'s Moore neighbourhood includes the boundary ring at x=0/y=0; force-check the
        // direct copy_attempt helper never overwrites it by brute force over many attempts.
        for _ in 0..500 {
            copy_attempt(&mut lattice, &mut registry, &mut sampler, &params);
        }
        for x in 0..lattice.boundary_width {
            assert_eq!(lattice.get(x, 0), BOUNDARY_ID);
        }
    }

    #[test]
    fn detailed_balance_matches_boltzmann_factor_statistically() {
        // Constant-environment micro-test: force a fixed delta_h > 0 repeatedly and check the
        // empirical acceptance frequency against exp(-delta_h / T).
        let mut sampler = ChaChaSampler::from_seed(123);
        let delta_h = 4.0;
        let temp = 10.0;
        let trials = 20_000;
        let mut accepted = 0;
        for _ in 0..trials {
            if sampler.uniform_prob() < (-delta_h / temp as f64).exp() {
                accepted += 1;
            }
        }
        let empirical = accepted as f64 / trials as f64;
        let expected = (-delta_h / temp).exp();
        assert!((empirical - expected).abs() < 0.02, "empirical={empirical}, expected={expected}");
    }
}
