//! Division geometry: bounding-box, random-axis and short-axis splits, and cleave.
//!
//! Grounded on the original `SquareCellGrid.cpp`'s `divideCell`, `divideCellRandomAxis`,
//! `divideCellShortAxis`, `calculateRawImageMoment` and `cleaveCell`. The short-axis split's
//! covariance eigenvalues are computed with `nalgebra::linalg::SymmetricEigen` rather than the
//! original's hand-rolled closed-form quadratic, since `nalgebra` is already this crate's
//! geometry dependency (grounded in `cellular_raza-building-blocks`'s use of `nalgebra` for all
//! of its own domain geometry).

use std::f64::consts::PI;

use nalgebra::{linalg::SymmetricEigen, Matrix2};

use crate::error::TooSmall;
use crate::lattice::Lattice;
use crate::sampler::Sampler;
use crate::supercell::{SuperCellId, SuperCellRegistry};

/// Common tail of every split: clone `c`, move `new_members` onto the clone, bump `c`'s
/// generation, and reset both cells' `mcs` to zero.
fn finish_split(
    lattice: &mut Lattice,
    registry: &mut SuperCellRegistry,
    sampler: &mut impl Sampler,
    c: SuperCellId,
    new_members: &[(usize, usize)],
) -> SuperCellId {
    registry.increase_generation(c);
    let c_prime = registry
        .clone_from(c, sampler)
        .expect("c was just validated as a live id");

    for &(x, y) in new_members {
        lattice.set_label(x, y, c_prime, registry);
    }

    registry.set_mcs(c, 0);
    registry.set_mcs(c_prime, 0);
    c_prime
}

/// Axis-aligned bounding box of a set of lattice coordinates.
struct BBox {
    min_x: usize,
    max_x: usize,
    min_y: usize,
    max_y: usize,
}

fn bounding_box(sites: &[(usize, usize)]) -> BBox {
    let mut bbox = BBox {
        min_x: usize::MAX,
        max_x: 0,
        min_y: usize::MAX,
        max_y: 0,
    };
    for &(x, y) in sites {
        bbox.min_x = bbox.min_x.min(x);
        bbox.max_x = bbox.max_x.max(x);
        bbox.min_y = bbox.min_y.min(y);
        bbox.max_y = bbox.max_y.max(y);
    }
    bbox
}

/// Split along the longer axis of the bounding box, at its midpoint. Sites strictly below the
/// midpoint on the chosen axis go to the new cell.
pub fn divide_bbox(
    lattice: &mut Lattice,
    registry: &mut SuperCellRegistry,
    sampler: &mut impl Sampler,
    c: SuperCellId,
) -> Result<SuperCellId, TooSmall> {
    let sites = lattice.sites_labelled(c);
    if sites.len() <= 1 {
        return Err(TooSmall::new(format!("super-cell {c} has {} sites", sites.len())));
    }
    let bbox = bounding_box(&sites);
    let width = bbox.max_x - bbox.min_x;
    let height = bbox.max_y - bbox.min_y;

    let new_members: Vec<(usize, usize)> = if width > height {
        let midpoint = (bbox.max_x + bbox.min_x) / 2;
        sites.into_iter().filter(|&(x, _)| x < midpoint).collect()
    } else {
        let midpoint = (bbox.max_y + bbox.min_y) / 2;
        sites.into_iter().filter(|&(_, y)| y < midpoint).collect()
    };

    Ok(finish_split(lattice, registry, sampler, c, &new_members))
}

/// Split by a line of uniformly random slope (angle in (-89, 89) degrees) through the bounding
/// box's midpoint.
pub fn divide_random(
    lattice: &mut Lattice,
    registry: &mut SuperCellRegistry,
    sampler: &mut impl Sampler,
    c: SuperCellId,
) -> Result<SuperCellId, TooSmall> {
    let sites = lattice.sites_labelled(c);
    if sites.len() <= 1 {
        return Err(TooSmall::new(format!("super-cell {c} has {} sites", sites.len())));
    }
    let bbox = bounding_box(&sites);
    let mid_x = (bbox.min_x + bbox.max_x) as f64 * 0.5;
    let mid_y = (bbox.min_y + bbox.max_y) as f64 * 0.5;

    let angle_degrees = sampler.uniform_int(-89, 89) as f64;
    let grad = (angle_degrees * PI / 180.0).tan();

    let new_members: Vec<(usize, usize)> = sites
        .into_iter()
        .filter(|&(x, y)| (y as f64) > grad * (x as f64 - mid_x) + mid_y)
        .collect();

    Ok(finish_split(lattice, registry, sampler, c, &new_members))
}

fn raw_image_moment(sites: &[(usize, usize)], i_order: i32, j_order: i32) -> f64 {
    sites
        .iter()
        .map(|&(x, y)| (x as f64).powi(i_order) * (y as f64).powi(j_order))
        .sum()
}

/// Split across the cell's short axis, derived from the image moments of its site set.
pub fn divide_short(
    lattice: &mut Lattice,
    registry: &mut SuperCellRegistry,
    sampler: &mut impl Sampler,
    c: SuperCellId,
) -> Result<SuperCellId, TooSmall> {
    let sites = lattice.sites_labelled(c);
    if sites.len() <= 1 {
        return Err(TooSmall::new(format!("super-cell {c} has {} sites", sites.len())));
    }

    let m00 = raw_image_moment(&sites, 0, 0);
    let m10 = raw_image_moment(&sites, 1, 0);
    let m01 = raw_image_moment(&sites, 0, 1);
    let m20 = raw_image_moment(&sites, 2, 0);
    let m02 = raw_image_moment(&sites, 0, 2);
    let m11 = raw_image_moment(&sites, 1, 1);

    let x_bar = m10 / m00;
    let y_bar = m01 / m00;

    let mu20 = m20 / m00 - x_bar * x_bar;
    let mu02 = m02 / m00 - y_bar * y_bar;
    let mu11 = m11 / m00 - x_bar * y_bar;

    let covariance = Matrix2::new(mu20, mu11, mu11, mu02);
    let eigen = SymmetricEigen::new(covariance);
    let small_eig = if eigen.eigenvalues[0].abs() <= eigen.eigenvalues[1].abs() {
        eigen.eigenvalues[0]
    } else {
        eigen.eigenvalues[1]
    };

    let grad = (small_eig - mu20) / mu11;

    let new_members: Vec<(usize, usize)> = sites
        .into_iter()
        .filter(|&(x, y)| (y as f64) > grad * (x as f64 - x_bar) + y_bar)
        .collect();

    Ok(finish_split(lattice, registry, sampler, c, &new_members))
}

/// A [`divide_short`] that also halves both daughters' target volume and rederives their target
/// surface. Grounded on `SquareCellGrid::cleaveCell`.
pub fn cleave(
    lattice: &mut Lattice,
    registry: &mut SuperCellRegistry,
    sampler: &mut impl Sampler,
    c: SuperCellId,
    border_const: i64,
) -> Result<SuperCellId, TooSmall> {
    let c_prime = divide_short(lattice, registry, sampler, c)?;

    let new_target_volume = registry.target_volume(c) / 2;
    let new_target_surface = (new_target_volume as f64).sqrt().floor() as i64 * border_const;

    registry.set_target_volume(c, new_target_volume);
    registry.set_target_volume(c_prime, new_target_volume);
    registry.set_target_surface(c, new_target_surface);
    registry.set_target_surface(c_prime, new_target_surface);

    Ok(c_prime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::ChaChaSampler;
    use crate::supercell::{Colour, SuperCellType};

    fn setup(width: usize, height: usize) -> (Lattice, SuperCellRegistry, ChaChaSampler) {
        let mut registry = SuperCellRegistry::new();
        registry.create_with_colour(SuperCellType::Boundary, 0, 0, 0, Colour::rgb(255, 255, 255));
        registry.create_with_colour(SuperCellType::EmptySpace, 0, 0, 0, Colour::rgb(0, 0, 0));
        let lattice = Lattice::new(width, height, 1);
        registry.set_volume(0, lattice.count_label(0));
        registry.set_volume(1, lattice.count_label(1));
        (lattice, registry, ChaChaSampler::from_seed(11))
    }

    fn stamp_block(
        lattice: &mut Lattice,
        registry: &mut SuperCellRegistry,
        id: SuperCellId,
        x0: usize,
        y0: usize,
        w: usize,
        h: usize,
    ) {
        for x in x0..x0 + w {
            for y in y0..y0 + h {
                lattice.set_label(x, y, id, registry);
            }
        }
    }

    #[test]
    fn too_small_is_rejected() {
        let (mut lattice, mut registry, mut sampler) = setup(10, 10);
        let id = registry.create(SuperCellType::Generic, 0, 1, 0, &mut sampler);
        lattice.set_label(5, 5, id, &mut registry);
        assert!(divide_bbox(&mut lattice, &mut registry, &mut sampler, id).is_err());
    }

    #[test]
    fn bbox_split_along_longer_axis() {
        let (mut lattice, mut registry, mut sampler) = setup(12, 8);
        let id = registry.create(SuperCellType::Generic, 0, 40, 0, &mut sampler);
        stamp_block(&mut lattice, &mut registry, id, 1, 1, 10, 4);

        let child = divide_bbox(&mut lattice, &mut registry, &mut sampler, id).unwrap();

        assert_eq!(registry.generation(id), 1);
        assert_eq!(registry.generation(child), 1);
        assert_eq!(registry.mcs(id), 0);
        assert_eq!(registry.mcs(child), 0);

        let midpoint = (1 + 10) / 2;
        for x in 1..11 {
            for y in 1..5 {
                let label = lattice.get(x, y);
                if x < midpoint {
                    assert_eq!(label, child, "({x},{y}) should belong to the child");
                } else {
                    assert_eq!(label, id, "({x},{y}) should remain with the parent");
                }
            }
        }
    }

    #[test]
    fn short_axis_split_separates_diagonal_block() {
        let (mut lattice, mut registry, mut sampler) = setup(20, 20);
        let id = registry.create(SuperCellType::Generic, 0, 0, 0, &mut sampler);
        for k in 0..10 {
            lattice.set_label(1 + k, 1 + k, id, &mut registry);
        }

        let child = divide_short(&mut lattice, &mut registry, &mut sampler, id).unwrap();

        let parent_sites: Vec<(usize, usize)> = (0..10)
            .map(|k| (1 + k, 1 + k))
            .filter(|&(x, y)| lattice.get(x, y) == id)
            .collect();
        let child_sites: Vec<(usize, usize)> = (0..10)
            .map(|k| (1 + k, 1 + k))
            .filter(|&(x, y)| lattice.get(x, y) == child)
            .collect();

        assert!(!parent_sites.is_empty());
        assert!(!child_sites.is_empty());
    }

    #[test]
    fn cleave_halves_target_volume_and_derives_surface() {
        let (mut lattice, mut registry, mut sampler) = setup(20, 20);
        let id = registry.create(SuperCellType::Generic, 0, 64, 0, &mut sampler);
        for k in 0..8 {
            lattice.set_label(1 + k, 1 + k, id, &mut registry);
        }

        let child = cleave(&mut lattice, &mut registry, &mut sampler, id, 4).unwrap();

        assert_eq!(registry.target_volume(id), 32);
        assert_eq!(registry.target_volume(child), 32);
        let expected_surface = (32f64).sqrt().floor() as i64 * 4;
        assert_eq!(registry.target_surface(id), expected_surface);
        assert_eq!(registry.target_surface(child), expected_surface);
    }
}
