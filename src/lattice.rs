//! The lattice: a rectangular grid of super-cell labels with a one-site boundary ring.
//!
//! Grounded on the original `SquareCellGrid.cpp`'s `internalGrid`/`getNeighbours`/`setCell`.

use crate::pixel::PixelView;
use crate::supercell::{SuperCellId, SuperCellRegistry, SuperCellType, BOUNDARY_ID};

/// A single interior or boundary lattice position. Sites never own memory; a [`Lattice`] is a
/// flat `Vec` of these.
pub type Site = SuperCellId;

/// The eight Moore offsets, in a fixed, stable (row-major `dx`, then `dy`) order.
const MOORE_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// A (W+2)x(H+2) grid of site labels with an immutable BOUNDARY ring, plus the pixel buffer that
/// mirrors it.
pub struct Lattice {
    pub interior_width: usize,
    pub interior_height: usize,
    pub boundary_width: usize,
    pub boundary_height: usize,
    grid: Vec<Site>,
    pixels: PixelView,
}

impl Lattice {
    /// Build a new lattice of the given interior size, with every interior site set to
    /// `fill_id` and the outer ring set to [`BOUNDARY_ID`].
    pub fn new(interior_width: usize, interior_height: usize, fill_id: SuperCellId) -> Self {
        let boundary_width = interior_width + 2;
        let boundary_height = interior_height + 2;
        let mut grid = vec![fill_id; boundary_width * boundary_height];
        for x in 0..boundary_width {
            grid[Self::index(boundary_width, x, 0)] = BOUNDARY_ID;
            grid[Self::index(boundary_width, x, boundary_height - 1)] = BOUNDARY_ID;
        }
        for y in 0..boundary_height {
            grid[Self::index(boundary_width, 0, y)] = BOUNDARY_ID;
            grid[Self::index(boundary_width, boundary_width - 1, y)] = BOUNDARY_ID;
        }
        Lattice {
            interior_width,
            interior_height,
            boundary_width,
            boundary_height,
            grid,
            pixels: PixelView::new(boundary_width, boundary_height),
        }
    }

    fn index(boundary_width: usize, x: usize, y: usize) -> usize {
        y * boundary_width + x
    }

    fn idx(&self, x: usize, y: usize) -> usize {
        Self::index(self.boundary_width, x, y)
    }

    /// Whether `(x, y)` lies on the immutable outer ring.
    pub fn is_boundary_ring(&self, x: usize, y: usize) -> bool {
        x == 0 || y == 0 || x == self.boundary_width - 1 || y == self.boundary_height - 1
    }

    /// Read-only view of the label at `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Site {
        self.grid[self.idx(x, y)]
    }

    /// Count how many sites currently carry `id`. Only used at construction time to seed the
    /// registry's bookkeeping volumes for BOUNDARY and EMPTYSPACE.
    pub fn count_label(&self, id: SuperCellId) -> i64 {
        self.grid.iter().filter(|&&label| label == id).count() as i64
    }

    /// Collect every interior coordinate currently labelled `id`, in row-major order.
    pub fn sites_labelled(&self, id: SuperCellId) -> Vec<(usize, usize)> {
        let mut sites = Vec::new();
        for x in 1..=self.interior_width {
            for y in 1..=self.interior_height {
                if self.get(x, y) == id {
                    sites.push((x, y));
                }
            }
        }
        sites
    }

    /// Update the site at `(x, y)` to `id`, adjusting volumes on the registry and refreshing the
    /// pixel at that site. Callers must never target a boundary-ring site.
    pub fn set_label(&mut self, x: usize, y: usize, id: SuperCellId, registry: &mut SuperCellRegistry) {
        debug_assert!(
            !self.is_boundary_ring(x, y),
            "set_label must never target the boundary ring at ({x}, {y})"
        );
        let idx = self.idx(x, y);
        let old = self.grid[idx];
        if old == id {
            return;
        }
        registry.change_volume(old, -1);
        registry.change_volume(id, 1);
        self.grid[idx] = id;
        self.pixels.write(x, y, self.boundary_width, registry.colour(id));
    }

    /// Enumerate the eight Moore neighbours of `(x, y)` as coordinates, in a stable but
    /// unspecified order.
    pub fn neighbours_moore(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        MOORE_OFFSETS
            .iter()
            .map(|(dx, dy)| ((x as i32 + dx) as usize, (y as i32 + dy) as usize))
            .collect()
    }

    /// Filter [`Lattice::neighbours_moore`] by the super-cell type of the neighbour.
    ///
    /// NOTE: the original C++ (`SquareCellGrid::getNeighboursCoords(row, col, CELL_TYPE)`) tests
    /// `internalGrid[row-1][col-1]` inside the ±1 sweep instead of `internalGrid[row+x][col+y]`
    /// — almost certainly a transcription error, since it makes the filter test a single fixed
    /// cell eight times rather than each neighbour. This port implements the evidently intended
    /// semantics (filter on the actual neighbour's type) rather than reproducing the bug; see
    /// `DESIGN.md`.
    pub fn neighbours_of_type(
        &self,
        x: usize,
        y: usize,
        cell_type: SuperCellType,
        registry: &SuperCellRegistry,
    ) -> Vec<(usize, usize)> {
        self.neighbours_moore(x, y)
            .into_iter()
            .filter(|&(nx, ny)| registry.cell_type(self.get(nx, ny)) == cell_type)
            .collect()
    }

    /// Rewrite every pixel from the current labels and their super-cells' colours.
    pub fn full_pixel_refresh(&mut self, registry: &SuperCellRegistry) {
        for y in 0..self.boundary_height {
            for x in 0..self.boundary_width {
                let id = self.grid[self.idx(x, y)];
                self.pixels.write(x, y, self.boundary_width, registry.colour(id));
            }
        }
    }

    /// Count how many of the four axis-neighbours of `(x, y)` belong to a different super-cell.
    /// Used by the (σ-gated) surface energy term; grounded on `SquareCellGrid::calcSubCellPerimeter`.
    pub fn subcell_perimeter(&self, x: usize, y: usize) -> i64 {
        let here = self.get(x, y);
        let mut count = 0;
        if self.get(x, y - 1) != here {
            count += 1;
        }
        if self.get(x, y + 1) != here {
            count += 1;
        }
        if self.get(x - 1, y) != here {
            count += 1;
        }
        if self.get(x + 1, y) != here {
            count += 1;
        }
        count
    }

    /// Recompute every super-cell's `surface` field from scratch. Grounded on
    /// `SquareCellGrid::fullPerimeterRefresh`.
    pub fn recompute_surfaces(&self, registry: &mut SuperCellRegistry) {
        for id in registry.ids().collect::<Vec<_>>() {
            registry.set_surface(id, 0);
        }
        for x in 1..=self.interior_width {
            for y in 1..=self.interior_height {
                let id = self.get(x, y);
                let perimeter = self.subcell_perimeter(x, y);
                registry.change_surface(id, perimeter);
            }
        }
    }

    /// Snapshot the pixel buffer's handle for sharing with a renderer.
    pub fn pixel_view(&self) -> &PixelView {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supercell::{SuperCellRegistry, SuperCellType};

    fn fresh_registry() -> SuperCellRegistry {
        let mut registry = SuperCellRegistry::new();
        registry.create_with_colour(SuperCellType::Boundary, 0, 0, 0, crate::supercell::Colour::rgb(255, 255, 255));
        registry.create_with_colour(SuperCellType::EmptySpace, 0, 0, 0, crate::supercell::Colour::rgb(0, 0, 0));
        registry
    }

    #[test]
    fn boundary_ring_is_immutable_label() {
        let lattice = Lattice::new(4, 4, BOUNDARY_ID + 1);
        for x in 0..lattice.boundary_width {
            assert_eq!(lattice.get(x, 0), BOUNDARY_ID);
            assert_eq!(lattice.get(x, lattice.boundary_height - 1), BOUNDARY_ID);
        }
        for y in 0..lattice.boundary_height {
            assert_eq!(lattice.get(0, y), BOUNDARY_ID);
            assert_eq!(lattice.get(lattice.boundary_width - 1, y), BOUNDARY_ID);
        }
    }

    #[test]
    fn moore_neighbours_has_eight_distinct_coords() {
        let lattice = Lattice::new(10, 10, 1);
        let neighbours = lattice.neighbours_moore(5, 5);
        assert_eq!(neighbours.len(), 8);
        let unique: std::collections::HashSet<_> = neighbours.iter().collect();
        assert_eq!(unique.len(), 8);
        assert!(!neighbours.contains(&(5, 5)));
    }

    #[test]
    fn set_label_updates_volume_and_pixel() {
        let mut registry = fresh_registry();
        let generic = registry.create_with_colour(SuperCellType::Generic, 0, 0, 0, crate::supercell::Colour::rgb(10, 20, 30));
        let mut lattice = Lattice::new(4, 4, 1);
        registry.set_volume(1, lattice.count_label(1));
        registry.set_volume(0, lattice.count_label(0));

        lattice.set_label(2, 2, generic, &mut registry);
        assert_eq!(lattice.get(2, 2), generic);
        assert_eq!(registry.volume(generic), 1);
        assert_eq!(registry.volume(1), 4 * 4 - 1);
    }

    #[test]
    fn neighbours_of_type_filters_correctly() {
        let mut registry = fresh_registry();
        let mut lattice = Lattice::new(4, 4, 1);
        let generic = registry.create_with_colour(SuperCellType::Generic, 0, 0, 0, crate::supercell::Colour::rgb(1, 2, 3));
        lattice.set_label(2, 2, generic, &mut registry);
        let empty_neighbours = lattice.neighbours_of_type(2, 2, SuperCellType::EmptySpace, &registry);
        assert_eq!(empty_neighbours.len(), 8);
    }
}
