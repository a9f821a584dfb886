//! The SuperCell registry: a dense, append-only, id-indexed table of cell records.
//!
//! Grounded on `cellular_raza_concepts::cell::CellAgentBox`'s id-indexed, never-deleted
//! container pattern — the lattice stores only ids (values), the registry owns every record, and
//! nothing is ever reference counted because nothing is ever freed.

use crate::error::InvalidId;
use crate::sampler::Sampler;

/// Dense, zero-based identifier for a super-cell. Ids 0 and 1 are permanently bound to
/// [`SuperCellType::Boundary`] and [`SuperCellType::EmptySpace`] respectively.
pub type SuperCellId = usize;

pub const BOUNDARY_ID: SuperCellId = 0;
pub const EMPTY_SPACE_ID: SuperCellId = 1;

/// The developmental identity of a super-cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(usize)]
pub enum SuperCellType {
    Boundary = 0,
    EmptySpace = 1,
    Fluid = 2,
    Generic = 3,
    GenericCompact = 4,
    Trophectoderm = 5,
    Icm = 6,
}

impl SuperCellType {
    pub const COUNT: usize = 7;
    pub const ALL: [SuperCellType; Self::COUNT] = [
        SuperCellType::Boundary,
        SuperCellType::EmptySpace,
        SuperCellType::Fluid,
        SuperCellType::Generic,
        SuperCellType::GenericCompact,
        SuperCellType::Trophectoderm,
        SuperCellType::Icm,
    ];

    /// Dense index into a `[[_; 7]; 7]` type-to-type table such as [`crate::config::JMatrix`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// RGBA colour, channel order declared once here and honoured by [`crate::pixel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Colour {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// A single super-cell record.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SuperCell {
    pub id: SuperCellId,
    pub cell_type: SuperCellType,
    pub colour: Colour,
    pub volume: i64,
    pub target_volume: i64,
    pub surface: i64,
    pub target_surface: i64,
    pub generation: u32,
    pub mcs: u64,
    /// The MCS at which this cell will next attempt to divide. `None` until scheduled.
    pub next_div: Option<u64>,
}

/// Process-wide (but explicitly owned, never global) table of [`SuperCell`] records.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SuperCellRegistry {
    cells: Vec<SuperCell>,
}

impl SuperCellRegistry {
    pub fn new() -> Self {
        Self { cells: Vec::new() }
    }

    /// Exclusive upper bound of valid ids.
    pub fn counter(&self) -> usize {
        self.cells.len()
    }

    /// Out-of-range ids can only arise from a bug inside this crate, never from external input;
    /// `InvalidId` is returned rather than panicking so callers that do have a recovery path
    /// (tests, fuzzing) aren't forced to catch a panic, but every in-crate caller that reaches
    /// this from a live id is expected to `expect()` it away.
    fn check_id(&self, id: SuperCellId) -> Result<(), InvalidId> {
        if id >= self.cells.len() {
            Err(InvalidId::new(format!(
                "super-cell id {id} is out of range (counter={})",
                self.cells.len()
            )))
        } else {
            Ok(())
        }
    }

    /// Create a new super-cell with an explicit colour. Used for the three reserved types
    /// (BOUNDARY, EMPTYSPACE, FLUID), which are never auto-coloured.
    pub fn create_with_colour(
        &mut self,
        cell_type: SuperCellType,
        generation: u32,
        target_volume: i64,
        target_surface: i64,
        colour: Colour,
    ) -> SuperCellId {
        let id = self.cells.len();
        self.cells.push(SuperCell {
            id,
            cell_type,
            colour,
            volume: 0,
            target_volume,
            surface: 0,
            target_surface,
            generation,
            mcs: 0,
            next_div: None,
        });
        id
    }

    /// Create a new super-cell, auto-generating a colour in a biologically plausible palette for
    /// the given type.
    pub fn create(
        &mut self,
        cell_type: SuperCellType,
        generation: u32,
        target_volume: i64,
        target_surface: i64,
        sampler: &mut impl Sampler,
    ) -> SuperCellId {
        let colour = random_colour_for(cell_type, sampler);
        self.create_with_colour(cell_type, generation, target_volume, target_surface, colour)
    }

    /// Append a new record inheriting type, generation and targets from `parent_id`, with a
    /// freshly sampled (slightly perturbed) colour.
    pub fn clone_from(
        &mut self,
        parent_id: SuperCellId,
        sampler: &mut impl Sampler,
    ) -> Result<SuperCellId, InvalidId> {
        self.check_id(parent_id)?;
        let parent = self.cells[parent_id].clone();
        let colour = random_colour_for(parent.cell_type, sampler);
        Ok(self.create_with_colour(
            parent.cell_type,
            parent.generation,
            parent.target_volume,
            parent.target_surface,
            colour,
        ))
    }

    pub fn get(&self, id: SuperCellId) -> Result<&SuperCell, InvalidId> {
        self.check_id(id)?;
        Ok(&self.cells[id])
    }

    pub fn get_mut(&mut self, id: SuperCellId) -> Result<&mut SuperCell, InvalidId> {
        self.check_id(id)?;
        Ok(&mut self.cells[id])
    }

    pub fn cell_type(&self, id: SuperCellId) -> SuperCellType {
        self.cells[id].cell_type
    }

    pub fn set_cell_type(&mut self, id: SuperCellId, cell_type: SuperCellType) {
        self.cells[id].cell_type = cell_type;
    }

    pub fn colour(&self, id: SuperCellId) -> Colour {
        self.cells[id].colour
    }

    pub fn set_colour(&mut self, id: SuperCellId, colour: Colour) {
        self.cells[id].colour = colour;
    }

    pub fn volume(&self, id: SuperCellId) -> i64 {
        self.cells[id].volume
    }

    pub fn set_volume(&mut self, id: SuperCellId, volume: i64) {
        self.cells[id].volume = volume;
    }

    pub fn change_volume(&mut self, id: SuperCellId, delta: i64) {
        self.cells[id].volume += delta;
    }

    pub fn target_volume(&self, id: SuperCellId) -> i64 {
        self.cells[id].target_volume
    }

    pub fn set_target_volume(&mut self, id: SuperCellId, target_volume: i64) {
        self.cells[id].target_volume = target_volume;
    }

    pub fn surface(&self, id: SuperCellId) -> i64 {
        self.cells[id].surface
    }

    pub fn set_surface(&mut self, id: SuperCellId, surface: i64) {
        self.cells[id].surface = surface;
    }

    pub fn change_surface(&mut self, id: SuperCellId, delta: i64) {
        self.cells[id].surface += delta;
    }

    pub fn target_surface(&self, id: SuperCellId) -> i64 {
        self.cells[id].target_surface
    }

    pub fn set_target_surface(&mut self, id: SuperCellId, target_surface: i64) {
        self.cells[id].target_surface = target_surface;
    }

    pub fn generation(&self, id: SuperCellId) -> u32 {
        self.cells[id].generation
    }

    pub fn increase_generation(&mut self, id: SuperCellId) {
        self.cells[id].generation += 1;
    }

    pub fn mcs(&self, id: SuperCellId) -> u64 {
        self.cells[id].mcs
    }

    pub fn set_mcs(&mut self, id: SuperCellId, mcs: u64) {
        self.cells[id].mcs = mcs;
    }

    pub fn next_div(&self, id: SuperCellId) -> Option<u64> {
        self.cells[id].next_div
    }

    pub fn set_next_div(&mut self, id: SuperCellId, next_div: u64) {
        self.cells[id].next_div = Some(next_div);
    }

    /// Increment `mcs` on every super-cell in the registry. Called once per MCS.
    pub fn tick(&mut self) {
        for cell in &mut self.cells {
            cell.mcs += 1;
        }
    }

    /// Iterate over all ids currently in the registry, in creation order.
    pub fn ids(&self) -> impl Iterator<Item = SuperCellId> + '_ {
        0..self.cells.len()
    }

    /// Change `id`'s type and draw it a fresh colour from that type's palette. Used when a
    /// super-cell differentiates into a new lineage.
    pub fn recolour(&mut self, id: SuperCellId, cell_type: SuperCellType, sampler: &mut impl Sampler) {
        self.cells[id].cell_type = cell_type;
        self.cells[id].colour = random_colour_for(cell_type, sampler);
    }
}

/// Sample an RGBA colour in a narrow, desaturated range appropriate to `cell_type`. The reserved
/// types (BOUNDARY, EMPTYSPACE, FLUID) are never passed here in practice — callers give them
/// fixed colours via [`SuperCellRegistry::create_with_colour`].
fn random_colour_for(cell_type: SuperCellType, sampler: &mut impl Sampler) -> Colour {
    let (r_lo, r_hi, g_lo, g_hi, b_lo, b_hi) = match cell_type {
        SuperCellType::Generic => (200, 255, 150, 200, 150, 190),
        SuperCellType::GenericCompact => (190, 230, 140, 180, 120, 160),
        SuperCellType::Trophectoderm => (120, 170, 150, 200, 210, 255),
        SuperCellType::Icm => (150, 200, 190, 230, 150, 190),
        SuperCellType::Boundary | SuperCellType::EmptySpace | SuperCellType::Fluid => {
            (0, 255, 0, 255, 0, 255)
        }
    };
    Colour::rgb(
        sampler.uniform_int(r_lo, r_hi) as u8,
        sampler.uniform_int(g_lo, g_hi) as u8,
        sampler.uniform_int(b_lo, b_hi) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::ChaChaSampler;

    #[test]
    fn create_assigns_dense_sequential_ids() {
        let mut registry = SuperCellRegistry::new();
        let mut sampler = ChaChaSampler::from_seed(1);
        let a = registry.create(SuperCellType::Generic, 0, 16, 0, &mut sampler);
        let b = registry.create(SuperCellType::Generic, 0, 16, 0, &mut sampler);
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(registry.counter(), 2);
    }

    #[test]
    fn invalid_id_is_reported() {
        let registry = SuperCellRegistry::new();
        assert!(registry.get(0).is_err());
    }

    #[test]
    fn clone_from_inherits_generation_and_targets() {
        let mut registry = SuperCellRegistry::new();
        let mut sampler = ChaChaSampler::from_seed(2);
        let parent = registry.create(SuperCellType::Generic, 2, 40, 24, &mut sampler);
        let child = registry.clone_from(parent, &mut sampler).unwrap();
        assert_eq!(registry.generation(child), 2);
        assert_eq!(registry.target_volume(child), 40);
        assert_eq!(registry.target_surface(child), 24);
        assert_eq!(registry.cell_type(child), SuperCellType::Generic);
    }

    #[test]
    fn tick_advances_every_cell() {
        let mut registry = SuperCellRegistry::new();
        let mut sampler = ChaChaSampler::from_seed(3);
        let a = registry.create(SuperCellType::Generic, 0, 0, 0, &mut sampler);
        let b = registry.create(SuperCellType::Generic, 0, 0, 0, &mut sampler);
        registry.tick();
        registry.tick();
        assert_eq!(registry.mcs(a), 2);
        assert_eq!(registry.mcs(b), 2);
    }
}
