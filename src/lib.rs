//! Two-dimensional Cellular Potts Model simulator of early mammalian embryogenesis: morula
//! division, compaction, trophectoderm/ICM differentiation, and blastocyst cavity growth on a
//! single lattice, driven by a Metropolis-Hastings Monte Carlo engine.
//!
//! Grounded on the original `Main.cpp`/`SquareCellGrid.cpp` simulation loop, re-expressed in the
//! module layout and idioms of `cellular_raza`'s concepts/building-blocks/core split: a
//! registry-of-records domain model (`supercell`), a pure-geometry layer (`geometry`), a
//! Hamiltonian-evaluating engine (`mc_engine`), and a policy layer (`scheduler`) that never
//! touches randomness directly but is generic over it (`sampler`).

pub mod config;
pub mod error;
pub mod geometry;
pub mod lattice;
pub mod mc_engine;
pub mod pixel;
pub mod sampler;
pub mod scheduler;
pub mod simulation;
pub mod supercell;

pub use config::{Cli, SimulationConfig};
pub use simulation::Simulation;
