//! Configuration surface: the `clap`-derived CLI record, the embedded physical constants, and
//! the developmental stage distributions.
//!
//! Grounded on the original `Main.cpp`'s `simInit` (`boost::program_options`), re-expressed with
//! `clap`'s derive API, the way simulation CLIs such as `Daxanius-gradwork-ca`,
//! `rrumana-game_of_life` and `dirkhillbrecht-mandel-rs` configure width/height/seed/delay; see
//! `DESIGN.md`.

use crate::error::ConfigError;
use crate::supercell::SuperCellType;

/// Default seed so a bare `cpm_embryo` invocation is reproducible run to run.
pub const DEFAULT_SEED: u64 = 0x5EED_5EED;

/// One Monte Carlo Step is calibrated to represent roughly this fraction of an hour of
/// development.
pub const MCS_HOUR_EST: f64 = 500.0;

/// Morula divisions stop once a cell's generation passes this value.
pub const MAX_GEN: u32 = 4;

/// Scales target-surface derivation in [`crate::geometry::cleave`].
pub const BORDER_CONST: i64 = 4;

/// Bound on random probes during cavity seeding before falling back to an exhaustive scan; see
/// `DESIGN.md`'s Open Question decision.
pub const CAVITY_SEED_MAX_ATTEMPTS_PER_AREA: usize = 10;

/// Command-line options recognised at startup. Parsed by the binary crate; the simulation
/// library itself never touches `std::env::args`.
#[derive(clap::Parser, Debug, Clone)]
#[command(name = "cpm_embryo", about = "Two-dimensional Cellular Potts Model simulator for early mammalian embryogenesis")]
pub struct Cli {
    /// Number of Monte Carlo Steps to run before stopping.
    #[arg(long, short = 'i', default_value_t = (6.0 * 24.0 * MCS_HOUR_EST) as u64)]
    pub max_mcs: u64,

    /// Pixels per lattice site in the (external) renderer's surface.
    #[arg(long, short = 'p', default_value_t = 4)]
    pub pixel_scale: u32,

    /// Interior lattice width.
    #[arg(long, short = 'w', default_value_t = 150)]
    pub width: usize,

    /// Interior lattice height.
    #[arg(long, short = 'g', default_value_t = 150)]
    pub height: usize,

    /// Artificial per-MCS delay in milliseconds, for throttling visualisation.
    #[arg(long, short = 'd', default_value_t = 0)]
    pub delay: u64,

    /// Renderer refresh cap in frames per second.
    #[arg(long, short = 'f', default_value_t = 30)]
    pub fps: u32,

    /// RNG seed.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// `tracing-subscriber` `EnvFilter` directive, e.g. `info`, `debug`, `cpm_embryo=trace`.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Symmetric type-to-type contact energy matrix, `J[a][b]`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct JMatrix(pub [[f64; SuperCellType::COUNT]; SuperCellType::COUNT]);

impl JMatrix {
    /// A matrix of all zeroes; adhesion contributes nothing to ΔH. Used by the volume-only and
    /// pure-diffusion micro-tests, and available to any caller who wants adhesion disabled.
    pub fn zero() -> Self {
        JMatrix([[0.0; SuperCellType::COUNT]; SuperCellType::COUNT])
    }

    /// A biologically plausible baseline: BOUNDARY strongly repels everything, EMPTYSPACE is
    /// energetically neutral with itself, and embryonic cell types adhere more strongly to their
    /// own kind than to their neighbours, consistent with compaction driving morula cells
    /// together and trophectoderm preferentially lining the empty-space/fluid interface.
    pub fn baseline() -> Self {
        use SuperCellType::*;
        let mut j = [[8.0; SuperCellType::COUNT]; SuperCellType::COUNT];
        let set = |j: &mut [[f64; SuperCellType::COUNT]; SuperCellType::COUNT], a: SuperCellType, b: SuperCellType, v: f64| {
            j[a.index()][b.index()] = v;
            j[b.index()][a.index()] = v;
        };
        for t in SuperCellType::ALL {
            set(&mut j, Boundary, t, 50.0);
        }
        set(&mut j, EmptySpace, EmptySpace, 0.0);
        set(&mut j, EmptySpace, Fluid, 2.0);
        set(&mut j, EmptySpace, Generic, 10.0);
        set(&mut j, EmptySpace, GenericCompact, 14.0);
        set(&mut j, EmptySpace, Trophectoderm, 6.0);
        set(&mut j, EmptySpace, Icm, 16.0);
        set(&mut j, Fluid, Fluid, 0.0);
        set(&mut j, Fluid, Generic, 10.0);
        set(&mut j, Fluid, GenericCompact, 14.0);
        set(&mut j, Fluid, Trophectoderm, 4.0);
        set(&mut j, Fluid, Icm, 12.0);
        set(&mut j, Generic, Generic, 6.0);
        set(&mut j, Generic, GenericCompact, 8.0);
        set(&mut j, GenericCompact, GenericCompact, 4.0);
        set(&mut j, Trophectoderm, Trophectoderm, 5.0);
        set(&mut j, Trophectoderm, Icm, 11.0);
        set(&mut j, Icm, Icm, 4.0);
        set(&mut j, GenericCompact, Trophectoderm, 8.0);
        set(&mut j, GenericCompact, Icm, 8.0);
        set(&mut j, Generic, Trophectoderm, 8.0);
        set(&mut j, Generic, Icm, 8.0);
        set(&mut j, Boundary, Boundary, 0.0);
        JMatrix(j)
    }

    pub fn get(&self, a: SuperCellType, b: SuperCellType) -> f64 {
        self.0[a.index()][b.index()]
    }
}

/// The parameters the Monte Carlo engine needs for its Hamiltonian.
#[derive(Debug, Clone)]
pub struct McParams {
    pub boltz_temp: f64,
    pub lambda: f64,
    pub sigma: f64,
    pub j_matrix: JMatrix,
}

impl Default for McParams {
    fn default() -> Self {
        Self {
            boltz_temp: 10.0,
            lambda: 5.0,
            sigma: 0.0,
            j_matrix: JMatrix::baseline(),
        }
    }
}

/// A mean/standard-deviation pair feeding `Sampler::normal`.
#[derive(Debug, Clone, Copy)]
pub struct NormalTarget {
    pub mean: f64,
    pub std_dev: f64,
}

/// The stochastic developmental timing constants driving the stage machine, all expressed in MCS.
#[derive(Debug, Clone)]
pub struct StageDistributions {
    pub morula_division: NormalTarget,
    pub compaction: NormalTarget,
    pub differentiation: NormalTarget,
    pub icm_division: NormalTarget,
    /// Trophectoderm division mean is `9h + (m/250)^2`, std is a constant 3h; `base_std` holds
    /// that constant, the mean is computed per-call in the scheduler from `m`.
    pub trophectoderm_division_std: f64,
}

impl Default for StageDistributions {
    fn default() -> Self {
        Self {
            morula_division: NormalTarget { mean: 12.0 * MCS_HOUR_EST, std_dev: 0.5 * MCS_HOUR_EST },
            compaction: NormalTarget { mean: 72.0 * MCS_HOUR_EST, std_dev: 0.5 * MCS_HOUR_EST },
            differentiation: NormalTarget { mean: 96.0 * MCS_HOUR_EST, std_dev: 1.0 * MCS_HOUR_EST },
            icm_division: NormalTarget { mean: 12.0 * MCS_HOUR_EST, std_dev: 1.0 * MCS_HOUR_EST },
            trophectoderm_division_std: 3.0 * MCS_HOUR_EST,
        }
    }
}

/// Fully resolved, validated simulation configuration: the CLI record plus every embedded
/// physical and developmental constant the simulation needs.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub max_mcs: u64,
    pub pixel_scale: u32,
    pub width: usize,
    pub height: usize,
    pub delay_ms: u64,
    pub fps: u32,
    pub seed: u64,
    pub log_level: String,

    pub target_init_cells: i64,
    pub mc_params: McParams,
    pub stage_distributions: StageDistributions,
    pub border_const: i64,
    pub mcs_hour_est: f64,
}

impl SimulationConfig {
    /// Validate and resolve a [`Cli`] into a full [`SimulationConfig`], filling in the embedded
    /// constants that are not user-tunable from the command line.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        if cli.width == 0 || cli.height == 0 {
            return Err(ConfigError::new("width and height must both be positive"));
        }
        if cli.max_mcs == 0 {
            return Err(ConfigError::new("max_mcs must be positive"));
        }
        if cli.fps == 0 {
            return Err(ConfigError::new("fps must be positive"));
        }
        Ok(Self {
            max_mcs: cli.max_mcs,
            pixel_scale: cli.pixel_scale,
            width: cli.width,
            height: cli.height,
            delay_ms: cli.delay,
            fps: cli.fps,
            seed: cli.seed,
            log_level: cli.log_level,
            target_init_cells: 3200,
            mc_params: McParams::default(),
            stage_distributions: StageDistributions::default(),
            border_const: BORDER_CONST,
            mcs_hour_est: MCS_HOUR_EST,
        })
    }

    /// A small configuration convenient for unit/integration tests.
    #[cfg(test)]
    pub fn test_default(width: usize, height: usize) -> Self {
        Self {
            max_mcs: 100,
            pixel_scale: 1,
            width,
            height,
            delay_ms: 0,
            fps: 30,
            seed: DEFAULT_SEED,
            log_level: "warn".into(),
            target_init_cells: 16,
            mc_params: McParams::default(),
            stage_distributions: StageDistributions::default(),
            border_const: BORDER_CONST,
            mcs_hour_est: MCS_HOUR_EST,
        }
    }

    pub fn cavity_seed_max_attempts(&self) -> usize {
        CAVITY_SEED_MAX_ATTEMPTS_PER_AREA * self.width * self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn j_matrix_is_symmetric() {
        let j = JMatrix::baseline();
        for a in SuperCellType::ALL {
            for b in SuperCellType::ALL {
                assert_eq!(j.get(a, b), j.get(b, a), "J matrix must be symmetric at ({a:?}, {b:?})");
            }
        }
    }

    #[test]
    fn from_cli_rejects_zero_dimensions() {
        let mut cli_args = vec!["cpm_embryo".to_string(), "--width".to_string(), "0".to_string()];
        cli_args.push("--height".into());
        cli_args.push("10".into());
        use clap::Parser;
        let cli = Cli::parse_from(cli_args);
        assert!(SimulationConfig::from_cli(cli).is_err());
    }
}
