use clap::Parser;
use tracing::info;

use crate::benchmark::Strategy;
use crate::diagonalization::SolverSettings;
use crate::error::PowerError;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "matrix-power-bench",
    about = "Times direct and eigendecomposition-based powers of a random square matrix"
)]
pub struct Args {
    #[arg(
        short,
        long,
        default_value_t = 2,
        help = "matrix dimension",
        help_heading = "Workload",
        display_order = 1
    )]
    dimension: usize,
    #[arg(
        short,
        long,
        default_value_t = 4500,
        help = "power to raise the matrix to",
        help_heading = "Workload",
        display_order = 2
    )]
    exponent: u64,
    #[arg(
        short,
        long,
        default_value_t = 13,
        help = "entries are drawn from [0, modulus)",
        help_heading = "Workload",
        display_order = 3
    )]
    modulus: u32,
    #[arg(
        short,
        long,
        help = "random seed, drawn from OS entropy when absent",
        help_heading = "Workload",
        display_order = 4
    )]
    seed: Option<u64>,
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [Strategy::Direct, Strategy::Diagonalize, Strategy::Exact],
        help = "strategies to run, in order",
        help_heading = "Workload",
        display_order = 5
    )]
    strategies: Vec<Strategy>,
    #[arg(
        long,
        default_value_t = 1000,
        help = "iteration cap for the eigen solvers",
        help_heading = "Solver",
        display_order = 10
    )]
    max_iterations: usize,
    #[arg(
        long,
        default_value_t = 1e8,
        help = "warn when the eigenvector condition number exceeds this",
        help_heading = "Solver",
        display_order = 11
    )]
    condition_warning: f64,
}

/// Validated benchmark parameters.
#[derive(Clone, Debug)]
pub struct BenchConfig {
    pub dimension: usize,
    pub exponent: u64,
    pub modulus: u32,
    pub seed: u64,
    pub strategies: Vec<Strategy>,
    pub solver: SolverSettings,
}

impl BenchConfig {
    /// The reference workload: a 2x2 matrix mod 13 raised to the 4500th power.
    pub fn reference(seed: u64) -> Self {
        Self {
            dimension: 2,
            exponent: 4500,
            modulus: 13,
            seed,
            strategies: vec![Strategy::Direct, Strategy::Diagonalize, Strategy::Exact],
            solver: SolverSettings::default(),
        }
    }

    pub fn validate(&self) -> Result<(), PowerError> {
        if self.dimension == 0 {
            return Err(PowerError::InvalidConfig("dimension must be at least 1".into()));
        }
        if self.modulus == 0 {
            return Err(PowerError::InvalidConfig("modulus must be at least 1".into()));
        }
        if self.strategies.is_empty() {
            return Err(PowerError::InvalidConfig("no strategy selected".into()));
        }
        if self.solver.max_iterations == 0 {
            return Err(PowerError::InvalidConfig("max-iterations must be at least 1".into()));
        }
        let threshold = self.solver.condition_warning;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(PowerError::InvalidConfig(format!(
                "condition-warning must be a positive number, got {threshold}"
            )));
        }
        Ok(())
    }
}

impl Args {
    pub fn into_config(self) -> Result<BenchConfig, PowerError> {
        let seed = match self.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random();
                info!(seed, "no seed given, drew one from entropy");
                seed
            }
        };

        let config = BenchConfig {
            dimension: self.dimension,
            exponent: self.exponent,
            modulus: self.modulus,
            seed,
            strategies: self.strategies,
            solver: SolverSettings {
                max_iterations: self.max_iterations,
                condition_warning: self.condition_warning,
            },
        };
        config.validate()?;

        Ok(config)
    }
}
