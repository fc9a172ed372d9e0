use std::fmt;
use std::time::{Duration, Instant};

use clap::ValueEnum;
use nalgebra::Complex;
use num_bigint::BigInt;
use tracing::{debug, info, warn};

use crate::config::BenchConfig;
use crate::diagonalization::Diagonalizer;
use crate::error::PowerError;
use crate::generator::MatrixGenerator;
use crate::math::{matrix_pow, scalar_pow, SquareMatrix};
use crate::scaled::Scaled;

/// How the n-th power is computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Exponentiation by squaring on the `f64` matrix.
    Direct,
    /// Eigendecomposition, scalar powers, similarity transform.
    Diagonalize,
    /// Exponentiation by squaring over arbitrary-precision integers.
    Exact,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Direct => "direct",
            Strategy::Diagonalize => "diagonalize",
            Strategy::Exact => "exact",
        };
        f.write_str(name)
    }
}

/// Top-left entry of a phase's result.
#[derive(Clone, Debug, PartialEq)]
pub enum Checksum {
    Real(Scaled<f64>),
    Complex(Scaled<Complex<f64>>),
    Exact(BigInt),
}

impl Checksum {
    pub fn to_scaled(&self) -> Scaled<Complex<f64>> {
        match self {
            Checksum::Real(x) => x.to_complex(),
            Checksum::Complex(z) => *z,
            Checksum::Exact(n) => Scaled::from_bigint(n).to_complex(),
        }
    }

    /// The checksum as a plain complex number; infinite outside `f64` range.
    pub fn as_complex(&self) -> Complex<f64> {
        self.to_scaled().to_value()
    }

    pub fn relative_error(&self, reference: &Checksum) -> f64 {
        self.to_scaled().relative_error(&reference.to_scaled())
    }

    fn is_finite(&self) -> bool {
        match self {
            Checksum::Exact(_) => true,
            other => other.to_scaled().is_finite(),
        }
    }
}

// Exact values longer than this are abbreviated
const MAX_EXACT_DIGITS: usize = 40;

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checksum::Real(x) => write!(f, "{x}"),
            Checksum::Complex(z) => write!(f, "{z}"),
            Checksum::Exact(n) => {
                let digits = n.to_string();
                if digits.len() <= MAX_EXACT_DIGITS {
                    f.write_str(&digits)
                } else {
                    write!(
                        f,
                        "{}...{} ({} digits)",
                        &digits[..20],
                        &digits[digits.len() - 10..],
                        digits.len()
                    )
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct PhaseReport {
    pub label: &'static str,
    pub strategy: Strategy,
    pub elapsed: Duration,
    pub checksum: Option<Checksum>,
    /// Relative error of the checksum against the exact phase, when one ran.
    pub deviation: Option<f64>,
}

impl fmt::Display for PhaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} time:", self.label)?;
        writeln!(f, "{} ms", self.elapsed.as_millis())?;
        if let Some(checksum) = &self.checksum {
            writeln!(f, "checksum:")?;
            writeln!(f, "{checksum}")?;
        }
        if let Some(deviation) = self.deviation {
            writeln!(f, "relative error vs exact:")?;
            writeln!(f, "{deviation:e}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct BenchmarkReport {
    pub seed: u64,
    pub phases: Vec<PhaseReport>,
}

impl BenchmarkReport {
    /// Checksum of the last phase run with `strategy`.
    pub fn checksum(&self, strategy: Strategy) -> Option<&Checksum> {
        self.phases
            .iter()
            .rev()
            .filter(|phase| phase.strategy == strategy)
            .find_map(|phase| phase.checksum.as_ref())
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for phase in &self.phases {
            writeln!(f, "{phase}")?;
        }
        Ok(())
    }
}

/// Runs `f` once and measures it with a monotonic clock.
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let value = f();
    (value, start.elapsed())
}

/// Drives every configured strategy once, in order.
///
/// Each strategy draws its input from a generator seeded with the same
/// process seed, so all of them power the same matrix.
pub fn run(config: &BenchConfig) -> Result<BenchmarkReport, PowerError> {
    let mut phases = Vec::new();

    for &strategy in &config.strategies {
        let input =
            MatrixGenerator::seeded(config.seed, config.dimension, config.modulus)?.generate();
        info!(%strategy, dimension = config.dimension, exponent = config.exponent, "running strategy");
        debug!(%input, "generated input");

        match strategy {
            Strategy::Direct => phases.push(run_direct(&input, config.exponent)),
            Strategy::Diagonalize => phases.extend(run_diagonalize(&input, config)?),
            Strategy::Exact => phases.push(run_exact(&input, config.exponent)),
        }
    }

    let exact = phases
        .iter()
        .find_map(|phase| match &phase.checksum {
            Some(checksum @ Checksum::Exact(_)) => Some(checksum.clone()),
            _ => None,
        });

    for phase in &mut phases {
        let Some(checksum) = &phase.checksum else {
            continue;
        };
        if !checksum.is_finite() {
            warn!(label = phase.label, "checksum is not finite");
        }
        if let (Some(exact), false) = (&exact, phase.strategy == Strategy::Exact) {
            let deviation = checksum.relative_error(exact);
            info!(label = phase.label, deviation, "compared against exact power");
            phase.deviation = Some(deviation);
        }
    }

    Ok(BenchmarkReport {
        seed: config.seed,
        phases,
    })
}

fn run_direct(input: &SquareMatrix<u32>, exponent: u64) -> PhaseReport {
    let matrix = input.map(|&x| Scaled::new(f64::from(x)));
    let (result, elapsed) = timed(|| matrix_pow(matrix, exponent));

    PhaseReport {
        label: "direct power",
        strategy: Strategy::Direct,
        elapsed,
        checksum: result.top_left().copied().map(Checksum::Real),
        deviation: None,
    }
}

fn run_diagonalize(
    input: &SquareMatrix<u32>,
    config: &BenchConfig,
) -> Result<[PhaseReport; 2], PowerError> {
    let diagonalizer = Diagonalizer::new(input.map(|&x| f64::from(x))).with_settings(config.solver);

    let (diagonalized, elapsed) = timed(|| diagonalizer.diagonalize());
    let diagonalized = diagonalized?;
    let decomposition = PhaseReport {
        label: "diagonalization",
        strategy: Strategy::Diagonalize,
        elapsed,
        checksum: None,
        deviation: None,
    };

    let (powered, elapsed) =
        timed(|| diagonalized.calculate_scaled(config.exponent, scalar_pow));
    let powered = powered?;
    let power = PhaseReport {
        label: "diagonalized power",
        strategy: Strategy::Diagonalize,
        elapsed,
        checksum: powered.result().top_left().copied().map(Checksum::Complex),
        deviation: None,
    };

    Ok([decomposition, power])
}

fn run_exact(input: &SquareMatrix<u32>, exponent: u64) -> PhaseReport {
    let matrix = input.map(|&x| BigInt::from(x));
    let (result, elapsed) = timed(|| matrix_pow(matrix, exponent));

    PhaseReport {
        label: "exact power",
        strategy: Strategy::Exact,
        elapsed,
        checksum: result.top_left().cloned().map(Checksum::Exact),
        deviation: None,
    }
}
