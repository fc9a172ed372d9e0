//! # Matrix Power Benchmark
//!
//! This library times two ways of raising a small random square matrix to a large power:
//! exponentiation by squaring on the matrix itself, and eigendecomposition followed by
//! powering the eigenvalues and transforming back. Each phase reports its wall-clock time and
//! the top-left entry of its result as a spot check.
//!
//! ## Key Features
//! - **Exponentiation by Squaring**: one generic implementation for matrices and scalars over
//!   any ring, O(log n) multiplications.
//! - **Diagonalization**: eigenvalues from a real Schur decomposition, eigenvectors as null
//!   vectors of `A - λI`, reconstruction as `V · D^n · V⁻¹`.
//! - **Exact Reference**: the same direct power over arbitrary-precision integers, for a
//!   checksum that does not overflow or round. The float phases report their relative error
//!   against it.
//! - **Reproducibility**: the random stream is injected into the generator, and every strategy
//!   reseeds from one process seed so all of them see the same input.
//!
//! ## Overview of Modules
//!
//! ### `math`
//! `SquareMatrix`, `matrix_mult`, `matrix_pow` and `scalar_pow`. Both power functions start
//! their accumulator at the multiplicative identity, so an exponent of zero yields the
//! identity.
//!
//! ### `generator`
//! `MatrixGenerator` draws entries uniformly from `[0, modulus)` using the `rand::Rng` it
//! was built with.
//!
//! ### `diagonalization`
//! The `Diagonalizer -> Diagonalized -> Powered` state machine. Solver non-convergence and
//! singular eigenvector matrices are returned as `PowerError` values.
//!
//! ### `scaled`
//! `Scaled` numbers carry a separate binary exponent so powers far past the `f64` range stay
//! finite. Both float strategies compute on them.
//!
//! ### `benchmark`
//! `Strategy` selection, the `timed` helper and the `BenchmarkReport` printed by the binary.
//!
//! ### `config`
//! Command line arguments (`clap`) validated into a `BenchConfig`.
//!
//! ## Usage Example
//! ```rust
//! use matrix_power_bench::benchmark::{self, Checksum, Strategy};
//! use matrix_power_bench::config::BenchConfig;
//! let mut config = BenchConfig::reference(7);
//! config.exponent = 20;
//! config.strategies = vec![Strategy::Direct, Strategy::Exact];
//! let report = benchmark::run(&config).unwrap();
//! let direct = report.checksum(Strategy::Direct).unwrap().as_complex();
//! let exact = report.checksum(Strategy::Exact).unwrap().as_complex();
//! assert!((direct - exact).norm() <= 1e-9 * exact.norm().max(1.0));
//! # assert!(matches!(report.checksum(Strategy::Exact), Some(Checksum::Exact(_))));
//! ```

pub mod benchmark;
pub mod config;
pub mod diagonalization;
pub mod error;
pub mod generator;
pub mod math;
pub mod scaled;

pub use error::PowerError;
