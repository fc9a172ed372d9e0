//! Powering a matrix through its eigendecomposition.
//!
//! The path moves through three states, each its own type:
//! [`Diagonalizer`] holds the input, [`Diagonalized`] holds `D` and `V`,
//! and [`Powered`] holds `V · D^n · V⁻¹`.

use nalgebra::linalg::Schur;
use nalgebra::{Complex, DMatrix, DVector};
use num_traits::Zero;
use tracing::{debug, warn};

use crate::error::PowerError;
use crate::math::SquareMatrix;
use crate::scaled::{Mantissa, Scaled};

pub type ComplexMatrix = SquareMatrix<Complex<f64>>;
pub type ScaledComplexMatrix = SquareMatrix<Scaled<Complex<f64>>>;

/// Iteration caps and diagnostic thresholds for the eigen solvers.
#[derive(Clone, Copy, Debug)]
pub struct SolverSettings {
    /// Cap on Schur and SVD sweeps. Hitting it is reported as
    /// [`PowerError::NoConvergence`].
    pub max_iterations: usize,
    /// Condition number of `V` above which a warning is logged.
    pub condition_warning: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            condition_warning: 1e8,
        }
    }
}

pub struct Diagonalizer {
    matrix: SquareMatrix<f64>,
    settings: SolverSettings,
}

impl Diagonalizer {
    pub fn new(matrix: SquareMatrix<f64>) -> Self {
        Self {
            matrix,
            settings: SolverSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SolverSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Computes eigenvalues from a real Schur decomposition and, for each
    /// eigenvalue `λ`, an eigenvector spanning the null space of `A − λI`.
    pub fn diagonalize(self) -> Result<Diagonalized, PowerError> {
        let n = self.matrix.dim();
        let max_iterations = self.settings.max_iterations;
        let a = self.matrix.to_dmatrix();

        let schur = Schur::try_new(a.clone(), f64::EPSILON, max_iterations).ok_or(
            PowerError::NoConvergence {
                stage: "Schur decomposition",
                iterations: max_iterations,
            },
        )?;
        let eigenvalues = schur.complex_eigenvalues();
        debug!(?eigenvalues, "eigenvalues computed");

        let a = a.map(|x| Complex::new(x, 0.0));
        let mut eigenvectors = DMatrix::<Complex<f64>>::zeros(n, n);
        for (j, lambda) in eigenvalues.iter().enumerate() {
            let tol = f64::EPSILON.sqrt() * lambda.norm().max(1.0);
            let repeats = eigenvalues
                .iter()
                .take(j)
                .filter(|mu| (*mu - lambda).norm() <= tol)
                .count();
            let v = null_vector(&a, *lambda, repeats, max_iterations)?;
            eigenvectors.set_column(j, &v);
        }

        let condition = condition_number(&eigenvectors, max_iterations)?;
        if !condition.is_finite() || condition * f64::EPSILON >= 1.0 {
            return Err(PowerError::SingularEigenvectors { condition });
        }
        if condition > self.settings.condition_warning {
            warn!(
                condition,
                threshold = self.settings.condition_warning,
                "eigenvector matrix is ill-conditioned, reconstruction may lose accuracy"
            );
        } else {
            debug!(condition, "eigenvector matrix condition number");
        }

        Ok(Diagonalized {
            eigenvalues: DMatrix::from_diagonal(&eigenvalues),
            eigenvectors,
            condition,
        })
    }
}

pub struct Diagonalized {
    eigenvalues: DMatrix<Complex<f64>>,
    eigenvectors: DMatrix<Complex<f64>>,
    condition: f64,
}

impl Diagonalized {
    pub fn eigenvalues(&self) -> Vec<Complex<f64>> {
        self.eigenvalues.diagonal().iter().copied().collect()
    }

    /// Eigenvectors as the columns of a matrix.
    pub fn eigenvectors(&self) -> ComplexMatrix {
        to_square(&self.eigenvectors)
    }

    /// 2-norm condition number of the eigenvector matrix.
    pub fn condition_number(&self) -> f64 {
        self.condition
    }

    /// `V · D · V⁻¹`, which should give back the input matrix.
    pub fn reconstruct(&self) -> Result<ComplexMatrix, PowerError> {
        similarity(&self.eigenvectors, &self.eigenvalues, self.condition)
    }

    /// Replaces every eigenvalue by `pow_fn(λ, exponent)` and rebuilds the
    /// powered matrix as `V · D^n · V⁻¹`.
    pub fn calculate<F>(
        mut self,
        exponent: u64,
        pow_fn: F,
    ) -> Result<Powered<Complex<f64>>, PowerError>
    where
        F: Fn(Complex<f64>, u64) -> Complex<f64>,
    {
        for i in 0..self.eigenvalues.nrows() {
            self.eigenvalues[(i, i)] = pow_fn(self.eigenvalues[(i, i)], exponent);
        }
        let result = similarity(&self.eigenvectors, &self.eigenvalues, self.condition)?;

        Ok(Powered { exponent, result })
    }

    /// Like [`calculate`](Self::calculate), but the eigenvalue powers are
    /// carried as [`Scaled`] values so they may exceed the `f64` range.
    ///
    /// The powers share the largest exponent `E`; the reconstruction runs on
    /// mantissas relative to `2^E` and every entry of the result is tagged
    /// with `E`. Powers far below the largest one vanish against it.
    pub fn calculate_scaled<F>(
        mut self,
        exponent: u64,
        pow_fn: F,
    ) -> Result<Powered<Scaled<Complex<f64>>>, PowerError>
    where
        F: Fn(Scaled<Complex<f64>>, u64) -> Scaled<Complex<f64>>,
    {
        let n = self.eigenvalues.nrows();
        let powers: Vec<Scaled<Complex<f64>>> = (0..n)
            .map(|i| pow_fn(Scaled::new(self.eigenvalues[(i, i)]), exponent))
            .collect();
        let shared = powers
            .iter()
            .filter(|p| !p.is_zero())
            .map(|p| p.exponent())
            .max()
            .unwrap_or(0);
        for (i, power) in powers.iter().enumerate() {
            self.eigenvalues[(i, i)] = power.mantissa().ldexp(power.exponent() - shared);
        }
        debug!(shared_exponent = shared, "eigenvalue powers rescaled");

        let relative = similarity(&self.eigenvectors, &self.eigenvalues, self.condition)?;
        let result = SquareMatrix::from_fn(n, |i, j| Scaled::from_parts(relative[(i, j)], shared));

        Ok(Powered { exponent, result })
    }
}

pub struct Powered<T> {
    exponent: u64,
    result: SquareMatrix<T>,
}

impl<T> Powered<T> {
    pub fn exponent(&self) -> u64 {
        self.exponent
    }

    pub fn result(&self) -> &SquareMatrix<T> {
        &self.result
    }
}

fn similarity(
    v: &DMatrix<Complex<f64>>,
    d: &DMatrix<Complex<f64>>,
    condition: f64,
) -> Result<ComplexMatrix, PowerError> {
    let v_inv = v
        .clone()
        .try_inverse()
        .ok_or(PowerError::SingularEigenvectors { condition })?;
    Ok(to_square(&(v * d * v_inv)))
}

// Right singular vector of A − λI for the `repeats`-th smallest singular value,
// provided that value is numerically zero; otherwise the smallest one.
fn null_vector(
    a: &DMatrix<Complex<f64>>,
    lambda: Complex<f64>,
    repeats: usize,
    max_iterations: usize,
) -> Result<DVector<Complex<f64>>, PowerError> {
    let n = a.nrows();
    let shifted = a - DMatrix::from_diagonal_element(n, n, lambda);
    let svd = shifted
        .try_svd(false, true, f64::EPSILON, max_iterations)
        .ok_or(PowerError::NoConvergence {
            stage: "eigenvector SVD",
            iterations: max_iterations,
        })?;

    let sigma = &svd.singular_values;
    let mut order: Vec<usize> = (0..sigma.len()).collect();
    order.sort_by(|&i, &j| sigma[i].total_cmp(&sigma[j]));

    let largest = sigma.iter().copied().fold(1.0, f64::max);
    let tol = (n as f64) * f64::EPSILON.sqrt() * largest;
    let pick = order
        .get(repeats)
        .copied()
        .filter(|&i| sigma[i] <= tol)
        .unwrap_or(order[0]);
    let v_t = svd.v_t.expect("SVD was asked for right singular vectors");

    Ok(v_t.row(pick).adjoint())
}

fn condition_number(
    v: &DMatrix<Complex<f64>>,
    max_iterations: usize,
) -> Result<f64, PowerError> {
    let svd = v
        .clone()
        .try_svd(false, false, f64::EPSILON, max_iterations)
        .ok_or(PowerError::NoConvergence {
            stage: "condition number SVD",
            iterations: max_iterations,
        })?;

    let max = svd.singular_values.iter().copied().fold(0.0, f64::max);
    let min = svd
        .singular_values
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);

    Ok(if min == 0.0 { f64::INFINITY } else { max / min })
}

fn to_square(m: &DMatrix<Complex<f64>>) -> ComplexMatrix {
    SquareMatrix::from_fn(m.nrows(), |i, j| m[(i, j)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MatrixGenerator;
    use crate::math::{matrix_pow, scalar_pow};

    fn matrix(rows: &[&[f64]]) -> SquareMatrix<f64> {
        SquareMatrix::from_rows(rows.iter().map(|r| r.to_vec()).collect()).unwrap()
    }

    fn assert_close(actual: &ComplexMatrix, expected: &SquareMatrix<f64>, rtol: f64) {
        let scale = expected.iter().fold(1.0_f64, |m, x| m.max(x.abs()));
        for i in 0..expected.dim() {
            for j in 0..expected.dim() {
                let diff = (actual[(i, j)] - Complex::new(expected[(i, j)], 0.0)).norm();
                assert!(
                    diff <= rtol * scale,
                    "entry ({i}, {j}): {} vs {} (diff={diff})",
                    actual[(i, j)],
                    expected[(i, j)]
                );
            }
        }
    }

    #[test]
    fn eigenvalues_of_distinct_real_spectrum() {
        let diagonalized = Diagonalizer::new(matrix(&[&[4.0, 1.0], &[2.0, 3.0]]))
            .diagonalize()
            .unwrap();
        let mut re: Vec<f64> = diagonalized.eigenvalues().iter().map(|z| z.re).collect();
        re.sort_by(f64::total_cmp);
        assert!((re[0] - 2.0).abs() < 1e-12);
        assert!((re[1] - 5.0).abs() < 1e-12);
        assert!(diagonalized.eigenvalues().iter().all(|z| z.im.abs() < 1e-12));
    }

    #[test]
    fn reconstruction_round_trip() {
        let a = matrix(&[&[4.0, 1.0], &[2.0, 3.0]]);
        let rebuilt = Diagonalizer::new(a.clone())
            .diagonalize()
            .unwrap()
            .reconstruct()
            .unwrap();
        assert_close(&rebuilt, &a, 1e-9);
    }

    #[test]
    fn reconstruction_round_trip_random_input() {
        let a = MatrixGenerator::seeded(3, 4, 13).unwrap().generate().map(|&x| f64::from(x));
        let rebuilt = Diagonalizer::new(a.clone())
            .diagonalize()
            .unwrap()
            .reconstruct()
            .unwrap();
        assert_close(&rebuilt, &a, 1e-9);
    }

    #[test]
    fn complex_spectrum_rotation() {
        let rotation = matrix(&[&[0.0, -1.0], &[1.0, 0.0]]);
        let squared = Diagonalizer::new(rotation.clone())
            .diagonalize()
            .unwrap()
            .calculate(2, scalar_pow)
            .unwrap();
        assert_close(squared.result(), &matrix(&[&[-1.0, 0.0], &[0.0, -1.0]]), 1e-12);

        let full_turn = Diagonalizer::new(rotation)
            .diagonalize()
            .unwrap()
            .calculate(4, scalar_pow)
            .unwrap();
        assert_eq!(full_turn.exponent(), 4);
        assert_close(full_turn.result(), &SquareMatrix::identity(2), 1e-12);
    }

    #[test]
    fn agrees_with_direct_power() {
        let a = matrix(&[&[4.0, 1.0], &[2.0, 3.0]]);
        let direct = matrix_pow(a.clone(), 5);
        let powered = Diagonalizer::new(a)
            .diagonalize()
            .unwrap()
            .calculate(5, scalar_pow)
            .unwrap();
        assert_close(powered.result(), &direct, 1e-6);
    }

    #[test]
    fn zero_exponent_gives_identity() {
        let powered = Diagonalizer::new(matrix(&[&[4.0, 1.0], &[2.0, 3.0]]))
            .diagonalize()
            .unwrap()
            .calculate(0, scalar_pow)
            .unwrap();
        assert_close(powered.result(), &SquareMatrix::identity(2), 1e-12);
    }

    #[test]
    fn defective_input_is_rejected_or_approximate() {
        let jordan = matrix(&[&[1.0, 1.0], &[0.0, 1.0]]);
        match Diagonalizer::new(jordan.clone())
            .diagonalize()
            .and_then(|d| d.calculate(3, scalar_pow))
        {
            Err(PowerError::SingularEigenvectors { .. }) => {}
            Ok(powered) => assert_close(powered.result(), &matrix_pow(jordan, 3), 1e-3),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn iteration_cap_reports_no_convergence() {
        // cyclic shift: every eigenvalue sits on the unit circle
        let cyclic = SquareMatrix::from_fn(5, |i, j| if (i + 1) % 5 == j { 1.0 } else { 0.0 });
        let settings = SolverSettings {
            max_iterations: 1,
            ..SolverSettings::default()
        };
        let result = Diagonalizer::new(cyclic).with_settings(settings).diagonalize();
        assert!(matches!(
            result,
            Err(PowerError::NoConvergence { iterations: 1, .. })
        ));
    }

    #[test]
    fn scaled_power_survives_past_f64_range() {
        let a = matrix(&[&[4.0, 1.0], &[2.0, 3.0]]);
        let powered = Diagonalizer::new(a.clone())
            .diagonalize()
            .unwrap()
            .calculate_scaled(4500, scalar_pow)
            .unwrap();
        assert!(powered.result().iter().all(|x| x.is_finite()));

        // A^n = 5^n / 3 · [[2, 1], [2, 1]] + 2^n / 3 · [[1, -1], [-2, 2]]
        let top_left = powered.result()[(0, 0)];
        let expected = scalar_pow(Scaled::new(5.0), 4500) * Scaled::new(2.0 / 3.0);
        assert!(top_left.re().relative_error(&expected) < 1e-8);

        let direct = matrix_pow(a.map(|&x| Scaled::new(x)), 4500);
        for (d, s) in direct.iter().zip(powered.result().iter()) {
            assert!(s.re().relative_error(d) < 1e-8, "{s} vs {d}");
        }
    }

    #[test]
    fn scaled_power_matches_plain_power_in_range() {
        let a = matrix(&[&[0.0, -1.0], &[1.0, 1.0]]);
        let plain = Diagonalizer::new(a.clone())
            .diagonalize()
            .unwrap()
            .calculate(7, scalar_pow)
            .unwrap();
        let scaled = Diagonalizer::new(a)
            .diagonalize()
            .unwrap()
            .calculate_scaled(7, scalar_pow)
            .unwrap();
        for (p, s) in plain.result().iter().zip(scaled.result().iter()) {
            assert!((s.to_value() - p).norm() < 1e-9, "{s} vs {p}");
        }
    }

    #[test]
    fn repeated_eigenvalue_of_scalar_matrix() {
        let scalar = matrix(&[&[3.0, 0.0], &[0.0, 3.0]]);
        let powered = Diagonalizer::new(scalar)
            .diagonalize()
            .unwrap()
            .calculate(3, scalar_pow)
            .unwrap();
        assert_close(powered.result(), &matrix(&[&[27.0, 0.0], &[0.0, 27.0]]), 1e-12);
    }

    #[test]
    fn condition_number_of_orthogonal_eigenbasis() {
        let symmetric = matrix(&[&[2.0, 1.0], &[1.0, 2.0]]);
        let diagonalized = Diagonalizer::new(symmetric).diagonalize().unwrap();
        assert!((diagonalized.condition_number() - 1.0).abs() < 1e-9);
        assert_eq!(diagonalized.eigenvectors().dim(), 2);
    }
}
