use std::fmt;
use std::ops::{Index, Mul};

use nalgebra::{DMatrix, Scalar};
use num_traits::{One, Zero};

/// Dense square matrix stored row-major.
///
/// Generic over the element ring so the same exponentiation code drives raw
/// integer draws, `f64`, `Complex<f64>` and `BigInt` matrices.
#[derive(Clone, Debug, PartialEq)]
pub struct SquareMatrix<T> {
    dim: usize,
    entries: Vec<T>,
}

impl<T> SquareMatrix<T> {
    pub fn from_fn(dim: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut entries = Vec::with_capacity(dim * dim);
        for i in 0..dim {
            for j in 0..dim {
                entries.push(f(i, j));
            }
        }
        Self { dim, entries }
    }

    /// Builds a matrix from rows, returning `None` unless every row has
    /// exactly as many entries as there are rows.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Option<Self> {
        let dim = rows.len();
        if rows.iter().any(|row| row.len() != dim) {
            return None;
        }
        Some(Self {
            dim,
            entries: rows.into_iter().flatten().collect(),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> SquareMatrix<U> {
        SquareMatrix {
            dim: self.dim,
            entries: self.entries.iter().map(f).collect(),
        }
    }

    /// The top-left entry, sampled as the run's checksum.
    pub fn top_left(&self) -> Option<&T> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

impl<T: Clone + Zero + One> SquareMatrix<T> {
    pub fn identity(dim: usize) -> Self {
        Self::from_fn(dim, |i, j| if i == j { T::one() } else { T::zero() })
    }
}

impl<T: Scalar> SquareMatrix<T> {
    pub fn to_dmatrix(&self) -> DMatrix<T> {
        DMatrix::from_row_slice(self.dim, self.dim, &self.entries)
    }
}

impl<T> Index<(usize, usize)> for SquareMatrix<T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        assert!(i < self.dim && j < self.dim, "index ({i}, {j}) out of bounds");
        &self.entries[i * self.dim + j]
    }
}

impl<T: fmt::Display> fmt::Display for SquareMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.entries.chunks(self.dim.max(1)) {
            let cells: Vec<String> = row.iter().map(|x| x.to_string()).collect();
            writeln!(f, "[{}]", cells.join(", "))?;
        }
        Ok(())
    }
}

// Matrix multiplication for square matrices of the same dimension
pub fn matrix_mult<T>(m1: &SquareMatrix<T>, m2: &SquareMatrix<T>) -> SquareMatrix<T>
where
    T: Zero,
    for<'a> &'a T: Mul<&'a T, Output = T>,
{
    assert_eq!(m1.dim, m2.dim, "dimension mismatch in matrix_mult");
    let n = m1.dim;
    SquareMatrix::from_fn(n, |i, j| {
        (0..n).fold(T::zero(), |acc, k| acc + &m1[(i, k)] * &m2[(k, j)])
    })
}

// Matrix exponentiation using squaring (O(log n))
pub fn matrix_pow<T>(mut base: SquareMatrix<T>, mut exp: u64) -> SquareMatrix<T>
where
    T: Clone + Zero + One,
    for<'a> &'a T: Mul<&'a T, Output = T>,
{
    let mut result = SquareMatrix::identity(base.dim);

    while exp > 0 {
        if exp & 1 == 1 {
            result = matrix_mult(&result, &base);
        }
        exp >>= 1;
        if exp > 0 {
            base = matrix_mult(&base, &base);
        }
    }

    result
}

/// Raises a scalar to `exp` by squaring.
///
/// The accumulator starts at the multiplicative identity, so `exp == 0`
/// returns `T::one()` (for complex numbers, `1 + 0i`).
///
/// # Example
/// ```
/// use matrix_power_bench::math::scalar_pow;
/// use nalgebra::Complex;
/// let i = Complex::new(0.0_f64, 1.0);
/// assert_eq!(scalar_pow(i, 2), Complex::new(-1.0, 0.0));
/// assert_eq!(scalar_pow(i, 0), Complex::new(1.0, 0.0));
/// ```
pub fn scalar_pow<T>(mut base: T, mut exp: u64) -> T
where
    T: Clone + One + Mul<Output = T>,
{
    let mut result = T::one();

    while exp > 0 {
        if exp & 1 == 1 {
            result = result * base.clone();
        }
        exp >>= 1;
        if exp > 0 {
            base = base.clone() * base;
        }
    }

    result
}
