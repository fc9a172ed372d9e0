use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::PowerError;
use crate::math::SquareMatrix;

/// Draws square matrices of small non-negative integers.
///
/// The random stream is owned by the generator, so two generators built from
/// the same seed hand out the same sequence of matrices.
pub struct MatrixGenerator<R> {
    rng: R,
    dimension: usize,
    modulus: u32,
}

impl MatrixGenerator<StdRng> {
    pub fn seeded(seed: u64, dimension: usize, modulus: u32) -> Result<Self, PowerError> {
        Self::new(StdRng::seed_from_u64(seed), dimension, modulus)
    }
}

impl<R: Rng> MatrixGenerator<R> {
    pub fn new(rng: R, dimension: usize, modulus: u32) -> Result<Self, PowerError> {
        if modulus == 0 {
            return Err(PowerError::InvalidConfig("modulus must be at least 1".into()));
        }
        Ok(Self {
            rng,
            dimension,
            modulus,
        })
    }

    // Entries are uniform in [0, modulus)
    pub fn generate(&mut self) -> SquareMatrix<u32> {
        let modulus = self.modulus;
        let rng = &mut self.rng;
        SquareMatrix::from_fn(self.dimension, |_, _| rng.gen_range(0..modulus))
    }
}
