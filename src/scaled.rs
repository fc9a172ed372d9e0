//! Numbers carried as `mantissa · 2^exponent`.
//!
//! Powers of a small integer matrix leave the `f64` range after a few hundred
//! squarings. [`Scaled`] keeps the mantissa normalized to `[1, 2)` in magnitude
//! and moves the scale into an `i64` exponent, so the generic
//! [`matrix_pow`](crate::math::matrix_pow) and
//! [`scalar_pow`](crate::math::scalar_pow) stay finite at any practical exponent.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use nalgebra::Complex;
use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};

/// Field elements usable as a [`Scaled`] mantissa.
pub trait Mantissa:
    Copy
    + PartialEq
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
{
    /// Largest absolute component, used to normalize.
    fn magnitude(&self) -> f64;

    /// Exact multiplication by `2^e`.
    fn ldexp(self, e: i64) -> Self;
}

impl Mantissa for f64 {
    fn magnitude(&self) -> f64 {
        self.abs()
    }

    fn ldexp(self, e: i64) -> Self {
        ldexp(self, e)
    }
}

impl Mantissa for Complex<f64> {
    fn magnitude(&self) -> f64 {
        self.re.abs().max(self.im.abs())
    }

    fn ldexp(self, e: i64) -> Self {
        Complex::new(ldexp(self.re, e), ldexp(self.im, e))
    }
}

// x · 2^e in steps that neither overflow nor turn 0 · inf into NaN
fn ldexp(x: f64, e: i64) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    let mut x = x;
    let mut e = e.clamp(-2200, 2200);
    while e > 1000 {
        x *= 2f64.powi(1000);
        e -= 1000;
    }
    while e < -1000 {
        x *= 2f64.powi(-1000);
        e += 1000;
    }
    x * 2f64.powi(e as i32)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scaled<T> {
    mantissa: T,
    exponent: i64,
}

impl<T: Mantissa> Scaled<T> {
    pub fn new(value: T) -> Self {
        Self::from_parts(value, 0)
    }

    /// `mantissa · 2^exponent`, normalized.
    pub fn from_parts(mantissa: T, exponent: i64) -> Self {
        Self { mantissa, exponent }.normalized()
    }

    pub fn mantissa(&self) -> T {
        self.mantissa
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    pub fn is_finite(&self) -> bool {
        self.mantissa.magnitude().is_finite()
    }

    /// The plain value; infinite or zero when it lies outside `f64` range.
    pub fn to_value(&self) -> T {
        self.mantissa.ldexp(self.exponent)
    }

    /// `|self - reference| / |reference|`, measured on the largest component.
    pub fn relative_error(&self, reference: &Self) -> f64 {
        let diff = *self - *reference;
        if diff.is_zero() {
            return 0.0;
        }
        if reference.is_zero() {
            return f64::INFINITY;
        }
        ldexp(
            diff.mantissa.magnitude() / reference.mantissa.magnitude(),
            diff.exponent - reference.exponent,
        )
    }

    fn normalized(self) -> Self {
        let m = self.mantissa.magnitude();
        if m == 0.0 {
            return Self::zero();
        }
        if !m.is_finite() {
            return self;
        }
        let shift = m.log2().floor() as i64;
        Self {
            mantissa: self.mantissa.ldexp(-shift),
            exponent: self.exponent.saturating_add(shift),
        }
    }
}

impl Scaled<f64> {
    /// Nearest scaled value to an arbitrary-precision integer.
    pub fn from_bigint(n: &BigInt) -> Self {
        let shift = n.bits().saturating_sub(64);
        let top = (n >> shift).to_f64().unwrap_or(f64::NAN);
        Self::from_parts(top, shift as i64)
    }

    pub fn to_complex(self) -> Scaled<Complex<f64>> {
        Scaled {
            mantissa: Complex::new(self.mantissa, 0.0),
            exponent: self.exponent,
        }
    }

    fn log10_abs(&self) -> f64 {
        self.mantissa.abs().log10() + self.exponent as f64 * std::f64::consts::LOG10_2
    }
}

impl Scaled<Complex<f64>> {
    pub fn re(&self) -> Scaled<f64> {
        Scaled::from_parts(self.mantissa.re, self.exponent)
    }

    pub fn im(&self) -> Scaled<f64> {
        Scaled::from_parts(self.mantissa.im, self.exponent)
    }
}

impl<T: Mantissa> Zero for Scaled<T> {
    fn zero() -> Self {
        Self {
            mantissa: T::zero(),
            exponent: 0,
        }
    }

    fn is_zero(&self) -> bool {
        self.mantissa.magnitude() == 0.0
    }
}

impl<T: Mantissa> One for Scaled<T> {
    fn one() -> Self {
        Self::new(T::one())
    }
}

impl<T: Mantissa> Add for Scaled<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        if self.is_zero() {
            return rhs;
        }
        if rhs.is_zero() {
            return self;
        }
        let (hi, lo) = if self.exponent >= rhs.exponent {
            (self, rhs)
        } else {
            (rhs, self)
        };
        let aligned = lo.mantissa.ldexp(lo.exponent - hi.exponent);
        Self::from_parts(hi.mantissa + aligned, hi.exponent)
    }
}

impl<T: Mantissa> Neg for Scaled<T> {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            mantissa: -self.mantissa,
            exponent: self.exponent,
        }
    }
}

impl<T: Mantissa> Sub for Scaled<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl<T: Mantissa> Mul for Scaled<T> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::from_parts(
            self.mantissa * rhs.mantissa,
            self.exponent.saturating_add(rhs.exponent),
        )
    }
}

impl<'a, 'b, T: Mantissa> Mul<&'b Scaled<T>> for &'a Scaled<T> {
    type Output = Scaled<T>;

    fn mul(self, rhs: &'b Scaled<T>) -> Scaled<T> {
        *self * *rhs
    }
}

// Values inside this binary exponent range print as a plain f64
const PLAIN_EXPONENT_LIMIT: i64 = 1000;

impl fmt::Display for Scaled<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() || !self.is_finite() || self.exponent.abs() <= PLAIN_EXPONENT_LIMIT {
            return write!(f, "{}", self.to_value());
        }
        let log = self.log10_abs();
        let power = log.floor();
        let digits = 10f64.powf(log - power).copysign(self.mantissa);
        write!(f, "{digits:.15}e{}", power as i64)
    }
}

impl fmt::Display for Scaled<Complex<f64>> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let im = self.im();
        if im.mantissa < 0.0 {
            write!(f, "{}-{}i", self.re(), -im)
        } else {
            write!(f, "{}+{}i", self.re(), im)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{matrix_pow, scalar_pow, SquareMatrix};

    #[test]
    fn normalizes_mantissa_into_unit_octave() {
        let x = Scaled::new(12.0);
        assert_eq!(x.mantissa(), 1.5);
        assert_eq!(x.exponent(), 3);
        assert_eq!(x.to_value(), 12.0);
        assert_eq!(Scaled::new(-0.375).to_value(), -0.375);
    }

    #[test]
    fn arithmetic_matches_plain_floats() {
        let a = Scaled::new(6.5);
        let b = Scaled::new(-0.25);
        assert_eq!((a + b).to_value(), 6.25);
        assert_eq!((a - b).to_value(), 6.75);
        assert_eq!((a * b).to_value(), -1.625);
        assert!((a + (-a)).is_zero());
    }

    #[test]
    fn powers_past_f64_range_stay_finite() {
        let p = scalar_pow(Scaled::new(24.0), 4500);
        assert!(p.is_finite());
        assert!(p.to_value().is_infinite());
        let expected = 4500.0 * 24f64.log10();
        assert!((p.log10_abs() - expected).abs() < 1e-9);
    }

    #[test]
    fn small_terms_vanish_against_huge_ones() {
        let huge = scalar_pow(Scaled::new(2.0), 5000);
        assert_eq!(huge + Scaled::new(1.0), huge);
        assert_eq!(Scaled::new(1.0) + Scaled::zero(), Scaled::new(1.0));
    }

    #[test]
    fn zero_entries_do_not_poison_the_power() {
        // top-left stays 1 while the rest grows past f64 range
        let a = SquareMatrix::from_rows(vec![vec![1.0, 0.0], vec![5.0, 12.0]])
            .unwrap()
            .map(|&x| Scaled::new(x));
        let p = matrix_pow(a, 4500);
        assert_eq!(p[(0, 0)].to_value(), 1.0);
        assert!(p[(0, 1)].is_zero());
        assert!(p.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn bigint_conversion_keeps_leading_bits() {
        let n = BigInt::from(3u32).pow(5000);
        let scaled = Scaled::from_bigint(&n);
        assert!((scaled.log10_abs() - 5000.0 * 3f64.log10()).abs() < 1e-9);
        assert_eq!(Scaled::from_bigint(&BigInt::from(1234)).to_value(), 1234.0);
    }

    #[test]
    fn relative_error_of_close_values() {
        let exact = scalar_pow(Scaled::new(3.0), 3000);
        let nudged = exact * Scaled::new(1.0 + 1e-10);
        let err = nudged.relative_error(&exact);
        assert!(err > 5e-11 && err < 2e-10, "{err}");
        assert_eq!(exact.relative_error(&exact), 0.0);
    }

    #[test]
    fn display_switches_to_decimal_exponent() {
        assert_eq!(Scaled::new(2.5).to_string(), "2.5");
        // 2^5000 = 1.4124670321394...e1505
        let text = scalar_pow(Scaled::new(2.0), 5000).to_string();
        assert!(text.starts_with("1.41246703"), "{text}");
        assert!(text.ends_with("e1505"), "{text}");

        let z = Scaled::new(Complex::new(1.5, -2.0));
        assert_eq!(z.to_string(), "1.5-2i");
    }
}
