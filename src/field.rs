//! Arithmetic in the prime field ℤ/pℤ over arbitrary-precision integers.
//!
//! Every operation returns the canonical representative in `[0, p)`, so
//! negative intermediates never leak into later products.
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::SssError;

/// A prime field defined by its modulus.
///
/// Primality is not tested; the caller vouches for it. With a composite
/// modulus everything but [`PrimeField::inverse`] still behaves, and that one
/// fails with [`SssError::NoInverse`] on non-units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimeField {
    modulus: BigInt,
}

impl PrimeField {
    /// Creates the field ℤ/pℤ.
    ///
    /// # Returns
    /// * `Err(SssError::InvalidModulus)` - If `modulus` is less than 2
    ///
    /// # Example
    /// ```
    /// use num_bigint::BigInt;
    /// use shamir_recover::field::PrimeField;
    ///
    /// let field = PrimeField::new(BigInt::from(2089)).unwrap();
    /// assert_eq!(field.reduce(&BigInt::from(-1)), BigInt::from(2088));
    /// ```
    pub fn new(modulus: BigInt) -> Result<Self, SssError> {
        if modulus < BigInt::from(2u32) {
            return Err(SssError::InvalidModulus(modulus));
        }
        Ok(PrimeField { modulus })
    }

    pub fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    /// Maps any integer, negative ones included, onto `[0, p)`.
    pub fn reduce(&self, value: &BigInt) -> BigInt {
        // Floored, not truncating: -1 mod p is p - 1, never -1.
        value.mod_floor(&self.modulus)
    }

    pub fn add(&self, a: &BigInt, b: &BigInt) -> BigInt {
        self.reduce(&(a + b))
    }

    pub fn sub(&self, a: &BigInt, b: &BigInt) -> BigInt {
        self.reduce(&(a - b))
    }

    pub fn mul(&self, a: &BigInt, b: &BigInt) -> BigInt {
        self.reduce(&(a * b))
    }

    pub fn neg(&self, a: &BigInt) -> BigInt {
        self.reduce(&-a)
    }

    /// Calculates a modular multiplicative inverse using the Extended Euclidean Algorithm.
    ///
    /// Only the Bézout coefficient of `a` is tracked; the one of `p` is never
    /// needed.
    ///
    /// # Returns
    /// * `Ok(b)` - With `mul(a, b) == 1`
    /// * `Err(SssError::NoInverse)` - If `gcd(a, p) != 1`, which includes `a ≡ 0`
    pub fn inverse(&self, a: &BigInt) -> Result<BigInt, SssError> {
        let a = self.reduce(a);

        // Invariant: r ≡ s·a (mod p) for both (old_r, old_s) and (r, s).
        let mut old_r = a.clone();
        let mut r = self.modulus.clone();
        let mut old_s = BigInt::one();
        let mut s = BigInt::zero();

        while !r.is_zero() {
            let quotient = &old_r / &r;

            let next_r = &old_r - &quotient * &r;
            old_r = std::mem::replace(&mut r, next_r);

            let next_s = &old_s - &quotient * &s;
            old_s = std::mem::replace(&mut s, next_s);
        }

        if !old_r.is_one() {
            return Err(SssError::NoInverse {
                value: a,
                modulus: self.modulus.clone(),
            });
        }

        Ok(self.reduce(&old_s))
    }
}
