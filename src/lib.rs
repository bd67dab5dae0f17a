//! Recovery side of Shamir's Secret Sharing scheme.
//!
//! A secret split with a degree k-1 polynomial over a prime field is the
//! polynomial's constant term, so any k shares give it back by Lagrange
//! interpolation evaluated at x = 0.
//! Based on Adi Shamir's paper "How to Share a Secret" (Communications of the ACM, 1979).
use num_bigint::BigInt;
use num_traits::{One, Zero};
use thiserror::Error;
use tracing::debug;

pub mod field;
pub mod input;

use field::PrimeField;

/// These are errors that can occur while reconstructing a secret
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SssError {
    #[error("threshold k must be at least 1")]
    InvalidThreshold,

    #[error("modulus must be at least 2, got {0}")]
    InvalidModulus(BigInt),

    #[error("not enough shares to reconstruct secret (need {threshold}, got {share_count})")]
    InsufficientShares {
        /// Required number of shares (k)
        threshold: usize,
        /// Actual number of shares provided
        share_count: usize,
    },

    /// Two shares claim the same point on the polynomial
    #[error("duplicate share x-coordinate {x}")]
    DuplicateShareX { x: BigInt },

    /// Raised for a zero Lagrange denominator, i.e. two x-coordinates that
    /// are distinct integers but congruent modulo the prime, or a composite
    /// modulus.
    #[error("{value} has no inverse modulo {modulus}")]
    NoInverse { value: BigInt, modulus: BigInt },
}

/// A single share of a split secret, representing a point on the polynomial
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Share {
    /// The x-coordinate of the polynomial point (share identifier)
    pub x: BigInt,
    /// The y-coordinate of the polynomial point, expected reduced modulo the prime
    pub y: BigInt,
}

impl Share {
    pub fn new(x: impl Into<BigInt>, y: impl Into<BigInt>) -> Self {
        Share {
            x: x.into(),
            y: y.into(),
        }
    }
}

/// Threshold and field for a family of reconstructions
#[derive(Clone, Debug)]
pub struct Scheme {
    /// Prime field ℤ/pℤ every computation happens in
    field: PrimeField,
    /// Number of shares interpolated (k)
    threshold: usize,
}

impl Scheme {
    /// Creates a reconstruction scheme with the specified parameters.
    ///
    /// # Arguments
    /// * `threshold` - Number of shares used to reconstruct the secret (k)
    /// * `prime_modulus` - Prime number defining the finite field. It is
    ///                     trusted to be prime, not tested.
    ///
    /// # Returns
    /// * `Ok(Scheme)` - If parameters are valid
    /// * `Err(SssError::InvalidThreshold)` - If threshold is 0
    /// * `Err(SssError::InvalidModulus)` - If prime_modulus is below 2
    ///
    /// # Example
    /// ```
    /// use num_bigint::BigInt;
    /// use shamir_recover::Scheme;
    ///
    /// let scheme = Scheme::new(3, BigInt::from(2089)).unwrap();
    /// assert_eq!(scheme.threshold(), 3);
    /// ```
    pub fn new(threshold: usize, prime_modulus: BigInt) -> Result<Self, SssError> {
        if threshold == 0 {
            return Err(SssError::InvalidThreshold);
        }

        Ok(Scheme {
            field: PrimeField::new(prime_modulus)?,
            threshold,
        })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Reconstructs a secret from k or more shares using Lagrange interpolation.
    ///
    /// Shares are ordered by ascending x and the k smallest are interpolated;
    /// any further shares are only checked for duplicate x-coordinates.
    ///
    /// # Arguments
    /// * `shares` - Shares in any order. Must contain at least k shares with
    ///             unique x-coordinates.
    ///
    /// # Returns
    /// * `Ok(BigInt)` - The reconstructed secret, in `[0, p)`
    /// * `Err(SssError::InsufficientShares)` - If fewer than k shares provided
    /// * `Err(SssError::DuplicateShareX)` - If two shares have the same x
    /// * `Err(SssError::NoInverse)` - If a Lagrange denominator vanishes mod p
    ///
    /// # Example
    /// ```
    /// # use num_bigint::BigInt;
    /// # use shamir_recover::{Scheme, Share};
    /// # let scheme = Scheme::new(3, BigInt::from(2089)).unwrap();
    /// // f(x) = 1234 + 166x + 94x² mod 2089
    /// let shares = vec![Share::new(3, 489), Share::new(1, 1494), Share::new(2, 1942)];
    /// let secret = scheme.reconstruct_secret(&shares).unwrap();
    /// assert_eq!(secret, BigInt::from(1234));
    /// ```
    pub fn reconstruct_secret(&self, shares: &[Share]) -> Result<BigInt, SssError> {
        // Check if we have enough shares
        if shares.len() < self.threshold {
            return Err(SssError::InsufficientShares {
                threshold: self.threshold,
                share_count: shares.len(),
            });
        }

        let mut sorted: Vec<&Share> = shares.iter().collect();
        sorted.sort_by(|a, b| a.x.cmp(&b.x));

        // Sorted, so equal x-coordinates sit next to each other
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0].x == pair[1].x) {
            return Err(SssError::DuplicateShareX {
                x: pair[0].x.clone(),
            });
        }

        let selected = &sorted[..self.threshold];
        debug!(
            threshold = self.threshold,
            available = shares.len(),
            selected = ?selected.iter().map(|share| share.x.to_string()).collect::<Vec<_>>(),
            "interpolating at x = 0"
        );

        let mut secret = BigInt::zero();

        for i in 0..selected.len() {
            let (numerator, denominator) = self.lagrange_basis_at_zero(selected, i);
            let denominator_inv = self.field.inverse(&denominator)?;

            let term = self.field.mul(&selected[i].y, &numerator);
            let term = self.field.mul(&term, &denominator_inv);
            secret = self.field.add(&secret, &term);
        }

        debug!(bits = secret.bits(), "secret reconstructed");
        Ok(secret)
    }

    /// Numerator and denominator of the Lagrange basis polynomial li(0):
    /// li(0) = ∏(j≠i) (0 - xj)/(xi - xj)
    ///
    /// Both products are reduced after every factor.
    fn lagrange_basis_at_zero(&self, shares: &[&Share], i: usize) -> (BigInt, BigInt) {
        let mut numerator = BigInt::one();
        let mut denominator = BigInt::one();
        let x_i = &shares[i].x;

        for (j, share) in shares.iter().enumerate() {
            if i != j {
                let x_j = &share.x;

                // Compute (0 - x_j) mod p
                numerator = self.field.mul(&numerator, &self.field.neg(x_j));

                // Compute (x_i - x_j) mod p
                denominator = self.field.mul(&denominator, &self.field.sub(x_i, x_j));
            }
        }

        (numerator, denominator)
    }
}

/// Recovers the secret from the `k` smallest-x shares modulo `prime`.
///
/// One-shot form of [`Scheme::reconstruct_secret`].
pub fn reconstruct(shares: &[Share], k: usize, prime: &BigInt) -> Result<BigInt, SssError> {
    Scheme::new(k, prime.clone())?.reconstruct_secret(shares)
}
