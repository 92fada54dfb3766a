//! Create parameters for the BFV encryption scheme

use crate::bfv::GaloisTool;
use crate::{Error, ParametersError, Result};
use rlwe_math::{
    rq::Context,
    zq::{primes::generate_prime, Modulus},
};
use std::fmt::Debug;
use std::sync::Arc;

/// Parameters for the BFV encryption scheme.
#[derive(PartialEq, Eq)]
pub struct BfvParameters {
    /// Degree of the polynomials, which is also their number of coefficients.
    polynomial_degree: usize,

    /// Modulus of the plaintext space.
    plaintext_modulus: u64,

    /// Coprime moduli q_i of the ciphertext space.
    pub(crate) moduli: Box<[u64]>,

    /// Sizes in bits of the ciphertext moduli.
    moduli_sizes: Box<[usize]>,

    /// Variance of the error distribution.
    pub(crate) variance: usize,

    /// Context for the underlying polynomials at each level of the moduli
    /// chain. The level i context drops the last i moduli; keys are generated
    /// at level 0.
    pub(crate) ctx: Vec<Arc<Context>>,

    /// Whether the moduli chain is long enough for key switching.
    pub(crate) using_keyswitching: bool,

    /// Galois tool for the underlying cyclotomic ring.
    pub(crate) galois: GaloisTool,
}

// The contexts and the Galois tool are derived from the other fields and are
// omitted from the debug output.
impl Debug for BfvParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BfvParameters")
            .field("polynomial_degree", &self.polynomial_degree)
            .field("plaintext_modulus", &self.plaintext_modulus)
            .field("moduli", &self.moduli)
            .finish()
    }
}

impl BfvParameters {
    /// Returns the underlying polynomial degree.
    pub const fn degree(&self) -> usize {
        self.polynomial_degree
    }

    /// Returns the ciphertext moduli.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Returns the sizes in bits of the ciphertext moduli.
    pub fn moduli_sizes(&self) -> &[usize] {
        &self.moduli_sizes
    }

    /// Returns the plaintext modulus.
    pub const fn plaintext(&self) -> u64 {
        self.plaintext_modulus
    }

    /// Returns the variance of the error distribution.
    pub const fn variance(&self) -> usize {
        self.variance
    }

    /// Returns whether the moduli chain is long enough for key switching.
    pub const fn using_keyswitching(&self) -> bool {
        self.using_keyswitching
    }

    /// Returns the maximum level allowed by these parameters.
    pub fn max_level(&self) -> usize {
        self.moduli.len() - 1
    }

    /// Returns the context corresponding to the level.
    pub fn ctx_at_level(&self, level: usize) -> Result<&Arc<Context>> {
        self.ctx
            .get(level)
            .ok_or_else(|| Error::DefaultError("No context".to_string()))
    }

    /// Returns the level of a given context.
    pub fn level_of_ctx(&self, ctx: &Arc<Context>) -> Result<usize> {
        self.ctx
            .iter()
            .position(|c| c == ctx)
            .ok_or_else(|| Error::DefaultError("Unknown context".to_string()))
    }

    #[cfg(test)]
    /// Returns default parameters for tests.
    pub fn default_arc(num_moduli: usize, degree: usize) -> Arc<Self> {
        if !degree.is_power_of_two() || degree < 8 {
            panic!("Invalid degree");
        }
        BfvParametersBuilder::new()
            .set_degree(degree)
            .set_plaintext_modulus(1153)
            .set_moduli_sizes(&vec![62usize; num_moduli])
            .build_arc()
            .unwrap()
    }
}

/// Builder for parameters for the Bfv encryption scheme.
#[derive(Debug)]
pub struct BfvParametersBuilder {
    degree: usize,
    plaintext: u64,
    variance: usize,
    ciphertext_moduli: Vec<u64>,
    ciphertext_moduli_sizes: Vec<usize>,
}

impl BfvParametersBuilder {
    /// Creates a new instance of the builder.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            degree: Default::default(),
            plaintext: Default::default(),
            variance: 10,
            ciphertext_moduli: Default::default(),
            ciphertext_moduli_sizes: Default::default(),
        }
    }

    /// Sets the polynomial degree. The build step rejects degrees that are
    /// not powers of two of at least 8.
    pub fn set_degree(&mut self, degree: usize) -> &mut Self {
        self.degree = degree;
        self
    }

    /// Sets the plaintext modulus. The build step rejects values that are not
    /// valid moduli or that do not fit under the ciphertext moduli.
    pub fn set_plaintext_modulus(&mut self, plaintext: u64) -> &mut Self {
        self.plaintext = plaintext;
        self
    }

    /// Sets the sizes in bits of the ciphertext moduli to generate. Exclusive
    /// with `set_moduli`.
    pub fn set_moduli_sizes(&mut self, sizes: &[usize]) -> &mut Self {
        sizes.clone_into(&mut self.ciphertext_moduli_sizes);
        self
    }

    /// Sets the ciphertext moduli to use. Exclusive with `set_moduli_sizes`.
    pub fn set_moduli(&mut self, moduli: &[u64]) -> &mut Self {
        moduli.clone_into(&mut self.ciphertext_moduli);
        self
    }

    /// Sets the variance of the error distribution. The build step rejects
    /// variances outside [1, 16].
    pub fn set_variance(&mut self, variance: usize) -> &mut Self {
        self.variance = variance;
        self
    }

    /// Generate ciphertext moduli with the specified sizes.
    fn generate_moduli(moduli_sizes: &[usize], degree: usize) -> Result<Vec<u64>> {
        let mut moduli = vec![];
        for size in moduli_sizes {
            if !(10..=62).contains(size) {
                return Err(Error::ParametersError(ParametersError::InvalidModulusSize(
                    *size, 10, 62,
                )));
            }

            // Repeated sizes restart the search just below the last prime
            // found, so that the moduli stay distinct.
            let mut upper_bound = 1 << size;
            loop {
                match generate_prime(*size, 2 * degree as u64, upper_bound) {
                    Some(prime) if !moduli.contains(&prime) => {
                        moduli.push(prime);
                        break;
                    }
                    Some(prime) => upper_bound = prime,
                    None => {
                        return Err(Error::ParametersError(ParametersError::NotEnoughPrimes(
                            *size, degree,
                        )))
                    }
                }
            }
        }

        Ok(moduli)
    }

    /// Build a new `BfvParameters` inside an `Arc`.
    pub fn build_arc(&self) -> Result<Arc<BfvParameters>> {
        self.build().map(Arc::new)
    }

    /// Build a new `BfvParameters`.
    pub fn build(&self) -> Result<BfvParameters> {
        if self.degree < 8 || !self.degree.is_power_of_two() {
            return Err(Error::ParametersError(ParametersError::InvalidDegree(
                self.degree,
            )));
        }

        // The plaintext modulus must itself be a valid modulus.
        Modulus::new(self.plaintext).map_err(|e| {
            Error::ParametersError(ParametersError::InvalidPlaintext(e.to_string()))
        })?;

        // The error sampler is only defined for variances in [1, 16].
        if !(1..=16).contains(&self.variance) {
            return Err(Error::ParametersError(ParametersError::InvalidVariance(
                self.variance,
            )));
        }

        // Exactly one of the moduli lists must be provided.
        if !self.ciphertext_moduli.is_empty() && !self.ciphertext_moduli_sizes.is_empty() {
            return Err(Error::ParametersError(ParametersError::TooManySpecified(
                "Only one of `ciphertext_moduli` and `ciphertext_moduli_sizes` can be specified"
                    .to_string(),
            )));
        }
        if self.ciphertext_moduli.is_empty() && self.ciphertext_moduli_sizes.is_empty() {
            return Err(Error::ParametersError(ParametersError::TooFewSpecified(
                "One of `ciphertext_moduli` and `ciphertext_moduli_sizes` must be specified"
                    .to_string(),
            )));
        }

        let moduli = if self.ciphertext_moduli_sizes.is_empty() {
            self.ciphertext_moduli.clone()
        } else {
            Self::generate_moduli(&self.ciphertext_moduli_sizes, self.degree)?
        };

        // The plaintext modulus must embed into every ciphertext modulus.
        if moduli.iter().any(|m| *m <= self.plaintext) {
            return Err(Error::ParametersError(ParametersError::InvalidPlaintext(
                "The plaintext modulus must be smaller than the ciphertext moduli".to_string(),
            )));
        }

        // The sizes are recomputed so that both construction paths agree.
        let mut moduli_sizes = Vec::with_capacity(moduli.len());
        for m in &moduli {
            moduli_sizes.push(64 - m.leading_zeros() as usize);
        }

        // One context per level, the level i context dropping the last i moduli.
        let mut ctx = Vec::with_capacity(moduli.len());
        for i in 0..moduli.len() {
            ctx.push(Context::new_arc(&moduli[..moduli.len() - i], self.degree)?);
        }

        Ok(BfvParameters {
            polynomial_degree: self.degree,
            plaintext_modulus: self.plaintext,
            using_keyswitching: moduli.len() > 1,
            moduli: moduli.into_boxed_slice(),
            moduli_sizes: moduli_sizes.into_boxed_slice(),
            variance: self.variance,
            ctx,
            galois: GaloisTool::new(self.degree),
        })
    }
}
