//! Secret keys for the BFV encryption scheme

use crate::bfv::BfvParameters;
use crate::{Error, Result};
use num_bigint::BigUint;
use rand::{CryptoRng, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rlwe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use rlwe_util::sample_vec_cbd;
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Secret key for the BFV encryption scheme.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SecretKey {
    pub(crate) par: Arc<BfvParameters>,
    pub(crate) coeffs: Box<[i64]>,
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        self.coeffs.zeroize();
    }
}

impl ZeroizeOnDrop for SecretKey {}

impl SecretKey {
    /// Generate a random [`SecretKey`].
    pub fn random<R: RngCore + CryptoRng>(par: &Arc<BfvParameters>, rng: &mut R) -> Self {
        let s_coefficients = sample_vec_cbd(par.degree(), par.variance, rng).unwrap();
        Self::new(s_coefficients, par)
    }

    /// Generate a [`SecretKey`] from its coefficients.
    pub(crate) fn new(coeffs: Vec<i64>, par: &Arc<BfvParameters>) -> Self {
        Self {
            par: par.clone(),
            coeffs: coeffs.into_boxed_slice(),
        }
    }

    /// Measures, in bits, the noise of the encryption of zero `(c0, c1)`.
    ///
    /// # Safety
    ///
    /// Running time may depend on the value of the noise.
    pub(crate) unsafe fn measure_noise(&self, c0: &Poly, c1: &Poly) -> Result<usize> {
        let ctx = self.par.ctx_at_level(0)?;

        // The secret key lifted into the key level context.
        let mut s = Zeroizing::new(Poly::try_convert_from(
            self.coeffs.as_ref(),
            ctx,
            false,
            Representation::PowerBasis,
        )?);
        s.change_representation(Representation::Ntt);

        // c0 + c1 * s, computed in constant time.
        let mut c = Zeroizing::new(c0.clone());
        c.disallow_variable_time_computations();
        let mut c1_s = Zeroizing::new(c1.clone());
        c1_s.disallow_variable_time_computations();
        *c1_s.as_mut() *= s.as_ref();
        *c.as_mut() += &*c1_s;
        c.change_representation(Representation::PowerBasis);

        let ciphertext_modulus = ctx.modulus();
        let mut noise = 0usize;
        for coeff in Vec::<BigUint>::from(c.as_ref()) {
            let magnitude = std::cmp::min(coeff.bits(), (ciphertext_modulus - &coeff).bits());
            noise = noise.max(magnitude as usize);
        }

        Ok(noise)
    }

    /// Returns the RLWE encryption of zero `(e - a * s, a)` at the key level,
    /// alongside the seed the uniform polynomial `a` was expanded from.
    pub(crate) fn encrypt_zero<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(Poly, Poly, <ChaCha8Rng as SeedableRng>::Seed)> {
        let ctx = self.par.ctx_at_level(0)?;

        let mut seed = <ChaCha8Rng as SeedableRng>::Seed::default();
        rng.fill(&mut seed);

        // The secret key lifted into the key level context.
        let mut s = Zeroizing::new(Poly::try_convert_from(
            self.coeffs.as_ref(),
            ctx,
            false,
            Representation::PowerBasis,
        )?);
        s.change_representation(Representation::Ntt);

        let mut a = Poly::random_from_seed(ctx, Representation::Ntt, seed);
        let a_s = Zeroizing::new(&a * s.as_ref());

        let mut b = Poly::small(ctx, Representation::Ntt, self.par.variance, rng)
            .map_err(Error::MathError)?;
        b -= &a_s;

        // Both halves are public from this point on.
        unsafe {
            a.allow_variable_time_computations();
            b.allow_variable_time_computations()
        }

        Ok((b, a, seed))
    }
}
