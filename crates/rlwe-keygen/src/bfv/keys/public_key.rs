//! Public keys for the BFV encryption scheme

use crate::bfv::{keys::UniformHalf, BfvParameters, SecretKey};
use rand::{CryptoRng, RngCore};
use rlwe_math::rq::{Poly, Representation};
use std::sync::Arc;

/// Public key for the BFV encryption scheme.
///
/// The pair `(c0, c1)` is an RLWE encryption of zero at the key level, with
/// `c0 = e - c1 * s` for a small error `e` and a uniformly random `c1`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PublicKey {
    pub(crate) par: Arc<BfvParameters>,
    pub(crate) c0: Poly,
    pub(crate) c1: UniformHalf<Poly>,
}

impl PublicKey {
    /// Generate a new [`PublicKey`] from a [`SecretKey`].
    pub fn new<R: RngCore + CryptoRng>(sk: &SecretKey, save_seed: bool, rng: &mut R) -> Self {
        // Encrypting zero cannot fail for a validated parameter set.
        let (mut c0, mut c1, seed) = sk.encrypt_zero(rng).unwrap();
        // The polynomials of a public key should not allow for variable time
        // computation.
        c0.disallow_variable_time_computations();
        c1.disallow_variable_time_computations();
        Self {
            par: sk.par.clone(),
            c0,
            c1: if save_seed {
                UniformHalf::SeedCompact(seed)
            } else {
                UniformHalf::Expanded(c1)
            },
        }
    }

    /// Returns the constant part of the key.
    pub fn c0(&self) -> &Poly {
        &self.c0
    }

    /// Returns the uniform part of the key, expanding it anew when only the
    /// seed is stored.
    pub fn c1(&self) -> Poly {
        match &self.c1 {
            UniformHalf::Expanded(c1) => c1.clone(),
            UniformHalf::SeedCompact(seed) => {
                Poly::random_from_seed(&self.par.ctx[0], Representation::Ntt, *seed)
            }
        }
    }

    /// Returns the stored form of the uniform part.
    pub fn uniform_half(&self) -> &UniformHalf<Poly> {
        &self.c1
    }
}
