//! Key generator for the BFV encryption scheme

use crate::bfv::{BfvParameters, GaloisTool};
use crate::{Error, Result};
use rand::{CryptoRng, RngCore};
use std::sync::Arc;

use super::{GaloisKeys, PublicKey, RelinearizationKey, SecretKey};

/// Generates a secret key and the public keys derived from it.
///
/// All derived keys are created at the key level, with the full modulus chain.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    par: Arc<BfvParameters>,
    sk: SecretKey,
}

impl KeyGenerator {
    /// Creates a generator with a freshly sampled secret key.
    pub fn new<R: RngCore + CryptoRng>(par: &Arc<BfvParameters>, rng: &mut R) -> Self {
        let sk = SecretKey::random(par, rng);
        Self {
            par: par.clone(),
            sk,
        }
    }

    /// Creates a generator reusing an existing secret key.
    pub fn with_secret_key(par: &Arc<BfvParameters>, sk: SecretKey) -> Result<Self> {
        if sk.par != *par {
            return Err(Error::InvalidSecretKey);
        }
        Ok(Self {
            par: par.clone(),
            sk,
        })
    }

    /// Returns a copy of the secret key.
    pub fn secret_key(&self) -> SecretKey {
        self.sk.clone()
    }

    /// Returns whether the parameters support key switching.
    pub fn using_keyswitching(&self) -> bool {
        self.par.using_keyswitching
    }

    /// Returns the tool mapping rotation steps to Galois elements.
    pub fn galois_tool(&self) -> &GaloisTool {
        &self.par.galois
    }

    /// Generates a public key.
    ///
    /// When `save_seed` is true, the uniform polynomial of the key is stored
    /// as the seed it was expanded from.
    pub fn create_public_key<R: RngCore + CryptoRng>(
        &self,
        save_seed: bool,
        rng: &mut R,
    ) -> PublicKey {
        PublicKey::new(&self.sk, save_seed, rng)
    }

    /// Generates a relinearization key.
    pub fn create_relin_keys<R: RngCore + CryptoRng>(
        &self,
        save_seed: bool,
        rng: &mut R,
    ) -> Result<RelinearizationKey> {
        RelinearizationKey::new(&self.sk, save_seed, rng)
    }

    /// Generates Galois keys for the given Galois elements.
    pub fn create_galois_keys<R: RngCore + CryptoRng>(
        &self,
        elements: &[u64],
        save_seed: bool,
        rng: &mut R,
    ) -> Result<GaloisKeys> {
        GaloisKeys::new(&self.sk, elements, save_seed, rng)
    }

    /// Generates Galois keys for the given rotation steps.
    pub fn create_galois_keys_from_steps<R: RngCore + CryptoRng>(
        &self,
        steps: &[i64],
        save_seed: bool,
        rng: &mut R,
    ) -> Result<GaloisKeys> {
        let elements = self.par.galois.elements_from_steps(steps)?;
        GaloisKeys::new(&self.sk, &elements, save_seed, rng)
    }

    /// Generates Galois keys for the row exchange and for all power-of-two
    /// rotations in both directions.
    pub fn create_all_galois_keys<R: RngCore + CryptoRng>(
        &self,
        save_seed: bool,
        rng: &mut R,
    ) -> Result<GaloisKeys> {
        let elements = self.par.galois.all_elements();
        GaloisKeys::new(&self.sk, &elements, save_seed, rng)
    }
}
