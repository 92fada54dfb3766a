//! Galois keys for the BFV encryption scheme

use crate::bfv::{BfvParameters, KeySwitchingKey, SecretKey};
use crate::{Error, Result};
use itertools::Itertools;
use rand::{CryptoRng, RngCore};
use rlwe_math::rq::{traits::TryConvertFrom, Poly, Representation, SubstitutionExponent};
use std::collections::BTreeMap;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Galois keys for the BFV encryption scheme.
///
/// They hold one key-switching key per Galois element, protecting the image
/// of the secret key under the automorphism of that element. Iteration is in
/// ascending element order.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GaloisKeys {
    pub(crate) par: Arc<BfvParameters>,
    pub(crate) keys: BTreeMap<u64, KeySwitchingKey>,
}

impl GaloisKeys {
    /// Generate a [`GaloisKeys`] from a [`SecretKey`] for the provided Galois
    /// elements. Duplicate elements collapse to a single entry.
    pub fn new<R: RngCore + CryptoRng>(
        sk: &SecretKey,
        elements: &[u64],
        save_seed: bool,
        rng: &mut R,
    ) -> Result<Self> {
        if elements.is_empty() {
            return Err(Error::TooFewValues(0, 1));
        }

        let mut keys = BTreeMap::new();
        for element in elements {
            if !sk.par.galois.is_valid_element(*element) {
                return Err(Error::InvalidGaloisElement(*element));
            }
            if !keys.contains_key(element) {
                let key = Self::key_for_element(sk, *element, save_seed, rng)?;
                keys.insert(*element, key);
            }
        }

        Ok(Self {
            par: sk.par.clone(),
            keys,
        })
    }

    /// Generate the key-switching key protecting the substituted secret key.
    fn key_for_element<R: RngCore + CryptoRng>(
        sk: &SecretKey,
        element: u64,
        save_seed: bool,
        rng: &mut R,
    ) -> Result<KeySwitchingKey> {
        let ctx = sk.par.ctx_at_level(0)?;
        let exponent = SubstitutionExponent::new(ctx, element as usize)?;

        let s = Zeroizing::new(Poly::try_convert_from(
            sk.coeffs.as_ref(),
            ctx,
            false,
            Representation::PowerBasis,
        )?);
        let s_sub = Zeroizing::new(s.substitute(&exponent)?);

        KeySwitchingKey::new(sk, &s_sub, save_seed, rng)
    }

    /// Returns the stored Galois elements, in ascending order.
    pub fn elements(&self) -> Vec<u64> {
        self.keys.keys().copied().collect_vec()
    }

    /// Returns the key-switching key for the element, if present.
    pub fn key_for(&self, element: u64) -> Option<&KeySwitchingKey> {
        self.keys.get(&element)
    }

    /// Returns the number of stored elements.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns whether the key holds no element.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
