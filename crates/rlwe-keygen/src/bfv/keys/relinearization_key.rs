//! Relinearization keys for the BFV encryption scheme

use crate::bfv::{BfvParameters, KeySwitchingKey, SecretKey};
use crate::Result;
use rand::{CryptoRng, RngCore};
use rlwe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Relinearization key for the BFV encryption scheme.
///
/// It wraps the key-switching key protecting the square of the secret key,
/// which consumers use to shrink degree-2 ciphertexts back to pairs.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RelinearizationKey {
    pub(crate) ksk: KeySwitchingKey,
}

impl RelinearizationKey {
    /// Generate a [`RelinearizationKey`] from a [`SecretKey`].
    pub fn new<R: RngCore + CryptoRng>(
        sk: &SecretKey,
        save_seed: bool,
        rng: &mut R,
    ) -> Result<Self> {
        let ctx = sk.par.ctx_at_level(0)?;

        let mut s = Zeroizing::new(Poly::try_convert_from(
            sk.coeffs.as_ref(),
            ctx,
            false,
            Representation::PowerBasis,
        )?);
        s.change_representation(Representation::Ntt);
        let mut s2 = Zeroizing::new(s.as_ref() * s.as_ref());
        s2.change_representation(Representation::PowerBasis);

        let ksk = KeySwitchingKey::new(sk, &s2, save_seed, rng)?;
        Ok(Self { ksk })
    }

    /// Returns the parameters of the key.
    pub fn parameters(&self) -> &Arc<BfvParameters> {
        &self.ksk.par
    }

    /// Returns the underlying key-switching key.
    pub fn key_switching_key(&self) -> &KeySwitchingKey {
        &self.ksk
    }
}
