//! Key-switching keys for the BFV encryption scheme

use crate::bfv::{keys::UniformHalf, BfvParameters, SecretKey};
use crate::{Error, Result};
use rand::{CryptoRng, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rlwe_math::{
    rns::RnsContext,
    rq::{traits::TryConvertFrom, Context, Poly, Representation},
};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Key-switching key for the BFV encryption scheme.
///
/// It holds one RLWE pair per modulus of the chain; the i-th pair encrypts the
/// protected polynomial scaled by the i-th Garner coefficient of the chain, so
/// that the consumer can cancel the scaling when recombining the pairs.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct KeySwitchingKey {
    /// The parameters of the key-switching key.
    pub(crate) par: Arc<BfvParameters>,

    /// The constant parts of the pairs, in ascending modulus order.
    pub(crate) c0: Box<[Poly]>,

    /// The uniform parts of the pairs, in ascending modulus order, possibly
    /// compressed down to the master seed.
    pub(crate) c1: UniformHalf<Box<[Poly]>>,
}

impl KeySwitchingKey {
    /// Generates a [`KeySwitchingKey`] encrypting the polynomial `from` under
    /// `sk`. The polynomial must be in power basis representation at the key
    /// level.
    pub fn new<R: RngCore + CryptoRng>(
        sk: &SecretKey,
        from: &Poly,
        save_seed: bool,
        rng: &mut R,
    ) -> Result<Self> {
        if !sk.par.using_keyswitching {
            return Err(Error::KeySwitchingUnavailable);
        }

        let ctx = sk.par.ctx_at_level(0)?;
        if from.ctx() != ctx {
            return Err(Error::DefaultError(
                "Incorrect context for polynomial from".to_string(),
            ));
        }

        let mut seed = <ChaCha8Rng as SeedableRng>::Seed::default();
        rng.fill(&mut seed);

        let c1 = Self::generate_c1(ctx, seed, sk.par.moduli.len());
        let c0 = Self::generate_c0(sk, from, &c1, rng)?;

        Ok(Self {
            par: sk.par.clone(),
            c0: c0.into_boxed_slice(),
            c1: if save_seed {
                UniformHalf::SeedCompact(seed)
            } else {
                UniformHalf::Expanded(c1.into_boxed_slice())
            },
        })
    }

    /// Generate the c1's from the seed.
    ///
    /// Each component gets its own seed drawn from a stream seeded by the
    /// master seed, so that components stay independent while the whole column
    /// remains reproducible.
    fn generate_c1(
        ctx: &Arc<Context>,
        seed: <ChaCha8Rng as SeedableRng>::Seed,
        size: usize,
    ) -> Vec<Poly> {
        let mut c1 = Vec::with_capacity(size);
        let mut rng = ChaCha8Rng::from_seed(seed);
        for _ in 0..size {
            let mut seed_i = <ChaCha8Rng as SeedableRng>::Seed::default();
            rng.fill(&mut seed_i);
            let mut a = Poly::random_from_seed(ctx, Representation::NttShoup, seed_i);
            unsafe { a.allow_variable_time_computations() }
            c1.push(a);
        }
        c1
    }

    /// Generate the c0's from the c1's.
    fn generate_c0<R: RngCore + CryptoRng>(
        sk: &SecretKey,
        from: &Poly,
        c1: &[Poly],
        rng: &mut R,
    ) -> Result<Vec<Poly>> {
        if c1.is_empty() {
            return Err(Error::DefaultError(
                "The list of c1 polynomials is empty".to_string(),
            ));
        }
        if from.representation() != &Representation::PowerBasis {
            return Err(Error::DefaultError(
                "Unexpected representation for from".to_string(),
            ));
        }

        let mut s = Zeroizing::new(Poly::try_convert_from(
            sk.coeffs.as_ref(),
            c1[0].ctx(),
            false,
            Representation::PowerBasis,
        )?);
        s.change_representation(Representation::Ntt);

        let rns = RnsContext::new(&sk.par.moduli[..c1.len()])?;
        let mut c0 = Vec::with_capacity(c1.len());
        for (i, c1_i) in c1.iter().enumerate() {
            let mut a_s = Zeroizing::new(c1_i.clone());
            a_s.disallow_variable_time_computations();
            a_s.change_representation(Representation::Ntt);
            *a_s.as_mut() *= s.as_ref();
            a_s.change_representation(Representation::PowerBasis);

            let mut b = Poly::small(a_s.ctx(), Representation::PowerBasis, sk.par.variance, rng)?;
            b -= &a_s;

            let gi = rns.get_garner(i).unwrap();
            let g_i_from = Zeroizing::new(gi * from);
            b += &*g_i_from;

            // The secret no longer flows into b beyond this point.
            unsafe { b.allow_variable_time_computations() }

            b.change_representation(Representation::NttShoup);
            c0.push(b);
        }

        Ok(c0)
    }

    /// Returns the constant parts of the pairs.
    pub fn c0(&self) -> &[Poly] {
        &self.c0
    }

    /// Returns the uniform parts of the pairs, expanding them anew when only
    /// the seed is stored.
    pub fn c1(&self) -> Box<[Poly]> {
        match &self.c1 {
            UniformHalf::Expanded(c1) => c1.clone(),
            UniformHalf::SeedCompact(seed) => {
                Self::generate_c1(&self.par.ctx[0], *seed, self.par.moduli.len())
                    .into_boxed_slice()
            }
        }
    }

    /// Returns the stored form of the uniform parts.
    pub fn uniform_half(&self) -> &UniformHalf<Box<[Poly]>> {
        &self.c1
    }
}

#[cfg(test)]
mod tests {
    use crate::bfv::{keys::UniformHalf, BfvParameters, KeySwitchingKey, SecretKey};
    use crate::Error;
    use itertools::izip;
    use num_bigint::BigUint;
    use rand::{thread_rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use rlwe_math::{
        rns::RnsContext,
        rq::{traits::TryConvertFrom, Poly, Representation},
    };
    use std::error::Error as StdError;

    #[test]
    fn constructor() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        for params in [
            BfvParameters::default_arc(6, 8),
            BfvParameters::default_arc(3, 8),
        ] {
            let sk = SecretKey::random(&params, &mut rng);
            let ctx = params.ctx_at_level(0)?;
            let p = Poly::small(ctx, Representation::PowerBasis, 10, &mut rng)?;
            let ksk = KeySwitchingKey::new(&sk, &p, false, &mut rng)?;
            assert_eq!(ksk.c0().len(), params.moduli().len());
            assert_eq!(ksk.c1().len(), params.moduli().len());
        }
        Ok(())
    }

    #[test]
    fn unavailable_with_one_modulus() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let params = BfvParameters::default_arc(1, 8);
        let sk = SecretKey::random(&params, &mut rng);
        let ctx = params.ctx_at_level(0)?;
        let p = Poly::small(ctx, Representation::PowerBasis, 10, &mut rng)?;
        assert_eq!(
            KeySwitchingKey::new(&sk, &p, false, &mut rng).unwrap_err(),
            Error::KeySwitchingUnavailable
        );
        Ok(())
    }

    #[test]
    fn invalid_from() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let params = BfvParameters::default_arc(2, 8);
        let sk = SecretKey::random(&params, &mut rng);

        // A polynomial at another level of the chain is rejected.
        let p = Poly::small(
            params.ctx_at_level(1)?,
            Representation::PowerBasis,
            10,
            &mut rng,
        )?;
        assert_eq!(
            KeySwitchingKey::new(&sk, &p, false, &mut rng).unwrap_err(),
            Error::DefaultError("Incorrect context for polynomial from".to_string())
        );

        // A polynomial in Ntt representation is rejected.
        let p = Poly::small(
            params.ctx_at_level(0)?,
            Representation::Ntt,
            10,
            &mut rng,
        )?;
        assert_eq!(
            KeySwitchingKey::new(&sk, &p, false, &mut rng).unwrap_err(),
            Error::DefaultError("Unexpected representation for from".to_string())
        );

        Ok(())
    }

    #[test]
    fn component_correctness() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        for params in [BfvParameters::default_arc(6, 8)] {
            for _ in 0..100 {
                let sk = SecretKey::random(&params, &mut rng);
                let ctx = params.ctx_at_level(0)?;
                let p = Poly::small(ctx, Representation::PowerBasis, 10, &mut rng)?;
                let ksk = KeySwitchingKey::new(&sk, &p, false, &mut rng)?;

                let mut s = Poly::try_convert_from(
                    &sk.coeffs as &[i64],
                    ctx,
                    false,
                    Representation::PowerBasis,
                )
                .map_err(crate::Error::MathError)?;
                s.change_representation(Representation::Ntt);

                // Each pair must satisfy c0 + c1 * s = garner_i * p + e for a
                // small e.
                let rns = RnsContext::new(params.moduli())?;
                for (i, (c0i, c1i)) in izip!(ksk.c0().iter(), ksk.c1().iter()).enumerate() {
                    let mut c1i_s = c1i.clone();
                    c1i_s.disallow_variable_time_computations();
                    c1i_s.change_representation(Representation::Ntt);
                    c1i_s *= &s;

                    let mut b = c0i.clone();
                    b.disallow_variable_time_computations();
                    b.change_representation(Representation::Ntt);
                    b += &c1i_s;

                    let gi = rns.get_garner(i).unwrap();
                    let mut g_i_p = gi * &p;
                    g_i_p.change_representation(Representation::Ntt);
                    b -= &g_i_p;
                    b.change_representation(Representation::PowerBasis);

                    for e in &Vec::<BigUint>::from(&b) {
                        assert!(std::cmp::min(e.bits(), (rns.modulus() - e).bits()) <= 10);
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn seed_compact() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let params = BfvParameters::default_arc(3, 8);
        let sk = SecretKey::random(&params, &mut rng);
        let ctx = params.ctx_at_level(0)?;
        let p = Poly::small(ctx, Representation::PowerBasis, 10, &mut rng)?;

        // The same rng state must produce the same key whether or not the
        // seed is saved in place of the expanded column.
        let mut rng1 = ChaCha8Rng::seed_from_u64(42);
        let mut rng2 = ChaCha8Rng::seed_from_u64(42);
        let ksk_compact = KeySwitchingKey::new(&sk, &p, true, &mut rng1)?;
        let ksk_expanded = KeySwitchingKey::new(&sk, &p, false, &mut rng2)?;

        assert!(matches!(
            ksk_compact.uniform_half(),
            UniformHalf::SeedCompact(_)
        ));
        assert!(matches!(
            ksk_expanded.uniform_half(),
            UniformHalf::Expanded(_)
        ));
        assert_eq!(ksk_compact.c0(), ksk_expanded.c0());
        assert_eq!(ksk_compact.c1(), ksk_expanded.c1());

        Ok(())
    }
}
