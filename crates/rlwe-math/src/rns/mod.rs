#![warn(missing_docs, unused_imports)]
// Residue access is index-based throughout; the lint adds nothing here.
#![allow(clippy::indexing_slicing)]

//! Residue Number System operations on big integers.

use crate::{zq::Modulus, Error, Result};
use itertools::{izip, Itertools};
use ndarray::ArrayView1;
use num_bigint::BigUint;
use num_bigint_dig::{BigInt as BigIntDig, BigUint as BigUintDig, ExtendedGcd, ModInverse};
use num_traits::{cast::ToPrimitive, One, Zero};
use std::fmt::Debug;

/// Context for a Residue Number System.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct RnsContext {
    moduli_u64: Vec<u64>,
    garner: Vec<BigUint>,
    product: BigUint,
}

// The Garner constants are derived from the moduli and only clutter the
// output, so they are not printed.
impl Debug for RnsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RnsContext")
            .field("moduli_u64", &self.moduli_u64)
            .field("product", &self.product)
            .finish()
    }
}

impl RnsContext {
    /// Creates a RNS context from a list of moduli.
    ///
    /// Returns an error if the list is empty or if the moduli are not
    /// pairwise coprime.
    pub fn new(moduli_u64: &[u64]) -> Result<Self> {
        if moduli_u64.is_empty() {
            return Err(Error::Default("The list of moduli is empty".to_string()));
        }

        let mut product = BigUint::one();
        let mut product_dig = BigUintDig::one();
        for (i, mi) in moduli_u64.iter().enumerate() {
            for mj in &moduli_u64[(i + 1)..] {
                let (d, _, _) = BigUintDig::from(*mi).extended_gcd(&BigUintDig::from(*mj));
                if d != BigIntDig::from(1) {
                    return Err(Error::Default("The moduli are not coprime".to_string()));
                }
            }
            product *= &BigUint::from(*mi);
            product_dig *= &BigUintDig::from(*mi);
        }

        let mut garner = Vec::with_capacity(moduli_u64.len());
        for modulus in moduli_u64 {
            // The Modulus constructor rejects moduli outside [2, 2^62).
            Modulus::new(*modulus)?;

            // garner_i = (q / q_i) * ((q / q_i)^(-1) mod q_i), so that
            // garner_i = 1 mod q_i and 0 modulo every other prime.
            let q_star_i = &product / modulus;
            let q_tilde_i = (&product_dig / modulus)
                .mod_inverse(&BigUintDig::from(*modulus))
                .unwrap()
                .to_u64()
                .unwrap();
            garner.push(q_star_i * q_tilde_i);
        }

        Ok(Self {
            moduli_u64: moduli_u64.to_owned(),
            garner,
            product,
        })
    }

    /// Returns the product of the moduli used when creating the RNS context.
    #[must_use]
    pub const fn modulus(&self) -> &BigUint {
        &self.product
    }

    /// Reduces a big integer modulo each modulus of the system.
    #[must_use]
    pub fn project(&self, a: &BigUint) -> Vec<u64> {
        self.moduli_u64
            .iter()
            .map(|modulus| (a % modulus).to_u64().unwrap())
            .collect_vec()
    }

    /// Lifts rests into a big integer.
    ///
    /// Debug builds check that there are as many rests as moduli.
    #[must_use]
    pub fn lift(&self, rests: ArrayView1<u64>) -> BigUint {
        debug_assert_eq!(rests.len(), self.garner.len());

        let mut result = BigUint::zero();
        for (r_i, garner_i) in izip!(rests.iter(), self.garner.iter()) {
            result += garner_i * *r_i;
        }
        result % &self.product
    }

    /// The i-th Garner constant, when it exists.
    #[must_use]
    pub fn get_garner(&self, i: usize) -> Option<&BigUint> {
        self.garner.get(i)
    }
}

#[cfg(test)]
mod tests {

    use std::error::Error;

    use super::RnsContext;
    use ndarray::ArrayView1;
    use num_bigint::BigUint;
    use rand::{thread_rng, RngCore};

    #[test]
    fn constructor() {
        for moduli in [&[2u64][..], &[2, 3], &[4, 15, 1153]] {
            assert!(RnsContext::new(moduli).is_ok());
        }

        let e = RnsContext::new(&[]);
        assert_eq!(e.unwrap_err().to_string(), "The list of moduli is empty");

        // 4 and 30 share a factor with another modulus.
        for moduli in [&[2u64, 4][..], &[2, 3, 5, 30]] {
            let e = RnsContext::new(moduli);
            assert_eq!(e.unwrap_err().to_string(), "The moduli are not coprime");
        }
    }

    #[test]
    fn garner() -> Result<(), Box<dyn Error>> {
        let rns = RnsContext::new(&[4, 15, 1153])?;

        for i in 0..3 {
            let gi = rns.get_garner(i);
            assert!(gi.is_some());
            assert_eq!(gi.unwrap(), &rns.garner[i]);
        }
        assert!(rns.get_garner(3).is_none());

        Ok(())
    }

    #[test]
    fn modulus() -> Result<(), Box<dyn Error>> {
        let mut rns = RnsContext::new(&[2])?;
        assert_eq!(rns.modulus(), &BigUint::from(2u64));

        rns = RnsContext::new(&[2, 5])?;
        assert_eq!(rns.modulus(), &BigUint::from(2u64 * 5));

        rns = RnsContext::new(&[4, 15, 1153])?;
        assert_eq!(rns.modulus(), &BigUint::from(4u64 * 15 * 1153));

        Ok(())
    }

    #[test]
    fn project_lift() -> Result<(), Box<dyn Error>> {
        let rns = RnsContext::new(&[4, 15, 1153])?;
        let product = 4u64 * 15 * 1153;

        let cases: [(u64, [u64; 3]); 5] = [
            (0, [0, 0, 0]),
            (4, [0, 4, 4]),
            (15, [3, 0, 15]),
            (1153, [1, 13, 0]),
            (product - 1, [3, 14, 1152]),
        ];
        for (value, expected) in cases {
            let rests = rns.project(&BigUint::from(value));
            assert_eq!(rests, expected);
            assert_eq!(rns.lift(ArrayView1::from(&rests)), BigUint::from(value));
        }

        let mut rng = thread_rng();
        for _ in 0..100 {
            let b = BigUint::from(rng.next_u64() % product);
            let rests = rns.project(&b);
            assert_eq!(rns.lift(ArrayView1::from(&rests)), b);
        }

        Ok(())
    }
}
