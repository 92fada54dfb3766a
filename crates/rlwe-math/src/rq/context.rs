use num_bigint::BigUint;
use std::{fmt::Debug, sync::Arc};

use crate::{ntt::NttOperator, rns::RnsContext, zq::Modulus, Error, Result};

/// Ring context shared by the polynomials of a given degree and moduli chain.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Context {
    pub(crate) moduli: Box<[u64]>,
    pub(crate) q: Box<[Modulus]>,
    pub(crate) rns: Arc<RnsContext>,
    pub(crate) ops: Box<[NttOperator]>,
    pub(crate) degree: usize,
    pub(crate) bitrev: Box<[usize]>,
}

// The operators and tables are derived from the moduli and the degree, so
// only the defining data is printed.
impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("moduli", &self.moduli)
            .field("degree", &self.degree)
            .finish()
    }
}

impl Context {
    /// Creates a context from a list of moduli and a polynomial degree.
    ///
    /// Returns an error if the moduli are not primes less than 62 bits which
    /// supports the NTT of size `degree`.
    pub fn new(moduli: &[u64], degree: usize) -> Result<Self> {
        if !degree.is_power_of_two() || degree < 8 {
            return Err(Error::Default(
                "The degree must be a power of two of at least 8".to_string(),
            ));
        }

        let rns = Arc::new(RnsContext::new(moduli)?);
        let mut q = Vec::with_capacity(moduli.len());
        let mut ops = Vec::with_capacity(moduli.len());
        for modulus in moduli {
            let qi = Modulus::new(*modulus)?;
            match NttOperator::new(&qi, degree) {
                Some(op) => {
                    q.push(qi);
                    ops.push(op);
                }
                None => {
                    return Err(Error::Default(
                        "The moduli do not support an Ntt of size degree".to_string(),
                    ))
                }
            }
        }

        // Index permutation applied when substituting in the Ntt representations.
        let mut bitrev = Vec::with_capacity(degree);
        for j in 0..degree {
            bitrev.push(j.reverse_bits() >> (degree.leading_zeros() + 1));
        }

        Ok(Self {
            moduli: moduli.to_owned().into_boxed_slice(),
            q: q.into_boxed_slice(),
            rns,
            ops: ops.into_boxed_slice(),
            degree,
            bitrev: bitrev.into_boxed_slice(),
        })
    }

    /// Creates a context directly wrapped in an `Arc`.
    pub fn new_arc(moduli: &[u64], degree: usize) -> Result<Arc<Self>> {
        Self::new(moduli, degree).map(Arc::new)
    }

    /// Returns the full modulus as a BigUint.
    pub fn modulus(&self) -> &BigUint {
        self.rns.modulus()
    }

    /// Returns the prime moduli of the chain.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Returns the moduli of the chain as `Modulus` operators.
    pub fn moduli_operators(&self) -> &[Modulus] {
        &self.q
    }

    /// Returns the polynomial degree of this context.
    pub const fn degree(&self) -> usize {
        self.degree
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::ntt::supports_ntt;
    use crate::rq::Context;
    use num_bigint::BigUint;

    // A small prime and four 62-bit primes, all congruent to 1 modulo 16.
    const MODULI: &[u64; 5] = &[
        1153,
        4611686018326724609,
        4611686018309947393,
        4611686018232352769,
        4611686018171535361,
    ];

    #[test]
    fn constructor() {
        for modulus in MODULI {
            assert!(Context::new(&[*modulus], 8).is_ok());

            // Degree 128 needs (modulus = 1) modulo 256, which only the
            // larger primes satisfy.
            assert_eq!(
                Context::new(&[*modulus], 128).is_ok(),
                supports_ntt(*modulus, 128)
            );
        }

        assert!(Context::new(MODULI, 8).is_ok());
        assert!(Context::new(MODULI, 128).is_err());

        // The degree must be a power of two that is at least 8.
        assert!(Context::new(MODULI, 0).is_err());
        assert!(Context::new(MODULI, 4).is_err());
        assert!(Context::new(MODULI, 96).is_err());
    }

    #[test]
    fn getters() -> Result<(), Box<dyn Error>> {
        let context = Context::new(MODULI, 8)?;

        assert_eq!(context.moduli(), MODULI);
        assert_eq!(context.degree(), 8);

        assert_eq!(context.moduli_operators().len(), MODULI.len());
        for (qi, modulus) in context.moduli_operators().iter().zip(MODULI.iter()) {
            assert_eq!(&**qi, modulus);
        }

        let product = MODULI.iter().map(|m| BigUint::from(*m)).product::<BigUint>();
        assert_eq!(context.modulus(), &product);

        Ok(())
    }
}
