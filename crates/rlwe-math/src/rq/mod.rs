#![warn(missing_docs, unused_imports)]
// Indexing lints are disabled here: coefficient access is index-heavy and
// bound-checked upfront by the context shape.
#![allow(clippy::indexing_slicing)]

//! Polynomials over R_q, where q factors into the prime moduli of zq and
//! coefficients are stored residue by residue.

mod context;
mod convert;
mod ops;

pub mod traits;
use self::traits::TryConvertFrom;
use crate::{Error, Result};
pub use context::Context;
use itertools::izip;
use ndarray::{s, Array2, ArrayView2};
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rlwe_util::sample_vec_cbd;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use zeroize::{Zeroize, Zeroizing};

/// The form in which the coefficients of a polynomial are held.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Representation {
    /// Plain coefficients c0, c1, ..., c_(degree - 1) of the polynomial
    /// c0 + c1 * x + ... + c_(degree - 1) * x^(degree - 1).
    #[default]
    PowerBasis,
    /// Evaluations of the polynomial under the number-theoretic transform.
    Ntt,
    /// Ntt evaluations augmented with their Shoup representation, which
    /// speeds up repeated multiplications.
    NttShoup,
}

/// An exponent for a substitution.
#[derive(Debug, PartialEq, Eq)]
pub struct SubstitutionExponent {
    /// The value of the exponent.
    pub exponent: usize,

    ctx: Arc<Context>,
    power_bitrev: Vec<usize>,
}

impl SubstitutionExponent {
    /// Creates a substitution element from an exponent. Only odd exponents
    /// define automorphisms of the ring, so even values are rejected.
    pub fn new(ctx: &Arc<Context>, exponent: usize) -> Result<Self> {
        let exponent = exponent % (2 * ctx.degree);
        if exponent & 1 == 0 {
            return Err(Error::Default(
                "The substitution exponent must be odd".to_string(),
            ));
        }

        // Table of the successive powers of the exponent, in the bit-reversed
        // order used by the Ntt layout.
        let mut power = (exponent - 1) / 2;
        let mask = ctx.degree - 1;
        let mut power_bitrev = Vec::with_capacity(ctx.degree);
        for _ in 0..ctx.degree {
            power_bitrev.push((power & mask).reverse_bits() >> (ctx.degree.leading_zeros() + 1));
            power += exponent
        }

        Ok(Self {
            ctx: ctx.clone(),
            exponent,
            power_bitrev,
        })
    }
}

/// A polynomial attached to a specific context.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Poly {
    ctx: Arc<Context>,
    representation: Representation,
    allow_variable_time_computations: bool,
    coefficients: Array2<u64>,
    coefficients_shoup: Option<Array2<u64>>,
}

impl Zeroize for Poly {
    fn zeroize(&mut self) {
        if let Some(coeffs) = self.coefficients.as_slice_mut() {
            coeffs.zeroize()
        }
        self.zeroize_shoup()
    }
}

impl AsRef<Poly> for Poly {
    fn as_ref(&self) -> &Poly {
        self
    }
}

impl AsMut<Poly> for Poly {
    fn as_mut(&mut self) -> &mut Poly {
        self
    }
}

impl Poly {
    /// Creates a polynomial holding the constant 0.
    #[must_use]
    pub fn zero(ctx: &Arc<Context>, representation: Representation) -> Self {
        Self {
            ctx: ctx.clone(),
            representation,
            allow_variable_time_computations: false,
            coefficients: Array2::zeros((ctx.q.len(), ctx.degree)),
            coefficients_shoup: (representation == Representation::NttShoup)
                .then(|| Array2::zeros((ctx.q.len(), ctx.degree))),
        }
    }

    /// Enables variable time computations when this polynomial is involved.
    ///
    /// # Safety
    ///
    /// Variable time computations may leak the processed values through
    /// timing; only enable them on public data.
    pub unsafe fn allow_variable_time_computations(&mut self) {
        self.allow_variable_time_computations = true
    }

    /// Disables variable time computations when this polynomial is involved.
    pub fn disallow_variable_time_computations(&mut self) {
        self.allow_variable_time_computations = false
    }

    /// Current representation of the polynomial.
    #[must_use]
    pub const fn representation(&self) -> &Representation {
        &self.representation
    }

    // Zeroizes the Shoup coefficients, when present.
    fn zeroize_shoup(&mut self) {
        if let Some(coeffs_shoup) = self
            .coefficients_shoup
            .as_mut()
            .and_then(|f| f.as_slice_mut())
        {
            coeffs_shoup.zeroize()
        }
    }

    /// Converts the polynomial into another representation.
    pub fn change_representation(&mut self, to: Representation) {
        if self.representation == to {
            return;
        }

        match (self.representation, to) {
            (Representation::PowerBasis, Representation::Ntt) => self.ntt_forward(),
            (Representation::PowerBasis, Representation::NttShoup) => {
                self.ntt_forward();
                self.compute_coefficients_shoup()
            }
            (Representation::Ntt, Representation::PowerBasis) => self.ntt_backward(),
            (Representation::Ntt, Representation::NttShoup) => self.compute_coefficients_shoup(),
            (Representation::NttShoup, Representation::PowerBasis) => {
                self.zeroize_shoup();
                self.coefficients_shoup = None;
                self.ntt_backward()
            }
            (Representation::NttShoup, Representation::Ntt) => {
                self.zeroize_shoup();
                self.coefficients_shoup = None;
            }
            // Identical representations returned early above.
            _ => unreachable!(),
        }

        self.representation = to;
    }

    fn compute_coefficients_shoup(&mut self) {
        let mut coefficients_shoup = Array2::zeros((self.ctx.q.len(), self.ctx.degree));
        for (mut v_shoup, v, qi) in izip!(
            coefficients_shoup.outer_iter_mut(),
            self.coefficients.outer_iter(),
            self.ctx.q.iter()
        ) {
            v_shoup
                .as_slice_mut()
                .unwrap()
                .copy_from_slice(&qi.shoup_vec(v.as_slice().unwrap()))
        }
        self.coefficients_shoup = Some(coefficients_shoup)
    }

    /// Overrides the representation marker without transforming the
    /// coefficients.
    ///
    /// # Safety
    ///
    /// Prefer `change_representation` to modify the representation safely.
    /// When overriding to NttShoup the Shoup coefficients are recomputed from
    /// the current values; when overriding away from NttShoup the stale Shoup
    /// coefficients are zeroized and dropped.
    pub unsafe fn override_representation(&mut self, to: Representation) {
        if self.coefficients_shoup.is_some() {
            self.zeroize_shoup();
            self.coefficients_shoup = None
        }
        if to == Representation::NttShoup {
            self.compute_coefficients_shoup()
        }
        self.representation = to;
    }

    /// Generates a random polynomial.
    pub fn random<R: RngCore + CryptoRng>(
        ctx: &Arc<Context>,
        representation: Representation,
        rng: &mut R,
    ) -> Self {
        let mut p = Poly::zero(ctx, representation);
        for (mut v, qi) in izip!(p.coefficients.outer_iter_mut(), ctx.q.iter()) {
            v.as_slice_mut()
                .unwrap()
                .copy_from_slice(&qi.random_vec(ctx.degree, rng))
        }
        if p.representation == Representation::NttShoup {
            p.compute_coefficients_shoup()
        }
        p
    }

    /// Generates a random polynomial deterministically from a seed.
    #[must_use]
    pub fn random_from_seed(
        ctx: &Arc<Context>,
        representation: Representation,
        seed: <ChaCha8Rng as SeedableRng>::Seed,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        let mut prng =
            ChaCha8Rng::from_seed(<ChaCha8Rng as SeedableRng>::Seed::from(hasher.finalize()));

        let mut p = Poly::zero(ctx, representation);
        for (mut v, qi) in izip!(p.coefficients.outer_iter_mut(), ctx.q.iter()) {
            v.as_slice_mut()
                .unwrap()
                .copy_from_slice(&qi.random_vec(ctx.degree, &mut prng))
        }
        if p.representation == Representation::NttShoup {
            p.compute_coefficients_shoup()
        }
        p
    }

    /// Samples a polynomial with small coefficients and converts it into the
    /// specified representation.
    ///
    /// Returns an error if the variance does not belong to [1, ..., 16].
    pub fn small<T: RngCore + CryptoRng>(
        ctx: &Arc<Context>,
        representation: Representation,
        variance: usize,
        rng: &mut T,
    ) -> Result<Self> {
        if !(1..=16).contains(&variance) {
            return Err(Error::Default(
                "The variance should be an integer between 1 and 16".to_string(),
            ));
        }

        let coeffs = Zeroizing::new(
            sample_vec_cbd(ctx.degree, variance, rng).map_err(|e| Error::Default(e.to_string()))?,
        );
        let mut p = Poly::try_convert_from(
            coeffs.as_ref() as &[i64],
            ctx,
            false,
            Representation::PowerBasis,
        )?;
        if representation != Representation::PowerBasis {
            p.change_representation(representation);
        }
        Ok(p)
    }

    /// Views the polynomial coefficients in RNS representation.
    #[must_use]
    pub fn coefficients(&self) -> ArrayView2<'_, u64> {
        self.coefficients.view()
    }

    fn ntt_forward(&mut self) {
        if self.allow_variable_time_computations {
            for (mut v, op) in izip!(self.coefficients.outer_iter_mut(), self.ctx.ops.iter()) {
                unsafe { op.forward_vt(v.as_mut_ptr()) }
            }
        } else {
            for (mut v, op) in izip!(self.coefficients.outer_iter_mut(), self.ctx.ops.iter()) {
                op.forward(v.as_slice_mut().unwrap())
            }
        }
    }

    fn ntt_backward(&mut self) {
        if self.allow_variable_time_computations {
            for (mut v, op) in izip!(self.coefficients.outer_iter_mut(), self.ctx.ops.iter()) {
                unsafe { op.backward_vt(v.as_mut_ptr()) }
            }
        } else {
            for (mut v, op) in izip!(self.coefficients.outer_iter_mut(), self.ctx.ops.iter()) {
                op.backward(v.as_slice_mut().unwrap())
            }
        }
    }

    /// Substitutes x by x^i in the polynomial.
    ///
    /// In PowerBasis representation, i can be any integer that is not a
    /// multiple of 2 * degree. In Ntt and NttShoup representation, i can be
    /// any odd integer that is not a multiple of 2 * degree.
    pub fn substitute(&self, i: &SubstitutionExponent) -> Result<Poly> {
        let mut q = Poly::zero(&self.ctx, self.representation);
        if self.allow_variable_time_computations {
            unsafe { q.allow_variable_time_computations() }
        }

        match self.representation {
            Representation::Ntt | Representation::NttShoup => {
                // In evaluation form the substitution is a permutation of the
                // slots, identical for the coefficients and their Shoup form.
                let permute = |dst: &mut Array2<u64>, src: &Array2<u64>| {
                    for (mut dst_row, src_row) in izip!(dst.outer_iter_mut(), src.outer_iter()) {
                        for (j, k) in izip!(self.ctx.bitrev.iter(), i.power_bitrev.iter()) {
                            dst_row[*j] = src_row[*k]
                        }
                    }
                };
                permute(&mut q.coefficients, &self.coefficients);
                if self.representation == Representation::NttShoup {
                    permute(
                        q.coefficients_shoup.as_mut().unwrap(),
                        self.coefficients_shoup.as_ref().unwrap(),
                    );
                }
            }
            Representation::PowerBasis => {
                // x^j maps to x^(i * j), with a sign flip on wrap-around.
                let mut power = 0usize;
                let mask = self.ctx.degree - 1;
                for j in 0..self.ctx.degree {
                    for (qi, qij, pij) in izip!(
                        self.ctx.q.iter(),
                        q.coefficients.slice_mut(s![.., power & mask]),
                        self.coefficients.slice(s![.., j])
                    ) {
                        if power & self.ctx.degree != 0 {
                            *qij = qi.sub(*qij, *pij)
                        } else {
                            *qij = qi.add(*qij, *pij)
                        }
                    }
                    power += i.exponent
                }
            }
        }

        Ok(q)
    }

    /// The context attached to this polynomial.
    #[must_use]
    pub fn ctx(&self) -> &Arc<Context> {
        &self.ctx
    }
}
