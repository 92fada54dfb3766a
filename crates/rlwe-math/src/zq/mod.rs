#![warn(missing_docs, unused_imports)]

//! Arithmetic modulo integers of at most 62 bits.

pub mod primes;

use std::ops::Deref;

use crate::errors::{Error, Result};
use itertools::{izip, Itertools};
use num_bigint::BigUint;
use num_traits::cast::ToPrimitive;
use pulp::Arch;
use rand::{distributions::Uniform, CryptoRng, Rng, RngCore};
use rlwe_util::is_prime;

/// Branchless equivalent of `if cond { on_true } else { on_false }`.
const fn const_time_cond_select(on_true: u64, on_false: u64, cond: bool) -> u64 {
    let mask = -(cond as i64) as u64;
    let diff = on_true ^ on_false;
    (diff & mask) ^ on_false
}

/// An integer modulus of at most 62 bits, with precomputed constants for
/// Barrett and Shoup reductions.
#[derive(Debug, Clone)]
pub struct Modulus {
    pub(crate) p: u64,
    barrett_hi: u64,
    barrett_lo: u64,
    leading_zeros: u32,
    pub(crate) supports_opt: bool,
    distribution: Uniform<u64>,
    arch: Arch,
}

// `Uniform` is not `Eq`, so the implementation is spelled out.
impl Eq for Modulus {}

impl PartialEq for Modulus {
    fn eq(&self, other: &Self) -> bool {
        let Self {
            p,
            barrett_hi: _,
            barrett_lo: _,
            leading_zeros: _,
            supports_opt: _,
            distribution: _,
            arch: _,
        } = self;
        let Self {
            p: other_p,
            barrett_hi: _,
            barrett_lo: _,
            leading_zeros: _,
            supports_opt: _,
            distribution: _,
            arch: _,
        } = other;

        // Every other field is a function of p; comparing p is enough. The
        // exhaustive destructuring keeps this in sync with the field list.
        p == other_p
    }
}

// Dereferences to the underlying integer.
impl Deref for Modulus {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.p
    }
}

impl Modulus {
    /// Creates a modulus from an integer of at most 62 bits.
    pub fn new(p: u64) -> Result<Self> {
        if p < 2 || (p >> 62) != 0 {
            Err(Error::InvalidModulus(p))
        } else {
            let barrett = ((BigUint::from(1u64) << 128usize) / p).to_u128().unwrap(); // 2^128 / p
            Ok(Self {
                p,
                barrett_hi: (barrett >> 64) as u64,
                barrett_lo: barrett as u64,
                leading_zeros: p.leading_zeros(),
                supports_opt: primes::supports_opt(p),
                distribution: Uniform::new(0, p),
                arch: Arch::new(),
            })
        }
    }

    /// Modular addition in constant time.
    /// Debug builds check that a < p and b < p.
    #[must_use]
    pub const fn add(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        Self::reduce1(a + b, self.p)
    }

    /// Modular addition in variable time.
    /// Debug builds check that a < p and b < p.
    ///
    /// # Safety
    /// Running time may depend on the operands.
    #[must_use]
    pub const unsafe fn add_vt(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        Self::reduce1_vt(a + b, self.p)
    }

    /// Modular subtraction in constant time.
    /// Debug builds check that a < p and b < p.
    #[must_use]
    pub const fn sub(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        Self::reduce1(a + self.p - b, self.p)
    }

    /// Modular subtraction in variable time.
    /// Debug builds check that a < p and b < p.
    ///
    /// # Safety
    /// Running time may depend on the operands.
    const unsafe fn sub_vt(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        Self::reduce1_vt(a + self.p - b, self.p)
    }

    /// Modular multiplication in constant time.
    /// Debug builds check that a < p and b < p.
    #[must_use]
    pub const fn mul(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        self.reduce_u128((a as u128) * (b as u128))
    }

    /// Modular multiplication in variable time.
    /// Debug builds check that a < p and b < p.
    ///
    /// # Safety
    /// Running time may depend on the operands.
    const unsafe fn mul_vt(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        Self::reduce1_vt(self.lazy_reduce_u128((a as u128) * (b as u128)), self.p)
    }

    /// Modular multiplication in constant time, for moduli supporting the
    /// optimized reduction.
    ///
    /// Debug builds check that a < p and b < p.
    #[must_use]
    pub const fn mul_opt(&self, a: u64, b: u64) -> u64 {
        debug_assert!(self.supports_opt);
        debug_assert!(a < self.p && b < self.p);

        self.reduce_opt_u128((a as u128) * (b as u128))
    }

    /// Modular multiplication in variable time, for moduli supporting the
    /// optimized reduction. Debug builds check that a < p and b < p.
    ///
    /// # Safety
    /// Running time may depend on the operands.
    const unsafe fn mul_opt_vt(&self, a: u64, b: u64) -> u64 {
        debug_assert!(self.supports_opt);
        debug_assert!(a < self.p && b < self.p);

        self.reduce_opt_u128_vt((a as u128) * (b as u128))
    }

    /// Modular negation in constant time.
    ///
    /// Debug builds check that a < p.
    #[must_use]
    pub const fn neg(&self, a: u64) -> u64 {
        debug_assert!(a < self.p);
        Self::reduce1(self.p - a, self.p)
    }

    /// Modular negation in variable time.
    /// Debug builds check that a < p.
    ///
    /// # Safety
    /// Running time may depend on the operand.
    const unsafe fn neg_vt(&self, a: u64) -> u64 {
        debug_assert!(a < self.p);
        Self::reduce1_vt(self.p - a, self.p)
    }

    /// Shoup representation of a, i.e. floor(a * 2^64 / p).
    ///
    /// Debug builds check that a < p.
    #[must_use]
    pub const fn shoup(&self, a: u64) -> u64 {
        debug_assert!(a < self.p);

        (((a as u128) << 64) / (self.p as u128)) as u64
    }

    /// Shoup multiplication of a and b in constant time.
    ///
    /// Debug builds check that b < p and that b_shoup is the Shoup
    /// representation of b.
    #[must_use]
    pub const fn mul_shoup(&self, a: u64, b: u64, b_shoup: u64) -> u64 {
        Self::reduce1(self.lazy_mul_shoup(a, b, b_shoup), self.p)
    }

    /// Shoup multiplication of a and b in variable time.
    /// Debug builds check that b < p and that b_shoup is the Shoup
    /// representation of b.
    ///
    /// # Safety
    /// Running time may depend on the operands.
    const unsafe fn mul_shoup_vt(&self, a: u64, b: u64, b_shoup: u64) -> u64 {
        Self::reduce1_vt(self.lazy_mul_shoup(a, b, b_shoup), self.p)
    }

    /// Shoup multiplication of a and b in constant time, with the output
    /// only partially reduced into [0, 2 * p).
    ///
    /// Debug builds check that b < p and that b_shoup is the Shoup
    /// representation of b.
    #[must_use]
    pub const fn lazy_mul_shoup(&self, a: u64, b: u64, b_shoup: u64) -> u64 {
        debug_assert!(b < self.p);
        debug_assert!(b_shoup == self.shoup(b));

        let q = ((a as u128) * (b_shoup as u128)) >> 64;
        let r = ((a as u128) * (b as u128) - q * (self.p as u128)) as u64;

        debug_assert!(r < 2 * self.p);

        r
    }

    /// Elementwise modular addition, in place, in constant time.
    ///
    /// Debug builds check that the slices have the same length and that all
    /// elements are < p.
    pub fn add_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        self.arch.dispatch(|| {
            for (ai, bi) in izip!(a.iter_mut(), b.iter()) {
                *ai = self.add(*ai, *bi)
            }
        })
    }

    /// Elementwise modular addition, in place, in variable time.
    /// Debug builds check that the slices have the same length and that all
    /// elements are < p.
    ///
    /// # Safety
    /// Running time may depend on the elements.
    pub unsafe fn add_vec_vt(&self, a: &mut [u64], b: &[u64]) {
        let n = a.len();
        debug_assert_eq!(n, b.len());

        let p = self.p;
        macro_rules! step {
            ($idx:expr) => {
                *a.get_unchecked_mut($idx) =
                    Self::reduce1_vt(*a.get_unchecked_mut($idx) + *b.get_unchecked($idx), p);
            };
        }

        if n % 16 == 0 {
            self.arch.dispatch(|| {
                let mut i = 0;
                while i < n {
                    step!(i);
                    step!(i + 1);
                    step!(i + 2);
                    step!(i + 3);
                    step!(i + 4);
                    step!(i + 5);
                    step!(i + 6);
                    step!(i + 7);
                    step!(i + 8);
                    step!(i + 9);
                    step!(i + 10);
                    step!(i + 11);
                    step!(i + 12);
                    step!(i + 13);
                    step!(i + 14);
                    step!(i + 15);
                    i += 16;
                }
            })
        } else {
            self.arch.dispatch(|| {
                for (ai, bi) in izip!(a.iter_mut(), b.iter()) {
                    *ai = self.add_vt(*ai, *bi)
                }
            })
        }
    }

    /// Elementwise modular subtraction, in place, in constant time.
    ///
    /// Debug builds check that the slices have the same length and that all
    /// elements are < p.
    pub fn sub_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        self.arch.dispatch(|| {
            for (ai, bi) in izip!(a.iter_mut(), b.iter()) {
                *ai = self.sub(*ai, *bi)
            }
        })
    }

    /// Elementwise modular subtraction, in place, in variable time.
    /// Debug builds check that the slices have the same length and that all
    /// elements are < p.
    ///
    /// # Safety
    /// Running time may depend on the elements.
    pub unsafe fn sub_vec_vt(&self, a: &mut [u64], b: &[u64]) {
        let n = a.len();
        debug_assert_eq!(n, b.len());

        let p = self.p;
        macro_rules! step {
            ($idx:expr) => {
                *a.get_unchecked_mut($idx) =
                    Self::reduce1_vt(p + *a.get_unchecked_mut($idx) - *b.get_unchecked($idx), p);
            };
        }

        if n % 16 == 0 {
            self.arch.dispatch(|| {
                let mut i = 0;
                while i < n {
                    step!(i);
                    step!(i + 1);
                    step!(i + 2);
                    step!(i + 3);
                    step!(i + 4);
                    step!(i + 5);
                    step!(i + 6);
                    step!(i + 7);
                    step!(i + 8);
                    step!(i + 9);
                    step!(i + 10);
                    step!(i + 11);
                    step!(i + 12);
                    step!(i + 13);
                    step!(i + 14);
                    step!(i + 15);
                    i += 16;
                }
            })
        } else {
            self.arch.dispatch(|| {
                for (ai, bi) in izip!(a.iter_mut(), b.iter()) {
                    *ai = self.sub_vt(*ai, *bi)
                }
            })
        }
    }

    /// Elementwise modular multiplication, in place, in constant time.
    ///
    /// Debug builds check that the slices have the same length and that all
    /// elements are < p.
    pub fn mul_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());

        if self.supports_opt {
            self.arch.dispatch(|| {
                for (ai, bi) in izip!(a.iter_mut(), b.iter()) {
                    *ai = self.mul_opt(*ai, *bi)
                }
            })
        } else {
            self.arch.dispatch(|| {
                for (ai, bi) in izip!(a.iter_mut(), b.iter()) {
                    *ai = self.mul(*ai, *bi)
                }
            })
        }
    }

    /// Elementwise modular multiplication, in place, in variable time.
    /// Debug builds check that the slices have the same length and that all
    /// elements are < p.
    ///
    /// # Safety
    /// Running time may depend on the elements.
    pub unsafe fn mul_vec_vt(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());

        if self.supports_opt {
            self.arch.dispatch(|| {
                for (ai, bi) in izip!(a.iter_mut(), b.iter()) {
                    *ai = self.mul_opt_vt(*ai, *bi)
                }
            })
        } else {
            self.arch.dispatch(|| {
                for (ai, bi) in izip!(a.iter_mut(), b.iter()) {
                    *ai = self.mul_vt(*ai, *bi)
                }
            })
        }
    }

    /// Multiplication of a vector by a scalar, in place, in constant time.
    ///
    /// Debug builds check that all elements are < p.
    pub fn scalar_mul_vec(&self, a: &mut [u64], b: u64) {
        let b_shoup = self.shoup(b);
        self.arch.dispatch(|| {
            for ai in a.iter_mut() {
                *ai = self.mul_shoup(*ai, b, b_shoup)
            }
        })
    }

    /// Multiplication of a vector by a scalar, in place, in variable time.
    /// Debug builds check that all elements are < p.
    ///
    /// # Safety
    /// Running time may depend on the elements.
    pub unsafe fn scalar_mul_vec_vt(&self, a: &mut [u64], b: u64) {
        let b_shoup = self.shoup(b);
        self.arch.dispatch(|| {
            for ai in a.iter_mut() {
                *ai = self.mul_shoup_vt(*ai, b, b_shoup)
            }
        })
    }

    /// Shoup representation of each element of a vector.
    ///
    /// Debug builds check that all elements are < p.
    #[must_use]
    pub fn shoup_vec(&self, a: &[u64]) -> Vec<u64> {
        self.arch
            .dispatch(|| a.iter().map(|ai| self.shoup(*ai)).collect_vec())
    }

    /// Elementwise Shoup multiplication, in place, in constant time.
    ///
    /// Debug builds check that the slices have the same length, that all
    /// elements are < p, and that b_shoup holds the Shoup representation
    /// of b.
    pub fn mul_shoup_vec(&self, a: &mut [u64], b: &[u64], b_shoup: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        debug_assert_eq!(a.len(), b_shoup.len());
        debug_assert_eq!(&b_shoup, &self.shoup_vec(b));

        self.arch.dispatch(|| {
            for (ai, bi, bi_shoup) in izip!(a.iter_mut(), b.iter(), b_shoup.iter()) {
                *ai = self.mul_shoup(*ai, *bi, *bi_shoup)
            }
        })
    }

    /// Elementwise Shoup multiplication, in place, in variable time.
    /// Debug builds check that the slices have the same length, that all
    /// elements are < p, and that b_shoup holds the Shoup representation
    /// of b.
    ///
    /// # Safety
    /// Running time may depend on the elements.
    pub unsafe fn mul_shoup_vec_vt(&self, a: &mut [u64], b: &[u64], b_shoup: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        debug_assert_eq!(a.len(), b_shoup.len());
        debug_assert_eq!(&b_shoup, &self.shoup_vec(b));

        self.arch.dispatch(|| {
            for (ai, bi, bi_shoup) in izip!(a.iter_mut(), b.iter(), b_shoup.iter()) {
                *ai = self.mul_shoup_vt(*ai, *bi, *bi_shoup)
            }
        })
    }

    /// Reduces each element of a vector, in place, in constant time.
    pub fn reduce_vec(&self, a: &mut [u64]) {
        self.arch.dispatch(|| {
            for ai in a.iter_mut() {
                *ai = self.reduce(*ai)
            }
        })
    }

    /// Reduces each element of a vector, in place, in variable time.
    ///
    /// # Safety
    /// Running time may depend on the elements.
    pub unsafe fn reduce_vec_vt(&self, a: &mut [u64]) {
        self.arch.dispatch(|| {
            for ai in a.iter_mut() {
                *ai = self.reduce_vt(*ai)
            }
        })
    }

    /// Reduction of a signed integer in constant time.
    const fn reduce_i64(&self, a: i64) -> u64 {
        self.reduce_u128((((self.p as i128) << 64) + (a as i128)) as u128)
    }

    /// Reduction of a signed integer in variable time.
    ///
    /// # Safety
    /// Running time may depend on the operand.
    const unsafe fn reduce_i64_vt(&self, a: i64) -> u64 {
        self.reduce_u128_vt((((self.p as i128) << 64) + (a as i128)) as u128)
    }

    /// Reduces each element of a slice of signed integers, in constant time.
    #[must_use]
    pub fn reduce_vec_i64(&self, a: &[i64]) -> Vec<u64> {
        self.arch
            .dispatch(|| a.iter().map(|ai| self.reduce_i64(*ai)).collect_vec())
    }

    /// Reduces each element of a slice of signed integers, in variable time.
    ///
    /// # Safety
    /// Running time may depend on the elements.
    #[must_use]
    pub unsafe fn reduce_vec_i64_vt(&self, a: &[i64]) -> Vec<u64> {
        self.arch
            .dispatch(|| a.iter().map(|ai| self.reduce_i64_vt(*ai)).collect())
    }

    /// Negates each element of a vector, in place, in constant time.
    ///
    /// Debug builds check that all elements are < p.
    pub fn neg_vec(&self, a: &mut [u64]) {
        self.arch.dispatch(|| {
            for ai in a.iter_mut() {
                *ai = self.neg(*ai)
            }
        })
    }

    /// Negates each element of a vector, in place, in variable time.
    /// Debug builds check that all elements are < p.
    ///
    /// # Safety
    /// Running time may depend on the elements.
    pub unsafe fn neg_vec_vt(&self, a: &mut [u64]) {
        self.arch.dispatch(|| {
            for ai in a.iter_mut() {
                *ai = self.neg_vt(*ai)
            }
        })
    }

    /// Representative of a in [-p/2, p/2), in variable time.
    /// Debug builds check that a < p.
    const unsafe fn center_vt(&self, a: u64) -> i64 {
        debug_assert!(a < self.p);

        if a >= self.p >> 1 {
            (a as i64) - (self.p as i64)
        } else {
            a as i64
        }
    }

    /// Centers each element of a vector, in variable time.
    /// Debug builds check that all elements are < p.
    ///
    /// # Safety
    /// Running time may depend on the elements.
    #[must_use]
    pub unsafe fn center_vec_vt(&self, a: &[u64]) -> Vec<i64> {
        a.iter().map(|ai| self.center_vt(*ai)).collect_vec()
    }

    /// Modular exponentiation in variable time.
    ///
    /// Debug builds check that a < p and n < p.
    #[must_use]
    pub fn pow(&self, a: u64, n: u64) -> u64 {
        debug_assert!(a < self.p && n < self.p);

        if n == 0 {
            1
        } else if n == 1 {
            a
        } else {
            let mut r = a;
            let mut i = (62 - n.leading_zeros()) as isize;
            while i >= 0 {
                r = self.mul(r, r);
                if (n >> i) & 1 == 1 {
                    r = self.mul(r, a);
                }
                i -= 1;
            }
            r
        }
    }

    /// Modular inversion in variable time.
    ///
    /// Returns None if p is not prime or a = 0.
    /// Debug builds check that a < p.
    #[must_use]
    pub fn inv(&self, a: u64) -> Option<u64> {
        if !is_prime(self.p) || a == 0 {
            None
        } else {
            let r = self.pow(a, self.p - 2);
            debug_assert_eq!(self.mul(a, r), 1);
            Some(r)
        }
    }

    /// Reduction of a 128-bit integer in constant time.
    #[must_use]
    pub const fn reduce_u128(&self, a: u128) -> u64 {
        Self::reduce1(self.lazy_reduce_u128(a), self.p)
    }

    /// Reduction of a 128-bit integer in variable time.
    ///
    /// # Safety
    /// Running time may depend on the operand.
    #[must_use]
    pub const unsafe fn reduce_u128_vt(&self, a: u128) -> u64 {
        Self::reduce1_vt(self.lazy_reduce_u128(a), self.p)
    }

    /// Reduction of a 64-bit integer in constant time.
    #[must_use]
    pub const fn reduce(&self, a: u64) -> u64 {
        Self::reduce1(self.lazy_reduce(a), self.p)
    }

    /// Reduction of a 64-bit integer in variable time.
    ///
    /// # Safety
    /// Running time may depend on the operand.
    #[must_use]
    pub const unsafe fn reduce_vt(&self, a: u64) -> u64 {
        Self::reduce1_vt(self.lazy_reduce(a), self.p)
    }

    /// Optimized reduction of a 128-bit integer in constant time.
    #[must_use]
    pub const fn reduce_opt_u128(&self, a: u128) -> u64 {
        debug_assert!(self.supports_opt);
        Self::reduce1(self.lazy_reduce_opt_u128(a), self.p)
    }

    /// Optimized reduction of a 128-bit integer in variable time.
    ///
    /// # Safety
    /// Running time may depend on the operand.
    pub(crate) const unsafe fn reduce_opt_u128_vt(&self, a: u128) -> u64 {
        debug_assert!(self.supports_opt);
        Self::reduce1_vt(self.lazy_reduce_opt_u128(a), self.p)
    }

    /// Optimized reduction of a 64-bit integer in constant time.
    #[must_use]
    pub const fn reduce_opt(&self, a: u64) -> u64 {
        Self::reduce1(self.lazy_reduce_opt(a), self.p)
    }

    /// Optimized reduction of a 64-bit integer in variable time.
    ///
    /// # Safety
    /// Running time may depend on the operand.
    #[must_use]
    pub const unsafe fn reduce_opt_vt(&self, a: u64) -> u64 {
        Self::reduce1_vt(self.lazy_reduce_opt(a), self.p)
    }

    /// Final reduction step, mapping [0, 2 * p) onto [0, p) in constant
    /// time. Debug builds check that x < 2 * p.
    pub(crate) const fn reduce1(x: u64, p: u64) -> u64 {
        debug_assert!(p >> 63 == 0);
        debug_assert!(x < 2 * p);

        let r = const_time_cond_select(x, x.wrapping_sub(p), x < p);

        debug_assert!(r == x % p);

        r
    }

    /// Final reduction step, mapping [0, 2 * p) onto [0, p) in variable
    /// time. Debug builds check that x < 2 * p.
    ///
    /// # Safety
    /// Running time may depend on the operand.
    #[cfg(any(target_os = "macos", target_feature = "avx2"))]
    pub(crate) const unsafe fn reduce1_vt(x: u64, p: u64) -> u64 {
        debug_assert!(p >> 63 == 0);
        debug_assert!(x < 2 * p);

        if x >= p {
            x - p
        } else {
            x
        }
    }

    #[cfg(all(not(target_os = "macos"), not(target_feature = "avx2")))]
    #[inline]
    pub(crate) const unsafe fn reduce1_vt(x: u64, p: u64) -> u64 {
        Self::reduce1(x, p)
    }

    /// Partial Barrett reduction of a 128-bit integer, with the output in
    /// [0, 2 * p).
    #[must_use]
    pub const fn lazy_reduce_u128(&self, a: u128) -> u64 {
        let a_lo = a as u64;
        let a_hi = (a >> 64) as u64;
        let p_lo_lo = ((a_lo as u128) * (self.barrett_lo as u128)) >> 64;
        let p_hi_lo = (a_hi as u128) * (self.barrett_lo as u128);
        let p_lo_hi = (a_lo as u128) * (self.barrett_hi as u128);

        let q = ((p_lo_hi + p_hi_lo + p_lo_lo) >> 64) + (a_hi as u128) * (self.barrett_hi as u128);
        let r = (a - q * (self.p as u128)) as u64;

        debug_assert!((r as u128) < 2 * (self.p as u128));
        debug_assert!(r % self.p == (a % (self.p as u128)) as u64);

        r
    }

    /// Partial Barrett reduction of a 64-bit integer, with the output in
    /// [0, 2 * p).
    #[must_use]
    pub const fn lazy_reduce(&self, a: u64) -> u64 {
        let p_lo_lo = ((a as u128) * (self.barrett_lo as u128)) >> 64;
        let p_lo_hi = (a as u128) * (self.barrett_hi as u128);

        let q = (p_lo_hi + p_lo_lo) >> 64;
        let r = (a as u128 - q * (self.p as u128)) as u64;

        debug_assert!((r as u128) < 2 * (self.p as u128));
        debug_assert!(r % self.p == a % self.p);

        r
    }

    /// Partial optimized reduction of a 128-bit integer, with the output in
    /// [0, 2 * p).
    ///
    /// Debug builds check that the input is < p^2.
    #[must_use]
    pub const fn lazy_reduce_opt_u128(&self, a: u128) -> u64 {
        debug_assert!(a < (self.p as u128) * (self.p as u128));

        let q = (((self.barrett_lo as u128) * (a >> 64)) + (a << self.leading_zeros)) >> 64;
        let r = (a - q * (self.p as u128)) as u64;

        debug_assert!((r as u128) < 2 * (self.p as u128));
        debug_assert!(r % self.p == (a % (self.p as u128)) as u64);

        r
    }

    /// Partial optimized reduction of a 64-bit integer, with the output in
    /// [0, 2 * p).
    const fn lazy_reduce_opt(&self, a: u64) -> u64 {
        let q = a >> (64 - self.leading_zeros);
        let r = ((a as u128) - (q as u128) * (self.p as u128)) as u64;

        debug_assert!((r as u128) < 2 * (self.p as u128));
        debug_assert!(r % self.p == a % self.p);

        r
    }

    /// Partially reduces each element of a vector, in place, with outputs in
    /// [0, 2 * p).
    pub fn lazy_reduce_vec(&self, a: &mut [u64]) {
        if self.supports_opt {
            for ai in a.iter_mut() {
                *ai = self.lazy_reduce_opt(*ai)
            }
        } else {
            for ai in a.iter_mut() {
                *ai = self.lazy_reduce(*ai)
            }
        }
    }

    /// Samples a vector of elements, uniform modulo p.
    pub fn random_vec<R: RngCore + CryptoRng>(&self, size: usize, rng: &mut R) -> Vec<u64> {
        rng.sample_iter(self.distribution).take(size).collect_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::{primes, Modulus};
    use itertools::{izip, Itertools};
    use proptest::collection::vec as prop_vec;
    use proptest::prelude::{any, BoxedStrategy, Just, Strategy};
    use rand::{thread_rng, RngCore};

    fn arb_modulus() -> impl Strategy<Value = Modulus> {
        any::<u64>().prop_filter_map("filter invalid moduli", |p| Modulus::new(p).ok())
    }

    // Two u64 vectors of the same (arbitrary) length.
    fn vec_pair() -> BoxedStrategy<(Vec<u64>, Vec<u64>)> {
        prop_vec(any::<u64>(), 1..100)
            .prop_flat_map(|first| {
                let len = first.len();
                (Just(first), prop_vec(any::<u64>(), len))
            })
            .boxed()
    }

    proptest! {
        #[test]
        fn constructor(p: u64) {
            // Graceful rejection of 63- and 64-bit integers.
            prop_assert!(Modulus::new(p | (1u64 << 62)).is_err());
            prop_assert!(Modulus::new(p | (1u64 << 63)).is_err());

            // Graceful rejection of 0 and 1.
            prop_assert!(Modulus::new(0u64).is_err());
            prop_assert!(Modulus::new(1u64).is_err());

            // Everything else is accepted.
            prop_assume!(p >> 2 >= 2);
            let q = Modulus::new(p >> 2);
            prop_assert!(q.is_ok());
            prop_assert_eq!(*q.unwrap(), p >> 2);
        }

        #[test]
        fn neg(p in arb_modulus(), mut a: u64) {
            a = p.reduce(a);
            prop_assert_eq!(p.neg(a), (*p - a) % *p);
            unsafe { prop_assert_eq!(p.neg_vt(a), (*p - a) % *p) }

            #[cfg(debug_assertions)]
            {
                prop_assert!(std::panic::catch_unwind(|| p.neg(*p)).is_err());
                prop_assert!(std::panic::catch_unwind(|| p.neg(*p + 1)).is_err());
            }
        }

        #[test]
        fn add(p in arb_modulus(), mut a: u64, mut b: u64) {
            a = p.reduce(a);
            b = p.reduce(b);
            prop_assert_eq!(p.add(a, b), (a + b) % *p);
            unsafe { prop_assert_eq!(p.add_vt(a, b), (a + b) % *p) }

            #[cfg(debug_assertions)]
            {
                prop_assert!(std::panic::catch_unwind(|| p.add(*p, a)).is_err());
                prop_assert!(std::panic::catch_unwind(|| p.add(a, *p)).is_err());
                prop_assert!(std::panic::catch_unwind(|| p.add(*p + 1, a)).is_err());
                prop_assert!(std::panic::catch_unwind(|| p.add(a, *p + 1)).is_err());
            }
        }

        #[test]
        fn sub(p in arb_modulus(), mut a: u64, mut b: u64) {
            a = p.reduce(a);
            b = p.reduce(b);
            prop_assert_eq!(p.sub(a, b), (a + *p - b) % *p);
            unsafe { prop_assert_eq!(p.sub_vt(a, b), (a + *p - b) % *p) }

            #[cfg(debug_assertions)]
            {
                prop_assert!(std::panic::catch_unwind(|| p.sub(*p, a)).is_err());
                prop_assert!(std::panic::catch_unwind(|| p.sub(a, *p)).is_err());
                prop_assert!(std::panic::catch_unwind(|| p.sub(*p + 1, a)).is_err());
                prop_assert!(std::panic::catch_unwind(|| p.sub(a, *p + 1)).is_err());
            }
        }

        #[test]
        fn mul(p in arb_modulus(), mut a: u64, mut b: u64) {
            a = p.reduce(a);
            b = p.reduce(b);
            prop_assert_eq!(p.mul(a, b) as u128, ((a as u128) * (b as u128)) % (*p as u128));
            unsafe { prop_assert_eq!(p.mul_vt(a, b) as u128, ((a as u128) * (b as u128)) % (*p as u128)) }

            #[cfg(debug_assertions)]
            {
                prop_assert!(std::panic::catch_unwind(|| p.mul(*p, a)).is_err());
                prop_assert!(std::panic::catch_unwind(|| p.mul(a, *p)).is_err());
                prop_assert!(std::panic::catch_unwind(|| p.mul(*p + 1, a)).is_err());
                prop_assert!(std::panic::catch_unwind(|| p.mul(a, *p + 1)).is_err());
            }
        }

        #[test]
        fn mul_shoup(p in arb_modulus(), mut a: u64, mut b: u64) {
            a = p.reduce(a);
            b = p.reduce(b);
            let b_shoup = p.shoup(b);

            #[cfg(debug_assertions)]
            {
                prop_assert!(std::panic::catch_unwind(|| p.shoup(*p)).is_err());
                prop_assert!(std::panic::catch_unwind(|| p.shoup(*p + 1)).is_err());
            }

            prop_assert_eq!(p.mul_shoup(a, b, b_shoup) as u128, ((a as u128) * (b as u128)) % (*p as u128));
            unsafe { prop_assert_eq!(p.mul_shoup_vt(a, b, b_shoup) as u128, ((a as u128) * (b as u128)) % (*p as u128)) }

            // A stale Shoup value trips the debug checks.
            #[cfg(debug_assertions)]
            {
                prop_assert!(std::panic::catch_unwind(|| p.mul_shoup(a, *p, b_shoup)).is_err());
                prop_assume!(a != b);
                prop_assert!(std::panic::catch_unwind(|| p.mul_shoup(a, a, b_shoup)).is_err());
            }
        }

        #[test]
        fn reduce(p in arb_modulus(), a: u64) {
            prop_assert_eq!(p.reduce(a), a % *p);
            unsafe { prop_assert_eq!(p.reduce_vt(a), a % *p) }
            if p.supports_opt {
                prop_assert_eq!(p.reduce_opt(a), a % *p);
                unsafe { prop_assert_eq!(p.reduce_opt_vt(a), a % *p) }
            }
        }

        #[test]
        fn lazy_reduce(p in arb_modulus(), a: u64) {
            prop_assert!(p.lazy_reduce(a) < 2 * *p);
            prop_assert_eq!(p.lazy_reduce(a) % *p, p.reduce(a));
        }

        #[test]
        fn reduce_i64(p in arb_modulus(), a: i64) {
            let expected = if a < 0 { p.neg(p.reduce(-a as u64)) } else { p.reduce(a as u64) };
            prop_assert_eq!(p.reduce_i64(a), expected);
            unsafe { prop_assert_eq!(p.reduce_i64_vt(a), expected) }
        }

        #[test]
        fn reduce_u128(p in arb_modulus(), mut a: u128) {
            prop_assert_eq!(p.reduce_u128(a) as u128, a % (*p as u128));
            unsafe { prop_assert_eq!(p.reduce_u128_vt(a) as u128, a % (*p as u128)) }
            if p.supports_opt {
                // The optimized path only accepts inputs below p^2.
                let p_square = (*p as u128) * (*p as u128);
                a %= p_square;
                prop_assert_eq!(p.reduce_opt_u128(a) as u128, a % (*p as u128));
                unsafe { prop_assert_eq!(p.reduce_opt_u128_vt(a) as u128, a % (*p as u128)) }
            }
        }

        #[test]
        fn add_vec(p in arb_modulus(), (mut a, mut b) in vec_pair()) {
            p.reduce_vec(&mut a);
            p.reduce_vec(&mut b);
            let orig = a.clone();
            p.add_vec(&mut a, &b);
            prop_assert_eq!(a.clone(), izip!(b.iter(), orig.iter()).map(|(bi, oi)| p.add(*bi, *oi)).collect_vec());
            a.clone_from(&orig);
            unsafe { p.add_vec_vt(&mut a, &b) }
            prop_assert_eq!(a, izip!(b.iter(), orig.iter()).map(|(bi, oi)| p.add(*bi, *oi)).collect_vec());
        }

        #[test]
        fn sub_vec(p in arb_modulus(), (mut a, mut b) in vec_pair()) {
            p.reduce_vec(&mut a);
            p.reduce_vec(&mut b);
            let orig = a.clone();
            p.sub_vec(&mut a, &b);
            prop_assert_eq!(a.clone(), izip!(b.iter(), orig.iter()).map(|(bi, oi)| p.sub(*oi, *bi)).collect_vec());
            a.clone_from(&orig);
            unsafe { p.sub_vec_vt(&mut a, &b) }
            prop_assert_eq!(a, izip!(b.iter(), orig.iter()).map(|(bi, oi)| p.sub(*oi, *bi)).collect_vec());
        }

        #[test]
        fn mul_vec(p in arb_modulus(), (mut a, mut b) in vec_pair()) {
            p.reduce_vec(&mut a);
            p.reduce_vec(&mut b);
            let orig = a.clone();
            p.mul_vec(&mut a, &b);
            prop_assert_eq!(a.clone(), izip!(b.iter(), orig.iter()).map(|(bi, oi)| p.mul(*oi, *bi)).collect_vec());
            a.clone_from(&orig);
            unsafe { p.mul_vec_vt(&mut a, &b); }
            prop_assert_eq!(a, izip!(b.iter(), orig.iter()).map(|(bi, oi)| p.mul(*oi, *bi)).collect_vec());
        }

        #[test]
        fn scalar_mul_vec(p in arb_modulus(), mut a: Vec<u64>, mut b: u64) {
            p.reduce_vec(&mut a);
            b = p.reduce(b);
            let orig = a.clone();

            p.scalar_mul_vec(&mut a, b);
            prop_assert_eq!(a.clone(), orig.iter().map(|oi| p.mul(*oi, b)).collect_vec());

            a.clone_from(&orig);
            unsafe { p.scalar_mul_vec_vt(&mut a, b) }
            prop_assert_eq!(a, orig.iter().map(|oi| p.mul(*oi, b)).collect_vec());
        }

        #[test]
        fn mul_shoup_vec(p in arb_modulus(), (mut a, mut b) in vec_pair()) {
            p.reduce_vec(&mut a);
            p.reduce_vec(&mut b);
            let b_shoup = p.shoup_vec(&b);
            let orig = a.clone();
            p.mul_shoup_vec(&mut a, &b, &b_shoup);
            prop_assert_eq!(a.clone(), izip!(b.iter(), orig.iter()).map(|(bi, oi)| p.mul(*oi, *bi)).collect_vec());
            a.clone_from(&orig);
            unsafe { p.mul_shoup_vec_vt(&mut a, &b, &b_shoup) }
            prop_assert_eq!(a, izip!(b.iter(), orig.iter()).map(|(bi, oi)| p.mul(*oi, *bi)).collect_vec());
        }

        #[test]
        fn reduce_vec(p in arb_modulus(), a: Vec<u64>) {
            let mut b = a.clone();
            p.reduce_vec(&mut b);
            prop_assert_eq!(b.clone(), a.iter().map(|ai| p.reduce(*ai)).collect_vec());

            b.clone_from(&a);
            unsafe { p.reduce_vec_vt(&mut b) }
            prop_assert_eq!(b, a.iter().map(|ai| p.reduce(*ai)).collect_vec());
        }

        #[test]
        fn lazy_reduce_vec(p in arb_modulus(), a: Vec<u64>) {
            let mut b = a.clone();
            p.lazy_reduce_vec(&mut b);
            prop_assert!(b.iter().all(|bi| *bi < 2 * *p));
            prop_assert!(izip!(a, b).all(|(ai, bi)| bi % *p == ai % *p));
        }

        #[test]
        fn reduce_vec_i64(p in arb_modulus(), a: Vec<i64>) {
            let b = p.reduce_vec_i64(&a);
            prop_assert_eq!(b, a.iter().map(|ai| p.reduce_i64(*ai)).collect_vec());
            let b = unsafe { p.reduce_vec_i64_vt(&a) };
            prop_assert_eq!(b, a.iter().map(|ai| p.reduce_i64(*ai)).collect_vec());
        }

        #[test]
        fn neg_vec(p in arb_modulus(), mut a: Vec<u64>) {
            p.reduce_vec(&mut a);
            let mut b = a.clone();
            p.neg_vec(&mut b);
            prop_assert_eq!(b.clone(), a.iter().map(|ai| p.neg(*ai)).collect_vec());
            b.clone_from(&a);
            unsafe { p.neg_vec_vt(&mut b); }
            prop_assert_eq!(b, a.iter().map(|ai| p.neg(*ai)).collect_vec());
        }

        #[test]
        fn random_vec(p in arb_modulus(), size in 1..1000usize) {
            let mut rng = thread_rng();

            let v = p.random_vec(size, &mut rng);
            prop_assert_eq!(v.len(), size);

            let w = p.random_vec(size, &mut rng);
            prop_assert_eq!(w.len(), size);

            if (*p).leading_zeros() <= 30 {
                // Identical draws happen with probability at most 2^(-30).
                prop_assert_ne!(v, w);
            }
        }
    }

    // TODO: Fold mul_opt, pow and inv into the proptest block above.
    #[test]
    fn mul_opt() {
        let mut rng = thread_rng();

        for p in [4611686018326724609u64, 4611686018309947393] {
            assert!(primes::supports_opt(p));
            let q = Modulus::new(p).unwrap();

            assert_eq!(q.mul_opt(0, 1), 0);
            assert_eq!(q.mul_opt(1, 1), 1);
            assert_eq!(q.mul_opt(2 % p, 3 % p), 6 % p);
            assert_eq!(q.mul_opt(p - 1, 1), p - 1);
            assert_eq!(q.mul_opt(p - 1, 2 % p), p - 2);

            #[cfg(debug_assertions)]
            {
                assert!(std::panic::catch_unwind(|| q.mul_opt(p, 1)).is_err());
                assert!(std::panic::catch_unwind(|| q.mul_opt(p << 1, 1)).is_err());
                assert!(std::panic::catch_unwind(|| q.mul_opt(0, p)).is_err());
                assert!(std::panic::catch_unwind(|| q.mul_opt(0, p << 1)).is_err());
            }

            for _ in 0..100 {
                let a = rng.next_u64() % p;
                let b = rng.next_u64() % p;
                let expected = (((a as u128) * (b as u128)) % (p as u128)) as u64;
                assert_eq!(q.mul_opt(a, b), expected);
            }
        }
    }

    #[test]
    fn pow() {
        let mut rng = thread_rng();

        for p in [2u64, 3, 17, 1987, 4611686018326724609] {
            let q = Modulus::new(p).unwrap();

            assert_eq!(q.pow(p - 1, 0), 1);
            assert_eq!(q.pow(p - 1, 1), p - 1);
            assert_eq!(q.pow(p - 1, 2 % p), 1);
            assert_eq!(q.pow(1, p - 2), 1);
            assert_eq!(q.pow(1, p - 1), 1);

            #[cfg(debug_assertions)]
            {
                assert!(std::panic::catch_unwind(|| q.pow(p, 1)).is_err());
                assert!(std::panic::catch_unwind(|| q.pow(p << 1, 1)).is_err());
                assert!(std::panic::catch_unwind(|| q.pow(0, p)).is_err());
                assert!(std::panic::catch_unwind(|| q.pow(0, p << 1)).is_err());
            }

            // Cross-check against repeated multiplication for small exponents.
            for _ in 0..10 {
                let base = rng.next_u64() % p;
                let exponent = (rng.next_u64() % p) % 1000;
                let mut expected = 1;
                for _ in 0..exponent {
                    expected = q.mul(expected, base);
                }
                assert_eq!(q.pow(base, exponent), expected);
            }
        }
    }

    #[test]
    fn inv() {
        let mut rng = thread_rng();

        for p in [2u64, 3, 17, 1987, 4611686018326724609] {
            let q = Modulus::new(p).unwrap();

            assert!(q.inv(0).is_none());
            assert_eq!(q.inv(1).unwrap(), 1);
            assert_eq!(q.inv(p - 1).unwrap(), p - 1);

            #[cfg(debug_assertions)]
            {
                assert!(std::panic::catch_unwind(|| q.inv(p)).is_err());
                assert!(std::panic::catch_unwind(|| q.inv(p << 1)).is_err());
            }

            for _ in 0..100 {
                let a = rng.next_u64() % p;
                match q.inv(a) {
                    None => assert_eq!(a, 0),
                    Some(inv_a) => assert_eq!(q.mul(a, inv_a), 1),
                }
            }
        }
    }
}
