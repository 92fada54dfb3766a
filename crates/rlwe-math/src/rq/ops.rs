//! Arithmetic operations over polynomials.

use super::{Poly, Representation};
use itertools::izip;
use num_bigint::BigUint;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use zeroize::Zeroize;

impl AddAssign<&Poly> for Poly {
    fn add_assign(&mut self, p: &Poly) {
        assert_ne!(
            self.representation,
            Representation::NttShoup,
            "Cannot add onto a polynomial in NttShoup representation"
        );
        assert_eq!(
            self.representation, p.representation,
            "The polynomials must be in the same representation"
        );
        debug_assert_eq!(self.ctx, p.ctx, "The polynomials must share a context");

        let vt = self.allow_variable_time_computations || p.allow_variable_time_computations;
        for (mut v1, v2, qi) in izip!(
            self.coefficients.outer_iter_mut(),
            p.coefficients.outer_iter(),
            self.ctx.q.iter()
        ) {
            if vt {
                unsafe { qi.add_vec_vt(v1.as_slice_mut().unwrap(), v2.as_slice().unwrap()) }
            } else {
                qi.add_vec(v1.as_slice_mut().unwrap(), v2.as_slice().unwrap())
            }
        }
        self.allow_variable_time_computations = vt;
    }
}

impl AddAssign<Poly> for Poly {
    fn add_assign(&mut self, p: Poly) {
        *self += &p
    }
}

impl Add<&Poly> for &Poly {
    type Output = Poly;
    fn add(self, p: &Poly) -> Poly {
        let mut q = self.clone();
        q += p;
        q
    }
}

impl Add for Poly {
    type Output = Poly;
    fn add(self, mut p: Poly) -> Poly {
        p += self;
        p
    }
}

impl SubAssign<&Poly> for Poly {
    fn sub_assign(&mut self, p: &Poly) {
        assert_ne!(
            self.representation,
            Representation::NttShoup,
            "Cannot subtract from a polynomial in NttShoup representation"
        );
        assert_eq!(
            self.representation, p.representation,
            "The polynomials must be in the same representation"
        );
        debug_assert_eq!(self.ctx, p.ctx, "The polynomials must share a context");

        let vt = self.allow_variable_time_computations || p.allow_variable_time_computations;
        for (mut v1, v2, qi) in izip!(
            self.coefficients.outer_iter_mut(),
            p.coefficients.outer_iter(),
            self.ctx.q.iter()
        ) {
            if vt {
                unsafe { qi.sub_vec_vt(v1.as_slice_mut().unwrap(), v2.as_slice().unwrap()) }
            } else {
                qi.sub_vec(v1.as_slice_mut().unwrap(), v2.as_slice().unwrap())
            }
        }
        self.allow_variable_time_computations = vt;
    }
}

impl Sub<&Poly> for &Poly {
    type Output = Poly;
    fn sub(self, p: &Poly) -> Poly {
        let mut q = self.clone();
        q -= p;
        q
    }
}

impl MulAssign<&Poly> for Poly {
    fn mul_assign(&mut self, p: &Poly) {
        assert_ne!(
            self.representation,
            Representation::NttShoup,
            "Cannot multiply onto a polynomial in NttShoup representation"
        );
        assert_eq!(
            self.representation,
            Representation::Ntt,
            "The accumulator must be in Ntt representation"
        );
        debug_assert_eq!(self.ctx, p.ctx, "The polynomials must share a context");

        let vt = self.allow_variable_time_computations || p.allow_variable_time_computations;
        match p.representation {
            Representation::Ntt => {
                for (mut v1, v2, qi) in izip!(
                    self.coefficients.outer_iter_mut(),
                    p.coefficients.outer_iter(),
                    self.ctx.q.iter()
                ) {
                    if vt {
                        unsafe {
                            qi.mul_vec_vt(v1.as_slice_mut().unwrap(), v2.as_slice().unwrap())
                        }
                    } else {
                        qi.mul_vec(v1.as_slice_mut().unwrap(), v2.as_slice().unwrap())
                    }
                }
            }
            Representation::NttShoup => {
                for (mut v1, v2, v2_shoup, qi) in izip!(
                    self.coefficients.outer_iter_mut(),
                    p.coefficients.outer_iter(),
                    p.coefficients_shoup.as_ref().unwrap().outer_iter(),
                    self.ctx.q.iter()
                ) {
                    if vt {
                        unsafe {
                            qi.mul_shoup_vec_vt(
                                v1.as_slice_mut().unwrap(),
                                v2.as_slice().unwrap(),
                                v2_shoup.as_slice().unwrap(),
                            )
                        }
                    } else {
                        qi.mul_shoup_vec(
                            v1.as_slice_mut().unwrap(),
                            v2.as_slice().unwrap(),
                            v2_shoup.as_slice().unwrap(),
                        )
                    }
                }
            }
            _ => {
                panic!("The multiplicand must be in Ntt or NttShoup representation")
            }
        }
        self.allow_variable_time_computations = vt;
    }
}

impl MulAssign<&BigUint> for Poly {
    fn mul_assign(&mut self, p: &BigUint) {
        assert_ne!(
            self.representation,
            Representation::NttShoup,
            "Cannot multiply a polynomial in NttShoup representation by a scalar"
        );

        // Residues of the scalar modulo each prime of the chain.
        let residues = self.ctx.rns.project(p);

        for (mut v1, ri, qi) in izip!(
            self.coefficients.outer_iter_mut(),
            residues.iter(),
            self.ctx.q.iter()
        ) {
            if self.allow_variable_time_computations {
                unsafe { qi.scalar_mul_vec_vt(v1.as_slice_mut().unwrap(), *ri) }
            } else {
                qi.scalar_mul_vec(v1.as_slice_mut().unwrap(), *ri)
            }
        }
    }
}

impl Mul<&Poly> for &Poly {
    type Output = Poly;
    fn mul(self, p: &Poly) -> Poly {
        match self.representation {
            Representation::NttShoup => {
                // TODO: Accept an NttShoup left operand in add, sub and neg
                // as well.
                let mut q = p.clone();
                if q.representation == Representation::NttShoup {
                    q.coefficients_shoup
                        .as_mut()
                        .unwrap()
                        .as_slice_mut()
                        .unwrap()
                        .zeroize();
                    unsafe { q.override_representation(Representation::Ntt) }
                }
                q *= self;
                q
            }
            _ => {
                let mut q = self.clone();
                q *= p;
                q
            }
        }
    }
}

impl Mul<&BigUint> for &Poly {
    type Output = Poly;
    fn mul(self, p: &BigUint) -> Poly {
        let mut q = self.clone();
        q *= p;
        q
    }
}

impl Mul<&Poly> for &BigUint {
    type Output = Poly;
    fn mul(self, p: &Poly) -> Poly {
        p * self
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Poly {
        assert_ne!(
            self.representation,
            Representation::NttShoup,
            "Cannot negate a polynomial in NttShoup representation"
        );

        let mut out = self.clone();
        for (mut v1, qi) in izip!(out.coefficients.outer_iter_mut(), out.ctx.q.iter()) {
            if self.allow_variable_time_computations {
                unsafe { qi.neg_vec_vt(v1.as_slice_mut().unwrap()) }
            } else {
                qi.neg_vec(v1.as_slice_mut().unwrap())
            }
        }
        out
    }
}

impl Neg for Poly {
    type Output = Poly;

    fn neg(mut self) -> Poly {
        assert_ne!(
            self.representation,
            Representation::NttShoup,
            "Cannot negate a polynomial in NttShoup representation"
        );

        let vt = self.allow_variable_time_computations;
        for (mut v1, qi) in izip!(self.coefficients.outer_iter_mut(), self.ctx.q.iter()) {
            if vt {
                unsafe { qi.neg_vec_vt(v1.as_slice_mut().unwrap()) }
            } else {
                qi.neg_vec(v1.as_slice_mut().unwrap())
            }
        }
        self
    }
}
