//! Conversions between polynomials and containers of integers.

use super::{traits::TryConvertFrom, Context, Poly, Representation};
use crate::{Error, Result};
use itertools::{izip, Itertools};
use ndarray::{Array2, ArrayView, Axis};
use num_bigint::BigUint;
use std::sync::Arc;
use zeroize::{Zeroize, Zeroizing};

impl TryConvertFrom<Vec<u64>> for Poly {
    fn try_convert_from<R>(
        mut v: Vec<u64>,
        ctx: &Arc<Context>,
        variable_time: bool,
        representation: R,
    ) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        match representation.into() {
            Some(Representation::Ntt) => {
                match Array2::from_shape_vec((ctx.q.len(), ctx.degree), v) {
                    Ok(coefficients) => Ok(Self {
                        ctx: ctx.clone(),
                        representation: Representation::Ntt,
                        allow_variable_time_computations: variable_time,
                        coefficients,
                        coefficients_shoup: None,
                    }),
                    Err(_) => Err(Error::Default(
                        "Ntt representation requires all coefficients to be specified".to_string(),
                    )),
                }
            }
            Some(Representation::NttShoup) => {
                match Array2::from_shape_vec((ctx.q.len(), ctx.degree), v) {
                    Ok(coefficients) => {
                        let mut p = Self {
                            ctx: ctx.clone(),
                            representation: Representation::NttShoup,
                            allow_variable_time_computations: variable_time,
                            coefficients,
                            coefficients_shoup: None,
                        };
                        p.compute_coefficients_shoup();
                        Ok(p)
                    }
                    Err(_) => Err(Error::Default(
                        "NttShoup representation requires all coefficients to be specified"
                            .to_string(),
                    )),
                }
            }
            Some(Representation::PowerBasis) => {
                if v.len() == ctx.q.len() * ctx.degree {
                    // The length was just checked against the shape.
                    let coefficients =
                        Array2::from_shape_vec((ctx.q.len(), ctx.degree), v).unwrap();
                    Ok(Self {
                        ctx: ctx.clone(),
                        representation: Representation::PowerBasis,
                        allow_variable_time_computations: variable_time,
                        coefficients,
                        coefficients_shoup: None,
                    })
                } else if v.len() <= ctx.degree {
                    // Short vectors are promoted by reducing them modulo
                    // every prime of the chain.
                    let mut out = Self::zero(ctx, Representation::PowerBasis);
                    for (mut row, qi) in izip!(out.coefficients.outer_iter_mut(), ctx.q.iter()) {
                        let coeffs = row.as_slice_mut().unwrap();
                        coeffs[..v.len()].copy_from_slice(&v);
                        if variable_time {
                            unsafe { qi.reduce_vec_vt(coeffs) }
                        } else {
                            qi.reduce_vec(coeffs);
                        }
                    }
                    if variable_time {
                        unsafe { out.allow_variable_time_computations() }
                    } else {
                        v.zeroize();
                    }
                    Ok(out)
                } else {
                    Err(Error::Default(
                        "PowerBasis representation requires either all coefficients, or at most `degree` of them"
                            .to_string(),
                    ))
                }
            }
            None => Err(Error::Default(
                "The target representation must be specified when converting a vector".to_string(),
            )),
        }
    }
}

impl TryConvertFrom<Array2<u64>> for Poly {
    fn try_convert_from<R>(
        a: Array2<u64>,
        ctx: &Arc<Context>,
        variable_time: bool,
        representation: R,
    ) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        if a.shape() != [ctx.q.len(), ctx.degree] {
            return Err(Error::Default(
                "The coefficient array has an invalid shape".to_string(),
            ));
        }
        let repr = representation.into().ok_or_else(|| {
            Error::Default(
                "The target representation must be specified when converting an array".to_string(),
            )
        })?;
        let mut p = Self {
            ctx: ctx.clone(),
            representation: repr,
            allow_variable_time_computations: variable_time,
            coefficients: a,
            coefficients_shoup: None,
        };
        if p.representation == Representation::NttShoup {
            p.compute_coefficients_shoup()
        }
        Ok(p)
    }
}

impl<'a> TryConvertFrom<&'a [u64]> for Poly {
    fn try_convert_from<R>(
        v: &'a [u64],
        ctx: &Arc<Context>,
        variable_time: bool,
        representation: R,
    ) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        Poly::try_convert_from(v.to_vec(), ctx, variable_time, representation)
    }
}

impl<'a> TryConvertFrom<&'a [i64]> for Poly {
    fn try_convert_from<R>(
        v: &'a [i64],
        ctx: &Arc<Context>,
        variable_time: bool,
        representation: R,
    ) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        if representation.into() != Some(Representation::PowerBasis) {
            return Err(Error::Default(
                "Signed coefficients can only be converted in PowerBasis representation"
                    .to_string(),
            ));
        }
        if v.len() > ctx.degree {
            return Err(Error::Default(
                "At most `degree` signed coefficients can be specified".to_string(),
            ));
        }
        let mut out = Self::zero(ctx, Representation::PowerBasis);
        if variable_time {
            unsafe { out.allow_variable_time_computations() }
        }
        for (mut row, qi) in izip!(out.coefficients.outer_iter_mut(), ctx.q.iter()) {
            let coeffs = row.as_slice_mut().unwrap();
            if variable_time {
                unsafe { coeffs[..v.len()].copy_from_slice(&qi.reduce_vec_i64_vt(v)) }
            } else {
                coeffs[..v.len()].copy_from_slice(Zeroizing::new(qi.reduce_vec_i64(v)).as_ref());
            }
        }
        Ok(out)
    }
}

impl<'a> TryConvertFrom<&'a Vec<i64>> for Poly {
    fn try_convert_from<R>(
        v: &'a Vec<i64>,
        ctx: &Arc<Context>,
        variable_time: bool,
        representation: R,
    ) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        Poly::try_convert_from(v.as_slice(), ctx, variable_time, representation)
    }
}

impl<'a> TryConvertFrom<&'a [BigUint]> for Poly {
    fn try_convert_from<R>(
        v: &'a [BigUint],
        ctx: &Arc<Context>,
        variable_time: bool,
        representation: R,
    ) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        if v.len() > ctx.degree {
            return Err(Error::Default(
                "The slice holds more big integers than the polynomial degree".to_string(),
            ));
        }
        let repr = representation.into().ok_or_else(|| {
            Error::Default(
                "The target representation must be specified when converting a vector".to_string(),
            )
        })?;

        let mut coefficients = Array2::zeros((ctx.q.len(), ctx.degree));
        for (mut rests, vi) in izip!(coefficients.axis_iter_mut(Axis(1)), v) {
            rests.assign(&ArrayView::from(&ctx.rns.project(vi)));
        }

        let mut p = Self {
            ctx: ctx.clone(),
            representation: repr,
            allow_variable_time_computations: variable_time,
            coefficients,
            coefficients_shoup: None,
        };
        if p.representation == Representation::NttShoup {
            p.compute_coefficients_shoup()
        }
        Ok(p)
    }
}

impl<'a> TryConvertFrom<&'a Vec<u64>> for Poly {
    fn try_convert_from<R>(
        v: &'a Vec<u64>,
        ctx: &Arc<Context>,
        variable_time: bool,
        representation: R,
    ) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        Poly::try_convert_from(v.to_vec(), ctx, variable_time, representation)
    }
}

impl<'a, const N: usize> TryConvertFrom<&'a [u64; N]> for Poly {
    fn try_convert_from<R>(
        v: &'a [u64; N],
        ctx: &Arc<Context>,
        variable_time: bool,
        representation: R,
    ) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        Poly::try_convert_from(v.as_slice(), ctx, variable_time, representation)
    }
}

impl<'a, const N: usize> TryConvertFrom<&'a [BigUint; N]> for Poly {
    fn try_convert_from<R>(
        v: &'a [BigUint; N],
        ctx: &Arc<Context>,
        variable_time: bool,
        representation: R,
    ) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        Poly::try_convert_from(v.as_slice(), ctx, variable_time, representation)
    }
}

impl<'a, const N: usize> TryConvertFrom<&'a [i64; N]> for Poly {
    fn try_convert_from<R>(
        v: &'a [i64; N],
        ctx: &Arc<Context>,
        variable_time: bool,
        representation: R,
    ) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        Poly::try_convert_from(v.as_slice(), ctx, variable_time, representation)
    }
}

impl From<&Poly> for Vec<u64> {
    fn from(p: &Poly) -> Self {
        p.coefficients.as_slice().unwrap().to_vec()
    }
}

impl From<&Poly> for Vec<BigUint> {
    fn from(p: &Poly) -> Self {
        p.coefficients
            .axis_iter(Axis(1))
            .map(|rests| p.ctx.rns.lift(rests))
            .collect_vec()
    }
}
