//! Conversion traits for polynomials.

use super::{Context, Representation};
use crate::Result;
use std::sync::Arc;

/// Fallible conversions into a polynomial.
///
/// `std::convert::TryFrom` cannot carry the extra parameters needed here, and
/// a redefined `TryFrom` would have to be fully qualified at every call site
/// because of the blanket implementation, see
/// <https://github.com/rust-lang/rust/issues/50133#issuecomment-488512355>.
pub trait TryConvertFrom<T>
where
    Self: Sized,
{
    /// Attempt to convert `value` into a polynomial under the given context
    /// and representation. The representation can be left unspecified when
    /// the source carries it unambiguously.
    fn try_convert_from<R>(
        value: T,
        ctx: &Arc<Context>,
        variable_time: bool,
        representation: R,
    ) -> Result<Self>
    where
        R: Into<Option<Representation>>;
}
