//! Errors of the math crate.

use thiserror::Error;

/// The errors that can arise when manipulating the mathematical objects.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Indicates that a modulus is invalid.
    #[error("Invalid modulus: {0} is not between 2 and 2^62 - 1")]
    InvalidModulus(u64),

    /// Indicates a generic error.
    #[error("{0}")]
    Default(String),
}

/// The Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
