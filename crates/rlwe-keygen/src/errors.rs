use thiserror::Error;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Wraps an error from the underlying mathematical library.
    #[error("{0}")]
    MathError(rlwe_math::Error),

    /// Indicates a parameter error.
    #[error("{0}")]
    ParametersError(ParametersError),

    /// Indicates that the moduli chain is too short for key switching.
    #[error("These parameters do not support key switching")]
    KeySwitchingUnavailable,

    /// Indicates that a Galois element is invalid.
    #[error("Invalid Galois element: {0} is not an odd integer smaller than 2 * degree")]
    InvalidGaloisElement(u64),

    /// Indicates that a rotation step is invalid.
    #[error("Invalid rotation step: {0} has magnitude not smaller than degree / 2")]
    InvalidRotationStep(i64),

    /// Indicates that a secret key does not match the parameters.
    #[error("The secret key is not compatible with the parameters")]
    InvalidSecretKey,

    /// Indicates that too few values were provided.
    #[error("Too few values provided: {0} is below limit {1}")]
    TooFewValues(usize, usize),

    /// Generic error described by a message.
    /// TODO: Replace the remaining uses with typed variants.
    #[error("{0}")]
    DefaultError(String),
}

impl From<rlwe_math::Error> for Error {
    fn from(e: rlwe_math::Error) -> Self {
        Error::MathError(e)
    }
}

/// Separate enum for errors detected while building parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParametersError {
    /// Indicates that the degree is invalid.
    #[error("Invalid degree {0}: expected a power of 2 of at least 8")]
    InvalidDegree(usize),

    /// Indicates that a modulus size is invalid.
    #[error("Invalid modulus size {0}: expected an integer between {1} and {2}")]
    InvalidModulusSize(usize, usize, usize),

    /// Indicates that the variance is invalid.
    #[error("Invalid variance {0}: expected an integer between 1 and 16")]
    InvalidVariance(usize),

    /// Indicates that not enough primes of this size exist.
    #[error("Could not generate enough primes of size {0} for degree {1}")]
    NotEnoughPrimes(usize, usize),

    /// Indicates that the plaintext is invalid.
    #[error("{0}")]
    InvalidPlaintext(String),

    /// Indicates that too many parameters were specified.
    #[error("{0}")]
    TooManySpecified(String),

    /// Indicates that too few parameters were specified.
    #[error("{0}")]
    TooFewSpecified(String),
}

#[cfg(test)]
mod tests {
    use crate::{Error, ParametersError};

    #[test]
    fn error_strings() {
        assert_eq!(
            Error::MathError(rlwe_math::Error::InvalidModulus(1)).to_string(),
            rlwe_math::Error::InvalidModulus(1).to_string()
        );
        assert_eq!(
            Error::ParametersError(ParametersError::InvalidDegree(10)).to_string(),
            ParametersError::InvalidDegree(10).to_string()
        );
        assert_eq!(
            Error::KeySwitchingUnavailable.to_string(),
            "These parameters do not support key switching"
        );
        assert_eq!(
            Error::InvalidGaloisElement(16).to_string(),
            "Invalid Galois element: 16 is not an odd integer smaller than 2 * degree"
        );
        assert_eq!(
            Error::InvalidRotationStep(-8).to_string(),
            "Invalid rotation step: -8 has magnitude not smaller than degree / 2"
        );
        assert_eq!(
            Error::InvalidSecretKey.to_string(),
            "The secret key is not compatible with the parameters"
        );
        assert_eq!(
            Error::TooFewValues(0, 1).to_string(),
            "Too few values provided: 0 is below limit 1"
        );
        assert_eq!(
            Error::DefaultError("test string".to_string()).to_string(),
            "test string"
        );
    }

    #[test]
    fn parameters_error_strings() {
        assert_eq!(
            ParametersError::InvalidDegree(10).to_string(),
            "Invalid degree 10: expected a power of 2 of at least 8"
        );
        assert_eq!(
            ParametersError::InvalidModulusSize(1, 2, 3).to_string(),
            "Invalid modulus size 1: expected an integer between 2 and 3"
        );
        assert_eq!(
            ParametersError::InvalidVariance(17).to_string(),
            "Invalid variance 17: expected an integer between 1 and 16"
        );
        assert_eq!(
            ParametersError::NotEnoughPrimes(1, 2).to_string(),
            "Could not generate enough primes of size 1 for degree 2"
        );
        assert_eq!(
            ParametersError::InvalidPlaintext("test".to_string()).to_string(),
            "test"
        );
        assert_eq!(
            ParametersError::TooManySpecified("test".to_string()).to_string(),
            "test"
        );
        assert_eq!(
            ParametersError::TooFewSpecified("test".to_string()).to_string(),
            "test"
        );
    }
}
