#![warn(missing_docs, unused_imports)]

//! Key generation for the Brakerski-Fan-Vercauteren homomorphic encryption
//! scheme

mod galois;
mod keys;
mod parameters;

pub use galois::GaloisTool;
pub use keys::{
    GaloisKeys, KeyGenerator, KeySwitchingKey, PublicKey, RelinearizationKey, SecretKey,
    UniformHalf,
};
pub use parameters::{BfvParameters, BfvParametersBuilder};
