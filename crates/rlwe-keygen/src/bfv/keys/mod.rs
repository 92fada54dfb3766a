mod galois_key;
mod key_generator;
mod key_switching_key;
mod public_key;
mod relinearization_key;
mod secret_key;

pub use galois_key::GaloisKeys;
pub use key_generator::KeyGenerator;
pub use key_switching_key::KeySwitchingKey;
pub use public_key::PublicKey;
pub use relinearization_key::RelinearizationKey;
pub use secret_key::SecretKey;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// The uniformly random part of an RLWE sample, stored either expanded or as
/// the seed it was expanded from.
///
/// Storing only the seed roughly halves the size of a freshly generated key;
/// the polynomials are recomputed deterministically on access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniformHalf<T> {
    /// The polynomials are stored in full.
    Expanded(T),
    /// Only the seed is stored.
    SeedCompact(<ChaCha8Rng as SeedableRng>::Seed),
}
