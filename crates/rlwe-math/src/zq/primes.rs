//! Prime generation compatible with the NFLlib optimized parameter sets.

use num_bigint::BigUint;
use rlwe_util::is_prime;

/// Returns whether optimized multiplication and reduction are available for
/// the modulus `p`, i.e. whether `p` verifies Equation (1) of
/// <https://hal.archives-ouvertes.fr/hal-01242273/document>.
pub fn supports_opt(p: u64) -> bool {
    let s0 = p.leading_zeros() as usize;
    if s0 == 0 {
        return false;
    }

    // Scaled to integers, the test accepts exactly when
    //    (2^(3 s0) + 1) * 2^64 < 2^(3 s0) * (2^s0 + 1) * p.
    let pow3 = BigUint::from(1u64) << (3 * s0);
    let lhs = (&pow3 + 1u64) << 64;
    let rhs = pow3 * ((1u64 << s0) + 1) * p;

    lhs < rhs
}

/// Finds the largest prime of `num_bits` bits that is congruent to 1 modulo
/// `modulo` and strictly smaller than `upper_bound`.
///
/// `num_bits` must belong to (10..=62), and `upper_bound` must be at most
/// `1 << num_bits`.
pub fn generate_prime(num_bits: usize, modulo: u64, upper_bound: u64) -> Option<u64> {
    if !(10..=62).contains(&num_bits) {
        return None;
    }
    debug_assert!(
        upper_bound <= (1u64 << num_bits),
        "upper_bound exceeds the bit size"
    );

    let leading_zeros = (64 - num_bits) as u32;

    // Walk down to the largest candidate below upper_bound congruent to 1
    // modulo `modulo`, then step down by `modulo` until a prime shows up.
    let mut candidate = upper_bound - 1;
    while candidate % modulo != 1 && candidate.leading_zeros() == leading_zeros {
        candidate -= 1;
    }
    while candidate.leading_zeros() == leading_zeros && !is_prime(candidate) && candidate >= modulo
    {
        candidate -= modulo;
    }

    if candidate.leading_zeros() == leading_zeros && is_prime(candidate) {
        Some(candidate)
    } else {
        None
    }
}
