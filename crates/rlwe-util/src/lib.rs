#![crate_name = "rlwe_util"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]
#![doc = include_str!("../README.md")]

use num_bigint_dig::{prime::probably_prime, BigUint, ModInverse};
use num_traits::{cast::ToPrimitive, PrimInt};
use rand::{CryptoRng, RngCore};
use std::{mem::size_of, panic::UnwindSafe};

/// Runs `f` while silencing the panic hook, for tests that expect panics.
pub fn catch_unwind<F, R>(f: F) -> std::thread::Result<R>
where
    F: FnOnce() -> R + UnwindSafe,
{
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let result = std::panic::catch_unwind(f);
    std::panic::set_hook(hook);
    result
}

/// Returns whether `p` is prime.
///
/// With 0 extra rounds, `probably_prime` runs a Baillie-PSW test, which is
/// exact for 64-bit inputs.
pub fn is_prime(p: u64) -> bool {
    probably_prime(&BigUint::from(p), 0)
}

/// Sample independent values from a centered binomial distribution of the
/// given variance.
///
/// The variance must lie in [1, 16].
pub fn sample_vec_cbd<R: RngCore + CryptoRng>(
    vector_size: usize,
    variance: usize,
    rng: &mut R,
) -> Result<Vec<i64>, &'static str> {
    if !(1..=16).contains(&variance) {
        return Err("The variance must be between 1 and 16");
    }

    // Each sample consumes 4 * variance random bits, counting the ones in
    // the low half and subtracting the ones in the high half.
    let bits_per_sample = 4 * variance;
    let mask_pos = ((u64::MAX >> (64 - bits_per_sample)) >> (2 * variance)) as u128;
    let mask_neg = (mask_pos << (2 * variance)) as u128;

    let mut samples = Vec::with_capacity(vector_size);
    let mut pool = 0u128;
    let mut pool_bits = 0;
    for _ in 0..vector_size {
        if pool_bits < bits_per_sample {
            pool |= (rng.next_u64() as u128) << pool_bits;
            pool_bits += 64;
        }
        debug_assert!(pool_bits >= bits_per_sample);
        samples
            .push(((pool & mask_pos).count_ones() as i64) - ((pool & mask_neg).count_ones() as i64));
        pool >>= bits_per_sample;
        pool_bits -= bits_per_sample;
    }

    Ok(samples)
}

/// Computes the inverse of `a` modulo `p`, when it exists.
pub fn inverse(a: u64, p: u64) -> Option<u64> {
    BigUint::from(a).mod_inverse(BigUint::from(p))?.to_u64()
}

/// Returns the largest b such that 2^b <= value.
///
/// Panics when `value` is 0.
pub fn ilog2<T: PrimInt>(value: T) -> usize {
    assert!(value > T::zero());
    // With 2^b <= value < 2^(b + 1), leading_zeros() is 8 * sizeof(T) - (b + 1).
    size_of::<T>() * 8 - 1 - value.leading_zeros() as usize
}

/// Computes the sample variance of a list of values.
///
/// Panics when fewer than two values are given.
pub fn variance<T: PrimInt>(values: &[T]) -> f64 {
    assert!(values.len() > 1);
    let n = values.len() as f64;
    let mean = values.iter().map(|v| v.to_f64().unwrap()).sum::<f64>() / n;
    let squared_deviations = values
        .iter()
        .map(|v| {
            let deviation = v.to_f64().unwrap() - mean;
            deviation * deviation
        })
        .sum::<f64>();
    squared_deviations / (n - 1.0)
}

#[cfg(test)]
mod tests {
    use rand::{thread_rng, RngCore};

    use super::{ilog2, inverse, is_prime, sample_vec_cbd, variance};

    #[test]
    fn prime() {
        for p in [2u64, 3, 5, 7, 1153, 4611686018326724609] {
            assert!(is_prime(p));
        }
        for p in [0u64, 1, 4, 6, 8, 9, 4611686018326724607] {
            assert!(!is_prime(p));
        }
    }

    #[test]
    fn ilog2_bounds() {
        assert_eq!(ilog2(1), 0);
        assert_eq!(ilog2(2), 1);
        assert_eq!(ilog2(3), 1);
        assert_eq!(ilog2(4), 2);
        // The value stays at b on [2^b, 2^(b + 1)).
        for b in 2..=110 {
            assert_eq!(ilog2(1u128 << b), b);
            assert_eq!(ilog2((1u128 << b) + 1), b);
            assert_eq!(ilog2((1u128 << (b + 1)) - 1), b);
        }
    }

    #[test]
    fn sample_cbd() {
        let mut rng = thread_rng();

        assert!(sample_vec_cbd(10, 0, &mut rng).is_err());
        assert!(sample_vec_cbd(10, 17, &mut rng).is_err());

        for var in 1..=16usize {
            for size in 0..=100 {
                assert_eq!(sample_vec_cbd(size, var, &mut rng).unwrap().len(), size);
            }

            // The support is [-2 * var, 2 * var], and over 100000 draws the
            // sample variance rounds to the requested one.
            let v = sample_vec_cbd(100000, var, &mut rng).unwrap();
            let max_magnitude = v.iter().map(|vi| vi.abs()).max().unwrap();
            assert!(max_magnitude <= 2 * var as i64);
            assert_eq!(variance(&v).round(), var as f64);
        }
    }

    #[test]
    fn inv_kats() {
        // Generated in Sage as ZZ(a)^(-1) % p when gcd(a, p) == 1.
        let cases: [(u64, u64, Option<u64>); 18] = [
            (2, 17, Some(9)),
            (7, 17, Some(5)),
            (12, 17, Some(10)),
            (17, 17, None),
            (22, 17, Some(7)),
            (27, 17, Some(12)),
            (2, 97, Some(49)),
            (7, 97, Some(14)),
            (12, 97, Some(89)),
            (17, 97, Some(40)),
            (22, 97, Some(75)),
            (27, 97, Some(18)),
            (2, 1153, Some(577)),
            (7, 1153, Some(659)),
            (12, 1153, Some(1057)),
            (17, 1153, Some(407)),
            (22, 1153, Some(891)),
            (27, 1153, Some(726)),
        ];
        for (a, p, expected) in cases {
            assert_eq!(inverse(a, p), expected);
        }

        assert!(inverse(4, 16).is_none());
        assert!(inverse(10, 30).is_none());
    }

    #[test]
    fn inv_random() {
        let mut rng = thread_rng();
        for p in [17u64, 1153, 4611686018326724609] {
            for _ in 0..100 {
                let a = 1 + rng.next_u64() % (p - 1);
                let inv = inverse(a, p).unwrap();
                assert_eq!(((a as u128) * (inv as u128)) % (p as u128), 1);
            }
        }
    }
}
