/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use rand::Rng;

/// Returns true if `x` is prime.
///
/// Trial division by 2, 3 and numbers of the form 6*k* ± 1, which is more
/// than enough for the small values (thread counts) we use it on.
pub fn is_prime(x: usize) -> bool {
    if x <= 3 {
        return x > 1;
    }
    if x % 2 == 0 || x % 3 == 0 {
        return false;
    }
    let mut i = 5;
    while i * i <= x {
        if x % i == 0 || x % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Returns a random prime in the interval [`begin` . . `end`], or `None` if
/// none was found after 128 attempts.
pub fn random_prime(begin: usize, end: usize, rng: &mut impl Rng) -> Option<usize> {
    if begin > end {
        return None;
    }
    (0..128)
        .map(|_| rng.random_range(begin..=end))
        .find(|&x| is_prime(x))
}

/// Returns a random stride for a walk over `n` slots.
///
/// The stride is a random prime in (*n* . . 2*n* + 1], so it is coprime with
/// *n*, and the walk *i* ↦ (*start* + *i* · *stride*) mod *n* visits each
/// slot exactly once in *n* steps. By Bertrand's postulate such a prime
/// always exists; if the random search fails we fall back to 1.
pub fn random_stride(n: usize, rng: &mut impl Rng) -> usize {
    random_prime(n + 1, 2 * n + 1, rng).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn test_is_prime() {
        let primes: Vec<usize> = (0..50).filter(|&x| is_prime(x)).collect();
        assert_eq!(
            primes,
            vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47]
        );
        assert!(is_prime(7919));
        assert!(!is_prime(7917));
    }

    #[test]
    fn test_random_stride_visits_all() {
        let mut rng = SmallRng::seed_from_u64(0);
        for n in 1..40 {
            for _ in 0..10 {
                let stride = random_stride(n, &mut rng);
                let start = rng.random_range(0..n);
                let mut seen = vec![false; n];
                for i in 0..n {
                    let slot = (start + i * stride) % n;
                    assert!(!seen[slot], "n={n} stride={stride}");
                    seen[slot] = true;
                }
            }
        }
    }
}
