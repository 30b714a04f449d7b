//! Various simple utilities.

#![no_std]

extern crate alloc;

use alloc::vec::Vec;

/// Computes `ceil(log_2(n))`.
#[must_use]
pub const fn log2_ceil_usize(n: usize) -> usize {
    (usize::BITS - n.saturating_sub(1).leading_zeros()) as usize
}

/// The smallest power of two that is `>= n`. Returns 1 for `n == 0`.
#[must_use]
pub const fn next_pow2(n: usize) -> usize {
    1 << log2_ceil_usize(n)
}

/// Prime factorization of `n` in ascending order, with multiplicity.
///
/// `0` and `1` have no prime factors.
#[must_use]
pub fn prime_factors(mut n: usize) -> Vec<usize> {
    let mut factors = Vec::new();
    if n < 2 {
        return factors;
    }
    while n % 2 == 0 {
        factors.push(2);
        n /= 2;
    }
    let mut p = 3;
    while p * p <= n {
        while n % p == 0 {
            factors.push(p);
            n /= p;
        }
        p += 2;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

/// Returns true if every prime factor of `n` is contained in `primes`.
#[must_use]
pub fn is_smooth_over(n: usize, primes: &[usize]) -> bool {
    n != 0 && prime_factors(n).iter().all(|p| primes.contains(p))
}

/// Number of elements addressed by a batched, strided layout, counting from the start of the
/// buffer: `offset + (batch - 1) * dist + sum((len_i - 1) * stride_i) + 1`.
///
/// Empty layouts (any zero length or a zero batch) address nothing beyond `offset`.
#[must_use]
pub fn strided_span(
    lengths: &[usize],
    strides: &[usize],
    dist: usize,
    batch: usize,
    offset: usize,
) -> usize {
    if batch == 0 || lengths.iter().any(|&l| l == 0) {
        return offset;
    }
    let last_in_batch: usize = lengths
        .iter()
        .zip(strides)
        .map(|(&len, &stride)| (len - 1) * stride)
        .sum();
    offset + (batch - 1) * dist + last_in_batch + 1
}
