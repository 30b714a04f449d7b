use alloc::vec::Vec;

use gfp_util::{is_smooth_over, prime_factors};
use itertools::Itertools;
use tracing::debug;

use crate::{CatalogConfig, CatalogError, Precision};

/// The flavours of FFT kernel a factorization can be requested for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum KernelKind {
    /// A full transform of the requested length in one kernel.
    Stockham,
    /// Column transforms of a two-kernel decomposition.
    StockhamBlockCc,
    /// Row transforms (with transposed output) of a two-kernel decomposition.
    StockhamBlockRc,
}

/// Read-only view of the kernels the hardware provides.
pub trait KernelCatalog {
    /// Largest transform length runnable as a single kernel at this precision.
    fn largest_length(&self, precision: Precision) -> usize;

    /// Whether `length` is runnable as a single kernel at this precision.
    fn single_kernel_supported(&self, precision: Precision, length: usize) -> bool;

    /// Radix factorization of the kernel for `length`, or `None` if no such kernel exists.
    fn kernel_factors(
        &self,
        length: usize,
        precision: Precision,
        kind: KernelKind,
    ) -> Option<Vec<usize>>;

    /// Splits `length` into `(a, b)`, `a * b == length`, both runnable as single kernels.
    ///
    /// The largest such `a` is returned so the column pass carries the bigger factor.
    fn two_kernel_split(&self, precision: Precision, length: usize) -> Option<(usize, usize)> {
        let largest = self.largest_length(precision).min(length);
        (2..=largest).rev().find_map(|a| {
            (length % a == 0
                && self.single_kernel_supported(precision, a)
                && self.single_kernel_supported(precision, length / a))
                .then_some((a, length / a))
        })
    }

    /// Whether the generic planner can realize `length`, which must not be a power of two,
    /// without falling back to Bluestein.
    fn non_pow2_length_supported(&self, precision: Precision, length: usize) -> bool {
        !length.is_power_of_two()
            && (self.single_kernel_supported(precision, length)
                || self.two_kernel_split(precision, length).is_some())
    }
}

/// Table-free catalog derived from a [`CatalogConfig`]: a length is supported when it fits the
/// precision's largest single-kernel length and factors completely into the configured radices.
#[derive(Clone, Debug)]
pub struct FunctionPool {
    config: CatalogConfig,
    /// Radices sorted descending; the greedy factorization takes the biggest first.
    radices_desc: Vec<usize>,
    /// Primes appearing in any radix.
    primes: Vec<usize>,
}

impl FunctionPool {
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: CatalogConfig) -> Self {
        let radices_desc = config
            .radices
            .iter()
            .copied()
            .sorted_unstable_by(|a, b| b.cmp(a))
            .dedup()
            .collect_vec();
        let primes = radices_desc
            .iter()
            .flat_map(|&r| prime_factors(r))
            .sorted_unstable()
            .dedup()
            .collect_vec();
        debug!(?radices_desc, ?primes, "function pool created");
        Self {
            config,
            radices_desc,
            primes,
        }
    }

    fn greedy_factors(&self, mut length: usize) -> Option<Vec<usize>> {
        let mut factors = Vec::new();
        while length > 1 {
            let radix = *self.radices_desc.iter().find(|&&r| length % r == 0)?;
            factors.push(radix);
            length /= radix;
        }
        Some(factors)
    }
}

impl Default for FunctionPool {
    fn default() -> Self {
        Self::from_valid(CatalogConfig::default())
    }
}

impl KernelCatalog for FunctionPool {
    fn largest_length(&self, precision: Precision) -> usize {
        *self.config.largest_length.get(precision)
    }

    fn single_kernel_supported(&self, precision: Precision, length: usize) -> bool {
        length >= 2
            && length <= self.largest_length(precision)
            && self.greedy_factors(length).is_some()
    }

    fn kernel_factors(
        &self,
        length: usize,
        precision: Precision,
        _kind: KernelKind,
    ) -> Option<Vec<usize>> {
        if !self.single_kernel_supported(precision, length) {
            return None;
        }
        self.greedy_factors(length)
    }

    fn non_pow2_length_supported(&self, precision: Precision, length: usize) -> bool {
        // Most candidates are not smooth; reject those before searching for a split.
        !length.is_power_of_two()
            && is_smooth_over(length, &self.primes)
            && (self.single_kernel_supported(precision, length)
                || self.two_kernel_split(precision, length).is_some())
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::PerPrecision;

    #[test]
    fn default_pool_sorts_radices_and_collects_primes() {
        let pool = FunctionPool::default();
        assert_eq!(pool.radices_desc, vec![17, 16, 13, 11, 10, 8, 7, 6, 5, 4, 3, 2]);
        assert_eq!(pool.primes, vec![2, 3, 5, 7, 11, 13, 17]);
        assert!(FunctionPool::new(CatalogConfig::default()).is_ok());
    }

    #[test]
    fn single_kernel_lengths() {
        let pool = FunctionPool::default();
        assert!(pool.single_kernel_supported(Precision::Single, 17));
        assert!(pool.single_kernel_supported(Precision::Single, 4096));
        assert!(!pool.single_kernel_supported(Precision::Single, 8192));
        assert!(!pool.single_kernel_supported(Precision::Single, 19));
        assert!(!pool.single_kernel_supported(Precision::Single, 1));
    }

    #[test]
    fn greedy_factorization() {
        let pool = FunctionPool::default();
        let factors = |n| pool.kernel_factors(n, Precision::Double, KernelKind::Stockham);
        assert_eq!(factors(4096), Some(vec![16, 16, 16]));
        assert_eq!(factors(2048), Some(vec![16, 16, 8]));
        assert_eq!(factors(64), Some(vec![16, 4]));
        assert_eq!(factors(4004), Some(vec![13, 11, 7, 4]));
        assert_eq!(factors(23), None);
    }

    #[test]
    fn factors_multiply_back() {
        let pool = FunctionPool::default();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..500 {
            let n = rng.random_range(2..=4096usize);
            if let Some(factors) = pool.kernel_factors(n, Precision::Single, KernelKind::Stockham)
            {
                assert_eq!(factors.iter().product::<usize>(), n);
            }
        }
    }

    #[test]
    fn two_kernel_split_prefers_large_column_factor() {
        let pool = FunctionPool::default();
        assert_eq!(
            pool.two_kernel_split(Precision::Single, 1 << 18),
            Some((4096, 64))
        );
        assert_eq!(
            pool.two_kernel_split(Precision::Single, 200200),
            Some((4004, 50))
        );
        // 4099 is prime.
        assert_eq!(pool.two_kernel_split(Precision::Single, 2 * 4099), None);
    }

    #[test]
    fn non_pow2_support() {
        let pool = FunctionPool::default();
        assert!(!pool.non_pow2_length_supported(Precision::Single, 1 << 18));
        assert!(pool.non_pow2_length_supported(Precision::Single, 200200));
        assert!(pool.non_pow2_length_supported(Precision::Single, 33 * 3));
        assert!(!pool.non_pow2_length_supported(Precision::Single, 200005));
    }

    #[test]
    fn largest_length_is_per_precision() {
        let pool = FunctionPool::new(CatalogConfig {
            largest_length: PerPrecision {
                half: 1024,
                single: 4096,
                double: 2048,
            },
            ..Default::default()
        })
        .unwrap();
        assert_eq!(pool.largest_length(Precision::Half), 1024);
        assert!(pool.single_kernel_supported(Precision::Single, 4096));
        assert!(!pool.single_kernel_supported(Precision::Double, 4096));
    }
}
