use alloc::vec;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{PerPrecision, Precision};

/// Largest length any precision runs as a single kernel by default.
pub const DEFAULT_LARGEST_LENGTH: usize = 4096;

/// Errors raised while validating a [`CatalogConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The radix set is empty.
    #[error("the catalog needs at least one radix")]
    NoRadices,

    /// Radices must be at least 2.
    #[error("radix {0} is not a valid butterfly size")]
    InvalidRadix(usize),

    /// A single kernel must at least handle length 2.
    #[error("largest single-kernel length {0} is too small")]
    LargestLengthTooSmall(usize),
}

/// Describes what the hardware can run as one kernel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Largest transform length supported as a single kernel, per precision.
    pub largest_length: PerPrecision<usize>,
    /// Butterfly sizes the kernel generator can emit.
    pub radices: Vec<usize>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            largest_length: PerPrecision::splat(DEFAULT_LARGEST_LENGTH),
            radices: vec![2, 3, 4, 5, 6, 7, 8, 10, 11, 13, 16, 17],
        }
    }
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.radices.is_empty() {
            return Err(CatalogError::NoRadices);
        }
        if let Some(&radix) = self.radices.iter().find(|&&r| r < 2) {
            return Err(CatalogError::InvalidRadix(radix));
        }
        for precision in Precision::ALL {
            let len = *self.largest_length.get(precision);
            if len < 2 {
                return Err(CatalogError::LargestLengthTooSmall(len));
            }
        }
        Ok(())
    }
}
