use core::fmt;

use serde::{Deserialize, Serialize};

/// Floating point precision of a transform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Half,
    Single,
    Double,
}

impl Precision {
    pub const ALL: [Self; 3] = [Self::Half, Self::Single, Self::Double];
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Half => write!(f, "half"),
            Self::Single => write!(f, "single"),
            Self::Double => write!(f, "double"),
        }
    }
}

/// One value per precision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerPrecision<T> {
    pub half: T,
    pub single: T,
    pub double: T,
}

impl<T> PerPrecision<T> {
    pub const fn get(&self, precision: Precision) -> &T {
        match precision {
            Precision::Half => &self.half,
            Precision::Single => &self.single,
            Precision::Double => &self.double,
        }
    }
}

impl<T: Clone> PerPrecision<T> {
    pub fn splat(value: T) -> Self {
        Self {
            half: value.clone(),
            single: value.clone(),
            double: value,
        }
    }
}
