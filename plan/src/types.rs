use core::fmt;
use core::ops::Neg;

use serde::{Deserialize, Serialize};

/// Sign of the exponent of a transform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Inverse,
}

impl Neg for Direction {
    type Output = Self;

    fn neg(self) -> Self {
        match self {
            Self::Forward => Self::Inverse,
            Self::Inverse => Self::Forward,
        }
    }
}

/// The kind of transform requested by the user.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformType {
    ComplexForward,
    ComplexInverse,
    RealForward,
    RealInverse,
}

impl TransformType {
    pub const fn direction(self) -> Direction {
        match self {
            Self::ComplexForward | Self::RealForward => Direction::Forward,
            Self::ComplexInverse | Self::RealInverse => Direction::Inverse,
        }
    }

    pub const fn is_real(self) -> bool {
        matches!(self, Self::RealForward | Self::RealInverse)
    }
}

/// Whether the transform overwrites its input.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    InPlace,
    #[default]
    NotInPlace,
}

/// A physical memory region a kernel can read from or write to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum OperatingBuffer {
    #[default]
    Uninit,
    UserIn,
    UserOut,
    /// General purpose scratch.
    Temp,
    /// Full-length complex scratch for real transforms computed with a complex FFT.
    TempCmplxForReal,
    /// Chirp and convolution workspace of the Bluestein algorithm.
    TempBluestein,
}

impl fmt::Display for OperatingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninit => "UNINIT",
            Self::UserIn => "USER_IN",
            Self::UserOut => "USER_OUT",
            Self::Temp => "TEMP",
            Self::TempCmplxForReal => "TEMP_CMPLX_FOR_REAL",
            Self::TempBluestein => "TEMP_BLUESTEIN",
        };
        f.write_str(name)
    }
}

/// Packing of elements in a buffer.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ArrayType {
    #[default]
    Unset,
    ComplexInterleaved,
    ComplexPlanar,
    Real,
    HermitianInterleaved,
    HermitianPlanar,
}

impl ArrayType {
    pub const fn is_complex(self) -> bool {
        matches!(self, Self::ComplexInterleaved | Self::ComplexPlanar)
    }

    pub const fn is_hermitian(self) -> bool {
        matches!(self, Self::HermitianInterleaved | Self::HermitianPlanar)
    }

    /// Real scalars stored per element.
    pub const fn scalars_per_element(self) -> usize {
        match self {
            Self::Real => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for ArrayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unset => "unset",
            Self::ComplexInterleaved => "CI",
            Self::ComplexPlanar => "CP",
            Self::Real => "R",
            Self::HermitianInterleaved => "HI",
            Self::HermitianPlanar => "HP",
        };
        f.write_str(name)
    }
}
