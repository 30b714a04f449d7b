use gfp_catalog::Precision;
use thiserror::Error;

use crate::ComputeScheme;

/// Errors raised while constructing a plan.
///
/// `UnexpectedBluesteinShape` and `UnexpectedShape` signal a defect in tree construction and
/// abort planning. `NoValidAssignment` means the transform is well formed but cannot be realized
/// with the available buffers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("unexpected bluestein plan shape: {children} children, expected 3 or 6")]
    UnexpectedBluesteinShape { children: usize },

    #[error("unexpected {scheme} plan shape: {children} children")]
    UnexpectedShape {
        scheme: ComputeScheme,
        children: usize,
    },

    #[error("the catalog has no {precision} precision kernel of length {length}")]
    MissingKernel { length: usize, precision: Precision },

    #[error("length {length} cannot be planned at {precision} precision")]
    UnsupportedLength { length: usize, precision: Precision },

    #[error("invalid transform description: {0}")]
    InvalidDescription(&'static str),

    #[error("this transform configuration cannot be planned: no valid buffer assignment")]
    NoValidAssignment,
}

/// Result type alias for plan construction.
pub type PlanResult<T> = core::result::Result<T, PlanError>;
