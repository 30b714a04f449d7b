//! Execution trees for GPU Fourier transform plans.
//!
//! A plan is built as a tree of [`TreeNode`]s stored in an [`ExecTree`] arena. Composite nodes
//! (Bluestein, two-kernel large 1D, real-via-complex) expand into children; leaves are single
//! kernels. After the tree is built, strides, distances and offsets are propagated from the root
//! down so every kernel reads exactly what its predecessor wrote.

#![no_std]

extern crate alloc;

mod bluestein;
mod error;
mod factory;
mod large_1d;
mod node;
mod plan;
mod real;
mod scheme;
mod tree;
mod types;

pub use bluestein::*;
pub use error::*;
pub use factory::*;
pub use large_1d::*;
pub use node::*;
pub use plan::*;
pub use real::*;
pub use scheme::*;
pub use tree::*;
pub use types::*;
