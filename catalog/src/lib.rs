//! The kernel capability catalog consulted while building FFT plans.
//!
//! The catalog answers which transform lengths a precision can run as a single kernel, which
//! non-power-of-two lengths the generic planner can realize, and which radix factorization a
//! kernel uses.

#![no_std]

extern crate alloc;

mod config;
mod pool;
mod precision;

pub use config::*;
pub use pool::*;
pub use precision::*;
