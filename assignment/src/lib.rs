//! Chooses the buffer and array type every kernel of an [`ExecPlan`](gfp_plan::ExecPlan) reads
//! and writes.
//!
//! The search walks the plan's kernels in execution order and grows a tree of
//! [`PlacementTrace`]s, one branch per legal `(buffer, array type)` choice. Complete paths are
//! ranked by kernel fusions, then by the number of buffers they touch.

#![no_std]

extern crate alloc;

mod config;
mod pipeline;
mod policy;
mod trace;

pub use config::*;
pub use pipeline::*;
pub use policy::*;
pub use trace::*;
