//! Built-in optimization passes.
//!
//! - [`dce`] - Dead code elimination driven by liveness
//! - [`unroll`] - Unrolling of counted loops
//!
//! Each module also offers free functions for running its transformation
//! directly on a single [`Graph`](crate::Graph) without a scheduler.

pub mod dce;
pub mod unroll;

pub use dce::{dce_to_fixpoint, eliminate_dead_code, DeadCodeEliminationPass};
pub use unroll::{
    unroll_loop, unroll_loops, LoopUnrollingPass, SkipReason, UnrollOutcome, UnrollReport,
};
