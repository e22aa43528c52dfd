//! Compiler infrastructure for control-flow graph optimization.
//!
//! This module provides the optimization layer on top of [`crate::analysis`]:
//!
//! - [`crate::analysis`] - graph model, dataflow, dominators, loops
//! - [`compiler`](self) - passes, scheduling, change tracking
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Compiler Pipeline                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  CompilerContext             Shared state                        │
//! │    ├─ Function graphs         (DashMap, one Graph per function)  │
//! │    ├─ OptimizerConfig                                            │
//! │    └─ EventLog                                                   │
//! │                                                                  │
//! │  PassScheduler               2-phase execution                   │
//! │    ├─ Phase 1: Transform      (loop unrolling, once)             │
//! │    └─ Phase 2: Cleanup        (dead code elimination, fixpoint)  │
//! │    Functions run in parallel within each pass                    │
//! │                                                                  │
//! │  CfgPass trait               Interface for all passes            │
//! │    ├─ run_on_function()       Per-function transformation        │
//! │    ├─ initialize()            Setup before each round            │
//! │    └─ finalize()              Cleanup after each round           │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use cfgopt::{
//!     compiler::{CompilerContext, EventKind, OptimizerConfig, PassScheduler},
//!     ir::Expr,
//!     Graph,
//! };
//!
//! let mut g = Graph::new();
//! let ret = g.add_return();
//! let x = g.add_var_assign("x", Expr::temp("y"), ret)?;
//! let y = g.add_var_assign("y", Expr::constant(15), x)?;
//! g.add_start(y)?;
//!
//! let ctx = CompilerContext::new();
//! ctx.add_function("main", g);
//!
//! let mut scheduler = PassScheduler::from_config(&OptimizerConfig::default());
//! scheduler.run_pipeline(&ctx)?;
//!
//! assert_eq!(ctx.events.count_of(EventKind::InstructionRemoved), 2);
//! assert_eq!(ctx.function("main").map(|g| g.node_count()), Some(2));
//! # Ok::<(), cfgopt::Error>(())
//! ```

mod config;
mod context;
mod events;
mod pass;
pub mod passes;
mod scheduler;

pub use config::{
    CleanupConfig, OptimizerConfig, UnrollConfig, DEFAULT_CLEANUP_ITERATIONS,
    DEFAULT_MAX_LOOP_BODY, DEFAULT_UNROLL_FACTOR,
};
pub use context::CompilerContext;
pub use events::{Event, EventBuilder, EventKind, EventLog};
pub use pass::CfgPass;
pub use passes::{
    dce_to_fixpoint, eliminate_dead_code, unroll_loop, unroll_loops, DeadCodeEliminationPass,
    LoopUnrollingPass, SkipReason, UnrollOutcome, UnrollReport,
};
pub use scheduler::PassScheduler;
