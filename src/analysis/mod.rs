//! Program analysis infrastructure.
//!
//! This module provides the graph model and the analyses the optimization
//! passes in [`crate::compiler`] are driven by. It builds upon the generic
//! graph traits and traversals in [`crate::utils::graph`].
//!
//! # Architecture
//!
//! - [`cfg`] - Control flow graph arena, node kinds, loop detection
//! - [`dataflow`] - Generic worklist solver, liveness, dominators
//!
//! # Usage
//!
//! ```rust
//! use cfgopt::{analysis::dataflow::Dominators, ir::Expr, Graph};
//!
//! let mut g = Graph::new();
//! let ret = g.add_return();
//! let a = g.add_var_assign("a", Expr::constant(1), ret)?;
//! let start = g.add_start(a)?;
//!
//! let dominators = Dominators::compute(&g)?;
//! assert!(dominators.dominates(start, ret));
//! # Ok::<(), cfgopt::Error>(())
//! ```

pub mod cfg;
pub mod dataflow;

// Re-export primary types at module level
pub use cfg::{CfgNode, Graph, LoopForest, NaturalLoop, NodeKind};
pub use dataflow::{DataFlowAnalysis, DataFlowSolver, Dominators, LiveVariables};
