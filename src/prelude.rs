//! # cfgopt Prelude
//!
//! This module re-exports the types needed to build a control-flow graph,
//! run the analyses over it, and optimize it, so that a single glob import
//! covers the common workflow.
//!
//! ```rust
//! use cfgopt::prelude::*;
//!
//! let mut graph = Graph::new();
//! let spin = graph.add_self_loop();
//! graph.add_start(spin)?;
//!
//! let dominators = Dominators::compute(&graph)?;
//! assert_eq!(detect_loops(&graph, &dominators).len(), 1);
//! # Ok::<(), cfgopt::Error>(())
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cfgopt operations
pub use crate::Error;

/// The result type used throughout cfgopt
pub use crate::Result;

// ================================================================================================
// Graph Model
// ================================================================================================

/// The graph arena, its nodes and their ids
pub use crate::{CfgNode, Graph, NodeId, NodeKind};

/// Statements allowed inside a block node
pub use crate::analysis::cfg::BlockStmt;

/// IR payloads carried by nodes
pub use crate::ir::{BinOpKind, CallStmt, Expr};

// ================================================================================================
// Analyses
// ================================================================================================

/// Dataflow framework and the analyses built on it
pub use crate::analysis::dataflow::{
    DataFlowAnalysis, DataFlowSolver, Direction, Dominators, LiveVariables, LivenessResult,
    MeetSemiLattice,
};

/// Loop structure
pub use crate::analysis::cfg::{
    detect_loops, find_induction_variables, InductionVar, LoopForest, NaturalLoop,
};

// ================================================================================================
// Optimization
// ================================================================================================

/// Passes and the free functions behind them
pub use crate::compiler::{
    dce_to_fixpoint, eliminate_dead_code, unroll_loops, CfgPass, DeadCodeEliminationPass,
    LoopUnrollingPass, SkipReason, UnrollOutcome,
};

/// Pipeline driver, configuration and change tracking
pub use crate::compiler::{
    CompilerContext, EventKind, EventLog, OptimizerConfig, PassScheduler, UnrollConfig,
};
