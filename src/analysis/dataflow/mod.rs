//! Data flow analysis framework for control-flow graphs.
//!
//! This module provides a generic framework for computing properties that
//! propagate along control flow edges. It supports both forward and backward
//! analyses using a worklist-based solver.
//!
//! # Architecture
//!
//! The framework is built around three core abstractions:
//!
//! - **Lattice**: Defines the domain of abstract values with a meet operation
//! - **Analysis**: Specifies top, boundary and transfer functions
//! - **Solver**: Iteratively computes fixpoints using a worklist algorithm
//!
//! # Analyses Provided
//!
//! - [`LiveVariables`]: Determines which variables are live at each node
//! - [`DominatorAnalysis`] / [`Dominators`]: Computes the dominator set of each node
//!
//! # Example
//!
//! ```rust
//! use cfgopt::{analysis::dataflow::LiveVariables, ir::Expr, Graph};
//!
//! let mut graph = Graph::new();
//! let ret = graph.add_return();
//! let rv = graph.add_var_assign("_RV0", Expr::temp("a"), ret)?;
//! let start = graph.add_start(rv)?;
//!
//! let liveness = LiveVariables::new(&graph).analyze(&graph)?;
//! assert_eq!(liveness.live_out_names(start), vec!["a"]);
//! # Ok::<(), cfgopt::Error>(())
//! ```

mod dominators;
mod framework;
mod lattice;
mod liveness;
mod solver;

pub use dominators::{DominatorAnalysis, Dominators};
pub use framework::{AnalysisResults, DataFlowAnalysis, Direction};
pub use lattice::{MeetSemiLattice, NodeSet, VarSet};
pub use liveness::{LiveVariables, LivenessResult};
pub use solver::DataFlowSolver;
