// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]

//! # cfgopt
//!
//! The control-flow middle tier of a compiler: a graph model for lowered
//! function bodies, a generic dataflow engine with liveness and dominator
//! analyses, natural loop detection, and two graph-rewriting optimizations
//! (dead code elimination and loop unrolling).
//!
//! ## Features
//!
//! - **Arena graph model** - Stable node ids, node-embedded edges kept bidirectionally consistent
//! - **Generic dataflow** - One worklist solver for forward and backward analyses over any meet semi-lattice
//! - **Dominators and loops** - Dominator sets, back edges, natural loop bodies, induction variables
//! - **Optimizations** - Liveness-driven dead code elimination and counted-loop unrolling
//! - **Parallel driver** - Optimizes many functions at once with change tracking
//!
//! ## Quick Start
//!
//! ### Using the Prelude
//!
//! ```rust
//! use cfgopt::prelude::*;
//!
//! // start -> y = 15 -> x = y -> return
//! let mut graph = Graph::new();
//! let ret = graph.add_return();
//! let x = graph.add_var_assign("x", Expr::temp("y"), ret)?;
//! let y = graph.add_var_assign("y", Expr::constant(15), x)?;
//! let start = graph.add_start(y)?;
//!
//! // Each round computes liveness once, so `y = 15` only dies in the second.
//! assert_eq!(eliminate_dead_code(&mut graph)?, 1);
//! assert_eq!(eliminate_dead_code(&mut graph)?, 1);
//! assert_eq!(graph.successors(start), &[ret]);
//! # Ok::<(), cfgopt::Error>(())
//! ```
//!
//! ### Optimizing Many Functions
//!
//! ```rust
//! use cfgopt::prelude::*;
//!
//! let ctx = CompilerContext::new();
//! for name in ["main", "helper"] {
//!     let mut graph = Graph::new();
//!     let ret = graph.add_return();
//!     let dead = graph.add_var_assign("t", Expr::constant(1), ret)?;
//!     graph.add_start(dead)?;
//!     ctx.add_function(name, graph);
//! }
//!
//! PassScheduler::from_config(&OptimizerConfig::default()).run_pipeline(&ctx)?;
//! assert_eq!(ctx.events.count_of(EventKind::InstructionRemoved), 2);
//! # Ok::<(), cfgopt::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`ir`] - Expressions and call statements carried by graph nodes
//! - [`analysis`] - Graph model, dataflow framework, dominators and loops
//! - [`compiler`] - Optimization passes, scheduling and change tracking
//! - [`utils`] - Bit sets, graph traits and traversals
//! - [`Error`] and [`Result`] - Structural error reporting
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result`]. Errors describe structural
//! problems such as redirecting an edge that does not exist or removing the
//! start node; they indicate a bug in the caller rather than input that
//! could not be optimized. A loop that cannot be unrolled is simply skipped.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use cfgopt::prelude::*;
///
/// let mut graph = Graph::new();
/// let ret = graph.add_return();
/// graph.add_start(ret)?;
/// graph.verify()?;
/// # Ok::<(), cfgopt::Error>(())
/// ```
pub mod prelude;

/// Lowered IR payloads: expressions, binary operators and calls.
pub mod ir;

/// Program analysis: the control-flow graph and the analyses over it.
///
/// # Key Components
///
/// - [`analysis::Graph`] - The control-flow graph arena
/// - [`analysis::dataflow::DataFlowSolver`] - Generic worklist solver
/// - [`analysis::dataflow::Dominators`] - Dominator sets
/// - [`analysis::cfg::detect_loops`] - Natural loop detection
pub mod analysis;

/// Optimization passes and the infrastructure that runs them.
pub mod compiler;

/// Shared utilities used across the crate.
pub mod utils;

/// `cfgopt` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `cfgopt` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust
/// use cfgopt::{Error, Graph};
///
/// let mut graph = Graph::new();
/// let a = graph.add_return();
/// let b = graph.add_return();
/// let start = graph.add_start(a)?;
///
/// match graph.replace_successor(start, b, a) {
///     Err(Error::NotASuccessor { node, target }) => println!("{target} is not after {node}"),
///     Err(e) => println!("Error: {e}"),
///     Ok(()) => println!("redirected"),
/// }
/// # Ok::<(), cfgopt::Error>(())
/// ```
pub use error::Error;

/// The control-flow graph of one function body.
///
/// See [`analysis::cfg::Graph`] for construction and rewiring.
pub use analysis::cfg::{CfgNode, Graph, NodeKind};

/// Stable identifier of a node within a [`Graph`].
pub use utils::graph::NodeId;
