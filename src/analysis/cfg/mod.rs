//! Control Flow Graph (CFG) representation and structural analysis.
//!
//! A function body is a [`Graph`] of [`CfgNode`]s stored in an arena. Edges
//! are embedded in the nodes: each node owns its ordered successor list and
//! the set of its predecessors, and every mutation keeps the two in sync.
//!
//! # Key Components
//!
//! - [`Graph`] - The arena, its builders and its rewiring primitives
//! - [`NodeKind`] - The closed set of node kinds with their payloads
//! - [`detect_loops`] - Natural loop recovery from dominator sets
//! - [`find_induction_variables`] - Basic induction variables of a loop body
//!
//! # Examples
//!
//! ## Building a graph
//!
//! ```rust
//! use cfgopt::{ir::{CallStmt, Expr}, Graph};
//!
//! // x = 30; println(x); return
//! let mut g = Graph::new();
//! let ret = g.add_return();
//! let print = g.add_call(CallStmt::new("println", vec![Expr::temp("x")]), ret)?;
//! let x = g.add_var_assign("x", Expr::constant(30), print)?;
//! let start = g.add_start(x)?;
//!
//! assert_eq!(g.successors(start), &[x]);
//! assert_eq!(g.node_count(), 4);
//! g.verify()?;
//! # Ok::<(), cfgopt::Error>(())
//! ```
//!
//! ## Finding loops
//!
//! ```rust
//! use cfgopt::{analysis::{cfg::detect_loops, dataflow::Dominators}, Graph};
//!
//! let mut g = Graph::new();
//! let spin = g.add_self_loop();
//! g.add_start(spin)?;
//!
//! let forest = detect_loops(&g, &Dominators::compute(&g)?);
//! assert_eq!(forest.len(), 1);
//! # Ok::<(), cfgopt::Error>(())
//! ```

mod dot;
mod graph;
mod loops;
mod node;

pub use graph::Graph;
pub use loops::{
    back_edge_sources, detect_loops, find_induction_variables, has_back_edges, loop_body,
    InductionUpdateKind, InductionVar, LoopExit, LoopForest, NaturalLoop,
};
pub use node::{BlockStmt, CfgNode, NodeKind};
