//! Graph algorithms for program analysis.
//!
//! # Available Algorithms
//!
//! ## Traversal
//!
//! - [`dfs`] - Depth-first search traversal
//! - [`postorder`] - Postorder traversal
//! - [`reverse_postorder`] - Reverse postorder traversal (useful for data flow)
//!
//! Dominators are not computed here: they are a dataflow instance, see
//! [`crate::analysis::dataflow::DominatorAnalysis`].

mod traversal;

pub use traversal::{dfs, postorder, reverse_postorder, DfsIterator};
