//! Shared utilities: dense bit sets, DOT escaping and graph abstractions.

mod bitset;
mod dot;
pub mod graph;

pub use bitset::{BitSet, BitSetIter};
pub use dot::escape_dot;
