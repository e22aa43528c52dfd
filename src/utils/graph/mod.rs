//! Graph abstractions shared by the analyses.
//!
//! The control-flow graph implements these traits so that generic
//! algorithms (traversals, reachability) can be written once against
//! [`Successors`] and [`Predecessors`] instead of a concrete graph type.

pub mod algorithms;
mod node;

pub use node::NodeId;

/// Basic facts about a graph's node arena.
pub trait GraphBase {
    /// Returns the number of arena slots, including vacant ones.
    ///
    /// Every live [`NodeId`] satisfies `id.index() < node_bound()`, so this is
    /// the size to use for per-node vectors and bit sets.
    fn node_bound(&self) -> usize;

    /// Returns `true` if `node` refers to a live node.
    fn contains_node(&self, node: NodeId) -> bool;
}

/// Graphs that can enumerate a node's successors in edge order.
pub trait Successors: GraphBase {
    /// Returns the successors of `node`; empty if the node does not exist.
    fn successors(&self, node: NodeId) -> &[NodeId];
}

/// Graphs that can enumerate a node's predecessors.
pub trait Predecessors: GraphBase {
    /// Returns the predecessors of `node`; empty if the node does not exist.
    fn predecessors(&self, node: NodeId) -> &[NodeId];
}
