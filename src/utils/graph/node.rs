//! Node identifier for arena-backed graphs.
//!
//! This module provides the [`NodeId`] type, a strongly-typed index into a
//! graph's node arena. The newtype prevents node indices from being mixed up
//! with variable indices or counters, which matters in dataflow code where
//! both kinds of index are used to address bit sets.

use std::fmt;

/// A strongly-typed identifier for a node stored in a graph arena.
///
/// `NodeId` wraps the arena slot index. Slots are assigned sequentially as
/// nodes are added and are never reused while the graph lives, so an id
/// stays stable across every rewrite: removing a node leaves its slot
/// vacant rather than shifting the ids of later nodes.
///
/// # Usage
///
/// Node IDs are handed out by the `Graph::add_*` builders and should not
/// typically be constructed manually. They are used to:
///
/// - Reference successors and predecessors
/// - Address per-node dataflow results
/// - Key clone maps and other pass-owned memo tables
///
/// # Examples
///
/// ```rust
/// use cfgopt::{Graph, NodeId};
/// use std::collections::HashMap;
///
/// let mut graph = Graph::new();
/// let ret = graph.add_return();
/// let stub = graph.add_stub();
/// assert_ne!(ret, stub);
///
/// let mut labels: HashMap<NodeId, &str> = HashMap::new();
/// labels.insert(ret, "exit");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a new `NodeId` from a raw slot index.
    ///
    /// This constructor is primarily intended for internal use and testing.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw slot index, usable to address per-node vectors and bit sets.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeId> for usize {
    #[inline]
    fn from(node: NodeId) -> Self {
        node.0
    }
}
