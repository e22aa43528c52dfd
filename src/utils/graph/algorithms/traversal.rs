//! Graph traversal algorithms.
//!
//! - [`dfs`] - Iterative depth-first search (pre-order)
//! - [`postorder`] - Depth-first search with post-order visitation
//! - [`reverse_postorder`] - Reverse post-order (iteration order for forward data flow)
//!
//! All traversals follow successor edges in slot order, so an `If` node's
//! true branch is explored before its false branch. Vacant arena slots and
//! ids outside the arena are never visited.

use crate::utils::{
    graph::{NodeId, Successors},
    BitSet,
};

/// Depth-first search iterator over graph nodes.
///
/// Visits each node reachable from the start exactly once, in pre-order.
pub struct DfsIterator<'g, G: Successors> {
    graph: &'g G,
    stack: Vec<NodeId>,
    visited: BitSet,
}

impl<'g, G: Successors> DfsIterator<'g, G> {
    fn new(graph: &'g G, start: NodeId) -> Self {
        let mut visited = BitSet::new(graph.node_bound());
        let mut stack = Vec::new();
        if graph.contains_node(start) {
            visited.insert(start.index());
            stack.push(start);
        }
        DfsIterator {
            graph,
            stack,
            visited,
        }
    }
}

impl<G: Successors> Iterator for DfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;

        // Reverse push so the first successor is visited first
        for &succ in self.graph.successors(node).iter().rev() {
            if self.graph.contains_node(succ) && self.visited.insert(succ.index()) {
                self.stack.push(succ);
            }
        }

        Some(node)
    }
}

/// Returns a depth-first search iterator starting from the given node.
///
/// # Complexity
///
/// - Time: O(V + E)
/// - Space: O(V) for the visited set and stack
///
/// # Examples
///
/// ```rust
/// use cfgopt::{Graph, utils::graph::algorithms::dfs};
///
/// let mut graph = Graph::new();
/// let ret = graph.add_return();
/// let start = graph.add_start(ret)?;
///
/// let order: Vec<_> = dfs(&graph, start).collect();
/// assert_eq!(order, vec![start, ret]);
/// # Ok::<(), cfgopt::Error>(())
/// ```
pub fn dfs<G: Successors>(graph: &G, start: NodeId) -> DfsIterator<'_, G> {
    DfsIterator::new(graph, start)
}

/// Computes the post-order of all nodes reachable from `start`.
///
/// A node is emitted after all of its successors that were first discovered
/// through it. Back edges are ignored, so cyclic graphs are handled.
#[must_use]
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    if !graph.contains_node(start) {
        return Vec::new();
    }

    let mut visited = BitSet::new(graph.node_bound());
    let mut result = Vec::new();
    // Each frame holds the node and the index of the next successor to explore
    let mut stack: Vec<(NodeId, usize)> = vec![(start, 0)];
    visited.insert(start.index());

    while let Some(frame) = stack.last_mut() {
        let (node, next) = *frame;
        let succs = graph.successors(node);
        if let Some(&succ) = succs.get(next) {
            frame.1 += 1;
            if graph.contains_node(succ) && visited.insert(succ.index()) {
                stack.push((succ, 0));
            }
        } else {
            result.push(node);
            stack.pop();
        }
    }

    result
}

/// Computes the reverse postorder of all nodes reachable from `start`.
///
/// In an acyclic region every node comes before its successors, which makes
/// this the preferred seeding order for forward data flow.
#[must_use]
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut result = postorder(graph, start);
    result.reverse();
    result
}
