//! Data flow analysis framework trait and direction.
//!
//! This module defines the core abstraction for data flow analyses. Any
//! specific analysis (liveness, dominators) implements the
//! [`DataFlowAnalysis`] trait to work with the solver.
//!
//! # Edge values
//!
//! Facts are stored per edge rather than per node, so a branch can send
//! different values down its true and false edges. For a forward analysis
//! a node's outgoing edges are its successor slots; for a backward analysis
//! they are the positions of its predecessor list. A transfer function
//! returning a single value has it copied onto every outgoing edge.

use crate::{
    analysis::{cfg::Graph, dataflow::lattice::MeetSemiLattice},
    utils::graph::NodeId,
};

/// Direction of data flow analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Information flows forward, from the start node along successor edges.
    ///
    /// Examples: dominators, reaching definitions.
    Forward,

    /// Information flows backward, from exit nodes along predecessor edges.
    ///
    /// Examples: live variables.
    Backward,
}

/// A data flow analysis over a control-flow [`Graph`].
///
/// Implementations provide the lattice, the top element, the boundary value
/// and the transfer function; the [`DataFlowSolver`](crate::analysis::dataflow::DataFlowSolver)
/// iterates to a fixpoint. Termination is the implementation's contract:
/// the lattice must have finite height and the transfer function must be
/// monotone.
///
/// # Example
///
/// ```rust
/// use cfgopt::{
///     analysis::dataflow::{DataFlowAnalysis, DataFlowSolver, Direction, MeetSemiLattice},
///     Graph, NodeId,
/// };
///
/// /// Counts the longest acyclic distance from the start node, saturating at 8.
/// #[derive(Debug, Clone, PartialEq)]
/// struct Depth(u32);
///
/// impl MeetSemiLattice for Depth {
///     fn meet(&self, other: &Self) -> Self {
///         Depth(self.0.max(other.0))
///     }
///     fn is_bottom(&self) -> bool {
///         self.0 == 8
///     }
/// }
///
/// struct DepthAnalysis;
///
/// impl DataFlowAnalysis for DepthAnalysis {
///     type Lattice = Depth;
///     const DIRECTION: Direction = Direction::Forward;
///
///     fn top(&self, _graph: &Graph) -> Depth {
///         Depth(0)
///     }
///
///     fn transfer(&self, _graph: &Graph, _node: NodeId, input: &Depth) -> Vec<Depth> {
///         vec![Depth((input.0 + 1).min(8))]
///     }
/// }
///
/// let mut graph = Graph::new();
/// let ret = graph.add_return();
/// let start = graph.add_start(ret)?;
///
/// let results = DataFlowSolver::new(DepthAnalysis).solve(&graph)?;
/// assert_eq!(results.output(start), Some(&Depth(1)));
/// assert_eq!(results.output(ret), Some(&Depth(2)));
/// # Ok::<(), cfgopt::Error>(())
/// ```
pub trait DataFlowAnalysis {
    /// The lattice type for this analysis.
    type Lattice: MeetSemiLattice;

    /// The direction of this analysis.
    const DIRECTION: Direction;

    /// Returns the top element, the identity of meet.
    ///
    /// Every edge value starts at top, and a node without incoming edges
    /// (in the analysis direction) receives top as input.
    fn top(&self, graph: &Graph) -> Self::Lattice;

    /// Returns the value that enters the graph at its boundary.
    ///
    /// For forward analyses this is the input of the start node; for backward
    /// analyses the input of every exit node (a node with no successors).
    /// `None`, the default, treats boundary nodes like any other node.
    fn boundary(&self, _graph: &Graph) -> Option<Self::Lattice> {
        None
    }

    /// Computes the values leaving `node` given the value entering it.
    ///
    /// Returns either one value per outgoing edge, in edge order, or a single
    /// value that applies to every outgoing edge.
    fn transfer(&self, graph: &Graph, node: NodeId, input: &Self::Lattice) -> Vec<Self::Lattice>;
}

/// Results of a data flow analysis.
///
/// Values are indexed by arena slot. Nodes that were not reached from the
/// start node have no values.
#[derive(Debug, Clone)]
pub struct AnalysisResults<L> {
    pub(crate) inputs: Vec<Option<L>>,
    pub(crate) outputs: Vec<Option<L>>,
    pub(crate) edges: Vec<Vec<L>>,
    pub(crate) iterations: usize,
}

impl<L> AnalysisResults<L> {
    /// Returns the value entering `node` in the analysis direction.
    ///
    /// For a backward analysis this is the fact at the node's exit.
    #[must_use]
    pub fn input(&self, node: NodeId) -> Option<&L> {
        self.inputs.get(node.index()).and_then(Option::as_ref)
    }

    /// Returns the value leaving `node` in the analysis direction.
    ///
    /// When the transfer function produced several values, this is the one
    /// for the first outgoing edge.
    #[must_use]
    pub fn output(&self, node: NodeId) -> Option<&L> {
        self.outputs.get(node.index()).and_then(Option::as_ref)
    }

    /// Returns the value stored on outgoing edge `position` of `node`.
    #[must_use]
    pub fn edge_value(&self, node: NodeId, position: usize) -> Option<&L> {
        self.edges.get(node.index()).and_then(|e| e.get(position))
    }

    /// Returns `true` if the solver computed values for `node`.
    #[must_use]
    pub fn is_reached(&self, node: NodeId) -> bool {
        self.input(node).is_some()
    }

    /// Number of node visits the solver performed before reaching the fixpoint.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }
}
