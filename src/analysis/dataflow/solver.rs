//! Worklist-based data flow solver.
//!
//! This module provides the iterative solver that computes fixpoints for
//! data flow analyses.
//!
//! # Algorithm
//!
//! 1. Compute the set of nodes reachable from the start node; only these
//!    take part, and edges leaving unreachable nodes are ignored
//! 2. Initialize every outgoing edge value to top
//! 3. Add all reachable nodes to the worklist, in reverse postorder for
//!    forward analyses and postorder for backward ones
//! 4. While the worklist is non-empty:
//!    a. Remove a node from the worklist
//!    b. Compute its input by meeting the values stored on its incoming edges
//!       (or use the boundary value at the start node or an exit)
//!    c. Apply the transfer function to get one value per outgoing edge
//!    d. For each outgoing edge whose value changed, store it and push the
//!       node at the other end of the edge
//!
//! # Complexity
//!
//! For most analyses on reducible graphs the solver converges in a few passes
//! over the nodes. The total work is O(n * h) node visits where h is the
//! lattice height.

use std::collections::VecDeque;

use tracing::trace;

use crate::{
    analysis::{
        cfg::Graph,
        dataflow::{
            framework::{AnalysisResults, DataFlowAnalysis, Direction},
            lattice::MeetSemiLattice,
        },
    },
    utils::{
        graph::{
            algorithms::{postorder, reverse_postorder},
            NodeId,
        },
        BitSet,
    },
    Result,
};

/// Worklist-based data flow solver.
///
/// # Usage
///
/// ```rust
/// use cfgopt::{analysis::dataflow::{DataFlowSolver, DominatorAnalysis}, Graph};
///
/// let mut graph = Graph::new();
/// let ret = graph.add_return();
/// let start = graph.add_start(ret)?;
///
/// let results = DataFlowSolver::new(DominatorAnalysis).solve(&graph)?;
/// let doms = results.output(ret).unwrap();
/// assert!(doms.contains(start) && doms.contains(ret));
/// # Ok::<(), cfgopt::Error>(())
/// ```
pub struct DataFlowSolver<A: DataFlowAnalysis> {
    /// The analysis being solved.
    analysis: A,
    /// Input value of each node.
    inputs: Vec<Option<A::Lattice>>,
    /// First transfer output of each node.
    outputs: Vec<Option<A::Lattice>>,
    /// Stored value of each outgoing edge, per node.
    edges: Vec<Vec<A::Lattice>>,
    /// Nodes taking part in the analysis.
    reachable: BitSet,
    /// Worklist of nodes to process.
    worklist: VecDeque<NodeId>,
    /// Whether each node is currently in the worklist (for deduplication).
    in_worklist: Vec<bool>,
    /// Number of node visits performed.
    iterations: usize,
}

impl<A: DataFlowAnalysis> DataFlowSolver<A> {
    /// Creates a new solver for the given analysis.
    #[must_use]
    pub fn new(analysis: A) -> Self {
        Self {
            analysis,
            inputs: Vec::new(),
            outputs: Vec::new(),
            edges: Vec::new(),
            reachable: BitSet::new(0),
            worklist: VecDeque::new(),
            in_worklist: Vec::new(),
            iterations: 0,
        }
    }

    /// Solves the data flow analysis to a fixpoint.
    ///
    /// # Errors
    ///
    /// [`Error::NoStart`](crate::Error::NoStart) if the graph has no start node.
    pub fn solve(mut self, graph: &Graph) -> Result<AnalysisResults<A::Lattice>> {
        let start = graph.entry()?;

        self.initialize(graph, start);
        self.iterate(graph, start);

        trace!(
            iterations = self.iterations,
            direction = ?A::DIRECTION,
            "data flow fixpoint reached"
        );

        Ok(AnalysisResults {
            inputs: self.inputs,
            outputs: self.outputs,
            edges: self.edges,
            iterations: self.iterations,
        })
    }

    /// Returns the number of node visits performed.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Nodes at the other end of the outgoing edges of `node`.
    fn edge_targets(graph: &Graph, node: NodeId) -> &[NodeId] {
        match A::DIRECTION {
            Direction::Forward => graph.successors(node),
            Direction::Backward => graph.predecessors(node),
        }
    }

    /// Initializes the solver state.
    fn initialize(&mut self, graph: &Graph, start: NodeId) {
        let bound = graph.node_bound();
        let top = self.analysis.top(graph);

        self.reachable = graph.reachable();
        self.inputs = vec![None; bound];
        self.outputs = vec![None; bound];
        self.in_worklist = vec![false; bound];
        self.edges = (0..bound)
            .map(|i| {
                let node = NodeId::new(i);
                if self.reachable.contains(i) {
                    vec![top.clone(); Self::edge_targets(graph, node).len()]
                } else {
                    Vec::new()
                }
            })
            .collect();

        let order = match A::DIRECTION {
            Direction::Forward => reverse_postorder(graph, start),
            Direction::Backward => postorder(graph, start),
        };
        for node in order {
            self.push(node);
        }
    }

    fn push(&mut self, node: NodeId) {
        let idx = node.index();
        if self.reachable.contains(idx) && !self.in_worklist[idx] {
            self.worklist.push_back(node);
            self.in_worklist[idx] = true;
        }
    }

    /// Main iteration loop.
    fn iterate(&mut self, graph: &Graph, start: NodeId) {
        let top = self.analysis.top(graph);
        let boundary = self.analysis.boundary(graph);

        while let Some(node) = self.worklist.pop_front() {
            self.in_worklist[node.index()] = false;
            self.iterations += 1;

            let at_boundary = match A::DIRECTION {
                Direction::Forward => node == start,
                Direction::Backward => graph.successors(node).is_empty(),
            };
            let input = match (&boundary, at_boundary) {
                (Some(value), true) => value.clone(),
                _ => self.meet_incoming(graph, node).unwrap_or_else(|| top.clone()),
            };

            let outputs = self.analysis.transfer(graph, node, &input);
            self.inputs[node.index()] = Some(input);
            self.outputs[node.index()] = outputs.first().cloned();

            let targets = Self::edge_targets(graph, node);
            for (position, &target) in targets.iter().enumerate() {
                let value = if outputs.len() == 1 {
                    &outputs[0]
                } else if let Some(value) = outputs.get(position) {
                    value
                } else {
                    continue;
                };
                if self.edges[node.index()][position] != *value {
                    self.edges[node.index()][position] = value.clone();
                    self.push(target);
                }
            }
        }
    }

    /// Meets the values stored on every edge entering `node`.
    ///
    /// Returns `None` if no reachable node has an edge into `node`.
    fn meet_incoming(&self, graph: &Graph, node: NodeId) -> Option<A::Lattice> {
        let sources = match A::DIRECTION {
            Direction::Forward => graph.predecessors(node),
            Direction::Backward => graph.successors(node),
        };

        let mut result: Option<A::Lattice> = None;
        for &source in sources {
            if !self.reachable.contains(source.index()) {
                continue;
            }
            let slots = Self::edge_targets(graph, source);
            for (position, &target) in slots.iter().enumerate() {
                if target != node {
                    continue;
                }
                let value = &self.edges[source.index()][position];
                result = Some(match result {
                    None => value.clone(),
                    Some(acc) => acc.meet(value),
                });
            }
        }
        result
    }
}
