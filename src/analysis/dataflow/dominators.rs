//! Dominator analysis.
//!
//! Node `d` dominates node `n` if every path from the start node to `n`
//! passes through `d`. Every node dominates itself.
//!
//! The analysis is a forward instantiation of the generic solver: facts are
//! node sets met by intersection, every edge starts at the set of all nodes,
//! and each node adds itself to whatever reaches it. The start node is seeded
//! with the empty set, so its dominator set is exactly `{start}`.

use tracing::debug;

use crate::{
    analysis::{
        cfg::Graph,
        dataflow::{
            framework::{AnalysisResults, DataFlowAnalysis, Direction},
            lattice::NodeSet,
            solver::DataFlowSolver,
        },
    },
    utils::graph::NodeId,
    Result,
};

/// Dominator analysis over node sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct DominatorAnalysis;

impl DataFlowAnalysis for DominatorAnalysis {
    type Lattice = NodeSet;
    const DIRECTION: Direction = Direction::Forward;

    fn top(&self, graph: &Graph) -> NodeSet {
        NodeSet::full(graph.node_bound())
    }

    fn boundary(&self, graph: &Graph) -> Option<NodeSet> {
        Some(NodeSet::empty(graph.node_bound()))
    }

    fn transfer(&self, _graph: &Graph, node: NodeId, input: &NodeSet) -> Vec<NodeSet> {
        let mut out = input.clone();
        out.insert(node);
        vec![out]
    }
}

/// Dominator sets of every node reachable from the start node.
#[derive(Debug, Clone)]
pub struct Dominators {
    start: NodeId,
    results: AnalysisResults<NodeSet>,
}

impl Dominators {
    /// Computes the dominator sets of `graph`.
    ///
    /// # Errors
    ///
    /// [`Error::NoStart`](crate::Error::NoStart) if the graph has no start node.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cfgopt::{analysis::dataflow::Dominators, ir::Expr, Graph};
    ///
    /// let mut graph = Graph::new();
    /// let ret = graph.add_return();
    /// let a = graph.add_var_assign("a", Expr::constant(1), ret)?;
    /// let branch = graph.add_if(Expr::temp("c"), a, ret)?;
    /// let start = graph.add_start(branch)?;
    ///
    /// let dom = Dominators::compute(&graph)?;
    /// assert!(dom.dominates(branch, ret));
    /// assert!(!dom.dominates(a, ret));
    /// assert_eq!(dom.immediate_dominator(ret), Some(branch));
    /// assert_eq!(dom.immediate_dominator(start), None);
    /// # Ok::<(), cfgopt::Error>(())
    /// ```
    pub fn compute(graph: &Graph) -> Result<Self> {
        let start = graph.entry()?;
        let results = DataFlowSolver::new(DominatorAnalysis).solve(graph)?;
        debug!(iterations = results.iterations(), "computed dominators");
        Ok(Self { start, results })
    }

    /// The start node the sets were computed from.
    #[must_use]
    pub const fn start(&self) -> NodeId {
        self.start
    }

    /// Returns the set of nodes dominating `node`, including `node` itself.
    ///
    /// `None` for nodes unreachable from the start node.
    #[must_use]
    pub fn dominators(&self, node: NodeId) -> Option<&NodeSet> {
        self.results.output(node)
    }

    /// Returns `true` if `dominator` dominates `node`.
    #[must_use]
    pub fn dominates(&self, dominator: NodeId, node: NodeId) -> bool {
        self.dominators(node).is_some_and(|set| set.contains(dominator))
    }

    /// Returns `true` if `dominator` dominates `node` and differs from it.
    #[must_use]
    pub fn strictly_dominates(&self, dominator: NodeId, node: NodeId) -> bool {
        dominator != node && self.dominates(dominator, node)
    }

    /// Returns the closest strict dominator of `node`.
    ///
    /// Strict dominators form a chain, so the closest one is the strict
    /// dominator with the most dominators of its own. The start node has none.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.dominators(node)?
            .iter()
            .filter(|&d| d != node)
            .max_by_key(|&d| self.dominators(d).map_or(0, NodeSet::len))
    }

    /// Returns `true` if `node` was reached by the analysis.
    #[must_use]
    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.results.is_reached(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinOpKind, Expr};

    #[test]
    fn test_start_dominates_only_itself() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let start = g.add_start(ret).unwrap();

        let dom = Dominators::compute(&g).unwrap();
        let set: Vec<_> = dom.dominators(start).unwrap().iter().collect();
        assert_eq!(set, vec![start]);
        assert!(dom.dominates(ret, ret));
        assert!(dom.strictly_dominates(start, ret));
        assert!(!dom.strictly_dominates(ret, ret));
    }

    #[test]
    fn test_loop_header_dominates_body() {
        // start -> init -> head -(true)-> body -> head ; head -(false)-> ret
        let mut g = Graph::new();
        let ret = g.add_return();
        let back = g.add_stub();
        let body = g
            .add_var_assign(
                "i",
                Expr::binop(BinOpKind::Add, Expr::temp("i"), Expr::constant(1)),
                back,
            )
            .unwrap();
        let head = g
            .add_if(
                Expr::binop(BinOpKind::Lt, Expr::temp("i"), Expr::constant(10)),
                body,
                ret,
            )
            .unwrap();
        g.substitute_stub(back, head).unwrap();
        let init = g.add_var_assign("i", Expr::constant(0), head).unwrap();
        let start = g.add_start(init).unwrap();

        let dom = Dominators::compute(&g).unwrap();
        let body_doms: Vec<_> = dom.dominators(body).unwrap().iter().collect();
        let mut expected = vec![start, init, head, body];
        expected.sort();
        assert_eq!(body_doms, expected);
        assert!(dom.dominates(head, ret));
        assert!(!dom.dominates(body, ret));
        assert_eq!(dom.immediate_dominator(body), Some(head));
        assert_eq!(dom.immediate_dominator(head), Some(init));
    }

    #[test]
    fn test_unreachable_nodes_have_no_dominators() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let orphan = g.add_var_assign("x", Expr::constant(1), ret).unwrap();
        g.add_start(ret).unwrap();

        let dom = Dominators::compute(&g).unwrap();
        assert!(dom.dominators(orphan).is_none());
        assert!(!dom.dominates(orphan, ret));
        assert!(!dom.is_reachable(orphan));
    }
}
