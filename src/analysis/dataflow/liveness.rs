//! Live variable analysis.
//!
//! A variable is *live* at a program point if there exists a path from that
//! point to a use of the variable that doesn't pass through a definition of
//! the variable.
//!
//! # Uses
//!
//! Live variable analysis is what dead code elimination is built on: an
//! assignment whose target is not live right after it can never be observed.
//!
//! # Algorithm
//!
//! This is a backward data flow analysis:
//!
//! - `USE[n]` = variables read by n (upward-exposed for blocks)
//! - `DEF[n]` = variables written by n
//! - `OUT[n]` = ∪{IN[s] | s is a successor of n}
//! - `IN[n]` = USE[n] ∪ (OUT[n] - DEF[n])
//!
//! Return-value temporaries are read by the caller once the function exits,
//! so every exit node starts with them live.

use std::collections::{BTreeSet, HashMap};

use crate::{
    analysis::{
        cfg::Graph,
        dataflow::{
            framework::{AnalysisResults, DataFlowAnalysis, Direction},
            lattice::VarSet,
            solver::DataFlowSolver,
        },
    },
    ir::Expr,
    utils::{graph::NodeId, BitSet},
    Result,
};

/// Live variable analysis.
///
/// Interns every variable appearing in the graph into a dense index so the
/// facts are bit sets, then precomputes USE and DEF per node.
///
/// # Example
///
/// ```rust
/// use cfgopt::{analysis::dataflow::LiveVariables, ir::Expr, Graph};
///
/// let mut graph = Graph::new();
/// let ret = graph.add_return();
/// let x = graph.add_var_assign("x", Expr::temp("y"), ret)?;
/// let y = graph.add_var_assign("y", Expr::constant(15), x)?;
/// graph.add_start(y)?;
///
/// let liveness = LiveVariables::new(&graph).analyze(&graph)?;
/// assert!(liveness.is_live_out(y, "y"));
/// assert!(!liveness.is_live_out(x, "x"));
/// # Ok::<(), cfgopt::Error>(())
/// ```
pub struct LiveVariables {
    /// Variable names, indexed by their interned id.
    variables: Vec<String>,
    /// Reverse lookup from name to interned id.
    index: HashMap<String, usize>,
    /// USE sets for each arena slot.
    use_sets: Vec<BitSet>,
    /// DEF sets for each arena slot.
    def_sets: Vec<BitSet>,
    /// Return-value temporaries, live at every exit.
    exit_live: BitSet,
}

impl LiveVariables {
    /// Creates a new live variables analysis for the given graph.
    #[must_use]
    pub fn new(graph: &Graph) -> Self {
        let mut names = BTreeSet::new();
        for node in graph.nodes() {
            names.extend(graph.defs(node));
            names.extend(graph.uses(node));
        }
        let variables: Vec<String> = names.into_iter().collect();
        let index: HashMap<String, usize> = variables
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let num_vars = variables.len();

        let to_bits = |set: BTreeSet<String>| {
            BitSet::with_bits(num_vars, set.iter().filter_map(|name| index.get(name).copied()))
        };
        let mut use_sets = Vec::with_capacity(graph.node_bound());
        let mut def_sets = Vec::with_capacity(graph.node_bound());
        for slot in 0..graph.node_bound() {
            let node = NodeId::new(slot);
            use_sets.push(to_bits(graph.uses(node)));
            def_sets.push(to_bits(graph.defs(node)));
        }

        let exit_live = BitSet::with_bits(
            num_vars,
            variables
                .iter()
                .enumerate()
                .filter(|(_, name)| Expr::is_return_temp(name))
                .map(|(i, _)| i),
        );

        Self {
            variables,
            index,
            use_sets,
            def_sets,
            exit_live,
        }
    }

    /// Returns the number of variables being tracked.
    #[must_use]
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Returns the interned id of `name`.
    #[must_use]
    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Returns the USE set for a node.
    #[must_use]
    pub fn use_set(&self, node: NodeId) -> Option<&BitSet> {
        self.use_sets.get(node.index())
    }

    /// Returns the DEF set for a node.
    #[must_use]
    pub fn def_set(&self, node: NodeId) -> Option<&BitSet> {
        self.def_sets.get(node.index())
    }

    /// Runs the analysis to a fixpoint.
    ///
    /// # Errors
    ///
    /// [`Error::NoStart`](crate::Error::NoStart) if the graph has no start node.
    pub fn analyze(self, graph: &Graph) -> Result<LivenessResult> {
        let variables = self.variables.clone();
        let index = self.index.clone();
        let results = DataFlowSolver::new(self).solve(graph)?;
        Ok(LivenessResult {
            variables,
            index,
            results,
        })
    }
}

impl DataFlowAnalysis for LiveVariables {
    type Lattice = VarSet;
    const DIRECTION: Direction = Direction::Backward;

    fn top(&self, _graph: &Graph) -> VarSet {
        VarSet::empty(self.variables.len())
    }

    fn boundary(&self, _graph: &Graph) -> Option<VarSet> {
        let mut live = VarSet::empty(self.variables.len());
        live.union_with(&self.exit_live);
        Some(live)
    }

    fn transfer(&self, _graph: &Graph, node: NodeId, input: &VarSet) -> Vec<VarSet> {
        let mut live = input.clone();
        if let Some(defs) = self.def_sets.get(node.index()) {
            live.difference_with(defs);
        }
        if let Some(uses) = self.use_sets.get(node.index()) {
            live.union_with(uses);
        }
        vec![live]
    }
}

/// Per-node liveness facts produced by [`LiveVariables::analyze`].
#[derive(Debug, Clone)]
pub struct LivenessResult {
    variables: Vec<String>,
    index: HashMap<String, usize>,
    results: AnalysisResults<VarSet>,
}

impl LivenessResult {
    /// Variables live on entry to `node`.
    #[must_use]
    pub fn live_in(&self, node: NodeId) -> Option<&VarSet> {
        self.results.output(node)
    }

    /// Variables live on exit from `node`.
    #[must_use]
    pub fn live_out(&self, node: NodeId) -> Option<&VarSet> {
        self.results.input(node)
    }

    /// Returns `true` if `name` is live on exit from `node`.
    ///
    /// Unreachable nodes and unknown variables are never live.
    #[must_use]
    pub fn is_live_out(&self, node: NodeId, name: &str) -> bool {
        match (self.index.get(name), self.live_out(node)) {
            (Some(&var), Some(live)) => live.contains(var),
            _ => false,
        }
    }

    /// Returns `true` if `name` is live on entry to `node`.
    #[must_use]
    pub fn is_live_in(&self, node: NodeId, name: &str) -> bool {
        match (self.index.get(name), self.live_in(node)) {
            (Some(&var), Some(live)) => live.contains(var),
            _ => false,
        }
    }

    /// Names of the variables live on exit from `node`, sorted.
    #[must_use]
    pub fn live_out_names(&self, node: NodeId) -> Vec<&str> {
        self.live_out(node)
            .map(|live| live.iter().map(|i| self.variables[i].as_str()).collect())
            .unwrap_or_default()
    }

    /// Number of node visits the solver needed.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.results.iterations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinOpKind, CallStmt};

    #[test]
    fn test_straight_line() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let x = g.add_var_assign("x", Expr::temp("y"), ret).unwrap();
        let y = g.add_var_assign("y", Expr::constant(15), x).unwrap();
        let start = g.add_start(y).unwrap();

        let live = LiveVariables::new(&g).analyze(&g).unwrap();
        assert_eq!(live.live_out_names(start), Vec::<&str>::new());
        assert_eq!(live.live_out_names(y), vec!["y"]);
        assert!(live.is_live_in(x, "y"));
        assert!(!live.is_live_out(x, "x"));
    }

    #[test]
    fn test_return_temps_live_at_exit() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let rv = g.add_var_assign("_RV0", Expr::temp("a"), ret).unwrap();
        g.add_start(rv).unwrap();

        let live = LiveVariables::new(&g).analyze(&g).unwrap();
        assert!(live.is_live_out(rv, "_RV0"));
        assert!(live.is_live_in(rv, "a"));
        assert!(!live.is_live_in(rv, "_RV0"));
    }

    #[test]
    fn test_loop_carries_liveness() {
        // x = 0; while (x < n) { x = x + 1 }; return
        let mut g = Graph::new();
        let ret = g.add_return();
        let back = g.add_stub();
        let inc = g
            .add_var_assign(
                "x",
                Expr::binop(BinOpKind::Add, Expr::temp("x"), Expr::constant(1)),
                back,
            )
            .unwrap();
        let head = g
            .add_if(
                Expr::binop(BinOpKind::Lt, Expr::temp("x"), Expr::temp("n")),
                inc,
                ret,
            )
            .unwrap();
        g.substitute_stub(back, head).unwrap();
        let init = g.add_var_assign("x", Expr::constant(0), head).unwrap();
        g.add_start(init).unwrap();

        let live = LiveVariables::new(&g).analyze(&g).unwrap();
        assert!(live.is_live_out(inc, "x"));
        assert!(live.is_live_out(inc, "n"));
        assert!(live.is_live_out(init, "x"));
        assert!(live.is_live_in(init, "n"));
    }

    #[test]
    fn test_call_results_kill() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let call = CallStmt::new("f", vec![Expr::temp("a")]).with_results(["a"]);
        let c = g.add_call(call, ret).unwrap();
        g.add_start(c).unwrap();

        let analysis = LiveVariables::new(&g);
        let a = analysis.variable_index("a").unwrap();
        assert!(analysis.def_set(c).unwrap().contains(a));
        let live = analysis.analyze(&g).unwrap();
        assert!(live.is_live_in(c, "a"));
        assert!(!live.is_live_out(c, "a"));
    }
}
