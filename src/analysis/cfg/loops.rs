//! Natural loop detection and induction variable recognition.
//!
//! # Loop Structure
//!
//! ```text
//!     [entry ...]
//!          |
//!          v
//!     [header] <------+  <- Single entry point, dominates all loop nodes
//!          |          |
//!          v          |
//!     [body ...]      |  <- Loop body nodes
//!          |          |
//!          v          |
//!     [latch] --------+  <- Back edge source(s)
//!
//!     [exit ...]         <- Outside the loop, with a predecessor inside it
//! ```
//!
//! A back edge is an edge `tail -> header` where the header dominates the
//! tail. The body of the loop is everything that reaches one of its tails
//! without passing through the header, plus the header itself.
//!
//! Loops are reported in the order their first back edge is met while walking
//! the graph in reverse postorder. A loop whose header already belongs to a
//! previously reported loop is not reported again.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    analysis::{
        cfg::{Graph, NodeKind},
        dataflow::Dominators,
    },
    ir::{BinOpKind, Expr},
    utils::{
        graph::{algorithms::reverse_postorder, NodeId},
        BitSet,
    },
};

/// Exit edge information for a loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopExit {
    /// The node inside the loop that branches out.
    pub exiting: NodeId,
    /// The node outside the loop that is the exit target.
    pub target: NodeId,
}

/// A natural loop: a header plus every node that reaches a back edge into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalLoop {
    /// The header node (single entry point, dominates every body node).
    pub header: NodeId,
    /// All nodes in the loop, including the header.
    pub body: BTreeSet<NodeId>,
    /// Sources of the back edges into the header.
    pub latches: Vec<NodeId>,
}

impl NaturalLoop {
    /// Returns true if this loop contains the given node.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.body.contains(&node)
    }

    /// Returns the number of nodes in the loop, including the header.
    #[must_use]
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Returns the edges leaving the loop, in body order.
    #[must_use]
    pub fn exits(&self, graph: &Graph) -> Vec<LoopExit> {
        let mut exits = Vec::new();
        for &node in &self.body {
            for &target in graph.successors(node) {
                let exit = LoopExit {
                    exiting: node,
                    target,
                };
                if !self.contains(target) && !exits.contains(&exit) {
                    exits.push(exit);
                }
            }
        }
        exits
    }
}

/// All loops detected in one function.
#[derive(Debug, Clone, Default)]
pub struct LoopForest {
    loops: Vec<NaturalLoop>,
}

impl LoopForest {
    /// Returns all loops in detection order.
    #[must_use]
    pub fn loops(&self) -> &[NaturalLoop] {
        &self.loops
    }

    /// Returns the number of loops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    /// Returns true if there are no loops.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Returns the loop with the given header.
    #[must_use]
    pub fn loop_for_header(&self, header: NodeId) -> Option<&NaturalLoop> {
        self.loops.iter().find(|l| l.header == header)
    }

    /// Returns the loop containing `node`, if any.
    #[must_use]
    pub fn loop_containing(&self, node: NodeId) -> Option<&NaturalLoop> {
        self.loops.iter().find(|l| l.contains(node))
    }

    /// Iterates over all loops in the forest.
    pub fn iter(&self) -> impl Iterator<Item = &NaturalLoop> {
        self.loops.iter()
    }
}

impl IntoIterator for LoopForest {
    type Item = NaturalLoop;
    type IntoIter = std::vec::IntoIter<NaturalLoop>;

    fn into_iter(self) -> Self::IntoIter {
        self.loops.into_iter()
    }
}

/// Detects the natural loops of `graph`.
///
/// # Examples
///
/// ```rust
/// use cfgopt::{
///     analysis::{cfg::detect_loops, dataflow::Dominators},
///     ir::{BinOpKind, Expr},
///     Graph,
/// };
///
/// let mut g = Graph::new();
/// let ret = g.add_return();
/// let back = g.add_stub();
/// let body = g.add_var_assign(
///     "i",
///     Expr::binop(BinOpKind::Add, Expr::temp("i"), Expr::constant(1)),
///     back,
/// )?;
/// let head = g.add_if(
///     Expr::binop(BinOpKind::Lt, Expr::temp("i"), Expr::constant(10)),
///     body,
///     ret,
/// )?;
/// g.substitute_stub(back, head)?;
/// g.add_start(head)?;
///
/// let forest = detect_loops(&g, &Dominators::compute(&g)?);
/// let natural = &forest.loops()[0];
/// assert_eq!(natural.header, head);
/// assert_eq!(natural.latches, vec![body]);
/// assert_eq!(natural.size(), 2);
/// # Ok::<(), cfgopt::Error>(())
/// ```
#[must_use]
pub fn detect_loops(graph: &Graph, dominators: &Dominators) -> LoopForest {
    let mut forest = LoopForest::default();
    let mut claimed = BitSet::new(graph.node_bound());

    for tail in reverse_postorder(graph, dominators.start()) {
        for &header in graph.successors(tail) {
            if !dominators.dominates(header, tail) || claimed.contains(header.index()) {
                continue;
            }

            let latches = back_edge_sources(graph, dominators, header);
            let body = loop_body(graph, dominators, header, &latches);
            for node in &body {
                claimed.insert(node.index());
            }
            forest.loops.push(NaturalLoop {
                header,
                body,
                latches,
            });
        }
    }

    forest
}

/// Returns `true` if the graph has at least one back edge.
#[must_use]
pub fn has_back_edges(graph: &Graph, dominators: &Dominators) -> bool {
    graph.nodes().any(|node| {
        graph
            .successors(node)
            .iter()
            .any(|&succ| dominators.dominates(succ, node))
    })
}

/// Predecessors of `header` that it dominates, i.e. the tails of its back edges.
#[must_use]
pub fn back_edge_sources(graph: &Graph, dominators: &Dominators, header: NodeId) -> Vec<NodeId> {
    graph
        .predecessors(header)
        .iter()
        .copied()
        .filter(|&pred| dominators.dominates(header, pred))
        .collect()
}

/// Collects the natural loop body of `header` with back edges from `tails`.
///
/// Walks predecessors backward from every tail, never past the header, and
/// only through nodes the dominator analysis reached.
#[must_use]
pub fn loop_body(
    graph: &Graph,
    dominators: &Dominators,
    header: NodeId,
    tails: &[NodeId],
) -> BTreeSet<NodeId> {
    let mut body = BTreeSet::from([header]);
    let mut stack: Vec<NodeId> = tails.iter().copied().filter(|&t| t != header).collect();

    while let Some(node) = stack.pop() {
        if !body.insert(node) {
            continue;
        }
        for &pred in graph.predecessors(node) {
            if pred != header && dominators.is_reachable(pred) && !body.contains(&pred) {
                stack.push(pred);
            }
        }
    }

    body
}

/// How a basic induction variable is updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InductionUpdateKind {
    /// `i = i + c` or `i = c + i`
    Add,
    /// `i = i - c`
    Sub,
}

/// A basic induction variable: assigned exactly once in the loop, by adding
/// a constant to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InductionVar {
    /// The variable name.
    pub name: String,
    /// Net change per iteration (negative for `i = i - c`).
    pub stride: i64,
    /// The assignment node performing the update.
    pub update: NodeId,
    /// The shape of the update.
    pub kind: InductionUpdateKind,
}

/// Finds the basic induction variables of a loop body.
///
/// Recognized updates are `x = x + c`, `x = c + x` and `x = x - c` with a
/// constant `c`. A variable qualifies only if that update is its single
/// definition anywhere in `body`. Results are sorted by name.
#[must_use]
pub fn find_induction_variables(graph: &Graph, body: &BTreeSet<NodeId>) -> Vec<InductionVar> {
    let mut def_counts: BTreeMap<String, usize> = BTreeMap::new();
    for &node in body {
        for var in graph.defs(node) {
            *def_counts.entry(var).or_default() += 1;
        }
    }

    let mut ivs = Vec::new();
    for &node in body {
        let Some(NodeKind::VarAssign { target, value }) = graph.kind(node) else {
            continue;
        };
        if def_counts.get(target) != Some(&1) {
            continue;
        }
        if let Some((stride, kind)) = self_increment(target, value) {
            ivs.push(InductionVar {
                name: target.clone(),
                stride,
                update: node,
                kind,
            });
        }
    }

    ivs.sort_by(|a, b| a.name.cmp(&b.name));
    ivs
}

/// Matches `value` against `var + c`, `c + var` and `var - c`.
fn self_increment(var: &str, value: &Expr) -> Option<(i64, InductionUpdateKind)> {
    let Expr::BinOp { op, left, right } = value else {
        return None;
    };
    match (op, left.as_temp(), right.as_const(), left.as_const(), right.as_temp()) {
        (BinOpKind::Add, Some(t), Some(c), _, _) if t == var => Some((c, InductionUpdateKind::Add)),
        (BinOpKind::Add, _, _, Some(c), Some(t)) if t == var => Some((c, InductionUpdateKind::Add)),
        (BinOpKind::Sub, Some(t), Some(c), _, _) if t == var => {
            Some((c.checked_neg()?, InductionUpdateKind::Sub))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(var: &str, c: i64) -> Expr {
        Expr::binop(BinOpKind::Add, Expr::temp(var), Expr::constant(c))
    }

    /// start -> init -> head ; head -(true)-> body... -> head ; head -(false)-> ret
    ///
    /// `body` is given bottom-up: the first statement is the latch.
    fn simple_loop(
        cond: Expr,
        stmts: Vec<(&str, Expr)>,
    ) -> (Graph, NodeId, Vec<NodeId>, NodeId) {
        let mut g = Graph::new();
        let ret = g.add_return();
        let back = g.add_stub();
        let mut next = back;
        let mut nodes = Vec::new();
        for (var, value) in stmts {
            next = g.add_var_assign(var, value, next).unwrap();
            nodes.push(next);
        }
        let head = g.add_if(cond, next, ret).unwrap();
        g.substitute_stub(back, head).unwrap();
        let init = g.add_var_assign("i", Expr::constant(0), head).unwrap();
        g.add_start(init).unwrap();
        (g, head, nodes, ret)
    }

    #[test]
    fn test_single_loop_detected() {
        let cond = Expr::binop(BinOpKind::Lt, Expr::temp("i"), Expr::temp("n"));
        let (g, head, nodes, ret) =
            simple_loop(cond, vec![("i", add("i", 1)), ("s", add("s", 2))]);

        let forest = detect_loops(&g, &Dominators::compute(&g).unwrap());
        assert_eq!(forest.len(), 1);
        let natural = &forest.loops()[0];
        assert_eq!(natural.header, head);
        assert_eq!(natural.latches, vec![nodes[0]]);
        assert_eq!(natural.size(), 3);
        assert!(natural.contains(nodes[1]));
        assert_eq!(
            natural.exits(&g),
            vec![LoopExit {
                exiting: head,
                target: ret
            }]
        );
    }

    #[test]
    fn test_self_loop_is_its_own_loop() {
        let mut g = Graph::new();
        let spin = g.add_self_loop();
        g.add_start(spin).unwrap();

        let forest = detect_loops(&g, &Dominators::compute(&g).unwrap());
        let natural = forest.loop_for_header(spin).unwrap();
        assert_eq!(natural.body, BTreeSet::from([spin]));
        assert_eq!(natural.latches, vec![spin]);
    }

    #[test]
    fn test_acyclic_graph_has_no_loops() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let a = g.add_var_assign("a", Expr::constant(1), ret).unwrap();
        let branch = g.add_if(Expr::temp("c"), a, ret).unwrap();
        g.add_start(branch).unwrap();

        let dom = Dominators::compute(&g).unwrap();
        assert!(detect_loops(&g, &dom).is_empty());
        assert!(!has_back_edges(&g, &dom));
    }

    /// outer: while (i < n) { j = 0; inner: while (j < m) { j = j + 1 }; i = i + 1 }
    ///
    /// With `body_on_true` unset the inner guard is written `j >= m` with its
    /// body on the false edge.
    fn nested_loops(body_on_true: bool) -> (Graph, NodeId, NodeId, NodeId) {
        let mut g = Graph::new();
        let ret = g.add_return();
        let outer_back = g.add_stub();
        let inc_i = g.add_var_assign("i", add("i", 1), outer_back).unwrap();
        let inner_back = g.add_stub();
        let inc_j = g.add_var_assign("j", add("j", 1), inner_back).unwrap();
        let inner = if body_on_true {
            g.add_if(
                Expr::binop(BinOpKind::Lt, Expr::temp("j"), Expr::temp("m")),
                inc_j,
                inc_i,
            )
        } else {
            g.add_if(
                Expr::binop(BinOpKind::Geq, Expr::temp("j"), Expr::temp("m")),
                inc_i,
                inc_j,
            )
        }
        .unwrap();
        g.substitute_stub(inner_back, inner).unwrap();
        let reset = g.add_var_assign("j", Expr::constant(0), inner).unwrap();
        let outer = g
            .add_if(
                Expr::binop(BinOpKind::Lt, Expr::temp("i"), Expr::temp("n")),
                reset,
                ret,
            )
            .unwrap();
        g.substitute_stub(outer_back, outer).unwrap();
        g.add_start(outer).unwrap();
        (g, outer, inner, inc_j)
    }

    #[test]
    fn test_nested_header_claimed_by_outer() {
        let (g, outer, inner, inc_j) = nested_loops(true);

        let forest = detect_loops(&g, &Dominators::compute(&g).unwrap());
        assert_eq!(forest.len(), 1);
        let natural = &forest.loops()[0];
        assert_eq!(natural.header, outer);
        assert_eq!(natural.size(), 5);
        assert!(forest.loop_for_header(inner).is_none());
        assert_eq!(forest.loop_containing(inc_j).map(|l| l.header), Some(outer));
    }

    #[test]
    fn test_inner_loop_reported_when_its_latch_comes_first() {
        let (g, outer, inner, inc_j) = nested_loops(false);

        // The inner latch precedes the outer one in reverse postorder.
        let forest = detect_loops(&g, &Dominators::compute(&g).unwrap());
        assert_eq!(forest.len(), 2);
        assert_eq!(forest.loops()[0].header, inner);
        assert_eq!(forest.loops()[0].size(), 2);
        assert_eq!(forest.loops()[1].header, outer);
        assert_eq!(forest.loops()[1].size(), 5);
        assert!(forest.loops()[1].contains(inc_j));
    }

    #[test]
    fn test_induction_variables() {
        let cond = Expr::binop(BinOpKind::Lt, Expr::temp("i"), Expr::temp("n"));
        let stmts = vec![
            ("i", add("i", 2)),
            (
                "k",
                Expr::binop(BinOpKind::Sub, Expr::temp("k"), Expr::constant(3)),
            ),
            (
                "s",
                Expr::binop(BinOpKind::Add, Expr::constant(1), Expr::temp("s")),
            ),
            ("t", Expr::binop(BinOpKind::Mul, Expr::temp("t"), Expr::constant(2))),
        ];
        let (g, head, nodes, _) = simple_loop(cond, stmts);
        let dom = Dominators::compute(&g).unwrap();
        let forest = detect_loops(&g, &dom);
        let natural = forest.loop_for_header(head).unwrap();

        let ivs = find_induction_variables(&g, &natural.body);
        let summary: Vec<_> = ivs.iter().map(|iv| (iv.name.as_str(), iv.stride)).collect();
        assert_eq!(summary, vec![("i", 2), ("k", -3), ("s", 1)]);
        assert_eq!(ivs[0].update, nodes[0]);
        assert_eq!(ivs[1].kind, InductionUpdateKind::Sub);
    }

    #[test]
    fn test_twice_assigned_variable_is_not_induction() {
        let cond = Expr::binop(BinOpKind::Lt, Expr::temp("i"), Expr::temp("n"));
        let (g, head, _, _) = simple_loop(cond, vec![("i", add("i", 1)), ("i", add("i", 1))]);
        let forest = detect_loops(&g, &Dominators::compute(&g).unwrap());
        let natural = forest.loop_for_header(head).unwrap();
        assert!(find_induction_variables(&g, &natural.body).is_empty());
    }
}
