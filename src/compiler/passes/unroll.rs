//! Loop unrolling for counted loops.
//!
//! A loop qualifies when its header is a guard `iv <op> bound` where `iv` is a
//! basic induction variable of the body, `bound` does not change inside the
//! loop, and `<op>` matches the direction of the stride (`<`/`<=` when
//! counting up, `>`/`>=` when counting down). For such a loop with stride `c`
//! and factor `n` the unroller builds:
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            ▼                              │
//!   new header: iv + c*(n-1) <op> bound     │
//!      │ true                  │ false      │
//!      ▼                       ▼            │
//!   copy n-1 → … → copy 0 ─────┼────────────┘
//!                              ▼
//!                 epilogue: iv <op> bound  ◄──┐
//!                   │ true        │ false     │
//!                   ▼             ▼           │
//!                 body copy ──────┼───────────┘
//!                                 ▼
//!                           original exit
//! ```
//!
//! The new header only enters the chain of `n` body copies when all `n`
//! iterations are guaranteed to run; the epilogue is a copy of the original
//! loop that finishes the remaining iterations. Edges leaving the body keep
//! their original targets in every copy. The original loop is left
//! unreachable once its entering edges are moved to the new header, and
//! [`unroll_loops`] sweeps it away.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::{
    analysis::{
        cfg::{detect_loops, find_induction_variables, loop_body},
        dataflow::Dominators,
        Graph, NodeKind,
    },
    compiler::{config::UnrollConfig, CfgPass, CompilerContext, EventKind, EventLog},
    ir::{BinOpKind, Expr},
    utils::graph::NodeId,
    Result,
};

/// Why a loop was left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SkipReason {
    /// The body has more nodes than the configured cap.
    #[strum(to_string = "loop body exceeds the size limit")]
    TooLarge,
    /// The header is not a branch on a binary comparison.
    #[strum(to_string = "header is not a comparison guard")]
    NotAGuard,
    /// The guard's left operand is not a basic induction variable.
    #[strum(to_string = "guard does not test an induction variable")]
    NoInductionVariable,
    /// The comparison does not bound the variable in its direction of travel.
    #[strum(to_string = "comparison does not match the stride direction")]
    DirectionMismatch,
    /// The guard's bound is assigned inside the loop.
    #[strum(to_string = "loop bound is not invariant")]
    VariantBound,
    /// The guard does not enter the body on true and leave it on false.
    #[strum(to_string = "unsupported loop shape")]
    UnsupportedShape,
    /// The configured factor is zero.
    #[strum(to_string = "unroll factor is zero")]
    ZeroFactor,
}

/// Result of an attempt to unroll one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnrollOutcome {
    /// The loop was replaced; `header` is the new guard.
    Unrolled {
        /// The guard of the unrolled loop.
        header: NodeId,
    },
    /// The loop was left as it was.
    Skipped(SkipReason),
}

impl UnrollOutcome {
    /// Returns `true` if the loop was unrolled.
    #[must_use]
    pub fn is_unrolled(&self) -> bool {
        matches!(self, UnrollOutcome::Unrolled { .. })
    }
}

/// Outcome of [`unroll_loops`] for a whole graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnrollReport {
    /// Every detected loop by original header, in detection order.
    pub loops: Vec<(NodeId, UnrollOutcome)>,
    /// Nodes removed by the final unreachable sweep.
    pub swept: usize,
}

impl UnrollReport {
    /// Number of loops that were unrolled.
    #[must_use]
    pub fn unrolled(&self) -> usize {
        self.loops.iter().filter(|(_, o)| o.is_unrolled()).count()
    }
}

/// The guard facts an unrollable loop provides.
struct Guard {
    iv: String,
    stride: i64,
    op: BinOpKind,
    bound: Expr,
    entry: NodeId,
    exit: NodeId,
}

/// Checks whether the loop headed by `header` can be unrolled.
fn analyze_guard(
    graph: &Graph,
    header: NodeId,
    body: &BTreeSet<NodeId>,
    config: &UnrollConfig,
) -> std::result::Result<Guard, SkipReason> {
    if config.factor == 0 {
        return Err(SkipReason::ZeroFactor);
    }
    if body.len() > config.max_body_size {
        return Err(SkipReason::TooLarge);
    }

    let Some(NodeKind::If { cond }) = graph.kind(header) else {
        return Err(SkipReason::NotAGuard);
    };
    let Expr::BinOp { op, left, right } = cond else {
        return Err(SkipReason::NotAGuard);
    };

    let iv = left.as_temp().ok_or(SkipReason::NoInductionVariable)?;
    let stride = find_induction_variables(graph, body)
        .into_iter()
        .find(|candidate| candidate.name == iv)
        .map(|candidate| candidate.stride)
        .ok_or(SkipReason::NoInductionVariable)?;

    let consistent = (stride > 0 && op.is_upper_bound()) || (stride < 0 && op.is_lower_bound());
    if !consistent {
        return Err(SkipReason::DirectionMismatch);
    }

    let defined: BTreeSet<String> = body.iter().flat_map(|&n| graph.defs(n)).collect();
    if !right.is_invariant(&defined) {
        return Err(SkipReason::VariantBound);
    }

    let &[entry, exit] = graph.successors(header) else {
        return Err(SkipReason::UnsupportedShape);
    };
    if entry == header || !body.contains(&entry) || body.contains(&exit) {
        return Err(SkipReason::UnsupportedShape);
    }

    Ok(Guard {
        iv: iv.to_string(),
        stride,
        op: *op,
        bound: (**right).clone(),
        entry,
        exit,
    })
}

/// Copies a loop body once, with its back edges aimed at `back_target`.
///
/// Each body node is copied at most once per copier; cycles inside the body
/// are closed through a stub that is resolved once the copy exists.
struct BodyCopier<'a> {
    body: &'a BTreeSet<NodeId>,
    header: NodeId,
    back_target: NodeId,
    copies: HashMap<NodeId, NodeId>,
}

impl<'a> BodyCopier<'a> {
    fn new(body: &'a BTreeSet<NodeId>, header: NodeId, back_target: NodeId) -> Self {
        Self {
            body,
            header,
            back_target,
            copies: HashMap::new(),
        }
    }

    fn copy(&mut self, graph: &mut Graph, node: NodeId) -> Result<NodeId> {
        if let Some(&copy) = self.copies.get(&node) {
            return Ok(copy);
        }
        if matches!(graph.kind(node), Some(NodeKind::SelfLoop)) {
            let copy = graph.clone_node(node, &[])?;
            self.copies.insert(node, copy);
            return Ok(copy);
        }

        let pending = graph.add_stub();
        self.copies.insert(node, pending);

        let originals = graph.successors(node).to_vec();
        let mut successors = Vec::with_capacity(originals.len());
        for succ in originals {
            let target = if succ == self.header {
                self.back_target
            } else if self.body.contains(&succ) {
                self.copy(graph, succ)?
            } else {
                succ
            };
            successors.push(target);
        }

        let copy = graph.clone_node(node, &successors)?;
        self.copies.insert(node, copy);
        resolve_stub(graph, pending, copy)?;
        Ok(copy)
    }
}

/// Substitutes `stub` by `real`, or drops it when no copy ended up referring to it.
fn resolve_stub(graph: &mut Graph, stub: NodeId, real: NodeId) -> Result<()> {
    if graph.predecessors(stub).is_empty() {
        graph.discard_stub(stub)
    } else {
        graph.substitute_stub(stub, real)
    }
}

/// Unrolls the loop headed by `header` with the given body.
///
/// On success every edge entering the loop from outside `body` is moved to the
/// new guard. The original loop nodes stay in the arena, unreachable, until
/// the caller sweeps them.
///
/// # Errors
///
/// Returns an error if the graph is structurally inconsistent, for instance
/// if `header` or a body node does not exist.
pub fn unroll_loop(
    graph: &mut Graph,
    header: NodeId,
    body: &BTreeSet<NodeId>,
    config: &UnrollConfig,
) -> Result<UnrollOutcome> {
    graph.require(header)?;
    let guard = match analyze_guard(graph, header, body, config) {
        Ok(guard) => guard,
        Err(reason) => {
            debug!(%header, %reason, "loop not unrolled");
            return Ok(UnrollOutcome::Skipped(reason));
        }
    };
    let Ok(remaining) = i64::try_from(config.factor - 1) else {
        return Ok(UnrollOutcome::Skipped(SkipReason::TooLarge));
    };

    // Remainder loop: a full copy of the original loop on the exit path.
    let epilogue_back = graph.add_stub();
    let epilogue_body = BodyCopier::new(body, header, epilogue_back).copy(graph, guard.entry)?;
    let epilogue = graph.clone_node(header, &[epilogue_body, guard.exit])?;
    resolve_stub(graph, epilogue_back, epilogue)?;

    // Chain of copies; the first one loops back to the new header.
    let chain_back = graph.add_stub();
    let mut chain = chain_back;
    for _ in 0..config.factor {
        chain = BodyCopier::new(body, header, chain).copy(graph, guard.entry)?;
    }

    let lookahead = Expr::binop(
        BinOpKind::Add,
        Expr::temp(guard.iv.as_str()),
        Expr::binop(
            BinOpKind::Mul,
            Expr::constant(guard.stride),
            Expr::constant(remaining),
        ),
    );
    let new_header = graph.add_if(Expr::binop(guard.op, lookahead, guard.bound), chain, epilogue)?;
    resolve_stub(graph, chain_back, new_header)?;

    let entering: Vec<NodeId> = graph
        .predecessors(header)
        .iter()
        .copied()
        .filter(|pred| !body.contains(pred))
        .collect();
    for pred in entering {
        graph.replace_successor(pred, header, new_header)?;
    }

    debug!(%header, %new_header, iv = %guard.iv, stride = guard.stride, "unrolled loop");
    Ok(UnrollOutcome::Unrolled { header: new_header })
}

/// Unrolls every eligible loop of `graph`, recording outcomes in `changes`.
fn unroll_all(
    graph: &mut Graph,
    function: &str,
    config: &UnrollConfig,
    changes: &EventLog,
) -> Result<UnrollReport> {
    let dominators = Dominators::compute(graph)?;
    let forest = detect_loops(graph, &dominators);
    let mut report = UnrollReport::default();

    for natural in forest.iter() {
        let header = natural.header;
        if !graph.contains(header) {
            continue;
        }
        // Earlier unrolling may have moved edges; only live back edges count.
        let tails: Vec<NodeId> = natural
            .latches
            .iter()
            .copied()
            .filter(|&tail| graph.contains(tail) && graph.successors(tail).contains(&header))
            .collect();
        let body = loop_body(graph, &dominators, header, &tails);

        let outcome = unroll_loop(graph, header, &body, config)?;
        match outcome {
            UnrollOutcome::Unrolled { header: new_header } => changes
                .record(EventKind::LoopUnrolled)
                .at(function, header)
                .message(format!(
                    "{} nodes x{} (new header {new_header})",
                    body.len(),
                    config.factor
                )),
            UnrollOutcome::Skipped(reason) => changes
                .record(EventKind::LoopSkipped)
                .at(function, header)
                .message(reason.to_string()),
        }
        report.loops.push((header, outcome));
    }

    if report.unrolled() > 0 {
        report.swept = graph.sweep_unreachable();
        if report.swept > 0 {
            changes
                .record(EventKind::NodesSwept)
                .function(function)
                .message(format!("{} nodes of replaced loops", report.swept));
        }
    }
    Ok(report)
}

/// Unrolls every eligible loop of `graph`.
///
/// Dominators and loops are computed once up front. Loops that do not qualify
/// are left unchanged and reported as skipped. Nodes of replaced loops are
/// swept once all loops have been processed.
///
/// # Errors
///
/// [`Error::NoStart`](crate::Error::NoStart) if the graph has no start node,
/// or a structural error if the graph is inconsistent.
pub fn unroll_loops(graph: &mut Graph, config: &UnrollConfig) -> Result<UnrollReport> {
    unroll_all(graph, "", config, &EventLog::new())
}

/// Unrolls every eligible loop with the default factor and size cap and
/// returns the start node.
///
/// # Errors
///
/// [`Error::NoStart`](crate::Error::NoStart) if the graph has no start node,
/// or a structural error if the graph is inconsistent.
pub fn optimize(graph: &mut Graph) -> Result<NodeId> {
    unroll_loops(graph, &UnrollConfig::default())?;
    graph.entry()
}

/// Loop unrolling pass.
///
/// Takes its factor and size cap from the context's [`UnrollConfig`].
#[derive(Debug, Default)]
pub struct LoopUnrollingPass;

impl LoopUnrollingPass {
    /// Creates a new loop unrolling pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CfgPass for LoopUnrollingPass {
    fn name(&self) -> &'static str {
        "loop-unrolling"
    }

    fn description(&self) -> &'static str {
        "Unrolls counted loops guarded by an induction variable"
    }

    fn should_run(&self, _function: &str, ctx: &CompilerContext) -> bool {
        ctx.config.unroll.enabled
    }

    fn run_on_function(
        &self,
        graph: &mut Graph,
        function: &str,
        ctx: &CompilerContext,
    ) -> Result<bool> {
        let changes = EventLog::new();
        let report = unroll_all(graph, function, &ctx.config.unroll, &changes)?;
        ctx.events.merge(changes);
        Ok(report.unrolled() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountedLoop {
        graph: Graph,
        start: NodeId,
        init: NodeId,
        head: NodeId,
        exit: NodeId,
    }

    /// start -> i = init -> head: if (i <op> bound) { s = s + i; i = i + step } -> _RV0 = s -> return
    fn counted_loop(init: i64, op: BinOpKind, bound: Expr, step: Expr) -> CountedLoop {
        let mut g = Graph::new();
        let ret = g.add_return();
        let exit = g.add_var_assign("_RV0", Expr::temp("s"), ret).unwrap();
        let back = g.add_stub();
        let inc = g.add_var_assign("i", step, back).unwrap();
        let acc = g
            .add_var_assign(
                "s",
                Expr::binop(BinOpKind::Add, Expr::temp("s"), Expr::temp("i")),
                inc,
            )
            .unwrap();
        let head = g
            .add_if(Expr::binop(op, Expr::temp("i"), bound), acc, exit)
            .unwrap();
        g.substitute_stub(back, head).unwrap();
        let init = g.add_var_assign("i", Expr::constant(init), head).unwrap();
        let start = g.add_start(init).unwrap();
        CountedLoop {
            graph: g,
            start,
            init,
            head,
            exit,
        }
    }

    fn add(var: &str, c: i64) -> Expr {
        Expr::binop(BinOpKind::Add, Expr::temp(var), Expr::constant(c))
    }

    fn sub(var: &str, c: i64) -> Expr {
        Expr::binop(BinOpKind::Sub, Expr::temp(var), Expr::constant(c))
    }

    /// Follows single-successor nodes from `from` until `until`, counting them.
    fn chain_length(g: &Graph, from: NodeId, until: NodeId) -> usize {
        let mut node = from;
        let mut count = 0;
        while node != until {
            count += 1;
            assert_eq!(g.successors(node).len(), 1, "{node} is not straight-line");
            node = g.successors(node)[0];
            assert!(count <= g.node_bound(), "walked into a cycle");
        }
        count
    }

    #[test]
    fn test_counting_up_loop() {
        let CountedLoop {
            mut graph,
            start,
            init,
            head,
            exit,
        } = counted_loop(0, BinOpKind::Lt, Expr::temp("n"), add("i", 1));

        let report = unroll_loops(&mut graph, &UnrollConfig::default()).unwrap();
        assert_eq!(report.unrolled(), 1);
        let (original, UnrollOutcome::Unrolled { header }) = report.loops[0] else {
            panic!("loop was not unrolled: {report:?}");
        };
        assert_eq!(original, head);
        graph.verify().unwrap();

        assert!(!graph.contains(head));
        assert_eq!(graph.successors(start), &[init]);
        assert_eq!(graph.successors(init), &[header]);

        let expected = Expr::binop(
            BinOpKind::Lt,
            Expr::binop(
                BinOpKind::Add,
                Expr::temp("i"),
                Expr::binop(BinOpKind::Mul, Expr::constant(1), Expr::constant(4)),
            ),
            Expr::temp("n"),
        );
        assert_eq!(graph.kind(header), Some(&NodeKind::If { cond: expected }));

        let [chain, epilogue] = graph.successors(header) else {
            panic!("guard must have two successors");
        };
        assert_eq!(chain_length(&graph, *chain, header), 10);

        let original_guard = Expr::binop(BinOpKind::Lt, Expr::temp("i"), Expr::temp("n"));
        assert_eq!(
            graph.kind(*epilogue),
            Some(&NodeKind::If {
                cond: original_guard
            })
        );
        let [epilogue_body, epilogue_exit] = graph.successors(*epilogue) else {
            panic!("epilogue must have two successors");
        };
        assert_eq!(*epilogue_exit, exit);
        assert_eq!(chain_length(&graph, *epilogue_body, *epilogue), 2);

        // start, init, guard, 10 chain nodes, epilogue + 2, _RV0, return
        assert_eq!(graph.node_count(), 18);
        assert_eq!(report.swept, 3);
    }

    #[test]
    fn test_counting_down_keeps_operator() {
        let CountedLoop {
            mut graph, head, ..
        } = counted_loop(10, BinOpKind::Gt, Expr::constant(0), sub("i", 1));

        let dominators = Dominators::compute(&graph).unwrap();
        let natural = detect_loops(&graph, &dominators).loops()[0].clone();
        let outcome =
            unroll_loop(&mut graph, head, &natural.body, &UnrollConfig::default()).unwrap();
        let UnrollOutcome::Unrolled { header } = outcome else {
            panic!("loop was not unrolled: {outcome:?}");
        };

        let Some(NodeKind::If {
            cond: Expr::BinOp { op, left, right },
        }) = graph.kind(header)
        else {
            panic!("new header is not a guard");
        };
        assert_eq!(*op, BinOpKind::Gt);
        assert_eq!(**right, Expr::constant(0));
        assert_eq!(
            **left,
            Expr::binop(
                BinOpKind::Add,
                Expr::temp("i"),
                Expr::binop(BinOpKind::Mul, Expr::constant(-1), Expr::constant(4)),
            )
        );
        graph.sweep_unreachable();
        graph.verify().unwrap();
    }

    #[test]
    fn test_skip_reasons() {
        let cases = [
            (
                counted_loop(0, BinOpKind::Gt, Expr::constant(9), add("i", 1)),
                SkipReason::DirectionMismatch,
            ),
            (
                counted_loop(
                    1,
                    BinOpKind::Lt,
                    Expr::constant(100),
                    Expr::binop(BinOpKind::Mul, Expr::temp("i"), Expr::constant(2)),
                ),
                SkipReason::NoInductionVariable,
            ),
            (
                counted_loop(0, BinOpKind::Lt, Expr::temp("s"), add("i", 1)),
                SkipReason::VariantBound,
            ),
            (
                counted_loop(0, BinOpKind::Eq, Expr::constant(9), add("i", 1)),
                SkipReason::DirectionMismatch,
            ),
        ];

        for (CountedLoop { mut graph, head, .. }, expected) in cases {
            let before = graph.node_count();
            let report = unroll_loops(&mut graph, &UnrollConfig::default()).unwrap();
            assert_eq!(report.loops, vec![(head, UnrollOutcome::Skipped(expected))]);
            assert_eq!(graph.node_count(), before);
            graph.verify().unwrap();
        }
    }

    #[test]
    fn test_size_and_factor_limits() {
        let CountedLoop { mut graph, head, .. } =
            counted_loop(0, BinOpKind::Lt, Expr::temp("n"), add("i", 1));

        let tiny = UnrollConfig::new(5, 2);
        let report = unroll_loops(&mut graph, &tiny).unwrap();
        assert_eq!(
            report.loops,
            vec![(head, UnrollOutcome::Skipped(SkipReason::TooLarge))]
        );

        let zero = UnrollConfig::new(0, 15);
        let report = unroll_loops(&mut graph, &zero).unwrap();
        assert_eq!(
            report.loops,
            vec![(head, UnrollOutcome::Skipped(SkipReason::ZeroFactor))]
        );
    }

    #[test]
    fn test_self_loop_is_not_a_guard() {
        let mut g = Graph::new();
        let spin = g.add_self_loop();
        let start = g.add_start(spin).unwrap();

        let report = unroll_loops(&mut g, &UnrollConfig::default()).unwrap();
        assert_eq!(
            report.loops,
            vec![(spin, UnrollOutcome::Skipped(SkipReason::NotAGuard))]
        );
        assert_eq!(g.successors(start), &[spin]);
        assert_eq!(g.successors(spin), &[spin]);
    }

    #[test]
    fn test_factor_one_has_no_lookahead() {
        let CountedLoop { mut graph, .. } =
            counted_loop(0, BinOpKind::Leq, Expr::constant(7), add("i", 2));

        let report = unroll_loops(&mut graph, &UnrollConfig::new(1, 15)).unwrap();
        let (_, UnrollOutcome::Unrolled { header }) = report.loops[0] else {
            panic!("loop was not unrolled");
        };
        let [chain, _] = graph.successors(header) else {
            panic!("guard must have two successors");
        };
        assert_eq!(chain_length(&graph, *chain, header), 2);
        graph.verify().unwrap();
    }

    #[test]
    fn test_copies_leave_no_stubs_behind() {
        let CountedLoop {
            mut graph, head, ..
        } = counted_loop(0, BinOpKind::Lt, Expr::temp("n"), add("i", 1));
        let acc = graph.successors(head)[0];
        let inc = graph.successors(acc)[0];
        let body = BTreeSet::from([head, acc, inc]);

        // Straight-line copies leave their placeholders unreferenced.
        let outcome = unroll_loop(&mut graph, head, &body, &UnrollConfig::default()).unwrap();
        assert!(outcome.is_unrolled());
        assert!(graph
            .nodes()
            .all(|id| !matches!(graph.kind(id), Some(NodeKind::Stub))));
        graph.verify().unwrap();
    }

    #[test]
    fn test_pass_records_events() {
        let CountedLoop { mut graph, head, .. } =
            counted_loop(0, BinOpKind::Lt, Expr::temp("n"), add("i", 1));
        let ctx = CompilerContext::new();

        let pass = LoopUnrollingPass::new();
        assert!(pass.run_on_function(&mut graph, "sum", &ctx).unwrap());
        assert_eq!(ctx.events.count_of(EventKind::LoopUnrolled), 1);
        assert_eq!(ctx.events.count_of(EventKind::NodesSwept), 1);
        let event = ctx.events.iter().next().unwrap();
        assert_eq!(event.node, Some(head));
    }

    #[test]
    fn test_optimize_returns_start() {
        let CountedLoop {
            mut graph, start, ..
        } = counted_loop(0, BinOpKind::Lt, Expr::temp("n"), add("i", 1));
        assert_eq!(optimize(&mut graph).unwrap(), start);
    }
}
