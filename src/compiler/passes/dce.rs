//! Dead code elimination.
//!
//! Removes assignments whose result is never observed. One round computes
//! liveness once over the whole graph and then splices out every reachable
//! `VarAssign` or `MemAssign` whose defined variable is not live right after
//! it. Removing an assignment can make the assignments feeding it dead too,
//! so a single round is not a fixpoint: `y = 15; x = y; return` loses `x = y`
//! in the first round and `y = 15` in the second.
//!
//! Calls are always kept since they may have effects, and so are stores to
//! memory (`[addr] = v`), which define no variable.

use tracing::debug;

use crate::{
    analysis::{dataflow::LiveVariables, Graph},
    compiler::{CfgPass, CompilerContext, EventKind, EventLog},
    utils::graph::NodeId,
    Result,
};

/// Dead code elimination pass.
///
/// Runs one elimination round per invocation; the scheduler repeats the
/// cleanup phase until no round changes anything.
#[derive(Debug, Default)]
pub struct DeadCodeEliminationPass;

impl DeadCodeEliminationPass {
    /// Creates a new dead code elimination pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Runs one elimination round on `graph`, recording each removal.
    ///
    /// Returns the number of removed nodes.
    ///
    /// # Errors
    ///
    /// [`Error::NoStart`](crate::Error::NoStart) if the graph has no start node.
    pub fn eliminate(graph: &mut Graph, function: &str, changes: &EventLog) -> Result<usize> {
        let liveness = LiveVariables::new(graph).analyze(graph)?;
        let reachable = graph.reachable();

        let candidates: Vec<NodeId> = graph
            .nodes()
            .filter(|node| reachable.contains(node.index()))
            .filter(|&node| {
                graph.kind(node).is_some_and(|kind| {
                    kind.is_assignment()
                        && kind
                            .defined_variable()
                            .is_some_and(|var| !liveness.is_live_out(node, var))
                })
            })
            .collect();

        let mut removed = 0;
        for node in candidates {
            // Earlier removals can close a dead cycle onto this node.
            if graph.successors(node) == [node] {
                continue;
            }
            let description = graph.kind(node).map(ToString::to_string).unwrap_or_default();
            graph.remove_node(node)?;
            changes
                .record(EventKind::InstructionRemoved)
                .at(function, node)
                .message(description);
            removed += 1;
        }

        if removed > 0 {
            debug!(function, removed, "removed dead assignments");
        }
        Ok(removed)
    }
}

impl CfgPass for DeadCodeEliminationPass {
    fn name(&self) -> &'static str {
        "dead-code-elimination"
    }

    fn description(&self) -> &'static str {
        "Removes assignments whose value is never used"
    }

    fn should_run(&self, _function: &str, ctx: &CompilerContext) -> bool {
        ctx.config.cleanup.enabled
    }

    fn run_on_function(
        &self,
        graph: &mut Graph,
        function: &str,
        ctx: &CompilerContext,
    ) -> Result<bool> {
        let changes = EventLog::new();

        if ctx.config.cleanup.sweep_unreachable {
            let swept = graph.sweep_unreachable();
            if swept > 0 {
                changes
                    .record(EventKind::NodesSwept)
                    .function(function)
                    .message(format!("{swept} unreachable nodes"));
            }
        }
        Self::eliminate(graph, function, &changes)?;

        let changed = !changes.is_empty();
        if changed {
            ctx.events.merge(changes);
        }
        Ok(changed)
    }
}

/// Runs one round of dead code elimination on `graph`.
///
/// Returns the number of removed nodes. Liveness is computed once per call,
/// so a second call may remove more.
///
/// # Errors
///
/// [`Error::NoStart`](crate::Error::NoStart) if the graph has no start node.
pub fn eliminate_dead_code(graph: &mut Graph) -> Result<usize> {
    DeadCodeEliminationPass::eliminate(graph, "", &EventLog::new())
}

/// Repeats dead code elimination until a round removes nothing or
/// `max_iterations` rounds have run.
///
/// Returns the total number of removed nodes.
///
/// # Errors
///
/// [`Error::NoStart`](crate::Error::NoStart) if the graph has no start node.
pub fn dce_to_fixpoint(graph: &mut Graph, max_iterations: usize) -> Result<usize> {
    let mut total = 0;
    for _ in 0..max_iterations {
        let removed = eliminate_dead_code(graph)?;
        if removed == 0 {
            break;
        }
        total += removed;
    }
    Ok(total)
}

/// Runs one round of dead code elimination and returns the start node.
///
/// # Errors
///
/// [`Error::NoStart`](crate::Error::NoStart) if the graph has no start node.
pub fn optimize(graph: &mut Graph) -> Result<NodeId> {
    eliminate_dead_code(graph)?;
    graph.entry()
}
