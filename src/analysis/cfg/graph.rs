//! Arena-backed control-flow graph with node-embedded edges.

use std::collections::BTreeSet;

use tracing::trace;

use crate::{
    analysis::cfg::node::{BlockStmt, CfgNode, NodeKind},
    ir::{CallStmt, Expr},
    utils::{
        graph::{algorithms::dfs, GraphBase, NodeId, Predecessors, Successors},
        BitSet,
    },
    Error, Result,
};

/// The control-flow graph of one function body.
///
/// Nodes live in an arena and are addressed by [`NodeId`]. Each node stores
/// its ordered successor list and the set of its predecessors; every
/// operation that changes a successor also updates the affected predecessor
/// sets before returning, so the two relations always mirror each other:
/// `b ∈ successors(a)` exactly when `a ∈ predecessors(b)`.
///
/// Removing a node vacates its slot. Slots are never reused, so ids held by a
/// pass stay valid (or become detectably vacant) across rewrites.
///
/// # Building graphs
///
/// Builders take the node's successors as arguments, so acyclic code is
/// built bottom-up from the exits. Cycles are closed with a [`NodeKind::Stub`]
/// placeholder that is later resolved with [`Graph::substitute_stub`]:
///
/// ```rust
/// use cfgopt::{Graph, ir::{BinOpKind, Expr}};
///
/// // x = 0; while (x < 10) { x = x + 1 }; return
/// let mut g = Graph::new();
/// let ret = g.add_return();
/// let back = g.add_stub();
/// let inc = g.add_var_assign(
///     "x",
///     Expr::binop(BinOpKind::Add, Expr::temp("x"), Expr::constant(1)),
///     back,
/// )?;
/// let head = g.add_if(
///     Expr::binop(BinOpKind::Lt, Expr::temp("x"), Expr::constant(10)),
///     inc,
///     ret,
/// )?;
/// g.substitute_stub(back, head)?;
/// let init = g.add_var_assign("x", Expr::constant(0), head)?;
/// g.add_start(init)?;
///
/// g.verify()?;
/// assert_eq!(g.successors(inc), &[head]);
/// assert_eq!(g.predecessors(head), &[inc, init]);
/// # Ok::<(), cfgopt::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Option<CfgNode>>,
    start: Option<NodeId>,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ----- construction -----

    /// Adds the start node pointing at `next`.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateStart`] if the graph already has one, or
    /// [`Error::InvalidNode`] if `next` is not a node of this graph.
    pub fn add_start(&mut self, next: NodeId) -> Result<NodeId> {
        if let Some(existing) = self.start {
            return Err(Error::DuplicateStart(existing));
        }
        let id = self.add_node(NodeKind::Start, &[next])?;
        self.start = Some(id);
        Ok(id)
    }

    /// Adds `target = value` flowing into `next`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `next` is not a node of this graph.
    pub fn add_var_assign(
        &mut self,
        target: impl Into<String>,
        value: Expr,
        next: NodeId,
    ) -> Result<NodeId> {
        let kind = NodeKind::VarAssign {
            target: target.into(),
            value,
        };
        self.add_node(kind, &[next])
    }

    /// Adds a store `target = value` flowing into `next`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `next` is not a node of this graph.
    pub fn add_mem_assign(&mut self, target: Expr, value: Expr, next: NodeId) -> Result<NodeId> {
        self.add_node(NodeKind::MemAssign { target, value }, &[next])
    }

    /// Adds a call flowing into `next`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `next` is not a node of this graph.
    pub fn add_call(&mut self, call: CallStmt, next: NodeId) -> Result<NodeId> {
        self.add_node(NodeKind::Call(call), &[next])
    }

    /// Adds a branch on `cond` with the given (true, false) successors.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if either branch target is not a node of this graph.
    pub fn add_if(&mut self, cond: Expr, on_true: NodeId, on_false: NodeId) -> Result<NodeId> {
        self.add_node(NodeKind::If { cond }, &[on_true, on_false])
    }

    /// Adds a function exit.
    pub fn add_return(&mut self) -> NodeId {
        self.alloc(NodeKind::Return, Vec::new())
    }

    /// Adds an infinite loop node whose only successor is itself.
    pub fn add_self_loop(&mut self) -> NodeId {
        let id = self.next_id();
        let node = self.alloc(NodeKind::SelfLoop, vec![id]);
        self.link(node, node);
        node
    }

    /// Adds a straight-line block of statements flowing into `next`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedInBlock`] if any statement is a control-transfer kind
    /// (`If`, `Return`, `Start`, `SelfLoop`, `Block` or `Stub`), or
    /// [`Error::InvalidNode`] if `next` is not a node of this graph.
    pub fn add_block(&mut self, stmts: Vec<NodeKind>, next: NodeId) -> Result<NodeId> {
        let stmts = stmts
            .into_iter()
            .map(BlockStmt::try_from)
            .collect::<Result<Vec<_>>>()?;
        self.add_node(NodeKind::Block(stmts), &[next])
    }

    /// Adds a placeholder with no successors.
    pub fn add_stub(&mut self) -> NodeId {
        self.alloc(NodeKind::Stub, Vec::new())
    }

    /// Adds a node of any kind with explicit successors and links its predecessors.
    ///
    /// Self-loops take no explicit successor; their self edge is created here.
    ///
    /// # Errors
    ///
    /// [`Error::ArityMismatch`] if the successor count does not fit the kind,
    /// [`Error::InvalidNode`] if a successor does not exist, and
    /// [`Error::DuplicateStart`] when adding a second `Start` this way.
    pub fn add_node(&mut self, kind: NodeKind, successors: &[NodeId]) -> Result<NodeId> {
        let id = self.next_id();
        if successors.len() != kind.arity() {
            return Err(Error::ArityMismatch {
                node: id,
                kind: kind.name(),
                expected: kind.arity(),
                found: successors.len(),
            });
        }
        if matches!(kind, NodeKind::Start) {
            if let Some(existing) = self.start {
                return Err(Error::DuplicateStart(existing));
            }
        }
        for &succ in successors {
            self.require(succ)?;
        }

        let is_start = matches!(kind, NodeKind::Start);
        let is_self_loop = matches!(kind, NodeKind::SelfLoop);
        let mut succs = successors.to_vec();
        if is_self_loop {
            succs.push(id);
        }

        let node = self.alloc(kind, succs.clone());
        for succ in succs {
            self.link(node, succ);
        }
        if is_start {
            self.start = Some(node);
        }
        Ok(node)
    }

    /// Returns a structurally new copy of `node` with the given successors.
    ///
    /// The copy has the same kind and payload. Its successors receive it as a
    /// predecessor, but nothing points at the copy yet. Cloning a self-loop
    /// yields a self-loop on the copy and takes no successors.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `node` or a successor does not exist,
    /// [`Error::ArityMismatch`] if the successor count does not fit the kind,
    /// and [`Error::DuplicateStart`] when cloning the start node.
    pub fn clone_node(&mut self, node: NodeId, successors: &[NodeId]) -> Result<NodeId> {
        let kind = self.require(node)?.kind.clone();
        self.add_node(kind, successors)
    }

    // ----- queries -----

    /// The entry node, if one has been added.
    #[must_use]
    pub fn start(&self) -> Option<NodeId> {
        self.start
    }

    /// The entry node.
    ///
    /// # Errors
    ///
    /// [`Error::NoStart`] if no start node has been added.
    pub fn entry(&self) -> Result<NodeId> {
        self.start.ok_or(Error::NoStart)
    }

    /// Returns the node stored at `id`.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&CfgNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    /// Returns the kind and payload of `id`.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(CfgNode::kind)
    }

    /// Returns `true` if `id` refers to a live node.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Number of arena slots, live or vacant.
    #[must_use]
    pub fn node_bound(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates over live node ids in slot order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_some())
            .map(|(i, _)| NodeId::new(i))
    }

    /// Outgoing edges of `id` in slot order; empty for vacant ids.
    #[must_use]
    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], CfgNode::successors)
    }

    /// Distinct predecessors of `id`; empty for vacant ids.
    #[must_use]
    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], CfgNode::predecessors)
    }

    /// Variables written by `id`.
    #[must_use]
    pub fn defs(&self, id: NodeId) -> BTreeSet<String> {
        self.kind(id).map(NodeKind::defs).unwrap_or_default()
    }

    /// Variables read by `id`.
    #[must_use]
    pub fn uses(&self, id: NodeId) -> BTreeSet<String> {
        self.kind(id).map(NodeKind::uses).unwrap_or_default()
    }

    /// Nodes reachable from the start node, as a set over arena slots.
    #[must_use]
    pub fn reachable(&self) -> BitSet {
        let mut set = BitSet::new(self.node_bound());
        if let Some(start) = self.start {
            for node in dfs(self, start) {
                set.insert(node.index());
            }
        }
        set
    }

    // ----- rewiring -----

    /// Redirects every edge `node -> old` to `node -> new`.
    ///
    /// # Errors
    ///
    /// [`Error::NotASuccessor`] if `old` is not a successor of `node`,
    /// [`Error::InvalidNode`] if `node` or `new` does not exist, and
    /// [`Error::Inconsistent`] when asked to move a self-loop's edge.
    pub fn replace_successor(&mut self, node: NodeId, old: NodeId, new: NodeId) -> Result<()> {
        self.require(new)?;
        let entry = self.require(node)?;
        if !entry.successors.contains(&old) {
            return Err(Error::NotASuccessor { node, target: old });
        }
        if matches!(entry.kind, NodeKind::SelfLoop) && new != node {
            return Err(structural_error!(
                "self-loop {} must remain its own successor",
                node
            ));
        }
        if old == new {
            return Ok(());
        }

        if let Some(entry) = self.slot_mut(node) {
            for succ in &mut entry.successors {
                if *succ == old {
                    *succ = new;
                }
            }
        }
        self.unlink(node, old);
        self.link(node, new);
        trace!(%node, %old, %new, "replaced successor");
        Ok(())
    }

    /// Redirects the edge in slot `position` of `node` to `new`.
    ///
    /// For `If` nodes position 0 is the true branch and 1 the false branch.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `node` or `new` does not exist, and
    /// [`Error::Inconsistent`] if `position` is out of range or `node` is a self-loop.
    pub fn redirect_edge(&mut self, node: NodeId, position: usize, new: NodeId) -> Result<()> {
        self.require(new)?;
        let entry = self.require(node)?;
        if matches!(entry.kind, NodeKind::SelfLoop) {
            return Err(structural_error!(
                "self-loop {} must remain its own successor",
                node
            ));
        }
        let Some(&old) = entry.successors.get(position) else {
            return Err(structural_error!(
                "{} has no edge in slot {}",
                node,
                position
            ));
        };

        if let Some(entry) = self.slot_mut(node) {
            entry.successors[position] = new;
        }
        self.unlink(node, old);
        self.link(node, new);
        Ok(())
    }

    /// Replaces the placeholder `stub` by `real` and discards the stub.
    ///
    /// Every predecessor recorded on the stub is checked before anything is
    /// changed, so a failed substitution leaves the graph untouched.
    ///
    /// # Errors
    ///
    /// [`Error::NotAStub`] if `stub` is not a stub, [`Error::InvalidNode`] if
    /// either node does not exist, [`Error::UnreferencedStub`] if the stub has
    /// no predecessors, and [`Error::StubLinkMissing`] if a recorded predecessor
    /// no longer has an edge into the stub.
    pub fn substitute_stub(&mut self, stub: NodeId, real: NodeId) -> Result<()> {
        self.require(real)?;
        let entry = self.require(stub)?;
        if !matches!(entry.kind, NodeKind::Stub) {
            return Err(Error::NotAStub(stub));
        }
        if stub == real {
            return Err(structural_error!("stub {} cannot replace itself", stub));
        }

        let preds = entry.predecessors.clone();
        if preds.is_empty() {
            return Err(Error::UnreferencedStub(stub));
        }
        for &pred in &preds {
            if !self.successors(pred).contains(&stub) {
                return Err(Error::StubLinkMissing {
                    stub,
                    predecessor: pred,
                });
            }
        }

        for pred in preds {
            if let Some(entry) = self.slot_mut(pred) {
                for succ in &mut entry.successors {
                    if *succ == stub {
                        *succ = real;
                    }
                }
            }
            self.link(pred, real);
        }
        self.nodes[stub.index()] = None;
        Ok(())
    }

    /// Drops a stub that no node refers to.
    ///
    /// # Errors
    ///
    /// [`Error::NotAStub`] if `stub` is not a stub, [`Error::InvalidNode`] if it
    /// does not exist, and [`Error::Inconsistent`] if it still has predecessors.
    pub fn discard_stub(&mut self, stub: NodeId) -> Result<()> {
        let entry = self.require(stub)?;
        if !matches!(entry.kind, NodeKind::Stub) {
            return Err(Error::NotAStub(stub));
        }
        if !entry.predecessors.is_empty() {
            return Err(structural_error!(
                "stub {} is still referenced by {} node(s)",
                stub,
                entry.predecessors.len()
            ));
        }
        self.nodes[stub.index()] = None;
        Ok(())
    }

    /// Splices `node` out of the graph.
    ///
    /// Every predecessor is redirected to the node's unique successor and the
    /// node's slot is vacated.
    ///
    /// # Errors
    ///
    /// [`Error::StartRemoval`] for the start node, [`Error::InvalidNode`] if the
    /// node does not exist, and [`Error::NonLinearRemoval`] unless the node has
    /// exactly one successor other than itself.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        if self.start == Some(node) {
            return Err(Error::StartRemoval);
        }
        let entry = self.require(node)?;
        let next = match entry.successors.as_slice() {
            [next] if *next != node => *next,
            _ => return Err(Error::NonLinearRemoval(node)),
        };

        let preds = entry.predecessors.clone();
        for pred in preds {
            if let Some(entry) = self.slot_mut(pred) {
                for succ in &mut entry.successors {
                    if *succ == node {
                        *succ = next;
                    }
                }
            }
            self.link(pred, next);
        }
        self.nodes[node.index()] = None;
        self.unlink(node, next);
        trace!(%node, %next, "spliced out node");
        Ok(())
    }

    /// Removes every node not reachable from the start node.
    ///
    /// Returns the number of removed nodes. Edges from removed nodes into
    /// surviving nodes are dropped from the survivors' predecessor sets. A
    /// graph without a start node is left unchanged.
    pub fn sweep_unreachable(&mut self) -> usize {
        if self.start.is_none() {
            return 0;
        }
        let reachable = self.reachable();
        let dead: Vec<NodeId> = self
            .nodes()
            .filter(|n| !reachable.contains(n.index()))
            .collect();

        for &node in &dead {
            self.nodes[node.index()] = None;
        }
        for node in self.nodes.iter_mut().flatten() {
            node.predecessors.retain(|p| reachable.contains(p.index()));
        }
        dead.len()
    }

    // ----- internals -----

    fn next_id(&self) -> NodeId {
        NodeId::new(self.nodes.len())
    }

    fn alloc(&mut self, kind: NodeKind, successors: Vec<NodeId>) -> NodeId {
        let id = self.next_id();
        self.nodes.push(Some(CfgNode {
            kind,
            successors,
            predecessors: Vec::new(),
        }));
        id
    }

    pub(crate) fn require(&self, id: NodeId) -> Result<&CfgNode> {
        self.node(id).ok_or(Error::InvalidNode(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut CfgNode> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Records `from` as a predecessor of `to`.
    fn link(&mut self, from: NodeId, to: NodeId) {
        if let Some(target) = self.slot_mut(to) {
            if !target.predecessors.contains(&from) {
                target.predecessors.push(from);
            }
        }
    }

    /// Drops `from` from `to`'s predecessors once no edge `from -> to` remains.
    fn unlink(&mut self, from: NodeId, to: NodeId) {
        if self.successors(from).contains(&to) {
            return;
        }
        if let Some(target) = self.slot_mut(to) {
            target.predecessors.retain(|&p| p != from);
        }
    }
}

impl Graph {
    /// Checks the structural invariants of the graph.
    ///
    /// Verified properties:
    /// - a start node exists, has no predecessors, and is the only `Start`
    /// - every node has the number of successors its kind requires
    /// - every successor and predecessor refers to a live node
    /// - `b ∈ successors(a)` exactly when `a ∈ predecessors(b)`
    /// - predecessor lists contain no duplicates
    /// - every self-loop has itself as its only successor
    /// - no stub is reachable from the start node
    ///
    /// # Errors
    ///
    /// [`Error::NoStart`] if the start node is missing, otherwise
    /// [`Error::Inconsistent`] describing the first violation found.
    pub fn verify(&self) -> Result<()> {
        let start = self.entry()?;
        if !self.predecessors(start).is_empty() {
            return Err(structural_error!("start node {} has predecessors", start));
        }

        for id in self.nodes() {
            let Some(node) = self.node(id) else {
                continue;
            };
            let expected = node.kind.arity() + usize::from(matches!(node.kind, NodeKind::SelfLoop));
            if node.successors.len() != expected {
                return Err(structural_error!(
                    "{} ({}) has {} successor(s), expected {}",
                    id,
                    node.kind.name(),
                    node.successors.len(),
                    expected
                ));
            }
            if matches!(node.kind, NodeKind::Start) && id != start {
                return Err(structural_error!("second start node {}", id));
            }
            if matches!(node.kind, NodeKind::SelfLoop) && node.successors != [id] {
                return Err(structural_error!("self-loop {} does not target itself", id));
            }

            for &succ in &node.successors {
                if !self.contains(succ) {
                    return Err(structural_error!("{} targets vacant slot {}", id, succ));
                }
                if !self.predecessors(succ).contains(&id) {
                    return Err(structural_error!(
                        "edge {} -> {} missing from predecessor list",
                        id,
                        succ
                    ));
                }
            }

            for (i, &pred) in node.predecessors.iter().enumerate() {
                if !self.contains(pred) {
                    return Err(structural_error!("{} lists vacant predecessor {}", id, pred));
                }
                if !self.successors(pred).contains(&id) {
                    return Err(structural_error!(
                        "{} lists {} as predecessor without an edge",
                        id,
                        pred
                    ));
                }
                if node.predecessors[..i].contains(&pred) {
                    return Err(structural_error!("{} lists {} twice", id, pred));
                }
            }
        }

        let reachable = self.reachable();
        if let Some(stub) = self
            .nodes()
            .find(|&n| reachable.contains(n.index()) && matches!(self.kind(n), Some(NodeKind::Stub)))
        {
            return Err(structural_error!("unresolved stub {} is reachable", stub));
        }
        Ok(())
    }
}

impl GraphBase for Graph {
    fn node_bound(&self) -> usize {
        self.nodes.len()
    }

    fn contains_node(&self, node: NodeId) -> bool {
        self.contains(node)
    }
}

impl Successors for Graph {
    fn successors(&self, node: NodeId) -> &[NodeId] {
        Graph::successors(self, node)
    }
}

impl Predecessors for Graph {
    fn predecessors(&self, node: NodeId) -> &[NodeId] {
        Graph::predecessors(self, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BinOpKind;

    fn assign(g: &mut Graph, var: &str, value: Expr, next: NodeId) -> NodeId {
        g.add_var_assign(var, value, next).unwrap()
    }

    #[test]
    fn test_builders_link_predecessors() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let a = assign(&mut g, "a", Expr::constant(1), ret);
        let b = assign(&mut g, "b", Expr::constant(2), ret);
        let branch = g.add_if(Expr::temp("c"), a, b).unwrap();
        let start = g.add_start(branch).unwrap();

        assert_eq!(g.successors(branch), &[a, b]);
        assert_eq!(g.predecessors(ret), &[a, b]);
        assert_eq!(g.predecessors(branch), &[start]);
        assert!(g.predecessors(start).is_empty());
        g.verify().unwrap();
    }

    #[test]
    fn test_if_with_identical_targets_records_one_predecessor() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let branch = g.add_if(Expr::temp("c"), ret, ret).unwrap();
        g.add_start(branch).unwrap();

        assert_eq!(g.successors(branch), &[ret, ret]);
        assert_eq!(g.predecessors(ret), &[branch]);
        g.verify().unwrap();
    }

    #[test]
    fn test_self_loop_is_its_own_successor() {
        let mut g = Graph::new();
        let spin = g.add_self_loop();
        let start = g.add_start(spin).unwrap();

        assert_eq!(g.successors(spin), &[spin]);
        assert_eq!(g.predecessors(spin), &[spin, start]);
        g.verify().unwrap();
    }

    #[test]
    fn test_replace_successor_updates_both_sides() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let other = g.add_return();
        let a = assign(&mut g, "a", Expr::constant(1), ret);

        g.replace_successor(a, ret, other).unwrap();
        assert_eq!(g.successors(a), &[other]);
        assert!(g.predecessors(ret).is_empty());
        assert_eq!(g.predecessors(other), &[a]);
    }

    #[test]
    fn test_replace_successor_requires_existing_edge() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let other = g.add_return();
        let a = assign(&mut g, "a", Expr::constant(1), ret);

        let err = g.replace_successor(a, other, ret).unwrap_err();
        assert_eq!(err, Error::NotASuccessor { node: a, target: other });
        assert_eq!(g.successors(a), &[ret]);
    }

    #[test]
    fn test_redirect_single_branch_keeps_other_edge() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let other = g.add_return();
        let branch = g.add_if(Expr::temp("c"), ret, ret).unwrap();

        g.redirect_edge(branch, 1, other).unwrap();
        assert_eq!(g.successors(branch), &[ret, other]);
        assert_eq!(g.predecessors(ret), &[branch]);
        assert_eq!(g.predecessors(other), &[branch]);
    }

    #[test]
    fn test_substitute_stub_relinks_all_predecessors() {
        let mut g = Graph::new();
        let stub = g.add_stub();
        let a = assign(&mut g, "a", Expr::constant(1), stub);
        let b = assign(&mut g, "b", Expr::constant(2), stub);
        let ret = g.add_return();

        g.substitute_stub(stub, ret).unwrap();
        assert!(!g.contains(stub));
        assert_eq!(g.successors(a), &[ret]);
        assert_eq!(g.successors(b), &[ret]);
        assert_eq!(g.predecessors(ret), &[a, b]);
    }

    #[test]
    fn test_substitute_requires_stub() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let other = g.add_return();
        assert_eq!(g.substitute_stub(ret, other), Err(Error::NotAStub(ret)));
    }

    #[test]
    fn test_substitute_rejects_unreferenced_stub() {
        let mut g = Graph::new();
        let stub = g.add_stub();
        let ret = g.add_return();

        assert_eq!(
            g.substitute_stub(stub, ret),
            Err(Error::UnreferencedStub(stub))
        );
        assert!(g.contains(stub));
        assert!(g.predecessors(ret).is_empty());
    }

    #[test]
    fn test_discard_stub() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let used = g.add_stub();
        assign(&mut g, "a", Expr::constant(1), used);
        let unused = g.add_stub();

        assert_eq!(g.discard_stub(ret), Err(Error::NotAStub(ret)));
        assert!(matches!(
            g.discard_stub(used),
            Err(Error::Inconsistent { .. })
        ));
        g.discard_stub(unused).unwrap();
        assert!(!g.contains(unused));
        assert!(g.contains(used));
    }

    #[test]
    fn test_substitute_detects_missing_link() {
        let mut g = Graph::new();
        let stub = g.add_stub();
        let ret = g.add_return();
        let a = assign(&mut g, "a", Expr::constant(1), stub);

        // Break the edge behind the graph's back
        g.nodes[a.index()].as_mut().unwrap().successors[0] = ret;

        let err = g.substitute_stub(stub, ret).unwrap_err();
        assert_eq!(
            err,
            Error::StubLinkMissing {
                stub,
                predecessor: a
            }
        );
        assert!(g.contains(stub));
    }

    #[test]
    fn test_clone_node_is_unlinked_copy() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let value = Expr::binop(BinOpKind::Add, Expr::temp("i"), Expr::constant(1));
        let inc = assign(&mut g, "i", value, ret);
        let other = g.add_return();

        let copy = g.clone_node(inc, &[other]).unwrap();
        assert_ne!(copy, inc);
        assert_eq!(g.kind(copy), g.kind(inc));
        assert_eq!(g.successors(copy), &[other]);
        assert!(g.predecessors(copy).is_empty());
        assert_eq!(g.predecessors(ret), &[inc]);
    }

    #[test]
    fn test_clone_rejects_wrong_arity() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let branch = g.add_if(Expr::temp("c"), ret, ret).unwrap();
        let err = g.clone_node(branch, &[ret]).unwrap_err();
        assert!(matches!(
            err,
            Error::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_remove_node_splices() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let x = assign(&mut g, "x", Expr::temp("y"), ret);
        let y = assign(&mut g, "y", Expr::constant(15), x);
        let start = g.add_start(y).unwrap();

        g.remove_node(x).unwrap();
        assert_eq!(g.successors(y), &[ret]);
        assert_eq!(g.predecessors(ret), &[y]);
        assert_eq!(g.remove_node(start), Err(Error::StartRemoval));
        g.verify().unwrap();
    }

    #[test]
    fn test_remove_rejects_branches_and_self_loops() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let branch = g.add_if(Expr::temp("c"), ret, ret).unwrap();
        let spin = g.add_self_loop();
        assert_eq!(g.remove_node(branch), Err(Error::NonLinearRemoval(branch)));
        assert_eq!(g.remove_node(spin), Err(Error::NonLinearRemoval(spin)));
        assert_eq!(g.remove_node(ret), Err(Error::NonLinearRemoval(ret)));
    }

    #[test]
    fn test_duplicate_start_rejected() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let start = g.add_start(ret).unwrap();
        assert_eq!(g.add_start(ret), Err(Error::DuplicateStart(start)));
        assert_eq!(g.clone_node(start, &[ret]), Err(Error::DuplicateStart(start)));
    }

    #[test]
    fn test_block_rejects_control_kinds() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let stmts = vec![
            NodeKind::VarAssign {
                target: "a".into(),
                value: Expr::constant(1),
            },
            NodeKind::Return,
        ];
        assert_eq!(g.add_block(stmts, ret), Err(Error::UnsupportedInBlock("Return")));

        let nested = vec![NodeKind::Block(Vec::new())];
        assert_eq!(g.add_block(nested, ret), Err(Error::UnsupportedInBlock("Block")));
    }

    #[test]
    fn test_sweep_unreachable() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let orphan = assign(&mut g, "dead", Expr::constant(0), ret);
        let live = assign(&mut g, "live", Expr::constant(1), ret);
        g.add_start(live).unwrap();

        assert_eq!(g.sweep_unreachable(), 1);
        assert!(!g.contains(orphan));
        assert_eq!(g.predecessors(ret), &[live]);
        assert_eq!(g.node_count(), 3);
        g.verify().unwrap();
    }

    #[test]
    fn test_missing_nodes_report_invalid() {
        let mut g = Graph::new();
        let ghost = NodeId::new(42);
        assert_eq!(
            g.add_var_assign("x", Expr::constant(1), ghost),
            Err(Error::InvalidNode(ghost))
        );
        assert!(g.successors(ghost).is_empty());
        assert_eq!(g.entry(), Err(Error::NoStart));
    }
}
