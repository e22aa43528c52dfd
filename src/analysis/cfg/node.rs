//! Control-flow node kinds and their payloads.
//!
//! A node is one IR statement (or a straight-line [`NodeKind::Block`] of
//! them) plus its edges. The kind determines how many successors the node
//! has and which variables it reads and writes:
//!
//! | Kind        | Successors              | defs                | uses                     |
//! |-------------|-------------------------|---------------------|--------------------------|
//! | `Start`     | 1                       | -                   | -                        |
//! | `VarAssign` | 1                       | target              | value                    |
//! | `MemAssign` | 1                       | target if a temp    | value, address temps     |
//! | `Call`      | 1                       | results             | target, arguments        |
//! | `If`        | 2 (true, false)         | -                   | condition                |
//! | `Return`    | 0                       | -                   | -                        |
//! | `SelfLoop`  | 1 (itself)              | -                   | -                        |
//! | `Block`     | 1                       | union of statements | upward-exposed uses      |
//! | `Stub`      | 0                       | -                   | -                        |

use std::{collections::BTreeSet, fmt};

use strum::IntoStaticStr;

use crate::{
    ir::{CallStmt, Expr},
    utils::graph::NodeId,
    Error, Result,
};

/// A straight-line statement allowed inside a [`NodeKind::Block`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockStmt {
    /// `target = value`
    VarAssign {
        /// Assigned temporary
        target: String,
        /// Source expression
        value: Expr,
    },
    /// `[target] = value`
    MemAssign {
        /// Written location, normally [`Expr::Mem`]
        target: Expr,
        /// Source expression
        value: Expr,
    },
    /// A call statement.
    Call(CallStmt),
}

impl BlockStmt {
    fn defs(&self) -> BTreeSet<String> {
        match self {
            BlockStmt::VarAssign { target, .. } => BTreeSet::from([target.clone()]),
            BlockStmt::MemAssign { target, .. } => mem_target_defs(target),
            BlockStmt::Call(call) => call.defs(),
        }
    }

    fn uses(&self) -> BTreeSet<String> {
        match self {
            BlockStmt::VarAssign { value, .. } => value.uses(),
            BlockStmt::MemAssign { target, value } => mem_assign_uses(target, value),
            BlockStmt::Call(call) => call.uses(),
        }
    }
}

impl TryFrom<NodeKind> for BlockStmt {
    type Error = Error;

    fn try_from(kind: NodeKind) -> Result<Self> {
        match kind {
            NodeKind::VarAssign { target, value } => Ok(BlockStmt::VarAssign { target, value }),
            NodeKind::MemAssign { target, value } => Ok(BlockStmt::MemAssign { target, value }),
            NodeKind::Call(call) => Ok(BlockStmt::Call(call)),
            other => Err(Error::UnsupportedInBlock(other.name())),
        }
    }
}

impl fmt::Display for BlockStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockStmt::VarAssign { target, value } => write!(f, "{target} = {value}"),
            BlockStmt::MemAssign { target, value } => write_mem_assign(f, target, value),
            BlockStmt::Call(call) => write!(f, "{call}"),
        }
    }
}

/// The kind and payload of a control-flow node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum NodeKind {
    /// The unique entry of a function body.
    Start,
    /// Assignment to a temporary.
    VarAssign {
        /// Assigned temporary
        target: String,
        /// Source expression
        value: Expr,
    },
    /// Store through an address.
    ///
    /// When the target is a bare temporary the store behaves like a variable
    /// assignment; any other target is treated as a memory location.
    MemAssign {
        /// Written location, normally [`Expr::Mem`]
        target: Expr,
        /// Source expression
        value: Expr,
    },
    /// A call statement.
    Call(CallStmt),
    /// Two-way branch; successors are ordered (true, false).
    If {
        /// Branch condition
        cond: Expr,
    },
    /// Function exit.
    Return,
    /// An infinite loop that jumps to itself.
    SelfLoop,
    /// A sequence of straight-line statements executed in order.
    Block(Vec<BlockStmt>),
    /// A placeholder for a node that does not exist yet.
    Stub,
}

impl NodeKind {
    /// Returns the kind name, used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Returns the number of explicit successors this kind takes.
    ///
    /// A self-loop's only successor is itself and is linked implicitly, so it
    /// takes no explicit successor.
    #[must_use]
    pub const fn arity(&self) -> usize {
        match self {
            NodeKind::Return | NodeKind::SelfLoop | NodeKind::Stub => 0,
            NodeKind::If { .. } => 2,
            NodeKind::Start
            | NodeKind::VarAssign { .. }
            | NodeKind::MemAssign { .. }
            | NodeKind::Call(_)
            | NodeKind::Block(_) => 1,
        }
    }

    /// Returns `true` for the assignment kinds that dead-code elimination may remove.
    #[must_use]
    pub const fn is_assignment(&self) -> bool {
        matches!(self, NodeKind::VarAssign { .. } | NodeKind::MemAssign { .. })
    }

    /// Returns the variable an assignment defines, if any.
    ///
    /// Stores to memory define no variable.
    #[must_use]
    pub fn defined_variable(&self) -> Option<&str> {
        match self {
            NodeKind::VarAssign { target, .. } => Some(target),
            NodeKind::MemAssign { target, .. } => target.as_temp(),
            _ => None,
        }
    }

    /// Variables written by a node of this kind.
    #[must_use]
    pub fn defs(&self) -> BTreeSet<String> {
        match self {
            NodeKind::VarAssign { target, .. } => BTreeSet::from([target.clone()]),
            NodeKind::MemAssign { target, .. } => mem_target_defs(target),
            NodeKind::Call(call) => call.defs(),
            NodeKind::Block(stmts) => stmts.iter().flat_map(BlockStmt::defs).collect(),
            NodeKind::Start
            | NodeKind::If { .. }
            | NodeKind::Return
            | NodeKind::SelfLoop
            | NodeKind::Stub => BTreeSet::new(),
        }
    }

    /// Variables read by a node of this kind before it writes them.
    #[must_use]
    pub fn uses(&self) -> BTreeSet<String> {
        match self {
            NodeKind::VarAssign { value, .. } => value.uses(),
            NodeKind::MemAssign { target, value } => mem_assign_uses(target, value),
            NodeKind::Call(call) => call.uses(),
            NodeKind::If { cond } => cond.uses(),
            NodeKind::Block(stmts) => {
                let mut defined = BTreeSet::new();
                let mut exposed = BTreeSet::new();
                for stmt in stmts {
                    exposed.extend(stmt.uses().into_iter().filter(|v| !defined.contains(v)));
                    defined.extend(stmt.defs());
                }
                exposed
            }
            NodeKind::Start | NodeKind::Return | NodeKind::SelfLoop | NodeKind::Stub => {
                BTreeSet::new()
            }
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Start => f.write_str("start"),
            NodeKind::VarAssign { target, value } => write!(f, "{target} = {value}"),
            NodeKind::MemAssign { target, value } => write_mem_assign(f, target, value),
            NodeKind::Call(call) => write!(f, "{call}"),
            NodeKind::If { cond } => write!(f, "if {cond}"),
            NodeKind::Return => f.write_str("return"),
            NodeKind::SelfLoop => f.write_str("loop"),
            NodeKind::Block(stmts) => {
                for (i, stmt) in stmts.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "{stmt}")?;
                }
                Ok(())
            }
            NodeKind::Stub => f.write_str("stub"),
        }
    }
}

fn mem_target_defs(target: &Expr) -> BTreeSet<String> {
    target.as_temp().map(str::to_string).into_iter().collect()
}

fn mem_assign_uses(target: &Expr, value: &Expr) -> BTreeSet<String> {
    let mut uses = value.uses();
    // A temp target is written, not read; anything else is an address computation
    if target.as_temp().is_none() {
        target.collect_uses(&mut uses);
    }
    uses
}

fn write_mem_assign(f: &mut fmt::Formatter<'_>, target: &Expr, value: &Expr) -> fmt::Result {
    match target {
        Expr::Mem(_) | Expr::Temp(_) => write!(f, "{target} = {value}"),
        address => write!(f, "[{address}] = {value}"),
    }
}

/// A node stored in the graph arena.
///
/// Edges live on the nodes themselves: `successors` is the authoritative
/// ordered edge list and `predecessors` is the derived back-reference set,
/// maintained by every [`Graph`](crate::Graph) operation that changes a
/// successor.
#[derive(Debug, Clone)]
pub struct CfgNode {
    pub(crate) kind: NodeKind,
    pub(crate) successors: Vec<NodeId>,
    pub(crate) predecessors: Vec<NodeId>,
}

impl CfgNode {
    /// The node's kind and payload.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Outgoing edges in slot order.
    #[must_use]
    pub fn successors(&self) -> &[NodeId] {
        &self.successors
    }

    /// Distinct nodes with an edge into this node.
    #[must_use]
    pub fn predecessors(&self) -> &[NodeId] {
        &self.predecessors
    }
}
