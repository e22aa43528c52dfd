use thiserror::Error;

use crate::utils::graph::NodeId;

macro_rules! structural_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Inconsistent {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Inconsistent {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every variant describes a structural problem with a control-flow graph. These are
/// programming errors in the caller or in a prior pass: a malformed graph would lead to
/// silently wrong optimized code, so operations surface them immediately instead of
/// attempting any repair. Situations that are merely "not optimizable" (for example a
/// loop that exceeds the unrolling size cap) are never reported through this type.
///
/// # Error Categories
///
/// ## Edge Manipulation Errors
/// - [`Error::NotASuccessor`] - Redirecting an edge that does not exist
/// - [`Error::StubLinkMissing`] - A stub's recorded predecessor no longer points at it
/// - [`Error::NotAStub`] - Stub substitution requested on a regular node
/// - [`Error::UnreferencedStub`] - Stub substitution requested on a stub nothing points at
/// - [`Error::ArityMismatch`] - Successor list does not fit the node kind
///
/// ## Node Lifecycle Errors
/// - [`Error::StartRemoval`] - Attempted to remove the start node
/// - [`Error::NonLinearRemoval`] - Attempted to splice out a node without a unique successor
/// - [`Error::InvalidNode`] - Reference to a node that is not part of the graph
/// - [`Error::NoStart`] / [`Error::DuplicateStart`] - Entry node missing or duplicated
///
/// ## Construction Errors
/// - [`Error::UnsupportedInBlock`] - Control transfer nested inside a straight-line block
/// - [`Error::Inconsistent`] - Graph verification failure
///
/// # Examples
///
/// ```rust
/// use cfgopt::{Error, Graph};
///
/// let mut graph = Graph::new();
/// let ret = graph.add_return();
/// let start = graph.add_start(ret)?;
///
/// match graph.remove_node(start) {
///     Err(Error::StartRemoval) => println!("the entry node stays"),
///     Err(e) => println!("Other error: {e}"),
///     Ok(()) => unreachable!(),
/// }
/// # Ok::<(), cfgopt::Error>(())
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Edge manipulation errors
    /// A successor redirection named an edge that does not exist.
    ///
    /// Raised by [`Graph::replace_successor`](crate::Graph::replace_successor) when
    /// `target` is not currently one of `node`'s successors.
    #[error("{target} is not a successor of {node}")]
    NotASuccessor {
        /// The node whose successor list was searched
        node: NodeId,
        /// The successor that was expected to be present
        target: NodeId,
    },

    /// A predecessor recorded on a stub no longer points at the stub.
    ///
    /// Stub substitution relinks every recorded predecessor atomically; a missing link
    /// means the stub was rewired behind the graph's back.
    #[error("stub {stub} lists {predecessor} as predecessor, but the edge is missing")]
    StubLinkMissing {
        /// The stub being substituted
        stub: NodeId,
        /// The predecessor whose edge was expected
        predecessor: NodeId,
    },

    /// Stub substitution was requested for a node that is not a stub.
    #[error("{0} is not a stub node")]
    NotAStub(NodeId),

    /// Stub substitution was requested for a stub with no predecessors.
    ///
    /// A stub that nothing refers to has no edges to relink; it should be
    /// dropped with [`Graph::discard_stub`](crate::Graph::discard_stub) instead.
    #[error("stub {0} has no predecessors to substitute")]
    UnreferencedStub(NodeId),

    /// A successor list does not match the arity required by the node kind.
    #[error("{node} ({kind}) expects {expected} successor(s), found {found}")]
    ArityMismatch {
        /// The offending node
        node: NodeId,
        /// Name of the node kind
        kind: &'static str,
        /// Number of successors required by the kind
        expected: usize,
        /// Number of successors supplied
        found: usize,
    },

    // Node lifecycle errors
    /// The start node can never be removed from a graph.
    #[error("the start node cannot be removed")]
    StartRemoval,

    /// Only nodes with exactly one successor (other than themselves) can be spliced out.
    #[error("{0} cannot be spliced out: it has no unique successor")]
    NonLinearRemoval(NodeId),

    /// The node identifier does not refer to a live node of this graph.
    #[error("{0} is not a node of this graph")]
    InvalidNode(NodeId),

    /// The graph has no start node.
    #[error("the graph has no start node")]
    NoStart,

    /// A second start node was added to a graph that already has one.
    #[error("the graph already has a start node ({0})")]
    DuplicateStart(NodeId),

    // Construction errors
    /// A node kind that transfers control was placed inside a straight-line block.
    ///
    /// Blocks may only contain variable assignments, memory assignments and calls.
    #[error("{0} nodes are not allowed inside a block")]
    UnsupportedInBlock(&'static str),

    /// Graph verification found a structural inconsistency.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the violated invariant
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Inconsistent graph - {file}:{line}: {message}")]
    Inconsistent {
        /// The message to be printed for the Inconsistent error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },
}
