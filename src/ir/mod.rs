//! Lowered IR payloads carried by control-flow nodes.
//!
//! The control-flow graph does not own a statement language of its own:
//! assignments, branch conditions and calls are described with the types in
//! this module. Only the properties dataflow needs are exposed here, namely
//! which temporaries an expression or call reads and writes.

mod call;
mod expr;

pub use call::CallStmt;
pub use expr::{BinOpKind, Expr, RETURN_TEMP_PREFIX};
