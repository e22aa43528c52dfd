//! Call statements.

use std::{collections::BTreeSet, fmt};

use crate::ir::Expr;

/// A function call executed for its effect and, optionally, its results.
///
/// Calls are opaque to the optimizer: they are never removed, and every
/// temporary in their target and arguments is read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallStmt {
    /// The callee, usually an [`Expr::Name`].
    pub target: Expr,
    /// Argument expressions, evaluated left to right.
    pub args: Vec<Expr>,
    /// Temporaries receiving the callee's return values.
    pub results: Vec<String>,
}

impl CallStmt {
    /// Creates a call to the named function with no result temporaries.
    #[must_use]
    pub fn new(function: impl Into<String>, args: Vec<Expr>) -> Self {
        Self {
            target: Expr::name(function),
            args,
            results: Vec::new(),
        }
    }

    /// Sets the temporaries receiving the return values.
    #[must_use]
    pub fn with_results(mut self, results: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.results = results.into_iter().map(Into::into).collect();
        self
    }

    /// Temporaries written by the call.
    #[must_use]
    pub fn defs(&self) -> BTreeSet<String> {
        self.results.iter().cloned().collect()
    }

    /// Temporaries read by the call.
    #[must_use]
    pub fn uses(&self) -> BTreeSet<String> {
        let mut out = self.target.uses();
        for arg in &self.args {
            arg.collect_uses(&mut out);
        }
        out
    }
}

impl fmt::Display for CallStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.results.is_empty() {
            write!(f, "{} = ", self.results.join(", "))?;
        }
        write!(f, "{}(", self.target)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}
