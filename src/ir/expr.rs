//! Side-effect-free IR expressions.
//!
//! Expressions appear as payloads of control-flow nodes: the right-hand side
//! of assignments, memory addresses, branch conditions and call operands.
//! They are trees of constants, temporaries, global names, memory loads and
//! binary operations. Calls are statements, not expressions, so evaluating an
//! expression never has an effect beyond reading temporaries and memory.

use std::{collections::BTreeSet, fmt};

use strum::{EnumIter, IntoStaticStr};

/// Prefix of the temporaries that carry a function's return values.
///
/// The caller reads these after the callee returns, so they are live at every
/// exit of the function even though no node inside it uses them.
pub const RETURN_TEMP_PREFIX: &str = "_RV";

/// Binary operators of the IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr, strum::Display)]
pub enum BinOpKind {
    /// Integer addition
    #[strum(to_string = "+")]
    Add,
    /// Integer subtraction
    #[strum(to_string = "-")]
    Sub,
    /// Integer multiplication
    #[strum(to_string = "*")]
    Mul,
    /// Integer division
    #[strum(to_string = "/")]
    Div,
    /// Integer remainder
    #[strum(to_string = "%")]
    Mod,
    /// Bitwise and
    #[strum(to_string = "&")]
    And,
    /// Bitwise or
    #[strum(to_string = "|")]
    Or,
    /// Bitwise exclusive or
    #[strum(to_string = "^")]
    Xor,
    /// Signed less-than
    #[strum(to_string = "<")]
    Lt,
    /// Signed less-or-equal
    #[strum(to_string = "<=")]
    Leq,
    /// Signed greater-than
    #[strum(to_string = ">")]
    Gt,
    /// Signed greater-or-equal
    #[strum(to_string = ">=")]
    Geq,
    /// Equality
    #[strum(to_string = "==")]
    Eq,
    /// Inequality
    #[strum(to_string = "!=")]
    Neq,
}

impl BinOpKind {
    /// Returns `true` for operators producing a boolean from two integers.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Lt | Self::Leq | Self::Gt | Self::Geq | Self::Eq | Self::Neq
        )
    }

    /// Returns `true` for `<` and `<=`, the guards of counting-up loops.
    #[must_use]
    pub const fn is_upper_bound(self) -> bool {
        matches!(self, Self::Lt | Self::Leq)
    }

    /// Returns `true` for `>` and `>=`, the guards of counting-down loops.
    #[must_use]
    pub const fn is_lower_bound(self) -> bool {
        matches!(self, Self::Gt | Self::Geq)
    }
}

/// An IR expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// A 64-bit integer constant.
    Const(i64),
    /// A function-local temporary (a variable, as far as dataflow is concerned).
    Temp(String),
    /// A global label, such as the name of a called function.
    Name(String),
    /// A memory load from the given address.
    Mem(Box<Expr>),
    /// A binary operation.
    BinOp {
        /// The operator
        op: BinOpKind,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
}

impl Expr {
    /// Creates an integer constant.
    #[must_use]
    pub const fn constant(value: i64) -> Self {
        Expr::Const(value)
    }

    /// Creates a temporary reference.
    #[must_use]
    pub fn temp(name: impl Into<String>) -> Self {
        Expr::Temp(name.into())
    }

    /// Creates a global name reference.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(name.into())
    }

    /// Creates a memory load from `address`.
    #[must_use]
    pub fn mem(address: Expr) -> Self {
        Expr::Mem(Box::new(address))
    }

    /// Creates a binary operation.
    #[must_use]
    pub fn binop(op: BinOpKind, left: Expr, right: Expr) -> Self {
        Expr::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Returns the temporary name if this expression is a bare temporary.
    #[must_use]
    pub fn as_temp(&self) -> Option<&str> {
        match self {
            Expr::Temp(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the value if this expression is a constant.
    #[must_use]
    pub const fn as_const(&self) -> Option<i64> {
        match self {
            Expr::Const(value) => Some(*value),
            _ => None,
        }
    }

    /// Adds every temporary read by this expression to `out`.
    pub fn collect_uses(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Const(_) | Expr::Name(_) => {}
            Expr::Temp(name) => {
                out.insert(name.clone());
            }
            Expr::Mem(address) => address.collect_uses(out),
            Expr::BinOp { left, right, .. } => {
                left.collect_uses(out);
                right.collect_uses(out);
            }
        }
    }

    /// Returns the set of temporaries read by this expression.
    #[must_use]
    pub fn uses(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_uses(&mut out);
        out
    }

    /// Returns `true` if no temporary in `defined` is read by this expression.
    ///
    /// With `defined` being the variables assigned inside a loop, this tells
    /// whether the expression evaluates to the same value on every iteration.
    /// Memory loads are never considered invariant.
    #[must_use]
    pub fn is_invariant(&self, defined: &BTreeSet<String>) -> bool {
        match self {
            Expr::Const(_) | Expr::Name(_) => true,
            Expr::Temp(name) => !defined.contains(name),
            Expr::Mem(_) => false,
            Expr::BinOp { left, right, .. } => {
                left.is_invariant(defined) && right.is_invariant(defined)
            }
        }
    }

    /// Returns `true` if `name` follows the return-value temporary convention.
    #[must_use]
    pub fn is_return_temp(name: &str) -> bool {
        name.starts_with(RETURN_TEMP_PREFIX)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(value) => write!(f, "{value}"),
            Expr::Temp(name) | Expr::Name(name) => f.write_str(name),
            Expr::Mem(address) => write!(f, "[{address}]"),
            Expr::BinOp { op, left, right } => write!(f, "({left} {op} {right})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_uses_walks_whole_tree() {
        let e = Expr::binop(
            BinOpKind::Add,
            Expr::mem(Expr::temp("base")),
            Expr::binop(BinOpKind::Mul, Expr::temp("i"), Expr::constant(8)),
        );
        let uses: Vec<_> = e.uses().into_iter().collect();
        assert_eq!(uses, vec!["base".to_string(), "i".to_string()]);
    }

    #[test]
    fn test_names_are_not_uses() {
        assert!(Expr::name("println").uses().is_empty());
    }

    #[test]
    fn test_display_infix() {
        let e = Expr::binop(BinOpKind::Leq, Expr::temp("i"), Expr::mem(Expr::temp("n")));
        assert_eq!(e.to_string(), "(i <= [n])");
    }

    #[test]
    fn test_invariance() {
        let defined: BTreeSet<String> = ["i".to_string()].into_iter().collect();
        assert!(Expr::binop(BinOpKind::Sub, Expr::temp("n"), Expr::constant(1)).is_invariant(&defined));
        assert!(!Expr::temp("i").is_invariant(&defined));
        assert!(!Expr::mem(Expr::temp("n")).is_invariant(&defined));
    }

    #[test]
    fn test_comparison_classification() {
        let comparisons: Vec<_> = BinOpKind::iter().filter(|op| op.is_comparison()).collect();
        assert_eq!(comparisons.len(), 6);
        assert!(BinOpKind::Lt.is_upper_bound() && BinOpKind::Leq.is_upper_bound());
        assert!(BinOpKind::Gt.is_lower_bound() && BinOpKind::Geq.is_lower_bound());
        assert!(!BinOpKind::Eq.is_upper_bound() && !BinOpKind::Neq.is_lower_bound());
    }

    #[test]
    fn test_return_temp_convention() {
        assert!(Expr::is_return_temp("_RV0"));
        assert!(!Expr::is_return_temp("x"));
    }
}
