//! Lattice traits for data flow analysis.
//!
//! A lattice defines how abstract values combine where control flow meets.
//! The solver only needs a meet operation; the distinguished top element is
//! supplied by each analysis because its shape depends on the graph (the set
//! of all nodes, the set of all variables).
//!
//! # Provided domains
//!
//! - [`NodeSet`]: sets of graph nodes, meet is intersection (must-analysis)
//! - [`VarSet`]: sets of interned variables, meet is union (may-analysis)

use std::fmt::Debug;

use crate::utils::{graph::NodeId, BitSet, BitSetIter};

/// A meet semi-lattice with a meet (greatest lower bound) operation.
///
/// The meet operation combines information from multiple control flow paths.
/// It must satisfy:
///
/// - **Idempotent**: `x.meet(x) = x`
/// - **Commutative**: `x.meet(y) = y.meet(x)`
/// - **Associative**: `x.meet(y.meet(z)) = (x.meet(y)).meet(z)`
///
/// # Examples
///
/// ```rust
/// use cfgopt::analysis::dataflow::MeetSemiLattice;
///
/// #[derive(Debug, Clone, PartialEq)]
/// enum Parity {
///     Top,
///     Even,
///     Odd,
///     Bottom,
/// }
///
/// impl MeetSemiLattice for Parity {
///     fn meet(&self, other: &Self) -> Self {
///         match (self, other) {
///             (Self::Top, x) | (x, Self::Top) => x.clone(),
///             (a, b) if a == b => a.clone(),
///             _ => Self::Bottom,
///         }
///     }
///
///     fn is_bottom(&self) -> bool {
///         matches!(self, Self::Bottom)
///     }
/// }
///
/// assert_eq!(Parity::Even.meet(&Parity::Top), Parity::Even);
/// assert!(Parity::Even.meet(&Parity::Odd).is_bottom());
/// ```
pub trait MeetSemiLattice: Clone + Debug + PartialEq {
    /// Computes the meet (greatest lower bound) of two lattice elements.
    #[must_use]
    fn meet(&self, other: &Self) -> Self;

    /// Returns `true` if this is the bottom element.
    ///
    /// Once bottom is reached, further meets cannot change the value.
    fn is_bottom(&self) -> bool;
}

/// A set of graph nodes, met by intersection.
///
/// Top is the set of every arena slot, bottom the empty set. Used by
/// dominator analysis, where a node is a dominator only if it lies on
/// every path.
#[derive(Clone, PartialEq, Eq)]
pub struct NodeSet(BitSet);

impl NodeSet {
    /// Creates an empty set over `capacity` arena slots.
    #[must_use]
    pub fn empty(capacity: usize) -> Self {
        Self(BitSet::new(capacity))
    }

    /// Creates the set of every arena slot.
    #[must_use]
    pub fn full(capacity: usize) -> Self {
        Self(BitSet::full(capacity))
    }

    /// Returns `true` if `node` is in the set.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.0.contains(node.index())
    }

    /// Adds `node`, returning `true` if it was not present.
    pub fn insert(&mut self, node: NodeId) -> bool {
        self.0.insert(node.index())
    }

    /// Number of nodes in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.count()
    }

    /// Returns `true` if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the members in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.iter().map(NodeId::new)
    }

    /// The underlying bit set.
    #[must_use]
    pub fn as_bitset(&self) -> &BitSet {
        &self.0
    }
}

impl MeetSemiLattice for NodeSet {
    fn meet(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.0.intersect_with(&other.0);
        result
    }

    fn is_bottom(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for NodeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// A set of interned variables, met by union.
///
/// Top is the empty set, bottom the set of every variable. Indices are
/// assigned by the analysis that owns the variable table.
#[derive(Clone, PartialEq, Eq)]
pub struct VarSet(BitSet);

impl VarSet {
    /// Creates an empty set over `capacity` variables.
    #[must_use]
    pub fn empty(capacity: usize) -> Self {
        Self(BitSet::new(capacity))
    }

    /// Returns `true` if variable `index` is in the set.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(index)
    }

    /// Adds variable `index`, returning `true` if it was not present.
    pub fn insert(&mut self, index: usize) -> bool {
        self.0.insert(index)
    }

    /// Adds every member of `other`.
    pub fn union_with(&mut self, other: &BitSet) -> bool {
        self.0.union_with(other)
    }

    /// Removes every member of `other`.
    pub fn difference_with(&mut self, other: &BitSet) -> bool {
        self.0.difference_with(other)
    }

    /// Number of variables in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.count()
    }

    /// Returns `true` if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over member indices in ascending order.
    pub fn iter(&self) -> BitSetIter<'_> {
        self.0.iter()
    }
}

impl MeetSemiLattice for VarSet {
    fn meet(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.0.union_with(&other.0);
        result
    }

    fn is_bottom(&self) -> bool {
        self.0.count() == self.0.capacity()
    }
}

impl Debug for VarSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_set_meet_is_intersection() {
        let mut a = NodeSet::empty(8);
        a.insert(NodeId::new(1));
        a.insert(NodeId::new(3));
        let mut b = NodeSet::empty(8);
        b.insert(NodeId::new(3));
        b.insert(NodeId::new(5));

        let m = a.meet(&b);
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![NodeId::new(3)]);
        assert_eq!(NodeSet::full(8).meet(&a), a);
        assert!(NodeSet::empty(8).is_bottom());
    }

    #[test]
    fn test_var_set_meet_is_union() {
        let mut a = VarSet::empty(4);
        a.insert(0);
        let mut b = VarSet::empty(4);
        b.insert(2);

        let m = a.meet(&b);
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(VarSet::empty(4).meet(&a), a);
        assert!(!m.is_bottom());
    }

    #[test]
    fn test_meet_is_idempotent() {
        let mut a = VarSet::empty(4);
        a.insert(1);
        assert_eq!(a.meet(&a), a);

        let mut n = NodeSet::empty(4);
        n.insert(NodeId::new(2));
        assert_eq!(n.meet(&n), n);
    }
}
