//! A fixed-capacity bit vector for dense set operations.
//!
//! Dataflow facts in this crate are sets of small integers: arena slots for
//! node sets (dominators) and interned variable indices for variable sets
//! (liveness). [`BitSet`] stores them 64 per word and reports whether the
//! in-place operations changed anything, which is what a worklist solver
//! needs to decide whether to requeue a node.
//!
//! # Example
//!
//! ```rust
//! use cfgopt::utils::BitSet;
//!
//! let mut set = BitSet::new(100);
//! set.insert(0);
//! set.insert(50);
//! set.insert(99);
//!
//! assert!(set.contains(50));
//! assert_eq!(set.count(), 3);
//! assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 50, 99]);
//! ```

use std::fmt;

/// A bit vector with a fixed capacity.
///
/// Two sets can only be combined if their capacities match; the dataflow
/// lattices guarantee this by sizing every set from the same graph.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    /// The bits, stored as a vector of words.
    words: Vec<u64>,
    /// The number of addressable bits.
    capacity: usize,
}

impl BitSet {
    /// Creates a new empty bit set able to hold indices `0..capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(64)],
            capacity,
        }
    }

    /// Creates a new bit set with every index in `0..capacity` present.
    #[must_use]
    pub fn full(capacity: usize) -> Self {
        let mut set = Self::new(capacity);
        set.fill();
        set
    }

    /// Creates a bit set containing the given indices.
    ///
    /// # Panics
    ///
    /// Panics if any index is `>= capacity`.
    #[must_use]
    pub fn with_bits(capacity: usize, bits: impl IntoIterator<Item = usize>) -> Self {
        let mut set = Self::new(capacity);
        for bit in bits {
            set.insert(bit);
        }
        set
    }

    /// Returns the number of addressable indices.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if no index is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Adds an index. Returns `true` if it was not present before.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.capacity()`.
    pub fn insert(&mut self, index: usize) -> bool {
        assert!(index < self.capacity, "index out of bounds");
        let (word, mask) = Self::locate(index);
        let old = self.words[word];
        self.words[word] |= mask;
        old != self.words[word]
    }

    /// Removes an index. Returns `true` if it was present.
    ///
    /// Indices beyond the capacity are never present, so removing one is a no-op.
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.capacity {
            return false;
        }
        let (word, mask) = Self::locate(index);
        let old = self.words[word];
        self.words[word] &= !mask;
        old != self.words[word]
    }

    /// Returns `true` if the index is present.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        if index >= self.capacity {
            return false;
        }
        let (word, mask) = Self::locate(index);
        self.words[word] & mask != 0
    }

    /// Returns the number of indices present.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Removes every index.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Adds every index in `0..capacity`.
    pub fn fill(&mut self) {
        self.words.iter_mut().for_each(|w| *w = u64::MAX);
        let tail = self.capacity % 64;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last = (1u64 << tail) - 1;
            }
        }
    }

    /// In-place union. Returns `true` if `self` changed.
    ///
    /// # Panics
    ///
    /// Panics if the capacities differ.
    pub fn union_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a | b)
    }

    /// In-place intersection. Returns `true` if `self` changed.
    ///
    /// # Panics
    ///
    /// Panics if the capacities differ.
    pub fn intersect_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a & b)
    }

    /// In-place difference (`self - other`). Returns `true` if `self` changed.
    ///
    /// # Panics
    ///
    /// Panics if the capacities differ.
    pub fn difference_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a & !b)
    }

    /// Returns `true` if every index of `self` is also in `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.capacity == other.capacity
            && self
                .words
                .iter()
                .zip(&other.words)
                .all(|(a, b)| a & !b == 0)
    }

    /// Returns an iterator over the present indices in ascending order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            set: self,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    fn locate(index: usize) -> (usize, u64) {
        (index / 64, 1u64 << (index % 64))
    }

    fn combine(&mut self, other: &Self, op: impl Fn(u64, u64) -> u64) -> bool {
        assert_eq!(
            self.capacity, other.capacity,
            "bit sets must have the same capacity"
        );
        let mut changed = false;
        for (a, &b) in self.words.iter_mut().zip(&other.words) {
            let new = op(*a, b);
            changed |= new != *a;
            *a = new;
        }
        changed
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over the present indices of a [`BitSet`].
pub struct BitSetIter<'a> {
    set: &'a BitSet,
    word_idx: usize,
    current: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.word_idx * 64 + bit);
            }
            self.word_idx += 1;
            self.current = *self.set.words.get(self.word_idx)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_basic() {
        let mut bs = BitSet::new(100);
        assert!(bs.is_empty());

        assert!(bs.insert(0));
        assert!(bs.insert(50));
        assert!(bs.insert(99));
        assert!(!bs.insert(50));

        assert_eq!(bs.count(), 3);
        assert!(bs.contains(99));
        assert!(!bs.contains(1));
        assert!(!bs.contains(1000));
    }

    #[test]
    fn test_bitset_remove() {
        let mut bs = BitSet::new(10);
        bs.insert(4);
        assert!(bs.remove(4));
        assert!(!bs.remove(4));
        assert!(!bs.remove(64));
        assert!(bs.is_empty());
    }

    #[test]
    fn test_bitset_full_masks_tail() {
        let bs = BitSet::full(70);
        assert_eq!(bs.count(), 70);
        assert!(bs.contains(69));
        assert!(!bs.contains(70));
        assert_eq!(bs.iter().last(), Some(69));
    }

    #[test]
    fn test_bitset_union_and_intersection_report_change() {
        let mut a = BitSet::with_bits(100, [0, 1]);
        let b = BitSet::with_bits(100, [1, 2]);

        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![0, 1, 2]);

        assert!(a.intersect_with(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_bitset_difference() {
        let mut a = BitSet::with_bits(8, [0, 1, 2]);
        assert!(a.difference_with(&BitSet::with_bits(8, [1])));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_bitset_subset() {
        let small = BitSet::with_bits(130, [3, 129]);
        let big = BitSet::with_bits(130, [3, 64, 129]);
        assert!(small.is_subset_of(&big));
        assert!(!big.is_subset_of(&small));
    }

    #[test]
    fn test_bitset_iter_across_words() {
        let bs = BitSet::with_bits(200, [5, 63, 64, 128, 199]);
        assert_eq!(bs.iter().collect::<Vec<_>>(), vec![5, 63, 64, 128, 199]);
        assert_eq!(format!("{bs:?}"), "{5, 63, 64, 128, 199}");
    }

    #[test]
    fn test_bitset_zero_capacity() {
        let bs = BitSet::full(0);
        assert!(bs.is_empty());
        assert_eq!(bs.iter().next(), None);
    }
}
