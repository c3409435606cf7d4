//! Ordered sparse column containers.
//!
//! A column is a sequence of [`Entry`] cells with strictly increasing row
//! index; zero is never stored. Five containers implement the same
//! [`Column`] contract because the reductions downstream have different
//! hot-path access patterns:
//!
//! * [`VectorColumn`] — sorted vector, the default; additions are a linear
//!   merge and membership is a binary search.
//! * [`ListColumn`] — linked list; merges never relocate surviving cells.
//! * [`HashColumn`] — unordered map with a lazily recomputed pivot; constant
//!   time symmetric difference, the common case over `Z/2`.
//! * [`HeapColumn`] — binary heap with lazy additions; the pivot extraction
//!   compacts on demand.
//! * [`BTreeColumn`] — ordered map; both ordered iteration and logarithmic
//!   edits.
//!
//! Binary operations take the right-hand side as a sorted entry slice. The
//! caller snapshots the source column first, so an operation stays safe when
//! source and target resolve to the same physical column (which happens
//! under column compression); container implementations additionally write
//! merges into a fresh buffer and swap at the end.

mod btree;
mod hash;
mod heap;
mod list;
mod vector;

pub use btree::BTreeColumn;
pub use hash::HashColumn;
pub use heap::HeapColumn;
pub use list::ListColumn;
pub use vector::VectorColumn;

use std::fmt::Debug;

use itertools::{merge_join_by, EitherOrBoth};
use rustc_hash::FxHashMap;

use crate::fields::NonZeroCoefficient;
use crate::Index;

/// One non-zero entry of a column: a row index and a coefficient.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entry<CF> {
    pub row: Index,
    pub coeff: CF,
}

impl<CF: Debug> Debug for Entry<CF> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("({:?} @ {})", self.coeff, self.row))
    }
}

impl<CF> Entry<CF> {
    pub fn new(row: Index, coeff: CF) -> Self {
        Self { row, coeff }
    }
}

/// Build entries with coefficient one for each listed row, e.g. a `Z/2`
/// boundary.
pub fn unit_entries<CF: NonZeroCoefficient>(rows: impl IntoIterator<Item = Index>) -> Vec<Entry<CF>> {
    rows.into_iter()
        .map(|row| Entry::new(row, CF::one()))
        .collect()
}

/// Scale a sorted entry slice by a possibly-zero constant.
pub fn scale_entries<CF: NonZeroCoefficient>(entries: &[Entry<CF>], c: Option<CF>) -> Vec<Entry<CF>> {
    match c {
        None => Vec::new(),
        Some(c) => entries
            .iter()
            .map(|e| Entry::new(e.row, e.coeff * c))
            .collect(),
    }
}

/// The operation contract shared by all column containers.
///
/// `pivot` takes `&mut self` because the lazy containers restructure
/// themselves on read. The other accessors never mutate.
pub trait Column: Default + Debug {
    type Coefficient: NonZeroCoefficient;

    /// Build a column from entries sorted by strictly increasing row, none of
    /// them zero.
    fn from_entries(entries: Vec<Entry<Self::Coefficient>>) -> Self;

    /// Snapshot of the content, sorted by row.
    fn entries(&self) -> Vec<Entry<Self::Coefficient>>;

    fn is_empty(&self) -> bool;

    /// Number of stored non-zero entries.
    fn len(&self) -> usize;

    fn contains(&self, row: Index) -> bool;

    fn coefficient(&self, row: Index) -> Option<Self::Coefficient>;

    /// The largest stored row, or `None` for an empty column.
    fn pivot(&mut self) -> Option<Index>;

    fn pivot_entry(&mut self) -> Option<Entry<Self::Coefficient>>;

    /// Dense expansion of the first `length` rows, zero entries included.
    /// Intended for tests and debugging.
    fn get_content(&self, length: usize) -> Vec<u64> {
        let mut content = vec![0; length];
        for e in self.entries() {
            if e.row < length {
                content[e.row] = e.coeff.value();
            }
        }
        content
    }

    /// `self += rhs` where `rhs` is sorted by row. Cancelled entries are
    /// dropped.
    fn add_entries(&mut self, rhs: &[Entry<Self::Coefficient>]);

    /// `self *= c`, where `None` is zero and clears the column. Chain
    /// columns must not be multiplied by zero; that restriction lives at the
    /// matrix level.
    fn scale(&mut self, c: Option<Self::Coefficient>);

    /// `self = c * self + rhs`.
    fn multiply_and_add(&mut self, c: Option<Self::Coefficient>, rhs: &[Entry<Self::Coefficient>]) {
        self.scale(c);
        self.add_entries(rhs);
    }

    /// `self += c * rhs`, leaving `rhs` untouched.
    fn add_multiple(&mut self, rhs: &[Entry<Self::Coefficient>], c: Option<Self::Coefficient>) {
        if c.is_some() {
            self.add_entries(&scale_entries(rhs, c));
        }
    }

    /// Overwrite (or remove, for `None`) the entry at `row`.
    fn set_entry(&mut self, row: Index, coeff: Option<Self::Coefficient>);

    /// Zero the entry at `row` if present.
    fn remove_entry(&mut self, row: Index) {
        self.set_entry(row, None);
    }

    /// Apply a row permutation to all stored rows and restore the ordering
    /// invariant. Not available on chain columns, whose stored pivots must
    /// stay fixed.
    fn reorder(&mut self, map: &FxHashMap<Index, Index>) {
        let mut entries = self.entries();
        for e in &mut entries {
            e.row = *map.get(&e.row).unwrap_or(&e.row);
        }
        entries.sort_by_key(|e| e.row);
        *self = Self::from_entries(entries);
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Merge two row-sorted entry runs into a fresh buffer, cancelling equal
/// rows. This is the common core of the vector and list containers.
pub(crate) fn merge_entries<CF: NonZeroCoefficient>(
    lhs: &[Entry<CF>],
    rhs: &[Entry<CF>],
) -> Vec<Entry<CF>> {
    let mut merged = Vec::with_capacity(lhs.len() + rhs.len());
    let pairs = merge_join_by(lhs.iter().copied(), rhs.iter().copied(), |l, r| {
        l.row.cmp(&r.row)
    });
    for pair in pairs {
        match pair {
            EitherOrBoth::Left(e) | EitherOrBoth::Right(e) => merged.push(e),
            EitherOrBoth::Both(l, r) => {
                if let Some(sum) = l.coeff + r.coeff {
                    merged.push(Entry::new(l.row, sum));
                }
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Z2, Z5};

    fn z2(rows: &[Index]) -> Vec<Entry<Z2>> {
        unit_entries(rows.iter().copied())
    }

    fn z5(pairs: &[(Index, u64)]) -> Vec<Entry<Z5>> {
        pairs
            .iter()
            .map(|&(row, v)| Entry::new(row, Z5::from_value(v).unwrap()))
            .collect()
    }

    fn exercise_z2_contract<C: Column<Coefficient = Z2>>() {
        let mut col = C::from_entries(z2(&[0, 2, 5]));
        assert_eq!(col.len(), 3);
        assert!(col.contains(2));
        assert!(!col.contains(3));
        assert_eq!(col.pivot(), Some(5));

        // 0 and 5 cancel, 1 appears
        col.add_entries(&z2(&[0, 1, 5]));
        assert_eq!(col.pivot(), Some(2));
        assert_eq!(
            col.entries().iter().map(|e| e.row).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(col.get_content(4), vec![0, 1, 1, 0]);

        col.scale(None);
        assert!(col.is_empty());
        assert_eq!(col.pivot(), None);
    }

    fn exercise_z5_contract<C: Column<Coefficient = Z5>>() {
        let mut col = C::from_entries(z5(&[(1, 2), (3, 4)]));
        // 2 * (2@1 + 4@3) + (1@1 + 2@3 + 1@4) = 0@1 + 0@3 + 1@4
        col.multiply_and_add(Z5::from_value(2), &z5(&[(1, 1), (3, 2), (4, 1)]));
        assert_eq!(col.entries(), z5(&[(4, 1)]));

        // self += 3 * (1@2 + 3@4); the row-4 coefficient 1 + 9 cancels mod 5
        col.add_multiple(&z5(&[(2, 1), (4, 3)]), Z5::from_value(3));
        assert_eq!(col.entries(), z5(&[(2, 3)]));
    }

    #[test]
    fn test_vector_contract() {
        exercise_z2_contract::<VectorColumn<Z2>>();
        exercise_z5_contract::<VectorColumn<Z5>>();
    }

    #[test]
    fn test_list_contract() {
        exercise_z2_contract::<ListColumn<Z2>>();
    }

    #[test]
    fn test_hash_contract() {
        exercise_z2_contract::<HashColumn<Z2>>();
    }

    #[test]
    fn test_heap_contract() {
        exercise_z2_contract::<HeapColumn<Z2>>();
    }

    #[test]
    fn test_btree_contract() {
        exercise_z2_contract::<BTreeColumn<Z2>>();
        exercise_z5_contract::<BTreeColumn<Z5>>();
    }

    #[test]
    fn test_merge_cancels() {
        let merged = merge_entries::<Z2>(&z2(&[0, 1, 4]), &z2(&[1, 2, 4]));
        assert_eq!(merged, z2(&[0, 2]));
    }

    #[test]
    fn test_reorder() {
        let mut col = VectorColumn::<Z2>::from_entries(z2(&[0, 1, 2]));
        let map = FxHashMap::from_iter([(0, 2), (1, 0), (2, 1)]);
        col.reorder(&map);
        assert_eq!(col.entries(), z2(&[0, 1, 2]));
        let map = FxHashMap::from_iter([(0, 5), (1, 3)]);
        col.reorder(&map);
        assert_eq!(
            col.entries().iter().map(|e| e.row).collect::<Vec<_>>(),
            vec![2, 3, 5]
        );
    }

    #[test]
    fn test_scalar_ops_z5() {
        let mut col = VectorColumn::<Z5>::from_entries(z5(&[(0, 1), (2, 3)]));
        col.scale(Z5::from_value(2));
        assert_eq!(col.entries(), z5(&[(0, 2), (2, 1)]));
        col.scale(Z5::from_value(1));
        assert_eq!(col.entries(), z5(&[(0, 2), (2, 1)]));
    }
}
