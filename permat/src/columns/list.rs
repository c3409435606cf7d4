//! Linked-list column container.

use std::collections::LinkedList;

use super::{merge_entries, Column, Entry};
use crate::fields::NonZeroCoefficient;
use crate::Index;

/// Cells ordered by row in a singly traversed linked list.
///
/// Preferable when many columns share rows through the row index and
/// relocations of surviving cells would be expensive; the merge rebuilds the
/// spine but the cell values themselves are only moved, never shifted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListColumn<CF> {
    entries: LinkedList<Entry<CF>>,
}

impl<CF> Default for ListColumn<CF> {
    fn default() -> Self {
        Self {
            entries: LinkedList::new(),
        }
    }
}

impl<CF: NonZeroCoefficient> Column for ListColumn<CF> {
    type Coefficient = CF;

    fn from_entries(entries: Vec<Entry<CF>>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].row < w[1].row));
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    fn entries(&self) -> Vec<Entry<CF>> {
        self.entries.iter().copied().collect()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, row: Index) -> bool {
        self.entries.iter().any(|e| e.row == row)
    }

    fn coefficient(&self, row: Index) -> Option<CF> {
        self.entries.iter().find(|e| e.row == row).map(|e| e.coeff)
    }

    fn pivot(&mut self) -> Option<Index> {
        self.entries.back().map(|e| e.row)
    }

    fn pivot_entry(&mut self) -> Option<Entry<CF>> {
        self.entries.back().copied()
    }

    fn add_entries(&mut self, rhs: &[Entry<CF>]) {
        if rhs.is_empty() {
            return;
        }
        let lhs: Vec<_> = self.entries.iter().copied().collect();
        self.entries = merge_entries(&lhs, rhs).into_iter().collect();
    }

    fn scale(&mut self, c: Option<CF>) {
        match c {
            None => self.entries.clear(),
            Some(c) => {
                for e in &mut self.entries {
                    e.coeff = e.coeff * c;
                }
            }
        }
    }

    fn set_entry(&mut self, row: Index, coeff: Option<CF>) {
        let mut entries: Vec<_> = self.entries.iter().copied().collect();
        match (entries.binary_search_by_key(&row, |e| e.row), coeff) {
            (Ok(i), Some(c)) => entries[i].coeff = c,
            (Ok(i), None) => {
                entries.remove(i);
            }
            (Err(i), Some(c)) => entries.insert(i, Entry::new(row, c)),
            (Err(_), None) => {}
        }
        self.entries = entries.into_iter().collect();
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}
