//! The default column container: a sorted vector of cells.

use rustc_hash::FxHashMap;

use super::{merge_entries, scale_entries, Column, Entry};
use crate::fields::NonZeroCoefficient;
use crate::Index;

/// Cells ordered by strictly increasing row in a contiguous vector.
///
/// Additions are a linear merge into a fresh buffer followed by a swap;
/// membership is a binary search. Cache-friendly, and the variant every
/// matrix species defaults to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VectorColumn<CF> {
    entries: Vec<Entry<CF>>,
}

impl<CF> Default for VectorColumn<CF> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<CF: NonZeroCoefficient> VectorColumn<CF> {
    fn position(&self, row: Index) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&row, |e| e.row)
    }
}

impl<CF: NonZeroCoefficient> Column for VectorColumn<CF> {
    type Coefficient = CF;

    fn from_entries(entries: Vec<Entry<CF>>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].row < w[1].row));
        Self { entries }
    }

    fn entries(&self) -> Vec<Entry<CF>> {
        self.entries.clone()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, row: Index) -> bool {
        self.position(row).is_ok()
    }

    fn coefficient(&self, row: Index) -> Option<CF> {
        self.position(row).ok().map(|i| self.entries[i].coeff)
    }

    fn pivot(&mut self) -> Option<Index> {
        self.entries.last().map(|e| e.row)
    }

    fn pivot_entry(&mut self) -> Option<Entry<CF>> {
        self.entries.last().copied()
    }

    fn add_entries(&mut self, rhs: &[Entry<CF>]) {
        if rhs.is_empty() {
            return;
        }
        let merged = merge_entries(&self.entries, rhs);
        self.entries = merged;
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

    fn multiply_and_add(&mut self, c: Option<CF>, rhs: &[Entry<CF>]) {
        let scaled = scale_entries(&self.entries, c);
        self.entries = merge_entries(&scaled, rhs);
    }

    fn set_entry(&mut self, row: Index, coeff: Option<CF>) {
        match (self.position(row), coeff) {
            (Ok(i), Some(c)) => self.entries[i].coeff = c,
            (Ok(i), None) => {
                self.entries.remove(i);
            }
            (Err(i), Some(c)) => self.entries.insert(i, Entry::new(row, c)),
            (Err(_), None) => {}
        }
    }

    fn reorder(&mut self, map: &FxHashMap<Index, Index>) {
        for e in &mut self.entries {
            e.row = *map.get(&e.row).unwrap_or(&e.row);
        }
        self.entries.sort_by_key(|e| e.row);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::unit_entries;
    use crate::fields::Z2;

    #[test]
    fn test_set_entry_keeps_order() {
        let mut col = VectorColumn::<Z2>::from_entries(unit_entries([1, 4]));
        col.set_entry(2, Some(Z2));
        col.set_entry(4, None);
        assert_eq!(
            col.entries().iter().map(|e| e.row).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(col.coefficient(2), Some(Z2));
        assert_eq!(col.coefficient(4), None);
    }
}
