//! Unordered column container with a lazily maintained pivot.

use rustc_hash::FxHashMap;

use super::{Column, Entry};
use crate::fields::NonZeroCoefficient;
use crate::Index;

/// Cells kept in an unordered map from row to coefficient.
///
/// Additions are a per-entry toggle, so the symmetric difference of two `Z/2`
/// columns costs one hash probe per right-hand entry. The price is the
/// pivot: it is only recomputed (a full scan) when a mutation invalidated
/// the cached value, tracked by a dirty flag.
#[derive(Clone, Debug)]
pub struct HashColumn<CF> {
    entries: FxHashMap<Index, CF>,
    pivot: Option<Index>,
    dirty: bool,
}

impl<CF> Default for HashColumn<CF> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
            pivot: None,
            dirty: false,
        }
    }
}

impl<CF: NonZeroCoefficient> HashColumn<CF> {
    fn refresh_pivot(&mut self) {
        if self.dirty {
            self.pivot = self.entries.keys().max().copied();
            self.dirty = false;
        }
    }
}

impl<CF: NonZeroCoefficient> Column for HashColumn<CF> {
    type Coefficient = CF;

    fn from_entries(entries: Vec<Entry<CF>>) -> Self {
        let pivot = entries.last().map(|e| e.row);
        Self {
            entries: entries.into_iter().map(|e| (e.row, e.coeff)).collect(),
            pivot,
            dirty: false,
        }
    }

    fn entries(&self) -> Vec<Entry<CF>> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(&row, &coeff)| Entry::new(row, coeff))
            .collect();
        entries.sort_by_key(|e| e.row);
        entries
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, row: Index) -> bool {
        self.entries.contains_key(&row)
    }

    fn coefficient(&self, row: Index) -> Option<CF> {
        self.entries.get(&row).copied()
    }

    fn pivot(&mut self) -> Option<Index> {
        self.refresh_pivot();
        self.pivot
    }

    fn pivot_entry(&mut self) -> Option<Entry<CF>> {
        self.refresh_pivot();
        self.pivot
            .map(|row| Entry::new(row, self.entries[&row]))
    }

    fn add_entries(&mut self, rhs: &[Entry<CF>]) {
        for e in rhs {
            match self.entries.remove(&e.row) {
                None => {
                    self.entries.insert(e.row, e.coeff);
                    if !self.dirty && self.pivot.is_none_or(|p| p < e.row) {
                        self.pivot = Some(e.row);
                    }
                }
                Some(old) => match old + e.coeff {
                    Some(sum) => {
                        self.entries.insert(e.row, sum);
                    }
                    None => {
                        if self.pivot == Some(e.row) {
                            self.dirty = true;
                        }
                    }
                },
            }
        }
    }

    fn scale(&mut self, c: Option<CF>) {
        match c {
            None => self.clear(),
            Some(c) => {
                for coeff in self.entries.values_mut() {
                    *coeff = *coeff * c;
                }
            }
        }
    }

    fn set_entry(&mut self, row: Index, coeff: Option<CF>) {
        match coeff {
            Some(c) => {
                self.entries.insert(row, c);
                if !self.dirty && self.pivot.is_none_or(|p| p < row) {
                    self.pivot = Some(row);
                }
            }
            None => {
                if self.entries.remove(&row).is_some() && self.pivot == Some(row) {
                    self.dirty = true;
                }
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.pivot = None;
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::unit_entries;
    use crate::fields::Z2;

    #[test]
    fn test_lazy_pivot_tracks_cancellation() {
        let mut col = HashColumn::<Z2>::from_entries(unit_entries([0, 3, 7]));
        assert_eq!(col.pivot(), Some(7));
        // cancel the pivot, forcing a rescan
        col.add_entries(&unit_entries([7]));
        assert_eq!(col.pivot(), Some(3));
        col.add_entries(&unit_entries([3, 9]));
        assert_eq!(col.pivot(), Some(9));
        assert_eq!(col.entries(), unit_entries([0, 9]));
    }
}
