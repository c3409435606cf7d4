//! Ordered-map column container.

use std::collections::BTreeMap;

use super::{Column, Entry};
use crate::fields::NonZeroCoefficient;
use crate::Index;

/// Cells in an ordered map from row to coefficient.
///
/// Used when rows are kept as ordered sets: iteration is ordered and every
/// point edit is logarithmic, at the cost of pointer-heavy storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BTreeColumn<CF> {
    entries: BTreeMap<Index, CF>,
}

impl<CF> Default for BTreeColumn<CF> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<CF: NonZeroCoefficient> Column for BTreeColumn<CF> {
    type Coefficient = CF;

    fn from_entries(entries: Vec<Entry<CF>>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.row, e.coeff)).collect(),
        }
    }

    fn entries(&self) -> Vec<Entry<CF>> {
        self.entries
            .iter()
            .map(|(&row, &coeff)| Entry::new(row, coeff))
            .collect()
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
        self.entries.last_key_value().map(|(&row, _)| row)
    }

    fn pivot_entry(&mut self) -> Option<Entry<CF>> {
        self.entries
            .last_key_value()
            .map(|(&row, &coeff)| Entry::new(row, coeff))
    }

    fn add_entries(&mut self, rhs: &[Entry<CF>]) {
        for e in rhs {
            match self.entries.remove(&e.row) {
                None => {
                    self.entries.insert(e.row, e.coeff);
                }
                Some(old) => {
                    if let Some(sum) = old + e.coeff {
                        self.entries.insert(e.row, sum);
                    }
                }
            }
        }
    }

    fn scale(&mut self, c: Option<CF>) {
        match c {
            None => self.entries.clear(),
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
            }
            None => {
                self.entries.remove(&row);
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}
