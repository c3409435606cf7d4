//! Binary heap column container with lazy additions.

use std::collections::BinaryHeap;

use super::{Column, Entry};
use crate::fields::NonZeroCoefficient;
use crate::Index;

/// Heap cell ordered by row only; duplicate rows coexist until a pivot
/// extraction merges them.
#[derive(Clone, Copy, Debug)]
struct HeapEntry<CF>(Entry<CF>);

impl<CF> PartialEq for HeapEntry<CF> {
    // Equal row implies mergeable; coefficients are summed on extraction.
    fn eq(&self, other: &Self) -> bool {
        self.0.row == other.0.row
    }
}
impl<CF> Eq for HeapEntry<CF> {}

impl<CF> PartialOrd for HeapEntry<CF> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<CF> Ord for HeapEntry<CF> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.row.cmp(&other.0.row)
    }
}

/// Cells in a max-heap keyed by row, with additions pushed instead of
/// merged.
///
/// An addition is a batch of pushes, so a run of additions costs nothing but
/// heap inserts; the work is deferred to the next pivot read, which pops
/// duplicate rows, sums their coefficients and pushes the surviving pivot
/// back. Amortized this wins when many additions precede a read.
#[derive(Clone, Debug)]
pub struct HeapColumn<CF> {
    heap: BinaryHeap<HeapEntry<CF>>,
}

impl<CF> Default for HeapColumn<CF> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }
}

impl<CF: NonZeroCoefficient> HeapColumn<CF> {
    /// Pop the largest net non-zero entry, merging duplicate rows on the
    /// way. Entries that sum to zero disappear.
    fn pop_pivot(&mut self) -> Option<Entry<CF>> {
        let first = self.heap.pop()?.0;
        let mut working_row = first.row;
        let mut working_sum = Some(first.coeff);

        loop {
            let Some(next) = self.heap.peek() else {
                break;
            };
            if next.0.row != working_row {
                if working_sum.is_some() {
                    break;
                }
                working_row = next.0.row;
                working_sum = None;
            }
            let next = self.heap.pop().expect("peeked");
            working_sum = next.0.coeff + working_sum;
        }

        match working_sum {
            Some(coeff) => Some(Entry::new(working_row, coeff)),
            None => None,
        }
    }

    /// Rebuild the heap with duplicates merged out.
    fn compact(&mut self) -> Vec<Entry<CF>> {
        let mut sorted_desc = Vec::new();
        while let Some(entry) = self.pop_pivot() {
            sorted_desc.push(entry);
        }
        self.heap = sorted_desc.iter().map(|&e| HeapEntry(e)).collect();
        sorted_desc.reverse();
        sorted_desc
    }
}

impl<CF: NonZeroCoefficient> Column for HeapColumn<CF> {
    type Coefficient = CF;

    fn from_entries(entries: Vec<Entry<CF>>) -> Self {
        Self {
            heap: entries.into_iter().map(HeapEntry).collect(),
        }
    }

    fn entries(&self) -> Vec<Entry<CF>> {
        self.clone().compact()
    }

    fn is_empty(&self) -> bool {
        self.clone().pop_pivot().is_none()
    }

    fn len(&self) -> usize {
        self.entries().len()
    }

    fn contains(&self, row: Index) -> bool {
        self.coefficient(row).is_some()
    }

    fn coefficient(&self, row: Index) -> Option<CF> {
        let mut sum = None;
        for e in &self.heap {
            if e.0.row == row {
                sum = e.0.coeff + sum;
            }
        }
        sum
    }

    fn pivot(&mut self) -> Option<Index> {
        self.pivot_entry().map(|e| e.row)
    }

    fn pivot_entry(&mut self) -> Option<Entry<CF>> {
        let pivot = self.pop_pivot();
        if let Some(entry) = pivot {
            self.heap.push(HeapEntry(entry));
        }
        pivot
    }

    fn add_entries(&mut self, rhs: &[Entry<CF>]) {
        self.heap.reserve(rhs.len());
        for &e in rhs {
            self.heap.push(HeapEntry(e));
        }
    }

    fn scale(&mut self, c: Option<CF>) {
        match c {
            None => self.heap.clear(),
            Some(c) => {
                let compacted = self.compact();
                self.heap = compacted
                    .into_iter()
                    .map(|e| HeapEntry(Entry::new(e.row, e.coeff * c)))
                    .collect();
            }
        }
    }

    fn set_entry(&mut self, row: Index, coeff: Option<CF>) {
        let mut entries = self.compact();
        match (entries.binary_search_by_key(&row, |e| e.row), coeff) {
            (Ok(i), Some(c)) => entries[i].coeff = c,
            (Ok(i), None) => {
                entries.remove(i);
            }
            (Err(i), Some(c)) => entries.insert(i, Entry::new(row, c)),
            (Err(_), None) => {}
        }
        self.heap = entries.into_iter().map(HeapEntry).collect();
    }

    fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::unit_entries;
    use crate::fields::{NonZeroCoefficient, Z2, Z3};

    #[test]
    fn test_lazy_addition_compacts_on_read() {
        let mut col = HeapColumn::<Z2>::from_entries(unit_entries([0, 2, 5]));
        col.add_entries(&unit_entries([2, 5, 6]));
        col.add_entries(&unit_entries([6]));
        // heap now holds duplicates; extraction must see {0}
        assert_eq!(col.pivot(), Some(0));
        assert_eq!(col.entries(), unit_entries([0]));
    }

    #[test]
    fn test_pop_merges_coefficients() {
        let one = Z3::one();
        let two = Z3::from_value(2).unwrap();
        let mut col = HeapColumn::<Z3>::from_entries(vec![Entry::new(4, one)]);
        col.add_entries(&[Entry::new(4, one)]);
        assert_eq!(col.pivot_entry(), Some(Entry::new(4, two)));
        col.add_entries(&[Entry::new(4, one)]);
        assert_eq!(col.pivot(), None);
        assert!(col.is_empty());
    }
}
