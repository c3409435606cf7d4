//! Optional inverted row index.
//!
//! When row access is enabled, a matrix keeps, for every row, the set of
//! columns with a non-zero entry there. The C++ lineage of this engine does
//! it with intrusive per-row cell lists; here the mechanism is a
//! `(row → column set)` table private to this module, which gives the same
//! O(1) removal given `(row, column)` without back-pointers. Matrices are
//! responsible for keeping the index consistent with every column edit.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{Index, PermatError};

/// Flavor of the per-row column container.
///
/// `Unordered` is the default for speed; `Ordered` is selected when rows
/// must be traversable in column order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowAccess {
    Off,
    Unordered,
    Ordered,
}

/// Growth policy and container flavor of a [`RowIndex`].
#[derive(Clone, Copy, Debug)]
pub struct RowSettings {
    pub access: RowAccess,
    /// When rows are not removable the index is bounded by `capacity`; any
    /// row beyond it is a [`PermatError::CapacityExceeded`].
    pub removable: bool,
    pub capacity: Option<Index>,
}

impl Default for RowSettings {
    fn default() -> Self {
        Self {
            access: RowAccess::Off,
            removable: false,
            capacity: None,
        }
    }
}

impl RowSettings {
    pub fn unordered() -> Self {
        Self {
            access: RowAccess::Unordered,
            removable: true,
            capacity: None,
        }
    }

    pub fn ordered() -> Self {
        Self {
            access: RowAccess::Ordered,
            removable: true,
            capacity: None,
        }
    }

    pub fn bounded(self, capacity: Index) -> Self {
        Self {
            removable: false,
            capacity: Some(capacity),
            ..self
        }
    }
}

#[derive(Clone, Debug)]
enum RowStore {
    Unordered(FxHashMap<Index, FxHashSet<Index>>),
    Ordered(FxHashMap<Index, BTreeSet<Index>>),
}

/// The inverted index: for each row, the columns with a non-zero entry
/// there.
#[derive(Clone, Debug)]
pub struct RowIndex {
    store: RowStore,
    removable: bool,
    capacity: Option<Index>,
}

impl RowIndex {
    /// `None` when `settings.access` is off.
    pub fn from_settings(settings: RowSettings) -> Option<Self> {
        let store = match settings.access {
            RowAccess::Off => return None,
            RowAccess::Unordered => RowStore::Unordered(FxHashMap::default()),
            RowAccess::Ordered => RowStore::Ordered(FxHashMap::default()),
        };
        Some(Self {
            store,
            removable: settings.removable,
            capacity: settings.capacity,
        })
    }

    fn check_capacity(&self, row: Index) -> Result<(), PermatError> {
        match self.capacity {
            Some(capacity) if !self.removable && row >= capacity => {
                Err(PermatError::CapacityExceeded { row, capacity })
            }
            _ => Ok(()),
        }
    }

    pub fn insert(&mut self, row: Index, column: Index) -> Result<(), PermatError> {
        self.check_capacity(row)?;
        match &mut self.store {
            RowStore::Unordered(rows) => {
                rows.entry(row).or_default().insert(column);
            }
            RowStore::Ordered(rows) => {
                rows.entry(row).or_default().insert(column);
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, row: Index, column: Index) {
        match &mut self.store {
            RowStore::Unordered(rows) => {
                if let Some(columns) = rows.get_mut(&row) {
                    columns.remove(&column);
                }
            }
            RowStore::Ordered(rows) => {
                if let Some(columns) = rows.get_mut(&row) {
                    columns.remove(&column);
                }
            }
        }
    }

    /// The columns with a non-zero entry at `row`, in column order.
    pub fn columns_of(&self, row: Index) -> Vec<Index> {
        match &self.store {
            RowStore::Unordered(rows) => {
                let mut columns: Vec<_> = rows
                    .get(&row)
                    .map(|set| set.iter().copied().collect())
                    .unwrap_or_default();
                columns.sort_unstable();
                columns
            }
            RowStore::Ordered(rows) => rows
                .get(&row)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default(),
        }
    }

    pub fn row_is_empty(&self, row: Index) -> bool {
        match &self.store {
            RowStore::Unordered(rows) => rows.get(&row).is_none_or(|s| s.is_empty()),
            RowStore::Ordered(rows) => rows.get(&row).is_none_or(|s| s.is_empty()),
        }
    }

    /// Drop an empty row from the dictionaries. The row is assumed empty;
    /// only available with removable rows.
    pub fn erase_row(&mut self, row: Index) {
        if !self.removable {
            return;
        }
        match &mut self.store {
            RowStore::Unordered(rows) => {
                rows.remove(&row);
            }
            RowStore::Ordered(rows) => {
                rows.remove(&row);
            }
        }
    }

    pub fn clear(&mut self) {
        match &mut self.store {
            RowStore::Unordered(rows) => rows.clear(),
            RowStore::Ordered(rows) => rows.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_enumerate() {
        let mut index = RowIndex::from_settings(RowSettings::unordered()).unwrap();
        index.insert(3, 7).unwrap();
        index.insert(3, 5).unwrap();
        index.insert(4, 5).unwrap();
        assert_eq!(index.columns_of(3), vec![5, 7]);
        index.remove(3, 7);
        assert_eq!(index.columns_of(3), vec![5]);
        assert!(index.row_is_empty(9));
    }

    #[test]
    fn test_capacity_bound() {
        let settings = RowSettings::unordered().bounded(4);
        let mut index = RowIndex::from_settings(settings).unwrap();
        index.insert(3, 0).unwrap();
        assert!(matches!(
            index.insert(4, 0),
            Err(PermatError::CapacityExceeded { row: 4, capacity: 4 })
        ));
    }

    #[test]
    fn test_off_is_none() {
        assert!(RowIndex::from_settings(RowSettings::default()).is_none());
    }

    #[test]
    fn test_ordered_enumeration() {
        let mut index = RowIndex::from_settings(RowSettings::ordered()).unwrap();
        for col in [9, 2, 5] {
            index.insert(0, col).unwrap();
        }
        assert_eq!(index.columns_of(0), vec![2, 5, 9]);
        index.erase_row(0);
        assert!(index.row_is_empty(0));
    }
}
