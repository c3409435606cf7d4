//! Append-only column store without reduction bookkeeping.

use crate::columns::{scale_entries, Column, Entry};
use crate::matrices::{index_new_column, sync_rows_after, validate_boundary, InsertBoundary};
use crate::rows::{RowIndex, RowSettings};
use crate::{Index, PermatError};

/// A growable vector of columns with the column operation surface lifted to
/// column indices.
///
/// Used directly by clients that only want to maintain a column-echelon
/// structure, and as the storage model under the reduced species.
#[derive(Debug)]
pub struct BaseMatrix<C: Column> {
    columns: Vec<C>,
    rows: Option<RowIndex>,
}

impl<C: Column> Default for BaseMatrix<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Column> BaseMatrix<C> {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: None,
        }
    }

    pub fn with_rows(settings: RowSettings) -> Self {
        Self {
            columns: Vec::new(),
            rows: RowIndex::from_settings(settings),
        }
    }

    pub fn n_columns(&self) -> Index {
        self.columns.len()
    }

    pub fn column(&self, column: Index) -> &C {
        &self.columns[column]
    }

    pub fn column_mut(&mut self, column: Index) -> &mut C {
        &mut self.columns[column]
    }

    /// Insert an ordered column at the end of the matrix.
    pub fn insert_column(&mut self, entries: &[Entry<C::Coefficient>]) -> Result<Index, PermatError> {
        let column = self.columns.len();
        for window in entries.windows(2) {
            if window[0].row >= window[1].row {
                return Err(PermatError::OutOfOrderBoundary {
                    column,
                    reason: "column rows must be strictly ascending",
                });
            }
        }
        index_new_column(&mut self.rows, column, entries)?;
        self.columns.push(C::from_entries(entries.to_vec()));
        Ok(column)
    }

    pub fn is_zero_entry(&self, column: Index, row: Index) -> bool {
        !self.columns[column].contains(row)
    }

    pub fn is_zero_column(&self, column: Index) -> bool {
        self.columns[column].is_empty()
    }

    /// Columns with a non-zero entry at `row`. Requires row access.
    pub fn columns_in_row(&self, row: Index) -> Option<Vec<Index>> {
        self.rows.as_ref().map(|rows| rows.columns_of(row))
    }

    /// Declare an empty row removed from the row dictionaries.
    pub fn erase_row(&mut self, row: Index) {
        if let Some(rows) = &mut self.rows {
            rows.erase_row(row);
        }
    }

    /// `target += source`.
    pub fn add_to(&mut self, source: Index, target: Index) -> Result<(), PermatError> {
        let rhs = self.columns[source].entries();
        let touched: Vec<_> = rhs.iter().map(|e| e.row).collect();
        self.columns[target].add_entries(&rhs);
        sync_rows_after(&mut self.rows, target, &self.columns[target], touched)
    }

    /// `target = c * target + source`.
    pub fn multiply_target_and_add_to(
        &mut self,
        source: Index,
        c: Option<C::Coefficient>,
        target: Index,
    ) -> Result<(), PermatError> {
        let rhs = self.columns[source].entries();
        let mut touched: Vec<_> = rhs.iter().map(|e| e.row).collect();
        if c.is_none() {
            touched.extend(self.columns[target].entries().iter().map(|e| e.row));
        }
        self.columns[target].multiply_and_add(c, &rhs);
        sync_rows_after(&mut self.rows, target, &self.columns[target], touched)
    }

    /// `target += c * source`.
    pub fn multiply_source_and_add_to(
        &mut self,
        c: Option<C::Coefficient>,
        source: Index,
        target: Index,
    ) -> Result<(), PermatError> {
        let rhs = scale_entries(&self.columns[source].entries(), c);
        let touched: Vec<_> = rhs.iter().map(|e| e.row).collect();
        self.columns[target].add_entries(&rhs);
        sync_rows_after(&mut self.rows, target, &self.columns[target], touched)
    }

    /// `column *= c`; zero clears the column.
    pub fn scale_column(
        &mut self,
        column: Index,
        c: Option<C::Coefficient>,
    ) -> Result<(), PermatError> {
        let touched: Vec<_> = if c.is_none() {
            self.columns[column].entries().iter().map(|e| e.row).collect()
        } else {
            Vec::new()
        };
        self.columns[column].scale(c);
        sync_rows_after(&mut self.rows, column, &self.columns[column], touched)
    }
}

impl<C: Column> InsertBoundary for BaseMatrix<C> {
    type Coefficient = C::Coefficient;

    // A base matrix stores boundaries as plain columns; the dimension is not
    // tracked.
    fn insert_boundary(
        &mut self,
        boundary: &[Entry<C::Coefficient>],
        _dimension: u32,
    ) -> Result<Index, PermatError> {
        validate_boundary(boundary, self.columns.len())?;
        self.insert_column(boundary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{unit_entries, VectorColumn};
    use crate::fields::Z2;
    use crate::rows::RowSettings;

    fn matrix() -> BaseMatrix<VectorColumn<Z2>> {
        let mut m = BaseMatrix::with_rows(RowSettings::unordered());
        m.insert_column(&unit_entries([0, 1])).unwrap();
        m.insert_column(&unit_entries([1, 2])).unwrap();
        m.insert_column(&unit_entries([0, 2])).unwrap();
        m
    }

    #[test]
    fn test_add_to_updates_rows() {
        let mut m = matrix();
        m.add_to(0, 1).unwrap();
        assert_eq!(m.column(1).get_content(3), vec![1, 0, 1]);
        assert_eq!(m.columns_in_row(1), Some(vec![0]));
        assert_eq!(m.columns_in_row(0), Some(vec![0, 1, 2]));
    }

    #[test]
    fn test_self_addition_cancels() {
        let mut m = matrix();
        // source and target are the same physical column; over Z/2 the
        // column must cancel to zero
        m.add_to(2, 2).unwrap();
        assert!(m.is_zero_column(2));
        assert_eq!(m.columns_in_row(0), Some(vec![0]));
    }

    #[test]
    fn test_unsorted_column_rejected() {
        let mut m = matrix();
        let entries = vec![
            crate::columns::Entry::new(2, Z2),
            crate::columns::Entry::new(1, Z2),
        ];
        assert!(m.insert_column(&entries).is_err());
    }

    #[test]
    fn test_scale_by_zero_clears() {
        let mut m = matrix();
        m.scale_column(0, None).unwrap();
        assert!(m.is_zero_column(0));
        assert_eq!(m.columns_in_row(0), Some(vec![2]));
    }
}
