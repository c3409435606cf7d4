//! The boundary matrix: stores `R` of the `R = D·U` decomposition.

use std::ops::Range;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::columns::{scale_entries, Column, Entry};
use crate::diagram::{read_off_pairs, IndexDiagram};
use crate::fields::Invertible;
use crate::matrices::{index_new_column, sync_rows_after, validate_boundary, InsertBoundary};
use crate::reduction::{
    local_reduce_slice, standard_reduction, CancelFlag, ChunkReducible, ReducibleMatrix,
};
use crate::rows::{RowIndex, RowSettings};
use crate::{Index, PermatError};

/// Column store for the reduced boundary matrix.
///
/// Boundaries are appended raw; a reduction driver then establishes the
/// invariant that the pivot table is a partial injection `row → column`
/// naming, for every non-zero column, the earliest column carrying that
/// pivot.
#[derive(Debug)]
pub struct BoundaryMatrix<C: Column> {
    columns: Vec<C>,
    dimensions: Vec<u32>,
    pivot_to_column: FxHashMap<Index, Index>,
    rows: Option<RowIndex>,
    reduced_prefix: Index,
}

impl<C: Column> Default for BoundaryMatrix<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Column> BoundaryMatrix<C> {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            dimensions: Vec::new(),
            pivot_to_column: FxHashMap::default(),
            rows: None,
            reduced_prefix: 0,
        }
    }

    pub fn with_rows(settings: RowSettings) -> Self {
        Self {
            rows: RowIndex::from_settings(settings),
            ..Self::new()
        }
    }

    pub fn n_columns(&self) -> Index {
        self.columns.len()
    }

    pub fn dimension(&self, column: Index) -> u32 {
        self.dimensions[column]
    }

    pub fn column_entries(&self, column: Index) -> Vec<Entry<C::Coefficient>> {
        self.columns[column].entries()
    }

    pub fn is_zero_column(&self, column: Index) -> bool {
        self.columns[column].is_empty()
    }

    pub fn is_zero_entry(&self, column: Index, row: Index) -> bool {
        !self.columns[column].contains(row)
    }

    /// Columns with a non-zero entry at `row`. Requires row access.
    pub fn columns_in_row(&self, row: Index) -> Option<Vec<Index>> {
        self.rows.as_ref().map(|rows| rows.columns_of(row))
    }

    pub fn erase_row(&mut self, row: Index) {
        if let Some(rows) = &mut self.rows {
            rows.erase_row(row);
        }
    }

    /// The column whose reduced pivot sits at `row`, once reduced.
    pub fn pivot_owner(&self, row: Index) -> Option<Index> {
        self.pivot_to_column.get(&row).copied()
    }

    /// Run the standard driver; a convenience for callers without a cancel
    /// flag of their own.
    pub fn reduce(&mut self) -> Result<(), PermatError>
    where
        C::Coefficient: Invertible,
    {
        standard_reduction(self, &CancelFlag::new())
    }

    /// Read pairs off the reduction: every zero column within the reduced
    /// prefix is a birth and the pivot table names its killer.
    pub fn index_pairs(&self) -> IndexDiagram {
        let n = self.columns.len();
        let zeroes: Vec<bool> = (0..n).map(|j| self.columns[j].is_empty()).collect();
        read_off_pairs(
            n,
            self.reduced_prefix,
            &self.dimensions,
            &self.pivot_to_column,
            |j| zeroes[j],
        )
    }

    fn rebuild_rows(&mut self) -> Result<(), PermatError> {
        if let Some(rows) = &mut self.rows {
            rows.clear();
            for (column, col) in self.columns.iter().enumerate() {
                for e in col.entries() {
                    rows.insert(e.row, column)?;
                }
            }
        }
        Ok(())
    }
}

impl<C: Column> InsertBoundary for BoundaryMatrix<C> {
    type Coefficient = C::Coefficient;

    fn insert_boundary(
        &mut self,
        boundary: &[Entry<C::Coefficient>],
        dimension: u32,
    ) -> Result<Index, PermatError> {
        let column = self.columns.len();
        validate_boundary(boundary, column)?;
        index_new_column(&mut self.rows, column, boundary)?;
        self.columns.push(C::from_entries(boundary.to_vec()));
        self.dimensions.push(dimension);
        Ok(column)
    }
}

impl<C: Column> ReducibleMatrix for BoundaryMatrix<C>
where
    C::Coefficient: Invertible,
{
    type Coefficient = C::Coefficient;

    fn n_columns(&self) -> Index {
        self.columns.len()
    }

    fn dimension(&self, column: Index) -> u32 {
        self.dimensions[column]
    }

    fn pivot(&mut self, column: Index) -> Option<Index> {
        self.columns[column].pivot()
    }

    fn pivot_value(&mut self, column: Index) -> Option<C::Coefficient> {
        self.columns[column].pivot_entry().map(|e| e.coeff)
    }

    fn pivot_owner(&self, row: Index) -> Option<Index> {
        self.pivot_to_column.get(&row).copied()
    }

    fn record_pivot(&mut self, row: Index, column: Index) {
        let previous = self.pivot_to_column.insert(row, column);
        debug_assert!(previous.is_none(), "pivot row recorded twice");
    }

    fn add_scaled(
        &mut self,
        source: Index,
        c: C::Coefficient,
        target: Index,
    ) -> Result<(), PermatError> {
        let rhs = scale_entries(&self.columns[source].entries(), Some(c));
        let touched: Vec<_> = rhs.iter().map(|e| e.row).collect();
        self.columns[target].add_entries(&rhs);
        sync_rows_after(&mut self.rows, target, &self.columns[target], touched)
    }

    fn clear_column(&mut self, column: Index, _killer: Index) -> Result<(), PermatError> {
        let touched: Vec<_> = self.columns[column].entries().iter().map(|e| e.row).collect();
        self.columns[column].clear();
        sync_rows_after(&mut self.rows, column, &self.columns[column], touched)
    }

    fn mark_reduced_prefix(&mut self, prefix: Index) {
        self.reduced_prefix = prefix;
    }
}

impl<C> ChunkReducible for BoundaryMatrix<C>
where
    C: Column + Send,
    C::Coefficient: Invertible,
{
    fn reduce_chunks_locally(
        &mut self,
        chunks: &[Range<Index>],
        cancel: &CancelFlag,
    ) -> Result<(), PermatError> {
        let mut slices: Vec<(Index, &mut [C])> = Vec::with_capacity(chunks.len());
        let mut rest = self.columns.as_mut_slice();
        let mut consumed = 0;
        for chunk in chunks {
            let taken = std::mem::take(&mut rest);
            let (head, tail) = taken.split_at_mut(chunk.len());
            slices.push((consumed, head));
            consumed += chunk.len();
            rest = tail;
        }
        slices
            .into_par_iter()
            .try_for_each(|(offset, slice)| local_reduce_slice(offset, slice, cancel).map(|_| ()))?;
        self.rebuild_rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{unit_entries, VectorColumn};
    use crate::diagram::IndexPair;
    use crate::fields::Z2;
    use crate::matrices::Z2BoundaryMatrix;

    /// The filled triangle: vertices, edges, face.
    pub(crate) fn triangle() -> Z2BoundaryMatrix {
        let mut m = BoundaryMatrix::new();
        m.insert_boundary(&[], 0).unwrap();
        m.insert_boundary(&[], 0).unwrap();
        m.insert_boundary(&[], 0).unwrap();
        m.insert_boundary(&unit_entries([0, 1]), 1).unwrap();
        m.insert_boundary(&unit_entries([1, 2]), 1).unwrap();
        m.insert_boundary(&unit_entries([0, 2]), 1).unwrap();
        m.insert_boundary(&unit_entries([3, 4, 5]), 2).unwrap();
        m
    }

    #[test]
    fn test_standard_reduction_triangle() {
        let mut m = triangle();
        m.reduce().unwrap();
        // edge 5 reduces to zero, the face kills it
        assert!(m.is_zero_column(5));
        assert_eq!(m.pivot_owner(5), Some(6));
        let pairs = m.index_pairs().pairs;
        assert_eq!(
            pairs,
            vec![
                IndexPair { birth: 0, death: None, dimension: 0 },
                IndexPair { birth: 1, death: Some(3), dimension: 0 },
                IndexPair { birth: 2, death: Some(4), dimension: 0 },
                IndexPair { birth: 5, death: Some(6), dimension: 1 },
            ]
        );
    }

    #[test]
    fn test_reduction_against_earliest_owner() {
        // two columns with equal content: the second reduces to zero
        // against the first
        let mut m = BoundaryMatrix::<VectorColumn<Z2>>::new();
        m.insert_boundary(&[], 0).unwrap();
        m.insert_boundary(&[], 0).unwrap();
        m.insert_boundary(&unit_entries([0, 1]), 1).unwrap();
        m.insert_boundary(&unit_entries([0, 1]), 1).unwrap();
        m.reduce().unwrap();
        assert_eq!(m.pivot_owner(1), Some(2));
        assert!(m.is_zero_column(3));
    }

    #[test]
    fn test_rejects_forward_boundary() {
        let mut m = BoundaryMatrix::<VectorColumn<Z2>>::new();
        m.insert_boundary(&[], 0).unwrap();
        assert!(m.insert_boundary(&unit_entries([0, 1]), 1).is_err());
    }
}
