//! The R-U matrix: the reduced matrix together with the operation
//! accumulator.

use std::ops::Range;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::columns::{scale_entries, Column, Entry};
use crate::diagram::{read_off_pairs, IndexDiagram, IndexPair, RepresentativeCycle};
use crate::fields::{Invertible, NonZeroCoefficient};
use crate::matrices::{index_new_column, sync_rows_after, validate_boundary, InsertBoundary};
use crate::reduction::{
    local_reduce_slice, standard_reduction, CancelFlag, ChunkReducible, LocalOp, ReducibleMatrix,
};
use crate::rows::{RowIndex, RowSettings};
use crate::{Index, PermatError};

/// Maintains `R` together with the unit upper-triangular `U` recording the
/// column operations applied, so that `R = D·U` holds after every step
/// (`D` being the concatenation of the inserted boundaries).
///
/// `U` is what turns the reduction into a decomposition: it is required to
/// read off representative cycles and to support vineyard updates under
/// filtration re-ordering. Vineyard mode additionally keeps row indices on
/// both matrices so a transposition touches only the affected cells.
#[derive(Debug)]
pub struct RuMatrix<C: Column> {
    r: Vec<C>,
    u: Vec<C>,
    /// The inserted boundaries, i.e. `D`; kept for the face checks of vine
    /// swaps and for decomposition audits.
    boundaries: Vec<Vec<Entry<C::Coefficient>>>,
    dimensions: Vec<u32>,
    pivot_to_column: FxHashMap<Index, Index>,
    r_rows: Option<RowIndex>,
    u_rows: Option<RowIndex>,
    reduced_prefix: Index,
}

impl<C: Column> Default for RuMatrix<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Column> RuMatrix<C> {
    pub fn new() -> Self {
        Self {
            r: Vec::new(),
            u: Vec::new(),
            boundaries: Vec::new(),
            dimensions: Vec::new(),
            pivot_to_column: FxHashMap::default(),
            r_rows: None,
            u_rows: None,
            reduced_prefix: 0,
        }
    }

    /// Vineyard mode: row access on both `R` and `U`.
    pub fn with_vineyards() -> Self {
        Self {
            r_rows: RowIndex::from_settings(RowSettings::unordered()),
            u_rows: RowIndex::from_settings(RowSettings::unordered()),
            ..Self::new()
        }
    }

    pub fn n_columns(&self) -> Index {
        self.r.len()
    }

    pub fn dimension(&self, column: Index) -> u32 {
        self.dimensions[column]
    }

    pub fn r_entries(&self, column: Index) -> Vec<Entry<C::Coefficient>> {
        self.r[column].entries()
    }

    pub fn u_entries(&self, column: Index) -> Vec<Entry<C::Coefficient>> {
        self.u[column].entries()
    }

    pub fn boundary(&self, column: Index) -> &[Entry<C::Coefficient>] {
        &self.boundaries[column]
    }

    pub fn is_zero_column(&self, column: Index) -> bool {
        self.r[column].is_empty()
    }

    pub fn pivot_owner(&self, row: Index) -> Option<Index> {
        self.pivot_to_column.get(&row).copied()
    }

    pub fn reduce(&mut self) -> Result<(), PermatError>
    where
        C::Coefficient: Invertible,
    {
        standard_reduction(self, &CancelFlag::new())
    }

    pub fn index_pairs(&self) -> IndexDiagram {
        let n = self.r.len();
        let zeroes: Vec<bool> = (0..n).map(|j| self.r[j].is_empty()).collect();
        read_off_pairs(
            n,
            self.reduced_prefix,
            &self.dimensions,
            &self.pivot_to_column,
            |j| zeroes[j],
        )
    }

    /// The cycle representing a pair: the reduced column at the death for a
    /// finite pair, the `U` column at the birth for an essential class
    /// (where `R` is zero, `D·U[birth] = 0` makes it a cycle).
    pub fn representative_cycle(&self, pair: &IndexPair) -> RepresentativeCycle {
        let chain = match pair.death {
            Some(death) => self.r[death].entries(),
            None => self.u[pair.birth].entries(),
        };
        RepresentativeCycle {
            pair_id: pair.birth as u64,
            chain: chain.iter().map(|e| e.row as u64).collect(),
        }
    }

    /// `target += c * source` in both `R` and `U`.
    fn add_scaled_internal(
        &mut self,
        source: Index,
        c: C::Coefficient,
        target: Index,
    ) -> Result<(), PermatError> {
        let rhs = scale_entries(&self.r[source].entries(), Some(c));
        let touched: Vec<_> = rhs.iter().map(|e| e.row).collect();
        self.r[target].add_entries(&rhs);
        sync_rows_after(&mut self.r_rows, target, &self.r[target], touched)?;

        let rhs = scale_entries(&self.u[source].entries(), Some(c));
        let touched: Vec<_> = rhs.iter().map(|e| e.row).collect();
        self.u[target].add_entries(&rhs);
        sync_rows_after(&mut self.u_rows, target, &self.u[target], touched)
    }

    fn rebuild_rows(&mut self) -> Result<(), PermatError> {
        for (rows, columns) in [(&mut self.r_rows, &self.r), (&mut self.u_rows, &self.u)] {
            if let Some(rows) = rows {
                rows.clear();
                for (column, col) in columns.iter().enumerate() {
                    for e in col.entries() {
                        rows.insert(e.row, column)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl<C: Column> InsertBoundary for RuMatrix<C> {
    type Coefficient = C::Coefficient;

    fn insert_boundary(
        &mut self,
        boundary: &[Entry<C::Coefficient>],
        dimension: u32,
    ) -> Result<Index, PermatError> {
        let column = self.r.len();
        validate_boundary(boundary, column)?;
        index_new_column(&mut self.r_rows, column, boundary)?;
        self.r.push(C::from_entries(boundary.to_vec()));
        let diagonal = [Entry::new(column, C::Coefficient::one())];
        index_new_column(&mut self.u_rows, column, &diagonal)?;
        self.u.push(C::from_entries(diagonal.to_vec()));
        self.boundaries.push(boundary.to_vec());
        self.dimensions.push(dimension);
        Ok(column)
    }
}

impl<C: Column> ReducibleMatrix for RuMatrix<C>
where
    C::Coefficient: Invertible,
{
    type Coefficient = C::Coefficient;

    fn n_columns(&self) -> Index {
        self.r.len()
    }

    fn dimension(&self, column: Index) -> u32 {
        self.dimensions[column]
    }

    fn pivot(&mut self, column: Index) -> Option<Index> {
        self.r[column].pivot()
    }

    fn pivot_value(&mut self, column: Index) -> Option<C::Coefficient> {
        self.r[column].pivot_entry().map(|e| e.coeff)
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
        self.add_scaled_internal(source, c, target)
    }

    /// Clearing under `R = D·U`: the cleared column must still satisfy the
    /// decomposition, so `U[column]` becomes the killer's reduced column
    /// scaled to a unit diagonal (`D·R[killer] = 0` because `∂∂ = 0`).
    fn clear_column(&mut self, column: Index, killer: Index) -> Result<(), PermatError> {
        let pivot_value = self.r[killer]
            .pivot_entry()
            .ok_or(PermatError::PivotInvariantViolation("killer without pivot"))?
            .coeff;
        let replacement = scale_entries(&self.r[killer].entries(), Some(pivot_value.inverse()));

        let mut touched: Vec<_> = self.r[column].entries().iter().map(|e| e.row).collect();
        self.r[column].clear();
        sync_rows_after(&mut self.r_rows, column, &self.r[column], touched.clone())?;

        touched = self.u[column].entries().iter().map(|e| e.row).collect();
        touched.extend(replacement.iter().map(|e| e.row));
        self.u[column] = C::from_entries(replacement);
        sync_rows_after(&mut self.u_rows, column, &self.u[column], touched)
    }

    fn mark_reduced_prefix(&mut self, prefix: Index) {
        self.reduced_prefix = prefix;
    }
}

impl<C> ChunkReducible for RuMatrix<C>
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
        let mut rest = self.r.as_mut_slice();
        let mut consumed = 0;
        for chunk in chunks {
            let taken = std::mem::take(&mut rest);
            let (head, tail) = taken.split_at_mut(chunk.len());
            slices.push((consumed, head));
            consumed += chunk.len();
            rest = tail;
        }
        let ops: Vec<Vec<LocalOp<C::Coefficient>>> = slices
            .into_par_iter()
            .map(|(offset, slice)| local_reduce_slice(offset, slice, cancel))
            .collect::<Result<_, _>>()?;
        // replay the R-side operations on U; chunks touch disjoint columns
        for op in ops.into_iter().flatten() {
            let rhs = scale_entries(&self.u[op.source].entries(), Some(op.coeff));
            self.u[op.target].add_entries(&rhs);
        }
        self.rebuild_rows()
    }
}

// ======== Vineyard transpositions ============================

impl<C: Column> RuMatrix<C>
where
    C::Coefficient: Invertible,
{
    /// Columns of `matrix` with a non-zero entry at `row`; uses the row
    /// index when present, otherwise scans.
    fn columns_with_row(rows: &Option<RowIndex>, matrix: &[C], row: Index) -> Vec<Index> {
        match rows {
            Some(rows) => rows.columns_of(row),
            None => (0..matrix.len())
                .filter(|&j| matrix[j].contains(row))
                .collect(),
        }
    }

    /// Swap columns `i`, `i+1` of both matrices and their row-index records.
    fn swap_adjacent_columns(&mut self, i: Index) -> Result<(), PermatError> {
        for (matrix, rows) in [(&mut self.r, &mut self.r_rows), (&mut self.u, &mut self.u_rows)] {
            matrix.swap(i, i + 1);
            if let Some(rows) = rows {
                let left = matrix[i].entries();
                let right = matrix[i + 1].entries();
                for e in &left {
                    rows.remove(e.row, i + 1);
                }
                for e in &right {
                    rows.remove(e.row, i);
                }
                for e in &left {
                    rows.insert(e.row, i)?;
                }
                for e in &right {
                    rows.insert(e.row, i + 1)?;
                }
            }
        }
        Ok(())
    }

    /// Swap rows `i`, `i+1` in both matrices (all columns touching either
    /// row).
    fn swap_adjacent_rows(&mut self, i: Index) -> Result<(), PermatError> {
        for (matrix, rows) in [(&mut self.r, &mut self.r_rows), (&mut self.u, &mut self.u_rows)] {
            let mut touching = Self::columns_with_row(rows, matrix, i);
            touching.extend(Self::columns_with_row(rows, matrix, i + 1));
            touching.sort_unstable();
            touching.dedup();
            for column in touching {
                let upper = matrix[column].coefficient(i);
                let lower = matrix[column].coefficient(i + 1);
                matrix[column].set_entry(i, lower);
                matrix[column].set_entry(i + 1, upper);
                sync_rows_after(rows, column, &matrix[column], [i, i + 1])?;
            }
        }
        Ok(())
    }

    /// Rename rows `i`, `i+1` inside the stored boundaries (`D' = P·D·P`).
    fn swap_boundary_rows(&mut self, i: Index) {
        for boundary in &mut self.boundaries {
            let upper = boundary.binary_search_by_key(&i, |e| e.row);
            let lower = boundary.binary_search_by_key(&(i + 1), |e| e.row);
            match (upper, lower) {
                (Ok(a), Ok(b)) => {
                    let coeff = boundary[a].coeff;
                    boundary[a].coeff = boundary[b].coeff;
                    boundary[b].coeff = coeff;
                }
                (Ok(a), Err(_)) => boundary[a].row = i + 1,
                (Err(_), Ok(b)) => boundary[b].row = i,
                (Err(_), Err(_)) => {}
            }
        }
    }

    /// Transpose the cells at filtration positions `i` and `i+1`.
    ///
    /// Constant-time case analysis on the pivot status of the two columns in
    /// `R` and the entry `U[i][i+1]`, followed by at most one column
    /// addition. Returns whether the two cells exchanged pair partners.
    pub fn vine_swap(&mut self, i: Index) -> Result<bool, PermatError> {
        if i + 1 >= self.r.len() {
            return Err(PermatError::OutOfOrderBoundary {
                column: i + 1,
                reason: "transposition out of range",
            });
        }
        if self.reduced_prefix < self.r.len() {
            return Err(PermatError::PivotInvariantViolation(
                "vine swap requires a fully reduced matrix",
            ));
        }
        if self.boundaries[i + 1].iter().any(|e| e.row == i) {
            return Err(PermatError::OutOfOrderBoundary {
                column: i + 1,
                reason: "adjacent cells in a face relation cannot be transposed",
            });
        }

        let a_zero = self.r[i].is_empty();
        let b_zero = self.r[i + 1].is_empty();
        let low_a = self.r[i].pivot();
        let low_b = self.r[i + 1].pivot();
        let k = self.pivot_to_column.get(&i).copied();
        let l = self.pivot_to_column.get(&(i + 1)).copied();
        let l_reaches_i = l.map(|l| self.r[l].contains(i)).unwrap_or(false);
        let u_entry = self.u[i + 1].coefficient(i);

        // zero U[i][i+1] so the transposed U stays upper triangular; the
        // mirrored addition on R is the identity when column i is zero
        if let Some(u) = u_entry {
            self.add_scaled_internal(i, u.additive_inverse(), i + 1)?;
        }

        self.swap_adjacent_columns(i)?;
        self.swap_adjacent_rows(i)?;
        self.swap_boundary_rows(i);
        self.boundaries.swap(i, i + 1);
        self.dimensions.swap(i, i + 1);

        // fix the at most one pivot collision the swap can introduce
        let switched = if a_zero && b_zero {
            match (k, l, l_reaches_i) {
                (_, Some(_), false) | (_, None, _) => false,
                (None, Some(_), true) => true,
                (Some(k), Some(l), true) => {
                    // both k and l now end at row i+1
                    let (early, late) = if k < l { (k, l) } else { (l, k) };
                    let pv_late = self.r[late]
                        .pivot_entry()
                        .ok_or(PermatError::PivotInvariantViolation("lost pivot in swap"))?
                        .coeff;
                    let pv_early = self.r[early]
                        .pivot_entry()
                        .ok_or(PermatError::PivotInvariantViolation("lost pivot in swap"))?
                        .coeff;
                    self.add_scaled_internal(
                        early,
                        pv_late.additive_inverse() * pv_early.inverse(),
                        late,
                    )?;
                    l < k
                }
            }
        } else if !a_zero && !b_zero {
            if u_entry.is_some() && low_a > low_b {
                // both positions now end at the old low of column i
                let pv_late = self.r[i + 1]
                    .pivot_entry()
                    .ok_or(PermatError::PivotInvariantViolation("lost pivot in swap"))?
                    .coeff;
                let pv_early = self.r[i]
                    .pivot_entry()
                    .ok_or(PermatError::PivotInvariantViolation("lost pivot in swap"))?
                    .coeff;
                self.add_scaled_internal(i, pv_late.additive_inverse() * pv_early.inverse(), i + 1)?;
                true
            } else {
                false
            }
        } else if !a_zero && b_zero {
            if u_entry.is_some() {
                // the u-kill made both positions carry the old low of
                // column i; the cancellation empties position i+1
                let pv_late = self.r[i + 1]
                    .pivot_entry()
                    .ok_or(PermatError::PivotInvariantViolation("lost pivot in swap"))?
                    .coeff;
                let pv_early = self.r[i]
                    .pivot_entry()
                    .ok_or(PermatError::PivotInvariantViolation("lost pivot in swap"))?
                    .coeff;
                self.add_scaled_internal(i, pv_late.additive_inverse() * pv_early.inverse(), i + 1)?;
                if !self.r[i + 1].is_empty() {
                    return Err(PermatError::PivotInvariantViolation(
                        "transposition failed to empty the positive column",
                    ));
                }
                true
            } else {
                false
            }
        } else {
            false
        };

        // re-register the pivots of the touched columns
        for row in [Some(i), Some(i + 1), low_a, low_b].into_iter().flatten() {
            self.pivot_to_column.remove(&row);
        }
        for column in [Some(i), Some(i + 1), k, l].into_iter().flatten() {
            if let Some(p) = self.r[column].pivot() {
                self.pivot_to_column.insert(p, column);
            }
        }

        Ok(switched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{unit_entries, VectorColumn};
    use crate::fields::Z2;
    use crate::matrices::Z2RuMatrix;

    fn triangle_ru() -> Z2RuMatrix {
        let mut m = RuMatrix::with_vineyards();
        m.insert_boundary(&[], 0).unwrap();
        m.insert_boundary(&[], 0).unwrap();
        m.insert_boundary(&[], 0).unwrap();
        m.insert_boundary(&unit_entries([0, 1]), 1).unwrap();
        m.insert_boundary(&unit_entries([1, 2]), 1).unwrap();
        m.insert_boundary(&unit_entries([0, 2]), 1).unwrap();
        m.insert_boundary(&unit_entries([3, 4, 5]), 2).unwrap();
        m.reduce().unwrap();
        m
    }

    /// Dense product check of `R = D·U` over `Z/2`.
    fn assert_r_equals_du(m: &RuMatrix<VectorColumn<Z2>>) {
        let n = m.n_columns();
        for j in 0..n {
            let mut acc = vec![0u64; n];
            for u in m.u_entries(j) {
                for d in m.boundary(u.row) {
                    acc[d.row] ^= 1;
                }
            }
            let mut r = vec![0u64; n];
            for e in m.r_entries(j) {
                r[e.row] = 1;
            }
            assert_eq!(acc, r, "R = D*U violated in column {j}");
        }
    }

    #[test]
    fn test_ru_invariant_after_reduction() {
        let m = triangle_ru();
        assert_r_equals_du(&m);
        // U carries the reduction of edge 5 as 3 + 4 + 5
        assert_eq!(
            m.u_entries(5).iter().map(|e| e.row).collect::<Vec<_>>(),
            vec![3, 4, 5]
        );
    }

    #[test]
    fn test_representative_cycles() {
        let mut m = triangle_ru();
        let pairs = m.index_pairs().pairs;
        let loop_pair = pairs.iter().find(|p| p.dimension == 1).unwrap();
        let cycle = m.representative_cycle(loop_pair);
        // the killed loop is the full triangle boundary
        assert_eq!(cycle.chain, vec![3, 4, 5]);
        let essential = pairs.iter().find(|p| p.death.is_none()).unwrap();
        let cycle = m.representative_cycle(essential);
        assert_eq!(cycle.chain, vec![0]);
    }

    #[test]
    fn test_vine_swap_preserves_decomposition() {
        let mut m = triangle_ru();
        let before: Vec<_> = {
            let mut pairs = m.index_pairs().pairs;
            pairs.sort();
            pairs
        };
        // swap the two edges bc and ac (positions 4, 5)
        m.vine_swap(4).unwrap();
        assert_r_equals_du(&m);
        let mut after = m.index_pairs().pairs;
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn test_vine_swap_twice_restores_u() {
        let mut m = triangle_ru();
        let u_before: Vec<_> = (0..m.n_columns()).map(|j| m.u_entries(j)).collect();
        let r_before: Vec<_> = (0..m.n_columns()).map(|j| m.r_entries(j)).collect();
        m.vine_swap(4).unwrap();
        m.vine_swap(4).unwrap();
        let u_after: Vec<_> = (0..m.n_columns()).map(|j| m.u_entries(j)).collect();
        let r_after: Vec<_> = (0..m.n_columns()).map(|j| m.r_entries(j)).collect();
        assert_eq!(u_before, u_after);
        assert_eq!(r_before, r_after);
    }

    #[test]
    fn test_vine_swap_rejects_face_relation() {
        let mut m = triangle_ru();
        // 5 is a face of 6
        assert!(m.vine_swap(5).is_err());
    }

    #[test]
    fn test_vine_swap_of_vertices_switches_partners() {
        // two vertices joined by an edge; swapping the vertices moves the
        // death to the other component
        let mut m = Z2RuMatrix::with_vineyards();
        m.insert_boundary(&[], 0).unwrap();
        m.insert_boundary(&[], 0).unwrap();
        m.insert_boundary(&unit_entries([0, 1]), 1).unwrap();
        m.reduce().unwrap();
        let switched = m.vine_swap(0).unwrap();
        assert!(switched);
        assert_r_equals_du(&m);
        let pairs = m.index_pairs().pairs;
        assert_eq!(pairs.len(), 2);
    }
}
