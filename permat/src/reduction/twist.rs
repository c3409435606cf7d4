//! Standard reduction with the twist: clearing killed columns.

use log::debug;

use crate::reduction::{reduce_column, CancelFlag, ReducibleMatrix};
use crate::{Index, PermatError};

/// Reduce dimensions from the top down, clearing the column of a pivot row
/// as soon as it is killed.
///
/// When column `j` (a `d`-cell) settles with pivot `p`, the `(d-1)`-cell `p`
/// is known to die: its own column would reduce to zero anyway, so it is
/// cleared outright before its dimension is processed. On typical inputs
/// this trims roughly half the reduction work.
pub fn twist_reduction<M: ReducibleMatrix>(
    m: &mut M,
    cancel: &CancelFlag,
) -> Result<(), PermatError> {
    let n = m.n_columns();
    let mut by_dimension: Vec<Vec<Index>> = Vec::new();
    for j in 0..n {
        let d = m.dimension(j) as usize;
        if by_dimension.len() <= d {
            by_dimension.resize_with(d + 1, Vec::new);
        }
        by_dimension[d].push(j);
    }

    let mut cleared = 0usize;
    for columns in by_dimension.iter().rev() {
        for &j in columns {
            if cancel.is_canceled() {
                // partial results of an out-of-order pass are discarded
                m.mark_reduced_prefix(0);
                return Err(PermatError::Canceled);
            }
            reduce_column(m, j)?;
            if let Some(p) = m.pivot(j) {
                m.clear_column(p, j)?;
                cleared += 1;
            }
        }
    }
    m.mark_reduced_prefix(n);
    debug!("twist reduction finished over {n} columns, {cleared} cleared");
    Ok(())
}
