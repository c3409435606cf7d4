//! The standard left-to-right reduction.

use log::debug;

use crate::reduction::{reduce_column, CancelFlag, ReducibleMatrix};
use crate::PermatError;

/// Reduce every column in insertion order. After a successful run the pivot
/// table is an injection from rows to columns and pairs can be read off.
pub fn standard_reduction<M: ReducibleMatrix>(
    m: &mut M,
    cancel: &CancelFlag,
) -> Result<(), PermatError> {
    let n = m.n_columns();
    for j in 0..n {
        if cancel.is_canceled() {
            m.mark_reduced_prefix(j);
            return Err(PermatError::Canceled);
        }
        reduce_column(m, j)?;
    }
    m.mark_reduced_prefix(n);
    debug!("standard reduction finished over {n} columns");
    Ok(())
}
