//! The matrix species.
//!
//! Five species share the column operation surface but maintain different
//! invariants after each operation:
//!
//! * [`BaseMatrix`] — append-only column store, no reduction bookkeeping.
//! * [`CompressedBaseMatrix`] — base matrix in which identical columns share
//!   one physical column through a union-find.
//! * [`BoundaryMatrix`] — stores `R` of the `R = D·U` decomposition and the
//!   pivot table filled in by a reduction driver.
//! * [`RuMatrix`] — stores both `R` and `U`, supports vineyard
//!   transpositions and representative cycles.
//! * [`ChainMatrix`] — maintains a chain basis with stored pivots and the
//!   pairing produced at insertion time.
//!
//! All species grow by [`InsertBoundary::insert_boundary`] in filtration
//! order; rows and columns share one index space.

mod base;
mod boundary;
mod chain;
mod compressed;
mod ru;

pub use base::BaseMatrix;
pub use boundary::BoundaryMatrix;
pub use chain::ChainMatrix;
pub use compressed::CompressedBaseMatrix;
pub use ru::RuMatrix;

use crate::columns::{Column, Entry, HashColumn, VectorColumn};
use crate::fields::{NonZeroCoefficient, Z2, Z3, Z5, Z7};
use crate::rows::RowIndex;
use crate::{Index, PermatError};

/// Ordered insertion of cell boundaries, the producer-facing surface every
/// species implements. `insert_boundary` returns the index assigned to the
/// new cell, which equals the number of prior insertions.
pub trait InsertBoundary {
    type Coefficient: NonZeroCoefficient;

    fn insert_boundary(
        &mut self,
        boundary: &[Entry<Self::Coefficient>],
        dimension: u32,
    ) -> Result<Index, PermatError>;
}

/// Check a boundary against the cells inserted so far: rows strictly
/// ascending and all of them already present.
pub(crate) fn validate_boundary<CF: NonZeroCoefficient>(
    boundary: &[Entry<CF>],
    next_index: Index,
) -> Result<(), PermatError> {
    for window in boundary.windows(2) {
        if window[0].row >= window[1].row {
            return Err(PermatError::OutOfOrderBoundary {
                column: next_index,
                reason: "boundary rows must be strictly ascending",
            });
        }
    }
    if let Some(last) = boundary.last() {
        if last.row >= next_index {
            return Err(PermatError::OutOfOrderBoundary {
                column: next_index,
                reason: "boundary refers to a cell not yet inserted",
            });
        }
    }
    Ok(())
}

/// Register a freshly inserted column in the row index.
pub(crate) fn index_new_column<CF: NonZeroCoefficient>(
    rows: &mut Option<RowIndex>,
    column: Index,
    entries: &[Entry<CF>],
) -> Result<(), PermatError> {
    if let Some(rows) = rows {
        for e in entries {
            rows.insert(e.row, column)?;
        }
    }
    Ok(())
}

/// Re-sync the row index for `column` after an operation that could only
/// have changed the rows listed in `touched`.
pub(crate) fn sync_rows_after<C: Column>(
    rows: &mut Option<RowIndex>,
    column: Index,
    content: &C,
    touched: impl IntoIterator<Item = Index>,
) -> Result<(), PermatError> {
    if let Some(rows) = rows {
        for row in touched {
            if content.contains(row) {
                rows.insert(row, column)?;
            } else {
                rows.remove(row, column);
            }
        }
    }
    Ok(())
}

// The combinations the engine is expected to be driven with. Columns can be
// swapped for any other container; these cover the reductions' sweet spots.

/// Default `Z/2` boundary matrix: sorted-vector columns.
pub type Z2BoundaryMatrix = BoundaryMatrix<VectorColumn<Z2>>;
/// `Z/2` boundary matrix tuned for massed additions.
pub type Z2HashBoundaryMatrix = BoundaryMatrix<HashColumn<Z2>>;
pub type Z3BoundaryMatrix = BoundaryMatrix<VectorColumn<Z3>>;
pub type Z5BoundaryMatrix = BoundaryMatrix<VectorColumn<Z5>>;
pub type Z7BoundaryMatrix = BoundaryMatrix<VectorColumn<Z7>>;
pub type Z2RuMatrix = RuMatrix<VectorColumn<Z2>>;
pub type Z3RuMatrix = RuMatrix<VectorColumn<Z3>>;
pub type Z5RuMatrix = RuMatrix<VectorColumn<Z5>>;
pub type Z7RuMatrix = RuMatrix<VectorColumn<Z7>>;
pub type Z2ChainMatrix = ChainMatrix<VectorColumn<Z2>>;
pub type Z3ChainMatrix = ChainMatrix<VectorColumn<Z3>>;
pub type Z2BaseMatrix = BaseMatrix<VectorColumn<Z2>>;
pub type Z2CompressedMatrix = CompressedBaseMatrix<VectorColumn<Z2>>;
