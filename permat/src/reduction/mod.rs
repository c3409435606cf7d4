//! Reduction drivers.
//!
//! A driver consumes the columns of a matrix species in filtration order and
//! establishes the reduced decomposition. Drivers only use the
//! [`ReducibleMatrix`] operation surface and never touch columns directly,
//! so the same driver runs against the boundary and R-U species.
//!
//! * [`standard_reduction`] — one pass, left to right.
//! * [`twist_reduction`] — standard plus clearing of killed columns,
//!   processing dimensions downwards.
//! * [`chunk_reduction`] — a two-phase scheme reducing dimension-local
//!   chunks on a worker pool before a sequential merge.

mod chunk;
mod standard;
mod twist;

pub use chunk::{chunk_reduction, ChunkReducible};
pub use standard::standard_reduction;
pub use twist::twist_reduction;

pub(crate) use chunk::{local_reduce_slice, LocalOp};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::fields::{Invertible, NonZeroCoefficient};
use crate::{Index, PermatError};

/// Cooperative cancellation flag, checked by drivers between columns. On
/// cancel the matrix is left consistent but incomplete and the pair
/// extractor reports the untouched suffix as unreduced.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The operation surface a reduction driver needs from a matrix species.
///
/// Implementations mirror every column operation into whatever secondary
/// state they maintain (the R-U matrix mirrors additions into `U`), so a
/// driver stays oblivious to the species' extra invariants.
pub trait ReducibleMatrix {
    type Coefficient: NonZeroCoefficient + Invertible;

    fn n_columns(&self) -> Index;

    fn dimension(&self, column: Index) -> u32;

    /// Current pivot of the column, `None` when (reduced to) zero.
    fn pivot(&mut self, column: Index) -> Option<Index>;

    fn pivot_value(&mut self, column: Index) -> Option<Self::Coefficient>;

    /// The column recorded as owner of this pivot row, if any.
    fn pivot_owner(&self, row: Index) -> Option<Index>;

    /// Record `column` as the owner of pivot `row`.
    fn record_pivot(&mut self, row: Index, column: Index);

    /// `target += c * source`, mirrored into any secondary state.
    fn add_scaled(
        &mut self,
        source: Index,
        c: Self::Coefficient,
        target: Index,
    ) -> Result<(), PermatError>;

    /// Clear a column known to be killed by `killer` (whose pivot is
    /// `column`) without reducing it.
    fn clear_column(&mut self, column: Index, killer: Index) -> Result<(), PermatError>;

    /// Note that columns `0..prefix` are fully reduced; the pair extractor
    /// reports the rest as unreduced.
    fn mark_reduced_prefix(&mut self, prefix: Index);
}

/// Reduce one column against the recorded pivots until its pivot is free or
/// the column is zero. The tie-break is inherent: the pivot table always
/// holds the earliest column owning a pivot.
pub(crate) fn reduce_column<M: ReducibleMatrix + ?Sized>(
    m: &mut M,
    j: Index,
) -> Result<(), PermatError> {
    while let Some(p) = m.pivot(j) {
        let Some(k) = m.pivot_owner(p) else {
            m.record_pivot(p, j);
            break;
        };
        if k >= j {
            return Err(PermatError::PivotInvariantViolation(
                "pivot owner is not an earlier column",
            ));
        }
        let pv_j = m
            .pivot_value(j)
            .ok_or(PermatError::PivotInvariantViolation("pivot without value"))?;
        let pv_k = m
            .pivot_value(k)
            .ok_or(PermatError::PivotInvariantViolation("pivot without value"))?;
        // cancel the pivot: target += -pv_j / pv_k * source
        let c = pv_j.additive_inverse() * pv_k.inverse();
        m.add_scaled(k, c, j)?;
        if m.pivot(j) == Some(p) {
            return Err(PermatError::PivotInvariantViolation(
                "column addition did not cancel the pivot",
            ));
        }
    }
    Ok(())
}
