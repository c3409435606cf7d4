//! Two-phase chunk reduction with a parallel local phase.

use std::ops::Range;

use log::debug;
use rustc_hash::FxHashMap;

use crate::columns::Column;
use crate::fields::{Invertible, NonZeroCoefficient};
use crate::reduction::{standard_reduction, CancelFlag, ReducibleMatrix};
use crate::{Index, PermatError};

/// A column addition performed during the local phase, in global indices.
/// Species with secondary state (the R-U matrix) replay these after the
/// join.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LocalOp<CF> {
    pub source: Index,
    pub coeff: CF,
    pub target: Index,
}

/// Matrix species that can run the chunk driver's local phase.
///
/// The local phase partitions the filtration into dimension-contiguous
/// chunks and reduces each chunk against its own pivots only; chunks are
/// independent, so implementations fan them out onto the rayon pool. The
/// sequential merge afterwards re-establishes the global pivot order.
pub trait ChunkReducible: ReducibleMatrix {
    fn reduce_chunks_locally(
        &mut self,
        chunks: &[Range<Index>],
        cancel: &CancelFlag,
    ) -> Result<(), PermatError>;
}

/// Maximal runs of columns with equal dimension, in filtration order.
fn dimension_runs<M: ReducibleMatrix>(m: &M) -> Vec<Range<Index>> {
    let n = m.n_columns();
    let mut runs = Vec::new();
    let mut start = 0;
    for j in 1..n {
        if m.dimension(j) != m.dimension(start) {
            runs.push(start..j);
            start = j;
        }
    }
    if start < n {
        runs.push(start..n);
    }
    runs
}

/// Chunk reduction: the parallel dimension-local phase followed by a
/// sequential merge equivalent to left-to-right reduction.
pub fn chunk_reduction<M: ChunkReducible>(
    m: &mut M,
    cancel: &CancelFlag,
) -> Result<(), PermatError> {
    let chunks = dimension_runs(m);
    debug!("chunk reduction: {} dimension chunks", chunks.len());
    m.reduce_chunks_locally(&chunks, cancel)?;
    // Local additions only ever added an earlier column to a later one, so
    // completing with the standard pass yields the unique reduced pairing.
    standard_reduction(m, cancel)
}

/// Sequential local reduction of one chunk slice; only pivots owned inside
/// the chunk are cancelled. Returns the operations applied, in order, with
/// global column indices.
pub(crate) fn local_reduce_slice<C>(
    offset: Index,
    columns: &mut [C],
    cancel: &CancelFlag,
) -> Result<Vec<LocalOp<C::Coefficient>>, PermatError>
where
    C: Column,
    C::Coefficient: Invertible,
{
    let mut ops = Vec::new();
    let mut low_inverse: FxHashMap<Index, usize> = FxHashMap::default();
    for j in 0..columns.len() {
        if cancel.is_canceled() {
            return Err(PermatError::Canceled);
        }
        loop {
            let Some(p) = columns[j].pivot() else {
                break;
            };
            let Some(&k) = low_inverse.get(&p) else {
                low_inverse.insert(p, j);
                break;
            };
            let (left, right) = columns.split_at_mut(j);
            let source = &mut left[k];
            let target = &mut right[0];
            let pv_j = target.pivot_entry().expect("pivot present").coeff;
            let pv_k = source.pivot_entry().expect("recorded pivot present").coeff;
            let c = pv_j.additive_inverse() * pv_k.inverse();
            target.add_multiple(&source.entries(), Some(c));
            ops.push(LocalOp {
                source: offset + k,
                coeff: c,
                target: offset + j,
            });
            if target.pivot() == Some(p) {
                return Err(PermatError::PivotInvariantViolation(
                    "local addition did not cancel the pivot",
                ));
            }
        }
    }
    Ok(ops)
}
