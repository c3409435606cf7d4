//! Column-oriented persistence matrix engine.
//!
//! `permat` turns a *filtration* — an ordered stream of cell boundaries with
//! filtration values — into *persistence pairs* `(birth, death)`. The engine
//! is built from four layers:
//!
//! * [`fields`] — coefficients in `Z/2` or `Z/p`, represented so that zero is
//!   never stored,
//! * [`columns`] — a family of ordered sparse column containers sharing one
//!   operation contract,
//! * [`matrices`] — the matrix species (base, compressed, boundary, R-U,
//!   chain) that maintain different invariants per operation,
//! * [`reduction`] — the drivers (standard, twist, chunk) that run a
//!   decomposition through the matrix surface.
//!
//! [`filtration`] feeds boundaries in, [`diagram`] reads pairs and
//! representative cycles out.

pub mod columns;
pub mod diagram;
pub mod fields;
pub mod filtration;
pub mod matrices;
pub mod reduction;
pub mod rows;

use thiserror::Error;

/// Index of a column or row of a matrix. Row `i` is the cell inserted by the
/// `i`-th call to `insert_boundary`, so rows and columns share one index
/// space.
pub type Index = usize;

#[derive(Debug, Error)]
pub enum PermatError {
    /// A field operation received an argument outside its domain, e.g. a
    /// chain column multiplied by zero or a zero coefficient in a boundary.
    #[error("invalid field argument: {0}")]
    InvalidFieldArgument(&'static str),

    /// A boundary refers to a cell that has not been inserted yet, or the
    /// input stream violates the filtration order.
    #[error("out-of-order boundary at column {column}: {reason}")]
    OutOfOrderBoundary { column: Index, reason: &'static str },

    /// An internal pivot invariant failed. This is a bug in the engine, not
    /// in the input.
    #[error("pivot invariant violation: {0}")]
    PivotInvariantViolation(&'static str),

    /// The row index cannot grow past its declared bound while rows are not
    /// removable.
    #[error("row index capacity {capacity} exceeded by row {row}")]
    CapacityExceeded { row: Index, capacity: Index },

    /// The cooperative cancel flag was observed between columns.
    #[error("reduction canceled")]
    Canceled,
}

pub use fields::{Invertible, NonZeroCoefficient};
