//! The filtration feed: ordered boundaries with filtration values.
//!
//! Producers (alpha, Čech, witness, cubical complexes, tower converters)
//! emit [`FiltrationRecord`]s in filtration order; [`feed`] validates the
//! stream and drives any matrix species through
//! [`InsertBoundary`](crate::matrices::InsertBoundary). The engine only ever
//! sees boundaries as row index lists — geometry stays with the producer.

use ordered_float::NotNan;

use crate::columns::Entry;
use crate::fields::NonZeroCoefficient;
use crate::matrices::InsertBoundary;
use crate::{Index, PermatError};

/// One cell of the filtration stream. `id` must be the 0-based insertion
/// index and `boundary` must be sorted ascending. `coefficients` may only be
/// omitted over `Z/2`.
#[derive(Clone, Debug)]
pub struct FiltrationRecord {
    pub id: u64,
    pub dimension: u32,
    pub boundary: Vec<u64>,
    pub coefficients: Option<Vec<u64>>,
    pub filtration: f64,
}

impl FiltrationRecord {
    /// A cell with unit coefficients, the `Z/2` form.
    pub fn new(id: u64, dimension: u32, boundary: Vec<u64>, filtration: f64) -> Self {
        Self {
            id,
            dimension,
            boundary,
            coefficients: None,
            filtration,
        }
    }
}

/// The filtration metadata retained for reading off the diagram: the value
/// and dimension of every inserted cell.
#[derive(Clone, Debug, Default)]
pub struct Filtration {
    values: Vec<NotNan<f64>>,
    dimensions: Vec<u32>,
}

impl Filtration {
    pub fn len(&self) -> Index {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, cell: Index) -> f64 {
        self.values[cell].into_inner()
    }

    pub fn dimension(&self, cell: Index) -> u32 {
        self.dimensions[cell]
    }
}

/// Convert one record's boundary to typed entries.
fn record_entries<CF: NonZeroCoefficient>(
    record: &FiltrationRecord,
) -> Result<Vec<Entry<CF>>, PermatError> {
    let coefficients: Vec<CF> = match &record.coefficients {
        Some(values) => {
            if values.len() != record.boundary.len() {
                return Err(PermatError::InvalidFieldArgument(
                    "coefficient count differs from boundary length",
                ));
            }
            values
                .iter()
                .map(|&v| {
                    CF::from_value(v).ok_or(PermatError::InvalidFieldArgument(
                        "zero coefficient in boundary",
                    ))
                })
                .collect::<Result<_, _>>()?
        }
        None => {
            if CF::CHARACTERISTIC != 2 && !record.boundary.is_empty() {
                return Err(PermatError::InvalidFieldArgument(
                    "coefficients are required for odd characteristic",
                ));
            }
            vec![CF::one(); record.boundary.len()]
        }
    };
    Ok(record
        .boundary
        .iter()
        .zip(coefficients)
        .map(|(&row, coeff)| Entry::new(row as Index, coeff))
        .collect())
}

/// Feed an ordered record stream into a matrix, checking the stream
/// invariants, and return the retained filtration metadata.
pub fn feed<M: InsertBoundary>(
    matrix: &mut M,
    records: impl IntoIterator<Item = FiltrationRecord>,
) -> Result<Filtration, PermatError> {
    let mut filtration = Filtration::default();
    for (index, record) in records.into_iter().enumerate() {
        if record.id != index as u64 {
            return Err(PermatError::OutOfOrderBoundary {
                column: index,
                reason: "cell ids must be the 0-based insertion order",
            });
        }
        let value = NotNan::new(record.filtration).map_err(|_| PermatError::OutOfOrderBoundary {
            column: index,
            reason: "filtration value is NaN",
        })?;
        if let Some(last) = filtration.values.last() {
            if value < *last {
                return Err(PermatError::OutOfOrderBoundary {
                    column: index,
                    reason: "filtration values must be non-decreasing",
                });
            }
        }
        let entries = record_entries::<M::Coefficient>(&record)?;
        let assigned = matrix.insert_boundary(&entries, record.dimension)?;
        debug_assert_eq!(assigned, index);
        filtration.values.push(value);
        filtration.dimensions.push(record.dimension);
    }
    Ok(filtration)
}

/// The triangle filtration used across the test suite: three vertices at 0,
/// three edges at 1, the triangle at 2.
#[cfg(test)]
pub(crate) fn triangle_records() -> Vec<FiltrationRecord> {
    vec![
        FiltrationRecord::new(0, 0, vec![], 0.0),
        FiltrationRecord::new(1, 0, vec![], 0.0),
        FiltrationRecord::new(2, 0, vec![], 0.0),
        FiltrationRecord::new(3, 1, vec![0, 1], 1.0),
        FiltrationRecord::new(4, 1, vec![1, 2], 1.0),
        FiltrationRecord::new(5, 1, vec![0, 2], 1.0),
        FiltrationRecord::new(6, 2, vec![3, 4, 5], 2.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrices::Z2BoundaryMatrix;

    #[test]
    fn test_feed_triangle() {
        let mut matrix = Z2BoundaryMatrix::new();
        let filtration = feed(&mut matrix, triangle_records()).unwrap();
        assert_eq!(filtration.len(), 7);
        assert_eq!(filtration.value(6), 2.0);
        assert_eq!(filtration.dimension(6), 2);
        assert_eq!(matrix.n_columns(), 7);
    }

    #[test]
    fn test_feed_rejects_bad_ids() {
        let mut matrix = Z2BoundaryMatrix::new();
        let records = vec![FiltrationRecord::new(1, 0, vec![], 0.0)];
        assert!(matches!(
            feed(&mut matrix, records),
            Err(PermatError::OutOfOrderBoundary { .. })
        ));
    }

    #[test]
    fn test_feed_rejects_forward_reference() {
        let mut matrix = Z2BoundaryMatrix::new();
        let records = vec![
            FiltrationRecord::new(0, 0, vec![], 0.0),
            FiltrationRecord::new(1, 1, vec![0, 2], 0.0),
        ];
        assert!(matches!(
            feed(&mut matrix, records),
            Err(PermatError::OutOfOrderBoundary { column: 1, .. })
        ));
    }

    #[test]
    fn test_feed_rejects_decreasing_filtration() {
        let mut matrix = Z2BoundaryMatrix::new();
        let records = vec![
            FiltrationRecord::new(0, 0, vec![], 1.0),
            FiltrationRecord::new(1, 0, vec![], 0.5),
        ];
        assert!(matches!(
            feed(&mut matrix, records),
            Err(PermatError::OutOfOrderBoundary { column: 1, .. })
        ));
    }

    #[test]
    fn test_feed_requires_coefficients_for_odd_p() {
        use crate::matrices::Z3BoundaryMatrix;
        let mut matrix = Z3BoundaryMatrix::new();
        let records = vec![
            FiltrationRecord::new(0, 0, vec![], 0.0),
            FiltrationRecord::new(1, 0, vec![], 0.0),
            FiltrationRecord::new(2, 1, vec![0, 1], 1.0),
        ];
        assert!(matches!(
            feed(&mut matrix, records),
            Err(PermatError::InvalidFieldArgument(_))
        ));
    }
}
