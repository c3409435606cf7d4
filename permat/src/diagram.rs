//! Persistence pairs, read off a reduced matrix.

use std::io::{self, Write};

use rustc_hash::FxHashMap;

use crate::filtration::Filtration;
use crate::Index;

/// A pair in index space: the cell that created a class and the cell that
/// killed it, `None` for an essential class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexPair {
    pub birth: Index,
    pub death: Option<Index>,
    /// Dimension of the born cell.
    pub dimension: u32,
}

/// Pairs in index space plus the columns a canceled run left unreduced.
#[derive(Clone, Debug, Default)]
pub struct IndexDiagram {
    pub pairs: Vec<IndexPair>,
    pub unreduced: Vec<Index>,
}

impl IndexDiagram {
    /// Attach filtration values and produce the user-facing diagram.
    pub fn with_filtration(&self, filtration: &Filtration) -> Diagram {
        let pairs = self
            .pairs
            .iter()
            .map(|pair| PersistencePair {
                dim: pair.dimension,
                birth: filtration.value(pair.birth),
                death: pair.death.map(|d| filtration.value(d)),
                birth_id: pair.birth as u64,
                death_id: pair.death.map(|d| d as u64),
            })
            .collect();
        Diagram {
            pairs,
            unreduced: self.unreduced.iter().map(|&j| j as u64).collect(),
        }
    }
}

/// Read pairs off a pivot table produced by a reduction.
///
/// Every zero column within the reduced prefix is a birth; the pivot table
/// names its killer, if any. Non-zero columns are the deaths and appear
/// through their birth's entry.
pub(crate) fn read_off_pairs(
    n_columns: Index,
    reduced_prefix: Index,
    dimensions: &[u32],
    pivot_to_column: &FxHashMap<Index, Index>,
    mut is_zero: impl FnMut(Index) -> bool,
) -> IndexDiagram {
    let mut pairs = Vec::new();
    for j in 0..reduced_prefix {
        if is_zero(j) {
            pairs.push(IndexPair {
                birth: j,
                death: pivot_to_column.get(&j).copied(),
                dimension: dimensions[j],
            });
        }
    }
    IndexDiagram {
        pairs,
        unreduced: (reduced_prefix..n_columns).collect(),
    }
}

/// A persistence pair with its filtration values. `death` is `None` for an
/// essential class.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PersistencePair {
    pub dim: u32,
    pub birth: f64,
    pub death: Option<f64>,
    pub birth_id: u64,
    pub death_id: Option<u64>,
}

impl PersistencePair {
    pub fn persistence(&self) -> f64 {
        match self.death {
            Some(death) => death - self.birth,
            None => f64::INFINITY,
        }
    }
}

/// The user-facing persistence diagram.
#[derive(Clone, Debug, Default)]
pub struct Diagram {
    pub pairs: Vec<PersistencePair>,
    /// Cells a canceled reduction did not get to.
    pub unreduced: Vec<u64>,
}

/// A representative cycle of one pair, as the cell ids of its chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepresentativeCycle {
    pub pair_id: u64,
    pub chain: Vec<u64>,
}

/// Write one pair per line as `dim birth death`, `inf` for essential
/// deaths. Finite pairs with persistence below `min_persistence` are
/// dropped.
pub fn write_intervals<W: Write>(
    w: &mut W,
    diagram: &Diagram,
    min_persistence: f64,
) -> io::Result<()> {
    for pair in &diagram.pairs {
        if pair.persistence() < min_persistence {
            continue;
        }
        match pair.death {
            Some(death) => writeln!(w, "{} {} {}", pair.dim, pair.birth, death)?,
            None => writeln!(w, "{} {} inf", pair.dim, pair.birth)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_off_pairs() {
        // columns 0,1,2 zero; 3 kills 1; 4 unreduced
        let dimensions = vec![0, 0, 0, 1, 1];
        let mut pivot_to_column = FxHashMap::default();
        pivot_to_column.insert(1, 3);
        let zero = [true, true, true, false, false];
        let diagram = read_off_pairs(5, 4, &dimensions, &pivot_to_column, |j| zero[j]);
        assert_eq!(
            diagram.pairs,
            vec![
                IndexPair { birth: 0, death: None, dimension: 0 },
                IndexPair { birth: 1, death: Some(3), dimension: 0 },
                IndexPair { birth: 2, death: None, dimension: 0 },
            ]
        );
        assert_eq!(diagram.unreduced, vec![4]);
    }

    #[test]
    fn test_write_intervals() {
        let diagram = Diagram {
            pairs: vec![
                PersistencePair {
                    dim: 0,
                    birth: 0.0,
                    death: None,
                    birth_id: 0,
                    death_id: None,
                },
                PersistencePair {
                    dim: 1,
                    birth: 1.0,
                    death: Some(2.5),
                    birth_id: 5,
                    death_id: Some(6),
                },
                PersistencePair {
                    dim: 0,
                    birth: 1.0,
                    death: Some(1.0),
                    birth_id: 1,
                    death_id: Some(3),
                },
            ],
            unreduced: Vec::new(),
        };
        let mut out = Vec::new();
        write_intervals(&mut out, &diagram, 0.0).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0 0 inf\n1 1 2.5\n0 1 1\n"
        );
        let mut out = Vec::new();
        write_intervals(&mut out, &diagram, 0.5).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0 0 inf\n1 1 2.5\n");
    }
}
