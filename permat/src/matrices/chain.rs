//! The chain matrix: a basis of the cycle/boundary space with explicit
//! pivots and pairing.

use rustc_hash::FxHashMap;

use crate::columns::{Column, Entry};
use crate::diagram::{IndexDiagram, IndexPair, RepresentativeCycle};
use crate::fields::{Invertible, NonZeroCoefficient};
use crate::matrices::{validate_boundary, InsertBoundary};
use crate::{Index, PermatError};

/// One basis chain: the column, its stored pivot (the largest cell id in
/// the chain, never recomputed) and the chain it is paired with, if any.
#[derive(Debug)]
struct ChainSlot<C> {
    chain: C,
    pivot: Index,
    paired: Option<Index>,
}

/// Maintains a basis in which every column is either unpaired (a cycle,
/// an essential class so far) or paired with the chain whose boundary it
/// is (a finite interval).
///
/// Insertion of a cell reduces its boundary against the unpaired cycle
/// chains. A boundary that reduces to zero makes the new cell a cycle of
/// its own; otherwise the first cycle hit by the reduction (the one with
/// the youngest pivot) absorbs the whole combination and is paired with the
/// new cell. Pivots form a bijection between cells and chains, which is
/// what the zigzag `remove_last` step relies on.
#[derive(Debug)]
pub struct ChainMatrix<C: Column> {
    columns: Vec<ChainSlot<C>>,
    dimensions: Vec<u32>,
    pivot_to_column: FxHashMap<Index, Index>,
}

impl<C: Column> Default for ChainMatrix<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Column> ChainMatrix<C> {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            dimensions: Vec::new(),
            pivot_to_column: FxHashMap::default(),
        }
    }

    pub fn n_columns(&self) -> Index {
        self.columns.len()
    }

    pub fn dimension(&self, column: Index) -> u32 {
        self.dimensions[column]
    }

    pub fn chain_entries(&self, column: Index) -> Vec<Entry<C::Coefficient>> {
        self.columns[column].chain.entries()
    }

    /// The stored pivot, a cell id; not recomputed from the content.
    pub fn pivot(&self, column: Index) -> Index {
        self.columns[column].pivot
    }

    pub fn pivot_value(&self, column: Index) -> Option<C::Coefficient> {
        let slot = &self.columns[column];
        slot.chain.coefficient(slot.pivot)
    }

    pub fn is_paired(&self, column: Index) -> bool {
        self.columns[column].paired.is_some()
    }

    pub fn paired_chain(&self, column: Index) -> Option<Index> {
        self.columns[column].paired
    }

    /// The chain owning `cell` as its pivot.
    pub fn chain_of_cell(&self, cell: Index) -> Option<Index> {
        self.pivot_to_column.get(&cell).copied()
    }

    /// `target += source` between chain columns. When the addition zeroes
    /// the target's stored pivot the two chains swap pivots (and pivot map
    /// entries), keeping the stored pivots truthful.
    pub fn add_to(&mut self, source: Index, target: Index) -> Result<(), PermatError> {
        if source == target {
            return Err(PermatError::InvalidFieldArgument(
                "a chain column cannot be added to itself",
            ));
        }
        let rhs = self.columns[source].chain.entries();
        self.columns[target].chain.add_entries(&rhs);
        let target_pivot = self.columns[target].pivot;
        if !self.columns[target].chain.contains(target_pivot) {
            // the addition is assumed to never zero out the column
            let source_pivot = self.columns[source].pivot;
            self.columns[target].pivot = source_pivot;
            self.columns[source].pivot = target_pivot;
            self.pivot_to_column.insert(source_pivot, target);
            self.pivot_to_column.insert(target_pivot, source);
        }
        Ok(())
    }

    /// `column *= c`. Multiplying a chain column by zero would invalidate
    /// both the basis and the stored pivot, so it is an error.
    pub fn scale_chain(
        &mut self,
        column: Index,
        c: Option<C::Coefficient>,
    ) -> Result<(), PermatError> {
        match c {
            None => Err(PermatError::InvalidFieldArgument(
                "a chain column must not be multiplied by zero",
            )),
            Some(c) => {
                self.columns[column].chain.scale(Some(c));
                Ok(())
            }
        }
    }

    /// Pairs in index space. Every chain is either unpaired (essential) or
    /// one half of a `(birth cell, death cell)` pair.
    pub fn index_pairs(&self) -> IndexDiagram {
        let mut pairs = Vec::new();
        for slot in &self.columns {
            match slot.paired {
                None => pairs.push(IndexPair {
                    birth: slot.pivot,
                    death: None,
                    dimension: self.dimensions[slot.pivot],
                }),
                Some(partner) => {
                    // emit once, from the birth side
                    if self.columns[partner].pivot > slot.pivot {
                        pairs.push(IndexPair {
                            birth: slot.pivot,
                            death: Some(self.columns[partner].pivot),
                            dimension: self.dimensions[slot.pivot],
                        });
                    }
                }
            }
        }
        pairs.sort();
        IndexDiagram {
            pairs,
            unreduced: Vec::new(),
        }
    }

    /// The cycle of a pair: the birth chain's content.
    pub fn representative_cycle(&self, pair: &IndexPair) -> Option<RepresentativeCycle> {
        let column = self.chain_of_cell(pair.birth)?;
        Some(RepresentativeCycle {
            pair_id: pair.birth as u64,
            chain: self.columns[column]
                .chain
                .entries()
                .iter()
                .map(|e| e.row as u64)
                .collect(),
        })
    }

    /// Zigzag backward step: remove the last inserted cell.
    ///
    /// The last cell's row appears in no other chain (any chain containing
    /// it would need a pivot at least as large), so dropping its column is
    /// safe; a paired partner becomes unpaired again.
    pub fn remove_last(&mut self) -> Result<(), PermatError> {
        let Some(slot) = self.columns.pop() else {
            return Err(PermatError::OutOfOrderBoundary {
                column: 0,
                reason: "nothing to remove",
            });
        };
        let cell = self.columns.len();
        if slot.pivot != cell {
            self.columns.push(slot);
            return Err(PermatError::PivotInvariantViolation(
                "the last chain does not own the last cell",
            ));
        }
        self.pivot_to_column.remove(&cell);
        self.dimensions.pop();
        if let Some(partner) = slot.paired {
            self.columns[partner].paired = None;
        }
        Ok(())
    }
}

impl<C: Column> InsertBoundary for ChainMatrix<C>
where
    C::Coefficient: Invertible,
{
    type Coefficient = C::Coefficient;

    fn insert_boundary(
        &mut self,
        boundary: &[Entry<C::Coefficient>],
        dimension: u32,
    ) -> Result<Index, PermatError> {
        let cell = self.columns.len();
        validate_boundary(boundary, cell)?;

        // Reduce the boundary in the chain basis. Pivots form a complete
        // basis of the inserted cells, and the combination only ever runs
        // through unpaired (cycle) chains: the paired components of a cycle
        // cancel exactly.
        let mut working = C::from_entries(boundary.to_vec());
        let mut combination: Vec<(Index, C::Coefficient)> = Vec::new();
        while let Some(p) = working.pivot() {
            let owner = self
                .pivot_to_column
                .get(&p)
                .copied()
                .ok_or(PermatError::PivotInvariantViolation(
                    "boundary pivot without an owning chain",
                ))?;
            let slot = &self.columns[owner];
            if slot.paired.is_some() {
                return Err(PermatError::PivotInvariantViolation(
                    "boundary reduction reached a paired chain",
                ));
            }
            let pivot_value = slot.chain.coefficient(p).ok_or(
                PermatError::PivotInvariantViolation("stored pivot missing from chain"),
            )?;
            let working_value = working
                .pivot_entry()
                .expect("pivot present")
                .coeff;
            // the boundary contains `coefficient` times this chain
            let coefficient = working_value * pivot_value.inverse();
            working.add_multiple(
                &slot.chain.entries(),
                Some(coefficient.additive_inverse()),
            );
            combination.push((owner, coefficient));
        }

        let paired = match combination.first().copied() {
            None => None,
            Some((absorber, absorber_coefficient)) => {
                // The first chain hit owns the youngest pivot. Replace its
                // content by the whole combination (pivot unchanged) and
                // pair it with the new cell, whose own chain then satisfies
                // `boundary(new chain) = absorber chain`.
                self.columns[absorber]
                    .chain
                    .scale(Some(absorber_coefficient));
                for &(other, coefficient) in &combination[1..] {
                    let rhs = self.columns[other].chain.entries();
                    self.columns[absorber].chain.add_multiple(&rhs, Some(coefficient));
                }
                self.columns[absorber].paired = Some(cell);
                Some(absorber)
            }
        };

        self.columns.push(ChainSlot {
            chain: C::from_entries(vec![Entry::new(cell, C::Coefficient::one())]),
            pivot: cell,
            paired,
        });
        self.pivot_to_column.insert(cell, cell);
        self.dimensions.push(dimension);
        Ok(cell)
    }
}
