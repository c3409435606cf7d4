//! Base matrix with column compression.

use std::hash::{Hash, Hasher};

use petgraph::unionfind::UnionFind;
use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;

use crate::columns::{scale_entries, Column, Entry};
use crate::matrices::InsertBoundary;
use crate::{Index, PermatError};

/// A base matrix in which all identical columns are compressed together into
/// one physical column.
///
/// Equivalence classes live in a union-find; a content dictionary maps a
/// column hash to the representatives carrying that content. An addition is
/// applied to the representative, so it updates every member of the target's
/// class at once — the access pattern cohomology reductions produce, where
/// runs of duplicate columns are the rule.
#[derive(Debug)]
pub struct CompressedBaseMatrix<C: Column> {
    classes: UnionFind<Index>,
    class_capacity: Index,
    /// Physical column of each class, stored at the representative's slot.
    /// `None` for zero columns and non-representatives.
    physical: Vec<Option<C>>,
    /// Content hash to the representatives carrying that content.
    content_dict: FxHashMap<u64, SmallVec<[Index; 2]>>,
    n_columns: Index,
}

fn content_hash<CF: Hash>(entries: &[Entry<CF>]) -> u64 {
    let mut hasher = FxHasher::default();
    entries.hash(&mut hasher);
    hasher.finish()
}

impl<C: Column> Default for CompressedBaseMatrix<C> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<C: Column> CompressedBaseMatrix<C> {
    pub fn with_capacity(columns: Index) -> Self {
        let capacity = columns.max(1);
        Self {
            classes: UnionFind::new(capacity),
            class_capacity: capacity,
            physical: Vec::new(),
            content_dict: FxHashMap::default(),
            n_columns: 0,
        }
    }

    /// Number of columns inserted, the redundant ones included.
    pub fn n_columns(&self) -> Index {
        self.n_columns
    }

    /// Number of distinct equivalence classes among the inserted columns.
    pub fn n_classes(&self) -> Index {
        (0..self.n_columns)
            .filter(|&i| self.classes.find(i) == i)
            .count()
    }

    /// Representative of the column's equivalence class.
    pub fn representative(&self, column: Index) -> Index {
        self.classes.find(column)
    }

    /// Content of the column (shared with its whole class), sorted by row.
    pub fn column_entries(&self, column: Index) -> Vec<Entry<C::Coefficient>> {
        match &self.physical[self.classes.find(column)] {
            Some(col) => col.entries(),
            None => Vec::new(),
        }
    }

    pub fn is_zero_column(&self, column: Index) -> bool {
        self.physical[self.classes.find(column)].is_none()
    }

    pub fn is_zero_entry(&self, column: Index, row: Index) -> bool {
        match &self.physical[self.classes.find(column)] {
            Some(col) => !col.contains(row),
            None => true,
        }
    }

    /// The union-find is sized ahead of time; rebuild it with doubled
    /// capacity when an insertion outgrows it, moving physical columns to
    /// the representatives the rebuilt structure elects.
    fn ensure_class_capacity(&mut self, column: Index) {
        if column < self.class_capacity {
            return;
        }
        let new_capacity = (self.class_capacity * 2).max(column + 1);
        let labeling =
            std::mem::replace(&mut self.classes, UnionFind::new(new_capacity)).into_labeling();
        for (i, label) in labeling.iter().enumerate() {
            self.classes.union(i, *label);
        }
        self.class_capacity = new_capacity;

        // re-home physical columns whose class representative changed
        for old_rep in 0..self.physical.len() {
            if self.physical[old_rep].is_none() {
                continue;
            }
            let new_rep = self.classes.find(old_rep);
            if new_rep != old_rep {
                let col = self.physical[old_rep].take();
                let entries = col.as_ref().expect("taken Some").entries();
                self.physical[new_rep] = col;
                self.relabel_in_dict(content_hash(&entries), old_rep, Some(new_rep));
            }
        }
    }

    fn relabel_in_dict(&mut self, hash: u64, old: Index, new: Option<Index>) {
        let candidates = self.content_dict.entry(hash).or_default();
        candidates.retain(|&mut r| r != old);
        if let Some(new) = new {
            if !candidates.contains(&new) {
                candidates.push(new);
            }
        }
        if candidates.is_empty() {
            self.content_dict.remove(&hash);
        }
    }

    /// Hook a representative (with known content) into the dictionary,
    /// merging its class into an existing one when the content already
    /// occurs. Returns the representative after any merge.
    fn register(&mut self, rep: Index, entries: &[Entry<C::Coefficient>]) -> Index {
        let hash = content_hash(entries);
        let candidates = self.content_dict.entry(hash).or_default().clone();
        for candidate in candidates {
            if candidate == rep {
                continue;
            }
            let same = match &self.physical[candidate] {
                Some(col) => col.entries() == entries,
                None => false,
            };
            if same {
                self.classes.union(rep, candidate);
                let winner = self.classes.find(rep);
                let loser = if winner == rep { candidate } else { rep };
                self.physical[loser] = None;
                if self.physical[winner].is_none() {
                    self.physical[winner] = Some(C::from_entries(entries.to_vec()));
                }
                self.relabel_in_dict(hash, loser, Some(winner));
                return winner;
            }
        }
        let candidates = self.content_dict.entry(hash).or_default();
        if !candidates.contains(&rep) {
            candidates.push(rep);
        }
        rep
    }

    /// Insert an ordered column at the end of the matrix. If an identical
    /// column already exists, no new physical column is kept and the
    /// relationship is recorded in the union-find.
    pub fn insert_column(&mut self, entries: &[Entry<C::Coefficient>]) -> Result<Index, PermatError> {
        let column = self.n_columns;
        for window in entries.windows(2) {
            if window[0].row >= window[1].row {
                return Err(PermatError::OutOfOrderBoundary {
                    column,
                    reason: "column rows must be strictly ascending",
                });
            }
        }
        self.ensure_class_capacity(column);
        self.physical.push(None);
        debug_assert_eq!(self.physical.len(), column + 1);
        if !entries.is_empty() {
            self.physical[column] = Some(C::from_entries(entries.to_vec()));
            self.register(column, entries);
        }
        self.n_columns += 1;
        Ok(column)
    }

    /// Apply a mutation to the target's representative: detach it from the
    /// content dictionary, mutate, re-insert, and union with any class that
    /// now carries identical content.
    fn update_target(
        &mut self,
        target: Index,
        op: impl FnOnce(&mut C),
    ) -> Result<(), PermatError> {
        let rep = self.classes.find(target);
        let mut col = match self.physical[rep].take() {
            Some(col) => {
                self.relabel_in_dict(content_hash(&col.entries()), rep, None);
                col
            }
            None => C::default(),
        };
        op(&mut col);
        if col.is_empty() {
            return Ok(());
        }
        let entries = col.entries();
        self.physical[rep] = Some(col);
        self.register(rep, &entries);
        Ok(())
    }

    /// `target class += source class`. Every member of the target's class
    /// observes the change.
    pub fn add_to(&mut self, source: Index, target: Index) -> Result<(), PermatError> {
        let rhs = self.column_entries(source);
        self.update_target(target, |col| col.add_entries(&rhs))
    }

    /// `target class = c * target class + source class`.
    pub fn multiply_target_and_add_to(
        &mut self,
        source: Index,
        c: Option<C::Coefficient>,
        target: Index,
    ) -> Result<(), PermatError> {
        let rhs = self.column_entries(source);
        self.update_target(target, |col| col.multiply_and_add(c, &rhs))
    }

    /// `target class += c * source class`.
    pub fn multiply_source_and_add_to(
        &mut self,
        c: Option<C::Coefficient>,
        source: Index,
        target: Index,
    ) -> Result<(), PermatError> {
        let rhs = scale_entries(&self.column_entries(source), c);
        self.update_target(target, |col| col.add_entries(&rhs))
    }
}

impl<C: Column> InsertBoundary for CompressedBaseMatrix<C> {
    type Coefficient = C::Coefficient;

    fn insert_boundary(
        &mut self,
        boundary: &[Entry<C::Coefficient>],
        _dimension: u32,
    ) -> Result<Index, PermatError> {
        crate::matrices::validate_boundary(boundary, self.n_columns)?;
        self.insert_column(boundary)
    }
}
