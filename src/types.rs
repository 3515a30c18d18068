/**
 * RecoEval
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::cmp::Ordering;

use fnv::{FnvHashMap, FnvHashSet};

use crate::error::RecError;

/// A sparse vector of ratings, indexed by user or item ids. Absent indices are unobserved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseVector {
    entries: FnvHashMap<u32, f64>,
}

impl SparseVector {

    pub fn new() -> Self {
        SparseVector { entries: FnvHashMap::default() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SparseVector {
            entries: FnvHashMap::with_capacity_and_hasher(capacity, Default::default())
        }
    }

    pub fn set(&mut self, index: u32, value: f64) {
        self.entries.insert(index, value);
    }

    pub fn contains(&self, index: u32) -> bool {
        self.entries.contains_key(&index)
    }

    pub fn get(&self, index: u32) -> Option<f64> {
        self.entries.get(&index).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Observed indices in ascending order
    pub fn indices(&self) -> Vec<u32> {
        let mut indices: Vec<u32> = self.entries.keys().cloned().collect();
        indices.sort_unstable();
        indices
    }

    pub fn iter(&self) -> impl Iterator<Item=(u32, f64)> + '_ {
        self.entries.iter().map(|(index, value)| (*index, *value))
    }

    pub fn sum(&self) -> f64 {
        self.entries.values().sum()
    }

    /// Sparse dot product, only indices present in both vectors contribute.
    pub fn inner(&self, other: &SparseVector) -> f64 {
        let (smaller, larger) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };

        smaller.iter()
            .filter_map(|(index, value)| larger.get(index).map(|other_value| value * other_value))
            .sum()
    }
}

/// A sparse user-item rating matrix with both row (user) and column (item) access.
#[derive(Clone, Debug)]
pub struct SparseMatrix {
    rows: Vec<SparseVector>,
    columns: Vec<SparseVector>,
    num_entries: usize,
}

impl SparseMatrix {

    pub fn new(num_rows: usize, num_columns: usize) -> Self {
        SparseMatrix {
            rows: vec![SparseVector::new(); num_rows],
            columns: vec![SparseVector::new(); num_columns],
            num_entries: 0,
        }
    }

    /// Builds a matrix from `(row, column, value)` triples, later triples overwrite earlier ones.
    pub fn from_triples<I>(num_rows: usize, num_columns: usize, triples: I) -> Self
        where I: IntoIterator<Item=(u32, u32, f64)> {

        let mut matrix = SparseMatrix::new(num_rows, num_columns);
        for (row, column, value) in triples {
            matrix.set(row, column, value);
        }
        matrix
    }

    pub fn set(&mut self, row: u32, column: u32, value: f64) {
        if !self.rows[row as usize].contains(column) {
            self.num_entries += 1;
        }
        self.rows[row as usize].set(column, value);
        self.columns[column as usize].set(row, value);
    }

    pub fn get(&self, row: u32, column: u32) -> Option<f64> {
        self.rows.get(row as usize).and_then(|vector| vector.get(column))
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn row(&self, row: u32) -> &SparseVector {
        &self.rows[row as usize]
    }

    pub fn column(&self, column: u32) -> &SparseVector {
        &self.columns[column as usize]
    }

    pub fn row_size(&self, row: u32) -> usize {
        self.rows.get(row as usize).map_or(0, SparseVector::len)
    }

    pub fn column_size(&self, column: u32) -> usize {
        self.columns.get(column as usize).map_or(0, SparseVector::len)
    }

    /// Number of stored entries
    pub fn size(&self) -> usize {
        self.num_entries
    }

    pub fn sum(&self) -> f64 {
        self.rows.iter().map(SparseVector::sum).sum()
    }

    /// Mean of all stored entries, NaN for an empty matrix.
    pub fn mean(&self) -> f64 {
        self.sum() / self.num_entries as f64
    }

    /// Indices of columns with at least one entry, ascending.
    pub fn columns(&self) -> Vec<u32> {
        (0..self.columns.len() as u32)
            .filter(|column| !self.columns[*column as usize].is_empty())
            .collect()
    }

    /// All entries in row-major order, columns ascending within a row.
    pub fn entries(&self) -> Vec<(u32, u32, f64)> {
        let mut entries = Vec::with_capacity(self.num_entries);
        for (row, vector) in self.rows.iter().enumerate() {
            for column in vector.indices() {
                if let Some(value) = vector.get(column) {
                    entries.push((row as u32, column, value));
                }
            }
        }
        entries
    }
}

/// Upper triangular symmetric matrix of pairwise coefficients. Pairs which have never been
/// computed read as `None`, a stored coefficient of 0.0 is a regular value.
#[derive(Clone, Debug, Default)]
pub struct SymmMatrix {
    dimension: usize,
    coefficients: FnvHashMap<(u32, u32), f64>,
}

impl SymmMatrix {

    pub fn new(dimension: usize) -> Self {
        SymmMatrix { dimension, coefficients: FnvHashMap::default() }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn get(&self, i: u32, j: u32) -> Option<f64> {
        self.coefficients.get(&key(i, j)).cloned()
    }

    pub fn contains(&self, i: u32, j: u32) -> bool {
        self.coefficients.contains_key(&key(i, j))
    }

    /// Stores a coefficient for the unordered pair; the diagonal is never stored.
    pub fn set(&mut self, i: u32, j: u32, coefficient: f64) {
        if i != j {
            self.coefficients.insert(key(i, j), coefficient);
        }
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// All stored coefficients involving `i`, as `(other, coefficient)`.
    pub fn neighbours(&self, i: u32) -> Vec<(u32, f64)> {
        self.coefficients.iter()
            .filter_map(|(&(a, b), coefficient)| {
                if a == i {
                    Some((b, *coefficient))
                } else if b == i {
                    Some((a, *coefficient))
                } else {
                    None
                }
            })
            .collect()
    }
}

#[inline(always)]
fn key(i: u32, j: u32) -> (u32, u32) {
    if i < j { (i, j) } else { (j, i) }
}

/// The ordered rating levels of a dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct RatingScale {
    levels: Vec<f64>,
}

impl RatingScale {

    pub fn new(levels: Vec<f64>) -> Result<Self, RecError> {
        if levels.is_empty() {
            return Err(RecError::Configuration(String::from("rating scale must not be empty")));
        }

        if levels.windows(2).any(|pair| !(pair[0] < pair[1])) {
            return Err(RecError::Configuration(
                format!("rating scale must be strictly increasing, got {:?}", levels)));
        }

        Ok(RatingScale { levels })
    }

    /// Collects the distinct observed ratings of a matrix
    pub fn observed(matrix: &SparseMatrix) -> Result<Self, RecError> {
        let mut levels: Vec<f64> = matrix.entries().into_iter().map(|(_, _, value)| value).collect();
        levels.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        levels.dedup();
        RatingScale::new(levels)
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn min(&self) -> f64 {
        self.levels[0]
    }

    pub fn max(&self) -> f64 {
        self.levels[self.levels.len() - 1]
    }

    pub fn range(&self) -> f64 {
        self.max() - self.min()
    }

    pub fn median(&self) -> f64 {
        (self.min() + self.max()) / 2.0
    }

    pub fn clamp(&self, value: f64) -> f64 {
        if value > self.max() {
            self.max()
        } else if value < self.min() {
            self.min()
        } else {
            value
        }
    }
}

/// An item with its ranking score for a particular user.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ScoredItem {
    pub item: u32,
    pub score: f64,
}

/// Orders by descending score, then by ascending item id, which gives a total order for
/// defined scores.
pub fn by_score_descending(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    match b.score.partial_cmp(&a.score) {
        Some(Ordering::Equal) | None => a.item.cmp(&b.item),
        Some(ordering) => ordering,
    }
}

pub type ItemSet = FnvHashSet<u32>;


#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn inner_product_over_shared_indices() {
        let mut a = SparseVector::new();
        a.set(0, 1.0);
        a.set(1, 2.0);
        a.set(3, 4.0);

        let mut b = SparseVector::new();
        b.set(1, 3.0);
        b.set(3, 0.5);
        b.set(7, 9.0);

        assert_eq!(a.inner(&b), 8.0);
        assert_eq!(b.inner(&a), 8.0);
        assert_eq!(a.indices(), vec![0, 1, 3]);
    }

    #[test]
    fn matrix_views_agree() {
        let matrix = SparseMatrix::from_triples(2, 3, vec![
            (0, 0, 5.0), (0, 1, 3.0), (1, 0, 4.0), (1, 0, 2.0),
        ]);

        assert_eq!(matrix.size(), 3);
        assert_eq!(matrix.row_size(0), 2);
        assert_eq!(matrix.column_size(0), 2);
        assert_eq!(matrix.column(0).get(1), Some(2.0));
        assert_eq!(matrix.columns(), vec![0, 1]);
        assert_eq!(matrix.sum(), 10.0);
        assert_eq!(matrix.entries(), vec![(0, 0, 5.0), (0, 1, 3.0), (1, 0, 2.0)]);
    }

    #[test]
    fn symmetric_matrix_distinguishes_zero_from_missing() {
        let mut corrs = SymmMatrix::new(4);
        assert_eq!(corrs.get(1, 2), None);

        corrs.set(2, 1, 0.0);
        assert_eq!(corrs.get(1, 2), Some(0.0));
        assert!(corrs.contains(2, 1));

        corrs.set(3, 3, 1.0);
        assert!(!corrs.contains(3, 3));
        assert_eq!(corrs.len(), 1);
    }

    #[test]
    fn rating_scale_validation() {
        assert!(RatingScale::new(vec![]).is_err());
        assert!(RatingScale::new(vec![1.0, 1.0, 2.0]).is_err());

        let scale = RatingScale::new(vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(scale.range(), 4.0);
        assert_eq!(scale.median(), 3.0);
        assert_eq!(scale.clamp(7.5), 5.0);
        assert_eq!(scale.clamp(-1.0), 1.0);
    }

    #[test]
    fn scored_items_order_by_score_then_item() {
        let mut items = vec![
            ScoredItem { item: 3, score: 0.5 },
            ScoredItem { item: 1, score: 0.5 },
            ScoredItem { item: 2, score: 1.5 },
        ];
        items.sort_by(by_score_descending);

        let order: Vec<u32> = items.iter().map(|scored| scored.item).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }
}
