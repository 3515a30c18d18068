/*
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

//! Pairwise correlations between sparse rating vectors, the symmetric correlation cache and
//! the diversity of a ranked list of items.

use tracing::debug;

use crate::config::Config;
use crate::types::{RatingScale, SparseMatrix, SparseVector, SymmMatrix};

/// Correlation method, selected via the `similarity` configuration key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Similarity {
    /// Cosine over co-observed ratings
    Cos,
    /// Cosine over the full vectors, one-sided entries included
    CosBinary,
    /// Mean squared difference
    Msd,
    /// Constrained Pearson, centered at the midpoint of the rating scale
    Cpc,
    /// Extended Jaccard
    ExJaccard,
    /// Pearson correlation
    Pcc,
}

impl Similarity {

    /// Unknown names fall back to Pearson correlation.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "cos" => Similarity::Cos,
            "cos-binary" => Similarity::CosBinary,
            "msd" => Similarity::Msd,
            "cpc" => Similarity::Cpc,
            "exjaccard" => Similarity::ExJaccard,
            _ => Similarity::Pcc,
        }
    }

    pub fn name(&self) -> &'static str {
        match *self {
            Similarity::Cos => "cos",
            Similarity::CosBinary => "cos-binary",
            Similarity::Msd => "msd",
            Similarity::Cpc => "cpc",
            Similarity::ExJaccard => "exjaccard",
            Similarity::Pcc => "pcc",
        }
    }
}

/// Whether to correlate users (rows) or items (columns) of a rating matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    User,
    Item,
}

/// A configured correlation function: method, shrinkage and the rating scale midpoint used
/// by constrained Pearson.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correlation {
    pub method: Similarity,
    pub shrinkage: Option<u32>,
    pub midpoint: f64,
}

impl Correlation {

    pub fn new(method: Similarity, shrinkage: Option<u32>, scale: &RatingScale) -> Self {
        Correlation { method, shrinkage, midpoint: scale.median() }
    }

    pub fn from_config(config: &Config, scale: &RatingScale) -> Self {
        Correlation::new(config.similarity, config.shrinkage(), scale)
    }

    /// Correlation between two vectors, `None` if it cannot be computed (e.g. too few
    /// co-observed ratings or a zero denominator).
    pub fn correlate(&self, a: &SparseVector, b: &SparseVector) -> Option<f64> {

        let mut values_a = Vec::new();
        let mut values_b = Vec::new();

        for index in b.indices() {
            if let (Some(value_a), Some(value_b)) = (a.get(index), b.get(index)) {
                values_a.push(value_a);
                values_b.push(value_b);
            }
        }

        let similarity = match self.method {
            Similarity::Cos => cos(&values_a, &values_b),
            Similarity::CosBinary => {
                let denominator = a.inner(a).sqrt() * b.inner(b).sqrt();
                defined(a.inner(b) / denominator)
            },
            Similarity::Msd => msd(&values_a, &values_b),
            Similarity::Cpc => cpc(&values_a, &values_b, self.midpoint),
            Similarity::ExJaccard => ex_jaccard(&values_a, &values_b),
            Similarity::Pcc => pcc(&values_a, &values_b),
        };

        similarity.map(|value| shrink(value, values_a.len(), self.shrinkage))
    }
}

/// Discounts a similarity supported by `n` co-observed ratings by `n / (n + shrinkage)`.
pub fn shrink(similarity: f64, n: usize, shrinkage: Option<u32>) -> f64 {
    match shrinkage {
        Some(shrinkage) if shrinkage > 0 => similarity * n as f64 / (n as f64 + shrinkage as f64),
        _ => similarity,
    }
}

#[inline(always)]
fn defined(value: f64) -> Option<f64> {
    if value.is_finite() { Some(value) } else { None }
}

pub fn cos(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    defined(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// `1 / (1 + mean squared difference)`, in `(0, 1]`.
pub fn msd(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let sum: f64 = a.iter().zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();

    defined(1.0 / (1.0 + sum / a.len() as f64))
}

pub fn cpc(a: &[f64], b: &[f64], midpoint: f64) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let mut numerator = 0.0;
    let mut sum_a = 0.0;
    let mut sum_b = 0.0;

    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - midpoint;
        let dy = y - midpoint;
        numerator += dx * dy;
        sum_a += dx * dx;
        sum_b += dy * dy;
    }

    defined(numerator / (sum_a.sqrt() * sum_b.sqrt()))
}

pub fn ex_jaccard(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    defined(dot / (norm_a + norm_b - dot))
}

pub fn pcc(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() < 2 || a.len() != b.len() {
        return None;
    }

    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut sum_a = 0.0;
    let mut sum_b = 0.0;

    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        numerator += dx * dy;
        sum_a += dx * dx;
        sum_b += dy * dy;
    }

    defined(numerator / (sum_a.sqrt() * sum_b.sqrt()))
}

/// Computes the correlations of all pairs of users or items with at least one rating. Only
/// defined coefficients are stored. This is quadratic in the number of users or items.
pub fn build_similarity_matrix(
    matrix: &SparseMatrix,
    axis: Axis,
    correlation: &Correlation,
) -> SymmMatrix {

    debug!("Build {} similarity matrix ...", match axis { Axis::User => "user", Axis::Item => "item" });

    let count = match axis {
        Axis::User => matrix.num_rows(),
        Axis::Item => matrix.num_columns(),
    } as u32;

    let vector = |index: u32| match axis {
        Axis::User => matrix.row(index),
        Axis::Item => matrix.column(index),
    };

    let mut corrs = SymmMatrix::new(count as usize);

    for i in 0..count {
        let iv = vector(i);
        if iv.is_empty() {
            continue;
        }

        for j in (i + 1)..count {
            if let Some(similarity) = correlation.correlate(iv, vector(j)) {
                corrs.set(i, j, similarity);
            }
        }
    }

    corrs
}

/// Diversity of the first `cutoff` items of a ranked list: half the mean dissimilarity
/// `1 - corr(i, j)` over all pairs with a defined item-item correlation. Missing correlations
/// are computed from the item columns of `train` and remembered in `cache`. Returns `None` if
/// no pair has a defined correlation.
pub fn diversity_at(
    ranked_items: &[u32],
    cutoff: usize,
    train: &SparseMatrix,
    cache: &mut SymmMatrix,
    correlation: &Correlation,
) -> Option<f64> {

    let cutoff = cutoff.min(ranked_items.len());

    let mut num = 0;
    let mut sum = 0.0;

    for (position, &i) in ranked_items[..cutoff].iter().enumerate() {
        for &j in ranked_items[(position + 1)..cutoff].iter() {

            let corr = match cache.get(i, j) {
                Some(corr) => Some(corr),
                None => {
                    let computed = correlation.correlate(train.column(i), train.column(j));
                    if let Some(corr) = computed {
                        cache.set(i, j, corr);
                    }
                    computed
                }
            };

            if let Some(corr) = corr {
                sum += 1.0 - corr;
                num += 1;
            }
        }
    }

    if num == 0 {
        None
    } else {
        Some(0.5 * sum / num as f64)
    }
}
