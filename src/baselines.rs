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

//! Simple recommenders implementing the model contract. They serve as reference points when
//! comparing algorithms and as examples of how to plug an algorithm into the evaluation core.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::RecError;
use crate::io;
use crate::model::{Context, Recommender};
use crate::similarity::Axis;
use crate::types::{SparseVector, SymmMatrix};

/// Names accepted by `by_name`
pub const ALGORITHMS: [&str; 6] = ["GlobalAvg", "UserAvg", "ItemAvg", "MostPop", "Random", "ItemKNN"];

/// Creates a fresh, untrained recommender for one of the names in `ALGORITHMS`.
pub fn by_name(name: &str) -> Result<Box<dyn Recommender>, RecError> {
    match name.to_lowercase().as_str() {
        "globalavg" => Ok(Box::new(GlobalAverage)),
        "useravg" => Ok(Box::new(UserAverage::default())),
        "itemavg" => Ok(Box::new(ItemAverage::default())),
        "mostpop" => Ok(Box::new(MostPopular)),
        "random" => Ok(Box::new(RandomGuess::default())),
        "itemknn" => Ok(Box::new(ItemKnn::new(ItemKnn::DEFAULT_NEIGHBOURS))),
        _ => Err(RecError::Configuration(
            format!("unknown algorithm '{}', expected one of {:?}", name, ALGORITHMS))),
    }
}

/// Predicts the mean of all training ratings for everyone.
pub struct GlobalAverage;

impl Recommender for GlobalAverage {
    fn name(&self) -> &str {
        "GlobalAvg"
    }
}

/// Mean of each vector, with a fallback for vectors without ratings
fn means<'a, I>(vectors: I, fallback: f64) -> Vec<f64>
    where I: Iterator<Item=&'a SparseVector> {

    vectors
        .map(|vector| if vector.is_empty() { fallback } else { vector.sum() / vector.len() as f64 })
        .collect()
}

/// Predicts the mean training rating of the user.
#[derive(Default)]
pub struct UserAverage {
    user_means: Vec<f64>,
}

impl Recommender for UserAverage {

    fn name(&self) -> &str {
        "UserAvg"
    }

    fn train(&mut self, ctx: &Context) -> Result<(), RecError> {
        let train = ctx.train();
        self.user_means = means((0..train.num_rows() as u32).map(|user| train.row(user)), ctx.global_mean());
        Ok(())
    }

    fn predict(&self, ctx: &Context, user: u32, _item: u32) -> f64 {
        self.user_means.get(user as usize).cloned().unwrap_or_else(|| ctx.global_mean())
    }

    fn persist(&self, ctx: &Context) -> Result<(), RecError> {
        io::save_model(&ctx.config().models_dir, self.name(), ctx.fold(), &self.user_means)?;
        Ok(())
    }

    fn restore(&mut self, ctx: &Context) -> Result<(), RecError> {
        self.user_means = io::load_model(&ctx.config().models_dir, self.name(), ctx.fold())?;
        Ok(())
    }
}

/// Predicts the mean training rating of the item.
#[derive(Default)]
pub struct ItemAverage {
    item_means: Vec<f64>,
}

impl Recommender for ItemAverage {

    fn name(&self) -> &str {
        "ItemAvg"
    }

    fn train(&mut self, ctx: &Context) -> Result<(), RecError> {
        let train = ctx.train();
        self.item_means = means((0..train.num_columns() as u32).map(|item| train.column(item)), ctx.global_mean());
        Ok(())
    }

    fn predict(&self, ctx: &Context, _user: u32, item: u32) -> f64 {
        self.item_means.get(item as usize).cloned().unwrap_or_else(|| ctx.global_mean())
    }

    fn persist(&self, ctx: &Context) -> Result<(), RecError> {
        io::save_model(&ctx.config().models_dir, self.name(), ctx.fold(), &self.item_means)?;
        Ok(())
    }

    fn restore(&mut self, ctx: &Context) -> Result<(), RecError> {
        self.item_means = io::load_model(&ctx.config().models_dir, self.name(), ctx.fold())?;
        Ok(())
    }
}

/// Ranks items by their number of training ratings.
pub struct MostPopular;

impl Recommender for MostPopular {

    fn name(&self) -> &str {
        "MostPop"
    }

    fn ranking_score(&self, ctx: &Context, _user: u32, item: u32) -> f64 {
        ctx.train().column_size(item) as f64
    }
}

/// Predicts uniformly random ratings within the rating scale. Predictions are reproducible
/// for a fixed `num.rand.seed`.
#[derive(Default)]
pub struct RandomGuess {
    seed: u64,
}

impl Recommender for RandomGuess {

    fn name(&self) -> &str {
        "Random"
    }

    fn describe(&self) -> String {
        format!("seed={}", self.seed)
    }

    fn initialize(&mut self, ctx: &Context) -> Result<(), RecError> {
        self.seed = ctx.config().effective_seed();
        Ok(())
    }

    fn predict(&self, ctx: &Context, user: u32, item: u32) -> f64 {
        let pair = ((user as u64) << 32) | item as u64;
        let mut rng = StdRng::seed_from_u64(self.seed ^ pair);

        let scale = ctx.scale();
        if scale.range() > 0.0 {
            rng.gen_range(scale.min()..scale.max())
        } else {
            scale.min()
        }
    }
}

/// Item-based k nearest neighbours: predicts the item mean plus the similarity-weighted
/// deviations of the user's ratings on the `k` most similar items the user has rated.
pub struct ItemKnn {
    k: usize,
    item_means: Vec<f64>,
    correlations: SymmMatrix,
}

impl ItemKnn {

    pub const DEFAULT_NEIGHBOURS: usize = 20;

    pub fn new(k: usize) -> Self {
        ItemKnn { k, item_means: Vec::new(), correlations: SymmMatrix::default() }
    }
}

impl Recommender for ItemKnn {

    fn name(&self) -> &str {
        "ItemKNN"
    }

    fn describe(&self) -> String {
        format!("k={}", self.k)
    }

    fn initialize(&mut self, ctx: &Context) -> Result<(), RecError> {
        if self.k == 0 {
            return Err(RecError::Configuration(String::from("ItemKNN needs at least one neighbour")));
        }

        self.correlations = ctx.similarity_matrix(Axis::Item);
        debug!("{} uses {} item-item correlations", self.name(), self.correlations.len());
        Ok(())
    }

    fn train(&mut self, ctx: &Context) -> Result<(), RecError> {
        let train = ctx.train();
        self.item_means = means((0..train.num_columns() as u32).map(|item| train.column(item)), ctx.global_mean());
        Ok(())
    }

    fn predict(&self, ctx: &Context, user: u32, item: u32) -> f64 {

        let mut neighbours: Vec<(u32, f64, f64)> = ctx.train().row(user).iter()
            .filter(|(other, _)| *other != item)
            .filter_map(|(other, rating)| match self.correlations.get(item, other) {
                Some(similarity) if similarity > 0.0 => Some((other, similarity, rating)),
                _ => None,
            })
            .collect();

        if neighbours.is_empty() {
            return std::f64::NAN;
        }

        neighbours.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0))
        });
        neighbours.truncate(self.k);

        let mut sum = 0.0;
        let mut weights = 0.0;

        for (other, similarity, rating) in neighbours {
            sum += similarity * (rating - self.item_means[other as usize]);
            weights += similarity;
        }

        self.item_means[item as usize] + sum / weights
    }
}
