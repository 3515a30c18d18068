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

//! The contract between the evaluation core and concrete recommendation algorithms.

use std::sync::Arc;

use crate::config::{Config, View, COLD_START_THRESHOLD};
use crate::error::RecError;
use crate::similarity::{self, Axis, Correlation};
use crate::stats::Renaming;
use crate::types::{RatingScale, SparseMatrix, SymmMatrix};

/// Lifecycle of a recommender within one run. Transitions only move forward, one step at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    Uninitialized,
    Initialized,
    Trained,
    CleanedUp,
}

impl Lifecycle {

    fn next(self) -> Option<Lifecycle> {
        match self {
            Lifecycle::Uninitialized => Some(Lifecycle::Initialized),
            Lifecycle::Initialized => Some(Lifecycle::Trained),
            Lifecycle::Trained => Some(Lifecycle::CleanedUp),
            Lifecycle::CleanedUp => None,
        }
    }

    pub fn advance(self, to: Lifecycle) -> Result<Lifecycle, RecError> {
        if self.next() == Some(to) {
            Ok(to)
        } else {
            Err(RecError::Lifecycle { from: self, to })
        }
    }

    /// A model restored from saved parameters skips training and is ready for evaluation.
    pub fn restore(self) -> Result<Lifecycle, RecError> {
        if self == Lifecycle::Uninitialized {
            Ok(Lifecycle::CleanedUp)
        } else {
            Err(RecError::Lifecycle { from: self, to: Lifecycle::CleanedUp })
        }
    }
}

/// A recommender together with the lifecycle state it has reached. The state only moves
/// forward, so a session can be trained and evaluated once.
pub struct Session {
    model: Box<dyn Recommender>,
    state: Lifecycle,
}

impl Session {

    pub fn new(model: Box<dyn Recommender>) -> Self {
        Session { model, state: Lifecycle::Uninitialized }
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn model(&self) -> &dyn Recommender {
        self.model.as_ref()
    }

    pub fn name(&self) -> &str {
        self.model.name()
    }

    /// Runs `hook` if the model may move to `to`, and moves it there if the hook succeeds.
    pub fn step<F>(&mut self, to: Lifecycle, hook: F) -> Result<(), RecError>
        where F: FnOnce(&mut dyn Recommender) -> Result<(), RecError>
    {
        let next = self.state.advance(to)?;
        hook(self.model.as_mut())?;
        self.state = next;
        Ok(())
    }

    /// Loads saved parameters into an uninitialized model instead of training it.
    pub fn restore(&mut self, ctx: &Context) -> Result<(), RecError> {
        let next = self.state.restore()?;
        self.model.restore(ctx)?;
        self.state = next;
        Ok(())
    }
}

/// Everything a recommender may look at during one run: the training and test matrices of a
/// fold, the shared configuration and the statistics derived from them.
pub struct Context {
    train: SparseMatrix,
    test: SparseMatrix,
    config: Arc<Config>,
    scale: RatingScale,
    global_mean: f64,
    fold: usize,
    renaming: Option<Arc<Renaming>>,
    correlations: Option<SymmMatrix>,
}

impl Context {

    pub fn new(
        train: SparseMatrix,
        test: SparseMatrix,
        config: Arc<Config>,
        scale: RatingScale,
    ) -> Result<Self, RecError> {

        if train.size() == 0 {
            return Err(RecError::Configuration(String::from("training matrix is empty")));
        }

        if train.num_rows() != test.num_rows() || train.num_columns() != test.num_columns() {
            return Err(RecError::Configuration(format!(
                "training matrix is {}x{} but test matrix is {}x{}",
                train.num_rows(), train.num_columns(), test.num_rows(), test.num_columns())));
        }

        let global_mean = train.mean();

        Ok(Context {
            train,
            test,
            config,
            scale,
            global_mean,
            fold: 0,
            renaming: None,
            correlations: None,
        })
    }

    /// Fold number for cross validation, 0 for a single run.
    pub fn with_fold(mut self, fold: usize) -> Self {
        self.fold = fold;
        self
    }

    /// Original identifiers, used when writing predictions.
    pub fn with_renaming(mut self, renaming: Arc<Renaming>) -> Self {
        self.renaming = Some(renaming);
        self
    }

    /// A precomputed item-item correlation matrix, used instead of computing correlations
    /// from scratch.
    pub fn with_correlations(mut self, correlations: SymmMatrix) -> Self {
        self.correlations = Some(correlations);
        self
    }

    pub fn train(&self) -> &SparseMatrix {
        &self.train
    }

    pub fn test(&self) -> &SparseMatrix {
        &self.test
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scale(&self) -> &RatingScale {
        &self.scale
    }

    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    pub fn fold(&self) -> usize {
        self.fold
    }

    pub fn num_users(&self) -> usize {
        self.train.num_rows()
    }

    pub fn num_items(&self) -> usize {
        self.train.num_columns()
    }

    pub fn user_name(&self, user: u32) -> String {
        match self.renaming {
            Some(ref renaming) => renaming.user_name(user).to_owned(),
            None => user.to_string(),
        }
    }

    pub fn item_name(&self, item: u32) -> String {
        match self.renaming {
            Some(ref renaming) => renaming.item_name(item).to_owned(),
            None => item.to_string(),
        }
    }

    /// The configured correlation function for this dataset
    pub fn correlation(&self) -> Correlation {
        Correlation::from_config(&self.config, &self.scale)
    }

    /// Item-item correlations: the injected matrix if there is one, otherwise a fresh matrix
    /// holding only the pairs computed so far (none).
    pub fn correlation_cache(&self) -> SymmMatrix {
        match self.correlations {
            Some(ref correlations) => correlations.clone(),
            None => SymmMatrix::new(self.num_items()),
        }
    }

    /// Full correlation matrix over users or items. An injected item-item matrix is reused.
    pub fn similarity_matrix(&self, axis: Axis) -> SymmMatrix {
        match (axis, &self.correlations) {
            (Axis::Item, Some(correlations)) => correlations.clone(),
            _ => similarity::build_similarity_matrix(&self.train, axis, &self.correlation()),
        }
    }

    /// Whether the test rating of `user` takes part in rating evaluation under the configured view.
    pub fn is_testable(&self, user: u32, _item: u32) -> bool {
        match self.config.view {
            View::All => true,
            View::ColdStart => self.train.row_size(user) < COLD_START_THRESHOLD,
        }
    }

    /// Fails unless ratings have been binarized, for algorithms which require binary feedback.
    pub fn check_binary(&self) -> Result<(), RecError> {
        if self.config.binary_threshold < 0.0 {
            Err(RecError::Configuration(format!(
                "val.binary.threshold={}, ratings must be binarized first! \
                 Try setting a non-negative value.", self.config.binary_threshold)))
        } else {
            Ok(())
        }
    }

    /// Maps a rating to `[0, 1]`
    pub fn normalize(&self, rating: f64) -> f64 {
        (rating - self.scale.min()) / self.scale.range()
    }

    /// Maps a value from `[0, 1]` back to the rating scale
    pub fn denormalize(&self, value: f64) -> f64 {
        self.scale.min() + value * self.scale.range()
    }
}

/// Logistic function
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Derivative of the logistic function
pub fn logistic_gradient(x: f64) -> f64 {
    logistic(x) * logistic(-x)
}

/// Unnormalized gaussian kernel with mean `mu` and standard deviation `sigma`
pub fn gaussian(x: f64, mu: f64, sigma: f64) -> f64 {
    (-0.5 * (x - mu).powi(2) / (sigma * sigma)).exp()
}

/// A recommendation algorithm. Every hook has a default, so that the trivial implementation
/// predicts the global mean rating of the training data.
///
/// A run calls `initialize`, `train` and `cleanup` exactly once and in this order (or only
/// `restore`), and then evaluates with `predict_bounded` (rating prediction) or
/// `ranking_score` (item ranking). An error from any of the lifecycle hooks aborts the run.
pub trait Recommender {

    /// Name used in logs and output files
    fn name(&self) -> &str;

    /// Algorithm settings, logged before training starts
    fn describe(&self) -> String {
        String::new()
    }

    /// Allocates model state, may inspect the training data.
    fn initialize(&mut self, _ctx: &Context) -> Result<(), RecError> {
        Ok(())
    }

    /// Learns the model parameters.
    fn train(&mut self, _ctx: &Context) -> Result<(), RecError> {
        Ok(())
    }

    /// Releases intermediate data which is not needed for predictions.
    fn cleanup(&mut self) -> Result<(), RecError> {
        Ok(())
    }

    /// Raw predicted rating, NaN if the model cannot predict this pair.
    fn predict(&self, ctx: &Context, _user: u32, _item: u32) -> f64 {
        ctx.global_mean()
    }

    /// Predicted rating, clamped to the rating scale if `bound` is set.
    fn predict_bounded(&self, ctx: &Context, user: u32, item: u32, bound: bool) -> f64 {
        let prediction = self.predict(ctx, user, item);
        if bound {
            ctx.scale().clamp(prediction)
        } else {
            prediction
        }
    }

    /// Score used to rank candidate items for a user, higher is better. NaN excludes the item.
    fn ranking_score(&self, ctx: &Context, user: u32, item: u32) -> f64 {
        self.predict_bounded(ctx, user, item, false)
    }

    /// Saves the learned parameters.
    fn persist(&self, _ctx: &Context) -> Result<(), RecError> {
        Ok(())
    }

    /// Loads previously saved parameters.
    fn restore(&mut self, _ctx: &Context) -> Result<(), RecError> {
        Ok(())
    }
}
