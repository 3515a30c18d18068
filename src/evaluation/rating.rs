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

//! Accuracy of rating predictions on the test ratings of a run.

use tracing::debug;

use crate::error::RecError;
use crate::evaluation::{Measure, Measures};
use crate::io::PredictionLog;
use crate::measures;
use crate::model::{Context, Recommender};

/// Computes MAE, RMSE, NMAE and the asymmetric loss over all positive, testable test ratings
/// for which the model has a defined prediction. Optionally logs every prediction.
pub fn evaluate(ctx: &Context, model: &dyn Recommender) -> Result<Measures, RecError> {

    let config = ctx.config();
    let scale = ctx.scale();

    let mut log = if config.prediction_out {
        Some(PredictionLog::create(&config.results_dir, model.name(), ctx.fold())?)
    } else {
        None
    };

    let mut sum_of_absolute_errors = 0.0;
    let mut sum_of_squared_errors = 0.0;
    let mut sum_of_asymmetric_losses = 0.0;
    let mut count = 0;

    for (user, item, rating) in ctx.test().entries() {

        if rating <= 0.0 || !ctx.is_testable(user, item) {
            continue;
        }

        let prediction = model.predict_bounded(ctx, user, item, true);
        if prediction.is_nan() {
            continue;
        }

        let error = rating - prediction;

        sum_of_absolute_errors += error.abs();
        sum_of_squared_errors += error * error;
        sum_of_asymmetric_losses +=
            measures::asymmetric_loss(rating, prediction, scale.min(), scale.max());
        count += 1;

        if let Some(ref mut log) = log {
            log.append(&ctx.user_name(user), &ctx.item_name(item), rating, prediction)?;
        }
    }

    if let Some(mut log) = log {
        log.flush()?;
        debug!("{} has written rating predictions to {}", model.name(), log.path().display());
    }

    let count = count as f64;
    let mae = sum_of_absolute_errors / count;

    let mut results = Measures::new();
    results.insert(Measure::MAE, mae);
    results.insert(Measure::RMSE, (sum_of_squared_errors / count).sqrt());
    // normalized, to compare results across different rating scales
    results.insert(Measure::NMAE, mae / scale.range());
    results.insert(Measure::ASYMM, sum_of_asymmetric_losses / count);

    Ok(results)
}


#[cfg(test)]
mod tests {

    use super::*;
    use std::sync::Arc;

    use std::{env, fs, process};

    use crate::config::{Config, View};
    use crate::stats::{DataDictionary, Renaming};
    use crate::types::{RatingScale, SparseMatrix};

    struct Constant(f64);

    impl Recommender for Constant {
        fn name(&self) -> &str {
            "Constant"
        }

        fn predict(&self, _ctx: &Context, _user: u32, item: u32) -> f64 {
            if item == 2 { std::f64::NAN } else { self.0 }
        }
    }

    fn context(config: Config, test: Vec<(u32, u32, f64)>) -> Context {
        let mut train = vec![(0, 0, 5.0), (0, 1, 3.0), (1, 0, 4.0)];
        for item in 0..6 {
            train.push((2, item, 3.0));
        }

        Context::new(
            SparseMatrix::from_triples(3, 6, train),
            SparseMatrix::from_triples(3, 6, test),
            Arc::new(config),
            RatingScale::new(vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(),
        ).unwrap()
    }

    #[test]
    fn errors_of_bounded_predictions() {
        // 7.0 is clamped to 5.0
        let ctx = context(Config::default(), vec![(1, 1, 5.0), (1, 3, 2.0)]);
        let results = evaluate(&ctx, &Constant(7.0)).unwrap();

        assert_eq!(results[&Measure::MAE], 1.5);
        assert_eq!(results[&Measure::RMSE], (4.5f64).sqrt());
        assert_eq!(results[&Measure::NMAE], 1.5 / 4.0);
        // only the disliked item predicted as liked costs: 2 * (5 - 2)
        assert_eq!(results[&Measure::ASYMM], 3.0);
    }

    #[test]
    fn undefined_and_non_positive_entries_are_skipped() {
        let ctx = context(Config::default(), vec![(1, 1, 5.0), (1, 2, 1.0), (1, 4, 0.0)]);
        let results = evaluate(&ctx, &Constant(4.0)).unwrap();

        assert_eq!(results[&Measure::MAE], 1.0);
    }

    #[test]
    fn cold_start_view_skips_heavy_users() {
        let config = Config { view: View::ColdStart, ..Config::default() };
        let ctx = context(config, vec![(1, 1, 5.0), (2, 1, 1.0)]);
        let results = evaluate(&ctx, &Constant(4.0)).unwrap();

        assert_eq!(results[&Measure::MAE], 1.0);
    }

    #[test]
    fn nothing_to_evaluate_is_undefined() {
        let ctx = context(Config::default(), vec![]);
        let results = evaluate(&ctx, &Constant(4.0)).unwrap();

        assert!(results[&Measure::MAE].is_nan());
        assert!(results[&Measure::RMSE].is_nan());
    }

    fn renaming() -> Renaming {
        let users = ["alice", "bob", "carol"];
        let ratings: Vec<(String, String, f64)> = (0..6)
            .map(|item| (users[item % 3].to_owned(), format!("item{}", item), 1.0))
            .collect();

        Renaming::from(DataDictionary::from_ratings(ratings.iter()))
    }

    #[test]
    fn predictions_are_logged_with_original_identifiers() {
        let results_dir = env::temp_dir().join(format!("recoeval-predictions-{}", process::id()));
        let _ = fs::remove_dir_all(&results_dir);

        let config = Config {
            prediction_out: true,
            results_dir: results_dir.clone(),
            ..Config::default()
        };

        let ctx = context(config, vec![(1, 1, 5.0), (1, 2, 1.0), (0, 3, 2.0)])
            .with_fold(2)
            .with_renaming(Arc::new(renaming()));

        // a second run of the same fold replaces the log of the first one
        evaluate(&ctx, &Constant(3.25)).unwrap();
        let results = evaluate(&ctx, &Constant(3.25)).unwrap();
        assert_eq!(results[&Measure::MAE], 1.5);

        let logged = fs::read_to_string(results_dir.join("Constant-prediction-2.txt")).unwrap();
        fs::remove_dir_all(&results_dir).unwrap();

        assert_eq!(
            logged,
            "# userId itemId rating prediction\nalice item3 2.0 3.25\nbob item1 5.0 3.25\n"
        );
    }
}
