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

//! Runs a recommender through its lifecycle, evaluates it and reports the results.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use scoped_pool::Pool;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::RecError;
use crate::evaluation::{self, ranking, rating, Measure, Measures};
use crate::model::{Context, Lifecycle, Recommender, Session};
use crate::stats::RatingStore;
use crate::types::SparseMatrix;

/// Result of one run. Failures have already been logged when a run returns.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(Measures),
    Failed(RecError),
}

impl RunOutcome {

    pub fn measures(&self) -> Option<&Measures> {
        match *self {
            RunOutcome::Completed(ref measures) => Some(measures),
            RunOutcome::Failed(_) => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.measures().is_some()
    }
}

fn fold_info(fold: usize) -> String {
    if fold > 0 { format!(" fold [{}]", fold) } else { String::new() }
}

/// Initializes, trains and cleans up the model of `session` (or restores its saved parameters
/// if `is.load.model` is set), then evaluates it on the test data of `ctx` in ranking or
/// rating mode. Errors never escape: a failing run is logged and reported as
/// `RunOutcome::Failed`. A session which already ran fails with a lifecycle error.
pub fn execute(session: &mut Session, ctx: &Context) -> RunOutcome {
    match run(session, ctx) {
        Ok(measures) => RunOutcome::Completed(measures),
        Err(failure) => {
            error!("{}{} failed: {}", session.name(), fold_info(ctx.fold()), failure);
            RunOutcome::Failed(failure)
        }
    }
}

fn run(session: &mut Session, ctx: &Context) -> Result<Measures, RecError> {

    let config = ctx.config();
    let start = Instant::now();

    if config.load_model {
        session.restore(ctx)?;
    } else {
        session.step(Lifecycle::Initialized, |model| model.initialize(ctx))?;

        let settings = session.model().describe();
        if !settings.is_empty() {
            debug!("{}: {}", session.name(), settings);
        }

        session.step(Lifecycle::Trained, |model| model.train(ctx))?;
        session.step(Lifecycle::CleanedUp, |model| model.cleanup())?;
    }

    let train_time = start.elapsed();

    let model = session.model();

    if config.verbose {
        debug!("{}{} evaluate test data ... ", model.name(), fold_info(ctx.fold()));
    }

    let mut measures = if config.ranking {
        let mut correlations = ctx.correlation_cache();
        ranking::evaluate(ctx, model, &mut correlations)
    } else {
        rating::evaluate(ctx, model)?
    };

    let test_time = start.elapsed() - train_time;

    measures.insert(Measure::TrainTime, train_time.as_millis() as f64);
    measures.insert(Measure::TestTime, test_time.as_millis() as f64);

    info!("{}", run_line(model.name(), ctx.fold(), &measures, config));

    // the measures stand even if the parameters cannot be saved
    if config.save_model {
        if let Err(failure) = model.persist(ctx) {
            warn!("{}{} could not save its model: {}",
                  model.name(), fold_info(ctx.fold()), failure);
        }
    }

    Ok(measures)
}

/// The measures of a run as one comma separated line, in a fixed order depending on the
/// evaluation mode.
pub fn summary(measures: &Measures, config: &Config) -> String {

    let value = |measure: Measure| measures.get(&measure).cloned().unwrap_or(std::f64::NAN);

    let mut ordered = Vec::new();

    if config.ranking {
        if config.diversity {
            ordered.push(Measure::D5);
            ordered.push(Measure::D10);
        }
        ordered.extend_from_slice(&[
            Measure::Pre5, Measure::Pre10, Measure::Rec5, Measure::Rec10,
            Measure::AUC, Measure::MAP, Measure::NDCG, Measure::MRR,
        ]);
    } else {
        ordered.extend_from_slice(&[Measure::MAE, Measure::RMSE, Measure::NMAE, Measure::ASYMM]);
    }

    let mut line: Vec<String> = ordered.into_iter()
        .map(|measure| format!("{:.6}", value(measure)))
        .collect();

    if config.ranking {
        line.push(format!("{:2}", config.num_ignore));
    }

    line.join(",")
}

/// `<algorithm>[ fold [n]]: <summary>\tTime: <train>, <test>[\tView: <view>]`
pub fn run_line(algorithm: &str, fold: usize, measures: &Measures, config: &Config) -> String {

    let millis = |measure: Measure| measures.get(&measure).cloned().unwrap_or(0.0) as u64;

    let mut line = format!(
        "{}{}: {}\tTime: {}, {}",
        algorithm,
        fold_info(fold),
        summary(measures, config),
        format_duration(Duration::from_millis(millis(Measure::TrainTime))),
        format_duration(Duration::from_millis(millis(Measure::TestTime))),
    );

    if !config.ranking {
        line.push_str(&format!("\tView: {}", config.view.name()));
    }

    line
}

/// Formats a duration as `mm:ss.SSS`, with a leading hour field for long runs.
pub fn format_duration(duration: Duration) -> String {
    let total_millis = duration.as_millis() as u64;
    let millis = total_millis % 1000;
    let seconds = (total_millis / 1000) % 60;
    let minutes = (total_millis / 60_000) % 60;
    let hours = total_millis / 3_600_000;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, seconds, millis)
    }
}

/// Assigns every rating of the store to one of `k` folds, numbered from 1. The assignment is
/// a seeded shuffle and therefore reproducible for a fixed seed.
pub fn assign_folds(matrix: &SparseMatrix, k: usize, seed: u64) -> Vec<((u32, u32, f64), usize)> {
    let mut entries = matrix.entries();
    let mut rng = StdRng::seed_from_u64(seed);
    entries.shuffle(&mut rng);

    entries.into_iter()
        .enumerate()
        .map(|(index, entry)| (entry, index % k + 1))
        .collect()
}

/// Training and test matrix of one fold
pub fn split_fold(
    assignment: &[((u32, u32, f64), usize)],
    fold: usize,
    num_users: usize,
    num_items: usize,
) -> (SparseMatrix, SparseMatrix) {

    let mut train = SparseMatrix::new(num_users, num_items);
    let mut test = SparseMatrix::new(num_users, num_items);

    for &((user, item, rating), assigned_fold) in assignment {
        if assigned_fold == fold {
            test.set(user, item, rating);
        } else {
            train.set(user, item, rating);
        }
    }

    (train, test)
}

/// Evaluates a fresh model per fold with k-fold cross validation and averages the measures of
/// the folds which completed. Folds run in parallel, each with its own model, matrices and
/// correlation cache.
pub fn cross_validate(
    store: &RatingStore,
    config: Arc<Config>,
    factory: &(dyn Fn() -> Box<dyn Recommender> + Sync),
) -> Result<Measures, RecError> {

    let k = config.num_folds;
    if k < 2 {
        return Err(RecError::Configuration(format!("num.kfold={}, need at least 2 folds", k)));
    }

    let assignment = assign_folds(&store.matrix, k, config.effective_seed());
    let renaming = Arc::new(store.renaming.clone());

    let outcomes: Vec<Mutex<Option<RunOutcome>>> = (0..k).map(|_| Mutex::new(None)).collect();

    let pool = Pool::new(num_cpus::get().min(k));

    pool.scoped(|scope| {
        for (index, outcome) in outcomes.iter().enumerate() {

            let fold = index + 1;
            let assignment = &assignment;
            let config = Arc::clone(&config);
            let renaming = Arc::clone(&renaming);

            scope.execute(move || {
                let (train, test) =
                    split_fold(assignment, fold, store.num_users(), store.num_items());

                let result = Context::new(train, test, config, store.scale.clone())
                    .map(|ctx| ctx.with_fold(fold).with_renaming(renaming));

                let mut session = Session::new(factory());

                let fold_outcome = match result {
                    Ok(ctx) => execute(&mut session, &ctx),
                    Err(failure) => {
                        error!("{}{} failed: {}", session.name(), fold_info(fold), failure);
                        RunOutcome::Failed(failure)
                    }
                };

                if let Ok(mut slot) = outcome.lock() {
                    *slot = Some(fold_outcome);
                }
            });
        }
    });

    pool.shutdown();

    let mut completed = Vec::with_capacity(k);

    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome.into_inner().ok().and_then(|outcome| outcome) {
            Some(RunOutcome::Completed(measures)) => completed.push(measures),
            _ => warn!("Skipping fold [{}] in the averaged results", index + 1),
        }
    }

    if completed.is_empty() {
        return Err(RecError::ModelFailure(String::from("no fold completed")));
    }

    let averaged = evaluation::average(&completed);
    info!("{}", run_line(factory().name(), 0, &averaged, &config));

    Ok(averaged)
}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::baselines::GlobalAverage;
    use crate::types::RatingScale;

    struct Failing;

    impl Recommender for Failing {
        fn name(&self) -> &str {
            "Failing"
        }

        fn train(&mut self, _ctx: &Context) -> Result<(), RecError> {
            Err(RecError::ModelFailure(String::from("diverged")))
        }
    }

    fn context(config: Config) -> Context {
        let train = SparseMatrix::from_triples(2, 3, vec![(0, 0, 5.0), (0, 1, 3.0), (1, 0, 4.0)]);
        let test = SparseMatrix::from_triples(2, 3, vec![(1, 1, 5.0)]);
        let scale = RatingScale::new(vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

        Context::new(train, test, Arc::new(config), scale).unwrap()
    }

    #[test]
    fn failing_models_do_not_escape() {
        let ctx = context(Config::default());

        match execute(&mut Session::new(Box::new(Failing)), &ctx) {
            RunOutcome::Failed(RecError::ModelFailure(message)) => assert_eq!(message, "diverged"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn completed_runs_report_times() {
        let ctx = context(Config::default());
        let outcome = execute(&mut Session::new(Box::new(GlobalAverage)), &ctx);

        let measures = outcome.measures().unwrap();
        assert_eq!(measures[&Measure::MAE], 1.0);
        assert!(measures.contains_key(&Measure::TrainTime));
        assert!(measures.contains_key(&Measure::TestTime));
    }

    #[test]
    fn sessions_run_only_once() {
        let ctx = context(Config::default());
        let mut session = Session::new(Box::new(GlobalAverage));

        assert!(execute(&mut session, &ctx).is_completed());
        assert_eq!(session.state(), Lifecycle::CleanedUp);

        match execute(&mut session, &ctx) {
            RunOutcome::Failed(RecError::Lifecycle { from, to }) => {
                assert_eq!(from, Lifecycle::CleanedUp);
                assert_eq!(to, Lifecycle::Initialized);
            },
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    /// Predicts a constant which only `restore` knows about.
    #[derive(Default)]
    struct Saved {
        rating: Option<f64>,
        trained: bool,
    }

    impl Recommender for Saved {
        fn name(&self) -> &str {
            "Saved"
        }

        fn train(&mut self, _ctx: &Context) -> Result<(), RecError> {
            self.trained = true;
            Ok(())
        }

        fn predict(&self, ctx: &Context, _user: u32, _item: u32) -> f64 {
            self.rating.unwrap_or_else(|| ctx.global_mean())
        }

        fn persist(&self, _ctx: &Context) -> Result<(), RecError> {
            Err(RecError::ModelFailure(String::from("disk full")))
        }

        fn restore(&mut self, _ctx: &Context) -> Result<(), RecError> {
            if self.trained {
                return Err(RecError::ModelFailure(String::from("restored a trained model")));
            }
            self.rating = Some(5.0);
            Ok(())
        }
    }

    #[test]
    fn loaded_models_skip_training() {
        let ctx = context(Config { load_model: true, ..Config::default() });
        let mut session = Session::new(Box::new(Saved::default()));

        let outcome = execute(&mut session, &ctx);

        // the only test rating is a 5
        assert_eq!(outcome.measures().unwrap()[&Measure::MAE], 0.0);
        assert_eq!(session.state(), Lifecycle::CleanedUp);
        assert!(!execute(&mut session, &ctx).is_completed());
    }

    #[test]
    fn failed_saves_keep_the_measures() {
        let ctx = context(Config { save_model: true, ..Config::default() });
        let outcome = execute(&mut Session::new(Box::new(Saved::default())), &ctx);

        assert_eq!(outcome.measures().unwrap()[&Measure::MAE], 1.0);
    }

    #[test]
    fn summary_lines() {
        let mut measures = Measures::new();
        measures.insert(Measure::MAE, 1.0);
        measures.insert(Measure::RMSE, 1.0);
        measures.insert(Measure::NMAE, 0.25);
        measures.insert(Measure::ASYMM, 0.0);
        measures.insert(Measure::TrainTime, 61_005.0);
        measures.insert(Measure::TestTime, 12.0);

        let line = run_line("GlobalAvg", 2, &measures, &Config::default());
        assert_eq!(
            line,
            "GlobalAvg fold [2]: 1.000000,1.000000,0.250000,0.000000\tTime: 01:01.005, 00:00.012\tView: all"
        );

        let config = Config { ranking: true, num_ignore: 3, ..Config::default() };
        assert_eq!(summary(&Measures::new(), &config), "NaN,NaN,NaN,NaN,NaN,NaN,NaN,NaN, 3");
    }

    #[test]
    fn long_durations_include_hours() {
        assert_eq!(format_duration(Duration::from_millis(3_723_004)), "01:02:03.004");
    }

    #[test]
    fn folds_partition_the_ratings() {
        let matrix = SparseMatrix::from_triples(3, 3, vec![
            (0, 0, 1.0), (0, 1, 2.0), (1, 1, 3.0), (1, 2, 4.0), (2, 0, 5.0), (2, 2, 1.0),
        ]);

        let assignment = assign_folds(&matrix, 3, 17);
        assert_eq!(assignment, assign_folds(&matrix, 3, 17));

        let mut total_test = 0;
        for fold in 1..=3 {
            let (train, test) = split_fold(&assignment, fold, 3, 3);
            assert_eq!(train.size() + test.size(), 6);
            assert_eq!(test.size(), 2);
            total_test += test.size();
        }
        assert_eq!(total_test, 6);
    }

    #[test]
    fn cross_validation_needs_two_folds() {
        let store = RatingStore::from_ratings(vec![
            (String::from("a"), String::from("x"), 1.0),
        ], -1.0).unwrap();

        let config = Arc::new(Config { num_folds: 1, ..Config::default() });
        let factory = || -> Box<dyn Recommender> { Box::new(GlobalAverage) };

        assert!(cross_validate(&store, config, &factory).is_err());
    }
}
