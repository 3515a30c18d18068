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

extern crate getopts;
extern crate recoeval;
extern crate tracing_subscriber;

use std::env;
use std::error::Error;
use std::sync::Arc;

use getopts::Options;
use tracing_subscriber::EnvFilter;

use recoeval::baselines;
use recoeval::io;
use recoeval::{Config, RatingStore, Recommender};

fn main() -> Result<(), Box<dyn Error>> {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Input file name (required). The input consists of ratings \
        of users for items. The input file must contain a user, an item and optionally a rating \
        per line, separated by tabs.", "PATH");
    opts.optopt("c", "config", "Configuration file with key=value lines (optional, defaults \
        to rating prediction with pearson correlation).", "PATH");
    opts.optopt("a", "algorithm", &format!("Algorithm to evaluate (optional, defaults to \
        GlobalAvg). One of {}.", baselines::ALGORITHMS.join(", ")), "NAME");
    opts.optopt("k", "folds", "Number of cross validation folds (optional, overrides \
        num.kfold from the configuration).", "NUMBER");
    opts.optopt("o", "outputfile", "Output file for the averaged measures as JSON (optional, \
        output will be written to stdout by default).", "PATH");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            print_usage(&program, opts, Some(&hint));
            return Err(failure.into());
        },
    };

    if matches.opt_present("h") {
        print_usage(&program, opts, None);
        return Ok(());
    }

    let ratings_path = match matches.opt_str("i") {
        Some(path) => path,
        None => {
            let hint = "Please specify an inputfile via --inputfile.";
            print_usage(&program, opts, Some(hint));
            return Err(hint.into());
        }
    };

    let mut config = match matches.opt_str("c") {
        Some(path) => Config::from_file(&path)?,
        None => Config::default(),
    };

    match matches.opt_get::<usize>("k") {
        Ok(Some(folds)) => config.num_folds = folds,
        Ok(None) => {},
        Err(failure) => {
            let hint = format!("Problem with option 'k': {}", failure);
            print_usage(&program, opts, Some(&hint));
            return Err(hint.into());
        },
    }

    let algorithm = matches.opt_str("a").unwrap_or_else(|| String::from("GlobalAvg"));
    // Fail early on unknown algorithms, before reading any data
    baselines::by_name(&algorithm)?;

    evaluate(&ratings_path, &algorithm, config, matches.opt_str("o"))
}

fn print_usage(
    program: &str,
    opts: Options,
    hint: Option<&str>
) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
}

fn evaluate(
    ratings_path: &str,
    algorithm: &str,
    config: Config,
    results_path: Option<String>,
) -> Result<(), Box<dyn Error>> {

    println!("Reading ratings from {}", ratings_path);

    let mut reader = io::csv_reader(ratings_path)?;
    let ratings = io::ratings_from_csv(&mut reader)?;

    let store = RatingStore::from_ratings(ratings, config.binary_threshold)?;

    println!(
        "Found {} ratings between {} users and {} items.",
        store.matrix.size(),
        store.num_users(),
        store.num_items(),
    );

    println!("Evaluating {} with {}-fold cross validation...", algorithm, config.num_folds);

    let factory = || -> Box<dyn Recommender> {
        baselines::by_name(algorithm).unwrap_or_else(|_| Box::new(baselines::GlobalAverage))
    };

    let measures = recoeval::cross_validate(&store, Arc::new(config), &factory)?;

    io::write_measures(algorithm, &measures, results_path)?;

    Ok(())
}
