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

use std::fs::{self, File, OpenOptions};
use std::io::prelude::*;
use std::io::stdout;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::RecError;
use crate::evaluation::Measures;

/// Number of buffered predictions before they are appended to the log
const PREDICTION_BATCH_SIZE: usize = 1000;

/// Reads a CSV input file. We expect NO headers, and a user, item and optional rating per line
/// with tab separation.
pub fn csv_reader<P: AsRef<Path>>(file: P) -> Result<csv::Reader<File>, csv::Error> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_path(file)
}

/// Reads `(user, item, rating)` triples. Lines without a rating count as a rating of 1.0.
pub fn ratings_from_csv<R: Read>(
    reader: &mut csv::Reader<R>
) -> Result<Vec<(String, String, f64)>, RecError> {

    let mut ratings = Vec::new();

    for result in reader.records() {
        let record = result?;

        let (user, item) = match (record.get(0), record.get(1)) {
            (Some(user), Some(item)) => (user.trim().to_owned(), item.trim().to_owned()),
            _ => {
                return Err(RecError::Configuration(
                    format!("expected user and item in line {:?}", record.position())));
            }
        };

        let rating = match record.get(2) {
            Some(value) => value.trim().parse::<f64>().map_err(|_| {
                RecError::Configuration(format!("'{}' is not a rating", value))
            })?,
            None => 1.0,
        };

        ratings.push((user, item, rating));
    }

    Ok(ratings)
}

/// Name of a per-fold output file, e.g. `ItemKNN-prediction-3.txt`
pub fn fold_file_name(algorithm: &str, suffix: &str, fold: usize, extension: &str) -> String {
    if fold > 0 {
        format!("{}{}-{}.{}", algorithm, suffix, fold, extension)
    } else {
        format!("{}{}.{}", algorithm, suffix, extension)
    }
}

/// Appends predictions of a rating evaluation run in batches, using the original identifiers.
pub struct PredictionLog {
    path: PathBuf,
    pending: Vec<(String, String, f64, f32)>,
}

impl PredictionLog {

    /// Creates the log file, replacing results of a previous run for the same algorithm and fold.
    pub fn create(results_dir: &Path, algorithm: &str, fold: usize) -> Result<Self, RecError> {
        fs::create_dir_all(results_dir)?;

        let path = results_dir.join(fold_file_name(algorithm, "-prediction", fold, "txt"));
        let mut file = File::create(&path)?;
        writeln!(file, "# userId itemId rating prediction")?;

        Ok(PredictionLog { path, pending: Vec::with_capacity(PREDICTION_BATCH_SIZE) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &mut self,
        user: &str,
        item: &str,
        rating: f64,
        prediction: f64,
    ) -> Result<(), RecError> {

        self.pending.push((user.to_owned(), item.to_owned(), rating, prediction as f32));

        if self.pending.len() >= PREDICTION_BATCH_SIZE {
            self.flush()?;
        }

        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), RecError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .delimiter(b' ')
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);

        for row in self.pending.drain(..) {
            writer.serialize(row)?;
        }
        writer.flush()?;

        Ok(())
    }
}

/// Struct used for JSON serialization of evaluation results. Field names will be used in JSON.
#[derive(Serialize)]
struct Report<'a> {
    algorithm: &'a str,
    measures: &'a Measures,
}

/// Output the measures of an evaluation as a JSON line. If a `results_path` is supplied, we
/// write to a file at the specified path, otherwise, we output to stdout. Undefined measures
/// are written as `null`.
pub fn write_measures(
    algorithm: &str,
    measures: &Measures,
    results_path: Option<String>,
) -> Result<(), RecError> {

    let mut out: Box<dyn Write> = match results_path {
        Some(path) => Box::new(File::create(&Path::new(&path))?),
        _ => Box::new(stdout())
    };

    serde_json::to_writer(&mut out, &Report { algorithm, measures })?;
    writeln!(out)?;

    Ok(())
}

/// Serializes learned model parameters as JSON into `models_dir`.
pub fn save_model<T: Serialize>(
    models_dir: &Path,
    algorithm: &str,
    fold: usize,
    parameters: &T,
) -> Result<PathBuf, RecError> {

    fs::create_dir_all(models_dir)?;
    let path = models_dir.join(fold_file_name(algorithm, "", fold, "json"));

    let file = File::create(&path)?;
    serde_json::to_writer(file, parameters)?;

    debug!("Saved {} to {}", algorithm, path.display());

    Ok(path)
}

/// Restores model parameters written by `save_model`.
pub fn load_model<T: DeserializeOwned>(
    models_dir: &Path,
    algorithm: &str,
    fold: usize,
) -> Result<T, RecError> {

    let path = models_dir.join(fold_file_name(algorithm, "", fold, "json"));
    let file = File::open(&path)?;

    Ok(serde_json::from_reader(file)?)
}


#[cfg(test)]
mod tests {

    use super::*;
    use std::env;
    use std::process;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("recoeval-{}-{}", name, process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn ratings_with_and_without_values() {
        let data = "alice\tapple\t4.5\nbob\tpony\n";
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(data.as_bytes());

        let ratings = ratings_from_csv(&mut reader).unwrap();

        assert_eq!(ratings, vec![
            (String::from("alice"), String::from("apple"), 4.5),
            (String::from("bob"), String::from("pony"), 1.0),
        ]);
    }

    #[test]
    fn broken_ratings_are_rejected() {
        let data = "alice\tapple\tfive\n";
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .from_reader(data.as_bytes());

        assert!(ratings_from_csv(&mut reader).is_err());
    }

    #[test]
    fn prediction_log_truncates_previous_runs() {
        let dir = scratch_dir("predictions");

        let mut log = PredictionLog::create(&dir, "GlobalAvg", 2).unwrap();
        log.append("alice", "apple", 5.0, 4.0).unwrap();
        log.flush().unwrap();

        let mut log = PredictionLog::create(&dir, "GlobalAvg", 2).unwrap();
        log.append("bob", "pony", 3.0, 3.5).unwrap();
        log.flush().unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents, "# userId itemId rating prediction\nbob pony 3.0 3.5\n");
        assert!(log.path().ends_with("GlobalAvg-prediction-2.txt"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn measures_as_json() {
        use crate::evaluation::Measure;

        let dir = scratch_dir("measures");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("measures.json");

        let mut measures = Measures::new();
        measures.insert(Measure::MAE, 0.5);
        measures.insert(Measure::RMSE, std::f64::NAN);

        write_measures("UserAvg", &measures, Some(path.to_string_lossy().into_owned())).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "{\"algorithm\":\"UserAvg\",\"measures\":{\"MAE\":0.5,\"RMSE\":null}}\n");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn models_survive_a_round_trip() {
        let dir = scratch_dir("models");
        let parameters = vec![1.5, 2.5];

        save_model(&dir, "UserAvg", 0, &parameters).unwrap();
        let restored: Vec<f64> = load_model(&dir, "UserAvg", 0).unwrap();

        assert_eq!(restored, parameters);
        let _ = fs::remove_dir_all(&dir);
    }
}
