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

use std::convert::TryFrom;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use ::config::{Config as Settings, ConfigError, File, FileFormat};

use crate::error::RecError;
use crate::similarity::Similarity;

/// Which test entries take part in rating evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    All,
    /// Only users with fewer than `COLD_START_THRESHOLD` training ratings.
    ColdStart,
}

pub const COLD_START_THRESHOLD: usize = 5;

impl View {

    pub fn name(&self) -> &'static str {
        match *self {
            View::All => "all",
            View::ColdStart => "cold-start",
        }
    }
}

impl FromStr for View {
    type Err = RecError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_lowercase().as_str() {
            "all" => Ok(View::All),
            "cold-start" => Ok(View::ColdStart),
            other => Err(RecError::Configuration(format!("unknown rating.pred.view '{}'", other))),
        }
    }
}

/// Process wide settings, read once and shared read-only (usually behind an `Arc`) by all
/// evaluation runs.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// `is.ranking.pred`
    pub ranking: bool,
    /// `is.diverse.used`
    pub diversity: bool,
    /// `val.binary.threshold`, negative means ratings are not binarized
    pub binary_threshold: f64,
    /// `rating.pred.view`
    pub view: View,
    /// `num.reclist.len`, values <= 0 disable truncation
    pub num_recs: i64,
    /// `num.ignore.items`, values <= 0 disable popularity pruning
    pub num_ignore: i64,
    /// `num.rand.seed`, values <= 0 seed from the wall clock
    pub seed: i64,
    /// `similarity`
    pub similarity: Similarity,
    /// `num.shrinkage`, values <= 0 disable shrinkage
    pub shrinkage: i64,
    /// `is.prediction.out`
    pub prediction_out: bool,
    /// `is.save.model`
    pub save_model: bool,
    /// `is.load.model`, restore saved parameters instead of training
    pub load_model: bool,
    /// `is.verbose`
    pub verbose: bool,
    /// `num.kfold`
    pub num_folds: usize,
    /// `dir.results`
    pub results_dir: PathBuf,
    /// `dir.models`
    pub models_dir: PathBuf,
}

impl Default for Config {

    fn default() -> Self {
        Config {
            ranking: false,
            diversity: false,
            binary_threshold: -1.0,
            view: View::All,
            num_recs: -1,
            num_ignore: -1,
            seed: 1,
            similarity: Similarity::Pcc,
            shrinkage: -1,
            prediction_out: false,
            save_model: false,
            load_model: false,
            verbose: false,
            num_folds: 5,
            results_dir: PathBuf::from("Results"),
            models_dir: PathBuf::from("Models"),
        }
    }
}

impl Config {

    /// Reads a properties file, see `from_properties`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RecError> {
        let name = path.as_ref().to_string_lossy();

        let settings = Settings::builder()
            .add_source(File::new(&name, FileFormat::Ini))
            .build()
            .map_err(|failure| {
                RecError::Configuration(format!("unable to read {}: {}", name, failure))
            })?;

        Config::from_settings(&settings)
    }

    /// Parses `key=value` lines. Blank lines and lines starting with `#` are skipped, keys
    /// which are not present keep their defaults.
    pub fn from_properties(contents: &str) -> Result<Self, RecError> {
        let settings = Settings::builder()
            .add_source(File::from_str(contents, FileFormat::Ini))
            .build()
            .map_err(|failure| RecError::Configuration(failure.to_string()))?;

        Config::from_settings(&settings)
    }

    fn from_settings(settings: &Settings) -> Result<Self, RecError> {

        let mut config = Config::default();

        if let Some(value) = lookup(settings, "is.ranking.pred", Settings::get_bool)? {
            config.ranking = value;
        }
        if let Some(value) = lookup(settings, "is.diverse.used", Settings::get_bool)? {
            config.diversity = value;
        }
        if let Some(value) = lookup(settings, "val.binary.threshold", Settings::get_float)? {
            config.binary_threshold = value;
        }
        if let Some(value) = lookup(settings, "rating.pred.view", Settings::get_string)? {
            config.view = value.parse()?;
        }
        if let Some(value) = lookup(settings, "num.reclist.len", Settings::get_int)? {
            config.num_recs = value;
        }
        if let Some(value) = lookup(settings, "num.ignore.items", Settings::get_int)? {
            config.num_ignore = value;
        }
        if let Some(value) = lookup(settings, "num.rand.seed", Settings::get_int)? {
            config.seed = value;
        }
        if let Some(value) = lookup(settings, "similarity", Settings::get_string)? {
            config.similarity = Similarity::from_name(&value);
        }
        if let Some(value) = lookup(settings, "num.shrinkage", Settings::get_int)? {
            config.shrinkage = value;
        }
        if let Some(value) = lookup(settings, "is.prediction.out", Settings::get_bool)? {
            config.prediction_out = value;
        }
        if let Some(value) = lookup(settings, "is.save.model", Settings::get_bool)? {
            config.save_model = value;
        }
        if let Some(value) = lookup(settings, "is.load.model", Settings::get_bool)? {
            config.load_model = value;
        }
        if let Some(value) = lookup(settings, "is.verbose", Settings::get_bool)? {
            config.verbose = value;
        }
        if let Some(value) = lookup(settings, "num.kfold", Settings::get_int)? {
            config.num_folds = usize::try_from(value).map_err(|_| {
                RecError::Configuration(format!("num.kfold: {} is not a number of folds", value))
            })?;
        }
        if let Some(value) = lookup(settings, "dir.results", Settings::get_string)? {
            config.results_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(settings, "dir.models", Settings::get_string)? {
            config.models_dir = PathBuf::from(value);
        }

        Ok(config)
    }

    /// Shrinkage factor, `None` if disabled
    pub fn shrinkage(&self) -> Option<u32> {
        if self.shrinkage > 0 {
            Some(u32::try_from(self.shrinkage).unwrap_or(u32::MAX))
        } else {
            None
        }
    }

    /// Length of the recommendation list, `None` for unlimited
    pub fn num_recs(&self) -> Option<usize> {
        if self.num_recs > 0 { Some(self.num_recs as usize) } else { None }
    }

    pub fn num_ignore(&self) -> usize {
        if self.num_ignore > 0 { self.num_ignore as usize } else { 0 }
    }

    /// The configured seed, or the current wall clock time in milliseconds.
    pub fn effective_seed(&self) -> u64 {
        if self.seed > 0 {
            self.seed as u64
        } else {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_millis() as u64)
                .unwrap_or(0)
        }
    }
}

/// A typed value, `None` if the key is missing.
fn lookup<T>(
    settings: &Settings,
    key: &str,
    get: fn(&Settings, &str) -> Result<T, ConfigError>,
) -> Result<Option<T>, RecError> {
    match get(settings, key) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(failure) => Err(RecError::Configuration(format!("{}: {}", key, failure))),
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn properties_override_defaults() {
        let config = Config::from_properties(concat!(
            "# evaluation\n",
            "is.ranking.pred=on\n",
            "is.diverse.used = true\n",
            "\n",
            "num.reclist.len=10\n",
            "num.ignore.items=-1\n",
            "similarity=COS\n",
            "num.shrinkage=30\n",
            "rating.pred.view=cold-start\n",
            "num.kfold=3\n",
            "dir.results=out/predictions\n",
        )).unwrap();

        assert!(config.ranking);
        assert!(config.diversity);
        assert_eq!(config.num_recs(), Some(10));
        assert_eq!(config.num_ignore(), 0);
        assert_eq!(config.similarity, Similarity::Cos);
        assert_eq!(config.shrinkage(), Some(30));
        assert_eq!(config.view, View::ColdStart);
        assert_eq!(config.num_folds, 3);
        assert_eq!(config.results_dir, PathBuf::from("out/predictions"));
        assert!(!config.prediction_out);
        assert!(!config.load_model);
    }

    #[test]
    fn missing_keys_keep_defaults() {
        assert_eq!(Config::from_properties("").unwrap(), Config::default());
        assert_eq!(Config::from_properties("# nothing set\n").unwrap(), Config::default());
    }

    #[test]
    fn huge_shrinkage_saturates() {
        let config = Config::from_properties("num.shrinkage=4294967296").unwrap();
        assert_eq!(config.shrinkage(), Some(u32::MAX));

        let config = Config::from_properties("num.shrinkage=0").unwrap();
        assert_eq!(config.shrinkage(), None);
    }

    #[test]
    fn settings_are_read_from_files() {
        let path = std::env::temp_dir()
            .join(format!("recoeval-config-{}.properties", std::process::id()));
        std::fs::write(&path, "is.ranking.pred=off\nis.save.model=yes\nnum.rand.seed=7\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(!config.ranking);
        assert!(config.save_model);
        assert_eq!(config.seed, 7);
    }

    #[test]
    fn unknown_similarity_falls_back_to_pearson() {
        let config = Config::from_properties("similarity=unheard-of").unwrap();
        assert_eq!(config.similarity, Similarity::Pcc);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(Config::from_properties("is.ranking.pred=maybe").is_err());
        assert!(Config::from_properties("num.reclist.len=ten").is_err());
        assert!(Config::from_properties("rating.pred.view=warm").is_err());
        assert!(Config::from_properties("num.kfold=-2").is_err());
    }

    #[test]
    fn seed_falls_back_to_clock() {
        let config = Config { seed: 0, ..Config::default() };
        assert!(config.effective_seed() > 0);
        assert_eq!(Config { seed: 42, ..Config::default() }.effective_seed(), 42);
    }
}
