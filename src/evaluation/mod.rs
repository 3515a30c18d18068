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

use std::collections::BTreeMap;

pub mod rating;
pub mod ranking;

/// A named result of an evaluation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Measure {
    MAE,
    RMSE,
    NMAE,
    ASYMM,
    D5,
    D10,
    Pre5,
    Pre10,
    Rec5,
    Rec10,
    MAP,
    MRR,
    NDCG,
    AUC,
    TrainTime,
    TestTime,
}

/// Results of a run, one value per measure.
pub type Measures = BTreeMap<Measure, f64>;

/// Averages each measure over several runs, e.g. the folds of a cross validation. Measures
/// missing from some runs are averaged over the runs which report them.
pub fn average(runs: &[Measures]) -> Measures {

    let mut sums: BTreeMap<Measure, (f64, usize)> = BTreeMap::new();

    for measures in runs {
        for (measure, value) in measures.iter() {
            let entry = sums.entry(*measure).or_insert((0.0, 0));
            entry.0 += *value;
            entry.1 += 1;
        }
    }

    sums.into_iter()
        .map(|(measure, (sum, count))| (measure, sum / count as f64))
        .collect()
}
