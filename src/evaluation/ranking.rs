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

//! Quality of top-k item rankings on the held-out items of each test user.

use tracing::debug;

use crate::evaluation::{Measure, Measures};
use crate::measures::{self, mean};
use crate::model::{Context, Recommender};
use crate::similarity;
use crate::types::{self, ItemSet, ScoredItem, SparseMatrix, SparseVector, SymmMatrix};

const CUTOFFS: [usize; 2] = [5, 10];

/// Items eligible for recommendation: every item with a training rating, minus the
/// `num_ignore` most popular ones. Equally popular items are ignored in ascending id order.
pub fn candidate_items(train: &SparseMatrix, num_ignore: usize) -> ItemSet {

    let mut items = train.columns();

    if num_ignore > 0 {
        items.sort_by(|a, b| {
            train.column_size(*b).cmp(&train.column_size(*a)).then(a.cmp(b))
        });
        items.drain(..num_ignore.min(items.len()));
    }

    items.into_iter().collect()
}

/// Scores all candidate items which the user has not rated yet and returns the best
/// `num_recs` of them (all if `None`), best first. Ties are broken by ascending item id.
pub fn recommend(
    ctx: &Context,
    model: &dyn Recommender,
    user: u32,
    rated_items: &SparseVector,
    candidates: &ItemSet,
    num_recs: Option<usize>,
) -> Vec<ScoredItem> {

    let mut scored_items: Vec<ScoredItem> = candidates.iter()
        .filter(|item| !rated_items.contains(**item))
        .filter_map(|item| {
            let score = model.ranking_score(ctx, user, *item);
            if score.is_nan() {
                None
            } else {
                Some(ScoredItem { item: *item, score })
            }
        })
        .collect();

    scored_items.sort_by(types::by_score_descending);

    if let Some(num_recs) = num_recs {
        scored_items.truncate(num_recs);
    }

    scored_items
}

/// Per-user values of each measure, averaged at the end over the users which produced them.
#[derive(Default)]
struct Collected {
    diversities: [Vec<f64>; 2],
    precisions: [Vec<f64>; 2],
    recalls: [Vec<f64>; 2],
    average_precisions: Vec<f64>,
    reciprocal_ranks: Vec<f64>,
    aucs: Vec<f64>,
    ndcgs: Vec<f64>,
}

/// Ranks the candidate items for every test user and measures precision, recall, MAP, MRR,
/// nDCG and AUC of the ranking against the user's test items. If diversity is enabled, the
/// lists are also judged by the item-item correlations stored in (and lazily added to)
/// `correlations`.
pub fn evaluate(
    ctx: &Context,
    model: &dyn Recommender,
    correlations: &mut SymmMatrix,
) -> Measures {

    let config = ctx.config();
    let train = ctx.train();
    let test = ctx.test();
    let correlation = ctx.correlation();

    let candidates = candidate_items(train, config.num_ignore());

    if config.verbose {
        debug!("{} has {} candidate items", model.name(), candidates.len());
    }

    let mut collected = Collected::default();

    for user in 0..test.num_rows() as u32 {

        let correct_items: ItemSet = test.row(user).indices()
            .into_iter()
            .filter(|item| candidates.contains(item))
            .collect();

        if correct_items.is_empty() {
            continue;
        }

        let rated_items = train.row(user);

        let num_candidates = candidates.len() - rated_items.iter()
            .filter(|(item, _)| candidates.contains(item))
            .count();

        let ranked_items: Vec<u32> =
            recommend(ctx, model, user, rated_items, &candidates, config.num_recs())
                .into_iter()
                .map(|scored_item| scored_item.item)
                .collect();

        if ranked_items.is_empty() {
            continue;
        }

        let num_dropped = num_candidates.saturating_sub(ranked_items.len());

        collected.aucs.push(measures::auc(&ranked_items, &correct_items, num_dropped));
        collected.average_precisions.push(measures::average_precision(&ranked_items, &correct_items));
        collected.ndcgs.push(measures::ndcg(&ranked_items, &correct_items));
        collected.reciprocal_ranks.push(measures::reciprocal_rank(&ranked_items, &correct_items));

        for (index, cutoff) in CUTOFFS.iter().enumerate() {

            collected.precisions[index]
                .push(measures::precision_at(&ranked_items, &correct_items, *cutoff));
            collected.recalls[index]
                .push(measures::recall_at(&ranked_items, &correct_items, *cutoff));

            if config.diversity {
                let diversity = similarity::diversity_at(
                    &ranked_items, *cutoff, train, correlations, &correlation);

                if let Some(diversity) = diversity {
                    collected.diversities[index].push(diversity);
                }
            }
        }
    }

    let mut results = Measures::new();

    if config.diversity {
        results.insert(Measure::D5, mean(&collected.diversities[0]));
        results.insert(Measure::D10, mean(&collected.diversities[1]));
    } else {
        results.insert(Measure::D5, 0.0);
        results.insert(Measure::D10, 0.0);
    }

    results.insert(Measure::Pre5, mean(&collected.precisions[0]));
    results.insert(Measure::Pre10, mean(&collected.precisions[1]));
    results.insert(Measure::Rec5, mean(&collected.recalls[0]));
    results.insert(Measure::Rec10, mean(&collected.recalls[1]));
    results.insert(Measure::AUC, mean(&collected.aucs));
    results.insert(Measure::NDCG, mean(&collected.ndcgs));
    results.insert(Measure::MAP, mean(&collected.average_precisions));
    results.insert(Measure::MRR, mean(&collected.reciprocal_ranks));

    results
}
