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

//! Quality measures of a single ranked list against a set of held-out relevant items, and the
//! asymmetric loss of a single rating prediction.

use crate::types::ItemSet;

/// Number of relevant items within the first `cutoff` positions
fn hits_at(ranked_items: &[u32], relevant: &ItemSet, cutoff: usize) -> usize {
    ranked_items.iter()
        .take(cutoff)
        .filter(|item| relevant.contains(*item))
        .count()
}

/// Precision at `cutoff`. Lists shorter than the cutoff are judged on their own length.
pub fn precision_at(ranked_items: &[u32], relevant: &ItemSet, cutoff: usize) -> f64 {
    let length = cutoff.min(ranked_items.len());
    if length == 0 {
        return 0.0;
    }

    hits_at(ranked_items, relevant, length) as f64 / length as f64
}

pub fn recall_at(ranked_items: &[u32], relevant: &ItemSet, cutoff: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }

    hits_at(ranked_items, relevant, cutoff) as f64 / relevant.len() as f64
}

pub fn average_precision(ranked_items: &[u32], relevant: &ItemSet) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }

    let mut hits = 0;
    let mut sum_of_precisions = 0.0;

    for (position, item) in ranked_items.iter().enumerate() {
        if relevant.contains(item) {
            hits += 1;
            sum_of_precisions += hits as f64 / (position + 1) as f64;
        }
    }

    sum_of_precisions / relevant.len() as f64
}

pub fn reciprocal_rank(ranked_items: &[u32], relevant: &ItemSet) -> f64 {
    ranked_items.iter()
        .position(|item| relevant.contains(item))
        .map_or(0.0, |position| 1.0 / (position + 1) as f64)
}

/// Normalized discounted cumulative gain with binary relevance.
pub fn ndcg(ranked_items: &[u32], relevant: &ItemSet) -> f64 {
    let dcg: f64 = ranked_items.iter()
        .enumerate()
        .filter(|(_, item)| relevant.contains(*item))
        .map(|(position, _)| discount(position))
        .sum();

    let idcg: f64 = (0..relevant.len()).map(discount).sum();

    if idcg == 0.0 { 0.0 } else { dcg / idcg }
}

#[inline(always)]
fn discount(position: usize) -> f64 {
    1.0 / ((position + 2) as f64).log2()
}

/// Area under the ROC curve of a ranked list. `num_dropped` counts candidate items which did
/// not make it into the list; they are ranked below every listed item.
pub fn auc(ranked_items: &[u32], relevant: &ItemSet, num_dropped: usize) -> f64 {

    let num_relevant_in_list = hits_at(ranked_items, relevant, ranked_items.len());
    let num_evaluated = ranked_items.len() + num_dropped;

    if num_evaluated < num_relevant_in_list {
        return 0.5;
    }

    let num_pairs = (num_evaluated - num_relevant_in_list) * num_relevant_in_list;
    if num_pairs == 0 {
        return 0.5;
    }

    let mut num_correct_pairs = 0;
    let mut hits = 0;

    for item in ranked_items {
        if relevant.contains(item) {
            hits += 1;
        } else {
            num_correct_pairs += hits;
        }
    }

    // relevant items which were not ranked at all are part of the dropped items
    let num_missed = relevant.len() - num_relevant_in_list;
    num_correct_pairs += hits * num_dropped.saturating_sub(num_missed);

    num_correct_pairs as f64 / num_pairs as f64
}

/// Asymmetric loss around the midpoint of the rating scale: predicting a disliked item as liked
/// costs twice as much as missing a liked one, and predictions on the correct side cost nothing.
pub fn asymmetric_loss(rating: f64, prediction: f64, min_rate: f64, max_rate: f64) -> f64 {
    let median = (min_rate + max_rate) / 2.0;

    if rating > median && prediction <= median {
        rating - prediction
    } else if rating <= median && prediction > median {
        2.0 * (prediction - rating)
    } else {
        0.0
    }
}

/// Arithmetic mean, NaN for no values
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}


#[cfg(test)]
mod tests {

    use super::*;

    fn set(items: &[u32]) -> ItemSet {
        items.iter().cloned().collect()
    }

    fn close_enough_to(value: f64, expected: f64) -> bool {
        (value - expected).abs() < 1e-9
    }

    #[test]
    fn precision_is_capped_at_list_length() {
        let relevant = set(&[2]);
        assert!(close_enough_to(precision_at(&[2, 3], &relevant, 10), 0.5));
        assert!(close_enough_to(precision_at(&[2, 3], &relevant, 1), 1.0));
        assert_eq!(precision_at(&[], &relevant, 5), 0.0);
    }

    #[test]
    fn recall_grows_with_cutoff() {
        let ranked = [1, 7, 3, 9, 4, 8, 5, 6, 2, 0];
        let relevant = set(&[3, 2, 11]);

        assert!(close_enough_to(recall_at(&ranked, &relevant, 5), 1.0 / 3.0));
        assert!(close_enough_to(recall_at(&ranked, &relevant, 10), 2.0 / 3.0));
    }

    #[test]
    fn average_precision_and_reciprocal_rank() {
        let ranked = [5, 1, 6, 2];
        let relevant = set(&[1, 2]);

        // (1/2 + 2/4) / 2
        assert!(close_enough_to(average_precision(&ranked, &relevant), 0.5));
        assert!(close_enough_to(reciprocal_rank(&ranked, &relevant), 0.5));
        assert_eq!(reciprocal_rank(&[5, 6], &relevant), 0.0);
    }

    #[test]
    fn ndcg_of_perfect_and_imperfect_lists() {
        let relevant = set(&[1, 2]);
        assert!(close_enough_to(ndcg(&[1, 2, 3], &relevant), 1.0));

        let expected = (1.0 / 3.0f64.log2()) / (1.0 + 1.0 / 3.0f64.log2());
        assert!(close_enough_to(ndcg(&[3, 1], &relevant), expected));
    }

    #[test]
    fn auc_with_dropped_items() {
        let relevant = set(&[2]);
        assert!(close_enough_to(auc(&[2, 3], &relevant, 0), 1.0));
        assert!(close_enough_to(auc(&[3, 2], &relevant, 0), 0.0));
        // one negative above, two dropped negatives below
        assert!(close_enough_to(auc(&[3, 2], &relevant, 2), 2.0 / 3.0));
        // no negatives at all
        assert!(close_enough_to(auc(&[2], &relevant, 0), 0.5));
    }

    #[test]
    fn asymmetric_loss_penalizes_false_positives_twice() {
        assert_eq!(asymmetric_loss(5.0, 2.0, 1.0, 5.0), 3.0);
        assert_eq!(asymmetric_loss(2.0, 4.0, 1.0, 5.0), 4.0);
        assert_eq!(asymmetric_loss(4.0, 5.0, 1.0, 5.0), 0.0);
        assert_eq!(asymmetric_loss(1.0, 3.0, 1.0, 5.0), 0.0);
    }

    #[test]
    fn mean_of_nothing_is_undefined() {
        assert!(mean(&[]).is_nan());
        assert!(close_enough_to(mean(&[1.0, 2.0]), 1.5));
    }
}
