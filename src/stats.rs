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

use fnv::FnvHashMap;
use tracing::debug;

use crate::error::RecError;
use crate::types::{RatingScale, SparseMatrix};

/// Maps the original user and item identifiers to consecutive integer indices.
pub struct DataDictionary {
    user_dict: FnvHashMap<String, u32>,
    item_dict: FnvHashMap<String, u32>,
    num_ratings: u64,
}

impl DataDictionary {

    pub fn num_users(&self) -> usize {
        self.user_dict.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_dict.len()
    }

    pub fn num_ratings(&self) -> u64 {
        self.num_ratings
    }

    pub fn user_index(&self, name: &str) -> Option<u32> {
        self.user_dict.get(name).cloned()
    }

    pub fn item_index(&self, name: &str) -> Option<u32> {
        self.item_dict.get(name).cloned()
    }

    pub fn from_ratings<'a, I>(ratings: I) -> Self
        where I: Iterator<Item=&'a (String, String, f64)> {

        let mut user_dict: FnvHashMap<String, u32> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());

        let mut item_dict: FnvHashMap<String, u32> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());

        let mut num_ratings: u64 = 0;

        for (user, item, _) in ratings {

            if !user_dict.contains_key(user) {
                let user_index = user_dict.len() as u32;
                user_dict.insert(user.clone(), user_index);
            }

            if !item_dict.contains_key(item) {
                let item_index = item_dict.len() as u32;
                item_dict.insert(item.clone(), item_index);
            }

            num_ratings += 1;
        }

        DataDictionary { user_dict, item_dict, num_ratings }
    }
}

/// Restores the original identifiers from integer indices.
#[derive(Clone, Debug)]
pub struct Renaming {
    user_names: Vec<String>,
    item_names: Vec<String>,
}

impl Renaming {

    pub fn user_name(&self, user_index: u32) -> &str {
        &self.user_names[user_index as usize]
    }

    pub fn item_name(&self, item_index: u32) -> &str {
        &self.item_names[item_index as usize]
    }
}

impl From<DataDictionary> for Renaming {

    fn from(data_dict: DataDictionary) -> Self {

        let mut user_names = vec![String::new(); data_dict.num_users()];
        let mut item_names = vec![String::new(); data_dict.num_items()];

        for (user, user_index) in data_dict.user_dict.into_iter() {
            user_names[user_index as usize] = user;
        }

        for (item, item_index) in data_dict.item_dict.into_iter() {
            item_names[item_index as usize] = item;
        }

        Renaming { user_names, item_names }
    }
}

/// All ratings of a dataset with consecutive indices, the observed rating scale and the
/// mapping back to the original identifiers.
pub struct RatingStore {
    pub matrix: SparseMatrix,
    pub scale: RatingScale,
    pub renaming: Renaming,
}

impl RatingStore {

    /// Builds the store from `(user, item, rating)` triples. With a non-negative
    /// `binary_threshold`, ratings above the threshold become 1.0 and all others are dropped.
    pub fn from_ratings(
        ratings: Vec<(String, String, f64)>,
        binary_threshold: f64,
    ) -> Result<Self, RecError> {

        let ratings: Vec<(String, String, f64)> = if binary_threshold >= 0.0 {
            ratings.into_iter()
                .filter(|(_, _, rating)| *rating > binary_threshold)
                .map(|(user, item, _)| (user, item, 1.0))
                .collect()
        } else {
            ratings
        };

        if ratings.is_empty() {
            return Err(RecError::Configuration(String::from("no ratings to evaluate on")));
        }

        let data_dict = DataDictionary::from_ratings(ratings.iter());

        debug!(
            "Found {} ratings between {} users and {} items.",
            data_dict.num_ratings(),
            data_dict.num_users(),
            data_dict.num_items(),
        );

        let mut matrix = SparseMatrix::new(data_dict.num_users(), data_dict.num_items());

        for (user, item, rating) in ratings.iter() {
            if let (Some(user_index), Some(item_index)) =
                (data_dict.user_index(user), data_dict.item_index(item)) {
                matrix.set(user_index, item_index, *rating);
            }
        }

        let scale = RatingScale::observed(&matrix)?;
        let renaming = Renaming::from(data_dict);

        Ok(RatingStore { matrix, scale, renaming })
    }

    pub fn num_users(&self) -> usize {
        self.matrix.num_rows()
    }

    pub fn num_items(&self) -> usize {
        self.matrix.num_columns()
    }
}
