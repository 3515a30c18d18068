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

use std::io;

use thiserror::Error;

use crate::model::Lifecycle;

/// Failures which abort a configuration step or an evaluation run. Values which simply cannot
/// be computed (e.g. a similarity without co-observed ratings) are not errors.
#[derive(Debug, Error)]
pub enum RecError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("model failure: {0}")]
    ModelFailure(String),

    #[error("illegal lifecycle transition from {from:?} to {to:?}")]
    Lifecycle { from: Lifecycle, to: Lifecycle },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
