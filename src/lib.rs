extern crate csv;
extern crate fnv;
extern crate num_cpus;
extern crate rand;
extern crate scoped_pool;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
extern crate thiserror;
extern crate tracing;

pub mod types;
pub mod error;
pub mod config;
pub mod stats;
pub mod io;
pub mod similarity;
pub mod measures;
pub mod model;
pub mod baselines;
pub mod evaluation;
pub mod run;

pub use crate::config::Config;
pub use error::RecError;
pub use evaluation::{Measure, Measures};
pub use model::{Context, Lifecycle, Recommender, Session};
pub use run::{cross_validate, execute, RunOutcome};
pub use stats::RatingStore;
