use std::path::Path;
use std::time::Instant;

use tracing::info;

use config::Config;
use feature_builder::FeatureSpace;
use ranker::{Recommendation, SimilarityRanker};

pub mod config;
pub mod dataset;
pub mod error;
pub mod feature;
pub mod feature_builder;
mod file_utils;
pub mod fuzzy;
pub mod ranker;
pub mod record;

pub use error::{RecsError, Result};

/// Reads the dataset at `path` and builds its feature space using the
/// delimiter and price tiers from `config`.
pub fn build_from_csv<P: AsRef<Path>>(path: P, config: &Config) -> Result<FeatureSpace> {
    let start_time = Instant::now();

    let table = dataset::read_csv(path, config.delimiter())?;
    let space = feature_builder::build(table, &config.price)?;

    info!("Took {:.1?} to build features", start_time.elapsed());
    Ok(space)
}

/// Top `top_n` restaurants similar to `query`, with suggestion settings
/// taken from `config`.
pub fn find_similar(
    space: &FeatureSpace,
    query: &str,
    top_n: usize,
    config: &Config,
) -> Result<Vec<Recommendation>> {
    SimilarityRanker::new(space)
        .with_suggestions(config.recommend.suggestion_options())
        .find_similar(query, top_n)
}
