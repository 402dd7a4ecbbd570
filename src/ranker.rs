use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use crate::error::{RecsError, Result};
use crate::feature_builder::FeatureSpace;
use crate::fuzzy;

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_MAX_SUGGESTIONS: usize = 5;
pub const DEFAULT_SUGGESTION_CUTOFF: f64 = 0.6;

/// One ranked neighbour of the queried restaurant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub name: Option<String>,
    pub similarity: f64,
    pub category: String,
    pub price_range: String,
    pub address: String,
}

impl Recommendation {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("NaN")
    }
}

/// How "no such restaurant" suggestions are chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuggestionOptions {
    pub limit: usize,
    pub cutoff: f64,
}

impl Default for SuggestionOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_MAX_SUGGESTIONS,
            cutoff: DEFAULT_SUGGESTION_CUTOFF,
        }
    }
}

/// Cosine of the angle between `a` and `b`; 0 when either is the zero vector.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "feature dimensions must match");
    let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Rounds half to even at three decimals.
fn round_score(value: f64) -> f64 {
    (value * 1000.0).round_ties_even() / 1000.0
}

/// Exhaustive nearest-neighbour lookup over a built [`FeatureSpace`].
pub struct SimilarityRanker<'a> {
    space: &'a FeatureSpace,
    suggestions: SuggestionOptions,
}

impl<'a> SimilarityRanker<'a> {
    pub fn new(space: &'a FeatureSpace) -> Self {
        Self {
            space,
            suggestions: SuggestionOptions::default(),
        }
    }

    pub fn with_suggestions(mut self, suggestions: SuggestionOptions) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Row index of the first restaurant whose name equals `query`,
    /// ignoring case.
    pub fn lookup(&self, query: &str) -> Option<usize> {
        let query = query.to_lowercase();
        self.space
            .records()
            .iter()
            .position(|r| r.name.as_deref().is_some_and(|n| n.to_lowercase() == query))
    }

    /// Close matches to `query` among the distinct restaurant names.
    pub fn suggest(&self, query: &str) -> Vec<String> {
        let names = self.space.records().iter().filter_map(|r| r.name.as_deref());
        fuzzy::close_matches(query, names, self.suggestions.limit, self.suggestions.cutoff)
    }

    /// Returns the `top_n` restaurants most similar to `query`, best first.
    /// The queried restaurant itself is never part of the result.
    pub fn find_similar(&self, query: &str, top_n: usize) -> Result<Vec<Recommendation>> {
        let Some(index) = self.lookup(query) else {
            return Err(RecsError::NotFound {
                query: query.to_string(),
                suggestions: self.suggest(query),
            });
        };

        let matrix = self.space.matrix();
        let target = matrix.row(index);
        let mut scored: Vec<(usize, f64)> = matrix
            .rows()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(i, row)| (i, cosine_similarity(target, row)))
            .collect();

        // Stable sort keeps row order among equal scores.
        scored.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(Ordering::Equal));
        scored.truncate(top_n);
        debug!(
            "Ranked {} candidates for row {} ({})",
            matrix.len().saturating_sub(1),
            index,
            self.space.records()[index].display_name()
        );

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| {
                let record = &self.space.records()[i];
                Recommendation {
                    name: record.name.clone(),
                    similarity: round_score(similarity),
                    category: record.category.clone(),
                    price_range: record.price_range.clone(),
                    address: record.address.clone(),
                }
            })
            .collect())
    }
}

/// Top `top_n` restaurants similar to `query` using default suggestion
/// settings.
pub fn recommend(query: &str, space: &FeatureSpace, top_n: usize) -> Result<Vec<Recommendation>> {
    SimilarityRanker::new(space).find_similar(query, top_n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawTable;
    use crate::feature_builder::{build, PriceTiers};
    use crate::record::RawRecord;

    fn space(records: Vec<RawRecord>) -> FeatureSpace {
        build(RawTable::new(records), &PriceTiers::default()).expect("build should succeed")
    }

    fn abc() -> FeatureSpace {
        space(vec![
            RawRecord::new("A", "1 A St", 0.0, 0.0, "$", "Cafe"),
            RawRecord::new("B", "2 B St", 0.0, 1.0, "$$", "Cafe"),
            RawRecord::new("C", "3 C St", 1.0, 1.0, "$$$$", "Diner"),
        ])
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn rounding_is_half_even() {
        assert_eq!(round_score(0.12345), 0.123);
        assert_eq!(round_score(0.9996), 1.0);
    }

    #[test]
    fn lookup_is_case_insensitive_and_first_wins() {
        let space = space(vec![
            RawRecord::new("Cafe Uno", "1 St", 0.0, 0.0, "$", "Cafe"),
            RawRecord::new("CAFE UNO", "2 St", 1.0, 1.0, "$", "Cafe"),
        ]);
        let ranker = SimilarityRanker::new(&space);
        assert_eq!(ranker.lookup("cafe uno"), Some(0));
        assert_eq!(ranker.lookup("cafe"), None);
    }

    #[test]
    fn worked_example_excludes_query() {
        let space = abc();
        let results = recommend("a", &space, DEFAULT_TOP_N).expect("A exists");

        let names: Vec<_> = results.iter().map(Recommendation::display_name).collect();
        assert_eq!(names, vec!["B", "C"]);
        // A = [0,0,0,1,0], B = [1,0,1,1,0] => 1/sqrt(3)
        assert_eq!(results[0].similarity, 0.577);
        assert_eq!(results[0].price_range, "$11-30");
        assert_eq!(results[0].address, "2 B St");
        // A . C = 0
        assert_eq!(results[1].similarity, 0.0);
    }

    #[test]
    fn results_are_sorted_descending() {
        let space = space(vec![
            RawRecord::new("Q", "q", 0.5, 0.5, "$$", "Cafe"),
            RawRecord::new("Far", "f", 1.0, 0.0, "$$$$", "Diner"),
            RawRecord::new("Near", "n", 0.5, 0.5, "$$", "Cafe"),
            RawRecord::new("Mid", "m", 0.0, 1.0, "$$", "Cafe"),
        ]);
        let results = recommend("Q", &space, 10).expect("Q exists");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].display_name(), "Near");
        assert!(results.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn ties_keep_row_order() {
        let space = space(vec![
            RawRecord::new("Q", "q", 0.0, 0.0, "$", "Cafe"),
            RawRecord::new("X", "x", 1.0, 1.0, "$", "Cafe"),
            RawRecord::new("Y", "y", 1.0, 1.0, "$", "Cafe"),
        ]);
        let results = recommend("Q", &space, 10).expect("Q exists");
        let names: Vec<_> = results.iter().map(Recommendation::display_name).collect();
        assert_eq!(names, vec!["X", "Y"]);
    }

    #[test]
    fn top_n_truncates_and_never_returns_self() {
        let space = abc();
        assert_eq!(recommend("B", &space, 1).expect("B exists").len(), 1);

        let all = recommend("B", &space, 100).expect("B exists");
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|r| r.display_name() != "B"));
    }

    #[test]
    fn not_found_carries_suggestions() {
        let space = space(vec![
            RawRecord::new("Pizza Place", "1 St", 0.0, 0.0, "$", "Pizza"),
            RawRecord::new("Pizza Palace", "2 St", 1.0, 1.0, "$$", "Pizza"),
        ]);

        let err = recommend("Pizza Plaza", &space, 10).expect_err("no such restaurant");
        assert!(matches!(err, RecsError::NotFound { .. }));
        assert_eq!(
            err.suggestions(),
            &["Pizza Place".to_string(), "Pizza Palace".to_string()]
        );

        let err = recommend("Zzyzx", &space, 10).expect_err("no such restaurant");
        assert!(err.suggestions().is_empty());
    }

    #[test]
    fn suggestion_options_apply() {
        let space = space(vec![
            RawRecord::new("Pizza Place", "1 St", 0.0, 0.0, "$", "Pizza"),
            RawRecord::new("Pizza Palace", "2 St", 1.0, 1.0, "$$", "Pizza"),
        ]);
        let ranker = SimilarityRanker::new(&space).with_suggestions(SuggestionOptions {
            limit: 1,
            cutoff: 0.8,
        });
        assert_eq!(ranker.suggest("Pizza Plaza"), vec!["Pizza Place".to_string()]);
    }

    #[test]
    fn unnamed_rows_are_recommended_but_never_matched() {
        let mut unnamed = RawRecord::new("", "9 St", 0.0, 1.0, "$", "Cafe");
        unnamed.name = None;
        let named = RawRecord::new("A", "1 St", 0.0, 0.0, "$", "Cafe");
        let space = space(vec![named, unnamed]);

        let results = recommend("A", &space, 10).expect("A exists");
        assert_eq!(results[0].name, None);
        assert_eq!(results[0].display_name(), "NaN");
        assert!(recommend("nan", &space, 10).is_err());
    }
}
