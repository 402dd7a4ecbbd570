//! Close-match suggestions for names that could not be found.
//!
//! Similarity is the Ratcliff/Obershelp ratio: find the longest common
//! block, recurse on the pieces to its left and right, and report
//! `2 * matched / (len(a) + len(b))`.

use std::collections::{HashMap, HashSet};

/// Sequences at least this long drop "popular" characters from the index.
const AUTOJUNK_MIN_LEN: usize = 200;

struct Matcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> Matcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }

        if b.len() >= AUTOJUNK_MIN_LEN {
            let threshold = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= threshold);
        }

        Self { a, b, b2j }
    }

    /// Longest block `a[i..i+k] == b[j..j+k]` inside the given windows.
    /// Ties go to the earliest `i`, then the earliest `j`.
    fn longest_match(
        &self,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next_j2len = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|p| j2len.get(&p))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_j2len.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = next_j2len;
        }

        // Popular characters are missing from the index; grow the block over them.
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }

    fn matched_chars(&self) -> usize {
        let mut total = 0;
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];
        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let (i, j, k) = self.longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                pending.push((i + k, ahi, j + k, bhi));
            }
        }
        total
    }
}

/// Similarity ratio in [0, 1] between two strings. Case sensitive.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio(&a, &b)
}

fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = Matcher::new(a, b).matched_chars();
    2.0 * matched as f64 / total as f64
}

/// Returns up to `limit` distinct candidates whose ratio against `word` is at
/// least `cutoff`, best first. Equal scores are ordered by candidate
/// descending.
pub fn close_matches<'a, I>(word: &str, candidates: I, limit: usize, cutoff: f64) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let word_chars: Vec<char> = word.chars().collect();
    let mut seen = HashSet::new();
    let mut scored: Vec<(f64, &str)> = candidates
        .into_iter()
        .filter(|candidate| seen.insert(*candidate))
        .filter_map(|candidate| {
            let candidate_chars: Vec<char> = candidate.chars().collect();
            let score = ratio(&candidate_chars, &word_chars);
            (score >= cutoff).then_some((score, candidate))
        })
        .collect();

    scored.sort_by(|(sa, ca), (sb, cb)| sb.total_cmp(sa).then_with(|| cb.cmp(ca)));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, candidate)| candidate.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity_ratio("Pizza Place", "Pizza Place"), 1.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn known_ratio() {
        // "abcd" vs "bcde": one block of three
        assert!((similarity_ratio("abcd", "bcde") - 0.75).abs() < 1e-12);
        // blocks "Pizza P" + "lace" => 2 * 11 / 23
        assert!((similarity_ratio("Pizza Palace", "Pizza Place") - 22.0 / 23.0).abs() < 1e-12);
    }

    #[test]
    fn ratio_is_case_sensitive() {
        assert!(similarity_ratio("PIZZA", "pizza") < 0.6);
    }

    #[test]
    fn close_matches_respects_cutoff_and_limit() {
        let names = ["Pizza Place", "Pizza Palace", "Sushi Bar"];
        let matches = close_matches("Pizza Plaza", names.iter().copied(), 5, 0.6);
        assert_eq!(matches, vec!["Pizza Place", "Pizza Palace"]);

        let limited = close_matches("Pizza Plaza", names.iter().copied(), 1, 0.6);
        assert_eq!(limited, vec!["Pizza Place"]);
    }

    #[test]
    fn close_matches_dedups_candidates() {
        let names = ["Cafe", "Cafe", "Cafe"];
        assert_eq!(close_matches("Cafe", names.iter().copied(), 5, 0.6), vec!["Cafe"]);
    }

    #[test]
    fn unrelated_query_gets_nothing() {
        let names = ["Pizza Place", "Pizza Palace"];
        assert!(close_matches("Zzyzx", names.iter().copied(), 5, 0.6).is_empty());
    }

    #[test]
    fn equal_scores_order_by_name_descending() {
        let names = ["ab", "ac"];
        assert_eq!(close_matches("a", names.iter().copied(), 5, 0.5), vec!["ac", "ab"]);
    }
}
