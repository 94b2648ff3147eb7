//! Match result type and the shared one-to-one matching core

use serde::{Deserialize, Serialize};

/// How a candidate matched its reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Same value
    Exact,
    /// Dates within the configured day tolerance
    WithinTolerance,
    /// Same diagnostic category, different sub-code
    Category,
    /// Accepted by a custom name equivalence
    Similar,
}

/// One candidate paired with one reference item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedPair<T> {
    pub candidate: T,
    pub reference: T,
    /// Day difference for dates, 1 for a category match, 0 otherwise
    pub distance: u64,
    pub kind: MatchKind,
    /// Contribution to the weighted match count (1.0 for full matches)
    pub weight: f64,
}

/// Outcome of matching a candidate set against a reference set
///
/// `matched` and `missing` partition the reference set; `extra` holds the
/// candidates no reference item was paired with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult<T> {
    pub matched: Vec<MatchedPair<T>>,
    pub missing: Vec<T>,
    pub extra: Vec<T>,
    pub weighted_matches: f64,
    /// `weighted_matches / reference_count`, 1.0 for an empty reference set
    pub match_rate: f64,
    /// Matched candidates over all candidates, 0.0 without candidates
    pub precision: f64,
    pub reference_count: usize,
    pub candidate_count: usize,
}

impl<T> MatchResult<T> {
    /// Whether there was anything to match against
    ///
    /// An empty reference set yields a match rate of 1.0 whatever the
    /// candidates were; this tells that case apart from a real full match.
    pub fn has_reference(&self) -> bool {
        self.reference_count > 0
    }

    pub fn coverage_percent(&self) -> f64 {
        self.match_rate * 100.0
    }

    /// Pairs that matched with full weight
    pub fn full_matches(&self) -> usize {
        self.matched.iter().filter(|p| p.weight >= 1.0).count()
    }
}

impl<T: Clone + Ord> MatchResult<T> {
    /// First `limit` missing items in sorted order
    pub fn missing_sample(&self, limit: usize) -> Vec<T> {
        sorted_head(&self.missing, limit)
    }

    /// First `limit` extra items in sorted order
    pub fn extra_sample(&self, limit: usize) -> Vec<T> {
        sorted_head(&self.extra, limit)
    }
}

fn sorted_head<T: Clone + Ord>(items: &[T], limit: usize) -> Vec<T> {
    let mut sorted = items.to_vec();
    sorted.sort();
    sorted.truncate(limit);
    sorted
}

/// Verdict of a pairing function
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PairScore {
    pub kind: MatchKind,
    pub distance: u64,
    pub weight: f64,
}

/// Greedy one-to-one matching over all acceptable pairs
///
/// Pairs are taken by weight (highest first), then distance (closest
/// first), then reference and candidate order, so an exact match is never
/// displaced by a partial one. Inputs are expected to be free of duplicates.
pub(crate) fn match_sets<T, F>(candidates: &[T], references: &[T], score: F) -> MatchResult<T>
where
    T: Clone,
    F: Fn(&T, &T) -> Option<PairScore>,
{
    let mut pairs: Vec<(usize, usize, PairScore)> = Vec::new();
    for (r, reference) in references.iter().enumerate() {
        for (c, candidate) in candidates.iter().enumerate() {
            if let Some(s) = score(candidate, reference) {
                pairs.push((r, c, s));
            }
        }
    }
    pairs.sort_by(|a, b| {
        b.2.weight
            .total_cmp(&a.2.weight)
            .then(a.2.distance.cmp(&b.2.distance))
            .then(a.0.cmp(&b.0))
            .then(a.1.cmp(&b.1))
    });

    let mut reference_pair: Vec<Option<(usize, PairScore)>> = vec![None; references.len()];
    let mut candidate_used = vec![false; candidates.len()];
    for (r, c, s) in pairs {
        if reference_pair[r].is_none() && !candidate_used[c] {
            reference_pair[r] = Some((c, s));
            candidate_used[c] = true;
        }
    }

    let mut matched = Vec::new();
    let mut missing = Vec::new();
    for (r, slot) in reference_pair.into_iter().enumerate() {
        match slot {
            Some((c, s)) => matched.push(MatchedPair {
                candidate: candidates[c].clone(),
                reference: references[r].clone(),
                distance: s.distance,
                kind: s.kind,
                weight: s.weight,
            }),
            None => missing.push(references[r].clone()),
        }
    }
    let extra: Vec<T> = candidates
        .iter()
        .zip(&candidate_used)
        .filter(|(_, used)| !**used)
        .map(|(c, _)| c.clone())
        .collect();

    let weighted_matches: f64 = matched.iter().map(|p| p.weight).sum();
    let match_rate = if references.is_empty() {
        1.0
    } else {
        weighted_matches / references.len() as f64
    };
    let precision = if candidates.is_empty() {
        0.0
    } else {
        matched.len() as f64 / candidates.len() as f64
    };

    MatchResult {
        matched,
        missing,
        extra,
        weighted_matches,
        match_rate,
        precision,
        reference_count: references.len(),
        candidate_count: candidates.len(),
    }
}

/// Drop repeated values, keeping the first occurrence
pub(crate) fn unique_by<T: Clone, K: std::hash::Hash + Eq>(items: &[T], key: impl Fn(&T) -> K) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(key(*item)))
        .cloned()
        .collect()
}
