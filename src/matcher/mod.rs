//! Candidate-vs-reference matching for dates, codes and hospital names
//!
//! All three matchers share one greedy one-to-one core and differ only in
//! their pairing test:
//!
//! - dates: exact equality, or `|days| <= tolerance` ([`DateMatchMode`])
//! - codes: exact (after `E11` → `E11.9`), else same category at a partial
//!   weight (0.7 by default)
//! - hospitals: equality of normalized names; other equivalences plug in
//!   through [`NameEquivalence`]

mod result;

pub use result::{MatchKind, MatchResult, MatchedPair};

pub(crate) use result::{match_sets, unique_by, PairScore};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::MatcherConfig;
use crate::normalize::{category_of, matching_form, CodeIndex, HospitalNormalizer};

/// How two dates are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DateMatchMode {
    /// Same calendar day (coverage path)
    #[default]
    Exact,
    /// Within `days` of each other (cross-validation path)
    Tolerance { days: u32 },
}

const FULL: f64 = 1.0;

/// Match candidate dates against reference dates
pub fn match_dates(
    candidates: &[NaiveDate],
    references: &[NaiveDate],
    mode: DateMatchMode,
) -> MatchResult<NaiveDate> {
    let candidates = unique_by(candidates, |d| *d);
    let references = unique_by(references, |d| *d);

    match_sets(&candidates, &references, |c, r| {
        let distance = (*c - *r).num_days().unsigned_abs();
        match mode {
            DateMatchMode::Exact if distance == 0 => Some(PairScore {
                kind: MatchKind::Exact,
                distance,
                weight: FULL,
            }),
            DateMatchMode::Tolerance { days } if distance <= u64::from(days) => Some(PairScore {
                kind: if distance == 0 {
                    MatchKind::Exact
                } else {
                    MatchKind::WithinTolerance
                },
                distance,
                weight: FULL,
            }),
            _ => None,
        }
    })
}

/// Match candidate codes against reference codes
///
/// Exact matches count 1.0, category matches `category_weight`. When an
/// index is given, deprecated codes are replaced before comparing.
pub fn match_codes(
    candidates: &[String],
    references: &[String],
    category_weight: f64,
    index: Option<&CodeIndex>,
) -> MatchResult<String> {
    let candidates = unique_by(candidates, String::clone);
    let references = unique_by(references, String::clone);

    let key = |code: &str| {
        let current = index.map_or_else(|| code.to_string(), |i| i.resolve(code));
        matching_form(&current)
    };

    match_sets(&candidates, &references, |c, r| {
        let (ck, rk) = (key(c), key(r));
        if ck == rk {
            Some(PairScore {
                kind: MatchKind::Exact,
                distance: 0,
                weight: FULL,
            })
        } else if category_of(&ck) == category_of(&rk) {
            Some(PairScore {
                kind: MatchKind::Category,
                distance: 1,
                weight: category_weight,
            })
        } else {
            None
        }
    })
}

/// Decides whether two normalized hospital names denote the same institution
///
/// Returns the match weight, or `None` for no match.
pub trait NameEquivalence: Send + Sync {
    fn weight(&self, candidate: &str, reference: &str) -> Option<f64>;
}

/// Plain equality of normalized names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExactName;

impl NameEquivalence for ExactName {
    fn weight(&self, candidate: &str, reference: &str) -> Option<f64> {
        (candidate == reference).then_some(FULL)
    }
}

/// Match hospital names on their normalized keys
pub fn match_hospitals(
    candidates: &[String],
    references: &[String],
    normalizer: &HospitalNormalizer,
    equivalence: &dyn NameEquivalence,
) -> MatchResult<String> {
    let candidates = unique_by(candidates, |n| normalizer.normalize(n));
    let references = unique_by(references, |n| normalizer.normalize(n));

    match_sets(&candidates, &references, |c, r| {
        let (ck, rk) = (normalizer.normalize(c), normalizer.normalize(r));
        equivalence.weight(&ck, &rk).map(|weight| PairScore {
            kind: if ck == rk {
                MatchKind::Exact
            } else {
                MatchKind::Similar
            },
            distance: 0,
            weight: weight.clamp(0.0, FULL),
        })
    })
}

/// Configured matcher for all three attribute types
#[derive(Clone)]
pub struct Matcher {
    config: MatcherConfig,
    hospitals: HospitalNormalizer,
    codes: Option<Arc<CodeIndex>>,
    names: Arc<dyn NameEquivalence>,
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("config", &self.config)
            .field("hospitals", &self.hospitals)
            .field("code_index", &self.codes.as_ref().map(|i| i.len()))
            .finish_non_exhaustive()
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatcherConfig::default(), HospitalNormalizer::default())
    }
}

impl Matcher {
    pub fn new(config: MatcherConfig, hospitals: HospitalNormalizer) -> Self {
        Self {
            config,
            hospitals,
            codes: None,
            names: Arc::new(ExactName),
        }
    }

    /// Resolve deprecated codes through an index before matching
    pub fn with_code_index(mut self, index: Arc<CodeIndex>) -> Self {
        self.codes = Some(index);
        self
    }

    /// Replace exact hospital-name equality
    pub fn with_name_equivalence(mut self, names: impl NameEquivalence + 'static) -> Self {
        self.names = Arc::new(names);
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn code_index(&self) -> Option<&CodeIndex> {
        self.codes.as_deref()
    }

    pub fn dates(&self, candidates: &[NaiveDate], references: &[NaiveDate]) -> MatchResult<NaiveDate> {
        let result = match_dates(candidates, references, self.config.date_mode);
        tracing::debug!(
            matched = result.matched.len(),
            missing = result.missing.len(),
            extra = result.extra.len(),
            rate = result.match_rate,
            "dates matched"
        );
        result
    }

    pub fn codes(&self, candidates: &[String], references: &[String]) -> MatchResult<String> {
        let result = match_codes(
            candidates,
            references,
            self.config.category_weight,
            self.code_index(),
        );
        tracing::debug!(
            matched = result.matched.len(),
            weighted = result.weighted_matches,
            rate = result.match_rate,
            "codes matched"
        );
        result
    }

    pub fn hospitals(&self, candidates: &[String], references: &[String]) -> MatchResult<String> {
        match_hospitals(candidates, references, &self.hospitals, self.names.as_ref())
    }
}
