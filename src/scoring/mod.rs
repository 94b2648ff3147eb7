//! Comprehensive event scoring
//!
//! ```text
//! final = clamp(type + recency + context + frequency + metadata + special, 0, max)
//! ```
//!
//! | component  | range        | source                                 |
//! |------------|--------------|----------------------------------------|
//! | type       | 0..=100      | event input, default 20                |
//! | recency    | 0..=50       | event input                            |
//! | context    | -30..=30     | event input                            |
//! | frequency  | 0, 10, 20    | document occurrences of the date (2 → 10, 3+ → 20) |
//! | metadata   | <= 0         | fixed penalty for document-metadata noise |
//! | special    | -50 or +10   | insurance expiry / enrollment types    |
//!
//! The final score is bucketed into a [`Relevance`] tier.

mod relevance;

pub use relevance::{filter_by_relevance, filter_by_score, Partition, Relevance};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::ScoringConfig;
use crate::models::BoundRecord;

const TYPE_RANGE: (f64, f64) = (0.0, 100.0);
const RECENCY_RANGE: (f64, f64) = (0.0, 50.0);
const CONTEXT_RANGE: (f64, f64) = (-30.0, 30.0);

/// An event as handed to the scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredEvent {
    pub date: NaiveDate,

    /// Normalized event type label (e.g. `보험만기일`)
    #[serde(default)]
    pub normalized_type: Option<String>,

    /// Importance of the event category; the configured default when absent
    #[serde(default)]
    pub type_score: Option<f64>,

    #[serde(default)]
    pub recency_score: f64,

    #[serde(default)]
    pub context_score: f64,

    /// Flagged as document-metadata noise (print dates, page stamps)
    #[serde(default)]
    pub is_metadata: bool,

    /// Times the date occurs in its source document; counted over the
    /// scored list when absent
    #[serde(default)]
    pub occurrences: Option<usize>,
}

impl ScoredEvent {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            normalized_type: None,
            type_score: None,
            recency_score: 0.0,
            context_score: 0.0,
            is_metadata: false,
            occurrences: None,
        }
    }

    pub fn with_type(mut self, normalized_type: impl Into<String>) -> Self {
        self.normalized_type = Some(normalized_type.into());
        self
    }

    pub fn with_type_score(mut self, score: f64) -> Self {
        self.type_score = Some(score);
        self
    }

    pub fn with_recency(mut self, score: f64) -> Self {
        self.recency_score = score;
        self
    }

    pub fn with_context(mut self, score: f64) -> Self {
        self.context_score = score;
        self
    }

    pub fn metadata(mut self) -> Self {
        self.is_metadata = true;
        self
    }

    pub fn with_occurrences(mut self, occurrences: usize) -> Self {
        self.occurrences = Some(occurrences);
        self
    }
}

impl From<&BoundRecord> for ScoredEvent {
    fn from(record: &BoundRecord) -> Self {
        Self::new(record.candidate.normalized_date)
            .with_type(record.candidate.date_type.korean_name())
            .with_occurrences(record.occurrences)
    }
}

/// Insurance-related adjustment applied to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialClass {
    InsuranceExpiry,
    InsuranceStart,
}

/// Per-component score of one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub type_score: f64,
    pub recency_score: f64,
    pub context_score: f64,
    pub frequency_score: f64,
    pub metadata_penalty: f64,
    pub special_adjustments: f64,
    #[serde(default)]
    pub special_class: Option<SpecialClass>,
    pub final_score: f64,
    pub relevance: Relevance,
}

impl ScoreBreakdown {
    /// Unclamped component sum
    pub fn raw_sum(&self) -> f64 {
        self.type_score
            + self.recency_score
            + self.context_score
            + self.frequency_score
            + self.metadata_penalty
            + self.special_adjustments
    }
}

/// An event with its score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventScore {
    pub event: ScoredEvent,
    pub breakdown: ScoreBreakdown,
}

/// Weighted multi-criteria scorer
#[derive(Debug, Clone, Default)]
pub struct ComprehensiveScorer {
    config: ScoringConfig,
}

fn clamp((lo, hi): (f64, f64), value: f64) -> f64 {
    value.clamp(lo, hi)
}

impl ComprehensiveScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Frequency component for an event seen `frequency` times
    pub fn frequency_score(&self, frequency: usize) -> f64 {
        match frequency {
            0 | 1 => 0.0,
            2 => self.config.frequency_pair,
            _ => self.config.frequency_high,
        }
    }

    /// Insurance class of a normalized type label, expiry checked first
    pub fn special_class(&self, normalized_type: Option<&str>) -> Option<SpecialClass> {
        let label = normalized_type?.trim();
        if self.config.insurance_expiry_types.iter().any(|t| t == label) {
            Some(SpecialClass::InsuranceExpiry)
        } else if self.config.insurance_start_types.iter().any(|t| t == label) {
            Some(SpecialClass::InsuranceStart)
        } else {
            None
        }
    }

    /// Score one event observed `frequency` times in its document
    pub fn score(&self, event: &ScoredEvent, frequency: usize) -> ScoreBreakdown {
        let special_class = self.special_class(event.normalized_type.as_deref());
        let special_adjustments = match special_class {
            Some(SpecialClass::InsuranceExpiry) => self.config.insurance_expiry_penalty,
            Some(SpecialClass::InsuranceStart) => self.config.insurance_start_bonus,
            None => 0.0,
        };

        let mut breakdown = ScoreBreakdown {
            type_score: clamp(
                TYPE_RANGE,
                event.type_score.unwrap_or(self.config.default_type_score),
            ),
            recency_score: clamp(RECENCY_RANGE, event.recency_score),
            context_score: clamp(CONTEXT_RANGE, event.context_score),
            frequency_score: self.frequency_score(frequency),
            metadata_penalty: if event.is_metadata {
                self.config.metadata_penalty
            } else {
                0.0
            },
            special_adjustments,
            special_class,
            final_score: 0.0,
            relevance: Relevance::Filter,
        };
        breakdown.final_score = breakdown.raw_sum().clamp(0.0, self.config.max_score);
        breakdown.relevance = Relevance::from_score(breakdown.final_score, &self.config.thresholds);
        breakdown
    }

    /// Score every event
    ///
    /// Frequency is the event's own occurrence count when it carries one,
    /// otherwise the number of listed events sharing its date.
    pub fn score_all(&self, events: &[ScoredEvent]) -> Vec<EventScore> {
        let mut frequency: HashMap<NaiveDate, usize> = HashMap::new();
        for event in events {
            *frequency.entry(event.date).or_default() += 1;
        }

        let scored: Vec<EventScore> = events
            .iter()
            .map(|event| {
                let observed = event
                    .occurrences
                    .unwrap_or_else(|| frequency.get(&event.date).copied().unwrap_or(1));
                EventScore {
                    breakdown: self.score(event, observed),
                    event: event.clone(),
                }
            })
            .collect();

        tracing::debug!(events = scored.len(), distinct_dates = frequency.len(), "events scored");
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_insurance_expiry_scenario() {
        let scorer = ComprehensiveScorer::default();
        let event = ScoredEvent::new(date()).with_type("보험만기일").with_type_score(90.0);
        let breakdown = scorer.score(&event, 1);
        assert_eq!(breakdown.special_adjustments, -50.0);
        assert_eq!(breakdown.special_class, Some(SpecialClass::InsuranceExpiry));
        assert_eq!(breakdown.final_score, 40.0);
        assert_eq!(breakdown.relevance, Relevance::Medium);
    }

    #[test]
    fn test_insurance_start_bonus() {
        let scorer = ComprehensiveScorer::default();
        let event = ScoredEvent::new(date()).with_type("보험가입일").with_type_score(50.0);
        let breakdown = scorer.score(&event, 1);
        assert_eq!(breakdown.special_adjustments, 10.0);
        assert_eq!(breakdown.final_score, 60.0);
        assert_eq!(breakdown.relevance, Relevance::High);
    }

    #[test]
    fn test_upper_bound_not_clipped() {
        let scorer = ComprehensiveScorer::default();
        let event = ScoredEvent::new(date())
            .with_type_score(100.0)
            .with_recency(50.0)
            .with_context(30.0);
        let breakdown = scorer.score(&event, 3);
        assert_eq!(breakdown.frequency_score, 20.0);
        assert_eq!(breakdown.final_score, 200.0);
        assert_eq!(breakdown.relevance, Relevance::Critical);
    }

    #[test]
    fn test_clamped_to_zero() {
        let scorer = ComprehensiveScorer::default();
        let event = ScoredEvent::new(date())
            .with_type("만기일")
            .with_type_score(0.0)
            .with_context(-30.0)
            .metadata();
        let breakdown = scorer.score(&event, 1);
        assert!(breakdown.raw_sum() < 0.0);
        assert_eq!(breakdown.final_score, 0.0);
        assert_eq!(breakdown.relevance, Relevance::Filter);
    }

    #[test]
    fn test_default_type_score() {
        let breakdown = ComprehensiveScorer::default().score(&ScoredEvent::new(date()), 1);
        assert_eq!(breakdown.type_score, 20.0);
        assert_eq!(breakdown.relevance, Relevance::Low);
    }

    #[test]
    fn test_frequency_from_date_occurrences() {
        let other = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let events = vec![
            ScoredEvent::new(date()),
            ScoredEvent::new(other),
            ScoredEvent::new(date()),
        ];
        let scored = ComprehensiveScorer::default().score_all(&events);
        assert_eq!(scored[0].breakdown.frequency_score, 10.0);
        assert_eq!(scored[1].breakdown.frequency_score, 0.0);
        assert_eq!(scored[2].breakdown.final_score, 30.0);
    }

    #[test]
    fn test_recorded_occurrences_take_precedence() {
        let events = vec![
            ScoredEvent::new(date()).with_occurrences(3),
            ScoredEvent::new(date().succ_opt().unwrap()),
        ];
        let scored = ComprehensiveScorer::default().score_all(&events);
        assert_eq!(scored[0].breakdown.frequency_score, 20.0);
        assert_eq!(scored[1].breakdown.frequency_score, 0.0);
    }

    #[test]
    fn test_partition_filters_are_pure() {
        let scorer = ComprehensiveScorer::default();
        let events = vec![
            ScoredEvent::new(date()).with_type_score(90.0),
            ScoredEvent::new(date()).with_type_score(10.0),
        ];
        let scored = scorer.score_all(&events);

        let by_score = filter_by_score(&scored, 50.0);
        assert_eq!(by_score.kept.len(), 1);
        assert_eq!(by_score.filtered.len(), 1);
        assert_eq!(by_score.kept[0].event.type_score, Some(90.0));

        let by_relevance = filter_by_relevance(&scored, Relevance::Low);
        assert_eq!(by_relevance.kept.len() + by_relevance.filtered.len(), 2);
        assert_eq!(scored.len(), 2);
    }

    #[test]
    fn test_breakdown_serializes_camel_case() {
        let breakdown = ComprehensiveScorer::default().score(&ScoredEvent::new(date()), 1);
        let json = serde_json::to_value(&breakdown).unwrap();
        assert_eq!(json["finalScore"], 20.0);
        assert_eq!(json["relevance"], "LOW");
    }
}
