//! Relevance tiers and pure partition filters

use serde::{Deserialize, Serialize};
use std::fmt;

use super::EventScore;
use crate::config::RelevanceThresholds;

/// Discrete relevance of a scored event, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relevance {
    Filter,
    Low,
    Medium,
    High,
    Critical,
}

impl Relevance {
    /// Bucket a final score against the tier lower bounds
    pub fn from_score(score: f64, thresholds: &RelevanceThresholds) -> Self {
        if score >= thresholds.critical {
            Self::Critical
        } else if score >= thresholds.high {
            Self::High
        } else if score >= thresholds.medium {
            Self::Medium
        } else if score >= thresholds.low {
            Self::Low
        } else {
            Self::Filter
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Filter => "FILTER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CRITICAL" => Some(Self::Critical),
            "HIGH" => Some(Self::High),
            "MEDIUM" => Some(Self::Medium),
            "LOW" => Some(Self::Low),
            "FILTER" => Some(Self::Filter),
            _ => None,
        }
    }
}

impl fmt::Display for Relevance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split of a scored list into kept and filtered items, order preserved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition<T> {
    pub kept: Vec<T>,
    pub filtered: Vec<T>,
}

impl<T> Default for Partition<T> {
    fn default() -> Self {
        Self {
            kept: Vec::new(),
            filtered: Vec::new(),
        }
    }
}

fn partition_by(items: &[EventScore], keep: impl Fn(&EventScore) -> bool) -> Partition<EventScore> {
    let (kept, filtered) = items.iter().cloned().partition(|item| keep(item));
    Partition { kept, filtered }
}

/// Keep events whose final score is at least `min_score`
pub fn filter_by_score(items: &[EventScore], min_score: f64) -> Partition<EventScore> {
    partition_by(items, |e| e.breakdown.final_score >= min_score)
}

/// Keep events at or above `min` relevance
pub fn filter_by_relevance(items: &[EventScore], min: Relevance) -> Partition<EventScore> {
    partition_by(items, |e| e.breakdown.relevance >= min)
}
