//! Anchor-relative temporal flagging
//!
//! Classifies event dates against an anchor such as an insurance
//! enrollment date. Windows are measured in calendar months, so "3 months
//! before 2024-05-31" starts on 2024-02-29.
//!
//! | level      | condition                               |
//! |------------|-----------------------------------------|
//! | `critical` | within 3 months before the anchor       |
//! | `warning`  | within 5 years before the anchor        |
//! | `info`     | the anchor day, or within 3 months after|
//! | `normal`   | anything else                           |

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::TemporalConfig;
use crate::normalize::to_iso;

/// Review priority of an event relative to an anchor, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Normal,
    Info,
    Warning,
    Critical,
}

/// Relationship of one event date to one anchor date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalFlag {
    pub event_date: NaiveDate,
    pub anchor_date: NaiveDate,
    /// Signed day difference, negative before the anchor
    pub days_diff: i64,
    pub is_before_anchor: bool,
    pub is_after_anchor: bool,
    pub is_anchor_date: bool,
    pub within_3_months_before: bool,
    pub within_5_years_before: bool,
    pub within_3_months_after: bool,
    pub warning_level: WarningLevel,
}

/// A named anchor date (one per policy)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub key: String,
    pub date: NaiveDate,
}

impl Anchor {
    /// Anchor keyed by its ISO date
    pub fn new(date: NaiveDate) -> Self {
        Self {
            key: to_iso(date),
            date,
        }
    }

    pub fn named(key: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            key: key.into(),
            date,
        }
    }
}

/// An event to place on the timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub date: NaiveDate,
    #[serde(default)]
    pub label: Option<String>,
}

impl TimelineEvent {
    pub fn new(date: NaiveDate) -> Self {
        Self { date, label: None }
    }

    pub fn labeled(date: NaiveDate, label: impl Into<String>) -> Self {
        Self {
            date,
            label: Some(label.into()),
        }
    }
}

/// A timeline event with its flags under every anchor key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedEvent {
    pub date: NaiveDate,
    #[serde(default)]
    pub label: Option<String>,
    /// Added because an anchor date had no event of its own
    pub synthesized: bool,
    pub flags: BTreeMap<String, TemporalFlag>,
}

impl FlaggedEvent {
    /// Most severe level across all anchors
    pub fn highest_warning(&self) -> WarningLevel {
        self.flags
            .values()
            .map(|f| f.warning_level)
            .max()
            .unwrap_or(WarningLevel::Normal)
    }
}

/// Computes [`TemporalFlag`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalFlagger {
    config: TemporalConfig,
}

impl TemporalFlagger {
    pub fn new(config: TemporalConfig) -> Self {
        Self { config }
    }

    /// Flag one event against one anchor
    pub fn flag(&self, event: NaiveDate, anchor: NaiveDate) -> TemporalFlag {
        let near = Months::new(self.config.near_months);
        let lookback = Months::new(self.config.lookback_years.saturating_mul(12));

        let days_diff = (event - anchor).num_days();
        let is_before_anchor = event < anchor;
        let is_after_anchor = event > anchor;
        let is_anchor_date = event == anchor;

        // out-of-range arithmetic only happens near NaiveDate::MIN/MAX; the
        // window then covers everything on that side
        let near_start = anchor.checked_sub_months(near).unwrap_or(NaiveDate::MIN);
        let lookback_start = anchor.checked_sub_months(lookback).unwrap_or(NaiveDate::MIN);
        let near_end = anchor.checked_add_months(near).unwrap_or(NaiveDate::MAX);

        let within_3_months_before = is_before_anchor && event >= near_start;
        let within_5_years_before = is_before_anchor && event >= lookback_start;
        let within_3_months_after = is_after_anchor && event <= near_end;

        let warning_level = if within_3_months_before {
            WarningLevel::Critical
        } else if within_5_years_before {
            WarningLevel::Warning
        } else if is_anchor_date || within_3_months_after {
            WarningLevel::Info
        } else {
            WarningLevel::Normal
        };

        TemporalFlag {
            event_date: event,
            anchor_date: anchor,
            days_diff,
            is_before_anchor,
            is_after_anchor,
            is_anchor_date,
            within_3_months_before,
            within_5_years_before,
            within_3_months_after,
            warning_level,
        }
    }

    /// Flag every event against every anchor
    ///
    /// An anchor date without an event of its own is added as a synthesized
    /// event (which is `info` under its own anchor). The result is sorted by
    /// date; events on the same day keep their input order.
    pub fn flag_timeline(&self, events: &[TimelineEvent], anchors: &[Anchor]) -> Vec<FlaggedEvent> {
        let mut timeline: Vec<(TimelineEvent, bool)> =
            events.iter().cloned().map(|e| (e, false)).collect();

        for anchor in anchors {
            if !timeline.iter().any(|(e, _)| e.date == anchor.date) {
                timeline.push((TimelineEvent::labeled(anchor.date, anchor.key.clone()), true));
            }
        }
        timeline.sort_by_key(|(e, _)| e.date);

        let flagged: Vec<FlaggedEvent> = timeline
            .into_iter()
            .map(|(event, synthesized)| FlaggedEvent {
                flags: anchors
                    .iter()
                    .map(|a| (a.key.clone(), self.flag(event.date, a.date)))
                    .collect(),
                date: event.date,
                label: event.label,
                synthesized,
            })
            .collect();

        tracing::debug!(
            events = events.len(),
            anchors = anchors.len(),
            flagged = flagged.len(),
            "timeline flagged"
        );
        flagged
    }
}
