//! Date audit for manual review
//!
//! The extractor silently drops date-shaped strings it cannot accept. The
//! auditor re-scans a text leniently and reports those rejections, plus
//! valid dates lying implausibly far in the future. For dates the
//! reference lists but the candidate missed, it points at the reference
//! line so a reviewer can see the context.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::AuditConfig;
use crate::error::DateError;
use crate::extract::Extractor;

/// Why a date-shaped string was flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditIssueKind {
    /// Month or day outside the calendar
    Impossible,
    /// Year outside the plausible window
    OutOfWindow,
    /// Valid date beyond the future grace period
    Future,
}

/// One flagged date string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditIssue {
    pub raw_text: String,
    pub offset: usize,
    pub kind: AuditIssueKind,
    pub detail: String,
}

/// Where a missing reference date appears
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingDateContext {
    pub date: NaiveDate,
    /// 1-based line number in the reference text
    pub line_number: usize,
    /// Trimmed line, cut at the configured maximum length
    pub line: String,
}

/// Audit of both sides of one case
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseAudit {
    pub candidate_issues: Vec<AuditIssue>,
    pub reference_issues: Vec<AuditIssue>,
    pub missing_contexts: Vec<MissingDateContext>,
}

impl CaseAudit {
    pub fn is_clean(&self) -> bool {
        self.candidate_issues.is_empty() && self.reference_issues.is_empty()
    }
}

/// Lenient re-scan with the patterns and window of an [`Extractor`]
#[derive(Debug, Clone, Copy)]
pub struct DateAuditor<'a> {
    extractor: &'a Extractor,
    future_grace: Days,
    max_line_chars: usize,
}

impl<'a> DateAuditor<'a> {
    pub fn new(extractor: &'a Extractor, config: &AuditConfig) -> Self {
        Self {
            extractor,
            future_grace: Days::new(config.future_grace_days),
            max_line_chars: config.max_line_chars,
        }
    }

    pub fn with_future_grace(mut self, days: u64) -> Self {
        self.future_grace = Days::new(days);
        self
    }

    /// Flag rejected and future dates in `text`
    pub fn audit(&self, text: &str, today: NaiveDate) -> Vec<AuditIssue> {
        let limit = today.checked_add_days(self.future_grace).unwrap_or(NaiveDate::MAX);
        let normalizer = self.extractor.date_normalizer();

        crate::extract::text::scan_raw_dates(text, self.extractor.config())
            .into_iter()
            .filter_map(|raw| {
                let (kind, detail) =
                    match normalizer.from_parts(raw.year, raw.month, raw.day, raw.short_year) {
                        Ok(date) if date > limit => (
                            AuditIssueKind::Future,
                            format!("{date} is after {limit}"),
                        ),
                        Ok(_) => return None,
                        Err(err @ DateError::InvalidCalendar { .. }) => {
                            (AuditIssueKind::Impossible, err.to_string())
                        }
                        Err(err @ DateError::OutOfWindow { .. }) => {
                            (AuditIssueKind::OutOfWindow, err.to_string())
                        }
                        Err(DateError::Unrecognized(_)) => return None,
                    };
                Some(AuditIssue {
                    raw_text: raw.raw.to_string(),
                    offset: raw.start,
                    kind,
                    detail,
                })
            })
            .collect()
    }

    /// First reference line holding each missing date
    ///
    /// Dates that cannot be located are left out.
    pub fn missing_contexts(&self, reference: &str, missing: &[NaiveDate]) -> Vec<MissingDateContext> {
        let lines: Vec<(usize, &str, Vec<NaiveDate>)> = reference
            .lines()
            .enumerate()
            .map(|(i, line)| {
                let dates = self
                    .extractor
                    .scan_dates(line)
                    .into_iter()
                    .map(|c| c.normalized_date)
                    .collect();
                (i + 1, line, dates)
            })
            .collect();

        missing
            .iter()
            .filter_map(|date| {
                let (line_number, line, _) = lines.iter().find(|(_, _, dates)| dates.contains(date))?;
                Some(MissingDateContext {
                    date: *date,
                    line_number: *line_number,
                    line: line.trim().chars().take(self.max_line_chars).collect(),
                })
            })
            .collect()
    }
}
