//! Multi-format date normalization
//!
//! Supported forms, in scan priority order:
//!
//! | Pattern            | Example            |
//! |--------------------|--------------------|
//! | Korean             | `2024년 1월 15일`  |
//! | ShortYearKorean    | `24년 1월 15일`    |
//! | IsoDash            | `2024-01-15`       |
//! | Dotted             | `2024.01.15`       |
//! | Slashed            | `2024/01/15`       |
//! | DayMonthYear       | `15.01.2024`       |
//! | ShortYear          | `24.01.15`         |
//!
//! Two-digit years are expanded with a pivot: `yy >= pivot` maps to `19yy`,
//! anything below to `20yy` (pivot 50 by default). No locale guessing.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

use crate::config::{NormalizerConfig, YearWindow};
use crate::error::DateError;
use crate::models::DatePattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldOrder {
    YearFirst,
    DayFirst,
}

struct PatternSpec {
    pattern: DatePattern,
    body: &'static str,
    order: FieldOrder,
    short_year: bool,
}

const SPECS: [PatternSpec; 7] = [
    PatternSpec {
        pattern: DatePattern::Korean,
        body: r"(\d{4})\s*년\s*(\d{1,2})\s*월\s*(\d{1,2})\s*일",
        order: FieldOrder::YearFirst,
        short_year: false,
    },
    PatternSpec {
        pattern: DatePattern::ShortYearKorean,
        body: r"(\d{2})\s*년\s*(\d{1,2})\s*월\s*(\d{1,2})\s*일",
        order: FieldOrder::YearFirst,
        short_year: true,
    },
    PatternSpec {
        pattern: DatePattern::IsoDash,
        body: r"(\d{4})-(\d{1,2})-(\d{1,2})",
        order: FieldOrder::YearFirst,
        short_year: false,
    },
    PatternSpec {
        pattern: DatePattern::Dotted,
        body: r"(\d{4})\.\s?(\d{1,2})\.\s?(\d{1,2})",
        order: FieldOrder::YearFirst,
        short_year: false,
    },
    PatternSpec {
        pattern: DatePattern::Slashed,
        body: r"(\d{4})/(\d{1,2})/(\d{1,2})",
        order: FieldOrder::YearFirst,
        short_year: false,
    },
    PatternSpec {
        pattern: DatePattern::DayMonthYear,
        body: r"(\d{1,2})[./-](\d{1,2})[./-](\d{4})",
        order: FieldOrder::DayFirst,
        short_year: false,
    },
    PatternSpec {
        pattern: DatePattern::ShortYear,
        body: r"(\d{2})[./-](\d{1,2})[./-](\d{1,2})",
        order: FieldOrder::YearFirst,
        short_year: true,
    },
];

/// A compiled date pattern, usable for scanning and for whole-string parsing
pub(crate) struct CompiledPattern {
    pub pattern: DatePattern,
    pub scan: Regex,
    anchored: Regex,
    order: FieldOrder,
    short_year: bool,
}

impl CompiledPattern {
    /// Split captures into (year, month, day) strings
    pub fn parts<'t>(&self, caps: &regex::Captures<'t>) -> Option<(&'t str, &'t str, &'t str)> {
        let a = caps.get(1)?.as_str();
        let b = caps.get(2)?.as_str();
        let c = caps.get(3)?.as_str();
        Some(match self.order {
            FieldOrder::YearFirst => (a, b, c),
            FieldOrder::DayFirst => (c, b, a),
        })
    }

    pub fn is_short_year(&self) -> bool {
        self.short_year
    }
}

static PATTERNS: LazyLock<Vec<CompiledPattern>> = LazyLock::new(|| {
    SPECS
        .iter()
        .map(|spec| CompiledPattern {
            pattern: spec.pattern,
            scan: Regex::new(spec.body).expect("static date pattern"),
            anchored: Regex::new(&format!(r"^\s*{}\.?\s*$", spec.body))
                .expect("static date pattern"),
            order: spec.order,
            short_year: spec.short_year,
        })
        .collect()
});

/// All date patterns in scan priority order
pub(crate) fn date_patterns() -> &'static [CompiledPattern] {
    &PATTERNS
}

/// A successfully normalized date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub date: NaiveDate,
    pub pattern: DatePattern,
}

/// Canonical ISO form (YYYY-MM-DD)
pub fn to_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Date normalizer bound to a plausible-year window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateNormalizer {
    window: YearWindow,
    pivot: u32,
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(YearWindow::candidate(), 50)
    }
}

impl DateNormalizer {
    pub fn new(window: YearWindow, pivot: u32) -> Self {
        Self { window, pivot }
    }

    /// Normalizer for machine-generated candidates
    pub fn for_candidates(config: &NormalizerConfig) -> Self {
        Self::new(config.candidate_window, config.two_digit_pivot)
    }

    /// Normalizer for ground-truth dates (tighter window)
    pub fn for_reference(config: &NormalizerConfig) -> Self {
        Self::new(config.reference_window, config.two_digit_pivot)
    }

    pub fn window(&self) -> YearWindow {
        self.window
    }

    /// Expand a two-digit year with the pivot rule
    pub fn expand_year(&self, yy: u32) -> i32 {
        if yy >= self.pivot {
            1900 + yy as i32
        } else {
            2000 + yy as i32
        }
    }

    /// Parse a whole string in any supported format
    pub fn parse(&self, raw: &str) -> Result<ParsedDate, DateError> {
        for compiled in date_patterns() {
            if let Some(caps) = compiled.anchored.captures(raw) {
                let (y, m, d) = compiled
                    .parts(&caps)
                    .ok_or_else(|| DateError::Unrecognized(raw.to_string()))?;
                let date = self.from_parts(y, m, d, compiled.short_year)?;
                return Ok(ParsedDate {
                    date,
                    pattern: compiled.pattern,
                });
            }
        }
        Err(DateError::Unrecognized(raw.to_string()))
    }

    /// Parse a whole string, discarding the rejection reason
    pub fn normalize(&self, raw: &str) -> Option<NaiveDate> {
        self.parse(raw).ok().map(|p| p.date)
    }

    /// Parse a whole string into its ISO form
    pub fn normalize_iso(&self, raw: &str) -> Option<String> {
        self.normalize(raw).map(to_iso)
    }

    /// Build a date from captured digit groups
    pub fn from_parts(
        &self,
        year: &str,
        month: &str,
        day: &str,
        short_year: bool,
    ) -> Result<NaiveDate, DateError> {
        let unrecognized = || DateError::Unrecognized(format!("{year}-{month}-{day}"));
        let y: u32 = year.parse().map_err(|_| unrecognized())?;
        let m: u32 = month.parse().map_err(|_| unrecognized())?;
        let d: u32 = day.parse().map_err(|_| unrecognized())?;

        let year = if short_year {
            self.expand_year(y)
        } else {
            y as i32
        };

        let date = NaiveDate::from_ymd_opt(year, m, d).ok_or(DateError::InvalidCalendar {
            year,
            month: m,
            day: d,
        })?;
        self.check_window(date)?;
        Ok(date)
    }

    /// Reject dates outside the plausible-year window
    pub fn check_window(&self, date: NaiveDate) -> Result<(), DateError> {
        if self.window.contains(date.year()) {
            Ok(())
        } else {
            Err(DateError::OutOfWindow {
                year: date.year(),
                min: self.window.min_year,
                max: self.window.max_year,
            })
        }
    }
}
