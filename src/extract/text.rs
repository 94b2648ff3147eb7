//! Free-text scanners for dates, codes and hospital names
//!
//! `\b` is not usable here: the regex crate treats Hangul as word
//! characters, so `2024.01.15에` or `진단E11` would never match. Boundaries
//! are checked by hand against ASCII digits and letters instead.

use regex::Regex;
use std::sync::LazyLock;

use crate::config::{CodeCue, ExtractorConfig};
use crate::models::DatePattern;
use crate::normalize::date::date_patterns;

static CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z][0-9]{2}(?:\.[0-9]{1,2})?").unwrap());

static HOSPITAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[가-힣]+(?:의료원|병원|의원|센터)").unwrap());

/// A date-shaped match before calendar validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawDate<'t> {
    pub start: usize,
    pub end: usize,
    pub raw: &'t str,
    pub pattern: DatePattern,
    pub year: &'t str,
    pub month: &'t str,
    pub day: &'t str,
    pub short_year: bool,
}

/// A code-shaped token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawToken<'t> {
    pub start: usize,
    pub text: &'t str,
}

fn prev_char(text: &str, at: usize) -> Option<char> {
    text[..at].chars().next_back()
}

fn next_char(text: &str, at: usize) -> Option<char> {
    text[at..].chars().next()
}

fn digit_bounded(text: &str, start: usize, end: usize) -> bool {
    !prev_char(text, start).is_some_and(|c| c.is_ascii_digit())
        && !next_char(text, end).is_some_and(|c| c.is_ascii_digit())
}

fn pattern_enabled(pattern: DatePattern, config: &ExtractorConfig) -> bool {
    match pattern {
        DatePattern::DayMonthYear => config.day_month_year,
        DatePattern::ShortYear | DatePattern::ShortYearKorean => config.short_year,
        _ => true,
    }
}

/// Every date-shaped span, in text order
///
/// Patterns are tried in priority order and a span claimed by an earlier
/// pattern cannot be reused by a later one, even when its value later fails
/// validation.
pub(crate) fn scan_raw_dates<'t>(text: &'t str, config: &ExtractorConfig) -> Vec<RawDate<'t>> {
    let mut found: Vec<RawDate<'t>> = Vec::new();

    for compiled in date_patterns() {
        if !pattern_enabled(compiled.pattern, config) {
            continue;
        }
        for caps in compiled.scan.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let (start, end) = (whole.start(), whole.end());

            if !digit_bounded(text, start, end) {
                continue;
            }
            if found.iter().any(|f| start < f.end && f.start < end) {
                continue;
            }
            let Some((year, month, day)) = compiled.parts(&caps) else {
                continue;
            };
            found.push(RawDate {
                start,
                end,
                raw: whole.as_str(),
                pattern: compiled.pattern,
                year,
                month,
                day,
                short_year: compiled.is_short_year(),
            });
        }
    }

    found.sort_by_key(|f| f.start);
    found
}

fn code_bounded(text: &str, start: usize, end: usize) -> bool {
    if prev_char(text, start).is_some_and(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    match next_char(text, end) {
        Some(c) if c.is_ascii_alphanumeric() => false,
        // E11.789 must not yield E11.78
        Some('.') => !next_char(text, end + 1).is_some_and(|c| c.is_ascii_digit()),
        _ => true,
    }
}

fn preceded_by_cue(text: &str, start: usize, config: &ExtractorConfig) -> bool {
    let before = &text[..start];
    let line = before.rsplit('\n').next().unwrap_or(before);
    let skip = line.chars().count().saturating_sub(config.code_cue_lookback_chars);
    let window: String = line.chars().skip(skip).collect();
    config
        .code_cue_keywords
        .iter()
        .any(|k| window.contains(k.as_str()))
}

/// Code-shaped tokens, in text order
pub(crate) fn scan_raw_codes<'t>(text: &'t str, config: &ExtractorConfig) -> Vec<RawToken<'t>> {
    CODE_REGEX
        .find_iter(text)
        .filter(|m| code_bounded(text, m.start(), m.end()))
        .filter(|m| match config.code_cue {
            CodeCue::Optional => true,
            CodeCue::Required => preceded_by_cue(text, m.start(), config),
        })
        .map(|m| RawToken {
            start: m.start(),
            text: m.as_str(),
        })
        .collect()
}

/// First code-shaped token of a field value, cue or not
pub(crate) fn first_code(text: &str) -> Option<&str> {
    CODE_REGEX
        .find_iter(text)
        .find(|m| code_bounded(text, m.start(), m.end()))
        .map(|m| m.as_str())
}

/// Hospital-name tokens (Hangul run + institution suffix), in text order
pub(crate) fn scan_raw_hospitals(text: &str) -> Vec<RawToken<'_>> {
    HOSPITAL_REGEX
        .find_iter(text)
        .map(|m| RawToken {
            start: m.start(),
            text: m.as_str(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raws(text: &str) -> Vec<&str> {
        scan_raw_dates(text, &ExtractorConfig::default())
            .into_iter()
            .map(|r| r.raw)
            .collect()
    }

    #[test]
    fn test_dates_next_to_hangul() {
        assert_eq!(raws("2024.01.15에 내원"), vec!["2024.01.15"]);
        assert_eq!(raws("진료일2024-03-01입니다"), vec!["2024-03-01"]);
    }

    #[test]
    fn test_no_partial_matches_inside_numbers() {
        assert!(raws("등록번호 12024-01-150").is_empty());
        assert!(raws("010-1234-5678").is_empty());
    }

    #[test]
    fn test_overlap_claimed_by_first_pattern() {
        let found = scan_raw_dates("2024.01.15", &ExtractorConfig::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pattern, DatePattern::Dotted);
    }

    #[test]
    fn test_text_order() {
        assert_eq!(
            raws("퇴원 2024년 2월 1일, 입원 2024.01.20"),
            vec!["2024년 2월 1일", "2024.01.20"]
        );
    }

    #[test]
    fn test_disabled_patterns() {
        let config = ExtractorConfig {
            short_year: false,
            day_month_year: false,
            ..Default::default()
        };
        assert!(scan_raw_dates("24.01.15 15.01.2024", &config).is_empty());
    }

    #[test]
    fn test_code_boundaries() {
        let config = ExtractorConfig::default();
        let codes: Vec<&str> = scan_raw_codes("진단E11.9, I10 / COVID19 / E11.789", &config)
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(codes, vec!["E11.9", "I10"]);
    }

    #[test]
    fn test_code_cue_required() {
        let config = ExtractorConfig {
            code_cue: CodeCue::Required,
            ..Default::default()
        };
        let codes: Vec<&str> = scan_raw_codes("상병코드: K29.7\n참고 J45", &config)
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(codes, vec!["K29.7"]);
    }

    #[test]
    fn test_code_cue_lookback_configurable() {
        let text = "상병코드 (주상병, 부상병 순) K29.7";
        let mut config = ExtractorConfig {
            code_cue: CodeCue::Required,
            code_cue_lookback_chars: 3,
            ..Default::default()
        };
        assert!(scan_raw_codes(text, &config).is_empty());
        config.code_cue_lookback_chars = 30;
        assert_eq!(scan_raw_codes(text, &config).len(), 1);
    }

    #[test]
    fn test_hospital_tokens() {
        let names: Vec<&str> = scan_raw_hospitals("서울대학교병원에서 진료 후 강남내과의원 방문")
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(names, vec!["서울대학교병원", "강남내과의원"]);
    }
}
