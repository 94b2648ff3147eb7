//! Candidate extraction from free text and structured documents
//!
//! The [`Extractor`] produces located, normalized candidates:
//!
//! - dates, through an ordered list of patterns with overlap suppression
//!   and first-occurrence deduplication by normalized value
//! - diagnostic codes shaped like `E11.9`, optionally behind a cue keyword
//! - hospital names (Hangul run + institution suffix)
//!
//! Structured documents are walked field by field with the same
//! normalizers; malformed values are dropped and logged at `trace`.

mod blocks;
pub(crate) mod fields;
pub(crate) mod text;

pub use blocks::{merge_ocr_blocks, PAGE_SEPARATOR};

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::config::{EngineConfig, ExtractorConfig, NormalizerConfig};
use crate::models::{
    CodeCandidate, DateCandidate, DatePattern, DateType, Extraction, ExtractionDocument,
    HospitalCandidate, SourceLocation,
};
use crate::normalize::{normalize_code, DateNormalizer, HospitalNormalizer};

pub(crate) use blocks::reading_order;

/// Scans texts and structured documents for candidates
#[derive(Debug, Clone)]
pub struct Extractor {
    dates: DateNormalizer,
    hospitals: HospitalNormalizer,
    config: ExtractorConfig,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::for_candidates(&EngineConfig::default())
    }
}

impl Extractor {
    pub fn new(dates: DateNormalizer, normalizer: &NormalizerConfig, config: ExtractorConfig) -> Self {
        Self {
            dates,
            hospitals: HospitalNormalizer::from_config(normalizer),
            config,
        }
    }

    /// Extractor for machine output (wide year window)
    pub fn for_candidates(config: &EngineConfig) -> Self {
        Self::new(
            DateNormalizer::for_candidates(&config.normalizer),
            &config.normalizer,
            config.extractor.clone(),
        )
    }

    /// Extractor for ground-truth text (tight year window)
    pub fn for_reference(config: &EngineConfig) -> Self {
        Self::new(
            DateNormalizer::for_reference(&config.normalizer),
            &config.normalizer,
            config.extractor.clone(),
        )
    }

    pub fn date_normalizer(&self) -> &DateNormalizer {
        &self.dates
    }

    pub fn hospital_normalizer(&self) -> &HospitalNormalizer {
        &self.hospitals
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Every valid date occurrence in a text, repeats included
    ///
    /// Results are in text order.
    pub fn scan_all_dates_with(
        &self,
        input: &str,
        locate: impl Fn(usize) -> SourceLocation,
    ) -> Vec<DateCandidate> {
        let mut out = Vec::new();

        for raw in text::scan_raw_dates(input, &self.config) {
            match self
                .dates
                .from_parts(raw.year, raw.month, raw.day, raw.short_year)
            {
                Ok(date) => out.push(DateCandidate {
                    raw_text: raw.raw.to_string(),
                    normalized_date: date,
                    pattern: raw.pattern,
                    source: locate(raw.start),
                    date_type: DateType::Unknown,
                }),
                Err(err) => {
                    tracing::trace!(raw = raw.raw, offset = raw.start, error = %err, "dropped date");
                }
            }
        }
        out
    }

    /// Valid dates in a text, with caller-defined source locations
    ///
    /// Results are in text order, deduplicated by normalized date.
    pub fn scan_dates_with(
        &self,
        input: &str,
        locate: impl Fn(usize) -> SourceLocation,
    ) -> Vec<DateCandidate> {
        let mut out = self.scan_all_dates_with(input, locate);
        dedup_by(&mut out, |d| d.normalized_date);
        out
    }

    /// Valid dates in a text, located by byte offset
    pub fn scan_dates(&self, input: &str) -> Vec<DateCandidate> {
        self.scan_dates_with(input, |offset| SourceLocation::Offset { offset })
    }

    /// Diagnostic codes in a text, deduplicated by code
    pub fn scan_codes(&self, input: &str) -> Vec<CodeCandidate> {
        let mut seen = HashSet::new();
        text::scan_raw_codes(input, &self.config)
            .into_iter()
            .filter_map(|token| {
                let code = normalize_code(token.text)?;
                seen.insert(code.clone()).then(|| CodeCandidate {
                    raw_text: token.text.to_string(),
                    code,
                    source: SourceLocation::Offset {
                        offset: token.start,
                    },
                })
            })
            .collect()
    }

    /// Hospital names in a text, deduplicated by comparison key
    pub fn scan_hospitals(&self, input: &str) -> Vec<HospitalCandidate> {
        let mut seen = HashSet::new();
        text::scan_raw_hospitals(input)
            .into_iter()
            .filter_map(|token| {
                let normalized = self.hospitals.normalize(token.text);
                seen.insert(normalized.clone()).then(|| HospitalCandidate {
                    name: token.text.to_string(),
                    normalized,
                    source: SourceLocation::Offset {
                        offset: token.start,
                    },
                })
            })
            .collect()
    }

    /// All candidates of a free text
    pub fn extract_text(&self, input: &str) -> Extraction {
        Extraction {
            dates: self.scan_dates(input),
            codes: self.scan_codes(input),
            hospitals: self.scan_hospitals(input),
        }
    }

    /// Union of structured-field and free-text candidates of a document
    ///
    /// Structured fields are walked first, so on duplicate values the
    /// structured candidate is the one kept.
    pub fn extract_document(&self, doc: &ExtractionDocument) -> Extraction {
        let mut extraction = Extraction::default();

        if let Some(fields) = &doc.structured_fields {
            for category in fields::categories(fields) {
                for (index, record) in category.records.iter().enumerate() {
                    self.walk_record(&mut extraction, category.name, category.date_type, index, *record);
                }
            }
        }

        if let Some(full_text) = doc.full_text() {
            let scanned = self.extract_text(&full_text);
            extraction.dates.extend(scanned.dates);
            extraction.codes.extend(scanned.codes);
            extraction.hospitals.extend(scanned.hospitals);
        }

        dedup_by(&mut extraction.dates, |d| d.normalized_date);
        dedup_by(&mut extraction.codes, |c| c.code.clone());
        dedup_by(&mut extraction.hospitals, |h| h.normalized.clone());

        tracing::debug!(
            dates = extraction.dates.len(),
            codes = extraction.codes.len(),
            hospitals = extraction.hospitals.len(),
            "document extracted"
        );
        extraction
    }

    fn walk_record(
        &self,
        out: &mut Extraction,
        field: &str,
        default_type: DateType,
        index: usize,
        record: &dyn fields::FieldRecord,
    ) {
        let location = |subfield: &str| SourceLocation::Field {
            field: field.to_string(),
            index,
            subfield: subfield.to_string(),
        };

        for date_field in record.date_fields() {
            let date_type = date_field.date_type.unwrap_or(default_type);
            match self.field_date(date_field.value) {
                Some((date, pattern)) => out.dates.push(DateCandidate {
                    raw_text: date_field.value.to_string(),
                    normalized_date: date,
                    pattern,
                    source: location(date_field.name),
                    date_type,
                }),
                None => tracing::trace!(
                    field,
                    index,
                    subfield = date_field.name,
                    value = date_field.value,
                    "dropped field date"
                ),
            }
        }

        if let Some(raw) = record.code() {
            let code = normalize_code(raw).or_else(|| text::first_code(raw).and_then(normalize_code));
            if let Some(code) = code {
                out.codes.push(CodeCandidate {
                    raw_text: raw.to_string(),
                    code,
                    source: location("code"),
                });
            }
        }

        if let Some(name) = record.hospital().map(str::trim).filter(|n| !n.is_empty()) {
            out.hospitals.push(HospitalCandidate {
                name: name.to_string(),
                normalized: self.hospitals.normalize(name),
                source: location("hospital"),
            });
        }
    }

    /// A field value is either a whole date or contains one
    fn field_date(&self, value: &str) -> Option<(NaiveDate, DatePattern)> {
        if let Ok(parsed) = self.dates.parse(value) {
            return Some((parsed.date, parsed.pattern));
        }
        self.scan_dates(value)
            .into_iter()
            .next()
            .map(|c| (c.normalized_date, c.pattern))
    }
}

fn dedup_by<T, K, F>(items: &mut Vec<T>, key: F)
where
    K: std::hash::Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(key(item)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiagnosisEntry, HospitalizationEntry, StructuredFields};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_scan_dates_dedup_first_wins() {
        let extractor = Extractor::default();
        let dates = extractor.scan_dates("2024.01.15 내원, 2024-01-15 재진, 2024-02-30 오류");
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].raw_text, "2024.01.15");
        assert_eq!(dates[0].pattern, DatePattern::Dotted);
        assert_eq!(dates[0].source, SourceLocation::Offset { offset: 0 });
    }

    #[test]
    fn test_scan_all_dates_keeps_repeats() {
        let extractor = Extractor::default();
        let text = "2024.01.15 내원, 2024-01-15 재진, 2024-02-30 오류";
        let dates = extractor.scan_all_dates_with(text, |offset| SourceLocation::Offset { offset });
        assert_eq!(dates.len(), 2);
        assert_eq!(dates[1].raw_text, "2024-01-15");
        assert_eq!(dates[0].normalized_date, dates[1].normalized_date);
    }

    #[test]
    fn test_reference_window_is_tighter() {
        let config = EngineConfig::default();
        let text = "1985.03.02 출생, 2024.01.15 내원";
        assert_eq!(Extractor::for_candidates(&config).scan_dates(text).len(), 2);
        let reference = Extractor::for_reference(&config).scan_dates(text);
        assert_eq!(reference.len(), 1);
        assert_eq!(reference[0].normalized_date, ymd(2024, 1, 15));
    }

    #[test]
    fn test_extract_text_all_kinds() {
        let extraction = Extractor::default()
            .extract_text("2024.01.15 서울대학교병원 진단: 제2형 당뇨병(E11.9), 고혈압 I10");
        assert_eq!(extraction.dates.len(), 1);
        let codes: Vec<&str> = extraction.codes.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["E11.9", "I10"]);
        assert_eq!(extraction.hospitals[0].normalized, "서울대학교");
    }

    #[test]
    fn test_extract_structured_document() {
        let doc = ExtractionDocument {
            text: Some("추가 기록 2024.01.20 퇴원".to_string()),
            structured_fields: Some(StructuredFields {
                diagnoses: Some(vec![DiagnosisEntry {
                    date: Some("2024.01.15".into()),
                    code: Some("e11.9".into()),
                    name_local: Some("당뇨병".into()),
                    hospital: Some("서울 병원".into()),
                }]),
                hospitalizations: Some(vec![HospitalizationEntry {
                    admission_date: Some("2024-01-15".into()),
                    discharge_date: Some("2024-01-20".into()),
                    hospital: Some("서울병원".into()),
                }]),
                ..Default::default()
            }),
            blocks: None,
        };

        let extraction = Extractor::default().extract_document(&doc);
        let dates: Vec<NaiveDate> = extraction.dates.iter().map(|d| d.normalized_date).collect();
        assert_eq!(dates, vec![ymd(2024, 1, 15), ymd(2024, 1, 20)]);
        assert_eq!(extraction.dates[1].date_type, DateType::Discharge);
        assert!(matches!(extraction.dates[1].source, SourceLocation::Field { .. }));
        assert_eq!(extraction.codes[0].code, "E11.9");
        assert_eq!(extraction.hospitals.len(), 1);
    }

    #[test]
    fn test_malformed_field_dropped() {
        let doc = ExtractionDocument::from_fields(StructuredFields {
            diagnoses: Some(vec![DiagnosisEntry {
                date: Some("2024-13-45".into()),
                code: Some("not a code".into()),
                ..Default::default()
            }]),
            ..Default::default()
        });
        let extraction = Extractor::default().extract_document(&doc);
        assert!(extraction.dates.is_empty());
        assert!(extraction.codes.is_empty());
    }

    #[test]
    fn test_field_date_embedded_in_text() {
        let doc = ExtractionDocument::from_fields(StructuredFields {
            diagnoses: Some(vec![DiagnosisEntry {
                date: Some("진단일 2023년 7월 3일".into()),
                ..Default::default()
            }]),
            ..Default::default()
        });
        let extraction = Extractor::default().extract_document(&doc);
        assert_eq!(extraction.dates[0].normalized_date, ymd(2023, 7, 3));
        assert_eq!(extraction.dates[0].date_type, DateType::Visit);
    }
}
