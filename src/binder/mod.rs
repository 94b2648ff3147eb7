//! Context window binding of dates to clinical attributes
//!
//! A document is a flat list of text segments. For a date found in segment
//! `i`, the binder concatenates `segments[i-N ..= i+N]` (clamped to the
//! list) and looks only there for the hospital, diagnosis and treatment it
//! belongs to, and for the keyword cue that decides its [`DateType`].
//! Binding is local on purpose: a wider window binds more unrelated facts.
//!
//! Attribute and date-type lookups are [`RankedRules`]; callers can put
//! their own [`ContextRule`]s in front of the configured keyword tables.

pub mod rules;

pub use rules::{ContextRule, HospitalName, KeywordPredicate, KeywordValue, RankedRules};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::BinderConfig;
use crate::extract::{reading_order, Extractor};
use crate::models::{BoundRecord, DateCandidate, DateType, ExtractionDocument, OcrBlock, SourceLocation};

/// One unit of text the binder windows over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    /// Upstream (OCR) confidence, when known
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl Segment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence: Some(confidence),
        }
    }
}

/// Non-empty trimmed lines of a text
pub fn segments_from_text(text: &str) -> Vec<Segment> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(Segment::new)
        .collect()
}

/// Non-empty OCR blocks in reading order, keeping their confidence
pub fn segments_from_blocks(blocks: &[OcrBlock]) -> Vec<Segment> {
    reading_order(blocks)
        .into_iter()
        .filter(|b| !b.text.trim().is_empty())
        .map(|b| Segment {
            text: b.text.trim().to_string(),
            confidence: b.confidence,
        })
        .collect()
}

/// Segments of a document: its text lines, or its OCR blocks when it has
/// no text
pub fn segments_of(doc: &ExtractionDocument) -> Vec<Segment> {
    match (&doc.text, &doc.blocks) {
        (Some(text), _) => segments_from_text(text),
        (None, Some(blocks)) => segments_from_blocks(blocks),
        (None, None) => Vec::new(),
    }
}

/// Binds date candidates to the attributes found around them
#[derive(Debug)]
pub struct ContextBinder {
    config: BinderConfig,
    date_types: RankedRules<DateType>,
    hospital: RankedRules<String>,
    diagnosis: RankedRules<String>,
    treatment: RankedRules<String>,
}

impl Default for ContextBinder {
    fn default() -> Self {
        Self::new(BinderConfig::default())
    }
}

impl ContextBinder {
    pub fn new(config: BinderConfig) -> Self {
        let value = |keywords: &[String]| KeywordValue {
            keywords: keywords.to_vec(),
            max_chars: config.max_value_chars,
            delimiters: config.delimiters.clone(),
        };

        Self {
            date_types: RankedRules::from_date_type_rules(&config.date_type_rules),
            hospital: RankedRules::new()
                .with(HospitalName)
                .with(value(&config.hospital_keywords)),
            diagnosis: RankedRules::new().with(value(&config.diagnosis_keywords)),
            treatment: RankedRules::new().with(value(&config.treatment_keywords)),
            config,
        }
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    /// Put a custom date-type rule ahead of the keyword table
    pub fn with_date_type_rule(mut self, rule: impl ContextRule<DateType> + 'static) -> Self {
        self.date_types = self.date_types.with_first(rule);
        self
    }

    /// Put a custom hospital rule ahead of the built-in ones
    pub fn with_hospital_rule(mut self, rule: impl ContextRule<String> + 'static) -> Self {
        self.hospital = self.hospital.with_first(rule);
        self
    }

    /// Put a custom diagnosis rule ahead of the keyword table
    pub fn with_diagnosis_rule(mut self, rule: impl ContextRule<String> + 'static) -> Self {
        self.diagnosis = self.diagnosis.with_first(rule);
        self
    }

    /// Concatenated window of segments around `index`
    pub fn context_window(&self, segments: &[Segment], index: usize) -> String {
        if segments.is_empty() {
            return String::new();
        }
        let index = index.min(segments.len() - 1);
        let start = index.saturating_sub(self.config.window);
        let end = (index + self.config.window).min(segments.len() - 1);
        segments[start..=end]
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Date type from the first matching rule, `Unknown` if none
    pub fn classify(&self, context: &str) -> DateType {
        self.date_types.first_match(context).unwrap_or(DateType::Unknown)
    }

    /// Date type from the narrowest text that yields one, widening from the
    /// cue before the date to its segment and then the window
    fn classify_near(&self, cue: &str, segment: &str, context: &str) -> DateType {
        [cue, segment, context]
            .into_iter()
            .find_map(|text| self.date_types.first_match(text))
            .unwrap_or(DateType::Unknown)
    }

    /// Bind one candidate located in `segments[index]`
    ///
    /// A candidate that already carries a date type keeps it.
    pub fn bind_candidate(
        &self,
        segments: &[Segment],
        index: usize,
        candidate: DateCandidate,
    ) -> BoundRecord {
        self.bind_at(segments, index, 0, candidate)
    }

    /// Bind a candidate whose cue starts at byte `cue_start` of its segment
    fn bind_at(
        &self,
        segments: &[Segment],
        index: usize,
        cue_start: usize,
        candidate: DateCandidate,
    ) -> BoundRecord {
        let context = self.context_window(segments, index);
        let segment = segments.get(index).map_or("", |s| s.text.as_str());
        let cue = match candidate.source {
            SourceLocation::Segment { offset, .. } => segment.get(cue_start..offset).unwrap_or(""),
            _ => "",
        };

        let date_type = match candidate.date_type {
            DateType::Unknown => self.classify_near(cue, segment, &context),
            known => known,
        };
        let hospital = self.hospital.first_match(&context);
        let diagnosis = self.diagnosis.first_match(&context);
        let treatment = self.treatment.first_match(&context);

        let weights = &self.config.confidence;
        let mut confidence = weights.base;
        if date_type != DateType::Unknown {
            confidence += weights.typed;
        }
        if diagnosis.is_some() {
            confidence += weights.diagnosis;
        }
        if hospital.is_some() {
            confidence += weights.hospital;
        }
        if let Some(upstream) = segments.get(index).and_then(|s| s.confidence) {
            confidence = (confidence + upstream) / 2.0;
        }

        BoundRecord {
            candidate: DateCandidate {
                date_type,
                ..candidate
            },
            hospital: hospital.unwrap_or_else(|| self.config.unidentified_hospital.clone()),
            diagnosis: diagnosis.unwrap_or_else(|| self.config.unidentified.clone()),
            treatment: treatment.unwrap_or_else(|| self.config.unidentified.clone()),
            context_text: context.chars().take(self.config.context_excerpt_chars).collect(),
            confidence: confidence.clamp(0.0, 1.0),
            occurrences: 1,
        }
    }

    /// Scan every segment for dates and bind them
    ///
    /// Records sharing a normalized date keep only the first in document
    /// order, carrying the count of all occurrences; the result is sorted
    /// by date, newest first.
    pub fn bind(&self, extractor: &Extractor, segments: &[Segment]) -> Vec<BoundRecord> {
        let mut occurrences: HashMap<NaiveDate, usize> = HashMap::new();
        let mut records = Vec::new();

        for (index, segment) in segments.iter().enumerate() {
            let candidates = extractor.scan_all_dates_with(&segment.text, |offset| {
                SourceLocation::Segment { index, offset }
            });
            let mut cue_start = 0;
            for candidate in candidates {
                let end = match candidate.source {
                    SourceLocation::Segment { offset, .. } => offset + candidate.raw_text.len(),
                    _ => cue_start,
                };
                let count = occurrences.entry(candidate.normalized_date).or_default();
                *count += 1;
                if *count == 1 {
                    records.push(self.bind_at(segments, index, cue_start, candidate));
                }
                cue_start = end;
            }
        }

        for record in &mut records {
            if let Some(count) = occurrences.get(&record.candidate.normalized_date) {
                record.occurrences = *count;
            }
        }
        records.sort_by(|a, b| b.candidate.normalized_date.cmp(&a.candidate.normalized_date));
        tracing::debug!(segments = segments.len(), records = records.len(), "dates bound");
        records
    }

    /// Bind the free text (or OCR blocks) of a document
    pub fn bind_document(&self, extractor: &Extractor, doc: &ExtractionDocument) -> Vec<BoundRecord> {
        self.bind(extractor, &segments_of(doc))
    }
}
