// Core data structures for the extraction and conformity engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Clinical classification of an extracted date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateType {
    Visit,
    Admission,
    Discharge,
    Surgery,
    Test,
    Prescription,
    Birth,
    Death,
    Insurance,
    #[serde(rename = "insurance_start")]
    InsuranceStart,
    #[serde(rename = "insurance_expiry")]
    InsuranceExpiry,
    Claim,
    Disclosure,
    Period,
    Unknown,
}

impl DateType {
    /// Get all date types
    pub fn all() -> Vec<Self> {
        vec![
            Self::Visit,
            Self::Admission,
            Self::Discharge,
            Self::Surgery,
            Self::Test,
            Self::Prescription,
            Self::Birth,
            Self::Death,
            Self::Insurance,
            Self::InsuranceStart,
            Self::InsuranceExpiry,
            Self::Claim,
            Self::Disclosure,
            Self::Period,
            Self::Unknown,
        ]
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visit => "visit",
            Self::Admission => "admission",
            Self::Discharge => "discharge",
            Self::Surgery => "surgery",
            Self::Test => "test",
            Self::Prescription => "prescription",
            Self::Birth => "birth",
            Self::Death => "death",
            Self::Insurance => "insurance",
            Self::InsuranceStart => "insurance_start",
            Self::InsuranceExpiry => "insurance_expiry",
            Self::Claim => "claim",
            Self::Disclosure => "disclosure",
            Self::Period => "period",
            Self::Unknown => "unknown",
        }
    }

    /// Parse from string (English or Korean label)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "visit" | "내원" | "진료" => Some(Self::Visit),
            "admission" | "입원" => Some(Self::Admission),
            "discharge" | "퇴원" => Some(Self::Discharge),
            "surgery" | "수술" => Some(Self::Surgery),
            "test" | "검사" => Some(Self::Test),
            "prescription" | "처방" => Some(Self::Prescription),
            "birth" | "출생" => Some(Self::Birth),
            "death" | "사망" => Some(Self::Death),
            "insurance" | "보험" => Some(Self::Insurance),
            "insurance_start" | "보험가입일" | "가입" => Some(Self::InsuranceStart),
            "insurance_expiry" | "보험만기일" | "만기" => Some(Self::InsuranceExpiry),
            "claim" | "청구" => Some(Self::Claim),
            "disclosure" | "고지" => Some(Self::Disclosure),
            "period" | "기간" => Some(Self::Period),
            "unknown" | "미확인" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Get Korean name
    pub fn korean_name(&self) -> &'static str {
        match self {
            Self::Visit => "내원",
            Self::Admission => "입원",
            Self::Discharge => "퇴원",
            Self::Surgery => "수술",
            Self::Test => "검사",
            Self::Prescription => "처방",
            Self::Birth => "출생",
            Self::Death => "사망",
            Self::Insurance => "보험",
            Self::InsuranceStart => "보험가입일",
            Self::InsuranceExpiry => "보험만기일",
            Self::Claim => "청구",
            Self::Disclosure => "고지",
            Self::Period => "기간",
            Self::Unknown => "미확인",
        }
    }
}

impl fmt::Display for DateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Date format that produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePattern {
    /// 2024년 1월 15일
    Korean,
    /// 2024-01-15
    IsoDash,
    /// 2024.01.15
    Dotted,
    /// 2024/01/15
    Slashed,
    /// 15.01.2024, 15/01/2024, 15-01-2024
    DayMonthYear,
    /// 24.01.15, 24-01-15, 24/01/15
    ShortYear,
    /// 24년 1월 15일
    ShortYearKorean,
}

/// Where a candidate came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceLocation {
    /// Byte offset into a scanned text
    Offset { offset: usize },
    /// Byte offset inside one text segment
    Segment { index: usize, offset: usize },
    /// Subfield of a structured extraction entry
    Field {
        field: String,
        index: usize,
        subfield: String,
    },
}

impl SourceLocation {
    /// Sort key in document order (structured fields sort first)
    pub fn order_key(&self) -> (usize, usize) {
        match self {
            Self::Field { index, .. } => (0, *index),
            Self::Offset { offset } => (1, *offset),
            Self::Segment { index, offset } => (2 + index, *offset),
        }
    }
}

/// A located, normalized date found in a text or structured field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateCandidate {
    pub raw_text: String,
    pub normalized_date: NaiveDate,
    pub pattern: DatePattern,
    pub source: SourceLocation,
    pub date_type: DateType,
}

impl DateCandidate {
    /// Canonical ISO form (YYYY-MM-DD)
    pub fn iso(&self) -> String {
        self.normalized_date.format("%Y-%m-%d").to_string()
    }
}

/// A located diagnostic code (KCD/ICD style, e.g. `E11.9`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeCandidate {
    pub raw_text: String,
    pub code: String,
    pub source: SourceLocation,
}

/// A located hospital name with its comparison key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalCandidate {
    pub name: String,
    pub normalized: String,
    pub source: SourceLocation,
}

/// A date candidate bound to the clinical attributes around it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundRecord {
    #[serde(flatten)]
    pub candidate: DateCandidate,
    pub hospital: String,
    pub diagnosis: String,
    pub treatment: String,
    pub context_text: String,
    pub confidence: f64,
    /// Times the date occurs in the whole document
    #[serde(default = "one")]
    pub occurrences: usize,
}

fn one() -> usize {
    1
}

/// Everything extracted from one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub dates: Vec<DateCandidate>,
    pub codes: Vec<CodeCandidate>,
    pub hospitals: Vec<HospitalCandidate>,
}

// ============================================================================
// Input documents
// ============================================================================

/// Machine-generated extraction of one case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionDocument {
    /// Raw OCR/LLM text
    #[serde(default)]
    pub text: Option<String>,

    /// Categories already parsed upstream
    #[serde(default)]
    pub structured_fields: Option<StructuredFields>,

    /// Raw OCR blocks, merged into text when `text` is absent
    #[serde(default)]
    pub blocks: Option<Vec<OcrBlock>>,
}

impl ExtractionDocument {
    /// Document holding only free text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Document holding only structured fields
    pub fn from_fields(fields: StructuredFields) -> Self {
        Self {
            structured_fields: Some(fields),
            ..Default::default()
        }
    }

    /// Free text of the document: `text` if present, otherwise the merged blocks
    pub fn full_text(&self) -> Option<String> {
        match (&self.text, &self.blocks) {
            (Some(text), _) => Some(text.clone()),
            (None, Some(blocks)) if !blocks.is_empty() => {
                Some(crate::extract::merge_ocr_blocks(blocks))
            }
            _ => None,
        }
    }

    /// Whether the document carries anything at all
    pub fn is_empty(&self) -> bool {
        let no_text = self.text.as_deref().map_or(true, |t| t.trim().is_empty());
        let no_blocks = self.blocks.as_ref().map_or(true, Vec::is_empty);
        let no_fields = self
            .structured_fields
            .as_ref()
            .map_or(true, StructuredFields::is_empty);
        no_text && no_blocks && no_fields
    }
}

/// Categories of a pre-structured extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredFields {
    #[serde(default)]
    pub diagnoses: Option<Vec<DiagnosisEntry>>,
    #[serde(default)]
    pub examinations: Option<Vec<DatedEntry>>,
    #[serde(default)]
    pub treatments: Option<Vec<DatedEntry>>,
    #[serde(default)]
    pub hospitalizations: Option<Vec<HospitalizationEntry>>,
    #[serde(default)]
    pub surgeries: Option<Vec<DatedEntry>>,
    #[serde(default)]
    pub prescriptions: Option<Vec<DatedEntry>>,
    #[serde(default)]
    pub insurance: Option<Vec<InsuranceEntry>>,
}

impl StructuredFields {
    /// True when no category holds an entry
    pub fn is_empty(&self) -> bool {
        fn none<T>(v: &Option<Vec<T>>) -> bool {
            v.as_ref().map_or(true, Vec::is_empty)
        }
        none(&self.diagnoses)
            && none(&self.examinations)
            && none(&self.treatments)
            && none(&self.hospitalizations)
            && none(&self.surgeries)
            && none(&self.prescriptions)
            && none(&self.insurance)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisEntry {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name_local: Option<String>,
    #[serde(default)]
    pub hospital: Option<String>,
}

/// Entry of the single-date categories (examinations, treatments, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatedEntry {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hospital: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalizationEntry {
    #[serde(default)]
    pub admission_date: Option<String>,
    #[serde(default)]
    pub discharge_date: Option<String>,
    #[serde(default)]
    pub hospital: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceEntry {
    #[serde(default)]
    pub enrollment_date: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub insurer: Option<String>,
}

/// One OCR text block with its position on the page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrBlock {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

/// Trusted, manually authored ground truth
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDocument {
    pub text: String,
}

impl ReferenceDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Absolute conformity grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "상")]
    High,
    #[serde(rename = "중")]
    Medium,
    #[serde(rename = "하")]
    Low,
}

impl Grade {
    /// Grade a 0-100 score against the fixed 80/60 thresholds
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::High
        } else if score >= 60.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::High, Self::Medium, Self::Low]
    }

    /// Korean label (상/중/하)
    pub fn korean_label(&self) -> &'static str {
        match self {
            Self::High => "상",
            Self::Medium => "중",
            Self::Low => "하",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.korean_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_type_string_roundtrip() {
        for date_type in DateType::all() {
            assert_eq!(DateType::parse(date_type.as_str()), Some(date_type));
        }
    }

    #[test]
    fn test_date_type_korean_parse() {
        assert_eq!(DateType::parse("입원"), Some(DateType::Admission));
        assert_eq!(DateType::parse("퇴원"), Some(DateType::Discharge));
        assert_eq!(DateType::parse("보험만기일"), Some(DateType::InsuranceExpiry));
        assert_eq!(
            DateType::parse(DateType::InsuranceStart.korean_name()),
            Some(DateType::InsuranceStart)
        );
        assert_eq!(DateType::parse("nonsense"), None);
    }

    #[test]
    fn test_grade_thresholds() {
        assert_eq!(Grade::from_score(80.0), Grade::High);
        assert_eq!(Grade::from_score(79.9), Grade::Medium);
        assert_eq!(Grade::from_score(60.0), Grade::Medium);
        assert_eq!(Grade::from_score(59.99), Grade::Low);
    }

    #[test]
    fn test_grade_serializes_korean() {
        let json = serde_json::to_string(&Grade::Medium).unwrap();
        assert_eq!(json, "\"중\"");
        let back: Grade = serde_json::from_str("\"상\"").unwrap();
        assert_eq!(back, Grade::High);
    }

    #[test]
    fn test_extraction_document_camel_case() {
        let json = r#"{
            "structuredFields": {
                "hospitalizations": [
                    {"admissionDate": "2024-01-15", "dischargeDate": "2024-01-20", "hospital": "서울병원"}
                ],
                "diagnoses": [{"date": "2024-01-15", "code": "E11.9", "nameLocal": "당뇨병"}]
            }
        }"#;
        let doc: ExtractionDocument = serde_json::from_str(json).unwrap();
        let fields = doc.structured_fields.as_ref().unwrap();
        let stay = &fields.hospitalizations.as_ref().unwrap()[0];
        assert_eq!(stay.admission_date.as_deref(), Some("2024-01-15"));
        assert_eq!(
            fields.diagnoses.as_ref().unwrap()[0].name_local.as_deref(),
            Some("당뇨병")
        );
        assert!(doc.text.is_none());
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_empty_document() {
        assert!(ExtractionDocument::default().is_empty());
        assert!(ExtractionDocument::from_text("   ").is_empty());
        assert!(ExtractionDocument::from_fields(StructuredFields::default()).is_empty());
    }

    #[test]
    fn test_full_text_prefers_text() {
        let doc = ExtractionDocument {
            text: Some("본문".to_string()),
            blocks: Some(vec![OcrBlock {
                text: "블록".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        };
        assert_eq!(doc.full_text().as_deref(), Some("본문"));
    }
}
