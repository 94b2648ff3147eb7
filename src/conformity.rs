//! Ground-truth conformity evaluation of one case
//!
//! [`ConformityEngine::evaluate`] extracts candidates from the machine
//! document and the reference text, matches dates, codes and hospitals,
//! computes token similarity, and folds the measured categories into one
//! weighted 0-100 score with an absolute grade.
//!
//! The weight table may list categories that are not measured. How their
//! weight is treated is explicit ([`WeightNormalization`]):
//!
//! - `MeasuredOnly` divides by the weight of the measured categories, so
//!   with the default table the score is `(0.40·date + 0.15·diagnosis) / 0.55`
//! - `FullWeight` divides by the whole table; unmeasured categories then
//!   contribute zero

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::audit::{CaseAudit, DateAuditor};
use crate::binder::ContextBinder;
use crate::config::{AuditConfig, ConformityConfig, EngineConfig};
use crate::error::Result;
use crate::extract::Extractor;
use crate::matcher::{MatchResult, Matcher, NameEquivalence};
use crate::models::{BoundRecord, ExtractionDocument, Grade, ReferenceDocument, StructuredFields};
use crate::normalize::{to_iso, CodeIndex, HospitalNormalizer};
use crate::scoring::{ComprehensiveScorer, EventScore, ScoredEvent};
use crate::similarity::SimilarityScorer;
use crate::temporal::{Anchor, FlaggedEvent, TemporalFlagger, TimelineEvent};

/// Categories of the conformity weight table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    DateAccuracy,
    DiagnosisAccuracy,
    EventBinding,
    TreatmentAccuracy,
    HospitalInfo,
}

impl ScoreCategory {
    pub fn all() -> [Self; 5] {
        [
            Self::DateAccuracy,
            Self::DiagnosisAccuracy,
            Self::EventBinding,
            Self::TreatmentAccuracy,
            Self::HospitalInfo,
        ]
    }

    pub fn korean_name(&self) -> &'static str {
        match self {
            Self::DateAccuracy => "날짜 정확도",
            Self::DiagnosisAccuracy => "진단 정확도",
            Self::EventBinding => "이벤트 연결",
            Self::TreatmentAccuracy => "치료 정확도",
            Self::HospitalInfo => "병원 정보",
        }
    }
}

/// One row of the weight table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeight {
    pub category: ScoreCategory,
    pub weight: f64,
    /// Whether the category takes part in the score
    pub measured: bool,
}

impl CategoryWeight {
    pub fn measured(category: ScoreCategory, weight: f64) -> Self {
        Self {
            category,
            weight,
            measured: true,
        }
    }

    pub fn unmeasured(category: ScoreCategory, weight: f64) -> Self {
        Self {
            category,
            weight,
            measured: false,
        }
    }
}

/// Denominator of the weighted score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightNormalization {
    /// Divide by the weight of measured categories
    #[default]
    MeasuredOnly,
    /// Divide by the whole table
    FullWeight,
}

/// Score of one category, `None` when it was not measured
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub category: ScoreCategory,
    pub weight: f64,
    pub score: Option<f64>,
}

/// Weighted combination of category scores
pub fn combine(scores: &[CategoryScore], normalization: WeightNormalization) -> f64 {
    let weighted: f64 = scores
        .iter()
        .filter_map(|s| s.score.map(|v| v * s.weight))
        .sum();
    let total: f64 = match normalization {
        WeightNormalization::MeasuredOnly => scores
            .iter()
            .filter(|s| s.score.is_some())
            .map(|s| s.weight)
            .sum(),
        WeightNormalization::FullWeight => scores.iter().map(|s| s.weight).sum(),
    };
    if total > 0.0 {
        (weighted / total).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Everything the engine determined about one case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConformityResult {
    pub date_match: MatchResult<NaiveDate>,
    pub code_match: MatchResult<String>,
    pub hospital_match: MatchResult<String>,
    pub jaccard: f64,
    pub label_score: f64,
    pub combined_score: f64,
    pub grade: Grade,
    pub category_scores: Vec<CategoryScore>,
    /// False when the reference yielded no dates, codes or hospitals; the
    /// match rates are then vacuous
    pub reference_available: bool,
}

/// Per-case summary used by the batch aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseScore {
    pub case_id: String,
    #[serde(default)]
    pub case_type: Option<String>,
    pub conformity_score: f64,
    pub grade: Grade,
    pub date_match_rate: f64,
    pub date_precision: f64,
    pub code_match_rate: f64,
    pub hospital_match_rate: f64,
    pub jaccard: f64,
    pub label_score: f64,
    pub reference_dates: usize,
    pub candidate_dates: usize,
    pub reference_available: bool,
    /// First missing reference dates, sorted
    pub missing_dates: Vec<String>,
    /// First extra candidate dates, sorted
    pub extra_dates: Vec<String>,
}

impl CaseScore {
    pub fn from_result(
        case_id: impl Into<String>,
        case_type: Option<String>,
        result: &ConformityResult,
        listed: usize,
    ) -> Self {
        let iso = |dates: Vec<NaiveDate>| dates.into_iter().map(to_iso).collect();
        Self {
            case_id: case_id.into(),
            case_type,
            conformity_score: result.combined_score,
            grade: result.grade,
            date_match_rate: result.date_match.match_rate,
            date_precision: result.date_match.precision,
            code_match_rate: result.code_match.match_rate,
            hospital_match_rate: result.hospital_match.match_rate,
            jaccard: result.jaccard,
            label_score: result.label_score,
            reference_dates: result.date_match.reference_count,
            candidate_dates: result.date_match.candidate_count,
            reference_available: result.reference_available,
            missing_dates: iso(result.date_match.missing_sample(listed)),
            extra_dates: iso(result.date_match.extra_sample(listed)),
        }
    }
}

/// Facade over extraction, binding, matching and scoring
#[derive(Debug)]
pub struct ConformityEngine {
    candidates: Extractor,
    references: Extractor,
    binder: ContextBinder,
    matcher: Matcher,
    similarity: SimilarityScorer,
    scorer: ComprehensiveScorer,
    flagger: TemporalFlagger,
    conformity: ConformityConfig,
    audit: AuditConfig,
}

impl Default for ConformityEngine {
    fn default() -> Self {
        Self::build(EngineConfig::default())
    }
}

impl ConformityEngine {
    /// Engine over a validated configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        Self {
            candidates: Extractor::for_candidates(&config),
            references: Extractor::for_reference(&config),
            binder: ContextBinder::new(config.binder.clone()),
            matcher: Matcher::new(
                config.matcher,
                HospitalNormalizer::from_config(&config.normalizer),
            ),
            similarity: SimilarityScorer::new(&config.similarity),
            scorer: ComprehensiveScorer::new(config.scoring.clone()),
            flagger: TemporalFlagger::new(config.temporal),
            audit: config.audit,
            conformity: config.conformity,
        }
    }

    /// Remap deprecated codes before code matching
    pub fn with_code_index(mut self, index: Arc<CodeIndex>) -> Self {
        self.matcher = self.matcher.with_code_index(index);
        self
    }

    /// Replace exact hospital-name matching
    pub fn with_name_equivalence(mut self, names: impl NameEquivalence + 'static) -> Self {
        self.matcher = self.matcher.with_name_equivalence(names);
        self
    }

    pub fn extractor(&self) -> &Extractor {
        &self.candidates
    }

    pub fn reference_extractor(&self) -> &Extractor {
        &self.references
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Compare a machine extraction with its ground truth
    pub fn evaluate(&self, doc: &ExtractionDocument, reference: &ReferenceDocument) -> ConformityResult {
        let candidate = self.candidates.extract_document(doc);
        let truth = self.references.extract_text(&reference.text);

        let date_match = self.matcher.dates(
            &candidate.dates.iter().map(|d| d.normalized_date).collect::<Vec<_>>(),
            &truth.dates.iter().map(|d| d.normalized_date).collect::<Vec<_>>(),
        );
        let code_match = self.matcher.codes(
            &candidate.codes.iter().map(|c| c.code.clone()).collect::<Vec<_>>(),
            &truth.codes.iter().map(|c| c.code.clone()).collect::<Vec<_>>(),
        );
        let hospital_match = self.matcher.hospitals(
            &candidate.hospitals.iter().map(|h| h.name.clone()).collect::<Vec<_>>(),
            &truth.hospitals.iter().map(|h| h.name.clone()).collect::<Vec<_>>(),
        );

        let text = candidate_text(doc);
        let jaccard = self.similarity.jaccard(&text, &reference.text);
        let label_score = self.similarity.label_recall(&reference.text, &text);

        let category_scores: Vec<CategoryScore> = self
            .conformity
            .weights
            .iter()
            .map(|w| CategoryScore {
                category: w.category,
                weight: w.weight,
                score: if w.measured {
                    measure(w.category, &date_match, &code_match, &hospital_match)
                } else {
                    None
                },
            })
            .collect();
        let combined_score = combine(&category_scores, self.conformity.normalization);
        let grade = Grade::from_score(combined_score);
        let reference_available =
            date_match.has_reference() || code_match.has_reference() || hospital_match.has_reference();

        tracing::debug!(
            date_rate = date_match.match_rate,
            code_rate = code_match.match_rate,
            jaccard,
            combined_score,
            grade = %grade,
            reference_available,
            "case evaluated"
        );

        ConformityResult {
            date_match,
            code_match,
            hospital_match,
            jaccard,
            label_score,
            combined_score,
            grade,
            category_scores,
            reference_available,
        }
    }

    /// Rejected and future dates on both sides, and where the missed
    /// reference dates appear
    pub fn audit(
        &self,
        doc: &ExtractionDocument,
        reference: &ReferenceDocument,
        result: &ConformityResult,
        today: NaiveDate,
    ) -> CaseAudit {
        let candidates = DateAuditor::new(&self.candidates, &self.audit);
        let references = DateAuditor::new(&self.references, &self.audit);
        CaseAudit {
            candidate_issues: candidates.audit(&candidate_text(doc), today),
            reference_issues: references.audit(&reference.text, today),
            missing_contexts: references
                .missing_contexts(&reference.text, &result.date_match.missing_sample(usize::MAX)),
        }
    }

    /// Bind the dates of a document's text to their clinical context
    pub fn bind(&self, doc: &ExtractionDocument) -> Vec<BoundRecord> {
        self.binder.bind_document(&self.candidates, doc)
    }

    pub fn score_events(&self, events: &[ScoredEvent]) -> Vec<EventScore> {
        self.scorer.score_all(events)
    }

    pub fn flag_timeline(&self, events: &[TimelineEvent], anchors: &[Anchor]) -> Vec<FlaggedEvent> {
        self.flagger.flag_timeline(events, anchors)
    }
}

/// 0-100 score of a category; `None` when the engine has no measurement
/// for it
fn measure(
    category: ScoreCategory,
    dates: &MatchResult<NaiveDate>,
    codes: &MatchResult<String>,
    hospitals: &MatchResult<String>,
) -> Option<f64> {
    match category {
        ScoreCategory::DateAccuracy => Some(dates.coverage_percent()),
        ScoreCategory::DiagnosisAccuracy => Some(codes.coverage_percent()),
        ScoreCategory::HospitalInfo => Some(hospitals.coverage_percent()),
        ScoreCategory::EventBinding | ScoreCategory::TreatmentAccuracy => None,
    }
}

/// Free text of a document for similarity; structured-only documents are
/// flattened field by field
fn candidate_text(doc: &ExtractionDocument) -> String {
    let mut parts: Vec<String> = doc.full_text().into_iter().collect();
    if let Some(fields) = &doc.structured_fields {
        parts.push(structured_text(fields));
    }
    parts.join("\n")
}

fn structured_text(fields: &StructuredFields) -> String {
    let mut lines = Vec::new();
    let mut push = |values: &[&Option<String>]| {
        let line: Vec<&str> = values.iter().filter_map(|v| v.as_deref()).collect();
        if !line.is_empty() {
            lines.push(line.join(" "));
        }
    };

    for e in fields.diagnoses.iter().flatten() {
        push(&[&e.date, &e.code, &e.name_local, &e.hospital]);
    }
    for group in [
        &fields.examinations,
        &fields.treatments,
        &fields.surgeries,
        &fields.prescriptions,
    ] {
        for e in group.iter().flatten() {
            push(&[&e.date, &e.name, &e.hospital]);
        }
    }
    for e in fields.hospitalizations.iter().flatten() {
        push(&[&e.admission_date, &e.discharge_date, &e.hospital]);
    }
    for e in fields.insurance.iter().flatten() {
        push(&[&e.enrollment_date, &e.expiry_date, &e.insurer]);
    }
    lines.join("\n")
}
