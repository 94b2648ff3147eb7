//! Configuration management for the conformity engine
//!
//! Every keyword table, tolerance window, threshold and weight used by the
//! engine lives here with its default, so callers (and tests) can override
//! any of them deterministically. Configuration is loaded from a TOML file,
//! overlaid with `VNEXSUS_*` environment variables, or built in code.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::conformity::{CategoryWeight, ScoreCategory, WeightNormalization};
use crate::error::{Error, Result};
use crate::matcher::DateMatchMode;
use crate::models::DateType;

mod builder;

pub use builder::{BinderConfigBuilder, MatcherConfigBuilder};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub normalizer: NormalizerConfig,
    pub extractor: ExtractorConfig,
    pub binder: BinderConfig,
    pub matcher: MatcherConfig,
    pub similarity: SimilarityConfig,
    pub scoring: ScoringConfig,
    pub temporal: TemporalConfig,
    pub conformity: ConformityConfig,
    pub audit: AuditConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

/// Inclusive range of plausible years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearWindow {
    pub min_year: i32,
    pub max_year: i32,
}

impl YearWindow {
    pub const fn new(min_year: i32, max_year: i32) -> Self {
        Self { min_year, max_year }
    }

    /// Window applied to machine candidates (1900-2100)
    pub const fn candidate() -> Self {
        Self::new(1900, 2100)
    }

    /// Tighter window applied to ground-truth extraction (1990-2060)
    pub const fn ground_truth() -> Self {
        Self::new(1990, 2060)
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.min_year..=self.max_year).contains(&year)
    }
}

impl Default for YearWindow {
    fn default() -> Self {
        Self::candidate()
    }
}

/// Date, code and hospital-name normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Plausible years for machine-generated candidates
    pub candidate_window: YearWindow,

    /// Plausible years for dates read from the reference document
    pub reference_window: YearWindow,

    /// Two-digit years at or above the pivot map to 19xx, below it to 20xx
    pub two_digit_pivot: u32,

    /// Institution-type suffixes stripped before hospital comparison
    pub hospital_suffixes: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            candidate_window: YearWindow::candidate(),
            reference_window: YearWindow::ground_truth(),
            two_digit_pivot: 50,
            hospital_suffixes: strings(&["의료원", "병원", "의원", "센터"]),
        }
    }
}

/// Whether diagnostic codes need a textual cue in front of them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeCue {
    /// Any standalone code-shaped token counts
    #[default]
    Optional,
    /// Only codes shortly after a cue keyword (진단, 상병, ...) count
    Required,
}

/// Candidate scanning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub code_cue: CodeCue,

    /// Keywords accepted as a code cue when `code_cue` is `Required`
    pub code_cue_keywords: Vec<String>,

    /// Characters before a code searched for a cue keyword
    pub code_cue_lookback_chars: usize,

    /// Scan day-month-year forms (15.01.2024)
    pub day_month_year: bool,

    /// Scan two-digit-year forms (24.01.15)
    pub short_year: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            code_cue: CodeCue::Optional,
            code_cue_keywords: strings(&["진단", "상병", "병명", "코드", "KCD", "ICD"]),
            code_cue_lookback_chars: 20,
            day_month_year: true,
            short_year: true,
        }
    }
}

/// One ranked date-type rule: the first rule whose keyword occurs wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub label: DateType,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(label: DateType, keywords: &[&str]) -> Self {
        Self {
            label,
            keywords: strings(keywords),
        }
    }
}

/// Confidence contributions of a bound record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub base: f64,
    pub typed: f64,
    pub diagnosis: f64,
    pub hospital: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            base: 0.5,
            typed: 0.15,
            diagnosis: 0.15,
            hospital: 0.10,
        }
    }
}

/// Context window binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    /// Segments on each side of the date's segment
    pub window: usize,

    /// Maximum characters of a bound attribute value
    pub max_value_chars: usize,

    /// Maximum characters of the stored context excerpt
    pub context_excerpt_chars: usize,

    /// Characters that terminate an attribute value (besides line breaks)
    pub delimiters: String,

    pub diagnosis_keywords: Vec<String>,
    pub hospital_keywords: Vec<String>,
    pub treatment_keywords: Vec<String>,

    /// Ordered date-type classification table
    pub date_type_rules: Vec<KeywordRule>,

    pub unidentified_hospital: String,
    pub unidentified: String,

    pub confidence: ConfidenceWeights,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            window: 3,
            max_value_chars: 50,
            context_excerpt_chars: 200,
            delimiters: ",;|".to_string(),
            diagnosis_keywords: strings(&["진단명", "상병명", "진단", "상병", "병명", "소견"]),
            hospital_keywords: strings(&["의료기관", "내원처", "병원", "의원", "의료원", "센터"]),
            treatment_keywords: strings(&["치료", "처치", "수술", "시술", "처방", "투약"]),
            date_type_rules: default_date_type_rules(),
            unidentified_hospital: "미확인 의료기관".to_string(),
            unidentified: "미확인".to_string(),
            confidence: ConfidenceWeights::default(),
        }
    }
}

impl BinderConfig {
    /// Create a new builder for BinderConfig
    pub fn builder() -> BinderConfigBuilder {
        BinderConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_value_chars == 0 {
            return Err(Error::invalid_config("max_value_chars", 0, "Must be at least 1"));
        }
        if self.date_type_rules.iter().any(|r| r.keywords.is_empty()) {
            return Err(Error::invalid_config(
                "date_type_rules",
                "[]",
                "Every rule needs at least one keyword",
            ));
        }
        Ok(())
    }
}

fn default_date_type_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(DateType::Birth, &["생년월일", "출생"]),
        KeywordRule::new(DateType::Death, &["사망"]),
        KeywordRule::new(DateType::Disclosure, &["고지", "알릴의무"]),
        KeywordRule::new(DateType::Claim, &["청구", "접수"]),
        KeywordRule::new(DateType::InsuranceExpiry, &["만기", "보험종료", "계약종료", "보장종료"]),
        KeywordRule::new(DateType::InsuranceStart, &["가입", "보장개시", "책임개시", "계약일"]),
        KeywordRule::new(DateType::Insurance, &["보험", "계약"]),
        KeywordRule::new(DateType::Surgery, &["수술", "시술"]),
        KeywordRule::new(DateType::Admission, &["입원"]),
        KeywordRule::new(DateType::Discharge, &["퇴원"]),
        KeywordRule::new(DateType::Test, &["검사", "촬영", "판독", "CT", "MRI"]),
        KeywordRule::new(DateType::Prescription, &["처방", "투약"]),
        KeywordRule::new(DateType::Visit, &["내원", "외래", "진료", "방문", "초진", "재진"]),
        KeywordRule::new(DateType::Period, &["기간", "~"]),
    ]
}

/// Candidate-vs-reference matching
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub date_mode: DateMatchMode,

    /// Weight of a category-level (pre-decimal) code match
    pub category_weight: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            date_mode: DateMatchMode::Exact,
            category_weight: 0.7,
        }
    }
}

impl MatcherConfig {
    /// Create a new builder for MatcherConfig
    pub fn builder() -> MatcherConfigBuilder {
        MatcherConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.category_weight) {
            return Err(Error::invalid_config(
                "category_weight",
                self.category_weight,
                "Must be between 0.0 and 1.0",
            ));
        }
        Ok(())
    }
}

/// Free-text similarity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub stop_words: Vec<String>,
    pub min_token_chars: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            stop_words: strings(&[
                "the", "and", "for", "with", "from", "that", "this", "are", "was", "및", "등",
                "또는", "그리고", "에서", "으로", "하여", "대한", "관련", "있음", "없음",
            ]),
            min_token_chars: 2,
        }
    }
}

/// Relevance tier lower bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceThresholds {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for RelevanceThresholds {
    fn default() -> Self {
        Self {
            critical: 80.0,
            high: 60.0,
            medium: 40.0,
            low: 20.0,
        }
    }
}

/// Comprehensive event scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Type score used when an event carries none
    pub default_type_score: f64,

    /// Frequency score for events seen three or more times
    pub frequency_high: f64,

    /// Frequency score for events seen exactly twice
    pub frequency_pair: f64,

    /// Applied to events flagged as document-metadata noise
    pub metadata_penalty: f64,

    pub insurance_expiry_penalty: f64,
    pub insurance_start_bonus: f64,

    /// Normalized type labels treated as insurance-expiry dates
    pub insurance_expiry_types: Vec<String>,

    /// Normalized type labels treated as insurance-enrollment dates
    pub insurance_start_types: Vec<String>,

    pub max_score: f64,
    pub thresholds: RelevanceThresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_type_score: 20.0,
            frequency_high: 20.0,
            frequency_pair: 10.0,
            metadata_penalty: -30.0,
            insurance_expiry_penalty: -50.0,
            insurance_start_bonus: 10.0,
            insurance_expiry_types: strings(&["보험만기일", "보험종료일", "만기일"]),
            insurance_start_types: strings(&["보험가입일", "보험개시일", "보장개시일", "계약일"]),
            max_score: 200.0,
            thresholds: RelevanceThresholds::default(),
        }
    }
}

impl ScoringConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        if !(t.critical >= t.high && t.high >= t.medium && t.medium >= t.low) {
            return Err(Error::invalid_config(
                "thresholds",
                format!("{}/{}/{}/{}", t.critical, t.high, t.medium, t.low),
                "Must be in descending order",
            ));
        }
        if self.metadata_penalty > 0.0 {
            return Err(Error::invalid_config(
                "metadata_penalty",
                self.metadata_penalty,
                "Must not be positive",
            ));
        }
        if self.max_score <= 0.0 {
            return Err(Error::invalid_config("max_score", self.max_score, "Must be positive"));
        }
        Ok(())
    }
}

/// Anchor-relative temporal flagging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Calendar months defining the "near" windows on each side of the anchor
    pub near_months: u32,

    /// Calendar years defining the long look-back window
    pub lookback_years: u32,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            near_months: 3,
            lookback_years: 5,
        }
    }
}

/// Weighted conformity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConformityConfig {
    pub weights: Vec<CategoryWeight>,
    pub normalization: WeightNormalization,
}

impl Default for ConformityConfig {
    fn default() -> Self {
        Self {
            weights: vec![
                CategoryWeight::measured(ScoreCategory::DateAccuracy, 0.40),
                CategoryWeight::measured(ScoreCategory::DiagnosisAccuracy, 0.15),
                CategoryWeight::unmeasured(ScoreCategory::EventBinding, 0.20),
                CategoryWeight::unmeasured(ScoreCategory::TreatmentAccuracy, 0.15),
                CategoryWeight::unmeasured(ScoreCategory::HospitalInfo, 0.10),
            ],
            normalization: WeightNormalization::MeasuredOnly,
        }
    }
}

/// Batch aggregation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Share of cases in the top relative tier
    pub top_fraction: f64,

    /// Share of cases in the bottom relative tier
    pub bottom_fraction: f64,

    /// Entries kept in per-case missing/extra samples
    pub listed_dates: usize,

    /// Results a batch result cache holds before evicting the oldest
    pub cache_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            top_fraction: 0.33,
            bottom_fraction: 0.33,
            listed_dates: 10,
            cache_capacity: 10_000,
        }
    }
}

/// Date audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Days after `today` before a valid date counts as future
    pub future_grace_days: u64,

    /// Maximum characters of a reported reference line
    pub max_line_chars: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            future_grace_days: 30,
            max_line_chars: 150,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with `VNEXSUS_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay `VNEXSUS_*` environment variables onto this configuration
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(days) = env_parse::<u32>("VNEXSUS_DATE_TOLERANCE_DAYS")? {
            self.matcher.date_mode = DateMatchMode::Tolerance { days };
        }
        if let Some(window) = env_parse::<usize>("VNEXSUS_CONTEXT_WINDOW")? {
            self.binder.window = window;
        }
        if let Some(min_year) = env_parse::<i32>("VNEXSUS_MIN_YEAR")? {
            self.normalizer.candidate_window.min_year = min_year;
        }
        if let Some(max_year) = env_parse::<i32>("VNEXSUS_MAX_YEAR")? {
            self.normalizer.candidate_window.max_year = max_year;
        }
        if let Ok(level) = std::env::var("VNEXSUS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("VNEXSUS_LOG_FORMAT") {
            self.logging.format = format;
        }
        self.validate()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        for (field, window) in [
            ("candidate_window", self.normalizer.candidate_window),
            ("reference_window", self.normalizer.reference_window),
        ] {
            if window.min_year > window.max_year {
                return Err(Error::invalid_config(
                    field,
                    format!("{}-{}", window.min_year, window.max_year),
                    "min_year must not exceed max_year",
                ));
            }
        }
        if self.normalizer.two_digit_pivot > 99 {
            return Err(Error::invalid_config(
                "two_digit_pivot",
                self.normalizer.two_digit_pivot,
                "Must be between 0 and 99",
            ));
        }

        self.binder.validate()?;
        self.matcher.validate()?;
        self.scoring.validate()?;

        if self.conformity.weights.iter().any(|w| w.weight <= 0.0) {
            return Err(Error::invalid_config(
                "conformity.weights",
                "<= 0",
                "Weights must be positive",
            ));
        }
        if !self.conformity.weights.iter().any(|w| w.measured) {
            return Err(Error::invalid_config(
                "conformity.weights",
                "none measured",
                "At least one category must be measured",
            ));
        }

        let tiers = self.batch.top_fraction + self.batch.bottom_fraction;
        if self.batch.top_fraction < 0.0 || self.batch.bottom_fraction < 0.0 || tiers > 1.0 {
            return Err(Error::invalid_config(
                "batch fractions",
                tiers,
                "Fractions must be non-negative and sum to at most 1.0",
            ));
        }

        if self.batch.cache_capacity == 0 {
            return Err(Error::invalid_config("batch.cache_capacity", 0, "Must be at least 1"));
        }
        if self.audit.max_line_chars == 0 {
            return Err(Error::invalid_config("audit.max_line_chars", 0, "Must be at least 1"));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(Error::invalid_config(
                "logging.format",
                &self.logging.format,
                "Must be 'text' or 'json'",
            ));
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::invalid_config(key, raw, "Unparseable value")),
        Err(_) => Ok(None),
    }
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
