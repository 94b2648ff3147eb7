//! vnexsus - medical event extraction and ground-truth conformity scoring
//!
//! Extracts dates, diagnostic codes and hospital names from OCR/LLM
//! transcriptions of Korean medical records, binds dates to their clinical
//! context, and scores the extraction against a human-written reference.
//!
//! # Architecture
//!
//! - [`normalize`] - date, code and hospital-name canonicalization
//! - [`extract`] - candidate scanning over text, OCR blocks and structured fields
//! - [`binder`] - context window binding of dates to hospital/diagnosis/treatment
//! - [`matcher`] - greedy one-to-one matching against the reference
//! - [`similarity`] - token Jaccard and label recall
//! - [`scoring`] - per-event comprehensive score and relevance tiers
//! - [`temporal`] - anchor-relative warning flags
//! - [`conformity`] - per-case weighted score and grade
//! - [`batch`] - sequential and parallel batch runs with tiered reports
//! - [`audit`] - rejected/future date review and missing-date context
//! - [`cache`] - in-memory result cache
//!
//! # Example
//!
//! ```no_run
//! use vnexsus::prelude::*;
//!
//! fn main() -> vnexsus::error::Result<()> {
//!     let engine = ConformityEngine::new(EngineConfig::from_env()?)?;
//!     let doc = ExtractionDocument::from_text("2024.01.15 서울병원 내원, 진단 E11.9");
//!     let reference = ReferenceDocument::new("2024-01-15 서울병원 외래 E11.9");
//!     let result = engine.evaluate(&doc, &reference);
//!     println!("{:.1} {}", result.combined_score, result.grade);
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod batch;
pub mod binder;
pub mod cache;
pub mod config;
pub mod conformity;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod scoring;
pub mod similarity;
pub mod temporal;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::batch::{BatchCase, BatchReport, BatchRunner};
    pub use crate::config::EngineConfig;
    pub use crate::conformity::{CaseScore, ConformityEngine, ConformityResult};
    pub use crate::error::{DateError, Error, ErrorCategory, Result};
    pub use crate::extract::Extractor;
    pub use crate::matcher::{DateMatchMode, MatchResult, Matcher};
    pub use crate::models::{
        BoundRecord, DateCandidate, DateType, ExtractionDocument, Grade, ReferenceDocument,
        StructuredFields,
    };
    pub use crate::scoring::{ComprehensiveScorer, Relevance, ScoredEvent};
    pub use crate::temporal::{Anchor, TemporalFlagger, WarningLevel};
}

// Direct re-exports for convenience
pub use conformity::ConformityEngine;
pub use models::{ExtractionDocument, Grade, ReferenceDocument};
