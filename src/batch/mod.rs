//! Batch evaluation over many cases
//!
//! Cases are independent. [`BatchRunner::run`] evaluates them in order on
//! the calling thread; [`BatchRunner::run_parallel`] fans them out over
//! tokio blocking tasks and joins all of them before aggregating. Either
//! way a case with missing inputs becomes a [`CaseFailure`] and the batch
//! carries on.

mod report;

pub use report::{
    aggregate, relative_tiers, representative_sample, BatchReport, CaseFailure, CaseTypeStats,
    RelativeTiers, ScoreStatistics, Tier,
};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::cache::ResultCache;
use crate::config::BatchConfig;
use crate::conformity::{CaseScore, ConformityEngine};
use crate::error::{Error, Result};
use crate::models::{ExtractionDocument, ReferenceDocument};

/// One case of a batch: a machine extraction and its ground truth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCase {
    pub case_id: String,
    #[serde(default)]
    pub case_type: Option<String>,
    #[serde(default)]
    pub extraction: Option<ExtractionDocument>,
    #[serde(default)]
    pub reference: Option<ReferenceDocument>,
}

impl BatchCase {
    pub fn new(
        case_id: impl Into<String>,
        extraction: ExtractionDocument,
        reference: ReferenceDocument,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            case_type: None,
            extraction: Some(extraction),
            reference: Some(reference),
        }
    }

    pub fn with_case_type(mut self, case_type: impl Into<String>) -> Self {
        self.case_type = Some(case_type.into());
        self
    }
}

/// Evaluates cases with a shared engine and aggregates the results
#[derive(Debug, Clone)]
pub struct BatchRunner {
    engine: Arc<ConformityEngine>,
    config: BatchConfig,
    cache: Option<Arc<ResultCache>>,
}

impl BatchRunner {
    pub fn new(engine: Arc<ConformityEngine>, config: BatchConfig) -> Self {
        Self {
            engine,
            config,
            cache: None,
        }
    }

    /// Reuse results of identical cases
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn engine(&self) -> &ConformityEngine {
        &self.engine
    }

    /// Score one case
    pub fn evaluate_case(&self, case: &BatchCase) -> Result<CaseScore> {
        let doc = case.extraction.as_ref().ok_or_else(|| Error::MissingExtraction {
            case_id: case.case_id.clone(),
        })?;
        let reference = case.reference.as_ref().ok_or_else(|| Error::MissingReference {
            case_id: case.case_id.clone(),
        })?;

        let result = match &self.cache {
            Some(cache) => cache.get_or_evaluate(&self.engine, doc, reference)?,
            None => self.engine.evaluate(doc, reference),
        };
        Ok(CaseScore::from_result(
            case.case_id.clone(),
            case.case_type.clone(),
            &result,
            self.config.listed_dates,
        ))
    }

    /// Evaluate every case sequentially
    pub fn run(&self, cases: &[BatchCase]) -> BatchReport {
        let outcomes = cases
            .iter()
            .map(|case| (case.case_id.clone(), self.evaluate_case(case)));
        self.collect(outcomes)
    }

    /// Evaluate every case on blocking worker tasks
    ///
    /// Results are put back in input order before aggregation. A worker
    /// that panics fails the whole run.
    pub async fn run_parallel(&self, cases: Vec<BatchCase>) -> Result<BatchReport> {
        let total = cases.len();
        let mut tasks = JoinSet::new();
        for (index, case) in cases.into_iter().enumerate() {
            let runner = self.clone();
            tasks.spawn_blocking(move || {
                let outcome = runner.evaluate_case(&case);
                (index, case.case_id, outcome)
            });
        }

        let mut slots: Vec<Option<(String, Result<CaseScore>)>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);
        while let Some(joined) = tasks.join_next().await {
            let (index, case_id, outcome) = joined?;
            slots[index] = Some((case_id, outcome));
        }

        Ok(self.collect(slots.into_iter().flatten()))
    }

    fn collect(&self, outcomes: impl Iterator<Item = (String, Result<CaseScore>)>) -> BatchReport {
        let mut scores = Vec::new();
        let mut failures = Vec::new();
        for (case_id, outcome) in outcomes {
            match outcome {
                Ok(score) => scores.push(score),
                Err(e) => {
                    tracing::warn!(case_id = %case_id, error = %e, "case skipped");
                    failures.push(CaseFailure {
                        case_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        let report = aggregate(scores, failures, &self.config);
        tracing::info!(
            total = report.total_cases,
            evaluated = report.evaluated(),
            failed = report.failures.len(),
            mean = report.statistics.map(|s| s.mean),
            "batch complete"
        );
        report
    }
}
