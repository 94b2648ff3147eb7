use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use vnexsus::audit::CaseAudit;
use vnexsus::conformity::ConformityResult;
use vnexsus::ConformityEngine;

use super::{load_document, load_reference, parse_date, print_json};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateOutput {
    result: ConformityResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    audit: Option<CaseAudit>,
}

pub fn evaluate(
    engine: &ConformityEngine,
    extraction: &Path,
    reference: &Path,
    audit: bool,
    today: Option<&str>,
) -> Result<()> {
    let doc = load_document(extraction)?;
    let reference = load_reference(reference)?;
    if doc.is_empty() {
        tracing::warn!("Extraction document is empty");
    }

    let result = engine.evaluate(&doc, &reference);
    if !result.reference_available {
        tracing::warn!("Reference yielded nothing to match; match rates are vacuous");
    }

    let audit = if audit {
        let today = match today {
            Some(raw) => parse_date(raw)?,
            None => chrono::Local::now().date_naive(),
        };
        Some(engine.audit(&doc, &reference, &result, today))
    } else {
        None
    };

    tracing::info!(
        score = result.combined_score,
        grade = %result.grade,
        "Evaluation complete"
    );
    print_json(&EvaluateOutput { result, audit })
}
