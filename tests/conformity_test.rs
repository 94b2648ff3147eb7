//! End-to-end conformity scenarios

mod common;

use std::sync::Arc;

use common::{date, outpatient_reference, outpatient_text, structured_document};
use vnexsus::config::EngineConfig;
use vnexsus::matcher::{DateMatchMode, MatchKind};
use vnexsus::models::{BoundingBox, OcrBlock};
use vnexsus::normalize::CodeIndex;
use vnexsus::{ConformityEngine, ExtractionDocument, Grade, ReferenceDocument};

#[test]
fn test_outpatient_record_conforms() {
    let engine = ConformityEngine::default();
    let doc = ExtractionDocument::from_text(outpatient_text());
    let result = engine.evaluate(&doc, &outpatient_reference());

    assert_eq!(result.date_match.match_rate, 1.0);
    assert_eq!(result.date_match.precision, 1.0);
    assert_eq!(result.code_match.match_rate, 1.0);
    assert_eq!(result.hospital_match.match_rate, 1.0);
    assert_eq!(result.grade, Grade::High);
    assert!(result.reference_available);
    assert!(result.label_score > 0.5);
}

#[test]
fn test_half_the_reference_dates() {
    let engine = ConformityEngine::default();
    let doc = ExtractionDocument::from_text("2024.01.15 내원");
    let reference = ReferenceDocument::new("2024-01-15 외래\n2024-03-01 재진");
    let result = engine.evaluate(&doc, &reference);

    assert_eq!(result.date_match.match_rate, 0.5);
    assert_eq!(result.date_match.missing, vec![date("2024-03-01")]);
    assert!(result.date_match.extra.is_empty());
}

#[test]
fn test_category_level_code_match() {
    let engine = ConformityEngine::default();
    let doc = ExtractionDocument::from_text("진단 E11.9");
    let reference = ReferenceDocument::new("상병 E11.78");
    let result = engine.evaluate(&doc, &reference);

    assert!((result.code_match.match_rate - 0.7).abs() < 1e-9);
    assert_eq!(result.code_match.matched[0].kind, MatchKind::Category);
}

#[test]
fn test_structured_document() {
    let engine = ConformityEngine::default();
    let reference = ReferenceDocument::new(
        "2023-11-02 한국대학교병원 입원 (K35.8 급성 충수염)\n\
         2023-11-03 복강경 충수절제술\n\
         2023-11-06 퇴원",
    );
    let result = engine.evaluate(&structured_document(), &reference);

    assert_eq!(result.date_match.candidate_count, 3);
    assert_eq!(result.date_match.match_rate, 1.0);
    assert_eq!(result.code_match.match_rate, 1.0);
    assert_eq!(result.hospital_match.match_rate, 1.0);
    assert!(result.jaccard > 0.0);
}

#[test]
fn test_ocr_blocks_merged_in_reading_order() {
    let block = |text: &str, page: u32, y: f64| OcrBlock {
        text: text.to_string(),
        bbox: Some(BoundingBox {
            page,
            y,
            ..Default::default()
        }),
        confidence: Some(0.9),
    };
    let doc = ExtractionDocument {
        blocks: Some(vec![
            block("2024.02.20 재진", 2, 10.0),
            block("외래 진료", 1, 40.0),
            block("2024.02.01", 1, 20.0),
        ]),
        ..Default::default()
    };

    let merged = doc.full_text().unwrap();
    assert!(merged.starts_with("2024.02.01 외래 진료"));
    assert!(merged.ends_with("2024.02.20 재진"));

    let engine = ConformityEngine::default();
    let result = engine.evaluate(&doc, &ReferenceDocument::new("2024-02-01\n2024-02-20"));
    assert_eq!(result.date_match.match_rate, 1.0);
}

#[test]
fn test_tolerance_mode() {
    let mut config = EngineConfig::default();
    config.matcher.date_mode = DateMatchMode::Tolerance { days: 3 };
    let engine = ConformityEngine::new(config).unwrap();

    let doc = ExtractionDocument::from_text("2024.01.17 내원");
    let result = engine.evaluate(&doc, &ReferenceDocument::new("2024-01-15 외래"));
    assert_eq!(result.date_match.match_rate, 1.0);
    assert_eq!(result.date_match.matched[0].kind, MatchKind::WithinTolerance);
    assert_eq!(result.date_match.matched[0].distance, 2);

    let exact = ConformityEngine::default().evaluate(&doc, &ReferenceDocument::new("2024-01-15 외래"));
    assert_eq!(exact.date_match.match_rate, 0.0);
}

#[test]
fn test_deprecated_codes_remapped() {
    let index = CodeIndex::from_json(
        r#"[
            {"code": "K35.9", "korName": "상세불명의 급성 충수염", "deprecated": true, "replacedBy": "K35.8"},
            {"code": "K35.8", "korName": "기타 및 상세불명의 급성 충수염"}
        ]"#,
    )
    .unwrap();
    let engine = ConformityEngine::default().with_code_index(Arc::new(index));

    let doc = ExtractionDocument::from_text("진단 K35.9");
    let result = engine.evaluate(&doc, &ReferenceDocument::new("상병 K35.8"));
    assert_eq!(result.code_match.match_rate, 1.0);
    assert_eq!(result.code_match.matched[0].kind, MatchKind::Exact);
}

#[test]
fn test_missing_extraction_scores_low() {
    let engine = ConformityEngine::default();
    let result = engine.evaluate(&ExtractionDocument::default(), &outpatient_reference());

    assert_eq!(result.date_match.match_rate, 0.0);
    assert_eq!(result.date_match.precision, 0.0);
    assert_eq!(result.combined_score, 0.0);
    assert_eq!(result.grade, Grade::Low);
}

#[test]
fn test_result_serializes_camel_case() {
    let engine = ConformityEngine::default();
    let doc = ExtractionDocument::from_text(outpatient_text());
    let result = engine.evaluate(&doc, &outpatient_reference());
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["grade"], "상");
    assert_eq!(json["dateMatch"]["matchRate"], 1.0);
    assert_eq!(json["dateMatch"]["matched"][0]["candidate"], "2024-01-15");
    assert_eq!(json["referenceAvailable"], true);
}
