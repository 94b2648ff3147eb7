//! Common test utilities

use chrono::NaiveDate;
use vnexsus::batch::BatchCase;
use vnexsus::models::{
    DatedEntry, DiagnosisEntry, ExtractionDocument, HospitalizationEntry, ReferenceDocument,
    StructuredFields,
};

/// Parse an ISO date
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// OCR-style outpatient record
pub fn outpatient_text() -> &'static str {
    "진료비 영수증\n\
     2024.01.15 서울내과의원 외래 진료\n\
     진단명: 제2형 당뇨병 E11.9\n\
     처방: 메트포르민 500mg\n\
     2024.03.04 서울내과의원 재진\n\
     검사: 당화혈색소 측정"
}

/// Ground-truth summary matching [`outpatient_text`]
pub fn outpatient_reference() -> ReferenceDocument {
    ReferenceDocument::new(
        "2024-01-15 서울내과의원 외래, 상병 E11.9 제2형 당뇨병\n\
         2024-03-04 서울내과의원 재진, 당화혈색소 검사",
    )
}

/// Pre-structured extraction of a hospitalization
#[allow(dead_code)]
pub fn structured_document() -> ExtractionDocument {
    ExtractionDocument::from_fields(StructuredFields {
        diagnoses: Some(vec![DiagnosisEntry {
            date: Some("2023-11-02".into()),
            code: Some("K35.8".into()),
            name_local: Some("급성 충수염".into()),
            hospital: Some("한국대학교병원".into()),
        }]),
        surgeries: Some(vec![DatedEntry {
            date: Some("2023.11.03".into()),
            name: Some("복강경 충수절제술".into()),
            hospital: Some("한국대학교병원".into()),
        }]),
        hospitalizations: Some(vec![HospitalizationEntry {
            admission_date: Some("2023-11-02".into()),
            discharge_date: Some("2023-11-06".into()),
            hospital: Some("한국대학교병원".into()),
        }]),
        ..Default::default()
    })
}

/// A batch case over free text
#[allow(dead_code)]
pub fn text_case(id: &str, text: &str, reference: &str) -> BatchCase {
    BatchCase::new(
        id,
        ExtractionDocument::from_text(text),
        ReferenceDocument::new(reference),
    )
}

/// Nine cases whose date coverage is 10%, 20%, ..., 90%
///
/// Case `n` has ten reference dates of which the candidate reproduces `n`.
#[allow(dead_code)]
pub fn graded_cases() -> Vec<BatchCase> {
    let reference: String = (1..=10)
        .map(|day| format!("2024-05-{day:02} 외래\n"))
        .collect();
    (1..=9)
        .map(|n| {
            let text: String = (1..=n).map(|day| format!("2024.05.{day:02} 내원\n")).collect();
            text_case(&format!("Case{n}"), &text, &reference)
        })
        .collect()
}
