//! Property tests for matching, scoring and normalization invariants

use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::HashSet;

use vnexsus::batch::relative_tiers;
use vnexsus::conformity::CaseScore;
use vnexsus::config::BatchConfig;
use vnexsus::matcher::{match_codes, match_dates, DateMatchMode};
use vnexsus::models::Grade;
use vnexsus::normalize::{normalize_code, to_iso, DateNormalizer};
use vnexsus::scoring::{ComprehensiveScorer, ScoredEvent, SpecialClass};
use vnexsus::temporal::{TemporalFlagger, WarningLevel};

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2003, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn arb_wide_date() -> impl Strategy<Value = NaiveDate> {
    (1990i32..2030, 1u32..=12, 1u32..=31)
        .prop_filter_map("calendar date", |(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
}

fn arb_mode() -> impl Strategy<Value = DateMatchMode> {
    prop_oneof![
        Just(DateMatchMode::Exact),
        (0u32..10).prop_map(|days| DateMatchMode::Tolerance { days }),
    ]
}

fn arb_code() -> impl Strategy<Value = String> {
    ("[A-C]", 10u32..13, proptest::option::of(0u32..100)).prop_map(|(letter, cat, sub)| match sub {
        Some(sub) => format!("{letter}{cat}.{sub}"),
        None => format!("{letter}{cat}"),
    })
}

fn case(id: usize, score: f64) -> CaseScore {
    CaseScore {
        case_id: format!("Case{id}"),
        case_type: None,
        conformity_score: score,
        grade: Grade::from_score(score),
        date_match_rate: 0.0,
        date_precision: 0.0,
        code_match_rate: 0.0,
        hospital_match_rate: 0.0,
        jaccard: 0.0,
        label_score: 0.0,
        reference_dates: 0,
        candidate_dates: 0,
        reference_available: true,
        missing_dates: Vec::new(),
        extra_dates: Vec::new(),
    }
}

proptest! {
    #[test]
    fn prop_date_match_partitions_sets(
        candidates in proptest::collection::vec(arb_date(), 0..12),
        references in proptest::collection::vec(arb_date(), 0..12),
        mode in arb_mode(),
    ) {
        let result = match_dates(&candidates, &references, mode);
        let unique_refs: HashSet<_> = references.iter().collect();
        let unique_cands: HashSet<_> = candidates.iter().collect();

        prop_assert_eq!(result.matched.len() + result.missing.len(), unique_refs.len());
        prop_assert_eq!(result.matched.len() + result.extra.len(), unique_cands.len());
        prop_assert!((0.0..=1.0).contains(&result.match_rate));
        prop_assert!((0.0..=1.0).contains(&result.precision));

        let used: HashSet<_> = result.matched.iter().map(|p| p.candidate).collect();
        prop_assert_eq!(used.len(), result.matched.len());
        if references.is_empty() {
            prop_assert_eq!(result.match_rate, 1.0);
        }
    }

    #[test]
    fn prop_exact_is_never_better_than_tolerance(
        candidates in proptest::collection::vec(arb_date(), 0..10),
        references in proptest::collection::vec(arb_date(), 0..10),
        days in 0u32..10,
    ) {
        let exact = match_dates(&candidates, &references, DateMatchMode::Exact);
        let loose = match_dates(&candidates, &references, DateMatchMode::Tolerance { days });
        prop_assert!(exact.match_rate <= loose.match_rate);
    }

    #[test]
    fn prop_code_match_rate_bounded(
        candidates in proptest::collection::vec(arb_code(), 0..8),
        references in proptest::collection::vec(arb_code(), 0..8),
    ) {
        let result = match_codes(&candidates, &references, 0.7, None);
        prop_assert!((0.0..=1.0).contains(&result.match_rate));
        prop_assert!(result.matched.iter().all(|p| p.weight == 1.0 || p.weight == 0.7));
    }

    #[test]
    fn prop_final_score_clamped(
        type_score in -50.0f64..200.0,
        recency in -50.0f64..100.0,
        context in -100.0f64..100.0,
        frequency in 0usize..6,
        metadata in any::<bool>(),
        label in prop_oneof![
            Just("보험만기일"), Just("보험가입일"), Just("외래"), Just("만기일")
        ],
    ) {
        let scorer = ComprehensiveScorer::default();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut event = ScoredEvent::new(date)
            .with_type(label)
            .with_type_score(type_score)
            .with_recency(recency)
            .with_context(context);
        if metadata {
            event = event.metadata();
        }
        let breakdown = scorer.score(&event, frequency);

        prop_assert!((0.0..=200.0).contains(&breakdown.final_score));
        let adjustment = match breakdown.special_class {
            Some(SpecialClass::InsuranceExpiry) => -50.0,
            Some(SpecialClass::InsuranceStart) => 10.0,
            None => 0.0,
        };
        prop_assert_eq!(breakdown.special_adjustments, adjustment);
    }

    #[test]
    fn prop_temporal_flags_consistent(event in arb_wide_date(), anchor in arb_wide_date()) {
        let flag = TemporalFlagger::default().flag(event, anchor);

        let sides = [flag.is_before_anchor, flag.is_after_anchor, flag.is_anchor_date];
        prop_assert_eq!(sides.iter().filter(|s| **s).count(), 1);
        prop_assert!(!flag.within_3_months_before || flag.is_before_anchor);
        prop_assert!(!flag.within_5_years_before || flag.is_before_anchor);
        prop_assert!(!flag.within_3_months_after || flag.is_after_anchor);
        prop_assert!(!flag.within_3_months_before || flag.within_5_years_before);
        prop_assert_eq!(flag.days_diff, (event - anchor).num_days());
        if flag.is_anchor_date {
            prop_assert_eq!(flag.warning_level, WarningLevel::Info);
        }
    }

    #[test]
    fn prop_iso_output_reparses(date in arb_date()) {
        let normalizer = DateNormalizer::default();
        let iso = to_iso(date);
        prop_assert_eq!(normalizer.normalize(&iso), Some(date));

        let korean = format!("{}년 {}월 {}일", date.format("%Y"), date.format("%-m"), date.format("%-d"));
        prop_assert_eq!(normalizer.normalize(&korean), Some(date));
    }

    #[test]
    fn prop_code_normalization_idempotent(code in arb_code()) {
        let once = normalize_code(&code.to_lowercase());
        let twice = once.as_deref().and_then(normalize_code);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_tiers_partition_cases(scores in proptest::collection::vec(0.0f64..100.0, 0..40)) {
        let cases: Vec<CaseScore> = scores.iter().enumerate().map(|(i, s)| case(i, *s)).collect();
        let tiers = relative_tiers(&cases, &BatchConfig::default());

        prop_assert_eq!(tiers.top.len() + tiers.middle.len() + tiers.bottom.len(), cases.len());
        prop_assert!(tiers.top.samples.len() <= 3);
        let all: HashSet<_> = tiers.top.case_ids.iter()
            .chain(&tiers.middle.case_ids)
            .chain(&tiers.bottom.case_ids)
            .collect();
        prop_assert_eq!(all.len(), cases.len());
    }
}
