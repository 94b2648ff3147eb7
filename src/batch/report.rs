//! Distributional statistics over per-case scores

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::conformity::CaseScore;
use crate::config::BatchConfig;
use crate::models::Grade;

/// Mean/min/max of the conformity scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreStatistics {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl ScoreStatistics {
    /// `None` for an empty input
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let sum: f64 = scores.iter().sum();
        Some(Self {
            mean: sum / scores.len() as f64,
            min: scores.iter().copied().fold(f64::INFINITY, f64::min),
            max: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Members of one relative tier, best first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub case_ids: Vec<String>,
    /// First, middle and last member; the whole tier when it has at most 3
    pub samples: Vec<String>,
}

impl Tier {
    fn new(case_ids: Vec<String>) -> Self {
        let samples = representative_sample(&case_ids);
        Self { case_ids, samples }
    }

    pub fn len(&self) -> usize {
        self.case_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.case_ids.is_empty()
    }
}

/// Rank-based partition of the evaluated cases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelativeTiers {
    pub top: Tier,
    pub middle: Tier,
    pub bottom: Tier,
}

/// Statistics for one case type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseTypeStats {
    pub count: usize,
    pub mean_score: f64,
    pub mean_date_precision: f64,
}

/// A case that could not be evaluated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseFailure {
    pub case_id: String,
    pub error: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total_cases: usize,
    /// Evaluated cases in input order
    pub cases: Vec<CaseScore>,
    pub failures: Vec<CaseFailure>,
    pub statistics: Option<ScoreStatistics>,
    /// Count per absolute grade, every grade present
    pub grade_distribution: BTreeMap<Grade, usize>,
    pub tiers: RelativeTiers,
    pub by_case_type: BTreeMap<String, CaseTypeStats>,
}

impl BatchReport {
    pub fn evaluated(&self) -> usize {
        self.cases.len()
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_cases == 0 {
            0.0
        } else {
            self.cases.len() as f64 / self.total_cases as f64
        }
    }
}

/// Aggregate evaluated cases and failures into a report
pub fn aggregate(cases: Vec<CaseScore>, failures: Vec<CaseFailure>, config: &BatchConfig) -> BatchReport {
    let scores: Vec<f64> = cases.iter().map(|c| c.conformity_score).collect();

    let mut grade_distribution: BTreeMap<Grade, usize> =
        Grade::all().into_iter().map(|g| (g, 0)).collect();
    for case in &cases {
        *grade_distribution.entry(case.grade).or_default() += 1;
    }

    BatchReport {
        total_cases: cases.len() + failures.len(),
        statistics: ScoreStatistics::from_scores(&scores),
        grade_distribution,
        tiers: relative_tiers(&cases, config),
        by_case_type: by_case_type(&cases),
        cases,
        failures,
    }
}

/// Split cases by score rank into top/middle/bottom
///
/// Top and bottom each take `round(n × fraction)` cases; the middle takes
/// the rest. Equal scores keep their input order.
pub fn relative_tiers(cases: &[CaseScore], config: &BatchConfig) -> RelativeTiers {
    let mut ranked: Vec<&CaseScore> = cases.iter().collect();
    ranked.sort_by(|a, b| b.conformity_score.total_cmp(&a.conformity_score));

    let n = ranked.len();
    let top = ((n as f64 * config.top_fraction).round() as usize).min(n);
    let bottom = ((n as f64 * config.bottom_fraction).round() as usize).min(n - top);

    let ids = |slice: &[&CaseScore]| slice.iter().map(|c| c.case_id.clone()).collect::<Vec<_>>();
    RelativeTiers {
        top: Tier::new(ids(&ranked[..top])),
        middle: Tier::new(ids(&ranked[top..n - bottom])),
        bottom: Tier::new(ids(&ranked[n - bottom..])),
    }
}

/// First, middle and last element; everything when there are at most 3
pub fn representative_sample<T: Clone>(items: &[T]) -> Vec<T> {
    if items.len() <= 3 {
        return items.to_vec();
    }
    vec![
        items[0].clone(),
        items[items.len() / 2].clone(),
        items[items.len() - 1].clone(),
    ]
}

fn by_case_type(cases: &[CaseScore]) -> BTreeMap<String, CaseTypeStats> {
    let mut groups: BTreeMap<String, Vec<&CaseScore>> = BTreeMap::new();
    for case in cases {
        if let Some(case_type) = &case.case_type {
            groups.entry(case_type.clone()).or_default().push(case);
        }
    }

    groups
        .into_iter()
        .map(|(case_type, members)| {
            let count = members.len();
            let mean = |f: fn(&CaseScore) -> f64| {
                members.iter().map(|c| f(*c)).sum::<f64>() / count as f64
            };
            (
                case_type,
                CaseTypeStats {
                    count,
                    mean_score: mean(|c| c.conformity_score),
                    mean_date_precision: mean(|c| c.date_precision),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(id: &str, score: f64) -> CaseScore {
        CaseScore {
            case_id: id.to_string(),
            case_type: None,
            conformity_score: score,
            grade: Grade::from_score(score),
            date_match_rate: score / 100.0,
            date_precision: 1.0,
            code_match_rate: 1.0,
            hospital_match_rate: 1.0,
            jaccard: 0.0,
            label_score: 0.0,
            reference_dates: 1,
            candidate_dates: 1,
            reference_available: true,
            missing_dates: Vec::new(),
            extra_dates: Vec::new(),
        }
    }

    #[test]
    fn test_statistics() {
        let stats = ScoreStatistics::from_scores(&[50.0, 70.0, 90.0]).unwrap();
        assert_eq!(stats.mean, 70.0);
        assert_eq!(stats.min, 50.0);
        assert_eq!(stats.max, 90.0);
        assert!(ScoreStatistics::from_scores(&[]).is_none());
    }

    #[test]
    fn test_nine_cases_split_evenly() {
        let cases: Vec<CaseScore> = (1..=9)
            .map(|i| case(&format!("Case{i}"), i as f64 * 10.0))
            .collect();
        let tiers = relative_tiers(&cases, &BatchConfig::default());
        assert_eq!(tiers.top.case_ids, vec!["Case9", "Case8", "Case7"]);
        assert_eq!(tiers.middle.len(), 3);
        assert_eq!(tiers.bottom.case_ids, vec!["Case3", "Case2", "Case1"]);
        assert_eq!(tiers.top.samples, tiers.top.case_ids);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let cases = vec![case("a", 50.0), case("b", 50.0), case("c", 50.0)];
        let tiers = relative_tiers(&cases, &BatchConfig::default());
        assert_eq!(tiers.top.case_ids, vec!["a"]);
        assert_eq!(tiers.middle.case_ids, vec!["b"]);
        assert_eq!(tiers.bottom.case_ids, vec!["c"]);
    }

    #[test]
    fn test_small_batches() {
        let tiers = relative_tiers(&[case("only", 10.0)], &BatchConfig::default());
        assert!(tiers.top.is_empty() && tiers.bottom.is_empty());
        assert_eq!(tiers.middle.case_ids, vec!["only"]);

        let empty = relative_tiers(&[], &BatchConfig::default());
        assert!(empty.top.is_empty() && empty.middle.is_empty() && empty.bottom.is_empty());
    }

    #[test]
    fn test_representative_sample() {
        assert_eq!(representative_sample(&[1, 2]), vec![1, 2]);
        assert_eq!(representative_sample(&[1, 2, 3, 4, 5, 6]), vec![1, 4, 6]);
    }

    #[test]
    fn test_aggregate_histogram_and_case_types() {
        let mut a = case("a", 85.0);
        a.case_type = Some("외래".into());
        let mut b = case("b", 65.0);
        b.case_type = Some("외래".into());
        b.date_precision = 0.5;
        let c = case("c", 20.0);
        let failures = vec![CaseFailure {
            case_id: "d".into(),
            error: "missing".into(),
        }];

        let report = aggregate(vec![a, b, c], failures, &BatchConfig::default());
        assert_eq!(report.total_cases, 4);
        assert_eq!(report.evaluated(), 3);
        assert_eq!(report.success_rate(), 0.75);
        assert_eq!(report.grade_distribution[&Grade::High], 1);
        assert_eq!(report.grade_distribution[&Grade::Medium], 1);
        assert_eq!(report.grade_distribution[&Grade::Low], 1);

        let outpatient = report.by_case_type["외래"];
        assert_eq!(outpatient.count, 2);
        assert_eq!(outpatient.mean_score, 75.0);
        assert_eq!(outpatient.mean_date_precision, 0.75);
        assert_eq!(report.by_case_type.len(), 1);
    }

    #[test]
    fn test_report_serializes_grade_keys() {
        let report = aggregate(vec![case("a", 90.0)], Vec::new(), &BatchConfig::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["gradeDistribution"]["상"], 1);
        assert_eq!(json["gradeDistribution"]["하"], 0);
        assert_eq!(json["totalCases"], 1);
    }
}
