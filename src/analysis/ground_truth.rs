use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::RESPONSE_PREVIEW_CHARS;
use super::patterns::PatternSet;
use crate::model::EvaluationResult;
use crate::util::{percentage, preview};

pub const GROUND_TRUTH_TOLERANCE: f64 = 0.5;

const FAILURE_PHRASES: &[&str] = &[
    "available context doesn't contain",
    "cannot find",
    "no information",
    "i don't have",
    "not available",
    "i couldn't find",
];

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchVerdict {
    Full,
    Partial,
    Fail,
    NoGt,
}

impl MatchVerdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Partial => "partial",
            Self::Fail => "fail",
            Self::NoGt => "no_gt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundTruthMatch {
    pub verdict: MatchVerdict,
    pub detail: String,
}

impl GroundTruthMatch {
    fn new(verdict: MatchVerdict, detail: impl Into<String>) -> Self {
        Self {
            verdict,
            detail: detail.into(),
        }
    }
}

pub fn extract_numbers(response: &str, patterns: &PatternSet) -> Vec<f64> {
    patterns
        .response_number
        .find_iter(response)
        .filter_map(|token| token.as_str().replace(',', "").parse::<f64>().ok())
        .collect()
}

pub fn expected_numbers(ground_truth: &Value) -> Vec<f64> {
    match ground_truth {
        Value::Object(fields) => fields.values().filter_map(Value::as_f64).collect(),
        Value::Array(records) => records
            .iter()
            .flat_map(|record| -> Vec<f64> {
                match record {
                    Value::Object(fields) => fields.values().filter_map(Value::as_f64).collect(),
                    Value::Number(number) => number.as_f64().into_iter().collect(),
                    _ => Vec::new(),
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn declined_phrase(response: &str) -> Option<&'static str> {
    let lowered = response.to_lowercase();
    FAILURE_PHRASES
        .iter()
        .copied()
        .find(|phrase| lowered.contains(phrase))
}

pub fn match_ground_truth(
    response: &str,
    ground_truth: Option<&Value>,
    patterns: &PatternSet,
) -> GroundTruthMatch {
    let Some(ground_truth) = ground_truth.filter(|value| !value.is_null()) else {
        return GroundTruthMatch::new(MatchVerdict::NoGt, "no ground truth");
    };

    if let Some(phrase) = declined_phrase(response) {
        return GroundTruthMatch::new(
            MatchVerdict::Fail,
            format!("response declined (\"{phrase}\")"),
        );
    }

    let expected = expected_numbers(ground_truth);
    if expected.is_empty() {
        return GroundTruthMatch::new(MatchVerdict::NoGt, "ground truth has no numeric fields");
    }

    let found = extract_numbers(response, patterns);
    let matched = expected
        .iter()
        .filter(|value| {
            found
                .iter()
                .any(|candidate| (candidate - *value).abs() <= GROUND_TRUTH_TOLERANCE)
        })
        .count();

    let verdict = if matched == expected.len() {
        MatchVerdict::Full
    } else if matched > 0 {
        MatchVerdict::Partial
    } else {
        MatchVerdict::Fail
    };

    GroundTruthMatch::new(
        verdict,
        format!("{matched}/{} expected values matched", expected.len()),
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryAccuracy {
    pub full: usize,
    pub partial: usize,
    pub fail: usize,
    pub no_gt: usize,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroundTruthFailure {
    pub question: String,
    pub verdict: MatchVerdict,
    pub detail: String,
    pub response_preview: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GroundTruthReport {
    pub records_with_ground_truth: usize,
    pub judged: usize,
    pub full: usize,
    pub partial: usize,
    pub fail: usize,
    pub no_gt: usize,
    pub accuracy: f64,
    pub lenient_accuracy: f64,
    pub by_category: BTreeMap<String, CategoryAccuracy>,
    pub failures: Vec<GroundTruthFailure>,
}

pub fn analyze_ground_truth(
    results: &[EvaluationResult],
    patterns: &PatternSet,
) -> GroundTruthReport {
    let mut report = GroundTruthReport::default();

    for result in results {
        let Some(ground_truth) = result.ground_truth.as_ref() else {
            continue;
        };
        report.records_with_ground_truth += 1;

        let outcome = match_ground_truth(&result.response, Some(ground_truth), patterns);
        let category = report
            .by_category
            .entry(result.category().to_string())
            .or_default();

        match outcome.verdict {
            MatchVerdict::Full => {
                report.full += 1;
                category.full += 1;
            }
            MatchVerdict::Partial => {
                report.partial += 1;
                category.partial += 1;
            }
            MatchVerdict::Fail => {
                report.fail += 1;
                category.fail += 1;
            }
            MatchVerdict::NoGt => {
                report.no_gt += 1;
                category.no_gt += 1;
            }
        }

        if matches!(outcome.verdict, MatchVerdict::Partial | MatchVerdict::Fail) {
            report.failures.push(GroundTruthFailure {
                question: result.question.clone(),
                verdict: outcome.verdict,
                detail: outcome.detail,
                response_preview: preview(&result.response, RESPONSE_PREVIEW_CHARS),
            });
        }
    }

    report.judged = report.full + report.partial + report.fail;
    report.accuracy = percentage(report.full, report.judged);
    report.lenient_accuracy = percentage(report.full + report.partial, report.judged);
    for category in report.by_category.values_mut() {
        category.accuracy = percentage(
            category.full,
            category.full + category.partial + category.fail,
        );
    }

    debug!(
        records = report.records_with_ground_truth,
        full = report.full,
        fail = report.fail,
        "ground truth accuracy computed"
    );
    report
}
