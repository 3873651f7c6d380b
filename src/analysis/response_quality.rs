use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::patterns::PatternSet;
use super::{EMPTY_RESPONSE_MIN_CHARS, RESPONSE_PREVIEW_CHARS};
use crate::model::EvaluationResult;
use crate::util::{mean, percentage, preview};

pub const MINIMAL_MAX_WORDS: usize = 9;
pub const CONCISE_MAX_WORDS: usize = 50;
pub const MODERATE_MAX_WORDS: usize = 150;

const NUMBER_WORDS: &[(&str, usize)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
    ("twenty", 20),
];

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Minimal,
    Concise,
    Moderate,
    Verbose,
}

impl Verbosity {
    pub const ALL: [Verbosity; 4] = [
        Self::Minimal,
        Self::Concise,
        Self::Moderate,
        Self::Verbose,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Concise => "concise",
            Self::Moderate => "moderate",
            Self::Verbose => "verbose",
        }
    }

    pub fn from_word_count(words: usize) -> Self {
        if words <= MINIMAL_MAX_WORDS {
            Self::Minimal
        } else if words <= CONCISE_MAX_WORDS {
            Self::Concise
        } else if words <= MODERATE_MAX_WORDS {
            Self::Moderate
        } else {
            Self::Verbose
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HedgingExample {
    pub question: String,
    pub phrases: Vec<&'static str>,
    pub response_preview: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncompleteExample {
    pub question: String,
    pub requested: usize,
    pub delivered: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompletenessReport {
    pub questions_requesting_n: usize,
    pub complete: usize,
    pub incomplete: usize,
    pub completeness_rate: f64,
    pub incomplete_examples: Vec<IncompleteExample>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseQualityReport {
    pub total_responses: usize,
    pub analyzed_responses: usize,
    pub avg_word_count: f64,
    pub verbosity: BTreeMap<String, usize>,
    pub responses_with_hedging: usize,
    pub hedging_rate: f64,
    pub hedging_phrases: BTreeMap<String, usize>,
    pub hedging_examples: Vec<HedgingExample>,
    pub completeness: CompletenessReport,
}

impl Default for ResponseQualityReport {
    fn default() -> Self {
        Self {
            total_responses: 0,
            analyzed_responses: 0,
            avg_word_count: 0.0,
            verbosity: Verbosity::ALL
                .iter()
                .map(|bucket| (bucket.as_str().to_string(), 0))
                .collect(),
            responses_with_hedging: 0,
            hedging_rate: 0.0,
            hedging_phrases: BTreeMap::new(),
            hedging_examples: Vec::new(),
            completeness: CompletenessReport::default(),
        }
    }
}

pub fn word_count(response: &str) -> usize {
    response.split_whitespace().count()
}

pub fn detect_hedging(response: &str, patterns: &PatternSet) -> Vec<&'static str> {
    patterns
        .hedging
        .iter()
        .filter(|(_, regex)| regex.is_match(response))
        .map(|(phrase, _)| *phrase)
        .collect()
}

fn parse_count_token(token: &str) -> Option<usize> {
    if let Ok(value) = token.parse::<usize>() {
        return (value > 0).then_some(value);
    }

    let lowered = token.to_ascii_lowercase();
    NUMBER_WORDS
        .iter()
        .find(|(word, _)| *word == lowered)
        .map(|(_, value)| *value)
}

pub fn requested_count(question: &str, patterns: &PatternSet) -> Option<usize> {
    [&patterns.requested_top_n, &patterns.requested_n_items]
        .into_iter()
        .flat_map(|regex| regex.captures_iter(question))
        .filter_map(|captures| captures.get(1))
        .find_map(|token| parse_count_token(token.as_str()))
}

pub fn delivered_count(response: &str, patterns: &PatternSet) -> usize {
    let numbered = patterns.numbered_line.find_iter(response).count();
    if numbered > 0 {
        return numbered;
    }
    patterns.bullet_line.find_iter(response).count()
}

pub fn analyze_response_quality(
    results: &[EvaluationResult],
    patterns: &PatternSet,
) -> ResponseQualityReport {
    let mut report = ResponseQualityReport {
        total_responses: results.len(),
        ..ResponseQualityReport::default()
    };
    let mut word_total = 0_usize;

    for result in results {
        let response = result.response.trim();

        if let Some(requested) = requested_count(&result.question, patterns) {
            let delivered = delivered_count(response, patterns);
            let completeness = &mut report.completeness;
            completeness.questions_requesting_n += 1;
            if delivered >= requested {
                completeness.complete += 1;
            } else {
                completeness.incomplete += 1;
                completeness.incomplete_examples.push(IncompleteExample {
                    question: result.question.clone(),
                    requested,
                    delivered,
                });
            }
        }

        if response.chars().count() < EMPTY_RESPONSE_MIN_CHARS {
            continue;
        }
        report.analyzed_responses += 1;

        let words = word_count(response);
        word_total += words;
        *report
            .verbosity
            .entry(Verbosity::from_word_count(words).as_str().to_string())
            .or_default() += 1;

        let phrases = detect_hedging(response, patterns);
        if phrases.is_empty() {
            continue;
        }
        report.responses_with_hedging += 1;
        for phrase in &phrases {
            *report
                .hedging_phrases
                .entry((*phrase).to_string())
                .or_default() += 1;
        }
        report.hedging_examples.push(HedgingExample {
            question: result.question.clone(),
            phrases,
            response_preview: preview(response, RESPONSE_PREVIEW_CHARS),
        });
    }

    report.avg_word_count = mean(word_total as f64, report.analyzed_responses);
    report.hedging_rate = percentage(report.responses_with_hedging, report.analyzed_responses);
    report.completeness.completeness_rate = percentage(
        report.completeness.complete,
        report.completeness.questions_requesting_n,
    );

    debug!(
        total = report.total_responses,
        hedging = report.responses_with_hedging,
        incomplete = report.completeness.incomplete,
        "response quality computed"
    );
    report
}
