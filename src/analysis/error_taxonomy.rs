use serde::Serialize;
use tracing::debug;

use super::patterns::PatternSet;
use super::{ErrorCategory, EMPTY_RESPONSE_MIN_CHARS, RESPONSE_PREVIEW_CHARS};
use crate::model::EvaluationResult;
use crate::util::{percentage, preview};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassification {
    pub category: ErrorCategory,
    pub matched_pattern: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorExample {
    pub index: usize,
    pub question: String,
    pub category: String,
    pub response_preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<&'static str>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorTaxonomyReport {
    pub total_records: usize,
    pub total_errors: usize,
    pub error_rate: f64,
    pub empty: Vec<ErrorExample>,
    pub llm_declined: Vec<ErrorExample>,
    pub syntax_error: Vec<ErrorExample>,
}

// No rule reads the question yet; classification depends on the response alone.
pub fn classify_error(
    response: &str,
    _question: &str,
    patterns: &PatternSet,
) -> ErrorClassification {
    if response.trim().chars().count() < EMPTY_RESPONSE_MIN_CHARS {
        return ErrorClassification {
            category: ErrorCategory::Empty,
            matched_pattern: None,
        };
    }

    for rule in &patterns.error_rules {
        if let Some(pattern) = rule
            .patterns
            .iter()
            .find(|pattern| pattern.regex.is_match(response))
        {
            return ErrorClassification {
                category: rule.category,
                matched_pattern: Some(pattern.source),
            };
        }
    }

    ErrorClassification {
        category: ErrorCategory::None,
        matched_pattern: None,
    }
}

pub fn analyze_error_taxonomy(
    results: &[EvaluationResult],
    patterns: &PatternSet,
) -> ErrorTaxonomyReport {
    let mut report = ErrorTaxonomyReport {
        total_records: results.len(),
        ..ErrorTaxonomyReport::default()
    };

    for (index, result) in results.iter().enumerate() {
        let classification = classify_error(&result.response, &result.question, patterns);
        let bucket = match classification.category {
            ErrorCategory::Empty => &mut report.empty,
            ErrorCategory::Declined => &mut report.llm_declined,
            ErrorCategory::SyntaxError => &mut report.syntax_error,
            ErrorCategory::None => continue,
        };

        bucket.push(ErrorExample {
            index,
            question: result.question.clone(),
            category: result.category().to_string(),
            response_preview: preview(&result.response, RESPONSE_PREVIEW_CHARS),
            matched_pattern: classification.matched_pattern,
        });
        report.total_errors += 1;
    }

    report.error_rate = percentage(report.total_errors, report.total_records);
    debug!(
        total = report.total_records,
        errors = report.total_errors,
        "error taxonomy computed"
    );
    report
}
