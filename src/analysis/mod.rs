use serde::Serialize;

use crate::model::EvaluationResult;

mod column_selection;
mod error_taxonomy;
mod fallback;
mod ground_truth;
mod markdown;
mod patterns;
mod query_complexity;
mod query_structure;
mod response_quality;
mod sql_features;
#[cfg(test)]
mod tests;

pub use self::column_selection::{ColumnSelectionReport, analyze_column_selection};
pub use self::error_taxonomy::{ErrorTaxonomyReport, analyze_error_taxonomy, classify_error};
pub use self::fallback::{FallbackReport, analyze_fallback};
pub use self::ground_truth::{GroundTruthReport, analyze_ground_truth, match_ground_truth};
pub use self::markdown::render_markdown;
pub use self::patterns::PatternSet;
pub use self::query_complexity::{QueryComplexityReport, analyze_query_complexity};
pub use self::query_structure::{QueryStructureReport, analyze_query_structure};
pub use self::response_quality::{ResponseQualityReport, analyze_response_quality};

pub const EMPTY_RESPONSE_MIN_CHARS: usize = 5;
pub const RESPONSE_PREVIEW_CHARS: usize = 160;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Empty,
    #[serde(rename = "llm_declined")]
    Declined,
    SyntaxError,
    None,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Declined => "llm_declined",
            Self::SyntaxError => "syntax_error",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub generated_at: String,
    pub source_path: String,
    pub source_sha256: String,
    pub record_count: usize,
    pub error_taxonomy: ErrorTaxonomyReport,
    pub fallback: FallbackReport,
    pub response_quality: ResponseQualityReport,
    pub query_structure: QueryStructureReport,
    pub query_complexity: QueryComplexityReport,
    pub column_selection: ColumnSelectionReport,
    pub ground_truth: GroundTruthReport,
}

#[derive(Debug, Clone, Default)]
pub struct BatchSource {
    pub generated_at: String,
    pub source_path: String,
    pub source_sha256: String,
}

pub fn analyze_batch(
    results: &[EvaluationResult],
    patterns: &PatternSet,
    source: BatchSource,
) -> AnalysisReport {
    AnalysisReport {
        generated_at: source.generated_at,
        source_path: source.source_path,
        source_sha256: source.source_sha256,
        record_count: results.len(),
        error_taxonomy: analyze_error_taxonomy(results, patterns),
        fallback: analyze_fallback(results),
        response_quality: analyze_response_quality(results, patterns),
        query_structure: analyze_query_structure(results, patterns),
        query_complexity: analyze_query_complexity(results, patterns),
        column_selection: analyze_column_selection(results, patterns),
        ground_truth: analyze_ground_truth(results, patterns),
    }
}
