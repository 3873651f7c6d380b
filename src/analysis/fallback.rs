use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::model::EvaluationResult;
use crate::util::percentage;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryFallback {
    pub total: usize,
    pub fallbacks: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FallbackReport {
    pub total_queries: usize,
    pub sql_only: usize,
    pub fallback_to_vector: usize,
    pub fallback_rate: f64,
    pub by_category: BTreeMap<String, CategoryFallback>,
}

// Negative counts are not validated and land in the fallback bucket.
fn used_vector_context(result: &EvaluationResult) -> bool {
    result.sources_count != 0
}

pub fn analyze_fallback(results: &[EvaluationResult]) -> FallbackReport {
    let mut report = FallbackReport {
        total_queries: results.len(),
        ..FallbackReport::default()
    };

    for result in results {
        let fallback = used_vector_context(result);
        if fallback {
            report.fallback_to_vector += 1;
        } else {
            report.sql_only += 1;
        }

        let entry = report
            .by_category
            .entry(result.category().to_string())
            .or_default();
        entry.total += 1;
        if fallback {
            entry.fallbacks += 1;
        }
    }

    report.fallback_rate = percentage(report.fallback_to_vector, report.total_queries);
    for entry in report.by_category.values_mut() {
        entry.rate = percentage(entry.fallbacks, entry.total);
    }

    debug!(
        total = report.total_queries,
        fallbacks = report.fallback_to_vector,
        "fallback routing computed"
    );
    report
}
