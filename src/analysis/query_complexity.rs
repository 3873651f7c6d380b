use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::patterns::PatternSet;
use super::sql_features::SqlFeatures;
use crate::model::EvaluationResult;
use crate::util::mean;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

impl ComplexityTier {
    pub const ALL: [ComplexityTier; 4] = [
        Self::Simple,
        Self::Moderate,
        Self::Complex,
        Self::VeryComplex,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
            Self::VeryComplex => "very_complex",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplexQueryExample {
    pub question: String,
    pub tier: ComplexityTier,
    pub join_count: usize,
    pub subquery_count: usize,
    pub where_conditions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryComplexityReport {
    pub total_queries: usize,
    pub complexity_distribution: BTreeMap<String, usize>,
    pub queries_with_subqueries: usize,
    pub max_joins: usize,
    pub avg_joins_per_query: f64,
    pub avg_where_conditions: f64,
    pub complex_examples: Vec<ComplexQueryExample>,
}

impl Default for QueryComplexityReport {
    fn default() -> Self {
        Self {
            total_queries: 0,
            complexity_distribution: ComplexityTier::ALL
                .iter()
                .map(|tier| (tier.as_str().to_string(), 0))
                .collect(),
            queries_with_subqueries: 0,
            max_joins: 0,
            avg_joins_per_query: 0.0,
            avg_where_conditions: 0.0,
            complex_examples: Vec::new(),
        }
    }
}

pub fn complexity_tier(
    join_count: usize,
    subquery_count: usize,
    condition_count: usize,
) -> ComplexityTier {
    if subquery_count > 0 && join_count > 1 {
        ComplexityTier::VeryComplex
    } else if subquery_count > 0 || join_count > 1 {
        ComplexityTier::Complex
    } else if join_count == 1 || condition_count > 1 {
        ComplexityTier::Moderate
    } else {
        ComplexityTier::Simple
    }
}

pub fn analyze_query_complexity(
    results: &[EvaluationResult],
    patterns: &PatternSet,
) -> QueryComplexityReport {
    let mut report = QueryComplexityReport::default();
    let mut join_total = 0_usize;
    let mut condition_total = 0_usize;

    for result in results {
        let Some(sql) = result.sql() else {
            continue;
        };
        report.total_queries += 1;

        let features = SqlFeatures::extract(sql, patterns);
        let tier = complexity_tier(
            features.join_count,
            features.subquery_count,
            features.where_condition_count,
        );

        *report
            .complexity_distribution
            .entry(tier.as_str().to_string())
            .or_default() += 1;
        join_total += features.join_count;
        condition_total += features.where_condition_count;
        report.max_joins = report.max_joins.max(features.join_count);
        if features.subquery_count > 0 {
            report.queries_with_subqueries += 1;
        }

        if tier >= ComplexityTier::Complex {
            report.complex_examples.push(ComplexQueryExample {
                question: result.question.clone(),
                tier,
                join_count: features.join_count,
                subquery_count: features.subquery_count,
                where_conditions: features.where_condition_count,
            });
        }
    }

    report.avg_joins_per_query = mean(join_total as f64, report.total_queries);
    report.avg_where_conditions = mean(condition_total as f64, report.total_queries);

    debug!(
        total = report.total_queries,
        avg_joins = report.avg_joins_per_query,
        "query complexity computed"
    );
    report
}
