use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::patterns::{AGGREGATION_FUNCTIONS, PatternSet};
use super::sql_features::{JoinType, SqlFeatures};
use crate::model::EvaluationResult;

const NAME_KEYWORDS: &[&str] = &[
    "who",
    "player",
    "name",
    "lebron",
    "james",
    "curry",
    "durant",
    "jokic",
    "embiid",
    "antetokounmpo",
    "doncic",
    "tatum",
];

#[derive(Debug, Clone, Serialize)]
pub struct MissingJoinExample {
    pub question: String,
    pub sql: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct JoinCorrectnessReport {
    pub correct_joins: usize,
    pub missing_joins: usize,
    pub missing_join_examples: Vec<MissingJoinExample>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryStructureReport {
    pub total_queries: usize,
    pub queries_with_join: usize,
    pub join_types: BTreeMap<String, usize>,
    pub queries_with_aggregation: usize,
    pub aggregation_types: BTreeMap<String, usize>,
    pub queries_with_filter: usize,
    pub queries_with_group_by: usize,
    pub queries_with_having: usize,
    pub queries_with_order_by: usize,
    pub queries_with_limit: usize,
    pub correctness: JoinCorrectnessReport,
}

impl Default for QueryStructureReport {
    fn default() -> Self {
        Self {
            total_queries: 0,
            queries_with_join: 0,
            join_types: JoinType::ALL
                .iter()
                .map(|join_type| (join_type.as_str().to_string(), 0))
                .collect(),
            queries_with_aggregation: 0,
            aggregation_types: AGGREGATION_FUNCTIONS
                .iter()
                .map(|function| (function.to_ascii_lowercase(), 0))
                .collect(),
            queries_with_filter: 0,
            queries_with_group_by: 0,
            queries_with_having: 0,
            queries_with_order_by: 0,
            queries_with_limit: 0,
            correctness: JoinCorrectnessReport::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinVerdict {
    Correct,
    Missing(&'static str),
    NotApplicable,
}

// Keyword lint only: a stats query that names players through some other
// column is missed, and a question mentioning "player" flags a join-free
// aggregate that never needed names.
pub fn check_join_usage(sql: &str, question: &str, has_join: bool) -> JoinVerdict {
    let sql_lower = sql.to_lowercase();
    let touches_stats = sql_lower.contains("player_stats");

    if touches_stats && sql_lower.contains("players") && has_join {
        return JoinVerdict::Correct;
    }

    if touches_stats && !has_join {
        if sql_lower.contains("p.name") || sql_lower.contains("players.name") {
            return JoinVerdict::Missing("selects player name without joining players");
        }

        let question_lower = question.to_lowercase();
        if NAME_KEYWORDS
            .iter()
            .any(|keyword| question_lower.contains(keyword))
        {
            return JoinVerdict::Missing("question needs player names but player_stats is not joined");
        }
    }

    JoinVerdict::NotApplicable
}

pub fn analyze_query_structure(
    results: &[EvaluationResult],
    patterns: &PatternSet,
) -> QueryStructureReport {
    let mut report = QueryStructureReport::default();

    for result in results {
        let Some(sql) = result.sql() else {
            continue;
        };
        report.total_queries += 1;

        let features = SqlFeatures::extract(sql, patterns);

        if let Some(join_type) = features.join_type {
            report.queries_with_join += 1;
            *report
                .join_types
                .entry(join_type.as_str().to_string())
                .or_default() += 1;
        }

        if let Some(function) = features.aggregation {
            report.queries_with_aggregation += 1;
            *report
                .aggregation_types
                .entry(function.to_ascii_lowercase())
                .or_default() += 1;
        }

        if features.has_where {
            report.queries_with_filter += 1;
        }
        if features.has_group_by {
            report.queries_with_group_by += 1;
        }
        if features.has_having {
            report.queries_with_having += 1;
        }
        if features.has_order_by {
            report.queries_with_order_by += 1;
        }
        if features.has_limit {
            report.queries_with_limit += 1;
        }

        match check_join_usage(sql, &result.question, features.join_type.is_some()) {
            JoinVerdict::Correct => report.correctness.correct_joins += 1,
            JoinVerdict::Missing(reason) => {
                report.correctness.missing_joins += 1;
                report
                    .correctness
                    .missing_join_examples
                    .push(MissingJoinExample {
                        question: result.question.clone(),
                        sql: sql.to_string(),
                        reason,
                    });
            }
            JoinVerdict::NotApplicable => {}
        }
    }

    debug!(
        total = report.total_queries,
        joins = report.queries_with_join,
        missing_joins = report.correctness.missing_joins,
        "query structure computed"
    );
    report
}
