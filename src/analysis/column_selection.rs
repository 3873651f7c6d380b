use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::patterns::PatternSet;
use super::sql_features::{count_selected_columns, is_select_star, select_clause};
use crate::model::EvaluationResult;
use crate::util::{mean, percentage};

pub const OVER_SELECTION_COLUMN_LIMIT: usize = 3;

const SIMPLE_INTENT_PHRASES: &[&str] = &[
    "how many",
    "what is",
    "who has the highest",
    "who scored the most",
];

const MISSING_NAME_REASON: &str = "Missing player name column";

#[derive(Debug, Clone, Serialize)]
pub struct OverSelectionExample {
    pub question: String,
    pub column_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnderSelectionExample {
    pub question: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ColumnSelectionReport {
    pub total_queries: usize,
    pub select_star: usize,
    pub avg_columns_selected: f64,
    pub column_count_distribution: BTreeMap<usize, usize>,
    pub over_selection: usize,
    pub over_selection_rate: f64,
    pub under_selection: usize,
    pub under_selection_rate: f64,
    pub over_selection_examples: Vec<OverSelectionExample>,
    pub under_selection_examples: Vec<UnderSelectionExample>,
}

pub fn is_over_selection(question: &str, column_count: usize) -> bool {
    let question_lower = question.to_lowercase();
    column_count > OVER_SELECTION_COLUMN_LIMIT
        && SIMPLE_INTENT_PHRASES
            .iter()
            .any(|phrase| question_lower.contains(phrase))
}

pub fn is_under_selection(question: &str, select_clause: &str, sql: &str) -> bool {
    question.to_lowercase().contains("who")
        && !sql.to_lowercase().contains("p.name")
        && !select_clause.to_lowercase().contains("name")
}

pub fn analyze_column_selection(
    results: &[EvaluationResult],
    patterns: &PatternSet,
) -> ColumnSelectionReport {
    let mut report = ColumnSelectionReport::default();
    let mut column_total = 0_usize;
    let mut counted_queries = 0_usize;

    for result in results {
        let Some(sql) = result.sql() else {
            continue;
        };

        // Star queries count toward the total but not toward the column average.
        if is_select_star(sql, patterns) {
            report.total_queries += 1;
            report.select_star += 1;
            continue;
        }

        let Some(clause) = select_clause(sql, patterns) else {
            continue;
        };
        report.total_queries += 1;

        let column_count = count_selected_columns(clause);
        column_total += column_count;
        counted_queries += 1;
        *report
            .column_count_distribution
            .entry(column_count)
            .or_default() += 1;

        if is_over_selection(&result.question, column_count) {
            report.over_selection += 1;
            report.over_selection_examples.push(OverSelectionExample {
                question: result.question.clone(),
                column_count,
            });
        }

        if is_under_selection(&result.question, clause, sql) {
            report.under_selection += 1;
            report.under_selection_examples.push(UnderSelectionExample {
                question: result.question.clone(),
                reason: MISSING_NAME_REASON,
            });
        }
    }

    report.avg_columns_selected = mean(column_total as f64, counted_queries);
    report.over_selection_rate = percentage(report.over_selection, report.total_queries);
    report.under_selection_rate = percentage(report.under_selection, report.total_queries);

    debug!(
        total = report.total_queries,
        select_star = report.select_star,
        avg_columns = report.avg_columns_selected,
        "column selection computed"
    );
    report
}
