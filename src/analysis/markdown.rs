use std::fmt::Write;

use anyhow::Result;

use super::AnalysisReport;
use crate::util::preview;

const EXAMPLE_LIMIT: usize = 5;
const SQL_PREVIEW_CHARS: usize = 120;

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

pub fn render_markdown(report: &AnalysisReport) -> Result<String> {
    let mut out = String::new();

    writeln!(out, "# Evaluation Analysis Report")?;
    writeln!(out)?;
    writeln!(out, "- Generated: {}", report.generated_at)?;
    writeln!(out, "- Source: `{}`", report.source_path)?;
    writeln!(out, "- Source SHA-256: `{}`", report.source_sha256)?;
    writeln!(out, "- Records: {}", report.record_count)?;
    writeln!(out)?;

    write_error_taxonomy(&mut out, report)?;
    write_fallback(&mut out, report)?;
    write_response_quality(&mut out, report)?;
    write_query_structure(&mut out, report)?;
    write_query_complexity(&mut out, report)?;
    write_column_selection(&mut out, report)?;
    write_ground_truth(&mut out, report)?;

    Ok(out)
}

fn write_error_taxonomy(out: &mut String, report: &AnalysisReport) -> std::fmt::Result {
    let taxonomy = &report.error_taxonomy;
    writeln!(out, "## Error Taxonomy")?;
    writeln!(out)?;
    writeln!(
        out,
        "Total errors: **{}** of {} ({:.1}%)",
        taxonomy.total_errors, taxonomy.total_records, taxonomy.error_rate
    )?;
    writeln!(out)?;
    writeln!(out, "| Category | Count |")?;
    writeln!(out, "|---|---|")?;
    writeln!(out, "| empty | {} |", taxonomy.empty.len())?;
    writeln!(out, "| llm_declined | {} |", taxonomy.llm_declined.len())?;
    writeln!(out, "| syntax_error | {} |", taxonomy.syntax_error.len())?;
    writeln!(out)?;

    for (label, examples) in [
        ("Declined", &taxonomy.llm_declined),
        ("Syntax errors", &taxonomy.syntax_error),
    ] {
        if examples.is_empty() {
            continue;
        }
        writeln!(out, "### {label}")?;
        writeln!(out)?;
        for example in examples.iter().take(EXAMPLE_LIMIT) {
            writeln!(
                out,
                "- [{}] {} → _{}_",
                example.category, example.question, example.response_preview
            )?;
        }
        writeln!(out)?;
    }

    Ok(())
}

fn write_fallback(out: &mut String, report: &AnalysisReport) -> std::fmt::Result {
    let fallback = &report.fallback;
    writeln!(out, "## Routing Fallback")?;
    writeln!(out)?;
    writeln!(
        out,
        "SQL only: {} | Vector fallback: {} | Fallback rate: {:.1}%",
        fallback.sql_only, fallback.fallback_to_vector, fallback.fallback_rate
    )?;
    writeln!(out)?;
    writeln!(out, "| Category | Total | Fallbacks | Rate |")?;
    writeln!(out, "|---|---|---|---|")?;
    for (category, stats) in &fallback.by_category {
        writeln!(
            out,
            "| {} | {} | {} | {:.1}% |",
            table_cell(category),
            stats.total,
            stats.fallbacks,
            stats.rate
        )?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_response_quality(out: &mut String, report: &AnalysisReport) -> std::fmt::Result {
    let quality = &report.response_quality;
    writeln!(out, "## Response Quality")?;
    writeln!(out)?;
    writeln!(
        out,
        "Analyzed {} of {} responses, average {:.1} words.",
        quality.analyzed_responses, quality.total_responses, quality.avg_word_count
    )?;
    writeln!(out)?;
    writeln!(out, "| Verbosity | Count |")?;
    writeln!(out, "|---|---|")?;
    for (bucket, count) in &quality.verbosity {
        writeln!(out, "| {bucket} | {count} |")?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "Hedging: {} responses ({:.1}%)",
        quality.responses_with_hedging, quality.hedging_rate
    )?;
    for (phrase, count) in &quality.hedging_phrases {
        writeln!(out, "- \"{phrase}\": {count}")?;
    }
    writeln!(out)?;

    let completeness = &quality.completeness;
    writeln!(
        out,
        "Completeness: {}/{} list requests satisfied ({:.1}%)",
        completeness.complete, completeness.questions_requesting_n, completeness.completeness_rate
    )?;
    for example in completeness.incomplete_examples.iter().take(EXAMPLE_LIMIT) {
        writeln!(
            out,
            "- {} (requested {}, delivered {})",
            example.question, example.requested, example.delivered
        )?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_query_structure(out: &mut String, report: &AnalysisReport) -> std::fmt::Result {
    let structure = &report.query_structure;
    writeln!(out, "## SQL Structure")?;
    writeln!(out)?;
    writeln!(out, "| Feature | Queries |")?;
    writeln!(out, "|---|---|")?;
    writeln!(out, "| total | {} |", structure.total_queries)?;
    writeln!(out, "| join | {} |", structure.queries_with_join)?;
    writeln!(out, "| aggregation | {} |", structure.queries_with_aggregation)?;
    writeln!(out, "| where | {} |", structure.queries_with_filter)?;
    writeln!(out, "| group by | {} |", structure.queries_with_group_by)?;
    writeln!(out, "| having | {} |", structure.queries_with_having)?;
    writeln!(out, "| order by | {} |", structure.queries_with_order_by)?;
    writeln!(out, "| limit | {} |", structure.queries_with_limit)?;
    writeln!(out)?;

    let join_types = structure
        .join_types
        .iter()
        .map(|(kind, count)| format!("{kind}={count}"))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(out, "Join types: {join_types}")?;
    let aggregations = structure
        .aggregation_types
        .iter()
        .map(|(function, count)| format!("{function}={count}"))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(out, "Aggregations: {aggregations}")?;
    writeln!(out)?;

    let correctness = &structure.correctness;
    writeln!(
        out,
        "Join lint: {} correct, {} likely missing (heuristic, review manually)",
        correctness.correct_joins, correctness.missing_joins
    )?;
    for example in correctness.missing_join_examples.iter().take(EXAMPLE_LIMIT) {
        writeln!(
            out,
            "- {}: `{}` ({})",
            example.question,
            preview(&example.sql, SQL_PREVIEW_CHARS),
            example.reason
        )?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_query_complexity(out: &mut String, report: &AnalysisReport) -> std::fmt::Result {
    let complexity = &report.query_complexity;
    writeln!(out, "## SQL Complexity")?;
    writeln!(out)?;
    writeln!(out, "| Tier | Queries |")?;
    writeln!(out, "|---|---|")?;
    for (tier, count) in &complexity.complexity_distribution {
        writeln!(out, "| {tier} | {count} |")?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "Average joins: {:.2} | Average WHERE conditions: {:.2} | Subqueries: {} | Max joins: {}",
        complexity.avg_joins_per_query,
        complexity.avg_where_conditions,
        complexity.queries_with_subqueries,
        complexity.max_joins
    )?;
    writeln!(out)?;
    Ok(())
}

fn write_column_selection(out: &mut String, report: &AnalysisReport) -> std::fmt::Result {
    let columns = &report.column_selection;
    writeln!(out, "## Column Selection")?;
    writeln!(out)?;
    writeln!(
        out,
        "Queries: {} | SELECT *: {} | Average columns: {:.2}",
        columns.total_queries, columns.select_star, columns.avg_columns_selected
    )?;
    writeln!(
        out,
        "Over-selection: {} ({:.1}%) | Under-selection: {} ({:.1}%)",
        columns.over_selection,
        columns.over_selection_rate,
        columns.under_selection,
        columns.under_selection_rate
    )?;
    writeln!(out)?;
    for example in columns.over_selection_examples.iter().take(EXAMPLE_LIMIT) {
        writeln!(
            out,
            "- over: {} ({} columns)",
            example.question, example.column_count
        )?;
    }
    for example in columns.under_selection_examples.iter().take(EXAMPLE_LIMIT) {
        writeln!(out, "- under: {} ({})", example.question, example.reason)?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_ground_truth(out: &mut String, report: &AnalysisReport) -> std::fmt::Result {
    let ground_truth = &report.ground_truth;
    writeln!(out, "## Ground Truth")?;
    writeln!(out)?;
    if ground_truth.records_with_ground_truth == 0 {
        writeln!(out, "No records carried ground truth.")?;
        return Ok(());
    }

    writeln!(
        out,
        "full={} partial={} fail={} no_gt={} | accuracy {:.1}% (lenient {:.1}%)",
        ground_truth.full,
        ground_truth.partial,
        ground_truth.fail,
        ground_truth.no_gt,
        ground_truth.accuracy,
        ground_truth.lenient_accuracy
    )?;
    writeln!(out)?;
    writeln!(out, "| Category | Full | Partial | Fail | Accuracy |")?;
    writeln!(out, "|---|---|---|---|---|")?;
    for (category, stats) in &ground_truth.by_category {
        writeln!(
            out,
            "| {} | {} | {} | {} | {:.1}% |",
            table_cell(category),
            stats.full,
            stats.partial,
            stats.fail,
            stats.accuracy
        )?;
    }
    writeln!(out)?;
    for failure in ground_truth.failures.iter().take(EXAMPLE_LIMIT) {
        writeln!(
            out,
            "- {} [{}]: {}",
            failure.question,
            failure.verdict.as_str(),
            failure.detail
        )?;
    }
    Ok(())
}
