use serde_json::json;

use super::column_selection::{is_over_selection, is_under_selection};
use super::ground_truth::{GROUND_TRUTH_TOLERANCE, MatchVerdict};
use super::query_complexity::{ComplexityTier, complexity_tier};
use super::query_structure::{JoinVerdict, check_join_usage};
use super::response_quality::{Verbosity, delivered_count, requested_count};
use super::sql_features::{
    JoinType, SqlFeatures, count_selected_columns, join_count, join_type, select_clause,
    subquery_count, where_condition_count,
};
use super::*;
use crate::model::EvaluationResult;

fn patterns() -> PatternSet {
    PatternSet::compile().expect("pattern set should compile")
}

fn record(question: &str, response: &str, sql: Option<&str>) -> EvaluationResult {
    EvaluationResult {
        question: question.to_string(),
        response: response.to_string(),
        generated_sql: sql.map(ToOwned::to_owned),
        ..EvaluationResult::default()
    }
}

fn classify_sql_complexity(sql: &str, patterns: &PatternSet) -> ComplexityTier {
    let features = SqlFeatures::extract(sql, patterns);
    complexity_tier(
        features.join_count,
        features.subquery_count,
        features.where_condition_count,
    )
}

fn routed(category: &str, sources_count: i64) -> EvaluationResult {
    EvaluationResult {
        question: "q".to_string(),
        response: "an answer".to_string(),
        sources_count,
        category: Some(category.to_string()),
        ..EvaluationResult::default()
    }
}

#[test]
fn classify_error_treats_short_responses_as_empty() {
    let patterns = patterns();
    assert_eq!(classify_error("", "q", &patterns).category, ErrorCategory::Empty);
    assert_eq!(classify_error("   ok  ", "q", &patterns).category, ErrorCategory::Empty);
    assert_eq!(classify_error("abcd", "q", &patterns).category, ErrorCategory::Empty);
    assert_eq!(classify_error("abcde", "q", &patterns).category, ErrorCategory::None);
}

#[test]
fn classify_error_reports_first_matching_decline_pattern() {
    let patterns = patterns();
    let classification =
        classify_error("Sorry, I cannot answer that question.", "q", &patterns);
    assert_eq!(classification.category, ErrorCategory::Declined);
    assert_eq!(
        classification.matched_pattern,
        Some(r"(?i)I cannot (answer|find|provide)")
    );

    let classification =
        classify_error("The database doesn't contain 2030 stats.", "q", &patterns);
    assert_eq!(classification.category, ErrorCategory::Declined);
    assert_eq!(
        classification.matched_pattern,
        Some(r"(?i)(database|data|schema|table) (does not|doesn't) contain")
    );
}

#[test]
fn classify_error_prefers_decline_over_syntax_error() {
    let patterns = patterns();
    let classification = classify_error(
        "SQLite error occurred, so I cannot provide the total.",
        "q",
        &patterns,
    );
    assert_eq!(classification.category, ErrorCategory::Declined);
}

#[test]
fn classify_error_result_does_not_depend_on_question() {
    let patterns = patterns();
    let response = "I cannot find stats for that player.";
    let with_question = classify_error(response, "Who scored the most points?", &patterns);
    let without_question = classify_error(response, "", &patterns);
    assert_eq!(with_question, without_question);
    assert_eq!(with_question.category, ErrorCategory::Declined);
}

#[test]
fn classify_error_detects_syntax_errors() {
    let patterns = patterns();
    for response in [
        "SQLite error: no such table: stats",
        "There was a SQL syntax error in the query",
        r#"near "FROMM": syntax error"#,
        "Query failed: no such column: p.points",
    ] {
        assert_eq!(
            classify_error(response, "q", &patterns).category,
            ErrorCategory::SyntaxError,
            "response: {response}"
        );
    }
}

#[test]
fn error_taxonomy_scenario_counts_each_category_once() {
    let patterns = patterns();
    let results = vec![
        record("q1", "", None),
        record("q2", "I cannot find this information", None),
        record("q3", "SQLite error: no such table", None),
        record("q4", "LeBron James scored 2485 points this season.", None),
    ];

    let report = analyze_error_taxonomy(&results, &patterns);
    assert_eq!(report.empty.len(), 1);
    assert_eq!(report.llm_declined.len(), 1);
    assert_eq!(report.syntax_error.len(), 1);
    assert_eq!(report.total_errors, 3);
    assert_eq!(
        report.total_errors,
        report.empty.len() + report.llm_declined.len() + report.syntax_error.len()
    );

    let listed = report
        .empty
        .iter()
        .chain(&report.llm_declined)
        .chain(&report.syntax_error)
        .map(|example| example.index)
        .collect::<Vec<_>>();
    assert_eq!(listed, vec![0, 1, 2]);
    assert!((report.error_rate - 75.0).abs() < 1e-9);
}

#[test]
fn error_taxonomy_preserves_input_order_within_category() {
    let patterns = patterns();
    let results = vec![
        record("first", "no data for that season", None),
        record("skip", "A full answer with numbers 12.", None),
        record("second", "I am unable to find that player", None),
    ];

    let report = analyze_error_taxonomy(&results, &patterns);
    let questions = report
        .llm_declined
        .iter()
        .map(|example| example.question.as_str())
        .collect::<Vec<_>>();
    assert_eq!(questions, vec!["first", "second"]);
}

#[test]
fn fallback_counts_partition_total_queries() {
    let results = vec![
        routed("simple", 0),
        routed("simple", 3),
        routed("comparison", 0),
        routed("comparison", 0),
        routed("aggregation", -1),
    ];

    let report = analyze_fallback(&results);
    assert_eq!(report.total_queries, 5);
    assert_eq!(report.sql_only + report.fallback_to_vector, report.total_queries);
    assert_eq!(report.fallback_to_vector, 2);
    assert!((report.fallback_rate - 40.0).abs() < 1e-9);

    let category_total = report
        .by_category
        .values()
        .map(|stats| stats.total)
        .sum::<usize>();
    assert_eq!(category_total, report.total_queries);
    assert!((report.by_category["simple"].rate - 50.0).abs() < 1e-9);
    assert_eq!(report.by_category["comparison"].rate, 0.0);
    assert!((report.by_category["aggregation"].rate - 100.0).abs() < 1e-9);
}

#[test]
fn fallback_on_empty_batch_has_zero_rate() {
    let report = analyze_fallback(&[]);
    assert_eq!(report.total_queries, 0);
    assert_eq!(report.fallback_rate, 0.0);
    assert!(report.by_category.is_empty());
}

#[test]
fn fallback_is_order_independent() {
    let mut results = vec![routed("a", 0), routed("b", 2), routed("a", 1)];
    let forward = analyze_fallback(&results);
    results.reverse();
    let backward = analyze_fallback(&results);
    assert_eq!(forward.by_category, backward.by_category);
    assert_eq!(forward.fallback_rate, backward.fallback_rate);
}

#[test]
fn missing_category_rolls_up_under_unknown() {
    let mut result = routed("", 0);
    result.category = None;
    let report = analyze_fallback(&[result]);
    assert_eq!(report.by_category["unknown"].total, 1);
}

#[test]
fn count_selected_columns_ignores_commas_inside_parentheses() {
    assert_eq!(count_selected_columns("a, COUNT(b,c), d"), 3);
    assert_eq!(count_selected_columns("ROUND(AVG(x), 1) AS avg_x"), 1);
    assert_eq!(count_selected_columns("name"), 1);

    let patterns = patterns();
    let clause = select_clause("SELECT a, COUNT(b,c), d FROM t", &patterns)
        .expect("select clause should be found");
    assert_eq!(count_selected_columns(clause), 3);
}

#[test]
fn join_type_uses_first_matching_rule() {
    assert_eq!(join_type("SELECT * FROM A"), None);
    assert_eq!(
        join_type("SELECT * FROM A LEFT JOIN B ON A.ID = B.ID JOIN C ON C.ID = A.ID"),
        Some(JoinType::LeftJoin)
    );
    assert_eq!(
        join_type("SELECT * FROM A RIGHT OUTER JOIN B ON 1=1"),
        Some(JoinType::RightJoin)
    );
    assert_eq!(
        join_type("SELECT * FROM A JOIN B ON 1=1"),
        Some(JoinType::InnerJoin)
    );
    // The inner rule swallows FULL JOIN before the full outer rule is reached.
    assert_eq!(
        join_type("SELECT * FROM A FULL OUTER JOIN B ON 1=1"),
        Some(JoinType::InnerJoin)
    );
}

#[test]
fn join_and_subquery_counts_are_literal_substring_counts() {
    let upper = "SELECT * FROM A LEFT JOIN B ON 1=1 JOIN C ON 1=1";
    assert_eq!(join_count(upper), 2);
    assert_eq!(subquery_count("SELECT X FROM (SELECT Y FROM Z)"), 1);
    assert_eq!(subquery_count("PRAGMA TABLE_INFO(PLAYERS)"), 0);
}

#[test]
fn where_condition_count_stops_at_trailing_clauses() {
    let patterns = patterns();
    assert_eq!(where_condition_count("SELECT * FROM t", &patterns), 0);
    assert_eq!(
        where_condition_count("SELECT * FROM t WHERE a=1", &patterns),
        1
    );
    assert_eq!(
        where_condition_count(
            "SELECT * FROM t\nWHERE a=1 and b=2\n   OR c=3 ORDER BY a LIMIT 5",
            &patterns
        ),
        3
    );
    assert_eq!(
        where_condition_count(
            "SELECT team, SUM(pts) FROM s WHERE season = 2024 AND pts > 10 GROUP BY team HAVING SUM(pts) > 100 AND team <> 'X'",
            &patterns
        ),
        2
    );
}

#[test]
fn complexity_tiers_follow_decision_tree() {
    let patterns = patterns();
    let cases = [
        ("SELECT * FROM t", ComplexityTier::Simple),
        ("SELECT * FROM t WHERE a=1", ComplexityTier::Simple),
        ("SELECT * FROM t WHERE a=1 AND b=2", ComplexityTier::Moderate),
        (
            "SELECT * FROM a JOIN b ON a.id=b.id WHERE x=1",
            ComplexityTier::Moderate,
        ),
        (
            "SELECT * FROM a JOIN b ON a.id=b.id JOIN c ON c.id=a.id",
            ComplexityTier::Complex,
        ),
        (
            "SELECT name FROM players WHERE id IN (SELECT player_id FROM player_stats)",
            ComplexityTier::Complex,
        ),
        (
            "SELECT * FROM a JOIN b JOIN c WHERE id IN (SELECT x FROM y)",
            ComplexityTier::VeryComplex,
        ),
    ];

    for (sql, expected) in cases {
        assert_eq!(classify_sql_complexity(sql, &patterns), expected, "sql: {sql}");
    }
}

#[test]
fn complexity_report_averages_over_queries_with_sql() {
    let patterns = patterns();
    let results = vec![
        record("q1", "r", Some("SELECT * FROM a JOIN b ON 1=1 WHERE x=1 AND y=2")),
        record("q2", "r", Some("SELECT * FROM t")),
        record("q3", "r", None),
        record("q4", "r", Some("   ")),
    ];

    let report = analyze_query_complexity(&results, &patterns);
    assert_eq!(report.total_queries, 3);
    assert!((report.avg_joins_per_query - 1.0 / 3.0).abs() < 1e-9);
    assert!((report.avg_where_conditions - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(report.complexity_distribution["moderate"], 1);
    assert_eq!(report.complexity_distribution["simple"], 2);
    assert_eq!(report.complexity_distribution["very_complex"], 0);
    assert!(report.complex_examples.is_empty());
}

#[test]
fn complexity_report_on_empty_batch_has_zero_averages() {
    let report = analyze_query_complexity(&[], &patterns());
    assert_eq!(report.avg_joins_per_query, 0.0);
    assert_eq!(report.avg_where_conditions, 0.0);
    assert_eq!(report.complexity_distribution.len(), 4);
}

#[test]
fn query_structure_counts_features_once_per_query() {
    let patterns = patterns();
    let results = vec![
        record(
            "Who scored the most points?",
            "r",
            Some("SELECT p.name, MAX(s.pts), COUNT(*) FROM players p JOIN player_stats s ON p.id = s.player_id ORDER BY 2 DESC LIMIT 1"),
        ),
        record(
            "Average rebounds?",
            "r",
            Some("select avg(reb) from player_stats where season = 2024"),
        ),
        record("vector only", "r", None),
    ];

    let report = analyze_query_structure(&results, &patterns);
    assert_eq!(report.total_queries, 2);
    assert_eq!(report.queries_with_join, 1);
    assert_eq!(report.join_types["inner_join"], 1);
    assert_eq!(report.join_types["full_outer_join"], 0);
    assert_eq!(report.queries_with_aggregation, 2);
    assert_eq!(report.aggregation_types["count"], 1);
    assert_eq!(report.aggregation_types["max"], 0);
    assert_eq!(report.aggregation_types["avg"], 1);
    assert_eq!(report.queries_with_filter, 1);
    assert_eq!(report.queries_with_order_by, 1);
    assert_eq!(report.queries_with_limit, 1);
    assert_eq!(report.correctness.correct_joins, 1);
    assert_eq!(report.correctness.missing_joins, 0);
}

#[test]
fn whitespace_sql_is_analyzed_but_empty_sql_is_skipped() {
    let patterns = patterns();
    let results = vec![record("q", "r", Some("   ")), record("q", "r", Some(""))];

    let structure = analyze_query_structure(&results, &patterns);
    assert_eq!(structure.total_queries, 1);
    assert_eq!(structure.queries_with_join, 0);

    let complexity = analyze_query_complexity(&results, &patterns);
    assert_eq!(complexity.total_queries, 1);
    assert_eq!(complexity.complexity_distribution["simple"], 1);
}

#[test]
fn join_lint_flags_name_questions_without_join() {
    assert_eq!(
        check_join_usage(
            "SELECT player_id, pts FROM player_stats ORDER BY pts DESC LIMIT 1",
            "Who leads the league in scoring?",
            false
        ),
        JoinVerdict::Missing("question needs player names but player_stats is not joined")
    );
    assert_eq!(
        check_join_usage(
            "SELECT p.name FROM player_stats",
            "Top scorer?",
            false
        ),
        JoinVerdict::Missing("selects player name without joining players")
    );
    assert_eq!(
        check_join_usage(
            "SELECT AVG(pts) FROM player_stats",
            "What is the league average?",
            false
        ),
        JoinVerdict::NotApplicable
    );
}

#[test]
fn join_lint_is_keyword_based_and_can_over_flag() {
    // "player" in the question flags an aggregate that never needed names.
    assert!(matches!(
        check_join_usage(
            "SELECT COUNT(*) FROM player_stats",
            "How many player seasons are recorded?",
            false
        ),
        JoinVerdict::Missing(_)
    ));
}

#[test]
fn column_selection_excludes_star_queries_from_average() {
    let patterns = patterns();
    let results = vec![
        record("List everything", "r", Some("SELECT * FROM players")),
        record(
            "How many points did Curry score?",
            "r",
            Some("SELECT p.name, s.pts, s.reb, s.ast, s.season FROM players p JOIN player_stats s ON p.id = s.player_id"),
        ),
        record(
            "Who has the most assists?",
            "r",
            Some("SELECT MAX(ast) FROM player_stats"),
        ),
        record("no select", "r", Some("PRAGMA table_info(players)")),
    ];

    let report = analyze_column_selection(&results, &patterns);
    assert_eq!(report.total_queries, 3);
    assert_eq!(report.select_star, 1);
    assert!((report.avg_columns_selected - 3.0).abs() < 1e-9);
    assert_eq!(report.over_selection, 1);
    assert_eq!(report.over_selection_examples[0].column_count, 5);
    assert_eq!(report.under_selection, 1);
    assert_eq!(
        report.under_selection_examples[0].reason,
        "Missing player name column"
    );
    assert!((report.under_selection_rate - 100.0 / 3.0).abs() < 1e-9);
}

#[test]
fn selection_checks_match_question_intent() {
    assert!(!is_over_selection("How many games?", 3));
    assert!(is_over_selection("What is the record?", 4));
    assert!(!is_over_selection("List the roster", 10));
    assert!(is_under_selection("Who won?", "MAX(pts)", "SELECT MAX(pts) FROM s"));
    assert!(!is_under_selection(
        "Who won?",
        "first_name, MAX(pts)",
        "SELECT first_name, MAX(pts) FROM s"
    ));
}

#[test]
fn response_quality_buckets_verbosity_and_hedging() {
    let patterns = patterns();
    let long_answer = "word ".repeat(60);
    let results = vec![
        record("q1", "Approximately 27 points per game.", None),
        record("q2", &long_answer, None),
        record("q3", "", None),
    ];

    let report = analyze_response_quality(&results, &patterns);
    assert_eq!(report.total_responses, 3);
    assert_eq!(report.analyzed_responses, 2);
    assert_eq!(report.verbosity["minimal"], 1);
    assert_eq!(report.verbosity["moderate"], 1);
    assert_eq!(report.responses_with_hedging, 1);
    assert_eq!(report.hedging_phrases["approximately"], 1);
    assert!((report.hedging_rate - 50.0).abs() < 1e-9);
    assert_eq!(Verbosity::from_word_count(10), Verbosity::Concise);
    assert_eq!(Verbosity::from_word_count(151), Verbosity::Verbose);
}

#[test]
fn requested_and_delivered_counts_come_from_question_and_response() {
    let patterns = patterns();
    assert_eq!(requested_count("Who are the top 5 scorers?", &patterns), Some(5));
    assert_eq!(requested_count("List three players from Denver", &patterns), Some(3));
    assert_eq!(requested_count("Who are the top scorers?", &patterns), None);
    assert_eq!(requested_count("How many points?", &patterns), None);

    let numbered = "1. Jokic\n2. Embiid\n3) Doncic";
    assert_eq!(delivered_count(numbered, &patterns), 3);
    let bullets = "- Curry\n- Thompson";
    assert_eq!(delivered_count(bullets, &patterns), 2);
    assert_eq!(delivered_count("Just Curry.", &patterns), 0);
}

#[test]
fn completeness_flags_short_lists() {
    let patterns = patterns();
    let results = vec![
        record("Top 3 rebounders?", "1. Sabonis\n2. Gobert", None),
        record("Top 2 passers?", "1. Haliburton\n2. Young", None),
    ];

    let report = analyze_response_quality(&results, &patterns);
    let completeness = &report.completeness;
    assert_eq!(completeness.questions_requesting_n, 2);
    assert_eq!(completeness.complete, 1);
    assert_eq!(completeness.incomplete, 1);
    assert_eq!(completeness.incomplete_examples[0].requested, 3);
    assert_eq!(completeness.incomplete_examples[0].delivered, 2);
}

#[test]
fn ground_truth_full_match_within_tolerance() {
    let patterns = patterns();
    let ground_truth = json!({"pts": 2485});
    let outcome = match_ground_truth("LeBron scored 2485 points", Some(&ground_truth), &patterns);
    assert_eq!(outcome.verdict, MatchVerdict::Full);
}

#[test]
fn ground_truth_tolerance_is_exactly_half_a_unit() {
    let patterns = patterns();
    assert_eq!(GROUND_TRUTH_TOLERANCE, 0.5);
    let ground_truth = json!({"pts": 2485});
    let outcome = match_ground_truth("around 2480 points", Some(&ground_truth), &patterns);
    assert_eq!(outcome.verdict, MatchVerdict::Fail);

    let ground_truth = json!({"ppg": 27.1});
    let outcome = match_ground_truth("He averaged 27.5 points", Some(&ground_truth), &patterns);
    assert_eq!(outcome.verdict, MatchVerdict::Full);
}

#[test]
fn ground_truth_decline_phrase_forces_fail() {
    let patterns = patterns();
    let ground_truth = json!({"pts": 2485});
    let outcome = match_ground_truth(
        "I don't have that data but it's around 2485",
        Some(&ground_truth),
        &patterns,
    );
    assert_eq!(outcome.verdict, MatchVerdict::Fail);
    assert!(outcome.detail.contains("i don't have"));
}

#[test]
fn ground_truth_partial_and_no_gt_cases() {
    let patterns = patterns();
    let ground_truth = json!({"name": "Nikola Jokic", "reb": 976, "ast": 708});
    let outcome = match_ground_truth(
        "Jokic grabbed 976 rebounds and dished 1,000 assists",
        Some(&ground_truth),
        &patterns,
    );
    assert_eq!(outcome.verdict, MatchVerdict::Partial);
    assert_eq!(outcome.detail, "1/2 expected values matched");

    assert_eq!(
        match_ground_truth("anything", None, &patterns).verdict,
        MatchVerdict::NoGt
    );
    let text_only = json!({"team": "Denver"});
    assert_eq!(
        match_ground_truth("Denver", Some(&text_only), &patterns).verdict,
        MatchVerdict::NoGt
    );
}

#[test]
fn ground_truth_list_flattens_numeric_values() {
    let patterns = patterns();
    let ground_truth = json!([
        {"name": "Joel Embiid", "ppg": 34.7},
        {"name": "Luka Doncic", "ppg": 33.9}
    ]);
    let outcome = match_ground_truth(
        "1. Embiid - 34.7 ppg\n2. Doncic - 33.9 ppg",
        Some(&ground_truth),
        &patterns,
    );
    assert_eq!(outcome.verdict, MatchVerdict::Full);

    let outcome = match_ground_truth("Embiid led with 34.7", Some(&ground_truth), &patterns);
    assert_eq!(outcome.verdict, MatchVerdict::Partial);
}

#[test]
fn ground_truth_extracts_comma_grouped_thousands() {
    let patterns = patterns();
    let ground_truth = json!({"pts": 40474});
    let outcome = match_ground_truth(
        "His career total is 40,474 points.",
        Some(&ground_truth),
        &patterns,
    );
    assert_eq!(outcome.verdict, MatchVerdict::Full);
}

#[test]
fn ground_truth_report_rolls_up_by_category() {
    let patterns = patterns();
    let mut hit = record("q1", "He scored 30 points", None);
    hit.ground_truth = Some(json!({"pts": 30}));
    hit.category = Some("simple".to_string());
    let mut miss = record("q2", "He scored 12 points", None);
    miss.ground_truth = Some(json!({"pts": 30}));
    miss.category = Some("simple".to_string());
    let untracked = record("q3", "no ground truth here", None);

    let report = analyze_ground_truth(&[hit, miss, untracked], &patterns);
    assert_eq!(report.records_with_ground_truth, 2);
    assert_eq!(report.full, 1);
    assert_eq!(report.fail, 1);
    assert_eq!(report.judged, 2);
    assert!((report.accuracy - 50.0).abs() < 1e-9);
    assert!((report.by_category["simple"].accuracy - 50.0).abs() < 1e-9);
    assert_eq!(report.failures.len(), 1);
}

#[test]
fn analyze_batch_merges_every_analyzer_and_renders_markdown() {
    let patterns = patterns();
    let mut results = vec![
        record("q1", "", None),
        record(
            "Who scored the most points?",
            "Joel Embiid scored approximately 2,183 points.",
            Some("SELECT p.name, SUM(s.pts) FROM players p JOIN player_stats s ON p.id = s.player_id GROUP BY p.name ORDER BY 2 DESC LIMIT 1"),
        ),
    ];
    results[1].ground_truth = Some(json!({"pts": 2183}));

    let report = analyze_batch(&results, &patterns, BatchSource::default());
    assert_eq!(report.record_count, 2);
    assert_eq!(report.error_taxonomy.total_errors, 1);
    assert_eq!(report.query_structure.total_queries, 1);
    assert_eq!(report.ground_truth.full, 1);

    let markdown = render_markdown(&report).expect("markdown should render");
    assert!(markdown.starts_with("# Evaluation Analysis Report"));
    assert!(markdown.contains("## Error Taxonomy"));
    assert!(markdown.contains("## Ground Truth"));
    assert!(markdown.contains("| moderate | 1 |"));

    let value = serde_json::to_value(&report).expect("report should serialize");
    assert_eq!(value["error_taxonomy"]["total_errors"], 1);
    assert_eq!(value["column_selection"]["column_count_distribution"]["2"], 1);
}

#[test]
fn markdown_escapes_pipes_in_category_cells() {
    let patterns = patterns();
    let mut result = record("How many points?", "He scored 2183 points.", None);
    result.category = Some("guard|forward".to_string());
    result.ground_truth = Some(json!({"pts": 2183}));

    let report = analyze_batch(&[result], &patterns, BatchSource::default());
    let markdown = render_markdown(&report).expect("markdown should render");

    assert!(markdown.contains("| guard\\|forward | 1 | 0 | 0.0% |"));
    assert!(markdown.contains("| guard\\|forward | 1 | 0 | 0 | 100.0% |"));
    assert!(!markdown.contains("| guard|forward |"));
}
