use anyhow::{Context, Result};
use regex::Regex;

use super::ErrorCategory;

const DECLINE_PATTERNS: &[&str] = &[
    r"(?i)I cannot (answer|find|provide)",
    r"(?i)(database|data|schema|table) (does not|doesn't) contain",
    r"(?i)(not available|no (data|information))",
    r"(?i)(unable to|can't) (find|answer|provide)",
];

const SYNTAX_ERROR_PATTERNS: &[&str] = &[
    r"(?i)SQLite error",
    r"(?i)SQL syntax error",
    r#"(?i)near ".*": syntax error"#,
    r"(?i)no such (table|column)",
];

pub(crate) const AGGREGATION_FUNCTIONS: &[&str] = &["COUNT", "SUM", "AVG", "MAX", "MIN"];

const HEDGING_PHRASES: &[&str] = &[
    "approximately",
    "i think",
    "i believe",
    "possibly",
    "probably",
    "it seems",
    "it appears",
    "might be",
    "may be",
    "likely",
    "roughly",
    "around",
];

#[derive(Debug)]
pub struct LabeledPattern {
    pub source: &'static str,
    pub regex: Regex,
}

#[derive(Debug)]
pub struct PatternRule {
    pub category: ErrorCategory,
    pub patterns: Vec<LabeledPattern>,
}

#[derive(Debug)]
pub struct PatternSet {
    pub error_rules: Vec<PatternRule>,
    pub aggregations: Vec<(&'static str, Regex)>,
    pub hedging: Vec<(&'static str, Regex)>,
    pub where_clause: Regex,
    pub select_clause: Regex,
    pub select_star: Regex,
    pub response_number: Regex,
    pub requested_top_n: Regex,
    pub requested_n_items: Regex,
    pub numbered_line: Regex,
    pub bullet_line: Regex,
}

impl PatternSet {
    pub fn compile() -> Result<Self> {
        let error_rules = vec![
            PatternRule {
                category: ErrorCategory::Declined,
                patterns: compile_labeled(DECLINE_PATTERNS)?,
            },
            PatternRule {
                category: ErrorCategory::SyntaxError,
                patterns: compile_labeled(SYNTAX_ERROR_PATTERNS)?,
            },
        ];

        let aggregations = AGGREGATION_FUNCTIONS
            .iter()
            .map(|function| {
                Regex::new(&format!(r"\b{function}\b"))
                    .with_context(|| format!("failed to compile aggregation regex: {function}"))
                    .map(|regex| (*function, regex))
            })
            .collect::<Result<Vec<_>>>()?;

        let hedging = HEDGING_PHRASES
            .iter()
            .map(|phrase| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(phrase)))
                    .with_context(|| format!("failed to compile hedging regex: {phrase}"))
                    .map(|regex| (*phrase, regex))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            error_rules,
            aggregations,
            hedging,
            where_clause: compile(
                r"(?is)WHERE\s+(.*?)(?:ORDER BY|GROUP BY|HAVING|LIMIT|$)",
                "WHERE clause",
            )?,
            select_clause: compile(r"(?is)SELECT\s+(.*?)\s+FROM", "SELECT clause")?,
            select_star: compile(r"(?i)SELECT\s+\*", "SELECT *")?,
            response_number: compile(r"[\d,]+\.?\d*", "response number")?,
            requested_top_n: compile(r"(?i)\btop\s+(\w+)\b", "top-N request")?,
            requested_n_items: compile(
                r"(?i)\b(\w+)\s+(?:players|teams|leaders|scorers|rebounders|games|seasons)\b",
                "N-items request",
            )?,
            numbered_line: compile(r"(?m)^\s*\d+[.)]\s+\S", "numbered list line")?,
            bullet_line: compile(r"(?m)^\s*[-*•]\s+\S", "bullet list line")?,
        })
    }
}

fn compile(pattern: &str, label: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("failed to compile {label} regex"))
}

fn compile_labeled(sources: &[&'static str]) -> Result<Vec<LabeledPattern>> {
    sources
        .iter()
        .map(|source| {
            Ok(LabeledPattern {
                source: *source,
                regex: compile(source, source)?,
            })
        })
        .collect()
}
