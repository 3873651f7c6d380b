use std::io::{self, Write};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::analysis::{PatternSet, classify_error, match_ground_truth};
use crate::cli::{ClassifyArgs, MatchArgs};

pub fn run(args: ClassifyArgs) -> Result<()> {
    let patterns = PatternSet::compile()?;
    let classification = classify_error(&args.response, &args.question, &patterns);
    info!(
        category = classification.category.as_str(),
        "classified response"
    );

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "category: {}", classification.category.as_str())?;
    if let Some(pattern) = classification.matched_pattern {
        writeln!(output, "matched_pattern: {pattern}")?;
    }
    output.flush()?;
    Ok(())
}

pub fn run_match(args: MatchArgs) -> Result<()> {
    let ground_truth = parse_ground_truth_arg(args.ground_truth.as_deref())?;
    let patterns = PatternSet::compile()?;
    let outcome = match_ground_truth(&args.response, ground_truth.as_ref(), &patterns);
    info!(verdict = outcome.verdict.as_str(), "matched ground truth");

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "verdict: {}", outcome.verdict.as_str())?;
    writeln!(output, "detail: {}", outcome.detail)?;
    output.flush()?;
    Ok(())
}

fn parse_ground_truth_arg(raw: Option<&str>) -> Result<Option<Value>> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };

    let value = serde_json::from_str::<Value>(raw)
        .with_context(|| format!("failed to parse --ground-truth as JSON: {raw}"))?;
    Ok((!value.is_null()).then_some(value))
}

#[cfg(test)]
mod tests {
    use super::parse_ground_truth_arg;
    use serde_json::json;

    #[test]
    fn parse_ground_truth_arg_handles_missing_and_null() {
        assert_eq!(parse_ground_truth_arg(None).expect("none is valid"), None);
        assert_eq!(parse_ground_truth_arg(Some("  ")).expect("blank is valid"), None);
        assert_eq!(parse_ground_truth_arg(Some("null")).expect("null is valid"), None);
    }

    #[test]
    fn parse_ground_truth_arg_reads_objects_and_rejects_garbage() {
        assert_eq!(
            parse_ground_truth_arg(Some(r#"{"pts": 2485}"#)).expect("object is valid"),
            Some(json!({"pts": 2485}))
        );
        let error = parse_ground_truth_arg(Some("{pts"))
            .expect_err("malformed json should be rejected");
        assert!(error.to_string().contains("--ground-truth"));
    }
}
