use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::analysis::{BatchSource, PatternSet, analyze_batch, render_markdown};
use crate::cli::AnalyzeArgs;
use crate::model::{EvaluationResult, GroundTruthManifest, ResultBatchFile};
use crate::util::{now_utc_string, read_json, sha256_file, write_json_pretty, write_text};

const REPORT_JSON_FILENAME: &str = "analysis_report.json";
const REPORT_MARKDOWN_FILENAME: &str = "analysis_report.md";


pub fn run(args: AnalyzeArgs) -> Result<()> {
    let mut results = load_results(&args.results)?;
    info!(
        path = %args.results.display(),
        records = results.len(),
        "loaded evaluation results"
    );

    if let Some(ground_truth_path) = &args.ground_truth {
        let manifest: GroundTruthManifest = read_json(ground_truth_path)?;
        let attached = attach_ground_truth(&mut results, &manifest);
        info!(
            path = %ground_truth_path.display(),
            cases = manifest.case_count,
            attached,
            "attached ground truth"
        );
        if attached == 0 {
            warn!("no ground truth case matched a result question");
        }
    }

    let patterns = PatternSet::compile()?;
    let source = BatchSource {
        generated_at: now_utc_string(),
        source_path: args.results.display().to_string(),
        source_sha256: sha256_file(&args.results)?,
    };
    let report = analyze_batch(&results, &patterns, source);

    let json_path = args.out_dir.join(REPORT_JSON_FILENAME);
    write_json_pretty(&json_path, &report)?;
    info!(path = %json_path.display(), "wrote analysis report");

    let markdown_path = args.out_dir.join(REPORT_MARKDOWN_FILENAME);
    write_text(&markdown_path, &render_markdown(&report)?)?;
    info!(path = %markdown_path.display(), "wrote markdown report");

    info!(
        records = report.record_count,
        errors = report.error_taxonomy.total_errors,
        fallback_rate = report.fallback.fallback_rate,
        sql_queries = report.query_structure.total_queries,
        missing_joins = report.query_structure.correctness.missing_joins,
        gt_accuracy = report.ground_truth.accuracy,
        "analysis completed"
    );

    if args.json {
        let mut output = io::BufWriter::new(io::stdout().lock());
        serde_json::to_writer_pretty(&mut output, &report)
            .context("failed to serialize analysis report")?;
        writeln!(output)?;
        output.flush()?;
    }

    Ok(())
}

pub fn load_results(path: &Path) -> Result<Vec<EvaluationResult>> {
    let batch: ResultBatchFile = read_json(path)?;
    Ok(batch.into_results())
}

pub fn attach_ground_truth(
    results: &mut [EvaluationResult],
    manifest: &GroundTruthManifest,
) -> usize {
    let by_question = manifest
        .cases
        .iter()
        .filter(|case| case.error.is_none())
        .filter_map(|case| {
            case.ground_truth
                .as_ref()
                .map(|value| (case.question.trim(), value))
        })
        .collect::<HashMap<_, _>>();

    let mut attached = 0;
    for result in results
        .iter_mut()
        .filter(|result| result.ground_truth.is_none())
    {
        if let Some(value) = by_question.get(result.question.trim()) {
            result.ground_truth = Some((*value).clone());
            attached += 1;
        }
    }
    attached
}
