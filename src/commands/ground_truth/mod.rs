use anyhow::{Context, Result, bail};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{Map, Number, Value};
use tracing::{info, warn};

use crate::cli::GroundTruthArgs;
use crate::model::{GroundTruthCase, GroundTruthManifest};
use crate::util::{now_utc_string, read_json, sha256_file, write_json_pretty};

const MANIFEST_VERSION: u32 = 1;


pub fn run(args: GroundTruthArgs) -> Result<()> {
    if !args.db_path.exists() {
        bail!("database file not found: {}", args.db_path.display());
    }

    let cases: Vec<GroundTruthCase> = read_json(&args.cases)?;
    info!(
        path = %args.cases.display(),
        cases = cases.len(),
        "loaded ground truth cases"
    );

    let connection = Connection::open_with_flags(
        &args.db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open database read-only: {}", args.db_path.display()))?;

    let cases = generate_ground_truth(&connection, cases);
    let failed = cases.iter().filter(|case| case.error.is_some()).count();

    let manifest = GroundTruthManifest {
        manifest_version: MANIFEST_VERSION,
        generated_at: now_utc_string(),
        db_path: args.db_path.display().to_string(),
        db_sha256: sha256_file(&args.db_path)?,
        case_count: cases.len(),
        cases,
    };

    write_json_pretty(&args.output, &manifest)?;
    info!(
        path = %args.output.display(),
        cases = manifest.case_count,
        failed,
        "wrote ground truth manifest"
    );

    Ok(())
}

pub fn generate_ground_truth(
    connection: &Connection,
    cases: Vec<GroundTruthCase>,
) -> Vec<GroundTruthCase> {
    cases
        .into_iter()
        .map(|mut case| {
            match query_rows(connection, &case.sql) {
                Ok(rows) => {
                    case.row_count = Some(rows.len());
                    case.ground_truth = rows_to_ground_truth(rows);
                    case.error = None;
                }
                Err(err) => {
                    warn!(
                        question = %case.question,
                        error = %err,
                        "ground truth query failed"
                    );
                    case.row_count = None;
                    case.ground_truth = None;
                    case.error = Some(format!("{err:#}"));
                }
            }
            case
        })
        .collect()
}

fn query_rows(connection: &Connection, sql: &str) -> Result<Vec<Map<String, Value>>> {
    let mut statement = connection
        .prepare(sql)
        .with_context(|| format!("failed to prepare ground truth query: {sql}"))?;
    let columns = statement
        .column_names()
        .into_iter()
        .map(ToOwned::to_owned)
        .collect::<Vec<String>>();

    let mut rows = statement
        .query([])
        .context("failed to execute ground truth query")?;

    let mut records = Vec::new();
    while let Some(row) = rows.next().context("failed to read ground truth row")? {
        let mut record = Map::new();
        for (index, column) in columns.iter().enumerate() {
            let value = row
                .get_ref(index)
                .with_context(|| format!("failed to read column {column}"))?;
            record.insert(column.clone(), sqlite_value_to_json(value));
        }
        records.push(record);
    }

    Ok(records)
}

fn rows_to_ground_truth(mut rows: Vec<Map<String, Value>>) -> Option<Value> {
    match rows.len() {
        0 => None,
        1 => rows.pop().map(Value::Object),
        _ => Some(Value::Array(rows.into_iter().map(Value::Object).collect())),
    }
}

fn sqlite_value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(number) => Value::Number(number.into()),
        ValueRef::Real(number) => Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}
