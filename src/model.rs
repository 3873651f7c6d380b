use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_CATEGORY: &str = "unknown";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvaluationResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub question: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub response: String,
    #[serde(default)]
    pub generated_sql: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources_count: i64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth: Option<Value>,
}

impl EvaluationResult {
    pub fn sql(&self) -> Option<&str> {
        self.generated_sql.as_deref().filter(|sql| !sql.is_empty())
    }

    pub fn category(&self) -> &str {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|category| !category.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ResultBatchFile {
    Bare(Vec<EvaluationResult>),
    Wrapped { results: Vec<EvaluationResult> },
}

impl ResultBatchFile {
    pub fn into_results(self) -> Vec<EvaluationResult> {
        match self {
            Self::Bare(results) => results,
            Self::Wrapped { results } => results,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthCase {
    #[serde(default)]
    pub id: Option<String>,
    pub question: String,
    #[serde(default)]
    pub category: Option<String>,
    pub sql: String,
    #[serde(default)]
    pub ground_truth: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub db_path: String,
    pub db_sha256: String,
    pub case_count: usize,
    pub cases: Vec<GroundTruthCase>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
