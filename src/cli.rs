use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "nba-eval",
    version,
    about = "Quality analysis for NBA chatbot evaluation runs"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Analyze(AnalyzeArgs),
    Classify(ClassifyArgs),
    Match(MatchArgs),
    GroundTruth(GroundTruthArgs),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Analyze(_) => "analyze",
            Self::Classify(_) => "classify",
            Self::Match(_) => "match",
            Self::GroundTruth(_) => "ground-truth",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(long)]
    pub results: PathBuf,

    #[arg(long)]
    pub ground_truth: Option<PathBuf>,

    #[arg(long, default_value = ".cache/nba-eval/reports")]
    pub out_dir: PathBuf,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    #[arg(long)]
    pub response: String,

    #[arg(long, default_value = "")]
    pub question: String,
}

#[derive(Args, Debug, Clone)]
pub struct MatchArgs {
    #[arg(long)]
    pub response: String,

    #[arg(long)]
    pub ground_truth: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct GroundTruthArgs {
    #[arg(long)]
    pub db_path: PathBuf,

    #[arg(long)]
    pub cases: PathBuf,

    #[arg(long, default_value = ".cache/nba-eval/ground_truth.json")]
    pub output: PathBuf,
}
