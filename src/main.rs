mod analysis;
mod cli;
mod commands;
mod model;
mod util;

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

const DEFAULT_LOG_FILTER: &str = "nba_eval=info";

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_filter.as_deref());

    let command = cli.command.name();
    let started = Instant::now();
    match run(cli.command) {
        Ok(()) => info!(
            command,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "command finished"
        ),
        Err(err) => {
            error!(command, error = %err, "command failed");
            for cause in err.chain().skip(1) {
                error!(cause = %cause, "caused by");
            }
            std::process::exit(1);
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Classify(args) => commands::classify::run(args),
        Commands::Match(args) => commands::classify::run_match(args),
        Commands::GroundTruth(args) => commands::ground_truth::run(args),
    }
}

// --log-filter wins over RUST_LOG; both take EnvFilter directives.
fn init_tracing(log_filter: Option<&str>) {
    let env_filter = log_filter
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
