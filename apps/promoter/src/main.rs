//! # promoter
//!
//! Registers the model produced by a tracked training run and moves the new
//! registry version to Staging.
//!
//! ```text
//! reports/experiment_info.json ──► runs:/<run_id>/model ──► final_model vN ──► Staging
//! ```
//!
//! ## Usage
//!
//! ```bash
//! export PROMOTER_TRACKING_TOKEN=...
//! promoter --tracking-uri https://dagshub.com/<owner>/<repo>.mlflow
//! promoter register -i reports/experiment_info.json -m final_model
//! promoter transition 3 --stage Production
//! promoter --quiet config
//! ```

use clap::Parser;
use promoter::cli;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // PROMOTER_LOG_FORMAT=json enables machine-parseable output.
    // Logs go to stderr, stdout carries the confirmation lines.
    let log_format = std::env::var("PROMOTER_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = match cli.forced_log_filter() {
        Some(forced) => EnvFilter::new(forced),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(cli::DEFAULT_LOG_FILTER)),
    };

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    std::process::exit(cli::execute(cli));
}
