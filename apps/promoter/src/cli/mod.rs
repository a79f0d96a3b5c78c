//! # Promoter CLI Module
//!
//! ## Available Commands
//!
//! - `register` - Register the run from the info file and promote it (default)
//! - `transition` - Move an existing model version to a stage
//! - `config` - Show the resolved configuration

mod commands;

use crate::config::{Overrides, Settings};
use clap::{Args, Parser, Subcommand};
use promoter_core::LifecycleStage;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// EXIT CODES
// =============================================================================

pub const EXIT_SUCCESS: i32 = 0;

/// The pipeline ran and failed (logged and printed).
pub const EXIT_FAILURE: i32 = 1;

/// Startup configuration was unusable; nothing was attempted.
///
/// Distinct from 2, which clap uses for usage errors.
pub const EXIT_CONFIG: i32 = 3;

// =============================================================================
// LOG FILTERS
// =============================================================================

/// Log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "promoter=info,promoter_core=info";

/// Log filter under `--quiet`: warnings and errors only. Overrides `RUST_LOG`.
pub const QUIET_LOG_FILTER: &str = "promoter=warn,promoter_core=warn";

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Register a tracked model run in an MLflow model registry and move the
/// new version to Staging.
#[derive(Parser, Debug)]
#[command(name = "promoter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML config file (default: ./promoter.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// MLflow tracking server URL
    #[arg(short = 'u', long, global = true)]
    pub tracking_uri: Option<String>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register the run named in the info file and move it to the target stage
    Register(RegisterArgs),

    /// Move an existing model version to a stage
    Transition {
        /// Registry version number
        #[arg(value_name = "VERSION")]
        model_version: String,

        /// Registered model name
        #[arg(short, long)]
        model_name: Option<String>,

        /// Target stage (None, Staging, Production, Archived)
        #[arg(short, long)]
        stage: Option<LifecycleStage>,

        /// Archive versions already in the target stage
        #[arg(long)]
        archive_existing: bool,
    },

    /// Show the resolved configuration
    Config,
}

/// Options of the `register` command.
#[derive(Args, Debug, Default)]
pub struct RegisterArgs {
    /// Run record (JSON with a `run_id` field)
    #[arg(short, long)]
    pub info_file: Option<PathBuf>,

    /// Registered model name
    #[arg(short, long)]
    pub model_name: Option<String>,

    /// Target stage (None, Staging, Production, Archived)
    #[arg(short, long)]
    pub stage: Option<LifecycleStage>,

    /// Artifact path the model was logged under
    #[arg(short, long)]
    pub artifact_path: Option<String>,

    /// Archive versions already in the target stage
    #[arg(long)]
    pub archive_existing: bool,
}

impl Commands {
    /// Command-line values that override file and environment settings.
    fn overrides(&self, tracking_uri: Option<String>) -> Overrides {
        let base = Overrides {
            tracking_uri,
            ..Overrides::default()
        };
        match self {
            Commands::Register(args) => Overrides {
                model_name: args.model_name.clone(),
                info_path: args.info_file.clone(),
                artifact_path: args.artifact_path.clone(),
                stage: args.stage,
                archive_existing: args.archive_existing.then_some(true),
                ..base
            },
            Commands::Transition {
                model_name,
                stage,
                archive_existing,
                ..
            } => Overrides {
                model_name: model_name.clone(),
                stage: *stage,
                archive_existing: archive_existing.then_some(true),
                ..base
            },
            Commands::Config => base,
        }
    }
}

impl Cli {
    /// Fixed log filter for this invocation, if flags force one.
    pub fn forced_log_filter(&self) -> Option<&'static str> {
        self.quiet.then_some(QUIET_LOG_FILTER)
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and return the process exit code.
pub fn execute(cli: Cli) -> i32 {
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Register(RegisterArgs::default()));
    let overrides = command.overrides(cli.tracking_uri);

    let settings = match Settings::load(cli.config.as_deref(), &overrides) {
        Ok(settings) => settings,
        Err(e) => return startup_failure(&e),
    };

    let env = |key: &str| std::env::var(key).ok();
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::Register(_) => cmd_register(&settings, env, &mut stdout),
        Commands::Transition { model_version, .. } => {
            cmd_transition(&settings, &model_version, env, &mut stdout)
        }
        Commands::Config => cmd_config(&settings, env, &mut stdout),
    }
}
