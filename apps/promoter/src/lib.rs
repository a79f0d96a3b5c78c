//! # promoter
//!
//! Command-line front end for `promoter-core`: resolves configuration, talks
//! to an MLflow tracking server and runs the registration pipeline once.

pub mod cli;
pub mod config;
pub mod mlflow;
pub mod runner;

pub use config::{ConfigError, Settings};
pub use runner::{RunOutcome, run};
