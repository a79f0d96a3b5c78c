//! # CLI Command Implementations
//!
//! Each command returns the process exit code. The credential is resolved
//! before anything else happens so a missing token never reaches the
//! registry or the info file.

use super::{EXIT_CONFIG, EXIT_FAILURE, EXIT_SUCCESS};
use crate::config::{ConfigError, Settings};
use crate::mlflow::{ClientConfig, MlflowClient};
use crate::runner::{self, RunOutcome};
use promoter_core::Registrar;
use std::io::Write;

/// Log and print a startup error and return [`EXIT_CONFIG`].
pub fn startup_failure(err: &ConfigError) -> i32 {
    tracing::error!("Startup configuration error: {}", err);
    eprintln!("Error: {}", err);
    EXIT_CONFIG
}

/// Resolve the credential and build the registry client.
fn connect(
    settings: &Settings,
    env: impl Fn(&str) -> Option<String>,
) -> Result<MlflowClient, i32> {
    let credential = settings
        .credential(env)
        .map_err(|e| startup_failure(&e))?;

    let client = MlflowClient::new(ClientConfig::from_settings(settings, credential)).map_err(|e| {
        tracing::error!("Cannot create registry client: {}", e);
        eprintln!("Error: {}", e);
        EXIT_CONFIG
    })?;

    tracing::info!(tracking_uri = %settings.tracking.uri, "Tracking server configured");
    Ok(client)
}

// =============================================================================
// REGISTER COMMAND
// =============================================================================

/// Register the configured run record and promote the new version.
pub fn cmd_register<W: Write>(
    settings: &Settings,
    env: impl Fn(&str) -> Option<String>,
    out: &mut W,
) -> i32 {
    let client = match connect(settings, env) {
        Ok(client) => client,
        Err(code) => return code,
    };

    match runner::run(&settings.registration, &client, out) {
        RunOutcome::Promoted(_) => EXIT_SUCCESS,
        RunOutcome::Failed(_) => EXIT_FAILURE,
    }
}

// =============================================================================
// TRANSITION COMMAND
// =============================================================================

/// Move an existing version of the configured model to the target stage.
pub fn cmd_transition<W: Write>(
    settings: &Settings,
    version: &str,
    env: impl Fn(&str) -> Option<String>,
    out: &mut W,
) -> i32 {
    let client = match connect(settings, env) {
        Ok(client) => client,
        Err(code) => return code,
    };

    let registrar = Registrar::with_options(&client, settings.registration.options.clone());
    match registrar.promote(&settings.registration.model_name, version, out) {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            if let Err(write_err) = writeln!(out, "Error: {}", e) {
                tracing::warn!("Cannot print error message: {}", write_err);
            }
            EXIT_FAILURE
        }
    }
}

// =============================================================================
// CONFIG COMMAND
// =============================================================================

/// Print the resolved configuration. The credential value is never shown.
pub fn cmd_config<W: Write>(
    settings: &Settings,
    env: impl Fn(&str) -> Option<String>,
    out: &mut W,
) -> i32 {
    let credential_set = settings.credential(env).is_ok();
    match write_config(settings, credential_set, out) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            tracing::error!("Cannot print configuration: {}", e);
            EXIT_FAILURE
        }
    }
}

fn write_config<W: Write>(
    settings: &Settings,
    credential_set: bool,
    out: &mut W,
) -> std::io::Result<()> {
    let source = settings
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());
    let timeout = settings
        .tracking
        .timeout
        .map(|t| format!("{}s", t.as_secs()))
        .unwrap_or_else(|| "client default".to_string());
    let reg = &settings.registration;

    writeln!(out, "Configuration ({}):", source)?;
    writeln!(out, "  Tracking URI:   {}", settings.tracking.uri)?;
    writeln!(
        out,
        "  Credential:     ${} ({}, {})",
        settings.tracking.credential_env,
        if credential_set { "set" } else { "NOT SET" },
        settings.tracking.auth
    )?;
    writeln!(out, "  Timeout:        {}", timeout)?;
    writeln!(out, "  Model name:     {}", reg.model_name)?;
    writeln!(out, "  Info file:      {}", reg.info_path.display())?;
    writeln!(out, "  Artifact path:  {}", reg.options.artifact_path)?;
    writeln!(out, "  Target stage:   {}", reg.options.target_stage)?;
    writeln!(out, "  Archive others: {}", reg.options.archive_existing)?;
    writeln!(out, "  Await ready:    {}s", reg.await_ready.as_secs())?;
    Ok(())
}
