//! # Registrar
//!
//! Registers a tracked run's model as a new version and promotes that
//! version to the target lifecycle stage.
//!
//! ## Flow
//!
//! ```text
//! ModelInfo ──run_id──► runs:/<run_id>/<artifact_path>
//!                              │
//!                              ▼
//!                   registry.register_model ──► version N
//!                              │
//!                              ▼
//!                   registry.transition_stage(N, Staging)
//! ```
//!
//! The record and model name are validated before the registry is called.
//! A failed registration never reaches the stage transition. Nothing is
//! retried or rolled back.

use crate::registry::ModelRegistry;
use crate::stage::DEFAULT_TARGET_STAGE;
use crate::types::DEFAULT_ARTIFACT_PATH;
use crate::{LifecycleStage, ModelInfo, ModelUri, ModelVersion, PromoterError};
use serde::{Deserialize, Serialize};
use std::io::Write;

// =============================================================================
// OPTIONS
// =============================================================================

/// How a run is registered and which stage it lands in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrarOptions {
    /// Artifact path the model was logged under inside the run.
    pub artifact_path: String,
    /// Stage the new version is moved to.
    pub target_stage: LifecycleStage,
    /// Archive versions already sitting in `target_stage`.
    pub archive_existing: bool,
}

impl Default for RegistrarOptions {
    fn default() -> Self {
        Self {
            artifact_path: DEFAULT_ARTIFACT_PATH.to_string(),
            target_stage: DEFAULT_TARGET_STAGE,
            archive_existing: false,
        }
    }
}

// =============================================================================
// PROMOTION REPORT
// =============================================================================

/// Outcome of a successful registration + stage transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub model_name: String,
    pub model_uri: ModelUri,
    /// The version as reported by the registry after the transition.
    pub version: ModelVersion,
    pub stage: LifecycleStage,
}

// =============================================================================
// REGISTRAR
// =============================================================================

/// Drives registration and promotion against a [`ModelRegistry`].
///
/// Confirmation lines go to the writer passed to each call so callers pick
/// the console (or a buffer in tests).
pub struct Registrar<'a, R: ModelRegistry + ?Sized> {
    registry: &'a R,
    options: RegistrarOptions,
}

impl<'a, R: ModelRegistry + ?Sized> Registrar<'a, R> {
    /// Create a registrar with default options (`model`, `Staging`).
    pub fn new(registry: &'a R) -> Self {
        Self::with_options(registry, RegistrarOptions::default())
    }

    /// Create a registrar with explicit options.
    pub fn with_options(registry: &'a R, options: RegistrarOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &RegistrarOptions {
        &self.options
    }

    /// Register the run described by `info` as a new version of
    /// `model_name`, then move it to the target stage.
    ///
    /// Writes `Registering model from: <uri>` before registering and
    /// `Model <name> v<version> moved to <stage>.` after the transition.
    /// Failures are logged and returned.
    pub fn register_and_promote<W: Write>(
        &self,
        model_name: &str,
        info: &ModelInfo,
        out: &mut W,
    ) -> Result<Promotion, PromoterError> {
        self.try_register_and_promote(model_name, info, out)
            .inspect_err(|e| tracing::error!(model = model_name, "{}", e))
    }

    /// Move an existing `version` of `model_name` to the target stage.
    pub fn promote<W: Write>(
        &self,
        model_name: &str,
        version: &str,
        out: &mut W,
    ) -> Result<ModelVersion, PromoterError> {
        validate_model_name(model_name)
            .and_then(|()| validate_version(version))
            .and_then(|()| self.transition(model_name, version, out))
            .inspect_err(|e| {
                tracing::error!(model = model_name, version, "{}", e);
            })
    }

    fn try_register_and_promote<W: Write>(
        &self,
        model_name: &str,
        info: &ModelInfo,
        out: &mut W,
    ) -> Result<Promotion, PromoterError> {
        validate_model_name(model_name)?;
        let run_id = info.run_id()?;

        let model_uri = ModelUri::new(run_id, self.options.artifact_path.as_str());
        writeln!(out, "Registering model from: {}", model_uri)?;

        let registered = self
            .registry
            .register_model(&model_uri, model_name)
            .map_err(PromoterError::Registration)?;
        tracing::info!(
            model = model_name,
            version = %registered.version,
            uri = %model_uri,
            "Registered new model version"
        );

        let version = self.transition(model_name, &registered.version, out)?;

        Ok(Promotion {
            model_name: model_name.to_string(),
            model_uri,
            version,
            stage: self.options.target_stage,
        })
    }

    fn transition<W: Write>(
        &self,
        model_name: &str,
        version: &str,
        out: &mut W,
    ) -> Result<ModelVersion, PromoterError> {
        let stage = self.options.target_stage;
        let updated = self
            .registry
            .transition_stage(model_name, version, stage, self.options.archive_existing)
            .map_err(PromoterError::Transition)?;

        tracing::info!(model = model_name, version, stage = %stage, "Stage transition complete");
        writeln!(out, "Model {} v{} moved to {}.", model_name, version, stage)?;
        Ok(updated)
    }
}

fn validate_model_name(name: &str) -> Result<(), PromoterError> {
    if name.trim().is_empty() {
        return Err(PromoterError::InvalidModelName);
    }
    Ok(())
}

/// Registry versions are positive decimal integers.
fn validate_version(version: &str) -> Result<(), PromoterError> {
    match version.parse::<u64>() {
        Ok(n) if n > 0 && !version.starts_with('+') => Ok(()),
        _ => Err(PromoterError::InvalidVersion(version.to_string())),
    }
}
