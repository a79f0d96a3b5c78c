//! # Core Types
//!
//! This module contains the data types shared by the registration flow:
//! - The run record read from disk (`ModelInfo`)
//! - The model URI derived from it (`ModelUri`)
//! - Registry-owned version entities (`ModelVersion`, `VersionStatus`)
//! - Error types (`PromoterError`, `RegistryError`)

use crate::stage::LifecycleStage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// =============================================================================
// RECORD KEYS
// =============================================================================

/// Key holding the tracking run identifier inside the run record.
pub const RUN_ID_KEY: &str = "run_id";

/// Artifact path used by `log_model()` when nothing else is configured.
pub const DEFAULT_ARTIFACT_PATH: &str = "model";

// =============================================================================
// MODEL INFO RECORD
// =============================================================================

/// The run record produced by the training/evaluation step.
///
/// Holds the exact JSON object parsed from disk. Only `run_id` is required
/// by the registration flow; every other key is kept untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelInfo {
    fields: Map<String, Value>,
}

impl ModelInfo {
    /// Wrap an already parsed JSON object.
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Look up a raw field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All parsed fields, in file order.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The run identifier, validated.
    ///
    /// Returns `MissingRunId` if the key is absent and `InvalidRunId` if the
    /// value is not a non-empty string.
    pub fn run_id(&self) -> Result<&str, PromoterError> {
        match self.fields.get(RUN_ID_KEY) {
            None => Err(PromoterError::MissingRunId),
            Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.as_str()),
            Some(other) => Err(PromoterError::InvalidRunId(other.to_string())),
        }
    }
}

impl From<Map<String, Value>> for ModelInfo {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

// =============================================================================
// MODEL URI
// =============================================================================

/// Reference to a model artifact stored under a tracking run.
///
/// Rendered as `runs:/<run_id>/<artifact_path>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelUri {
    pub run_id: String,
    pub artifact_path: String,
}

impl ModelUri {
    pub fn new(run_id: impl Into<String>, artifact_path: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            artifact_path: artifact_path.into().trim_matches('/').to_string(),
        }
    }
}

impl std::fmt::Display for ModelUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "runs:/{}/{}", self.run_id, self.artifact_path)
    }
}

// =============================================================================
// REGISTERED MODEL VERSION
// =============================================================================

/// Registration status of a model version as reported by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionStatus {
    PendingRegistration,
    FailedRegistration,
    Ready,
}

impl VersionStatus {
    /// Wire name of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::PendingRegistration => "PENDING_REGISTRATION",
            VersionStatus::FailedRegistration => "FAILED_REGISTRATION",
            VersionStatus::Ready => "READY",
        }
    }
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A version entity owned by the registry.
///
/// The version number is assigned by the registry and kept in its wire
/// form (a decimal string).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    pub version: String,
    pub current_stage: LifecycleStage,
    pub status: VersionStatus,
    pub source: Option<String>,
    pub run_id: Option<String>,
}

impl ModelVersion {
    /// A freshly registered version: stage `None`, status `READY`.
    pub fn ready(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            current_stage: LifecycleStage::None,
            status: VersionStatus::Ready,
            source: None,
            run_id: None,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Failures reported by a model registry backend.
///
/// Transient and permanent failures are not distinguished; callers never
/// retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The registry could not be reached.
    #[error("Cannot reach registry: {0}")]
    Unreachable(String),

    /// Credentials were rejected (401/403).
    #[error("Unauthorized: registry rejected the credentials")]
    Unauthorized,

    /// A referenced run, model or version does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The registry refused the request.
    #[error("Request rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    /// The registry failed internally (5xx).
    #[error("Registry error ({0}): {1}")]
    Server(u16, String),

    /// The registry answered with a body that could not be decoded.
    #[error("Invalid registry response: {0}")]
    Parse(String),

    /// The registry marked the new version as failed.
    #[error("Registration of {name} v{version} failed: {message}")]
    RegistrationFailed {
        name: String,
        version: String,
        message: String,
    },

    /// The new version did not become ready within the wait window.
    #[error("{name} v{version} still {status} after {waited_secs}s")]
    NotReady {
        name: String,
        version: String,
        status: VersionStatus,
        waited_secs: u64,
    },
}

/// Errors that can occur in the registration flow.
#[derive(Debug, Error)]
pub enum PromoterError {
    /// The run record could not be read.
    #[error("Cannot read {path}: {message}")]
    Io { path: String, message: String },

    /// The run record is not a JSON object.
    #[error("Cannot parse {path}: {message}")]
    Parse { path: String, message: String },

    /// The target model name is empty.
    #[error("Model name must not be empty")]
    InvalidModelName,

    /// The run record has no `run_id` key.
    #[error("Model info has no '{}' field", RUN_ID_KEY)]
    MissingRunId,

    /// The run record's `run_id` is not a non-empty string.
    #[error("Model info 'run_id' must be a non-empty string, got {0}")]
    InvalidRunId(String),

    /// A version number is not a positive integer.
    #[error("Invalid model version '{0}'")]
    InvalidVersion(String),

    /// The registry refused to create the new version.
    #[error("Model registration failed: {0}")]
    Registration(#[source] RegistryError),

    /// The registry refused the stage change.
    #[error("Stage transition failed: {0}")]
    Transition(#[source] RegistryError),

    /// The console writer failed.
    #[error("Output error: {0}")]
    Output(String),
}

impl From<std::io::Error> for PromoterError {
    fn from(err: std::io::Error) -> Self {
        PromoterError::Output(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
