//! # MLflow REST Types
//!
//! JSON bodies of the MLflow REST API 2.0 endpoints used by the client.

use promoter_core::{LifecycleStage, ModelVersion, RegistryError, VersionStatus};
use serde::{Deserialize, Serialize};

/// Error code MLflow returns when a resource is missing.
pub const RESOURCE_DOES_NOT_EXIST: &str = "RESOURCE_DOES_NOT_EXIST";

/// Error code MLflow returns when creating something that already exists.
pub const RESOURCE_ALREADY_EXISTS: &str = "RESOURCE_ALREADY_EXISTS";

// =============================================================================
// ERRORS
// =============================================================================

/// Error body returned by MLflow on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error_code: String,
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// RUNS
// =============================================================================

/// `GET runs/get` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRunResponse {
    pub run: RunJson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunJson {
    pub info: RunInfoJson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfoJson {
    pub run_id: String,
    /// Root under which the run's artifacts are stored.
    pub artifact_uri: String,
}

// =============================================================================
// REGISTERED MODELS
// =============================================================================

/// `POST registered-models/create` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRegisteredModelRequest {
    pub name: String,
}

// =============================================================================
// MODEL VERSIONS
// =============================================================================

/// `POST model-versions/create` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateModelVersionRequest {
    pub name: String,
    pub source: String,
    pub run_id: String,
}

/// `POST model-versions/transition-stage` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionStageRequest {
    pub name: String,
    pub version: String,
    pub stage: String,
    pub archive_existing_versions: bool,
}

/// Response of every endpoint that returns a single model version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVersionResponse {
    pub model_version: ModelVersionJson,
}

/// A model version on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelVersionJson {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl ModelVersionJson {
    /// Registration status; a missing field means the version is ready.
    pub fn status(&self) -> Result<VersionStatus, RegistryError> {
        match self.status.as_deref() {
            None => Ok(VersionStatus::Ready),
            Some(raw) => serde_json::from_value(serde_json::Value::from(raw))
                .map_err(|_| RegistryError::Parse(format!("unknown version status '{}'", raw))),
        }
    }

    /// Convert into the registry-neutral version type.
    pub fn into_model_version(self) -> Result<ModelVersion, RegistryError> {
        let status = self.status()?;
        let current_stage = match self.current_stage.as_deref() {
            None => LifecycleStage::None,
            Some(raw) => raw
                .parse::<LifecycleStage>()
                .map_err(|e| RegistryError::Parse(e.to_string()))?,
        };
        Ok(ModelVersion {
            name: self.name,
            version: self.version,
            current_stage,
            status,
            source: self.source,
            run_id: self.run_id,
        })
    }
}
