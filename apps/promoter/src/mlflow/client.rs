//! # MLflow HTTP Client
//!
//! Blocking wrapper around the MLflow REST API implementing
//! [`ModelRegistry`].

use super::types::{
    ApiErrorBody, CreateModelVersionRequest, CreateRegisteredModelRequest, GetRunResponse,
    ModelVersionJson, ModelVersionResponse, RESOURCE_ALREADY_EXISTS, RESOURCE_DOES_NOT_EXIST,
    RunInfoJson, TransitionStageRequest,
};
use crate::config::{AuthScheme, Credential, Settings};
use promoter_core::{
    LifecycleStage, ModelRegistry, ModelUri, ModelVersion, RegistryError, VersionStatus,
};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

/// Path of the REST API below the tracking URI.
pub const API_PREFIX: &str = "api/2.0/mlflow";

/// Delay between readiness checks of a pending version.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// CLIENT CONFIG
// =============================================================================

/// Everything needed to talk to one tracking server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub tracking_uri: String,
    pub credential: Option<Credential>,
    pub auth: AuthScheme,
    /// `None` keeps reqwest's default.
    pub timeout: Option<Duration>,
    /// Zero returns pending versions without waiting.
    pub await_ready: Duration,
    pub poll_interval: Duration,
}

impl ClientConfig {
    /// Unauthenticated client config with default waiting behaviour.
    pub fn new(tracking_uri: impl Into<String>) -> Self {
        Self {
            tracking_uri: tracking_uri.into(),
            credential: None,
            auth: AuthScheme::default(),
            timeout: None,
            await_ready: Duration::ZERO,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Client config for resolved settings and a credential.
    pub fn from_settings(settings: &Settings, credential: Credential) -> Self {
        Self {
            tracking_uri: settings.tracking.uri.clone(),
            credential: Some(credential),
            auth: settings.tracking.auth,
            timeout: settings.tracking.timeout,
            await_ready: settings.registration.await_ready,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP client for an MLflow tracking server's model registry.
pub struct MlflowClient {
    http: Client,
    api_base: String,
    credential: Option<Credential>,
    auth: AuthScheme,
    await_ready: Duration,
    poll_interval: Duration,
}

impl MlflowClient {
    /// Build a client. No request is sent.
    pub fn new(config: ClientConfig) -> Result<Self, RegistryError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| RegistryError::Unreachable(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: format!("{}/{}", config.tracking_uri.trim_end_matches('/'), API_PREFIX),
            credential: config.credential,
            auth: config.auth,
            await_ready: config.await_ready,
            poll_interval: config.poll_interval,
        })
    }

    /// Base URL of the REST API.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build a request with the configured authentication.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.api_base, path);
        let req = self.http.request(method, &url);
        match (&self.credential, self.auth) {
            (Some(token), AuthScheme::Basic) => req.basic_auth(token.expose(), Some(token.expose())),
            (Some(token), AuthScheme::Bearer) => req.bearer_auth(token.expose()),
            (None, _) => req,
        }
    }

    /// Send a request, check the status and decode the JSON body.
    fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, RegistryError> {
        let resp = req
            .send()
            .map_err(|e| RegistryError::Unreachable(format!("{}: {e}", self.api_base)))?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<T>()
                .map_err(|e| RegistryError::Parse(e.to_string()));
        }

        let body = resp.text().unwrap_or_default();
        Err(classify_error(status, &body))
    }

    /// GET runs/get → the run's artifact root.
    pub fn get_run(&self, run_id: &str) -> Result<RunInfoJson, RegistryError> {
        tracing::debug!(run_id, "Resolving run");
        let req = self
            .request(Method::GET, "runs/get")
            .query(&[("run_id", run_id)]);
        let resp: GetRunResponse = self.send(req)?;
        Ok(resp.run.info)
    }

    /// POST registered-models/create. An existing model is not an error.
    pub fn create_registered_model(&self, name: &str) -> Result<(), RegistryError> {
        let body = CreateRegisteredModelRequest {
            name: name.to_string(),
        };
        let req = self
            .request(Method::POST, "registered-models/create")
            .json(&body);
        match self.send::<serde_json::Value>(req) {
            Ok(_) => {
                tracing::info!(model = name, "Created registered model");
                Ok(())
            }
            Err(RegistryError::Rejected { code, .. }) if code == RESOURCE_ALREADY_EXISTS => {
                tracing::info!(model = name, "Registered model already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// POST model-versions/create.
    pub fn create_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: &str,
    ) -> Result<ModelVersionJson, RegistryError> {
        let body = CreateModelVersionRequest {
            name: name.to_string(),
            source: source.to_string(),
            run_id: run_id.to_string(),
        };
        let req = self
            .request(Method::POST, "model-versions/create")
            .json(&body);
        let resp: ModelVersionResponse = self.send(req)?;
        Ok(resp.model_version)
    }

    /// GET model-versions/get.
    pub fn get_model_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<ModelVersionJson, RegistryError> {
        let req = self
            .request(Method::GET, "model-versions/get")
            .query(&[("name", name), ("version", version)]);
        let resp: ModelVersionResponse = self.send(req)?;
        Ok(resp.model_version)
    }

    /// Poll a freshly created version until it leaves `PENDING_REGISTRATION`.
    fn wait_until_ready(&self, created: ModelVersionJson) -> Result<ModelVersionJson, RegistryError> {
        let started = Instant::now();
        let mut current = created;

        loop {
            match current.status()? {
                VersionStatus::Ready => return Ok(current),
                VersionStatus::FailedRegistration => {
                    return Err(RegistryError::RegistrationFailed {
                        message: current.status_message.clone().unwrap_or_default(),
                        name: current.name,
                        version: current.version,
                    });
                }
                VersionStatus::PendingRegistration => {}
            }

            if self.await_ready.is_zero() {
                tracing::warn!(
                    model = %current.name,
                    version = %current.version,
                    "Version still pending registration, not waiting"
                );
                return Ok(current);
            }
            if started.elapsed() >= self.await_ready {
                return Err(RegistryError::NotReady {
                    name: current.name,
                    version: current.version,
                    status: VersionStatus::PendingRegistration,
                    waited_secs: self.await_ready.as_secs(),
                });
            }

            tracing::debug!(
                model = %current.name,
                version = %current.version,
                "Waiting for version to become ready"
            );
            std::thread::sleep(self.poll_interval);
            current = self.get_model_version(&current.name, &current.version)?;
        }
    }
}

impl ModelRegistry for MlflowClient {
    fn register_model(
        &self,
        model_uri: &ModelUri,
        name: &str,
    ) -> Result<ModelVersion, RegistryError> {
        let run = self.get_run(&model_uri.run_id)?;
        let source = format!(
            "{}/{}",
            run.artifact_uri.trim_end_matches('/'),
            model_uri.artifact_path
        );

        self.create_registered_model(name)?;
        let created = self.create_model_version(name, &source, &model_uri.run_id)?;
        tracing::info!(
            model = name,
            version = %created.version,
            source = %source,
            "Created model version"
        );

        self.wait_until_ready(created)?.into_model_version()
    }

    fn transition_stage(
        &self,
        name: &str,
        version: &str,
        stage: LifecycleStage,
        archive_existing: bool,
    ) -> Result<ModelVersion, RegistryError> {
        let body = TransitionStageRequest {
            name: name.to_string(),
            version: version.to_string(),
            stage: stage.as_str().to_string(),
            archive_existing_versions: archive_existing,
        };
        let req = self
            .request(Method::POST, "model-versions/transition-stage")
            .json(&body);
        let resp: ModelVersionResponse = self.send(req)?;
        resp.model_version.into_model_version()
    }
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// Map a non-2xx response to a [`RegistryError`].
pub fn classify_error(status: StatusCode, body: &str) -> RegistryError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return RegistryError::Unauthorized;
    }

    let api = serde_json::from_str::<ApiErrorBody>(body).ok();

    if status.is_server_error() {
        let message = api.map(|e| e.message).unwrap_or_else(|| body.to_string());
        return RegistryError::Server(status.as_u16(), message);
    }

    match api {
        Some(e) if e.error_code == RESOURCE_DOES_NOT_EXIST => RegistryError::NotFound(e.message),
        Some(e) => RegistryError::Rejected {
            code: e.error_code,
            message: e.message,
        },
        None if status == StatusCode::NOT_FOUND => {
            RegistryError::NotFound(format!("HTTP 404: {}", body.trim()))
        }
        None => RegistryError::Rejected {
            code: format!("HTTP {}", status.as_u16()),
            message: body.trim().to_string(),
        },
    }
}
