//! # Configuration
//!
//! Settings are resolved once at startup and passed by reference.
//!
//! ## Layers (lowest to highest precedence)
//!
//! 1. Built-in defaults
//! 2. TOML file: `--config <path>`, or `promoter.toml` in the working
//!    directory when present
//! 3. Environment: `PROMOTER_TRACKING_URI`, `PROMOTER_MODEL_NAME`,
//!    `PROMOTER_INFO_PATH`
//! 4. Command-line flags
//!
//! ## Example
//!
//! ```toml
//! [tracking]
//! dagshub = { owner = "acme", repo = "sentiment" }
//! credential_env = "DAGSHUB_TOKEN"
//!
//! [registration]
//! model_name = "final_model"
//! info_path = "reports/experiment_info.json"
//! stage = "Staging"
//! ```
//!
//! The credential itself never lives in the file: only the name of the
//! environment variable that holds it.

use promoter_core::{DEFAULT_ARTIFACT_PATH, DEFAULT_TARGET_STAGE, LifecycleStage, RegistrarOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// DEFAULTS
// =============================================================================

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "promoter.toml";

/// Local MLflow tracking server.
pub const DEFAULT_TRACKING_URI: &str = "http://localhost:5000";

/// Environment variable holding the tracking credential.
pub const DEFAULT_CREDENTIAL_ENV: &str = "PROMOTER_TRACKING_TOKEN";

pub const DEFAULT_MODEL_NAME: &str = "final_model";

pub const DEFAULT_INFO_PATH: &str = "reports/experiment_info.json";

/// How long to wait for a new version to leave `PENDING_REGISTRATION`.
pub const DEFAULT_AWAIT_READY_SECS: u64 = 300;

pub const ENV_TRACKING_URI: &str = "PROMOTER_TRACKING_URI";
pub const ENV_MODEL_NAME: &str = "PROMOTER_MODEL_NAME";
pub const ENV_INFO_PATH: &str = "PROMOTER_INFO_PATH";

const DAGSHUB_URL: &str = "https://dagshub.com";

// =============================================================================
// ERRORS
// =============================================================================

/// Startup configuration errors. Any of these stops the process before
/// the run record is read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    MissingCredential(String),

    #[error("Cannot read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Invalid config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// CREDENTIAL
// =============================================================================

/// How the credential is presented to the tracking server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// HTTP basic auth with the token as both username and password.
    #[default]
    Basic,
    /// `Authorization: Bearer <token>`.
    Bearer,
}

impl std::fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthScheme::Basic => f.write_str("basic"),
            AuthScheme::Bearer => f.write_str("bearer"),
        }
    }
}

/// A tracking credential. `Debug` never shows the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

// =============================================================================
// FILE LAYER
// =============================================================================

/// A DagsHub repository whose MLflow endpoint is used for tracking.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DagsHubRepo {
    pub owner: String,
    pub repo: String,
}

impl DagsHubRepo {
    /// `https://dagshub.com/<owner>/<repo>.mlflow`
    pub fn tracking_uri(&self) -> String {
        format!("{}/{}/{}.mlflow", DAGSHUB_URL, self.owner, self.repo)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    tracking: TrackingFile,
    #[serde(default)]
    registration: RegistrationFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TrackingFile {
    uri: Option<String>,
    dagshub: Option<DagsHubRepo>,
    credential_env: Option<String>,
    auth: Option<AuthScheme>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistrationFile {
    model_name: Option<String>,
    info_path: Option<PathBuf>,
    artifact_path: Option<String>,
    stage: Option<String>,
    archive_existing: Option<bool>,
    await_ready_secs: Option<u64>,
}

// =============================================================================
// COMMAND-LINE LAYER
// =============================================================================

/// Values given on the command line. `None` leaves lower layers in place.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub tracking_uri: Option<String>,
    pub model_name: Option<String>,
    pub info_path: Option<PathBuf>,
    pub artifact_path: Option<String>,
    pub stage: Option<LifecycleStage>,
    pub archive_existing: Option<bool>,
}

// =============================================================================
// RESOLVED SETTINGS
// =============================================================================

/// Where the tracking server lives and how to authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingSettings {
    pub uri: String,
    pub credential_env: String,
    pub auth: AuthScheme,
    /// `None` keeps the HTTP client's default.
    pub timeout: Option<Duration>,
}

/// What to register and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationSettings {
    pub model_name: String,
    pub info_path: PathBuf,
    pub options: RegistrarOptions,
    /// Zero disables waiting.
    pub await_ready: Duration,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub tracking: TrackingSettings,
    pub registration: RegistrationSettings,
    /// The file the settings were read from, if any.
    pub source: Option<PathBuf>,
}

impl Settings {
    /// Resolve settings from the process environment and working directory.
    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
        };
        Self::resolve(path.as_deref(), overrides, |key| std::env::var(key).ok())
    }

    /// Resolve settings with an explicit environment lookup.
    ///
    /// `config_path`, when given, must exist.
    pub fn resolve(
        config_path: Option<&Path>,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file = match config_path {
            Some(path) => read_config_file(path)?,
            None => FileConfig::default(),
        };
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let tracking = file.tracking;
        let file_uri = match (tracking.uri, tracking.dagshub) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "tracking.uri and tracking.dagshub are mutually exclusive".to_string(),
                ));
            }
            (Some(uri), None) => Some(uri),
            (None, Some(repo)) => Some(repo.tracking_uri()),
            (None, None) => None,
        };
        let uri = overrides
            .tracking_uri
            .clone()
            .or_else(|| lookup(ENV_TRACKING_URI))
            .or(file_uri)
            .unwrap_or_else(|| DEFAULT_TRACKING_URI.to_string());

        let registration = file.registration;
        let model_name = overrides
            .model_name
            .clone()
            .or_else(|| lookup(ENV_MODEL_NAME))
            .or(registration.model_name)
            .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string());
        let info_path = overrides
            .info_path
            .clone()
            .or_else(|| lookup(ENV_INFO_PATH).map(PathBuf::from))
            .or(registration.info_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INFO_PATH));
        let file_stage = registration
            .stage
            .map(|s| s.parse::<LifecycleStage>())
            .transpose()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let options = RegistrarOptions {
            artifact_path: overrides
                .artifact_path
                .clone()
                .or(registration.artifact_path)
                .unwrap_or_else(|| DEFAULT_ARTIFACT_PATH.to_string()),
            target_stage: overrides
                .stage
                .or(file_stage)
                .unwrap_or(DEFAULT_TARGET_STAGE),
            archive_existing: overrides
                .archive_existing
                .or(registration.archive_existing)
                .unwrap_or(false),
        };

        let settings = Settings {
            tracking: TrackingSettings {
                uri: uri.trim().trim_end_matches('/').to_string(),
                credential_env: tracking
                    .credential_env
                    .unwrap_or_else(|| DEFAULT_CREDENTIAL_ENV.to_string()),
                auth: tracking.auth.unwrap_or_default(),
                timeout: tracking.timeout_secs.map(Duration::from_secs),
            },
            registration: RegistrationSettings {
                model_name,
                info_path,
                options,
                await_ready: Duration::from_secs(
                    registration
                        .await_ready_secs
                        .unwrap_or(DEFAULT_AWAIT_READY_SECS),
                ),
            },
            source: config_path.map(Path::to_path_buf),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Read the credential from the configured environment variable.
    ///
    /// A missing or blank variable is fatal.
    pub fn credential(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Credential, ConfigError> {
        let var = self.tracking.credential_env.as_str();
        env(var)
            .filter(|v| !v.trim().is_empty())
            .map(Credential::new)
            .ok_or_else(|| ConfigError::MissingCredential(var.to_string()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let uri = self.tracking.uri.as_str();
        if !(uri.starts_with("http://") || uri.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "tracking uri must be an http(s) URL, got '{}'",
                uri
            )));
        }
        if self.tracking.credential_env.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "tracking.credential_env must not be empty".to_string(),
            ));
        }
        if self.tracking.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::Invalid(
                "tracking.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.registration.model_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "model name must not be empty".to_string(),
            ));
        }
        if self.registration.options.artifact_path.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid(
                "artifact path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    toml::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), contents).unwrap();
        file
    }

    #[test]
    fn defaults_without_file_or_env() {
        let settings = Settings::resolve(None, &Overrides::default(), no_env).unwrap();
        assert_eq!(settings.tracking.uri, DEFAULT_TRACKING_URI);
        assert_eq!(settings.tracking.credential_env, DEFAULT_CREDENTIAL_ENV);
        assert_eq!(settings.tracking.auth, AuthScheme::Basic);
        assert_eq!(settings.tracking.timeout, None);
        assert_eq!(settings.registration.model_name, "final_model");
        assert_eq!(
            settings.registration.info_path,
            PathBuf::from("reports/experiment_info.json")
        );
        assert_eq!(settings.registration.options, RegistrarOptions::default());
        assert_eq!(settings.registration.await_ready, Duration::from_secs(300));
        assert_eq!(settings.source, None);
    }

    #[test]
    fn file_values_are_applied() {
        let file = write_config(
            r#"
[tracking]
dagshub = { owner = "acme", repo = "sentiment" }
credential_env = "DAGSHUB_TOKEN"
auth = "bearer"
timeout_secs = 20

[registration]
model_name = "sentiment_model"
info_path = "out/info.json"
artifact_path = "lr"
stage = "production"
archive_existing = true
await_ready_secs = 0
"#,
        );
        let settings = Settings::resolve(Some(file.path()), &Overrides::default(), no_env).unwrap();
        assert_eq!(
            settings.tracking.uri,
            "https://dagshub.com/acme/sentiment.mlflow"
        );
        assert_eq!(settings.tracking.credential_env, "DAGSHUB_TOKEN");
        assert_eq!(settings.tracking.auth, AuthScheme::Bearer);
        assert_eq!(settings.tracking.timeout, Some(Duration::from_secs(20)));
        assert_eq!(settings.registration.model_name, "sentiment_model");
        assert_eq!(settings.registration.info_path, PathBuf::from("out/info.json"));
        assert_eq!(settings.registration.options.artifact_path, "lr");
        assert_eq!(
            settings.registration.options.target_stage,
            LifecycleStage::Production
        );
        assert!(settings.registration.options.archive_existing);
        assert!(settings.registration.await_ready.is_zero());
        assert_eq!(settings.source.as_deref(), Some(file.path()));
    }

    #[test]
    fn env_beats_file_and_flags_beat_env() {
        let file = write_config(
            r#"
[tracking]
uri = "http://file:5000"

[registration]
model_name = "from_file"
"#,
        );
        let env: HashMap<&str, &str> = [
            (ENV_TRACKING_URI, "http://env:5000/"),
            (ENV_MODEL_NAME, "from_env"),
        ]
        .into_iter()
        .collect();
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        let settings = Settings::resolve(Some(file.path()), &Overrides::default(), lookup).unwrap();
        assert_eq!(settings.tracking.uri, "http://env:5000");
        assert_eq!(settings.registration.model_name, "from_env");

        let overrides = Overrides {
            model_name: Some("from_flag".to_string()),
            stage: Some(LifecycleStage::Archived),
            ..Overrides::default()
        };
        let settings = Settings::resolve(Some(file.path()), &overrides, lookup).unwrap();
        assert_eq!(settings.tracking.uri, "http://env:5000");
        assert_eq!(settings.registration.model_name, "from_flag");
        assert_eq!(
            settings.registration.options.target_stage,
            LifecycleStage::Archived
        );
    }

    #[test]
    fn uri_and_dagshub_conflict() {
        let file = write_config(
            r#"
[tracking]
uri = "http://localhost:5000"
dagshub = { owner = "a", repo = "b" }
"#,
        );
        let err = Settings::resolve(Some(file.path()), &Overrides::default(), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = write_config("[tracking]\nurl = \"http://typo\"\n");
        let err = Settings::resolve(Some(file.path()), &Overrides::default(), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn bad_stage_in_file_is_invalid() {
        let file = write_config("[registration]\nstage = \"canary\"\n");
        let err = Settings::resolve(Some(file.path()), &Overrides::default(), no_env).unwrap_err();
        assert!(err.to_string().contains("canary"));
    }

    #[test]
    fn missing_explicit_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::resolve(
            Some(&dir.path().join("nope.toml")),
            &Overrides::default(),
            no_env,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn non_http_uri_is_invalid() {
        let overrides = Overrides {
            tracking_uri: Some("file:///tmp/mlruns".to_string()),
            ..Overrides::default()
        };
        let err = Settings::resolve(None, &overrides, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn empty_model_name_is_invalid() {
        let overrides = Overrides {
            model_name: Some("  ".to_string()),
            ..Overrides::default()
        };
        assert!(Settings::resolve(None, &overrides, no_env).is_err());
    }

    #[test]
    fn credential_lookup() {
        let settings = Settings::resolve(None, &Overrides::default(), no_env).unwrap();

        let err = settings.credential(no_env).unwrap_err();
        assert_eq!(
            err.to_string(),
            "PROMOTER_TRACKING_TOKEN environment variable is not set"
        );

        let blank = settings.credential(|_| Some("   ".to_string())).unwrap_err();
        assert!(matches!(blank, ConfigError::MissingCredential(_)));

        let token = settings
            .credential(|k| (k == DEFAULT_CREDENTIAL_ENV).then(|| "s3cret".to_string()))
            .unwrap();
        assert_eq!(token.expose(), "s3cret");
        assert_eq!(format!("{token:?}"), "Credential(***)");
    }
}
