//! # Registry Seam
//!
//! The remote model registry as seen by the registration flow.
//!
//! Implementations are synchronous: each call blocks until the registry
//! answers or fails. Callers never retry.

use crate::{LifecycleStage, ModelUri, ModelVersion, RegistryError};

/// A model registry that versions named models and tracks their stage.
pub trait ModelRegistry {
    /// Register the artifact at `model_uri` as a new version of `name`.
    ///
    /// Creates the registered model when it does not exist yet. The
    /// returned version number is assigned by the registry.
    fn register_model(&self, model_uri: &ModelUri, name: &str)
    -> Result<ModelVersion, RegistryError>;

    /// Move `version` of `name` into `stage`.
    ///
    /// When `archive_existing` is set, versions already in `stage` are
    /// archived by the registry.
    fn transition_stage(
        &self,
        name: &str,
        version: &str,
        stage: LifecycleStage,
        archive_existing: bool,
    ) -> Result<ModelVersion, RegistryError>;
}
