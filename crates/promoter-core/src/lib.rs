//! # promoter-core
//!
//! The registration flow for trained model runs - THE LOGIC.
//!
//! A training pipeline leaves behind a small JSON record naming the tracking
//! run that produced the model. This crate turns that record into a new
//! registered model version and moves it into a lifecycle stage.
//!
//! ## Steps
//!
//! 1. [`loader`] reads the run record.
//! 2. [`Registrar`] registers `runs:/<run_id>/model` as a new version.
//! 3. [`Registrar`] then moves that version to `Staging`.
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies
//! - The registry is only reached through [`ModelRegistry`]
//! - No retries, no rollback

// =============================================================================
// MODULES
// =============================================================================

pub mod loader;
pub mod registrar;
pub mod registry;
pub mod stage;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use loader::{load_model_info, parse_model_info};
pub use registrar::{Promotion, Registrar, RegistrarOptions};
pub use registry::ModelRegistry;
pub use stage::{DEFAULT_TARGET_STAGE, LifecycleStage, UnknownStage};
pub use types::{
    DEFAULT_ARTIFACT_PATH, ModelInfo, ModelUri, ModelVersion, PromoterError, RUN_ID_KEY,
    RegistryError, VersionStatus,
};
