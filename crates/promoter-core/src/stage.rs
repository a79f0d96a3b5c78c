//! # Lifecycle Stages
//!
//! Stage labels a registry attaches to a model version.
//!
//! | Stage | Meaning |
//! |-------|---------|
//! | None | Registered, not yet promoted |
//! | Staging | Candidate under evaluation |
//! | Production | Serving |
//! | Archived | Retired |
//!
//! Transitions between stages are owned by the registry. This crate only
//! requests a single transition per registration.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Stage a freshly registered version is promoted to.
pub const DEFAULT_TARGET_STAGE: LifecycleStage = LifecycleStage::Staging;

// =============================================================================
// STAGE ENUM
// =============================================================================

/// Registry lifecycle stage of a model version.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum LifecycleStage {
    #[default]
    None,
    Staging,
    Production,
    Archived,
}

impl LifecycleStage {
    /// All stages, in promotion order.
    pub const ALL: [LifecycleStage; 4] = [
        LifecycleStage::None,
        LifecycleStage::Staging,
        LifecycleStage::Production,
        LifecycleStage::Archived,
    ];

    /// Registry spelling of the stage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStage::None => "None",
            LifecycleStage::Staging => "Staging",
            LifecycleStage::Production => "Production",
            LifecycleStage::Archived => "Archived",
        }
    }
}

impl std::fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stage label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown lifecycle stage '{0}' (expected None, Staging, Production or Archived)")]
pub struct UnknownStage(pub String);

impl FromStr for LifecycleStage {
    type Err = UnknownStage;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
