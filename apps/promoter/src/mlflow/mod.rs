//! # MLflow Registry Backend
//!
//! Talks to an MLflow tracking server (self-hosted or DagsHub) over its
//! REST API.

mod client;
mod types;

pub use client::{API_PREFIX, ClientConfig, DEFAULT_POLL_INTERVAL, MlflowClient, classify_error};
pub use types::*;
