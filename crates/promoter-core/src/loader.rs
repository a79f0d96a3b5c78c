//! # Info Loader
//!
//! Reads the run record written by the evaluation step.
//!
//! - The file must hold a single JSON object
//! - The result is the exact parsed content, nothing is inferred or added
//! - Failures are logged once and returned to the caller

use crate::{ModelInfo, PromoterError};
use serde_json::Value;
use std::path::Path;

/// Maximum size of a run record (1 MiB).
///
/// Run records are a handful of keys; anything larger is not a run record.
pub const MAX_INFO_FILE_SIZE: u64 = 1024 * 1024;

/// Load the run record at `path`.
///
/// Returns `PromoterError::Io` when the file is missing, unreadable or too
/// large, and `PromoterError::Parse` when it is not a JSON object.
pub fn load_model_info(path: impl AsRef<Path>) -> Result<ModelInfo, PromoterError> {
    let path = path.as_ref();

    match read_model_info(path) {
        Ok(info) => {
            tracing::info!(path = %path.display(), "Model info loaded from {}", path.display());
            Ok(info)
        }
        Err(e) => {
            tracing::error!(path = %path.display(), "Failed to load model info: {}", e);
            Err(e)
        }
    }
}

/// Parse a run record from an in-memory JSON document.
///
/// `origin` only labels errors.
pub fn parse_model_info(origin: &str, raw: &str) -> Result<ModelInfo, PromoterError> {
    parse_model_bytes(origin, raw.as_bytes())
}

/// Bytes that are not UTF-8 are not JSON, so they fail as `Parse`.
fn parse_model_bytes(origin: &str, raw: &[u8]) -> Result<ModelInfo, PromoterError> {
    let parse_error = |message: String| PromoterError::Parse {
        path: origin.to_string(),
        message,
    };

    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(fields)) => Ok(ModelInfo::new(fields)),
        Ok(other) => Err(parse_error(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(parse_error(e.to_string())),
    }
}

fn read_model_info(path: &Path) -> Result<ModelInfo, PromoterError> {
    let io_error = |message: String| PromoterError::Io {
        path: path.display().to_string(),
        message,
    };

    let metadata = std::fs::metadata(path).map_err(|e| io_error(e.to_string()))?;
    if !metadata.is_file() {
        return Err(io_error("not a regular file".to_string()));
    }
    if metadata.len() > MAX_INFO_FILE_SIZE {
        return Err(io_error(format!(
            "file size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_INFO_FILE_SIZE
        )));
    }

    let raw = std::fs::read(path).map_err(|e| io_error(e.to_string()))?;
    parse_model_bytes(&path.display().to_string(), &raw)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
