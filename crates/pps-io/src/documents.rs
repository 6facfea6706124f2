//! Envelope, result and state documents on disk
//!
//! Envelopes and results are YAML. Accumulated state is pretty-printed JSON.

use crate::error::DocumentError;
use pps_schema::{Envelope, PipelineState, PromptResult};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Top-level key some generators wrap results in
pub const RESULT_WRAPPER_KEY: &str = "prompt_result";

fn read(path: &Path) -> Result<String, DocumentError> {
    fs::read_to_string(path).map_err(|e| DocumentError::read(path, e))
}

fn write(path: &Path, contents: &str) -> Result<(), DocumentError> {
    fs::write(path, contents).map_err(|e| DocumentError::write(path, e))
}

/// Parse an envelope from YAML text
///
/// # Errors
/// `serde_yaml` error when the text is not an envelope.
pub fn parse_envelope(text: &str) -> Result<Envelope, serde_yaml::Error> {
    serde_yaml::from_str(text)
}

/// Parse a result from YAML text, unwrapping a `prompt_result:` wrapper
///
/// # Errors
/// `serde_yaml` error when the text is not a result.
pub fn parse_result(text: &str) -> Result<PromptResult, serde_yaml::Error> {
    let mut document: serde_yaml::Value = serde_yaml::from_str(text)?;
    let inner = document
        .as_mapping_mut()
        .and_then(|map| map.remove(RESULT_WRAPPER_KEY));
    serde_yaml::from_value(inner.unwrap_or(document))
}

/// Load an envelope document
///
/// # Errors
/// Read or parse failure, with the offending path.
pub fn load_envelope(path: impl AsRef<Path>) -> Result<Envelope, DocumentError> {
    let path = path.as_ref();
    let envelope = parse_envelope(&read(path)?).map_err(|source| DocumentError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), prompt_id = %envelope.meta.prompt_id, "envelope loaded");
    Ok(envelope)
}

/// Load a result document
///
/// # Errors
/// Read or parse failure, with the offending path.
pub fn load_result(path: impl AsRef<Path>) -> Result<PromptResult, DocumentError> {
    let path = path.as_ref();
    let result = parse_result(&read(path)?).map_err(|source| DocumentError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), prompt_id = result.prompt_id(), "result loaded");
    Ok(result)
}

/// Write any document as YAML
///
/// # Errors
/// Serialization or write failure.
pub fn save_yaml<T: Serialize>(path: impl AsRef<Path>, document: &T) -> Result<(), DocumentError> {
    let path = path.as_ref();
    let text = serde_yaml::to_string(document).map_err(|source| DocumentError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    write(path, &text)
}

/// Load accumulated state
///
/// # Errors
/// Read or parse failure, with the offending path.
pub fn load_state(path: impl AsRef<Path>) -> Result<PipelineState, DocumentError> {
    let path = path.as_ref();
    serde_json::from_str(&read(path)?).map_err(|source| DocumentError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Render state as pretty-printed JSON with a trailing newline
///
/// # Errors
/// Serialization failure.
pub fn state_to_json(state: &PipelineState) -> Result<String, serde_json::Error> {
    let mut text = serde_json::to_string_pretty(state)?;
    text.push('\n');
    Ok(text)
}

/// Write accumulated state
///
/// # Errors
/// Serialization or write failure.
pub fn save_state(path: impl AsRef<Path>, state: &PipelineState) -> Result<(), DocumentError> {
    let path = path.as_ref();
    let text = state_to_json(state).map_err(|source| DocumentError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write(path, &text)?;
    debug!(path = %path.display(), applied = state.applied_index.len(), "state saved");
    Ok(())
}
