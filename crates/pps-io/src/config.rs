//! Merge configuration files
//!
//! TOML, every key optional:
//!
//! ```toml
//! appendix_threshold_chars = 4000
//!
//! [gates]
//! freeze_authority = "APP/04_data-api-contract"
//! pinned_steps = ["APP/05_frontend-plan", "APP/06_backend-plan"]
//!
//! [[gates.gates]]
//! gate_id = "GATE_1_MVP_BOUNDED"
//! owner = "APP/01_mvp-cutter"
//! ```

use crate::error::ConfigError;
use pps_merge::MergeConfig;
use std::path::Path;
use tracing::debug;

/// Parse configuration text
///
/// # Errors
/// `toml` error on malformed input.
pub fn parse_config(text: &str) -> Result<MergeConfig, toml::de::Error> {
    toml::from_str(text)
}

/// Load configuration, falling back to defaults when no path is given
///
/// # Errors
/// Read or parse failure for an explicit path.
pub fn load_config(path: Option<&Path>) -> Result<MergeConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(MergeConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        path = %path.display(),
        threshold = config.appendix_threshold_chars,
        gates = config.gates.gates.len(),
        "config loaded"
    );
    Ok(config)
}
