//! PPS I/O
//!
//! The boundary between pipeline documents on disk and the typed schema.
//!
//! # Core Operations
//!
//! - **Ingress**: [`load_envelope`], [`load_result`], [`load_state`]
//! - **Checks**: [`validate_envelope`], [`validate_result`]
//! - **Egress**: [`save_yaml`], [`save_state`], [`export_artifacts`]
//! - **Configuration**: [`load_config`]
//!
//! # Example
//!
//! ```rust,ignore
//! use pps_io::{load_envelope, load_result, validate_envelope};
//!
//! let envelope = load_envelope("envelope.yaml")?;
//! let report = validate_envelope(&envelope, &config.gates);
//! let result = load_result("result.yaml")?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod config;
mod documents;
mod error;
mod export;
mod validate;

pub use config::{load_config, parse_config};
pub use documents::{
    load_envelope, load_result, load_state, parse_envelope, parse_result, save_state, save_yaml,
    state_to_json, RESULT_WRAPPER_KEY,
};
pub use error::{ConfigError, DocumentError};
pub use export::{
    export_artifacts, format_changelog, format_decisions, format_open_questions, ExportReport,
    CHANGELOG_FILE, DECISIONS_FILE, OPEN_QUESTIONS_FILE, STATE_FILE,
};
pub use validate::{validate_envelope, validate_result, ValidationReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
