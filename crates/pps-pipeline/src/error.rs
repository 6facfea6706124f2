//! Error types for the pipeline runner
//!
//! Provides error handling for:
//! - Template lookup failures
//! - Generator backend failures (opaque)
//! - Model replies that hold no result document
//! - Rejected merges

use pps_merge::MergeError;
use std::path::PathBuf;

/// Boxed error from a generator backend
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors producing a result for a step
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// No template file for the step
    #[error("no prompt template for {prompt_id} at {path}")]
    TemplateMissing {
        /// Step id
        prompt_id: String,
        /// Expected template path
        path: PathBuf,
    },

    /// Template exists but could not be read
    #[error("io error reading template {path}: {source}")]
    TemplateRead {
        /// Template path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Model reply is not a result document
    #[error("model response is not a result document: {source}")]
    InvalidResponse {
        /// YAML error
        #[source]
        source: serde_yaml::Error,
    },

    /// Backend failure, passed through as-is
    #[error("generator failed for {prompt_id}: {cause}")]
    Backend {
        /// Step id
        prompt_id: String,
        /// Backend error
        cause: BoxError,
    },
}

impl GenerationError {
    /// Wrap a backend error
    pub fn backend(prompt_id: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::Backend {
            prompt_id: prompt_id.into(),
            cause: cause.into(),
        }
    }
}

/// Why a pipeline run stopped early
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Generator produced no result
    #[error("{prompt_id}: {error}")]
    Generation {
        /// Step id
        prompt_id: String,
        /// Underlying error
        #[source]
        error: GenerationError,
    },

    /// Merge engine rejected the result
    #[error("{prompt_id}: merge rejected: {}", join(.errors))]
    MergeRejected {
        /// Step id
        prompt_id: String,
        /// Every finding, in validation order
        errors: Vec<MergeError>,
    },
}

fn join(errors: &[MergeError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl PipelineError {
    /// Step the run stopped at
    #[must_use]
    pub fn prompt_id(&self) -> &str {
        match self {
            Self::Generation { prompt_id, .. } | Self::MergeRejected { prompt_id, .. } => {
                prompt_id
            }
        }
    }
}
