//! PPS Pipeline - generator collaborator and sequential runner
//!
//! Wraps the merge core with the pieces needed to drive a full run:
//! - **Generator**: async collaborator producing result documents
//! - **StubGenerator**: canned results for the eight standard steps
//! - **ModelGenerator**: results from a hosted model over HTTP
//! - **TemplateStore**: prompt templates from a directory
//! - **Pipeline**: projects, generates and merges each step in order
//!
//! # Example
//!
//! ```rust,ignore
//! use pps_merge::MergeEngine;
//! use pps_pipeline::{Pipeline, StubGenerator};
//! use std::sync::Arc;
//!
//! let pipeline = Pipeline::new(MergeEngine::default(), Arc::new(StubGenerator::default()));
//! let report = pipeline.run(&base_envelope).await;
//! assert!(report.is_success());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod generator;
mod model;
mod runner;
mod stub;
mod template;

pub use error::{BoxError, GenerationError, PipelineError};
pub use generator::Generator;
pub use model::{
    parse_model_response, render_prompt, ModelConfig, ModelGenerator, DEFAULT_ENDPOINT,
    DEFAULT_MODEL, ENVELOPE_PLACEHOLDER,
};
pub use runner::{Pipeline, PipelineReport, StepReport};
pub use stub::{StubGenerator, STUB_FREEZE_LABEL, STUB_OPENAPI_APPENDIX_ID};
pub use template::TemplateStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
