//! PPS Schema
//!
//! Typed documents exchanged by the specification pipeline.
//!
//! # Core Concepts
//!
//! - [`Envelope`]: Immutable per-step input snapshot (PPS v1.2)
//! - [`PromptResult`]: Delta patch a generation step produces (PromptResult v1.2)
//! - [`PipelineState`]: Accumulated state owned by the merge engine
//! - [`GateCatalog`]: Gate identifiers, their owners and the freeze authority
//!
//! Optional document blocks are modelled explicitly: a block that a patch may
//! omit is an `Option`, a list or map that defaults to empty carries
//! `#[serde(default)]`. Nothing downstream guesses at absent fields.
//!
//! # Example
//!
//! ```rust,ignore
//! use pps_schema::{Envelope, PromptResult};
//!
//! let envelope: Envelope = serde_yaml::from_str(&envelope_yaml)?;
//! let result = PromptResult::empty("APP/01_mvp-cutter", "RUN-001");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod envelope;
mod gates;
mod records;
mod result;
mod state;

pub use envelope::{
    Constraints, ContractFreezeRef, DepthMode, Envelope, EnvelopeMeta, OutputMode, Project,
    SpecState, TokenHygiene, DEFAULT_APPENDIX_THRESHOLD_CHARS, FOCUS_FREEZE_LABEL_KEY,
};
pub use gates::{GateCatalog, GateOwnership, STANDARD_STEP_IDS};
pub use records::{
    AppendixKind, AppendixRef, ChangeLogEntry, ChangeRequest, ChangeRequestArea,
    ChangeRequestStatus, Compatibility, DecisionLogEntry, OpenQuestionEntry,
};
pub use result::{AppendixUpdates, GateResult, GateStatus, PromptResult, ResultMeta, StateUpdates};
pub use state::{AppliedEntry, ContextMap, PipelineState, CONTEXT_BLOCK_KEY};

/// Envelope schema version this crate reads and writes
pub const PPS_VERSION: &str = "1.2";

/// The single recognized `output_format` tag for results
pub const OUTPUT_FORMAT: &str = "prompt_result_v1.2";

/// Gate target sentinel for steps that own no gate
pub const GATE_TARGET_NA: &str = "N/A";

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
