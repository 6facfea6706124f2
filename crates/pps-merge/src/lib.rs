//! PPS Merge Core
//!
//! Deterministic, single-writer fold of PromptResult patches into the
//! accumulated specification state.
//!
//! # Core Concepts
//!
//! - [`PatchValidator`]: Shape (Phase A) and semantic (Phase B) checks
//! - [`initial_state`]: Projects accumulated state from an envelope
//! - [`MergeEngine`]: Dedup, validate, fold, check and summarize
//! - [`ConsistencyChecker`]: Post-merge referential integrity rules (warnings)
//! - [`build_summary`]: What changed and what's next
//! - [`project_envelope`]: Builds the next step's envelope
//!
//! # Example
//!
//! ```rust,ignore
//! use pps_merge::{MergeConfig, MergeEngine};
//!
//! let engine = MergeEngine::new(MergeConfig::default());
//! let outcome = engine.merge(&envelope, &result, &state.applied_index);
//! if outcome.is_ok() {
//!     if let Some(next) = outcome.state {
//!         state = next;
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod consistency;
mod engine;
mod error;
mod policy;
mod projector;
mod state_builder;
mod summary;
mod validator;

pub use consistency::{ConsistencyChecker, ConsistencyRule, FreezeAppendixRule};
pub use engine::{MergeConfig, MergeEngine, MergeOutcome};
pub use error::{ErrorKind, MergeError, MergeWarning, DUPLICATE_NOOP};
pub use policy::{
    apply_field, merge_context, upsert_appendices, FieldPolicy, StateField,
    CONTEXT_APPEND_ONLY_KEYS, STATE_FIELDS,
};
pub use projector::{project_envelope, MetaOverrides};
pub use state_builder::initial_state;
pub use summary::{build_summary, IterationSummary};
pub use validator::{PatchValidator, ValidatedPatch};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
