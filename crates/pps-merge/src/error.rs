//! Error and warning types for the merge core
//!
//! Provides:
//! - [`MergeError`]: fatal findings, collected before any state is touched
//! - [`ErrorKind`]: the class a fatal finding belongs to
//! - [`MergeWarning`]: non-fatal findings reported alongside a successful merge

use pps_schema::OUTPUT_FORMAT;
use std::fmt;

/// Class of a fatal merge finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required block or identity field is missing
    Shape,
    /// Declared output format is not the recognized tag
    OutputFormat,
    /// Gate target, gate id and status disagree
    GateSemantic,
    /// Front-end/back-end step did not work against the pinned freeze label
    FreezePinning,
    /// Appendix add/update conflicts with the current index
    AppendixCollision,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Shape => "ShapeError",
            Self::OutputFormat => "OutputFormatError",
            Self::GateSemantic => "GateSemanticError",
            Self::FreezePinning => "FreezePinningError",
            Self::AppendixCollision => "AppendixCollisionError",
        };
        f.write_str(name)
    }
}

/// Fatal merge finding
///
/// Any of these aborts the merge with caller state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// Required field or block absent
    #[error("prompt_result.{field} required")]
    MissingField {
        /// Dotted path of the missing field
        field: &'static str,
    },

    /// Unrecognized output format tag
    #[error("output_format must be \"{}\"", OUTPUT_FORMAT)]
    OutputFormat {
        /// Tag the result declared
        found: String,
    },

    /// N/A gate target with a non-`na` status
    #[error("gate_target is \"N/A\" but gate_result.status is not \"na\"")]
    GateNotApplicable {
        /// Status the result reported
        status: String,
    },

    /// Gate target not in the catalog
    #[error("unknown gate_target: {gate_target}")]
    UnknownGateTarget {
        /// Envelope gate target
        gate_target: String,
    },

    /// Result names a different gate than the envelope targets
    #[error("gate_result.gate_id ({gate_id}) must match gate_target ({gate_target})")]
    GateMismatch {
        /// Gate id the result reported
        gate_id: String,
        /// Envelope gate target
        gate_target: String,
    },

    /// Gate-owning step reported neither pass nor fail
    #[error("gate_result.status must be \"pass\" or \"fail\" when gate_target is set (got \"{status}\")")]
    GateUndecided {
        /// Status the result reported
        status: String,
    },

    /// Pinned step received no freeze label through its focus
    #[error("FE/BE prompt {prompt_id} must receive focus.contract_freeze_label")]
    MissingFocusFreezeLabel {
        /// Step id
        prompt_id: String,
    },

    /// Pinned step did not report the label it worked against
    #[error("FE/BE prompt {prompt_id} must emit meta.applied_to_freeze_label")]
    MissingAppliedFreezeLabel {
        /// Step id
        prompt_id: String,
    },

    /// Reported label differs from the focus label
    #[error("applied_to_freeze_label ({applied}) must match focus.contract_freeze_label ({focus})")]
    FocusLabelMismatch {
        /// Label the result reported
        applied: String,
        /// Label handed in through focus
        focus: String,
    },

    /// Reported label differs from the current freeze
    #[error("applied_to_freeze_label ({applied}) must match state.contract_freeze_ref.label ({frozen})")]
    FrozenLabelMismatch {
        /// Label the result reported
        applied: String,
        /// Label currently frozen in the envelope state
        frozen: String,
    },

    /// Added appendix id already indexed
    #[error("appendices added: id \"{id}\" already exists")]
    AppendixExists {
        /// Colliding id
        id: String,
    },

    /// Same id added more than once by one result
    #[error("appendices added: id \"{id}\" is added more than once")]
    AppendixAddedTwice {
        /// Repeated id
        id: String,
    },

    /// Updated appendix id not indexed
    #[error("appendices updated: id \"{id}\" does not exist")]
    AppendixMissing {
        /// Unknown id
        id: String,
    },
}

impl MergeError {
    /// Class of this finding
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField { .. } => ErrorKind::Shape,
            Self::OutputFormat { .. } => ErrorKind::OutputFormat,
            Self::GateNotApplicable { .. }
            | Self::UnknownGateTarget { .. }
            | Self::GateMismatch { .. }
            | Self::GateUndecided { .. } => ErrorKind::GateSemantic,
            Self::MissingFocusFreezeLabel { .. }
            | Self::MissingAppliedFreezeLabel { .. }
            | Self::FocusLabelMismatch { .. }
            | Self::FrozenLabelMismatch { .. } => ErrorKind::FreezePinning,
            Self::AppendixExists { .. }
            | Self::AppendixAddedTwice { .. }
            | Self::AppendixMissing { .. } => ErrorKind::AppendixCollision,
        }
    }

    /// Create missing-field error
    #[inline]
    #[must_use]
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }
}

/// Message of the duplicate-submission warning
pub const DUPLICATE_NOOP: &str = "Duplicate (prompt_id, run_id): no-op";

/// Non-fatal merge finding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeWarning {
    /// Result was already folded in
    #[error("{}", DUPLICATE_NOOP)]
    Duplicate,

    /// Free-form warning carried by the result itself
    #[error("{0}")]
    Patch(String),

    /// Post-merge referential integrity finding
    #[error("{message}")]
    Consistency {
        /// Rule that produced the finding
        rule: &'static str,
        /// Description
        message: String,
    },

    /// Inline context value larger than the appendix threshold
    #[error("token_hygiene: context_updates.{key} exceeds {threshold} chars; consider moving to appendix")]
    TokenHygiene {
        /// Top-level context key
        key: String,
        /// Threshold in characters
        threshold: usize,
    },
}

impl MergeWarning {
    /// Create consistency warning
    #[inline]
    #[must_use]
    pub fn consistency(rule: &'static str, message: impl Into<String>) -> Self {
        Self::Consistency {
            rule,
            message: message.into(),
        }
    }
}
