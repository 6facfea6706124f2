//! PromptResult v1.2 delta patch
//!
//! The four required blocks (`meta`, `gate_result`, `appendices_updates`,
//! `state_updates`) are `Option` so a missing block survives parsing and is
//! reported by shape validation instead of a deserializer error.

use crate::envelope::ContractFreezeRef;
use crate::records::{
    AppendixRef, ChangeLogEntry, ChangeRequest, DecisionLogEntry, OpenQuestionEntry,
};
use crate::state::{AppliedEntry, ContextMap};
use crate::PPS_VERSION;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome a step reports for its gate
///
/// Unrecognized wire values are kept rather than rejected at parse time so
/// validation can name them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GateStatus {
    /// Gate passed
    Pass,
    /// Gate failed
    Fail,
    /// Step owns no gate (`na`)
    #[default]
    NotApplicable,
    /// Any other value
    Unrecognized(String),
}

impl GateStatus {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::NotApplicable => "na",
            Self::Unrecognized(s) => s,
        }
    }

    /// Pass or fail
    #[inline]
    #[must_use]
    pub fn is_decisive(&self) -> bool {
        matches!(self, Self::Pass | Self::Fail)
    }

    /// One of the three recognized values
    #[inline]
    #[must_use]
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<String> for GateStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pass" => Self::Pass,
            "fail" => Self::Fail,
            "na" => Self::NotApplicable,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<GateStatus> for String {
    fn from(value: GateStatus) -> Self {
        match value {
            GateStatus::Unrecognized(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result identity metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultMeta {
    /// Step id; must match the envelope it was generated against
    pub prompt_id: String,
    /// Prompt template version
    pub prompt_version: String,
    /// Iteration identifier
    pub iteration_id: String,
    /// Run identifier; must match the envelope
    pub run_id: String,
    /// Freeze label the step worked against (pinned steps only)
    pub applied_to_freeze_label: String,
}

impl ResultMeta {
    /// Dedup key of this result
    #[inline]
    #[must_use]
    pub fn applied_entry(&self) -> AppliedEntry {
        AppliedEntry::new(self.prompt_id.clone(), self.run_id.clone())
    }
}

/// Appendix index changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppendixUpdates {
    /// New appendices; ids must not exist yet
    pub added: Vec<AppendixRef>,
    /// Replacements; ids must already exist
    pub updated: Vec<AppendixRef>,
}

/// Append-only log additions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateUpdates {
    /// New decisions
    pub decision_log_added: Vec<DecisionLogEntry>,
    /// New open questions
    pub open_questions_added: Vec<OpenQuestionEntry>,
    /// New changelog lines
    pub changelog_added: Vec<ChangeLogEntry>,
    /// New change requests
    pub change_requests_added: Vec<ChangeRequest>,
}

impl StateUpdates {
    /// Total number of log additions
    #[must_use]
    pub fn len(&self) -> usize {
        self.decision_log_added.len()
            + self.open_questions_added.len()
            + self.changelog_added.len()
            + self.change_requests_added.len()
    }

    /// No additions at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Gate outcome block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateResult {
    /// Gate id; must equal the envelope's gate target unless N/A
    pub gate_id: String,
    /// Outcome
    pub status: GateStatus,
    /// Short justification
    pub reason: String,
    /// What blocks a pass
    pub blockers: Vec<String>,
    /// Suggested next actions
    pub next_actions: Vec<String>,
}

/// PromptResult v1.2
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptResult {
    /// Identity metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResultMeta>,
    /// Declared output format; when present must equal [`crate::OUTPUT_FORMAT`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    /// Context updates, deep-merged into state context
    #[serde(default)]
    pub context_updates: ContextMap,
    /// Appendix index changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appendices_updates: Option<AppendixUpdates>,
    /// Log additions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_updates: Option<StateUpdates>,
    /// Gate outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_result: Option<GateResult>,
    /// New contract freeze; honored only from the freeze authority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_freeze_ref: Option<ContractFreezeRef>,
    /// Free-form warnings from the producing step
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl PromptResult {
    /// Empty but well-formed result for a step
    ///
    /// Gate status defaults to `na` with no gate id.
    #[must_use]
    pub fn empty(prompt_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            meta: Some(ResultMeta {
                prompt_id: prompt_id.into(),
                prompt_version: PPS_VERSION.to_string(),
                iteration_id: String::new(),
                run_id: run_id.into(),
                applied_to_freeze_label: String::new(),
            }),
            output_format: None,
            context_updates: ContextMap::new(),
            appendices_updates: Some(AppendixUpdates::default()),
            state_updates: Some(StateUpdates::default()),
            gate_result: Some(GateResult::default()),
            contract_freeze_ref: None,
            warnings: Vec::new(),
        }
    }

    /// Dedup key, with absent identity fields treated as empty strings
    #[must_use]
    pub fn applied_entry(&self) -> AppliedEntry {
        self.meta
            .as_ref()
            .map_or_else(|| AppliedEntry::new("", ""), ResultMeta::applied_entry)
    }

    /// Step id, or empty when meta is absent
    #[must_use]
    pub fn prompt_id(&self) -> &str {
        self.meta.as_ref().map_or("", |m| m.prompt_id.as_str())
    }

    /// With gate outcome
    #[must_use]
    pub fn with_gate(mut self, gate_id: impl Into<String>, status: GateStatus) -> Self {
        let gate = self.gate_result.get_or_insert_with(GateResult::default);
        gate.gate_id = gate_id.into();
        gate.status = status;
        self
    }
}
