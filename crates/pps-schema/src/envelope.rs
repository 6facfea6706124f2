//! PPS v1.2 input envelope
//!
//! The envelope is the immutable snapshot a generation step works from:
//! identity metadata, project description, the carried context, the appendix
//! index, the embedded state sub-document and a step-specific focus payload.

use crate::records::{
    AppendixRef, ChangeLogEntry, ChangeRequest, DecisionLogEntry, OpenQuestionEntry,
};
use crate::state::ContextMap;
use crate::{GATE_TARGET_NA, OUTPUT_FORMAT, PPS_VERSION};
use serde::{Deserialize, Serialize};

/// Default appendix-size threshold for the token-hygiene scan (characters)
pub const DEFAULT_APPENDIX_THRESHOLD_CHARS: usize = 4000;

/// Focus key carrying the pinned contract freeze label
pub const FOCUS_FREEZE_LABEL_KEY: &str = "contract_freeze_label";

/// How much depth a run should go into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DepthMode {
    /// Minimum viable product
    #[default]
    #[serde(rename = "MVP")]
    Mvp,
    /// Full specification
    Full,
    /// Blueprint level
    Blueprint,
}

/// Whether results are deltas or full documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Delta patch (the only mode the merge engine folds)
    #[default]
    Delta,
    /// Full document
    Full,
}

/// Token hygiene policy carried in envelope metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHygiene {
    /// Must be `summary_only`
    #[serde(default = "default_context_block_policy")]
    pub context_block_policy: String,
    /// Large artifacts go to appendices
    #[serde(default = "default_large_artifact_policy")]
    pub large_artifact_policy: String,
    /// Inline values longer than this should become appendices
    #[serde(default = "default_threshold")]
    pub appendix_threshold_chars: usize,
}

fn default_context_block_policy() -> String {
    "summary_only".to_string()
}

fn default_large_artifact_policy() -> String {
    "appendix_only".to_string()
}

fn default_threshold() -> usize {
    DEFAULT_APPENDIX_THRESHOLD_CHARS
}

impl Default for TokenHygiene {
    fn default() -> Self {
        Self {
            context_block_policy: default_context_block_policy(),
            large_artifact_policy: default_large_artifact_policy(),
            appendix_threshold_chars: DEFAULT_APPENDIX_THRESHOLD_CHARS,
        }
    }
}

/// Envelope identity metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    /// Step id, e.g. `APP/01_mvp-cutter`
    #[serde(default)]
    pub prompt_id: String,
    /// Prompt template version
    #[serde(default = "default_prompt_version")]
    pub prompt_version: String,
    /// Iteration identifier
    #[serde(default)]
    pub iteration_id: String,
    /// Run identifier, unique per execution
    #[serde(default)]
    pub run_id: String,
    /// Depth mode
    #[serde(default)]
    pub depth_mode: DepthMode,
    /// Preferred stack
    #[serde(default)]
    pub stack_prefs: Vec<String>,
    /// Output mode
    #[serde(default)]
    pub output_mode: OutputMode,
    /// Declared result format; must be [`OUTPUT_FORMAT`]
    #[serde(default)]
    pub output_format: String,
    /// Gate the step is responsible for, or [`GATE_TARGET_NA`]
    #[serde(default = "default_gate_target")]
    pub gate_target: String,
    /// Token hygiene policy; absent means the engine's configured threshold applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_hygiene: Option<TokenHygiene>,
}

fn default_prompt_version() -> String {
    PPS_VERSION.to_string()
}

fn default_gate_target() -> String {
    GATE_TARGET_NA.to_string()
}

impl EnvelopeMeta {
    /// Create metadata for a step with all other fields at their defaults
    #[must_use]
    pub fn new(prompt_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            prompt_id: prompt_id.into(),
            prompt_version: default_prompt_version(),
            iteration_id: String::new(),
            run_id: run_id.into(),
            depth_mode: DepthMode::default(),
            stack_prefs: Vec::new(),
            output_mode: OutputMode::default(),
            output_format: OUTPUT_FORMAT.to_string(),
            gate_target: default_gate_target(),
            token_hygiene: Some(TokenHygiene::default()),
        }
    }

    /// With gate target
    #[inline]
    #[must_use]
    pub fn with_gate_target(mut self, gate_target: impl Into<String>) -> Self {
        self.gate_target = gate_target.into();
        self
    }

    /// With iteration id
    #[inline]
    #[must_use]
    pub fn with_iteration_id(mut self, iteration_id: impl Into<String>) -> Self {
        self.iteration_id = iteration_id.into();
        self
    }

    /// Whether the step owns no gate
    #[inline]
    #[must_use]
    pub fn is_gate_na(&self) -> bool {
        self.gate_target == GATE_TARGET_NA
    }
}

/// Project constraints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    /// Team size
    pub team_size: String,
    /// Timeline
    pub timeline: String,
    /// Budget
    pub budget: String,
    /// Compliance and privacy requirements
    pub compliance_privacy: String,
    /// Hosting limits
    pub hosting_limits: String,
}

/// Project description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    /// Project name
    pub name: String,
    /// One-paragraph brief
    pub brief: String,
    /// Business domain
    pub domain: String,
    /// Target users
    pub users: String,
}

/// Pinned contract version reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractFreezeRef {
    /// Freeze label, empty when nothing is frozen yet
    pub label: String,
    /// Appendix holding the frozen OpenAPI document
    pub openapi_appendix_id: String,
    /// Timestamp of the freeze
    pub updated_on: String,
}

impl ContractFreezeRef {
    /// Create reference
    #[inline]
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        openapi_appendix_id: impl Into<String>,
        updated_on: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            openapi_appendix_id: openapi_appendix_id.into(),
            updated_on: updated_on.into(),
        }
    }

    /// Whether a freeze label is set
    #[inline]
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        !self.label.is_empty()
    }
}

/// Embedded accumulated-state sub-document
///
/// Shared by the envelope and [`crate::PipelineState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecState {
    /// Decisions, append-only
    pub decision_log: Vec<DecisionLogEntry>,
    /// Open questions, append-only
    pub open_questions: Vec<OpenQuestionEntry>,
    /// Changelog, append-only
    pub changelog: Vec<ChangeLogEntry>,
    /// Change requests, append-only
    pub change_requests: Vec<ChangeRequest>,
    /// Current contract freeze
    pub contract_freeze_ref: ContractFreezeRef,
}

/// PPS v1.2 envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Schema version, must be [`PPS_VERSION`]
    #[serde(default)]
    pub pps_version: String,
    /// Identity metadata
    pub meta: EnvelopeMeta,
    /// Project constraints
    #[serde(default)]
    pub constraints: Constraints,
    /// Project description
    #[serde(default)]
    pub project: Project,
    /// Free-text context summary
    #[serde(default)]
    pub context_block: String,
    /// Structured context carried forward from earlier steps
    #[serde(default, skip_serializing_if = "ContextMap::is_empty")]
    pub context: ContextMap,
    /// Ordered appendix index
    #[serde(default)]
    pub appendices_index: Vec<AppendixRef>,
    /// Embedded accumulated state
    #[serde(default)]
    pub state: SpecState,
    /// Step-specific payload
    #[serde(default)]
    pub focus: ContextMap,
}

impl Envelope {
    /// Create empty envelope for a step
    #[must_use]
    pub fn new(meta: EnvelopeMeta) -> Self {
        Self {
            pps_version: PPS_VERSION.to_string(),
            meta,
            constraints: Constraints::default(),
            project: Project::default(),
            context_block: String::new(),
            context: ContextMap::new(),
            appendices_index: Vec::new(),
            state: SpecState::default(),
            focus: ContextMap::new(),
        }
    }

    /// Freeze label handed to the step through its focus payload
    ///
    /// `None` when the key is absent or not a string.
    #[must_use]
    pub fn focus_freeze_label(&self) -> Option<&str> {
        self.focus
            .get(FOCUS_FREEZE_LABEL_KEY)
            .and_then(serde_json::Value::as_str)
    }

    /// Whether the appendix index holds `id`
    #[must_use]
    pub fn has_appendix(&self, id: &str) -> bool {
        self.appendices_index.iter().any(|a| a.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn meta_defaults_gate_target_to_na() {
        let meta: EnvelopeMeta =
            serde_json::from_str(r#"{"prompt_id": "APP/01_mvp-cutter", "run_id": "R1"}"#).unwrap();
        assert_eq!(meta.gate_target, GATE_TARGET_NA);
        assert!(meta.is_gate_na());
        assert!(meta.token_hygiene.is_none());
        assert_eq!(meta.prompt_version, "1.2");
    }

    #[test]
    fn envelope_parses_minimal_yaml() {
        let yaml = r#"
pps_version: "1.2"
meta:
  prompt_id: APP/05_frontend-plan
  run_id: RUN-9
  output_format: prompt_result_v1.2
  gate_target: GATE_5_CONTRACT_NO_DEVIATIONS
  depth_mode: MVP
focus:
  contract_freeze_label: API-v0
"#;
        let envelope: Envelope = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(envelope.meta.depth_mode, DepthMode::Mvp);
        assert_eq!(envelope.focus_freeze_label(), Some("API-v0"));
        assert!(envelope.appendices_index.is_empty());
        assert!(!envelope.state.contract_freeze_ref.is_frozen());
    }

    #[test]
    fn focus_label_must_be_string() {
        let mut envelope = Envelope::new(EnvelopeMeta::new("APP/05_frontend-plan", "R"));
        envelope
            .focus
            .insert("contract_freeze_label".into(), serde_json::json!(3));
        assert_eq!(envelope.focus_freeze_label(), None);
    }

    #[test]
    fn empty_context_is_not_serialized() {
        let envelope = Envelope::new(EnvelopeMeta::new("APP/01_mvp-cutter", "R"));
        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json.get("context").is_none());
        assert_eq!(json["meta"]["output_format"], OUTPUT_FORMAT);
    }
}
