//! Testing utilities for the PPS workspace
//!
//! Shared fixtures for envelopes, results and log entries.

#![allow(missing_docs)]

use pps_schema::{
    AppendixKind, AppendixRef, ChangeLogEntry, ChangeRequest, ChangeRequestArea,
    ChangeRequestStatus, Compatibility, ContractFreezeRef,
    DecisionLogEntry, Envelope, EnvelopeMeta, GateCatalog, GateStatus, OpenQuestionEntry,
    PromptResult, GATE_TARGET_NA,
};

pub const FREEZE_LABEL: &str = "API-v0";
pub const OPENAPI_APPENDIX_ID: &str = "APX-OPENAPI-v0";

/// Envelope for `prompt_id` targeting `gate_target`
pub fn envelope(prompt_id: &str, run_id: &str, gate_target: &str) -> Envelope {
    Envelope::new(EnvelopeMeta::new(prompt_id, run_id).with_gate_target(gate_target))
}

/// Envelope targeting the gate the standard catalog assigns to `prompt_id`
pub fn step_envelope(prompt_id: &str, run_id: &str) -> Envelope {
    let catalog = GateCatalog::standard();
    envelope(prompt_id, run_id, catalog.gate_target_for(prompt_id))
}

/// Envelope for a pinned step, with the freeze in state and the label in focus
pub fn pinned_envelope(prompt_id: &str, run_id: &str) -> Envelope {
    let mut env = step_envelope(prompt_id, run_id);
    env.appendices_index
        .push(AppendixRef::new(OPENAPI_APPENDIX_ID, AppendixKind::Openapi));
    env.state.contract_freeze_ref =
        ContractFreezeRef::new(FREEZE_LABEL, OPENAPI_APPENDIX_ID, "2026-01-28");
    env.focus
        .insert("contract_freeze_label".into(), FREEZE_LABEL.into());
    env
}

/// Well-formed result whose gate outcome agrees with `envelope`
///
/// Gate-owning steps pass; N/A steps report `na`. Pinned steps echo the focus
/// freeze label.
pub fn passing_result(envelope: &Envelope) -> PromptResult {
    let mut result = PromptResult::empty(&envelope.meta.prompt_id, &envelope.meta.run_id);
    if envelope.meta.gate_target != GATE_TARGET_NA {
        result = result.with_gate(envelope.meta.gate_target.clone(), GateStatus::Pass);
    }
    if let (Some(meta), Some(label)) = (result.meta.as_mut(), envelope.focus_freeze_label()) {
        meta.applied_to_freeze_label = label.to_string();
    }
    result
}

pub fn decision(text: &str) -> DecisionLogEntry {
    DecisionLogEntry {
        id: None,
        date: "2026-01-28".into(),
        decision: text.into(),
        rationale: "fixture".into(),
        impact: String::new(),
        owner: "tests".into(),
    }
}

pub fn question(id: &str, text: &str) -> OpenQuestionEntry {
    OpenQuestionEntry {
        id: id.into(),
        question: text.into(),
        context: String::new(),
        options: vec!["yes".into(), "no".into()],
        recommended: "yes".into(),
        owner: "tests".into(),
        due_by: String::new(),
    }
}

pub fn change(area: &str, text: &str) -> ChangeLogEntry {
    ChangeLogEntry {
        date: "2026-01-28".into(),
        changed_area: area.into(),
        change: text.into(),
        reason: "fixture".into(),
        compatibility: Compatibility::Minor,
        impact: String::new(),
    }
}

pub fn change_request(id: &str, text: &str) -> ChangeRequest {
    ChangeRequest {
        id: id.into(),
        area: ChangeRequestArea::ApiContract,
        requested_by: "tests".into(),
        depends_on_freeze_label: FREEZE_LABEL.into(),
        description: text.into(),
        reason: "fixture".into(),
        proposed_change: String::new(),
        compatibility: Compatibility::Minor,
        status: ChangeRequestStatus::Open,
    }
}

pub fn appendix(id: &str) -> AppendixRef {
    AppendixRef::new(id, AppendixKind::Other)
}

/// Minimal envelope document as YAML
pub const ENVELOPE_YAML: &str = r#"pps_version: "1.2"
meta:
  prompt_id: APP/01_mvp-cutter
  prompt_version: "1.2"
  iteration_id: "2026-01-28T10:00:00"
  run_id: RUN-001
  depth_mode: MVP
  stack_prefs: [rust, postgres]
  output_mode: delta
  output_format: prompt_result_v1.2
  gate_target: GATE_1_MVP_BOUNDED
  token_hygiene:
    context_block_policy: summary_only
    large_artifact_policy: appendix_only
    appendix_threshold_chars: 4000
project:
  name: Tasks
  brief: Shared task lists for small teams
context_block: ""
appendices_index: []
focus: {}
"#;

/// Matching result document, wrapped the way generators emit it
pub const RESULT_YAML: &str = r#"prompt_result:
  meta:
    prompt_id: APP/01_mvp-cutter
    prompt_version: "1.2"
    run_id: RUN-001
  output_format: prompt_result_v1.2
  context_updates:
    context_block: "MVP: lists, sharing, reminders"
  appendices_updates:
    added: []
    updated: []
  state_updates:
    decision_log_added:
      - date: "2026-01-28"
        decision: Cut offline mode from MVP
        rationale: Timeline
        impact: Web only
        owner: PM
  gate_result:
    gate_id: GATE_1_MVP_BOUNDED
    status: pass
    reason: Scope bounded
    next_actions: [Draft UX flows]
  warnings: []
"#;
