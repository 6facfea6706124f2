//! Iteration summary
//!
//! A derived "what changed / what's next" view. Never persisted as
//! authoritative state.

use pps_schema::{
    ChangeLogEntry, DecisionLogEntry, GateResult, GateStatus, OpenQuestionEntry, PipelineState,
};
use serde::Serialize;

/// What a merge left behind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IterationSummary {
    /// Full decision log after the merge
    pub decisions_made: Vec<DecisionLogEntry>,
    /// Full open question log after the merge
    pub open_questions: Vec<OpenQuestionEntry>,
    /// Full changelog after the merge
    pub changelog_entries: Vec<ChangeLogEntry>,
    /// Current freeze label, empty when nothing is frozen
    pub active_freeze_label: String,
    /// This step's gate, when it passed
    pub gates_passed: Vec<String>,
    /// This step's gate, when it failed
    pub gates_failed: Vec<String>,
    /// Next actions from this step's gate result
    pub next_actions: Vec<String>,
}

/// Build the summary for a merged state and the gate outcome that produced it
#[must_use]
pub fn build_summary(state: &PipelineState, gate: &GateResult) -> IterationSummary {
    let gate_id = || {
        if gate.gate_id.is_empty() {
            Vec::new()
        } else {
            vec![gate.gate_id.clone()]
        }
    };

    IterationSummary {
        decisions_made: state.state.decision_log.clone(),
        open_questions: state.state.open_questions.clone(),
        changelog_entries: state.state.changelog.clone(),
        active_freeze_label: state.state.contract_freeze_ref.label.clone(),
        gates_passed: if gate.status == GateStatus::Pass {
            gate_id()
        } else {
            Vec::new()
        },
        gates_failed: if gate.status == GateStatus::Fail {
            gate_id()
        } else {
            Vec::new()
        },
        next_actions: gate.next_actions.clone(),
    }
}
