//! Next-envelope projection
//!
//! Builds the envelope for the following step from a base envelope, the
//! merged state, new identity fields and a new focus payload.

use pps_schema::{ContextMap, Envelope, PipelineState, CONTEXT_BLOCK_KEY};
use serde_json::Value;

/// Identity fields replaced on the projected envelope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaOverrides {
    /// Next step id
    pub prompt_id: String,
    /// Next run id
    pub run_id: String,
    /// Gate target; base value kept when `None`
    pub gate_target: Option<String>,
    /// Iteration id; base value kept when `None`
    pub iteration_id: Option<String>,
}

impl MetaOverrides {
    /// Create overrides for a step run
    #[inline]
    #[must_use]
    pub fn new(prompt_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            prompt_id: prompt_id.into(),
            run_id: run_id.into(),
            gate_target: None,
            iteration_id: None,
        }
    }

    /// With gate target
    #[inline]
    #[must_use]
    pub fn with_gate_target(mut self, gate_target: impl Into<String>) -> Self {
        self.gate_target = Some(gate_target.into());
        self
    }

    /// With iteration id
    #[inline]
    #[must_use]
    pub fn with_iteration_id(mut self, iteration_id: impl Into<String>) -> Self {
        self.iteration_id = Some(iteration_id.into());
        self
    }
}

/// Project the next envelope
///
/// State context, appendices, logs and freeze reference are copied in.
/// Meta identity fields and focus are replaced wholesale. The rest of the
/// base meta, constraints and project carry over unchanged.
#[must_use]
pub fn project_envelope(
    base: &Envelope,
    state: &PipelineState,
    overrides: MetaOverrides,
    focus: ContextMap,
) -> Envelope {
    let mut context = state.context.clone();
    let context_block = match context.remove(CONTEXT_BLOCK_KEY) {
        Some(Value::String(block)) => block,
        Some(other) => {
            // non-string summaries stay in the structured map
            context.insert(CONTEXT_BLOCK_KEY.to_string(), other);
            String::new()
        }
        None => String::new(),
    };

    let mut meta = base.meta.clone();
    meta.prompt_id = overrides.prompt_id;
    meta.run_id = overrides.run_id;
    if let Some(gate_target) = overrides.gate_target {
        meta.gate_target = gate_target;
    }
    if let Some(iteration_id) = overrides.iteration_id {
        meta.iteration_id = iteration_id;
    }

    Envelope {
        pps_version: base.pps_version.clone(),
        meta,
        constraints: base.constraints.clone(),
        project: base.project.clone(),
        context_block,
        context,
        appendices_index: state.appendices_index.clone(),
        state: state.state.clone(),
        focus,
    }
}
