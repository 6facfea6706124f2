//! Initial state projection

use pps_schema::{Envelope, PipelineState, CONTEXT_BLOCK_KEY};
use serde_json::Value;

/// Project the accumulated state an envelope carries
///
/// The result is an independent copy. The context map is the envelope's
/// structured context with `context_block` set to the envelope's summary
/// string. An empty summary leaves a structured `context_block` entry in
/// place. The applied index starts empty; the caller owns dedup history.
#[must_use]
pub fn initial_state(envelope: &Envelope) -> PipelineState {
    let mut context = envelope.context.clone();
    let structured = context
        .get(CONTEXT_BLOCK_KEY)
        .is_some_and(|value| !value.is_string());
    if !(structured && envelope.context_block.is_empty()) {
        context.insert(
            CONTEXT_BLOCK_KEY.to_string(),
            Value::String(envelope.context_block.clone()),
        );
    }

    PipelineState {
        context,
        appendices_index: envelope.appendices_index.clone(),
        state: envelope.state.clone(),
        applied_index: Vec::new(),
    }
}
