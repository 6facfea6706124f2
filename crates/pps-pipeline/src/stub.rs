//! Stub generator
//!
//! Deterministic minimal results for the eight standard step kinds, for demos
//! and tests without a model backend:
//! - gate from the catalog's ownership table, `pass` (or `na` when the step
//!   owns no gate)
//! - pinned steps echo the focus freeze label
//! - the freeze authority emits a freeze reference and its OpenAPI appendix

use crate::error::GenerationError;
use crate::generator::Generator;
use pps_schema::{
    AppendixKind, AppendixRef, ChangeLogEntry, Compatibility, ContractFreezeRef,
    DecisionLogEntry, Envelope, GateCatalog, GateStatus, PromptResult, CONTEXT_BLOCK_KEY,
    GATE_TARGET_NA,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Label the stub freeze authority freezes the contract under
pub const STUB_FREEZE_LABEL: &str = "API-v0";

/// Appendix id of the stub OpenAPI document
pub const STUB_OPENAPI_APPENDIX_ID: &str = "APX-OPENAPI-v0";

/// Generator returning canned results
#[derive(Debug, Clone, Default)]
pub struct StubGenerator {
    catalog: GateCatalog,
    statuses: HashMap<String, GateStatus>,
}

impl StubGenerator {
    /// Stub using `catalog` for gate ownership
    #[inline]
    #[must_use]
    pub fn new(catalog: GateCatalog) -> Self {
        Self {
            catalog,
            statuses: HashMap::new(),
        }
    }

    /// Force the gate status reported for `prompt_id`
    #[inline]
    #[must_use]
    pub fn with_status(mut self, prompt_id: impl Into<String>, status: GateStatus) -> Self {
        self.statuses.insert(prompt_id.into(), status);
        self
    }

    /// Build the canned result for `envelope`
    #[must_use]
    pub fn stub_result(&self, envelope: &Envelope) -> PromptResult {
        let prompt_id = envelope.meta.prompt_id.as_str();
        let gate_target = self.catalog.gate_target_for(prompt_id);
        let owns_gate = gate_target != GATE_TARGET_NA;
        let status = self.statuses.get(prompt_id).cloned().unwrap_or(if owns_gate {
            GateStatus::Pass
        } else {
            GateStatus::NotApplicable
        });

        let mut result = PromptResult::empty(prompt_id, &envelope.meta.run_id);
        if let Some(meta) = result.meta.as_mut() {
            meta.iteration_id.clone_from(&envelope.meta.iteration_id);
            if self.catalog.is_pinned(prompt_id) {
                meta.applied_to_freeze_label =
                    envelope.focus_freeze_label().unwrap_or_default().to_string();
            }
        }

        if let Some(gate) = result.gate_result.as_mut() {
            gate.gate_id = if owns_gate { gate_target.to_string() } else { String::new() };
            if status != GateStatus::NotApplicable {
                gate.reason = format!("stub {status}");
            }
            if owns_gate {
                gate.next_actions = vec!["Run next prompt in sequence".to_string()];
            }
            gate.status = status;
        }

        let block = if envelope.context_block.is_empty() {
            format!("{prompt_id}: stub output")
        } else {
            format!("{}\n{prompt_id}: stub output", envelope.context_block)
        };
        result
            .context_updates
            .insert(CONTEXT_BLOCK_KEY.to_string(), Value::String(block));

        if self.catalog.is_freeze_authority(prompt_id) {
            self.freeze_contract(envelope, &mut result);
        }

        result
    }

    fn freeze_contract(&self, envelope: &Envelope, result: &mut PromptResult) {
        let prompt_id = envelope.meta.prompt_id.as_str();
        let date = envelope.meta.iteration_id.get(..10).unwrap_or_default();

        let mut openapi = AppendixRef::new(STUB_OPENAPI_APPENDIX_ID, AppendixKind::Openapi);
        openapi.summary = "Stub OpenAPI contract".to_string();
        openapi.location = "appendices/openapi-v0.yaml".to_string();
        openapi.produced_by = prompt_id.to_string();
        openapi.updated_on = date.to_string();
        if !envelope.has_appendix(STUB_OPENAPI_APPENDIX_ID) {
            if let Some(appendices) = result.appendices_updates.as_mut() {
                appendices.added.push(openapi);
            }
        }

        if let Some(updates) = result.state_updates.as_mut() {
            updates.decision_log_added.push(DecisionLogEntry {
                id: None,
                date: date.to_string(),
                decision: format!("Freeze contract as {STUB_FREEZE_LABEL}"),
                rationale: "Front-end and back-end plans need a stable contract".to_string(),
                impact: "Later steps pin to this label".to_string(),
                owner: prompt_id.to_string(),
            });
            updates.changelog_added.push(ChangeLogEntry {
                date: date.to_string(),
                changed_area: "API_CONTRACT".to_string(),
                change: format!("Contract frozen as {STUB_FREEZE_LABEL}"),
                reason: "Contract freeze gate".to_string(),
                compatibility: Compatibility::Major,
                impact: "FE/BE".to_string(),
            });
        }

        result.contract_freeze_ref = Some(ContractFreezeRef::new(
            STUB_FREEZE_LABEL,
            STUB_OPENAPI_APPENDIX_ID,
            date,
        ));
    }
}

#[async_trait::async_trait]
impl Generator for StubGenerator {
    async fn generate(
        &self,
        envelope: &Envelope,
        _template: &str,
    ) -> Result<PromptResult, GenerationError> {
        debug!(prompt_id = %envelope.meta.prompt_id, "stub result");
        Ok(self.stub_result(envelope))
    }
}
