//! Document-level validation
//!
//! Checks a single document on its own, before any merge. Unlike the merge
//! validator these checks need no second document.

use pps_schema::{Envelope, GateCatalog, PromptResult, GATE_TARGET_NA, OUTPUT_FORMAT, PPS_VERSION};
use std::fmt;

/// Outcome of a document check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// One message per problem, in check order
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// No problems found
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "  - {error}")?;
        }
        Ok(())
    }
}

/// Check an envelope on its own
#[must_use]
pub fn validate_envelope(envelope: &Envelope, catalog: &GateCatalog) -> ValidationReport {
    let mut report = ValidationReport::default();

    if envelope.pps_version != PPS_VERSION {
        report.push(format!("pps_version must be \"{PPS_VERSION}\""));
    }
    if envelope.meta.run_id.is_empty() {
        report.push("meta.run_id required and must be unique per execution");
    }
    if envelope.meta.output_format != OUTPUT_FORMAT {
        report.push(format!("meta.output_format must be \"{OUTPUT_FORMAT}\""));
    }
    if let Some(hygiene) = &envelope.meta.token_hygiene {
        if hygiene.context_block_policy != "summary_only" {
            report.push("token_hygiene.context_block_policy must be 'summary_only'");
        }
    }
    let gate_target = envelope.meta.gate_target.as_str();
    if gate_target != GATE_TARGET_NA && !catalog.contains_gate(gate_target) {
        report.push(format!("unknown gate_target: {gate_target}"));
    }

    report
}

/// Check a result on its own
#[must_use]
pub fn validate_result(result: &PromptResult) -> ValidationReport {
    let mut report = ValidationReport::default();

    match &result.meta {
        None => report.push("prompt_result.meta required"),
        Some(meta) => {
            if meta.prompt_id.is_empty() {
                report.push("prompt_result.meta.prompt_id required");
            }
            if meta.run_id.is_empty() {
                report.push("prompt_result.meta.run_id required");
            }
        }
    }
    match &result.gate_result {
        None => report.push("prompt_result.gate_result required"),
        Some(gate) if !gate.status.is_recognized() => {
            report.push("gate_result.status must be pass | fail | na");
        }
        Some(_) => {}
    }
    if result.appendices_updates.is_none() {
        report.push("prompt_result.appendices_updates required");
    }
    if result.state_updates.is_none() {
        report.push("prompt_result.state_updates required");
    }

    report
}
