//! Two-phase patch validation
//!
//! Phase A checks shape and yields a [`ValidatedPatch`], a view with no
//! optional blocks left. Phase B checks the patch against the envelope it was
//! produced for. Neither phase mutates anything, and each phase collects every
//! finding instead of stopping at the first.

use crate::error::MergeError;
use pps_schema::{
    AppendixRef, AppendixUpdates, ContextMap, ContractFreezeRef, Envelope, GateCatalog,
    GateResult, GateStatus, PromptResult, ResultMeta, StateUpdates, OUTPUT_FORMAT,
};
use std::collections::HashSet;

/// A shape-checked patch
///
/// Only [`PatchValidator::check_shape`] constructs this type, so holding one
/// proves meta carries both identity fields and that the three required
/// blocks are present.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedPatch<'a> {
    pub(crate) meta: &'a ResultMeta,
    pub(crate) gate: &'a GateResult,
    pub(crate) appendices: &'a AppendixUpdates,
    pub(crate) updates: &'a StateUpdates,
    pub(crate) context_updates: &'a ContextMap,
    pub(crate) freeze_ref: Option<&'a ContractFreezeRef>,
    pub(crate) warnings: &'a [String],
}

impl<'a> ValidatedPatch<'a> {
    /// Identity metadata
    #[must_use]
    pub fn meta(&self) -> &'a ResultMeta {
        self.meta
    }

    /// Step id
    #[must_use]
    pub fn prompt_id(&self) -> &'a str {
        &self.meta.prompt_id
    }

    /// Gate outcome
    #[must_use]
    pub fn gate(&self) -> &'a GateResult {
        self.gate
    }

    /// Appendix changes
    #[must_use]
    pub fn appendices(&self) -> &'a AppendixUpdates {
        self.appendices
    }

    /// Log additions
    #[must_use]
    pub fn updates(&self) -> &'a StateUpdates {
        self.updates
    }

    /// Context updates
    #[must_use]
    pub fn context_updates(&self) -> &'a ContextMap {
        self.context_updates
    }

    /// Freeze reference the patch proposes, if any
    #[must_use]
    pub fn freeze_ref(&self) -> Option<&'a ContractFreezeRef> {
        self.freeze_ref
    }

    /// Free-form warnings carried by the patch
    #[must_use]
    pub fn warnings(&self) -> &'a [String] {
        self.warnings
    }
}

/// Patch validator bound to a gate catalog
#[derive(Debug, Clone, Copy)]
pub struct PatchValidator<'c> {
    catalog: &'c GateCatalog,
}

impl<'c> PatchValidator<'c> {
    /// Create validator over `catalog`
    #[inline]
    #[must_use]
    pub fn new(catalog: &'c GateCatalog) -> Self {
        Self { catalog }
    }

    /// Run both phases
    ///
    /// Phase B only runs when Phase A passes.
    ///
    /// # Errors
    /// Every finding of the first failing phase.
    pub fn validate<'p>(
        &self,
        envelope: &Envelope,
        patch: &'p PromptResult,
    ) -> Result<ValidatedPatch<'p>, Vec<MergeError>> {
        let validated = self.check_shape(patch)?;
        let errors = self.check_semantics(envelope, &validated);
        if errors.is_empty() {
            Ok(validated)
        } else {
            Err(errors)
        }
    }

    /// Phase A: required blocks, identity fields and output format
    ///
    /// # Errors
    /// One entry per missing field or block, plus an output format error.
    pub fn check_shape<'p>(
        &self,
        patch: &'p PromptResult,
    ) -> Result<ValidatedPatch<'p>, Vec<MergeError>> {
        let mut errors = Vec::new();

        let meta = patch.meta.as_ref();
        if meta.map_or(true, |m| m.prompt_id.is_empty()) {
            errors.push(MergeError::missing("meta.prompt_id"));
        }
        if meta.map_or(true, |m| m.run_id.is_empty()) {
            errors.push(MergeError::missing("meta.run_id"));
        }
        if patch.gate_result.is_none() {
            errors.push(MergeError::missing("gate_result"));
        }
        if patch.appendices_updates.is_none() {
            errors.push(MergeError::missing("appendices_updates"));
        }
        if patch.state_updates.is_none() {
            errors.push(MergeError::missing("state_updates"));
        }
        if let Some(found) = patch.output_format.as_deref() {
            if found != OUTPUT_FORMAT {
                errors.push(MergeError::OutputFormat {
                    found: found.to_string(),
                });
            }
        }

        match (
            meta,
            &patch.gate_result,
            &patch.appendices_updates,
            &patch.state_updates,
        ) {
            (Some(meta), Some(gate), Some(appendices), Some(updates)) if errors.is_empty() => {
                Ok(ValidatedPatch {
                    meta,
                    gate,
                    appendices,
                    updates,
                    context_updates: &patch.context_updates,
                    freeze_ref: patch.contract_freeze_ref.as_ref(),
                    warnings: &patch.warnings,
                })
            }
            _ => Err(errors),
        }
    }

    /// Phase B: gate semantics, freeze pinning and appendix integrity
    #[must_use]
    pub fn check_semantics(
        &self,
        envelope: &Envelope,
        patch: &ValidatedPatch<'_>,
    ) -> Vec<MergeError> {
        let mut errors = Vec::new();
        self.check_gate(&envelope.meta.gate_target, patch.gate, &mut errors);
        self.check_freeze_pinning(envelope, patch, &mut errors);
        check_appendices(&envelope.appendices_index, patch.appendices, &mut errors);
        errors
    }

    fn check_gate(&self, gate_target: &str, gate: &GateResult, errors: &mut Vec<MergeError>) {
        if gate_target == pps_schema::GATE_TARGET_NA {
            if gate.status != GateStatus::NotApplicable {
                errors.push(MergeError::GateNotApplicable {
                    status: gate.status.to_string(),
                });
            }
            return;
        }

        if !self.catalog.contains_gate(gate_target) {
            errors.push(MergeError::UnknownGateTarget {
                gate_target: gate_target.to_string(),
            });
        }
        if gate.gate_id != gate_target {
            errors.push(MergeError::GateMismatch {
                gate_id: gate.gate_id.clone(),
                gate_target: gate_target.to_string(),
            });
        }
        if !gate.status.is_decisive() {
            errors.push(MergeError::GateUndecided {
                status: gate.status.to_string(),
            });
        }
    }

    fn check_freeze_pinning(
        &self,
        envelope: &Envelope,
        patch: &ValidatedPatch<'_>,
        errors: &mut Vec<MergeError>,
    ) {
        let prompt_id = patch.prompt_id();
        if !self.catalog.is_pinned(prompt_id) {
            return;
        }

        let applied = patch.meta.applied_to_freeze_label.as_str();
        let focus = envelope.focus_freeze_label().filter(|l| !l.is_empty());
        let frozen = envelope.state.contract_freeze_ref.label.as_str();

        if focus.is_none() {
            errors.push(MergeError::MissingFocusFreezeLabel {
                prompt_id: prompt_id.to_string(),
            });
        }
        if applied.is_empty() {
            errors.push(MergeError::MissingAppliedFreezeLabel {
                prompt_id: prompt_id.to_string(),
            });
        }
        if let Some(focus) = focus {
            if !applied.is_empty() && applied != focus {
                errors.push(MergeError::FocusLabelMismatch {
                    applied: applied.to_string(),
                    focus: focus.to_string(),
                });
            }
        }
        if !frozen.is_empty() && applied != frozen {
            errors.push(MergeError::FrozenLabelMismatch {
                applied: applied.to_string(),
                frozen: frozen.to_string(),
            });
        }
    }
}

fn check_appendices(
    index: &[AppendixRef],
    updates: &AppendixUpdates,
    errors: &mut Vec<MergeError>,
) {
    let existing: HashSet<&str> = index.iter().map(|a| a.id.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut repeated: HashSet<&str> = HashSet::new();

    for added in &updates.added {
        let id = added.id.as_str();
        if existing.contains(id) {
            errors.push(MergeError::AppendixExists { id: id.to_string() });
        } else if !seen.insert(id) && repeated.insert(id) {
            errors.push(MergeError::AppendixAddedTwice { id: id.to_string() });
        }
    }
    for updated in &updates.updated {
        if !existing.contains(updated.id.as_str()) {
            errors.push(MergeError::AppendixMissing {
                id: updated.id.clone(),
            });
        }
    }
}
