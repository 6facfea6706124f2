//! Per-field merge policy
//!
//! Every field of [`PipelineState`] a patch can touch is listed in
//! [`STATE_FIELDS`] with the single policy that governs it:
//!
//! | field | policy |
//! |---|---|
//! | `context` | recurse |
//! | `appendices_index` | keyed upsert |
//! | `state.decision_log` | append-only |
//! | `state.open_questions` | append-only |
//! | `state.changelog` | append-only |
//! | `state.change_requests` | append-only |
//! | `state.contract_freeze_ref` | authority replace |
//!
//! Inside the context map, values under [`CONTEXT_APPEND_ONLY_KEYS`] that are
//! arrays concatenate; other maps recurse and everything else replaces.

use crate::validator::ValidatedPatch;
use pps_schema::{AppendixRef, ContextMap, GateCatalog, PipelineState};
use serde_json::Value;

/// How a patch value combines with the current value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPolicy {
    /// Incoming value overwrites
    Replace,
    /// Maps merge key by key, recursively
    Recurse,
    /// Incoming entries are appended; nothing is removed or reordered
    AppendOnly,
    /// Entries keyed by id: updates replace in place, additions append
    KeyedUpsert,
    /// Replace, but only when the patch comes from the freeze authority
    AuthorityReplace,
}

/// A patch-writable field of the pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    /// `context`
    Context,
    /// `appendices_index`
    AppendicesIndex,
    /// `state.decision_log`
    DecisionLog,
    /// `state.open_questions`
    OpenQuestions,
    /// `state.changelog`
    Changelog,
    /// `state.change_requests`
    ChangeRequests,
    /// `state.contract_freeze_ref`
    ContractFreezeRef,
}

/// Fields in the order the engine folds them
pub const STATE_FIELDS: [StateField; 7] = [
    StateField::Context,
    StateField::AppendicesIndex,
    StateField::DecisionLog,
    StateField::OpenQuestions,
    StateField::Changelog,
    StateField::ChangeRequests,
    StateField::ContractFreezeRef,
];

/// Context keys whose array values concatenate instead of replacing
pub const CONTEXT_APPEND_ONLY_KEYS: [&str; 3] = ["decision_log", "open_questions", "changelog"];

impl StateField {
    /// Policy governing this field
    #[must_use]
    pub const fn policy(self) -> FieldPolicy {
        match self {
            Self::Context => FieldPolicy::Recurse,
            Self::AppendicesIndex => FieldPolicy::KeyedUpsert,
            Self::DecisionLog | Self::OpenQuestions | Self::Changelog | Self::ChangeRequests => {
                FieldPolicy::AppendOnly
            }
            Self::ContractFreezeRef => FieldPolicy::AuthorityReplace,
        }
    }

    /// Dotted path of the field in the serialized state
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::AppendicesIndex => "appendices_index",
            Self::DecisionLog => "state.decision_log",
            Self::OpenQuestions => "state.open_questions",
            Self::Changelog => "state.changelog",
            Self::ChangeRequests => "state.change_requests",
            Self::ContractFreezeRef => "state.contract_freeze_ref",
        }
    }
}

/// Fold one field of a validated patch into `state`
///
/// Returns whether the field changed.
pub fn apply_field(
    state: &mut PipelineState,
    field: StateField,
    patch: &ValidatedPatch<'_>,
    catalog: &GateCatalog,
) -> bool {
    let updates = patch.updates();
    match field {
        StateField::Context => {
            merge_context(&mut state.context, patch.context_updates());
            !patch.context_updates().is_empty()
        }
        StateField::AppendicesIndex => upsert_appendices(
            &mut state.appendices_index,
            &patch.appendices().added,
            &patch.appendices().updated,
        ),
        StateField::DecisionLog => append(&mut state.state.decision_log, &updates.decision_log_added),
        StateField::OpenQuestions => {
            append(&mut state.state.open_questions, &updates.open_questions_added)
        }
        StateField::Changelog => append(&mut state.state.changelog, &updates.changelog_added),
        StateField::ChangeRequests => {
            append(&mut state.state.change_requests, &updates.change_requests_added)
        }
        StateField::ContractFreezeRef => match patch.freeze_ref() {
            Some(freeze) if catalog.is_freeze_authority(patch.prompt_id()) => {
                state.state.contract_freeze_ref = freeze.clone();
                true
            }
            _ => false,
        },
    }
}

fn append<T: Clone>(log: &mut Vec<T>, added: &[T]) -> bool {
    log.extend_from_slice(added);
    !added.is_empty()
}

/// Apply appendix changes keyed by id
///
/// Updates replace the entry with the same id in place; additions whose id
/// is not yet indexed append in patch order. Unknown updates and colliding
/// additions are skipped.
pub fn upsert_appendices(
    index: &mut Vec<AppendixRef>,
    added: &[AppendixRef],
    updated: &[AppendixRef],
) -> bool {
    let mut changed = false;
    for update in updated {
        if let Some(slot) = index.iter_mut().find(|a| a.id == update.id) {
            *slot = update.clone();
            changed = true;
        }
    }
    for addition in added {
        if !index.iter().any(|a| a.id == addition.id) {
            index.push(addition.clone());
            changed = true;
        }
    }
    changed
}

/// Deep-merge `updates` into `target`
pub fn merge_context(target: &mut ContextMap, updates: &ContextMap) {
    for (key, incoming) in updates {
        let append_only = CONTEXT_APPEND_ONLY_KEYS.contains(&key.as_str());
        match (target.get_mut(key), incoming) {
            (Some(Value::Array(existing)), Value::Array(more)) if append_only => {
                existing.extend(more.iter().cloned());
            }
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_context(existing, nested);
            }
            _ => {
                target.insert(key.clone(), incoming.clone());
            }
        }
    }
}
