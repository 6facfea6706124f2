//! Merge engine
//!
//! Folds one validated patch into the state an envelope carries:
//!
//! 1. dedup on `(prompt_id, run_id)` against the caller's applied index
//! 2. two-phase validation; any error aborts with nothing changed
//! 3. policy-driven fold of every patch-writable field into a fresh copy
//! 4. consistency rules and the token hygiene scan, as warnings
//! 5. applied index extension and iteration summary
//!
//! The engine is synchronous and never mutates its inputs.

use crate::consistency::{ConsistencyChecker, ConsistencyRule};
use crate::error::{MergeError, MergeWarning};
use crate::policy::{apply_field, STATE_FIELDS};
use crate::state_builder::initial_state;
use crate::summary::{build_summary, IterationSummary};
use crate::validator::{PatchValidator, ValidatedPatch};
use pps_schema::{
    AppliedEntry, Envelope, GateCatalog, PipelineState, PromptResult,
    DEFAULT_APPENDIX_THRESHOLD_CHARS,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Merge engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Hygiene threshold used when the envelope does not carry one
    pub appendix_threshold_chars: usize,
    /// Gate catalog
    pub gates: GateCatalog,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            appendix_threshold_chars: DEFAULT_APPENDIX_THRESHOLD_CHARS,
            gates: GateCatalog::standard(),
        }
    }
}

impl MergeConfig {
    /// Set hygiene threshold
    #[inline]
    #[must_use]
    pub fn with_appendix_threshold(mut self, chars: usize) -> Self {
        self.appendix_threshold_chars = chars;
        self
    }

    /// Set gate catalog
    #[inline]
    #[must_use]
    pub fn with_gates(mut self, gates: GateCatalog) -> Self {
        self.gates = gates;
        self
    }
}

/// Result of one merge call
///
/// Three shapes occur:
/// - folded: `state`, `applied_index` and `summary` set, no errors
/// - duplicate: nothing set, no errors, the single duplicate warning
/// - rejected: nothing set, at least one error
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Merged state
    pub state: Option<PipelineState>,
    /// Applied index including this patch
    pub applied_index: Option<Vec<AppliedEntry>>,
    /// What the merge left behind
    pub summary: Option<IterationSummary>,
    /// Fatal findings
    pub errors: Vec<MergeError>,
    /// Non-fatal findings
    pub warnings: Vec<MergeWarning>,
}

impl MergeOutcome {
    fn duplicate() -> Self {
        Self {
            state: None,
            applied_index: None,
            summary: None,
            errors: Vec::new(),
            warnings: vec![MergeWarning::Duplicate],
        }
    }

    fn rejected(errors: Vec<MergeError>, warnings: Vec<MergeWarning>) -> Self {
        Self {
            state: None,
            applied_index: None,
            summary: None,
            errors,
            warnings,
        }
    }

    /// No fatal findings
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Patch had already been folded in
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.is_ok() && self.state.is_none()
    }

    /// Error messages in order
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Warning messages in order
    #[must_use]
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }
}

/// Single-writer merge engine
#[derive(Debug, Default)]
pub struct MergeEngine {
    config: MergeConfig,
    checker: ConsistencyChecker,
}

impl MergeEngine {
    /// Create engine with the built-in consistency rules
    #[must_use]
    pub fn new(config: MergeConfig) -> Self {
        Self {
            config,
            checker: ConsistencyChecker::standard(),
        }
    }

    /// Register an additional consistency rule
    #[must_use]
    pub fn with_consistency_rule(mut self, rule: impl ConsistencyRule + 'static) -> Self {
        self.checker = self.checker.with_rule(rule);
        self
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Fold `patch` into the state `envelope` carries
    ///
    /// `applied` is the caller's dedup history; it is copied, never mutated.
    #[must_use]
    pub fn merge(
        &self,
        envelope: &Envelope,
        patch: &PromptResult,
        applied: &[AppliedEntry],
    ) -> MergeOutcome {
        let key = patch.applied_entry();
        if applied.contains(&key) {
            debug!(entry = %key, "patch already applied");
            return MergeOutcome::duplicate();
        }

        let validator = PatchValidator::new(&self.config.gates);
        let validated = match validator.validate(envelope, patch) {
            Ok(validated) => validated,
            Err(errors) => {
                warn!(entry = %key, errors = errors.len(), "merge rejected");
                return MergeOutcome::rejected(errors, patch_warnings(&patch.warnings));
            }
        };
        debug!(entry = %key, "patch validated");

        let mut state = initial_state(envelope);
        state.applied_index = applied.to_vec();

        for field in STATE_FIELDS {
            if apply_field(&mut state, field, &validated, &self.config.gates) {
                debug!(field = field.path(), policy = ?field.policy(), "field updated");
            }
        }

        let mut warnings = patch_warnings(validated.warnings());
        warnings.extend(self.checker.check(&state));
        warnings.extend(self.hygiene_warnings(envelope, &validated));
        for warning in &warnings {
            debug!(%warning, "merge warning");
        }

        state.applied_index.push(key.clone());
        let summary = build_summary(&state, validated.gate());

        info!(
            entry = %key,
            applied = state.applied_index.len(),
            warnings = warnings.len(),
            "patch merged"
        );

        MergeOutcome {
            applied_index: Some(state.applied_index.clone()),
            state: Some(state),
            summary: Some(summary),
            errors: Vec::new(),
            warnings,
        }
    }

    /// Threshold in effect for `envelope`
    #[must_use]
    pub fn appendix_threshold(&self, envelope: &Envelope) -> usize {
        envelope
            .meta
            .token_hygiene
            .as_ref()
            .map_or(self.config.appendix_threshold_chars, |h| {
                h.appendix_threshold_chars
            })
    }

    fn hygiene_warnings(
        &self,
        envelope: &Envelope,
        patch: &ValidatedPatch<'_>,
    ) -> Vec<MergeWarning> {
        let threshold = self.appendix_threshold(envelope);
        patch
            .context_updates()
            .iter()
            .filter(|(_, value)| inline_len(value).is_some_and(|len| len > threshold))
            .map(|(key, _)| MergeWarning::TokenHygiene {
                key: key.clone(),
                threshold,
            })
            .collect()
    }
}

fn patch_warnings(warnings: &[String]) -> Vec<MergeWarning> {
    warnings.iter().cloned().map(MergeWarning::Patch).collect()
}

/// Inline size of a context value in characters; `None` for null
fn inline_len(value: &Value) -> Option<usize> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.chars().count()),
        other => Some(other.to_string().chars().count()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pps_schema::{EnvelopeMeta, TokenHygiene};
    use serde_json::json;

    #[test]
    fn inline_len_counts_strings_and_json() {
        assert_eq!(inline_len(&json!(null)), None);
        assert_eq!(inline_len(&json!("héllo")), Some(5));
        assert_eq!(inline_len(&json!({"a": 1})), Some(7));
    }

    #[test]
    fn envelope_threshold_overrides_config() {
        let engine = MergeEngine::new(MergeConfig::default().with_appendix_threshold(10));
        let mut envelope = Envelope::new(EnvelopeMeta::new("APP/01_mvp-cutter", "R"));
        assert_eq!(engine.appendix_threshold(&envelope), 4000);

        envelope.meta.token_hygiene = None;
        assert_eq!(engine.appendix_threshold(&envelope), 10);

        envelope.meta.token_hygiene = Some(TokenHygiene {
            appendix_threshold_chars: 25,
            ..TokenHygiene::default()
        });
        assert_eq!(engine.appendix_threshold(&envelope), 25);
    }

    #[test]
    fn config_reads_partial_toml() {
        let config: MergeConfig = toml::from_str("appendix_threshold_chars = 120").unwrap();
        assert_eq!(config.appendix_threshold_chars, 120);
        assert_eq!(config.gates, GateCatalog::standard());
    }

    #[test]
    fn outcome_shapes() {
        let duplicate = MergeOutcome::duplicate();
        assert!(duplicate.is_ok());
        assert!(duplicate.is_duplicate());
        assert_eq!(
            duplicate.warning_messages(),
            vec!["Duplicate (prompt_id, run_id): no-op"]
        );

        let rejected = MergeOutcome::rejected(vec![MergeError::missing("gate_result")], vec![]);
        assert!(!rejected.is_ok());
        assert!(!rejected.is_duplicate());
    }
}
