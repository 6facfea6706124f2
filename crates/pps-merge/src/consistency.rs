//! Post-merge consistency checks
//!
//! Rules run over the finished state and only ever produce warnings.

use crate::error::MergeWarning;
use pps_schema::PipelineState;
use std::fmt::Debug;

/// A referential-integrity rule over merged state
pub trait ConsistencyRule: Send + Sync + Debug {
    /// Stable rule name
    fn name(&self) -> &'static str;

    /// Findings for `state`; empty when consistent
    fn check(&self, state: &PipelineState) -> Vec<MergeWarning>;
}

/// A frozen contract must point at an indexed OpenAPI appendix
#[derive(Debug, Clone, Copy, Default)]
pub struct FreezeAppendixRule;

impl ConsistencyRule for FreezeAppendixRule {
    fn name(&self) -> &'static str {
        "freeze_appendix"
    }

    fn check(&self, state: &PipelineState) -> Vec<MergeWarning> {
        let freeze = &state.state.contract_freeze_ref;
        if freeze.label.is_empty()
            || freeze.openapi_appendix_id.is_empty()
            || state.has_appendix(&freeze.openapi_appendix_id)
        {
            return Vec::new();
        }
        vec![MergeWarning::consistency(
            self.name(),
            format!(
                "contract_freeze_ref references OpenAPI appendix \"{}\" which is not in appendices_index",
                freeze.openapi_appendix_id
            ),
        )]
    }
}

/// Ordered list of consistency rules
#[derive(Debug)]
pub struct ConsistencyChecker {
    rules: Vec<Box<dyn ConsistencyRule>>,
}

impl Default for ConsistencyChecker {
    fn default() -> Self {
        Self::standard()
    }
}

impl ConsistencyChecker {
    /// Checker with no rules
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Checker with the built-in rules
    #[must_use]
    pub fn standard() -> Self {
        Self::empty().with_rule(FreezeAppendixRule)
    }

    /// Append a rule
    #[must_use]
    pub fn with_rule(mut self, rule: impl ConsistencyRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Number of rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// No rules registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule in registration order
    #[must_use]
    pub fn check(&self, state: &PipelineState) -> Vec<MergeWarning> {
        self.rules.iter().flat_map(|rule| rule.check(state)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pps_schema::{AppendixKind, AppendixRef, ContractFreezeRef};

    fn frozen_state(appendix_id: &str) -> PipelineState {
        let mut state = PipelineState::default();
        state.state.contract_freeze_ref = ContractFreezeRef::new("API-v0", appendix_id, "");
        state
    }

    #[test]
    fn dangling_freeze_reference_warns() {
        let warnings = ConsistencyChecker::standard().check(&frozen_state("APX-1"));
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].to_string(),
            "contract_freeze_ref references OpenAPI appendix \"APX-1\" which is not in appendices_index"
        );
    }

    #[test]
    fn indexed_or_unset_reference_is_clean() {
        let mut state = frozen_state("APX-1");
        state
            .appendices_index
            .push(AppendixRef::new("APX-1", AppendixKind::Openapi));
        assert!(ConsistencyChecker::standard().check(&state).is_empty());

        assert!(ConsistencyChecker::standard()
            .check(&frozen_state(""))
            .is_empty());
        assert!(ConsistencyChecker::standard()
            .check(&PipelineState::default())
            .is_empty());
    }

    #[derive(Debug)]
    struct NoOpenQuestions;

    impl ConsistencyRule for NoOpenQuestions {
        fn name(&self) -> &'static str {
            "no_open_questions"
        }

        fn check(&self, state: &PipelineState) -> Vec<MergeWarning> {
            if state.state.open_questions.is_empty() {
                Vec::new()
            } else {
                vec![MergeWarning::consistency(self.name(), "open questions remain")]
            }
        }
    }

    #[test]
    fn custom_rules_run_after_builtin_ones() {
        let checker = ConsistencyChecker::standard().with_rule(NoOpenQuestions);
        assert_eq!(checker.len(), 2);

        let mut state = frozen_state("APX-9");
        state.state.open_questions.push(pps_schema::OpenQuestionEntry {
            id: "Q1".into(),
            question: "Which IdP?".into(),
            context: String::new(),
            options: vec![],
            recommended: String::new(),
            owner: String::new(),
            due_by: String::new(),
        });

        let rules: Vec<&str> = checker
            .check(&state)
            .iter()
            .map(|w| match w {
                MergeWarning::Consistency { rule, .. } => *rule,
                _ => "",
            })
            .collect();
        assert_eq!(rules, vec!["freeze_appendix", "no_open_questions"]);
    }
}
