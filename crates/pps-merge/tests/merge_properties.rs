use pps_merge::{MergeConfig, MergeEngine};
use pps_schema::{ContractFreezeRef, GateStatus, STANDARD_STEP_IDS};
use pps_test_utils::{
    appendix, change, change_request, decision, envelope, passing_result, question, step_envelope,
};
use proptest::prelude::*;

fn engine() -> MergeEngine {
    MergeEngine::new(MergeConfig::default())
}

fn status_strategy() -> impl Strategy<Value = GateStatus> {
    prop_oneof![
        Just(GateStatus::Pass),
        Just(GateStatus::Fail),
        Just(GateStatus::NotApplicable),
        "[a-z]{1,6}".prop_map(GateStatus::from),
    ]
}

proptest! {
    #[test]
    fn prop_resubmission_is_idempotent(run in "[A-Z0-9]{1,10}") {
        let env = step_envelope("APP/02_ux-flows", &run);
        let result = passing_result(&env);
        let engine = engine();

        let first = engine.merge(&env, &result, &[]);
        prop_assert!(first.is_ok());
        let applied = first.applied_index.clone().unwrap_or_default();

        let second = engine.merge(&env, &result, &applied);
        prop_assert!(second.is_duplicate());
        prop_assert_eq!(second.warnings.len(), 1);
    }

    #[test]
    fn prop_logs_only_grow(
        existing in prop::collection::vec("[a-z ]{1,12}", 0..5),
        added in prop::collection::vec("[a-z ]{1,12}", 0..5),
    ) {
        let mut env = step_envelope("APP/01_mvp-cutter", "RUN-1");
        env.state.decision_log = existing.iter().map(|t| decision(t)).collect();
        env.state.open_questions = existing
            .iter()
            .enumerate()
            .map(|(i, t)| question(&format!("Q-{i}"), t))
            .collect();
        env.state.changelog = existing.iter().map(|t| change("MVP_SCOPE", t)).collect();
        env.state.change_requests = existing
            .iter()
            .enumerate()
            .map(|(i, t)| change_request(&format!("CR-{i}"), t))
            .collect();
        let mut result = passing_result(&env);
        if let Some(updates) = result.state_updates.as_mut() {
            updates.decision_log_added = added.iter().map(|t| decision(t)).collect();
            updates.open_questions_added = added
                .iter()
                .enumerate()
                .map(|(i, t)| question(&format!("QN-{i}"), t))
                .collect();
            updates.changelog_added = added.iter().map(|t| change("MVP_SCOPE", t)).collect();
            updates.change_requests_added = added
                .iter()
                .enumerate()
                .map(|(i, t)| change_request(&format!("CRN-{i}"), t))
                .collect();
        }
        let updates = result.state_updates.clone().unwrap_or_default();

        let outcome = engine().merge(&env, &result, &[]);
        let state = outcome.state.expect("state");
        let before = &env.state;
        let after = &state.state;
        let n = existing.len();

        prop_assert_eq!(after.decision_log.len(), n + added.len());
        prop_assert_eq!(&after.decision_log[..n], &before.decision_log[..]);
        prop_assert_eq!(&after.decision_log[n..], &updates.decision_log_added[..]);

        prop_assert_eq!(after.open_questions.len(), n + added.len());
        prop_assert_eq!(&after.open_questions[..n], &before.open_questions[..]);
        prop_assert_eq!(&after.open_questions[n..], &updates.open_questions_added[..]);

        prop_assert_eq!(after.changelog.len(), n + added.len());
        prop_assert_eq!(&after.changelog[..n], &before.changelog[..]);
        prop_assert_eq!(&after.changelog[n..], &updates.changelog_added[..]);

        prop_assert_eq!(after.change_requests.len(), n + added.len());
        prop_assert_eq!(&after.change_requests[..n], &before.change_requests[..]);
        prop_assert_eq!(&after.change_requests[n..], &updates.change_requests_added[..]);
    }

    #[test]
    fn prop_appendix_set_algebra(
        existing in 0usize..6,
        added in 0usize..6,
        update_mask in prop::collection::vec(any::<bool>(), 6),
    ) {
        let mut env = step_envelope("APP/03_architecture", "RUN-3");
        env.appendices_index = (0..existing).map(|i| appendix(&format!("E{i}"))).collect();
        let mut result = passing_result(&env);
        let updated_ids: Vec<String> = (0..existing)
            .filter(|i| update_mask[*i])
            .map(|i| format!("E{i}"))
            .collect();
        if let Some(updates) = result.appendices_updates.as_mut() {
            updates.added = (0..added).map(|i| appendix(&format!("N{i}"))).collect();
            updates.updated = updated_ids
                .iter()
                .map(|id| {
                    let mut a = appendix(id);
                    a.summary = "updated".into();
                    a
                })
                .collect();
        }

        let outcome = engine().merge(&env, &result, &[]);
        let state = outcome.state.expect("state");

        let ids: Vec<String> = state.appendices_index.iter().map(|a| a.id.clone()).collect();
        let expected: Vec<String> = (0..existing)
            .map(|i| format!("E{i}"))
            .chain((0..added).map(|i| format!("N{i}")))
            .collect();
        prop_assert_eq!(ids, expected);
        for a in &state.appendices_index {
            prop_assert_eq!(a.summary == "updated", updated_ids.contains(&a.id));
        }
    }

    #[test]
    fn prop_na_target_accepts_only_na(status in status_strategy()) {
        let env = envelope("APP/01_mvp-cutter", "RUN-1", "N/A");
        let result = passing_result(&env).with_gate("", status.clone());

        let outcome = engine().merge(&env, &result, &[]);
        prop_assert_eq!(outcome.is_ok(), status == GateStatus::NotApplicable);
    }

    #[test]
    fn prop_gate_target_accepts_only_pass_or_fail(status in status_strategy()) {
        let env = step_envelope("APP/07_integrations-async-security", "RUN-7");
        let result = passing_result(&env).with_gate("GATE_6_INTEGRATIONS_HARDENED", status.clone());

        let outcome = engine().merge(&env, &result, &[]);
        prop_assert_eq!(outcome.is_ok(), status.is_decisive());
    }

    #[test]
    fn prop_only_authority_writes_freeze(step in 0usize..STANDARD_STEP_IDS.len()) {
        let prompt_id = STANDARD_STEP_IDS[step];
        prop_assume!(prompt_id != "APP/05_frontend-plan" && prompt_id != "APP/06_backend-plan");
        let env = envelope(prompt_id, "RUN-X", "N/A");
        let mut result = passing_result(&env);
        result.contract_freeze_ref = Some(ContractFreezeRef::new("API-v1", "", ""));

        let outcome = engine().merge(&env, &result, &[]);
        let state = outcome.state.expect("state");

        let written = state.state.contract_freeze_ref.label == "API-v1";
        prop_assert_eq!(written, prompt_id == "APP/04_data-api-contract");
    }
}
