use pps_merge::{
    project_envelope, ErrorKind, MergeConfig, MergeEngine, MergeWarning, MetaOverrides,
    DUPLICATE_NOOP,
};
use pps_schema::{
    AppendixKind, AppendixRef, ContextMap, ContractFreezeRef, GateStatus, TokenHygiene,
    CONTEXT_BLOCK_KEY,
};
use pps_test_utils::{
    appendix, decision, envelope, passing_result, pinned_envelope, question, step_envelope,
    FREEZE_LABEL, OPENAPI_APPENDIX_ID,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn engine() -> MergeEngine {
    MergeEngine::new(MergeConfig::default())
}

#[test]
fn gate_pass_produces_summary() {
    let env = step_envelope("APP/01_mvp-cutter", "RUN-001");
    let mut result = passing_result(&env);
    if let Some(gate) = result.gate_result.as_mut() {
        gate.next_actions = vec!["Draft UX flows".into()];
    }
    if let Some(updates) = result.state_updates.as_mut() {
        updates.decision_log_added.push(decision("Cut offline mode"));
    }

    let outcome = engine().merge(&env, &result, &[]);

    assert!(outcome.is_ok(), "{:?}", outcome.errors);
    let summary = outcome.summary.expect("summary");
    assert_eq!(summary.gates_passed, vec!["GATE_1_MVP_BOUNDED"]);
    assert!(summary.gates_failed.is_empty());
    assert_eq!(summary.next_actions, vec!["Draft UX flows"]);
    assert_eq!(summary.decisions_made.len(), 1);

    let applied = outcome.applied_index.expect("applied index");
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].to_string(), "APP/01_mvp-cutter:RUN-001");
}

#[test]
fn gate_fail_is_recorded_not_rejected() {
    let env = step_envelope("APP/03_architecture", "RUN-3");
    let result = passing_result(&env).with_gate("GATE_3_TRUST_AND_CLASSIFICATION", GateStatus::Fail);

    let outcome = engine().merge(&env, &result, &[]);

    assert!(outcome.is_ok());
    let summary = outcome.summary.expect("summary");
    assert_eq!(summary.gates_failed, vec!["GATE_3_TRUST_AND_CLASSIFICATION"]);
}

#[test]
fn duplicate_submission_is_noop() {
    let env = step_envelope("APP/01_mvp-cutter", "RUN-001");
    let result = passing_result(&env);
    let engine = engine();

    let first = engine.merge(&env, &result, &[]);
    let applied = first.applied_index.expect("applied index");
    let second = engine.merge(&env, &result, &applied);

    assert!(second.is_ok());
    assert!(second.is_duplicate());
    assert!(second.state.is_none());
    assert!(second.applied_index.is_none());
    assert_eq!(second.warning_messages(), vec![DUPLICATE_NOOP]);
}

#[test]
fn duplicate_check_precedes_validation() {
    let env = step_envelope("APP/01_mvp-cutter", "RUN-001");
    let first = engine().merge(&env, &passing_result(&env), &[]);
    let applied = first.applied_index.expect("applied index");

    let mut broken = passing_result(&env);
    broken.state_updates = None;
    let outcome = engine().merge(&env, &broken, &applied);
    assert!(outcome.is_duplicate());
}

#[test]
fn appendix_collision_names_the_id() {
    let mut env = step_envelope("APP/01_mvp-cutter", "RUN-001");
    env.appendices_index.push(appendix("A1"));
    let mut result = passing_result(&env);
    result.warnings.push("generator note".into());
    if let Some(updates) = result.appendices_updates.as_mut() {
        updates.added.push(appendix("A1"));
    }

    let outcome = engine().merge(&env, &result, &[]);

    assert!(!outcome.is_ok());
    assert!(outcome.state.is_none());
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].kind(), ErrorKind::AppendixCollision);
    assert!(outcome.errors[0].to_string().contains("\"A1\""));
    assert_eq!(outcome.warning_messages(), vec!["generator note"]);
}

#[test]
fn semantic_errors_are_collected_together() {
    let mut env = pinned_envelope("APP/05_frontend-plan", "RUN-5");
    env.appendices_index.push(appendix("A1"));
    let mut result = passing_result(&env).with_gate("GATE_4_CONTRACT_FREEZE_V0", GateStatus::Pass);
    if let Some(meta) = result.meta.as_mut() {
        meta.applied_to_freeze_label = "API-v9".into();
    }
    if let Some(updates) = result.appendices_updates.as_mut() {
        updates.added.push(appendix("A1"));
    }

    let outcome = engine().merge(&env, &result, &[]);

    let kinds: Vec<ErrorKind> = outcome.errors.iter().map(|e| e.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            ErrorKind::GateSemantic,
            ErrorKind::FreezePinning,
            ErrorKind::FreezePinning,
            ErrorKind::AppendixCollision,
        ]
    );
}

#[test]
fn pinned_step_with_matching_label_merges() {
    let env = pinned_envelope("APP/05_frontend-plan", "RUN-5");
    let result = passing_result(&env);

    let outcome = engine().merge(&env, &result, &[]);

    assert!(outcome.is_ok(), "{:?}", outcome.errors);
    assert!(outcome.warnings.is_empty());
    let state = outcome.state.expect("state");
    assert_eq!(state.state.contract_freeze_ref.label, FREEZE_LABEL);
}

#[test]
fn freeze_authority_sets_reference() {
    let env = step_envelope("APP/04_data-api-contract", "RUN-4");
    let mut result = passing_result(&env);
    result.contract_freeze_ref = Some(ContractFreezeRef::new(
        FREEZE_LABEL,
        OPENAPI_APPENDIX_ID,
        "2026-01-28",
    ));
    if let Some(updates) = result.appendices_updates.as_mut() {
        updates
            .added
            .push(AppendixRef::new(OPENAPI_APPENDIX_ID, AppendixKind::Openapi));
    }

    let outcome = engine().merge(&env, &result, &[]);

    assert!(outcome.warnings.is_empty());
    let summary = outcome.summary.expect("summary");
    assert_eq!(summary.active_freeze_label, FREEZE_LABEL);
    let state = outcome.state.expect("state");
    assert_eq!(
        state.state.contract_freeze_ref,
        ContractFreezeRef::new(FREEZE_LABEL, OPENAPI_APPENDIX_ID, "2026-01-28")
    );
}

#[test]
fn non_authority_freeze_reference_is_ignored() {
    let env = step_envelope("APP/03_architecture", "RUN-3");
    let mut result = passing_result(&env);
    result.contract_freeze_ref = Some(ContractFreezeRef::new("API-rogue", "", ""));

    let outcome = engine().merge(&env, &result, &[]);

    assert!(outcome.is_ok());
    assert!(outcome.warnings.is_empty());
    let state = outcome.state.expect("state");
    assert!(!state.state.contract_freeze_ref.is_frozen());
}

#[test]
fn warnings_keep_patch_consistency_hygiene_order() {
    let mut env = step_envelope("APP/04_data-api-contract", "RUN-4");
    env.meta.token_hygiene = Some(TokenHygiene {
        appendix_threshold_chars: 8,
        ..TokenHygiene::default()
    });
    let mut result = passing_result(&env);
    result.warnings = vec!["w1".into(), "w2".into()];
    result.contract_freeze_ref = Some(ContractFreezeRef::new(FREEZE_LABEL, "APX-MISSING", ""));
    result
        .context_updates
        .insert("openapi_inline".into(), json!("openapi: 3.1.0 ..."));
    result.context_updates.insert("short".into(), json!("ok"));
    result.context_updates.insert("nothing".into(), json!(null));

    let outcome = engine().merge(&env, &result, &[]);

    assert!(outcome.is_ok());
    assert_eq!(
        outcome.warning_messages(),
        vec![
            "w1".to_string(),
            "w2".to_string(),
            "contract_freeze_ref references OpenAPI appendix \"APX-MISSING\" which is not in appendices_index".to_string(),
            "token_hygiene: context_updates.openapi_inline exceeds 8 chars; consider moving to appendix".to_string(),
        ]
    );
    assert!(matches!(outcome.warnings[2], MergeWarning::Consistency { .. }));
}

#[test]
fn config_threshold_applies_without_envelope_policy() {
    let mut env = step_envelope("APP/02_ux-flows", "RUN-2");
    env.meta.token_hygiene = None;
    let mut result = passing_result(&env);
    result
        .context_updates
        .insert("flows".into(), json!({"signup": ["email", "verify", "welcome"]}));

    let strict = MergeEngine::new(MergeConfig::default().with_appendix_threshold(10));
    let outcome = strict.merge(&env, &result, &[]);
    assert_eq!(outcome.warnings.len(), 1);

    let outcome = engine().merge(&env, &result, &[]);
    assert!(outcome.warnings.is_empty());
}

#[test]
fn merge_never_mutates_inputs() {
    let mut env = step_envelope("APP/02_ux-flows", "RUN-2");
    env.state.open_questions.push(question("Q1", "Which IdP?"));
    env.context.insert("screens".into(), json!({"home": {}}));
    let mut result = passing_result(&env);
    result
        .context_updates
        .insert("screens".into(), json!({"login": {}}));
    if let Some(updates) = result.state_updates.as_mut() {
        updates.open_questions_added.push(question("Q2", "Dark mode?"));
    }
    let env_before = env.clone();
    let result_before = result.clone();
    let applied = vec![pps_schema::AppliedEntry::new("APP/01_mvp-cutter", "RUN-1")];

    let outcome = engine().merge(&env, &result, &applied);

    assert_eq!(env, env_before);
    assert_eq!(result, result_before);
    assert_eq!(applied.len(), 1);
    let state = outcome.state.expect("state");
    assert_eq!(state.state.open_questions.len(), 2);
    assert_eq!(state.context["screens"], json!({"home": {}, "login": {}}));
    assert_eq!(state.applied_index.len(), 2);
}

#[test]
fn context_block_flows_into_next_envelope() {
    let base = envelope("APP/01_mvp-cutter", "RUN-001", "N/A");
    let mut result = passing_result(&base);
    result
        .context_updates
        .insert(CONTEXT_BLOCK_KEY.into(), json!("updated summary"));

    let outcome = engine().merge(&base, &result, &[]);
    let state = outcome.state.expect("state");

    let mut focus = ContextMap::new();
    focus.insert("foo".into(), json!("bar"));
    let next = project_envelope(
        &base,
        &state,
        MetaOverrides::new("APP/02_ux-flows", "RUN-002")
            .with_gate_target("GATE_2_TRACEABILITY_FLOW_SCREEN_STATE"),
        focus.clone(),
    );

    assert_eq!(next.context_block, "updated summary");
    assert_eq!(next.meta.prompt_id, "APP/02_ux-flows");
    assert_eq!(next.meta.run_id, "RUN-002");
    assert_eq!(next.focus, focus);

    let next_result = passing_result(&next);
    let outcome = engine().merge(&next, &next_result, &state.applied_index);
    assert!(outcome.is_ok());
    assert_eq!(outcome.applied_index.map(|a| a.len()), Some(2));
}
