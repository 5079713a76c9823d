mod common;

use common::*;
use keyword_actions::engine::StepOutcome;
use keyword_actions::prelude::*;
use keyword_actions::workflow::Environment;
use serde_json::json;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn api_config() -> EngineConfig {
    let mut config = fast_config();
    config.environments.insert(
        "test".to_string(),
        Environment {
            base_url: "https://app.test".to_string(),
            api_base_url: "https://api.test".to_string(),
            ..Default::default()
        },
    );
    config.environment = Some("test".to_string());
    config
}

// ============================================================================
// Target resolution
// ============================================================================

#[tokio::test]
async fn test_symbolic_targets_resolve_to_selectors() {
    let surface = Arc::new(FakeSurface::new());
    let executor = executor(surface.clone());
    let mut state = executor.new_case_state();
    state.context.set("user", "alice");

    let steps = vec![
        Step::new("TYPE", "LoginPage.username", "${user}"),
        Step::new("click", "LoginPage.submit", ""),
        Step::new("CLICK", "css=.already.prefixed", ""),
    ];
    assert_ok!(executor.run_steps(&steps, &mut state).await);

    assert_eq!(
        surface.calls(),
        vec![
            "fill css=#user",
            "click xpath=//button",
            "click css=.already.prefixed",
        ]
    );
}

#[tokio::test]
async fn test_open_url_is_locator_exempt_and_joins_base_url() {
    let surface = Arc::new(FakeSurface::new());
    let executor = Executor::new(api_config(), surface.clone());
    let mut state = executor.new_case_state();

    let steps = vec![
        Step::new("OPEN_URL", "/login.html", ""),
        Step::new("OPEN_URL", "", "https://other.example.com"),
    ];
    assert_ok!(executor.run_steps(&steps, &mut state).await);

    assert_eq!(
        surface.calls_to("navigate"),
        vec![
            "navigate https://app.test/login.html",
            "navigate https://other.example.com",
        ]
    );
}

#[tokio::test]
async fn test_missing_locator_fails_even_under_if_exists() {
    let surface = Arc::new(FakeSurface::new());
    let executor = executor(surface.clone());
    let mut state = executor.new_case_state();

    let step = Step::new("CLICK", "LoginPage.forgot", "").with_condition("IF_EXISTS");
    let err = executor.execute_step(&step, &mut state).await.unwrap_err();

    assert!(matches!(err, StepError::LocatorNotFound(ref t) if t == "LoginPage.forgot"));
    assert!(surface.calls_to("count").is_empty());
    assert_eq!(state.failures.len(), 1);
}

#[tokio::test]
async fn test_missing_page_fails() {
    let surface = Arc::new(FakeSurface::new());
    let executor = executor(surface);
    let mut state = executor.new_case_state();

    let err = executor
        .execute_step(&Step::new("CLICK", "CartPage.checkout", ""), &mut state)
        .await
        .unwrap_err();
    assert!(matches!(err, StepError::PageNotFound(_)));
}

// ============================================================================
// Conditions and retries
// ============================================================================

#[tokio::test]
async fn test_if_exists_with_no_match_skips_quietly() {
    let surface = Arc::new(FakeSurface::new());
    let executor = executor(surface.clone());
    let mut state = executor.new_case_state();

    let step = Step::new("CLICK", "css=#promo-close", "").with_condition("if_exists");
    let outcome = executor.execute_step(&step, &mut state).await.unwrap();

    assert_eq!(outcome, StepOutcome::ConditionSkipped);
    assert_eq!(surface.calls(), vec!["count css=#promo-close"]);
    assert!(state.failures.is_empty());
    assert!(state.log.is_empty());
}

#[tokio::test]
async fn test_if_exists_and_if_not_exists_with_match() {
    let surface = Arc::new(FakeSurface::new().with_element("css=#banner", 2));
    let executor = executor(surface.clone());
    let mut state = executor.new_case_state();

    let run = Step::new("CLICK", "css=#banner", "").with_condition("IF_EXISTS");
    let skip = Step::new("CLICK", "css=#banner", "").with_condition("IF_NOT_EXISTS");

    assert_eq!(
        executor.execute_step(&run, &mut state).await.unwrap(),
        StepOutcome::Success
    );
    assert_eq!(
        executor.execute_step(&skip, &mut state).await.unwrap(),
        StepOutcome::ConditionSkipped
    );
    assert_eq!(surface.calls_to("click").len(), 1);
}

#[tokio::test]
async fn test_probe_errors_count_as_absent() {
    let surface = Arc::new(FakeSurface::new().failing("css=#flaky"));
    let executor = executor(surface);
    let mut state = executor.new_case_state();

    let step = Step::new("SET", "css=#flaky", "x").with_condition("IF_EXISTS");
    let outcome = executor.execute_step(&step, &mut state).await.unwrap();
    assert_eq!(outcome, StepOutcome::ConditionSkipped);
}

#[tokio::test]
async fn test_retry_two_makes_three_attempts() {
    let surface = Arc::new(FakeSurface::new());
    let mut executor = executor(surface);
    let (flaky, attempts) = CountingCommand::new(0);
    executor.registry_mut().register_command(flaky);
    let mut state = executor.new_case_state();

    let step = Step::new("FLAKY", "", "").with_condition("RETRY(2)");
    let err = executor.execute_step(&step, &mut state).await.unwrap_err();

    assert!(matches!(err, StepError::AssertionFailed(ref m) if m == "attempt 3 failed"));
    assert_eq!(*attempts.lock().unwrap(), 3);
    assert_eq!(state.log, vec!["FLAKY |  | "; 3]);
    assert_eq!(state.failures.len(), 1);
}

#[tokio::test]
async fn test_retry_stops_at_first_success_and_stores_result() {
    let surface = Arc::new(FakeSurface::new());
    let mut executor = executor(surface);
    let (flaky, attempts) = CountingCommand::new(2);
    executor.registry_mut().register_command(flaky);
    let mut state = executor.new_case_state();

    let step = Step::new("FLAKY", "", "")
        .with_condition("retry(5)")
        .with_store("tries");
    let outcome = executor.execute_step(&step, &mut state).await.unwrap();

    assert_eq!(outcome, StepOutcome::Success);
    assert_eq!(*attempts.lock().unwrap(), 2);
    assert_eq!(state.context.get("tries"), Some(&json!(2)));
    assert!(state.failures.is_empty());
}

#[tokio::test]
async fn test_wait_until_times_out() {
    let surface = Arc::new(FakeSurface::new());
    let executor = executor(surface.clone());
    let mut state = executor.new_case_state();

    let step = Step::new("CLICK", "css=#spinner-done", "").with_condition("WAIT_UNTIL");
    let err = executor.execute_step(&step, &mut state).await.unwrap_err();

    assert!(matches!(err, StepError::ConditionTimeout { timeout_ms: 300, .. }));
    assert!(surface.calls_to("count").len() > 1);
    assert!(surface.calls_to("click").is_empty());
}

#[tokio::test]
async fn test_wait_until_proceeds_when_present() {
    let surface = Arc::new(FakeSurface::new().with_element("css=#ready", 1));
    let executor = executor(surface.clone());
    let mut state = executor.new_case_state();

    let step = Step::new("CLICK", "css=#ready", "").with_condition("WAIT_UNTIL RETRY(1)");
    assert_ok!(executor.execute_step(&step, &mut state).await);
    assert_eq!(surface.calls_to("click"), vec!["click css=#ready"]);
}

// ============================================================================
// Failure categories and test case orchestration
// ============================================================================

#[tokio::test]
async fn test_continue_on_failure_runs_remaining_steps() {
    let surface = Arc::new(FakeSurface::new().failing("css=#broken"));
    let mut executor = executor(surface.clone());
    let suite = suite_with(vec![(
        "TC01",
        vec![
            Step::new("CLICK", "css=#broken", "")
                .with_category(FailureCategory::ContinueOnFailure),
            Step::new("CLICK", "css=#next", ""),
        ],
    )]);

    let result = executor.run_suite(&suite).await;
    let case = &result.cases[0];

    assert_eq!(case.status, CaseStatus::Failed);
    assert_eq!(case.failures.len(), 1);
    assert_eq!(case.failures[0].category, FailureCategory::ContinueOnFailure);
    assert_eq!(case.failed_step.as_deref(), Some("CLICK | css=#broken | "));
    assert!(case
        .root_cause
        .as_deref()
        .unwrap()
        .contains("element not interactable"));
    assert!(surface.calls().contains(&"click css=#next".to_string()));
    assert!(!result.success());
}

#[tokio::test]
async fn test_stop_on_failure_aborts_sheet_but_not_suite() {
    let surface = Arc::new(FakeSurface::new().failing("css=#broken"));
    let mut executor = executor(surface.clone());
    let mut suite = suite_with(vec![
        (
            "TC01",
            vec![
                Step::new("CLICK", "css=#broken", ""),
                Step::new("CLICK", "css=#after", ""),
            ],
        ),
        ("TC02", vec![Step::new("CLICK", "css=#ok", "")]),
    ]);
    suite.sheets.get_mut("TC01").unwrap()[0].seq = Some("1".to_string());

    let result = executor.run_suite(&suite).await;

    assert_eq!(result.cases.len(), 2);
    assert_eq!(result.cases[0].status, CaseStatus::Failed);
    assert_eq!(result.cases[1].status, CaseStatus::Passed);
    assert!(!surface.calls().contains(&"click css=#after".to_string()));
    assert!(surface.calls().contains(&"click css=#ok".to_string()));

    let screenshots = surface.calls_to("screenshot");
    assert!(screenshots[0].ends_with("CLICK_1.png"), "{:?}", screenshots);
    assert!(screenshots[1].ends_with("TC01.png"), "{:?}", screenshots);
    assert_eq!(
        result.cases[0].screenshot.as_deref(),
        Some(std::path::Path::new("artifacts/screenshots/TC01.png"))
    );
    assert_eq!(result.passed(), 1);
    assert_eq!(result.failed(), 1);
}

#[tokio::test]
async fn test_disabled_test_case_reported_skipped() {
    let surface = Arc::new(FakeSurface::new());
    let mut executor = executor(surface.clone());
    let mut suite = suite_with(vec![("TC01", vec![Step::new("CLICK", "css=#a", "")])]);
    suite.testcases[0].execute = Some("N".to_string());

    let result = executor.run_suite(&suite).await;

    assert_eq!(result.cases[0].status, CaseStatus::Skipped);
    assert!(surface.calls().is_empty());
    assert!(result.success());
}

#[tokio::test]
async fn test_missing_sheet_fails_case() {
    let surface = Arc::new(FakeSurface::new());
    let mut executor = executor(surface);
    let mut suite = Suite::default();
    suite.testcases.push(test_case("TC404"));

    let result = executor.run_suite(&suite).await;
    assert_eq!(result.cases[0].status, CaseStatus::Failed);
    assert_eq!(
        result.cases[0].root_cause.as_deref(),
        Some("Step sheet not found: TC404")
    );
}

#[tokio::test]
async fn test_hooks_wrap_the_body() {
    let surface = Arc::new(FakeSurface::new().failing("css=#broken"));
    let mut executor = executor(surface.clone());
    let mut suite = suite_with(vec![("TC01", vec![Step::new("CLICK", "css=#broken", "")])]);
    suite
        .flows
        .insert("Setup".into(), vec![Step::new("CLICK", "css=#setup", "")]);
    suite
        .flows
        .insert("Teardown".into(), vec![Step::new("CLICK", "css=#teardown", "")]);
    suite.testcases[0].before_hook = Some("Setup".into());
    suite.testcases[0].after_hook = Some("Teardown".into());

    let result = executor.run_suite(&suite).await;

    assert_eq!(
        surface.calls_to("click"),
        vec!["click css=#setup", "click css=#broken", "click css=#teardown"]
    );
    assert_eq!(result.cases[0].status, CaseStatus::Failed);
    assert!(result.cases[0]
        .root_cause
        .as_deref()
        .unwrap()
        .contains("css=#broken"));
}

#[tokio::test]
async fn test_failed_before_hook_skips_body_and_after_hook() {
    let surface = Arc::new(FakeSurface::new().failing("css=#setup"));
    let mut executor = executor(surface.clone());
    let mut suite = suite_with(vec![("TC01", vec![Step::new("CLICK", "css=#body", "")])]);
    suite
        .flows
        .insert("Setup".into(), vec![Step::new("CLICK", "css=#setup", "")]);
    suite
        .flows
        .insert("Teardown".into(), vec![Step::new("CLICK", "css=#teardown", "")]);
    suite.testcases[0].before_hook = Some("Setup".into());
    suite.testcases[0].after_hook = Some("Teardown".into());

    let result = executor.run_suite(&suite).await;

    assert_eq!(surface.calls_to("click"), vec!["click css=#setup"]);
    assert_eq!(result.cases[0].status, CaseStatus::Failed);
}

#[tokio::test]
async fn test_context_does_not_leak_between_cases() {
    let surface = Arc::new(FakeSurface::new());
    let mut executor = executor(surface.clone());
    let suite = suite_with(vec![
        ("TC01", vec![Step::new("SET", "token", "abc")]),
        ("TC02", vec![Step::new("CLICK", "css=#t-${token}", "")]),
    ]);

    let result = executor.run_suite(&suite).await;

    assert!(result.success());
    assert_eq!(surface.calls_to("click"), vec!["click css=#t-"]);
}

#[tokio::test]
async fn test_cancelled_run_stops_before_next_case() {
    let surface = Arc::new(FakeSurface::new());
    let mut executor = executor(surface.clone());
    executor.cancellation().cancel();
    let suite = suite_with(vec![("TC01", vec![Step::new("CLICK", "css=#a", "")])]);

    let result = executor.run_suite(&suite).await;

    assert!(result.cancelled);
    assert!(result.cases.is_empty());
    assert!(!result.success());
    assert!(surface.calls().is_empty());
}

// ============================================================================
// API commands
// ============================================================================

#[tokio::test]
async fn test_api_call_verify_and_store() {
    let surface = Arc::new(FakeSurface::new().with_response(201, json!({"id": 7})));
    let executor = Executor::new(api_config(), surface.clone());
    let mut state = executor.new_case_state();

    let steps = vec![
        Step::new("SET", "name", "bob"),
        Step::new(
            "API_CALL",
            "/users",
            r#"{"method": "POST", "payload": {"name": "${name}"}}"#,
        ),
        Step::new("VERIFY_STATUS", "", "201"),
        Step::new("STORE_RESPONSE", "", "").with_store("created"),
    ];
    assert_ok!(executor.run_steps(&steps, &mut state).await);

    let requests = surface.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "https://api.test/users");
    assert_eq!(requests[0].body, Some(json!({"name": "bob"})));
    assert_eq!(state.context.get("created"), Some(&json!({"id": 7})));
}

#[tokio::test]
async fn test_verify_status_mismatch() {
    let surface = Arc::new(FakeSurface::new().with_response(500, json!({"error": "boom"})));
    let executor = Executor::new(api_config(), surface);
    let mut state = executor.new_case_state();

    let steps = vec![
        Step::new("API_CALL", "/health", ""),
        Step::new("VERIFY_STATUS", "", ""),
    ];
    let err = assert_err!(executor.run_steps(&steps, &mut state).await);

    assert_eq!(err.to_string(), "Status mismatch. Expected=200, Actual=500");
    assert_eq!(state.failures[0].step, "VERIFY_STATUS |  | ");
}

#[tokio::test]
async fn test_unknown_http_method() {
    let surface = Arc::new(FakeSurface::new());
    let executor = Executor::new(api_config(), surface.clone());
    let mut state = executor.new_case_state();

    let err = executor
        .execute_step(&Step::new("API_CALL", "/x", "TRACE /x"), &mut state)
        .await
        .unwrap_err();
    assert!(matches!(err, StepError::UnsupportedHttpMethod(ref m) if m == "TRACE"));
    assert!(surface.requests().is_empty());
}

// ============================================================================
// Context
// ============================================================================

#[tokio::test]
async fn test_unset_placeholders_substitute_empty() {
    let surface = Arc::new(FakeSurface::new());
    let executor = executor(surface);
    let mut state = executor.new_case_state();

    let steps = vec![
        Step::new("SET", "policyNumber", "PN123"),
        Step::new("SET", "label", "Policy ${policyNumber}${missing}"),
    ];
    assert_ok!(executor.run_steps(&steps, &mut state).await);
    assert_eq!(state.context.get_string("label"), "Policy PN123");
}

#[tokio::test]
async fn test_disabled_step_leaves_no_trace() {
    let surface = Arc::new(FakeSurface::new());
    let executor = executor(surface.clone());
    let mut state = executor.new_case_state();

    let steps = vec![Step::new("CLICK", "LoginPage.nope", "").with_execute("no")];
    assert_ok!(executor.run_steps(&steps, &mut state).await);
    assert!(surface.calls().is_empty());
    assert!(state.failures.is_empty());
}

#[tokio::test]
async fn test_step_labels_show_substituted_values() {
    let surface = Arc::new(
        FakeSurface::new()
            .failing("css=#row-A-77")
            .failing("css=#user"),
    );
    let mut executor = executor(surface);
    let suite = suite_with(vec![(
        "TC01",
        vec![
            Step::new("SET", "orderId", "A-77"),
            Step::new("CLICK", "css=#row-${orderId}", "")
                .with_category(FailureCategory::ContinueOnFailure),
            Step::new("TYPE", "LoginPage.username", "order ${orderId}"),
        ],
    )]);

    let result = executor.run_suite(&suite).await;
    let case = &result.cases[0];

    assert_eq!(case.failures.len(), 2);
    assert_eq!(case.failures[0].step, "CLICK | css=#row-A-77 | ");
    // Symbolic locators stay symbolic in labels
    assert_eq!(case.failures[1].step, "TYPE | LoginPage.username | order A-77");
    assert_eq!(
        case.steps,
        vec![
            "SET | orderId | A-77",
            "CLICK | css=#row-A-77 | ",
            "TYPE | LoginPage.username | order A-77",
        ]
    );
    assert_eq!(
        case.failed_step.as_deref(),
        Some("TYPE | LoginPage.username | order A-77")
    );
}
