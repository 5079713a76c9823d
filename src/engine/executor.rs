//! Step Executor - runs suites, test cases, flows, and steps
//!
//! Each step walks the same state machine:
//! 1. Execute flag check (disabled steps are skipped)
//! 2. Placeholder substitution, then `Page.Name` locator resolution
//! 3. Condition evaluation (may skip, block, or set a retry count)
//! 4. Up to `retry_count + 1` dispatch attempts
//! 5. On exhaustion: screenshot, failure entry, then continue or propagate
//!
//! Test cases run sequentially. Every test case owns a fresh [`CaseState`],
//! so nothing carries over from one case to the next.

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use super::cancel::CancellationFlag;
use super::commands::ui::SCREENSHOTS_DIR;
use super::condition::ConditionEvaluator;
use super::error::StepError;
use super::flow::{CallStack, FlowFrame, FlowResolver};
use super::registry::{Command, CommandEnv, CommandRegistry, Dispatch};
use super::result::{
    first_line, root_cause, safe_name, summarize_error, CaseStatus, FailureEntry, StepOutcome,
    SuiteResult, TestCaseReport,
};
use crate::bridge::ActionSurface;
use crate::workflow::{
    has_selector_prefix, split_symbolic, ContextStore, EngineConfig, FailureCategory,
    LocatorRepository, LocatorResolver, Step, Suite, TestCase,
};

/// Mutable state of one test case execution
#[derive(Debug, Default)]
pub struct CaseState {
    pub context: ContextStore,
    pub stack: CallStack,
    /// One `COMMAND | target | data` entry per dispatch attempt
    pub log: Vec<String>,
    pub failures: Vec<FailureEntry>,
}

impl CaseState {
    pub fn new(context: ContextStore) -> Self {
        Self {
            context,
            ..Default::default()
        }
    }
}

/// The keyword step executor
pub struct Executor {
    registry: CommandRegistry,
    locators: LocatorResolver,
    conditions: ConditionEvaluator,
    /// Flows loaded from the flows directory
    library: HashMap<String, Vec<Step>>,
    /// Library plus the current suite's inline flows
    flows: FlowResolver,
    surface: Arc<dyn ActionSurface>,
    config: EngineConfig,
    cancel: CancellationFlag,
}

impl Executor {
    /// Create an executor with every built-in command registered
    pub fn new(config: EngineConfig, surface: Arc<dyn ActionSurface>) -> Self {
        Self {
            registry: CommandRegistry::with_builtins(),
            locators: LocatorResolver::default(),
            conditions: ConditionEvaluator::new(&config.timeouts),
            library: HashMap::new(),
            flows: FlowResolver::new(HashMap::new(), HashSet::new(), config.max_flow_depth),
            surface,
            config,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_locators(mut self, repository: LocatorRepository) -> Self {
        self.locators = LocatorResolver::new(repository);
        self
    }

    /// Set the flow library shared by every suite this executor runs
    pub fn with_flows(mut self, flows: HashMap<String, Vec<Step>>) -> Self {
        self.flows = FlowResolver::new(flows.clone(), HashSet::new(), self.config.max_flow_depth);
        self.library = flows;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Register or replace commands before a run
    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle for cancelling the run from another task
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// A fresh case state seeded from the engine configuration
    pub fn new_case_state(&self) -> CaseState {
        CaseState::new(self.config.seed_context())
    }

    /// Make a suite's inline flows and test case ids visible to flow calls
    pub fn prepare(&mut self, suite: &Suite) {
        self.flows = FlowResolver::merged(
            &self.library,
            &suite.flows,
            suite.test_case_ids(),
            self.config.max_flow_depth,
        );
    }

    // ========================================================================
    // Suite and test case orchestration
    // ========================================================================

    /// Run every test case of a suite in declared order.
    ///
    /// A failing test case never stops the suite; only cancellation does.
    #[instrument(skip_all, fields(cases = suite.testcases.len()))]
    pub async fn run_suite(&mut self, suite: &Suite) -> SuiteResult {
        self.prepare(suite);
        let mut result = SuiteResult::new();
        info!(run_id = %result.run_id, "Starting suite");

        for case in &suite.testcases {
            if self.cancel.is_cancelled() {
                warn!("Run cancelled, remaining test cases not started");
                break;
            }
            let report = self.run_test_case(case, suite).await;
            result.cases.push(report);
        }
        result.cancelled = self.cancel.is_cancelled();

        info!(
            passed = result.passed(),
            failed = result.failed(),
            skipped = result.skipped(),
            "Suite finished"
        );
        result
    }

    /// Run one test case: before hook, step sheet, after hook
    #[instrument(skip(self, case, suite), fields(case = %case.id))]
    pub async fn run_test_case(&self, case: &TestCase, suite: &Suite) -> TestCaseReport {
        if !case.is_enabled() {
            info!("Test case skipped (execute flag off)");
            return TestCaseReport::skipped(&case.id);
        }

        info!("Starting test case");
        let started = Instant::now();
        let mut state = self.new_case_state();
        let mut first_error: Option<StepError> = None;

        let before_ok = match case.before_hook.as_deref() {
            Some(hook) => {
                info!(flow = hook, "Running before hook");
                match self.run_flow(hook, &[], &mut state).await {
                    Ok(()) => true,
                    Err(e) => {
                        first_error = Some(e);
                        false
                    }
                }
            }
            None => true,
        };

        if before_ok {
            let body = match suite.sheet(case.sheet_name()) {
                Some(steps) => self.run_steps(steps, &mut state).await,
                None => Err(StepError::SheetNotFound(case.sheet_name().to_string())),
            };
            if let Err(e) = body {
                first_error = Some(e);
            }

            if let Some(hook) = case.after_hook.as_deref() {
                if !self.cancel.is_cancelled() {
                    info!(flow = hook, "Running after hook");
                    if let Err(e) = self.run_flow(hook, &[], &mut state).await {
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }
        }

        let mut report = TestCaseReport {
            id: case.id.clone(),
            status: CaseStatus::Passed,
            root_cause: None,
            failed_step: None,
            error_snippet: None,
            steps: Vec::new(),
            failures: Vec::new(),
            screenshot: None,
            duration_ms: 0,
        };

        if first_error.is_some() || !state.failures.is_empty() {
            report.status = CaseStatus::Failed;
            report.failed_step = state
                .failures
                .last()
                .map(|f| f.step.clone())
                .or_else(|| state.log.last().cloned());

            match &first_error {
                Some(err) => {
                    report.root_cause = Some(root_cause(err));
                    report.error_snippet = Some(summarize_error(&err.to_string()));
                    if !matches!(err, StepError::Cancelled) {
                        report.screenshot = self.capture(&safe_name(&case.id)).await;
                    }
                }
                None => {
                    if let Some(failure) = state.failures.first() {
                        report.root_cause = Some(first_line(&failure.error));
                        report.error_snippet = Some(summarize_error(&failure.error));
                    }
                }
            }

            error!(
                root_cause = report.root_cause.as_deref().unwrap_or(""),
                failures = state.failures.len(),
                "Test case failed"
            );
        } else {
            info!("Test case passed");
        }

        report.steps = state.log;
        report.failures = state.failures;
        report.duration_ms = started.elapsed().as_millis() as u64;
        report
    }

    // ========================================================================
    // Flows and step sequences
    // ========================================================================

    /// Run a flow by name with scoped parameters.
    ///
    /// The call stack entry and parameter values are released on every exit
    /// path.
    #[instrument(skip(self, params, state), fields(depth = state.stack.depth()))]
    pub async fn run_flow(
        &self,
        name: &str,
        params: &[(String, String)],
        state: &mut CaseState,
    ) -> Result<(), StepError> {
        let steps = self.flows.get_flow(name, &state.stack)?;
        debug!(flow = name, params = params.len(), "Entering flow");

        let mut frame = FlowFrame::enter(state, name, params);
        self.run_steps(steps, &mut frame).await
    }

    /// Run steps in order, stopping at the first propagated failure
    pub fn run_steps<'a>(
        &'a self,
        steps: &'a [Step],
        state: &'a mut CaseState,
    ) -> BoxFuture<'a, Result<(), StepError>> {
        async move {
            for step in steps {
                self.cancel.check()?;
                self.execute_step(step, state).await?;
            }
            Ok(())
        }
        .boxed()
    }

    // ========================================================================
    // Single step
    // ========================================================================

    /// Run one step through the full state machine
    #[instrument(skip(self, step, state), fields(command = %step.keyword(), seq = step.seq.as_deref().unwrap_or("")))]
    pub async fn execute_step(
        &self,
        step: &Step,
        state: &mut CaseState,
    ) -> Result<StepOutcome, StepError> {
        self.cancel.check()?;
        if !step.is_enabled() {
            debug!("Step skipped (execute flag off)");
            return Ok(StepOutcome::Skipped);
        }

        let target = state.context.resolve(step.target.as_deref().unwrap_or(""));
        let data = state.context.resolve(step.data.as_deref().unwrap_or(""));
        // Substituted values, but the symbolic locator rather than its selector
        let label = step.label(&target, &data);

        match self.attempt_step(step, target, &data, &label, state).await {
            Ok(outcome) => Ok(outcome),
            Err(StepError::Cancelled) => Err(StepError::Cancelled),
            Err(err) => self.handle_exhausted(step, label, state, err).await,
        }
    }

    /// Resolve the locator, check the condition, and dispatch with retries
    async fn attempt_step(
        &self,
        step: &Step,
        mut target: String,
        data: &str,
        label: &str,
        state: &mut CaseState,
    ) -> Result<StepOutcome, StepError> {
        let command = self.registry.get(&step.command)?;

        // Before the condition, so a missing locator fails even under IF_EXISTS
        if self.needs_locator(command.as_ref(), &target) {
            let resolved = self.locators.resolve(&target)?;
            debug!(locator = %target, resolved = %resolved, "Resolved locator");
            target = resolved;
        }

        let condition = self
            .conditions
            .evaluate(
                step.condition.as_deref(),
                &target,
                self.surface.as_ref(),
                &self.cancel,
            )
            .await?;
        if !condition.should_execute {
            info!(
                condition = step.condition.as_deref().unwrap_or(""),
                "Condition not met, step skipped"
            );
            return Ok(StepOutcome::ConditionSkipped);
        }

        let attempts = condition.retry_count.saturating_add(1);
        let mut attempt = 1;
        loop {
            self.cancel.check()?;
            state.log.push(label.to_string());
            info!(attempt, attempts, resolved = %target, "Dispatching");

            match self.dispatch(command.as_ref(), &target, data, state).await {
                Ok(value) => {
                    if let Some(key) = step.store.as_deref() {
                        debug!(key, "Storing result");
                        state.context.set(key, value);
                    }
                    return Ok(StepOutcome::Success);
                }
                Err(StepError::Cancelled) => return Err(StepError::Cancelled),
                Err(err) if attempt < attempts => {
                    warn!(attempt, attempts, error = %err, "Attempt failed, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// True when a resolved target should go through the locator repository
    fn needs_locator(&self, command: &dyn Command, target: &str) -> bool {
        !command.locator_exempt()
            && !has_selector_prefix(target)
            && split_symbolic(target).is_some()
    }

    /// Invoke the handler and carry out whatever it asks for
    async fn dispatch(
        &self,
        command: &dyn Command,
        target: &str,
        data: &str,
        state: &mut CaseState,
    ) -> Result<Value, StepError> {
        let dispatch = {
            let mut env = CommandEnv {
                context: &mut state.context,
                surface: self.surface.as_ref(),
                timeouts: &self.config.timeouts,
                artifacts_dir: &self.config.artifacts_dir,
                cancel: &self.cancel,
            };
            command.execute(target, data, &mut env).await?
        };

        match dispatch {
            Dispatch::Value(value) => Ok(value),
            Dispatch::CallFlow { name, params } => {
                self.run_flow(&name, &params, state).await?;
                Ok(Value::String(name))
            }
        }
    }

    /// Every attempt failed: record it, then continue or propagate
    async fn handle_exhausted(
        &self,
        step: &Step,
        label: String,
        state: &mut CaseState,
        err: StepError,
    ) -> Result<StepOutcome, StepError> {
        let name = format!(
            "{}_{}",
            safe_name(&step.keyword()),
            safe_name(step.seq.as_deref().unwrap_or("step"))
        );
        let screenshot = self.capture(&name).await;

        state.failures.push(FailureEntry {
            step: label,
            category: step.failure_category,
            error: err.to_string(),
            screenshot,
        });

        match step.failure_category {
            FailureCategory::ContinueOnFailure => {
                warn!(error = %err, "Step failed, continuing");
                Ok(StepOutcome::Continued)
            }
            FailureCategory::StopOnFailure => {
                error!(error = %err, "Step failed");
                Err(err)
            }
        }
    }

    /// Best-effort page screenshot under the artifacts directory
    async fn capture(&self, name: &str) -> Option<PathBuf> {
        let path = self
            .config
            .artifacts_dir
            .join(SCREENSHOTS_DIR)
            .join(format!("{}.png", name));
        match tokio::time::timeout(
            self.config.timeouts.action(),
            self.surface.screenshot(&path, None),
        )
        .await
        {
            Ok(Ok(path)) => Some(path),
            Ok(Err(e)) => {
                debug!(error = %e, "Failure screenshot not captured");
                None
            }
            Err(_) => {
                debug!("Failure screenshot timed out");
                None
            }
        }
    }

    // ========================================================================
    // Static checks
    // ========================================================================

    /// Problems detectable without running anything
    pub fn validate(&self, suite: &Suite) -> Vec<String> {
        let mut problems = Vec::new();
        let test_ids = suite.test_case_ids();

        let mut unknown: Vec<String> = suite
            .all_steps()
            .chain(self.library.values().flatten())
            .filter(|step| !self.registry.contains(&step.command))
            .map(Step::keyword)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        unknown.sort();
        for command in unknown {
            problems.push(StepError::CommandNotFound(command).to_string());
        }

        for case in suite.testcases.iter().filter(|c| c.is_enabled()) {
            if suite.sheet(case.sheet_name()).is_none() {
                problems.push(format!(
                    "{}: {}",
                    case.id,
                    StepError::SheetNotFound(case.sheet_name().to_string())
                ));
            }
            for hook in [&case.before_hook, &case.after_hook].into_iter().flatten() {
                if !self.library.contains_key(hook) && !suite.flows.contains_key(hook) {
                    problems.push(format!("{}: {}", case.id, StepError::FlowNotFound(hook.clone())));
                }
            }
        }

        let mut collisions: Vec<&String> = self
            .library
            .keys()
            .chain(suite.flows.keys())
            .filter(|name| test_ids.contains(*name))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        collisions.sort();
        for name in collisions {
            problems.push(StepError::FlowToTestCallNotAllowed(name.clone()).to_string());
        }

        problems
    }
}
