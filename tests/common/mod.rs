#![allow(dead_code)]

use async_trait::async_trait;
use keyword_actions::bridge::{
    ActionSurface, ApiResponse, BridgeError, ElementAction, HttpRequest, PageAction,
    WaitCondition, WindowAction,
};
use keyword_actions::prelude::*;
use keyword_actions::workflow::{LocatorEntry, Timeouts};
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn write_file(dir: &Path, filename: &str, content: &str) {
    if let Some(parent) = dir.join(filename).parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(dir.join(filename), content).expect("Failed to write file");
}

// ============================================================================
// Fake action surface
// ============================================================================

/// Scriptable in-memory surface that records every call
#[derive(Default)]
pub struct FakeSurface {
    counts: HashMap<String, usize>,
    failing: HashSet<String>,
    texts: HashMap<String, String>,
    responses: Mutex<VecDeque<ApiResponse>>,
    calls: Mutex<Vec<String>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// `selector` matches `count` elements
    pub fn with_element(mut self, selector: &str, count: usize) -> Self {
        self.counts.insert(selector.to_string(), count);
        self
    }

    /// Every interaction with `selector` fails
    pub fn failing(mut self, selector: &str) -> Self {
        self.failing.insert(selector.to_string());
        self
    }

    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.counts.entry(selector.to_string()).or_insert(1);
        self.texts.insert(selector.to_string(), text.to_string());
        self
    }

    /// Queue the next HTTP response; unqueued calls get `200 {}`
    pub fn with_response(self, status: u16, body: serde_json::Value) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(ApiResponse::new(status, body));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded calls starting with `prefix`
    pub fn calls_to(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, selector: &str) -> Result<(), BridgeError> {
        if self.failing.contains(selector) {
            return Err(BridgeError::ServerError(format!(
                "element not interactable: {}",
                selector
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ActionSurface for FakeSurface {
    async fn navigate(&self, url: &str) -> Result<(), BridgeError> {
        self.record(format!("navigate {}", url));
        Ok(())
    }

    async fn page_action(&self, action: PageAction) -> Result<(), BridgeError> {
        self.record(format!("page {:?}", action));
        Ok(())
    }

    async fn element(&self, selector: &str, action: &ElementAction) -> Result<(), BridgeError> {
        self.record(format!("{} {}", action.name(), selector));
        self.check(selector)
    }

    async fn wait_for(
        &self,
        condition: &WaitCondition,
        _timeout: Duration,
    ) -> Result<(), BridgeError> {
        self.record(format!("wait {:?}", condition));
        Ok(())
    }

    async fn text_content(&self, selector: &str) -> Result<String, BridgeError> {
        self.record(format!("text {}", selector));
        self.check(selector)?;
        self.texts
            .get(selector)
            .cloned()
            .ok_or_else(|| BridgeError::ServerError(format!("no element: {}", selector)))
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, BridgeError> {
        self.record(format!("visible {}", selector));
        Ok(self.counts.get(selector).copied().unwrap_or(0) > 0)
    }

    async fn title(&self) -> Result<String, BridgeError> {
        Ok("Fake Page".to_string())
    }

    async fn window(&self, action: &WindowAction) -> Result<(), BridgeError> {
        self.record(format!("window {:?}", action));
        Ok(())
    }

    async fn screenshot(&self, path: &Path, _selector: Option<&str>) -> Result<PathBuf, BridgeError> {
        self.record(format!("screenshot {}", path.display()));
        Ok(path.to_path_buf())
    }

    async fn http(&self, request: &HttpRequest) -> Result<ApiResponse, BridgeError> {
        self.record(format!("http {} {}", request.method, request.url));
        self.requests.lock().unwrap().push(request.clone());
        let response = self.responses.lock().unwrap().pop_front();
        Ok(response.unwrap_or_else(|| ApiResponse::new(200, json!({}))))
    }

    async fn count(&self, selector: &str) -> Result<usize, BridgeError> {
        self.record(format!("count {}", selector));
        self.check(selector)?;
        Ok(self.counts.get(selector).copied().unwrap_or(0))
    }
}

// ============================================================================
// Suite builders
// ============================================================================

/// Engine config with short condition timeouts
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        timeouts: Timeouts {
            action_ms: 1_000,
            api_ms: 1_000,
            condition_ms: 300,
            poll_interval_ms: 20,
        },
        artifacts_dir: PathBuf::from("artifacts"),
        ..Default::default()
    }
}

pub fn executor(surface: Arc<FakeSurface>) -> Executor {
    Executor::new(fast_config(), surface).with_locators(login_locators())
}

pub fn login_locators() -> LocatorRepository {
    LocatorRepository::from_entries([
        LocatorEntry::new("LoginPage", "username", "#user", None, "css"),
        LocatorEntry::new("LoginPage", "password", "#pass", None, "css"),
        LocatorEntry::new("LoginPage", "submit", "xpath=//button", None, "xpath"),
        LocatorEntry::new("HomePage", "banner", "Welcome", None, "text"),
    ])
}

pub fn test_case(id: &str) -> TestCase {
    TestCase {
        id: id.to_string(),
        execute: None,
        before_hook: None,
        after_hook: None,
        steps: None,
    }
}

/// A suite whose test cases each run the sheet named after them
pub fn suite_with(cases: Vec<(&str, Vec<Step>)>) -> Suite {
    let mut suite = Suite::default();
    for (id, steps) in cases {
        suite.testcases.push(test_case(id));
        suite.sheets.insert(id.to_string(), steps);
    }
    suite
}

/// Counts its invocations and fails until `succeed_on` (0 = always fail)
pub struct CountingCommand {
    pub attempts: Arc<Mutex<u32>>,
    pub succeed_on: u32,
}

impl CountingCommand {
    pub fn new(succeed_on: u32) -> (Self, Arc<Mutex<u32>>) {
        let attempts = Arc::new(Mutex::new(0));
        (
            Self {
                attempts: attempts.clone(),
                succeed_on,
            },
            attempts,
        )
    }
}

#[async_trait]
impl Command for CountingCommand {
    fn name(&self) -> &str {
        "FLAKY"
    }

    fn locator_exempt(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        _target: &str,
        _data: &str,
        _env: &mut CommandEnv<'_>,
    ) -> Result<Dispatch, StepError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            *attempts
        };
        if self.succeed_on != 0 && attempt >= self.succeed_on {
            Ok(Dispatch::from(json!(attempt)))
        } else {
            Err(StepError::AssertionFailed(format!("attempt {} failed", attempt)))
        }
    }
}
