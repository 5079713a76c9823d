//! Execution result types

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::workflow::FailureCategory;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_.-]+").expect("safe-name pattern is valid"));

/// Lines kept in a report's error snippet
const SNIPPET_LINES: usize = 6;

/// How a single step ended without propagating an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Dispatched and succeeded
    Success,
    /// Execute flag disabled
    Skipped,
    /// Condition evaluated to "do not execute"
    ConditionSkipped,
    /// Every attempt failed under `CONTINUE_ON_FAILURE`
    Continued,
}

/// One exhausted-retry step failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureEntry {
    /// Step label: `COMMAND | target | data`
    pub step: String,
    pub category: FailureCategory,
    pub error: String,
    pub screenshot: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CaseStatus {
    Passed,
    Failed,
    Skipped,
}

/// One record per test case, handed to report collaborators
#[derive(Debug, Clone, Serialize)]
pub struct TestCaseReport {
    pub id: String,
    pub status: CaseStatus,
    pub root_cause: Option<String>,
    pub failed_step: Option<String>,
    pub error_snippet: Option<String>,
    /// Step log, one entry per dispatch attempt
    pub steps: Vec<String>,
    pub failures: Vec<FailureEntry>,
    pub screenshot: Option<PathBuf>,
    pub duration_ms: u64,
}

impl TestCaseReport {
    pub fn skipped(id: &str) -> Self {
        Self {
            id: id.to_string(),
            status: CaseStatus::Skipped,
            root_cause: None,
            failed_step: None,
            error_snippet: None,
            steps: Vec::new(),
            failures: Vec::new(),
            screenshot: None,
            duration_ms: 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == CaseStatus::Failed
    }
}

/// Result of a suite run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub cases: Vec<TestCaseReport>,
    /// The run was stopped before every case finished
    pub cancelled: bool,
}

impl SuiteResult {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            cases: Vec::new(),
            cancelled: false,
        }
    }

    /// True iff no executed case failed and the run was not cancelled
    pub fn success(&self) -> bool {
        !self.cancelled && !self.cases.iter().any(TestCaseReport::is_failed)
    }

    pub fn passed(&self) -> usize {
        self.count(CaseStatus::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(CaseStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(CaseStatus::Skipped)
    }

    fn count(&self, status: CaseStatus) -> usize {
        self.cases.iter().filter(|c| c.status == status).count()
    }
}

impl Default for SuiteResult {
    fn default() -> Self {
        Self::new()
    }
}

/// First non-blank line of the deepest error in the `source()` chain
pub fn root_cause(err: &(dyn Error + 'static)) -> String {
    let mut deepest = err;
    while let Some(source) = deepest.source() {
        deepest = source;
    }
    first_line(&deepest.to_string())
}

/// First non-blank line of `message`, trimmed
pub fn first_line(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// The last few non-blank lines of an error message
pub fn summarize_error(message: &str) -> String {
    let lines: Vec<&str> = message.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(SNIPPET_LINES);
    lines[start..].join("\n")
}

/// Filesystem-safe form of `text`
pub fn safe_name(text: &str) -> String {
    UNSAFE_CHARS
        .replace_all(text, "_")
        .trim_matches('_')
        .to_string()
}
